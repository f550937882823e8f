use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError, Weak};
use std::thread::{self, ThreadId};

use tracing::{debug, trace};

use crate::{lock, Callback, Disposer};

type Source<T> = Arc<dyn Fn(Emitter<T>) -> Disposer + Send + Sync>;

/// A value that publishes every change to its subscribers.
///
/// A `LiveData` built with [`LiveData::from_source`] is lazy: the source is attached when
/// the first subscriber arrives and its disposer runs when the last one leaves. Every new
/// subscriber is handed the current value immediately. Per subscriber, emissions are
/// delivered in version order; a stale emission racing a newer one is skipped.
///
/// A subscription keeps its `LiveData` alive until the returned [`Disposer`] runs, so a
/// derived value (from [`LiveData::map`]) keeps working after its handle is dropped.
/// Subscribers arriving on other threads while the source is attaching wait for it.
pub struct LiveData<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    source: Option<Source<T>>,
    state: Mutex<State<T>>,
    attached: Condvar,
}

struct State<T> {
    label: &'static str,
    value: Arc<T>,
    version: u64,
    next_id: u64,
    subscribers: Vec<(u64, Subscriber<T>)>,
    upstream: Option<Disposer>,
    attaching: Option<ThreadId>,
}

struct Subscriber<T> {
    handler: Arc<dyn Fn(&T) + Send + Sync>,
    seen: Arc<AtomicU64>,
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        Self { handler: self.handler.clone(), seen: self.seen.clone() }
    }
}

impl<T> Subscriber<T> {
    fn deliver(&self, value: &T, version: u64) {
        if self.seen.fetch_max(version, Ordering::SeqCst) < version {
            (self.handler)(value);
        }
    }
}

/// Write side handed to a source. Holds the `LiveData` weakly.
pub struct Emitter<T> {
    inner: Weak<Inner<T>>,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T: Send + Sync + 'static> Emitter<T> {
    pub fn emit(&self, value: T) {
        if let Some(inner) = self.inner.upgrade() {
            LiveData { inner }.publish(value);
        }
    }
}

impl<T: Send + Sync + 'static> LiveData<T> {
    /// A settable value with no upstream.
    pub fn new(value: T) -> Self {
        Self::build(value, None)
    }

    pub fn from_source<S>(seed: T, source: S) -> Self
    where
        S: Fn(Emitter<T>) -> Disposer + Send + Sync + 'static,
    {
        Self::build(seed, Some(Arc::new(source)))
    }

    /// Recompute-on-notify: emits `compute()` when attached and again on every callback
    /// delivered through the registration made by `register`.
    pub fn from_notifications<C, R>(seed: T, compute: C, register: R) -> Self
    where
        C: Fn() -> T + Send + Sync + 'static,
        R: Fn(Callback) -> Disposer + Send + Sync + 'static,
    {
        let compute = Arc::new(compute);
        Self::from_source(seed, move |emitter| {
            emitter.emit(compute());
            let compute = compute.clone();
            register(Box::new(move || emitter.emit(compute())))
        })
    }

    fn build(seed: T, source: Option<Source<T>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                state: Mutex::new(State {
                    label: "live",
                    value: Arc::new(seed),
                    version: 1,
                    next_id: 0,
                    subscribers: Vec::new(),
                    upstream: None,
                    attaching: None,
                }),
                attached: Condvar::new(),
            }),
        }
    }

    /// Name used in log output.
    pub fn labeled(self, label: &'static str) -> Self {
        lock(&self.inner.state).label = label;
        self
    }

    pub fn subscribe(&self, handler: impl Fn(&T) + Send + Sync + 'static) -> Disposer {
        self.attach();

        let subscriber = Subscriber { handler: Arc::new(handler), seen: Arc::new(AtomicU64::new(0)) };
        let (id, value, version) = {
            let mut state = lock(&self.inner.state);
            let id = state.next_id;
            state.next_id += 1;
            state.subscribers.push((id, subscriber.clone()));
            (id, state.value.clone(), state.version)
        };
        subscriber.deliver(&value, version);

        let inner = self.inner.clone();
        Disposer::new(move || LiveData { inner }.unsubscribe(id))
    }

    /// Current value. Without subscribers the source is attached just long enough to
    /// refresh it.
    pub fn value(&self) -> T
    where
        T: Clone,
    {
        let attached_here = self.attach();
        let value = lock(&self.inner.state).value.clone();
        if attached_here {
            self.detach_if_unused();
        }
        (*value).clone()
    }

    /// Publish a value directly to current subscribers.
    pub fn set(&self, value: T) {
        self.publish(value);
    }

    pub fn map<U, F>(&self, f: F) -> LiveData<U>
    where
        U: Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let (current, label) = {
            let state = lock(&self.inner.state);
            (state.value.clone(), state.label)
        };
        let seed = f(current.as_ref());
        let parent = self.clone();
        LiveData::from_source(seed, move |emitter: Emitter<U>| {
            let f = f.clone();
            parent.subscribe(move |v| emitter.emit(f(v)))
        })
        .labeled(label)
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.state).subscribers.len()
    }

    pub fn is_attached(&self) -> bool {
        lock(&self.inner.state).upstream.is_some()
    }

    fn publish(&self, value: T) {
        let (value, version, subscribers, label) = {
            let mut state = lock(&self.inner.state);
            state.value = Arc::new(value);
            state.version += 1;
            let subscribers: Vec<Subscriber<T>> = state.subscribers.iter().map(|(_, s)| s.clone()).collect();
            (state.value.clone(), state.version, subscribers, state.label)
        };
        trace!(label, version, subscribers = subscribers.len(), "livedata emit");
        for subscriber in subscribers {
            subscriber.deliver(&value, version);
        }
    }

    /// Returns true when this call attached the source.
    fn attach(&self) -> bool {
        let Some(source) = self.inner.source.clone() else {
            return false;
        };
        let me = thread::current().id();
        let label = {
            let mut state = lock(&self.inner.state);
            loop {
                if state.upstream.is_some() {
                    return false;
                }
                let attaching = state.attaching;
                match attaching {
                    None => break,
                    // reentrant subscribe from inside the source
                    Some(owner) if owner == me => return false,
                    Some(_) => state = self.inner.attached.wait(state).unwrap_or_else(PoisonError::into_inner),
                }
            }
            state.attaching = Some(me);
            state.label
        };

        // The source may emit synchronously, so no lock is held here.
        let upstream = source(Emitter { inner: Arc::downgrade(&self.inner) });

        {
            let mut state = lock(&self.inner.state);
            state.attaching = None;
            state.upstream = Some(upstream);
        }
        self.inner.attached.notify_all();
        debug!(label, "livedata attached");
        true
    }

    fn detach_if_unused(&self) {
        let (upstream, label) = {
            let mut state = lock(&self.inner.state);
            if !state.subscribers.is_empty() {
                return;
            }
            (state.upstream.take(), state.label)
        };
        if let Some(upstream) = upstream {
            upstream.dispose();
            debug!(label, "livedata detached");
        }
    }

    fn unsubscribe(&self, id: u64) {
        let removed = {
            let mut state = lock(&self.inner.state);
            let before = state.subscribers.len();
            state.subscribers.retain(|(s, _)| *s != id);
            before != state.subscribers.len()
        };
        if removed {
            self.detach_if_unused();
        }
    }
}

impl<T> Clone for LiveData<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T: fmt::Debug> fmt::Debug for LiveData<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.inner.state);
        f.debug_struct("LiveData")
            .field("label", &state.label)
            .field("value", &state.value)
            .field("subscribers", &state.subscribers.len())
            .field("attached", &state.upstream.is_some())
            .finish()
    }
}

use std::sync::{Arc, Mutex};

use crate::{lock, Disposer};

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Listeners<E> {
    next_id: u64,
    handlers: Vec<(u64, Handler<E>)>,
}

/// Synchronous event emitter: `on` registers, the returned disposer unregisters.
pub struct Notifier<E> {
    inner: Arc<Mutex<Listeners<E>>>,
}

impl<E: 'static> Notifier<E> {
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(Listeners { next_id: 0, handlers: Vec::new() })) }
    }

    pub fn on(&self, handler: impl Fn(&E) + Send + Sync + 'static) -> Disposer {
        let id = {
            let mut listeners = lock(&self.inner);
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.handlers.push((id, Arc::new(handler)));
            id
        };
        let weak = Arc::downgrade(&self.inner);
        Disposer::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner).handlers.retain(|(h, _)| *h != id);
            }
        })
    }

    /// Calls every handler registered at the time of the call.
    pub fn emit(&self, event: &E) {
        let handlers: Vec<Handler<E>> = lock(&self.inner).handlers.iter().map(|(_, h)| h.clone()).collect();
        for handler in handlers {
            handler(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner).handlers.len()
    }
}

impl<E: 'static> Default for Notifier<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for Notifier<E> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

use std::fmt;
use std::sync::Mutex;

use crate::lock;

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// Releases a registration exactly once, either through `dispose` or on drop.
#[must_use = "dropping a Disposer releases what it guards"]
pub struct Disposer {
    release: Mutex<Option<ReleaseFn>>,
}

impl Disposer {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self { release: Mutex::new(Some(Box::new(release))) }
    }

    pub fn noop() -> Self {
        Self { release: Mutex::new(None) }
    }

    pub fn dispose(&self) {
        let release = lock(&self.release).take();
        if let Some(release) = release {
            release();
        }
    }

    pub fn is_disposed(&self) -> bool {
        lock(&self.release).is_none()
    }
}

impl Drop for Disposer {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer").field("disposed", &self.is_disposed()).finish()
    }
}

/// A set of disposers released together, in insertion order.
#[derive(Default)]
pub struct DisposableGroup {
    inner: Mutex<GroupState>,
}

#[derive(Default)]
struct GroupState {
    disposed: bool,
    members: Vec<Disposer>,
}

impl DisposableGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adding to an already disposed group releases the disposer immediately.
    pub fn add(&self, disposer: Disposer) {
        let mut state = lock(&self.inner);
        if state.disposed {
            drop(state);
            disposer.dispose();
            return;
        }
        state.members.push(disposer);
    }

    pub fn dispose(&self) {
        let members = {
            let mut state = lock(&self.inner);
            state.disposed = true;
            std::mem::take(&mut state.members)
        };
        for member in members {
            member.dispose();
        }
    }

    pub fn is_disposed(&self) -> bool {
        lock(&self.inner).disposed
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Folds the group into a single disposer.
    pub fn into_disposer(self) -> Disposer {
        Disposer::new(move || self.dispose())
    }
}

impl Drop for DisposableGroup {
    fn drop(&mut self) {
        self.dispose();
    }
}

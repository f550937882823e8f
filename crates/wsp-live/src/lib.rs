//! Reactive plumbing shared by the workspace crates.
//!
//! Everything here is synchronous: handlers run on the thread that emits, and
//! internal locks are released before any user callback is invoked.

pub mod disposable;
pub mod livedata;
pub mod notifier;

pub use disposable::*;
pub use livedata::*;
pub use notifier::*;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Callback used by notification sources that carry no payload.
pub type Callback = Box<dyn Fn() + Send + Sync>;

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

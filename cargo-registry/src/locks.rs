//! In-process mutual exclusion keyed by owner.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// One lock per owner name (case-insensitive). Not reentrant: code running
/// under [`OwnerLocks::with_lock`] must not call it again for the same owner.
#[derive(Debug, Default)]
pub struct OwnerLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl OwnerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, owner: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(owner.to_lowercase()).or_default())
    }

    /// Run `f` while holding the owner's lock.
    pub fn with_lock<T>(&self, owner: &str, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(owner);
        // A panic in another holder leaves no state behind the unit mutex.
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }
}

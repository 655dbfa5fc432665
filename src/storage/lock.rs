//! Per-community exclusive access.
//!
//! A sweep's load/compute/save and an acceptance's read-modify-write for the
//! same community must never interleave. `CommunityLocks` hands out one
//! mutex per community id; different communities never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Registry of per-community mutexes.
#[derive(Debug, Default)]
pub struct CommunityLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CommunityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `community`.
    ///
    /// A panic in an earlier holder does not poison the lock: the guarded
    /// state lives in the store, which is only replaced atomically.
    pub fn with_lock<R>(&self, community: &str, f: impl FnOnce() -> R) -> R {
        let lock = self.entry(community);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    fn entry(&self, community: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            locks
                .entry(community.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}

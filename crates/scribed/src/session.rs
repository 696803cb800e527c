//! Per-session mutual exclusion.
//!
//! Two gap computations for the same learner must not interleave, but
//! different learners should never wait on each other. Locks are handed out
//! as `Arc<Mutex<()>>` so a guard can outlive the registry lookup.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
pub struct SessionLocks {
    locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the lock for a session.
    pub fn lock_for(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop a session's lock once the session ends.
    pub fn remove(&self, session_id: &str) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.remove(session_id);
    }
}

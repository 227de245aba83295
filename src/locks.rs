//! Named advisory locks.
//!
//! Writers that must not interleave (e.g. duplicate-email check + insert)
//! serialize on a shared name. Different names never block each other.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

/// Lock held while creating or changing user accounts.
pub const USER_WRITE_LOCK: &str = "cuUser";

#[derive(Default)]
pub struct NamedLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl NamedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive ownership of `name`; released when the guard drops.
    pub async fn acquire(&self, name: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();

        let guard = lock.lock_owned().await;
        debug!("Acquired lock {}", name);
        guard
    }
}

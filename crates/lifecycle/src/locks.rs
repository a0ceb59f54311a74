//! Per-hash serialization of mutations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

/// Async locks keyed by content hash.
///
/// Delete and resize for the same hash run one after the other; different
/// hashes never wait on each other.
#[derive(Debug, Default)]
pub(crate) struct HashLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl HashLocks {
    pub(crate) async fn acquire(&self, content_hash: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap();
            // Drop entries nobody holds or waits on.
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            Arc::clone(locks.entry(content_hash.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap().len()
    }
}

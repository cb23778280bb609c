use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-container-name mutex, keyed the same way the teacher's `WsRooms`
/// keys its room locks by room id. Satisfies §5's ordering requirement:
/// "concurrent mutations to the same container name must be serialised".
#[derive(Default)]
pub struct ContainerLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ContainerLocks {
    pub fn new() -> Self {
        ContainerLocks::default()
    }

    pub async fn lock(&self, name: &str) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    pub fn try_lock(&self, name: &str) -> Option<OwnedMutexGuard<()>> {
        let mutex = self
            .locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.try_lock_owned().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn try_lock_fails_while_another_holder_has_the_same_key() {
        let locks = ContainerLocks::new();
        let _guard = locks.lock("bob-container").await;
        assert!(locks.try_lock("bob-container").is_none());
        assert!(locks.try_lock("alice-container").is_some());
    }
}

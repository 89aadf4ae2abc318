use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// In-process serialization of work on a single project.
///
/// Cloning shares the same lock table.
#[derive(Debug, Clone, Default)]
pub struct ProjectLocks {
    locks: Arc<Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other caller holds the lock of `project_id`.
    pub async fn lock(&self, project_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // Drop entries nobody is holding or waiting on.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(project_id).or_default().clone()
        };

        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_same_project_waits() {
        let locks = ProjectLocks::new();
        let project = Uuid::new_v4();
        let acquired = Arc::new(AtomicBool::new(false));

        let guard = locks.lock(project).await;

        let task = {
            let locks = locks.clone();
            let acquired = acquired.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(project).await;
                acquired.store(true, Ordering::SeqCst);
            })
        };

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!acquired.load(Ordering::SeqCst));

        drop(guard);
        task.await.unwrap();
        assert!(acquired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_other_projects_do_not_wait() {
        let locks = ProjectLocks::new();
        let _first = locks.lock(Uuid::new_v4()).await;
        let _second = locks.lock(Uuid::new_v4()).await;
    }
}

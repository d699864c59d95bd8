//! In-process mutual exclusion keyed by repository name.
//!
//! Two synchronization calls for the same repository in one process run one
//! after the other. Calls from separate processes are not coordinated.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct RepoLeases {
    slots: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of a synchronization call.
pub struct RepoLease {
    name: String,
    _guard: OwnedMutexGuard<()>,
}

impl RepoLease {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl RepoLeases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other holder has `name`, then take it.
    pub async fn acquire(&self, name: &str) -> RepoLease {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
            // Drop slots nobody holds or waits on.
            slots.retain(|_, m| Arc::strong_count(m) > 1);
            slots.entry(name.to_string()).or_default().clone()
        };
        RepoLease {
            name: name.to_string(),
            _guard: slot.lock_owned().await,
        }
    }

    /// Names currently held or awaited.
    pub fn active(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
        slots.values().filter(|m| Arc::strong_count(m) > 1).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_name_is_exclusive() {
        let leases = Arc::new(RepoLeases::new());
        let first = leases.acquire("quiz-app-1").await;

        let contender = {
            let leases = leases.clone();
            tokio::spawn(async move { leases.acquire("quiz-app-1").await.name().to_string() })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(first);
        let name = tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(name, "quiz-app-1");
    }

    #[tokio::test]
    async fn different_names_do_not_block() {
        let leases = RepoLeases::new();
        let _a = leases.acquire("quiz-app-1").await;
        let b = tokio::time::timeout(Duration::from_millis(100), leases.acquire("quiz-app-2")).await;
        assert!(b.is_ok());
        assert_eq!(leases.active(), 2);
    }

    #[tokio::test]
    async fn released_slots_are_pruned() {
        let leases = RepoLeases::new();
        drop(leases.acquire("quiz-app-1").await);
        let _b = leases.acquire("quiz-app-2").await;
        assert_eq!(leases.active(), 1);
        assert_eq!(leases.slots.lock().unwrap().len(), 1);
    }
}

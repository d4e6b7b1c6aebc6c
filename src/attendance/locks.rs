use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::model::user::UserId;

/// Per-user mutual exclusion for the check/write pair of the attendance
/// state machine.
///
/// Entries are created on first use and expire after `idle` without access.
/// There is no capacity bound, so an entry cannot be evicted by pressure
/// while a request is waiting on it.
#[derive(Clone)]
pub struct UserLocks {
    locks: Cache<UserId, Arc<Mutex<()>>>,
}

impl UserLocks {
    pub fn new(idle: Duration) -> Self {
        Self {
            locks: Cache::builder().time_to_idle(idle).build(),
        }
    }

    /// Waits for exclusive access to `user_id`'s attendance state. The lock is
    /// released when the guard drops, including when the request is cancelled.
    pub async fn acquire(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .get_with(user_id, async { Arc::new(Mutex::new(())) })
            .await;
        lock.lock_owned().await
    }
}

impl Default for UserLocks {
    fn default() -> Self {
        Self::new(Duration::from_secs(600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_user_is_exclusive_other_users_are_not() {
        let locks = UserLocks::default();
        let alice = UserId::new();
        let bob = UserId::new();

        let held = locks.acquire(alice).await;

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), locks.acquire(alice)).await;
        assert!(blocked.is_err(), "second acquire for alice must wait");

        let free = tokio::time::timeout(Duration::from_millis(50), locks.acquire(bob)).await;
        assert!(free.is_ok(), "bob must not wait on alice");

        drop(held);
        let reacquired =
            tokio::time::timeout(Duration::from_millis(50), locks.acquire(alice)).await;
        assert!(reacquired.is_ok());
    }
}

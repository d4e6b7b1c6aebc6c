use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::model::attendance::{AttendanceRecord, AttendanceStatus, RecordId};
use crate::model::user::{User, UserId};
use crate::store::{AttendanceStore, IdentityStore, StoreError};

#[derive(Default)]
struct Users {
    by_id: HashMap<UserId, User>,
    by_email: HashMap<String, UserId>,
}

/// Identity store held in process memory. Email uniqueness is checked under
/// the same lock as the insert.
#[derive(Default)]
pub struct MemoryIdentityStore {
    users: Mutex<Users>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn create(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.users.lock().await;
        if users.by_email.contains_key(&user.email) {
            return Err(StoreError::EmailTaken(user.email));
        }
        users.by_email.insert(user.email.clone(), user.id);
        users.by_id.insert(user.id, user.clone());
        debug!(user_id = %user.id, "user stored in memory");
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().await;
        Ok(users
            .by_email
            .get(email)
            .and_then(|id| users.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.users.lock().await.by_id.get(&id).cloned())
    }
}

/// Attendance store held in process memory.
///
/// Records are kept in insertion order, which doubles as the tie-break for
/// equal check-in times. The one-open-session rule is enforced inside
/// `insert_open` so the store is safe even without the engine's locks.
#[derive(Default)]
pub struct MemoryAttendanceStore {
    records: Mutex<Vec<AttendanceRecord>>,
}

impl MemoryAttendanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored record in insertion order.
    pub async fn snapshot(&self) -> Vec<AttendanceRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl AttendanceStore for MemoryAttendanceStore {
    async fn find_open(&self, user_id: UserId) -> Result<Option<AttendanceRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .await
            .iter()
            .find(|r| r.user_id == user_id && r.is_open())
            .cloned())
    }

    async fn find_by_id(&self, id: RecordId) -> Result<Option<AttendanceRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn insert_open(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        if records
            .iter()
            .any(|r| r.user_id == record.user_id && r.is_open())
        {
            return Err(StoreError::OpenSessionExists(record.user_id));
        }
        records.push(record.clone());
        Ok(())
    }

    async fn close(
        &self,
        id: RecordId,
        check_out: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let mut records = self.records.lock().await;
        let Some(record) = records.iter_mut().find(|r| r.id == id && r.is_open()) else {
            return Ok(None);
        };
        record.check_out = Some(check_out);
        record.status = AttendanceStatus::Closed;
        Ok(Some(record.clone()))
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut mine: Vec<AttendanceRecord> = self
            .records
            .lock()
            .await
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        // stable: equal check-in times keep insertion order
        mine.sort_by(|a, b| b.check_in.cmp(&a.check_in));
        Ok(mine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_open_insert_for_same_user_is_rejected() {
        let store = MemoryAttendanceStore::new();
        let user = UserId::new();

        store
            .insert_open(&AttendanceRecord::open(user, Utc::now()))
            .await
            .unwrap();
        let err = store
            .insert_open(&AttendanceRecord::open(user, Utc::now()))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::OpenSessionExists(id) if id == user));
        assert_eq!(store.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn close_only_touches_open_records() {
        let store = MemoryAttendanceStore::new();
        let record = AttendanceRecord::open(UserId::new(), Utc::now());
        store.insert_open(&record).await.unwrap();

        let closed = store.close(record.id, Utc::now()).await.unwrap();
        assert!(closed.is_some_and(|r| r.status == AttendanceStatus::Closed));

        let again = store.close(record.id, Utc::now()).await.unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn duplicate_email_leaves_existing_user_untouched() {
        let store = MemoryIdentityStore::new();
        let first = User::new("a@example.com".into(), "hash-1".into(), "A".into());
        store.create(first.clone()).await.unwrap();

        let dup = User::new("a@example.com".into(), "hash-2".into(), "B".into());
        let err = store.create(dup).await.unwrap_err();
        assert!(matches!(err, StoreError::EmailTaken(_)));

        let stored = store.find_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(stored.id, first.id);
        assert_eq!(stored.password_hash, "hash-1");
        assert_eq!(stored.full_name, "A");
    }
}

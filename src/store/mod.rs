//! Persistence boundary.
//!
//! The attendance engine and the HTTP layer only see the traits below. Each
//! backend owns the translation between its row shape and the domain types.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::attendance::{AttendanceRecord, RecordId};
use crate::model::user::{User, UserId};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store already holds an open record for this user.
    #[error("user {0} already has an open attendance session")]
    OpenSessionExists(UserId),
    #[error("email already registered: {0}")]
    EmailTaken(String),
    /// A persisted row could not be mapped onto the domain model.
    #[error("corrupt row: {0}")]
    CorruptRow(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Fails with [`StoreError::EmailTaken`] when the email is already present.
    async fn create(&self, user: User) -> Result<User, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// The user's open record, if any.
    async fn find_open(&self, user_id: UserId) -> Result<Option<AttendanceRecord>, StoreError>;

    async fn find_by_id(&self, id: RecordId) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Persists a new open record. Must fail with
    /// [`StoreError::OpenSessionExists`] if the user already has one, even
    /// when two inserts race.
    async fn insert_open(&self, record: &AttendanceRecord) -> Result<(), StoreError>;

    /// Closes the record if it is still open and returns it. `Ok(None)` when
    /// no open record with that id exists.
    async fn close(
        &self,
        id: RecordId,
        check_out: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// All records for the user, latest `check_in` first, insertion order
    /// among equal timestamps.
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<AttendanceRecord>, StoreError>;
}

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, MySqlPool};
use tracing::{error, info};

use crate::model::attendance::{AttendanceRecord, AttendanceStatus, RecordId};
use crate::model::user::{User, UserId};
use crate::store::{AttendanceStore, IdentityStore, StoreError};

// =======================
// Row shapes
// =======================

#[derive(Debug, FromRow)]
struct UserRow {
    id: String,
    email: String,
    password_hash: String,
    full_name: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let id = UserId::parse(&row.id)
            .map_err(|e| StoreError::CorruptRow(format!("users.id {:?}: {}", row.id, e)))?;
        Ok(User {
            id,
            email: row.email,
            password_hash: row.password_hash,
            full_name: row.full_name,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct AttendanceRow {
    id: String,
    user_id: String,
    check_in: DateTime<Utc>,
    check_out: Option<DateTime<Utc>>,
    status: String,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let id = RecordId::parse(&row.id)
            .map_err(|e| StoreError::CorruptRow(format!("attendance.id {:?}: {}", row.id, e)))?;
        let user_id = UserId::parse(&row.user_id).map_err(|e| {
            StoreError::CorruptRow(format!("attendance.user_id {:?}: {}", row.user_id, e))
        })?;
        let status = AttendanceStatus::from_str(&row.status).map_err(|_| {
            StoreError::CorruptRow(format!("attendance {}: unknown status {:?}", id, row.status))
        })?;

        let record = AttendanceRecord {
            id,
            user_id,
            check_in: row.check_in,
            check_out: row.check_out,
            status,
        };
        if !record.is_consistent() {
            return Err(StoreError::CorruptRow(format!(
                "attendance {}: status {} does not match check_out {:?}",
                id,
                row.status,
                record.check_out
            )));
        }
        Ok(record)
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

// =======================
// Users
// =======================

#[derive(Clone)]
pub struct MySqlIdentityStore {
    pool: MySqlPool,
}

impl MySqlIdentityStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for MySqlIdentityStore {
    async fn create(&self, user: User) -> Result<User, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, full_name, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::EmailTaken(user.email.clone())
            } else {
                error!(error = %e, "failed to create user");
                StoreError::Database(e)
            }
        })?;

        info!(user_id = %user.id, "user created");
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, password_hash, full_name, created_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, password_hash, full_name, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }
}

// =======================
// Attendance
// =======================

/// Relies on the `uq_attendance_open_session` unique index (see
/// `schema.sql`) to reject a second open row for a user.
#[derive(Clone)]
pub struct MySqlAttendanceStore {
    pool: MySqlPool,
}

impl MySqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceStore for MySqlAttendanceStore {
    async fn find_open(&self, user_id: UserId) -> Result<Option<AttendanceRecord>, StoreError> {
        sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT id, user_id, check_in, check_out, status
            FROM attendance
            WHERE user_id = ? AND status = ?
            LIMIT 1
            "#,
        )
        .bind(user_id.to_string())
        .bind(AttendanceStatus::Open.as_ref())
        .fetch_optional(&self.pool)
        .await?
        .map(AttendanceRecord::try_from)
        .transpose()
    }

    async fn find_by_id(&self, id: RecordId) -> Result<Option<AttendanceRecord>, StoreError> {
        sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT id, user_id, check_in, check_out, status
            FROM attendance
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .map(AttendanceRecord::try_from)
        .transpose()
    }

    async fn insert_open(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO attendance (id, user_id, check_in, check_out, status)
            VALUES (?, ?, ?, NULL, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.user_id.to_string())
        .bind(record.check_in)
        .bind(AttendanceStatus::Open.as_ref())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::OpenSessionExists(record.user_id)
            } else {
                error!(error = %e, user_id = %record.user_id, "failed to insert attendance");
                StoreError::Database(e)
            }
        })?;

        Ok(())
    }

    async fn close(
        &self,
        id: RecordId,
        check_out: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_out = ?, status = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(check_out)
        .bind(AttendanceStatus::Closed.as_ref())
        .bind(id.to_string())
        .bind(AttendanceStatus::Open.as_ref())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(error = %e, record_id = %id, "failed to close attendance");
            StoreError::Database(e)
        })?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_by_id(id).await
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<AttendanceRecord>, StoreError> {
        sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT id, user_id, check_in, check_out, status
            FROM attendance
            WHERE user_id = ?
            ORDER BY check_in DESC, seq ASC
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(AttendanceRecord::try_from)
        .collect()
    }
}

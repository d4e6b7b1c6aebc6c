use chrono::{DateTime, Utc};
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::model::user::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(raw: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(raw).map(Self)
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle state of a record. Persisted and sent over the wire as
/// `checked-in` / `checked-out`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString, ToSchema,
)]
pub enum AttendanceStatus {
    #[serde(rename = "checked-in")]
    #[strum(serialize = "checked-in")]
    Open,
    #[serde(rename = "checked-out")]
    #[strum(serialize = "checked-out")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "id": "0b6f9f7e-5c1d-4d0f-8f4a-2a9d8c7b6e5f",
    "userId": "6f1c2a4e-0d8e-4a55-9b7b-3f3f6a0c9e11",
    "checkIn": "2026-01-05T08:58:12Z",
    "checkOut": null,
    "status": "checked-in"
}))]
pub struct AttendanceRecord {
    #[schema(value_type = String)]
    pub id: RecordId,
    #[schema(value_type = String)]
    pub user_id: UserId,
    #[schema(format = DateTime, value_type = String)]
    pub check_in: DateTime<Utc>,
    #[schema(format = DateTime, value_type = Option<String>)]
    pub check_out: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
}

impl AttendanceRecord {
    /// A fresh open session starting at `at`.
    pub fn open(user_id: UserId, at: DateTime<Utc>) -> Self {
        Self {
            id: RecordId::new(),
            user_id,
            check_in: at,
            check_out: None,
            status: AttendanceStatus::Open,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == AttendanceStatus::Open
    }

    /// Check-out time to store when the server clock reads `now`.
    ///
    /// Never earlier than `check_in`: a clock that went backwards yields a
    /// zero-length session instead of a negative one.
    pub fn check_out_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.max(self.check_in)
    }

    /// Consumes an open record and returns it closed at `check_out_time(now)`.
    pub fn close(mut self, now: DateTime<Utc>) -> Self {
        self.check_out = Some(self.check_out_time(now));
        self.status = AttendanceStatus::Closed;
        self
    }

    /// `status = open` exactly when `check_out` is absent, and a present
    /// `check_out` is not before `check_in`.
    pub fn is_consistent(&self) -> bool {
        match (self.status, self.check_out) {
            (AttendanceStatus::Open, None) => true,
            (AttendanceStatus::Closed, Some(out)) => out >= self.check_in,
            _ => false,
        }
    }
}

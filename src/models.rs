use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{EnumString, EnumVariantNames};
use utoipa::ToSchema;

use crate::model::attendance::AttendanceRecord;
use crate::model::user::PublicUser;

// Fields default to empty so that a missing field is reported by validation
// alongside the others instead of failing deserialization on the first one.

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterReq {
    #[serde(default)]
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[serde(default)]
    #[schema(example = "secret1", min_length = 6)]
    pub password: String,
    #[serde(default)]
    #[schema(example = "Alice Example")]
    pub full_name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginReq {
    #[serde(default)]
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[serde(default)]
    #[schema(example = "secret1")]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckReq {
    #[serde(default)]
    #[schema(example = "check-in")]
    pub action: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, EnumVariantNames)]
pub enum CheckAction {
    #[strum(serialize = "check-in")]
    CheckIn,
    #[strum(serialize = "check-out")]
    CheckOut,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentAttendance {
    pub checked_in: bool,
    pub attendance: Option<AttendanceRecord>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    #[schema(format = DateTime, value_type = String)]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// user id
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
}

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::attendance::AttendanceError;
use crate::auth::auth::GateError;
use crate::model::attendance::AttendanceRecord;
use crate::store::StoreError;

/// One failed field of a request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    #[schema(example = "email")]
    pub field: String,
    #[schema(example = "Invalid email address")]
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Generic error body: `{ error, details? }`.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = "Validation failed")]
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
    /// Only present when a check-in is refused because a session is open.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendance: Option<AttendanceRecord>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),
    #[error("User with this email already exists")]
    EmailTaken,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("You are already checked in")]
    AlreadyCheckedIn(Option<Box<AttendanceRecord>>),
    #[error("You are not currently checked in")]
    NotCheckedIn,
    #[error("User not found")]
    UserNotFound,
    #[error("{0}")]
    Unauthenticated(&'static str),
    #[error("Invalid or expired token")]
    InvalidCredential,
    /// Logged server side; the client only sees a generic message.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal(err: impl std::fmt::Display) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmailTaken(_) => ApiError::EmailTaken,
            StoreError::OpenSessionExists(_) => ApiError::AlreadyCheckedIn(None),
            other => ApiError::internal(other),
        }
    }
}

impl From<AttendanceError> for ApiError {
    fn from(err: AttendanceError) -> Self {
        match err {
            AttendanceError::AlreadyCheckedIn(open) => ApiError::AlreadyCheckedIn(Some(open)),
            AttendanceError::NotCheckedIn => ApiError::NotCheckedIn,
            AttendanceError::Store(e) => e.into(),
        }
    }
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Unauthenticated(reason) => ApiError::Unauthenticated(reason),
            GateError::InvalidCredential(_) => ApiError::InvalidCredential,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::EmailTaken
            | ApiError::AlreadyCheckedIn(_)
            | ApiError::NotCheckedIn => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::Unauthenticated(_) => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::InvalidCredential => StatusCode::FORBIDDEN,
            ApiError::UserNotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::Internal(cause) => {
                tracing::error!(error = %cause, "request failed");
                ErrorBody {
                    error: "Internal Server Error".to_string(),
                    details: None,
                    attendance: None,
                }
            }
            ApiError::Validation(details) => ErrorBody {
                error: self.to_string(),
                details: Some(details.clone()),
                attendance: None,
            },
            ApiError::AlreadyCheckedIn(open) => ErrorBody {
                error: self.to_string(),
                details: None,
                attendance: open.as_deref().cloned(),
            },
            _ => ErrorBody {
                error: self.to_string(),
                details: None,
                attendance: None,
            },
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::user::UserId;
    use chrono::Utc;

    #[test]
    fn maps_domain_errors_to_statuses() {
        let open = AttendanceRecord::open(UserId::new(), Utc::now());
        let cases = [
            (ApiError::from(AttendanceError::AlreadyCheckedIn(Box::new(open))), 400),
            (ApiError::from(AttendanceError::NotCheckedIn), 400),
            (ApiError::from(StoreError::EmailTaken("a@b.co".into())), 400),
            (ApiError::Unauthenticated("Access token required"), 401),
            (ApiError::InvalidCredentials, 401),
            (ApiError::InvalidCredential, 403),
            (ApiError::from(StoreError::CorruptRow("x".into())), 500),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code().as_u16(), status, "{err:?}");
        }
    }

    #[actix_web::test]
    async fn internal_errors_do_not_leak_their_cause() {
        let resp = ApiError::internal("connection refused to 10.0.0.3").error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "Internal Server Error" }));
    }
}

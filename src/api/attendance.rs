use actix_web::{HttpResponse, web};

use crate::attendance::AttendanceEngine;
use crate::auth::auth::AuthUser;
use crate::error::{ApiError, ErrorBody};
use crate::model::attendance::AttendanceRecord;
use crate::models::{CheckAction, CheckReq, CurrentAttendance};
use crate::utils::validation::parse_check_action;

/// Check in or check out
#[utoipa::path(
    post,
    path = "/api/attendance/check",
    request_body(content = CheckReq, content_type = "application/json"),
    responses(
        (status = 201, description = "Checked in; the new open record", body = AttendanceRecord),
        (status = 200, description = "Checked out; the closed record", body = AttendanceRecord),
        (status = 400, description = "Validation failed, already checked in (with the open record), or not checked in", body = ErrorBody),
        (status = 401, description = "Missing token", body = ErrorBody),
        (status = 403, description = "Invalid or expired token", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    payload: web::Json<CheckReq>,
) -> Result<HttpResponse, ApiError> {
    match parse_check_action(&payload)? {
        CheckAction::CheckIn => {
            let record = engine.check_in(auth.user_id).await?;
            Ok(HttpResponse::Created().json(record))
        }
        CheckAction::CheckOut => {
            let record = engine.check_out(auth.user_id).await?;
            Ok(HttpResponse::Ok().json(record))
        }
    }
}

/// Attendance history of the caller, latest check-in first
#[utoipa::path(
    get,
    path = "/api/attendance/me",
    responses(
        (status = 200, description = "Attendance records", body = [AttendanceRecord]),
        (status = 401, description = "Missing token", body = ErrorBody),
        (status = 403, description = "Invalid or expired token", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn history(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
) -> Result<HttpResponse, ApiError> {
    let records = engine.history(auth.user_id).await?;
    Ok(HttpResponse::Ok().json(records))
}

/// Whether the caller currently has an open session
#[utoipa::path(
    get,
    path = "/api/attendance/current",
    responses(
        (status = 200, description = "Open session, if any", body = CurrentAttendance),
        (status = 401, description = "Missing token", body = ErrorBody),
        (status = 403, description = "Invalid or expired token", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn current(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
) -> Result<HttpResponse, ApiError> {
    let open = engine.current(auth.user_id).await?;
    Ok(HttpResponse::Ok().json(CurrentAttendance {
        checked_in: open.is_some(),
        attendance: open,
    }))
}

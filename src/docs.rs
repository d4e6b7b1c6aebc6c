use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

use crate::error::{ErrorBody, FieldError};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::user::PublicUser;
use crate::models::{
    AuthResponse, CheckReq, CurrentAttendance, HealthResponse, LoginReq, RegisterReq,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Tracker API",
        version = "1.0.0",
        description = r#"
## Employee Attendance Tracker

Employees register, log in, and record when they start and stop working.

### Key Features
- **Accounts**: register and log in with email and password
- **Attendance**: check in, check out, and list your own history
- A user has at most one open session at any time

### Security
Attendance endpoints require a **JWT Bearer** token obtained from register or login.
A missing token yields 401, an invalid or expired one 403.

### Response Format
JSON bodies, camelCase fields, ISO-8601 timestamps. Errors are `{ "error": "..." }`
with an optional `details` array for validation failures.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::me,

        crate::api::attendance::check,
        crate::api::attendance::history,
        crate::api::attendance::current,

        crate::api::health::health
    ),
    components(
        schemas(
            RegisterReq,
            LoginReq,
            CheckReq,
            AuthResponse,
            PublicUser,
            AttendanceRecord,
            AttendanceStatus,
            CurrentAttendance,
            ErrorBody,
            FieldError,
            HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration and login"),
        (name = "Attendance", description = "Check-in / check-out and history"),
        (name = "Health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

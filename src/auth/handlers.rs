use actix_web::{HttpResponse, web};
use once_cell::sync::Lazy;
use tracing::{debug, info, instrument};

use crate::{
    auth::{
        auth::AuthUser,
        jwt::generate_access_token,
        password::{hash_password, verify_password},
    },
    config::Config,
    error::{ApiError, ErrorBody},
    model::user::{PublicUser, User},
    models::{AuthResponse, LoginReq, RegisterReq},
    store::IdentityStore,
    utils::validation::{validate_login, validate_register},
};

/// Verified against when the email is unknown, so that a miss costs the same
/// as a wrong password.
static DUMMY_HASH: Lazy<String> =
    Lazy::new(|| hash_password("attendance-tracker-dummy").unwrap_or_default());

fn issue(user: &User, config: &Config) -> Result<AuthResponse, ApiError> {
    let token = generate_access_token(user.id, config).map_err(ApiError::internal)?;
    Ok(AuthResponse {
        user: PublicUser::from(user),
        token,
    })
}

/// User registration handler
#[utoipa::path(
    post,
    path = "/api/register",
    request_body(content = RegisterReq, content_type = "application/json"),
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 400, description = "Validation failed or email already registered", body = ErrorBody),
        (status = 429, description = "Too many requests"),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(payload, store, config))]
pub async fn register(
    payload: web::Json<RegisterReq>,
    store: web::Data<dyn IdentityStore>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let input = validate_register(&payload)?;

    // cheap rejection before paying for a hash; the unique index still decides
    if store.find_by_email(&input.email).await?.is_some() {
        info!("Registration refused: email already registered");
        return Err(ApiError::EmailTaken);
    }

    let hashed = hash_password(&input.password).map_err(ApiError::internal)?;
    let user = store
        .create(User::new(input.email, hashed, input.full_name))
        .await?;

    info!(user_id = %user.id, "User registered");
    Ok(HttpResponse::Created().json(issue(&user, &config)?))
}

/// Login handler
#[utoipa::path(
    post,
    path = "/api/login",
    request_body(content = LoginReq, content_type = "application/json"),
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 401, description = "Invalid email or password", body = ErrorBody),
        (status = 429, description = "Too many requests"),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(payload, store, config))]
pub async fn login(
    payload: web::Json<LoginReq>,
    store: web::Data<dyn IdentityStore>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let creds = validate_login(&payload)?;

    debug!("Fetching user");
    let Some(user) = store.find_by_email(&creds.email).await? else {
        let _ = verify_password(&creds.password, &DUMMY_HASH);
        info!("Invalid credentials: user not found");
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password(&creds.password, &user.password_hash).map_err(ApiError::internal)? {
        info!(user_id = %user.id, "Invalid credentials: password mismatch");
        return Err(ApiError::InvalidCredentials);
    }

    info!(user_id = %user.id, "Login successful");
    Ok(HttpResponse::Ok().json(issue(&user, &config)?))
}

/// Profile of the authenticated user
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current user", body = PublicUser),
        (status = 401, description = "Missing token", body = ErrorBody),
        (status = 403, description = "Invalid or expired token", body = ErrorBody),
        (status = 404, description = "User no longer exists", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(
    auth: AuthUser,
    store: web::Data<dyn IdentityStore>,
) -> Result<HttpResponse, ApiError> {
    let user = store
        .find_by_id(auth.user_id)
        .await?
        .ok_or(ApiError::UserNotFound)?;

    Ok(HttpResponse::Ok().json(PublicUser::from(&user)))
}

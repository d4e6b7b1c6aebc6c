use std::sync::Arc;

use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{HttpRequest, error::JsonPayloadError, middleware::from_fn, web};
use anyhow::anyhow;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    api::{attendance, health},
    attendance::AttendanceEngine,
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    docs::ApiDoc,
    error::{ApiError, FieldError},
    store::IdentityStore,
};

pub type Limiter = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-peer-IP quotas for the public auth endpoints and the protected scope.
pub struct RateLimits {
    pub login: Limiter,
    pub register: Limiter,
    pub protected: Limiter,
}

impl RateLimits {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            login: build_limiter(config.rate_login_per_min)?,
            register: build_limiter(config.rate_register_per_min)?,
            protected: build_limiter(config.rate_protected_per_min)?,
        })
    }
}

fn build_limiter(requests_per_min: u32) -> anyhow::Result<Limiter> {
    let per_ms = (60_000 / requests_per_min.max(1) as u64).max(1);
    GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit: {} requests per minute", requests_per_min))
}

/// Everything the HTTP layer needs, built once at startup and cloned into
/// each worker.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub engine: AttendanceEngine,
    pub identity: Arc<dyn IdentityStore>,
    pub limits: Arc<RateLimits>,
}

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::Validation(vec![FieldError::new("body", err.to_string())]).into()
}

pub fn configure(cfg: &mut web::ServiceConfig, state: &AppState) {
    cfg.app_data(web::Data::new(state.config.clone()))
        .app_data(web::Data::new(state.engine.clone()))
        .app_data(web::Data::from(state.identity.clone()))
        .app_data(web::JsonConfig::default().error_handler(json_error_handler));

    cfg.route("/health", web::get().to(health::health));
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard so JS/CSS assets resolve
            .url("/api-doc/openapi.json", ApiDoc::openapi()),
    );

    cfg.service(
        web::scope("/api")
            // Public routes
            .service(
                web::resource("/register")
                    .wrap(Governor::new(&state.limits.register))
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/login")
                    .wrap(Governor::new(&state.limits.login))
                    .route(web::post().to(handlers::login)),
            )
            // Protected routes
            .service(
                web::scope("")
                    .wrap(from_fn(auth_middleware))
                    .wrap(Governor::new(&state.limits.protected))
                    .route("/me", web::get().to(handlers::me))
                    .service(
                        web::scope("/attendance")
                            .route("/check", web::post().to(attendance::check))
                            .route("/me", web::get().to(attendance::history))
                            .route("/current", web::get().to(attendance::current)),
                    ),
            ),
    );
}

// REGISTER / LOGIN
//  └─ token (7 days, sub = user id)

// API REQUEST
//  └─ Authorization: Bearer token
//       ├─ missing / not Bearer  → 401
//       └─ bad signature/expired → 403

use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::http::header::{AUTHORIZATION, CONTENT_TYPE};
use actix_web::middleware::{Logger, NormalizePath};
use actix_web::{App, HttpServer};
use anyhow::Context;
use tracing::info;
use tracing_appender::rolling;

use attendance_tracker::attendance::{AttendanceEngine, UserLocks};
use attendance_tracker::config::Config;
use attendance_tracker::db::init_db;
use attendance_tracker::routes::{self, AppState, RateLimits};
use attendance_tracker::store::mysql::{MySqlAttendanceStore, MySqlIdentityStore};

fn build_cors(config: &Config) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST"])
        .allowed_headers(vec![CONTENT_TYPE, AUTHORIZATION])
        .supports_credentials()
        .max_age(3600);

    for origin in &config.cors_origins {
        cors = if origin == "*" {
            cors.allow_any_origin()
        } else {
            cors.allowed_origin(origin)
        };
    }

    cors
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config)
        .await
        .context("failed to connect to database")?;

    let engine = AttendanceEngine::new(
        Arc::new(MySqlAttendanceStore::new(pool.clone())),
        UserLocks::new(Duration::from_secs(config.lock_idle_secs)),
    );
    let state = AppState {
        limits: Arc::new(RateLimits::from_config(&config)?),
        identity: Arc::new(MySqlIdentityStore::new(pool)),
        engine,
        config: config.clone(),
    };

    info!(addr = %config.server_addr, "API endpoints: POST /api/register, POST /api/login, POST /api/attendance/check, GET /api/attendance/me");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .wrap(build_cors(&state.config))
            .configure(|cfg| routes::configure(cfg, &state))
    })
    .bind(&config.server_addr)?
    .run()
    .await?;

    Ok(())
}

use actix_web::{HttpResponse, Responder};
use chrono::Utc;

use crate::models::HealthResponse;

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Server is up", body = HealthResponse)),
    tag = "Health"
)]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
    })
}

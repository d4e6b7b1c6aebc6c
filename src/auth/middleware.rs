use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::AUTHORIZATION,
    web::Data,
};
use tracing::debug;

use crate::auth::auth::{AuthUser, authenticate};
use crate::config::Config;
use crate::error::ApiError;

/// Gate for every protected route: rejects the request unless it carries a
/// valid bearer token, otherwise makes [`AuthUser`] available to handlers.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| ApiError::internal("app config missing"))?;

    let user_id = match authenticate(req.headers().get(AUTHORIZATION), config) {
        Ok(user_id) => user_id,
        Err(e) => {
            debug!(error = %e, path = %req.path(), "request rejected by auth gate");
            let resp = ApiError::from(e).error_response();
            return Ok(req.into_response(resp));
        }
    };

    req.extensions_mut().insert(AuthUser { user_id });

    next.call(req).await
}

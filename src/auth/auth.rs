use actix_web::http::header::HeaderValue;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};
use thiserror::Error;

use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::user::UserId;

#[derive(Debug, Error)]
pub enum GateError {
    /// No usable credential was presented.
    #[error("{0}")]
    Unauthenticated(&'static str),
    /// A credential was presented but did not verify.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),
}

/// Resolves an `Authorization` header to the user it was issued for.
pub fn authenticate(header: Option<&HeaderValue>, config: &Config) -> Result<UserId, GateError> {
    let header = header.ok_or(GateError::Unauthenticated("Access token required"))?;
    let value = header
        .to_str()
        .map_err(|_| GateError::Unauthenticated("Invalid Authorization header encoding"))?;
    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(GateError::Unauthenticated(
            "Authorization header must be 'Bearer <token>'",
        ))?;

    let claims =
        verify_token(token, config).map_err(|e| GateError::InvalidCredential(e.to_string()))?;

    UserId::parse(&claims.sub)
        .map_err(|e| GateError::InvalidCredential(format!("subject is not a user id: {}", e)))
}

/// The caller, as resolved by the auth middleware.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: UserId,
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthUser>() {
            Some(user) => ready(Ok(*user)),
            None => ready(Err(ApiError::Unauthenticated("Access token required"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_access_token;
    use crate::config::test_config;

    #[test]
    fn missing_or_malformed_header_is_unauthenticated() {
        let config = test_config();

        for header in [
            None,
            Some(HeaderValue::from_static("Basic dXNlcjpwYXNz")),
            Some(HeaderValue::from_static("Bearer ")),
            Some(HeaderValue::from_static("bearer abc")),
        ] {
            let err = authenticate(header.as_ref(), &config).unwrap_err();
            assert!(matches!(err, GateError::Unauthenticated(_)), "{header:?}");
        }
    }

    #[test]
    fn bad_token_is_invalid_credential() {
        let config = test_config();
        let header = HeaderValue::from_static("Bearer not.a.jwt");

        let err = authenticate(Some(&header), &config).unwrap_err();
        assert!(matches!(err, GateError::InvalidCredential(_)));
    }

    #[test]
    fn valid_token_resolves_to_its_user() {
        let config = test_config();
        let user = UserId::new();
        let token = generate_access_token(user, &config).unwrap();
        let header = HeaderValue::from_str(&format!("Bearer {}", token)).unwrap();

        assert_eq!(authenticate(Some(&header), &config).unwrap(), user);
    }
}

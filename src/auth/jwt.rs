use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};

use crate::config::Config;
use crate::model::user::UserId;
use crate::models::Claims;

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

/// Signs a token whose subject is `user_id`, valid for `config.token_ttl`
/// seconds.
pub fn generate_access_token(user_id: UserId, config: &Config) -> Result<String, Error> {
    let iat = now();
    let claims = Claims {
        sub: user_id.to_string(),
        iat,
        exp: iat + config.token_ttl,
        iss: config.jwt_issuer.clone(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

/// Checks signature, expiry and issuer.
pub fn verify_token(token: &str, config: &Config) -> Result<Claims, Error> {
    let mut validation = Validation::default();
    validation.set_issuer(&[config.jwt_issuer.as_str()]);
    validation.set_required_spec_claims(&["exp", "sub", "iss"]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    #[test]
    fn issued_token_verifies_and_carries_subject() {
        let config = test_config();
        let user = UserId::new();

        let token = generate_access_token(user, &config).unwrap();
        let claims = verify_token(&token, &config).unwrap();

        assert_eq!(claims.sub, user.to_string());
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);
    }

    #[test]
    fn rejects_wrong_secret_and_wrong_issuer() {
        let config = test_config();
        let token = generate_access_token(UserId::new(), &config).unwrap();

        let other_secret = Config {
            jwt_secret: "someone-else".into(),
            ..test_config()
        };
        assert!(verify_token(&token, &other_secret).is_err());

        let other_issuer = Config {
            jwt_issuer: "another-service".into(),
            ..test_config()
        };
        assert!(verify_token(&token, &other_issuer).is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let config = test_config();
        let claims = Claims {
            sub: UserId::new().to_string(),
            iat: now() - 8 * 24 * 3600,
            exp: now() - 24 * 3600,
            iss: config.jwt_issuer.clone(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();

        assert!(verify_token(&token, &config).is_err());
    }
}

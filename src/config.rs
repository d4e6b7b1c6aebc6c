use std::env;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use dotenvy::dotenv;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub token_ttl: usize,
    pub server_addr: String,
    pub cors_origins: Vec<String>,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_protected_per_min: u32,

    pub lock_idle_secs: u64,

    pub log_dir: String,
    pub log_level: tracing::Level,
}

fn var_or<T>(key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .map_err(|e| anyhow!("invalid {}={:?}: {}", key, raw, e))
}

fn required(key: &str) -> anyhow::Result<String> {
    let value = env::var(key).with_context(|| format!("{} must be set", key))?;
    if value.trim().is_empty() {
        return Err(anyhow!("{} must not be empty", key));
    }
    Ok(value)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = var_or("PORT", "4000")?;

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5000,http://localhost:4000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let config = Self {
            database_url: required("DATABASE_URL")?,
            db_max_connections: var_or("DB_MAX_CONNECTIONS", "10")?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "attendance-tracker".to_string()),
            token_ttl: var_or("TOKEN_TTL", "604800")?, // default 7 days
            server_addr: format!("{}:{}", host, port),
            cors_origins,

            rate_login_per_min: var_or("RATE_LOGIN_PER_MIN", "60")?,
            rate_register_per_min: var_or("RATE_REGISTER_PER_MIN", "30")?,
            rate_protected_per_min: var_or("RATE_PROTECTED_PER_MIN", "1000")?,

            lock_idle_secs: var_or("LOCK_IDLE_SECS", "600")?,

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: var_or("LOG_LEVEL", "debug")?,
        };

        for (key, rate) in [
            ("RATE_LOGIN_PER_MIN", config.rate_login_per_min),
            ("RATE_REGISTER_PER_MIN", config.rate_register_per_min),
            ("RATE_PROTECTED_PER_MIN", config.rate_protected_per_min),
        ] {
            if rate == 0 {
                return Err(anyhow!("{} must be greater than zero", key));
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: "mysql://unused".to_string(),
        db_max_connections: 1,
        jwt_secret: "test-secret".to_string(),
        jwt_issuer: "attendance-tracker".to_string(),
        token_ttl: 604800,
        server_addr: "127.0.0.1:0".to_string(),
        cors_origins: Vec::new(),
        rate_login_per_min: 600,
        rate_register_per_min: 600,
        rate_protected_per_min: 6000,
        lock_idle_secs: 600,
        log_dir: "logs".to_string(),
        log_level: tracing::Level::DEBUG,
    }
}

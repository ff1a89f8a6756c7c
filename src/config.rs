//! Process-wide configuration, read once from the environment before the
//! server starts and passed around as an immutable value.

use std::time::Duration;

use crate::rate_limit::RateLimitConfig;

pub const DEFAULT_PORT: u16 = 8000;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Single allowed CORS origin, serialized as `scheme://host[:port]`.
    /// `None` rejects every cross-origin request.
    pub frontend_url: Option<String>,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    /// Base URL of the external identity service handling `/api/auth/*`.
    pub auth_service_url: Option<String>,
    pub enable_hsts: bool,
    pub rate_limit: RateLimitConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            frontend_url: None,
            database_url: None,
            database_max_connections: 5,
            auth_service_url: None,
            enable_hsts: false,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `PORT`: listening port (default: 8000)
    /// - `FRONTEND_URL`: allowed CORS origin
    /// - `DATABASE_URL`: Postgres connection string; in-memory store when unset
    /// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 5)
    /// - `AUTH_SERVICE_URL`: identity service receiving `/api/auth/*`
    /// - `ENABLE_HSTS`: `1`/`true` to send Strict-Transport-Security
    /// - `RATE_LIMIT_ENABLED`, `RATE_LIMIT_MAX`, `RATE_LIMIT_WINDOW_SECS`
    /// - `RATE_LIMIT_TRUST_PROXY`: key clients on forwarded headers (default: off)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an arbitrary variable source.
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(val) = var("PORT") {
            config.port = parse(&val, "PORT")?;
        }
        if let Some(val) = var("FRONTEND_URL") {
            config.frontend_url = Some(origin_of(&val)?);
        }
        config.database_url = var("DATABASE_URL");
        if let Some(val) = var("DATABASE_MAX_CONNECTIONS") {
            config.database_max_connections = parse(&val, "DATABASE_MAX_CONNECTIONS")?;
        }
        if let Some(val) = var("AUTH_SERVICE_URL") {
            url::Url::parse(&val).map_err(|_| invalid("AUTH_SERVICE_URL", &val))?;
            config.auth_service_url = Some(val.trim_end_matches('/').to_string());
        }
        if let Some(val) = var("ENABLE_HSTS") {
            config.enable_hsts = flag(&val);
        }
        if let Some(val) = var("RATE_LIMIT_ENABLED") {
            config.rate_limit.enabled = flag(&val);
        }
        if let Some(val) = var("RATE_LIMIT_MAX") {
            config.rate_limit.max_requests = parse(&val, "RATE_LIMIT_MAX")?;
        }
        if let Some(val) = var("RATE_LIMIT_WINDOW_SECS") {
            config.rate_limit.window = Duration::from_secs(parse(&val, "RATE_LIMIT_WINDOW_SECS")?);
        }
        if let Some(val) = var("RATE_LIMIT_TRUST_PROXY") {
            config.rate_limit.trust_proxy = flag(&val);
        }

        Ok(config)
    }
}

fn invalid(key: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid { key, value: value.to_string() }
}

fn parse<T: std::str::FromStr>(value: &str, key: &'static str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| invalid(key, value))
}

fn flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Browsers send `Origin` without path or trailing slash; match that form.
fn origin_of(value: &str) -> Result<String, ConfigError> {
    let url = url::Url::parse(value).map_err(|_| invalid("FRONTEND_URL", value))?;
    let origin = url.origin();
    if !origin.is_tuple() {
        return Err(invalid("FRONTEND_URL", value));
    }
    Ok(origin.ascii_serialization())
}

/*
 * Responsibility
 * - Read environment configuration once at startup (.env is honoured via dotenvy)
 * - Validate it; anything missing or malformed fails startup, never a request
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub store_timeout: Duration,

    pub jwt_secret: String,
    pub auth_issuer: String,
    pub access_token_ttl_seconds: u64,
    pub access_token_leeway_seconds: u64,

    pub valkey_url: Option<String>,

    pub otp_ttl_seconds: u64,
    pub otp_resend_seconds: u64,
    pub otp_sweep_interval: Duration,

    pub content_generator_url: Option<Url>,
    pub content_generator_api_key: Option<String>,
    pub notify_webhook_url: Option<Url>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Secrets and connection strings stay out of logs
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("store_backend", &self.store_backend)
            .field("store_timeout", &self.store_timeout)
            .field("auth_issuer", &self.auth_issuer)
            .field("valkey", &self.valkey_url.is_some())
            .field("content_generator", &self.content_generator_url.is_some())
            .field("notify_webhook", &self.notify_webhook_url.is_some())
            .finish_non_exhaustive()
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|_| ConfigError::Invalid(key))
        }
        _ => Ok(default),
    }
}

fn optional_url(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<Url>, ConfigError> {
    match lookup(key).filter(|s| !s.trim().is_empty()) {
        Some(raw) => Url::parse(raw.trim())
            .map(Some)
            .map_err(|_| ConfigError::Invalid(key)),
        None => Ok(None),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port: u16 = parse_or(&lookup, "PORT", 3000)?;
        let addr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(lookup("APP_ENV"));

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let store_backend = match lookup("STORE_BACKEND")
            .unwrap_or_else(|| "postgres".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "postgres" | "postgresql" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            _ => return Err(ConfigError::Invalid("STORE_BACKEND")),
        };

        let database_url = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty());
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let database_max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?;
        let store_timeout = Duration::from_secs(parse_or(&lookup, "STORE_TIMEOUT_SECONDS", 5)?);
        if store_timeout.is_zero() {
            return Err(ConfigError::Invalid("STORE_TIMEOUT_SECONDS"));
        }

        // Without the secret no request could ever be verified: refuse to start.
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let auth_issuer = lookup("AUTH_ISSUER")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "tutor-api".to_string());

        let access_token_ttl_seconds = parse_or(&lookup, "ACCESS_TOKEN_TTL_SECONDS", 3600)?;
        let access_token_leeway_seconds = parse_or(&lookup, "ACCESS_TOKEN_LEEWAY_SECONDS", 60)?;

        let valkey_url = lookup("VALKEY_URL").filter(|s| !s.trim().is_empty());

        let otp_ttl_seconds = parse_or(&lookup, "OTP_TTL_SECONDS", 600)?;
        let otp_resend_seconds = parse_or(&lookup, "OTP_RESEND_SECONDS", 60)?;
        let otp_sweep_interval =
            Duration::from_secs(parse_or(&lookup, "OTP_SWEEP_INTERVAL_SECONDS", 300)?);
        if otp_sweep_interval.is_zero() {
            return Err(ConfigError::Invalid("OTP_SWEEP_INTERVAL_SECONDS"));
        }

        let content_generator_url = optional_url(&lookup, "CONTENT_GENERATOR_URL")?;
        let content_generator_api_key =
            lookup("CONTENT_GENERATOR_API_KEY").filter(|s| !s.trim().is_empty());
        let notify_webhook_url = optional_url(&lookup, "NOTIFY_WEBHOOK_URL")?;

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            store_backend,
            database_url,
            database_max_connections,
            store_timeout,
            jwt_secret,
            auth_issuer,
            access_token_ttl_seconds,
            access_token_leeway_seconds,
            valkey_url,
            otp_ttl_seconds,
            otp_resend_seconds,
            otp_sweep_interval,
            content_generator_url,
            content_generator_api_key,
            notify_webhook_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn memory_backend_needs_only_the_secret() {
        let config =
            Config::from_vars(vars(&[("STORE_BACKEND", "memory"), ("JWT_SECRET", "s3cret")]))
                .unwrap();
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.addr.port(), 3000);
        assert_eq!(config.store_timeout, Duration::from_secs(5));
        assert_eq!(config.auth_issuer, "tutor-api");
        assert!(!config.app_env.is_production());
    }

    #[test]
    fn missing_secret_is_a_startup_error() {
        let err = Config::from_vars(vars(&[("STORE_BACKEND", "memory")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("JWT_SECRET"));
    }

    #[test]
    fn postgres_backend_requires_database_url() {
        let err = Config::from_vars(vars(&[("JWT_SECRET", "s3cret")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn rejects_malformed_numbers_and_urls() {
        let err = Config::from_vars(vars(&[
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", "s3cret"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Invalid("PORT"));

        let err = Config::from_vars(vars(&[
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", "s3cret"),
            ("NOTIFY_WEBHOOK_URL", "not a url"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Invalid("NOTIFY_WEBHOOK_URL"));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = Config::from_vars(vars(&[
            ("STORE_BACKEND", "postgres"),
            ("DATABASE_URL", "postgres://user:pw@db/app"),
            ("JWT_SECRET", "s3cret"),
        ]))
        .unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("pw@db"));
    }

    #[test]
    fn parses_cors_allowlist_and_env() {
        let config = Config::from_vars(vars(&[
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", "s3cret"),
            ("APP_ENV", "prod"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example, ,https://b.example"),
        ]))
        .unwrap();
        assert!(config.app_env.is_production());
        assert_eq!(
            config.cors_allowed_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }
}

use std::env;

/// AppConfig
///
/// Holds the application's entire configuration state. Immutable once loaded and
/// pulled into handlers and extractors through `FromRef<AppState>`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the dev bypass and log format.
    pub env: Env,
    // Address the HTTP listener binds to.
    pub bind_addr: String,
    // Postgres connection string. `None` in local mode selects the in-memory repository.
    pub db_url: Option<String>,
    pub db_max_connections: u32,
    // S3-compatible storage (MinIO locally).
    pub s3_endpoint: String,
    pub s3_region: String,
    pub s3_key: String,
    pub s3_secret: String,
    pub s3_bucket: String,
    // HMAC secret used to sign and verify access tokens.
    pub jwt_secret: String,
    pub access_token_ttl_mins: i64,
    pub refresh_token_ttl_days: i64,
    pub invitation_ttl_days: i64,
    // Upper bound for a single media upload.
    pub max_upload_bytes: i64,
    // Dashboard origin, used to build invitation links.
    pub app_base_url: String,
}

/// Env
///
/// Runtime context: local development conveniences versus hardened production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// ConfigError
///
/// Raised by [`AppConfig::load`] when the environment cannot produce a usable config.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";

impl Default for AppConfig {
    /// Safe, non-panicking values used by tests.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: "0.0.0.0:3000".to_string(),
            db_url: None,
            db_max_connections: 5,
            s3_endpoint: "http://localhost:9000".to_string(),
            s3_region: "us-east-1".to_string(),
            s3_key: "admin".to_string(),
            s3_secret: "password".to_string(),
            s3_bucket: "adpulse-test".to_string(),
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            access_token_ttl_mins: 15,
            refresh_token_ttl_days: 7,
            invitation_ttl_days: 7,
            max_upload_bytes: 100 * 1024 * 1024,
            app_base_url: "http://localhost:3001".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables. Production refuses to
    /// start without its secrets; local mode falls back to MinIO defaults and, when
    /// `DATABASE_URL` is absent, to the in-memory repository.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };
        let defaults = Self::default();

        let required = |name: &'static str, fallback: &str| -> Result<String, ConfigError> {
            match (env::var(name), &env) {
                (Ok(value), _) if !value.is_empty() => Ok(value),
                (_, Env::Production) => Err(ConfigError::Missing(name)),
                (_, Env::Local) => Ok(fallback.to_string()),
            }
        };

        let db_url = match (env::var("DATABASE_URL").ok(), &env) {
            (Some(url), _) if !url.is_empty() => Some(url),
            (_, Env::Production) => return Err(ConfigError::Missing("DATABASE_URL")),
            (_, Env::Local) => None,
        };

        Ok(Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            db_url,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            s3_endpoint: required("S3_ENDPOINT", &defaults.s3_endpoint)?,
            s3_region: env::var("S3_REGION").unwrap_or(defaults.s3_region),
            s3_key: required("S3_ACCESS_KEY", &defaults.s3_key)?,
            s3_secret: required("S3_SECRET_KEY", &defaults.s3_secret)?,
            s3_bucket: env::var("S3_BUCKET_NAME").unwrap_or_else(|_| "adpulse-media".to_string()),
            jwt_secret: required("JWT_SECRET", LOCAL_JWT_SECRET)?,
            access_token_ttl_mins: parse_var("JWT_ACCESS_TTL_MINS", defaults.access_token_ttl_mins)?,
            refresh_token_ttl_days: parse_var(
                "JWT_REFRESH_TTL_DAYS",
                defaults.refresh_token_ttl_days,
            )?,
            invitation_ttl_days: parse_var("INVITATION_TTL_DAYS", defaults.invitation_ttl_days)?,
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            app_base_url: env::var("APP_BASE_URL").unwrap_or(defaults.app_base_url),
            env,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}

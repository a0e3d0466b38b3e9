use adpulse::{
    AppConfig,
    config::{ConfigError, Env},
};
use serial_test::serial;
use std::{env, panic};

const CONFIG_VARS: [&str; 12] = [
    "APP_ENV",
    "DATABASE_URL",
    "DB_MAX_CONNECTIONS",
    "S3_ENDPOINT",
    "S3_ACCESS_KEY",
    "S3_SECRET_KEY",
    "S3_BUCKET_NAME",
    "JWT_SECRET",
    "JWT_ACCESS_TTL_MINS",
    "MAX_UPLOAD_BYTES",
    "APP_BASE_URL",
    "BIND_ADDR",
];

// --- Setup/Teardown Utilities ---

/// Runs `test` against a clean slate of config variables (plus `vars`), then
/// restores whatever the process had before.
fn run_with_env<T, R>(vars: &[(&str, &str)], test: T) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    let originals: Vec<(&str, Option<String>)> = CONFIG_VARS
        .iter()
        .map(|&var| (var, env::var(var).ok()))
        .collect();

    unsafe {
        for var in CONFIG_VARS {
            env::remove_var(var);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }
    }

    let result = panic::catch_unwind(test);

    for (key, original_value) in originals {
        unsafe {
            match original_value {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }

    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

const PRODUCTION: [(&str, &str); 6] = [
    ("APP_ENV", "production"),
    ("DATABASE_URL", "postgres://user:pass@db/adpulse"),
    ("S3_ENDPOINT", "https://s3.example.test"),
    ("S3_ACCESS_KEY", "prod-key"),
    ("S3_SECRET_KEY", "prod-secret"),
    ("JWT_SECRET", "a-long-production-signing-secret"),
];

fn production_without(missing: &str) -> Vec<(&'static str, &'static str)> {
    PRODUCTION
        .iter()
        .copied()
        .filter(|(key, _)| *key != missing)
        .collect()
}

// --- Tests ---

#[test]
#[serial]
fn test_production_loads_with_all_secrets() {
    let config = run_with_env(&PRODUCTION, AppConfig::load).unwrap();
    assert_eq!(config.env, Env::Production);
    assert_eq!(config.db_url.as_deref(), Some("postgres://user:pass@db/adpulse"));
    assert_eq!(config.jwt_secret, "a-long-production-signing-secret");
    assert_eq!(config.s3_bucket, "adpulse-media");
}

#[test]
#[serial]
fn test_production_fails_fast_on_missing_secrets() {
    for missing in ["JWT_SECRET", "S3_ACCESS_KEY", "S3_SECRET_KEY", "DATABASE_URL"] {
        let vars = production_without(missing);
        let result = run_with_env(&vars, AppConfig::load);
        assert!(
            matches!(result, Err(ConfigError::Missing(name)) if name == missing),
            "expected {missing} to be reported missing"
        );
    }
}

#[test]
#[serial]
fn test_production_treats_empty_secret_as_missing() {
    let mut vars = production_without("JWT_SECRET");
    vars.push(("JWT_SECRET", ""));
    let result = run_with_env(&vars, AppConfig::load);
    assert!(matches!(result, Err(ConfigError::Missing("JWT_SECRET"))));
}

#[test]
#[serial]
fn test_local_env_defaults() {
    let config = run_with_env(&[("APP_ENV", "local")], AppConfig::load).unwrap();
    let defaults = AppConfig::default();

    assert_eq!(config.env, Env::Local);
    assert!(config.db_url.is_none());
    assert_eq!(config.s3_endpoint, defaults.s3_endpoint);
    assert_eq!(config.jwt_secret, defaults.jwt_secret);
    assert_eq!(config.access_token_ttl_mins, 15);
    assert_eq!(config.refresh_token_ttl_days, 7);
    assert_eq!(config.bind_addr, "0.0.0.0:3000");
}

#[test]
#[serial]
fn test_unset_app_env_means_local() {
    let config = run_with_env(&[], AppConfig::load).unwrap();
    assert_eq!(config.env, Env::Local);
}

#[test]
#[serial]
fn test_overrides_are_parsed() {
    let config = run_with_env(
        &[
            ("DB_MAX_CONNECTIONS", "12"),
            ("JWT_ACCESS_TTL_MINS", "5"),
            ("MAX_UPLOAD_BYTES", "1024"),
            ("APP_BASE_URL", "https://app.adpulse.test"),
        ],
        AppConfig::load,
    )
    .unwrap();
    assert_eq!(config.db_max_connections, 12);
    assert_eq!(config.access_token_ttl_mins, 5);
    assert_eq!(config.max_upload_bytes, 1024);
    assert_eq!(config.app_base_url, "https://app.adpulse.test");
}

#[test]
#[serial]
fn test_invalid_number_is_rejected() {
    let result = run_with_env(&[("DB_MAX_CONNECTIONS", "lots")], AppConfig::load);
    match result {
        Err(ConfigError::Invalid { name, value }) => {
            assert_eq!(name, "DB_MAX_CONNECTIONS");
            assert_eq!(value, "lots");
        }
        other => panic!("expected an invalid value error, got {other:?}"),
    }
}

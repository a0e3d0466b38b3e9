use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Placeholder returned in place of secret config values.
pub const REDACTED: &str = "********";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "integration_provider", rename_all = "snake_case")]
#[ts(export)]
pub enum IntegrationProvider {
    #[default]
    GoogleAds,
    MetaAds,
    LinkedinAds,
    TiktokAds,
    Hubspot,
    Salesforce,
    Slack,
    Mailchimp,
}

impl IntegrationProvider {
    pub fn required_keys(self) -> &'static [&'static str] {
        match self {
            IntegrationProvider::GoogleAds => &["customer_id", "developer_token"],
            IntegrationProvider::MetaAds => &["ad_account_id", "access_token"],
            IntegrationProvider::LinkedinAds => &["account_id", "access_token"],
            IntegrationProvider::TiktokAds => &["advertiser_id", "access_token"],
            IntegrationProvider::Hubspot => &["api_key"],
            IntegrationProvider::Salesforce => &["instance_url", "access_token"],
            IntegrationProvider::Slack => &["webhook_url"],
            IntegrationProvider::Mailchimp => &["api_key", "server_prefix"],
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            IntegrationProvider::GoogleAds => "Google Ads",
            IntegrationProvider::MetaAds => "Meta Ads",
            IntegrationProvider::LinkedinAds => "LinkedIn Ads",
            IntegrationProvider::TiktokAds => "TikTok Ads",
            IntegrationProvider::Hubspot => "HubSpot",
            IntegrationProvider::Salesforce => "Salesforce",
            IntegrationProvider::Slack => "Slack",
            IntegrationProvider::Mailchimp => "Mailchimp",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "integration_status", rename_all = "snake_case")]
#[ts(export)]
pub enum IntegrationStatus {
    #[default]
    Connected,
    Error,
    Disconnected,
}

/// Integration
///
/// A connection to a third-party platform. `config` is stored as JSONB and is
/// always passed through [`Integration::redacted`] before leaving the server.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Integration {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub provider: IntegrationProvider,
    pub display_name: String,
    pub status: IntegrationStatus,
    #[ts(type = "Record<string, unknown>")]
    pub config: Value,
    pub connected_by: Uuid,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Integration {
    pub fn redacted(mut self) -> Self {
        self.config = redact_config(&self.config);
        self
    }
}

pub fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key == "webhook_url"
        || ["token", "secret", "key", "password"]
            .iter()
            .any(|marker| key.contains(marker))
}

/// Masks every secret-looking key, at any depth.
pub fn redact_config(config: &Value) -> Value {
    match config {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let value = if is_secret_key(k) {
                        Value::String(REDACTED.to_string())
                    } else {
                        redact_config(v)
                    };
                    (k.clone(), value)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_config).collect()),
        other => other.clone(),
    }
}

/// Checks that `config` is an object carrying every key `provider` requires.
pub fn validate_config(provider: IntegrationProvider, config: &Value) -> AppResult<()> {
    let map = config
        .as_object()
        .ok_or_else(|| AppError::field("config", "must be a JSON object"))?;

    let missing: Vec<&str> = provider
        .required_keys()
        .iter()
        .copied()
        .filter(|key| {
            !map.get(*key)
                .and_then(Value::as_str)
                .is_some_and(|v| !v.trim().is_empty())
        })
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::field(
            "config",
            format!("missing required keys: {}", missing.join(", ")),
        ))
    }
}

/// Merges an incoming partial config over the stored one. A value equal to the
/// redaction placeholder keeps the stored secret.
pub fn merge_config(stored: &Value, incoming: &Value) -> AppResult<Value> {
    let incoming = incoming
        .as_object()
        .ok_or_else(|| AppError::field("config", "must be a JSON object"))?;
    let stored = stored.as_object().cloned().unwrap_or_default();
    Ok(Value::Object(merge_objects(stored, incoming)))
}

fn merge_objects(mut merged: Map<String, Value>, incoming: &Map<String, Value>) -> Map<String, Value> {
    for (key, value) in incoming {
        if value.as_str() == Some(REDACTED) {
            continue;
        }
        match (merged.remove(key), value) {
            (_, Value::Null) => {}
            (Some(Value::Object(current)), Value::Object(nested)) => {
                merged.insert(key.clone(), Value::Object(merge_objects(current, nested)));
            }
            _ => {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    merged
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct CreateIntegrationRequest {
    pub provider: IntegrationProvider,
    #[validate(
        custom(function = "crate::models::not_blank"),
        length(min = 1, max = 100, message = "must be 1-100 characters")
    )]
    pub display_name: Option<String>,
    #[ts(type = "Record<string, unknown>")]
    pub config: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateIntegrationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(
        custom(function = "crate::models::not_blank"),
        length(min = 1, max = 100, message = "must be 1-100 characters")
    )]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "Record<string, unknown> | null")]
    pub config: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<IntegrationStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn secrets_are_redacted() {
        let config = json!({ "ad_account_id": "act_1", "access_token": "EAAB", "webhook_url": "https://hooks" });
        let redacted = redact_config(&config);
        assert_eq!(redacted["ad_account_id"], "act_1");
        assert_eq!(redacted["access_token"], REDACTED);
        assert_eq!(redacted["webhook_url"], REDACTED);
    }

    #[test]
    fn missing_required_keys_are_reported() {
        let err = validate_config(IntegrationProvider::Mailchimp, &json!({ "api_key": "k" }))
            .unwrap_err();
        match err {
            AppError::Validation(fields) => {
                assert!(fields["config"][0].contains("server_prefix"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn blank_values_do_not_satisfy_required_keys() {
        let config = json!({ "api_key": "  " });
        assert!(validate_config(IntegrationProvider::Hubspot, &config).is_err());
    }

    #[test]
    fn merge_keeps_secret_behind_placeholder() {
        let stored = json!({ "api_key": "real", "server_prefix": "us1" });
        let incoming = json!({ "api_key": REDACTED, "server_prefix": "us6" });
        let merged = merge_config(&stored, &incoming).unwrap();
        assert_eq!(merged["api_key"], "real");
        assert_eq!(merged["server_prefix"], "us6");
    }

    #[test]
    fn nested_secrets_are_redacted() {
        let config = json!({
            "api_key": "k",
            "oauth": { "refresh_token": "rt", "scope": "crm" },
            "accounts": [{ "id": "a1", "client_secret": "cs" }]
        });
        let redacted = redact_config(&config);
        assert_eq!(redacted["oauth"]["refresh_token"], REDACTED);
        assert_eq!(redacted["oauth"]["scope"], "crm");
        assert_eq!(redacted["accounts"][0]["client_secret"], REDACTED);
        assert_eq!(redacted["accounts"][0]["id"], "a1");
        assert!(!redacted.to_string().contains("\"rt\""));
    }

    #[test]
    fn merge_keeps_nested_secret_behind_placeholder() {
        let stored = json!({ "oauth": { "refresh_token": "rt", "scope": "crm" } });
        let incoming = json!({ "oauth": { "refresh_token": REDACTED, "scope": "crm.read" } });
        let merged = merge_config(&stored, &incoming).unwrap();
        assert_eq!(merged["oauth"]["refresh_token"], "rt");
        assert_eq!(merged["oauth"]["scope"], "crm.read");
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "ad_format", rename_all = "snake_case")]
#[ts(export)]
pub enum AdFormat {
    #[default]
    Image,
    Video,
    Carousel,
    Text,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "ad_status", rename_all = "snake_case")]
#[ts(export)]
pub enum AdStatus {
    #[default]
    Draft,
    Active,
    Paused,
}

/// Ad
///
/// A creative belonging to a campaign. `media_file_id` points into the media library.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Ad {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub campaign_id: Uuid,
    pub name: String,
    pub format: AdFormat,
    pub headline: String,
    pub body: Option<String>,
    pub call_to_action: Option<String>,
    pub destination_url: String,
    pub media_file_id: Option<Uuid>,
    pub status: AdStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateAdRequest {
    #[validate(
        custom(function = "crate::models::not_blank"),
        length(min = 1, max = 120, message = "must be 1-120 characters")
    )]
    pub name: String,
    #[serde(default)]
    pub format: AdFormat,
    #[validate(
        custom(function = "crate::models::not_blank"),
        length(min = 1, max = 150, message = "must be 1-150 characters")
    )]
    pub headline: String,
    #[validate(length(max = 1000, message = "must be at most 1000 characters"))]
    pub body: Option<String>,
    #[validate(length(max = 40, message = "must be at most 40 characters"))]
    pub call_to_action: Option<String>,
    #[validate(url(message = "must be a valid URL"))]
    pub destination_url: String,
    pub media_file_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateAdRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(
        custom(function = "crate::models::not_blank"),
        length(min = 1, max = 120, message = "must be 1-120 characters")
    )]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<AdFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(
        custom(function = "crate::models::not_blank"),
        length(min = 1, max = 150, message = "must be 1-150 characters")
    )]
    pub headline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1000, message = "must be at most 1000 characters"))]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 40, message = "must be at most 40 characters"))]
    pub call_to_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(url(message = "must be a valid URL"))]
    pub destination_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_file_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AdStatus>,
}

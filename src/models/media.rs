use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// MediaFile
///
/// A registered object in the media library. The bytes live in object storage
/// under `storage_key`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct MediaFile {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub uploaded_by: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
}

/// MediaFileResponse
///
/// A media file plus a short-lived download URL.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MediaFileResponse {
    #[serde(flatten)]
    pub file: MediaFile,
    pub kind: MediaKind,
    pub download_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum MediaKind {
    Image,
    Video,
    Document,
}

impl MediaKind {
    /// Classifies a MIME type. `None` means uploads of this type are refused.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let content_type = content_type.trim().to_ascii_lowercase();
        if content_type.starts_with("image/") {
            Some(MediaKind::Image)
        } else if content_type.starts_with("video/") {
            Some(MediaKind::Video)
        } else if content_type == "application/pdf" {
            Some(MediaKind::Document)
        } else {
            None
        }
    }
}

/// Storage prefix every object of an organization lives under.
pub fn organization_prefix(organization_id: Uuid) -> String {
    format!("orgs/{organization_id}/")
}

/// PresignedUrlRequest
///
/// Input for POST /files/presigned.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Validate, Default)]
#[ts(export)]
pub struct PresignedUrlRequest {
    /// The original filename, used to derive the file extension.
    #[schema(example = "spring_banner.png")]
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    pub filename: String,
    /// The MIME type the upload is constrained to.
    #[schema(example = "image/png")]
    pub file_type: String,
    pub size_bytes: i64,
}

/// PresignedUrlResponse
///
/// The time-limited PUT URL and the object key to register afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlResponse {
    pub upload_url: String,
    pub resource_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct RegisterMediaRequest {
    pub resource_key: String,
    #[validate(
        custom(function = "crate::models::not_blank"),
        length(min = 1, max = 255, message = "must be 1-255 characters")
    )]
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
}

#[derive(Debug, Clone, Deserialize, IntoParams, Default)]
pub struct MediaFilter {
    pub kind: Option<MediaKind>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types_are_classified() {
        assert_eq!(MediaKind::from_content_type("image/png"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_content_type("Video/MP4"), Some(MediaKind::Video));
        assert_eq!(
            MediaKind::from_content_type("application/pdf"),
            Some(MediaKind::Document)
        );
        assert_eq!(MediaKind::from_content_type("application/x-msdownload"), None);
    }
}

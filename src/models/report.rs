use chrono::{DateTime, NaiveDate, Utc};
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
#[sqlx(type_name = "report_format", rename_all = "snake_case")]
#[ts(export)]
pub enum ReportFormat {
    #[default]
    Csv,
    Json,
}

impl ReportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ReportFormat::Csv => "text/csv; charset=utf-8",
            ReportFormat::Json => "application/json",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Json => "json",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "report_status", rename_all = "snake_case")]
#[ts(export)]
pub enum ReportStatus {
    #[default]
    Ready,
    Failed,
}

/// Report
///
/// A generated export. `content` holds the rendered artifact and is only sent by
/// the download endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Report {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub created_by: Uuid,
    pub name: String,
    pub format: ReportFormat,
    pub status: ReportStatus,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub campaign_ids: Vec<Uuid>,
    pub row_count: i32,
    #[serde(skip)]
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Report {
    /// Filename offered in `Content-Disposition`.
    pub fn file_name(&self) -> String {
        let stem: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!(
            "{}_{}_{}.{}",
            stem.trim_matches('_'),
            self.date_from.format("%Y%m%d"),
            self.date_to.format("%Y%m%d"),
            self.format.extension()
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateReportRequest {
    #[validate(
        custom(function = "crate::models::not_blank"),
        length(min = 1, max = 120, message = "must be 1-120 characters")
    )]
    pub name: String,
    #[serde(default)]
    pub format: ReportFormat,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    /// Empty or absent means every campaign in the organization.
    #[serde(default)]
    pub campaign_ids: Vec<Uuid>,
}

/// ReportRow
///
/// One exported line: a campaign's numbers on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub date: NaiveDate,
    pub campaign_id: Uuid,
    pub campaign_name: String,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub spend: String,
    pub ctr: f64,
    pub cpc: String,
    pub conversion_rate: f64,
}

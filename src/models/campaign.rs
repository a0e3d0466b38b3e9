use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "campaign_objective", rename_all = "snake_case")]
#[ts(export)]
pub enum CampaignObjective {
    #[default]
    Awareness,
    Traffic,
    Engagement,
    Leads,
    Sales,
}

/// CampaignStatus
///
/// Lifecycle of a campaign. Transitions are driven by dashboard buttons and by
/// budget exhaustion during metric ingestion.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    TS,
    ToSchema,
    sqlx::Type,
    Default,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "campaign_status", rename_all = "snake_case")]
#[ts(export)]
pub enum CampaignStatus {
    #[default]
    Draft,
    Active,
    Paused,
    Completed,
    Archived,
}

impl CampaignStatus {
    pub const ALL: [CampaignStatus; 5] = [
        CampaignStatus::Draft,
        CampaignStatus::Active,
        CampaignStatus::Paused,
        CampaignStatus::Completed,
        CampaignStatus::Archived,
    ];

    pub fn can_transition_to(self, next: CampaignStatus) -> bool {
        use CampaignStatus::*;
        matches!(
            (self, next),
            (Draft, Active)
                | (Draft, Archived)
                | (Active, Paused)
                | (Active, Completed)
                | (Paused, Active)
                | (Paused, Completed)
                | (Completed, Archived)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Active => "active",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Archived => "archived",
        }
    }
}

/// Campaign
///
/// A row from the `campaigns` table. Counters are cumulative totals maintained by
/// metric ingestion; the per-day breakdown lives in `campaign_metrics`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Campaign {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub created_by: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub objective: CampaignObjective,
    pub status: CampaignStatus,
    pub budget_cents: i64,
    pub spent_cents: i64,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    pub fn remaining_budget_cents(&self) -> i64 {
        (self.budget_cents - self.spent_cents).max(0)
    }
}

// --- Request Payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateCampaignRequest {
    #[validate(
        custom(function = "crate::models::not_blank"),
        length(min = 1, max = 120, message = "must be 1-120 characters")
    )]
    pub name: String,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub description: Option<String>,
    #[serde(default)]
    pub objective: CampaignObjective,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub budget_cents: i64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl CreateCampaignRequest {
    pub fn check(&self) -> AppResult<()> {
        self.validate()?;
        validate_schedule(self.start_date, self.end_date)
    }
}

/// UpdateCampaignRequest
///
/// Partial update. Only `Some` fields are written.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateCampaignRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(
        custom(function = "crate::models::not_blank"),
        length(min = 1, max = 120, message = "must be 1-120 characters")
    )]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective: Option<CampaignObjective>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, message = "must not be negative"))]
    pub budget_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl UpdateCampaignRequest {
    /// Validates the patch against the stored campaign it will be applied to.
    pub fn check_against(&self, current: &Campaign) -> AppResult<()> {
        self.validate()?;
        if let Some(budget) = self.budget_cents {
            if budget < current.spent_cents {
                return Err(AppError::field(
                    "budget_cents",
                    format!(
                        "must be at least the amount already spent ({})",
                        current.spent_cents
                    ),
                ));
            }
        }
        validate_schedule(
            self.start_date.or(current.start_date),
            self.end_date.or(current.end_date),
        )
    }
}

pub fn validate_schedule(start: Option<NaiveDate>, end: Option<NaiveDate>) -> AppResult<()> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => {
            Err(AppError::field("end_date", "must not be before start_date"))
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ChangeStatusRequest {
    pub status: CampaignStatus,
}

/// CampaignFilter
///
/// Query parameters for GET /campaigns.
#[derive(Debug, Clone, Deserialize, IntoParams, Default)]
pub struct CampaignFilter {
    pub status: Option<CampaignStatus>,
    /// Case-insensitive match on name or description.
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

impl CampaignFilter {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.per_page()
    }

    /// The search term, trimmed, or `None` when blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CampaignPage {
    pub items: Vec<Campaign>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

/// RecordMetricsRequest
///
/// One day's delivery numbers for a campaign, as reported by an ad network sync.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct RecordMetricsRequest {
    pub date: NaiveDate,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub impressions: i64,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub clicks: i64,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub conversions: i64,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub spend_cents: i64,
}

impl RecordMetricsRequest {
    pub fn check(&self) -> AppResult<()> {
        self.validate()?;
        if self.clicks > self.impressions {
            return Err(AppError::field("clicks", "must not exceed impressions"));
        }
        if self.conversions > self.clicks {
            return Err(AppError::field("conversions", "must not exceed clicks"));
        }
        Ok(())
    }

    /// Adds this report to `(impressions, clicks, conversions, spend_cents)` totals.
    /// A sum past `i64::MAX` is a 422 on the offending field.
    pub fn add_to(&self, totals: (i64, i64, i64, i64)) -> AppResult<(i64, i64, i64, i64)> {
        let add = |total: i64, delta: i64, field: &str| {
            total
                .checked_add(delta)
                .ok_or_else(|| AppError::field(field, "would overflow the recorded total"))
        };
        Ok((
            add(totals.0, self.impressions, "impressions")?,
            add(totals.1, self.clicks, "clicks")?,
            add(totals.2, self.conversions, "conversions")?,
            add(totals.3, self.spend_cents, "spend_cents")?,
        ))
    }
}

/// DailyMetric
///
/// One row of `campaign_metrics`, unique per (campaign, date).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct DailyMetric {
    pub campaign_id: Uuid,
    pub date: NaiveDate,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub spend_cents: i64,
}

/// The result of a metric ingestion, as written by the repository.
#[derive(Debug, Clone)]
pub struct MetricsOutcome {
    pub campaign: Campaign,
    /// True when this ingestion crossed the budget and paused the campaign.
    pub budget_exhausted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use CampaignStatus::*;

    #[test]
    fn allowed_transitions() {
        assert!(Draft.can_transition_to(Active));
        assert!(Active.can_transition_to(Paused));
        assert!(Paused.can_transition_to(Active));
        assert!(Completed.can_transition_to(Archived));
    }

    #[test]
    fn rejected_transitions() {
        assert!(!Draft.can_transition_to(Paused));
        assert!(!Completed.can_transition_to(Active));
        assert!(!Archived.can_transition_to(Draft));
        assert!(!Active.can_transition_to(Active));
        assert!(!Active.can_transition_to(Archived));
    }

    #[test]
    fn budget_may_not_drop_below_spend() {
        let current = Campaign {
            budget_cents: 10_000,
            spent_cents: 4_000,
            ..Campaign::default()
        };
        let patch = UpdateCampaignRequest {
            budget_cents: Some(3_999),
            ..Default::default()
        };
        let err = patch.check_against(&current).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let patch = UpdateCampaignRequest {
            budget_cents: Some(4_000),
            ..Default::default()
        };
        assert!(patch.check_against(&current).is_ok());
    }

    #[test]
    fn patched_end_date_checked_against_stored_start() {
        let current = Campaign {
            start_date: NaiveDate::from_ymd_opt(2026, 5, 10),
            ..Campaign::default()
        };
        let patch = UpdateCampaignRequest {
            end_date: NaiveDate::from_ymd_opt(2026, 5, 1),
            ..Default::default()
        };
        assert!(patch.check_against(&current).is_err());
    }

    #[test]
    fn metrics_funnel_must_narrow() {
        let req = RecordMetricsRequest {
            date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            impressions: 10,
            clicks: 11,
            conversions: 0,
            spend_cents: 0,
        };
        assert!(req.check().is_err());
    }

    #[test]
    fn pagination_is_clamped() {
        let filter = CampaignFilter {
            page: Some(0),
            per_page: Some(1000),
            ..Default::default()
        };
        assert_eq!(filter.page(), 1);
        assert_eq!(filter.per_page(), MAX_PAGE_SIZE);
        assert_eq!(filter.offset(), 0);
    }
}

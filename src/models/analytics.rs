use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::campaign::{Campaign, CampaignStatus};

/// DateRangeQuery
///
/// `from`/`to` bounds (inclusive). Both default relative to today; see
/// `services::analytics::resolve_range`.
#[derive(Debug, Clone, Deserialize, IntoParams, Default)]
pub struct DateRangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// MetricTotals
///
/// Summed counters plus derived rates. Rates are zero when their denominator is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MetricTotals {
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub spend_cents: i64,
    /// Click-through rate, percent.
    pub ctr: f64,
    pub cpc_cents: i64,
    /// Conversions per click, percent.
    pub conversion_rate: f64,
    pub cpa_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub spend_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct StatusCount {
    pub status: CampaignStatus,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CampaignPerformance {
    pub campaign_id: Uuid,
    pub name: String,
    pub status: CampaignStatus,
    pub totals: MetricTotals,
}

/// DashboardAnalytics
///
/// Output of GET /analytics/dashboard, shaped for the chart widgets.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DashboardAnalytics {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub totals: MetricTotals,
    pub daily: Vec<DailyPoint>,
    pub campaigns_by_status: Vec<StatusCount>,
    pub top_campaigns: Vec<CampaignPerformance>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CampaignAnalytics {
    pub campaign: Campaign,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub totals: MetricTotals,
    pub daily: Vec<DailyPoint>,
}

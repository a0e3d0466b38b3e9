use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{CampaignAnalytics, DashboardAnalytics, DateRangeQuery},
    services::analytics,
};

/// get_dashboard
///
/// [Authenticated Route] Organization-wide totals, a zero-filled daily series, the
/// status breakdown and the top campaigns by clicks. Defaults to the last 30 days.
#[utoipa::path(
    get,
    path = "/analytics/dashboard",
    tag = "analytics",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Dashboard analytics", body = DashboardAnalytics),
        (status = 400, description = "Invalid date range")
    )
)]
pub async fn get_dashboard(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(range): Query<DateRangeQuery>,
) -> AppResult<Json<DashboardAnalytics>> {
    let (from, to) = analytics::resolve_range(&range, Utc::now().date_naive())?;

    let campaigns = state.repo.all_campaigns(auth.organization_id).await?;
    let rows = state
        .repo
        .get_metrics(auth.organization_id, None, from, to)
        .await?;

    Ok(Json(analytics::dashboard(&campaigns, &rows, from, to)))
}

#[utoipa::path(
    get,
    path = "/analytics/campaigns/{id}",
    tag = "analytics",
    params(("id" = Uuid, Path, description = "Campaign ID"), DateRangeQuery),
    responses(
        (status = 200, description = "Campaign analytics", body = CampaignAnalytics),
        (status = 400, description = "Invalid date range"),
        (status = 404, description = "Campaign not found")
    )
)]
pub async fn get_campaign_analytics(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(range): Query<DateRangeQuery>,
) -> AppResult<Json<CampaignAnalytics>> {
    let (from, to) = analytics::resolve_range(&range, Utc::now().date_naive())?;

    let campaign = state
        .repo
        .get_campaign(auth.organization_id, id)
        .await?
        .ok_or(AppError::NotFound("Campaign"))?;
    let rows = state
        .repo
        .get_metrics(auth.organization_id, Some(std::slice::from_ref(&id)), from, to)
        .await?;

    Ok(Json(analytics::campaign_analytics(campaign, &rows, from, to)))
}

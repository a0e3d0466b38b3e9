use axum::{Json, extract::State};
use chrono::Utc;

use crate::{
    AppState,
    auth::AuthUser,
    error::AppResult,
    models::{AdminDashboardStats, Role},
};

/// get_admin_stats
///
/// [Admin Route] Headline counts for the organization's admin dashboard. Scoped to the
/// caller's organization like every other route.
#[utoipa::path(
    get,
    path = "/admin/stats",
    tag = "admin",
    responses(
        (status = 200, description = "Organization statistics", body = AdminDashboardStats),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn get_admin_stats(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<AdminDashboardStats>> {
    auth.require(Role::Admin)?;
    let stats = state
        .repo
        .get_stats(auth.organization_id, Utc::now())
        .await?;
    Ok(Json(stats))
}

use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Nested under `/admin` behind the same auth middleware as the authenticated
/// routes. The admin+ role check happens in each handler.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/stats
        // Headline counts for the organization's admin dashboard.
        .route("/stats", get(handlers::admin::get_admin_stats))
}

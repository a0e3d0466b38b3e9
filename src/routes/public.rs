use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a token: health, the sign-in flows, the plan
/// catalogue and the invitation preview shown on the accept page.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
        // --- Identity ---
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        // Rotation: the presented refresh token is revoked as the new pair is issued.
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route(
            "/auth/accept-invitation",
            post(handlers::auth::accept_invitation),
        )
        // GET /subscriptions/plans
        // Pricing page data.
        .route(
            "/subscriptions/plans",
            get(handlers::subscriptions::list_plans),
        )
        // GET /team/invitations/{id}/preview
        // The segment carries the invitation token. It shares the `{id}` name with
        // DELETE /team/invitations/{id} because the router requires one name per position.
        .route(
            "/team/invitations/{id}/preview",
            get(handlers::team::preview_invitation),
        )
}

use crate::{
    AppState,
    handlers::{
        ads, analytics, auth, campaigns, files, integrations, notifications, onboarding, reports,
        subscriptions, team, users,
    },
};
use axum::{
    Router,
    routing::{get, patch, post, put},
};

/// Authenticated Router Module
///
/// Every route here sits behind the auth middleware, so handlers always receive a
/// resolved `AuthUser`. Role requirements (member+, admin+, owner) are checked
/// inside each handler, and every query is scoped to the caller's organization.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Session & Profile ---
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/users/me", get(users::get_me).put(users::update_me))
        .route("/users/me/password", put(users::change_password))
        // --- Campaigns ---
        .route(
            "/campaigns",
            get(campaigns::list_campaigns).post(campaigns::create_campaign),
        )
        .route(
            "/campaigns/{id}",
            get(campaigns::get_campaign)
                .put(campaigns::update_campaign)
                .delete(campaigns::delete_campaign),
        )
        .route("/campaigns/{id}/status", post(campaigns::change_status))
        // Metric ingestion may auto-pause the campaign when its budget runs out.
        .route("/campaigns/{id}/metrics", post(campaigns::record_metrics))
        // --- Ads ---
        .route(
            "/campaigns/{id}/ads",
            get(ads::list_ads).post(ads::create_ad),
        )
        .route(
            "/ads/{id}",
            get(ads::get_ad).put(ads::update_ad).delete(ads::delete_ad),
        )
        // --- Analytics ---
        .route("/analytics/dashboard", get(analytics::get_dashboard))
        .route(
            "/analytics/campaigns/{id}",
            get(analytics::get_campaign_analytics),
        )
        // --- Billing ---
        .route("/subscriptions/current", get(subscriptions::get_current))
        .route("/subscriptions", put(subscriptions::change_plan))
        .route("/subscriptions/cancel", post(subscriptions::cancel_subscription))
        .route("/subscriptions/resume", post(subscriptions::resume_subscription))
        // --- Reports ---
        .route(
            "/reports",
            get(reports::list_reports).post(reports::create_report),
        )
        .route(
            "/reports/{id}",
            get(reports::get_report).delete(reports::delete_report),
        )
        .route("/reports/{id}/download", get(reports::download_report))
        // --- Integrations ---
        // Responses never carry secret config values.
        .route(
            "/integrations",
            get(integrations::list_integrations).post(integrations::create_integration),
        )
        .route(
            "/integrations/{id}",
            get(integrations::get_integration)
                .put(integrations::update_integration)
                .delete(integrations::delete_integration),
        )
        // --- Team ---
        .route("/team/members", get(team::list_members))
        .route(
            "/team/members/{id}",
            axum::routing::delete(team::remove_member),
        )
        .route("/team/members/{id}/role", put(team::update_member_role))
        .route(
            "/team/invitations",
            get(team::list_invitations).post(team::create_invitation),
        )
        .route(
            "/team/invitations/{id}",
            axum::routing::delete(team::delete_invitation),
        )
        // --- Notifications ---
        .route("/notifications", get(notifications::get_notifications))
        .route(
            "/notifications/unread-count",
            get(notifications::get_unread_count),
        )
        .route(
            "/notifications/read-all",
            post(notifications::mark_all_read),
        )
        .route(
            "/notifications/{id}/read",
            patch(notifications::mark_notification_read),
        )
        // --- Media Library ---
        // Uploads go straight to object storage through a presigned URL; the API
        // only registers the resulting key.
        .route("/files/presigned", post(files::get_presigned_url))
        .route("/files", get(files::list_media).post(files::register_media))
        .route("/files/{id}", axum::routing::delete(files::delete_media))
        // --- Onboarding ---
        .route("/onboarding", get(onboarding::get_onboarding))
        .route("/onboarding/steps/{step}", post(onboarding::complete_step))
}

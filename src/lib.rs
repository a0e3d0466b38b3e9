use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod services;
pub mod storage;

// Routing is segregated by access level (public, authenticated, admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// The OpenAPI document served at `/api-docs/openapi.json`, assembled from the
/// `#[utoipa::path]` handlers and `ToSchema` types below.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register, handlers::auth::login, handlers::auth::refresh,
        handlers::auth::logout, handlers::auth::me, handlers::auth::accept_invitation,
        handlers::users::get_me, handlers::users::update_me, handlers::users::change_password,
        handlers::campaigns::list_campaigns, handlers::campaigns::create_campaign,
        handlers::campaigns::get_campaign, handlers::campaigns::update_campaign,
        handlers::campaigns::delete_campaign, handlers::campaigns::change_status,
        handlers::campaigns::record_metrics,
        handlers::ads::list_ads, handlers::ads::create_ad, handlers::ads::get_ad,
        handlers::ads::update_ad, handlers::ads::delete_ad,
        handlers::analytics::get_dashboard, handlers::analytics::get_campaign_analytics,
        handlers::subscriptions::list_plans, handlers::subscriptions::get_current,
        handlers::subscriptions::change_plan, handlers::subscriptions::cancel_subscription,
        handlers::subscriptions::resume_subscription,
        handlers::reports::create_report, handlers::reports::list_reports,
        handlers::reports::get_report, handlers::reports::delete_report,
        handlers::reports::download_report,
        handlers::integrations::list_integrations, handlers::integrations::get_integration,
        handlers::integrations::create_integration, handlers::integrations::update_integration,
        handlers::integrations::delete_integration,
        handlers::team::list_members, handlers::team::update_member_role,
        handlers::team::remove_member, handlers::team::list_invitations,
        handlers::team::create_invitation, handlers::team::delete_invitation,
        handlers::team::preview_invitation,
        handlers::notifications::get_notifications, handlers::notifications::get_unread_count,
        handlers::notifications::mark_notification_read, handlers::notifications::mark_all_read,
        handlers::files::get_presigned_url, handlers::files::register_media,
        handlers::files::list_media, handlers::files::delete_media,
        handlers::onboarding::get_onboarding, handlers::onboarding::complete_step,
        handlers::admin::get_admin_stats,
    ),
    components(
        schemas(
            models::RegisterRequest, models::LoginRequest, models::RefreshRequest,
            models::AcceptInvitationRequest, models::AuthResponse, models::UserProfile,
            models::UpdateProfileRequest, models::ChangePasswordRequest, models::Role,
            models::Campaign, models::CampaignObjective, models::CampaignStatus,
            models::CampaignPage, models::CreateCampaignRequest, models::UpdateCampaignRequest,
            models::ChangeStatusRequest, models::RecordMetricsRequest, models::DailyMetric,
            models::Ad, models::AdFormat, models::AdStatus, models::CreateAdRequest,
            models::UpdateAdRequest,
            models::MetricTotals, models::DailyPoint, models::StatusCount,
            models::CampaignPerformance, models::DashboardAnalytics, models::CampaignAnalytics,
            models::Plan, models::PlanLimits, models::PlanInfo, models::Subscription,
            models::SubscriptionStatus, models::Usage, models::SubscriptionOverview,
            models::ChangePlanRequest,
            models::Report, models::ReportFormat, models::ReportStatus, models::CreateReportRequest,
            models::Integration, models::IntegrationProvider, models::IntegrationStatus,
            models::CreateIntegrationRequest, models::UpdateIntegrationRequest,
            models::Invitation, models::CreateInvitationRequest, models::InvitationCreated,
            models::InvitationPreview, models::TeamMember, models::UpdateRoleRequest,
            models::Notification, models::NotificationKind, models::UnreadCount,
            models::MarkAllReadResponse,
            models::MediaFile, models::MediaFileResponse, models::MediaKind,
            models::PresignedUrlRequest, models::PresignedUrlResponse,
            models::RegisterMediaRequest,
            models::OnboardingState, models::OnboardingStep, models::AdminDashboardStats,
        )
    ),
    tags(
        (name = "adpulse", description = "AdPulse campaign management API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container for the application's services and configuration,
/// cloned cheaply into every request.
#[derive(Clone)]
pub struct AppState {
    /// Persistence: Postgres in deployments, in-memory for tests and database-less local runs.
    pub repo: RepositoryState,
    /// Object storage: S3/MinIO or the mock.
    pub storage: StorageState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Let extractors (notably `AuthUser`) pull single components out of the state.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Runs the `AuthUser` extractor ahead of the handler. A failed extraction rejects
/// the request with 401 before any handler code runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing tree, applies the auth layer to protected routes and wraps
/// everything in the request-id, tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .nest(
            "/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. A UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. One span per request, carrying the request id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Echo the id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Span maker for `TraceLayer`: method, uri and the `x-request-id` set above, so
/// every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}

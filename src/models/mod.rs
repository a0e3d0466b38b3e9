// --- Domain Schemas ---
//
// One submodule per resource. Rows derive `FromRow` and are mapped 1:1 to the
// tables in `migrations/`; request payloads derive `Validate`.

pub mod ad;
pub mod analytics;
pub mod campaign;
pub mod integration;
pub mod media;
pub mod notification;
pub mod onboarding;
pub mod report;
pub mod subscription;
pub mod team;
pub mod user;

use validator::ValidationError;

/// Rejects strings that are empty once surrounding whitespace is removed.
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

pub use ad::{Ad, AdFormat, AdStatus, CreateAdRequest, UpdateAdRequest};
pub use analytics::{
    CampaignAnalytics, CampaignPerformance, DailyPoint, DashboardAnalytics, DateRangeQuery,
    MetricTotals, StatusCount,
};
pub use campaign::{
    Campaign, CampaignFilter, CampaignObjective, CampaignPage, CampaignStatus, ChangeStatusRequest,
    CreateCampaignRequest, DailyMetric, MetricsOutcome, RecordMetricsRequest,
    UpdateCampaignRequest,
};
pub use integration::{
    CreateIntegrationRequest, Integration, IntegrationProvider, IntegrationStatus,
    UpdateIntegrationRequest,
};
pub use media::{
    MediaFile, MediaFileResponse, MediaFilter, MediaKind, PresignedUrlRequest,
    PresignedUrlResponse, RegisterMediaRequest,
};
pub use notification::{
    MarkAllReadResponse, Notification, NotificationFilter, NotificationKind, UnreadCount,
};
pub use onboarding::{AdminDashboardStats, OnboardingState, OnboardingStep};
pub use report::{CreateReportRequest, Report, ReportFormat, ReportRow, ReportStatus};
pub use subscription::{
    ChangePlanRequest, Plan, PlanInfo, PlanLimits, Subscription, SubscriptionOverview,
    SubscriptionStatus, Usage,
};
pub use team::{
    CreateInvitationRequest, Invitation, InvitationCreated, InvitationPreview, TeamMember,
    UpdateRoleRequest,
};
pub use user::{
    AcceptInvitationRequest, AuthResponse, ChangePasswordRequest, LoginRequest, Organization,
    RefreshRequest, RegisterRequest, Role, Session, UpdateProfileRequest, User, UserProfile,
};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    Ad, AdminDashboardStats, Campaign, CampaignFilter, CampaignStatus, DailyMetric, Integration,
    IntegrationProvider, Invitation, MediaFile, MetricsOutcome, Notification, OnboardingStep,
    Organization, RecordMetricsRequest, Report, Role, Session, Subscription, UpdateAdRequest,
    UpdateCampaignRequest, User,
};

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// Repository Trait
///
/// The persistence contract used by every handler. Tenant-owned records are always
/// addressed by `(organization_id, id)` so a row from another organization reads
/// as absent.
///
/// **Send + Sync + async_trait** make the trait object (`Arc<dyn Repository>`)
/// shareable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Organizations ---
    // Creates the organization, its owner and the initial subscription atomically.
    async fn register_organization(
        &self,
        org: Organization,
        owner: User,
        subscription: Subscription,
    ) -> AppResult<User>;
    async fn get_organization(&self, id: Uuid) -> AppResult<Option<Organization>>;
    async fn slug_exists(&self, slug: &str) -> AppResult<bool>;

    // --- Users ---
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>>;
    // Email lookup is case-insensitive; emails are stored lowercase.
    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn list_users(&self, org: Uuid) -> AppResult<Vec<User>>;
    async fn count_users(&self, org: Uuid) -> AppResult<i64>;
    async fn update_user_profile(
        &self,
        id: Uuid,
        name: Option<String>,
        avatar_key: Option<String>,
    ) -> AppResult<Option<User>>;
    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> AppResult<()>;
    // Increments the failure counter. Reaching `max_attempts` sets `locked_until` and resets it.
    async fn record_login_failure(
        &self,
        id: Uuid,
        max_attempts: i32,
        locked_until: DateTime<Utc>,
    ) -> AppResult<User>;
    async fn record_login_success(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()>;
    async fn set_user_role(&self, org: Uuid, id: Uuid, role: Role) -> AppResult<Option<User>>;
    async fn delete_user(&self, org: Uuid, id: Uuid) -> AppResult<bool>;

    // --- Sessions ---
    async fn create_session(&self, session: Session) -> AppResult<()>;
    async fn get_session_by_hash(&self, refresh_token_hash: &str) -> AppResult<Option<Session>>;
    // Revokes `old` and inserts `new` in one step. Returns false, inserting nothing,
    // when `old` was already revoked.
    async fn rotate_session(&self, old: Uuid, new: Session) -> AppResult<bool>;
    async fn revoke_user_sessions(&self, user_id: Uuid) -> AppResult<u64>;

    // --- Campaigns ---
    // Returns one page plus the total number of matches.
    async fn list_campaigns(
        &self,
        org: Uuid,
        filter: &CampaignFilter,
    ) -> AppResult<(Vec<Campaign>, i64)>;
    // Every campaign, archived included, newest first.
    async fn all_campaigns(&self, org: Uuid) -> AppResult<Vec<Campaign>>;
    async fn get_campaign(&self, org: Uuid, id: Uuid) -> AppResult<Option<Campaign>>;
    async fn create_campaign(&self, campaign: Campaign) -> AppResult<Campaign>;
    // Partial update; only `Some` fields are written.
    async fn update_campaign(
        &self,
        org: Uuid,
        id: Uuid,
        req: &UpdateCampaignRequest,
    ) -> AppResult<Option<Campaign>>;
    async fn set_campaign_status(
        &self,
        org: Uuid,
        id: Uuid,
        status: CampaignStatus,
    ) -> AppResult<Option<Campaign>>;
    async fn delete_campaign(&self, org: Uuid, id: Uuid) -> AppResult<bool>;
    // Campaigns counted against the plan limit (everything but archived).
    async fn count_campaigns(&self, org: Uuid) -> AppResult<i64>;

    // --- Metrics ---
    // Upserts the daily row, bumps the campaign counters and pauses an active
    // campaign whose spend reaches its budget. Archived campaigns are a conflict.
    async fn record_metrics(
        &self,
        org: Uuid,
        campaign_id: Uuid,
        req: &RecordMetricsRequest,
    ) -> AppResult<Option<MetricsOutcome>>;
    // `None` means every campaign of the organization.
    async fn get_metrics(
        &self,
        org: Uuid,
        campaign_ids: Option<&[Uuid]>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<DailyMetric>>;

    // --- Ads ---
    async fn list_ads(&self, org: Uuid, campaign_id: Uuid) -> AppResult<Vec<Ad>>;
    async fn get_ad(&self, org: Uuid, id: Uuid) -> AppResult<Option<Ad>>;
    async fn create_ad(&self, ad: Ad) -> AppResult<Ad>;
    async fn update_ad(&self, org: Uuid, id: Uuid, req: &UpdateAdRequest) -> AppResult<Option<Ad>>;
    async fn delete_ad(&self, org: Uuid, id: Uuid) -> AppResult<bool>;

    // --- Subscriptions ---
    async fn get_subscription(&self, org: Uuid) -> AppResult<Option<Subscription>>;
    // Insert or replace the organization's single subscription row.
    async fn save_subscription(&self, subscription: Subscription) -> AppResult<Subscription>;

    // --- Reports ---
    async fn create_report(&self, report: Report) -> AppResult<Report>;
    // Listing omits `content`.
    async fn list_reports(&self, org: Uuid) -> AppResult<Vec<Report>>;
    async fn get_report(&self, org: Uuid, id: Uuid) -> AppResult<Option<Report>>;
    async fn delete_report(&self, org: Uuid, id: Uuid) -> AppResult<bool>;

    // --- Integrations ---
    async fn list_integrations(&self, org: Uuid) -> AppResult<Vec<Integration>>;
    async fn get_integration(&self, org: Uuid, id: Uuid) -> AppResult<Option<Integration>>;
    async fn get_integration_by_provider(
        &self,
        org: Uuid,
        provider: IntegrationProvider,
    ) -> AppResult<Option<Integration>>;
    async fn create_integration(&self, integration: Integration) -> AppResult<Integration>;
    // Writes display_name, status and config of an existing row.
    async fn update_integration(&self, integration: Integration) -> AppResult<Option<Integration>>;
    async fn delete_integration(&self, org: Uuid, id: Uuid) -> AppResult<bool>;
    async fn count_integrations(&self, org: Uuid) -> AppResult<i64>;

    // --- Invitations ---
    async fn create_invitation(&self, invitation: Invitation) -> AppResult<Invitation>;
    async fn list_pending_invitations(&self, org: Uuid, now: DateTime<Utc>)
    -> AppResult<Vec<Invitation>>;
    async fn count_pending_invitations(&self, org: Uuid, now: DateTime<Utc>) -> AppResult<i64>;
    async fn get_invitation_by_token_hash(&self, token_hash: &str) -> AppResult<Option<Invitation>>;
    async fn get_pending_invitation_by_email(
        &self,
        org: Uuid,
        email: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Invitation>>;
    // Creates the invited user and marks the invitation accepted atomically.
    // Returns `None` when the invitation was accepted concurrently.
    async fn accept_invitation(&self, invitation_id: Uuid, user: User) -> AppResult<Option<User>>;
    async fn delete_invitation(&self, org: Uuid, id: Uuid) -> AppResult<bool>;

    // --- Notifications ---
    async fn create_notification(&self, notification: Notification) -> AppResult<Notification>;
    async fn list_notifications(&self, user_id: Uuid, unread_only: bool)
    -> AppResult<Vec<Notification>>;
    async fn count_unread_notifications(&self, user_id: Uuid) -> AppResult<i64>;
    // Ownership enforced by `user_id`.
    async fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> AppResult<bool>;
    async fn mark_all_notifications_read(&self, user_id: Uuid) -> AppResult<u64>;

    // --- Media ---
    async fn create_media_file(&self, file: MediaFile) -> AppResult<MediaFile>;
    async fn list_media_files(&self, org: Uuid) -> AppResult<Vec<MediaFile>>;
    async fn get_media_file(&self, org: Uuid, id: Uuid) -> AppResult<Option<MediaFile>>;
    async fn delete_media_file(&self, org: Uuid, id: Uuid) -> AppResult<bool>;
    async fn storage_used(&self, org: Uuid) -> AppResult<i64>;

    // --- Onboarding ---
    async fn get_onboarding_steps(&self, org: Uuid) -> AppResult<Vec<OnboardingStep>>;
    // Idempotent.
    async fn complete_onboarding_step(&self, org: Uuid, step: OnboardingStep) -> AppResult<()>;

    // --- Admin ---
    async fn get_stats(&self, org: Uuid, now: DateTime<Utc>) -> AppResult<AdminDashboardStats>;
}

/// RepositoryState
///
/// The concrete type used to share persistence access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

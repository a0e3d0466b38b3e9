use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

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
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "onboarding_step", rename_all = "snake_case")]
#[ts(export)]
pub enum OnboardingStep {
    ProfileCompleted,
    FirstCampaign,
    IntegrationConnected,
    TeamInvited,
}

impl OnboardingStep {
    pub const ALL: [OnboardingStep; 4] = [
        OnboardingStep::ProfileCompleted,
        OnboardingStep::FirstCampaign,
        OnboardingStep::IntegrationConnected,
        OnboardingStep::TeamInvited,
    ];
}

/// OnboardingState
///
/// The checklist shown to a new organization.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct OnboardingState {
    pub organization_id: Uuid,
    pub completed_steps: Vec<OnboardingStep>,
    pub remaining_steps: Vec<OnboardingStep>,
    pub is_complete: bool,
}

impl OnboardingState {
    pub fn new(organization_id: Uuid, mut completed: Vec<OnboardingStep>) -> Self {
        completed.sort();
        completed.dedup();
        let remaining: Vec<OnboardingStep> = OnboardingStep::ALL
            .into_iter()
            .filter(|step| !completed.contains(step))
            .collect();
        Self {
            organization_id,
            is_complete: remaining.is_empty(),
            completed_steps: completed,
            remaining_steps: remaining,
        }
    }
}

/// AdminDashboardStats
///
/// Output of GET /admin/stats for the organization's admins.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_campaigns: i64,
    pub active_campaigns: i64,
    pub total_members: i64,
    pub pending_invitations: i64,
    pub connected_integrations: i64,
    pub total_spend_cents: i64,
    pub storage_used_bytes: i64,
    pub total_reports: i64,
}

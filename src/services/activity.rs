//! Side effects that accompany a successful write: in-app notifications and
//! onboarding progress. A failure here is logged and never fails the request.

use uuid::Uuid;

use crate::models::{Notification, OnboardingStep};
use crate::repository::Repository;

pub async fn notify(repo: &dyn Repository, notification: Notification) {
    let kind = notification.kind;
    let user_id = notification.user_id;
    if let Err(e) = repo.create_notification(notification).await {
        tracing::warn!(%user_id, ?kind, error = %e, "Failed to create notification");
    }
}

pub async fn complete_step(repo: &dyn Repository, org: Uuid, step: OnboardingStep) {
    if let Err(e) = repo.complete_onboarding_step(org, step).await {
        tracing::warn!(organization_id = %org, ?step, error = %e, "Failed to record onboarding step");
    }
}

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Plan, PlanLimits, Subscription, SubscriptionOverview, Usage, subscription::within};
use crate::repository::Repository;

/// The organization's subscription as of `now`. Organizations that somehow lack
/// a row are put on the free plan.
pub async fn load_subscription(
    repo: &dyn Repository,
    org: Uuid,
    now: DateTime<Utc>,
) -> AppResult<Subscription> {
    let subscription = match repo.get_subscription(org).await? {
        Some(subscription) => subscription,
        None => {
            tracing::warn!(organization_id = %org, "Missing subscription, starting free plan");
            repo.save_subscription(Subscription::start(org, Plan::Free, now))
                .await?
        }
    };
    Ok(subscription.settled(now))
}

/// Seats count members plus pending invitations.
pub async fn current_usage(
    repo: &dyn Repository,
    org: Uuid,
    now: DateTime<Utc>,
) -> AppResult<Usage> {
    Ok(Usage {
        campaigns: repo.count_campaigns(org).await?,
        seats: repo.count_users(org).await? + repo.count_pending_invitations(org, now).await?,
        integrations: repo.count_integrations(org).await?,
        storage_bytes: repo.storage_used(org).await?,
    })
}

pub async fn effective_limits(
    repo: &dyn Repository,
    org: Uuid,
    now: DateTime<Utc>,
) -> AppResult<PlanLimits> {
    let subscription = load_subscription(repo, org, now).await?;
    Ok(subscription.effective_plan(now).limits())
}

pub async fn overview(
    repo: &dyn Repository,
    org: Uuid,
    now: DateTime<Utc>,
) -> AppResult<SubscriptionOverview> {
    let subscription = load_subscription(repo, org, now).await?;
    let effective_plan = subscription.effective_plan(now);
    Ok(SubscriptionOverview {
        subscription,
        effective_plan,
        limits: effective_plan.limits(),
        usage: current_usage(repo, org, now).await?,
    })
}

/// Refuses with 402 when adding `adding` units of `what` would pass `limit`.
pub fn ensure_within(limit: Option<i64>, used: i64, adding: i64, what: &str) -> AppResult<()> {
    if within(limit, used, adding) {
        Ok(())
    } else {
        Err(AppError::PlanLimit(format!(
            "Your plan allows {} {what}; upgrade to add more",
            limit.unwrap_or_default()
        )))
    }
}

/// ensure_seat_available
///
/// Shared by invitation creation (`adding` the new invitation) and acceptance
/// (where the accepted invitation is already counted as pending).
pub async fn ensure_seat_available(
    repo: &dyn Repository,
    org: Uuid,
    now: DateTime<Utc>,
    adding: i64,
) -> AppResult<()> {
    let limits = effective_limits(repo, org, now).await?;
    let seats = repo.count_users(org).await? + repo.count_pending_invitations(org, now).await?;
    ensure_within(limits.max_seats, seats, adding, "seats")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_error_is_payment_required() {
        assert!(ensure_within(None, 10_000, 1, "campaigns").is_ok());
        let err = ensure_within(Some(3), 3, 1, "campaigns").unwrap_err();
        assert_eq!(err.code(), "PLAN_LIMIT_REACHED");
        assert!(err.to_string().contains("3 campaigns"));
    }
}

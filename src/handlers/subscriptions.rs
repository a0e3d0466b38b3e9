use axum::{Json, extract::State};
use chrono::Utc;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{
        ChangePlanRequest, Notification, NotificationKind, Plan, PlanInfo, Role, Subscription,
        SubscriptionOverview, SubscriptionStatus,
    },
    services::{activity, billing},
};

/// list_plans
///
/// [Public Route] The plan catalogue with prices and limits.
#[utoipa::path(
    get,
    path = "/subscriptions/plans",
    tag = "subscriptions",
    responses((status = 200, description = "Available plans", body = [PlanInfo]))
)]
pub async fn list_plans() -> Json<Vec<PlanInfo>> {
    Json(Plan::ALL.into_iter().map(PlanInfo::from).collect())
}

#[utoipa::path(
    get,
    path = "/subscriptions/current",
    tag = "subscriptions",
    responses((status = 200, description = "Subscription, limits and usage", body = SubscriptionOverview))
)]
pub async fn get_current(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<SubscriptionOverview>> {
    let overview = billing::overview(state.repo.as_ref(), auth.organization_id, Utc::now()).await?;
    Ok(Json(overview))
}

/// change_plan
///
/// [Authenticated Route, owner] Switches plan and starts a new billing period. A
/// downgrade is refused while current usage would not fit the new limits.
#[utoipa::path(
    put,
    path = "/subscriptions",
    tag = "subscriptions",
    request_body = ChangePlanRequest,
    responses(
        (status = 200, description = "Plan changed", body = SubscriptionOverview),
        (status = 403, description = "Owner only"),
        (status = 409, description = "Usage exceeds the new plan")
    )
)]
pub async fn change_plan(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<ChangePlanRequest>,
) -> AppResult<Json<SubscriptionOverview>> {
    auth.require(Role::Owner)?;
    let repo = state.repo.as_ref();
    let now = Utc::now();

    let previous = billing::load_subscription(repo, auth.organization_id, now).await?;
    let usage = billing::current_usage(repo, auth.organization_id, now).await?;
    let violations = usage.violations(&payload.plan.limits());
    if !violations.is_empty() {
        return Err(AppError::Conflict(format!(
            "Current usage exceeds the {} plan ({})",
            payload.plan.display_name(),
            violations.join("; ")
        )));
    }

    repo.save_subscription(Subscription::start(auth.organization_id, payload.plan, now))
        .await?;

    tracing::info!(
        organization_id = %auth.organization_id,
        from = ?previous.plan,
        to = ?payload.plan,
        "Plan changed"
    );
    activity::notify(
        repo,
        Notification::new(
            auth.organization_id,
            auth.id,
            NotificationKind::PlanChanged,
            "Plan changed",
            format!(
                "Your organization moved from {} to {}",
                previous.plan.display_name(),
                payload.plan.display_name()
            ),
            Some("/billing".to_string()),
        ),
    )
    .await;

    Ok(Json(billing::overview(repo, auth.organization_id, now).await?))
}

/// cancel_subscription
///
/// [Authenticated Route, owner] The plan stays in force until the period ends.
#[utoipa::path(
    post,
    path = "/subscriptions/cancel",
    tag = "subscriptions",
    responses(
        (status = 200, description = "Cancellation scheduled", body = SubscriptionOverview),
        (status = 409, description = "Already canceled")
    )
)]
pub async fn cancel_subscription(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<SubscriptionOverview>> {
    auth.require(Role::Owner)?;
    let repo = state.repo.as_ref();
    let now = Utc::now();

    let mut subscription = billing::load_subscription(repo, auth.organization_id, now).await?;
    if subscription.status == SubscriptionStatus::Canceled || subscription.cancel_at_period_end {
        return Err(AppError::Conflict(
            "Subscription is already canceled".to_string(),
        ));
    }
    subscription.cancel_at_period_end = true;
    subscription.updated_at = now;
    repo.save_subscription(subscription).await?;

    tracing::info!(organization_id = %auth.organization_id, "Subscription cancellation scheduled");
    Ok(Json(billing::overview(repo, auth.organization_id, now).await?))
}

#[utoipa::path(
    post,
    path = "/subscriptions/resume",
    tag = "subscriptions",
    responses(
        (status = 200, description = "Cancellation withdrawn", body = SubscriptionOverview),
        (status = 409, description = "Not canceled, or the period has already ended")
    )
)]
pub async fn resume_subscription(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<SubscriptionOverview>> {
    auth.require(Role::Owner)?;
    let repo = state.repo.as_ref();
    let now = Utc::now();

    let mut subscription = billing::load_subscription(repo, auth.organization_id, now).await?;
    if subscription.status == SubscriptionStatus::Canceled {
        return Err(AppError::Conflict(
            "The billing period has ended; choose a plan to subscribe again".to_string(),
        ));
    }
    if !subscription.cancel_at_period_end {
        return Err(AppError::Conflict(
            "Subscription is not scheduled for cancellation".to_string(),
        ));
    }
    subscription.cancel_at_period_end = false;
    subscription.updated_at = now;
    repo.save_subscription(subscription).await?;

    Ok(Json(billing::overview(repo, auth.organization_id, now).await?))
}

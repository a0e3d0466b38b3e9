use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{
        Campaign, CampaignFilter, CampaignPage, CampaignStatus, ChangeStatusRequest,
        CreateCampaignRequest, Notification, NotificationKind, OnboardingStep,
        RecordMetricsRequest, Role, UpdateCampaignRequest,
    },
    services::{activity, billing},
};

async fn find_campaign(state: &AppState, auth: &AuthUser, id: Uuid) -> AppResult<Campaign> {
    state
        .repo
        .get_campaign(auth.organization_id, id)
        .await?
        .ok_or(AppError::NotFound("Campaign"))
}

/// list_campaigns
///
/// [Authenticated Route] One page of the organization's campaigns, newest first.
/// Archived campaigns only show up when `status=archived` is requested.
#[utoipa::path(
    get,
    path = "/campaigns",
    tag = "campaigns",
    params(CampaignFilter),
    responses((status = 200, description = "Campaign page", body = CampaignPage))
)]
pub async fn list_campaigns(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<CampaignFilter>,
) -> AppResult<Json<CampaignPage>> {
    let (items, total) = state
        .repo
        .list_campaigns(auth.organization_id, &filter)
        .await?;
    Ok(Json(CampaignPage {
        items,
        total,
        page: filter.page(),
        per_page: filter.per_page(),
    }))
}

/// create_campaign
///
/// [Authenticated Route, member+] New campaigns start as drafts with zero counters.
#[utoipa::path(
    post,
    path = "/campaigns",
    tag = "campaigns",
    request_body = CreateCampaignRequest,
    responses(
        (status = 201, description = "Campaign created", body = Campaign),
        (status = 402, description = "Plan campaign limit reached"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create_campaign(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCampaignRequest>,
) -> AppResult<(StatusCode, Json<Campaign>)> {
    auth.require(Role::Member)?;
    payload.check()?;

    let now = Utc::now();
    let limits = billing::effective_limits(state.repo.as_ref(), auth.organization_id, now).await?;
    let used = state.repo.count_campaigns(auth.organization_id).await?;
    billing::ensure_within(limits.max_campaigns, used, 1, "campaigns")?;

    let campaign = Campaign {
        id: Uuid::new_v4(),
        organization_id: auth.organization_id,
        created_by: auth.id,
        name: payload.name.trim().to_string(),
        description: payload.description,
        objective: payload.objective,
        status: CampaignStatus::Draft,
        budget_cents: payload.budget_cents,
        start_date: payload.start_date,
        end_date: payload.end_date,
        created_at: now,
        updated_at: now,
        ..Campaign::default()
    };
    let campaign = state.repo.create_campaign(campaign).await?;

    activity::complete_step(
        state.repo.as_ref(),
        auth.organization_id,
        OnboardingStep::FirstCampaign,
    )
    .await;

    Ok((StatusCode::CREATED, Json(campaign)))
}

#[utoipa::path(
    get,
    path = "/campaigns/{id}",
    tag = "campaigns",
    params(("id" = Uuid, Path, description = "Campaign ID")),
    responses(
        (status = 200, description = "Found", body = Campaign),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_campaign(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Campaign>> {
    Ok(Json(find_campaign(&state, &auth, id).await?))
}

/// update_campaign
///
/// [Authenticated Route, member+] Partial update. The patch is validated against the
/// stored row, so the budget can never drop below what has been spent.
#[utoipa::path(
    put,
    path = "/campaigns/{id}",
    tag = "campaigns",
    params(("id" = Uuid, Path, description = "Campaign ID")),
    request_body = UpdateCampaignRequest,
    responses(
        (status = 200, description = "Updated", body = Campaign),
        (status = 404, description = "Not Found"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn update_campaign(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mut payload): Json<UpdateCampaignRequest>,
) -> AppResult<Json<Campaign>> {
    auth.require(Role::Member)?;
    payload.name = payload.name.map(|n| n.trim().to_string());
    let current = find_campaign(&state, &auth, id).await?;
    payload.check_against(&current)?;

    let campaign = state
        .repo
        .update_campaign(auth.organization_id, id, &payload)
        .await?
        .ok_or(AppError::NotFound("Campaign"))?;
    Ok(Json(campaign))
}

#[utoipa::path(
    delete,
    path = "/campaigns/{id}",
    tag = "campaigns",
    params(("id" = Uuid, Path, description = "Campaign ID")),
    responses(
        (status = 204, description = "Deleted with its ads and metrics"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_campaign(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    auth.require(Role::Member)?;
    if state.repo.delete_campaign(auth.organization_id, id).await? {
        tracing::info!(campaign_id = %id, user_id = %auth.id, "Campaign deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Campaign"))
    }
}

/// change_status
///
/// [Authenticated Route, member+] Moves a campaign along its lifecycle. Transitions
/// outside the allowed set, and activating a campaign with no budget left, are 409.
#[utoipa::path(
    post,
    path = "/campaigns/{id}/status",
    tag = "campaigns",
    params(("id" = Uuid, Path, description = "Campaign ID")),
    request_body = ChangeStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = Campaign),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Transition not allowed")
    )
)]
pub async fn change_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChangeStatusRequest>,
) -> AppResult<Json<Campaign>> {
    auth.require(Role::Member)?;
    let current = find_campaign(&state, &auth, id).await?;
    let next = payload.status;

    if !current.status.can_transition_to(next) {
        return Err(AppError::Conflict(format!(
            "Cannot move a {} campaign to {}",
            current.status.as_str(),
            next.as_str()
        )));
    }
    if next == CampaignStatus::Active && current.spent_cents >= current.budget_cents {
        return Err(AppError::Conflict(
            "Campaign budget is exhausted; raise the budget before activating".to_string(),
        ));
    }

    let campaign = state
        .repo
        .set_campaign_status(auth.organization_id, id, next)
        .await?
        .ok_or(AppError::NotFound("Campaign"))?;

    tracing::info!(
        campaign_id = %id,
        from = current.status.as_str(),
        to = next.as_str(),
        "Campaign status changed"
    );
    Ok(Json(campaign))
}

/// record_metrics
///
/// [Authenticated Route, member+] Adds one day's delivery numbers. When the spend
/// reaches the budget of an active campaign, it is paused and its creator notified.
/// Spend that overshoots the budget is still recorded.
#[utoipa::path(
    post,
    path = "/campaigns/{id}/metrics",
    tag = "campaigns",
    params(("id" = Uuid, Path, description = "Campaign ID")),
    request_body = RecordMetricsRequest,
    responses(
        (status = 200, description = "Metrics recorded", body = Campaign),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Campaign is archived"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn record_metrics(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordMetricsRequest>,
) -> AppResult<Json<Campaign>> {
    auth.require(Role::Member)?;
    payload.check()?;

    let outcome = state
        .repo
        .record_metrics(auth.organization_id, id, &payload)
        .await?
        .ok_or(AppError::NotFound("Campaign"))?;
    let campaign = outcome.campaign;

    if outcome.budget_exhausted {
        tracing::info!(
            campaign_id = %campaign.id,
            spent_cents = campaign.spent_cents,
            budget_cents = campaign.budget_cents,
            "Budget exhausted, campaign paused"
        );
        activity::notify(
            state.repo.as_ref(),
            Notification::new(
                campaign.organization_id,
                campaign.created_by,
                NotificationKind::BudgetExhausted,
                "Campaign paused",
                format!("\"{}\" reached its budget and was paused", campaign.name),
                Some(format!("/campaigns/{}", campaign.id)),
            ),
        )
        .await;
    }

    Ok(Json(campaign))
}

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{
        CreateIntegrationRequest, Integration, IntegrationStatus, Notification, NotificationKind,
        OnboardingStep, Role, UpdateIntegrationRequest,
        integration::{merge_config, validate_config},
    },
    services::{activity, billing},
};

/// list_integrations
///
/// [Authenticated Route] Secret config values are replaced by a placeholder.
#[utoipa::path(
    get,
    path = "/integrations",
    tag = "integrations",
    responses((status = 200, description = "Integrations, secrets redacted", body = [Integration]))
)]
pub async fn list_integrations(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Integration>>> {
    let integrations = state
        .repo
        .list_integrations(auth.organization_id)
        .await?
        .into_iter()
        .map(Integration::redacted)
        .collect();
    Ok(Json(integrations))
}

#[utoipa::path(
    get,
    path = "/integrations/{id}",
    tag = "integrations",
    params(("id" = Uuid, Path, description = "Integration ID")),
    responses(
        (status = 200, description = "Found, secrets redacted", body = Integration),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_integration(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Integration>> {
    state
        .repo
        .get_integration(auth.organization_id, id)
        .await?
        .map(|i| Json(i.redacted()))
        .ok_or(AppError::NotFound("Integration"))
}

/// create_integration
///
/// [Authenticated Route, admin+] Connects a provider. One connection per provider,
/// counted against the plan's integration limit.
#[utoipa::path(
    post,
    path = "/integrations",
    tag = "integrations",
    request_body = CreateIntegrationRequest,
    responses(
        (status = 201, description = "Connected", body = Integration),
        (status = 402, description = "Plan integration limit reached"),
        (status = 409, description = "Provider already connected"),
        (status = 422, description = "Missing required config keys")
    )
)]
pub async fn create_integration(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateIntegrationRequest>,
) -> AppResult<(StatusCode, Json<Integration>)> {
    auth.require(Role::Admin)?;
    payload.validate()?;
    validate_config(payload.provider, &payload.config)?;

    let org = auth.organization_id;
    if state
        .repo
        .get_integration_by_provider(org, payload.provider)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(format!(
            "{} is already connected",
            payload.provider.display_name()
        )));
    }

    let now = Utc::now();
    let limits = billing::effective_limits(state.repo.as_ref(), org, now).await?;
    let used = state.repo.count_integrations(org).await?;
    billing::ensure_within(limits.max_integrations, used, 1, "integrations")?;

    let integration = Integration {
        id: Uuid::new_v4(),
        organization_id: org,
        provider: payload.provider,
        display_name: payload
            .display_name
            .map(|n| n.trim().to_string())
            .unwrap_or_else(|| payload.provider.display_name().to_string()),
        status: IntegrationStatus::Connected,
        config: payload.config,
        connected_by: auth.id,
        last_synced_at: None,
        created_at: now,
        updated_at: now,
    };
    let integration = state.repo.create_integration(integration).await?;

    tracing::info!(
        integration_id = %integration.id,
        provider = ?integration.provider,
        "Integration connected"
    );
    activity::complete_step(
        state.repo.as_ref(),
        org,
        OnboardingStep::IntegrationConnected,
    )
    .await;
    activity::notify(
        state.repo.as_ref(),
        Notification::new(
            org,
            auth.id,
            NotificationKind::IntegrationConnected,
            "Integration connected",
            format!("{} is now connected", integration.display_name),
            Some("/integrations".to_string()),
        ),
    )
    .await;

    Ok((StatusCode::CREATED, Json(integration.redacted())))
}

/// update_integration
///
/// [Authenticated Route, admin+] Config changes are merged key by key; sending the
/// placeholder back keeps the stored secret.
#[utoipa::path(
    put,
    path = "/integrations/{id}",
    tag = "integrations",
    params(("id" = Uuid, Path, description = "Integration ID")),
    request_body = UpdateIntegrationRequest,
    responses(
        (status = 200, description = "Updated, secrets redacted", body = Integration),
        (status = 404, description = "Not Found"),
        (status = 422, description = "Missing required config keys")
    )
)]
pub async fn update_integration(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateIntegrationRequest>,
) -> AppResult<Json<Integration>> {
    auth.require(Role::Admin)?;
    payload.validate()?;

    let mut integration = state
        .repo
        .get_integration(auth.organization_id, id)
        .await?
        .ok_or(AppError::NotFound("Integration"))?;

    if let Some(incoming) = &payload.config {
        let merged = merge_config(&integration.config, incoming)?;
        validate_config(integration.provider, &merged)?;
        integration.config = merged;
    }
    if let Some(name) = payload.display_name {
        integration.display_name = name.trim().to_string();
    }
    if let Some(status) = payload.status {
        integration.status = status;
    }
    integration.updated_at = Utc::now();

    state
        .repo
        .update_integration(integration)
        .await?
        .map(|i| Json(i.redacted()))
        .ok_or(AppError::NotFound("Integration"))
}

#[utoipa::path(
    delete,
    path = "/integrations/{id}",
    tag = "integrations",
    params(("id" = Uuid, Path, description = "Integration ID")),
    responses(
        (status = 204, description = "Disconnected and removed"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_integration(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    auth.require(Role::Admin)?;
    if state.repo.delete_integration(auth.organization_id, id).await? {
        tracing::info!(integration_id = %id, user_id = %auth.id, "Integration removed");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Integration"))
    }
}

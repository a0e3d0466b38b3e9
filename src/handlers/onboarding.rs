use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    AppState,
    auth::AuthUser,
    error::AppResult,
    models::{OnboardingState, OnboardingStep},
};

async fn state_of(state: &AppState, auth: &AuthUser) -> AppResult<OnboardingState> {
    let steps = state.repo.get_onboarding_steps(auth.organization_id).await?;
    Ok(OnboardingState::new(auth.organization_id, steps))
}

#[utoipa::path(
    get,
    path = "/onboarding",
    tag = "onboarding",
    responses((status = 200, description = "Onboarding checklist", body = OnboardingState))
)]
pub async fn get_onboarding(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<OnboardingState>> {
    Ok(Json(state_of(&state, &auth).await?))
}

/// complete_step
///
/// [Authenticated Route] Marks a checklist step done. Completing a step twice is a no-op.
#[utoipa::path(
    post,
    path = "/onboarding/steps/{step}",
    tag = "onboarding",
    params(("step" = OnboardingStep, Path, description = "Step to mark complete")),
    responses(
        (status = 200, description = "Updated checklist", body = OnboardingState),
        (status = 400, description = "Unknown step")
    )
)]
pub async fn complete_step(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(step): Path<OnboardingStep>,
) -> AppResult<Json<OnboardingState>> {
    state
        .repo
        .complete_onboarding_step(auth.organization_id, step)
        .await?;
    Ok(Json(state_of(&state, &auth).await?))
}

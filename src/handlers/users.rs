use axum::{Json, extract::State, http::StatusCode};
use validator::Validate;

use crate::{
    AppState,
    auth::{AuthUser, password},
    error::{AppError, AppResult},
    models::{
        ChangePasswordRequest, OnboardingStep, UpdateProfileRequest, User, UserProfile,
        media::organization_prefix,
    },
    services::activity,
    storage::sanitize_key,
};

fn identicon_url(user: &User) -> String {
    format!("https://api.dicebear.com/7.x/identicon/svg?seed={}", user.id)
}

/// profile_for
///
/// Builds the client-facing profile. A stored avatar is served through a
/// presigned URL; if signing fails the identicon is used instead.
pub(crate) async fn profile_for(state: &AppState, user: &User) -> UserProfile {
    let avatar_url = match &user.avatar_key {
        Some(key) => match state.storage.get_presigned_download_url(key).await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Avatar URL signing failed");
                identicon_url(user)
            }
        },
        None => identicon_url(user),
    };
    UserProfile::new(user, Some(avatar_url))
}

#[utoipa::path(
    get,
    path = "/users/me",
    tag = "users",
    responses((status = 200, description = "Current user", body = UserProfile))
)]
pub async fn get_me(auth: AuthUser, State(state): State<AppState>) -> AppResult<Json<UserProfile>> {
    let user = state
        .repo
        .get_user(auth.id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    Ok(Json(profile_for(&state, &user).await))
}

/// update_me
///
/// [Authenticated Route] Edits the caller's name and avatar. The avatar key must
/// point inside the organization's storage prefix.
#[utoipa::path(
    put,
    path = "/users/me",
    tag = "users",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserProfile),
        (status = 403, description = "Avatar key outside the organization"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn update_me(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<UserProfile>> {
    payload.validate()?;

    if let Some(key) = &payload.avatar_key {
        let prefix = organization_prefix(auth.organization_id);
        if sanitize_key(key) != *key || !key.starts_with(&prefix) {
            return Err(AppError::Forbidden(
                "Avatar must be stored under your organization".to_string(),
            ));
        }
    }

    let name = payload.name.map(|n| n.trim().to_string());
    let user = state
        .repo
        .update_user_profile(auth.id, name, payload.avatar_key)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    activity::complete_step(
        state.repo.as_ref(),
        auth.organization_id,
        OnboardingStep::ProfileCompleted,
    )
    .await;

    Ok(Json(profile_for(&state, &user).await))
}

/// change_password
///
/// [Authenticated Route] Replaces the password and signs the user out everywhere.
#[utoipa::path(
    put,
    path = "/users/me/password",
    tag = "users",
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 422, description = "Current password incorrect or new password too short")
    )
)]
pub async fn change_password(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    payload.validate()?;
    let user = state
        .repo
        .get_user(auth.id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    if !password::verify_password(&payload.current_password, &user.password_hash)? {
        tracing::warn!(user_id = %auth.id, "Password change with wrong current password");
        return Err(AppError::field("current_password", "is incorrect"));
    }

    let hash = password::hash_password(&payload.new_password)?;
    state.repo.set_password_hash(auth.id, &hash).await?;
    let revoked = state.repo.revoke_user_sessions(auth.id).await?;

    tracing::info!(user_id = %auth.id, revoked, "Password changed");
    Ok(StatusCode::NO_CONTENT)
}

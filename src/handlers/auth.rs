use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    auth::{AuthUser, jwt, password},
    config::AppConfig,
    error::{AppError, AppResult},
    handlers::users::profile_for,
    models::{
        AcceptInvitationRequest, AuthResponse, LoginRequest, Notification, NotificationKind,
        Organization, Plan, RefreshRequest, RegisterRequest, Role, Session, Subscription, User,
        UserProfile, user::slugify,
    },
    services::{activity, billing},
};

/// Consecutive failed logins before the account is locked.
pub const MAX_FAILED_ATTEMPTS: i32 = 5;
pub const LOCK_DURATION_MINS: i64 = 15;

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid email or password".to_string())
}

fn invalid_refresh_token() -> AppError {
    AppError::Unauthorized("Invalid or expired refresh token".to_string())
}

/// A fresh session row and the plaintext refresh token that unlocks it.
fn new_session(user_id: Uuid, config: &AppConfig, now: DateTime<Utc>) -> (String, Session) {
    let (refresh_token, refresh_token_hash) = jwt::generate_opaque_token();
    let session = Session {
        id: Uuid::new_v4(),
        user_id,
        refresh_token_hash,
        expires_at: now + Duration::days(config.refresh_token_ttl_days),
        revoked_at: None,
        created_at: now,
    };
    (refresh_token, session)
}

async fn token_response(
    state: &AppState,
    user: &User,
    refresh_token: String,
) -> AppResult<AuthResponse> {
    let access_token = jwt::generate_access_token(user, &state.config)
        .map_err(|e| AppError::Internal(format!("Failed to sign access token: {e}")))?;

    Ok(AuthResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.config.access_token_ttl_mins * 60,
        user: profile_for(state, user).await,
    })
}

/// create_auth_response
///
/// Opens a new session for `user` and returns the token pair.
pub(crate) async fn create_auth_response(state: &AppState, user: &User) -> AppResult<AuthResponse> {
    let (refresh_token, session) = new_session(user.id, &state.config, Utc::now());
    state.repo.create_session(session).await?;
    token_response(state, user, refresh_token).await
}

/// register
///
/// [Public Route] Creates an organization with its owner, a free subscription and an
/// empty onboarding checklist, then signs the owner in.
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Organization created", body = AuthResponse),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    payload.validate()?;
    let email = payload.email.trim().to_lowercase();

    if state.repo.get_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict(
            "An account with this email already exists".to_string(),
        ));
    }

    let mut slug = slugify(&payload.organization_name);
    if state.repo.slug_exists(&slug).await? {
        let suffix = Uuid::new_v4().simple().to_string();
        slug = format!("{slug}-{}", &suffix[..6]);
    }

    let now = Utc::now();
    let organization = Organization {
        id: Uuid::new_v4(),
        name: payload.organization_name.trim().to_string(),
        slug,
        created_at: now,
    };
    let owner = User {
        id: Uuid::new_v4(),
        organization_id: organization.id,
        email,
        name: payload.name.trim().to_string(),
        role: Role::Owner,
        password_hash: password::hash_password(&payload.password)?,
        created_at: now,
        updated_at: now,
        ..User::default()
    };
    let subscription = Subscription::start(organization.id, Plan::Free, now);

    let user = state
        .repo
        .register_organization(organization, owner, subscription)
        .await?;

    tracing::info!(
        user_id = %user.id,
        organization_id = %user.organization_id,
        "Organization registered"
    );

    let response = create_auth_response(&state, &user).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// login
///
/// [Public Route] Verifies credentials. Unknown emails and wrong passwords share one
/// message. Every fifth consecutive failure locks the account.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid email or password"),
        (status = 403, description = "Account temporarily locked")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let email = payload.email.trim().to_lowercase();
    let Some(user) = state.repo.get_user_by_email(&email).await? else {
        tracing::warn!("Login attempt for unknown email");
        return Err(invalid_credentials());
    };

    let now = Utc::now();
    if user.is_locked(now) {
        tracing::warn!(user_id = %user.id, "Login attempt on locked account");
        return Err(AppError::Forbidden(
            "Account is temporarily locked after repeated failed logins. Try again later."
                .to_string(),
        ));
    }

    if !password::verify_password(&payload.password, &user.password_hash)? {
        let updated = state
            .repo
            .record_login_failure(
                user.id,
                MAX_FAILED_ATTEMPTS,
                now + Duration::minutes(LOCK_DURATION_MINS),
            )
            .await?;
        if updated.is_locked(now) {
            tracing::warn!(user_id = %user.id, minutes = LOCK_DURATION_MINS, "Account locked");
        } else {
            tracing::warn!(
                user_id = %user.id,
                failures = updated.failed_login_count,
                "Failed login"
            );
        }
        return Err(invalid_credentials());
    }

    state.repo.record_login_success(user.id, now).await?;
    let user = User {
        failed_login_count: 0,
        locked_until: None,
        last_login_at: Some(now),
        ..user
    };

    tracing::info!(user_id = %user.id, "User signed in");
    Ok(Json(create_auth_response(&state, &user).await?))
}

/// refresh
///
/// [Public Route] Exchanges a refresh token for a new pair. The presented session is
/// revoked in the same step, so a token can be redeemed once.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Tokens rotated", body = AuthResponse),
        (status = 401, description = "Unknown, revoked or expired refresh token")
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let now = Utc::now();
    let hash = jwt::hash_token(&payload.refresh_token);

    let session = state
        .repo
        .get_session_by_hash(&hash)
        .await?
        .filter(|s| s.is_usable(now))
        .ok_or_else(invalid_refresh_token)?;

    let user = state
        .repo
        .get_user(session.user_id)
        .await?
        .ok_or_else(invalid_refresh_token)?;

    let (refresh_token, next) = new_session(user.id, &state.config, now);
    if !state.repo.rotate_session(session.id, next).await? {
        tracing::warn!(session_id = %session.id, user_id = %user.id, "Refresh token replayed");
        return Err(invalid_refresh_token());
    }

    tracing::info!(user_id = %user.id, "Refresh token rotated");
    Ok(Json(token_response(&state, &user, refresh_token).await?))
}

/// logout
///
/// [Authenticated Route] Revokes every session of the caller.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    responses((status = 204, description = "Signed out"))
)]
pub async fn logout(auth: AuthUser, State(state): State<AppState>) -> AppResult<StatusCode> {
    let revoked = state.repo.revoke_user_sessions(auth.id).await?;
    tracing::info!(user_id = %auth.id, revoked, "User signed out");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    responses((status = 200, description = "Current user", body = UserProfile))
)]
pub async fn me(auth: AuthUser, State(state): State<AppState>) -> AppResult<Json<UserProfile>> {
    let user = state
        .repo
        .get_user(auth.id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    Ok(Json(profile_for(&state, &user).await))
}

/// accept_invitation
///
/// [Public Route] Turns a pending invitation into an account in the inviting
/// organization and signs the new member in.
#[utoipa::path(
    post,
    path = "/auth/accept-invitation",
    tag = "auth",
    request_body = AcceptInvitationRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 402, description = "Seat limit reached"),
        (status = 404, description = "Unknown, expired or used invitation"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn accept_invitation(
    State(state): State<AppState>,
    Json(payload): Json<AcceptInvitationRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    payload.validate()?;
    let now = Utc::now();

    let invitation = state
        .repo
        .get_invitation_by_token_hash(&jwt::hash_token(&payload.token))
        .await?
        .filter(|i| i.is_pending(now))
        .ok_or(AppError::NotFound("Invitation"))?;

    if state.repo.get_user_by_email(&invitation.email).await?.is_some() {
        return Err(AppError::Conflict(
            "An account with this email already exists".to_string(),
        ));
    }

    // The invitation itself is still counted as pending here.
    billing::ensure_seat_available(state.repo.as_ref(), invitation.organization_id, now, 0)
        .await?;

    let user = User {
        id: Uuid::new_v4(),
        organization_id: invitation.organization_id,
        email: invitation.email.clone(),
        name: payload.name.trim().to_string(),
        role: invitation.role,
        password_hash: password::hash_password(&payload.password)?,
        last_login_at: Some(now),
        created_at: now,
        updated_at: now,
        ..User::default()
    };

    let user = state
        .repo
        .accept_invitation(invitation.id, user)
        .await?
        .ok_or_else(|| AppError::Conflict("Invitation has already been accepted".to_string()))?;

    tracing::info!(
        user_id = %user.id,
        organization_id = %user.organization_id,
        role = user.role.as_str(),
        "Invitation accepted"
    );

    activity::notify(
        state.repo.as_ref(),
        Notification::new(
            user.organization_id,
            invitation.invited_by,
            NotificationKind::MemberJoined,
            "New team member",
            format!("{} joined your team as {}", user.name, user.role.as_str()),
            Some("/team".to_string()),
        ),
    )
    .await;

    let response = create_auth_response(&state, &user).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

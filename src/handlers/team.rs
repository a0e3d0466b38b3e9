use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    auth::{AuthUser, jwt},
    error::{AppError, AppResult},
    models::{
        CreateInvitationRequest, Invitation, InvitationCreated, InvitationPreview,
        OnboardingStep, Role, TeamMember, UpdateRoleRequest, User,
    },
    services::{activity, billing},
};

async fn find_member(state: &AppState, auth: &AuthUser, id: Uuid) -> AppResult<User> {
    state
        .repo
        .get_user(id)
        .await?
        .filter(|u| u.organization_id == auth.organization_id)
        .ok_or(AppError::NotFound("Member"))
}

#[utoipa::path(
    get,
    path = "/team/members",
    tag = "team",
    responses((status = 200, description = "Members of the organization", body = [TeamMember]))
)]
pub async fn list_members(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<TeamMember>>> {
    let members = state
        .repo
        .list_users(auth.organization_id)
        .await?
        .iter()
        .map(TeamMember::from)
        .collect();
    Ok(Json(members))
}

/// update_member_role
///
/// [Authenticated Route, admin+] The owner's role is fixed and ownership cannot be
/// handed out here. Granting or revoking admin is reserved to the owner.
#[utoipa::path(
    put,
    path = "/team/members/{id}/role",
    tag = "team",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = TeamMember),
        (status = 403, description = "Not allowed to make this change"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_member_role(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> AppResult<Json<TeamMember>> {
    auth.require(Role::Admin)?;
    if id == auth.id {
        return Err(AppError::Forbidden("You cannot change your own role".to_string()));
    }

    let target = find_member(&state, &auth, id).await?;
    if target.role == Role::Owner {
        return Err(AppError::Forbidden(
            "The owner's role cannot be changed".to_string(),
        ));
    }
    if payload.role == Role::Owner {
        return Err(AppError::Forbidden(
            "Ownership cannot be assigned".to_string(),
        ));
    }
    let touches_admin = target.role == Role::Admin || payload.role == Role::Admin;
    if touches_admin && auth.role != Role::Owner {
        return Err(AppError::Forbidden(
            "Only the owner can grant or revoke admin".to_string(),
        ));
    }

    let updated = state
        .repo
        .set_user_role(auth.organization_id, id, payload.role)
        .await?
        .ok_or(AppError::NotFound("Member"))?;

    tracing::info!(
        target_user_id = %id,
        changed_by = %auth.id,
        from = target.role.as_str(),
        to = updated.role.as_str(),
        "Member role changed"
    );
    Ok(Json(TeamMember::from(&updated)))
}

/// remove_member
///
/// [Authenticated Route, admin+] Removes a member and ends their sessions. Records the
/// member created stay with the organization, reassigned to the owner.
#[utoipa::path(
    delete,
    path = "/team/members/{id}",
    tag = "team",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "Removed"),
        (status = 403, description = "Not allowed to remove this member"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn remove_member(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    auth.require(Role::Admin)?;
    if id == auth.id {
        return Err(AppError::Forbidden("You cannot remove yourself".to_string()));
    }

    let target = find_member(&state, &auth, id).await?;
    if target.role == Role::Owner {
        return Err(AppError::Forbidden("The owner cannot be removed".to_string()));
    }
    if target.role == Role::Admin && auth.role != Role::Owner {
        return Err(AppError::Forbidden(
            "Only the owner can remove an admin".to_string(),
        ));
    }

    state.repo.revoke_user_sessions(id).await?;
    if !state.repo.delete_user(auth.organization_id, id).await? {
        return Err(AppError::NotFound("Member"));
    }

    tracing::info!(removed_user_id = %id, removed_by = %auth.id, "Member removed");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/team/invitations",
    tag = "team",
    responses((status = 200, description = "Pending invitations", body = [Invitation]))
)]
pub async fn list_invitations(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Invitation>>> {
    auth.require(Role::Admin)?;
    let invitations = state
        .repo
        .list_pending_invitations(auth.organization_id, Utc::now())
        .await?;
    Ok(Json(invitations))
}

/// create_invitation
///
/// [Authenticated Route, admin+] Invites an email address. Pending invitations hold
/// a seat, so the seat limit covers members plus pending invitations. The plaintext
/// token only ever appears in the returned `invite_url`.
#[utoipa::path(
    post,
    path = "/team/invitations",
    tag = "team",
    request_body = CreateInvitationRequest,
    responses(
        (status = 201, description = "Invitation created", body = InvitationCreated),
        (status = 402, description = "Seat limit reached"),
        (status = 403, description = "Only the owner can invite admins"),
        (status = 409, description = "Already a member or already invited"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create_invitation(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateInvitationRequest>,
) -> AppResult<(StatusCode, Json<InvitationCreated>)> {
    auth.require(Role::Admin)?;
    payload.validate()?;

    if payload.role == Role::Owner {
        return Err(AppError::field("role", "cannot be owner"));
    }
    if payload.role == Role::Admin && auth.role != Role::Owner {
        return Err(AppError::Forbidden(
            "Only the owner can invite admins".to_string(),
        ));
    }

    let org = auth.organization_id;
    let email = payload.email.trim().to_lowercase();
    let now = Utc::now();

    if state.repo.get_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict(
            "A user with this email already exists".to_string(),
        ));
    }
    if state
        .repo
        .get_pending_invitation_by_email(org, &email, now)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "This email already has a pending invitation".to_string(),
        ));
    }
    billing::ensure_seat_available(state.repo.as_ref(), org, now, 1).await?;

    let (token, token_hash) = jwt::generate_opaque_token();
    let invitation = Invitation {
        id: Uuid::new_v4(),
        organization_id: org,
        email,
        role: payload.role,
        token_hash,
        invited_by: auth.id,
        expires_at: now + Duration::days(state.config.invitation_ttl_days),
        accepted_at: None,
        created_at: now,
    };
    let invitation = state.repo.create_invitation(invitation).await?;

    tracing::info!(
        invitation_id = %invitation.id,
        role = invitation.role.as_str(),
        invited_by = %auth.id,
        "Invitation created"
    );
    activity::complete_step(state.repo.as_ref(), org, OnboardingStep::TeamInvited).await;

    let invite_url = format!(
        "{}/invite/{token}",
        state.config.app_base_url.trim_end_matches('/')
    );
    Ok((
        StatusCode::CREATED,
        Json(InvitationCreated {
            invitation,
            invite_url,
        }),
    ))
}

#[utoipa::path(
    delete,
    path = "/team/invitations/{id}",
    tag = "team",
    params(("id" = Uuid, Path, description = "Invitation ID")),
    responses(
        (status = 204, description = "Revoked"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_invitation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    auth.require(Role::Admin)?;
    if state.repo.delete_invitation(auth.organization_id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Invitation"))
    }
}

/// preview_invitation
///
/// [Public Route] What the accept page shows before the invitee sets a password.
/// The path segment is the invitation token, not the invitation id.
#[utoipa::path(
    get,
    path = "/team/invitations/{id}/preview",
    tag = "team",
    params(("id" = String, Path, description = "Invitation token from the invite link")),
    responses(
        (status = 200, description = "Invitation details", body = InvitationPreview),
        (status = 404, description = "Unknown, expired or used invitation")
    )
)]
pub async fn preview_invitation(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<InvitationPreview>> {
    let invitation = state
        .repo
        .get_invitation_by_token_hash(&jwt::hash_token(&token))
        .await?
        .filter(|i| i.is_pending(Utc::now()))
        .ok_or(AppError::NotFound("Invitation"))?;

    let organization = state
        .repo
        .get_organization(invitation.organization_id)
        .await?
        .ok_or(AppError::NotFound("Invitation"))?;

    Ok(Json(InvitationPreview {
        organization_name: organization.name,
        email: invitation.email,
        role: invitation.role,
        expires_at: invitation.expires_at,
    }))
}

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::{AppError, AppResult},
    models::{Role, User},
    repository::RepositoryState,
};

pub mod jwt;
pub mod password;

pub use jwt::Claims;

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request. Role and organization are
/// read from the stored user, so a demotion or removal takes effect on the next
/// request rather than when the token expires.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    /// The tenant every query of this request is scoped to.
    pub organization_id: Uuid,
    pub role: Role,
    pub email: String,
}

impl AuthUser {
    /// Rejects with 403 unless the user holds at least `role`.
    pub fn require(&self, role: Role) -> AppResult<()> {
        if self.role.at_least(role) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = %self.id,
                role = self.role.as_str(),
                required = role.as_str(),
                "Insufficient role"
            );
            Err(AppError::Forbidden(format!(
                "This action requires the {} role",
                role.as_str()
            )))
        }
    }
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            organization_id: user.organization_id,
            role: user.role,
            email: user.email.clone(),
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Makes `AuthUser` usable as a handler argument. The process:
/// 1. Dependency Resolution: pull the repository and config out of the state.
/// 2. Local Bypass: in `Env::Local`, an `x-user-id` header naming an existing user.
/// 3. Token Validation: Bearer extraction and JWT decoding.
/// 4. DB Lookup: the user must still exist.
///
/// Rejection: `AppError::Unauthorized` (401) on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        // Development bypass, guarded by the Env check.
        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|raw| Uuid::parse_str(raw).ok());
            if let Some(user_id) = bypass_id {
                if let Some(user) = repo.get_user(user_id).await? {
                    return Ok(AuthUser::from(&user));
                }
            }
        }
        // Otherwise fall through to standard JWT validation.

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

        let claims = jwt::validate_token(token, &config).map_err(|e| {
            tracing::debug!(error = %e, "Rejected access token");
            AppError::Unauthorized("Invalid or expired token".to_string())
        })?;

        // A token outlives neither its user nor that user's membership.
        let user = repo
            .get_user(claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))?;

        Ok(AuthUser::from(&user))
    }
}

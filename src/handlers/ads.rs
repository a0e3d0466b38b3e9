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
    models::{Ad, AdStatus, CampaignStatus, CreateAdRequest, Role, UpdateAdRequest},
};

/// A referenced media file must belong to the caller's organization.
async fn check_media(state: &AppState, auth: &AuthUser, media_file_id: Option<Uuid>) -> AppResult<()> {
    if let Some(file_id) = media_file_id {
        if state
            .repo
            .get_media_file(auth.organization_id, file_id)
            .await?
            .is_none()
        {
            return Err(AppError::field("media_file_id", "does not exist"));
        }
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/campaigns/{id}/ads",
    tag = "ads",
    params(("id" = Uuid, Path, description = "Campaign ID")),
    responses(
        (status = 200, description = "Ads of the campaign", body = [Ad]),
        (status = 404, description = "Campaign not found")
    )
)]
pub async fn list_ads(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
) -> AppResult<Json<Vec<Ad>>> {
    state
        .repo
        .get_campaign(auth.organization_id, campaign_id)
        .await?
        .ok_or(AppError::NotFound("Campaign"))?;
    Ok(Json(
        state.repo.list_ads(auth.organization_id, campaign_id).await?,
    ))
}

/// create_ad
///
/// [Authenticated Route, member+] Adds a creative to a campaign. Archived campaigns
/// are closed to new ads.
#[utoipa::path(
    post,
    path = "/campaigns/{id}/ads",
    tag = "ads",
    params(("id" = Uuid, Path, description = "Campaign ID")),
    request_body = CreateAdRequest,
    responses(
        (status = 201, description = "Ad created", body = Ad),
        (status = 404, description = "Campaign not found"),
        (status = 409, description = "Campaign is archived"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create_ad(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
    Json(payload): Json<CreateAdRequest>,
) -> AppResult<(StatusCode, Json<Ad>)> {
    auth.require(Role::Member)?;
    payload.validate()?;

    let campaign = state
        .repo
        .get_campaign(auth.organization_id, campaign_id)
        .await?
        .ok_or(AppError::NotFound("Campaign"))?;
    if campaign.status == CampaignStatus::Archived {
        return Err(AppError::Conflict(
            "Archived campaigns cannot receive new ads".to_string(),
        ));
    }
    check_media(&state, &auth, payload.media_file_id).await?;

    let now = Utc::now();
    let ad = Ad {
        id: Uuid::new_v4(),
        organization_id: auth.organization_id,
        campaign_id,
        name: payload.name.trim().to_string(),
        format: payload.format,
        headline: payload.headline.trim().to_string(),
        body: payload.body,
        call_to_action: payload.call_to_action,
        destination_url: payload.destination_url,
        media_file_id: payload.media_file_id,
        status: AdStatus::Draft,
        created_at: now,
        updated_at: now,
    };
    let ad = state.repo.create_ad(ad).await?;
    Ok((StatusCode::CREATED, Json(ad)))
}

#[utoipa::path(
    get,
    path = "/ads/{id}",
    tag = "ads",
    params(("id" = Uuid, Path, description = "Ad ID")),
    responses(
        (status = 200, description = "Found", body = Ad),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_ad(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Ad>> {
    state
        .repo
        .get_ad(auth.organization_id, id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Ad"))
}

#[utoipa::path(
    put,
    path = "/ads/{id}",
    tag = "ads",
    params(("id" = Uuid, Path, description = "Ad ID")),
    request_body = UpdateAdRequest,
    responses(
        (status = 200, description = "Updated", body = Ad),
        (status = 404, description = "Not Found"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn update_ad(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mut payload): Json<UpdateAdRequest>,
) -> AppResult<Json<Ad>> {
    auth.require(Role::Member)?;
    payload.validate()?;
    payload.name = payload.name.map(|n| n.trim().to_string());
    payload.headline = payload.headline.map(|h| h.trim().to_string());
    check_media(&state, &auth, payload.media_file_id).await?;

    state
        .repo
        .update_ad(auth.organization_id, id, &payload)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Ad"))
}

#[utoipa::path(
    delete,
    path = "/ads/{id}",
    tag = "ads",
    params(("id" = Uuid, Path, description = "Ad ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_ad(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    auth.require(Role::Member)?;
    if state.repo.delete_ad(auth.organization_id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Ad"))
    }
}

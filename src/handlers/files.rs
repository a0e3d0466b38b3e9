use axum::{
    Json,
    extract::{Path, Query, State},
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
        MediaFile, MediaFileResponse, MediaFilter, MediaKind, PresignedUrlRequest,
        PresignedUrlResponse, RegisterMediaRequest, Role, media::organization_prefix,
    },
    services::billing,
    storage::sanitize_key,
};

const ALLOWED_TYPES: &str = "must be image/*, video/* or application/pdf";

fn check_content_type(field: &str, content_type: &str) -> AppResult<MediaKind> {
    MediaKind::from_content_type(content_type).ok_or_else(|| AppError::field(field, ALLOWED_TYPES))
}

fn check_size(state: &AppState, size_bytes: i64) -> AppResult<()> {
    let max = state.config.max_upload_bytes;
    if (1..=max).contains(&size_bytes) {
        Ok(())
    } else {
        Err(AppError::field(
            "size_bytes",
            format!("must be between 1 and {max} bytes"),
        ))
    }
}

/// File extension taken from the client's filename, `bin` when it has none usable.
fn extension_of(filename: &str) -> String {
    std::path::Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .filter(|ext| !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "bin".to_string())
}

async fn to_response(state: &AppState, file: MediaFile) -> AppResult<MediaFileResponse> {
    let download_url = state
        .storage
        .get_presigned_download_url(&file.storage_key)
        .await?;
    Ok(MediaFileResponse {
        kind: MediaKind::from_content_type(&file.content_type).unwrap_or(MediaKind::Document),
        file,
        download_url,
    })
}

/// get_presigned_url
///
/// [Authenticated Route, member+] Issues a ten-minute PUT URL, bound to the declared
/// content type, for a fresh key under the organization's media prefix. The file is
/// uploaded straight to object storage and registered afterwards via POST /files.
#[utoipa::path(
    post,
    path = "/files/presigned",
    tag = "files",
    request_body = PresignedUrlRequest,
    responses(
        (status = 200, description = "Upload URL", body = PresignedUrlResponse),
        (status = 422, description = "Unsupported type or size")
    )
)]
pub async fn get_presigned_url(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PresignedUrlRequest>,
) -> AppResult<Json<PresignedUrlResponse>> {
    auth.require(Role::Member)?;
    payload.validate()?;
    check_content_type("file_type", &payload.file_type)?;
    check_size(&state, payload.size_bytes)?;

    let object_key = format!(
        "{}media/{}.{}",
        organization_prefix(auth.organization_id),
        Uuid::new_v4(),
        extension_of(&payload.filename)
    );

    let upload_url = state
        .storage
        .get_presigned_upload_url(&object_key, &payload.file_type)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to presign upload"))?;

    Ok(Json(PresignedUrlResponse {
        upload_url,
        resource_key: object_key,
    }))
}

/// register_media
///
/// [Authenticated Route, member+] Records an uploaded object in the media library,
/// enforcing the plan's storage quota.
#[utoipa::path(
    post,
    path = "/files",
    tag = "files",
    request_body = RegisterMediaRequest,
    responses(
        (status = 201, description = "Registered", body = MediaFileResponse),
        (status = 402, description = "Storage quota exceeded"),
        (status = 403, description = "Key outside the organization"),
        (status = 409, description = "Key already registered")
    )
)]
pub async fn register_media(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<RegisterMediaRequest>,
) -> AppResult<(StatusCode, Json<MediaFileResponse>)> {
    auth.require(Role::Member)?;
    payload.validate()?;

    let org = auth.organization_id;
    let key = payload.resource_key;
    if sanitize_key(&key) != key || !key.starts_with(&organization_prefix(org)) {
        tracing::warn!(user_id = %auth.id, key = %key, "Media key outside organization prefix");
        return Err(AppError::Forbidden(
            "Files must be stored under your organization".to_string(),
        ));
    }
    check_content_type("content_type", &payload.content_type)?;
    check_size(&state, payload.size_bytes)?;

    let now = Utc::now();
    let limits = billing::effective_limits(state.repo.as_ref(), org, now).await?;
    let used = state.repo.storage_used(org).await?;
    billing::ensure_within(limits.storage_bytes, used, payload.size_bytes, "bytes of storage")?;

    let file = MediaFile {
        id: Uuid::new_v4(),
        organization_id: org,
        uploaded_by: auth.id,
        file_name: payload.file_name.trim().to_string(),
        content_type: payload.content_type.trim().to_ascii_lowercase(),
        size_bytes: payload.size_bytes,
        storage_key: key,
        created_at: now,
    };
    let file = state.repo.create_media_file(file).await?;

    Ok((StatusCode::CREATED, Json(to_response(&state, file).await?)))
}

#[utoipa::path(
    get,
    path = "/files",
    tag = "files",
    params(MediaFilter),
    responses((status = 200, description = "Media library", body = [MediaFileResponse]))
)]
pub async fn list_media(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<MediaFilter>,
) -> AppResult<Json<Vec<MediaFileResponse>>> {
    let files = state.repo.list_media_files(auth.organization_id).await?;

    let mut responses = Vec::with_capacity(files.len());
    for file in files {
        let kind = MediaKind::from_content_type(&file.content_type);
        if filter.kind.is_some() && kind != filter.kind {
            continue;
        }
        responses.push(to_response(&state, file).await?);
    }
    Ok(Json(responses))
}

/// delete_media
///
/// [Authenticated Route, member+] Deletes the stored object first; the row is only
/// removed once storage has confirmed.
#[utoipa::path(
    delete,
    path = "/files/{id}",
    tag = "files",
    params(("id" = Uuid, Path, description = "Media file ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found"),
        (status = 502, description = "Object storage failure")
    )
)]
pub async fn delete_media(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    auth.require(Role::Member)?;
    let file = state
        .repo
        .get_media_file(auth.organization_id, id)
        .await?
        .ok_or(AppError::NotFound("Media file"))?;

    state
        .storage
        .delete_object(&file.storage_key)
        .await
        .inspect_err(|e| tracing::error!(file_id = %id, error = %e, "Failed to delete object"))?;

    if !state.repo.delete_media_file(auth.organization_id, id).await? {
        return Err(AppError::NotFound("Media file"));
    }
    Ok(StatusCode::NO_CONTENT)
}

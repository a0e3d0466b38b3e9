use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{MarkAllReadResponse, Notification, NotificationFilter, UnreadCount},
};

/// get_notifications
///
/// [Authenticated Route] The caller's notifications, newest first.
#[utoipa::path(
    get,
    path = "/notifications",
    tag = "notifications",
    params(NotificationFilter),
    responses((status = 200, description = "Notifications", body = [Notification]))
)]
pub async fn get_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<NotificationFilter>,
) -> AppResult<Json<Vec<Notification>>> {
    let notifications = state
        .repo
        .list_notifications(auth.id, filter.unread_only)
        .await?;
    Ok(Json(notifications))
}

#[utoipa::path(
    get,
    path = "/notifications/unread-count",
    tag = "notifications",
    responses((status = 200, description = "Unread count", body = UnreadCount))
)]
pub async fn get_unread_count(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<UnreadCount>> {
    let unread = state.repo.count_unread_notifications(auth.id).await?;
    Ok(Json(UnreadCount { unread }))
}

/// mark_notification_read
///
/// [Authenticated Route] Only the recipient can mark a notification; anyone else
/// gets 404.
#[utoipa::path(
    patch,
    path = "/notifications/{id}/read",
    tag = "notifications",
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 204, description = "Marked as read"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn mark_notification_read(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if state.repo.mark_notification_read(id, auth.id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Notification"))
    }
}

#[utoipa::path(
    post,
    path = "/notifications/read-all",
    tag = "notifications",
    responses((status = 200, description = "Number of notifications marked", body = MarkAllReadResponse))
)]
pub async fn mark_all_read(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<MarkAllReadResponse>> {
    let updated = state.repo.mark_all_notifications_read(auth.id).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

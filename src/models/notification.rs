use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "notification_kind", rename_all = "snake_case")]
#[ts(export)]
pub enum NotificationKind {
    #[default]
    BudgetExhausted,
    ReportReady,
    MemberJoined,
    IntegrationConnected,
    PlanChanged,
}

/// Notification
///
/// An in-app notification addressed to one user.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Notification {
    pub id: Uuid,
    pub organization_id: Uuid,
    // Recipient.
    pub user_id: Uuid,
    // Sent as "type" for the dashboard; stored in the `kind` column.
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    // Dashboard route to open when the notification is clicked.
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        organization_id: Uuid,
        user_id: Uuid,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        link: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id,
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            link,
            is_read: false,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, IntoParams, Default)]
pub struct NotificationFilter {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UnreadCount {
    pub unread: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

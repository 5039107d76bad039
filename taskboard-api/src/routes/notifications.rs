/// Notification endpoints
///
/// - `GET    /notifications` - every user with their notifications
/// - `POST   /notifications` - create a notification
/// - `GET    /notifications/:id`
/// - `POST   /notifications/:id/read`
/// - `DELETE /notifications/:id`
/// - `GET    /users/:id/notifications` - newest first
/// - `POST   /users/:id/notifications/read` - mark all read
///
/// A notification body is either a plain `message` or a list of `blocks`
/// rendered to text on the way in.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{AppJson, AppPath},
};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use taskboard_shared::notifications::{message, MessageBlock, Notification, NotificationKind, UserNotifications};

/// Create notification request
#[derive(Debug, Deserialize)]
pub struct CreateNotificationRequest {
    #[serde(rename = "userId", alias = "user_id")]
    pub user_id: i32,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub blocks: Option<Vec<MessageBlock>>,

    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl CreateNotificationRequest {
    /// Text body; `blocks` wins over `message`
    fn body(&self) -> ApiResult<String> {
        let body = match (&self.blocks, &self.message) {
            (Some(blocks), _) => {
                message::validate(blocks).map_err(|e| ApiError::field("blocks", e.to_string()))?;
                message::render(blocks)
            }
            (None, Some(text)) => text.clone(),
            (None, None) => String::new(),
        };

        if body.trim().is_empty() {
            return Err(ApiError::field("message", "Message is required"));
        }
        Ok(body)
    }

    fn kind(&self) -> ApiResult<NotificationKind> {
        match self.kind.as_deref() {
            Some(kind) => kind.parse().map_err(|e: taskboard_shared::notifications::UnknownKind| {
                ApiError::field("type", e.to_string())
            }),
            None => Ok(NotificationKind::default()),
        }
    }
}

/// Delete response
#[derive(Debug, Serialize)]
pub struct DeleteNotificationResponse {
    pub success: bool,
    pub id: i32,
}

pub async fn list_notifications(State(state): State<AppState>) -> ApiResult<Json<Vec<UserNotifications>>> {
    let grouped = Notification::list_grouped(&state.db).await?;
    Ok(Json(grouped))
}

/// Create a notification
///
/// # Errors
///
/// - `400 Bad Request`: empty body, unknown type, or unknown user
pub async fn create_notification(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateNotificationRequest>,
) -> ApiResult<(StatusCode, Json<Notification>)> {
    let body = req.body()?;
    let kind = req.kind()?;

    let notification = Notification::create(&state.db, req.user_id, &body, kind).await?;
    Ok((StatusCode::CREATED, Json(notification)))
}

pub async fn get_notification(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> ApiResult<Json<Notification>> {
    let notification = Notification::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Notification {} not found", id)))?;

    Ok(Json(notification))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> ApiResult<Json<Notification>> {
    let notification = Notification::mark_read(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Notification {} not found", id)))?;

    Ok(Json(notification))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> ApiResult<Json<DeleteNotificationResponse>> {
    if !Notification::delete(&state.db, id).await? {
        return Err(ApiError::NotFound(format!("Notification {} not found", id)));
    }

    Ok(Json(DeleteNotificationResponse { success: true, id }))
}

pub async fn list_user_notifications(
    State(state): State<AppState>,
    AppPath(user_id): AppPath<i32>,
) -> ApiResult<Json<Vec<Notification>>> {
    let notifications = Notification::list_by_user(&state.db, user_id).await?;
    Ok(Json(notifications))
}

pub async fn mark_user_notifications_read(
    State(state): State<AppState>,
    AppPath(user_id): AppPath<i32>,
) -> ApiResult<Json<Vec<Notification>>> {
    let notifications = Notification::mark_all_read(&state.db, user_id).await?;
    tracing::debug!(user_id, count = notifications.len(), "Marked notifications read");
    Ok(Json(notifications))
}

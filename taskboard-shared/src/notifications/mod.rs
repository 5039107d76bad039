/// User notifications
///
/// Notifications are created by API handlers (for example after a profile
/// update). Domain operations such as reconciliation never create them.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE notifications (
///     id SERIAL PRIMARY KEY,
///     user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     message TEXT NOT NULL,
///     kind VARCHAR(32) NOT NULL DEFAULT 'info',
///     is_read BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

pub mod message;

pub use message::MessageBlock;

use crate::error::{ServiceError, ServiceResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

const NOTIFICATION_COLUMNS: &str = "id, user_id, message, kind, is_read, created_at";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown notification type '{0}'")]
pub struct UnknownKind(pub String);

impl From<UnknownKind> for ServiceError {
    fn from(err: UnknownKind) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

/// Category of a notification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    #[default]
    Info,
    Profile,
    Assignment,
    Warning,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Profile => "profile",
            NotificationKind::Assignment => "assignment",
            NotificationKind::Warning => "warning",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "info" => Ok(NotificationKind::Info),
            "profile" => Ok(NotificationKind::Profile),
            "assignment" => Ok(NotificationKind::Assignment),
            "warning" => Ok(NotificationKind::Warning),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

impl TryFrom<String> for NotificationKind {
    type Error = UnknownKind;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A notification row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: i32,
    pub user_id: i32,
    pub message: String,

    #[sqlx(try_from = "String")]
    #[serde(rename = "type")]
    pub kind: NotificationKind,

    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Notifications of one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserNotifications {
    pub user_id: i32,
    pub notifications: Vec<Notification>,
}

impl Notification {
    /// Creates an unread notification
    ///
    /// # Errors
    ///
    /// `Validation` for an empty message or a user that does not exist.
    pub async fn create(pool: &PgPool, user_id: i32, message: &str, kind: NotificationKind) -> ServiceResult<Self> {
        if message.trim().is_empty() {
            return Err(ServiceError::validation("Notification message is required"));
        }

        let notification = sqlx::query_as::<_, Notification>(&format!(
            r#"
            INSERT INTO notifications (user_id, message, kind)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        ))
        .bind(user_id)
        .bind(message)
        .bind(kind.as_str())
        .fetch_one(pool)
        .await?;

        debug!(notification_id = notification.id, user_id, kind = %kind, "Created notification");
        Ok(notification)
    }

    /// Creates a notification whose body is rendered from blocks
    pub async fn create_from_blocks(
        pool: &PgPool,
        user_id: i32,
        blocks: &[MessageBlock],
        kind: NotificationKind,
    ) -> ServiceResult<Self> {
        message::validate(blocks)?;
        Self::create(pool, user_id, &message::render(blocks), kind).await
    }

    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(&format!(
            "SELECT {} FROM notifications WHERE id = $1",
            NOTIFICATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Notifications of one user, newest first
    pub async fn list_by_user(pool: &PgPool, user_id: i32) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(&format!(
            "SELECT {} FROM notifications WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
            NOTIFICATION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Every user, ordered by id, with their notifications newest first
    ///
    /// Users without notifications are included with an empty list.
    pub async fn list_grouped(pool: &PgPool) -> Result<Vec<UserNotifications>, sqlx::Error> {
        let user_ids: Vec<i32> = sqlx::query_scalar("SELECT id FROM users ORDER BY id ASC")
            .fetch_all(pool)
            .await?;

        let rows = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {} FROM notifications ORDER BY created_at DESC, id DESC",
            NOTIFICATION_COLUMNS
        ))
        .fetch_all(pool)
        .await?;

        let mut by_user: BTreeMap<i32, Vec<Notification>> = BTreeMap::new();
        for row in rows {
            by_user.entry(row.user_id).or_default().push(row);
        }

        Ok(user_ids
            .into_iter()
            .map(|user_id| UserNotifications {
                user_id,
                notifications: by_user.remove(&user_id).unwrap_or_default(),
            })
            .collect())
    }

    /// Marks one notification read
    ///
    /// Returns None if it does not exist.
    pub async fn mark_read(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(&format!(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 RETURNING {}",
            NOTIFICATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Marks every notification of a user read and returns them
    pub async fn mark_all_read(pool: &PgPool, user_id: i32) -> Result<Vec<Self>, sqlx::Error> {
        let mut rows = sqlx::query_as::<_, Notification>(&format!(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 RETURNING {}",
            NOTIFICATION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    /// Deletes a notification, returning false if it did not exist
    pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Task model and database operations
///
/// Assignment slots (`owner_id`, `reviewer_id`) are written here only on
/// create and on full update; partial reassignment goes through
/// [`crate::assignment::reconcile`].
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('pending', 'in_progress', 'completed');
///
/// CREATE TABLE tasks (
///     id SERIAL PRIMARY KEY,
///     title TEXT NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     deadline DATE NOT NULL,
///     status task_status NOT NULL DEFAULT 'pending',
///     created_by INTEGER REFERENCES users(id) ON DELETE SET NULL,
///     owner_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
///     reviewer_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::assignment::Slots;
/// use taskboard_shared::models::task::{CreateTask, Task};
/// use chrono::NaiveDate;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let task = Task::create(&pool, CreateTask {
///     title: "Write release notes".to_string(),
///     description: String::new(),
///     deadline: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
///     status: None,
///     created_by: Some(1),
///     slots: Slots::new(Some(2), Some(3)),
/// }).await?;
///
/// assert_eq!(task.owner_id, Some(2));
/// # Ok(())
/// # }
/// ```

use crate::assignment::reconcile::ensure_users_exist;
use crate::assignment::Slots;
use crate::error::{ServiceError, ServiceResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;
use tracing::info;

const TASK_COLUMNS: &str = "id, title, description, deadline, status, created_by, owner_id, reviewer_id, created_at, updated_at";

/// Progress of a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(ServiceError::validation(format!("Invalid task status '{}'", other))),
        }
    }
}

/// A task row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub deadline: NaiveDate,
    pub status: TaskStatus,

    /// User who created the task (None once that user is deleted)
    pub created_by: Option<i32>,

    pub owner_id: Option<i32>,
    pub reviewer_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub title: String,
    pub description: String,
    pub deadline: NaiveDate,

    /// Defaults to `pending`
    pub status: Option<TaskStatus>,

    pub created_by: Option<i32>,

    /// Initial owner and reviewer
    pub slots: Slots,
}

/// Input for a full task update
///
/// Scalar fields are always overwritten. When `slots` is `Some`, both
/// assignment slots are replaced, so a slot missing from it is cleared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTask {
    pub title: String,
    pub description: String,
    pub deadline: NaiveDate,
    pub status: TaskStatus,
    pub slots: Option<Slots>,
}

impl Task {
    pub fn slots(&self) -> Slots {
        Slots::new(self.owner_id, self.reviewer_id)
    }

    /// No owner and no reviewer
    pub fn is_idle(&self) -> bool {
        self.slots().is_empty()
    }

    /// Creates a task together with its initial assignments
    ///
    /// # Errors
    ///
    /// - `Validation` if the title is blank, the same user is given both
    ///   slots, or an assigned user does not exist
    /// - `Database` on any other failure (nothing is written)
    pub async fn create(pool: &PgPool, data: CreateTask) -> ServiceResult<Self> {
        if data.title.trim().is_empty() {
            return Err(ServiceError::validation("Task title is required"));
        }
        data.slots.validate()?;

        let mut tx = pool.begin().await?;

        ensure_users_exist(&mut *tx, &data.slots.user_ids()).await?;

        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (title, description, deadline, status, created_by, owner_id, reviewer_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            TASK_COLUMNS
        ))
        .bind(data.title.trim())
        .bind(&data.description)
        .bind(data.deadline)
        .bind(data.status.unwrap_or_default())
        .bind(data.created_by)
        .bind(data.slots.owner)
        .bind(data.slots.reviewer)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(task_id = task.id, owner_id = ?task.owner_id, reviewer_id = ?task.reviewer_id, "Created task");
        Ok(task)
    }

    /// Overwrites a task's fields, and both slots when given
    ///
    /// # Errors
    ///
    /// - `NotFound` if the task does not exist
    /// - `Validation` for a blank title or invalid slots
    pub async fn update(pool: &PgPool, id: i32, data: UpdateTask) -> ServiceResult<Self> {
        if data.title.trim().is_empty() {
            return Err(ServiceError::validation("Task title is required"));
        }
        if let Some(slots) = &data.slots {
            slots.validate()?;
        }

        let mut tx = pool.begin().await?;

        let mut query = String::from(
            "UPDATE tasks SET updated_at = NOW(), title = $2, description = $3, deadline = $4, status = $5",
        );
        if let Some(slots) = &data.slots {
            ensure_users_exist(&mut *tx, &slots.user_ids()).await?;
            query.push_str(", owner_id = $6, reviewer_id = $7");
        }
        query.push_str(&format!(" WHERE id = $1 RETURNING {}", TASK_COLUMNS));

        let mut q = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(data.title.trim())
            .bind(&data.description)
            .bind(data.deadline)
            .bind(data.status);
        if let Some(slots) = data.slots {
            q = q.bind(slots.owner).bind(slots.reviewer);
        }

        let task = q
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Task {} not found", id)))?;

        tx.commit().await?;

        info!(task_id = id, "Updated task");
        Ok(task)
    }

    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All tasks ordered by id
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!("SELECT {} FROM tasks ORDER BY id", TASK_COLUMNS))
            .fetch_all(pool)
            .await
    }

    /// Deletes a task
    ///
    /// Returns false if no task had this id.
    pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Removing assignments
///
/// - [`unassign`]: clears the owner and/or reviewer slot of one task
/// - [`unassign_user_from_tasks`]: removes one user from a list of tasks
/// - [`delete_user`]: removes a user from every task, then deletes the user,
///   reporting which tasks were left without any assignee

use super::plan::Slots;
use super::reconcile::{lock_slots, write_slots};
use crate::error::{ServiceError, ServiceResult};
use crate::roles::TaskRole;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};

/// Which slots of a task to clear
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSelection {
    pub owner: bool,
    pub reviewer: bool,
}

impl SlotSelection {
    pub fn roles(&self) -> Vec<TaskRole> {
        let mut roles = Vec::new();
        if self.owner {
            roles.push(TaskRole::Owner);
        }
        if self.reviewer {
            roles.push(TaskRole::Reviewer);
        }
        roles
    }

    pub fn is_empty(&self) -> bool {
        !self.owner && !self.reviewer
    }
}

/// Result of [`unassign_user_from_tasks`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnassignedTasks {
    pub user_id: i32,

    /// Tasks on which the user actually held a slot
    pub unassigned_tasks: Vec<i32>,
}

/// Result of [`delete_user`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDeletion {
    pub user_id: i32,

    /// Tasks the user was assigned to
    pub unassigned_tasks: Vec<i32>,

    /// Tasks left with neither owner nor reviewer
    pub idle_tasks: Vec<i32>,
}

/// Clears the selected slots of a task
///
/// Returns the slots after the change.
///
/// # Errors
///
/// - `Validation` if no slot is selected (nothing is written)
/// - `NotFound` if the task does not exist
pub async fn unassign(pool: &PgPool, task_id: i32, selection: SlotSelection) -> ServiceResult<Slots> {
    if selection.is_empty() {
        return Err(ServiceError::validation("No users provided for deletion"));
    }

    let mut tx = pool.begin().await?;

    let mut slots = lock_slots(&mut *tx, task_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("Task {} not found", task_id)))?;

    let roles = selection.roles();
    for role in &roles {
        slots.set(*role, None);
    }
    write_slots(&mut *tx, task_id, &slots, &roles).await?;

    tx.commit().await?;

    info!(task_id, owner = selection.owner, reviewer = selection.reviewer, "Cleared task slots");
    Ok(slots)
}

/// Removes `user_id` from whichever slot they hold on each listed task
///
/// Tasks the user is not assigned to are left untouched.
///
/// # Errors
///
/// `Validation` if `task_ids` is empty.
pub async fn unassign_user_from_tasks(pool: &PgPool, user_id: i32, task_ids: &[i32]) -> ServiceResult<UnassignedTasks> {
    if task_ids.is_empty() {
        return Err(ServiceError::validation("No tasks provided for deletion"));
    }

    let mut tx = pool.begin().await?;

    let unassigned: Vec<i32> = sqlx::query_scalar(
        r#"
        UPDATE tasks
        SET owner_id = CASE WHEN owner_id = $1 THEN NULL ELSE owner_id END,
            reviewer_id = CASE WHEN reviewer_id = $1 THEN NULL ELSE reviewer_id END,
            updated_at = NOW()
        WHERE id = ANY($2)
          AND (owner_id = $1 OR reviewer_id = $1)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(task_ids)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(user_id, count = unassigned.len(), "Unassigned user from tasks");

    let mut unassigned_tasks = unassigned;
    unassigned_tasks.sort_unstable();

    Ok(UnassignedTasks {
        user_id,
        unassigned_tasks,
    })
}

/// Deletes a user after removing them from every task slot
///
/// The unassignment is an explicit step in the same transaction (rather than
/// relying on `ON DELETE SET NULL`) so the tasks that end up idle can be
/// reported back to the caller.
///
/// # Errors
///
/// `NotFound` if the user does not exist.
pub async fn delete_user(pool: &PgPool, user_id: i32) -> ServiceResult<UserDeletion> {
    let mut tx = pool.begin().await?;

    let locked: Option<i32> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

    if locked.is_none() {
        return Err(ServiceError::not_found(format!("User {} not found", user_id)));
    }

    let rows: Vec<(i32, Option<i32>, Option<i32>)> = sqlx::query_as(
        r#"
        UPDATE tasks
        SET owner_id = CASE WHEN owner_id = $1 THEN NULL ELSE owner_id END,
            reviewer_id = CASE WHEN reviewer_id = $1 THEN NULL ELSE reviewer_id END,
            updated_at = NOW()
        WHERE owner_id = $1 OR reviewer_id = $1
        RETURNING id, owner_id, reviewer_id
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    let mut unassigned_tasks: Vec<i32> = rows.iter().map(|(id, _, _)| *id).collect();
    let mut idle_tasks: Vec<i32> = rows
        .iter()
        .filter(|(_, owner, reviewer)| Slots::new(*owner, *reviewer).is_empty())
        .map(|(id, _, _)| *id)
        .collect();
    unassigned_tasks.sort_unstable();
    idle_tasks.sort_unstable();

    if !idle_tasks.is_empty() {
        warn!(user_id, idle_tasks = ?idle_tasks, "Deleting user left tasks without assignees");
    }
    info!(user_id, unassigned = unassigned_tasks.len(), "Deleted user");

    Ok(UserDeletion {
        user_id,
        unassigned_tasks,
        idle_tasks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_selection_roles() {
        assert!(SlotSelection::default().is_empty());
        assert!(SlotSelection::default().roles().is_empty());

        let both = SlotSelection {
            owner: true,
            reviewer: true,
        };
        assert_eq!(both.roles(), vec![TaskRole::Owner, TaskRole::Reviewer]);

        let reviewer = SlotSelection {
            owner: false,
            reviewer: true,
        };
        assert!(!reviewer.is_empty());
        assert_eq!(reviewer.roles(), vec![TaskRole::Reviewer]);
    }
}

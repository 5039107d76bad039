/// Applying a desired user-to-role mapping to a task
///
/// # Transaction
///
/// ```text
/// BEGIN
///   SELECT owner_id, reviewer_id FROM tasks WHERE id = $1 FOR UPDATE
///   SELECT id FROM users WHERE id = ANY($1)
///   UPDATE tasks SET <changed slots>, updated_at = NOW() WHERE id = $1
/// COMMIT
/// ```
///
/// The row lock serializes concurrent reconciliations of the same task under
/// READ COMMITTED: the second waits for the first to commit and then plans
/// against the committed slots.

use super::plan::{plan, ClearedSlot, Slots};
use super::RolesMap;
use crate::error::{ServiceError, ServiceResult};
use crate::roles::TaskRole;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};

/// Outcome of a reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedAssignments {
    pub task_id: i32,
    pub owner_id: Option<i32>,
    pub reviewer_id: Option<i32>,

    /// Slots emptied because their holder moved to the other slot
    pub cleared: Vec<ClearedSlot>,
}

impl AppliedAssignments {
    pub fn slots(&self) -> Slots {
        Slots::new(self.owner_id, self.reviewer_id)
    }

    /// Final state as a roles map
    pub fn roles_map(&self) -> RolesMap {
        TaskRole::ALL
            .into_iter()
            .filter_map(|role| self.slots().get(role).map(|id| (id, role)))
            .collect()
    }
}

/// Reconciles the assignment slots of `task_id` with `desired`
///
/// Only the slots named in `desired` are written; see
/// [`plan`](super::plan::plan) for the swap rule. No notification is sent.
///
/// # Errors
///
/// - `Validation`: empty map, unknown role name, two users for one slot,
///   or a user id that does not exist
/// - `NotFound`: the task does not exist
/// - `Database`: anything else; the transaction is rolled back
pub async fn reconcile(pool: &PgPool, task_id: i32, desired: &RolesMap) -> ServiceResult<AppliedAssignments> {
    let requested = desired.requested_slots()?;
    if requested.is_empty() {
        return Err(ServiceError::validation("owner or reviewer must be assigned"));
    }

    let mut tx = pool.begin().await?;

    let current = lock_slots(&mut *tx, task_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("Task {} not found", task_id)))?;

    ensure_users_exist(&mut *tx, &requested.user_ids()).await?;

    let plan = plan(current, requested)?;
    debug!(task_id, before = ?plan.before, after = ?plan.after, "Planned assignment");

    if !plan.is_noop() {
        write_slots(&mut *tx, task_id, &plan.after, &plan.changed_roles()).await?;
    }

    tx.commit().await?;

    for cleared in &plan.cleared {
        info!(
            task_id,
            user_id = cleared.user_id,
            cleared_role = %cleared.role,
            "Cleared slot of user moved to the other role"
        );
    }
    info!(
        task_id,
        owner_id = ?plan.after.owner,
        reviewer_id = ?plan.after.reviewer,
        "Reconciled task assignments"
    );

    Ok(AppliedAssignments {
        task_id,
        owner_id: plan.after.owner,
        reviewer_id: plan.after.reviewer,
        cleared: plan.cleared,
    })
}

/// Reads the slots of a task and locks its row until the transaction ends
pub(crate) async fn lock_slots(conn: &mut PgConnection, task_id: i32) -> Result<Option<Slots>, sqlx::Error> {
    let row: Option<(Option<i32>, Option<i32>)> = sqlx::query_as(
        "SELECT owner_id, reviewer_id FROM tasks WHERE id = $1 FOR UPDATE",
    )
    .bind(task_id)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(|(owner, reviewer)| Slots::new(owner, reviewer)))
}

/// Fails with `Validation` naming every id that has no user row
pub(crate) async fn ensure_users_exist(conn: &mut PgConnection, user_ids: &[i32]) -> ServiceResult<()> {
    if user_ids.is_empty() {
        return Ok(());
    }

    let found: Vec<i32> = sqlx::query_scalar("SELECT id FROM users WHERE id = ANY($1)")
        .bind(user_ids)
        .fetch_all(conn)
        .await?;

    let missing: Vec<String> = user_ids
        .iter()
        .filter(|id| !found.contains(*id))
        .map(|id| id.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::validation(format!("User(s) not found: {}", missing.join(", "))))
    }
}

/// Writes the given slots, touching only the listed columns
pub(crate) async fn write_slots(
    conn: &mut PgConnection,
    task_id: i32,
    slots: &Slots,
    roles: &[TaskRole],
) -> Result<(), sqlx::Error> {
    if roles.is_empty() {
        return Ok(());
    }

    let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
    let mut bind_count = 1;
    for role in roles {
        bind_count += 1;
        query.push_str(&format!(", {} = ${}", role.column(), bind_count));
    }
    query.push_str(" WHERE id = $1");

    let mut q = sqlx::query(&query).bind(task_id);
    for role in roles {
        q = q.bind(slots.get(*role));
    }

    q.execute(conn).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_map_of_applied() {
        let applied = AppliedAssignments {
            task_id: 42,
            owner_id: None,
            reviewer_id: Some(5),
            cleared: vec![ClearedSlot {
                role: TaskRole::Owner,
                user_id: 5,
            }],
        };

        let roles = applied.roles_map();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles.get(5), Some("reviewer"));
        assert_eq!(applied.slots(), Slots::new(None, Some(5)));
    }
}

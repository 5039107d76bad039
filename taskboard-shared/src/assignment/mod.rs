/// Task role assignment
///
/// Each task has two assignment slots, `owner` and `reviewer`, stored as the
/// `tasks.owner_id` and `tasks.reviewer_id` columns. This module owns every
/// write to those columns.
///
/// # Invariants
///
/// - A user holds at most one slot on a task (enforced here and by the
///   `tasks_distinct_assignees` check constraint).
/// - Assigning a user to one slot while they hold the other moves them: the
///   slot they held is cleared in the same transaction.
/// - Every operation runs in a single transaction and either applies fully
///   or not at all.
///
/// # Modules
///
/// - `plan`: pure planning of slot changes (no database access)
/// - `reconcile`: applies a desired user-to-role mapping to a task
/// - `deletion`: clears slots, unassigns users, deletes users
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::assignment::{reconcile, RolesMap};
/// use taskboard_shared::roles::TaskRole;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let mut roles = RolesMap::new();
/// roles.insert(7, TaskRole::Owner.as_str());
/// roles.insert(9, TaskRole::Reviewer.as_str());
///
/// let applied = reconcile(&pool, 42, &roles).await?;
/// assert_eq!(applied.owner_id, Some(7));
/// # Ok(())
/// # }
/// ```

pub mod deletion;
pub mod plan;
pub mod reconcile;

pub use deletion::{delete_user, unassign, unassign_user_from_tasks, SlotSelection, UnassignedTasks, UserDeletion};
pub use plan::{plan, AssignmentPlan, ClearedSlot, Slots};
pub use reconcile::{reconcile, AppliedAssignments};

use crate::error::{ServiceError, ServiceResult};
use crate::roles::TaskRole;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// User id as sent by clients: a JSON number or a numeric string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UserKey {
    Id(i32),
    Text(String),
}

impl TryFrom<UserKey> for i32 {
    type Error = String;

    fn try_from(key: UserKey) -> Result<Self, Self::Error> {
        match key {
            UserKey::Id(id) => Ok(id),
            UserKey::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| format!("Invalid user id '{}'", text)),
        }
    }
}

/// Desired mapping from user id to task role name
///
/// Serialized as an array of `[userId, roleName]` pairs because JSON objects
/// cannot have integer keys. A user listed twice keeps the last role given.
///
/// ```
/// use taskboard_shared::assignment::RolesMap;
///
/// let roles: RolesMap = serde_json::from_str(r#"[[1, "owner"], ["2", "reviewer"]]"#).unwrap();
/// assert_eq!(roles.len(), 2);
/// assert_eq!(roles.get(2), Some("reviewer"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(UserKey, String)>", into = "Vec<(i32, String)>")]
pub struct RolesMap(BTreeMap<i32, String>);

impl RolesMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, user_id: i32, role: impl Into<String>) {
        self.0.insert(user_id, role.into());
    }

    pub fn get(&self, user_id: i32) -> Option<&str> {
        self.0.get(&user_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &str)> {
        self.0.iter().map(|(id, role)| (*id, role.as_str()))
    }

    /// Converts the mapping into the slots it requests
    ///
    /// Slots not named by any user stay `None` (untouched). Fails when a
    /// role name is not a task role or two users request the same slot.
    pub fn requested_slots(&self) -> ServiceResult<Slots> {
        let mut slots = Slots::default();

        for (user_id, role_name) in self.iter() {
            let role: TaskRole = role_name.parse()?;

            if let Some(existing) = slots.get(role) {
                return Err(ServiceError::validation(format!(
                    "Users {} and {} cannot both be assigned as {}",
                    existing, user_id, role
                )));
            }

            slots.set(role, Some(user_id));
        }

        Ok(slots)
    }
}

impl TryFrom<Vec<(UserKey, String)>> for RolesMap {
    type Error = String;

    fn try_from(pairs: Vec<(UserKey, String)>) -> Result<Self, Self::Error> {
        let mut map = BTreeMap::new();
        for (key, role) in pairs {
            map.insert(i32::try_from(key)?, role);
        }
        Ok(RolesMap(map))
    }
}

impl From<RolesMap> for Vec<(i32, String)> {
    fn from(map: RolesMap) -> Self {
        map.0.into_iter().collect()
    }
}

impl FromIterator<(i32, TaskRole)> for RolesMap {
    fn from_iter<I: IntoIterator<Item = (i32, TaskRole)>>(iter: I) -> Self {
        RolesMap(
            iter.into_iter()
                .map(|(id, role)| (id, role.as_str().to_string()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_map_accepts_numeric_strings() {
        let roles: RolesMap = serde_json::from_str(r#"[["12", "owner"], [7, "reviewer"]]"#).unwrap();
        assert_eq!(roles.get(12), Some("owner"));
        assert_eq!(roles.get(7), Some("reviewer"));
    }

    #[test]
    fn test_roles_map_rejects_bad_ids() {
        let result: Result<RolesMap, _> = serde_json::from_str(r#"[["abc", "owner"]]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_roles_map_last_role_wins() {
        let roles: RolesMap = serde_json::from_str(r#"[[3, "owner"], [3, "reviewer"]]"#).unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles.get(3), Some("reviewer"));
    }

    #[test]
    fn test_roles_map_serializes_as_pairs() {
        let roles: RolesMap = [(2, TaskRole::Reviewer), (1, TaskRole::Owner)].into_iter().collect();
        let json = serde_json::to_value(&roles).unwrap();
        assert_eq!(json, serde_json::json!([[1, "owner"], [2, "reviewer"]]));
    }

    #[test]
    fn test_requested_slots() {
        let roles: RolesMap = [(1, TaskRole::Owner), (2, TaskRole::Reviewer)].into_iter().collect();
        let slots = roles.requested_slots().unwrap();
        assert_eq!(slots.owner, Some(1));
        assert_eq!(slots.reviewer, Some(2));
    }

    #[test]
    fn test_requested_slots_unknown_role() {
        let mut roles = RolesMap::new();
        roles.insert(1, "viewer");
        let err = roles.requested_slots().unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(err.to_string().contains("viewer"));
    }

    #[test]
    fn test_requested_slots_duplicate_role() {
        let mut roles = RolesMap::new();
        roles.insert(1, "owner");
        roles.insert(2, "owner");
        let err = roles.requested_slots().unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}

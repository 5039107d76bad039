/// Slot planning
///
/// Works out the final `(owner, reviewer)` pair for a task from its current
/// slots and the slots a caller requested. No I/O happens here, which keeps
/// the swap rule testable in isolation.

use crate::error::{ServiceError, ServiceResult};
use crate::roles::TaskRole;
use serde::{Deserialize, Serialize};

/// Owner and reviewer of a task
///
/// Also used for *requested* slots, where `None` means "leave this slot
/// alone" rather than "clear it".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slots {
    pub owner: Option<i32>,
    pub reviewer: Option<i32>,
}

impl Slots {
    pub fn new(owner: Option<i32>, reviewer: Option<i32>) -> Self {
        Self { owner, reviewer }
    }

    pub fn get(&self, role: TaskRole) -> Option<i32> {
        match role {
            TaskRole::Owner => self.owner,
            TaskRole::Reviewer => self.reviewer,
        }
    }

    pub fn set(&mut self, role: TaskRole, user_id: Option<i32>) {
        match role {
            TaskRole::Owner => self.owner = user_id,
            TaskRole::Reviewer => self.reviewer = user_id,
        }
    }

    /// Slot held by `user_id`, if any
    pub fn role_of(&self, user_id: i32) -> Option<TaskRole> {
        TaskRole::ALL
            .into_iter()
            .find(|role| self.get(*role) == Some(user_id))
    }

    /// No owner and no reviewer
    pub fn is_empty(&self) -> bool {
        self.owner.is_none() && self.reviewer.is_none()
    }

    /// Distinct user ids named by the slots
    pub fn user_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = TaskRole::ALL.iter().filter_map(|r| self.get(*r)).collect();
        ids.dedup();
        ids
    }

    /// Rejects a user holding both slots
    pub fn validate(&self) -> ServiceResult<()> {
        match (self.owner, self.reviewer) {
            (Some(owner), Some(reviewer)) if owner == reviewer => Err(ServiceError::validation(format!(
                "User {} cannot be both owner and reviewer of the same task",
                owner
            ))),
            _ => Ok(()),
        }
    }
}

/// A slot emptied by the swap rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearedSlot {
    /// Slot that was emptied
    pub role: TaskRole,

    /// User who held it and now holds the other slot
    pub user_id: i32,
}

/// Result of planning a reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentPlan {
    pub before: Slots,
    pub after: Slots,
    pub cleared: Vec<ClearedSlot>,
}

impl AssignmentPlan {
    /// Slots whose value differs between `before` and `after`
    pub fn changed_roles(&self) -> Vec<TaskRole> {
        TaskRole::ALL
            .into_iter()
            .filter(|role| self.before.get(*role) != self.after.get(*role))
            .collect()
    }

    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }
}

/// Plans the new slots for a task
///
/// Each requested slot is overwritten. If the user placed in a slot currently
/// holds the other slot, and the request leaves that other slot untouched,
/// the other slot is cleared so the user never holds both.
///
/// # Errors
///
/// `Validation` when nothing is requested, or when the request itself names
/// one user for both slots.
pub fn plan(current: Slots, requested: Slots) -> ServiceResult<AssignmentPlan> {
    if requested.is_empty() {
        return Err(ServiceError::validation("owner or reviewer must be assigned"));
    }
    requested.validate()?;

    let mut after = current;
    let mut cleared = Vec::new();

    for role in TaskRole::ALL {
        let Some(user_id) = requested.get(role) else {
            continue;
        };

        after.set(role, Some(user_id));

        let other = role.other();
        if requested.get(other).is_none() && current.get(other) == Some(user_id) {
            after.set(other, None);
            cleared.push(ClearedSlot { role: other, user_id });
        }
    }

    after.validate()?;

    Ok(AssignmentPlan {
        before: current,
        after,
        cleared,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: i32 = 1;
    const B: i32 = 2;
    const C: i32 = 3;

    #[test]
    fn test_assign_both_on_empty_task() {
        let plan = plan(Slots::default(), Slots::new(Some(A), Some(B))).unwrap();
        assert_eq!(plan.after, Slots::new(Some(A), Some(B)));
        assert!(plan.cleared.is_empty());
        assert_eq!(plan.changed_roles(), vec![TaskRole::Owner, TaskRole::Reviewer]);
    }

    #[test]
    fn test_owner_becomes_reviewer() {
        let plan = plan(Slots::new(Some(A), None), Slots::new(None, Some(A))).unwrap();
        assert_eq!(plan.after, Slots::new(None, Some(A)));
        assert_eq!(
            plan.cleared,
            vec![ClearedSlot {
                role: TaskRole::Owner,
                user_id: A
            }]
        );
    }

    #[test]
    fn test_reviewer_becomes_owner() {
        let plan = plan(Slots::new(Some(B), Some(A)), Slots::new(Some(A), None)).unwrap();
        assert_eq!(plan.after, Slots::new(Some(A), None));
        assert_eq!(plan.cleared[0].role, TaskRole::Reviewer);
    }

    #[test]
    fn test_explicit_swap_clears_nothing() {
        let plan = plan(Slots::new(Some(A), Some(B)), Slots::new(Some(B), Some(A))).unwrap();
        assert_eq!(plan.after, Slots::new(Some(B), Some(A)));
        assert!(plan.cleared.is_empty());
    }

    #[test]
    fn test_untouched_slot_survives() {
        let plan = plan(Slots::new(Some(A), Some(B)), Slots::new(Some(C), None)).unwrap();
        assert_eq!(plan.after, Slots::new(Some(C), Some(B)));
        assert!(plan.cleared.is_empty());
        assert_eq!(plan.changed_roles(), vec![TaskRole::Owner]);
    }

    #[test]
    fn test_same_request_twice_is_noop() {
        let requested = Slots::new(Some(A), Some(B));
        let first = plan(Slots::default(), requested).unwrap();
        let second = plan(first.after, requested).unwrap();
        assert_eq!(second.after, first.after);
        assert!(second.is_noop());
    }

    #[test]
    fn test_empty_request_rejected() {
        let err = plan(Slots::new(Some(A), None), Slots::default()).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn test_same_user_both_slots_rejected() {
        let err = plan(Slots::default(), Slots::new(Some(A), Some(A))).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn test_slots_helpers() {
        let slots = Slots::new(Some(A), Some(B));
        assert_eq!(slots.role_of(A), Some(TaskRole::Owner));
        assert_eq!(slots.role_of(B), Some(TaskRole::Reviewer));
        assert_eq!(slots.role_of(C), None);
        assert_eq!(slots.user_ids(), vec![A, B]);
        assert!(!slots.is_empty());
        assert!(Slots::default().is_empty());
    }
}

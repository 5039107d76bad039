/// Task endpoints
///
/// - `GET    /tasks` - list tasks with creator and assignees
/// - `POST   /tasks` - create a task with its initial owner/reviewer
/// - `GET    /tasks/:id` - one task with creator and assignees
/// - `PUT    /tasks/:id` - full update, assignment slots replaced
/// - `PATCH  /tasks/:id` - reconcile assignments (swap rule applies)
/// - `DELETE /tasks/:id` - delete a task
/// - `DELETE /tasks/:id/users` - clear the owner and/or reviewer slot
///
/// Assignments are sent either as `rolesMap`, an array of
/// `[userId, "owner" | "reviewer"]` pairs, or as `ownerId` / `reviewerId`.
/// When both are present `rolesMap` wins.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{AppJson, AppPath},
};
use axum::{extract::State, http::StatusCode, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    assignment::{self, ClearedSlot, RolesMap, SlotSelection, Slots},
    models::task::{CreateTask, Task, TaskStatus, UpdateTask},
    query::{self, TaskDetail},
    roles::TaskRole,
};
use validator::Validate;

/// Assignment fields shared by every task request
#[derive(Debug, Default, Deserialize)]
pub struct AssignmentFields {
    #[serde(rename = "rolesMap", default)]
    pub roles_map: Option<RolesMap>,

    #[serde(rename = "ownerId", alias = "owner_id", default)]
    pub owner_id: Option<i32>,

    #[serde(rename = "reviewerId", alias = "reviewer_id", default)]
    pub reviewer_id: Option<i32>,
}

impl AssignmentFields {
    /// Requested user-to-role mapping, None if nothing was sent
    pub fn roles_map(&self) -> ApiResult<Option<RolesMap>> {
        if let Some(map) = &self.roles_map {
            return Ok(Some(map.clone()));
        }
        if self.owner_id.is_none() && self.reviewer_id.is_none() {
            return Ok(None);
        }

        Slots::new(self.owner_id, self.reviewer_id).validate()?;

        let mut map = RolesMap::new();
        if let Some(id) = self.owner_id {
            map.insert(id, TaskRole::Owner.as_str());
        }
        if let Some(id) = self.reviewer_id {
            map.insert(id, TaskRole::Reviewer.as_str());
        }
        Ok(Some(map))
    }

    /// Slots named by the request; unnamed slots are empty
    fn slots(&self) -> ApiResult<Option<Slots>> {
        match self.roles_map()? {
            Some(map) => Ok(Some(map.requested_slots()?)),
            None => Ok(None),
        }
    }
}

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title is required (max 255 characters)"))]
    pub title: String,

    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,

    pub deadline: NaiveDate,

    #[serde(default)]
    pub status: Option<TaskStatus>,

    #[serde(alias = "createdBy", default)]
    pub created_by: Option<i32>,

    #[serde(flatten)]
    pub assignments: AssignmentFields,
}

/// Full update request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title is required (max 255 characters)"))]
    pub title: String,

    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,

    pub deadline: NaiveDate,

    pub status: TaskStatus,

    #[serde(flatten)]
    pub assignments: AssignmentFields,
}

/// Reconcile request
#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    #[serde(flatten)]
    pub assignments: AssignmentFields,
}

/// Reconcile response
#[derive(Debug, Serialize)]
pub struct AssignResponse {
    pub id: i32,
    #[serde(rename = "rolesMap")]
    pub roles_map: RolesMap,
    pub owner_id: Option<i32>,
    pub reviewer_id: Option<i32>,
    pub cleared: Vec<ClearedSlot>,
}

/// Clear slots request
#[derive(Debug, Default, Deserialize)]
pub struct UnassignRequest {
    #[serde(rename = "deleteOwner", alias = "delete_owner", default)]
    pub delete_owner: bool,

    #[serde(rename = "deleteReviewer", alias = "delete_reviewer", default)]
    pub delete_reviewer: bool,
}

/// Clear slots response
#[derive(Debug, Serialize)]
pub struct UnassignResponse {
    pub id: i32,
    pub owner_id: Option<i32>,
    pub reviewer_id: Option<i32>,
    pub idle: bool,
}

pub async fn list_tasks(State(state): State<AppState>) -> ApiResult<Json<Vec<TaskDetail>>> {
    let tasks = query::list_tasks(&state.db).await?;
    Ok(Json(tasks))
}

/// Create a task
///
/// # Errors
///
/// - `400 Bad Request`: missing fields, invalid assignment, unknown user
pub async fn create_task(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;

    let slots = req.assignments.slots()?.unwrap_or_default();

    let task = Task::create(
        &state.db,
        CreateTask {
            title: req.title,
            description: req.description,
            deadline: req.deadline,
            status: req.status,
            created_by: req.created_by,
            slots,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> ApiResult<Json<TaskDetail>> {
    let task = query::get_task_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Task {} not found", id)))?;

    Ok(Json(task))
}

/// Overwrite a task
///
/// When an assignment is sent, both slots are replaced: a slot the request
/// does not name is cleared.
pub async fn update_task(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(req): AppJson<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate()?;

    let slots = req.assignments.slots()?;

    let task = Task::update(
        &state.db,
        id,
        UpdateTask {
            title: req.title,
            description: req.description,
            deadline: req.deadline,
            status: req.status,
            slots,
        },
    )
    .await?;

    Ok(Json(task))
}

/// Reconcile the owner/reviewer slots with the requested mapping
///
/// # Errors
///
/// - `400 Bad Request`: empty mapping, unknown role, duplicate slot, unknown user
/// - `404 Not Found`: task does not exist
pub async fn assign_task(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(req): AppJson<AssignRequest>,
) -> ApiResult<Json<AssignResponse>> {
    let roles_map = req.assignments.roles_map()?.unwrap_or_default();

    let applied = assignment::reconcile(&state.db, id, &roles_map).await?;

    Ok(Json(AssignResponse {
        id: applied.task_id,
        roles_map: applied.roles_map(),
        owner_id: applied.owner_id,
        reviewer_id: applied.reviewer_id,
        cleared: applied.cleared,
    }))
}

pub async fn delete_task(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> ApiResult<StatusCode> {
    if !Task::delete(&state.db, id).await? {
        return Err(ApiError::NotFound(format!("Task {} not found", id)));
    }

    tracing::info!(task_id = id, "Deleted task");
    Ok(StatusCode::NO_CONTENT)
}

/// Clear the owner and/or reviewer slot of a task
///
/// # Errors
///
/// - `400 Bad Request`: neither slot selected (nothing changes)
/// - `404 Not Found`: task does not exist
pub async fn unassign_task_users(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(req): AppJson<UnassignRequest>,
) -> ApiResult<Json<UnassignResponse>> {
    let slots = assignment::unassign(
        &state.db,
        id,
        SlotSelection {
            owner: req.delete_owner,
            reviewer: req.delete_reviewer,
        },
    )
    .await?;

    Ok(Json(UnassignResponse {
        id,
        owner_id: slots.owner,
        reviewer_id: slots.reviewer,
        idle: slots.is_empty(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_map_wins_over_ids() {
        let fields: AssignmentFields =
            serde_json::from_str(r#"{"rolesMap": [[1, "reviewer"]], "ownerId": 2}"#).unwrap();
        let map = fields.roles_map().unwrap().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(1), Some("reviewer"));
    }

    #[test]
    fn test_ids_become_roles_map() {
        let fields: AssignmentFields = serde_json::from_str(r#"{"ownerId": 2, "reviewer_id": 3}"#).unwrap();
        let map = fields.roles_map().unwrap().unwrap();
        assert_eq!(map.get(2), Some("owner"));
        assert_eq!(map.get(3), Some("reviewer"));
    }

    #[test]
    fn test_same_user_for_both_ids_is_rejected() {
        let fields: AssignmentFields = serde_json::from_str(r#"{"ownerId": 4, "reviewerId": 4}"#).unwrap();
        let err = fields.roles_map().unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_no_assignment_fields() {
        let fields: AssignmentFields = serde_json::from_str("{}").unwrap();
        assert!(fields.roles_map().unwrap().is_none());
        assert_eq!(fields.slots().unwrap(), None);
    }

    #[test]
    fn test_create_request_validation() {
        let req: CreateTaskRequest = serde_json::from_str(
            r#"{"title": "", "description": "d", "deadline": "2025-03-01", "rolesMap": [[1, "owner"]]}"#,
        )
        .unwrap();
        assert!(req.validate().is_err());
        assert_eq!(req.assignments.slots().unwrap(), Some(Slots::new(Some(1), None)));
    }

    #[test]
    fn test_update_request_requires_every_field() {
        let req: UpdateTaskRequest = serde_json::from_str(
            r#"{"title": "t", "description": "d", "deadline": "2025-03-01", "status": "completed"}"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.status, TaskStatus::Completed);

        let req: UpdateTaskRequest = serde_json::from_str(
            r#"{"title": "t", "description": "", "deadline": "2025-03-01", "status": "pending"}"#,
        )
        .unwrap();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("description"));

        let missing_description =
            serde_json::from_str::<UpdateTaskRequest>(r#"{"title": "t", "deadline": "2025-03-01", "status": "pending"}"#);
        assert!(missing_description.is_err());

        let missing_status =
            serde_json::from_str::<UpdateTaskRequest>(r#"{"title": "t", "description": "d", "deadline": "2025-03-01"}"#);
        assert!(missing_status.is_err());
    }

    #[test]
    fn test_unassign_request_defaults() {
        let req: UnassignRequest = serde_json::from_str(r#"{"deleteReviewer": true}"#).unwrap();
        assert!(!req.delete_owner);
        assert!(req.delete_reviewer);
    }
}

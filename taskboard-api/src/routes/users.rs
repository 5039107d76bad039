/// User endpoints
///
/// - `GET    /users` - every user with role and assigned tasks
/// - `POST   /users` - create a user with an account role
/// - `POST   /signup` - self-service signup as a viewer
/// - `GET    /users/me` - the session user
/// - `GET    /users/:id?fields=name,email` - one user, optionally partial
/// - `PUT    /users/:id` - update name, email and role
/// - `DELETE /users/:id` - unassign from every task, then delete
/// - `DELETE /users/:id/tasks` - unassign from selected tasks

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{AppJson, AppPath, AppQuery},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    assignment::{self, UnassignedTasks, UserDeletion},
    auth::{password, session::SessionContext},
    models::user::{NewUser, User, UserChanges},
    notifications::{MessageBlock, Notification, NotificationKind},
    query::{self, UserDetail, UserFieldSet, UserView},
    roles::AccountRole,
};
use validator::Validate;

/// Create user request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,

    /// Account role name, defaults to viewer
    #[serde(default)]
    pub role: Option<String>,
}

/// Signup request
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

/// Signup response
#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub success: bool,
    pub id: i32,
    pub message: String,
}

/// Update user request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub role: String,
}

/// `?fields=` query parameter
#[derive(Debug, Default, Deserialize)]
pub struct FieldsQuery {
    pub fields: Option<String>,
}

/// Unassign from tasks request
#[derive(Debug, Deserialize)]
pub struct UnassignTasksRequest {
    #[serde(rename = "selectedTaskIdList", alias = "task_ids")]
    pub selected_task_ids: Vec<i32>,
}

/// Either the full user or a field selection
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum UserResponse {
    Full(UserDetail),
    Partial(UserView),
}

fn parse_role(name: &str) -> ApiResult<AccountRole> {
    name.parse::<AccountRole>()
        .map_err(|e| ApiError::field("role", e.to_string()))
}

fn check_password(plain: &str) -> ApiResult<String> {
    password::validate_password(plain).map_err(|e| ApiError::field("password", e))?;
    Ok(password::hash_password(plain)?)
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<UserDetail>>> {
    let users = query::get_users(&state.db).await?;
    Ok(Json(users))
}

/// Create a user
///
/// When a session is present, only callers allowed to create users
/// (admins) may do so.
///
/// # Errors
///
/// - `400 Bad Request`: validation failed or unknown role
/// - `403 Forbidden`: session user may not create users
/// - `409 Conflict`: email already exists
pub async fn create_user(
    State(state): State<AppState>,
    session: Option<Extension<SessionContext>>,
    AppJson(req): AppJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    if let Some(Extension(session)) = &session {
        if !session.role.user_form_permissions().can_create {
            return Err(ApiError::Forbidden("Only admins can create users".to_string()));
        }
    }

    req.validate()?;
    let role = match req.role.as_deref() {
        Some(name) => parse_role(name)?,
        None => AccountRole::Viewer,
    };
    let password_hash = check_password(&req.password)?;

    let user = User::create(
        &state.db,
        NewUser {
            name: req.name,
            email: req.email,
            password_hash,
            role,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Self-service signup
///
/// New accounts get the viewer role.
pub async fn signup(
    State(state): State<AppState>,
    AppJson(req): AppJson<SignupRequest>,
) -> ApiResult<(StatusCode, Json<SignupResponse>)> {
    req.validate()?;
    let password_hash = check_password(&req.password)?;

    let user = User::create(
        &state.db,
        NewUser {
            name: req.name,
            email: req.email,
            password_hash,
            role: AccountRole::Viewer,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            success: true,
            id: user.id,
            message: "User created".to_string(),
        }),
    ))
}

/// The session user with role and assigned tasks
///
/// # Errors
///
/// - `401 Unauthorized`: no session context
pub async fn current_user(
    State(state): State<AppState>,
    session: Option<Extension<SessionContext>>,
) -> ApiResult<Json<UserDetail>> {
    let Some(Extension(session)) = session else {
        return Err(ApiError::Unauthorized("No session user".to_string()));
    };

    let user = query::get_user_by_id(&state.db, session.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", session.user_id)))?;

    Ok(Json(user))
}

/// One user, optionally restricted to `?fields=`
///
/// # Errors
///
/// - `400 Bad Request`: unknown field name
/// - `404 Not Found`: user does not exist
pub async fn get_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppQuery(params): AppQuery<FieldsQuery>,
) -> ApiResult<Json<UserResponse>> {
    let not_found = || ApiError::NotFound(format!("User {} not found", id));

    let response = match params.fields.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
        Some(list) => {
            let fields = UserFieldSet::parse(list)?;
            let view = query::get_user_with_fields(&state.db, id, &fields)
                .await?
                .ok_or_else(not_found)?;
            UserResponse::Partial(view)
        }
        None => UserResponse::Full(query::get_user_by_id(&state.db, id).await?.ok_or_else(not_found)?),
    };

    Ok(Json(response))
}

/// Update a user's name, email and role
///
/// With a session present, the caller's field permissions apply: a
/// non-admin may edit only their own profile and never the role.
/// The updated user receives a profile notification.
///
/// # Errors
///
/// - `400 Bad Request`: validation failed or unknown role
/// - `403 Forbidden`: field not editable by the session user
/// - `404 Not Found`: user does not exist
/// - `409 Conflict`: email already exists
pub async fn update_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    session: Option<Extension<SessionContext>>,
    AppJson(req): AppJson<UpdateUserRequest>,
) -> ApiResult<Json<UserDetail>> {
    req.validate()?;
    let role = parse_role(&req.role)?;

    let current = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))?;
    let current_role = User::account_role(&state.db, id).await?;

    let changes = UserChanges {
        name: Some(req.name.trim().to_string()).filter(|n| *n != current.name),
        email: Some(req.email.trim().to_string()).filter(|e| *e != current.email),
        role: Some(role).filter(|r| Some(*r) != current_role),
    };

    if let Some(Extension(session)) = &session {
        let perms = session.user_form_permissions(id);
        let denied = [
            ("name", changes.name.is_some()),
            ("email", changes.email.is_some()),
            ("role", changes.role.is_some()),
        ]
        .into_iter()
        .find(|(field, changed)| *changed && !perms.can_edit(field));

        if let Some((field, _)) = denied {
            tracing::warn!(session_user = session.user_id, target_user = id, field, "Edit denied");
            return Err(ApiError::Forbidden(if field == "role" {
                "Only admins can change user roles".to_string()
            } else {
                format!("Not allowed to edit {}", field)
            }));
        }
    }

    if !changes.is_empty() {
        let changed = changed_fields(&changes);
        User::update(&state.db, id, changes).await?;
        notify_profile_update(&state, id, &changed).await;
    }

    let user = query::get_user_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))?;

    Ok(Json(user))
}

fn changed_fields(changes: &UserChanges) -> Vec<String> {
    let mut fields = Vec::new();
    if changes.name.is_some() {
        fields.push("name".to_string());
    }
    if changes.email.is_some() {
        fields.push("email".to_string());
    }
    if let Some(role) = changes.role {
        fields.push(format!("role ({})", role));
    }
    fields
}

/// Best effort: a failed notification does not fail the update
async fn notify_profile_update(state: &AppState, user_id: i32, changed: &[String]) {
    let blocks = [
        MessageBlock::H3("Profile updated".to_string()),
        MessageBlock::Paragraph("The following details of your account changed:".to_string()),
        MessageBlock::Bullets(changed.to_vec()),
    ];

    if let Err(e) = Notification::create_from_blocks(&state.db, user_id, &blocks, NotificationKind::Profile).await {
        tracing::warn!(user_id, error = %e, "Failed to create profile notification");
    }
}

/// Delete a user
///
/// The user is first removed from every task slot; the response lists the
/// tasks that were left without any assignee.
pub async fn delete_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> ApiResult<Json<UserDeletion>> {
    let deletion = assignment::delete_user(&state.db, id).await?;
    Ok(Json(deletion))
}

/// Remove a user from the selected tasks
///
/// # Errors
///
/// - `400 Bad Request`: empty task list
pub async fn unassign_user_tasks(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(req): AppJson<UnassignTasksRequest>,
) -> ApiResult<Json<UnassignedTasks>> {
    let result = assignment::unassign_user_from_tasks(&state.db, id, &req.selected_task_ids).await?;
    Ok(Json(result))
}

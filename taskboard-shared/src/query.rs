/// Read models joining tasks, users and roles
///
/// Handlers return these shapes directly. Each function issues a fixed
/// number of queries regardless of how many rows come back.

use crate::error::{ServiceError, ServiceResult};
use crate::models::task::TaskStatus;
use crate::roles::TaskRole;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Minimal user reference embedded in a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: i32,
    pub name: String,
    pub email: String,
}

/// A task with its creator and assignees resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDetail {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub deadline: NaiveDate,
    pub status: TaskStatus,
    pub created_by: Option<i32>,
    pub creator_name: Option<String>,
    pub owner: Option<UserSummary>,
    pub reviewer: Option<UserSummary>,

    /// Neither owner nor reviewer assigned
    pub idle: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct TaskDetailRow {
    id: i32,
    title: String,
    description: String,
    deadline: NaiveDate,
    status: TaskStatus,
    created_by: Option<i32>,
    creator_name: Option<String>,
    owner_id: Option<i32>,
    owner_name: Option<String>,
    owner_email: Option<String>,
    reviewer_id: Option<i32>,
    reviewer_name: Option<String>,
    reviewer_email: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn summary(id: Option<i32>, name: Option<String>, email: Option<String>) -> Option<UserSummary> {
    Some(UserSummary {
        id: id?,
        name: name.unwrap_or_default(),
        email: email.unwrap_or_default(),
    })
}

impl From<TaskDetailRow> for TaskDetail {
    fn from(row: TaskDetailRow) -> Self {
        let owner = summary(row.owner_id, row.owner_name, row.owner_email);
        let reviewer = summary(row.reviewer_id, row.reviewer_name, row.reviewer_email);

        TaskDetail {
            id: row.id,
            title: row.title,
            description: row.description,
            deadline: row.deadline,
            status: row.status,
            created_by: row.created_by,
            creator_name: row.creator_name,
            idle: owner.is_none() && reviewer.is_none(),
            owner,
            reviewer,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const TASK_DETAIL_SELECT: &str = r#"
    SELECT t.id, t.title, t.description, t.deadline, t.status, t.created_by,
           cu.name AS creator_name,
           t.owner_id, ou.name AS owner_name, ou.email AS owner_email,
           t.reviewer_id, ru.name AS reviewer_name, ru.email AS reviewer_email,
           t.created_at, t.updated_at
    FROM tasks t
    LEFT JOIN users cu ON cu.id = t.created_by
    LEFT JOIN users ou ON ou.id = t.owner_id
    LEFT JOIN users ru ON ru.id = t.reviewer_id
"#;

/// One task with creator and assignees, or None if it does not exist
pub async fn get_task_by_id(pool: &PgPool, id: i32) -> ServiceResult<Option<TaskDetail>> {
    let row = sqlx::query_as::<_, TaskDetailRow>(&format!("{} WHERE t.id = $1", TASK_DETAIL_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(TaskDetail::from))
}

/// Every task ordered by id
pub async fn list_tasks(pool: &PgPool) -> ServiceResult<Vec<TaskDetail>> {
    let rows = sqlx::query_as::<_, TaskDetailRow>(&format!("{} ORDER BY t.id ASC", TASK_DETAIL_SELECT))
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(TaskDetail::from).collect())
}

/// A task as seen from one of its assignees
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct AssignedTask {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub deadline: NaiveDate,
    pub status: TaskStatus,
    pub creator_name: Option<String>,

    /// Slot the user holds on this task
    #[sqlx(try_from = "String")]
    pub role: TaskRole,
}

/// A user with account role and assigned tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserDetail {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub assigned_tasks: Vec<AssignedTask>,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i32,
    name: String,
    email: String,
    role: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct AssignmentRow {
    user_id: i32,
    #[sqlx(flatten)]
    task: AssignedTask,
}

impl UserRow {
    fn with_tasks(self, assigned_tasks: Vec<AssignedTask>) -> UserDetail {
        UserDetail {
            id: self.id,
            name: self.name,
            email: self.email,
            role: self.role,
            created_at: self.created_at,
            updated_at: self.updated_at,
            assigned_tasks,
        }
    }
}

const USER_SELECT: &str = r#"
    SELECT u.id, u.name, u.email, r.name AS role, u.created_at, u.updated_at
    FROM users u
    LEFT JOIN roles r ON r.id = u.role_id
"#;

/// Tasks held by one user, ordered by task id
pub async fn assigned_tasks(pool: &PgPool, user_id: i32) -> ServiceResult<Vec<AssignedTask>> {
    let tasks = sqlx::query_as::<_, AssignedTask>(
        r#"
        SELECT t.id, t.title, t.description, t.deadline, t.status,
               cu.name AS creator_name,
               CASE WHEN t.owner_id = $1 THEN 'owner' ELSE 'reviewer' END AS role
        FROM tasks t
        LEFT JOIN users cu ON cu.id = t.created_by
        WHERE t.owner_id = $1 OR t.reviewer_id = $1
        ORDER BY t.id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(tasks)
}

/// Every user with role and assigned tasks, ordered by id
pub async fn get_users(pool: &PgPool) -> ServiceResult<Vec<UserDetail>> {
    let users = sqlx::query_as::<_, UserRow>(&format!("{} ORDER BY u.id ASC", USER_SELECT))
        .fetch_all(pool)
        .await?;

    let assignments = sqlx::query_as::<_, AssignmentRow>(
        r#"
        SELECT u.id AS user_id,
               t.id, t.title, t.description, t.deadline, t.status,
               cu.name AS creator_name,
               CASE WHEN t.owner_id = u.id THEN 'owner' ELSE 'reviewer' END AS role
        FROM tasks t
        JOIN users u ON u.id = t.owner_id OR u.id = t.reviewer_id
        LEFT JOIN users cu ON cu.id = t.created_by
        ORDER BY t.id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut by_user: BTreeMap<i32, Vec<AssignedTask>> = BTreeMap::new();
    for row in assignments {
        by_user.entry(row.user_id).or_default().push(row.task);
    }

    Ok(users
        .into_iter()
        .map(|user| {
            let tasks = by_user.remove(&user.id).unwrap_or_default();
            user.with_tasks(tasks)
        })
        .collect())
}

/// One user with role and assigned tasks, or None if it does not exist
pub async fn get_user_by_id(pool: &PgPool, id: i32) -> ServiceResult<Option<UserDetail>> {
    let user = sqlx::query_as::<_, UserRow>(&format!("{} WHERE u.id = $1", USER_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match user {
        Some(user) => {
            let tasks = assigned_tasks(pool, id).await?;
            Ok(Some(user.with_tasks(tasks)))
        }
        None => Ok(None),
    }
}

/// A selectable user field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UserField {
    Id,
    Name,
    Email,
    CreatedAt,
    UpdatedAt,
    Role,
    AssignedTasks,
}

impl UserField {
    pub const ALL: [UserField; 7] = [
        UserField::Id,
        UserField::Name,
        UserField::Email,
        UserField::CreatedAt,
        UserField::UpdatedAt,
        UserField::Role,
        UserField::AssignedTasks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserField::Id => "id",
            UserField::Name => "name",
            UserField::Email => "email",
            UserField::CreatedAt => "created_at",
            UserField::UpdatedAt => "updated_at",
            UserField::Role => "role",
            UserField::AssignedTasks => "assigned_tasks",
        }
    }

    /// SQL select expression, None for fields loaded by a separate query
    fn column(&self) -> Option<&'static str> {
        match self {
            UserField::Id => Some("u.id"),
            UserField::Name => Some("u.name"),
            UserField::Email => Some("u.email"),
            UserField::CreatedAt => Some("u.created_at"),
            UserField::UpdatedAt => Some("u.updated_at"),
            UserField::Role => Some("r.name AS role"),
            UserField::AssignedTasks => None,
        }
    }
}

impl fmt::Display for UserField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserField {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        UserField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| ServiceError::validation(format!("Unknown user field '{}'", s)))
    }
}

/// Fields requested from [`get_user_with_fields`]
///
/// An empty set selects every field.
///
/// ```
/// use taskboard_shared::query::{UserField, UserFieldSet};
///
/// let fields = UserFieldSet::parse("name, role").unwrap();
/// assert!(fields.contains(UserField::Role));
/// assert!(!fields.contains(UserField::Email));
/// assert!(UserFieldSet::parse("").unwrap().contains(UserField::Email));
/// assert!(UserFieldSet::parse("password").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFieldSet(BTreeSet<UserField>);

impl UserFieldSet {
    pub fn all() -> Self {
        Self::default()
    }

    /// Parses a comma-separated field list
    pub fn parse(list: &str) -> ServiceResult<Self> {
        let fields = list
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse)
            .collect::<ServiceResult<BTreeSet<UserField>>>()?;

        Ok(UserFieldSet(fields))
    }

    pub fn contains(&self, field: UserField) -> bool {
        self.0.is_empty() || self.0.contains(&field)
    }

    fn selected(&self) -> impl Iterator<Item = UserField> + '_ {
        UserField::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

impl FromIterator<UserField> for UserFieldSet {
    fn from_iter<I: IntoIterator<Item = UserField>>(iter: I) -> Self {
        UserFieldSet(iter.into_iter().collect())
    }
}

/// A user restricted to the requested fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// `Some(None)` for a user without a role
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_tasks: Option<Vec<AssignedTask>>,
}

impl UserView {
    fn from_row(row: &PgRow, fields: &UserFieldSet) -> Result<Self, sqlx::Error> {
        let mut view = UserView::default();
        for field in fields.selected() {
            match field {
                UserField::Id => view.id = Some(row.try_get("id")?),
                UserField::Name => view.name = Some(row.try_get("name")?),
                UserField::Email => view.email = Some(row.try_get("email")?),
                UserField::CreatedAt => view.created_at = Some(row.try_get("created_at")?),
                UserField::UpdatedAt => view.updated_at = Some(row.try_get("updated_at")?),
                UserField::Role => view.role = Some(row.try_get("role")?),
                UserField::AssignedTasks => {}
            }
        }
        Ok(view)
    }
}

/// One user restricted to `fields`, or None if it does not exist
///
/// The role join and the assigned tasks query only run when those fields
/// are selected.
pub async fn get_user_with_fields(pool: &PgPool, id: i32, fields: &UserFieldSet) -> ServiceResult<Option<UserView>> {
    // `u.id` is always read so a missing user is detected even when only
    // assigned_tasks is requested.
    let mut columns = vec!["u.id AS found_id"];
    columns.extend(fields.selected().filter_map(|f| f.column()));

    let mut query = format!("SELECT {} FROM users u", columns.join(", "));
    if fields.contains(UserField::Role) {
        query.push_str(" LEFT JOIN roles r ON r.id = u.role_id");
    }
    query.push_str(" WHERE u.id = $1");

    let Some(row) = sqlx::query(&query).bind(id).fetch_optional(pool).await? else {
        return Ok(None);
    };

    let mut view = UserView::from_row(&row, fields)?;

    if fields.contains(UserField::AssignedTasks) {
        view.assigned_tasks = Some(assigned_tasks(pool, id).await?);
    }

    Ok(Some(view))
}

/// Role catalog
///
/// Two fixed role sets exist:
///
/// - **Account roles** (`admin`, `editor`, `viewer`) are stored in the `roles`
///   table, seeded by migration. Every user holds exactly one.
/// - **Task roles** (`owner`, `reviewer`) name the two assignment slots on a
///   task. They are not stored as rows; the slot column is the role.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE roles (
///     id SERIAL PRIMARY KEY,
///     name VARCHAR(100) NOT NULL UNIQUE
/// );
/// ```

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use std::fmt;
use std::str::FromStr;

/// Error returned when a role name is not part of the catalog
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Role '{0}' not found")]
pub struct UnknownRole(pub String);

/// Account-level role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    /// Manages users, roles and every task
    Admin,

    /// Creates and edits tasks
    Editor,

    /// Read-only access
    Viewer,
}

impl AccountRole {
    /// Every account role, in catalog order
    pub const ALL: [AccountRole; 3] = [AccountRole::Admin, AccountRole::Editor, AccountRole::Viewer];

    /// Catalog name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::Admin => "admin",
            AccountRole::Editor => "editor",
            AccountRole::Viewer => "viewer",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, AccountRole::Admin)
    }
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "admin" => Ok(AccountRole::Admin),
            "editor" => Ok(AccountRole::Editor),
            "viewer" => Ok(AccountRole::Viewer),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for AccountRole {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Task-level role, one per assignment slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskRole {
    /// Responsible for doing the task (`tasks.owner_id`)
    Owner,

    /// Responsible for reviewing the task (`tasks.reviewer_id`)
    Reviewer,
}

impl TaskRole {
    pub const ALL: [TaskRole; 2] = [TaskRole::Owner, TaskRole::Reviewer];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskRole::Owner => "owner",
            TaskRole::Reviewer => "reviewer",
        }
    }

    /// The opposite slot
    pub fn other(&self) -> TaskRole {
        match self {
            TaskRole::Owner => TaskRole::Reviewer,
            TaskRole::Reviewer => TaskRole::Owner,
        }
    }

    /// Column on `tasks` holding this slot
    pub fn column(&self) -> &'static str {
        match self {
            TaskRole::Owner => "owner_id",
            TaskRole::Reviewer => "reviewer_id",
        }
    }
}

impl fmt::Display for TaskRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "owner" => Ok(TaskRole::Owner),
            "reviewer" => Ok(TaskRole::Reviewer),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for TaskRole {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A row of the `roles` table
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RoleRecord {
    pub id: i32,
    pub name: String,
}

/// Name to identifier lookups against the `roles` table
///
/// The table is append-only and seeded at migration time, so there is no
/// mutation API here.
pub struct RoleCatalog;

impl RoleCatalog {
    /// Resolves a role name to its identifier
    ///
    /// Takes a connection rather than the pool so callers can resolve roles
    /// inside their own transaction.
    pub async fn lookup(conn: &mut PgConnection, role: AccountRole) -> Result<Option<i32>, sqlx::Error> {
        let id: Option<i32> = sqlx::query_scalar("SELECT id FROM roles WHERE name = $1")
            .bind(role.as_str())
            .fetch_optional(conn)
            .await?;

        Ok(id)
    }

    /// Lists every catalog entry ordered by id
    pub async fn list(pool: &PgPool) -> Result<Vec<RoleRecord>, sqlx::Error> {
        let roles = sqlx::query_as::<_, RoleRecord>("SELECT id, name FROM roles ORDER BY id ASC")
            .fetch_all(pool)
            .await?;

        Ok(roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_role_parse() {
        assert_eq!("admin".parse::<AccountRole>().unwrap(), AccountRole::Admin);
        assert_eq!(" editor ".parse::<AccountRole>().unwrap(), AccountRole::Editor);
        assert_eq!("viewer".parse::<AccountRole>().unwrap(), AccountRole::Viewer);
        assert_eq!(
            "owner".parse::<AccountRole>().unwrap_err(),
            UnknownRole("owner".to_string())
        );
    }

    #[test]
    fn test_account_role_as_str_round_trips() {
        for role in AccountRole::ALL {
            assert_eq!(role.as_str().parse::<AccountRole>().unwrap(), role);
        }
    }

    #[test]
    fn test_task_role_parse_rejects_account_roles() {
        assert_eq!("owner".parse::<TaskRole>().unwrap(), TaskRole::Owner);
        assert_eq!("reviewer".parse::<TaskRole>().unwrap(), TaskRole::Reviewer);
        assert!("viewer".parse::<TaskRole>().is_err());
        assert!("".parse::<TaskRole>().is_err());
    }

    #[test]
    fn test_task_role_other() {
        assert_eq!(TaskRole::Owner.other(), TaskRole::Reviewer);
        assert_eq!(TaskRole::Reviewer.other(), TaskRole::Owner);
        assert_eq!(TaskRole::Owner.column(), "owner_id");
        assert_eq!(TaskRole::Reviewer.column(), "reviewer_id");
    }

    #[test]
    fn test_role_serde_lowercase() {
        assert_eq!(serde_json::to_string(&TaskRole::Reviewer).unwrap(), "\"reviewer\"");
        let role: AccountRole = serde_json::from_str("\"editor\"").unwrap();
        assert_eq!(role, AccountRole::Editor);
    }
}

/// User model and database operations
///
/// Each user carries exactly one account role (`admin`, `editor`, `viewer`)
/// through `role_id`, resolved by name against the role catalog.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id SERIAL PRIMARY KEY,
///     name VARCHAR(255) NOT NULL,
///     email VARCHAR(255) NOT NULL,
///     password_hash VARCHAR(255) NOT NULL,
///     role_id INTEGER REFERENCES roles(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT users_email_key UNIQUE (email)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::auth::password::hash_password;
/// use taskboard_shared::models::user::{NewUser, User};
/// use taskboard_shared::roles::AccountRole;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let user = User::create(&pool, NewUser {
///     name: "Ada".to_string(),
///     email: "ada@example.com".to_string(),
///     password_hash: hash_password("correct horse battery")?,
///     role: AccountRole::Editor,
/// }).await?;
///
/// let found = User::find_by_email(&pool, "ada@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use crate::error::{ServiceError, ServiceResult};
use crate::roles::{AccountRole, RoleCatalog};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use tracing::info;

const USER_COLUMNS: &str = "id, name, email, password_hash, role_id, created_at, updated_at";

/// A user account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,

    /// Argon2id hash, never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub role_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,

    /// Argon2id password hash (not the plaintext password)
    pub password_hash: String,

    pub role: AccountRole,
}

/// Input for updating a user
///
/// Only `Some` fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<AccountRole>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.role.is_none()
    }
}

impl User {
    /// Creates a user with the given account role
    ///
    /// # Errors
    ///
    /// - `Validation` if the role is missing from the catalog
    /// - `Conflict` if the email is already taken
    ///
    /// Nothing is written when any step fails.
    pub async fn create(pool: &PgPool, data: NewUser) -> ServiceResult<Self> {
        let mut tx = pool.begin().await?;

        let role_id = resolve_role(&mut *tx, data.role).await?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, role_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(data.name.trim())
        .bind(data.email.trim())
        .bind(&data.password_hash)
        .bind(role_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(user_id = user.id, role = %data.role, "Created user");
        Ok(user)
    }

    /// Applies profile and role changes
    ///
    /// # Errors
    ///
    /// - `NotFound` if the user does not exist
    /// - `Conflict` if the new email belongs to another user
    /// - `Validation` if the role is missing from the catalog
    pub async fn update(pool: &PgPool, id: i32, data: UserChanges) -> ServiceResult<Self> {
        let mut tx = pool.begin().await?;

        let role_id = match data.role {
            Some(role) => Some(resolve_role(&mut *tx, role).await?),
            None => None,
        };

        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }
        if role_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", role_id = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {}", USER_COLUMNS));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(name) = &data.name {
            q = q.bind(name.trim());
        }
        if let Some(email) = &data.email {
            q = q.bind(email.trim());
        }
        if let Some(role_id) = role_id {
            q = q.bind(role_id);
        }

        let user = q
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("User {} not found", id)))?;

        tx.commit().await?;

        info!(user_id = id, role_changed = data.role.is_some(), "Updated user");
        Ok(user)
    }

    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS))
            .bind(email.trim())
            .fetch_optional(pool)
            .await
    }

    /// Account role of a user
    ///
    /// Returns None if the user does not exist or has no role.
    pub async fn account_role(pool: &PgPool, id: i32) -> ServiceResult<Option<AccountRole>> {
        let name: Option<String> = sqlx::query_scalar(
            r#"
            SELECT r.name
            FROM users u
            JOIN roles r ON r.id = u.role_id
            WHERE u.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(name.map(|n| n.parse::<AccountRole>()).transpose()?)
    }
}

async fn resolve_role(conn: &mut PgConnection, role: AccountRole) -> ServiceResult<i32> {
    RoleCatalog::lookup(conn, role)
        .await?
        .ok_or_else(|| ServiceError::validation(format!("Role '{}' not found", role)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_not_serialized() {
        let now = Utc::now();
        let user = User {
            id: 3,
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role_id: Some(2),
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "ada@example.com");
    }

    #[test]
    fn test_user_changes_default() {
        let changes = UserChanges::default();
        assert!(changes.is_empty());

        let changes = UserChanges {
            role: Some(AccountRole::Viewer),
            ..Default::default()
        };
        assert!(!changes.is_empty());
    }
}

/// Request-scoped session context
///
/// Authentication itself happens in an upstream session provider, which
/// forwards the authenticated user's id in the `X-User-Id` header. The API
/// resolves that id to a `SessionContext` once per request and places it in
/// the request extensions; handlers receive it explicitly instead of reading
/// shared global state.
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use taskboard_shared::auth::session::SessionContext;
///
/// async fn handler(session: Option<Extension<SessionContext>>) -> String {
///     match session {
///         Some(Extension(s)) => format!("user {} ({})", s.user_id, s.role),
///         None => "internal caller".to_string(),
///     }
/// }
/// ```

use crate::permissions::FieldPermissions;
use crate::roles::AccountRole;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Header carrying the authenticated user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Identity of the caller for the current request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Authenticated user id
    pub user_id: i32,

    /// Account role of the authenticated user
    pub role: AccountRole,
}

impl SessionContext {
    pub fn new(user_id: i32, role: AccountRole) -> Self {
        Self { user_id, role }
    }

    /// Resolves a user id to a session context
    ///
    /// Returns `None` when the user does not exist. Users without a role are
    /// treated as viewers.
    pub async fn resolve(pool: &PgPool, user_id: i32) -> Result<Option<Self>, sqlx::Error> {
        let row: Option<(Option<String>,)> = sqlx::query_as(
            r#"
            SELECT r.name
            FROM users u
            LEFT JOIN roles r ON u.role_id = r.id
            WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|(role_name,)| {
            let role = role_name
                .and_then(|name| name.parse().ok())
                .unwrap_or(AccountRole::Viewer);
            Self::new(user_id, role)
        }))
    }

    /// Permissions on the profile form of `target_user_id`
    ///
    /// Everyone may edit their own profile (except the role field unless they
    /// are an admin). Only admins may edit other users.
    pub fn user_form_permissions(&self, target_user_id: i32) -> FieldPermissions {
        if self.role.is_admin() || self.user_id == target_user_id {
            self.role.user_form_permissions()
        } else {
            FieldPermissions::view_only()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_profile_permissions() {
        let session = SessionContext::new(7, AccountRole::Editor);
        let perms = session.user_form_permissions(7);
        assert!(perms.can_edit("name"));
        assert!(!perms.can_edit("role"));
    }

    #[test]
    fn test_other_profile_permissions() {
        let session = SessionContext::new(7, AccountRole::Viewer);
        let perms = session.user_form_permissions(8);
        assert!(perms.can_view("email"));
        assert!(!perms.can_edit("name"));

        let admin = SessionContext::new(1, AccountRole::Admin);
        let perms = admin.user_form_permissions(8);
        assert!(perms.can_edit("role"));
    }
}

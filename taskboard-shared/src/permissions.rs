/// Field-level permissions for user and task forms
///
/// A `FieldPermissions` value says which fields a caller may see, which they
/// may change, and whether they may create a new record. Callers build it
/// directly; there is no string format to parse.
///
/// # Example
///
/// ```
/// use taskboard_shared::permissions::{FieldPermissions, FieldSet};
///
/// let perms = FieldPermissions {
///     view: FieldSet::All,
///     edit: FieldSet::all_except(["role"]),
///     can_create: false,
/// };
///
/// assert!(perms.can_edit("email"));
/// assert!(!perms.can_edit("role"));
/// ```

use crate::roles::AccountRole;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A set of form fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "fields", rename_all = "snake_case")]
pub enum FieldSet {
    /// No field
    #[default]
    None,

    /// Every field
    All,

    /// Only the listed fields
    Only(BTreeSet<String>),

    /// Every field except the listed ones
    AllExcept(BTreeSet<String>),
}

impl FieldSet {
    pub fn only<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldSet::Only(fields.into_iter().map(Into::into).collect())
    }

    pub fn all_except<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldSet::AllExcept(fields.into_iter().map(Into::into).collect())
    }

    /// Whether `field` is a member of the set
    pub fn allows(&self, field: &str) -> bool {
        match self {
            FieldSet::None => false,
            FieldSet::All => true,
            FieldSet::Only(fields) => fields.contains(field),
            FieldSet::AllExcept(excluded) => !excluded.contains(field),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FieldSet::None => true,
            FieldSet::Only(fields) => fields.is_empty(),
            FieldSet::All | FieldSet::AllExcept(_) => false,
        }
    }
}

/// View/edit/create permissions for one form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPermissions {
    /// Fields the caller may see
    pub view: FieldSet,

    /// Fields the caller may change
    pub edit: FieldSet,

    /// Whether the caller may create a new record
    pub can_create: bool,
}

impl FieldPermissions {
    /// Read-only access to every field
    pub fn view_only() -> Self {
        Self {
            view: FieldSet::All,
            ..Default::default()
        }
    }

    /// Read and write access to every field
    pub fn edit_all() -> Self {
        Self {
            view: FieldSet::All,
            edit: FieldSet::All,
            can_create: false,
        }
    }

    /// Blank form for creating a record
    pub fn create() -> Self {
        Self {
            can_create: true,
            ..Default::default()
        }
    }

    /// A field is visible if it is viewable or editable
    pub fn can_view(&self, field: &str) -> bool {
        self.view.allows(field) || self.edit.allows(field)
    }

    pub fn can_edit(&self, field: &str) -> bool {
        self.edit.allows(field)
    }
}

impl AccountRole {
    /// Permissions this role has on a user profile form
    ///
    /// Admins may change anything, including another user's account role.
    /// Everyone else may change every field except `role`.
    pub fn user_form_permissions(&self) -> FieldPermissions {
        match self {
            AccountRole::Admin => FieldPermissions {
                can_create: true,
                ..FieldPermissions::edit_all()
            },
            AccountRole::Editor | AccountRole::Viewer => FieldPermissions {
                view: FieldSet::All,
                edit: FieldSet::all_except(["role"]),
                can_create: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_set_membership() {
        assert!(!FieldSet::None.allows("name"));
        assert!(FieldSet::All.allows("name"));

        let only = FieldSet::only(["name", "email"]);
        assert!(only.allows("email"));
        assert!(!only.allows("role"));

        let except = FieldSet::all_except(["role"]);
        assert!(except.allows("name"));
        assert!(!except.allows("role"));
    }

    #[test]
    fn test_field_set_is_empty() {
        assert!(FieldSet::None.is_empty());
        assert!(FieldSet::Only(BTreeSet::new()).is_empty());
        assert!(!FieldSet::All.is_empty());
        assert!(!FieldSet::all_except(["role"]).is_empty());
    }

    #[test]
    fn test_edit_implies_view() {
        let perms = FieldPermissions {
            view: FieldSet::None,
            edit: FieldSet::only(["name"]),
            can_create: false,
        };
        assert!(perms.can_view("name"));
        assert!(!perms.can_view("email"));
    }

    #[test]
    fn test_constructors() {
        let view = FieldPermissions::view_only();
        assert!(view.can_view("email"));
        assert!(!view.can_edit("email"));
        assert!(!view.can_create);

        let create = FieldPermissions::create();
        assert!(create.can_create);
        assert!(!create.can_view("email"));
    }

    #[test]
    fn test_role_permissions() {
        let admin = AccountRole::Admin.user_form_permissions();
        assert!(admin.can_edit("role"));
        assert!(admin.can_create);

        for role in [AccountRole::Editor, AccountRole::Viewer] {
            let perms = role.user_form_permissions();
            assert!(perms.can_edit("name"));
            assert!(perms.can_edit("email"));
            assert!(!perms.can_edit("role"));
            assert!(perms.can_view("role"));
            assert!(!perms.can_create);
        }
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(FieldSet::all_except(["role"])).unwrap();
        assert_eq!(json["mode"], "all_except");
        assert_eq!(json["fields"][0], "role");
    }
}

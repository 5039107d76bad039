/// Service-level error type shared by all domain operations
///
/// Every model and service function returns `ServiceResult<T>`. The API crate
/// maps each variant onto an HTTP status:
///
/// | Variant      | Status |
/// |--------------|--------|
/// | `Validation` | 400    |
/// | `NotFound`   | 404    |
/// | `Conflict`   | 409    |
/// | `Database`   | 500    |
/// | `Internal`   | 500    |

/// PostgreSQL SQLSTATE for `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL SQLSTATE for `foreign_key_violation`
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// PostgreSQL SQLSTATE for `check_violation`
const CHECK_VIOLATION: &str = "23514";

/// Result alias for domain operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error type for domain operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Missing or invalid input
    #[error("{0}")]
    Validation(String),

    /// Referenced task, user or notification does not exist
    #[error("{0}")]
    NotFound(String),

    /// Unique constraint violation (e.g. duplicate email)
    #[error("{0}")]
    Conflict(String),

    /// Unexpected database or driver failure
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// Any other unexpected failure (e.g. password hashing)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Shorthand for a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        ServiceError::Validation(msg.into())
    }

    /// Shorthand for a not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        ServiceError::NotFound(msg.into())
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    let is_email = db_err
                        .constraint()
                        .map(|c| c.contains("email"))
                        .unwrap_or(false);
                    return if is_email {
                        ServiceError::Conflict("A user with this email already exists.".to_string())
                    } else {
                        ServiceError::Conflict(format!("Constraint violation: {}", db_err))
                    };
                }
                Some(FOREIGN_KEY_VIOLATION) => {
                    return ServiceError::Validation(format!(
                        "Referenced record does not exist ({})",
                        db_err.constraint().unwrap_or("foreign key")
                    ));
                }
                Some(CHECK_VIOLATION) => {
                    return ServiceError::Validation(format!(
                        "Check constraint violated ({})",
                        db_err.constraint().unwrap_or("check")
                    ));
                }
                _ => {}
            }
        }

        ServiceError::Database(err)
    }
}

impl From<crate::auth::password::PasswordError> for ServiceError {
    fn from(err: crate::auth::password::PasswordError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl From<crate::roles::UnknownRole> for ServiceError {
    fn from(err: crate::roles::UnknownRole) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

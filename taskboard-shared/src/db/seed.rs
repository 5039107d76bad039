/// Bootstrap data
///
/// A fresh database has the role catalog (from migrations) but no users. The
/// API binary calls [`seed_admin`] at startup when `SEED_ADMIN_EMAIL` and
/// `SEED_ADMIN_PASSWORD` are configured, so there is always someone able to
/// create the remaining accounts.

use crate::auth::password::{hash_password, validate_password};
use crate::error::{ServiceError, ServiceResult};
use sqlx::PgPool;
use tracing::info;

/// Creates an admin account unless a user with `email` already exists
///
/// Returns `true` when a row was inserted. The password must pass the same
/// length policy as any other account.
pub async fn seed_admin(pool: &PgPool, name: &str, email: &str, password: &str) -> ServiceResult<bool> {
    validate_password(password).map_err(ServiceError::Validation)?;
    let password_hash = hash_password(password)?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (name, email, password_hash, role_id)
        SELECT $1, $2, $3, r.id FROM roles r WHERE r.name = 'admin'
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .execute(pool)
    .await?;

    let inserted = result.rows_affected() > 0;
    if inserted {
        info!(email, "Seeded admin account");
    }

    Ok(inserted)
}

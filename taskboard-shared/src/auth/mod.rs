/// Credential and session utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and the password length policy
/// - [`session`]: Request-scoped session context resolved from the upstream
///   session provider
///
/// Login flows and token handling belong to the external session provider
/// and are not implemented here.

pub mod password;
pub mod session;

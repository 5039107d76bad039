/// API route handlers
///
/// - `health`: Health check endpoint
/// - `roles`: Role catalog
/// - `tasks`: Task CRUD and assignment
/// - `users`: User CRUD, signup and unassignment
/// - `notifications`: User notifications

pub mod health;
pub mod notifications;
pub mod roles;
pub mod tasks;
pub mod users;

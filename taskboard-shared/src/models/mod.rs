/// Database models
///
/// # Models
///
/// - `user`: user accounts and their account role
/// - `task`: tasks with their owner and reviewer slots
///
/// Notifications live in [`crate::notifications`]; joined read models live
/// in [`crate::query`].

pub mod task;
pub mod user;

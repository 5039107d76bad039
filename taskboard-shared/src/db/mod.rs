/// Database layer
///
/// - `pool`: connection pool creation and health checks
/// - `migrations`: embedded schema migrations
/// - `seed`: optional bootstrap of the first admin account
///
/// Models and services live in their own modules at the crate root.

pub mod migrations;
pub mod pool;
pub mod seed;

/// Middleware modules for the API server
///
/// - `security`: security response headers
/// - `session`: resolves the upstream session header into a `SessionContext`

pub mod security;
pub mod session;

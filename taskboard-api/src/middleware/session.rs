/// Session context middleware
///
/// The upstream session provider forwards the authenticated user id in the
/// `X-User-Id` header. This layer resolves it to a [`SessionContext`] and
/// stores it in the request extensions:
///
/// - no header: the request continues without a context
/// - malformed header: 400
/// - header naming an unknown user: 401
///
/// Handlers read the context with `Option<Extension<SessionContext>>`.

use crate::{app::AppState, error::ApiError};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use taskboard_shared::auth::session::{SessionContext, USER_ID_HEADER};

pub async fn session_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(raw) = req.headers().get(USER_ID_HEADER) else {
        return Ok(next.run(req).await);
    };

    let user_id = raw
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<i32>().ok())
        .ok_or_else(|| ApiError::BadRequest("Invalid X-User-Id header".to_string()))?;

    let context = SessionContext::resolve(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(format!("Unknown session user {}", user_id)))?;

    tracing::debug!(user_id, role = %context.role, "Resolved session context");
    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}

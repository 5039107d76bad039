/// Role catalog endpoint
///
/// ```text
/// GET /roles
/// ```
///
/// ```json
/// [{ "id": 1, "name": "admin" }, { "id": 2, "name": "editor" }, { "id": 3, "name": "viewer" }]
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use taskboard_shared::roles::{RoleCatalog, RoleRecord};

pub async fn list_roles(State(state): State<AppState>) -> ApiResult<Json<Vec<RoleRecord>>> {
    let roles = RoleCatalog::list(&state.db).await?;
    Ok(Json(roles))
}

use crate::AppState;
use crate::api::error::AppError;
use crate::services::tenant::{Principal, resolve_scope};
use axum::{Extension, Json, extract::State};

#[utoipa::path(
    get,
    path = "/favourites",
    responses(
        (status = 200, description = "IDs of the caller's favourite files", body = Vec<String>),
        (status = 401, description = "Invalid token")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "files"
)]
pub async fn list_favourites(
    State(state): State<AppState>,
    principal: Option<Extension<Principal>>,
) -> Result<Json<Vec<String>>, AppError> {
    let principal = principal.map(|Extension(p)| p);
    let (Some(principal), Some(scope)) = (principal.as_ref(), resolve_scope(principal.as_ref()))
    else {
        return Ok(Json(Vec::new()));
    };

    let mut ids: Vec<String> = state
        .favourites
        .list_by_scope(&scope, principal)
        .await?
        .into_iter()
        .collect();
    ids.sort();
    Ok(Json(ids))
}

use crate::AppState;
use crate::api::error::AppError;
use crate::services::tenant::Principal;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use super::require_principal;
use super::types::*;

#[utoipa::path(
    delete,
    path = "/files/{id}",
    params(
        ("id" = String, Path, description = "File ID")
    ),
    responses(
        (status = 204, description = "File moved to trash"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "File not found")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "files"
)]
pub async fn delete_file(
    State(state): State<AppState>,
    principal: Option<Extension<Principal>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let (principal, scope) = require_principal(principal)?;
    state.file_store.soft_delete(&scope, &id, &principal).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/files/{id}/restore",
    params(
        ("id" = String, Path, description = "File ID")
    ),
    responses(
        (status = 204, description = "File restored from trash"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "File not found")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "files"
)]
pub async fn restore_file(
    State(state): State<AppState>,
    principal: Option<Extension<Principal>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let (principal, scope) = require_principal(principal)?;
    state.file_store.restore(&scope, &id, &principal).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/files/{id}/purge",
    params(
        ("id" = String, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File permanently removed", body = PurgeResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "File not found"),
        (status = 409, description = "File is not in trash")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "files"
)]
pub async fn purge_file(
    State(state): State<AppState>,
    principal: Option<Extension<Principal>>,
    Path(id): Path<String>,
) -> Result<Json<PurgeResponse>, AppError> {
    let (principal, scope) = require_principal(principal)?;
    let report = state.file_store.purge(&scope, &id, &principal).await?;

    Ok(Json(PurgeResponse {
        file_id: report.file_id,
        blob_removed: report.blob_removed,
    }))
}

#[utoipa::path(
    post,
    path = "/files/{id}/favourite",
    params(
        ("id" = String, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "Favourite state toggled", body = FavouriteResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "files"
)]
pub async fn toggle_favourite(
    State(state): State<AppState>,
    principal: Option<Extension<Principal>>,
    Path(id): Path<String>,
) -> Result<Json<FavouriteResponse>, AppError> {
    let (principal, scope) = require_principal(principal)?;
    let is_favourited = state.favourites.toggle(&scope, &id, &principal).await?;

    Ok(Json(FavouriteResponse {
        file_id: id,
        is_favourited,
    }))
}

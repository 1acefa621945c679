use crate::AppState;
use crate::api::error::AppError;
use crate::services::file_type::TypeFilter;
use crate::services::query::FileFilter;
use crate::services::tenant::{Principal, resolve_scope};
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use validator::Validate;

use super::types::*;

#[utoipa::path(
    get,
    path = "/files",
    params(
        ("type" = Option<String>, Query, description = "image, csv, pdf or all"),
        ("search" = Option<String>, Query, description = "Case-insensitive name substring"),
        ("favourites_only" = Option<bool>, Query, description = "Only the caller's favourites"),
        ("deleted_only" = Option<bool>, Query, description = "Trash view instead of live files")
    ),
    responses(
        (status = 200, description = "Files in the caller's scope", body = Vec<FileResponse>),
        (status = 400, description = "Invalid filter"),
        (status = 401, description = "Invalid token")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "files"
)]
pub async fn list_files(
    State(state): State<AppState>,
    principal: Option<Extension<Principal>>,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<Vec<FileResponse>>, AppError> {
    query
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let file_type: TypeFilter = query.file_type.as_deref().unwrap_or_default().parse()?;
    let filter = FileFilter {
        file_type,
        search: query.search,
        favourites_only: query.favourites_only.unwrap_or(false),
        deleted_only: query.deleted_only.unwrap_or(false),
    };

    let principal = principal.map(|Extension(p)| p);
    let scope = resolve_scope(principal.as_ref());

    let entries = state
        .query_engine
        .query(scope.as_ref(), principal.as_ref(), &filter)
        .await?;

    let mut files = Vec::with_capacity(entries.len());
    for entry in entries {
        files.push(FileResponse::from_entry(&state, entry).await?);
    }
    Ok(Json(files))
}

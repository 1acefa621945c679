use crate::AppState;
use crate::api::error::AppError;
use crate::services::query::FileEntry;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Serialize, ToSchema, Debug)]
pub struct FileResponse {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub size: i64,
    pub owner_id: String,
    pub created_at: chrono::DateTime<Utc>,
    pub deleted: bool,
    pub url: String,
    pub is_favourited: bool,
}

impl FileResponse {
    pub async fn from_entry(state: &AppState, entry: FileEntry) -> Result<Self, AppError> {
        let url = state
            .storage
            .get_download_url(&entry.file.storage_key)
            .await
            .map_err(|e| AppError::ExternalStore(format!("Download URL failed: {}", e)))?;

        Ok(Self {
            id: entry.file.id,
            name: entry.file.name,
            file_type: entry.file.file_type,
            size: entry.file.size,
            owner_id: entry.file.owner_id,
            created_at: entry.file.created_at,
            deleted: entry.file.deleted,
            url,
            is_favourited: entry.is_favourited,
        })
    }
}

#[derive(Deserialize, Validate, Default, Debug)]
pub struct ListFilesQuery {
    #[serde(rename = "type")]
    pub file_type: Option<String>,
    #[validate(length(max = 255, message = "Search query is too long"))]
    pub search: Option<String>,
    pub favourites_only: Option<bool>,
    pub deleted_only: Option<bool>,
}

/// Multipart form accepted by `POST /files`.
#[derive(Deserialize, ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// image, csv or pdf; derived from the file part's content type when absent
    #[serde(rename = "type")]
    pub file_type: Option<String>,
    /// Display name; defaults to the file part's filename
    pub name: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct PurgeResponse {
    pub file_id: String,
    pub blob_removed: bool,
}

#[derive(Serialize, ToSchema)]
pub struct FavouriteResponse {
    pub file_id: String,
    pub is_favourited: bool,
}

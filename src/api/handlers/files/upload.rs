use crate::AppState;
use crate::api::error::AppError;
use crate::services::file_type::FileType;
use crate::services::query::FileEntry;
use crate::services::tenant::Principal;
use crate::services::upload::UploadRequest;
use axum::{
    Extension, Json,
    extract::{Multipart, State},
    http::StatusCode,
};

use super::require_principal;
use super::types::*;

#[utoipa::path(
    post,
    path = "/files",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "File uploaded", body = FileResponse),
        (status = 400, description = "Invalid name, type or content"),
        (status = 401, description = "Unauthorized"),
        (status = 413, description = "File too large"),
        (status = 502, description = "Blob store unavailable")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "files"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    principal: Option<Extension<Principal>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<FileResponse>), AppError> {
    let (principal, scope) = require_principal(principal)?;

    let result: Result<(StatusCode, Json<FileResponse>), AppError> = async {
        let mut bytes: Option<Vec<u8>> = None;
        let mut part_name: Option<String> = None;
        let mut part_type: Option<FileType> = None;
        let mut declared_type: Option<String> = None;
        let mut name: Option<String> = None;

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            let err_msg = e.to_string();
            if err_msg.contains("length limit exceeded") {
                AppError::PayloadTooLarge(
                    "Request body exceeds the maximum allowed limit".to_string(),
                )
            } else {
                AppError::Validation(err_msg)
            }
        })? {
            let field_name = field.name().unwrap_or_default().to_string();

            if field_name == "file" {
                part_name = field.file_name().map(|s| s.to_string());
                part_type = field.content_type().and_then(FileType::from_mime);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(e.to_string()))?;
                bytes = Some(data.to_vec());
            } else if field_name == "type" {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid type field: {}", e)))?;
                if !text.trim().is_empty() {
                    declared_type = Some(text);
                }
            } else if field_name == "name" {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid name field: {}", e)))?;
                if !text.trim().is_empty() {
                    name = Some(text);
                }
            }
        }

        let bytes = bytes.ok_or(AppError::Validation("No file provided".to_string()))?;
        let declared_type = declared_type
            .or_else(|| part_type.map(|t| t.to_string()))
            .ok_or(AppError::Validation(
                "File type is required (image, csv or pdf)".to_string(),
            ))?;

        let request = UploadRequest {
            bytes,
            declared_type,
            name: name.or(part_name).unwrap_or_default(),
        };

        let file = state.uploads.upload(&scope, &principal, request).await?;
        let entry = FileEntry {
            file,
            is_favourited: false,
        };
        Ok((
            StatusCode::CREATED,
            Json(FileResponse::from_entry(&state, entry).await?),
        ))
    }
    .await;

    match result {
        Ok(res) => Ok(res),
        Err(e) => {
            // Drain the rest of the body so the client sees the error instead of a reset
            tracing::warn!("Upload rejected: {}. Consuming remaining stream...", e);
            while let Ok(Some(mut field)) = multipart.next_field().await {
                while let Ok(Some(_)) = field.chunk().await {}
            }
            Err(e)
        }
    }
}

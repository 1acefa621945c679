use crate::api::error::AppError;
use crate::config::DriveConfig;
use crate::services::file_store::{File, FileStore, NewFile};
use crate::services::file_type::FileType;
use crate::services::reconciliation::{OrphanReason, ReconciliationService};
use crate::services::storage::StorageService;
use crate::services::tenant::{Principal, Scope};
use crate::utils::validation::{sanitize_filename, validate_content_size, verify_declared_type};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use uuid::Uuid;

pub struct UploadRequest {
    pub bytes: Vec<u8>,
    /// Type as named by the client; parsed here so unknown names become validation errors
    pub declared_type: String,
    pub name: String,
}

/// Writes bytes to the blob store, then registers their metadata.
///
/// Blob first: a failed metadata insert leaves at worst an unreferenced blob,
/// never a file entry pointing at missing bytes.
pub struct UploadCoordinator {
    db: DatabaseConnection,
    storage: Arc<dyn StorageService>,
    file_store: Arc<FileStore>,
    config: DriveConfig,
}

impl UploadCoordinator {
    pub fn new(
        db: DatabaseConnection,
        storage: Arc<dyn StorageService>,
        file_store: Arc<FileStore>,
        config: DriveConfig,
    ) -> Self {
        Self {
            db,
            storage,
            file_store,
            config,
        }
    }

    pub async fn upload(
        &self,
        scope: &Scope,
        principal: &Principal,
        request: UploadRequest,
    ) -> Result<File, AppError> {
        // 1. Validate everything before touching either store
        validate_content_size(request.bytes.len(), self.config.max_file_size).map_err(|e| {
            if e.code == "FILE_TOO_LARGE" {
                AppError::PayloadTooLarge(e.message)
            } else {
                e.into()
            }
        })?;
        let file_type: FileType = request.declared_type.parse()?;
        let name = sanitize_filename(&request.name)?;
        verify_declared_type(file_type, &request.bytes)?;

        let size = request.bytes.len() as i64;
        let storage_key = format!("{}/{}", scope.partition_key(), Uuid::new_v4());

        // 2. Blob
        tracing::info!(
            "Uploading {} ({} bytes, {}) for {} to {}",
            name,
            size,
            file_type,
            principal.user_id,
            storage_key
        );
        self.storage
            .upload_file(&storage_key, request.bytes)
            .await
            .map_err(|e| AppError::ExternalStore(format!("Upload failed: {}", e)))?;

        // 3. Metadata
        let new_file = NewFile {
            name,
            file_type,
            storage_key: storage_key.clone(),
            owner_id: principal.user_id.clone(),
            size,
        };

        match self.file_store.insert(scope, new_file).await {
            Ok(file) => Ok(file),
            Err(e) => {
                tracing::error!(
                    "Metadata insert failed after storing {}: {}",
                    storage_key,
                    e
                );
                self.discard_blob(&storage_key, &e.to_string()).await;
                Err(e)
            }
        }
    }

    /// Best-effort removal of a blob whose metadata never committed.
    async fn discard_blob(&self, storage_key: &str, cause: &str) {
        match self.storage.delete_file(storage_key).await {
            Ok(()) => tracing::info!("Discarded unreferenced blob {}", storage_key),
            Err(delete_err) => {
                tracing::warn!(
                    "Could not discard blob {}: {}; queueing for reconciliation",
                    storage_key,
                    delete_err
                );
                if let Err(db_err) = ReconciliationService::record(
                    &self.db,
                    storage_key,
                    OrphanReason::Upload,
                    cause,
                )
                .await
                {
                    tracing::error!(
                        "Could not record orphaned blob {}: {}",
                        storage_key,
                        db_err
                    );
                }
            }
        }
    }
}

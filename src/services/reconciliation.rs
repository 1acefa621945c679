use crate::entities::{prelude::*, *};
use crate::services::storage::StorageService;
use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrphanReason {
    /// Metadata purged, blob delete failed
    Purge,
    /// Blob stored, metadata insert failed
    Upload,
}

impl OrphanReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrphanReason::Purge => "purge",
            OrphanReason::Upload => "upload",
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub failed: usize,
}

/// Ledger of blobs that no metadata references anymore, and the retry loop
/// that eventually removes them from the blob store.
pub struct ReconciliationService {
    db: DatabaseConnection,
    storage: Arc<dyn StorageService>,
}

impl ReconciliationService {
    pub fn new(db: DatabaseConnection, storage: Arc<dyn StorageService>) -> Self {
        Self { db, storage }
    }

    pub async fn record(
        db: &impl ConnectionTrait,
        storage_key: &str,
        reason: OrphanReason,
        error: &str,
    ) -> Result<(), DbErr> {
        tracing::warn!(
            "Recording orphaned blob {} ({}): {}",
            storage_key,
            reason.as_str(),
            error
        );

        let row = orphaned_blobs::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            storage_key: Set(storage_key.to_string()),
            reason: Set(reason.as_str().to_string()),
            attempts: Set(0),
            last_error: Set(Some(error.to_string())),
            created_at: Set(Utc::now()),
        };
        OrphanedBlobs::insert(row).exec_without_returning(db).await?;
        Ok(())
    }

    pub async fn pending(&self) -> Result<u64> {
        Ok(OrphanedBlobs::find().count(&self.db).await?)
    }

    /// Retries blob deletion for the oldest `batch` orphans.
    pub async fn sweep(&self, batch: u64) -> Result<SweepReport> {
        let rows = OrphanedBlobs::find()
            .order_by_asc(orphaned_blobs::Column::CreatedAt)
            .limit(batch)
            .all(&self.db)
            .await?;

        let mut report = SweepReport::default();

        for row in rows {
            match self.storage.delete_file(&row.storage_key).await {
                Ok(()) => {
                    OrphanedBlobs::delete_by_id(row.id.clone())
                        .exec(&self.db)
                        .await?;
                    tracing::info!("🧹 Removed orphaned blob {}", row.storage_key);
                    report.removed += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        "Orphaned blob {} still not removable (attempt {}): {}",
                        row.storage_key,
                        row.attempts + 1,
                        e
                    );
                    let attempts = row.attempts + 1;
                    let mut active: orphaned_blobs::ActiveModel = row.into();
                    active.attempts = Set(attempts);
                    active.last_error = Set(Some(e.to_string()));
                    active.update(&self.db).await?;
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}

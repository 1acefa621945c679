use crate::api::error::AppError;
use crate::entities::{prelude::*, *};
use crate::services::changes::{ChangeFeed, ChangeKind};
use crate::services::file_type::FileType;
use crate::services::reconciliation::{OrphanReason, ReconciliationService};
use crate::services::storage::StorageService;
use crate::services::tenant::{Principal, Scope};
use crate::utils::keyed_mutex::KeyedMutex;
use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

pub type File = files::Model;

/// Metadata for a file whose bytes are already in the blob store.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub name: String,
    pub file_type: FileType,
    pub storage_key: String,
    pub owner_id: String,
    pub size: i64,
}

/// Row filter for [`FileStore::list_by_scope`]. All set fields are ANDed.
#[derive(Debug, Clone, Default)]
pub struct FilePredicate {
    /// `true` selects the trash, `false` the live files
    pub deleted: bool,
    pub file_type: Option<FileType>,
    /// Case-insensitive substring of the display name
    pub name_contains: Option<String>,
    /// Restricts to these ids; an empty set matches nothing
    pub ids: Option<HashSet<String>>,
}

impl FilePredicate {
    pub fn live() -> Self {
        Self::default()
    }

    pub fn trash() -> Self {
        Self {
            deleted: true,
            ..Self::default()
        }
    }

    fn condition(&self, scope: &Scope) -> Condition {
        let mut cond = Condition::all()
            .add(files::Column::ScopeId.eq(scope.partition_key()))
            .add(files::Column::Deleted.eq(self.deleted));

        if let Some(t) = self.file_type {
            cond = cond.add(files::Column::FileType.eq(t.as_str()));
        }
        if let Some(ref ids) = self.ids {
            cond = cond.add(files::Column::Id.is_in(ids.iter().cloned()));
        }
        cond
    }

    fn matches_name(&self, file: &File) -> bool {
        match self.name_contains.as_deref() {
            Some(needle) if !needle.is_empty() => file
                .name
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeReport {
    pub file_id: String,
    /// `false` when the blob delete failed and was queued for reconciliation
    pub blob_removed: bool,
}

/// Owns the `files` table: the per-scope file metadata and its
/// live → trash → purged lifecycle.
pub struct FileStore {
    db: DatabaseConnection,
    storage: Arc<dyn StorageService>,
    changes: ChangeFeed,
    file_locks: KeyedMutex,
}

impl FileStore {
    pub fn new(
        db: DatabaseConnection,
        storage: Arc<dyn StorageService>,
        changes: ChangeFeed,
    ) -> Self {
        Self {
            db,
            storage,
            changes,
            file_locks: KeyedMutex::new(),
        }
    }

    pub fn locks(&self) -> &KeyedMutex {
        &self.file_locks
    }

    pub async fn insert(&self, scope: &Scope, new_file: NewFile) -> Result<File, AppError> {
        if new_file.name.trim().is_empty() {
            return Err(AppError::Validation("File name cannot be empty".to_string()));
        }
        if new_file.size <= 0 {
            return Err(AppError::Validation("File content is empty".to_string()));
        }

        let id = Uuid::new_v4().to_string();
        let model = files::ActiveModel {
            id: Set(id.clone()),
            scope_id: Set(scope.partition_key()),
            name: Set(new_file.name),
            file_type: Set(new_file.file_type.as_str().to_string()),
            storage_key: Set(new_file.storage_key),
            owner_id: Set(new_file.owner_id),
            size: Set(new_file.size),
            created_at: Set(Utc::now()),
            deleted: Set(false),
            deleted_at: Set(None),
        };

        let file = model.insert(&self.db).await.map_err(|e| {
            tracing::error!("Failed to insert file {} in {}: {}", id, scope, e);
            AppError::Database(e)
        })?;

        tracing::info!("📄 File {} ({}) registered in {}", file.id, file.file_type, scope);
        self.changes
            .publish(&scope.partition_key(), &file.id, ChangeKind::Uploaded);
        Ok(file)
    }

    pub async fn get(&self, scope: &Scope, file_id: &str) -> Result<File, AppError> {
        Self::find_in_scope(&self.db, scope, file_id).await
    }

    pub async fn soft_delete(
        &self,
        scope: &Scope,
        file_id: &str,
        principal: &Principal,
    ) -> Result<(), AppError> {
        let _lock = self.file_locks.lock(file_id).await;
        let file = self.find_owned(scope, file_id, principal).await?;

        if file.deleted {
            tracing::debug!("File {} already in trash, nothing to do", file_id);
            return Ok(());
        }

        let mut active: files::ActiveModel = file.into();
        active.deleted = Set(true);
        active.deleted_at = Set(Some(Utc::now()));
        active.update(&self.db).await?;

        tracing::info!("🗑️  File {} moved to trash in {}", file_id, scope);
        self.changes.publish(&scope.partition_key(), file_id, ChangeKind::Deleted);
        Ok(())
    }

    pub async fn restore(
        &self,
        scope: &Scope,
        file_id: &str,
        principal: &Principal,
    ) -> Result<(), AppError> {
        let _lock = self.file_locks.lock(file_id).await;
        let file = self.find_owned(scope, file_id, principal).await?;

        if !file.deleted {
            tracing::debug!("File {} is not in trash, nothing to restore", file_id);
            return Ok(());
        }

        let mut active: files::ActiveModel = file.into();
        active.deleted = Set(false);
        active.deleted_at = Set(None);
        active.update(&self.db).await?;

        tracing::info!("♻️  File {} restored in {}", file_id, scope);
        self.changes
            .publish(&scope.partition_key(), file_id, ChangeKind::Restored);
        Ok(())
    }

    /// Permanently removes a trashed file, its favourites and its blob.
    pub async fn purge(
        &self,
        scope: &Scope,
        file_id: &str,
        principal: &Principal,
    ) -> Result<PurgeReport, AppError> {
        let _lock = self.file_locks.lock(file_id).await;
        let file = self.find_owned(scope, file_id, principal).await?;

        if !file.deleted {
            return Err(AppError::Precondition(
                "File must be moved to trash before it can be purged".to_string(),
            ));
        }

        self.purge_record(file).await?.ok_or_else(|| {
            AppError::Precondition("File was restored before it could be purged".to_string())
        })
    }

    /// Purges trash entries older than `retention`. Returns how many were removed.
    pub async fn purge_expired(&self, retention: Duration, batch: u64) -> Result<usize, AppError> {
        let cutoff = Utc::now() - retention;
        let expired = Files::find()
            .filter(files::Column::Deleted.eq(true))
            .filter(files::Column::DeletedAt.lt(cutoff))
            .order_by_asc(files::Column::DeletedAt)
            .limit(batch)
            .all(&self.db)
            .await?;

        let mut purged = 0;
        for file in expired {
            let _lock = self.file_locks.lock(&file.id).await;
            let id = file.id.clone();
            match self.purge_record(file).await {
                Ok(Some(_)) => purged += 1,
                Ok(None) => tracing::debug!("Expired file {} was restored concurrently", id),
                Err(e) => tracing::error!("Failed to purge expired file {}: {}", id, e),
            }
        }

        if purged > 0 {
            tracing::info!("⏳ Purged {} trash entries past retention", purged);
        }
        Ok(purged)
    }

    pub async fn list_by_scope(
        &self,
        scope: &Scope,
        predicate: &FilePredicate,
    ) -> Result<Vec<File>, AppError> {
        Self::list_in(&self.db, scope, predicate).await
    }

    /// Newest first; ties broken by id so a snapshot always lists in the same order.
    pub async fn list_in(
        conn: &impl ConnectionTrait,
        scope: &Scope,
        predicate: &FilePredicate,
    ) -> Result<Vec<File>, AppError> {
        if predicate.ids.as_ref().is_some_and(|ids| ids.is_empty()) {
            return Ok(Vec::new());
        }

        let rows = Files::find()
            .filter(predicate.condition(scope))
            .order_by_desc(files::Column::CreatedAt)
            .order_by_desc(files::Column::Id)
            .all(conn)
            .await?;

        Ok(rows
            .into_iter()
            .filter(|f| predicate.matches_name(f))
            .collect())
    }

    pub(crate) async fn find_in_scope(
        conn: &impl ConnectionTrait,
        scope: &Scope,
        file_id: &str,
    ) -> Result<File, AppError> {
        Files::find_by_id(file_id)
            .filter(files::Column::ScopeId.eq(scope.partition_key()))
            .one(conn)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))
    }

    async fn find_owned(
        &self,
        scope: &Scope,
        file_id: &str,
        principal: &Principal,
    ) -> Result<File, AppError> {
        let file = Self::find_in_scope(&self.db, scope, file_id).await?;
        if file.owner_id != principal.user_id {
            tracing::warn!(
                "User {} attempted to modify file {} owned by {}",
                principal.user_id,
                file_id,
                file.owner_id
            );
            return Err(AppError::Forbidden(
                "Only the owner can modify this file".to_string(),
            ));
        }
        Ok(file)
    }

    /// Deletes the row only while it is still trashed. `None` means a restore won the race.
    async fn purge_record(&self, file: File) -> Result<Option<PurgeReport>, AppError> {
        let txn = self.db.begin().await?;

        let deleted = Files::delete_many()
            .filter(files::Column::Id.eq(&file.id))
            .filter(files::Column::ScopeId.eq(&file.scope_id))
            .filter(files::Column::Deleted.eq(true))
            .exec(&txn)
            .await?;

        if deleted.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        let favourites = Favourites::delete_many()
            .filter(favourites::Column::ScopeId.eq(&file.scope_id))
            .filter(favourites::Column::FileId.eq(&file.id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        tracing::info!(
            "🔥 File {} purged from {} ({} favourites removed)",
            file.id,
            file.scope_id,
            favourites.rows_affected
        );

        let blob_removed = match self.storage.delete_file(&file.storage_key).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    "Blob delete failed for purged file {} ({}): {}",
                    file.id,
                    file.storage_key,
                    e
                );
                if let Err(db_err) = ReconciliationService::record(
                    &self.db,
                    &file.storage_key,
                    OrphanReason::Purge,
                    &e.to_string(),
                )
                .await
                {
                    tracing::error!(
                        "Could not record orphaned blob {}: {}",
                        file.storage_key,
                        db_err
                    );
                }
                false
            }
        };

        self.changes
            .publish(&file.scope_id, &file.id, ChangeKind::Purged);

        Ok(Some(PurgeReport {
            file_id: file.id,
            blob_removed,
        }))
    }
}

use crate::api::error::AppError;
use crate::services::favourites::FavouritesIndex;
use crate::services::file_store::{File, FilePredicate, FileStore};
use crate::services::file_type::TypeFilter;
use crate::services::tenant::{Principal, Scope};
use sea_orm::{AccessMode, ConnectionTrait, DatabaseBackend, DatabaseConnection, IsolationLevel, TransactionTrait};

/// Filter surface of the file browser. Fields combine with AND.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    pub file_type: TypeFilter,
    pub search: Option<String>,
    pub favourites_only: bool,
    /// `true` is the trash view, `false` the default view; never both
    pub deleted_only: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    pub file: File,
    pub is_favourited: bool,
}

pub struct QueryEngine {
    db: DatabaseConnection,
}

impl QueryEngine {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Files visible in `scope` under `filter`, each decorated with the
    /// caller's favourite flag. An unresolved scope yields an empty result.
    pub async fn query(
        &self,
        scope: Option<&Scope>,
        principal: Option<&Principal>,
        filter: &FileFilter,
    ) -> Result<Vec<FileEntry>, AppError> {
        let (Some(scope), Some(principal)) = (scope, principal) else {
            tracing::info!(outcome = "scope_unresolved", "File query without a resolved scope");
            return Ok(Vec::new());
        };

        // One snapshot for both reads so favourite flags match the file list.
        // SQLite transactions are already serializable and reject these settings.
        let txn = match self.db.get_database_backend() {
            DatabaseBackend::Sqlite => self.db.begin().await?,
            _ => {
                self.db
                    .begin_with_config(
                        Some(IsolationLevel::RepeatableRead),
                        Some(AccessMode::ReadOnly),
                    )
                    .await?
            }
        };

        let favourites = FavouritesIndex::list_in(&txn, scope, principal).await?;
        if filter.favourites_only && favourites.is_empty() {
            txn.commit().await?;
            tracing::debug!(outcome = "no_matches", %scope, "No favourites in scope");
            return Ok(Vec::new());
        }

        let predicate = FilePredicate {
            deleted: filter.deleted_only,
            file_type: filter.file_type.as_type(),
            name_contains: filter
                .search
                .as_ref()
                .filter(|s| !s.trim().is_empty())
                .cloned(),
            ids: filter.favourites_only.then(|| favourites.clone()),
        };

        let files = FileStore::list_in(&txn, scope, &predicate).await?;
        txn.commit().await?;

        let entries: Vec<FileEntry> = files
            .into_iter()
            .map(|file| {
                let is_favourited = favourites.contains(&file.id);
                FileEntry {
                    file,
                    is_favourited,
                }
            })
            .collect();

        tracing::debug!(
            outcome = if entries.is_empty() { "no_matches" } else { "matched" },
            %scope,
            count = entries.len(),
            "File query completed"
        );
        Ok(entries)
    }
}

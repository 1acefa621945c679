use crate::api::error::AppError;
use crate::entities::{prelude::*, *};
use crate::services::changes::{ChangeFeed, ChangeKind};
use crate::services::file_store::FileStore;
use crate::services::tenant::{Principal, Scope};
use crate::utils::keyed_mutex::KeyedMutex;
use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QuerySelect, Set, SqlErr, TransactionTrait,
};
use std::collections::HashSet;

const TOGGLE_ATTEMPTS: usize = 3;

/// Per-scope, per-principal favourite markers.
pub struct FavouritesIndex {
    db: DatabaseConnection,
    changes: ChangeFeed,
    file_locks: KeyedMutex,
}

impl FavouritesIndex {
    /// `file_locks` must be the File Store's lock table so a toggle cannot
    /// interleave with a purge of the same file.
    pub fn new(db: DatabaseConnection, changes: ChangeFeed, file_locks: KeyedMutex) -> Self {
        Self {
            db,
            changes,
            file_locks,
        }
    }

    /// Flips the favourite state of `file_id` for `principal` and returns the new state.
    ///
    /// Existence is decided inside the transaction, so two concurrent toggles
    /// always leave the marker where two sequential toggles would.
    pub async fn toggle(
        &self,
        scope: &Scope,
        file_id: &str,
        principal: &Principal,
    ) -> Result<bool, AppError> {
        let _lock = self.file_locks.lock(file_id).await;

        let mut attempt = 0;
        let now_favourited = loop {
            attempt += 1;
            match self.try_toggle(scope, file_id, principal).await {
                Ok(state) => break state,
                Err(TxError::Conflict(e)) if attempt < TOGGLE_ATTEMPTS => {
                    tracing::debug!(
                        "Favourite toggle conflict on {} (attempt {}): {}",
                        file_id,
                        attempt,
                        e
                    );
                }
                Err(TxError::Conflict(e)) => return Err(AppError::Database(e)),
                Err(TxError::App(e)) => return Err(e),
            }
        };

        tracing::info!(
            "⭐ {} {} file {} in {}",
            principal.user_id,
            if now_favourited { "favourited" } else { "unfavourited" },
            file_id,
            scope
        );
        self.changes
            .publish(&scope.partition_key(), file_id, ChangeKind::FavouriteToggled);
        Ok(now_favourited)
    }

    async fn try_toggle(
        &self,
        scope: &Scope,
        file_id: &str,
        principal: &Principal,
    ) -> Result<bool, TxError> {
        let txn = self.db.begin().await?;

        // Scope check: never mark a file from another tenant
        FileStore::find_in_scope(&txn, scope, file_id)
            .await
            .map_err(TxError::App)?;

        let removed = Favourites::delete_many()
            .filter(favourites::Column::ScopeId.eq(scope.partition_key()))
            .filter(favourites::Column::FileId.eq(file_id))
            .filter(favourites::Column::PrincipalId.eq(&principal.user_id))
            .exec(&txn)
            .await?;

        let now_favourited = if removed.rows_affected > 0 {
            false
        } else {
            let marker = favourites::ActiveModel {
                scope_id: Set(scope.partition_key()),
                file_id: Set(file_id.to_string()),
                principal_id: Set(principal.user_id.clone()),
                created_at: Set(Utc::now()),
            };
            Favourites::insert(marker)
                .exec_without_returning(&txn)
                .await?;
            true
        };

        txn.commit().await?;
        Ok(now_favourited)
    }

    pub async fn list_by_scope(
        &self,
        scope: &Scope,
        principal: &Principal,
    ) -> Result<HashSet<String>, AppError> {
        Self::list_in(&self.db, scope, principal).await
    }

    pub async fn list_in(
        conn: &impl ConnectionTrait,
        scope: &Scope,
        principal: &Principal,
    ) -> Result<HashSet<String>, AppError> {
        let ids: Vec<String> = Favourites::find()
            .select_only()
            .column(favourites::Column::FileId)
            .filter(favourites::Column::ScopeId.eq(scope.partition_key()))
            .filter(favourites::Column::PrincipalId.eq(&principal.user_id))
            .into_tuple()
            .all(conn)
            .await?;
        Ok(ids.into_iter().collect())
    }

    pub async fn is_favourited(
        &self,
        scope: &Scope,
        file_id: &str,
        principal: &Principal,
    ) -> Result<bool, AppError> {
        let count = Favourites::find()
            .filter(favourites::Column::ScopeId.eq(scope.partition_key()))
            .filter(favourites::Column::FileId.eq(file_id))
            .filter(favourites::Column::PrincipalId.eq(&principal.user_id))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }
}

enum TxError {
    /// Another writer committed the same marker first; safe to retry
    Conflict(DbErr),
    App(AppError),
}

impl From<DbErr> for TxError {
    fn from(e: DbErr) -> Self {
        match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => TxError::Conflict(e),
            _ => TxError::App(AppError::Database(e)),
        }
    }
}

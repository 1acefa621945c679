mod common;

use chrono::{Duration, Utc};
use common::*;
use drive_backend::api::error::AppError;
use drive_backend::entities::{files, prelude::*};
use drive_backend::services::changes::ChangeKind;
use drive_backend::services::file_store::FilePredicate;
use drive_backend::services::file_type::FileType;
use drive_backend::services::query::FileFilter;
use drive_backend::services::tenant::Scope;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use std::collections::HashSet;
use std::sync::Arc;

#[tokio::test]
async fn test_live_and_trash_views_partition_the_scope() {
    let (state, storage) = setup_state().await;
    let scope = Scope::user("alice");
    let owner = alice();

    let mut ids = Vec::new();
    for name in ["a.pdf", "b.csv", "c.png", "d.pdf"] {
        let kind = match name.rsplit('.').next() {
            Some("pdf") => FileType::Pdf,
            Some("csv") => FileType::Csv,
            _ => FileType::Image,
        };
        ids.push(seed_file(&state, &storage, &scope, &owner, name, kind).await.id);
    }
    state.file_store.soft_delete(&scope, &ids[1], &owner).await.unwrap();
    state.file_store.soft_delete(&scope, &ids[3], &owner).await.unwrap();

    let live: HashSet<String> = state
        .file_store
        .list_by_scope(&scope, &FilePredicate::live())
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.id)
        .collect();
    let trash: HashSet<String> = state
        .file_store
        .list_by_scope(&scope, &FilePredicate::trash())
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.id)
        .collect();

    assert!(live.is_disjoint(&trash));
    let all: HashSet<String> = live.union(&trash).cloned().collect();
    assert_eq!(all, ids.iter().cloned().collect());
    assert_eq!(trash, HashSet::from([ids[1].clone(), ids[3].clone()]));
}

#[tokio::test]
async fn test_soft_delete_and_restore_are_idempotent() {
    let (state, storage) = setup_state().await;
    let scope = Scope::user("alice");
    let owner = alice();
    let file = seed_file(&state, &storage, &scope, &owner, "plan.pdf", FileType::Pdf).await;

    // Restoring a live file changes nothing
    state.file_store.restore(&scope, &file.id, &owner).await.unwrap();
    let unchanged = state.file_store.get(&scope, &file.id).await.unwrap();
    assert_eq!(unchanged, file);

    state.file_store.soft_delete(&scope, &file.id, &owner).await.unwrap();
    let trashed = state.file_store.get(&scope, &file.id).await.unwrap();
    assert!(trashed.deleted);
    assert!(trashed.deleted_at.is_some());

    state.file_store.soft_delete(&scope, &file.id, &owner).await.unwrap();
    assert_eq!(state.file_store.get(&scope, &file.id).await.unwrap(), trashed);

    state.file_store.restore(&scope, &file.id, &owner).await.unwrap();
    state.file_store.restore(&scope, &file.id, &owner).await.unwrap();
    let restored = state.file_store.get(&scope, &file.id).await.unwrap();
    assert!(!restored.deleted);
    assert!(restored.deleted_at.is_none());
    assert_eq!(restored.name, file.name);
    assert_eq!(restored.created_at, file.created_at);
}

#[tokio::test]
async fn test_only_owner_can_change_lifecycle() {
    let (state, storage) = setup_state().await;
    let scope = Scope::organization("acme");
    let owner = alice().in_organization("acme");
    let colleague = bob().in_organization("acme");
    let file = seed_file(&state, &storage, &scope, &owner, "q3.csv", FileType::Csv).await;

    let err = state
        .file_store
        .soft_delete(&scope, &file.id, &colleague)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    state.file_store.soft_delete(&scope, &file.id, &owner).await.unwrap();

    let err = state.file_store.restore(&scope, &file.id, &colleague).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    let err = state.file_store.purge(&scope, &file.id, &colleague).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // Rejected calls leave the file in trash with its blob
    assert!(state.file_store.get(&scope, &file.id).await.unwrap().deleted);
    assert!(storage.contains(&file.storage_key));
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let (state, _storage) = setup_state().await;
    let scope = Scope::user("alice");
    let owner = alice();

    let err = state.file_store.soft_delete(&scope, "missing", &owner).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let err = state.file_store.restore(&scope, "missing", &owner).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let err = state.file_store.purge(&scope, "missing", &owner).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_default_and_trash_queries_split_every_file() {
    let (state, storage) = setup_state().await;
    let scope = Scope::organization("acme");
    let owner = alice().in_organization("acme");

    let mut ids = HashSet::new();
    for (i, name) in ["a.pdf", "b.pdf", "c.pdf", "d.pdf", "e.pdf"].iter().enumerate() {
        let file = seed_file(&state, &storage, &scope, &owner, name, FileType::Pdf).await;
        if i % 2 == 0 {
            state.file_store.soft_delete(&scope, &file.id, &owner).await.unwrap();
        }
        ids.insert(file.id);
    }

    let view = |deleted_only| FileFilter {
        deleted_only,
        ..FileFilter::default()
    };
    let live: HashSet<String> = state
        .query_engine
        .query(Some(&scope), Some(&owner), &view(false))
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.file.id)
        .collect();
    let trash: HashSet<String> = state
        .query_engine
        .query(Some(&scope), Some(&owner), &view(true))
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.file.id)
        .collect();

    assert_eq!(live.len(), 2);
    assert_eq!(trash.len(), 3);
    assert!(live.is_disjoint(&trash));
    assert_eq!(live.union(&trash).cloned().collect::<HashSet<_>>(), ids);
}

#[tokio::test]
async fn test_purge_requires_trash() {
    let (state, storage) = setup_state().await;
    let scope = Scope::user("alice");
    let owner = alice();
    let file = seed_file(&state, &storage, &scope, &owner, "keep.pdf", FileType::Pdf).await;

    let err = state.file_store.purge(&scope, &file.id, &owner).await.unwrap_err();
    assert!(matches!(err, AppError::Precondition(_)));

    // Nothing was touched
    assert!(!state.file_store.get(&scope, &file.id).await.unwrap().deleted);
    assert!(storage.contains(&file.storage_key));
}

#[tokio::test]
async fn test_purge_removes_metadata_blob_and_favourites() {
    let (state, storage) = setup_state().await;
    let scope = Scope::user("alice");
    let owner = alice();
    let file = seed_file(&state, &storage, &scope, &owner, "old.pdf", FileType::Pdf).await;

    assert!(state.favourites.toggle(&scope, &file.id, &owner).await.unwrap());
    state.file_store.soft_delete(&scope, &file.id, &owner).await.unwrap();

    // Favourite survives the trip to the trash
    assert!(state.favourites.is_favourited(&scope, &file.id, &owner).await.unwrap());

    let report = state.file_store.purge(&scope, &file.id, &owner).await.unwrap();
    assert!(report.blob_removed);

    let err = state.file_store.get(&scope, &file.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(!storage.contains(&file.storage_key));
    assert!(state.favourites.list_by_scope(&scope, &owner).await.unwrap().is_empty());

    // A second purge finds nothing
    let err = state.file_store.purge(&scope, &file.id, &owner).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_purge_with_failing_blob_store_records_orphan() {
    let (state, storage) = setup_state().await;
    let scope = Scope::user("alice");
    let owner = alice();
    let file = seed_file(&state, &storage, &scope, &owner, "stuck.png", FileType::Image).await;
    state.file_store.soft_delete(&scope, &file.id, &owner).await.unwrap();

    storage.set_failing(true);
    let report = state.file_store.purge(&scope, &file.id, &owner).await.unwrap();
    assert!(!report.blob_removed);

    // Metadata is gone even though the bytes are not
    assert!(state.file_store.get(&scope, &file.id).await.is_err());
    assert!(storage.contains(&file.storage_key));
    assert_eq!(state.reconciliation.pending().await.unwrap(), 1);

    let report = state.reconciliation.sweep(10).await.unwrap();
    assert_eq!((report.removed, report.failed), (0, 1));
    assert_eq!(state.reconciliation.pending().await.unwrap(), 1);

    storage.set_failing(false);
    let report = state.reconciliation.sweep(10).await.unwrap();
    assert_eq!((report.removed, report.failed), (1, 0));
    assert_eq!(state.reconciliation.pending().await.unwrap(), 0);
    assert!(!storage.contains(&file.storage_key));
}

#[tokio::test]
async fn test_trash_retention_purges_only_expired_entries() {
    let (state, storage) = setup_state().await;
    let scope = Scope::user("alice");
    let owner = alice();
    let expired = seed_file(&state, &storage, &scope, &owner, "ancient.csv", FileType::Csv).await;
    let recent = seed_file(&state, &storage, &scope, &owner, "recent.csv", FileType::Csv).await;
    let live = seed_file(&state, &storage, &scope, &owner, "live.csv", FileType::Csv).await;

    state.file_store.soft_delete(&scope, &expired.id, &owner).await.unwrap();
    state.file_store.soft_delete(&scope, &recent.id, &owner).await.unwrap();

    let row = Files::find_by_id(expired.id.clone())
        .one(&state.db)
        .await
        .unwrap()
        .unwrap();
    let mut active: files::ActiveModel = row.into();
    active.deleted_at = Set(Some(Utc::now() - Duration::days(45)));
    active.update(&state.db).await.unwrap();

    let purged = state
        .file_store
        .purge_expired(Duration::days(30), 100)
        .await
        .unwrap();
    assert_eq!(purged, 1);

    assert!(state.file_store.get(&scope, &expired.id).await.is_err());
    assert!(state.file_store.get(&scope, &recent.id).await.unwrap().deleted);
    assert!(!state.file_store.get(&scope, &live.id).await.unwrap().deleted);
}

#[tokio::test]
async fn test_lifecycle_publishes_changes() {
    let (state, storage) = setup_state().await;
    let scope = Scope::user("alice");
    let owner = alice();
    let mut rx = state.changes.subscribe();

    let file = seed_file(&state, &storage, &scope, &owner, "feed.pdf", FileType::Pdf).await;
    state.file_store.soft_delete(&scope, &file.id, &owner).await.unwrap();
    state.file_store.restore(&scope, &file.id, &owner).await.unwrap();

    let kinds: Vec<ChangeKind> = (0..3).map(|_| rx.try_recv().unwrap().kind).collect();
    assert_eq!(
        kinds,
        vec![ChangeKind::Uploaded, ChangeKind::Deleted, ChangeKind::Restored]
    );
    // No-op restore publishes nothing
    state.file_store.restore(&scope, &file.id, &owner).await.unwrap();
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_concurrent_delete_and_purge_never_strand_metadata() {
    let (state, storage) = setup_state().await;
    let scope = Scope::user("alice");
    let owner = alice();
    let file = seed_file(&state, &storage, &scope, &owner, "race.pdf", FileType::Pdf).await;
    state.file_store.soft_delete(&scope, &file.id, &owner).await.unwrap();

    let store = Arc::clone(&state.file_store);
    let (s1, o1, id1) = (scope.clone(), owner.clone(), file.id.clone());
    let restore = tokio::spawn(async move { store.restore(&s1, &id1, &o1).await });
    let purge = state.file_store.purge(&scope, &file.id, &owner).await;
    restore.await.unwrap().ok();

    match purge {
        // Purge won: the restore saw nothing to restore
        Ok(_) => assert!(state.file_store.get(&scope, &file.id).await.is_err()),
        // Restore won: purge saw a live file
        Err(e) => {
            assert!(matches!(e, AppError::Precondition(_)));
            assert!(!state.file_store.get(&scope, &file.id).await.unwrap().deleted);
        }
    }
}

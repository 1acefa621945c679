mod common;

use common::*;
use drive_backend::api::error::AppError;
use drive_backend::config::DriveConfig;
use drive_backend::services::file_store::FilePredicate;
use drive_backend::services::file_type::FileType;
use drive_backend::services::reconciliation::ReconciliationService;
use drive_backend::services::tenant::Scope;
use drive_backend::services::upload::UploadRequest;
use drive_backend::services::worker::BackgroundWorker;
use sea_orm::ConnectionTrait;

fn request(bytes: &[u8], declared_type: &str, name: &str) -> UploadRequest {
    UploadRequest {
        bytes: bytes.to_vec(),
        declared_type: declared_type.to_string(),
        name: name.to_string(),
    }
}

#[tokio::test]
async fn test_upload_stores_blob_then_metadata() {
    let (state, storage) = setup_state().await;
    let scope = Scope::user("alice");
    let owner = alice();

    let file = state
        .uploads
        .upload(&scope, &owner, request(PNG_BYTES, "image", "../holiday.png"))
        .await
        .unwrap();

    assert_eq!(file.name, "holiday.png");
    assert_eq!(file.kind(), Some(FileType::Image));
    assert_eq!(file.size, PNG_BYTES.len() as i64);
    assert_eq!(file.owner_id, "alice");
    assert!(!file.deleted);
    assert!(file.storage_key.starts_with("user:alice/"));
    assert!(storage.contains(&file.storage_key));
}

#[tokio::test]
async fn test_upload_rejects_invalid_input_before_any_write() {
    let (state, storage) = setup_state().await;
    let scope = Scope::user("alice");
    let owner = alice();

    let cases = [
        request(b"", "pdf", "empty.pdf"),
        request(CSV_BYTES, "docx", "notes.docx"),
        request(PNG_BYTES, "pdf", "fake.pdf"),
        request(CSV_BYTES, "csv", "   "),
        request(CSV_BYTES, "csv", ".hidden.csv"),
    ];
    for case in cases {
        let err = state.uploads.upload(&scope, &owner, case).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "unexpected {:?}", err);
    }

    let oversized = vec![b'a'; state.config.max_file_size + 1];
    let err = state
        .uploads
        .upload(&scope, &owner, UploadRequest {
            bytes: oversized,
            declared_type: "csv".to_string(),
            name: "huge.csv".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PayloadTooLarge(_)));

    assert_eq!(storage.len(), 0);
    let live = state.file_store.list_by_scope(&scope, &FilePredicate::live()).await.unwrap();
    assert!(live.is_empty());
}

#[tokio::test]
async fn test_blob_failure_leaves_no_metadata() {
    let (state, storage) = setup_state().await;
    let scope = Scope::user("alice");
    let owner = alice();
    storage.set_failing(true);

    let err = state
        .uploads
        .upload(&scope, &owner, request(PDF_BYTES, "pdf", "report.pdf"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ExternalStore(_)));

    let live = state.file_store.list_by_scope(&scope, &FilePredicate::live()).await.unwrap();
    assert!(live.is_empty());
}

#[tokio::test]
async fn test_metadata_failure_discards_blob() {
    let (state, storage) = setup_state().await;
    let scope = Scope::user("alice");
    state.db.execute_unprepared("DROP TABLE files").await.unwrap();

    let err = state
        .uploads
        .upload(&scope, &alice(), request(CSV_BYTES, "csv", "sales.csv"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Database(_)));
    assert_eq!(storage.len(), 0);
    assert_eq!(state.reconciliation.pending().await.unwrap(), 0);
}

#[tokio::test]
async fn test_metadata_failure_with_stuck_blob_is_reconciled_later() {
    let (state, storage) = setup_state().await;
    let scope = Scope::user("alice");
    state.db.execute_unprepared("DROP TABLE files").await.unwrap();
    storage.set_failing_deletes(true);

    state
        .uploads
        .upload(&scope, &alice(), request(CSV_BYTES, "csv", "sales.csv"))
        .await
        .unwrap_err();
    assert_eq!(storage.len(), 1);
    assert_eq!(state.reconciliation.pending().await.unwrap(), 1);

    storage.set_failing_deletes(false);
    let (_tx, rx) = tokio::sync::watch::channel(false);
    let worker = BackgroundWorker::new(
        state.file_store.clone(),
        state.reconciliation.clone(),
        state.config.clone(),
        rx,
    );
    worker.perform_cleanup().await;

    assert_eq!(storage.len(), 0);
    assert_eq!(state.reconciliation.pending().await.unwrap(), 0);
}

#[tokio::test]
async fn test_worker_applies_trash_retention_when_configured() {
    let (state, storage) = setup_state().await;
    let scope = Scope::user("alice");
    let owner = alice();
    let file = seed_file(&state, &storage, &scope, &owner, "gone.pdf", FileType::Pdf).await;
    state.file_store.soft_delete(&scope, &file.id, &owner).await.unwrap();

    let (_tx, rx) = tokio::sync::watch::channel(false);

    // Disabled by default: the trash entry survives
    BackgroundWorker::new(
        state.file_store.clone(),
        state.reconciliation.clone(),
        state.config.clone(),
        rx.clone(),
    )
    .perform_cleanup()
    .await;
    assert!(state.file_store.get(&scope, &file.id).await.unwrap().deleted);

    // Zero days: anything already in the trash is expired
    let config = DriveConfig {
        trash_retention_days: Some(0),
        ..state.config.clone()
    };
    BackgroundWorker::new(state.file_store.clone(), state.reconciliation.clone(), config, rx)
        .perform_cleanup()
        .await;
    assert!(state.file_store.get(&scope, &file.id).await.is_err());
    assert!(!storage.contains(&file.storage_key));
}

#[tokio::test]
async fn test_record_appends_to_ledger() {
    let (state, _storage) = setup_state().await;
    ReconciliationService::record(
        &state.db,
        "alice/dangling",
        drive_backend::services::reconciliation::OrphanReason::Purge,
        "timeout",
    )
    .await
    .unwrap();
    assert_eq!(state.reconciliation.pending().await.unwrap(), 1);
}

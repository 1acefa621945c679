#![allow(dead_code)]

use async_trait::async_trait;
use drive_backend::AppState;
use drive_backend::config::DriveConfig;
use drive_backend::infrastructure::database;
use drive_backend::services::file_store::{File, NewFile};
use drive_backend::services::file_type::FileType;
use drive_backend::services::storage::StorageService;
use drive_backend::services::tenant::{Principal, Scope};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

pub const PDF_BYTES: &[u8] = b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\n";
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
pub const CSV_BYTES: &[u8] = b"region,total\nnorth,10\nsouth,12\n";

pub async fn setup_test_db() -> DatabaseConnection {
    // One connection: every pooled connection would otherwise get its own empty database
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.unwrap();
    database::run_migrations(&db).await.unwrap();
    db
}

pub struct MockStorageService {
    files: Mutex<HashMap<String, Vec<u8>>>,
    failing: AtomicBool,
    failing_deletes: AtomicBool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
            failing_deletes: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent call fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Uploads keep working, deletes fail.
    pub fn set_failing_deletes(&self, failing: bool) {
        self.failing_deletes.store(failing, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.files.lock().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("mock blob store unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn upload_file(&self, key: &str, data: Vec<u8>) -> anyhow::Result<()> {
        self.check()?;
        self.files.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn delete_file(&self, key: &str) -> anyhow::Result<()> {
        self.check()?;
        if self.failing_deletes.load(Ordering::SeqCst) {
            anyhow::bail!("mock blob store refused delete");
        }
        self.files.lock().unwrap().remove(key);
        Ok(())
    }

    async fn file_exists(&self, key: &str) -> anyhow::Result<bool> {
        self.check()?;
        Ok(self.files.lock().unwrap().contains_key(key))
    }

    async fn get_download_url(&self, key: &str) -> anyhow::Result<String> {
        Ok(format!("/obj/mock-bucket/{}", key))
    }
}

pub fn test_config() -> DriveConfig {
    DriveConfig {
        max_file_size: 1024 * 1024,
        jwt_secret: "test-secret".to_string(),
        ..DriveConfig::default()
    }
}

pub async fn setup_state() -> (AppState, Arc<MockStorageService>) {
    let db = setup_test_db().await;
    let storage = Arc::new(MockStorageService::new());
    let state = AppState::new(db, storage.clone(), test_config());
    (state, storage)
}

pub fn alice() -> Principal {
    Principal::new("alice")
}

pub fn bob() -> Principal {
    Principal::new("bob")
}

/// Registers metadata directly, with a blob stored under the same key.
pub async fn seed_file(
    state: &AppState,
    storage: &MockStorageService,
    scope: &Scope,
    owner: &Principal,
    name: &str,
    file_type: FileType,
) -> File {
    let key = format!("{}/{}", scope.partition_key(), uuid::Uuid::new_v4());
    storage.upload_file(&key, b"seed".to_vec()).await.unwrap();
    state
        .file_store
        .insert(
            scope,
            NewFile {
                name: name.to_string(),
                file_type,
                storage_key: key,
                owner_id: owner.user_id.clone(),
                size: 4,
            },
        )
        .await
        .unwrap()
}

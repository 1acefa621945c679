use std::env;

/// Runtime configuration for the drive backend
#[derive(Debug, Clone)]
pub struct DriveConfig {
    /// Maximum upload size in bytes (default: 256 MB)
    pub max_file_size: usize,

    /// JWT secret for HS256 tokens issued by the identity provider
    pub jwt_secret: String,

    /// PEM public key; when set, tokens are validated as RS256 instead
    pub jwt_public_key: Option<String>,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,

    /// Trash entries older than this are purged by the worker. `None` keeps them forever.
    pub trash_retention_days: Option<i64>,

    /// Seconds between background worker passes (default: 3600)
    pub sweep_interval_secs: u64,

    /// Orphaned blobs retried per worker pass (default: 100)
    pub orphan_sweep_batch: u64,

    /// Buffered change events per subscriber before it starts lagging (default: 256)
    pub change_feed_capacity: usize,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            max_file_size: 256 * 1024 * 1024, // 256 MB
            jwt_secret: "secret".to_string(),
            jwt_public_key: None,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(), // Vite default
                "http://127.0.0.1:3000".to_string(),
            ],
            trash_retention_days: None,
            sweep_interval_secs: 3600,
            orphan_sweep_batch: 100,
            change_feed_capacity: 256,
        }
    }
}

impl DriveConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            jwt_secret: env::var("JWT_SECRET").unwrap_or(default.jwt_secret),

            jwt_public_key: env::var("JWT_PUBLIC_KEY").ok(),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(default.allowed_origins),

            trash_retention_days: env::var("TRASH_RETENTION_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|days: &i64| *days > 0),

            sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.sweep_interval_secs),

            orphan_sweep_batch: env::var("ORPHAN_SWEEP_BATCH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.orphan_sweep_batch),

            change_feed_capacity: env::var("CHANGE_FEED_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|c: &usize| *c > 0)
                .unwrap_or(default.change_feed_capacity),
        }
    }

    /// Create config for development (short sweep interval, trash kept forever)
    pub fn development() -> Self {
        Self {
            sweep_interval_secs: 60,
            ..Self::default()
        }
    }

    /// Create config for production (secret required, 30 day trash retention unless overridden)
    pub fn production() -> Self {
        let from_env = Self::from_env();
        Self {
            jwt_secret: env::var("JWT_SECRET").expect("CRITICAL: JWT_SECRET must be set"),
            trash_retention_days: from_env.trash_retention_days.or(Some(30)),
            ..from_env
        }
    }
}

use crate::config::DriveConfig;
use crate::services::file_store::FileStore;
use crate::services::reconciliation::ReconciliationService;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{Duration, sleep};

pub struct BackgroundWorker {
    file_store: Arc<FileStore>,
    reconciliation: Arc<ReconciliationService>,
    config: DriveConfig,
    shutdown: watch::Receiver<bool>,
}

impl BackgroundWorker {
    pub fn new(
        file_store: Arc<FileStore>,
        reconciliation: Arc<ReconciliationService>,
        config: DriveConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            file_store,
            reconciliation,
            config,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            "🚀 Background worker started (interval {}s, trash retention {:?} days)",
            self.config.sweep_interval_secs,
            self.config.trash_retention_days
        );

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Background worker shutting down");
                    break;
                }
                _ = sleep(Duration::from_secs(self.config.sweep_interval_secs)) => {
                    self.perform_cleanup().await;
                }
            }
        }
    }

    pub async fn perform_cleanup(&self) {
        tracing::info!("🧹 Running background cleanup tasks...");

        // 1. Retry orphaned blobs
        match self
            .reconciliation
            .sweep(self.config.orphan_sweep_batch)
            .await
        {
            Ok(report) if report.removed + report.failed > 0 => tracing::info!(
                "Orphan sweep: {} removed, {} still pending",
                report.removed,
                report.failed
            ),
            Ok(_) => {}
            Err(e) => tracing::error!("Orphan sweep failed: {}", e),
        }

        // 2. Trash retention
        if let Some(days) = self.config.trash_retention_days {
            if let Err(e) = self
                .file_store
                .purge_expired(chrono::Duration::days(days), self.config.orphan_sweep_batch)
                .await
            {
                tracing::error!("Trash retention purge failed: {}", e);
            }
        }

        // 3. Drop idle per-file locks
        self.file_store.locks().cleanup();

        tracing::info!("✅ Background cleanup completed");
    }
}

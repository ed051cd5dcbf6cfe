use std::sync::Arc;
use std::time::Duration;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::AppError;
use crate::services::import_service::{ImportService, RefreshStats};
use crate::youtube::YouTubeClient;

/// Periodically re-reads every active course's playlist and appends new videos.
pub struct RefreshScheduler {
    db: SqlitePool,
    youtube: Arc<dyn YouTubeClient>,
    interval: Duration,
}

impl RefreshScheduler {
    pub fn new(
        db: SqlitePool,
        youtube: Arc<dyn YouTubeClient>,
        interval_secs: u64,
    ) -> Self {
        Self {
            db,
            youtube,
            interval: Duration::from_secs(interval_secs),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs forever; the first refresh happens one interval after start.
    pub async fn start(self) {
        info!("Starting playlist refresh scheduler (interval: {:?})", self.interval);

        loop {
            tokio::time::sleep(self.interval).await;

            match self.run_refresh().await {
                Ok(results) => {
                    let added: usize = results.iter().map(|r| r.lessons_added).sum();
                    info!(
                        "Playlist refresh completed - {} courses checked, {} lessons added",
                        results.len(),
                        added
                    );
                }
                Err(e) => {
                    tracing::warn!("Playlist refresh failed: {:?}", e);
                }
            }
        }
    }

    pub async fn run_refresh(&self) -> Result<Vec<RefreshStats>, AppError> {
        let service = ImportService::new(self.db.clone(), self.youtube.clone());
        service.refresh_all().await
    }
}

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::progress::BadgePolicy;
use crate::youtube::YouTubeClient;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub youtube: Arc<dyn YouTubeClient>,
    pub badges: Arc<BadgePolicy>,
}

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::SqlitePool;

use tubecourse::api::router;
use tubecourse::db;
use tubecourse::error::AppError;
use tubecourse::progress::BadgePolicy;
use tubecourse::state::AppState;
use tubecourse::youtube::{PlaylistSnapshot, PlaylistVideo, YouTubeClient};

/// Serves whatever playlist the test last stored, regardless of id.
pub struct FakeYouTube {
    playlist: Mutex<PlaylistSnapshot>,
}

impl FakeYouTube {
    pub fn new(videos: &[&str]) -> Self {
        Self {
            playlist: Mutex::new(snapshot(videos)),
        }
    }

    pub fn set_videos(&self, videos: &[&str]) {
        *self.playlist.lock().expect("fake playlist lock") = snapshot(videos);
    }
}

pub fn snapshot(videos: &[&str]) -> PlaylistSnapshot {
    PlaylistSnapshot {
        id: "PLfake".to_string(),
        title: "Fake Playlist".to_string(),
        description: "for tests".to_string(),
        videos: videos
            .iter()
            .map(|id| PlaylistVideo {
                video_id: id.to_string(),
                title: format!("Video {}", id),
                thumbnail_url: Some(format!("https://i.ytimg.com/vi/{}/mqdefault.jpg", id)),
            })
            .collect(),
        skipped: 0,
    }
}

#[async_trait]
impl YouTubeClient for FakeYouTube {
    async fn fetch_playlist(&self, _playlist_id: &str) -> Result<PlaylistSnapshot, AppError> {
        Ok(self.playlist.lock().expect("fake playlist lock").clone())
    }
}

pub async fn test_state(youtube: Arc<dyn YouTubeClient>) -> AppState {
    let pool: SqlitePool = db::memory().await.expect("Failed to create test db");
    AppState {
        db: pool,
        youtube,
        badges: Arc::new(BadgePolicy::strict()),
    }
}

pub async fn test_app(youtube: Arc<dyn YouTubeClient>) -> (axum::Router, AppState) {
    let state = test_state(youtube).await;
    (router(state.clone()), state)
}

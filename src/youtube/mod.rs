pub mod dto;

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};
use url::Url;

use crate::config::YouTubeConfig;
use crate::error::AppError;

const PAGE_SIZE: &str = "50";
// A playlist holds at most 5000 videos.
const MAX_PAGES: usize = 100;
const UNAVAILABLE_TITLES: [&str; 2] = ["Private video", "Deleted video"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistVideo {
    pub video_id: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
}

/// Playlist metadata plus its playable videos in playlist order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSnapshot {
    pub id: String,
    pub title: String,
    pub description: String,
    pub videos: Vec<PlaylistVideo>,
    /// Items dropped because they had no video id or were private/deleted.
    pub skipped: usize,
}

#[async_trait]
pub trait YouTubeClient: Send + Sync {
    async fn fetch_playlist(&self, playlist_id: &str) -> Result<PlaylistSnapshot, AppError>;
}

/// Accepts a bare playlist id or a YouTube URL with a `list=` parameter.
pub fn parse_playlist_ref(input: &str) -> Result<String, AppError> {
    let input = input.trim();

    let candidate = match Url::parse(input) {
        Ok(url) => url
            .query_pairs()
            .find(|(k, _)| k == "list")
            .map(|(_, v)| v.into_owned())
            .ok_or_else(|| {
                AppError::BadRequest(format!("URL has no playlist (list=) parameter: {}", input))
            })?,
        Err(_) => input.to_string(),
    };

    let valid = candidate.len() >= 2
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(candidate)
    } else {
        Err(AppError::BadRequest(format!("Invalid playlist id: {:?}", candidate)))
    }
}

/// Maps one playlistItems entry to a video, or `None` when it is not playable.
pub fn video_from_item(item: &dto::PlaylistItem) -> Option<PlaylistVideo> {
    let snippet = item.snippet.as_ref();

    let video_id = item
        .content_details
        .as_ref()
        .and_then(|d| d.video_id.clone())
        .or_else(|| {
            snippet
                .and_then(|s| s.resource_id.as_ref())
                .and_then(|r| r.video_id.clone())
        })
        .filter(|id| !id.is_empty())?;

    let title = snippet.map(|s| s.title.trim().to_string()).unwrap_or_default();
    if UNAVAILABLE_TITLES.contains(&title.as_str()) {
        return None;
    }

    let thumbnail_url = snippet
        .and_then(|s| s.thumbnails.as_ref())
        .and_then(|t| t.medium.as_ref().or(t.high.as_ref()).or(t.default.as_ref()))
        .map(|t| t.url.clone());

    Some(PlaylistVideo {
        title: if title.is_empty() { video_id.clone() } else { title },
        video_id,
        thumbnail_url,
    })
}

pub struct YouTubeHttpClient {
    client: Client,
    config: YouTubeConfig,
}

impl YouTubeHttpClient {
    pub fn new(config: YouTubeConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| {
                error!("Failed to build http client: {}", e);
                AppError::InternalServerError
            })?;
        Ok(Self { client, config })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        resource: &str,
        params: &[(&str, &str)],
    ) -> Result<T, AppError> {
        let url = Url::parse_with_params(
            &format!("{}/{}", self.config.api_base, resource),
            params
                .iter()
                .copied()
                .chain([("key", self.config.api_key.as_str())]),
        )
        .map_err(|e| {
            error!("Invalid YouTube API url {}: {}", self.config.api_base, e);
            AppError::InternalServerError
        })?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("YouTube request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("YouTube API error {}: {}", status, body)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse YouTube response: {}", e)))
    }

    async fn fetch_items(&self, playlist_id: &str) -> Result<Vec<dto::PlaylistItem>, AppError> {
        let mut items = Vec::new();
        let mut seen_tokens = HashSet::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut params = vec![
                ("part", "snippet,contentDetails"),
                ("maxResults", PAGE_SIZE),
                ("playlistId", playlist_id),
            ];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.as_str()));
            }

            let page: dto::PlaylistItemListResponse = self.get_json("playlistItems", &params).await?;
            debug!("fetched {} playlist items for {}", page.items.len(), playlist_id);
            items.extend(page.items);

            match page.next_page_token {
                Some(token) if seen_tokens.insert(token.clone()) => page_token = Some(token),
                Some(token) => {
                    warn!("YouTube repeated page token {}; stopping pagination", token);
                    break;
                }
                None => break,
            }
        }

        Ok(items)
    }
}

#[async_trait]
impl YouTubeClient for YouTubeHttpClient {
    async fn fetch_playlist(&self, playlist_id: &str) -> Result<PlaylistSnapshot, AppError> {
        let meta: dto::PlaylistListResponse = self
            .get_json("playlists", &[("part", "snippet"), ("id", playlist_id)])
            .await?;
        let playlist = meta.items.into_iter().next().ok_or(AppError::NotFound)?;

        let items = self.fetch_items(playlist_id).await?;
        let total = items.len();
        let videos: Vec<PlaylistVideo> = items
            .iter()
            .filter_map(|item| {
                let video = video_from_item(item);
                if video.is_none() {
                    warn!("Skipping unavailable playlist item in {}", playlist_id);
                }
                video
            })
            .collect();

        Ok(PlaylistSnapshot {
            id: playlist.id,
            title: playlist.snippet.title,
            description: playlist.snippet.description,
            skipped: total - videos.len(),
            videos,
        })
    }
}

pub struct NoopYouTubeClient;

#[async_trait]
impl YouTubeClient for NoopYouTubeClient {
    async fn fetch_playlist(&self, _playlist_id: &str) -> Result<PlaylistSnapshot, AppError> {
        Err(AppError::ServiceUnavailable(
            "Playlist import is disabled: YOUTUBE_API_KEY is not set".to_string(),
        ))
    }
}

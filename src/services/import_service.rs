use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::repository;
use crate::error::AppError;
use crate::models::{ImportCourseRequest, NewCourse, NewLesson, NewModule};
use crate::youtube::{PlaylistSnapshot, YouTubeClient, parse_playlist_ref};

pub struct ImportService {
    db: SqlitePool,
    youtube: Arc<dyn YouTubeClient>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStats {
    pub course_id: String,
    pub title: String,
    pub modules_created: usize,
    pub lessons_created: usize,
    pub videos_skipped: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshStats {
    pub course_id: String,
    pub lessons_added: usize,
    pub videos_skipped: usize,
}

impl ImportService {
    pub fn new(db: SqlitePool, youtube: Arc<dyn YouTubeClient>) -> Self {
        Self { db, youtube }
    }

    pub async fn import(&self, req: ImportCourseRequest) -> Result<ImportStats, AppError> {
        let playlist_id = parse_playlist_ref(&req.playlist)?;
        if req.videos_per_module == Some(0) {
            return Err(AppError::BadRequest(
                "videosPerModule must be at least 1".to_string(),
            ));
        }

        if let Some(existing) =
            repository::find_active_course_by_playlist(&self.db, &playlist_id).await?
        {
            return Err(AppError::Conflict(format!(
                "Playlist {} is already imported as course {}",
                playlist_id, existing.id
            )));
        }

        info!("Importing playlist {}", playlist_id);
        let snapshot = self.youtube.fetch_playlist(&playlist_id).await?;
        if snapshot.videos.is_empty() {
            return Err(AppError::BadRequest(format!(
                "Playlist {} has no playable videos",
                playlist_id
            )));
        }

        let (modules, duplicates) = plan_modules(&snapshot, req.videos_per_module);
        let modules_created = modules.len();
        let lessons_created = modules.iter().map(|m| m.lessons.len()).sum();

        let course = repository::insert_course_tree(
            &self.db,
            NewCourse {
                title: snapshot.title.clone(),
                description: snapshot.description.clone(),
                playlist_id: playlist_id.clone(),
            },
            modules,
        )
        .await
        .map_err(|e| match e {
            // 同時 import で先に commit された側が勝つ
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => AppError::Conflict(
                format!("Playlist {} is already imported", playlist_id),
            ),
            e => AppError::Database(e),
        })?;

        let stats = ImportStats {
            course_id: course.id,
            title: course.title,
            modules_created,
            lessons_created,
            videos_skipped: snapshot.skipped + duplicates,
        };
        info!("Import completed: {:?}", stats);
        Ok(stats)
    }

    /// Appends playlist videos that the course does not have yet to its last
    /// module. Existing lessons keep their positions.
    pub async fn refresh(&self, course_id: &str) -> Result<RefreshStats, AppError> {
        let course = repository::find_course_by_id(&self.db, course_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if course.is_archived {
            return Err(AppError::Conflict(format!("Course {} is archived", course_id)));
        }

        let snapshot = self.youtube.fetch_playlist(&course.playlist_id).await?;
        let mut known = repository::fetch_video_ids_for_course(&self.db, course_id).await?;

        let fresh: Vec<NewLesson> = snapshot
            .videos
            .into_iter()
            .filter(|v| known.insert(v.video_id.clone()))
            .map(|v| NewLesson {
                title: v.title,
                youtube_video_id: v.video_id,
                thumbnail_url: v.thumbnail_url,
            })
            .collect();

        let lessons_added = if fresh.is_empty() {
            0
        } else {
            let modules = repository::fetch_modules_with_lessons(&self.db, course_id).await?;
            let last = modules.last().ok_or_else(|| {
                AppError::Conflict(format!("Course {} has no module to append to", course_id))
            })?;
            repository::append_lessons(&self.db, last.module.id, &fresh).await?
        };

        Ok(RefreshStats {
            course_id: course.id,
            lessons_added,
            videos_skipped: snapshot.skipped,
        })
    }

    pub async fn refresh_all(&self) -> Result<Vec<RefreshStats>, AppError> {
        let courses = repository::fetch_courses(&self.db).await?;
        let mut results = Vec::with_capacity(courses.len());

        for course in courses {
            match self.refresh(&course.id).await {
                Ok(stats) => results.push(stats),
                Err(e) => warn!("Failed to refresh course {} ({}): {}", course.title, course.id, e),
            }
        }

        Ok(results)
    }
}

/// Splits playlist videos into modules, dropping repeated video ids.
/// Returns the modules and how many duplicates were dropped.
pub fn plan_modules(
    snapshot: &PlaylistSnapshot,
    videos_per_module: Option<usize>,
) -> (Vec<NewModule>, usize) {
    let mut seen = HashSet::new();
    let lessons: Vec<NewLesson> = snapshot
        .videos
        .iter()
        .filter(|v| seen.insert(v.video_id.as_str()))
        .map(|v| NewLesson {
            title: v.title.clone(),
            youtube_video_id: v.video_id.clone(),
            thumbnail_url: v.thumbnail_url.clone(),
        })
        .collect();
    let duplicates = snapshot.videos.len() - lessons.len();

    let modules = match videos_per_module {
        Some(size) if size > 0 => lessons
            .chunks(size)
            .enumerate()
            .map(|(i, chunk)| NewModule {
                title: format!("Module {}", i + 1),
                lessons: chunk.to_vec(),
            })
            .collect(),
        _ => vec![NewModule {
            title: snapshot.title.clone(),
            lessons,
        }],
    };

    (modules, duplicates)
}

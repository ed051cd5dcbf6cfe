use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    pub playlist_id: String,
    pub is_archived: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: i64,
    pub course_id: String,
    pub title: String,
    pub order_index: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: i64,
    pub module_id: i64,
    pub title: String,
    pub position: i64,
    pub youtube_video_id: String,
    pub thumbnail_url: Option<String>,
}

/// A module together with its lessons, as loaded from storage.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleWithLessons {
    #[serde(flatten)]
    pub module: Module,
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImportCourseRequest {
    /// Playlist id or any YouTube URL carrying a `list=` parameter.
    pub playlist: String,
    #[serde(default)]
    pub videos_per_module: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    pub playlist_id: String,
}

#[derive(Debug, Clone)]
pub struct NewModule {
    pub title: String,
    pub lessons: Vec<NewLesson>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLesson {
    pub title: String,
    pub youtube_video_id: String,
    pub thumbnail_url: Option<String>,
}

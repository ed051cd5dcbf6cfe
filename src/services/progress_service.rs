use std::sync::Arc;

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::db::repository;
use crate::error::AppError;
use crate::models::{CompletionResponse, Course};
use crate::progress::{
    BadgePolicy, CourseProgress, ModuleState, completion_days, compute_progress, compute_streak,
    count_lessons, derive_lesson_states, find_lesson,
};

/// Loads a user's course data and runs it through the derivations.
pub struct ProgressService {
    db: SqlitePool,
    badges: Arc<BadgePolicy>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseView {
    pub course: Course,
    pub modules: Vec<ModuleState>,
    pub progress: CourseProgress,
    pub badge: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub course_id: String,
    pub title: String,
    pub progress: CourseProgress,
    pub badge: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub streak: u32,
    pub completed_lessons: usize,
    pub overall: CourseProgress,
    pub badge: String,
    pub courses: Vec<CourseSummary>,
}

impl ProgressService {
    pub fn new(db: SqlitePool, badges: Arc<BadgePolicy>) -> Self {
        Self { db, badges }
    }

    async fn module_states(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<Vec<ModuleState>, AppError> {
        let modules = repository::fetch_modules_with_lessons(&self.db, course_id).await?;
        let completed = repository::fetch_completed_lesson_ids(&self.db, user_id, course_id).await?;
        Ok(derive_lesson_states(&modules, &completed))
    }

    pub async fn course_view(&self, user_id: &str, course_id: &str) -> Result<CourseView, AppError> {
        let course = repository::find_course_by_id(&self.db, course_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let modules = self.module_states(user_id, course_id).await?;
        let (total, done) = count_lessons(&modules);
        let progress = compute_progress(total, done);

        Ok(CourseView {
            course,
            modules,
            badge: self.badges.classify(progress.percentage).to_string(),
            progress,
        })
    }

    pub async fn course_progress(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<CourseProgress, AppError> {
        if repository::find_course_by_id(&self.db, course_id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        let modules = self.module_states(user_id, course_id).await?;
        let (total, done) = count_lessons(&modules);
        Ok(compute_progress(total, done))
    }

    /// Marks a lesson complete. Repeats are no-ops; a lesson that is still
    /// locked for this user is rejected.
    pub async fn complete_lesson(
        &self,
        user_id: &str,
        lesson_id: i64,
    ) -> Result<CompletionResponse, AppError> {
        let course_id = repository::find_lesson_course_id(&self.db, lesson_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if let Some(existing) = repository::find_completion(&self.db, user_id, lesson_id).await? {
            debug!("lesson {} already completed by {}", lesson_id, user_id);
            return Ok(CompletionResponse {
                lesson_id,
                completed_at: existing.completed_at,
                newly_completed: false,
            });
        }

        let modules = self.module_states(user_id, &course_id).await?;
        let unlocked = find_lesson(&modules, lesson_id)
            .map(|l| l.unlocked)
            .ok_or(AppError::NotFound)?;
        if !unlocked {
            return Err(AppError::Conflict(format!("Lesson {} is locked", lesson_id)));
        }

        let (record, inserted) = repository::insert_completion(&self.db, user_id, lesson_id).await?;
        if inserted {
            info!("user {} completed lesson {}", user_id, lesson_id);
        }

        Ok(CompletionResponse {
            lesson_id,
            completed_at: record.completed_at,
            newly_completed: inserted,
        })
    }

    pub async fn dashboard(&self, user_id: &str) -> Result<Dashboard, AppError> {
        let timestamps = repository::fetch_completion_timestamps(&self.db, user_id).await?;
        let days = completion_days(timestamps.iter().map(String::as_str));
        let streak = compute_streak(&days);

        let counts = repository::fetch_course_lesson_counts(&self.db, user_id).await?;
        let (mut total, mut done) = (0usize, 0usize);

        let courses = counts
            .into_iter()
            .map(|c| {
                let course_total = usize::try_from(c.total_lessons).unwrap_or(0);
                let course_done = usize::try_from(c.completed_lessons).unwrap_or(0);
                total += course_total;
                done += course_done;

                let progress = compute_progress(course_total, course_done);
                CourseSummary {
                    course_id: c.course_id,
                    title: c.title,
                    badge: self.badges.classify(progress.percentage).to_string(),
                    progress,
                }
            })
            .collect();

        let overall = compute_progress(total, done);

        Ok(Dashboard {
            streak,
            completed_lessons: done,
            badge: self.badges.classify(overall.percentage).to_string(),
            overall,
            courses,
        })
    }
}

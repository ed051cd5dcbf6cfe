use std::collections::HashSet;

use serde::Serialize;

use crate::models::{Lesson, ModuleWithLessons};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonState {
    pub id: i64,
    pub title: String,
    pub position: i64,
    pub youtube_video_id: String,
    pub thumbnail_url: Option<String>,
    pub completed: bool,
    pub unlocked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleState {
    pub id: i64,
    pub title: String,
    pub order_index: i64,
    pub lessons: Vec<LessonState>,
}

/// Derives `completed`/`unlocked` for every lesson of a course.
///
/// Each module is handled on its own: lessons are re-sorted by position and a
/// lesson is unlocked when it is first in its module or when the lesson right
/// before it is completed. Modules never gate each other. Ids in `completed`
/// that belong to no lesson here are ignored.
pub fn derive_lesson_states(
    modules: &[ModuleWithLessons],
    completed: &HashSet<i64>,
) -> Vec<ModuleState> {
    let mut ordered: Vec<&ModuleWithLessons> = modules.iter().collect();
    ordered.sort_by_key(|entry| entry.module.order_index);

    ordered
        .into_iter()
        .map(|entry| derive_module(entry, completed))
        .collect()
}

fn derive_module(entry: &ModuleWithLessons, completed: &HashSet<i64>) -> ModuleState {
    let mut lessons: Vec<&Lesson> = entry.lessons.iter().collect();
    lessons.sort_by_key(|lesson| lesson.position);

    let mut previous_completed: Option<bool> = None;
    let lessons = lessons
        .into_iter()
        .map(|lesson| {
            let is_completed = completed.contains(&lesson.id);
            let unlocked = previous_completed.unwrap_or(true);
            previous_completed = Some(is_completed);

            LessonState {
                id: lesson.id,
                title: lesson.title.clone(),
                position: lesson.position,
                youtube_video_id: lesson.youtube_video_id.clone(),
                thumbnail_url: lesson.thumbnail_url.clone(),
                completed: is_completed,
                unlocked,
            }
        })
        .collect();

    ModuleState {
        id: entry.module.id,
        title: entry.module.title.clone(),
        order_index: entry.module.order_index,
        lessons,
    }
}

pub fn find_lesson(modules: &[ModuleState], lesson_id: i64) -> Option<&LessonState> {
    modules
        .iter()
        .flat_map(|m| m.lessons.iter())
        .find(|l| l.id == lesson_id)
}

pub fn count_lessons(modules: &[ModuleState]) -> (usize, usize) {
    modules
        .iter()
        .flat_map(|m| m.lessons.iter())
        .fold((0, 0), |(total, done), l| {
            (total + 1, done + usize::from(l.completed))
        })
}

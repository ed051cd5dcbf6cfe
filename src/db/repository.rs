use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::models::{
    CompletionRecord, Course, Lesson, Module, ModuleWithLessons, NewCourse, NewLesson, NewModule,
    NewUserRequest, User,
};

const COURSE_COLUMNS: &str =
    "id, title, description, playlist_id, is_archived, created_at, updated_at";

/// Per-course lesson totals for one user, computed in SQL for the dashboard.
#[derive(Debug, Clone, FromRow)]
pub struct CourseLessonCounts {
    pub course_id: String,
    pub title: String,
    pub total_lessons: i64,
    pub completed_lessons: i64,
}

pub async fn insert_user(db: &SqlitePool, req: NewUserRequest) -> Result<User, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query("INSERT INTO users (id, name, created_at) VALUES (?1, ?2, ?3)")
        .bind(&id)
        .bind(&req.name)
        .bind(&now)
        .execute(db)
        .await?;

    Ok(User {
        id,
        name: req.name,
        created_at: now,
    })
}

pub async fn find_user_by_id(db: &SqlitePool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT id, name, created_at FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn fetch_courses(db: &SqlitePool) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "SELECT {} FROM courses WHERE is_archived = 0 ORDER BY updated_at DESC",
        COURSE_COLUMNS
    ))
    .fetch_all(db)
    .await
}

pub async fn find_course_by_id(db: &SqlitePool, id: &str) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!("SELECT {} FROM courses WHERE id = ?", COURSE_COLUMNS))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn find_active_course_by_playlist(
    db: &SqlitePool,
    playlist_id: &str,
) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "SELECT {} FROM courses WHERE playlist_id = ? AND is_archived = 0",
        COURSE_COLUMNS
    ))
    .bind(playlist_id)
    .fetch_optional(db)
    .await
}

/// Inserts a course with its modules and lessons in a single transaction.
/// Modules get order indexes and lessons get positions counting from 1.
pub async fn insert_course_tree(
    db: &SqlitePool,
    course: NewCourse,
    modules: Vec<NewModule>,
) -> Result<Course, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    let mut tx = db.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO courses
            (id, title, description, playlist_id, is_archived, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)
        "#,
    )
    .bind(&id)
    .bind(&course.title)
    .bind(&course.description)
    .bind(&course.playlist_id)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    for (index, module) in modules.into_iter().enumerate() {
        let module_id = sqlx::query(
            "INSERT INTO modules (course_id, title, order_index) VALUES (?1, ?2, ?3)",
        )
        .bind(&id)
        .bind(&module.title)
        .bind(index as i64 + 1)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for (position, lesson) in module.lessons.iter().enumerate() {
            insert_lesson(&mut tx, module_id, position as i64 + 1, lesson).await?;
        }
    }

    tx.commit().await?;

    Ok(Course {
        id,
        title: course.title,
        description: course.description,
        playlist_id: course.playlist_id,
        is_archived: false,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Appends lessons to the end of a module, continuing after its highest
/// position. Returns how many rows were written.
pub async fn append_lessons(
    db: &SqlitePool,
    module_id: i64,
    lessons: &[NewLesson],
) -> Result<usize, sqlx::Error> {
    if lessons.is_empty() {
        return Ok(0);
    }

    let mut tx = db.begin().await?;

    let last: Option<i64> = sqlx::query_scalar("SELECT MAX(position) FROM lessons WHERE module_id = ?")
        .bind(module_id)
        .fetch_one(&mut *tx)
        .await?;
    let start = last.unwrap_or(0) + 1;

    for (offset, lesson) in lessons.iter().enumerate() {
        insert_lesson(&mut tx, module_id, start + offset as i64, lesson).await?;
    }

    sqlx::query(
        "UPDATE courses SET updated_at = ?1 WHERE id = (SELECT course_id FROM modules WHERE id = ?2)",
    )
    .bind(Utc::now().to_rfc3339())
    .bind(module_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(lessons.len())
}

async fn insert_lesson(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    module_id: i64,
    position: i64,
    lesson: &NewLesson,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO lessons (module_id, title, position, youtube_video_id, thumbnail_url)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(module_id)
    .bind(&lesson.title)
    .bind(position)
    .bind(&lesson.youtube_video_id)
    .bind(&lesson.thumbnail_url)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn archive_course(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        UPDATE courses
        SET is_archived = 1,
            updated_at = ?2
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(now)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

/// Loads modules ordered by order index, each with its lessons ordered by
/// position. Lessons are grouped by module id, so row order across modules
/// does not matter.
pub async fn fetch_modules_with_lessons(
    db: &SqlitePool,
    course_id: &str,
) -> Result<Vec<ModuleWithLessons>, sqlx::Error> {
    let modules = sqlx::query_as::<_, Module>(
        "SELECT id, course_id, title, order_index FROM modules WHERE course_id = ? ORDER BY order_index",
    )
    .bind(course_id)
    .fetch_all(db)
    .await?;

    let lessons = sqlx::query_as::<_, Lesson>(
        r#"
        SELECT l.id, l.module_id, l.title, l.position, l.youtube_video_id, l.thumbnail_url
        FROM lessons l
        JOIN modules m ON m.id = l.module_id
        WHERE m.course_id = ?
        ORDER BY l.position
        "#,
    )
    .bind(course_id)
    .fetch_all(db)
    .await?;

    let mut by_module: HashMap<i64, Vec<Lesson>> = HashMap::new();
    for lesson in lessons {
        by_module.entry(lesson.module_id).or_default().push(lesson);
    }

    Ok(modules
        .into_iter()
        .map(|module| {
            let lessons = by_module.remove(&module.id).unwrap_or_default();
            ModuleWithLessons { module, lessons }
        })
        .collect())
}

pub async fn fetch_video_ids_for_course(
    db: &SqlitePool,
    course_id: &str,
) -> Result<HashSet<String>, sqlx::Error> {
    let ids: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT l.youtube_video_id
        FROM lessons l
        JOIN modules m ON m.id = l.module_id
        WHERE m.course_id = ?
        "#,
    )
    .bind(course_id)
    .fetch_all(db)
    .await?;

    Ok(ids.into_iter().collect())
}

pub async fn find_lesson_course_id(
    db: &SqlitePool,
    lesson_id: i64,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT m.course_id FROM lessons l JOIN modules m ON m.id = l.module_id WHERE l.id = ?",
    )
    .bind(lesson_id)
    .fetch_optional(db)
    .await
}

pub async fn fetch_completed_lesson_ids(
    db: &SqlitePool,
    user_id: &str,
    course_id: &str,
) -> Result<HashSet<i64>, sqlx::Error> {
    let ids: Vec<i64> = sqlx::query_scalar(
        r#"
        SELECT c.lesson_id
        FROM completions c
        JOIN lessons l ON l.id = c.lesson_id
        JOIN modules m ON m.id = l.module_id
        WHERE c.user_id = ?1 AND m.course_id = ?2 AND c.completed = 1
        "#,
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_all(db)
    .await?;

    Ok(ids.into_iter().collect())
}

pub async fn fetch_completion_timestamps(
    db: &SqlitePool,
    user_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT completed_at FROM completions WHERE user_id = ? AND completed = 1 ORDER BY completed_at DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn find_completion(
    db: &SqlitePool,
    user_id: &str,
    lesson_id: i64,
) -> Result<Option<CompletionRecord>, sqlx::Error> {
    sqlx::query_as::<_, CompletionRecord>(
        "SELECT user_id, lesson_id, completed, completed_at FROM completions WHERE user_id = ?1 AND lesson_id = ?2",
    )
    .bind(user_id)
    .bind(lesson_id)
    .fetch_optional(db)
    .await
}

/// Records a completion once per (user, lesson). A repeat call leaves the
/// original row and timestamp untouched and reports `false`.
pub async fn insert_completion(
    db: &SqlitePool,
    user_id: &str,
    lesson_id: i64,
) -> Result<(CompletionRecord, bool), sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let inserted = sqlx::query(
        r#"
        INSERT INTO completions (user_id, lesson_id, completed, completed_at)
        VALUES (?1, ?2, 1, ?3)
        ON CONFLICT (user_id, lesson_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(lesson_id)
    .bind(&now)
    .execute(db)
    .await?
    .rows_affected()
        > 0;

    let record = find_completion(db, user_id, lesson_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    Ok((record, inserted))
}

pub async fn fetch_course_lesson_counts(
    db: &SqlitePool,
    user_id: &str,
) -> Result<Vec<CourseLessonCounts>, sqlx::Error> {
    sqlx::query_as::<_, CourseLessonCounts>(
        r#"
        SELECT
            c.id AS course_id,
            c.title AS title,
            COUNT(l.id) AS total_lessons,
            COUNT(done.lesson_id) AS completed_lessons
        FROM courses c
        LEFT JOIN modules m ON m.course_id = c.id
        LEFT JOIN lessons l ON l.module_id = m.id
        LEFT JOIN completions done
            ON done.lesson_id = l.id AND done.user_id = ?1 AND done.completed = 1
        WHERE c.is_archived = 0
        GROUP BY c.id, c.title
        ORDER BY c.updated_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

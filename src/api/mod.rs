pub mod auth;

use axum::Json;
use axum::extract::Path;
use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::routing::{patch, post};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::db::repository;
use crate::error::AppError;
use crate::models::*;
use crate::progress::CourseProgress;
use crate::services::{Dashboard, CourseView, ImportService, ImportStats, ProgressService, RefreshStats};
use crate::state::AppState;

pub use auth::{CurrentUser, USER_HEADER};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/users", post(create_user))
        .route("/courses", get(list_courses))
        .route("/courses/import", post(import_course))
        .route("/courses/{id}", get(get_course))
        .route("/courses/{id}/progress", get(get_course_progress))
        .route("/courses/{id}/refresh", post(refresh_course))
        .route("/courses/{id}/archive", patch(archive_course))
        .route("/lessons/{id}/complete", post(complete_lesson))
        .route("/dashboard", get(dashboard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Empty `allowed_origins` allows any origin.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(USER_HEADER)]);

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<NewUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name must not be empty".to_string()));
    }
    let user = repository::insert_user(
        &state.db,
        NewUserRequest {
            name: name.to_string(),
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<Course>>, AppError> {
    let courses = repository::fetch_courses(&state.db).await?;
    Ok(Json(courses))
}

async fn import_course(
    State(state): State<AppState>,
    Json(req): Json<ImportCourseRequest>,
) -> Result<(StatusCode, Json<ImportStats>), AppError> {
    let service = ImportService::new(state.db.clone(), state.youtube.clone());
    let stats = service.import(req).await?;
    Ok((StatusCode::CREATED, Json(stats)))
}

async fn get_course(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<CourseView>, AppError> {
    let service = ProgressService::new(state.db.clone(), state.badges.clone());
    let view = service.course_view(&user.id, &id).await?;
    Ok(Json(view))
}

async fn get_course_progress(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<CourseProgress>, AppError> {
    let service = ProgressService::new(state.db.clone(), state.badges.clone());
    let progress = service.course_progress(&user.id, &id).await?;
    Ok(Json(progress))
}

async fn refresh_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RefreshStats>, AppError> {
    let service = ImportService::new(state.db.clone(), state.youtube.clone());
    let stats = service.refresh(&id).await?;
    Ok(Json(stats))
}

async fn archive_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let ok = repository::archive_course(&state.db, &id).await?;
    if ok {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn complete_lesson(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<CompletionResponse>, AppError> {
    let service = ProgressService::new(state.db.clone(), state.badges.clone());
    let completion = service.complete_lesson(&user.id, id).await?;
    Ok(Json(completion))
}

async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Dashboard>, AppError> {
    let service = ProgressService::new(state.db.clone(), state.badges.clone());
    let dashboard = service.dashboard(&user.id).await?;
    Ok(Json(dashboard))
}

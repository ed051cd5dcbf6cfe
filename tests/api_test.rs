mod common;

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{FakeYouTube, test_app};
use tubecourse::db::repository;
use tubecourse::models::NewCourse;
use tubecourse::youtube::NoopYouTubeClient;

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.expect("request failed");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn get(uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(user) = user {
        builder = builder.header("X-User-Id", user);
    }
    builder.body(Body::empty()).expect("valid request")
}

fn post_json(uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(user) = user {
        builder = builder.header("X-User-Id", user);
    }
    builder.body(Body::from(body.to_string())).expect("valid request")
}

async fn create_user(app: &Router) -> String {
    let (status, body) = send(app, post_json("/users", None, json!({ "name": "Aoi" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().expect("user id").to_string()
}

async fn import(app: &Router, playlist: &str) -> String {
    let (status, body) = send(
        app,
        post_json("/courses/import", None, json!({ "playlist": playlist })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["courseId"].as_str().expect("course id").to_string()
}

fn lesson_flags(course: &Value) -> Vec<(bool, bool)> {
    course["modules"]
        .as_array()
        .expect("modules")
        .iter()
        .flat_map(|m| m["lessons"].as_array().expect("lessons").iter())
        .map(|l| {
            (
                l["completed"].as_bool().expect("completed"),
                l["unlocked"].as_bool().expect("unlocked"),
            )
        })
        .collect()
}

fn lesson_ids(course: &Value) -> Vec<i64> {
    course["modules"]
        .as_array()
        .expect("modules")
        .iter()
        .flat_map(|m| m["lessons"].as_array().expect("lessons").iter())
        .map(|l| l["id"].as_i64().expect("lesson id"))
        .collect()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = test_app(Arc::new(FakeYouTube::new(&["a"]))).await;
    let (status, _) = send(&app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_import_watch_and_complete_flow() {
    let (app, _) = test_app(Arc::new(FakeYouTube::new(&["v1", "v2", "v3"]))).await;
    let user = create_user(&app).await;
    let course_id = import(&app, "https://www.youtube.com/playlist?list=PLfake").await;

    let (status, courses) = send(&app, get("/courses", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(courses.as_array().map(Vec::len), Some(1));

    let uri = format!("/courses/{}", course_id);
    let (status, course) = send(&app, get(&uri, Some(user.as_str()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(course["course"]["title"], "Fake Playlist");
    assert_eq!(
        lesson_flags(&course),
        vec![(false, true), (false, false), (false, false)]
    );
    assert_eq!(course["modules"][0]["lessons"][0]["youtubeVideoId"], "v1");
    let ids = lesson_ids(&course);

    let (status, done) = send(
        &app,
        post_json(&format!("/lessons/{}/complete", ids[0]), Some(user.as_str()), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["newlyCompleted"], true);

    let (_, course) = send(&app, get(&uri, Some(user.as_str()))).await;
    assert_eq!(
        lesson_flags(&course),
        vec![(true, true), (false, true), (false, false)]
    );
    assert_eq!(course["progress"]["completedCount"], 1);
    assert_eq!(course["progress"]["totalCount"], 3);
    assert_eq!(course["progress"]["percentage"], 33);
    assert_eq!(course["badge"], "Explorer");

    let (status, _) = send(
        &app,
        post_json(&format!("/lessons/{}/complete", ids[2]), Some(user.as_str()), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, again) = send(
        &app,
        post_json(&format!("/lessons/{}/complete", ids[0]), Some(user.as_str()), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["newlyCompleted"], false);
    assert_eq!(again["completedAt"], done["completedAt"]);

    let (status, progress) = send(&app, get(&format!("{}/progress", uri), Some(user.as_str()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(progress, json!({ "completedCount": 1, "totalCount": 3, "percentage": 33 }));

    let (status, dashboard) = send(&app, get("/dashboard", Some(user.as_str()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["streak"], 1);
    assert_eq!(dashboard["completedLessons"], 1);
    assert_eq!(dashboard["courses"][0]["courseId"], course_id.as_str());
    assert_eq!(dashboard["courses"][0]["badge"], "Explorer");
}

#[tokio::test]
async fn test_progress_is_per_user() {
    let (app, _) = test_app(Arc::new(FakeYouTube::new(&["v1", "v2"]))).await;
    let alice = create_user(&app).await;
    let bob = create_user(&app).await;
    let course_id = import(&app, "PLfake").await;
    let uri = format!("/courses/{}", course_id);

    let (_, course) = send(&app, get(&uri, Some(alice.as_str()))).await;
    let ids = lesson_ids(&course);
    send(
        &app,
        post_json(&format!("/lessons/{}/complete", ids[0]), Some(alice.as_str()), json!({})),
    )
    .await;

    let (_, course) = send(&app, get(&uri, Some(bob.as_str()))).await;
    assert_eq!(lesson_flags(&course), vec![(false, true), (false, false)]);
}

#[tokio::test]
async fn test_requests_without_known_user_are_rejected() {
    let (app, _) = test_app(Arc::new(FakeYouTube::new(&["v1"]))).await;

    let (status, _) = send(&app, get("/dashboard", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, get("/dashboard", Some("no-such-user"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "401 Unauthorized");
}

#[tokio::test]
async fn test_import_validation() {
    let (app, _) = test_app(Arc::new(FakeYouTube::new(&["v1"]))).await;

    let (status, _) = send(
        &app,
        post_json("/courses/import", None, json!({ "playlist": "https://www.youtube.com/watch?v=x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        post_json(
            "/courses/import",
            None,
            json!({ "playlist": "PLfake", "youtube_video_id": "smuggled" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &app,
        post_json("/courses/import", None, json!({ "playlist": "PLfake", "videosPerModule": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    import(&app, "PLfake").await;
    let (status, _) = send(
        &app,
        post_json("/courses/import", None, json!({ "playlist": "PLfake" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_import_splits_modules_that_unlock_independently() {
    let (app, _) = test_app(Arc::new(FakeYouTube::new(&["a", "b", "c", "d"]))).await;
    let user = create_user(&app).await;

    let (status, stats) = send(
        &app,
        post_json("/courses/import", None, json!({ "playlist": "PLfake", "videosPerModule": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(stats["modulesCreated"], 2);
    assert_eq!(stats["lessonsCreated"], 4);

    let uri = format!("/courses/{}", stats["courseId"].as_str().expect("course id"));
    let (_, course) = send(&app, get(&uri, Some(user.as_str()))).await;
    assert_eq!(course["modules"][1]["title"], "Module 2");
    assert_eq!(course["modules"][1]["orderIndex"], 2);
    assert_eq!(
        lesson_flags(&course),
        vec![(false, true), (false, false), (false, true), (false, false)]
    );
}

#[tokio::test]
async fn test_course_without_modules_renders_empty() {
    let (app, state) = test_app(Arc::new(FakeYouTube::new(&["a"]))).await;
    let user = create_user(&app).await;

    let course = repository::insert_course_tree(
        &state.db,
        NewCourse {
            title: "Empty".to_string(),
            description: String::new(),
            playlist_id: "PLempty".to_string(),
        },
        vec![],
    )
    .await
    .expect("Failed to insert course");

    let (status, body) = send(&app, get(&format!("/courses/{}", course.id), Some(user.as_str()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["modules"], json!([]));
    assert_eq!(body["progress"]["percentage"], 0);
    assert_eq!(body["badge"], "Novice");
}

#[tokio::test]
async fn test_refresh_appends_new_videos() {
    let youtube = Arc::new(FakeYouTube::new(&["v1", "v2"]));
    let (app, _) = test_app(youtube.clone()).await;
    let user = create_user(&app).await;
    let course_id = import(&app, "PLfake").await;
    let uri = format!("/courses/{}", course_id);

    let (_, course) = send(&app, get(&uri, Some(user.as_str()))).await;
    let ids = lesson_ids(&course);
    for id in &ids {
        send(
            &app,
            post_json(&format!("/lessons/{}/complete", id), Some(user.as_str()), json!({})),
        )
        .await;
    }

    youtube.set_videos(&["v1", "v2", "v3"]);
    let (status, stats) = send(
        &app,
        post_json(&format!("/courses/{}/refresh", course_id), None, json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["lessonsAdded"], 1);

    let (_, course) = send(&app, get(&uri, Some(user.as_str()))).await;
    assert_eq!(
        lesson_flags(&course),
        vec![(true, true), (true, true), (false, true)]
    );
    assert_eq!(course["modules"][0]["lessons"][2]["position"], 3);
}

#[tokio::test]
async fn test_archive_course() {
    let (app, _) = test_app(Arc::new(FakeYouTube::new(&["v1"]))).await;
    let course_id = import(&app, "PLfake").await;

    let request = Request::builder()
        .method("PATCH")
        .uri(format!("/courses/{}/archive", course_id))
        .body(Body::empty())
        .expect("valid request");
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, courses) = send(&app, get("/courses", None)).await;
    assert_eq!(courses, json!([]));

    // Archived playlists can be imported again.
    import(&app, "PLfake").await;
}

#[tokio::test]
async fn test_import_without_api_key_is_unavailable() {
    let (app, _) = test_app(Arc::new(NoopYouTubeClient)).await;

    let (status, _) = send(
        &app,
        post_json("/courses/import", None, json!({ "playlist": "PLfake" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

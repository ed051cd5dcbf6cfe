use dotenvy::dotenv;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::env;

const MAX_PAGES: usize = 100;

fn is_dry_run() -> bool {
    !std::env::args().any(|a| a == "--apply")
}

fn videos_per_module() -> Option<usize> {
    let args: Vec<String> = std::env::args().collect();
    args.iter()
        .position(|a| a == "--per-module")
        .and_then(|i| args.get(i + 1))
        .and_then(|n| n.parse().ok())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemsResponse {
    items: Vec<Item>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportStats {
    course_id: String,
    title: String,
    modules_created: usize,
    lessons_created: usize,
    videos_skipped: usize,
}

#[derive(Debug, Deserialize)]
struct Item {
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    resource_id: Option<ResourceId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let playlist_id = std::env::args()
        .skip(1)
        .find(|a| !a.starts_with("--") && a.parse::<usize>().is_err())
        .ok_or("usage: playlist_preview <playlist-id> [--per-module N] [--apply]")?;

    let api_key = env::var("YOUTUBE_API_KEY")?;
    let backend_url =
        env::var("BACKEND_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());

    let client = Client::new();

    let items = fetch_all_items(&client, &api_key, &playlist_id).await?;

    let mut playable = 0;
    for item in &items {
        let title = item.snippet.title.as_str();
        let video_id = video_id(&item.snippet);

        match video_id {
            Some(id) if !is_unavailable(title) => {
                playable += 1;
                println!("{:>4}. {} [{}]", playable, title, id);
            }
            _ => println!("   -  (skipped) {}", title),
        }
    }

    println!("Playable videos: {} / {}", playable, items.len());

    if is_dry_run() {
        println!("[DRY RUN] Would import {} into {}", playlist_id, backend_url);
        return Ok(());
    }

    let mut body = serde_json::json!({ "playlist": playlist_id });
    if let Some(n) = videos_per_module() {
        body["videosPerModule"] = serde_json::json!(n);
    }

    let stats: ImportStats = client
        .post(format!("{}/courses/import", backend_url))
        .json(&body)
        .send()
        .await?
        .error_for_status()? // 失敗したら即エラー
        .json()
        .await?;

    println!(
        "Imported {} as {}: {} modules, {} lessons, {} skipped",
        stats.title, stats.course_id, stats.modules_created, stats.lessons_created, stats.videos_skipped
    );

    Ok(())
}

async fn fetch_all_items(
    client: &Client,
    api_key: &str,
    playlist_id: &str,
) -> Result<Vec<Item>, Box<dyn std::error::Error>> {
    let mut items = Vec::new();
    let mut seen_tokens = HashSet::new();
    let mut page_token: Option<String> = None;

    for _ in 0..MAX_PAGES {
        let mut query = vec![
            ("part", "snippet".to_string()),
            ("maxResults", "50".to_string()),
            ("playlistId", playlist_id.to_string()),
            ("key", api_key.to_string()),
        ];
        if let Some(t) = &page_token {
            query.push(("pageToken", t.clone()));
        }

        let data: ItemsResponse = client
            .get("https://www.googleapis.com/youtube/v3/playlistItems")
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        items.extend(data.items);

        match data.next_page_token {
            Some(t) if seen_tokens.insert(t.clone()) => page_token = Some(t),
            Some(t) => {
                eprintln!("repeated page token {}; stopping", t);
                break;
            }
            None => break,
        }
    }

    Ok(items)
}

fn video_id(snippet: &Snippet) -> Option<&str> {
    snippet
        .resource_id
        .as_ref()
        .and_then(|r| r.video_id.as_deref())
        .filter(|v| !v.is_empty())
}

fn is_unavailable(title: &str) -> bool {
    title == "Private video" || title == "Deleted video"
}

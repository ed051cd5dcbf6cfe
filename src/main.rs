use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tubecourse::api::{cors_layer, router};
use tubecourse::config::AppConfig;
use tubecourse::db;
use tubecourse::services::RefreshScheduler;
use tubecourse::state::AppState;
use tubecourse::youtube::{NoopYouTubeClient, YouTubeClient, YouTubeHttpClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "tubecourse=debug,tower_http=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let pool = db::connect(&config.database_url, 5).await?;
    db::migrate(&pool).await?;

    let youtube: Arc<dyn YouTubeClient> = match config.youtube.clone() {
        Some(yt) => Arc::new(YouTubeHttpClient::new(yt)?),
        None => {
            warn!("YOUTUBE_API_KEY is not set; playlist import is disabled");
            Arc::new(NoopYouTubeClient)
        }
    };

    if let Some(secs) = config.refresh_interval_secs {
        let scheduler = RefreshScheduler::new(pool.clone(), youtube.clone(), secs);
        tokio::spawn(scheduler.start());
    }

    let state = AppState {
        db: pool.clone(),
        youtube,
        badges: Arc::new(config.badge_policy.clone()),
    };

    let app = router(state).layer(cors_layer(&config.cors_allowed_origins));

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

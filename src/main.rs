use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::info;

use codepicks::aggregator::Aggregator;
use codepicks::config::Config;
use codepicks::routes::{self, AppState};
use codepicks::snapshot::{start_background_refresh, SnapshotStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    codepicks::init_logging();

    // Load configuration
    let config_path =
        std::env::var("CODEPICKS_CONFIG").unwrap_or_else(|_| "codepicks.toml".to_string());
    let config = Config::load(&config_path)?.with_env_overrides();
    info!(
        "Loaded {} sources from {}",
        config.sources.len(),
        config_path
    );
    if config.qiita_token.is_none() {
        info!("QIITA_TOKEN is not set, Qiita will be skipped in search");
    }

    let aggregator = Arc::new(Aggregator::from_config(&config)?);
    let store = SnapshotStore::new(config.snapshot_path.clone());

    if config.serve_snapshot && config.refresh_interval > 0 {
        let bg_aggregator = aggregator.clone();
        let bg_store = store.clone();
        let refresh_interval = config.refresh_interval;
        tokio::spawn(async move {
            start_background_refresh(bg_aggregator, bg_store, refresh_interval).await;
        });
    }

    let state = Arc::new(AppState {
        aggregator,
        snapshot: config.serve_snapshot.then_some(store),
    });

    let app = routes::router(state).layer(TraceLayer::new_for_http());

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Server starting on http://{}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}

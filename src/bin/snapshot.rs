//! One-shot batch job: aggregate the listing sources and overwrite the
//! snapshot file served by `GET /articles`.

use tracing::info;

use codepicks::aggregator::Aggregator;
use codepicks::config::Config;
use codepicks::snapshot::{refresh_snapshot, SnapshotStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    codepicks::init_logging();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("CODEPICKS_CONFIG").ok())
        .unwrap_or_else(|| "codepicks.toml".to_string());
    let config = Config::load(&config_path)?.with_env_overrides();

    let aggregator = Aggregator::from_config(&config)?;
    let store = SnapshotStore::new(config.snapshot_path.clone());

    let count = refresh_snapshot(&aggregator, &store).await?;
    info!(
        count,
        path = %store.path().display(),
        "Saved snapshot from {} sources",
        aggregator.sources().len()
    );

    Ok(())
}

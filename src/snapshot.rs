use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::NamedTempFile;
use tracing::{error, info, warn};

use crate::aggregator::Aggregator;
use crate::article::Article;
use crate::error::SnapshotError;

/// A single JSON file holding the last aggregated listing.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the snapshot atomically: the new contents go to a temp file in
    /// the same directory which is then renamed over the old one.
    pub fn write(&self, articles: &[Article]) -> Result<(), SnapshotError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let json = serde_json::to_string_pretty(articles)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;

        info!(path = %self.path.display(), count = articles.len(), "Wrote snapshot");
        Ok(())
    }

    /// The snapshot file exactly as stored, after checking it holds articles.
    pub async fn read_raw(&self) -> Result<String, SnapshotError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        serde_json::from_str::<Vec<Article>>(&raw)?;
        Ok(raw)
    }

    pub async fn read(&self) -> Result<Vec<Article>, SnapshotError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Aggregate the listing sources and overwrite the snapshot. Returns the
/// number of articles written.
pub async fn refresh_snapshot(
    aggregator: &Aggregator,
    store: &SnapshotStore,
) -> Result<usize, SnapshotError> {
    let articles = aggregator.listing().await;
    if articles.is_empty() {
        warn!("Listing came back empty, writing an empty snapshot");
    }
    let count = articles.len();

    // File IO and fsync stay off the async workers
    let store = store.clone();
    tokio::task::spawn_blocking(move || store.write(&articles)).await??;
    Ok(count)
}

/// Sleep between background refreshes. Absurd intervals saturate instead of
/// overflowing.
pub fn refresh_period(interval_minutes: u64) -> Duration {
    Duration::from_secs(interval_minutes.saturating_mul(60))
}

pub async fn start_background_refresh(
    aggregator: Arc<Aggregator>,
    store: SnapshotStore,
    interval_minutes: u64,
) {
    let interval = refresh_period(interval_minutes);

    info!("Starting initial snapshot refresh");
    if let Err(e) = refresh_snapshot(&aggregator, &store).await {
        error!("Initial snapshot refresh failed: {}", e);
    }

    loop {
        tokio::time::sleep(interval).await;
        info!("Starting scheduled snapshot refresh");
        if let Err(e) = refresh_snapshot(&aggregator, &store).await {
            error!("Scheduled snapshot refresh failed: {}", e);
        }
    }
}

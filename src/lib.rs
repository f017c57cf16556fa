//! CodePicks - a tech article aggregator
//!
//! Pulls article feeds from Qiita, Zenn and Hatena, merges them newest first
//! and serves them as JSON, with tag search over Qiita and Zenn. The listing
//! can also be written to a snapshot file by a batch job and served from there.

pub mod aggregator;
pub mod article;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod routes;
pub mod snapshot;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging for a binary, honoring `RUST_LOG`.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "codepicks=info,snapshot=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

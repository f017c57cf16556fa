use thiserror::Error;

use crate::article::Site;

/// Failure of a single source. Callers on the aggregation path turn this into
/// an empty result; it is never sent to a client.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} from {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
    #[error("failed to parse feed: {0}")]
    Feed(#[from] feed_rs::parser::ParseFeedError),
    #[error("invalid source url {0}")]
    InvalidUrl(String),
    #[error("no API token configured for {0}")]
    MissingToken(Site),
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot is not valid article JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to replace snapshot: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("snapshot writer task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("Tag is required")]
    MissingTag,
}

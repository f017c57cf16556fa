use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::article::Site;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
    /// Serve `GET /articles` from the snapshot file instead of fetching live
    #[serde(default)]
    pub serve_snapshot: bool,
    /// Background snapshot refresh interval in minutes, 0 disables it
    #[serde(default)]
    pub refresh_interval: u64,
    /// Entries kept per source on the listing path, 0 keeps everything
    #[serde(default = "default_items_per_source")]
    pub items_per_source: usize,
    #[serde(default)]
    pub qiita_token: Option<String>,
    #[serde(default)]
    pub search: SearchConfig,
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_qiita_api_base")]
    pub qiita_api_base: String,
    #[serde(default = "default_zenn_base")]
    pub zenn_base: String,
    #[serde(default = "default_per_page")]
    pub per_page: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            qiita_api_base: default_qiita_api_base(),
            zenn_base: default_zenn_base(),
            per_page: default_per_page(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SourceConfig {
    pub site: Site,
    pub url: String,
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("data/articles.json")
}

fn default_items_per_source() -> usize {
    10
}

fn default_qiita_api_base() -> String {
    "https://qiita.com".to_string()
}

fn default_zenn_base() -> String {
    "https://zenn.dev".to_string()
}

fn default_per_page() -> usize {
    12
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.search.per_page == 0 {
            anyhow::bail!("search.per_page must be at least 1");
        }
        Ok(config)
    }

    /// Apply `QIITA_TOKEN` from the environment, which wins over the file.
    pub fn with_env_overrides(self) -> Self {
        self.with_token_override(std::env::var("QIITA_TOKEN").ok())
    }

    fn with_token_override(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.qiita_token = Some(token);
        }
        self
    }

    /// Per-source entry limit for the listing path.
    pub fn listing_limit(&self) -> Option<usize> {
        match self.items_per_source {
            0 => None,
            n => Some(n),
        }
    }
}

use std::time::Duration;

use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use feed_rs::parser;
use reqwest::{header, Client, Url};
use serde::Deserialize;
use tracing::{error, info};

use crate::article::{parse_pub_date, Article, Site};
use crate::config::SearchConfig;
use crate::error::FetchError;

/// One place articles can be pulled from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// An RSS/Atom/RDF feed at a fixed URL.
    Feed { site: Site, url: String },
    /// Qiita's `/api/v2/tags/{tag}/items` endpoint, needs a bearer token.
    QiitaTagItems { tag: String },
    /// Zenn's `/topics/{tag}/feed`.
    ZennTopicFeed { tag: String },
}

impl Source {
    pub fn site(&self) -> Site {
        match self {
            Source::Feed { site, .. } => *site,
            Source::QiitaTagItems { .. } => Site::Qiita,
            Source::ZennTopicFeed { .. } => Site::Zenn,
        }
    }
}

#[derive(Debug, Deserialize)]
struct QiitaItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    created_at: Option<String>,
}

pub struct Fetcher {
    client: Client,
    qiita_api_base: String,
    zenn_base: String,
    qiita_token: Option<String>,
}

impl Fetcher {
    pub fn new(search: &SearchConfig, qiita_token: Option<String>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("CodePicks/1.0 (Feed Aggregator)")
            .build()?;

        Ok(Self {
            client,
            qiita_api_base: search.qiita_api_base.clone(),
            zenn_base: search.zenn_base.clone(),
            qiita_token,
        })
    }

    /// Fetch a source, logging and discarding any failure.
    pub async fn fetch_or_empty(&self, source: &Source, limit: Option<usize>) -> Vec<Article> {
        match self.fetch(source, limit).await {
            Ok(articles) => {
                info!(site = %source.site(), count = articles.len(), "Fetched source");
                articles
            }
            Err(e) => {
                error!(site = %source.site(), ?source, error = %e, "Failed to fetch source");
                Vec::new()
            }
        }
    }

    pub async fn fetch(
        &self,
        source: &Source,
        limit: Option<usize>,
    ) -> Result<Vec<Article>, FetchError> {
        match source {
            Source::Feed { site, url } => self.fetch_feed(*site, url, limit).await,
            Source::QiitaTagItems { tag } => self.fetch_qiita_tag(tag, limit).await,
            Source::ZennTopicFeed { tag } => {
                let url = self.zenn_topic_url(tag)?;
                self.fetch_feed(Site::Zenn, url.as_str(), limit).await
            }
        }
    }

    async fn fetch_feed(
        &self,
        site: Site,
        url: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Article>, FetchError> {
        info!(%site, %url, "Fetching feed");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                url: url.to_string(),
            });
        }
        let bytes = response.bytes().await?;
        let parsed = parser::parse(&bytes[..])?;

        let fetched_at = Utc::now();
        Ok(parsed
            .entries
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|entry| Self::entry_to_article(site, entry, fetched_at))
            .collect())
    }

    async fn fetch_qiita_tag(
        &self,
        tag: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Article>, FetchError> {
        let token = self
            .qiita_token
            .as_deref()
            .ok_or(FetchError::MissingToken(Site::Qiita))?;
        let url = self.qiita_tag_items_url(tag)?;
        info!(%tag, %url, "Fetching Qiita tag items");

        let response = self
            .client
            .get(url.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .bearer_auth(token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                url: url.to_string(),
            });
        }
        let items: Vec<QiitaItem> = response.json().await?;

        let fetched_at = Utc::now();
        Ok(items
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|item| Self::qiita_item_to_article(item, fetched_at))
            .collect())
    }

    pub fn qiita_tag_items_url(&self, tag: &str) -> Result<Url, FetchError> {
        Self::join_segments(&self.qiita_api_base, &["api", "v2", "tags", tag, "items"])
    }

    pub fn zenn_topic_url(&self, tag: &str) -> Result<Url, FetchError> {
        Self::join_segments(&self.zenn_base, &["topics", tag, "feed"])
    }

    /// Append percent-encoded path segments to a base URL.
    fn join_segments(base: &str, segments: &[&str]) -> Result<Url, FetchError> {
        let invalid = || FetchError::InvalidUrl(base.to_string());
        let mut url = Url::parse(base).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn entry_to_article(site: Site, entry: &Entry, fetched_at: DateTime<Utc>) -> Article {
        let title = entry
            .title
            .as_ref()
            .map(|t| t.content.clone())
            .unwrap_or_default();

        let link = entry
            .links
            .first()
            .map(|l| l.href.clone())
            .unwrap_or_default();

        let published = entry.published.or(entry.updated).unwrap_or(fetched_at);

        Article::new(site, title, link, published)
    }

    fn qiita_item_to_article(item: QiitaItem, fetched_at: DateTime<Utc>) -> Article {
        let published = item
            .created_at
            .as_deref()
            .and_then(parse_pub_date)
            .unwrap_or(fetched_at);

        Article::new(Site::Qiita, item.title, item.url, published)
    }
}

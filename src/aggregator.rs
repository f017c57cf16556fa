//! Concurrent fan-out over sources, merge and newest-first ordering.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::article::{sort_newest_first, Article, Pagination};
use crate::config::Config;
use crate::error::{AggregateError, FetchError};
use crate::fetcher::{Fetcher, Source};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub articles: Vec<Article>,
    pub pagination: Pagination,
}

pub struct Aggregator {
    fetcher: Fetcher,
    sources: Vec<Source>,
    listing_limit: Option<usize>,
    per_page: usize,
}

impl Aggregator {
    pub fn new(
        fetcher: Fetcher,
        sources: Vec<Source>,
        listing_limit: Option<usize>,
        per_page: usize,
    ) -> Self {
        Self {
            fetcher,
            sources,
            listing_limit,
            per_page,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let fetcher = Fetcher::new(&config.search, config.qiita_token.clone())?;
        let sources = config
            .sources
            .iter()
            .map(|s| Source::Feed {
                site: s.site,
                url: s.url.clone(),
            })
            .collect();

        Ok(Self::new(
            fetcher,
            sources,
            config.listing_limit(),
            config.search.per_page,
        ))
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Fetch every source concurrently and merge them newest first. A failed
    /// source contributes nothing; ties keep source order.
    pub async fn aggregate(&self, sources: &[Source], limit: Option<usize>) -> Vec<Article> {
        let results = join_all(
            sources
                .iter()
                .map(|source| self.fetcher.fetch_or_empty(source, limit)),
        )
        .await;

        let mut articles: Vec<Article> = results.into_iter().flatten().collect();
        sort_newest_first(&mut articles);
        articles
    }

    /// Full listing over the configured sources.
    pub async fn listing(&self) -> Vec<Article> {
        let articles = self.aggregate(&self.sources, self.listing_limit).await;
        info!(
            sources = self.sources.len(),
            count = articles.len(),
            "Aggregated listing"
        );
        articles
    }

    /// Search Qiita and Zenn for a tag and return one page of the merged
    /// results. A missing or blank tag fails before anything is fetched.
    pub async fn search(
        &self,
        tag: Option<&str>,
        page: Option<usize>,
    ) -> Result<SearchPage, AggregateError> {
        let tag = tag
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AggregateError::MissingTag)?;

        let sources = [
            Source::QiitaTagItems {
                tag: tag.to_string(),
            },
            Source::ZennTopicFeed {
                tag: tag.to_string(),
            },
        ];
        let articles = self.aggregate(&sources, None).await;
        let result = paginate(articles, page.unwrap_or(1), self.per_page);

        info!(
            %tag,
            total = result.pagination.total,
            page = result.pagination.page,
            "Search complete"
        );
        Ok(result)
    }
}

/// Slice `[(page-1)*per_page, page*per_page)` out of an already sorted list.
/// Page 0 is treated as page 1; pages past the end are empty.
pub fn paginate(articles: Vec<Article>, page: usize, per_page: usize) -> SearchPage {
    let page = page.max(1);
    let pagination = Pagination::new(articles.len(), page, per_page);
    let start = (page - 1).saturating_mul(per_page);

    let articles = articles.into_iter().skip(start).take(per_page).collect();

    SearchPage {
        articles,
        pagination,
    }
}

use std::cmp::Reverse;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Site {
    Qiita,
    Zenn,
    Hatena,
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Site::Qiita => "Qiita",
            Site::Zenn => "Zenn",
            Site::Hatena => "Hatena",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub site: Site,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(rename = "pubDate", default)]
    pub pub_date: String,
}

impl Article {
    pub fn new(site: Site, title: String, link: String, published: DateTime<Utc>) -> Self {
        Self {
            site,
            title,
            link,
            pub_date: published.to_rfc3339(),
        }
    }

    pub fn published(&self) -> Option<DateTime<Utc>> {
        parse_pub_date(&self.pub_date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

impl Pagination {
    pub fn new(total: usize, page: usize, per_page: usize) -> Self {
        let total_pages = if per_page == 0 {
            0
        } else {
            total.div_ceil(per_page)
        };
        Self {
            total,
            page,
            per_page,
            total_pages,
        }
    }

    /// Pagination for an unpaged listing, where everything is on page one.
    pub fn single_page(total: usize) -> Self {
        Self {
            total,
            page: 1,
            per_page: total,
            total_pages: 1,
        }
    }
}

/// Parse a `pubDate` as RFC 3339, RFC 2822 or a bare `YYYY-MM-DD`.
pub fn parse_pub_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Newest first. The sort is stable, so equal dates keep their input order;
/// undated articles go last.
pub fn sort_newest_first(articles: &mut [Article]) {
    articles.sort_by_cached_key(|a| Reverse(a.published()));
}

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::aggregator::{Aggregator, SearchPage};
use crate::error::{AggregateError, SnapshotError};
use crate::snapshot::SnapshotStore;

pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    /// When set, `GET /articles` serves this file instead of fetching live
    pub snapshot: Option<SnapshotStore>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/articles", get(articles))
        .route("/search", get(search))
        .route("/health", get(health))
        .with_state(state)
}

// Custom error type
#[derive(Debug)]
pub enum AppError {
    InvalidRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::InvalidRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            AppError::Internal(err) => {
                error!(error = %err, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Failed to fetch articles" })),
                )
                    .into_response()
            }
        }
    }
}

impl From<AggregateError> for AppError {
    fn from(err: AggregateError) -> Self {
        AppError::InvalidRequest(err.to_string())
    }
}

impl From<SnapshotError> for AppError {
    fn from(err: SnapshotError) -> Self {
        AppError::Internal(err.into())
    }
}

// Route handlers
pub async fn articles(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    match &state.snapshot {
        Some(store) => {
            let body = store.read_raw().await?;
            Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
        }
        None => Ok(Json(state.aggregator.listing().await).into_response()),
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
}

impl SearchQuery {
    pub fn tag(&self) -> Result<&str, AggregateError> {
        self.tag
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AggregateError::MissingTag)
    }

    pub fn page(&self) -> Result<Option<usize>, AppError> {
        match self.page.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| AppError::InvalidRequest("Invalid page".to_string())),
        }
    }
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchPage>, AppError> {
    let tag = query.tag()?;
    let page = query.page()?;
    let result = state.aggregator.search(Some(tag), page).await?;
    Ok(Json(result))
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::{Article, Site};
    use crate::config::SearchConfig;
    use crate::fetcher::{Fetcher, Source};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ZENN_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <rss version="2.0">
            <channel>
                <title>Zenn</title>
                <link>https://zenn.dev</link>
                <description>Zenn feed</description>
                <item>
                    <title>Older</title>
                    <link>https://zenn.dev/older</link>
                    <pubDate>Wed, 01 Jan 2025 00:00:00 GMT</pubDate>
                </item>
                <item>
                    <title>Newer</title>
                    <link>https://zenn.dev/newer</link>
                    <pubDate>Fri, 03 Jan 2025 00:00:00 GMT</pubDate>
                </item>
            </channel>
        </rss>
    "#;

    fn create_aggregator(base: &str, sources: Vec<Source>) -> Arc<Aggregator> {
        let search = SearchConfig {
            qiita_api_base: base.to_string(),
            zenn_base: base.to_string(),
            per_page: 12,
        };
        let fetcher = Fetcher::new(&search, Some("token".to_string())).unwrap();
        Arc::new(Aggregator::new(fetcher, sources, Some(10), 12))
    }

    fn create_test_app(base: &str, sources: Vec<Source>, snapshot: Option<SnapshotStore>) -> Router {
        router(Arc::new(AppState {
            aggregator: create_aggregator(base, sources),
            snapshot,
        }))
    }

    async fn send_get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    mod health_tests {
        use super::*;

        #[tokio::test]
        async fn test_health_endpoint() {
            let app = create_test_app("http://127.0.0.1:1", Vec::new(), None);
            let (status, body) = send_get(app, "/health").await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, "OK");
        }
    }

    mod articles_tests {
        use super::*;

        #[tokio::test]
        async fn test_live_articles_sorted() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/feed"))
                .respond_with(ResponseTemplate::new(200).set_body_string(ZENN_RSS))
                .mount(&server)
                .await;

            let sources = vec![Source::Feed {
                site: Site::Zenn,
                url: format!("{}/feed", server.uri()),
            }];
            let app = create_test_app(&server.uri(), sources, None);

            let (status, body) = send_get(app, "/articles").await;
            assert_eq!(status, StatusCode::OK);

            let articles: Vec<Article> = serde_json::from_str(&body).unwrap();
            assert_eq!(articles.len(), 2);
            assert_eq!(articles[0].title, "Newer");
            assert_eq!(articles[1].title, "Older");
        }

        #[tokio::test]
        async fn test_live_articles_all_sources_failing_is_empty_list() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(500))
                .mount(&server)
                .await;

            let sources = vec![Source::Feed {
                site: Site::Hatena,
                url: format!("{}/hotentry/it.rss", server.uri()),
            }];
            let app = create_test_app(&server.uri(), sources, None);

            let (status, body) = send_get(app, "/articles").await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, "[]");
        }

        #[tokio::test]
        async fn test_snapshot_served_verbatim() {
            let dir = TempDir::new().unwrap();
            let store = SnapshotStore::new(dir.path().join("articles.json"));
            store
                .write(&[Article {
                    site: Site::Qiita,
                    title: "Cached".to_string(),
                    link: "https://qiita.com/x".to_string(),
                    pub_date: "2025-01-01T00:00:00+00:00".to_string(),
                }])
                .unwrap();
            let on_disk = std::fs::read_to_string(store.path()).unwrap();

            let app = create_test_app("http://127.0.0.1:1", Vec::new(), Some(store));
            let (status, body) = send_get(app, "/articles").await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, on_disk);
        }

        #[tokio::test]
        async fn test_missing_snapshot_is_500() {
            let dir = TempDir::new().unwrap();
            let store = SnapshotStore::new(dir.path().join("missing.json"));

            let app = create_test_app("http://127.0.0.1:1", Vec::new(), Some(store));
            let (status, body) = send_get(app, "/articles").await;

            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            let json: serde_json::Value = serde_json::from_str(&body).unwrap();
            assert_eq!(json["error"], "Failed to fetch articles");
        }
    }

    mod search_tests {
        use super::*;

        #[tokio::test]
        async fn test_search_without_tag_is_400_and_fetches_nothing() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200))
                .expect(0)
                .mount(&server)
                .await;

            for uri in ["/search", "/search?page=2", "/search?tag=", "/search?tag=&page=x"] {
                let app = create_test_app(&server.uri(), Vec::new(), None);
                let (status, body) = send_get(app, uri).await;

                assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
                let json: serde_json::Value = serde_json::from_str(&body).unwrap();
                assert_eq!(json["error"], "Tag is required");
            }
        }

        #[tokio::test]
        async fn test_search_invalid_page_is_400() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200))
                .expect(0)
                .mount(&server)
                .await;

            let app = create_test_app(&server.uri(), Vec::new(), None);
            let (status, body) = send_get(app, "/search?tag=rust&page=abc").await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            let json: serde_json::Value = serde_json::from_str(&body).unwrap();
            assert_eq!(json["error"], "Invalid page");
        }

        #[tokio::test]
        async fn test_search_returns_page_and_pagination() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/api/v2/tags/rust/items"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                    {
                        "title": "Qiita post",
                        "url": "https://qiita.com/items/1",
                        "created_at": "2025-01-02T00:00:00+00:00"
                    }
                ])))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/topics/rust/feed"))
                .respond_with(ResponseTemplate::new(200).set_body_string(ZENN_RSS))
                .mount(&server)
                .await;

            let app = create_test_app(&server.uri(), Vec::new(), None);
            let (status, body) = send_get(app, "/search?tag=rust").await;
            assert_eq!(status, StatusCode::OK);

            let json: serde_json::Value = serde_json::from_str(&body).unwrap();
            assert_eq!(json["pagination"]["total"], 3);
            assert_eq!(json["pagination"]["page"], 1);
            assert_eq!(json["pagination"]["perPage"], 12);
            assert_eq!(json["pagination"]["totalPages"], 1);

            let titles: Vec<_> = json["articles"]
                .as_array()
                .unwrap()
                .iter()
                .map(|a| a["title"].as_str().unwrap().to_string())
                .collect();
            assert_eq!(titles, vec!["Newer", "Qiita post", "Older"]);
        }
    }

    mod search_query_tests {
        use super::*;

        #[test]
        fn test_empty_query() {
            let query: SearchQuery = serde_urlencoded::from_str("").unwrap();
            assert!(query.tag.is_none());
            assert_eq!(query.page().unwrap(), None);
            assert_eq!(query.tag(), Err(AggregateError::MissingTag));
        }

        #[test]
        fn test_tag_and_page() {
            let query: SearchQuery = serde_urlencoded::from_str("tag=typescript&page=3").unwrap();
            assert_eq!(query.tag(), Ok("typescript"));
            assert_eq!(query.page().unwrap(), Some(3));
        }

        #[test]
        fn test_negative_page_rejected() {
            let query: SearchQuery = serde_urlencoded::from_str("tag=a&page=-1").unwrap();
            assert!(query.page().is_err());
        }
    }
}

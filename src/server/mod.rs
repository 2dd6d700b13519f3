//! HTTP server and routing

pub mod extract;
pub mod handlers;
pub mod types;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Auth
        .route("/signup", post(handlers::signup))
        .route("/login", post(handlers::login))
        // Stock data (bearer token required)
        .route("/api/stock/quote/:symbol", get(handlers::get_quote))
        .route("/api/stock/timeseries/:symbol", get(handlers::get_timeseries))
        .route("/api/stock/search/:query", get(handlers::search_symbols))
        // News (open)
        .route("/api/news/market", get(handlers::market_news))
        .route("/api/news/search", get(handlers::search_news))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until interrupted
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(state);

    info!("Starting Markstro API server on {}", addr);
    info!("Registered routes:");
    info!("  GET  /health");
    info!("  POST /signup");
    info!("  POST /login");
    info!("  GET  /api/stock/quote/{{symbol}}");
    info!("  GET  /api/stock/timeseries/{{symbol}}");
    info!("  GET  /api/stock/search/{{query}}");
    info!("  GET  /api/news/market?category&page&page_size");
    info!("  GET  /api/news/search?q&page&page_size");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{TokenKind, TokenService};
    use crate::cache::ResponseCache;
    use crate::db::SqliteDb;
    use crate::error::{ApiError, Result};
    use crate::upstream::types::{
        DailyBar, NewsArticle, NewsResult, NormalizedQuote, NormalizedTimeSeries, SymbolMatch,
    };
    use crate::upstream::{MarketDataProvider, NewsProvider};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    /// Scripted market data provider that counts upstream calls
    struct StubMarket {
        calls: AtomicUsize,
        response: Box<dyn Fn() -> Result<NormalizedQuote> + Send + Sync>,
    }

    impl StubMarket {
        fn returning_quote(price: f64) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                response: Box::new(move || {
                    Ok(NormalizedQuote {
                        symbol: "AAPL".to_string(),
                        price,
                        change: 1.5,
                        change_percent: 1.01,
                        open: 149.0,
                        high: 151.2,
                        low: 148.5,
                        volume: 51234567,
                        previous_close: 148.5,
                        latest_trading_day: "2025-08-29".to_string(),
                    })
                }),
            }
        }

        fn rate_limited() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                response: Box::new(|| Err(ApiError::RateLimited)),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MarketDataProvider for StubMarket {
        async fn get_quote(&self, _symbol: &str) -> Result<NormalizedQuote> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.response)()
        }

        async fn get_time_series(&self, symbol: &str) -> Result<NormalizedTimeSeries> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(NormalizedTimeSeries {
                symbol: symbol.to_string(),
                data: vec![
                    DailyBar {
                        date: "2025-08-28".to_string(),
                        open: 1.0,
                        high: 2.0,
                        low: 0.5,
                        close: 1.5,
                        volume: 100,
                    },
                    DailyBar {
                        date: "2025-08-29".to_string(),
                        open: 1.5,
                        high: 2.5,
                        low: 1.0,
                        close: 2.0,
                        volume: 200,
                    },
                ],
            })
        }

        async fn search_symbols(&self, _query: &str) -> Result<Vec<SymbolMatch>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![SymbolMatch {
                symbol: "AAPL".to_string(),
                name: "Apple Inc".to_string(),
                kind: "Equity".to_string(),
                region: "United States".to_string(),
                currency: "USD".to_string(),
            }])
        }
    }

    struct StubNews;

    #[async_trait]
    impl NewsProvider for StubNews {
        async fn get_market_news(
            &self,
            _category: &str,
            _page: u32,
            _page_size: u32,
        ) -> Result<NewsResult> {
            Ok(NewsResult {
                total_results: 1,
                articles: vec![NewsArticle {
                    title: "Markets rally".to_string(),
                    description: String::new(),
                    url: String::new(),
                    url_to_image: String::new(),
                    published_at: String::new(),
                    source: "Unknown".to_string(),
                    author: "Unknown".to_string(),
                }],
                query: None,
            })
        }

        async fn search_news(
            &self,
            query: &str,
            _page: u32,
            _page_size: u32,
        ) -> Result<NewsResult> {
            Ok(NewsResult {
                total_results: 0,
                articles: vec![],
                query: Some(query.to_string()),
            })
        }
    }

    struct TestApp {
        router: Router,
        market: Arc<StubMarket>,
        tokens: Arc<TokenService>,
    }

    fn test_app_with(market: StubMarket, cache_ttl: Duration) -> TestApp {
        let market = Arc::new(market);
        let tokens = Arc::new(TokenService::new("test-secret"));
        let state = AppState::with_parts(
            Arc::new(SqliteDb::in_memory().unwrap()),
            tokens.clone(),
            market.clone(),
            Arc::new(StubNews),
            Arc::new(ResponseCache::new(cache_ttl)),
        );
        TestApp {
            router: router(state),
            market,
            tokens,
        }
    }

    fn test_app() -> TestApp {
        test_app_with(StubMarket::returning_quote(150.0), Duration::from_secs(300))
    }

    fn access_token(tokens: &TokenService) -> String {
        tokens.issue(1, "user@example.com", TokenKind::Access).unwrap()
    }

    async fn get_with_token(router: &Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder.body(Body::empty()).unwrap();

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app();
        let (status, body) = get_with_token(&app.router, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_quote_requires_auth() {
        let app = test_app();

        let (status, body) = get_with_token(&app.router, "/api/stock/quote/AAPL", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Authentication required");
        assert_eq!(app.market.call_count(), 0);
    }

    #[tokio::test]
    async fn test_foreign_secret_token_rejected_like_expired() {
        let app = test_app();

        let foreign = TokenService::new("other-secret");
        let bad_token = access_token(&foreign);
        let (status, body) =
            get_with_token(&app.router, "/api/stock/quote/AAPL", Some(&bad_token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let expired = app
            .tokens
            .issue_with_ttl(1, "user@example.com", TokenKind::Access, chrono::Duration::seconds(-5))
            .unwrap();
        let (status2, body2) =
            get_with_token(&app.router, "/api/stock/quote/AAPL", Some(&expired)).await;
        assert_eq!(status2, StatusCode::UNAUTHORIZED);

        // Same external shape for tampered and expired tokens
        assert_eq!(body, body2);
    }

    #[tokio::test]
    async fn test_refresh_token_rejected_on_protected_route() {
        let app = test_app();
        let refresh = app
            .tokens
            .issue(1, "user@example.com", TokenKind::Refresh)
            .unwrap();

        let (status, _) =
            get_with_token(&app.router, "/api/stock/quote/AAPL", Some(&refresh)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_quote_cached_within_freshness_window() {
        let app = test_app();
        let token = access_token(&app.tokens);

        let (status1, body1) =
            get_with_token(&app.router, "/api/stock/quote/AAPL", Some(&token)).await;
        assert_eq!(status1, StatusCode::OK);
        assert_eq!(body1["price"], 150.0);
        assert_eq!(app.market.call_count(), 1);

        // Second identical request is served from cache verbatim
        let (status2, body2) =
            get_with_token(&app.router, "/api/stock/quote/AAPL", Some(&token)).await;
        assert_eq!(status2, StatusCode::OK);
        assert_eq!(body1, body2);
        assert_eq!(app.market.call_count(), 1);

        // Different case maps to the same cache key
        let (_, body3) =
            get_with_token(&app.router, "/api/stock/quote/aapl", Some(&token)).await;
        assert_eq!(body1, body3);
        assert_eq!(app.market.call_count(), 1);
    }

    #[tokio::test]
    async fn test_quote_refetched_after_window() {
        let app = test_app_with(
            StubMarket::returning_quote(150.0),
            Duration::from_millis(50),
        );
        let token = access_token(&app.tokens);

        get_with_token(&app.router, "/api/stock/quote/AAPL", Some(&token)).await;
        assert_eq!(app.market.call_count(), 1);

        tokio::time::sleep(Duration::from_millis(80)).await;

        get_with_token(&app.router, "/api/stock/quote/AAPL", Some(&token)).await;
        assert_eq!(app.market.call_count(), 2);
    }

    #[tokio::test]
    async fn test_rate_limited_maps_to_429() {
        let app = test_app_with(StubMarket::rate_limited(), Duration::from_secs(300));
        let token = access_token(&app.tokens);

        let (status, body) =
            get_with_token(&app.router, "/api/stock/quote/AAPL", Some(&token)).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["detail"], "API rate limit exceeded");
    }

    #[tokio::test]
    async fn test_failed_upstream_response_is_not_cached() {
        let app = test_app_with(StubMarket::rate_limited(), Duration::from_secs(300));
        let token = access_token(&app.tokens);

        get_with_token(&app.router, "/api/stock/quote/AAPL", Some(&token)).await;
        get_with_token(&app.router, "/api/stock/quote/AAPL", Some(&token)).await;
        assert_eq!(app.market.call_count(), 2);
    }

    #[tokio::test]
    async fn test_timeseries_endpoint() {
        let app = test_app();
        let token = access_token(&app.tokens);

        let (status, body) =
            get_with_token(&app.router, "/api/stock/timeseries/MSFT", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "MSFT");

        let dates: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|bar| bar["date"].as_str().unwrap())
            .collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
    }

    #[tokio::test]
    async fn test_search_endpoint() {
        let app = test_app();
        let token = access_token(&app.tokens);

        let (status, body) =
            get_with_token(&app.router, "/api/stock/search/apple", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["symbol"], "AAPL");
        assert_eq!(body[0]["type"], "Equity");
    }

    #[tokio::test]
    async fn test_news_endpoints_are_open() {
        let app = test_app();

        let (status, body) = get_with_token(&app.router, "/api/news/market", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalResults"], 1);

        let (status, body) =
            get_with_token(&app.router, "/api/news/search?q=AAPL", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["query"], "AAPL");
    }

    #[tokio::test]
    async fn test_news_paging_bounds() {
        let app = test_app();

        let (status, _) =
            get_with_token(&app.router, "/api/news/market?page=0", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) =
            get_with_token(&app.router, "/api/news/market?page_size=101", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_signup_login_flow() {
        let app = test_app();

        let (status, body) = post_json(
            &app.router,
            "/signup",
            serde_json::json!({
                "username": "alice",
                "email": "alice@example.com",
                "password": "long enough password",
                "country": "US"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["token_type"], "bearer");
        assert_eq!(body["user"]["username"], "alice");
        assert!(body["user"].get("password_hash").is_none());

        // The issued access token works on a protected route
        let token = body["access_token"].as_str().unwrap().to_string();
        let (status, _) =
            get_with_token(&app.router, "/api/stock/quote/AAPL", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);

        // Duplicate signup conflicts
        let (status, body) = post_json(
            &app.router,
            "/signup",
            serde_json::json!({
                "username": "alice2",
                "email": "alice@example.com",
                "password": "long enough password"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["detail"], "User already exists");

        // Login succeeds with the right password
        let (status, body) = post_json(
            &app.router,
            "/login",
            serde_json::json!({
                "email": "alice@example.com",
                "password": "long enough password"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["access_token"].as_str().is_some());

        // Wrong password yields 401 and no token
        let (status, body) = post_json(
            &app.router,
            "/login",
            serde_json::json!({
                "email": "alice@example.com",
                "password": "wrong password!"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.get("access_token").is_none());
    }

    #[tokio::test]
    async fn test_malformed_json_body_returns_detail_shape() {
        let app = test_app();

        let request = Request::builder()
            .method("POST")
            .uri("/signup")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Rejection body must be the structured JSON error, not plain text
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["detail"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_malformed_query_string_returns_detail_shape() {
        let app = test_app();

        let request = Request::builder()
            .uri("/api/news/market?page=notanumber")
            .body(Body::empty())
            .unwrap();

        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["detail"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_signup_validation() {
        let app = test_app();

        let (status, _) = post_json(
            &app.router,
            "/signup",
            serde_json::json!({
                "username": "bob",
                "email": "not-an-email",
                "password": "long enough password"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post_json(
            &app.router,
            "/signup",
            serde_json::json!({
                "username": "bob",
                "email": "bob@example.com",
                "password": "short"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

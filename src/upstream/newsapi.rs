//! NewsAPI client
//!
//! Market headlines come from `/top-headlines`, topic search from
//! `/everything`. Upstream reports failure via `"status": "error"` in a 200
//! body. Articles without a usable title (empty or `"[Removed]"`) are
//! filtered out before returning.

use crate::config::DEFAULT_NEWS_API_URL;
use crate::error::{ApiError, Result};
use crate::upstream::types::{NewsArticle, NewsResult};
use crate::upstream::{NewsProvider, UPSTREAM_TIMEOUT};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Client;
use serde_json::Value;

/// NewsAPI HTTP client
pub struct NewsApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl NewsApiClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, DEFAULT_NEWS_API_URL)
    }

    /// Client pointed at a non-default endpoint (configuration or tests)
    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(UPSTREAM_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn call(&self, path: &str, params: &[(&str, String)]) -> Result<Value> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(&[("apiKey", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        let body: Value = response.json().await?;
        Ok(body)
    }
}

#[async_trait]
impl NewsProvider for NewsApiClient {
    async fn get_market_news(
        &self,
        category: &str,
        page: u32,
        page_size: u32,
    ) -> Result<NewsResult> {
        tracing::info!("Fetching market news: category={}", category);

        // Headlines from the last 7 days
        let from_date = (Utc::now() - Duration::days(7)).format("%Y-%m-%d").to_string();

        let body = self
            .call(
                "/top-headlines",
                &[
                    ("category", category.to_string()),
                    ("language", "en".to_string()),
                    ("sortBy", "publishedAt".to_string()),
                    ("from", from_date),
                    ("page", page.to_string()),
                    ("pageSize", page_size.to_string()),
                ],
            )
            .await?;

        parse_news(&body, None)
    }

    async fn search_news(&self, query: &str, page: u32, page_size: u32) -> Result<NewsResult> {
        tracing::info!("Searching news: {}", query);

        // Search covers the last 30 days
        let from_date = (Utc::now() - Duration::days(30)).format("%Y-%m-%d").to_string();

        let body = self
            .call(
                "/everything",
                &[
                    ("q", query.to_string()),
                    ("language", "en".to_string()),
                    ("sortBy", "publishedAt".to_string()),
                    ("from", from_date),
                    ("page", page.to_string()),
                    ("pageSize", page_size.to_string()),
                ],
            )
            .await?;

        parse_news(&body, Some(query))
    }
}

fn str_or(obj: &Value, key: &str, default: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => default.to_string(),
    }
}

pub(crate) fn parse_news(body: &Value, query: Option<&str>) -> Result<NewsResult> {
    if body.get("status").and_then(|v| v.as_str()) == Some("error") {
        let code = body.get("code").and_then(|v| v.as_str()).unwrap_or_default();
        if code == "rateLimited" {
            return Err(ApiError::RateLimited);
        }
        let message = body
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("News API error");
        return Err(ApiError::Upstream(message.to_string()));
    }

    let articles = body
        .get("articles")
        .and_then(|v| v.as_array())
        .map(|arr| arr.as_slice())
        .unwrap_or_default();

    let articles: Vec<NewsArticle> = articles
        .iter()
        .filter(|article| {
            // Skip articles without essential info
            match article.get("title").and_then(|v| v.as_str()) {
                Some(title) => !title.is_empty() && title != "[Removed]",
                None => false,
            }
        })
        .map(|article| NewsArticle {
            title: str_or(article, "title", ""),
            description: str_or(article, "description", ""),
            url: str_or(article, "url", ""),
            url_to_image: str_or(article, "urlToImage", ""),
            published_at: str_or(article, "publishedAt", ""),
            source: article
                .get("source")
                .map(|s| str_or(s, "name", "Unknown"))
                .unwrap_or_else(|| "Unknown".to_string()),
            author: str_or(article, "author", "Unknown"),
        })
        .collect();

    Ok(NewsResult {
        total_results: body
            .get("totalResults")
            .and_then(|v| v.as_u64())
            .unwrap_or(0),
        articles,
        query: query.map(str::to_string),
    })
}

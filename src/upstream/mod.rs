//! Upstream provider clients
//!
//! Both providers signal soft failure via sentinel fields inside an
//! otherwise-200 body, so classification inspects body content rather than
//! HTTP status alone.

pub mod alphavantage;
pub mod newsapi;
pub mod types;

use crate::error::Result;
use async_trait::async_trait;
use types::{NewsResult, NormalizedQuote, NormalizedTimeSeries, SymbolMatch};

/// Fixed timeout for all upstream calls
pub const UPSTREAM_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Quote/time-series/search provider
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn get_quote(&self, symbol: &str) -> Result<NormalizedQuote>;

    async fn get_time_series(&self, symbol: &str) -> Result<NormalizedTimeSeries>;

    async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>>;
}

/// Market news provider
#[async_trait]
pub trait NewsProvider: Send + Sync {
    async fn get_market_news(
        &self,
        category: &str,
        page: u32,
        page_size: u32,
    ) -> Result<NewsResult>;

    async fn search_news(&self, query: &str, page: u32, page_size: u32) -> Result<NewsResult>;
}

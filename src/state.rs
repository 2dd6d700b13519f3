//! Application state management

use crate::auth::TokenService;
use crate::cache::ResponseCache;
use crate::config::Config;
use crate::db::SqliteDb;
use crate::error::Result;
use crate::upstream::alphavantage::AlphaVantageClient;
use crate::upstream::newsapi::NewsApiClient;
use crate::upstream::{MarketDataProvider, NewsProvider};
use std::path::Path;
use std::sync::Arc;

/// Application state shared across all handlers
///
/// The cache is an owned object injected here rather than process-global
/// state, so tests can swap in short TTLs and stub providers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SqliteDb>,
    pub tokens: Arc<TokenService>,
    pub market: Arc<dyn MarketDataProvider>,
    pub news: Arc<dyn NewsProvider>,
    pub cache: Arc<ResponseCache>,
}

impl AppState {
    /// Build state from configuration with real upstream clients
    pub fn new(config: &Config) -> Result<Self> {
        let db = Arc::new(SqliteDb::new(Path::new(&config.database_path))?);

        Ok(Self {
            db,
            tokens: Arc::new(TokenService::new(&config.jwt_secret)),
            market: Arc::new(AlphaVantageClient::with_base_url(
                &config.alpha_vantage_key,
                &config.alpha_vantage_url,
            )),
            news: Arc::new(NewsApiClient::with_base_url(
                &config.news_api_key,
                &config.news_api_url,
            )),
            cache: Arc::new(ResponseCache::with_default_ttl()),
        })
    }

    /// Assemble state from explicit parts (used by tests)
    pub fn with_parts(
        db: Arc<SqliteDb>,
        tokens: Arc<TokenService>,
        market: Arc<dyn MarketDataProvider>,
        news: Arc<dyn NewsProvider>,
        cache: Arc<ResponseCache>,
    ) -> Self {
        Self {
            db,
            tokens,
            market,
            news,
            cache,
        }
    }
}

//! Alpha Vantage market data client
//!
//! Upstream returns nested JSON objects whose numeric fields are
//! string-encoded and prefixed with ordinal labels (e.g. `"05. price"`).
//! Soft failures arrive as sentinel keys in a 200 body: `"Error Message"`
//! for a bad symbol, `"Note"` when the API quota is exhausted.

use crate::config::DEFAULT_ALPHA_VANTAGE_URL;
use crate::error::{ApiError, Result};
use crate::upstream::types::{DailyBar, NormalizedQuote, NormalizedTimeSeries, SymbolMatch};
use crate::upstream::{MarketDataProvider, UPSTREAM_TIMEOUT};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

const MAX_SERIES_LEN: usize = 60;
const MAX_SEARCH_RESULTS: usize = 10;

/// Alpha Vantage HTTP client
pub struct AlphaVantageClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl AlphaVantageClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, DEFAULT_ALPHA_VANTAGE_URL)
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

    async fn call(&self, function: &str, param: (&str, &str)) -> Result<Value> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", function),
                param,
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let body: Value = response.json().await?;
        Ok(body)
    }
}

#[async_trait]
impl MarketDataProvider for AlphaVantageClient {
    async fn get_quote(&self, symbol: &str) -> Result<NormalizedQuote> {
        tracing::info!("Fetching quote: {}", symbol);
        let body = self.call("GLOBAL_QUOTE", ("symbol", symbol)).await?;
        parse_quote(symbol, &body)
    }

    async fn get_time_series(&self, symbol: &str) -> Result<NormalizedTimeSeries> {
        tracing::info!("Fetching timeseries: {}", symbol);
        let body = self.call("TIME_SERIES_DAILY", ("symbol", symbol)).await?;
        parse_time_series(symbol, &body)
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>> {
        tracing::info!("Searching symbols: {}", query);
        let body = self.call("SYMBOL_SEARCH", ("keywords", query)).await?;
        parse_search(&body)
    }
}

/// Classify the body-level error sentinels shared by every endpoint
fn classify_sentinels(body: &Value) -> Result<()> {
    if body.get("Error Message").is_some() {
        return Err(ApiError::InvalidSymbol);
    }
    if body.get("Note").is_some() {
        return Err(ApiError::RateLimited);
    }
    Ok(())
}

/// String-encoded numeric field, defaulting to zero when absent
fn field_f64(obj: &Value, key: &str) -> f64 {
    obj.get(key)
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0)
}

fn field_u64(obj: &Value, key: &str) -> u64 {
    obj.get(key)
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

fn field_str(obj: &Value, key: &str) -> String {
    obj.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

pub(crate) fn parse_quote(symbol: &str, body: &Value) -> Result<NormalizedQuote> {
    classify_sentinels(body)?;

    let quote = body
        .get("Global Quote")
        .and_then(|v| v.as_object())
        .filter(|obj| !obj.is_empty())
        .ok_or(ApiError::NoData)?;

    let quote = Value::Object(quote.clone());

    // Change percent arrives as "1.50%"
    let change_percent = quote
        .get("10. change percent")
        .and_then(|v| v.as_str())
        .map(|s| s.trim_end_matches('%'))
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0);

    Ok(NormalizedQuote {
        symbol: symbol.to_string(),
        price: field_f64(&quote, "05. price"),
        change: field_f64(&quote, "09. change"),
        change_percent,
        open: field_f64(&quote, "02. open"),
        high: field_f64(&quote, "03. high"),
        low: field_f64(&quote, "04. low"),
        volume: field_u64(&quote, "06. volume"),
        previous_close: field_f64(&quote, "08. previous close"),
        latest_trading_day: field_str(&quote, "07. latest trading day"),
    })
}

pub(crate) fn parse_time_series(symbol: &str, body: &Value) -> Result<NormalizedTimeSeries> {
    classify_sentinels(body)?;

    let series = body
        .get("Time Series (Daily)")
        .and_then(|v| v.as_object())
        .filter(|obj| !obj.is_empty())
        .ok_or(ApiError::NoChartData)?;

    // Most recent 60 dates; ISO dates sort lexicographically
    let mut dates: Vec<&String> = series.keys().collect();
    dates.sort_by(|a, b| b.cmp(a));
    dates.truncate(MAX_SERIES_LEN);

    let mut data: Vec<DailyBar> = dates
        .into_iter()
        .map(|date| {
            let values = &series[date];
            DailyBar {
                date: date.clone(),
                open: field_f64(values, "1. open"),
                high: field_f64(values, "2. high"),
                low: field_f64(values, "3. low"),
                close: field_f64(values, "4. close"),
                volume: field_u64(values, "5. volume"),
            }
        })
        .collect();

    // Return chronologically ascending
    data.reverse();

    Ok(NormalizedTimeSeries {
        symbol: symbol.to_string(),
        data,
    })
}

pub(crate) fn parse_search(body: &Value) -> Result<Vec<SymbolMatch>> {
    // Search is best-effort: only the rate limit sentinel is an error,
    // a missing match list yields an empty result
    if body.get("Note").is_some() {
        return Err(ApiError::RateLimited);
    }

    let matches = match body.get("bestMatches").and_then(|v| v.as_array()) {
        Some(arr) => arr,
        None => return Ok(Vec::new()),
    };

    Ok(matches
        .iter()
        .take(MAX_SEARCH_RESULTS)
        .map(|m| SymbolMatch {
            symbol: field_str(m, "1. symbol"),
            name: field_str(m, "2. name"),
            kind: field_str(m, "3. type"),
            region: field_str(m, "4. region"),
            currency: field_str(m, "8. currency"),
        })
        .collect())
}

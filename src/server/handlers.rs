//! HTTP endpoint handlers
//!
//! Every handler follows the same pipeline: validate inputs, authenticate
//! where required, consult the cache for cacheable reads, call upstream on
//! a miss, and let `ApiError` map failures to the HTTP taxonomy.

use crate::auth::TokenKind;
use crate::cache::{quote_key, search_key, timeseries_key};
use crate::db::sqlite::models::{NewUser, User};
use crate::error::{ApiError, Result};
use crate::server::extract::{AuthUser, Json, Query};
use crate::server::types::{
    AuthResponse, LoginRequest, MarketNewsQuery, SearchNewsQuery, SignupRequest,
};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde_json::{json, Value};

// ============================================================================
// Validation helpers
// ============================================================================

fn validate_symbol(symbol: &str) -> Result<String> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(ApiError::Validation("symbol is required".to_string()));
    }
    Ok(symbol.to_uppercase())
}

fn validate_query(query: &str) -> Result<String> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ApiError::Validation("query is required".to_string()));
    }
    Ok(query.to_string())
}

fn validate_email(email: &str) -> Result<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && domain.contains('.')
        }
        None => false,
    };
    if !valid {
        return Err(ApiError::Validation("invalid email address".to_string()));
    }
    Ok(())
}

fn validate_paging(page: u32, page_size: u32) -> Result<()> {
    if page < 1 {
        return Err(ApiError::Validation("page must be >= 1".to_string()));
    }
    if !(1..=100).contains(&page_size) {
        return Err(ApiError::Validation(
            "page_size must be between 1 and 100".to_string(),
        ));
    }
    Ok(())
}

fn issue_token_pair(state: &AppState, user: &User) -> Result<AuthResponse> {
    let access = state.tokens.issue(user.id, &user.email, TokenKind::Access)?;
    let refresh = state.tokens.issue(user.id, &user.email, TokenKind::Refresh)?;
    Ok(AuthResponse::bearer(access, refresh, user.clone()))
}

// ============================================================================
// Health
// ============================================================================

/// Liveness probe - GET /health
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "markstro-server"
    }))
}

// ============================================================================
// Auth
// ============================================================================

/// User registration - POST /signup
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    if req.username.trim().is_empty() {
        return Err(ApiError::Validation("username is required".to_string()));
    }
    validate_email(&req.email)?;
    if req.password.len() < 8 {
        return Err(ApiError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }

    // Argon2 hashing is CPU-heavy; keep it off the async worker threads
    let db = state.db.clone();
    let user = tokio::task::spawn_blocking(move || {
        db.create_user(&NewUser {
            username: req.username.trim(),
            email: req.email.trim(),
            password: &req.password,
            phone: req.phone.as_deref(),
            country: req.country.as_deref(),
            district: req.district.as_deref(),
        })
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Blocking task failed: {}", e)))??;

    tracing::info!("User {} signed up", user.username);

    let response = issue_token_pair(&state, &user)?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// User login - POST /login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    validate_email(&req.email)?;

    // Verification recomputes the Argon2 digest; same blocking treatment
    let db = state.db.clone();
    let user = tokio::task::spawn_blocking(move || {
        db.verify_user(req.email.trim(), &req.password)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Blocking task failed: {}", e)))??
    .ok_or(ApiError::InvalidCredentials)?;

    tracing::info!("User {} logged in", user.username);

    Ok(Json(issue_token_pair(&state, &user)?))
}

// ============================================================================
// Stock data (protected, cached)
// ============================================================================

/// Current quote - GET /api/stock/quote/{symbol}
pub async fn get_quote(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(symbol): Path<String>,
) -> Result<Json<Value>> {
    let symbol = validate_symbol(&symbol)?;
    let key = quote_key(&symbol);

    if let Some(cached) = state.cache.get(&key) {
        return Ok(Json(cached));
    }

    let quote = state.market.get_quote(&symbol).await?;
    let value = serde_json::to_value(&quote)?;
    state.cache.put(&key, value.clone());

    Ok(Json(value))
}

/// Daily time series - GET /api/stock/timeseries/{symbol}
pub async fn get_timeseries(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(symbol): Path<String>,
) -> Result<Json<Value>> {
    let symbol = validate_symbol(&symbol)?;
    let key = timeseries_key(&symbol);

    if let Some(cached) = state.cache.get(&key) {
        return Ok(Json(cached));
    }

    let series = state.market.get_time_series(&symbol).await?;
    let value = serde_json::to_value(&series)?;
    state.cache.put(&key, value.clone());

    Ok(Json(value))
}

/// Symbol search - GET /api/stock/search/{query}
pub async fn search_symbols(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(query): Path<String>,
) -> Result<Json<Value>> {
    let query = validate_query(&query)?;
    let key = search_key(&query);

    if let Some(cached) = state.cache.get(&key) {
        return Ok(Json(cached));
    }

    let matches = state.market.search_symbols(&query).await?;
    let value = serde_json::to_value(&matches)?;
    state.cache.put(&key, value.clone());

    Ok(Json(value))
}

// ============================================================================
// News (open)
// ============================================================================

/// Market headlines - GET /api/news/market
pub async fn market_news(
    State(state): State<AppState>,
    Query(params): Query<MarketNewsQuery>,
) -> Result<Json<Value>> {
    validate_paging(params.page, params.page_size)?;

    let result = state
        .news
        .get_market_news(&params.category, params.page, params.page_size)
        .await?;

    Ok(Json(serde_json::to_value(&result)?))
}

/// News search - GET /api/news/search
pub async fn search_news(
    State(state): State<AppState>,
    Query(params): Query<SearchNewsQuery>,
) -> Result<Json<Value>> {
    let query = validate_query(&params.q)?;
    validate_paging(params.page, params.page_size)?;

    let result = state
        .news
        .search_news(&query, params.page, params.page_size)
        .await?;

    Ok(Json(serde_json::to_value(&result)?))
}

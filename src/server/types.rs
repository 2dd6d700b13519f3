//! Request and response bodies for the HTTP API

use crate::db::sqlite::models::User;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub country: Option<String>,
    pub district: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token pair plus the user record, returned by signup and login
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub user: User,
}

impl AuthResponse {
    pub fn bearer(access_token: String, refresh_token: String, user: User) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            user,
        }
    }
}

fn default_category() -> String {
    "business".to_string()
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    10
}

#[derive(Debug, Deserialize)]
pub struct MarketNewsQuery {
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

#[derive(Debug, Deserialize)]
pub struct SearchNewsQuery {
    pub q: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

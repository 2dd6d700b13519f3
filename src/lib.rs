//! Markstro - stock market and news backend API
//!
//! A thin backend-for-frontend that proxies Alpha Vantage quote data and
//! NewsAPI headlines to a web client, with JWT-based signup/login and a
//! short-lived in-memory response cache.

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod security;
pub mod server;
pub mod state;
pub mod upstream;

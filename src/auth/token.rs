//! JWT session tokens
//!
//! Tokens are stateless HS256 JWTs: validity is fully determined by the
//! signature and the `exp` claim at verification time. Rotating the signing
//! secret invalidates every outstanding token.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Access tokens expire in 24 hours
pub const ACCESS_TOKEN_TTL: Duration = Duration::hours(24);

/// Refresh tokens expire in 7 days
pub const REFRESH_TOKEN_TTL: Duration = Duration::days(7);

/// Token kind carried in the claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims embedded in every session token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user id
    pub sub: String,
    pub email: String,
    pub kind: TokenKind,
    /// Issued at (unix timestamp)
    pub iat: i64,
    /// Expiry (unix timestamp)
    pub exp: i64,
}

/// Verification failure classification
///
/// Callers surface both kinds as the same generic 401 so that the response
/// does not reveal whether a token expired or was tampered with.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token")]
    Invalid,
}

/// Issues and verifies signed session tokens
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenService {
    /// Create a token service from the process-wide signing secret
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a token for a user with the standard TTL for its kind
    pub fn issue(&self, user_id: i64, email: &str, kind: TokenKind) -> crate::error::Result<String> {
        let ttl = match kind {
            TokenKind::Access => ACCESS_TOKEN_TTL,
            TokenKind::Refresh => REFRESH_TOKEN_TTL,
        };
        self.issue_with_ttl(user_id, email, kind, ttl)
    }

    /// Issue a token with an explicit TTL
    pub fn issue_with_ttl(
        &self,
        user_id: i64,
        email: &str,
        kind: TokenKind,
        ttl: Duration,
    ) -> crate::error::Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| crate::error::ApiError::Internal(format!("Token encoding failed: {}", e)))
    }

    /// Verify a token and return its claims
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(TokenError::Expired),
                _ => Err(TokenError::Invalid),
            },
        }
    }
}

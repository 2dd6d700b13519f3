//! Session token issuance and verification

mod token;

pub use token::{Claims, TokenError, TokenKind, TokenService, ACCESS_TOKEN_TTL, REFRESH_TOKEN_TTL};

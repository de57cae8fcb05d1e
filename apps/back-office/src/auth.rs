//! # Authentication
//!
//! Opaque token authentication.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Token Authentication                                 │
//! │                                                                         │
//! │  1. Register / Login                                                    │
//! │     POST /users/login {username, password}                              │
//! │     ← {token: "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b", ...}          │
//! │                                                                         │
//! │  2. Every scoped request                                                │
//! │     Authorization: Token 9f86d0...   (or "Bearer 9f86d0...")            │
//! │          │                                                              │
//! │          ▼                                                              │
//! │     AuthAccount extractor                                               │
//! │          ├── header missing / malformed ──► 401                         │
//! │          ├── token unknown              ──► 401                         │
//! │          ├── account disabled           ──► 403                         │
//! │          └── OK ──► handler gets AccountScope                           │
//! │                                                                         │
//! │  3. Logout / password change deletes the token                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Passwords are stored as Argon2 PHC strings.

use std::sync::OnceLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use bistro_core::{Account, AccountScope};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Hash a password for storage.
pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!("Failed to hash password: {}", e);
            ApiError::internal("Failed to hash password")
        })?;

    Ok(hash.to_string())
}

/// Verify a password against its stored hash.
///
/// An unparseable hash never verifies.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Runs one verification against a throwaway hash. Login calls this when no
/// account matches, so an unknown username costs the same as a wrong password.
pub fn verify_dummy_password(password: &str) {
    if let Some(hash) = dummy_hash() {
        verify_password(password, hash);
    }
}

fn dummy_hash() -> Option<&'static str> {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

    DUMMY_HASH
        .get_or_init(|| hash_password("bistro-unknown-account").ok())
        .as_deref()
}

/// Extract the key from an `Authorization` header value.
///
/// Accepts the `Token <key>` and `Bearer <key>` schemes.
pub fn parse_authorization(header: &str) -> Option<&str> {
    let (scheme, key) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("token") && !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let key = key.trim();
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthAccount {
    pub account: Account,
    pub token: String,
}

impl AuthAccount {
    /// Scope for every repository call made on behalf of this caller.
    pub fn scope(&self) -> AccountScope {
        AccountScope::new(self.account.id)
    }
}

impl FromRequestParts<AppState> for AuthAccount {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided."))?;

        let token = parse_authorization(header)
            .ok_or_else(|| ApiError::unauthorized("Invalid token header."))?;

        let account = state
            .db
            .accounts()
            .account_for_token(token)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Invalid token."))?;

        if !account.is_active {
            debug!(account_id = account.id, "Rejected token of disabled account");
            return Err(ApiError::forbidden("Account is disabled"));
        }

        Ok(AuthAccount {
            account,
            token: token.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_authorization() {
        assert_eq!(parse_authorization("Token abc123"), Some("abc123"));
        assert_eq!(parse_authorization("Bearer abc123"), Some("abc123"));
        assert_eq!(parse_authorization("token  abc123 "), Some("abc123"));
        assert_eq!(parse_authorization("Basic abc123"), None);
        assert_eq!(parse_authorization("Token "), None);
        assert_eq!(parse_authorization("abc123"), None);
    }

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret-pass", &hash));
        assert!(!verify_password("wrong-pass", &hash));
    }

    #[test]
    fn test_dummy_hash_costs_the_same_as_stored_hashes() {
        fn algorithm_and_params(hash: &str) -> Vec<&str> {
            hash.split('$').take(4).collect()
        }

        let dummy = dummy_hash().unwrap();
        let stored = hash_password("s3cret-pass").unwrap();
        assert_eq!(algorithm_and_params(dummy), algorithm_and_params(&stored));
        assert!(!verify_password("s3cret-pass", dummy));

        // Repeated calls reuse the cached hash.
        assert!(std::ptr::eq(dummy, dummy_hash().unwrap()));
        verify_dummy_password("s3cret-pass");
    }

    #[test]
    fn test_garbage_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
        assert!(!verify_password("", ""));
    }
}

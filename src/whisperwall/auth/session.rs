//! Cookie session manager.
//!
//! The browser holds an opaque token; the database stores only its hash and
//! the user id. Resolving a session re-fetches the full user record, so a
//! deleted user degrades to anonymous instead of serving stale data.

use anyhow::{Context, Result};
use axum::http::{header::InvalidHeaderValue, HeaderMap, HeaderValue};
use sqlx::PgPool;
use uuid::Uuid;

use super::{utils, AuthConfig};
use crate::whisperwall::storage::{self, UserRecord};

pub const SESSION_COOKIE_NAME: &str = "whisperwall_session";
pub const STATE_COOKIE_NAME: &str = "whisperwall_oauth_state";

/// Mint a session for the user and return the `Set-Cookie` value.
pub async fn establish(pool: &PgPool, config: &AuthConfig, user_id: Uuid) -> Result<HeaderValue> {
    let token = storage::insert_session(pool, user_id, config.session_ttl_seconds()).await?;
    session_cookie(config, &token).context("failed to build session cookie")
}

/// Resolve the session cookie into a user, if any.
///
/// Returns `Ok(None)` for a missing cookie, an expired or unknown session,
/// and a session whose user no longer exists.
pub async fn resolve(headers: &HeaderMap, pool: &PgPool) -> Result<Option<UserRecord>> {
    let Some(token) = utils::extract_cookie(headers, SESSION_COOKIE_NAME) else {
        return Ok(None);
    };
    // Only the hash is stored; never compare raw tokens against the database.
    let token_hash = utils::hash_session_token(&token);
    let Some(user_id) = storage::lookup_session(pool, &token_hash).await? else {
        return Ok(None);
    };
    storage::lookup_by_id(pool, user_id).await
}

/// Remove the session row referenced by the cookie, if any. Idempotent.
pub async fn destroy(headers: &HeaderMap, pool: &PgPool) -> Result<()> {
    if let Some(token) = utils::extract_cookie(headers, SESSION_COOKIE_NAME) {
        let token_hash = utils::hash_session_token(&token);
        storage::delete_session(pool, &token_hash).await?;
    }
    Ok(())
}

/// Build a secure `HttpOnly` cookie for the session token.
pub fn session_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    // Only mark cookies secure when the site is served over HTTPS.
    let secure = config.session_cookie_secure();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let secure = config.session_cookie_secure();
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Short-lived cookie carrying the OAuth anti-forgery `state`.
pub fn state_cookie(config: &AuthConfig, state: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.state_ttl_seconds();
    let secure = config.session_cookie_secure();
    let mut cookie = format!(
        "{STATE_COOKIE_NAME}={state}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub fn clear_state_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let secure = config.session_cookie_secure();
    let mut cookie = format!("{STATE_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

//! Authentication core: local credentials, Google OAuth, and the session
//! glue shared by both flows.

use anyhow::Result;
use sqlx::PgPool;
use tracing::warn;

use crate::whisperwall::storage::{self, CreateOutcome, UserRecord};

pub mod google;
pub mod password;
pub mod session;
pub(crate) mod utils;

use google::GoogleOAuth;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_STATE_TTL_SECONDS: i64 = 10 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    session_ttl_seconds: i64,
    state_ttl_seconds: i64,
    session_cookie_secure: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            state_ttl_seconds: DEFAULT_STATE_TTL_SECONDS,
            session_cookie_secure: false,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_cookie_secure(mut self, secure: bool) -> Self {
        self.session_cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn state_ttl_seconds(&self) -> i64 {
        self.state_ttl_seconds
    }

    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.session_cookie_secure
    }
}

pub struct AuthState {
    config: AuthConfig,
    google: GoogleOAuth,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, google: GoogleOAuth) -> Self {
        Self { config, google }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn google(&self) -> &GoogleOAuth {
        &self.google
    }
}

/// Outcome of an authentication attempt.
///
/// Failures carry a reason for logging; callers only ever turn them into a
/// redirect back to the originating form.
#[derive(Debug)]
pub enum AuthResult {
    Authenticated(UserRecord),
    Failed(AuthFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    InvalidInput,
    EmailTaken,
    BadCredentials,
    Provider,
}

/// Register a new local account and log it straight in.
///
/// A duplicate email is a normal outcome, not an error; only store failures
/// propagate as `Err`.
pub async fn register_local(pool: &PgPool, email: &str, password: &str) -> Result<AuthResult> {
    let email = utils::normalize_email(email);
    if !utils::valid_email(&email) || password.is_empty() {
        return Ok(AuthResult::Failed(AuthFailure::InvalidInput));
    }

    let password_hash = password::hash_password(password)?;

    match storage::create_local(pool, &email, &password_hash).await? {
        CreateOutcome::Created(user) => Ok(AuthResult::Authenticated(user)),
        CreateOutcome::DuplicateEmail => Ok(AuthResult::Failed(AuthFailure::EmailTaken)),
    }
}

/// Check a local credential against the persisted user record.
///
/// Unknown email, OAuth-only account, and wrong password are indistinguishable
/// to the caller.
pub async fn login_local(pool: &PgPool, email: &str, password: &str) -> Result<AuthResult> {
    let email = utils::normalize_email(email);
    if !utils::valid_email(&email) {
        return Ok(AuthResult::Failed(AuthFailure::BadCredentials));
    }

    let Some(user) = storage::lookup_by_email(pool, &email).await? else {
        return Ok(AuthResult::Failed(AuthFailure::BadCredentials));
    };

    let Some(stored) = user.password_hash.as_deref() else {
        return Ok(AuthResult::Failed(AuthFailure::BadCredentials));
    };

    if password::verify_password(password, stored) {
        Ok(AuthResult::Authenticated(user))
    } else {
        Ok(AuthResult::Failed(AuthFailure::BadCredentials))
    }
}

/// Finish the OAuth flow: exchange the authorization code, fetch the
/// provider's stable subject, and find-or-create the matching user.
///
/// Provider and network failures never create a partial user; they resolve
/// to `Failed(Provider)` and the caller redirects to the login form.
pub async fn login_google(pool: &PgPool, oauth: &GoogleOAuth, code: &str) -> Result<AuthResult> {
    let token = match oauth.exchange_code(code).await {
        Ok(token) => token,
        Err(err) => {
            warn!("OAuth code exchange failed: {err}");
            return Ok(AuthResult::Failed(AuthFailure::Provider));
        }
    };

    let subject = match oauth.fetch_subject(&token.access_token).await {
        Ok(subject) => subject,
        Err(err) => {
            warn!("OAuth userinfo request failed: {err}");
            return Ok(AuthResult::Failed(AuthFailure::Provider));
        }
    };

    let user = storage::find_or_create_by_google_id(pool, &subject).await?;
    Ok(AuthResult::Authenticated(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AuthConfig::new();
        assert_eq!(config.session_ttl_seconds(), DEFAULT_SESSION_TTL_SECONDS);
        assert_eq!(config.state_ttl_seconds(), DEFAULT_STATE_TTL_SECONDS);
        assert!(!config.session_cookie_secure());
    }

    #[test]
    fn test_config_builders() {
        let config = AuthConfig::new()
            .with_session_ttl_seconds(60)
            .with_session_cookie_secure(true);
        assert_eq!(config.session_ttl_seconds(), 60);
        assert!(config.session_cookie_secure());
    }

    #[test]
    fn test_auth_failure_debug_names() {
        assert_eq!(format!("{:?}", AuthFailure::EmailTaken), "EmailTaken");
        assert_eq!(format!("{:?}", AuthFailure::Provider), "Provider");
    }
}

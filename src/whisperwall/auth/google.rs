//! Google OAuth 2.0 client: authorization redirect, code exchange, and the
//! userinfo lookup that yields the provider's stable subject identifier.

use anyhow::{anyhow, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::{info_span, Instrument};
use url::Url;

use super::utils;
use crate::whisperwall::APP_USER_AGENT;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

/// Google OAuth 2.0 configuration and HTTP client.
///
/// Endpoint URLs default to Google's but are overridable, which keeps the
/// exchange testable against a local mock provider.
pub struct GoogleOAuth {
    client_id: String,
    client_secret: SecretString,
    redirect_uri: Url,
    auth_url: Url,
    token_url: Url,
    userinfo_url: Url,
    scopes: Vec<String>,
    http: reqwest::Client,
}

/// Authorization URL plus the `state` value to round-trip via cookie.
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

/// Token response from the provider's token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    sub: String,
}

impl GoogleOAuth {
    /// Create a new client with Google's endpoints.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: SecretString,
        redirect_uri: Url,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(5))
            .build()
            .context("failed to build OAuth HTTP client")?;

        Ok(Self {
            client_id: client_id.into(),
            client_secret,
            redirect_uri,
            auth_url: GOOGLE_AUTH_URL.parse().expect("valid default URL"),
            token_url: GOOGLE_TOKEN_URL.parse().expect("valid default URL"),
            userinfo_url: GOOGLE_USERINFO_URL.parse().expect("valid default URL"),
            scopes: vec!["profile".into()],
            http,
        })
    }

    /// Override the authorization endpoint.
    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    /// Override the token endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    /// Override the userinfo endpoint.
    #[must_use]
    pub fn with_userinfo_url(mut self, url: Url) -> Self {
        self.userinfo_url = url;
        self
    }

    /// Generate the authorization redirect with a fresh `state`.
    ///
    /// # Errors
    /// Returns an error if the system randomness source fails.
    pub fn authorization_request(&self) -> Result<AuthorizationRequest> {
        let state = utils::generate_state_token()?;
        let scope = self.scopes.join(" ");

        let mut url = self.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", self.redirect_uri.as_str())
            .append_pair("scope", &scope)
            .append_pair("state", &state);

        Ok(AuthorizationRequest {
            url: url.into(),
            state,
        })
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    /// Returns an error on network failure or a non-success response from the
    /// token endpoint.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
        ];

        let span = info_span!(
            "oauth.exchange",
            http.method = "POST",
            url = %self.token_url
        );
        async {
            let response = self
                .http
                .post(self.token_url.clone())
                .form(&params)
                .send()
                .await
                .context("failed to send token exchange request")?;

            let response = Self::ensure_success(response, "token exchange").await?;
            response
                .json::<TokenResponse>()
                .await
                .context("failed to decode token response")
        }
        .instrument(span)
        .await
    }

    /// Fetch the provider's stable subject identifier for an access token.
    ///
    /// # Errors
    /// Returns an error on network failure, a non-success response, or a
    /// profile missing the subject.
    pub async fn fetch_subject(&self, access_token: &str) -> Result<String> {
        let span = info_span!(
            "oauth.userinfo",
            http.method = "GET",
            url = %self.userinfo_url
        );
        async {
            let response = self
                .http
                .get(self.userinfo_url.clone())
                .bearer_auth(access_token)
                .send()
                .await
                .context("failed to send userinfo request")?;

            let response = Self::ensure_success(response, "userinfo request").await?;
            let info = response
                .json::<UserInfo>()
                .await
                .context("failed to decode userinfo response")?;

            if info.sub.is_empty() {
                return Err(anyhow!("userinfo response is missing the subject"));
            }

            Ok(info.sub)
        }
        .instrument(span)
        .await
    }

    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(anyhow!("{operation} failed with status {status}: {body}"))
    }
}

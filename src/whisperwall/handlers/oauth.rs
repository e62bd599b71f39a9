//! The Google OAuth round-trip.
//!
//! `/auth/google` parks an anti-forgery `state` in a short-lived cookie and
//! bounces the browser to the provider; `/auth/google/secrets` is the fixed
//! callback. Every failure on the way back lands on the login form; a
//! partial user is never created.

use axum::{
    extract::{Extension, Query},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::whisperwall::auth::{
    self, session,
    session::STATE_COOKIE_NAME,
    utils::extract_cookie,
    AuthResult, AuthState,
};

pub async fn google_redirect(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    let request = match auth_state.google().authorization_request() {
        Ok(request) => request,
        Err(err) => {
            error!("Failed to build authorization request: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut headers = HeaderMap::new();
    match session::state_cookie(auth_state.config(), &request.state) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build state cookie: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    (headers, Redirect::to(&request.url)).into_response()
}

#[derive(Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

pub async fn google_callback(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Query(params): Query<CallbackParams>,
) -> impl IntoResponse {
    // The state cookie is single-use; clear it whatever happens next.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = session::clear_state_cookie(auth_state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }

    if let Some(error) = params.error {
        debug!("Provider returned an error: {error}");
        return (response_headers, Redirect::to("/login")).into_response();
    }

    let Some(code) = params.code else {
        debug!("Callback is missing the authorization code");
        return (response_headers, Redirect::to("/login")).into_response();
    };

    let stored_state = extract_cookie(&headers, STATE_COOKIE_NAME);
    if stored_state.is_none() || stored_state != params.state {
        warn!("OAuth state mismatch");
        return (response_headers, Redirect::to("/login")).into_response();
    }

    match auth::login_google(&pool, auth_state.google(), &code).await {
        Ok(AuthResult::Authenticated(user)) => {
            match session::establish(&pool, auth_state.config(), user.id).await {
                Ok(cookie) => {
                    response_headers.append(SET_COOKIE, cookie);
                    (response_headers, Redirect::to("/secrets")).into_response()
                }
                Err(err) => {
                    error!("Failed to establish session: {err}");
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            }
        }
        Ok(AuthResult::Failed(reason)) => {
            debug!("OAuth login failed: {reason:?}");
            (response_headers, Redirect::to("/login")).into_response()
        }
        Err(err) => {
            error!("OAuth login failed: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

//! GET handlers for the server-rendered pages.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
};
use minijinja::context;
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::render_or_500;
use crate::whisperwall::auth::session;
use crate::whisperwall::storage::{self, UserRecord};
use crate::whisperwall::views::Views;

#[derive(Serialize)]
struct SecretEntry {
    author: String,
    secret: String,
}

pub async fn home(views: Extension<Arc<Views>>) -> impl IntoResponse {
    render_or_500(&views, "home.html", context! {})
}

pub async fn login_form(views: Extension<Arc<Views>>) -> impl IntoResponse {
    render_or_500(&views, "login.html", context! {})
}

pub async fn register_form(views: Extension<Arc<Views>>) -> impl IntoResponse {
    render_or_500(&views, "register.html", context! {})
}

/// The wall itself is public; only submitting requires a session.
pub async fn secrets(pool: Extension<PgPool>, views: Extension<Arc<Views>>) -> impl IntoResponse {
    let users = match storage::users_with_secret(&pool).await {
        Ok(users) => users,
        Err(err) => {
            error!("Failed to list secrets: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let entries: Vec<SecretEntry> = users
        .iter()
        .filter_map(|user| {
            user.secret.as_ref().map(|secret| SecretEntry {
                author: display_author(user),
                secret: secret.clone(),
            })
        })
        .collect();

    render_or_500(&views, "secrets.html", context! { users => entries })
}

/// Session-gated: anonymous visitors are sent to the login form, not told
/// they did anything wrong.
pub async fn submit_form(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    views: Extension<Arc<Views>>,
) -> impl IntoResponse {
    match session::resolve(&headers, &pool).await {
        Ok(Some(_)) => render_or_500(&views, "submit.html", context! {}),
        Ok(None) => Redirect::to("/login").into_response(),
        Err(err) => {
            error!("Failed to resolve session: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Local accounts show their email; OAuth-only accounts get a masked handle
/// derived from the provider subject.
fn display_author(user: &UserRecord) -> String {
    if let Some(email) = &user.email {
        return email.clone();
    }
    if let Some(google_id) = &user.google_id {
        let prefix: String = google_id.chars().take(6).collect();
        return format!("google-{prefix}");
    }
    "anonymous".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(email: Option<&str>, google_id: Option<&str>) -> UserRecord {
        UserRecord {
            id: Uuid::nil(),
            email: email.map(str::to_string),
            password_hash: None,
            google_id: google_id.map(str::to_string),
            secret: None,
        }
    }

    #[test]
    fn display_author_prefers_email() {
        let record = user(Some("a@example.com"), Some("10769150350006150715"));
        assert_eq!(display_author(&record), "a@example.com");
    }

    #[test]
    fn display_author_masks_google_subject() {
        let record = user(None, Some("10769150350006150715"));
        assert_eq!(display_author(&record), "google-107691");
    }

    #[test]
    fn display_author_handles_short_subject() {
        let record = user(None, Some("42"));
        assert_eq!(display_author(&record), "google-42");
    }
}

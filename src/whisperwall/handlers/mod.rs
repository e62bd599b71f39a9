pub mod health;
pub use self::health::health;

pub mod pages;
pub use self::pages::{home, login_form, register_form, secrets, submit_form};

pub mod register;
pub use self::register::register;

pub mod login;
pub use self::login::login;

pub mod submit;
pub use self::submit::submit;

pub mod logout;
pub use self::logout::logout;

pub mod oauth;
pub use self::oauth::{google_callback, google_redirect};

// common plumbing for the handlers
use crate::whisperwall::views::Views;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

/// Credentials posted by the login and registration forms. The `username`
/// field carries the email, matching the form wire format.
#[derive(serde::Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Render a template or degrade to a bare 500; the browser never sees the
/// underlying error.
pub(super) fn render_or_500<S: Serialize>(views: &Views, name: &str, ctx: S) -> Response {
    match views.render(name, ctx) {
        Ok(html) => Html(html).into_response(),
        Err(err) => {
            error!("Failed to render {name}: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

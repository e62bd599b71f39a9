//! POST /submit: store the authenticated user's secret.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    Form,
};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::error;

use crate::whisperwall::auth::session;
use crate::whisperwall::storage;

#[derive(Deserialize)]
pub struct SecretForm {
    pub secret: String,
}

pub async fn submit(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    payload: Option<Form<SecretForm>>,
) -> impl IntoResponse {
    let user = match session::resolve(&headers, &pool).await {
        Ok(Some(user)) => user,
        Ok(None) => return Redirect::to("/login").into_response(),
        Err(err) => {
            error!("Failed to resolve session: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let Some(Form(form)) = payload else {
        return Redirect::to("/submit").into_response();
    };

    let secret = form.secret.trim();
    if secret.is_empty() {
        return Redirect::to("/submit").into_response();
    }

    match storage::set_secret(&pool, user.id, secret).await {
        Ok(true) => Redirect::to("/secrets").into_response(),
        // The user vanished mid-session; drop the submission quietly.
        Ok(false) => Redirect::to("/login").into_response(),
        Err(err) => {
            error!("Failed to store secret: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

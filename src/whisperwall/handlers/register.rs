//! POST /register: create a local account and log it straight in.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    Form,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, error};

use super::Credentials;
use crate::whisperwall::auth::{self, session, AuthResult, AuthState};

pub async fn register(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Form<Credentials>>,
) -> impl IntoResponse {
    let Some(Form(form)) = payload else {
        return Redirect::to("/register").into_response();
    };

    match auth::register_local(&pool, &form.username, &form.password).await {
        Ok(AuthResult::Authenticated(user)) => {
            match session::establish(&pool, auth_state.config(), user.id).await {
                Ok(cookie) => {
                    let mut headers = HeaderMap::new();
                    headers.insert(SET_COOKIE, cookie);
                    (headers, Redirect::to("/secrets")).into_response()
                }
                Err(err) => {
                    error!("Failed to establish session: {err}");
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            }
        }
        Ok(AuthResult::Failed(reason)) => {
            debug!("Registration rejected: {reason:?}");
            Redirect::to("/register").into_response()
        }
        Err(err) => {
            error!("Registration failed: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

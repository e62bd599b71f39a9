//! Database access: user records and session rows.
//!
//! Every operation is a single-row read or write; the unique indexes on
//! `email` and `google_id` are the only concurrency control this
//! application needs.

use anyhow::{anyhow, Context, Result};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::auth::utils::{generate_session_token, hash_session_token, is_unique_violation};

const USER_COLUMNS: &str = "id, email, password_hash, google_id, secret";

/// A user row. `email`/`password_hash` are set for local accounts,
/// `google_id` for OAuth accounts; at least one side is always present.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub secret: Option<String>,
}

impl UserRecord {
    fn from_row(row: &PgRow) -> Self {
        Self {
            id: row.get("id"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            google_id: row.get("google_id"),
            secret: row.get("secret"),
        }
    }
}

/// Outcome when attempting to create a local account.
#[derive(Debug)]
pub enum CreateOutcome {
    Created(UserRecord),
    DuplicateEmail,
}

/// Insert a new local user. Duplicate detection rides on the unique index,
/// not a read-then-write, so concurrent registrations cannot both succeed.
pub async fn create_local(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
) -> Result<CreateOutcome> {
    let query = format!(
        "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = %query
    );
    let row = sqlx::query(&query)
        .bind(email)
        .bind(password_hash)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(CreateOutcome::Created(UserRecord::from_row(&row))),
        Err(err) if is_unique_violation(&err) => Ok(CreateOutcome::DuplicateEmail),
        Err(err) => Err(err).context("failed to insert user"),
    }
}

/// Idempotent find-or-create keyed on the provider subject. The upsert is a
/// single statement, so concurrent callbacks for the same subject converge
/// on one row.
pub async fn find_or_create_by_google_id(pool: &PgPool, google_id: &str) -> Result<UserRecord> {
    let query = format!(
        r"
        INSERT INTO users (google_id)
        VALUES ($1)
        ON CONFLICT (google_id) DO UPDATE SET updated_at = NOW()
        RETURNING {USER_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = %query
    );
    let row = sqlx::query(&query)
        .bind(google_id)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to find or create user by google id")?;

    Ok(UserRecord::from_row(&row))
}

pub async fn lookup_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = %query
    );
    let row = sqlx::query(&query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;

    Ok(row.as_ref().map(UserRecord::from_row))
}

pub async fn lookup_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = %query
    );
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by id")?;

    Ok(row.as_ref().map(UserRecord::from_row))
}

/// All users with a non-empty secret, oldest account first so a single read
/// is stable.
pub async fn users_with_secret(pool: &PgPool) -> Result<Vec<UserRecord>> {
    let query = format!(
        r"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE secret IS NOT NULL AND secret <> ''
        ORDER BY created_at
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = %query
    );
    let rows = sqlx::query(&query)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list users with secrets")?;

    Ok(rows.iter().map(UserRecord::from_row).collect())
}

/// Overwrite the user's secret. Returns `false` when the user no longer
/// exists.
pub async fn set_secret(pool: &PgPool, id: Uuid, secret: &str) -> Result<bool> {
    let query = "UPDATE users SET secret = $2, updated_at = NOW() WHERE id = $1 RETURNING id";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(id)
        .bind(secret)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to set secret")?;

    Ok(row.is_some())
}

pub async fn insert_session(pool: &PgPool, user_id: Uuid, ttl_seconds: i64) -> Result<String> {
    // Generate a random token, store only its hash, and return the raw value
    // so the caller can set the session cookie.
    let query = r"
        INSERT INTO user_sessions (session_hash, user_id, expires_at)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );

    for _ in 0..3 {
        let token = generate_session_token()?;
        let token_hash = hash_session_token(&token);
        let result = sqlx::query(query)
            .bind(token_hash)
            .bind(user_id)
            .bind(ttl_seconds)
            .execute(pool)
            .instrument(span.clone())
            .await;

        match result {
            Ok(_) => return Ok(token),
            Err(err) if is_unique_violation(&err) => {}
            Err(err) => return Err(err).context("failed to insert session"),
        }
    }

    Err(anyhow!("failed to generate unique session token"))
}

/// Resolve an unexpired session hash to the user id it references.
pub async fn lookup_session(pool: &PgPool, token_hash: &[u8]) -> Result<Option<Uuid>> {
    let query = r"
        SELECT user_id
        FROM user_sessions
        WHERE session_hash = $1
          AND expires_at > NOW()
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup session")?;

    let Some(row) = row else {
        return Ok(None);
    };

    // Record activity for audit/visibility without extending the session TTL.
    let query = r"
        UPDATE user_sessions
        SET last_seen_at = NOW()
        WHERE session_hash = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(token_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update session last_seen_at")?;

    Ok(Some(row.get("user_id")))
}

pub async fn delete_session(pool: &PgPool, token_hash: &[u8]) -> Result<()> {
    // Logout is idempotent; it's fine if no rows are deleted.
    let query = "DELETE FROM user_sessions WHERE session_hash = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(token_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete session")?;
    Ok(())
}

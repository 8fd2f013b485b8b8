use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::PasswordResetRecord;

/// Insert a record, taking over the token hash of an expired record that the
/// sweeper has not removed yet. `None` when a live record already holds it.
pub async fn create(
    pool: &PgPool,
    id: Uuid,
    email: &str,
    token_hash: &str,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
) -> Result<Option<PasswordResetRecord>, sqlx::Error> {
    sqlx::query_as::<_, PasswordResetRecord>(
        "INSERT INTO password_reset_records (id, email, token_hash, expires_at, created_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (token_hash) DO UPDATE
            SET id = EXCLUDED.id,
                email = EXCLUDED.email,
                expires_at = EXCLUDED.expires_at,
                created_at = EXCLUDED.created_at
            WHERE password_reset_records.expires_at <= $5
         RETURNING *",
    )
    .bind(id)
    .bind(email)
    .bind(token_hash)
    .bind(expires_at)
    .bind(created_at)
    .fetch_optional(pool)
    .await
}

/// Delete the live record for `token_hash` and hand back its email.
///
/// Find and delete happen in one statement, so of several concurrent callers
/// at most one gets a row back.
pub async fn take_live_by_hash(
    pool: &PgPool,
    token_hash: &str,
    now: DateTime<Utc>,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "DELETE FROM password_reset_records
         WHERE token_hash = $1 AND expires_at > $2
         RETURNING email",
    )
    .bind(token_hash)
    .bind(now)
    .fetch_optional(pool)
    .await
}

pub async fn find_by_hash(
    pool: &PgPool,
    token_hash: &str,
) -> Result<Option<PasswordResetRecord>, sqlx::Error> {
    sqlx::query_as::<_, PasswordResetRecord>(
        "SELECT * FROM password_reset_records WHERE token_hash = $1",
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await
}

pub async fn delete_expired(pool: &PgPool, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM password_reset_records WHERE expires_at <= $1")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

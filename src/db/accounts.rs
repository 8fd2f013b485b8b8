use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Account;

// Emails are stored lowercased and matched case-insensitively.

pub async fn create(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
) -> Result<Account, sqlx::Error> {
    sqlx::query_as::<_, Account>(
        "INSERT INTO accounts (id, email, password_hash)
         VALUES ($1, lower($2), $3) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = lower($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
}

/// Returns false when no account has that email.
pub async fn update_password(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE accounts SET password_hash = $2, updated_at = now() WHERE email = lower($1)",
    )
    .bind(email)
    .bind(password_hash)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

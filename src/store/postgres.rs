use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{NewRecord, RecordId, RecordStorage, StoreError};
use crate::db;

/// Record storage on the `password_reset_records` table.
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn storage_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::DuplicateToken,
        _ => StoreError::Unavailable(err.to_string()),
    }
}

#[async_trait]
impl RecordStorage for PgStorage {
    async fn insert(&self, record: NewRecord) -> Result<RecordId, StoreError> {
        let stored = db::password_reset_records::create(
            &self.pool,
            record.id.0,
            &record.email,
            &record.token_hash,
            record.expires_at,
            record.created_at,
        )
        .await
        .map_err(storage_error)?
        .ok_or(StoreError::DuplicateToken)?;

        Ok(RecordId(stored.id))
    }

    async fn take_live(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, StoreError> {
        db::password_reset_records::take_live_by_hash(&self.pool, token_hash, now)
            .await
            .map_err(storage_error)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        db::password_reset_records::delete_expired(&self.pool, now)
            .await
            .map_err(storage_error)
    }
}

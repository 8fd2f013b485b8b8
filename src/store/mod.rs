//! Self-expiring storage for one-time password reset tokens.
//!
//! [`TokenStore`] is the only way records are created or read. It validates
//! input, hashes tokens, bounds every storage call with a timeout and hands
//! the actual persistence to a [`RecordStorage`] backend:
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`PgStorage`] | Postgres via sqlx, production |
//! | [`MemoryStorage`] | in-process `DashMap`, tests and single-node dev |
//!
//! Expired records are invisible to [`TokenStore::consume`] the moment
//! `expires_at` passes, and the [`sweeper`] deletes them physically on a
//! fixed interval.

pub mod memory;
pub mod postgres;
pub mod sweeper;
pub(crate) mod validate;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::crypto::hash_token;

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(pub Uuid);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Backend unreachable, failing, or slower than the configured timeout.
    Unavailable(String),
    /// No live record for the token. Never-issued, expired and already-used
    /// tokens all land here.
    NotFoundOrExpired,
    /// Rejected before any storage call.
    InvalidInput(String),
    DuplicateToken,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "Token storage unavailable: {msg}"),
            StoreError::NotFoundOrExpired => write!(f, "Token not found or expired"),
            StoreError::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            StoreError::DuplicateToken => write!(f, "Token already issued"),
        }
    }
}

impl std::error::Error for StoreError {}

/// A validated record ready to be written.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub id: RecordId,
    pub email: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Persistence seam behind [`TokenStore`].
///
/// `take_live` must find and delete in one atomic step: two concurrent calls
/// for the same hash may not both return an email.
#[async_trait]
pub trait RecordStorage: Send + Sync {
    async fn insert(&self, record: NewRecord) -> Result<RecordId, StoreError>;

    async fn take_live(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, StoreError>;

    /// Remove every record with `expires_at <= now`, returning how many went.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn RecordStorage>,
    timeout: Duration,
}

impl TokenStore {
    pub fn new(storage: Arc<dyn RecordStorage>, timeout: Duration) -> Self {
        Self { storage, timeout }
    }

    /// Store `token` for `email`, valid for `ttl` from now.
    ///
    /// Several live tokens for one email may coexist. A zero `ttl` is accepted
    /// and yields a record that can never be consumed.
    pub async fn issue(
        &self,
        email: &str,
        token: &str,
        ttl: Duration,
    ) -> Result<RecordId, StoreError> {
        let email = validate::email(email)?;
        validate::token(token)?;
        let ttl = validate::ttl(ttl)?;

        let created_at = Utc::now();
        let expires_at = created_at
            .checked_add_signed(ttl)
            .ok_or_else(|| StoreError::InvalidInput("ttl is out of range".to_string()))?;

        let record = NewRecord {
            id: RecordId(Uuid::now_v7()),
            email,
            token_hash: hash_token(token),
            expires_at,
            created_at,
        };

        let id = self.bounded(self.storage.insert(record)).await?;
        tracing::debug!(record_id = %id, %expires_at, "Password reset token issued");
        Ok(id)
    }

    /// Single-use lookup: returns the email and deletes the record if it is
    /// still live, otherwise `None`.
    pub async fn consume(&self, token: &str) -> Result<Option<String>, StoreError> {
        validate::token(token)?;

        let email = self
            .bounded(self.storage.take_live(&hash_token(token), Utc::now()))
            .await?;

        if email.is_some() {
            tracing::debug!("Password reset token consumed");
        }
        Ok(email)
    }

    /// Like [`consume`](Self::consume), with absence as [`StoreError::NotFoundOrExpired`].
    pub async fn redeem(&self, token: &str) -> Result<String, StoreError> {
        self.consume(token)
            .await?
            .ok_or(StoreError::NotFoundOrExpired)
    }

    /// Upper bound on a single storage call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        self.bounded(self.storage.delete_expired(Utc::now())).await
    }

    /// Start the background expiry sweep. It stops once `shutdown` flips to true.
    pub fn spawn_sweeper(
        &self,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        sweeper::spawn(self.clone(), interval, shutdown)
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Unavailable(format!(
                "storage call timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

use async_trait::async_trait;
use sqlx::PgPool;

use super::AccountStore;
use crate::db;
use crate::error::AppError;
use crate::models::Account;

#[derive(Clone)]
pub struct PgAccounts {
    pool: PgPool,
}

impl PgAccounts {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccounts {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        Ok(db::accounts::find_by_email(&self.pool, email).await?)
    }

    async fn update_password(&self, email: &str, password_hash: &str) -> Result<(), AppError> {
        if db::accounts::update_password(&self.pool, email, password_hash).await? {
            Ok(())
        } else {
            Err(AppError::NotFound("Account not found".to_string()))
        }
    }
}

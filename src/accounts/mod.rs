//! Account credentials touched by the reset flow: look up by email and swap
//! the password hash. Everything else about accounts lives elsewhere.

mod memory;
mod postgres;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::Account;

pub use memory::MemoryAccounts;
pub use postgres::PgAccounts;

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError>;

    /// Replace the password hash. `AppError::NotFound` if the account is gone.
    async fn update_password(&self, email: &str, password_hash: &str) -> Result<(), AppError>;
}

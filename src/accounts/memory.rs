use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::AccountStore;
use crate::error::AppError;
use crate::models::Account;

/// Accounts held in memory, keyed by lowercased email.
#[derive(Default)]
pub struct MemoryAccounts {
    accounts: DashMap<String, Account>,
}

impl MemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account with an already-hashed password.
    pub fn insert(&self, email: &str, password_hash: &str) -> Account {
        let email = email.to_lowercase();
        let now = Utc::now();
        let account = Account {
            id: Uuid::now_v7(),
            email: email.clone(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.accounts.insert(email, account.clone());
        account
    }

    pub fn get(&self, email: &str) -> Option<Account> {
        self.accounts
            .get(&email.to_lowercase())
            .map(|a| a.value().clone())
    }
}

#[async_trait]
impl AccountStore for MemoryAccounts {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        Ok(self.get(email))
    }

    async fn update_password(&self, email: &str, password_hash: &str) -> Result<(), AppError> {
        let mut account = self
            .accounts
            .get_mut(&email.to_lowercase())
            .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;
        account.password_hash = password_hash.to_string();
        account.updated_at = Utc::now();
        Ok(())
    }
}

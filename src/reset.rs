//! The two halves of a password reset: asking for a link, and using it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::accounts::AccountStore;
use crate::auth::password;
use crate::crypto::generate_token;
use crate::email::Mailer;
use crate::error::{AppError, INVALID_RESET_TOKEN};
use crate::rate_limit::ResetRequestLimiter;
use crate::store::{validate, RecordId, TokenStore};

pub struct PasswordResetService {
    store: TokenStore,
    accounts: Arc<dyn AccountStore>,
    mailer: Arc<dyn Mailer>,
    limiter: ResetRequestLimiter,
    token_ttl: Duration,
}

impl PasswordResetService {
    pub fn new(
        store: TokenStore,
        accounts: Arc<dyn AccountStore>,
        mailer: Arc<dyn Mailer>,
        token_ttl: Duration,
    ) -> Self {
        Self {
            store,
            accounts,
            mailer,
            limiter: ResetRequestLimiter::default(),
            token_ttl,
        }
    }

    #[must_use]
    pub fn with_limiter(mut self, limiter: ResetRequestLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn limiter(&self) -> &ResetRequestLimiter {
        &self.limiter
    }

    /// Issue a token for `email` and mail it in the background.
    ///
    /// `Ok(None)` when no account has that address. Callers must answer both
    /// cases identically.
    pub async fn request_reset(&self, email: &str) -> Result<Option<RecordId>, AppError> {
        let email = validate::email(email)?;

        if self.limiter.check(&email).is_err() {
            return Err(AppError::RateLimited(
                "Too many reset requests. Please try again later.".to_string(),
            ));
        }

        let Some(account) = self.bounded(self.accounts.find_by_email(&email)).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(None);
        };

        let token = generate_token();
        let record_id = self
            .store
            .issue(&account.email, &token, self.token_ttl)
            .await?;

        let mailer = self.mailer.clone();
        tokio::spawn(async move {
            // Delivery failures are the mailer's to log.
            let _ = mailer.send_password_reset(&account.email, &token).await;
        });

        tracing::info!(%record_id, "Password reset requested");
        Ok(Some(record_id))
    }

    /// Spend `token` and set the account's password to `new_password`.
    pub async fn complete_reset(&self, token: &str, new_password: &str) -> Result<(), AppError> {
        if new_password.len() < password::MIN_PASSWORD_LEN {
            return Err(AppError::BadRequest(format!(
                "Password must be at least {} characters",
                password::MIN_PASSWORD_LEN
            )));
        }

        // Hash first so a hashing failure cannot burn the token.
        let pw_hash = password::hash(new_password).map_err(AppError::Internal)?;

        let email = self.store.redeem(token.trim()).await?;
        self.bounded(self.accounts.update_password(&email, &pw_hash))
            .await
            .map_err(|e| match e {
                // Account removed while the token was outstanding.
                AppError::NotFound(_) => AppError::BadRequest(INVALID_RESET_TOKEN.to_string()),
                other => other,
            })?;

        tracing::info!("Password reset completed");
        Ok(())
    }

    /// Account calls share the token store's time budget.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, AppError>>,
    ) -> Result<T, AppError> {
        let budget = self.store.timeout();
        match tokio::time::timeout(budget, call).await {
            Ok(result) => result,
            Err(_) => Err(AppError::ServiceUnavailable(format!(
                "account call timed out after {}ms",
                budget.as_millis()
            ))),
        }
    }
}

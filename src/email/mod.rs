//! Delivery of reset tokens to users.
//!
//! A [`Mailer`] decides on its own what happens when delivery fails; callers
//! only see the returned error. Both implementations here log and drop.

pub mod templates;

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(&self, to_email: &str, token: &str) -> Result<(), String>;
}

fn reset_url(base_url: &str, token: &str) -> String {
    format!("{}/auth/reset-password?token={token}", base_url.trim_end_matches('/'))
}

pub struct SystemMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    base_url: String,
    token_ttl: Duration,
}

impl SystemMailer {
    pub fn new(config: &SmtpConfig, base_url: &str, token_ttl: Duration) -> Result<Self, String> {
        let creds = Credentials::new(config.user.clone(), config.pass.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| format!("System SMTP error: {e}"))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            transport,
            from: config.from.clone(),
            base_url: base_url.to_string(),
            token_ttl,
        })
    }

    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), String> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| format!("Invalid from address: {e}"))?,
            )
            .to(to.parse().map_err(|e| format!("Invalid to address: {e}"))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| format!("Failed to build email: {e}"))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| format!("Failed to send email: {e}"))?;

        Ok(())
    }
}

#[async_trait]
impl Mailer for SystemMailer {
    async fn send_password_reset(&self, to_email: &str, token: &str) -> Result<(), String> {
        let url = reset_url(&self.base_url, token);
        let html = templates::render_password_reset(&url, self.token_ttl.as_secs() / 60);
        let result = self.send(to_email, "Reset your password", &html).await;
        if let Err(e) = &result {
            tracing::error!("Failed to send password reset email: {e}");
        }
        result
    }
}

/// Stand-in when no SMTP relay is configured: the link goes to the log.
pub struct LogMailer {
    base_url: String,
}

impl LogMailer {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(&self, to_email: &str, token: &str) -> Result<(), String> {
        tracing::warn!(
            "System SMTP not configured. Password reset link for {to_email}: {}",
            reset_url(&self.base_url, token)
        );
        Ok(())
    }
}

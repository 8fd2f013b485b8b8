use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};

use reset_store::accounts::MemoryAccounts;
use reset_store::auth::password;
use reset_store::config::{Config, StoreBackend};
use reset_store::email::Mailer;
use reset_store::reset::PasswordResetService;
use reset_store::state::AppState;
use reset_store::store::{MemoryStorage, RecordStorage, TokenStore};

pub const STUDENT_EMAIL: &str = "student@test.com";
pub const STUDENT_PASSWORD: &str = "password123";

/// Hands every outgoing reset mail to the test instead of an SMTP relay.
pub struct ChannelMailer {
    sent: mpsc::UnboundedSender<(String, String)>,
}

#[async_trait]
impl Mailer for ChannelMailer {
    async fn send_password_reset(&self, to_email: &str, token: &str) -> Result<(), String> {
        self.sent
            .send((to_email.to_string(), token.to_string()))
            .map_err(|e| e.to_string())
    }
}

/// A running test server backed by the given record storage and in-memory accounts.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub accounts: Arc<MemoryAccounts>,
    pub store: TokenStore,
    mail: Mutex<mpsc::UnboundedReceiver<(String, String)>>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn forgot_password(&self, email: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/forgot-password"))
            .json(&json!({ "email": email }))
            .send()
            .await
            .expect("forgot-password request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn reset_password(&self, token: &str, password: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/reset-password"))
            .json(&json!({ "token": token, "password": password }))
            .send()
            .await
            .expect("reset-password request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Wait for the next reset mail and return (recipient, token).
    pub async fn next_mail(&self) -> (String, String) {
        let mut mail = self.mail.lock().await;
        tokio::time::timeout(Duration::from_secs(2), mail.recv())
            .await
            .expect("no reset mail sent")
            .expect("mail channel closed")
    }

    /// True if a mail arrives within `wait`.
    pub async fn mail_sent_within(&self, wait: Duration) -> bool {
        let mut mail = self.mail.lock().await;
        tokio::time::timeout(wait, mail.recv()).await.is_ok()
    }

    /// Ask for a reset for the seeded student and return the mailed token.
    pub async fn student_reset_token(&self) -> String {
        let (body, status) = self.forgot_password(STUDENT_EMAIL).await;
        assert_eq!(status, StatusCode::OK, "forgot-password failed: {body}");
        let (to, token) = self.next_mail().await;
        assert_eq!(to, STUDENT_EMAIL);
        token
    }
}

pub fn test_config() -> Config {
    Config {
        backend: StoreBackend::Memory,
        database_url: None,
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        base_url: "http://localhost:0".to_string(),
        reset_token_ttl: Duration::from_secs(600),
        storage_timeout: Duration::from_secs(2),
        sweep_interval: Duration::from_secs(60),
        max_connections: 2,
        log_level: "warn".to_string(),
        smtp: None,
        seed_accounts: Vec::new(),
    }
}

/// Spawn a test app on in-memory storage.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(Arc::new(MemoryStorage::new())).await
}

/// Spawn a test app on the given storage, with one seeded student account.
pub async fn spawn_app_with(storage: Arc<dyn RecordStorage>) -> TestApp {
    let config = test_config();

    let accounts = Arc::new(MemoryAccounts::new());
    accounts.insert(STUDENT_EMAIL, &password::hash(STUDENT_PASSWORD).unwrap());

    let store = TokenStore::new(storage, config.storage_timeout);
    let (tx, rx) = mpsc::unbounded_channel();
    let resets = PasswordResetService::new(
        store.clone(),
        accounts.clone(),
        Arc::new(ChannelMailer { sent: tx }),
        config.reset_token_ttl,
    );

    let state = Arc::new(AppState { config, resets });
    let app = reset_store::build_app(state);

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    // Spawn server in background
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        addr,
        client: Client::new(),
        accounts,
        store,
        mail: Mutex::new(rx),
    }
}

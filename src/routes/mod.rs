pub mod auth;

use axum::routing::post;
use axum::Router;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/api/v1/auth/forgot-password", post(auth::forgot_password))
        .route("/api/v1/auth/reset-password", post(auth::reset_password))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::accounts::MemoryAccounts;
    use crate::config::{Config, StoreBackend};
    use crate::email::LogMailer;
    use crate::reset::PasswordResetService;
    use crate::state::AppState;
    use crate::store::{MemoryStorage, TokenStore};

    fn router() -> Router {
        let config = Config {
            backend: StoreBackend::Memory,
            database_url: None,
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
            base_url: "http://localhost".to_string(),
            reset_token_ttl: Duration::from_secs(600),
            storage_timeout: Duration::from_secs(1),
            sweep_interval: Duration::from_secs(60),
            max_connections: 1,
            log_level: "warn".to_string(),
            smtp: None,
            seed_accounts: Vec::new(),
        };
        let accounts = Arc::new(MemoryAccounts::new());
        accounts.insert("known@x.com", "hash");
        let store = TokenStore::new(Arc::new(MemoryStorage::new()), config.storage_timeout);
        let resets = PasswordResetService::new(
            store,
            accounts,
            Arc::new(LogMailer::new(&config.base_url)),
            config.reset_token_ttl,
        );
        api_routes().with_state(Arc::new(AppState { config, resets }))
    }

    async fn post_json(app: Router, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    #[tokio::test]
    async fn forgot_password_is_non_committal() {
        let app = router();

        let (known_status, known) = post_json(
            app.clone(),
            "/api/v1/auth/forgot-password",
            r#"{"email":"known@x.com"}"#,
        )
        .await;
        let (unknown_status, unknown) = post_json(
            app,
            "/api/v1/auth/forgot-password",
            r#"{"email":"unknown@x.com"}"#,
        )
        .await;

        assert_eq!(known_status, StatusCode::OK);
        assert_eq!(unknown_status, StatusCode::OK);
        assert_eq!(known, unknown);
        assert_eq!(known["message"], auth::FORGOT_PASSWORD_MESSAGE);
    }

    #[tokio::test]
    async fn reset_password_with_unknown_token_is_bad_request() {
        let (status, body) = post_json(
            router(),
            "/api/v1/auth/reset-password",
            r#"{"token":"never-issued","password":"long-enough"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], crate::error::INVALID_RESET_TOKEN);
    }

    #[tokio::test]
    async fn missing_fields_are_rejected_by_the_extractor() {
        let (status, _) = post_json(router(), "/api/v1/auth/reset-password", r#"{"token":"t"}"#).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}

pub mod accounts;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod db;
pub mod email;
pub mod error;
pub mod models;
pub mod rate_limit;
pub mod reset;
pub mod routes;
pub mod state;
pub mod store;

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::email::{LogMailer, Mailer, SystemMailer};
use crate::state::SharedState;

pub fn build_app(state: SharedState) -> Router {
    Router::new()
        .merge(routes::api_routes())
        .route("/health", axum::routing::get(health))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .with_state(state)
}

/// SMTP when configured, otherwise a mailer that only logs the link.
pub fn build_mailer(config: &Config) -> Arc<dyn Mailer> {
    if let Some(smtp) = &config.smtp {
        match SystemMailer::new(smtp, &config.base_url, config.reset_token_ttl) {
            Ok(mailer) => {
                tracing::info!("System SMTP configured");
                return Arc::new(mailer);
            }
            Err(e) => tracing::warn!("System SMTP not available: {e}"),
        }
    }
    Arc::new(LogMailer::new(&config.base_url))
}

async fn health() -> &'static str {
    "ok"
}

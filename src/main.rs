use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use reset_store::accounts::{AccountStore, MemoryAccounts, PgAccounts};
use reset_store::auth::password;
use reset_store::config::{Config, StoreBackend};
use reset_store::reset::PasswordResetService;
use reset_store::state::AppState;
use reset_store::store::{MemoryStorage, PgStorage, RecordStorage, TokenStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let config = Config::from_env().expect("Failed to load configuration");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(&config.log_level)
        }))
        .init();

    tracing::info!("Starting reset-store");

    let (storage, accounts, pool) = match config.backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or("DATABASE_URL is required for the postgres backend")?;

            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(config.storage_timeout)
                .connect(url)
                .await
                .expect("Failed to connect to database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("Failed to run migrations");

            tracing::info!("Migrations applied");

            (
                Arc::new(PgStorage::new(pool.clone())) as Arc<dyn RecordStorage>,
                Arc::new(PgAccounts::new(pool.clone())) as Arc<dyn AccountStore>,
                Some(pool),
            )
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory storage; tokens and accounts are lost on restart");

            let accounts = MemoryAccounts::new();
            for (email, plain) in &config.seed_accounts {
                accounts.insert(email, &password::hash(plain)?);
            }
            if config.seed_accounts.is_empty() {
                tracing::warn!(
                    "No RESET_STORE_SEED_ACCOUNTS given; every reset request will match no account"
                );
            } else {
                tracing::info!("Seeded {} in-memory accounts", config.seed_accounts.len());
            }

            (
                Arc::new(MemoryStorage::new()) as Arc<dyn RecordStorage>,
                Arc::new(accounts) as Arc<dyn AccountStore>,
                None,
            )
        }
    };

    let store = TokenStore::new(storage, config.storage_timeout);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = store.spawn_sweeper(config.sweep_interval, shutdown_rx.clone());

    let mailer = reset_store::build_mailer(&config);
    let resets = PasswordResetService::new(store, accounts, mailer, config.reset_token_ttl);
    let state = Arc::new(AppState {
        config: config.clone(),
        resets,
    });

    let limiter_state = state.clone();
    let mut limiter_shutdown = shutdown_rx;
    let limiter_cleanup = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(10 * 60)) => {
                    limiter_state.resets.limiter().cleanup(Duration::from_secs(60 * 60));
                }
                _ = limiter_shutdown.changed() => break,
            }
        }
    });

    let addr = SocketAddr::new(config.host, config.port);
    let app = reset_store::build_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    let _ = sweeper.await;
    let _ = limiter_cleanup.await;

    if let Some(pool) = pool {
        pool.close().await;
        tracing::info!("Database pool closed");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

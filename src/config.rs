use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub host: IpAddr,
    pub port: u16,
    pub base_url: String,
    pub reset_token_ttl: Duration,
    pub storage_timeout: Duration,
    pub sweep_interval: Duration,
    pub max_connections: u32,
    pub log_level: String,
    pub smtp: Option<SmtpConfig>,
    /// `(email, password)` pairs loaded into the memory account store at startup.
    pub seed_accounts: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let env_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let backend = match env_or("RESET_STORE_BACKEND", "postgres").as_str() {
            "postgres" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => return Err(format!("Invalid RESET_STORE_BACKEND: {other}")),
        };

        let database_url = lookup("DATABASE_URL");
        if backend == StoreBackend::Postgres && database_url.is_none() {
            return Err("Missing required environment variable: DATABASE_URL".to_string());
        }

        let host: IpAddr = env_or("RESET_STORE_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid RESET_STORE_HOST: {e}"))?;

        let port: u16 = env_or("RESET_STORE_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid RESET_STORE_PORT: {e}"))?;

        let base_url = env_or("RESET_STORE_BASE_URL", &format!("http://{host}:{port}"));

        let reset_token_ttl = Duration::from_secs(
            env_or("RESET_STORE_TOKEN_TTL_SECS", "3600")
                .parse()
                .map_err(|e| format!("Invalid RESET_STORE_TOKEN_TTL_SECS: {e}"))?,
        );
        if reset_token_ttl.is_zero() {
            return Err("RESET_STORE_TOKEN_TTL_SECS must be positive".to_string());
        }

        let storage_timeout = Duration::from_millis(
            env_or("RESET_STORE_TIMEOUT_MS", "5000")
                .parse()
                .map_err(|e| format!("Invalid RESET_STORE_TIMEOUT_MS: {e}"))?,
        );

        let sweep_interval = Duration::from_secs(
            env_or("RESET_STORE_SWEEP_INTERVAL_SECS", "60")
                .parse()
                .map_err(|e| format!("Invalid RESET_STORE_SWEEP_INTERVAL_SECS: {e}"))?,
        );
        if sweep_interval.is_zero() {
            return Err("RESET_STORE_SWEEP_INTERVAL_SECS must be positive".to_string());
        }

        let max_connections: u32 = env_or("RESET_STORE_MAX_CONNECTIONS", "10")
            .parse()
            .map_err(|e| format!("Invalid RESET_STORE_MAX_CONNECTIONS: {e}"))?;

        let log_level = env_or("RESET_STORE_LOG_LEVEL", "info");

        let smtp = match (
            lookup("RESET_STORE_SMTP_HOST"),
            lookup("RESET_STORE_SMTP_PORT"),
            lookup("RESET_STORE_SMTP_USER"),
            lookup("RESET_STORE_SMTP_PASS"),
            lookup("RESET_STORE_SMTP_FROM"),
        ) {
            (Some(host), Some(port), Some(user), Some(pass), Some(from)) => Some(SmtpConfig {
                host,
                port: port
                    .parse()
                    .map_err(|e| format!("Invalid RESET_STORE_SMTP_PORT: {e}"))?,
                user,
                pass,
                from,
            }),
            _ => None,
        };

        let seed_accounts = match lookup("RESET_STORE_SEED_ACCOUNTS") {
            Some(raw) => parse_seed_accounts(&raw)?,
            None => Vec::new(),
        };
        if backend == StoreBackend::Postgres && !seed_accounts.is_empty() {
            return Err(
                "RESET_STORE_SEED_ACCOUNTS is only supported with the memory backend".to_string(),
            );
        }

        Ok(Config {
            backend,
            database_url,
            host,
            port,
            base_url,
            reset_token_ttl,
            storage_timeout,
            sweep_interval,
            max_connections,
            log_level,
            smtp,
            seed_accounts,
        })
    }
}

/// `email=password` entries separated by commas.
fn parse_seed_accounts(raw: &str) -> Result<Vec<(String, String)>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((email, password)) if !email.trim().is_empty() && !password.is_empty() => {
                Ok((email.trim().to_string(), password.to_string()))
            }
            _ => Err(format!(
                "Invalid RESET_STORE_SEED_ACCOUNTS entry, expected email=password: {entry}"
            )),
        })
        .collect()
}

//! Application configuration loaded from environment variables and config files.
//!
//! Supports `.env` files for development and environment variables for production.
//! Config precedence: env vars > .env file > config.toml > defaults

use serde::Deserialize;

/// Free-tier message ceiling of the store-and-forward transport, in bytes.
pub const DEFAULT_FREE_MAX_BYTES: u64 = 24_000;
/// Paid-tier message ceiling of the store-and-forward transport, in bytes.
pub const DEFAULT_PAID_MAX_BYTES: u64 = 512 * 1024;

/// Load the application configuration from the process environment.
///
/// Called once at startup; the result is handed to whatever needs it.
pub fn init() -> Result<AppConfig, config::ConfigError> {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();

    load(config::Environment::with_prefix("BAZAAR"))
}

/// Build an [`AppConfig`] from defaults, an optional `config.toml`, and the given
/// environment source (`BAZAAR__DATABASE__URL`, `BAZAAR__RETRY__INTERVAL_SECS`, ...).
pub fn load(env: config::Environment) -> Result<AppConfig, config::ConfigError> {
    let cfg = config::Config::builder()
        // Defaults
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8090)?
        .set_default("database.url", "sqlite://bazaar.db?mode=rwc")?
        .set_default("database.max_connections", 8)?
        .set_default("database.min_connections", 1)?
        .set_default("transport.relay_url", "http://127.0.0.1:51735")?
        .set_default("transport.free_max_bytes", DEFAULT_FREE_MAX_BYTES)?
        .set_default("transport.paid_max_bytes", DEFAULT_PAID_MAX_BYTES)?
        .set_default("transport.timeout_secs", 30)?
        .set_default("directory.url", "http://127.0.0.1:3000/api/directory")?
        .set_default("directory.timeout_secs", 10)?
        .set_default("retry.interval_secs", 60)?
        .set_default("retry.batch_size", 10)?
        .set_default("retry.min_age_secs", 120)?
        .set_default("cleanup.interval_secs", 3600)?
        .set_default("limits.max_message_length", 2000)?
        .set_default("wallet.name", "market")?
        // Optional config file
        .add_source(config::File::with_name("config").required(false))
        // Environment variables (BAZAAR__SERVER__HOST, BAZAAR__DATABASE__URL, etc.)
        .add_source(env.separator("__").try_parsing(true))
        .build()?;

    cfg.try_deserialize()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub transport: TransportConfig,
    pub directory: DirectoryConfig,
    pub retry: RetryConfig,
    pub cleanup: CleanupConfig,
    pub limits: LimitsConfig,
    pub wallet: WalletConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    /// Port for the transport delivery webhook and health endpoint.
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// sqlx connection URL (e.g. `sqlite://bazaar.db?mode=rwc`)
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TransportConfig {
    /// Base URL of the store-and-forward relay daemon.
    pub relay_url: String,
    /// Envelope ceiling for free-retention messages.
    pub free_max_bytes: u64,
    /// Envelope ceiling for paid-retention messages.
    pub paid_max_bytes: u64,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DirectoryConfig {
    /// Business-object directory (listings / orders) base URL.
    pub url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Sleep between retry scheduler ticks.
    pub interval_secs: u64,
    /// Max waiting items fetched per tick.
    pub batch_size: u32,
    /// Items younger than this are still in first-pass handling and are skipped.
    pub min_age_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CleanupConfig {
    pub interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    pub max_message_length: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WalletConfig {
    /// Wallet that owns the node's default identity.
    pub name: String,
}

//! # bazaar-db
//!
//! Channel store for Bazaar messaging. Persists channels, participants,
//! messages, per-identity follows, local identities, and the transport item
//! ledger. Every query goes through `sqlx::AnyPool`; statements are written in
//! the SQLite dialect and rely on native `INSERT ... ON CONFLICT DO NOTHING`
//! for race-tolerant provisioning.

pub mod repository;

use anyhow::Result;
use sqlx::{any::AnyPoolOptions, AnyPool};

/// Shared database handle passed to every repository call.
#[derive(Clone)]
pub struct Database {
    pub pool: AnyPool,
}

impl Database {
    /// Connect using the application database config.
    pub async fn connect(config: &bazaar_common::config::DatabaseConfig) -> Result<Self> {
        tracing::info!("Connecting to channel store...");
        let db = Self::connect_url(&config.url, config.max_connections, config.min_connections)
            .await?;
        tracing::info!("Connected to channel store");
        Ok(db)
    }

    /// Connect to an explicit sqlx URL.
    pub async fn connect_url(url: &str, max_connections: u32, min_connections: u32) -> Result<Self> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    /// Open a private in-memory store with the schema applied.
    ///
    /// An SQLite memory database lives and dies with its connection, so the
    /// pool is pinned to exactly one connection that never expires.
    pub async fn connect_in_memory() -> Result<Self> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running channel store migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Health check: verify the store is reachable.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

pub mod commands;
pub mod error;
pub mod lots;
pub mod models;
pub mod portfolio;
pub mod schema;
pub mod telemetry;

use chrono::Duration;
use diesel::sqlite::SqliteConnection;
use diesel::prelude::*;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use dotenvy::dotenv;
use std::env;

pub use error::LedgerError;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Satoshis per whole BTC; also the fixed-point scale of every asset quantity.
pub const SATS_PER_BTC: i64 = 100_000_000;

pub const BTC: &str = "BTC";

pub fn establish_connection() -> anyhow::Result<SqliteConnection> {
    dotenv().ok();

    let database_url = env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

    let mut conn = SqliteConnection::establish(&database_url)
        .map_err(|e| anyhow::anyhow!("Error connecting to {}: {}", database_url, e))?;
    run_migrations(&mut conn)?;

    Ok(conn)
}

pub fn run_migrations(conn: &mut SqliteConnection) -> anyhow::Result<()> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("Error running migrations: {}", e))?;
    for version in applied {
        tracing::info!(%version, "applied migration");
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Reflection period during which a purchase cannot be sold back.
    pub lock_period_hours: i64,
    /// Smallest BTC value, in sats, a single trade may move.
    pub min_trade_sats: i64,
    /// BTC every user starts with before any trade.
    pub starting_balance_sats: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_period_hours: 24,
            min_trade_sats: 100_000,
            starting_balance_sats: SATS_PER_BTC,
        }
    }
}

impl LedgerConfig {
    pub fn lock_period(&self) -> Duration {
        Duration::hours(self.lock_period_hours)
    }
}

/// Integer division rounding half up. Both operands must be non-negative.
pub fn rounding_div(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder * 2 >= denominator {
        quotient + 1
    } else {
        quotient
    }
}

fn env_i64(key: &str, default: i64) -> Result<i64, LedgerError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|e| LedgerError::Config(format!("{} must be an integer, got '{}': {}", key, raw, e))),
        Err(_) => Ok(default),
    }
}

pub fn load_ledger_config() -> Result<LedgerConfig, LedgerError> {
    dotenv().ok();
    let defaults = LedgerConfig::default();
    let config = LedgerConfig {
        lock_period_hours: env_i64("LOCK_PERIOD_HOURS", defaults.lock_period_hours)?,
        min_trade_sats: env_i64("MIN_TRADE_SATS", defaults.min_trade_sats)?,
        starting_balance_sats: env_i64("STARTING_BALANCE_SATS", defaults.starting_balance_sats)?,
    };

    if config.lock_period_hours < 0 {
        return Err(LedgerError::Config(format!(
            "LOCK_PERIOD_HOURS must not be negative, got {}", config.lock_period_hours
        )));
    }
    if config.min_trade_sats <= 0 {
        return Err(LedgerError::Config(format!(
            "MIN_TRADE_SATS must be positive, got {}", config.min_trade_sats
        )));
    }
    if config.starting_balance_sats < 0 {
        return Err(LedgerError::Config(format!(
            "STARTING_BALANCE_SATS must not be negative, got {}", config.starting_balance_sats
        )));
    }

    Ok(config)
}

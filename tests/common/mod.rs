#![allow(dead_code)]

use chrono::{Duration, NaiveDateTime};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::io::Write;
use tempfile::NamedTempFile;

use sats_ledger::commands::price::set_price;
use sats_ledger::commands::trade::{execute_trade, ExecutedTrade, TradeRequest};
use sats_ledger::models::{Purchase, Trade};
use sats_ledger::schema::{purchases, trades};
use sats_ledger::{LedgerConfig, LedgerError};

pub fn setup_test_db() -> SqliteConnection {
    let mut conn = SqliteConnection::establish(":memory:")
        .expect("Failed to create in-memory SQLite connection");
    sats_ledger::run_migrations(&mut conn).expect("Failed to run migrations");
    conn
}

pub fn default_config() -> LedgerConfig {
    LedgerConfig::default()
}

pub fn dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").expect("bad test timestamp")
}

/// BTC at $50,000 and AAPL at $200, i.e. 400,000 sats per share.
pub fn seed_prices(conn: &mut SqliteConnection) {
    let at = dt("2024-01-01 00:00:00");
    set_price(conn, "BTC", "$50,000.00", Some("Bitcoin"), Some("crypto"), at).unwrap();
    set_price(conn, "AAPL", "$200.00", Some("Apple Inc."), Some("stock"), at).unwrap();
}

pub fn request(user: &str, from: &str, to: &str, amount: i64, asset_cents: i64, at: &str) -> TradeRequest {
    TradeRequest {
        username: user.to_string(),
        from: from.to_string(),
        to: to.to_string(),
        amount,
        btc_price_usd_cents: 5_000_000,
        asset_price_usd_cents: asset_cents,
        at: dt(at),
    }
}

pub fn run_trade(
    conn: &mut SqliteConnection,
    config: &LedgerConfig,
    req: &TradeRequest,
) -> Result<ExecutedTrade, LedgerError> {
    conn.transaction::<_, LedgerError, _>(|conn| execute_trade(conn, config, req))
}

/// A purchase row as it would come back from the database.
pub fn purchase(id: i32, amount: i64, btc_spent: i64, created_at: NaiveDateTime) -> Purchase {
    Purchase {
        id,
        username: "alice".to_string(),
        asset_symbol: "AAPL".to_string(),
        amount,
        btc_spent,
        purchase_price_usd_cents: 20_000,
        btc_price_usd_cents: 5_000_000,
        locked_until: created_at + Duration::hours(24),
        created_at,
    }
}

pub fn create_trades_csv(records: &[(&str, &str, &str, &str, &str, &str, &str)]) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .expect("Failed to create temp CSV file");
    writeln!(file, "Date,User,From,To,Amount,BtcPrice,AssetPrice").unwrap();
    for (date, user, from, to, amount, btc_price, asset_price) in records {
        writeln!(file, "{},{},{},{},{},\"{}\",\"{}\"", date, user, from, to, amount, btc_price, asset_price).unwrap();
    }
    file.flush().unwrap();
    file
}

pub fn read_report_rows(path: &std::path::Path) -> Vec<csv::StringRecord> {
    let mut rdr = csv::Reader::from_path(path).expect("Failed to open report");
    rdr.records().filter_map(|r| r.ok()).collect()
}

pub fn get_purchases(conn: &mut SqliteConnection) -> Vec<Purchase> {
    purchases::table
        .order(purchases::id.asc())
        .select(Purchase::as_select())
        .load(conn)
        .expect("Failed to load purchases")
}

pub fn get_trades(conn: &mut SqliteConnection) -> Vec<Trade> {
    trades::table
        .order(trades::id.asc())
        .select(Trade::as_select())
        .load(conn)
        .expect("Failed to load trades")
}

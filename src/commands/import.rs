use std::path::PathBuf;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::commands::trade::{execute_trade, TradeRequest};
use crate::models::TradeRecord;
use crate::{LedgerConfig, LedgerError};

/// Replays a CSV of historical trades (`Date,User,From,To,Amount,BtcPrice,AssetPrice`)
/// oldest-first. Either every row is recorded or none is.
pub fn import_trades(file: &PathBuf, conn: &mut SqliteConnection, config: &LedgerConfig) -> anyhow::Result<usize> {
    let mut rdr = csv::Reader::from_path(file)
        .map_err(|e| anyhow::anyhow!("Error reading file {:?}: {}", file, e))?;

    let mut records: Vec<TradeRecord> = Vec::new();
    for (row, result) in rdr.deserialize::<TradeRecord>().enumerate() {
        let record = result.map_err(|e| anyhow::anyhow!("Error parsing trade CSV row {}: {}", row + 1, e))?;
        records.push(record);
    }
    records.sort_by_key(|r| r.date);

    let imported = conn.transaction::<usize, LedgerError, _>(|conn| {
        for record in &records {
            let request = TradeRequest {
                username: record.user.trim().to_string(),
                from: record.from.clone(),
                to: record.to.clone(),
                amount: record.amount,
                btc_price_usd_cents: record.btc_price,
                asset_price_usd_cents: record.asset_price,
                at: record.date,
            };
            if let Err(e) = execute_trade(conn, config, &request) {
                tracing::warn!(
                    user = %request.username, from = %request.from, to = %request.to,
                    date = %request.at, error = %e,
                    "trade rejected, rolling back import"
                );
                return Err(e);
            }
        }
        Ok(records.len())
    })?;

    tracing::info!(file = ?file, imported, "imported trades");
    Ok(imported)
}

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use chrono::Utc;
use diesel::sqlite::SqliteConnection;

use crate::lots::FifoSale;
use crate::models::{cents_to_usd, units_to_decimal, TradeHistoryRow};
use crate::portfolio::{load_snapshot, LedgerSnapshot};
use crate::{LedgerError, BTC};

/// FIFO match of every asset→BTC trade in the snapshot, replayed from the
/// full ledger, keyed by trade id.
pub fn realized_sales(snapshot: &LedgerSnapshot) -> Result<HashMap<i32, FifoSale>, LedgerError> {
    let mut sales = HashMap::new();

    let sold_assets: BTreeSet<&str> = snapshot.trades.iter()
        .filter(|t| t.from_asset != BTC)
        .map(|t| t.from_asset.as_str())
        .collect();

    for asset in sold_assets {
        let (_, matched) = snapshot.replay(asset)?;
        for (trade, sale) in snapshot.sales_for(asset).into_iter().zip(matched) {
            sales.insert(trade.id, sale);
        }
    }

    Ok(sales)
}

/// Writes `history_<user>.csv` listing every trade; sales carry their FIFO
/// cost basis and realized gain in sats.
pub fn history(username: &str, out_dir: &Path, conn: &mut SqliteConnection) -> anyhow::Result<PathBuf> {
    let snapshot = load_snapshot(conn, username, Utc::now().naive_utc())?;
    let sales = realized_sales(&snapshot)?;

    let file_path = out_dir.join(format!("history_{}.csv", username));
    let mut wtr = csv::Writer::from_path(&file_path)?;

    let mut total_cost = 0i64;
    let mut total_realized = 0i64;

    for trade in &snapshot.trades {
        let sale = sales.get(&trade.id);
        let cost_basis_sats = sale.map(|s| s.btc_cost);
        let realized_sats = sale.map(|s| trade.to_amount - s.btc_cost);
        total_cost += cost_basis_sats.unwrap_or(0);
        total_realized += realized_sats.unwrap_or(0);

        wtr.serialize(TradeHistoryRow {
            date: trade.created_at,
            from: trade.from_asset.clone(),
            to: trade.to_asset.clone(),
            from_amount: units_to_decimal(trade.from_amount),
            to_amount: units_to_decimal(trade.to_amount),
            btc_price_usd: cents_to_usd(trade.btc_price_usd_cents),
            asset_price_usd: cents_to_usd(trade.asset_price_usd_cents),
            cost_basis_sats,
            realized_sats,
        })?;
    }

    if !snapshot.trades.is_empty() {
        wtr.write_record(&[
            String::from(""),
            String::from(""),
            String::from(""),
            String::from(""),
            String::from(""),
            String::from(""),
            String::from(""),
            total_cost.to_string(),
            total_realized.to_string(),
        ])?;
    }
    wtr.flush()?;

    tracing::info!(user = %username, trades = snapshot.trades.len(), total_realized, path = ?file_path, "wrote trade history");
    Ok(file_path)
}

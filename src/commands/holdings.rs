use std::path::{Path, PathBuf};

use diesel::sqlite::SqliteConnection;

use crate::commands::report_instant;
use crate::models::{units_to_decimal, HoldingRow};
use crate::portfolio::{load_prices_in_sats, load_snapshot, value_portfolio};
use crate::LedgerConfig;

/// Writes `holdings_<user>_<date>.csv` valuing every position in sats at the
/// current cached prices. Returns the path written.
pub fn holdings(
    username: &str,
    date: Option<&str>,
    out_dir: &Path,
    config: &LedgerConfig,
    conn: &mut SqliteConnection,
) -> anyhow::Result<PathBuf> {
    let as_of = report_instant(date)?;
    let snapshot = load_snapshot(conn, username, as_of)?;
    let prices = load_prices_in_sats(conn)?;
    let portfolio = value_portfolio(&snapshot, config, &prices)?;

    let file_path = out_dir.join(format!("holdings_{}_{}.csv", username, as_of.date()));
    let mut wtr = csv::Writer::from_path(&file_path)?;

    let mut total_value = 0i64;
    let mut total_cost = 0i64;

    for holding in &portfolio.holdings {
        let row = HoldingRow {
            asset: holding.asset.clone(),
            amount: units_to_decimal(holding.amount),
            locked: units_to_decimal(holding.locked),
            sellable: units_to_decimal(holding.sellable),
            price_sats: holding.price_sats,
            value_sats: holding.value_sats,
            cost_basis_sats: holding.cost_basis_sats,
            unrealized_sats: holding.unrealized_sats(),
        };
        total_value += row.value_sats;
        total_cost += row.cost_basis_sats;

        wtr.serialize(row)?;
    }

    wtr.write_record(&[
        String::from("TOTAL"),
        String::from(""),
        String::from(""),
        String::from(""),
        String::from(""),
        total_value.to_string(),
        total_cost.to_string(),
        (total_value - total_cost).to_string(),
    ])?;
    wtr.flush()?;

    tracing::info!(user = %username, %as_of, total_value, path = ?file_path, "wrote holdings report");
    Ok(file_path)
}

use std::path::{Path, PathBuf};

use diesel::sqlite::SqliteConnection;

use crate::commands::report_instant;
use crate::lots::lot_statuses;
use crate::models::{units_to_decimal, LotStatusRow};
use crate::portfolio::load_snapshot;

/// Writes `purchases_<user>_<asset>_<date>.csv`: one row per purchase lot with
/// its remaining quantity and whether it is still inside the reflection lock.
pub fn purchases(
    username: &str,
    asset: &str,
    date: Option<&str>,
    out_dir: &Path,
    conn: &mut SqliteConnection,
) -> anyhow::Result<PathBuf> {
    let asset = asset.trim().to_uppercase();
    let now = report_instant(date)?;
    let snapshot = load_snapshot(conn, username, now)?;
    let lots = snapshot.lots_for(&asset)?;

    let file_path = out_dir.join(format!("purchases_{}_{}_{}.csv", username, asset, now.date()));
    let mut wtr = csv::Writer::from_path(&file_path)?;

    for status in lot_statuses(&lots, now) {
        wtr.serialize(LotStatusRow {
            purchase_id: status.purchase_id,
            purchased_at: status.created_at,
            locked_until: status.locked_until,
            amount: units_to_decimal(status.amount),
            remaining: units_to_decimal(status.remaining),
            btc_spent_sats: status.btc_spent,
            locked: status.locked,
            // round partial minutes up so a locked lot never shows 0
            unlocks_in_minutes: status.unlocks_in.map(|d| (d.num_seconds() + 59) / 60),
        })?;
    }
    wtr.flush()?;

    tracing::info!(user = %username, %asset, lots = lots.len(), path = ?file_path, "wrote purchase lock report");
    Ok(file_path)
}

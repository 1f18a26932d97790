pub mod history;
pub mod holdings;
pub mod import;
pub mod price;
pub mod purchases;
pub mod trade;

use chrono::{NaiveDateTime, Utc};

use crate::models::parse_date_str;

/// Resolves the instant a report is run for: the end of the given day, or
/// the current time when no date is provided.
pub fn report_instant(date: Option<&str>) -> anyhow::Result<NaiveDateTime> {
    match date {
        Some(date) => {
            let parsed = parse_date_str(date).map_err(|e| anyhow::anyhow!(e))?;
            parsed
                .date()
                .and_hms_opt(23, 59, 59)
                .ok_or_else(|| anyhow::anyhow!("Invalid report date {}", date))
        }
        None => Ok(Utc::now().naive_utc()),
    }
}

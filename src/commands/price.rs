use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::models::{parse_usd_cents, Asset, NewAsset};
use crate::schema::assets;
use crate::LedgerError;

/// Inserts or refreshes an asset's cached USD price.
pub fn set_price(
    conn: &mut SqliteConnection,
    symbol: &str,
    price: &str,
    name: Option<&str>,
    asset_type: Option<&str>,
    now: NaiveDateTime,
) -> Result<Asset, LedgerError> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(LedgerError::InvalidAmount(String::from("asset symbol must not be empty")));
    }
    let cents = parse_usd_cents(price).map_err(LedgerError::InvalidAmount)?;

    conn.transaction::<Asset, LedgerError, _>(|conn| {
        let existing: Option<Asset> = assets::table
            .find(&symbol)
            .select(Asset::as_select())
            .first::<Asset>(conn)
            .optional()?;

        match existing {
            Some(asset) => {
                diesel::update(assets::table.find(&symbol))
                    .set((
                        assets::current_price_usd_cents.eq(cents),
                        assets::last_updated.eq(now),
                        assets::name.eq(name.unwrap_or(asset.name.as_str())),
                        assets::asset_type.eq(asset_type.unwrap_or(asset.asset_type.as_str())),
                    ))
                    .execute(conn)?;
                tracing::info!(%symbol, old_cents = asset.current_price_usd_cents, cents, "updated asset price");
            }
            None => {
                let new_asset = NewAsset {
                    symbol: symbol.clone(),
                    name: name.unwrap_or(symbol.as_str()).to_string(),
                    asset_type: asset_type.unwrap_or("crypto").to_string(),
                    current_price_usd_cents: cents,
                    last_updated: now,
                };
                diesel::insert_into(assets::table)
                    .values(&new_asset)
                    .execute(conn)?;
                tracing::info!(%symbol, cents, "added asset");
            }
        }

        Ok(assets::table
            .find(&symbol)
            .select(Asset::as_select())
            .first::<Asset>(conn)?)
    })
}

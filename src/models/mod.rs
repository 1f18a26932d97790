use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::schema::{assets, purchases, trades};
use crate::SATS_PER_BTC;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq, Serialize)]
#[diesel(table_name = assets)]
#[diesel(primary_key(symbol))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Asset {
    pub symbol: String,
    pub name: String,
    pub asset_type: String,
    pub current_price_usd_cents: i64,
    pub last_updated: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = assets)]
pub struct NewAsset {
    pub symbol: String,
    pub name: String,
    pub asset_type: String,
    pub current_price_usd_cents: i64,
    pub last_updated: NaiveDateTime,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq, Serialize)]
#[diesel(table_name = purchases)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Purchase {
    pub id: i32,
    pub username: String,
    pub asset_symbol: String,
    pub amount: i64,
    pub btc_spent: i64,
    pub purchase_price_usd_cents: i64,
    pub btc_price_usd_cents: i64,
    pub locked_until: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = purchases)]
pub struct NewPurchase {
    pub username: String,
    pub asset_symbol: String,
    pub amount: i64,
    pub btc_spent: i64,
    pub purchase_price_usd_cents: i64,
    pub btc_price_usd_cents: i64,
    pub locked_until: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq, Serialize)]
#[diesel(table_name = trades)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Trade {
    pub id: i32,
    pub username: String,
    pub from_asset: String,
    pub to_asset: String,
    pub from_amount: i64,
    pub to_amount: i64,
    pub btc_price_usd_cents: i64,
    pub asset_price_usd_cents: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = trades)]
pub struct NewTrade {
    pub username: String,
    pub from_asset: String,
    pub to_asset: String,
    pub from_amount: i64,
    pub to_amount: i64,
    pub btc_price_usd_cents: i64,
    pub asset_price_usd_cents: i64,
    pub created_at: NaiveDateTime,
}

/// One row of a historical trade import.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TradeRecord {
    #[serde(deserialize_with = "deserialize_date")]
    pub date: NaiveDateTime,
    pub user: String,
    pub from: String,
    pub to: String,
    #[serde(deserialize_with = "deserialize_units")]
    pub amount: i64,
    #[serde(deserialize_with = "deserialize_price")]
    pub btc_price: i64,
    #[serde(deserialize_with = "deserialize_price")]
    pub asset_price: i64,
}

pub fn parse_date_str(s: &str) -> Result<NaiveDateTime, String> {
    let date_formats = [
        "%m/%d/%y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%m/%d/%y %I:%M %p",
        "%m/%d/%y",
        "%m/%d/%Y",
        "%Y-%m-%d",
    ];

    for format in &date_formats {
        if let Ok(parsed_date) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(parsed_date);
        }
        if let Ok(parsed_date) = NaiveDate::parse_from_str(s, format) {
            if let Some(midnight) = parsed_date.and_hms_opt(0, 0, 0) {
                return Ok(midnight);
            }
        }
    }

    Err(format!("Invalid date format: {}", s))
}

/// Parses a USD price such as `$45,000.00` into integer cents.
pub fn parse_usd_cents(s: &str) -> Result<i64, String> {
    let cleaned = s.trim().replace('$', "").replace(',', "");
    let price = Decimal::from_str_exact(&cleaned)
        .map_err(|e| format!("Invalid Price format: {}\nError: {}", s, e))?;
    if price <= Decimal::ZERO {
        return Err(format!("Price must be positive, got {}", s));
    }
    (price * Decimal::from(100)).round()
        .to_i64()
        .ok_or_else(|| format!("Price out of range: {}", s))
}

/// Parses a decimal quantity (`0.5`, `12.00000001`) into its ×10^8 fixed-point
/// integer. More than eight decimal places or a negative sign is rejected.
pub fn parse_units(s: &str) -> Result<i64, String> {
    let cleaned = s.trim().replace(',', "");
    let units = Decimal::from_str_exact(&cleaned)
        .map_err(|e| format!("Invalid amount format: {}\nError: {}", s, e))?;
    if units.is_sign_negative() && !units.is_zero() {
        return Err(format!("Amount must not be negative, got {}", s));
    }
    let scaled = units * Decimal::from(SATS_PER_BTC);
    if !scaled.fract().is_zero() {
        return Err(format!("Amount {} has more than 8 decimal places", s));
    }
    scaled.to_i64().ok_or_else(|| format!("Amount out of range: {}", s))
}

/// Renders a ×10^8 fixed-point integer as a decimal quantity.
pub fn units_to_decimal(units: i64) -> Decimal {
    (Decimal::from(units) / dec!(100_000_000)).normalize()
}

pub fn cents_to_usd(cents: i64) -> Decimal {
    (Decimal::from(cents) / dec!(100)).round_dp(2)
}

pub fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let date_str = String::deserialize(deserializer)?;
    parse_date_str(&date_str).map_err(de::Error::custom)
}

pub fn deserialize_price<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let price_str = String::deserialize(deserializer)?;
    parse_usd_cents(&price_str).map_err(de::Error::custom)
}

pub fn deserialize_units<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let units_str = String::deserialize(deserializer)?;
    parse_units(&units_str).map_err(de::Error::custom)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct HoldingRow {
    pub asset: String,
    pub amount: Decimal,
    pub locked: Decimal,
    pub sellable: Decimal,
    pub price_sats: i64,
    pub value_sats: i64,
    pub cost_basis_sats: i64,
    pub unrealized_sats: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LotStatusRow {
    pub purchase_id: i32,
    pub purchased_at: NaiveDateTime,
    pub locked_until: NaiveDateTime,
    pub amount: Decimal,
    pub remaining: Decimal,
    pub btc_spent_sats: i64,
    pub locked: bool,
    pub unlocks_in_minutes: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TradeHistoryRow {
    pub date: NaiveDateTime,
    pub from: String,
    pub to: String,
    pub from_amount: Decimal,
    pub to_amount: Decimal,
    pub btc_price_usd: Decimal,
    pub asset_price_usd: Decimal,
    pub cost_basis_sats: Option<i64>,
    pub realized_sats: Option<i64>,
}

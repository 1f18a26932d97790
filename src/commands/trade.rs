use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::lots::{self, FifoSale};
use crate::models::{parse_units, Asset, NewPurchase, NewTrade, Trade};
use crate::portfolio::load_snapshot;
use crate::schema::{assets, purchases, trades};
use crate::{LedgerConfig, LedgerError, BTC};

/// A conversion between BTC and one other asset at fixed USD prices.
#[derive(Debug, Clone)]
pub struct TradeRequest {
    pub username: String,
    pub from: String,
    pub to: String,
    pub amount: i64,
    pub btc_price_usd_cents: i64,
    pub asset_price_usd_cents: i64,
    pub at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct ExecutedTrade {
    pub trade: Trade,
    /// Set when BTC bought an asset.
    pub locked_until: Option<NaiveDateTime>,
    /// Set when an asset was sold back to BTC.
    pub fifo: Option<FifoSale>,
}

impl ExecutedTrade {
    pub fn realized_sats(&self) -> Option<i64> {
        self.fifo.as_ref().map(|sale| self.trade.to_amount - sale.btc_cost)
    }
}

pub fn find_asset(conn: &mut SqliteConnection, symbol: &str) -> Result<Asset, LedgerError> {
    assets::table
        .find(symbol)
        .select(Asset::as_select())
        .first::<Asset>(conn)
        .optional()?
        .ok_or_else(|| LedgerError::UnknownAsset(symbol.to_string()))
}

/// Most recent trade time recorded for `username`, if any.
pub fn latest_trade_at(
    conn: &mut SqliteConnection,
    username: &str,
) -> Result<Option<NaiveDateTime>, LedgerError> {
    Ok(trades::table
        .filter(trades::username.eq(username))
        .order((trades::created_at.desc(), trades::id.desc()))
        .select(trades::created_at)
        .first::<NaiveDateTime>(conn)
        .optional()?)
}

/// Validates and records one trade. Callers own the surrounding transaction.
///
/// Trades are appended in time order per user; one dated before the user's
/// latest trade is rejected.
pub fn execute_trade(
    conn: &mut SqliteConnection,
    config: &LedgerConfig,
    request: &TradeRequest,
) -> Result<ExecutedTrade, LedgerError> {
    let username = request.username.trim().to_string();
    if username.is_empty() {
        return Err(LedgerError::InvalidAmount(String::from("username must not be empty")));
    }
    let from = request.from.trim().to_uppercase();
    let to = request.to.trim().to_uppercase();
    if from == to || (from != BTC && to != BTC) {
        return Err(LedgerError::UnsupportedPair { from, to });
    }
    lots::validate_amount(request.amount, "trade amount")?;

    let asset = if from == BTC { to.clone() } else { from.clone() };
    find_asset(conn, &asset)?;
    let price_sats = lots::price_in_sats(request.asset_price_usd_cents, request.btc_price_usd_cents)?;
    if let Some(latest) = latest_trade_at(conn, &username)? {
        if request.at < latest {
            return Err(LedgerError::OutOfOrder { at: request.at, latest });
        }
    }
    let snapshot = load_snapshot(conn, &username, request.at)?;

    let new_trade = |to_amount: i64| NewTrade {
        username: username.clone(),
        from_asset: from.clone(),
        to_asset: to.clone(),
        from_amount: request.amount,
        to_amount,
        btc_price_usd_cents: request.btc_price_usd_cents,
        asset_price_usd_cents: request.asset_price_usd_cents,
        created_at: request.at,
    };

    if from == BTC {
        if request.amount < config.min_trade_sats {
            return Err(LedgerError::BelowMinimumTradeSize {
                value_sats: request.amount,
                minimum_sats: config.min_trade_sats,
            });
        }
        let available = snapshot.btc_balance(config)?;
        if request.amount > available {
            return Err(LedgerError::InsufficientBalance {
                asset: BTC.to_string(),
                requested: request.amount,
                available,
            });
        }
        let units = lots::units_for_sats(request.amount, price_sats)?;
        if units == 0 {
            return Err(LedgerError::InvalidAmount(format!(
                "{} sats buys no {} at {} sats per unit", request.amount, asset, price_sats
            )));
        }

        let trade: Trade = diesel::insert_into(trades::table)
            .values(&new_trade(units))
            .returning(Trade::as_returning())
            .get_result(conn)?;

        let locked_until = request.at + config.lock_period();
        let purchase = NewPurchase {
            username: username.clone(),
            asset_symbol: asset.clone(),
            amount: units,
            btc_spent: request.amount,
            purchase_price_usd_cents: request.asset_price_usd_cents,
            btc_price_usd_cents: request.btc_price_usd_cents,
            locked_until,
            created_at: request.at,
        };
        diesel::insert_into(purchases::table)
            .values(&purchase)
            .execute(conn)?;

        tracing::info!(
            user = %username, %asset, sats = request.amount, units, %locked_until,
            "bought asset with BTC"
        );

        Ok(ExecutedTrade { trade, locked_until: Some(locked_until), fifo: None })
    } else {
        let proceeds = lots::current_value(request.amount, price_sats)?;
        if proceeds < config.min_trade_sats {
            return Err(LedgerError::BelowMinimumTradeSize {
                value_sats: proceeds,
                minimum_sats: config.min_trade_sats,
            });
        }

        let open = snapshot.lots_for(&asset)?;
        let sale = lots::compute_fifo_cost_basis(&open, request.amount, request.at)?;

        let trade: Trade = diesel::insert_into(trades::table)
            .values(&new_trade(proceeds))
            .returning(Trade::as_returning())
            .get_result(conn)?;

        tracing::info!(
            user = %username, %asset, units = request.amount, proceeds,
            cost_basis = sale.btc_cost, lots = sale.consumed.len(),
            "sold asset for BTC"
        );

        Ok(ExecutedTrade { trade, locked_until: None, fifo: Some(sale) })
    }
}

/// Executes a trade at the current cached prices in its own transaction.
pub fn trade(
    conn: &mut SqliteConnection,
    config: &LedgerConfig,
    username: &str,
    from: &str,
    to: &str,
    amount: &str,
    now: NaiveDateTime,
) -> Result<ExecutedTrade, LedgerError> {
    let amount = parse_units(amount).map_err(LedgerError::InvalidAmount)?;

    conn.transaction::<ExecutedTrade, LedgerError, _>(|conn| {
        let btc = find_asset(conn, BTC)?;
        let other = if from.trim().eq_ignore_ascii_case(BTC) { to } else { from };
        let asset = find_asset(conn, &other.trim().to_uppercase())?;

        let request = TradeRequest {
            username: username.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            amount,
            btc_price_usd_cents: btc.current_price_usd_cents,
            asset_price_usd_cents: asset.current_price_usd_cents,
            at: now,
        };
        execute_trade(conn, config, &request)
    })
}

//! Holdings derived from a user's ledger snapshot.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::lots::{self, FifoSale, Lot};
use crate::models::{Asset, Purchase, Trade};
use crate::schema::{assets, purchases, trades};
use crate::{LedgerConfig, LedgerError, BTC, SATS_PER_BTC};

/// Every purchase and trade a user had recorded at `as_of`.
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    pub username: String,
    pub as_of: NaiveDateTime,
    pub purchases: Vec<Purchase>,
    pub trades: Vec<Trade>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetHolding {
    pub asset: String,
    pub amount: i64,
    pub locked: i64,
    pub sellable: i64,
    pub price_sats: i64,
    pub value_sats: i64,
    pub cost_basis_sats: i64,
}

impl AssetHolding {
    pub fn unrealized_sats(&self) -> i64 {
        self.value_sats - self.cost_basis_sats
    }
}

#[derive(Debug, Clone)]
pub struct Portfolio {
    pub username: String,
    pub as_of: NaiveDateTime,
    pub holdings: Vec<AssetHolding>,
}

impl Portfolio {
    pub fn total_value_sats(&self) -> i64 {
        self.holdings.iter().map(|h| h.value_sats).sum()
    }

    pub fn holding(&self, asset: &str) -> Option<&AssetHolding> {
        self.holdings.iter().find(|h| h.asset == asset)
    }
}

pub fn load_snapshot(
    conn: &mut SqliteConnection,
    username: &str,
    as_of: NaiveDateTime,
) -> Result<LedgerSnapshot, LedgerError> {
    let user_purchases: Vec<Purchase> = purchases::table
        .filter(purchases::username.eq(username))
        .filter(purchases::created_at.le(as_of))
        .order((purchases::created_at.asc(), purchases::id.asc()))
        .select(Purchase::as_select())
        .load(conn)?;

    let user_trades: Vec<Trade> = trades::table
        .filter(trades::username.eq(username))
        .filter(trades::created_at.le(as_of))
        .order((trades::created_at.asc(), trades::id.asc()))
        .select(Trade::as_select())
        .load(conn)?;

    Ok(LedgerSnapshot {
        username: username.to_string(),
        as_of,
        purchases: user_purchases,
        trades: user_trades,
    })
}

impl LedgerSnapshot {
    pub fn btc_balance(&self, config: &LedgerConfig) -> Result<i64, LedgerError> {
        let received: i64 = self.trades.iter()
            .filter(|t| t.to_asset == BTC)
            .map(|t| t.to_amount)
            .sum();
        let spent: i64 = self.trades.iter()
            .filter(|t| t.from_asset == BTC)
            .map(|t| t.from_amount)
            .sum();
        let balance = config.starting_balance_sats + received - spent;
        if balance < 0 {
            return Err(LedgerError::LedgerInconsistent(format!(
                "BTC balance of {} is negative ({} sats)", self.username, balance
            )));
        }
        Ok(balance)
    }

    /// Units of `asset` sold back to BTC.
    pub fn sold_amount(&self, asset: &str) -> i64 {
        self.trades.iter()
            .filter(|t| t.from_asset == asset)
            .map(|t| t.from_amount)
            .sum()
    }

    pub fn bought_amount(&self, asset: &str) -> i64 {
        self.trades.iter()
            .filter(|t| t.to_asset == asset)
            .map(|t| t.to_amount)
            .sum()
    }

    pub fn purchases_for(&self, asset: &str) -> Vec<Purchase> {
        self.purchases.iter()
            .filter(|p| p.asset_symbol == asset)
            .cloned()
            .collect()
    }

    /// Trades selling `asset` back to BTC, in ledger order.
    pub fn sales_for(&self, asset: &str) -> Vec<&Trade> {
        self.trades.iter()
            .filter(|t| t.from_asset == asset)
            .collect()
    }

    /// Replays every sale of `asset` at its own time over the purchases that
    /// existed then. Returns the open lots and each sale's FIFO match.
    pub fn replay(&self, asset: &str) -> Result<(Vec<Lot>, Vec<FifoSale>), LedgerError> {
        let open = lots::open_lots(&self.purchases_for(asset))?;
        let sales: Vec<(NaiveDateTime, i64)> = self.sales_for(asset)
            .iter()
            .map(|t| (t.created_at, t.from_amount))
            .collect();
        lots::replay_sales(open, &sales)
    }

    pub fn lots_for(&self, asset: &str) -> Result<Vec<Lot>, LedgerError> {
        Ok(self.replay(asset)?.0)
    }

    /// Non-BTC assets this user has ever bought.
    pub fn assets_held(&self) -> BTreeSet<String> {
        self.purchases.iter().map(|p| p.asset_symbol.clone()).collect()
    }

    /// Purchase rows and trade rows must describe the same acquisitions.
    pub fn check_conservation(&self, asset: &str) -> Result<(), LedgerError> {
        let purchased: i64 = self.purchases.iter()
            .filter(|p| p.asset_symbol == asset)
            .map(|p| p.amount)
            .sum();
        let bought = self.bought_amount(asset);
        if purchased != bought {
            return Err(LedgerError::LedgerInconsistent(format!(
                "{} purchases total {} units but trades into it total {}", asset, purchased, bought
            )));
        }
        let held = lots::holding_amount(&self.lots_for(asset)?);
        let sold = self.sold_amount(asset);
        if held != bought - sold {
            return Err(LedgerError::LedgerInconsistent(format!(
                "{} lots hold {} units but trades leave {}", asset, held, bought - sold
            )));
        }
        Ok(())
    }
}

/// Current price of every known asset expressed in sats per whole unit.
pub fn load_prices_in_sats(conn: &mut SqliteConnection) -> Result<HashMap<String, i64>, LedgerError> {
    let all_assets: Vec<Asset> = assets::table
        .select(Asset::as_select())
        .load(conn)?;

    let btc_cents = all_assets.iter()
        .find(|a| a.symbol == BTC)
        .map(|a| a.current_price_usd_cents)
        .ok_or_else(|| LedgerError::UnknownAsset(BTC.to_string()))?;

    let mut prices = HashMap::with_capacity(all_assets.len());
    for asset in &all_assets {
        let price = if asset.symbol == BTC {
            SATS_PER_BTC
        } else {
            lots::price_in_sats(asset.current_price_usd_cents, btc_cents)?
        };
        prices.insert(asset.symbol.clone(), price);
    }
    Ok(prices)
}

pub fn value_portfolio(
    snapshot: &LedgerSnapshot,
    config: &LedgerConfig,
    prices_sats: &HashMap<String, i64>,
) -> Result<Portfolio, LedgerError> {
    let btc = snapshot.btc_balance(config)?;
    let mut holdings = vec![AssetHolding {
        asset: BTC.to_string(),
        amount: btc,
        locked: 0,
        sellable: btc,
        price_sats: SATS_PER_BTC,
        value_sats: btc,
        cost_basis_sats: btc,
    }];

    for asset in snapshot.assets_held() {
        snapshot.check_conservation(&asset)?;
        let lots = snapshot.lots_for(&asset)?;
        let amount = lots::holding_amount(&lots);
        if amount == 0 {
            continue;
        }
        let price_sats = *prices_sats
            .get(&asset)
            .ok_or_else(|| LedgerError::UnknownAsset(asset.clone()))?;

        holdings.push(AssetHolding {
            amount,
            locked: lots::locked_amount(&lots, snapshot.as_of),
            sellable: lots::sellable_amount(&lots, snapshot.as_of),
            price_sats,
            value_sats: lots::current_value(amount, price_sats)?,
            cost_basis_sats: lots::remaining_cost_basis(&lots),
            asset,
        });
    }

    Ok(Portfolio {
        username: snapshot.username.clone(),
        as_of: snapshot.as_of,
        holdings,
    })
}

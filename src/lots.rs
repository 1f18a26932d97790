//! FIFO lot accounting over time-locked purchases.
//!
//! Every function here is pure: it takes a snapshot of a user's purchases for
//! one asset and returns derived quantities. Purchases are never mutated;
//! consumption by earlier sales is replayed virtually with [`replay_sales`].
//!
//! All quantities are ×10^8 fixed-point integers and all values are sats.

use chrono::{Duration, NaiveDateTime};

use crate::models::Purchase;
use crate::{rounding_div, LedgerError, SATS_PER_BTC};

/// A purchase together with the part of it not yet consumed by sales.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lot {
    pub purchase_id: i32,
    pub amount: i64,
    pub remaining: i64,
    pub btc_spent: i64,
    pub locked_until: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

impl Lot {
    /// A lot is locked in its entirety until `locked_until`; it is never split.
    pub fn is_locked(&self, now: NaiveDateTime) -> bool {
        now < self.locked_until
    }

    fn consumed(&self) -> i64 {
        self.amount - self.remaining
    }

    /// Cost of the first `quantity` units of this lot.
    fn cost_through(&self, quantity: i64) -> i64 {
        if self.amount <= 0 {
            return 0;
        }
        rounding_div(
            self.btc_spent as i128 * quantity as i128,
            self.amount as i128,
        ) as i64
    }
}

impl From<&Purchase> for Lot {
    fn from(purchase: &Purchase) -> Self {
        Self {
            purchase_id: purchase.id,
            amount: purchase.amount,
            remaining: purchase.amount,
            btc_spent: purchase.btc_spent,
            locked_until: purchase.locked_until,
            created_at: purchase.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotConsumption {
    pub purchase_id: i32,
    pub consumed: i64,
    pub btc_cost: i64,
}

/// Result of matching a sale against unlocked lots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FifoSale {
    pub amount: i64,
    pub btc_cost: i64,
    pub consumed: Vec<LotConsumption>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotStatus {
    pub purchase_id: i32,
    pub amount: i64,
    pub remaining: i64,
    pub btc_spent: i64,
    pub created_at: NaiveDateTime,
    pub locked_until: NaiveDateTime,
    pub locked: bool,
    pub unlocks_in: Option<Duration>,
}

pub fn validate_amount(amount: i64, what: &str) -> Result<i64, LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount(format!(
            "{} must be positive, got {}", what, amount
        )));
    }
    Ok(amount)
}

/// Orders purchases oldest-first as lots with nothing yet consumed.
pub fn open_lots(purchases: &[Purchase]) -> Result<Vec<Lot>, LedgerError> {
    let mut lots = Vec::with_capacity(purchases.len());
    for purchase in purchases {
        validate_amount(purchase.amount, "purchase amount")?;
        if purchase.btc_spent < 0 {
            return Err(LedgerError::InvalidAmount(format!(
                "purchase {} has negative btc_spent {}", purchase.id, purchase.btc_spent
            )));
        }
        lots.push(Lot::from(purchase));
    }
    lots.sort_by_key(|lot| (lot.created_at, lot.purchase_id));
    Ok(lots)
}

/// Replays `sales` (`(sold_at, amount)` in ledger order) against `lots`.
///
/// Each sale is matched with [`compute_fifo_cost_basis`] at its own time over
/// the lots that existed then, so it takes exactly the lots that were
/// unlocked when it ran. Returns the lots with their remaining quantities and
/// the match of every sale in input order.
pub fn replay_sales(
    mut lots: Vec<Lot>,
    sales: &[(NaiveDateTime, i64)],
) -> Result<(Vec<Lot>, Vec<FifoSale>), LedgerError> {
    let mut matched = Vec::with_capacity(sales.len());

    for &(sold_at, amount) in sales {
        let existing: Vec<Lot> = lots.iter()
            .filter(|lot| lot.created_at <= sold_at)
            .cloned()
            .collect();
        let sale = compute_fifo_cost_basis(&existing, amount, sold_at).map_err(|e| match e {
            LedgerError::InsufficientUnlockedBalance { requested, available } => {
                LedgerError::LedgerInconsistent(format!(
                    "sale of {} units at {} exceeds the {} units unlocked then",
                    requested, sold_at, available
                ))
            }
            other => other,
        })?;

        for consumption in &sale.consumed {
            if let Some(lot) = lots.iter_mut().find(|l| l.purchase_id == consumption.purchase_id) {
                lot.remaining -= consumption.consumed;
            }
        }
        matched.push(sale);
    }

    Ok((lots, matched))
}

/// Units that may be sold at `now`: the remainder of every unlocked lot.
pub fn sellable_amount(lots: &[Lot], now: NaiveDateTime) -> i64 {
    lots.iter()
        .filter(|lot| !lot.is_locked(now))
        .map(|lot| lot.remaining)
        .sum()
}

pub fn locked_amount(lots: &[Lot], now: NaiveDateTime) -> i64 {
    lots.iter()
        .filter(|lot| lot.is_locked(now))
        .map(|lot| lot.remaining)
        .sum()
}

pub fn holding_amount(lots: &[Lot]) -> i64 {
    lots.iter().map(|lot| lot.remaining).sum()
}

/// Matches `sale_amount` against unlocked lots oldest-first, whatever order
/// `lots` is given in.
///
/// The cost taken from a lot is its `btc_spent` prorated by the units
/// consumed, computed as the difference of cumulative rounded costs so that
/// fully consuming a lot over several sales costs exactly its `btc_spent`.
/// Fails without consuming anything when the sale exceeds the sellable amount.
pub fn compute_fifo_cost_basis(
    lots: &[Lot],
    sale_amount: i64,
    now: NaiveDateTime,
) -> Result<FifoSale, LedgerError> {
    validate_amount(sale_amount, "sale amount")?;
    for lot in lots {
        if lot.amount <= 0 || lot.remaining < 0 || lot.remaining > lot.amount {
            return Err(LedgerError::InvalidAmount(format!(
                "lot {} has remaining {} of amount {}", lot.purchase_id, lot.remaining, lot.amount
            )));
        }
    }

    let available = sellable_amount(lots, now);
    if sale_amount > available {
        return Err(LedgerError::InsufficientUnlockedBalance {
            requested: sale_amount,
            available,
        });
    }

    let mut remaining_sale = sale_amount;
    let mut btc_cost: i64 = 0;
    let mut consumed = Vec::new();

    let mut unlocked: Vec<&Lot> = lots.iter()
        .filter(|lot| !lot.is_locked(now) && lot.remaining > 0)
        .collect();
    unlocked.sort_by_key(|lot| (lot.created_at, lot.purchase_id));

    for lot in unlocked {
        if remaining_sale == 0 {
            break;
        }
        let take = remaining_sale.min(lot.remaining);
        let already = lot.consumed();
        let cost = lot.cost_through(already + take) - lot.cost_through(already);

        btc_cost = btc_cost.checked_add(cost).ok_or(LedgerError::Overflow)?;
        consumed.push(LotConsumption {
            purchase_id: lot.purchase_id,
            consumed: take,
            btc_cost: cost,
        });
        remaining_sale -= take;
    }

    Ok(FifoSale {
        amount: sale_amount,
        btc_cost,
        consumed,
    })
}

/// Cost in sats still attached to the unconsumed part of every lot.
pub fn remaining_cost_basis(lots: &[Lot]) -> i64 {
    lots.iter()
        .map(|lot| lot.btc_spent - lot.cost_through(lot.consumed()))
        .sum()
}

/// Value in sats of `amount` units priced at `price_sats` per whole unit.
pub fn current_value(amount: i64, price_sats: i64) -> Result<i64, LedgerError> {
    if amount < 0 || price_sats < 0 {
        return Err(LedgerError::InvalidAmount(format!(
            "cannot value {} units at {} sats", amount, price_sats
        )));
    }
    let value = rounding_div(amount as i128 * price_sats as i128, SATS_PER_BTC as i128);
    i64::try_from(value).map_err(|_| LedgerError::Overflow)
}

/// Sats per one whole unit of an asset given both USD prices in cents.
pub fn price_in_sats(asset_usd_cents: i64, btc_usd_cents: i64) -> Result<i64, LedgerError> {
    if asset_usd_cents <= 0 || btc_usd_cents <= 0 {
        return Err(LedgerError::InvalidAmount(format!(
            "prices must be positive, got asset {} and BTC {} cents", asset_usd_cents, btc_usd_cents
        )));
    }
    let price = rounding_div(
        asset_usd_cents as i128 * SATS_PER_BTC as i128,
        btc_usd_cents as i128,
    );
    i64::try_from(price).map_err(|_| LedgerError::Overflow)
}

/// Units of an asset bought by spending `sats` at `price_sats` per unit.
pub fn units_for_sats(sats: i64, price_sats: i64) -> Result<i64, LedgerError> {
    validate_amount(sats, "sats spent")?;
    if price_sats <= 0 {
        return Err(LedgerError::InvalidAmount(format!(
            "price must be positive, got {} sats", price_sats
        )));
    }
    let units = rounding_div(sats as i128 * SATS_PER_BTC as i128, price_sats as i128);
    i64::try_from(units).map_err(|_| LedgerError::Overflow)
}

pub fn lot_statuses(lots: &[Lot], now: NaiveDateTime) -> Vec<LotStatus> {
    lots.iter()
        .map(|lot| {
            let locked = lot.is_locked(now);
            LotStatus {
                purchase_id: lot.purchase_id,
                amount: lot.amount,
                remaining: lot.remaining,
                btc_spent: lot.btc_spent,
                created_at: lot.created_at,
                locked_until: lot.locked_until,
                locked,
                unlocks_in: locked.then(|| lot.locked_until - now),
            }
        })
        .collect()
}

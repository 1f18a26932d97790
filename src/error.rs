use thiserror::Error;

/// Errors raised while validating or executing ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Insufficient unlocked balance: requested {requested}, sellable {available}")]
    InsufficientUnlockedBalance { requested: i64, available: i64 },

    #[error("Insufficient {asset} balance: requested {requested}, available {available}")]
    InsufficientBalance { asset: String, requested: i64, available: i64 },

    #[error("Trade value of {value_sats} sats is below the minimum of {minimum_sats} sats")]
    BelowMinimumTradeSize { value_sats: i64, minimum_sats: i64 },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unknown asset '{0}'")]
    UnknownAsset(String),

    #[error("Unsupported trade pair {from} -> {to}: exactly one side must be BTC")]
    UnsupportedPair { from: String, to: String },

    #[error("Trade at {at} predates the latest recorded trade at {latest}")]
    OutOfOrder { at: chrono::NaiveDateTime, latest: chrono::NaiveDateTime },

    #[error("Ledger inconsistent: {0}")]
    LedgerInconsistent(String),

    #[error("Arithmetic overflow in fixed-point computation")]
    Overflow,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
}

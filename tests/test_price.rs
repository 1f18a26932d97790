mod common;

use common::{dt, setup_test_db};
use sats_ledger::commands::price::set_price;
use sats_ledger::portfolio::load_prices_in_sats;
use sats_ledger::LedgerError;

#[test]
fn test_set_price_inserts_then_updates() {
    let mut conn = setup_test_db();

    let asset = set_price(&mut conn, "eth", "$2,500.00", Some("Ether"), None, dt("2024-01-01 00:00:00")).unwrap();
    assert_eq!(asset.symbol, "ETH");
    assert_eq!(asset.name, "Ether");
    assert_eq!(asset.asset_type, "crypto");
    assert_eq!(asset.current_price_usd_cents, 250_000);

    let updated = set_price(&mut conn, "ETH", "$3,000.00", None, None, dt("2024-01-02 00:00:00")).unwrap();
    assert_eq!(updated.name, "Ether");
    assert_eq!(updated.current_price_usd_cents, 300_000);
    assert_eq!(updated.last_updated, dt("2024-01-02 00:00:00"));
}

#[test]
fn test_set_price_rejects_bad_price() {
    let mut conn = setup_test_db();
    let err = set_price(&mut conn, "ETH", "free", None, None, dt("2024-01-01 00:00:00")).unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(_)));
}

#[test]
fn test_prices_in_sats_require_btc() {
    let mut conn = setup_test_db();
    set_price(&mut conn, "ETH", "$2,500.00", None, None, dt("2024-01-01 00:00:00")).unwrap();
    assert!(matches!(load_prices_in_sats(&mut conn), Err(LedgerError::UnknownAsset(ref s)) if s == "BTC"));

    set_price(&mut conn, "BTC", "$50,000.00", None, None, dt("2024-01-01 00:00:00")).unwrap();
    let prices = load_prices_in_sats(&mut conn).unwrap();
    assert_eq!(prices["BTC"], 100_000_000);
    assert_eq!(prices["ETH"], 5_000_000);
}

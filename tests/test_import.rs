mod common;

use common::{
    create_trades_csv, default_config, dt, get_purchases, get_trades, request, run_trade, seed_prices,
    setup_test_db,
};
use sats_ledger::commands::import::import_trades;

#[test]
fn test_import_buy_and_sell() {
    let mut conn = setup_test_db();
    let config = default_config();
    seed_prices(&mut conn);

    let csv = create_trades_csv(&[
        ("2024-01-01 10:00:00", "alice", "BTC", "AAPL", "0.1", "$50,000.00", "$200.00"),
        ("2024-01-03 10:00:00", "alice", "AAPL", "BTC", "10", "$50,000.00", "$250.00"),
    ]);
    let count = import_trades(&csv.path().to_path_buf(), &mut conn, &config).unwrap();
    assert_eq!(count, 2);

    let trades = get_trades(&mut conn);
    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].to_amount, 2_500_000_000);
    assert_eq!(trades[1].from_amount, 1_000_000_000);
    assert_eq!(trades[1].to_amount, 5_000_000);
    assert_eq!(trades[1].asset_price_usd_cents, 25_000);

    let purchases = get_purchases(&mut conn);
    assert_eq!(purchases.len(), 1);
    assert_eq!(purchases[0].created_at, dt("2024-01-01 10:00:00"));
}

#[test]
fn test_import_sorts_by_date() {
    let mut conn = setup_test_db();
    let config = default_config();
    seed_prices(&mut conn);

    // sale listed before the purchase it depends on
    let csv = create_trades_csv(&[
        ("01/05/2024", "alice", "AAPL", "BTC", "5", "$50,000.00", "$200.00"),
        ("01/01/2024", "alice", "BTC", "AAPL", "0.1", "$50,000.00", "$200.00"),
    ]);
    import_trades(&csv.path().to_path_buf(), &mut conn, &config).unwrap();

    let trades = get_trades(&mut conn);
    assert_eq!(trades[0].from_asset, "BTC");
    assert_eq!(trades[1].from_asset, "AAPL");
}

#[test]
fn test_import_rolls_back_on_rejected_trade() {
    let mut conn = setup_test_db();
    let config = default_config();
    seed_prices(&mut conn);

    let csv = create_trades_csv(&[
        ("2024-01-01 10:00:00", "alice", "BTC", "AAPL", "0.1", "$50,000.00", "$200.00"),
        ("2024-01-01 12:00:00", "alice", "AAPL", "BTC", "10", "$50,000.00", "$200.00"),
    ]);
    let err = import_trades(&csv.path().to_path_buf(), &mut conn, &config).unwrap_err();
    assert!(err.to_string().contains("Insufficient unlocked balance"), "{}", err);

    assert!(get_trades(&mut conn).is_empty());
    assert!(get_purchases(&mut conn).is_empty());
}

#[test]
fn test_import_rejects_malformed_rows() {
    let mut conn = setup_test_db();
    let config = default_config();
    seed_prices(&mut conn);

    let csv = create_trades_csv(&[
        ("2024-01-01 10:00:00", "alice", "BTC", "AAPL", "0.123456789", "$50,000.00", "$200.00"),
    ]);
    let err = import_trades(&csv.path().to_path_buf(), &mut conn, &config).unwrap_err();
    assert!(err.to_string().contains("row 1"), "{}", err);
    assert!(get_trades(&mut conn).is_empty());
}

#[test]
fn test_import_unknown_asset() {
    let mut conn = setup_test_db();
    let config = default_config();
    seed_prices(&mut conn);

    let csv = create_trades_csv(&[
        ("2024-01-01 10:00:00", "alice", "BTC", "DOGE", "0.1", "$50,000.00", "$0.10"),
    ]);
    let err = import_trades(&csv.path().to_path_buf(), &mut conn, &config).unwrap_err();
    assert!(err.to_string().contains("Unknown asset 'DOGE'"), "{}", err);
}

#[test]
fn test_import_rejects_rows_older_than_recorded_trades() {
    let mut conn = setup_test_db();
    let config = default_config();
    seed_prices(&mut conn);

    // the whole starting balance is already spent on the 5th
    run_trade(&mut conn, &config, &request("alice", "BTC", "AAPL", 100_000_000, 20_000, "2024-01-05 10:00:00")).unwrap();

    let csv = create_trades_csv(&[
        ("2024-01-01 10:00:00", "alice", "BTC", "AAPL", "0.5", "$50,000.00", "$200.00"),
    ]);
    let err = import_trades(&csv.path().to_path_buf(), &mut conn, &config).unwrap_err();
    assert!(err.to_string().contains("predates"), "{}", err);

    assert_eq!(get_trades(&mut conn).len(), 1);
    assert_eq!(get_purchases(&mut conn).len(), 1);
}

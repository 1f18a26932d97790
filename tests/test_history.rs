mod common;

use common::{default_config, dt, read_report_rows, request, run_trade, seed_prices, setup_test_db};
use sats_ledger::commands::history::{history, realized_sales};
use sats_ledger::commands::purchases::purchases;
use sats_ledger::portfolio::load_snapshot;

fn seed_two_lots_and_sales(conn: &mut diesel::SqliteConnection) {
    let config = default_config();
    seed_prices(conn);
    // lot 1: 25 shares for 0.1 BTC, lot 2: 10 shares for 0.05 BTC ($250)
    run_trade(conn, &config, &request("alice", "BTC", "AAPL", 10_000_000, 20_000, "2024-01-01 10:00:00")).unwrap();
    run_trade(conn, &config, &request("alice", "BTC", "AAPL", 5_000_000, 25_000, "2024-01-02 10:00:00")).unwrap();
    // 20 shares from lot 1, then 10 shares spanning both lots
    run_trade(conn, &config, &request("alice", "AAPL", "BTC", 2_000_000_000, 30_000, "2024-01-04 10:00:00")).unwrap();
    run_trade(conn, &config, &request("alice", "AAPL", "BTC", 1_000_000_000, 30_000, "2024-01-05 10:00:00")).unwrap();
}

#[test]
fn test_realized_sales_replay_fifo() {
    let mut conn = setup_test_db();
    seed_two_lots_and_sales(&mut conn);

    let snapshot = load_snapshot(&mut conn, "alice", dt("2024-02-01 00:00:00")).unwrap();
    let sales = realized_sales(&snapshot).unwrap();
    assert_eq!(sales.len(), 2);

    let first = &sales[&snapshot.trades[2].id];
    assert_eq!(first.btc_cost, 8_000_000);
    assert_eq!(first.consumed.len(), 1);

    let second = &sales[&snapshot.trades[3].id];
    // 5 shares left of lot 1 (2,000,000) + 5 of lot 2 (2,500,000)
    assert_eq!(second.btc_cost, 4_500_000);
    assert_eq!(second.consumed.len(), 2);
}

#[test]
fn test_history_report_csv() {
    let mut conn = setup_test_db();
    seed_two_lots_and_sales(&mut conn);
    let tmp = tempfile::TempDir::new().unwrap();

    let path = history("alice", tmp.path(), &mut conn).unwrap();
    let rows = read_report_rows(&path);
    assert_eq!(rows.len(), 5);

    // purchases have no cost basis columns
    assert_eq!(rows[0].get(7).unwrap(), "");
    assert_eq!(rows[0].get(8).unwrap(), "");

    // 20 shares at 600,000 sats = 12,000,000 sats proceeds
    assert_eq!(rows[2].get(7).unwrap(), "8000000");
    assert_eq!(rows[2].get(8).unwrap(), "4000000");
    assert_eq!(rows[3].get(7).unwrap(), "4500000");
    assert_eq!(rows[3].get(8).unwrap(), "1500000");

    assert_eq!(rows[4].get(7).unwrap(), "12500000");
    assert_eq!(rows[4].get(8).unwrap(), "5500000");
}

#[test]
fn test_purchases_lock_report() {
    let mut conn = setup_test_db();
    seed_two_lots_and_sales(&mut conn);
    let tmp = tempfile::TempDir::new().unwrap();

    let path = purchases("alice", "aapl", Some("2024-01-02"), tmp.path(), &mut conn).unwrap();
    assert!(path.ends_with("purchases_alice_AAPL_2024-01-02.csv"));

    let rows = read_report_rows(&path);
    assert_eq!(rows.len(), 2);
    // lot 1 unlocked at 2024-01-02 10:00, lot 2 locked until 2024-01-03 10:00
    assert_eq!(rows[0].get(6).unwrap(), "false");
    assert_eq!(rows[0].get(7).unwrap(), "");
    assert_eq!(rows[1].get(6).unwrap(), "true");
    assert_eq!(rows[1].get(7).unwrap(), "601");
    assert_eq!(rows[1].get(4).unwrap(), "10");
}

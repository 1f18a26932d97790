use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand};
use sats_ledger::commands::history::history;
use sats_ledger::commands::holdings::holdings;
use sats_ledger::commands::import::import_trades;
use sats_ledger::commands::price::set_price;
use sats_ledger::commands::purchases::purchases;
use sats_ledger::commands::trade::trade;
use sats_ledger::models::units_to_decimal;
use sats_ledger::{establish_connection, load_ledger_config, telemetry};

fn main() -> ExitCode {
    telemetry::init();

    let command = Cli::parse();
    match run(command.subcommand) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> anyhow::Result<()> {
    let config = load_ledger_config()?;
    let conn = &mut establish_connection()?;

    match command {
        Command::SetPrice { symbol, price, name, asset_type } => {
            let asset = set_price(conn, &symbol, &price, name.as_deref(), asset_type.as_deref(), Utc::now().naive_utc())?;
            println!("{} ({}) priced at {} USD cents", asset.symbol, asset.name, asset.current_price_usd_cents);
        },
        Command::Trade { user, from, to, amount } => {
            let executed = trade(conn, &config, &user, &from, &to, &amount, Utc::now().naive_utc())?;
            println!(
                "Traded {} {} for {} {}",
                units_to_decimal(executed.trade.from_amount), executed.trade.from_asset,
                units_to_decimal(executed.trade.to_amount), executed.trade.to_asset,
            );
            if let Some(locked_until) = executed.locked_until {
                println!("Purchase locked until {}", locked_until);
            }
            if let Some(realized) = executed.realized_sats() {
                println!("Realized {} sats against FIFO cost basis", realized);
            }
        },
        Command::Import { file } => {
            let count = import_trades(&file, conn, &config)?;
            println!("Successfully imported {} trades from {:?}", count, file);
        },
        Command::Holdings { user, date, out } => {
            let path = holdings(&user, date.as_deref(), &out, &config, conn)?;
            println!("Holdings report saved to {:?}", path);
        },
        Command::Purchases { user, asset, date, out } => {
            let path = purchases(&user, &asset, date.as_deref(), &out, conn)?;
            println!("Purchase lock report saved to {:?}", path);
        },
        Command::History { user, out } => {
            let path = history(&user, &out, conn)?;
            println!("Trade history saved to {:?}", path);
        },
    }

    Ok(())
}

#[derive(Subcommand)]
enum Command {
    /// Add an asset or refresh its cached USD price
    SetPrice {
        /// Asset ticker, e.g. BTC or AAPL
        #[clap(long)]
        symbol: String,
        /// USD price per whole unit, e.g. "$45,000.00"
        #[clap(long)]
        price: String,
        #[clap(long)]
        name: Option<String>,
        #[clap(long)]
        asset_type: Option<String>,
    },
    /// Convert between BTC and another asset at current prices
    Trade {
        #[clap(long)]
        user: String,
        #[clap(long)]
        from: String,
        #[clap(long)]
        to: String,
        /// Quantity of the `from` asset in whole units (up to 8 decimals)
        #[clap(long)]
        amount: String,
    },
    /// Import a CSV of trades with columns: Date, User, From, To, Amount, BtcPrice, AssetPrice
    Import {
        #[clap(long)]
        file: PathBuf,
    },
    /// Export a CSV of a user's holdings valued in sats
    Holdings {
        #[clap(long)]
        user: String,
        /// Value holdings as of the end of this day instead of now
        #[clap(long)]
        date: Option<String>,
        #[clap(long, default_value = "./reports")]
        out: PathBuf,
    },
    /// Export a CSV of purchase lots and their lock status for one asset
    Purchases {
        #[clap(long)]
        user: String,
        #[clap(long)]
        asset: String,
        #[clap(long)]
        date: Option<String>,
        #[clap(long, default_value = "./reports")]
        out: PathBuf,
    },
    /// Export a CSV of every trade with realized gain on sales
    History {
        #[clap(long)]
        user: String,
        #[clap(long, default_value = "./reports")]
        out: PathBuf,
    },
}

#[derive(Parser)]
struct Cli {
    #[clap(subcommand)]
    subcommand: Command,
}

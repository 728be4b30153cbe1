//! CLI entry point for the dtbp desk.

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

use dtbp::{AccountType, InstrumentKind, PolicyPreset, Side};
use dtbp_desk::commands::{self, SettingsUpdate, TradeInput};
use dtbp_desk::config::Config;
use dtbp_desk::error::Error;

#[derive(Parser)]
#[command(name = "dtbp-desk")]
#[command(about = "Day-trade buying power desk: trade log, what-if previews, audit trail")]
#[command(version)]
struct Cli {
    /// Path to desk.toml
    #[arg(long, default_value = "desk.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay the trade log and show buying power
    Calc {
        /// Print the full snapshot as JSON
        #[arg(long)]
        json: bool,

        /// Print the step-by-step derivation
        #[arg(long)]
        explain: bool,
    },

    /// Preview buying power after a hypothetical trade (not saved)
    WhatIf(TradeArgs),

    /// Record an executed trade
    Add(TradeArgs),

    /// Remove a trade from the log
    Delete {
        /// Trade id
        id: String,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// List recorded trades in replay order
    Trades,

    /// Show account settings, updating any fields given
    Settings(SettingsArgs),
}

#[derive(Args)]
struct TradeArgs {
    /// Symbol, e.g. SPY
    symbol: String,

    /// buy, sell, short, or cover
    side: Side,

    /// Shares or contracts
    quantity: f64,

    /// Price per share (per-share premium for options)
    price: f64,

    /// stock, option, or leveraged-etf
    #[arg(long, default_value = "stock")]
    kind: InstrumentKind,

    /// Trade id (generated from the execution time if omitted)
    #[arg(long)]
    id: Option<String>,

    /// Execution time, RFC 3339 (defaults to now)
    #[arg(long)]
    at: Option<String>,

    #[arg(long, default_value_t = 0.0)]
    fees: f64,

    /// Leverage factor for leveraged ETFs
    #[arg(long)]
    leverage: Option<f64>,
}

impl From<TradeArgs> for TradeInput {
    fn from(args: TradeArgs) -> Self {
        TradeInput {
            id: args.id,
            at: args.at,
            symbol: args.symbol,
            side: args.side,
            kind: args.kind,
            quantity: args.quantity,
            price: args.price,
            fees: args.fees,
            leverage: args.leverage,
        }
    }
}

#[derive(Args)]
struct SettingsArgs {
    /// Start-of-day equity
    #[arg(long)]
    equity: Option<f64>,

    /// Start-of-day maintenance requirement
    #[arg(long)]
    maintenance: Option<f64>,

    /// Start-of-day settled cash
    #[arg(long)]
    cash: Option<f64>,

    /// Broker-reported DTBP cap
    #[arg(long, conflicts_with = "clear_override")]
    dtbp_override: Option<f64>,

    /// Remove the broker-reported DTBP cap
    #[arg(long)]
    clear_override: bool,

    /// Pattern day trader flag
    #[arg(long)]
    pdt: Option<bool>,

    /// margin or cash
    #[arg(long)]
    account_type: Option<AccountType>,

    /// call-avoidance or standard
    #[arg(long)]
    preset: Option<PolicyPreset>,

    /// Apply the broker's leveraged-ETF house rule
    #[arg(long)]
    broker_leveraged_etf_rule: Option<bool>,
}

impl From<SettingsArgs> for SettingsUpdate {
    fn from(args: SettingsArgs) -> Self {
        SettingsUpdate {
            equity: args.equity,
            maintenance: args.maintenance,
            cash: args.cash,
            dtbp_override: args.dtbp_override,
            clear_override: args.clear_override,
            pattern_day_trader: args.pdt,
            account_type: args.account_type,
            preset: args.preset,
            broker_leveraged_etf_rule: args.broker_leveraged_etf_rule,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = if cli.config.exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {e}");
                process::exit(1);
            }
        }
    } else {
        log::info!(
            "no config at {}, using defaults",
            cli.config.display()
        );
        Config::default()
    };

    let result = match cli.command {
        Command::Calc { json, explain } => commands::run_calc(&config, json, explain),
        Command::WhatIf(args) => commands::run_what_if(&config, args.into()),
        Command::Add(args) => commands::run_add(&config, args.into()),
        Command::Delete { id, force } => commands::run_delete(&config, &id, force),
        Command::Trades => commands::show_trades(&config),
        Command::Settings(args) => commands::show_settings(&config, &args.into()),
    };

    if let Err(e) = result {
        match &e {
            Error::Aborted(msg) => {
                eprintln!("{msg}");
                process::exit(0);
            }
            Error::Validation(_) | Error::TradeInput(_) | Error::DuplicateTrade(_) => {
                eprintln!("Rejected: {e}");
                process::exit(2);
            }
            _ => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}

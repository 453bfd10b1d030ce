//! NovaLend CLI
//!
//! Drives a persistent local NovaLend chain: stake ETH, borrow and repay
//! confidential USDT, and decrypt your own position.
//!
//! # Usage
//!
//! ```bash
//! # Deploy a fresh chain into the default data directory
//! novalend init
//!
//! # Stake collateral and borrow against it
//! novalend stake --account alice --eth 1
//! novalend borrow --account alice --usdt 500
//!
//! # Approve the engine, then repay
//! novalend approve-operator --account alice
//! novalend repay --account alice --usdt 200
//!
//! # Show the decrypted position
//! novalend decrypt --account alice
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod logging;
mod session;

use commands::{
    AddressesCommand, AdvanceCommand, ApproveCommand, BorrowCommand, DecryptCommand, FundCommand,
    InitCommand, QuoteCommand, RepayCommand, StakeCommand, StatusCommand, TransferCommand,
    WithdrawCommand,
};
use config::{LoggingSettings, NovaLendConfig};
use session::Session;

/// NovaLend local chain client
#[derive(Parser)]
#[command(name = "novalend")]
#[command(author = "NovaLend Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Confidential collateralized lending on encrypted balances", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory
    #[arg(short, long, global = true, env = "NOVALEND_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a data directory and deploy the contracts
    Init(InitCommand),

    /// Show contract addresses
    Addresses(AddressesCommand),

    /// Show chain status
    Status(StatusCommand),

    /// Credit native ETH to an account
    Fund(FundCommand),

    /// Stake ETH as collateral
    Stake(StakeCommand),

    /// Borrow cUSDT against collateral
    Borrow(BorrowCommand),

    /// Approve the lending engine as cUSDT operator
    ApproveOperator(ApproveCommand),

    /// Repay debt with cUSDT
    Repay(RepayCommand),

    /// Withdraw all staked ETH
    Withdraw(WithdrawCommand),

    /// Send cUSDT to another account
    Transfer(TransferCommand),

    /// Decrypt an account's position
    Decrypt(DecryptCommand),

    /// Maximum borrow for a collateral amount
    Quote(QuoteCommand),

    /// Move chain time forward
    Advance(AdvanceCommand),

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&logging_settings(&cli))?;

    let config = cli.config;
    let data_dir = cli.data_dir;
    let open = || Session::open(config.clone(), data_dir.clone());

    match cli.command {
        Commands::Init(cmd) => cmd.execute(config.clone(), data_dir.clone()),
        Commands::Addresses(cmd) => open()?.run(&cmd),
        Commands::Status(cmd) => open()?.run(&cmd),
        Commands::Fund(cmd) => open()?.run(&cmd),
        Commands::Stake(cmd) => open()?.run(&cmd),
        Commands::Borrow(cmd) => open()?.run(&cmd),
        Commands::ApproveOperator(cmd) => open()?.run(&cmd),
        Commands::Repay(cmd) => open()?.run(&cmd),
        Commands::Withdraw(cmd) => open()?.run(&cmd),
        Commands::Transfer(cmd) => open()?.run(&cmd),
        Commands::Decrypt(cmd) => open()?.run(&cmd),
        Commands::Quote(cmd) => open()?.run(&cmd),
        Commands::Advance(cmd) => open()?.run(&cmd),
        Commands::Version => {
            println!("novalend {}", env!("CARGO_PKG_VERSION"));
            println!("Collateral: ETH");
            println!("Debt asset: cUSDT (confidential, 6 decimals)");
            Ok(())
        }
    }
}

/// Flags first, then the config file if one is readable, then defaults
fn logging_settings(cli: &Cli) -> LoggingSettings {
    let (_, config_path) = Session::resolve(cli.config.clone(), cli.data_dir.clone());
    let mut settings = NovaLendConfig::load(&config_path)
        .map(|config| config.logging)
        .unwrap_or_default();

    if let Some(level) = &cli.log_level {
        settings.level = level.clone();
    }
    if cli.json_logs {
        settings.format = "json".to_string();
    }
    settings
}

//! Init Command - Create a data directory and deploy a fresh chain

use std::fs;
use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::config::{FheBackendKind, NovaLendConfig};
use crate::session::Session;

/// Initialize a data directory with a freshly deployed chain
#[derive(Args)]
pub struct InitCommand {
    /// Encrypted-integer backend to run the chain on
    #[arg(short, long, value_enum)]
    backend: Option<FheBackendKind>,

    /// Force overwrite existing configuration and chain state
    #[arg(short, long)]
    force: bool,
}

impl InitCommand {
    pub fn execute(self, config: Option<PathBuf>, data_dir: Option<PathBuf>) -> anyhow::Result<()> {
        let (data_dir, config_path) = Session::resolve(config, data_dir);

        info!("Data directory: {}", data_dir.display());

        if config_path.exists() && !self.force {
            anyhow::bail!(
                "Already initialized at {}. Use --force to overwrite.",
                data_dir.display()
            );
        }

        fs::create_dir_all(&data_dir)?;

        // An existing file keeps its settings on --force; only the chain is redeployed
        let mut config = match NovaLendConfig::load(&config_path) {
            Ok(existing) => existing,
            Err(_) => NovaLendConfig::default(),
        };
        if let Some(backend) = self.backend {
            config.fhe.backend = backend;
        }
        config.save(&config_path)?;
        info!("Configuration saved to {}", config_path.display());

        let session = Session::new(data_dir, config_path, config);
        if session.config().fhe.backend == FheBackendKind::Tfhe {
            println!("Generating TFHE keys, this can take a while...");
        }
        let (token, engine) = session.deploy()?;

        println!();
        println!("✅ NovaLend chain deployed");
        println!();
        println!("Data directory: {}", session.data_dir().display());
        println!("Configuration:  {}", session.config_path().display());
        println!("Chain state:    {}", session.chain_path().display());
        println!("Token:          {}", token);
        println!("Lending engine: {}", engine);
        println!();
        println!("Funded accounts: {}", session.config().chain.genesis_accounts.join(", "));
        println!();
        println!("Next:");
        println!("  novalend stake --account alice --eth 1");
        println!("  novalend borrow --account alice --usdt 500");

        Ok(())
    }
}

//! Chain Commands - Inspect and drive the local chain

use clap::Args;
use novalend_defi::units::{format_usdt, format_wei, parse_eth, wei_to_micro};
use novalend_fhe::FheClient;
use novalend_node::LocalChain;

use crate::session::{parse_account, ChainTask};

/// Show contract and deployer addresses
#[derive(Args)]
pub struct AddressesCommand {}

impl ChainTask for AddressesCommand {
    fn mutates(&self) -> bool {
        false
    }

    fn run<C: FheClient>(&self, chain: &mut LocalChain<C>) -> anyhow::Result<()> {
        println!("Token:          {}", chain.token_address());
        println!("Lending engine: {}", chain.engine_address());
        println!("Deployer:       {}", chain.deployer());
        println!("Minter:         {}", chain.token().minter());
        Ok(())
    }
}

/// Show block height, market parameters and recent transactions
#[derive(Args)]
pub struct StatusCommand {
    /// Number of recent transactions to list
    #[arg(short, long, default_value_t = 10)]
    recent: usize,
}

impl ChainTask for StatusCommand {
    fn mutates(&self) -> bool {
        false
    }

    fn run<C: FheClient>(&self, chain: &mut LocalChain<C>) -> anyhow::Result<()> {
        let block = chain.block();
        let config = chain.engine().config();

        println!("Block:        #{} at {}", block.number, block.timestamp);
        println!("Price:        {} USDT/ETH", config.price);
        println!("Max LTV:      {}.{:02}%", config.max_ltv_bps / 100, config.max_ltv_bps % 100);
        println!("Engine ETH:   {}", format_wei(chain.native_balance_of(&chain.engine_address())));
        println!("Transactions: {}", chain.receipts().len());

        let recent = chain.receipts().iter().rev().take(self.recent);
        for receipt in recent {
            println!(
                "  #{:<6} {} -> {} {}",
                receipt.block_number,
                receipt.from.short(),
                receipt.to.short(),
                receipt.method
            );
        }
        Ok(())
    }
}

/// Credit native ETH to an account
#[derive(Args)]
pub struct FundCommand {
    /// Account to credit, as a label or a hex address
    #[arg(short, long, default_value = "alice")]
    account: String,

    /// Amount in ETH
    #[arg(long)]
    eth: String,
}

impl ChainTask for FundCommand {
    fn run<C: FheClient>(&self, chain: &mut LocalChain<C>) -> anyhow::Result<()> {
        let account = parse_account(&self.account)?;
        let wei = parse_eth(&self.eth)?;
        chain.fund(account, wei);

        println!("✅ Funded {} with {} ETH", account, self.eth);
        println!("Wallet balance: {} ETH", format_wei(chain.native_balance_of(&account)));
        Ok(())
    }
}

/// Move chain time forward, e.g. to let an operator grant expire
#[derive(Args)]
pub struct AdvanceCommand {
    /// Seconds to skip
    #[arg(long)]
    seconds: u64,
}

impl ChainTask for AdvanceCommand {
    fn run<C: FheClient>(&self, chain: &mut LocalChain<C>) -> anyhow::Result<()> {
        chain.advance_time(self.seconds);
        let block = chain.block();
        println!("Block #{} at {}", block.number, block.timestamp);
        Ok(())
    }
}

/// Show the maximum borrowable amount for a collateral size
#[derive(Args)]
pub struct QuoteCommand {
    /// Collateral in ETH
    #[arg(long)]
    eth: String,
}

impl ChainTask for QuoteCommand {
    fn mutates(&self) -> bool {
        false
    }

    fn run<C: FheClient>(&self, chain: &mut LocalChain<C>) -> anyhow::Result<()> {
        let micro = wei_to_micro(parse_eth(&self.eth)?);
        let micro = u64::try_from(micro).map_err(|_| anyhow::anyhow!("Collateral too large"))?;
        let max = chain.engine().config().max_borrow_plain(micro);
        println!("Max borrow for {} ETH: {} USDT", self.eth, format_usdt(max));
        Ok(())
    }
}

//! Lending Commands - Account-level operations against the local chain

use clap::Args;
use novalend_defi::units::{format_eth_micro, format_usdt, format_wei};
use novalend_fhe::FheClient;
use novalend_node::{LocalChain, DEFAULT_APPROVAL_DAYS};

use crate::session::{parse_account, ChainTask};

/// Acting account, as a label or a hex address
#[derive(Args, Debug, Clone)]
pub struct AccountArg {
    #[arg(short, long, default_value = "alice")]
    account: String,
}

/// Stake ETH as collateral
#[derive(Args)]
pub struct StakeCommand {
    #[command(flatten)]
    account: AccountArg,

    /// Amount in ETH, e.g. 1.5
    #[arg(long)]
    eth: String,
}

impl ChainTask for StakeCommand {
    fn run<C: FheClient>(&self, chain: &mut LocalChain<C>) -> anyhow::Result<()> {
        let account = parse_account(&self.account.account)?;
        let mut client = chain.as_user(account);
        client.stake_eth(&self.eth)?;
        let position = client.decrypt_position()?;

        println!("✅ Staked {} ETH", self.eth);
        println!("Collateral: {} ETH", format_eth_micro(position.collateral));
        println!("Available:  {} USDT", format_usdt(position.available));
        Ok(())
    }
}

/// Borrow cUSDT against staked collateral
#[derive(Args)]
pub struct BorrowCommand {
    #[command(flatten)]
    account: AccountArg,

    /// Requested amount in USDT; clamped to available credit
    #[arg(long)]
    usdt: String,
}

impl ChainTask for BorrowCommand {
    fn run<C: FheClient>(&self, chain: &mut LocalChain<C>) -> anyhow::Result<()> {
        let account = parse_account(&self.account.account)?;
        let engine = chain.engine_address();
        let mut client = chain.as_user(account);
        let borrowed = client.borrow_usdt(&self.usdt)?;
        let amount = client.decrypt(borrowed, engine)?;

        println!("✅ Borrowed {} USDT (requested {})", format_usdt(amount), self.usdt);
        println!("{}", client.decrypt_position()?);
        Ok(())
    }
}

/// Let the lending engine pull cUSDT for repayments
#[derive(Args)]
pub struct ApproveCommand {
    #[command(flatten)]
    account: AccountArg,

    /// Validity of the grant in days
    #[arg(long, default_value_t = DEFAULT_APPROVAL_DAYS)]
    days: u64,
}

impl ChainTask for ApproveCommand {
    fn run<C: FheClient>(&self, chain: &mut LocalChain<C>) -> anyhow::Result<()> {
        let account = parse_account(&self.account.account)?;
        let until = chain.as_user(account).approve_operator(self.days)?;

        println!("✅ Lending engine approved as operator");
        println!("Valid until: {} (unix)", until);
        Ok(())
    }
}

/// Repay debt with cUSDT
#[derive(Args)]
pub struct RepayCommand {
    #[command(flatten)]
    account: AccountArg,

    /// Amount in USDT; clamped to debt and balance
    #[arg(long)]
    usdt: String,
}

impl ChainTask for RepayCommand {
    fn run<C: FheClient>(&self, chain: &mut LocalChain<C>) -> anyhow::Result<()> {
        let account = parse_account(&self.account.account)?;
        let engine = chain.engine_address();

        if !chain.is_operator(&account, &engine) {
            anyhow::bail!("Lending engine is not an operator. Run `novalend approve-operator` first.");
        }

        let mut client = chain.as_user(account);
        let repaid = client.repay_usdt(&self.usdt)?;
        let amount = client.decrypt(repaid, engine)?;

        println!("✅ Repaid {} USDT", format_usdt(amount));
        println!("{}", client.decrypt_position()?);
        Ok(())
    }
}

/// Withdraw all staked ETH
#[derive(Args)]
pub struct WithdrawCommand {
    #[command(flatten)]
    account: AccountArg,
}

impl ChainTask for WithdrawCommand {
    fn run<C: FheClient>(&self, chain: &mut LocalChain<C>) -> anyhow::Result<()> {
        let account = parse_account(&self.account.account)?;
        let wei = chain.as_user(account).withdraw_all()?;

        println!("✅ Withdrew {} ETH", format_wei(wei));
        println!("Wallet balance: {} ETH", format_wei(chain.native_balance_of(&account)));
        Ok(())
    }
}

/// Send cUSDT to another account
#[derive(Args)]
pub struct TransferCommand {
    #[command(flatten)]
    account: AccountArg,

    /// Recipient, as a label or a hex address
    #[arg(long)]
    to: String,

    /// Amount in USDT; clamped to the sender's balance
    #[arg(long)]
    usdt: String,
}

impl ChainTask for TransferCommand {
    fn run<C: FheClient>(&self, chain: &mut LocalChain<C>) -> anyhow::Result<()> {
        let account = parse_account(&self.account.account)?;
        let to = parse_account(&self.to)?;
        let token = chain.token_address();

        let mut client = chain.as_user(account);
        let sent = client.transfer_usdt(to, &self.usdt)?;
        let amount = client.decrypt(sent, token)?;

        println!("✅ Sent {} cUSDT to {}", format_usdt(amount), to);
        Ok(())
    }
}

/// Decrypt and show an account's position
#[derive(Args)]
pub struct DecryptCommand {
    #[command(flatten)]
    account: AccountArg,
}

impl ChainTask for DecryptCommand {
    fn mutates(&self) -> bool {
        false
    }

    fn run<C: FheClient>(&self, chain: &mut LocalChain<C>) -> anyhow::Result<()> {
        let account = parse_account(&self.account.account)?;
        let engine = chain.engine_address();
        let staked = chain.engine().staked_wei_of(&account);
        let operator = chain.is_operator(&account, &engine);
        let wallet = chain.native_balance_of(&account);
        let position = chain.as_user(account).decrypt_position()?;

        println!("Account:     {}", account);
        println!("Wallet:      {} ETH", format_wei(wallet));
        println!("Staked:      {} ETH", format_wei(staked));
        println!("{}", position);
        println!("Operator:    {}", if operator { "approved" } else { "not approved" });
        Ok(())
    }
}

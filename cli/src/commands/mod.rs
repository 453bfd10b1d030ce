//! CLI Commands

mod chain;
mod init;
mod lending;

pub use chain::{AddressesCommand, AdvanceCommand, FundCommand, QuoteCommand, StatusCommand};
pub use init::InitCommand;
pub use lending::{
    ApproveCommand, BorrowCommand, DecryptCommand, RepayCommand, StakeCommand, TransferCommand,
    WithdrawCommand,
};

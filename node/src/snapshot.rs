//! Persistent chain snapshots

use std::path::Path;

use novalend_defi::{BlockInfo, ConfidentialToken, LendingEngine, NativeBank};
use novalend_fhe::ExecutorState;
use serde::{Deserialize, Serialize};

use crate::config::ChainConfig;
use crate::error::NodeResult;
use crate::transaction::TxReceipt;

/// Complete state of a local chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub config: ChainConfig,
    pub block: BlockInfo,
    pub bank: NativeBank,
    pub token: ConfidentialToken,
    pub engine: LendingEngine,
    pub executor: ExecutorState,
    pub receipts: Vec<TxReceipt>,
}

impl ChainSnapshot {
    /// Load snapshot from JSON file
    pub fn load_json<P: AsRef<Path>>(path: P) -> NodeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save snapshot to JSON file
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> NodeResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LocalChain;
    use novalend_fhe::{Address, MockClient};
    use tempfile::tempdir;

    #[test]
    fn test_snapshot_save_load_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chain.json");

        let mut chain = LocalChain::deploy(MockClient, ChainConfig::default()).unwrap();
        let alice = Address::from_label("alice");
        chain.stake(alice, 3_000_000_000_000_000_000).unwrap();
        chain.save(&path).unwrap();

        let loaded = LocalChain::load(MockClient, &path).unwrap();
        assert_eq!(loaded.engine(), chain.engine());
        assert_eq!(loaded.token(), chain.token());
        assert_eq!(loaded.native_balance_of(&alice), chain.native_balance_of(&alice));
        assert_eq!(loaded.engine().staked_wei_of(&alice), 3_000_000_000_000_000_000);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        assert!(ChainSnapshot::load_json(dir.path().join("absent.json")).is_err());
    }
}

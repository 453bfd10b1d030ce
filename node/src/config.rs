//! Local chain configuration

use novalend_defi::units::parse_eth;
use novalend_defi::{LendingConfig, TokenMetadata};
use serde::{Deserialize, Serialize};

use crate::error::{NodeError, NodeResult};

/// Configuration of a local NovaLend chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Timestamp of the genesis block (unix seconds)
    pub start_timestamp: u64,
    /// Seconds between consecutive blocks
    pub block_time_secs: u64,
    /// Label of the account that deploys both contracts
    pub deployer: String,
    /// Seed of the input-proof attestor
    pub attestor_seed: String,
    /// Accounts funded at genesis, by label
    pub genesis_accounts: Vec<String>,
    /// Native balance of each genesis account, in ETH
    pub genesis_balance_eth: String,
    /// Lending market parameters
    pub lending: LendingConfig,
    /// Token metadata
    pub token: TokenMetadata,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            start_timestamp: 1_700_000_000,
            block_time_secs: 12,
            deployer: "deployer".to_string(),
            attestor_seed: "novalend-local".to_string(),
            genesis_accounts: vec!["alice".to_string(), "bob".to_string()],
            genesis_balance_eth: "100".to_string(),
            lending: LendingConfig::default(),
            token: TokenMetadata::default(),
        }
    }
}

impl ChainConfig {
    /// Genesis balance in wei
    pub fn genesis_balance_wei(&self) -> NodeResult<u128> {
        Ok(parse_eth(&self.genesis_balance_eth)?)
    }

    pub fn validate(&self) -> NodeResult<()> {
        if self.block_time_secs == 0 {
            return Err(NodeError::Config("block_time_secs must be positive".into()));
        }
        if self.deployer.trim().is_empty() {
            return Err(NodeError::Config("deployer label is empty".into()));
        }
        if self.attestor_seed.is_empty() {
            return Err(NodeError::Config("attestor_seed is empty".into()));
        }
        self.genesis_balance_wei()?;
        self.lending
            .validate()
            .map_err(|e| NodeError::Config(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ChainConfig::default();
        config.validate().unwrap();
        assert_eq!(config.genesis_balance_wei().unwrap(), 100 * 10u128.pow(18));
    }

    #[test]
    fn test_invalid_configs() {
        let config = ChainConfig {
            block_time_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ChainConfig {
            genesis_balance_eth: "lots".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ChainConfig {
            lending: LendingConfig::default().with_max_ltv(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

//! CLI Configuration
//!
//! Handles loading and saving the NovaLend configuration from TOML files.

use std::fs;
use std::path::{Path, PathBuf};

use novalend_defi::{LendingConfig, TokenMetadata};
use novalend_node::ChainConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Full CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NovaLendConfig {
    /// Lending market parameters
    #[serde(default)]
    pub protocol: ProtocolSettings,

    /// Token metadata
    #[serde(default)]
    pub token: TokenSettings,

    /// Local chain settings
    #[serde(default)]
    pub chain: ChainSettings,

    /// FHE backend settings
    #[serde(default)]
    pub fhe: FheSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl NovaLendConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Configuration with the given FHE backend
    pub fn with_backend(backend: FheBackendKind) -> Self {
        Self {
            fhe: FheSettings {
                backend,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Chain configuration composed from the protocol, token and chain sections
    pub fn chain_config(&self) -> ChainConfig {
        ChainConfig {
            start_timestamp: self.chain.start_timestamp,
            block_time_secs: self.chain.block_time_secs,
            deployer: self.chain.deployer.clone(),
            attestor_seed: self.chain.attestor_seed.clone(),
            genesis_accounts: self.chain.genesis_accounts.clone(),
            genesis_balance_eth: self.chain.genesis_balance_eth.clone(),
            lending: LendingConfig::default()
                .with_price(self.protocol.price)
                .with_max_ltv(self.protocol.max_ltv_bps),
            token: TokenMetadata {
                name: self.token.name.clone(),
                symbol: self.token.symbol.clone(),
                decimals: self.token.decimals,
            },
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<(), ConfigError> {
        if self.fhe.security_bits < 64 {
            return Err(ConfigError::Invalid(
                "security_bits must be at least 64".to_string()
            ));
        }

        if !["text", "json"].contains(&self.logging.format.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Unknown log format: {}",
                self.logging.format
            )));
        }

        self.chain_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// Lending market settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolSettings {
    /// Collateral price in USDT per ETH
    pub price: u64,

    /// Maximum loan-to-value in basis points
    pub max_ltv_bps: u64,
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        let lending = LendingConfig::default();
        Self {
            price: lending.price,
            max_ltv_bps: lending.max_ltv_bps,
        }
    }
}

/// Token settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSettings {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Default for TokenSettings {
    fn default() -> Self {
        let metadata = TokenMetadata::default();
        Self {
            name: metadata.name,
            symbol: metadata.symbol,
            decimals: metadata.decimals,
        }
    }
}

/// Local chain settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSettings {
    /// Genesis timestamp (unix seconds)
    pub start_timestamp: u64,

    /// Seconds per block
    pub block_time_secs: u64,

    /// Deployer account label
    pub deployer: String,

    /// Input attestor seed
    pub attestor_seed: String,

    /// Accounts funded at genesis
    pub genesis_accounts: Vec<String>,

    /// Genesis balance per account, in ETH
    pub genesis_balance_eth: String,
}

impl Default for ChainSettings {
    fn default() -> Self {
        let chain = ChainConfig::default();
        Self {
            start_timestamp: chain.start_timestamp,
            block_time_secs: chain.block_time_secs,
            deployer: chain.deployer,
            attestor_seed: chain.attestor_seed,
            genesis_accounts: chain.genesis_accounts,
            genesis_balance_eth: chain.genesis_balance_eth,
        }
    }
}

/// Which encrypted-integer backend the chain runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FheBackendKind {
    /// Plaintext-carrying ciphertexts, instant
    #[default]
    Mock,
    /// TFHE-rs ciphertexts
    Tfhe,
}

/// FHE settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FheSettings {
    /// Backend (mock, tfhe)
    pub backend: FheBackendKind,

    /// Security parameter for TFHE key generation
    pub security_bits: u32,
}

impl Default for FheSettings {
    fn default() -> Self {
        Self {
            backend: FheBackendKind::Mock,
            security_bits: 128,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level
    pub level: String,

    /// Output format (text, json)
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Get default data directory
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("network", "novalend", "novalend")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".novalend"))
}

/// Get default config file path
pub fn default_config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

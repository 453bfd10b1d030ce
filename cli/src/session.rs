//! Chain session for one CLI invocation
//!
//! Resolves the data directory and configuration, reopens the persisted
//! chain with the configured FHE backend, runs one task against it and
//! writes the state back.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use novalend_fhe::{Address, ClientKey, FHEConfig, FheClient, MockClient, TfheClient};
use novalend_node::LocalChain;
use tracing::{debug, info};

use crate::config::{default_config_path, default_data_dir, FheBackendKind, NovaLendConfig};

const CHAIN_FILE: &str = "chain.json";
const CLIENT_KEY_FILE: &str = "keys/client_key.bin";

/// Something to run against an open chain
pub trait ChainTask {
    /// Whether the chain must be written back afterwards
    fn mutates(&self) -> bool {
        true
    }

    fn run<C: FheClient>(&self, chain: &mut LocalChain<C>) -> anyhow::Result<()>;
}

/// Resolved paths and configuration
#[derive(Debug, Clone)]
pub struct Session {
    data_dir: PathBuf,
    config_path: PathBuf,
    config: NovaLendConfig,
}

impl Session {
    /// Resolve paths without requiring an existing configuration
    pub fn resolve(config: Option<PathBuf>, data_dir: Option<PathBuf>) -> (PathBuf, PathBuf) {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);
        let config_path = config.unwrap_or_else(|| default_config_path(&data_dir));
        (data_dir, config_path)
    }

    /// Open an initialized data directory
    pub fn open(config: Option<PathBuf>, data_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let (data_dir, config_path) = Self::resolve(config, data_dir);
        let config = NovaLendConfig::load(&config_path).with_context(|| {
            format!(
                "No configuration at {}. Run `novalend init` first.",
                config_path.display()
            )
        })?;
        Ok(Self::new(data_dir, config_path, config))
    }

    pub fn new(data_dir: PathBuf, config_path: PathBuf, config: NovaLendConfig) -> Self {
        Self {
            data_dir,
            config_path,
            config,
        }
    }

    pub fn config(&self) -> &NovaLendConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn chain_path(&self) -> PathBuf {
        self.data_dir.join(CHAIN_FILE)
    }

    pub fn key_path(&self) -> PathBuf {
        self.data_dir.join(CLIENT_KEY_FILE)
    }

    fn fhe_config(&self) -> FHEConfig {
        FHEConfig {
            security_bits: self.config.fhe.security_bits,
        }
    }

    /// Deploy a fresh chain and persist it, generating keys if needed
    pub fn deploy(&self) -> anyhow::Result<(Address, Address)> {
        match self.config.fhe.backend {
            FheBackendKind::Mock => self.deploy_with(MockClient),
            FheBackendKind::Tfhe => {
                let client = TfheClient::generate(&self.fhe_config())?;
                let key_path = self.key_path();
                if let Some(parent) = key_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&key_path, client.client_key().to_bytes()?)
                    .with_context(|| format!("Failed to write {}", key_path.display()))?;
                info!(path = %key_path.display(), "client key saved");
                self.deploy_with(client)
            }
        }
    }

    fn deploy_with<C: FheClient>(&self, client: C) -> anyhow::Result<(Address, Address)> {
        let chain = LocalChain::deploy(client, self.config.chain_config())?;
        chain.save(self.chain_path())?;
        Ok((chain.token_address(), chain.engine_address()))
    }

    /// Reopen the persisted chain, run `task` and save if it mutates
    pub fn run<T: ChainTask>(&self, task: &T) -> anyhow::Result<()> {
        match self.config.fhe.backend {
            FheBackendKind::Mock => self.run_with(MockClient, task),
            FheBackendKind::Tfhe => {
                let key_path = self.key_path();
                let bytes = fs::read(&key_path)
                    .with_context(|| format!("Missing client key at {}", key_path.display()))?;
                let key = ClientKey::from_bytes(&bytes, &self.fhe_config())?;
                self.run_with(TfheClient::from_client_key(key)?, task)
            }
        }
    }

    fn run_with<C: FheClient, T: ChainTask>(&self, client: C, task: &T) -> anyhow::Result<()> {
        let path = self.chain_path();
        let mut chain = LocalChain::load(client, &path)
            .with_context(|| format!("Failed to open chain at {}", path.display()))?;

        let outcome = task.run(&mut chain);

        // Reverted transactions leave the chain unchanged, so saving is
        // only needed for work that went through
        if outcome.is_ok() && task.mutates() {
            chain.save(&path)?;
            debug!(path = %path.display(), block = chain.block().number, "chain saved");
        }
        outcome
    }
}

/// Parse an account given as a label (`alice`) or a hex address
pub fn parse_account(account: &str) -> anyhow::Result<Address> {
    if account.starts_with("0x") {
        Ok(account.parse()?)
    } else if account.is_empty() {
        anyhow::bail!("Empty account name")
    } else {
        Ok(Address::from_label(account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct StakeOne;

    impl ChainTask for StakeOne {
        fn run<C: FheClient>(&self, chain: &mut LocalChain<C>) -> anyhow::Result<()> {
            chain.as_user(Address::from_label("alice")).stake_eth("1")?;
            Ok(())
        }
    }

    struct StakeZero;

    impl ChainTask for StakeZero {
        fn run<C: FheClient>(&self, chain: &mut LocalChain<C>) -> anyhow::Result<()> {
            chain.as_user(Address::from_label("alice")).stake_eth("0")?;
            Ok(())
        }
    }

    fn session(dir: &Path) -> Session {
        Session::new(
            dir.to_path_buf(),
            default_config_path(dir),
            NovaLendConfig::default(),
        )
    }

    #[test]
    fn test_state_persists_between_runs() {
        let dir = tempdir().unwrap();
        let session = session(dir.path());
        let (_, engine) = session.deploy().unwrap();

        session.run(&StakeOne).unwrap();
        session.run(&StakeOne).unwrap();

        let chain = LocalChain::load(MockClient, session.chain_path()).unwrap();
        assert_eq!(chain.engine_address(), engine);
        assert_eq!(chain.receipts().len(), 2);
        assert_eq!(
            chain.engine().staked_wei_of(&Address::from_label("alice")),
            2_000_000_000_000_000_000
        );
    }

    #[test]
    fn test_failed_task_does_not_save() {
        let dir = tempdir().unwrap();
        let session = session(dir.path());
        session.deploy().unwrap();
        let before = fs::read_to_string(session.chain_path()).unwrap();

        assert!(session.run(&StakeZero).is_err());
        assert_eq!(fs::read_to_string(session.chain_path()).unwrap(), before);
    }

    #[test]
    fn test_run_without_chain() {
        let dir = tempdir().unwrap();
        assert!(session(dir.path()).run(&StakeOne).is_err());
    }

    #[test]
    fn test_parse_account() {
        assert_eq!(parse_account("alice").unwrap(), Address::from_label("alice"));
        let bob = Address::from_label("bob");
        assert_eq!(parse_account(&bob.to_string()).unwrap(), bob);
        assert!(parse_account("0x1234").is_err());
        assert!(parse_account("").is_err());
    }
}

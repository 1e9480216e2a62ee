//! # Node Configuration
//!
//! The TOML file the node builds its ledger from:
//!
//! ```toml
//! deployer = "0x0000000000000000000000000000000000000001"
//! users = ["0x00000000000000000000000000000000000000a1"]
//!
//! [ledger]
//! bank_cap = "1_000_000_000_000"          # canonical units (6 decimals)
//! withdraw_limit = "1_000_000_000_000_000_000"  # wei
//!
//! [[assets]]
//! address = "0x00000000000000000000000000000000000000ee"
//! decimals = 6
//!
//! [prices]
//! native = { value = "250000000000", decimals = 8 }
//!
//! [[wallets]]
//! owner = "0x00000000000000000000000000000000000000a1"
//! asset = "native"
//! amount = "5_000_000_000_000_000_000"
//!
//! [[approvals]]
//! token = "0x00000000000000000000000000000000000000ee"
//! owner = "0x00000000000000000000000000000000000000a1"
//! amount = 1000000
//! ```
//!
//! `wallets` and `approvals` seed the in-memory transfer agent; they are
//! the outside world, not ledger state.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

use strongbox_protocol::config::LedgerConfig;
use strongbox_protocol::oracle::Price;
use strongbox_protocol::primitives::{amount_str, Address, Asset};

/// Errors raised while loading a [`NodeConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The file parsed but describes an impossible setup.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A token to register before any operation runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSettings {
    pub address: Address,
    pub decimals: u8,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Opening external balance of one principal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSeed {
    pub owner: Address,
    pub asset: Asset,
    #[serde(with = "amount_str")]
    pub amount: u128,
}

/// Opening token approval granted to the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalSeed {
    pub token: Address,
    pub owner: Address,
    #[serde(with = "amount_str")]
    pub amount: u128,
}

/// Everything needed to stand up a ledger and its surroundings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    /// Receives both roles at construction.
    pub deployer: Address,

    /// Granted `USER` by the deployer right after construction.
    #[serde(default)]
    pub users: Vec<Address>,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub assets: Vec<AssetSettings>,

    #[serde(default)]
    pub prices: BTreeMap<Asset, Price>,

    #[serde(default)]
    pub wallets: Vec<WalletSeed>,

    #[serde(default)]
    pub approvals: Vec<ApprovalSeed>,
}

impl NodeConfig {
    /// Reads, parses and validates a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parses and validates TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: NodeConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the parts the ledger itself cannot: duplicate asset entries
    /// and the ledger parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ledger
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let mut seen = BTreeSet::new();
        for asset in &self.assets {
            if !seen.insert(asset.address) {
                return Err(ConfigError::Invalid(format!(
                    "asset {} is listed more than once",
                    asset.address
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use strongbox_protocol::config::{ONE_CANONICAL, ONE_NATIVE};

    const SAMPLE: &str = r#"
        deployer = "0x0000000000000000000000000000000000000001"
        users = ["0x00000000000000000000000000000000000000a1"]

        [ledger]
        bank_cap = "1_000_000_000_000"
        withdraw_limit = "1_000_000_000_000_000_000"

        [[assets]]
        address = "0x00000000000000000000000000000000000000ee"
        decimals = 6

        [prices]
        native = { value = "250000000000", decimals = 8 }

        [[wallets]]
        owner = "0x00000000000000000000000000000000000000a1"
        asset = "native"
        amount = "5_000_000_000_000_000_000"

        [[approvals]]
        token = "0x00000000000000000000000000000000000000ee"
        owner = "0x00000000000000000000000000000000000000a1"
        amount = 1000000
    "#;

    #[test]
    fn parses_full_sample() {
        let cfg = NodeConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(cfg.deployer, Address::from_low_u8(1));
        assert_eq!(cfg.users, vec![Address::from_low_u8(0xa1)]);
        assert_eq!(cfg.ledger.bank_cap, 1_000_000 * ONE_CANONICAL);
        assert_eq!(cfg.ledger.withdraw_limit, ONE_NATIVE);
        assert!(cfg.assets[0].enabled);
        assert_eq!(cfg.prices[&Asset::Native], Price::new(250_000_000_000, 8));
        assert_eq!(cfg.wallets[0].amount, 5 * ONE_NATIVE);
        assert_eq!(cfg.approvals[0].amount, 1_000_000);
    }

    #[test]
    fn ledger_section_defaults() {
        let cfg = NodeConfig::from_toml_str(
            r#"deployer = "0x0000000000000000000000000000000000000001""#,
        )
        .unwrap();
        assert_eq!(cfg.ledger, LedgerConfig::default());
        assert!(cfg.users.is_empty());
    }

    #[test]
    fn rejects_zero_cap() {
        let err = NodeConfig::from_toml_str(
            r#"
            deployer = "0x0000000000000000000000000000000000000001"
            [ledger]
            bank_cap = 0
            withdraw_limit = 1
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("bank_cap")));
    }

    #[test]
    fn rejects_duplicate_assets() {
        let err = NodeConfig::from_toml_str(
            r#"
            deployer = "0x0000000000000000000000000000000000000001"
            [[assets]]
            address = "0x00000000000000000000000000000000000000ee"
            decimals = 6
            [[assets]]
            address = "0x00000000000000000000000000000000000000ee"
            decimals = 6
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unknown_keys_and_bad_addresses() {
        assert!(matches!(
            NodeConfig::from_toml_str("deployer = \"0x01\"\nbogus = 1"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            NodeConfig::from_toml_str("deployer = \"0x01\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let cfg = NodeConfig::load(file.path()).unwrap();
        assert_eq!(cfg.assets.len(), 1);

        let missing = NodeConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}

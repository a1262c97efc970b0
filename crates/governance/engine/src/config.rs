//! Engine configuration.
//!
//! Every field has a default, so an empty TOML document is a valid (if
//! governor-less) configuration. Call [`GovernanceConfig::validate`] before
//! building an engine from it.

use gov_types::{AccountId, MarketId, Symbol};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Governance engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// Distinct current-governor assents required to apply a proposal
    #[serde(default = "default_quorum_threshold")]
    pub quorum_threshold: usize,

    /// Approval window used when neither the caller nor the chain parameter
    /// supplies one
    #[serde(default = "default_expiry_blocks")]
    pub default_expiry_blocks: u64,

    /// Upper bound on a caller-supplied approval window
    #[serde(default = "default_max_expiry_blocks")]
    pub max_expiry_blocks: u64,

    /// Reject proposals submitted by non-governors
    #[serde(default)]
    pub proposers_must_be_governors: bool,

    /// Genesis state
    #[serde(default)]
    pub genesis: GenesisConfig,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            quorum_threshold: default_quorum_threshold(),
            default_expiry_blocks: default_expiry_blocks(),
            max_expiry_blocks: default_max_expiry_blocks(),
            proposers_must_be_governors: false,
            genesis: GenesisConfig::default(),
        }
    }
}

/// Genesis configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisConfig {
    /// Initial governor set
    #[serde(default)]
    pub governors: Vec<AccountId>,

    /// Seed every global parameter with its catalog default
    #[serde(default = "default_true")]
    pub seed_param_defaults: bool,

    /// Symbols the in-process asset registry treats as transferable
    #[serde(default = "default_transferable_symbols")]
    pub transferable_symbols: Vec<Symbol>,

    /// Registered markets
    #[serde(default)]
    pub markets: Vec<GenesisMarket>,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            governors: Vec::new(),
            seed_param_defaults: true,
            transferable_symbols: default_transferable_symbols(),
            markets: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisMarket {
    pub id: MarketId,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_quorum_threshold() -> usize {
    2
}

fn default_expiry_blocks() -> u64 {
    1_200
}

fn default_max_expiry_blocks() -> u64 {
    20_160
}

fn default_true() -> bool {
    true
}

fn default_transferable_symbols() -> Vec<Symbol> {
    ["WICC", "WUSD", "WGRT"]
        .into_iter()
        .filter_map(|s| Symbol::new(s).ok())
        .collect()
}

impl GovernanceConfig {
    /// Parse a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quorum_threshold == 0 {
            return Err(ConfigError::Invalid("quorum_threshold must be at least 1".into()));
        }
        if self.default_expiry_blocks == 0 {
            return Err(ConfigError::Invalid("default_expiry_blocks must be at least 1".into()));
        }
        if self.default_expiry_blocks > self.max_expiry_blocks {
            return Err(ConfigError::Invalid(format!(
                "default_expiry_blocks ({}) exceeds max_expiry_blocks ({})",
                self.default_expiry_blocks, self.max_expiry_blocks
            )));
        }
        let mut governors = self.genesis.governors.clone();
        governors.sort();
        governors.dedup();
        if governors.len() < self.quorum_threshold {
            return Err(ConfigError::Invalid(format!(
                "{} genesis governors cannot reach a quorum of {}",
                governors.len(),
                self.quorum_threshold
            )));
        }
        Ok(())
    }

    /// A ready-to-use devnet configuration with three governors.
    pub fn devnet() -> Self {
        let governors = ["0-1", "0-2", "0-3"]
            .into_iter()
            .filter_map(|g| AccountId::new(g).ok())
            .collect();
        Self {
            genesis: GenesisConfig {
                governors,
                markets: vec![
                    GenesisMarket { id: MarketId(0), enabled: true },
                    GenesisMarket { id: MarketId(1), enabled: false },
                ],
                ..GenesisConfig::default()
            },
            ..Self::default()
        }
    }
}

//! Run configuration: ledger endpoint, gas schedule, retry policy, contracts, output paths.
//!
//! Load from: env `CYBER_CLAIM_CONFIG_PATH`, or `./config/cyber_claim.json`, or `./cyber_claim.json`.
//! The `ledger` section has no built-in default; every other section does.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

pub const CONFIG_PATH_ENV: &str = "CYBER_CLAIM_CONFIG_PATH";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid url for {field}: {reason}")]
    InvalidUrl { field: &'static str, reason: String },
    #[error("missing value: {0}")]
    Missing(&'static str),
    #[error("no config file found (set CYBER_CLAIM_CONFIG_PATH)")]
    NotFound,
}

/// Ledger endpoint and signing parameters. Injected into the transaction client.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LedgerConfig {
    /// Chain CLI used for signing and broadcasting (e.g. `cyber`).
    #[serde(default = "default_binary")]
    pub binary: String,
    /// Tendermint RPC endpoint passed as `--node`.
    pub node_url: String,
    /// LCD (REST) endpoint used for smart queries.
    pub lcd_url: String,
    pub chain_id: String,
    #[serde(default = "default_keyring_backend")]
    pub keyring_backend: String,
    /// Gas price as `<amount><denom>`, e.g. `0.01boot`.
    #[serde(default = "default_gas_price")]
    pub gas_price: String,
    #[serde(default = "default_denom")]
    pub denom: String,
    /// Upper bound on waiting for in-block confirmation of one broadcast.
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,
}

fn default_binary() -> String {
    "cyber".to_string()
}

fn default_keyring_backend() -> String {
    "test".to_string()
}

fn default_gas_price() -> String {
    "0.01boot".to_string()
}

fn default_denom() -> String {
    "boot".to_string()
}

fn default_confirm_timeout_secs() -> u64 {
    90
}

impl LedgerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("ledger.node_url", &self.node_url)?;
        check_url("ledger.lcd_url", &self.lcd_url)?;
        if self.chain_id.trim().is_empty() {
            return Err(ConfigError::Missing("ledger.chain_id"));
        }
        if self.binary.trim().is_empty() {
            return Err(ConfigError::Missing("ledger.binary"));
        }
        Ok(())
    }
}

fn check_url(field: &'static str, raw: &str) -> Result<(), ConfigError> {
    Url::parse(raw).map(|_| ()).map_err(|e| ConfigError::InvalidUrl {
        field,
        reason: e.to_string(),
    })
}

/// Gas limit per step class. Identity creation and NFT operations get the larger allowance.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GasSchedule {
    pub identity: u64,
    pub nft: u64,
    pub proof: u64,
    pub claim: u64,
    pub release: u64,
    pub multi_send: u64,
    pub instantiate: u64,
}

impl Default for GasSchedule {
    fn default() -> Self {
        Self {
            identity: 600_000,
            nft: 600_000,
            proof: 300_000,
            claim: 300_000,
            release: 300_000,
            multi_send: 400_000,
            instantiate: 3_500_000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Pause between consecutive steps of one record.
    pub step_delay_ms: u64,
    pub gas: GasSchedule,
    /// Raw-log fragments that mark a rejection as "already done" rather than a failure.
    pub benign_rejections: Vec<String>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            step_delay_ms: 1_000,
            gas: GasSchedule::default(),
            benign_rejections: vec![
                "Nickname already exists".to_string(),
                "Address already exist".to_string(),
                "Your gift is already claimed".to_string(),
                "Stage released, wait for the next stage".to_string(),
            ],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_ms: 10_000,
        }
    }
}

/// Deployed contract addresses. `gift` and `passport` drive transactions; `extra` is display only.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ContractsConfig {
    pub gift: String,
    pub passport: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub artifact_dir: PathBuf,
    pub journal_path: PathBuf,
    /// Rows per record file; record index `i` selects row `i % shard_size`.
    pub shard_size: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("./temp"),
            journal_path: PathBuf::from("./temp/journal.sqlite"),
            shard_size: 10_000,
        }
    }
}

/// External Merkle proof generator, invoked as `<program> <args..> <input> <output> <start> <end>`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProofToolConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for ProofToolConfig {
    fn default() -> Self {
        Self {
            program: "node".to_string(),
            args: vec!["generate_proofs.js".to_string()],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ClaimConfig {
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub contracts: ContractsConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub proof_tool: ProofToolConfig,
}

impl ClaimConfig {
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.ledger.validate()?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load config: env CYBER_CLAIM_CONFIG_PATH, then ./config/cyber_claim.json, then ./cyber_claim.json.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Self::load_from_path(Path::new(&path));
        }
        for candidate in [
            Path::new("./config/cyber_claim.json"),
            Path::new("./cyber_claim.json"),
        ] {
            if candidate.exists() {
                return Self::load_from_path(candidate);
            }
        }
        Err(ConfigError::NotFound)
    }

    /// Contracts must be set before any workflow step is built.
    pub fn require_contracts(&self) -> Result<&ContractsConfig, ConfigError> {
        if self.contracts.gift.trim().is_empty() {
            return Err(ConfigError::Missing("contracts.gift"));
        }
        if self.contracts.passport.trim().is_empty() {
            return Err(ConfigError::Missing("contracts.passport"));
        }
        Ok(&self.contracts)
    }
}

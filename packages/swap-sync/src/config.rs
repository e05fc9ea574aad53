//! Sync engine configuration.

use crate::Error;
use serde::Deserialize;
use swap_types::Address;

/// Top-level configuration. Every field has a default.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Account to synchronize. `None` starts disconnected.
    #[serde(default)]
    pub account: Option<Address>,

    /// JSON ledger snapshot used to seed the in-memory ledger.
    #[serde(default = "defaults::snapshot_path")]
    pub snapshot_path: String,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub metadata: MetadataConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            account: None,
            snapshot_path: defaults::snapshot_path(),
            sync: SyncConfig::default(),
            metadata: MetadataConfig::default(),
        }
    }
}

impl Config {
    /// Load from an optional `swap-sync.toml` plus `SWAP_*` environment variables
    /// (`SWAP_SYNC__BID_CONCURRENCY=4`).
    pub fn load() -> Result<Self, Error> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("swap-sync").required(false))
            .add_source(
                config::Environment::with_prefix("SWAP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Proposals whose bid lists resolve concurrently. 1 is strictly sequential.
    #[serde(default = "defaults::bid_concurrency")]
    pub bid_concurrency: usize,

    /// Upper bound the binary waits for both passes to settle.
    #[serde(default = "defaults::pass_timeout_secs")]
    pub pass_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            bid_concurrency: defaults::bid_concurrency(),
            pass_timeout_secs: defaults::pass_timeout_secs(),
        }
    }
}

/// Content-lake metadata store coordinates.
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataConfig {
    #[serde(default = "defaults::project_id")]
    pub project_id: String,

    #[serde(default = "defaults::dataset")]
    pub dataset: String,

    #[serde(default = "defaults::api_version")]
    pub api_version: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            project_id: defaults::project_id(),
            dataset: defaults::dataset(),
            api_version: defaults::api_version(),
        }
    }
}

impl MetadataConfig {
    /// Query endpoint for the configured project and dataset.
    pub fn query_url(&self) -> String {
        format!(
            "https://{}.api.sanity.io/v{}/data/query/{}",
            self.project_id, self.api_version, self.dataset
        )
    }
}

mod defaults {
    pub fn snapshot_path() -> String {
        "./ledger.json".into()
    }

    pub fn bid_concurrency() -> usize {
        1
    }

    pub fn pass_timeout_secs() -> u64 {
        30
    }

    pub fn project_id() -> String {
        std::env::var("SANITY_PROJECT_ID").unwrap_or_else(|_| "swap".into())
    }

    pub fn dataset() -> String {
        "production".into()
    }

    pub fn api_version() -> String {
        "2021-10-21".into()
    }
}

//! Configuration management for the indexer.
//!
//! One process instance indexes one `(network, worker)` pair, described by
//! a [`Module`] loaded from a YAML file. Validation happens at startup so
//! misconfiguration aborts before the run loop.

use crate::schema::{Network, WorkerId};
use crate::utils::error::{IndexerError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration of one indexer instance.
///
/// # Example
///
/// ```yaml
/// network: arweave
/// worker: paragraph
/// parameters:
///   rpc_endpoints:
///     - https://arweave.net
///   ipfs_gateways:
///     - https://ipfs.io
///   start_block: 1287000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    /// Network to index.
    pub network: Network,

    /// Worker to run.
    pub worker: WorkerId,

    /// Worker- and source-specific parameters.
    #[serde(default)]
    pub parameters: Parameters,
}

/// Tunable parameters of a module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Parameters {
    /// Chain RPC endpoints, tried in order.
    #[serde(default)]
    pub rpc_endpoints: Vec<String>,

    /// IPFS gateways, tried in order.
    #[serde(default)]
    pub ipfs_gateways: Vec<String>,

    /// Block height to start from when no checkpoint exists.
    #[serde(default)]
    pub start_block: Option<u64>,

    /// Cap on concurrent task transforms. Defaults to 20 x logical CPUs.
    #[serde(default)]
    pub concurrency: Option<usize>,

    /// Deadline for a single IPFS fetch, in seconds.
    #[serde(default)]
    pub ipfs_timeout_secs: Option<u64>,

    /// Delay between chain height polls, in seconds.
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
}

impl Module {
    /// Loads a module configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `IndexerError::Config` when the file cannot be read or
    /// parsed.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|error| {
            IndexerError::Config(format!("read {}: {error}", path.display()))
        })?;

        serde_yaml::from_str(&contents)
            .map_err(|error| IndexerError::Config(format!("parse {}: {error}", path.display())))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `IndexerError::Config` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.parameters.rpc_endpoints.is_empty() {
            return Err(IndexerError::Config(
                "parameters.rpc_endpoints must not be empty".to_string(),
            ));
        }

        if self.worker == WorkerId::Mirror && self.parameters.ipfs_gateways.is_empty() {
            return Err(IndexerError::Config(
                "the mirror worker requires parameters.ipfs_gateways".to_string(),
            ));
        }

        if self.parameters.concurrency == Some(0) {
            return Err(IndexerError::Config(
                "parameters.concurrency must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(worker: WorkerId) -> Module {
        Module {
            network: Network::Arweave,
            worker,
            parameters: Parameters {
                rpc_endpoints: vec!["https://arweave.net".to_string()],
                ipfs_gateways: vec!["https://ipfs.io".to_string()],
                ..Parameters::default()
            },
        }
    }

    #[test]
    fn test_parse_yaml_module() {
        let parsed: Module = serde_yaml::from_str(
            r"
            network: arweave
            worker: mirror
            parameters:
              rpc_endpoints:
                - https://arweave.net
              ipfs_gateways:
                - https://ipfs.io
              concurrency: 8
            ",
        )
        .unwrap();

        assert_eq!(parsed.network, Network::Arweave);
        assert_eq!(parsed.worker, WorkerId::Mirror);
        assert_eq!(parsed.parameters.concurrency, Some(8));
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_unknown_worker_fails_to_parse() {
        let parsed: std::result::Result<Module, _> = serde_yaml::from_str(
            r"
            network: arweave
            worker: mastodon
            ",
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_validate_requires_endpoints() {
        let mut config = module(WorkerId::Paragraph);
        config.parameters.rpc_endpoints.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_mirror_requires_gateways() {
        let mut config = module(WorkerId::Mirror);
        config.parameters.ipfs_gateways.clear();
        assert!(config.validate().is_err());

        // Paragraph does not touch IPFS.
        let mut config = module(WorkerId::Paragraph);
        config.parameters.ipfs_gateways.clear();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = module(WorkerId::Paragraph);
        config.parameters.concurrency = Some(0);
        assert!(config.validate().is_err());
    }
}

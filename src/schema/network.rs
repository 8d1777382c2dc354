//! Network identifiers.

use crate::utils::error::IndexerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A chain network an indexer instance is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Arweave,
}

const NETWORK_NAMES: &[(Network, &str)] = &[(Network::Arweave, "arweave")];

impl Network {
    /// Stable lowercase string form of the network.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Network::Arweave => "arweave",
        }
    }

    /// Number of decimal places of the network's native fee unit.
    ///
    /// Arweave rewards are denominated in winston, 10^-12 AR.
    #[must_use]
    pub fn fee_decimal(self) -> u32 {
        match self {
            Network::Arweave => 12,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = IndexerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        NETWORK_NAMES
            .iter()
            .find(|(_, name)| value.eq_ignore_ascii_case(name))
            .map(|(network, _)| *network)
            .ok_or_else(|| IndexerError::Config(format!("unknown network: {value}")))
    }
}

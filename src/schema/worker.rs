//! Worker identifiers.
//!
//! Each worker has a stable lowercase name that round-trips through JSON,
//! YAML, and SQL column values. Unknown names parse to an error so that a
//! typo in a config file surfaces at startup.

use crate::utils::error::IndexerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a worker implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerId {
    Paragraph,
    Mirror,
}

const WORKER_NAMES: &[(WorkerId, &str)] = &[
    (WorkerId::Paragraph, "paragraph"),
    (WorkerId::Mirror, "mirror"),
];

impl WorkerId {
    /// Stable lowercase string form of the worker identifier.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WorkerId::Paragraph => "paragraph",
            WorkerId::Mirror => "mirror",
        }
    }

    /// All known worker identifiers.
    #[must_use]
    pub fn all() -> Vec<WorkerId> {
        WORKER_NAMES.iter().map(|(worker, _)| *worker).collect()
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkerId {
    type Err = IndexerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        WORKER_NAMES
            .iter()
            .find(|(_, name)| value.eq_ignore_ascii_case(name))
            .map(|(worker, _)| *worker)
            .ok_or_else(|| IndexerError::Config(format!("unknown worker: {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_round_trip_str() {
        for worker in WorkerId::all() {
            assert_eq!(worker.to_string().parse::<WorkerId>().unwrap(), worker);
        }
        assert!("mastodon".parse::<WorkerId>().is_err());
    }

    #[test]
    fn test_worker_round_trip_json() {
        let encoded = serde_json::to_string(&WorkerId::Mirror).unwrap();
        assert_eq!(encoded, "\"mirror\"");
        let decoded: WorkerId = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, WorkerId::Mirror);

        assert!(serde_json::from_str::<WorkerId>("\"unknown\"").is_err());
    }

    #[test]
    fn test_worker_round_trip_yaml() {
        let encoded = serde_yaml::to_string(&WorkerId::Paragraph).unwrap();
        assert_eq!(encoded.trim(), "paragraph");
        let decoded: WorkerId = serde_yaml::from_str(&encoded).unwrap();
        assert_eq!(decoded, WorkerId::Paragraph);
    }
}

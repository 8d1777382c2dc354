//! Resumption checkpoints and worker-local dataset rows.

use crate::schema::network::Network;
use crate::schema::worker::WorkerId;
use serde::{Deserialize, Serialize};

/// A worker-scoped resumption cursor.
///
/// The `state` payload is owned and defined by the source; the engine
/// treats it as opaque and only persists it alongside each committed batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    pub network: Network,
    pub worker: WorkerId,
    pub state: serde_json::Value,
}

impl Checkpoint {
    /// Builds the checkpoint identifier for a `(network, worker)` pair.
    #[must_use]
    pub fn build_id(network: Network, worker: WorkerId) -> String {
        format!("{network}.{worker}")
    }

    /// A fresh checkpoint with an empty state, used when no prior progress
    /// is recorded.
    #[must_use]
    pub fn new(network: Network, worker: WorkerId) -> Self {
        Self {
            id: Self::build_id(network, worker),
            network,
            worker,
            state: serde_json::json!({}),
        }
    }
}

/// First-seen record of a Mirror publication digest.
///
/// Used to distinguish the first post carrying a content digest from the
/// revisions that reference it later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMirrorPost {
    pub transaction_id: String,
    pub origin_content_digest: String,
}

//! Task sources and their registry.
//!
//! Sources are selected at bootstrap from the configured network; the
//! worker's advisory filter is handed to the source so it can prune
//! uninteresting transactions early.

use crate::config::Module;
use crate::engine::{DataSourceFilter, Source};
use crate::schema::{Checkpoint, Network};
use crate::utils::error::Result;

pub mod arweave;

/// Builds the source for the configured network, resuming from the given
/// checkpoint.
///
/// # Errors
///
/// Returns `IndexerError::Config` when the checkpoint state does not parse
/// or the endpoint list is empty.
pub fn new(
    config: &Module,
    filter: DataSourceFilter,
    checkpoint: &Checkpoint,
) -> Result<Box<dyn Source>> {
    match config.network {
        Network::Arweave => Ok(Box::new(arweave::ArweaveSource::new(
            config, filter, checkpoint,
        )?)),
    }
}

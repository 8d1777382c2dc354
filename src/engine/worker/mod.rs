//! Workers and their registry.
//!
//! A worker is selected at bootstrap from the configured `(network, worker)`
//! pair; unknown combinations are a startup error.

use crate::config::Module;
use crate::engine::Worker;
use crate::schema::WorkerId;
use crate::storage::DatabaseClient;
use crate::utils::error::Result;
use std::sync::Arc;

pub mod mirror;
pub mod paragraph;

pub use mirror::MirrorWorker;
pub use paragraph::ParagraphWorker;

/// Builds the worker named in the configuration.
///
/// # Errors
///
/// Returns `IndexerError::Config` when the worker's collaborators cannot be
/// constructed (for example an empty IPFS gateway list for the Mirror
/// worker).
pub fn new(config: &Module, database: Arc<dyn DatabaseClient>) -> Result<Arc<dyn Worker>> {
    match config.worker {
        WorkerId::Paragraph => Ok(Arc::new(ParagraphWorker::new())),
        WorkerId::Mirror => Ok(Arc::new(MirrorWorker::new(config, database)?)),
    }
}

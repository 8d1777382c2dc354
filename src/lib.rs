//! An indexer node for the Arweave permaweb.
//!
//! The node streams raw transactions from the chain, selects those produced
//! by a configured publishing platform, normalizes each into a canonical
//! activity record, and persists the records together with a resumption
//! checkpoint — at-least-once, with the checkpoint committed in the same
//! database transaction as the activities it covers.
//!
//! # Quick Start
//!
//! ```no_run
//! use arweave_indexer::{Database, DatabaseClient, Module, Server};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> arweave_indexer::Result<()> {
//! let module = Module::from_yaml_file(std::path::Path::new("config.yaml"))?;
//!
//! let database = Arc::new(Database::new(&std::env::var("DATABASE_URL")?).await?);
//! database.initialize().await?;
//!
//! let server = Server::new(module, database).await?;
//! server.run(CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! The engine ties three concerns together:
//!
//! 1. **Source** ([`engine::Source`]) — streams ordered batches of raw
//!    transactions from the chain and owns the resumption cursor.
//! 2. **Worker** ([`engine::Worker`]) — filters and transforms each task
//!    into zero-or-one activity records, including content-addressed side
//!    lookups (IPFS blobs, base64 tag metadata, embedded JSON bodies).
//! 3. **Server** ([`Server`]) — fans matched tasks out to bounded parallel
//!    transformation, collects the results, and commits results plus
//!    checkpoint atomically.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public API exports
pub use config::{Module, Parameters};
pub use engine::{DataSourceFilter, Source, Task, Worker};
pub use indexer::Server;
pub use schema::{
    Action, Activity, ActivityType, Checkpoint, DatasetMirrorPost, Fee, Media, Metadata, Network,
    Platform, SocialPost, WorkerId,
};
pub use storage::{Database, DatabaseClient, TransactionFn};
pub use utils::error::{IndexerError, Result};

// Module declarations
pub mod config;
pub mod engine;
pub mod indexer;
pub mod provider;
pub mod schema;
pub mod storage;
pub mod utils;

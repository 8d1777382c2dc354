//! The indexer engine: tasks, sources, and workers.
//!
//! A [`Source`] streams ordered batches of [`Task`]s from one network and
//! owns the resumption cursor. A [`Worker`] recognizes and normalizes the
//! tasks of one platform into [`Activity`] records. The server in
//! [`crate::indexer`] binds one of each together and commits results plus
//! checkpoint atomically.

use crate::schema::{Activity, ActivityType, Network, Platform, Tag, WorkerId};
use crate::utils::error::{IndexerError, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub mod source;
pub mod worker;

pub use source::arweave::ArweaveTask;

/// An advisory predicate a worker hands to its source.
///
/// Each source defines the filter shape it knows how to interpret; handing
/// a source a filter variant it does not understand is a startup error. The
/// filter only prunes obviously uninteresting tasks — the worker re-checks
/// every task through [`Worker::match_task`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSourceFilter {
    /// Owner-address allow-list for the Arweave source. Empty means no
    /// restriction.
    Arweave { owner_addresses: Vec<String> },
}

/// A single transaction wrapped with its originating block and network.
///
/// Tasks are tagged by source family so workers can reject variants they
/// cannot process.
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    Arweave(ArweaveTask),
}

impl Task {
    /// The transaction identifier.
    #[must_use]
    pub fn id(&self) -> String {
        match self {
            Task::Arweave(task) => task.id(),
        }
    }

    /// The network the task originates from.
    #[must_use]
    pub fn network(&self) -> Network {
        match self {
            Task::Arweave(task) => task.network,
        }
    }

    /// Seeds an [`Activity`] from the task: identifier, timestamp, derived
    /// sender address, default fee, and `status = true`.
    ///
    /// # Errors
    ///
    /// Returns `IndexerError::Decoding` when the owner key cannot be
    /// decoded.
    pub fn build_activity(&self) -> Result<Activity> {
        match self {
            Task::Arweave(task) => task.build_activity(),
        }
    }
}

/// A polymorphic producer of tasks bound to one network.
pub trait Source: Send + Sync {
    /// The network this source reads from.
    fn network(&self) -> Network;

    /// An opaque snapshot of the source's progress.
    ///
    /// Safe to call concurrently with the running source. Restarting a
    /// fresh source from this state resumes at-least-once from the first
    /// unindexed transaction.
    fn state(&self) -> serde_json::Value;

    /// Starts producing in a background task and returns immediately.
    ///
    /// Batches are delivered on `tasks`; termination is signalled on
    /// `errors` — `Some(error)` for a fatal failure, `None` for a clean end
    /// of the stream.
    fn start(
        &self,
        cancel: CancellationToken,
        tasks: mpsc::Sender<Vec<Task>>,
        errors: mpsc::Sender<Option<IndexerError>>,
    );
}

/// A polymorphic consumer bound to one (network, platform) pair.
#[async_trait]
pub trait Worker: Send + Sync {
    /// Stable identifier of the worker.
    fn name(&self) -> WorkerId;

    /// The platform whose transactions this worker recognizes.
    fn platform(&self) -> Platform;

    /// Networks this worker can serve.
    fn networks(&self) -> Vec<Network>;

    /// Category tags of the activities this worker emits.
    fn tags(&self) -> Vec<Tag>;

    /// Activity types this worker emits.
    fn types(&self) -> Vec<ActivityType>;

    /// The advisory source filter for this worker.
    fn filter(&self) -> DataSourceFilter;

    /// Decides whether the task belongs to this worker's platform.
    ///
    /// Must not mutate database state.
    ///
    /// # Errors
    ///
    /// Returns `IndexerError::UnsupportedTask` for a task variant the
    /// worker cannot process, or `IndexerError::Decoding` when dispatch
    /// tags cannot be decoded.
    async fn match_task(&self, task: &Task) -> Result<bool>;

    /// Normalizes a matched task into an [`Activity`].
    ///
    /// May perform network I/O and persist worker-local side-table rows.
    ///
    /// # Errors
    ///
    /// Returns `IndexerError::Decoding` for malformed payloads; the engine
    /// logs and skips the task.
    async fn transform(&self, task: &Task) -> Result<Activity>;
}

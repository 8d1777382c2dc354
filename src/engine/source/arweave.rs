//! The Arweave task source.
//!
//! Walks the chain one block at a time from the checkpointed height,
//! fetches every transaction of the block, prunes those the worker's
//! owner-address filter rules out, and emits the rest as one batch per
//! block. The cursor advances before the batch is handed off, so a
//! checkpoint committed together with the batch always covers it.

use crate::config::Module;
use crate::engine::{DataSourceFilter, Source, Task};
use crate::provider::arweave;
use crate::schema::{Activity, ActivityType, Checkpoint, Fee, Network};
use crate::utils::error::{IndexerError, Result};
use crate::utils::logging::{self, LogLevel};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
const MAX_ATTEMPTS: u32 = 5;

/// An Arweave transaction wrapped with its originating block.
#[derive(Debug, Clone, PartialEq)]
pub struct ArweaveTask {
    pub network: Network,
    pub block: arweave::Block,
    pub transaction: arweave::Transaction,
}

impl ArweaveTask {
    /// The transaction identifier.
    #[must_use]
    pub fn id(&self) -> String {
        self.transaction.id.clone()
    }

    /// Seeds an activity from the raw transaction.
    ///
    /// The sender and recipient both default to the derived owner address;
    /// the type is refined by the worker from its first action.
    ///
    /// # Errors
    ///
    /// Returns `IndexerError::Decoding` when the owner key cannot be
    /// decoded.
    pub fn build_activity(&self) -> Result<Activity> {
        let owner = arweave::owner_address(&self.transaction.owner)?;

        let amount = if self.transaction.reward.is_empty() {
            "0".to_string()
        } else {
            self.transaction.reward.clone()
        };

        Ok(Activity {
            id: self.transaction.id.clone(),
            network: self.network,
            index: 0,
            from: owner.clone(),
            to: owner,
            kind: ActivityType::SocialPost,
            platform: None,
            fee: Fee {
                amount,
                decimal: self.network.fee_decimal(),
            },
            actions: Vec::new(),
            status: true,
            timestamp: self.block.timestamp,
        })
    }
}

/// Cursor state of the Arweave source.
///
/// `block_height` is the last block whose transactions have been emitted;
/// a fresh source resumes at the next block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    pub block_height: u64,
}

/// Source of Arweave tasks for one worker.
pub struct ArweaveSource {
    client: arweave::Client,
    owner_addresses: Vec<String>,
    state: Arc<RwLock<State>>,
    poll_interval: Duration,
}

impl ArweaveSource {
    /// Creates a source resuming from the given checkpoint.
    ///
    /// # Errors
    ///
    /// Returns `IndexerError::Config` when the endpoint list is empty or
    /// the checkpoint state does not parse as Arweave source state.
    pub fn new(config: &Module, filter: DataSourceFilter, checkpoint: &Checkpoint) -> Result<Self> {
        let DataSourceFilter::Arweave { owner_addresses } = filter;

        let client = arweave::Client::new(&config.parameters.rpc_endpoints)?;

        let mut state: State = serde_json::from_value(checkpoint.state.clone())
            .map_err(|error| IndexerError::Config(format!("invalid checkpoint state: {error}")))?;

        // A configured start block only applies when no progress is saved.
        if state.block_height == 0 {
            if let Some(start_block) = config.parameters.start_block {
                state.block_height = start_block.saturating_sub(1);
            }
        }

        let poll_interval = config
            .parameters
            .poll_interval_secs
            .map_or(DEFAULT_POLL_INTERVAL, Duration::from_secs);

        Ok(Self {
            client,
            owner_addresses,
            state: Arc::new(RwLock::new(state)),
            poll_interval,
        })
    }
}

impl Source for ArweaveSource {
    fn network(&self) -> Network {
        Network::Arweave
    }

    fn state(&self) -> serde_json::Value {
        let state = self.state.read().expect("state lock poisoned").clone();
        serde_json::to_value(state).expect("serialize source state")
    }

    fn start(
        &self,
        cancel: CancellationToken,
        tasks: mpsc::Sender<Vec<Task>>,
        errors: mpsc::Sender<Option<IndexerError>>,
    ) {
        let client = self.client.clone();
        let owner_addresses = self.owner_addresses.clone();
        let state = self.state.clone();
        let poll_interval = self.poll_interval;

        tokio::spawn(async move {
            let outcome = poll(
                &client,
                &owner_addresses,
                &state,
                poll_interval,
                &cancel,
                &tasks,
            )
            .await;

            let _ = errors.send(outcome.err()).await;
        });
    }
}

async fn poll(
    client: &arweave::Client,
    owner_addresses: &[String],
    state: &Arc<RwLock<State>>,
    poll_interval: Duration,
    cancel: &CancellationToken,
    tasks: &mpsc::Sender<Vec<Task>>,
) -> Result<()> {
    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }

        let latest = retry(cancel, || client.get_block_height()).await?;
        let current = state.read().expect("state lock poisoned").block_height;

        if current >= latest {
            tokio::select! {
                () = cancel.cancelled() => return Ok(()),
                () = tokio::time::sleep(poll_interval) => continue,
            }
        }

        let next = current + 1;
        let block = retry(cancel, || client.get_block_by_height(next)).await?;
        let transactions = retry(cancel, || client.get_transactions_by_block(&block)).await?;
        let total = transactions.len();

        let batch: Vec<Task> = transactions
            .into_iter()
            .filter(|transaction| allowed(owner_addresses, transaction))
            .map(|transaction| {
                Task::Arweave(ArweaveTask {
                    network: Network::Arweave,
                    block: block.clone(),
                    transaction,
                })
            })
            .collect();

        logging::log(
            LogLevel::Debug,
            &format!(
                "block {next}: {} of {total} transactions pass the filter",
                batch.len()
            ),
        );

        // Advance the cursor before handing the batch off, so the state a
        // commit snapshots always covers the batch it persists.
        state.write().expect("state lock poisoned").block_height = next;

        tokio::select! {
            () = cancel.cancelled() => return Ok(()),
            sent = tasks.send(batch) => {
                if sent.is_err() {
                    // Receiver gone: the server stopped.
                    return Ok(());
                }
            }
        }
    }
}

/// Applies the worker's owner-address allow-list.
///
/// Transactions whose owner key does not decode are kept; the worker makes
/// the final call in `match_task`.
fn allowed(owner_addresses: &[String], transaction: &arweave::Transaction) -> bool {
    if owner_addresses.is_empty() {
        return true;
    }

    match arweave::owner_address(&transaction.owner) {
        Ok(address) => owner_addresses.iter().any(|allowed| *allowed == address),
        Err(_) => true,
    }
}

async fn retry<T, F, Fut>(cancel: &CancellationToken, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay = Duration::from_secs(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < MAX_ATTEMPTS => {
                logging::log(
                    LogLevel::Warning,
                    &format!("rpc attempt {attempt}/{MAX_ATTEMPTS} failed: {error}"),
                );

                tokio::select! {
                    () = cancel.cancelled() => return Err(error),
                    () = tokio::time::sleep(delay) => {}
                }

                delay *= 2;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

//! The indexer server: one source bound to one worker.
//!
//! The server drains task batches from its source, fans each batch out to a
//! bounded set of concurrent transforms, and commits the surviving
//! activities together with the source's checkpoint in a single database
//! transaction. Batches are handled strictly serially; per-task failures
//! are logged and skipped, per-batch storage failures abort the run.

use crate::config::Module;
use crate::engine::{source, worker, Source, Task, Worker};
use crate::schema::Checkpoint;
use crate::storage::{DatabaseClient, TransactionFn};
use crate::utils::error::{IndexerError, Result};
use crate::utils::logging::{self, LogLevel};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Binds a source to a worker and runs the indexing loop.
pub struct Server {
    id: String,
    config: Module,
    source: Box<dyn Source>,
    worker: Arc<dyn Worker>,
    database: Arc<dyn DatabaseClient>,
    concurrency: usize,
}

impl Server {
    /// Creates a server for the configured `(network, worker)` pair.
    ///
    /// Loads the checkpoint so the source resumes where the last run
    /// stopped.
    ///
    /// # Errors
    ///
    /// Returns `IndexerError::Config` for invalid configuration and
    /// `IndexerError::Database` when the checkpoint cannot be loaded.
    pub async fn new(config: Module, database: Arc<dyn DatabaseClient>) -> Result<Self> {
        config.validate()?;

        let worker = worker::new(&config, database.clone())?;

        if !worker.networks().contains(&config.network) {
            return Err(IndexerError::Config(format!(
                "worker {} does not serve network {}",
                worker.name(),
                config.network
            )));
        }

        let id = Checkpoint::build_id(config.network, worker.name());

        let checkpoint = database
            .load_checkpoint(&id, config.network, worker.name())
            .await?;

        logging::log(
            LogLevel::Info,
            &format!("loaded checkpoint {}: {}", checkpoint.id, checkpoint.state),
        );

        let source = source::new(&config, worker.filter(), &checkpoint)?;

        let concurrency = config
            .parameters
            .concurrency
            .unwrap_or_else(|| 20 * num_cpus::get());

        Ok(Self {
            id,
            config,
            source,
            worker,
            database,
            concurrency,
        })
    }

    /// Creates a server from explicit components.
    ///
    /// This is useful for testing with mock sources, workers, and storage.
    #[must_use]
    pub fn with_components(
        config: Module,
        source: Box<dyn Source>,
        worker: Arc<dyn Worker>,
        database: Arc<dyn DatabaseClient>,
    ) -> Self {
        let id = Checkpoint::build_id(source.network(), worker.name());
        let concurrency = config
            .parameters
            .concurrency
            .unwrap_or_else(|| 20 * num_cpus::get());

        Self {
            id,
            config,
            source,
            worker,
            database,
            concurrency,
        }
    }

    /// Runs the indexing loop until the source terminates or `cancel`
    /// fires.
    ///
    /// A `None` on the source's error channel is a clean end of stream; a
    /// `Some(error)` terminates the run with that error.
    ///
    /// # Errors
    ///
    /// Returns the source's fatal error, or any storage error raised while
    /// committing a batch.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        logging::log_startup(
            self.config.network.as_str(),
            self.worker.name().as_str(),
            &self.config.parameters.rpc_endpoints,
        );

        let (tasks_tx, mut tasks_rx) = mpsc::channel::<Vec<Task>>(1);
        let (errors_tx, mut errors_rx) = mpsc::channel::<Option<IndexerError>>(1);

        self.source.start(cancel.clone(), tasks_tx, errors_tx);

        loop {
            tokio::select! {
                // Drain pending batches before acting on source
                // termination or shutdown.
                biased;

                Some(tasks) = tasks_rx.recv() => {
                    self.handle_tasks(tasks).await?;
                }
                Some(outcome) = errors_rx.recv() => {
                    return match outcome {
                        Some(error) => {
                            logging::log_error("source failed", &error.to_string());
                            Err(error)
                        }
                        None => {
                            logging::log(LogLevel::Success, "source exhausted, stopping");
                            Ok(())
                        }
                    };
                }
                () = cancel.cancelled() => {
                    logging::log(LogLevel::Info, "shutdown requested, stopping");
                    return Ok(());
                }
            }
        }
    }

    /// Transforms one batch and commits it atomically with the checkpoint.
    async fn handle_tasks(&self, tasks: Vec<Task>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let started = std::time::Instant::now();
        let total = tasks.len();
        let cap = total.min(self.concurrency);

        let semaphore = Arc::new(Semaphore::new(cap));
        let mut transforms: JoinSet<Option<crate::schema::Activity>> = JoinSet::new();

        for task in tasks {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|error| IndexerError::Internal(format!("semaphore closed: {error}")))?;

            let worker = self.worker.clone();

            transforms.spawn(async move {
                let _permit = permit;
                let task_id = task.id();

                match worker.match_task(&task).await {
                    Ok(true) => {}
                    Ok(false) => {
                        logging::log(LogLevel::Debug, &format!("unmatched task {task_id}"));
                        return None;
                    }
                    Err(error) => {
                        logging::log_error("match task", &format!("{task_id}: {error}"));
                        return None;
                    }
                }

                match worker.transform(&task).await {
                    Ok(activity) => Some(activity),
                    Err(error) => {
                        logging::log_error("transform task", &format!("{task_id}: {error}"));
                        None
                    }
                }
            });
        }

        let mut activities = Vec::new();

        while let Some(joined) = transforms.join_next().await {
            match joined {
                Ok(Some(activity)) => activities.push(activity),
                Ok(None) => {}
                Err(error) => logging::log_error("transform panicked", &error.to_string()),
            }
        }

        let checkpoint = Checkpoint {
            id: self.id.clone(),
            network: self.source.network(),
            worker: self.worker.name(),
            state: self.source.state(),
        };

        logging::log_checkpoint(&checkpoint.id, &checkpoint.state);

        let collected = activities.len();

        let commit: TransactionFn = Box::new(move |client| {
            Box::pin(async move {
                client.save_activities(&activities).await?;
                client.save_checkpoint(&checkpoint).await?;
                Ok(())
            })
        });

        self.database.with_transaction(commit).await?;

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        logging::log_batch(collected, total, duration_ms);

        Ok(())
    }
}

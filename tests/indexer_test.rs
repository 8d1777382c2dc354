//! Tests of the indexer loop: batch handling, checkpoint atomicity, and
//! source termination.

use arweave_indexer::config::{Module, Parameters};
use arweave_indexer::engine::{ArweaveTask, DataSourceFilter, Source, Task, Worker};
use arweave_indexer::provider::arweave::{Block, Transaction};
use arweave_indexer::schema::{
    Activity, ActivityType, Checkpoint, DatasetMirrorPost, Network, Platform,
    Tag as ActionTag, WorkerId,
};
use arweave_indexer::storage::{DatabaseClient, TransactionFn};
use arweave_indexer::utils::error::{IndexerError, Result};
use arweave_indexer::Server;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A source that replays scripted batches and then terminates.
struct MockSource {
    batches: Mutex<Vec<Vec<Task>>>,
    terminal_error: Option<String>,
    state: serde_json::Value,
}

impl MockSource {
    fn new(batches: Vec<Vec<Task>>) -> Self {
        Self {
            batches: Mutex::new(batches),
            terminal_error: None,
            state: serde_json::json!({ "block_height": 42 }),
        }
    }

    fn failing(batches: Vec<Vec<Task>>, message: &str) -> Self {
        Self {
            batches: Mutex::new(batches),
            terminal_error: Some(message.to_string()),
            state: serde_json::json!({ "block_height": 42 }),
        }
    }
}

impl Source for MockSource {
    fn network(&self) -> Network {
        Network::Arweave
    }

    fn state(&self) -> serde_json::Value {
        self.state.clone()
    }

    fn start(
        &self,
        _cancel: CancellationToken,
        tasks: mpsc::Sender<Vec<Task>>,
        errors: mpsc::Sender<Option<IndexerError>>,
    ) {
        let batches = std::mem::take(&mut *self.batches.lock().unwrap());
        let terminal_error = self.terminal_error.clone();

        tokio::spawn(async move {
            for batch in batches {
                if tasks.send(batch).await.is_err() {
                    return;
                }
            }

            let outcome = terminal_error.map(IndexerError::Rpc);
            let _ = errors.send(outcome).await;
        });
    }
}

/// A worker whose behavior is driven by the task id prefix: `skip-*` does
/// not match, `fail-*` fails to transform, everything else succeeds.
struct MockWorker;

#[async_trait]
impl Worker for MockWorker {
    fn name(&self) -> WorkerId {
        WorkerId::Paragraph
    }

    fn platform(&self) -> Platform {
        Platform::Paragraph
    }

    fn networks(&self) -> Vec<Network> {
        vec![Network::Arweave]
    }

    fn tags(&self) -> Vec<ActionTag> {
        vec![ActionTag::Social]
    }

    fn types(&self) -> Vec<ActivityType> {
        vec![ActivityType::SocialPost]
    }

    fn filter(&self) -> DataSourceFilter {
        DataSourceFilter::Arweave {
            owner_addresses: vec![],
        }
    }

    async fn match_task(&self, task: &Task) -> Result<bool> {
        Ok(!task.id().starts_with("skip"))
    }

    async fn transform(&self, task: &Task) -> Result<Activity> {
        if task.id().starts_with("fail") {
            return Err(IndexerError::Decoding("scripted failure".to_string()));
        }

        task.build_activity()
    }
}

/// In-memory database with transactional staging: the body of
/// `with_transaction` runs against a copy, which replaces the shared state
/// only when the body succeeds.
#[derive(Default)]
struct MockDatabase {
    activities: Arc<Mutex<HashMap<String, Activity>>>,
    checkpoints: Arc<Mutex<HashMap<String, Checkpoint>>>,
    posts: Arc<Mutex<Vec<DatasetMirrorPost>>>,
    fail_save_checkpoint: Arc<AtomicBool>,
}

impl MockDatabase {
    fn snapshot(&self) -> Self {
        Self {
            activities: Arc::new(Mutex::new(self.activities.lock().unwrap().clone())),
            checkpoints: Arc::new(Mutex::new(self.checkpoints.lock().unwrap().clone())),
            posts: Arc::new(Mutex::new(self.posts.lock().unwrap().clone())),
            fail_save_checkpoint: self.fail_save_checkpoint.clone(),
        }
    }

    fn commit(&self, staged: &Self) {
        *self.activities.lock().unwrap() = staged.activities.lock().unwrap().clone();
        *self.checkpoints.lock().unwrap() = staged.checkpoints.lock().unwrap().clone();
        *self.posts.lock().unwrap() = staged.posts.lock().unwrap().clone();
    }

    fn activity_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.activities.lock().unwrap().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn checkpoint(&self, id: &str) -> Option<Checkpoint> {
        self.checkpoints.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabase {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn load_checkpoint(
        &self,
        id: &str,
        network: Network,
        worker: WorkerId,
    ) -> Result<Checkpoint> {
        Ok(self
            .checkpoints
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_else(|| Checkpoint::new(network, worker)))
    }

    async fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()> {
        if self.fail_save_checkpoint.load(Ordering::SeqCst) {
            return Err(IndexerError::Database(sqlx::Error::PoolTimedOut));
        }

        self.checkpoints
            .lock()
            .unwrap()
            .insert(checkpoint.id.clone(), checkpoint.clone());
        Ok(())
    }

    async fn save_activities(&self, activities: &[Activity]) -> Result<()> {
        let mut stored = self.activities.lock().unwrap();
        for activity in activities {
            stored.insert(activity.id.clone(), activity.clone());
        }
        Ok(())
    }

    async fn load_dataset_mirror_post(
        &self,
        origin_content_digest: &str,
    ) -> Result<Option<DatasetMirrorPost>> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .find(|post| post.origin_content_digest == origin_content_digest)
            .cloned())
    }

    async fn save_dataset_mirror_post(&self, post: &DatasetMirrorPost) -> Result<()> {
        self.posts.lock().unwrap().push(post.clone());
        Ok(())
    }

    async fn with_transaction(&self, f: TransactionFn) -> Result<()> {
        let staged = self.snapshot();
        f(&staged).await?;
        self.commit(&staged);
        Ok(())
    }
}

fn module() -> Module {
    Module {
        network: Network::Arweave,
        worker: WorkerId::Paragraph,
        parameters: Parameters {
            rpc_endpoints: vec!["https://arweave.net".to_string()],
            concurrency: Some(4),
            ..Parameters::default()
        },
    }
}

fn make_task(id: &str) -> Task {
    Task::Arweave(ArweaveTask {
        network: Network::Arweave,
        block: Block {
            height: 42,
            timestamp: 1_700_000_000,
            txs: vec![id.to_string()],
        },
        transaction: Transaction {
            id: id.to_string(),
            owner: "AQAB".to_string(),
            reward: "100".to_string(),
            ..Transaction::default()
        },
    })
}

fn server(batches: Vec<Vec<Task>>, database: Arc<MockDatabase>) -> Server {
    Server::with_components(
        module(),
        Box::new(MockSource::new(batches)),
        Arc::new(MockWorker),
        database,
    )
}

#[tokio::test]
async fn test_batch_commits_activities_and_checkpoint() {
    let database = Arc::new(MockDatabase::default());
    let server = server(vec![vec![make_task("tx-1"), make_task("tx-2")]], database.clone());

    server.run(CancellationToken::new()).await.unwrap();

    assert_eq!(database.activity_ids(), vec!["tx-1", "tx-2"]);

    let checkpoint = database.checkpoint("arweave.paragraph").unwrap();
    assert_eq!(checkpoint.network, Network::Arweave);
    assert_eq!(checkpoint.worker, WorkerId::Paragraph);
    assert_eq!(checkpoint.state, serde_json::json!({ "block_height": 42 }));
}

#[tokio::test]
async fn test_checkpoint_failure_rolls_back_batch() {
    let database = Arc::new(MockDatabase::default());
    database.fail_save_checkpoint.store(true, Ordering::SeqCst);

    let failing = server(vec![vec![make_task("tx-1")]], database.clone());
    let outcome = failing.run(CancellationToken::new()).await;

    assert!(matches!(outcome, Err(IndexerError::Database(_))));
    assert!(database.activity_ids().is_empty());
    assert!(database.checkpoint("arweave.paragraph").is_none());

    // The fault cleared, a new run re-processes the same batch and commits
    // both sides together.
    database.fail_save_checkpoint.store(false, Ordering::SeqCst);

    let retry = server(vec![vec![make_task("tx-1")]], database.clone());
    retry.run(CancellationToken::new()).await.unwrap();

    assert_eq!(database.activity_ids(), vec!["tx-1"]);
    assert!(database.checkpoint("arweave.paragraph").is_some());
}

#[tokio::test]
async fn test_per_task_failures_do_not_abort_the_batch() {
    let database = Arc::new(MockDatabase::default());
    let server = server(
        vec![vec![
            make_task("tx-ok"),
            make_task("fail-decode"),
            make_task("skip-unmatched"),
        ]],
        database.clone(),
    );

    server.run(CancellationToken::new()).await.unwrap();

    // Only the successful transform is persisted, but the checkpoint still
    // advances for the whole batch.
    assert_eq!(database.activity_ids(), vec!["tx-ok"]);
    assert!(database.checkpoint("arweave.paragraph").is_some());
}

#[tokio::test]
async fn test_empty_batch_is_an_idle_tick() {
    let database = Arc::new(MockDatabase::default());
    let server = server(vec![vec![]], database.clone());

    server.run(CancellationToken::new()).await.unwrap();

    assert!(database.activity_ids().is_empty());
    assert!(database.checkpoint("arweave.paragraph").is_none());
}

#[tokio::test]
async fn test_source_error_terminates_the_run() {
    let database = Arc::new(MockDatabase::default());
    let source = MockSource::failing(vec![vec![make_task("tx-1")]], "gateway unreachable");

    let server = Server::with_components(
        module(),
        Box::new(source),
        Arc::new(MockWorker),
        database.clone(),
    );

    let outcome = server.run(CancellationToken::new()).await;
    assert!(matches!(outcome, Err(IndexerError::Rpc(_))));

    // The batch delivered before the failure was still committed.
    assert_eq!(database.activity_ids(), vec!["tx-1"]);
}

#[tokio::test]
async fn test_reprocessing_is_idempotent() {
    let database = Arc::new(MockDatabase::default());

    let first = server(vec![vec![make_task("tx-1"), make_task("tx-2")]], database.clone());
    first.run(CancellationToken::new()).await.unwrap();

    let after_first = database.activity_ids();

    let second = server(vec![vec![make_task("tx-1"), make_task("tx-2")]], database.clone());
    second.run(CancellationToken::new()).await.unwrap();

    assert_eq!(database.activity_ids(), after_first);
}

//! Storage and database utilities for the indexer.
//!
//! This module provides database interaction utilities, connection pool
//! management, and the transactional batch commit that keeps persisted
//! activities and their checkpoint consistent.

use crate::schema::{Activity, Checkpoint, DatasetMirrorPost, Network, WorkerId};
use crate::utils::error::{IndexerError, Result};
use async_trait::async_trait;
use futures::future::BoxFuture;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions, Postgres};
use std::str::FromStr;
use std::time::Duration;

/// The body of a transactional batch commit.
///
/// Receives a client scoped to the open transaction; every operation issued
/// through it commits or rolls back as one unit.
pub type TransactionFn =
    Box<dyn for<'a> FnOnce(&'a dyn DatabaseClient) -> BoxFuture<'a, Result<()>> + Send>;

/// Abstract interface for indexer persistence.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Creates the database schema if it does not exist yet.
    async fn initialize(&self) -> Result<()>;

    /// Loads the checkpoint for a `(network, worker)` pair.
    ///
    /// Absence is not an error: a fresh checkpoint with an empty state is
    /// returned instead.
    async fn load_checkpoint(
        &self,
        id: &str,
        network: Network,
        worker: WorkerId,
    ) -> Result<Checkpoint>;

    /// Upserts a checkpoint by id.
    async fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()>;

    /// Saves a batch of activities, idempotently by `(network, id)`.
    async fn save_activities(&self, activities: &[Activity]) -> Result<()>;

    /// Loads the first-seen Mirror post recorded for a digest.
    async fn load_dataset_mirror_post(
        &self,
        origin_content_digest: &str,
    ) -> Result<Option<DatasetMirrorPost>>;

    /// Upserts a Mirror post record by transaction id.
    async fn save_dataset_mirror_post(&self, post: &DatasetMirrorPost) -> Result<()>;

    /// Runs `f` against a transaction-scoped client and commits on success,
    /// rolls back on failure.
    async fn with_transaction(&self, f: TransactionFn) -> Result<()>;
}

/// PostgreSQL-backed [`DatabaseClient`].
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Creates a new database handle with a connection pool.
    ///
    /// # Errors
    ///
    /// Returns `IndexerError::Database` if the connection fails.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DatabaseClient for Database {
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS activities (
                id TEXT NOT NULL,
                network TEXT NOT NULL,
                platform TEXT,
                data JSONB NOT NULL,
                indexed_at TIMESTAMPTZ DEFAULT NOW(),
                PRIMARY KEY (network, id)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS checkpoints (
                id TEXT PRIMARY KEY,
                network TEXT NOT NULL,
                worker TEXT NOT NULL,
                state JSONB NOT NULL,
                updated_at TIMESTAMPTZ DEFAULT NOW()
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS dataset_mirror_posts (
                transaction_id TEXT PRIMARY KEY,
                origin_content_digest TEXT NOT NULL DEFAULT '',
                indexed_at TIMESTAMPTZ DEFAULT NOW()
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_dataset_mirror_posts_digest
            ON dataset_mirror_posts(origin_content_digest)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_checkpoint(
        &self,
        id: &str,
        network: Network,
        worker: WorkerId,
    ) -> Result<Checkpoint> {
        let mut connection = self.pool.acquire().await?;
        load_checkpoint(&mut connection, id, network, worker).await
    }

    async fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()> {
        let mut connection = self.pool.acquire().await?;
        save_checkpoint(&mut connection, checkpoint).await
    }

    async fn save_activities(&self, activities: &[Activity]) -> Result<()> {
        let mut connection = self.pool.acquire().await?;
        save_activities(&mut connection, activities).await
    }

    async fn load_dataset_mirror_post(
        &self,
        origin_content_digest: &str,
    ) -> Result<Option<DatasetMirrorPost>> {
        let mut connection = self.pool.acquire().await?;
        load_dataset_mirror_post(&mut connection, origin_content_digest).await
    }

    async fn save_dataset_mirror_post(&self, post: &DatasetMirrorPost) -> Result<()> {
        let mut connection = self.pool.acquire().await?;
        save_dataset_mirror_post(&mut connection, post).await
    }

    async fn with_transaction(&self, f: TransactionFn) -> Result<()> {
        let transaction = self.pool.begin().await?;
        let client = TransactionClient {
            transaction: tokio::sync::Mutex::new(transaction),
        };

        let outcome = f(&client).await;
        let transaction = client.transaction.into_inner();

        match outcome {
            Ok(()) => {
                transaction.commit().await?;
                Ok(())
            }
            Err(error) => {
                // Roll back and surface the original error.
                let _ = transaction.rollback().await;
                Err(error)
            }
        }
    }
}

/// A [`DatabaseClient`] scoped to one open transaction.
///
/// Valid only for the duration of the `with_transaction` body it was handed
/// to; nested transactions are not supported.
struct TransactionClient {
    transaction: tokio::sync::Mutex<sqlx::Transaction<'static, Postgres>>,
}

#[async_trait]
impl DatabaseClient for TransactionClient {
    async fn initialize(&self) -> Result<()> {
        Err(IndexerError::Internal(
            "schema initialization inside a transaction".to_string(),
        ))
    }

    async fn load_checkpoint(
        &self,
        id: &str,
        network: Network,
        worker: WorkerId,
    ) -> Result<Checkpoint> {
        let mut transaction = self.transaction.lock().await;
        load_checkpoint(&mut transaction, id, network, worker).await
    }

    async fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()> {
        let mut transaction = self.transaction.lock().await;
        save_checkpoint(&mut transaction, checkpoint).await
    }

    async fn save_activities(&self, activities: &[Activity]) -> Result<()> {
        let mut transaction = self.transaction.lock().await;
        save_activities(&mut transaction, activities).await
    }

    async fn load_dataset_mirror_post(
        &self,
        origin_content_digest: &str,
    ) -> Result<Option<DatasetMirrorPost>> {
        let mut transaction = self.transaction.lock().await;
        load_dataset_mirror_post(&mut transaction, origin_content_digest).await
    }

    async fn save_dataset_mirror_post(&self, post: &DatasetMirrorPost) -> Result<()> {
        let mut transaction = self.transaction.lock().await;
        save_dataset_mirror_post(&mut transaction, post).await
    }

    async fn with_transaction(&self, _f: TransactionFn) -> Result<()> {
        Err(IndexerError::Internal(
            "nested transactions are not supported".to_string(),
        ))
    }
}

async fn load_checkpoint(
    connection: &mut PgConnection,
    id: &str,
    network: Network,
    worker: WorkerId,
) -> Result<Checkpoint> {
    let row: Option<(String, String, serde_json::Value)> =
        sqlx::query_as("SELECT network, worker, state FROM checkpoints WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *connection)
            .await?;

    match row {
        Some((row_network, row_worker, state)) => Ok(Checkpoint {
            id: id.to_string(),
            network: Network::from_str(&row_network)?,
            worker: WorkerId::from_str(&row_worker)?,
            state,
        }),
        None => Ok(Checkpoint {
            id: id.to_string(),
            network,
            worker,
            state: serde_json::json!({}),
        }),
    }
}

async fn save_checkpoint(connection: &mut PgConnection, checkpoint: &Checkpoint) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO checkpoints (id, network, worker, state, updated_at)
        VALUES ($1, $2, $3, $4, NOW())
        ON CONFLICT (id) DO UPDATE SET state = EXCLUDED.state, updated_at = NOW()
        ",
    )
    .bind(&checkpoint.id)
    .bind(checkpoint.network.as_str())
    .bind(checkpoint.worker.as_str())
    .bind(&checkpoint.state)
    .execute(&mut *connection)
    .await?;

    Ok(())
}

async fn save_activities(connection: &mut PgConnection, activities: &[Activity]) -> Result<()> {
    for activity in activities {
        let data = serde_json::to_value(activity)
            .map_err(|error| IndexerError::Internal(format!("serialize activity: {error}")))?;

        sqlx::query(
            r"
            INSERT INTO activities (id, network, platform, data)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (network, id) DO UPDATE SET data = EXCLUDED.data
            ",
        )
        .bind(&activity.id)
        .bind(activity.network.as_str())
        .bind(activity.platform.map(|platform| platform.to_string()))
        .bind(data)
        .execute(&mut *connection)
        .await?;
    }

    Ok(())
}

async fn load_dataset_mirror_post(
    connection: &mut PgConnection,
    origin_content_digest: &str,
) -> Result<Option<DatasetMirrorPost>> {
    let row: Option<(String, String)> = sqlx::query_as(
        r"
        SELECT transaction_id, origin_content_digest FROM dataset_mirror_posts
        WHERE origin_content_digest = $1
        ORDER BY indexed_at ASC
        LIMIT 1
        ",
    )
    .bind(origin_content_digest)
    .fetch_optional(&mut *connection)
    .await?;

    Ok(row.map(|(transaction_id, origin_content_digest)| DatasetMirrorPost {
        transaction_id,
        origin_content_digest,
    }))
}

async fn save_dataset_mirror_post(
    connection: &mut PgConnection,
    post: &DatasetMirrorPost,
) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO dataset_mirror_posts (transaction_id, origin_content_digest)
        VALUES ($1, $2)
        ON CONFLICT (transaction_id) DO UPDATE
        SET origin_content_digest = EXCLUDED.origin_content_digest
        ",
    )
    .bind(&post.transaction_id)
    .bind(&post.origin_content_digest)
    .execute(&mut *connection)
    .await?;

    Ok(())
}

//! Error types for indexer operations.
//!
//! This module defines a comprehensive error enumeration using `thiserror`
//! to provide clear, actionable error reporting throughout the node.

use thiserror::Error;

/// Custom error type for indexer operations.
///
/// This error type covers all potential failure modes in the indexer, from
/// configuration issues to runtime failures in gateway communication,
/// database operations, and payload decoding.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// Errors encountered during database operations.
    ///
    /// This variant automatically wraps `sqlx::Error` using the `#[from]`
    /// attribute, allowing seamless error propagation with the `?` operator.
    /// A database failure aborts the batch it occurred in.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Errors interacting with the chain RPC gateways.
    ///
    /// This covers network failures, timeouts, or unexpected responses from
    /// the configured Arweave endpoints.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// All configured IPFS gateways failed for a fetch.
    #[error("IPFS unavailable: {0}")]
    IpfsUnavailable(String),

    /// Errors decoding on-chain payloads.
    ///
    /// This includes base64 decoding failures, malformed embedded JSON, and
    /// missing required fields. Expected for non-matching traffic; a worker
    /// skips the offending task.
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// A task reached a worker that cannot process it.
    #[error("Unsupported task: {0}")]
    UnsupportedTask(String),

    /// Errors related to configuration.
    ///
    /// This includes missing endpoints, unknown worker names, or mismatched
    /// source and filter pairs. Raised at startup, before the run loop.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors from environment variable operations.
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Generic errors for operations that don't fit other categories.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Type alias for Results using `IndexerError`.
pub type Result<T> = std::result::Result<T, IndexerError>;

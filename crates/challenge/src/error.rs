//! Error types for challenge preparation.

use crate::call::CallError;
use faultproof_types::{BlockNumber, Hash};
use std::path::PathBuf;
use thiserror::Error;

/// Invalid or missing configuration. Always raised before any side effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("Missing required variable {0}")]
    MissingVar(&'static str),

    /// An environment variable does not parse.
    #[error("Invalid value for {name}: {value:?}")]
    InvalidVar {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },

    /// The disputed block has no successor to dispute.
    #[error("{0} has no successor")]
    NoSuccessor(BlockNumber),

    /// A required input file does not exist.
    #[error("Missing input file {}", .0.display())]
    MissingFile(PathBuf),

    /// A checkpoint file is malformed.
    #[error("Invalid checkpoint: {0}")]
    InvalidCheckpoint(String),

    /// The assertion root file is not exactly 32 bytes.
    #[error("Assertion root must be 32 bytes, got {0}")]
    InvalidAssertionRoot(usize),
}

/// Errors reported by a block registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A different hash is already registered for the block.
    #[error("{block} already registered as {registered}, refusing {attempted}")]
    Conflict {
        /// Block number.
        block: BlockNumber,
        /// Hash on record.
        registered: Hash,
        /// Hash that was offered.
        attempted: Hash,
    },

    /// The registry could not be reached.
    #[error("Registry unavailable: {0}")]
    Unavailable(String),
}

/// A node push or claim submission rejected by the verifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// The verifier refused a node.
    #[error("Node rejected: {0}")]
    NodeRejected(String),

    /// A pushed node is not in the verifier's cache.
    #[error("Node {0} missing from verifier cache after push")]
    NodeNotCached(Hash),

    /// The verifier refused the claim.
    #[error("Claim rejected: {0}")]
    ClaimRejected(String),

    /// The verifier could not be reached.
    #[error("Verifier unavailable: {0}")]
    Unavailable(String),
}

/// Failure of a challenge preparation attempt.
#[derive(Debug, Error)]
pub enum ChallengeError {
    /// Invalid configuration or input files.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The merged checkpoints do not cover every node the call touches.
    #[error("Missing preimage for {0}: supply a wider checkpoint set")]
    MissingPreimage(Hash),

    /// The disputed block does not match the registry commitment.
    #[error("Registry mismatch for {block}: expected {expected:?}, got {actual}")]
    RegistryMismatch {
        /// Block whose hash was checked.
        block: BlockNumber,
        /// Hash on record, if any.
        expected: Option<Hash>,
        /// Hash presented.
        actual: Hash,
    },

    /// The registry failed.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The verifier rejected a submission.
    #[error("Submission failed: {0}")]
    Submission(#[from] SubmissionError),

    /// The dispute call fails locally.
    #[error("Dispute call failed: {0}")]
    Call(#[from] CallError),

    /// An input file could not be read or written.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl ChallengeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ChallengeError::Io {
            path: path.into(),
            source,
        }
    }
}

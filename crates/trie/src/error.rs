//! Error types for trie operations.

use faultproof_types::Hash;
use thiserror::Error;

/// Errors while reading or writing a state trie.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrieError {
    /// A dereferenced node is not in the backing store.
    #[error("Missing preimage for trie node {0}")]
    MissingPreimage(Hash),

    /// A stored preimage does not decode as a trie node.
    #[error("Corrupt trie node {hash}: {reason}")]
    Corrupt {
        /// Hash the preimage was stored under.
        hash: Hash,
        /// Decoder failure.
        reason: String,
    },

    /// Empty values are indistinguishable from absent ones in the encoding.
    #[error("Empty values cannot be stored")]
    EmptyValue,
}

/// Errors while decoding a trie node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// Malformed RLP.
    #[error("RLP decode error: {0}")]
    Rlp(String),

    /// A node list with an item count other than 2 or 17.
    #[error("Unexpected node item count: {0}")]
    ItemCount(usize),

    /// Invalid hex-prefix path encoding.
    #[error("Invalid compact path: {0}")]
    InvalidPath(String),

    /// A child reference that is neither empty nor 32 bytes.
    #[error("Invalid child reference of {0} bytes")]
    InvalidChild(usize),

    /// Structurally valid but not the unique encoding of its content.
    #[error("Non-canonical node: {0}")]
    NonCanonical(&'static str),
}

impl From<alloy_rlp::Error> for NodeError {
    fn from(e: alloy_rlp::Error) -> Self {
        NodeError::Rlp(e.to_string())
    }
}

/// Errors while storing a preimage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreimageError {
    /// The preimage does not hash to the key it was supplied under.
    #[error("Preimage hashes to {actual}, expected {expected}")]
    Mismatch {
        /// Key the preimage was supplied under.
        expected: Hash,
        /// Actual hash of the preimage.
        actual: Hash,
    },
}

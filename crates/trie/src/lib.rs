//! Content-addressed Merkle-Patricia state trie.
//!
//! # Overview
//!
//! - [`PreimageStore`]: hash to preimage mapping, append-only
//! - [`TrieNode`]: leaf, extension and branch nodes with a canonical encoding
//! - [`StateTrie`]: lazily resolved key/value view over a root hash
//! - [`extract`]: shadow-runs an [`Operation`] and records its witness
//!
//! Every node is addressed by the Keccak-256 hash of its encoding, so a
//! partially populated store is a legal backing for a trie as long as the
//! operations performed stay on populated paths.

mod error;
mod nibbles;
mod node;
mod preimage;
mod store;
mod trie;
mod witness;

pub use error::{NodeError, PreimageError, TrieError};
pub use nibbles::Nibbles;
pub use node::{TrieNode, BRANCH_WIDTH};
pub use preimage::PreimageStore;
pub use store::NodeStore;
pub use trie::StateTrie;
pub use witness::{
    extract, extract_with, Extraction, Operation, WitnessError, WitnessRecorder, WitnessSet,
};

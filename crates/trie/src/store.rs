//! Storage seam between the trie and its node source.

use crate::{PreimageStore, TrieError};
use faultproof_types::Hash;

/// Source and sink of encoded trie nodes, keyed by content hash.
///
/// The trie never looks at storage directly: every dereference goes through
/// [`get_node`](Self::get_node) and every new node through
/// [`insert_node`](Self::insert_node). Wrapping a store therefore observes
/// exactly the nodes an operation touches, which is how witnesses are
/// extracted.
pub trait NodeStore {
    /// Fetch the encoding of the node with the given hash.
    fn get_node(&self, hash: &Hash) -> Result<Vec<u8>, TrieError>;

    /// Store an encoded node and return its hash.
    fn insert_node(&mut self, encoded: Vec<u8>) -> Hash;
}

impl NodeStore for PreimageStore {
    fn get_node(&self, hash: &Hash) -> Result<Vec<u8>, TrieError> {
        self.require(hash).map(<[u8]>::to_vec)
    }

    fn insert_node(&mut self, encoded: Vec<u8>) -> Hash {
        self.put(encoded)
    }
}

impl<S: NodeStore + ?Sized> NodeStore for &mut S {
    fn get_node(&self, hash: &Hash) -> Result<Vec<u8>, TrieError> {
        (**self).get_node(hash)
    }

    fn insert_node(&mut self, encoded: Vec<u8>) -> Hash {
        (**self).insert_node(encoded)
    }
}

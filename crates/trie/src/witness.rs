//! Witness extraction.
//!
//! An operation is shadow-run against a [`StateTrie`] backed by a
//! [`WitnessRecorder`]. The recorder wraps the real preimage store the same
//! way a speculative overlay does: reads check the overlay then fall through
//! to the base, writes only land in the overlay. On top of that it logs every
//! node the operation touches, so the caller learns exactly which preimages a
//! verifier holding none of the trie must be shown to replay the operation.
//!
//! # Example
//!
//! ```
//! use faultproof_trie::{extract_with, PreimageStore, StateTrie};
//!
//! let mut trie = StateTrie::new(PreimageStore::new());
//! trie.put(b"key", b"value".to_vec()).unwrap();
//! let (root, store) = (trie.root(), trie.into_store());
//!
//! let extraction = extract_with(root, &store, |trie| trie.get(b"key")).unwrap();
//! assert_eq!(extraction.output, Some(b"value".to_vec()));
//! assert!(!extraction.witness.is_empty());
//! ```

use crate::{NodeStore, PreimageStore, StateTrie, TrieError};
use faultproof_types::Hash;
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// A state-touching computation that can be replayed against any node store.
pub trait Operation {
    /// Result of a successful run.
    type Output;

    /// Failure of a run. Trie failures must be representable.
    type Error: From<TrieError>;

    /// Run against `trie`. The trie may be rebound with
    /// [`StateTrie::checkout`] and written to.
    fn apply<S: NodeStore>(&self, trie: &mut StateTrie<S>) -> Result<Self::Output, Self::Error>;
}

/// Node store overlay that records the nodes an operation dereferences or
/// creates.
pub struct WitnessRecorder<'a> {
    /// The underlying preimages (read-only access).
    base: &'a PreimageStore,

    /// Nodes created during the run.
    inserted: HashMap<Hash, Vec<u8>>,

    /// Every touched node in first-touch order.
    log: RefCell<IndexMap<Hash, Vec<u8>>>,

    /// First hash that could not be resolved.
    missing: Cell<Option<Hash>>,
}

impl<'a> WitnessRecorder<'a> {
    /// Create a recorder over `base`.
    pub fn new(base: &'a PreimageStore) -> Self {
        Self {
            base,
            inserted: HashMap::new(),
            log: RefCell::new(IndexMap::new()),
            missing: Cell::new(None),
        }
    }

    /// First hash the run failed to resolve, if any.
    pub fn missing(&self) -> Option<Hash> {
        self.missing.get()
    }

    /// Consume the recorder and return the recorded nodes.
    pub fn into_witness(self) -> WitnessSet {
        WitnessSet {
            nodes: self.log.into_inner(),
        }
    }

    fn record(&self, hash: Hash, bytes: &[u8]) {
        let mut log = self.log.borrow_mut();
        if !log.contains_key(&hash) {
            debug!(node = %hash, position = log.len(), "Recorded witness node");
            log.insert(hash, bytes.to_vec());
        }
    }
}

impl NodeStore for WitnessRecorder<'_> {
    fn get_node(&self, hash: &Hash) -> Result<Vec<u8>, TrieError> {
        let found = self
            .inserted
            .get(hash)
            .map(Vec::as_slice)
            .or_else(|| self.base.get(hash));

        match found {
            Some(bytes) => {
                self.record(*hash, bytes);
                Ok(bytes.to_vec())
            }
            None => {
                if self.missing.get().is_none() {
                    self.missing.set(Some(*hash));
                }
                Err(TrieError::MissingPreimage(*hash))
            }
        }
    }

    fn insert_node(&mut self, encoded: Vec<u8>) -> Hash {
        let hash = Hash::from_bytes(&encoded);
        self.record(hash, &encoded);
        self.inserted.entry(hash).or_insert(encoded);
        hash
    }
}

/// Ordered, deduplicated node preimages.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WitnessSet {
    nodes: IndexMap<Hash, Vec<u8>>,
}

impl WitnessSet {
    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no node was touched.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the node with `hash` is part of the witness.
    pub fn contains(&self, hash: &Hash) -> bool {
        self.nodes.contains_key(hash)
    }

    /// `(hash, preimage)` pairs in first-touch order.
    pub fn iter(&self) -> impl Iterator<Item = (&Hash, &[u8])> {
        self.nodes.iter().map(|(hash, bytes)| (hash, bytes.as_slice()))
    }

    /// Node preimages in first-touch order.
    pub fn nodes(&self) -> impl Iterator<Item = &[u8]> {
        self.nodes.values().map(Vec::as_slice)
    }

    /// Node hashes in first-touch order.
    pub fn hashes(&self) -> impl Iterator<Item = &Hash> {
        self.nodes.keys()
    }

    /// A preimage store holding the witness nodes only.
    pub fn to_store(&self) -> PreimageStore {
        self.nodes().map(<[u8]>::to_vec).collect()
    }

    /// Consume the witness into a preimage store.
    pub fn into_store(self) -> PreimageStore {
        self.nodes.into_values().collect()
    }
}

/// Result of a successful extraction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extraction<T> {
    /// What the operation returned.
    pub output: T,
    /// Nodes the operation touched.
    pub witness: WitnessSet,
    /// Root the trie was bound to when the operation returned.
    pub root_after: Hash,
}

/// Extraction failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WitnessError<E> {
    /// The operation dereferenced a node absent from the store. The caller
    /// must supply a wider preimage set.
    #[error("Incomplete witness: missing preimage for {0}")]
    MissingPreimage(Hash),

    /// The operation failed on its own terms.
    #[error("{0}")]
    Operation(E),
}

/// Shadow-run `operation` over the trie at `root` and record its witness.
///
/// The base store is only borrowed; nodes the operation writes are kept in
/// the recorder's overlay and returned as part of the witness.
pub fn extract<O: Operation>(
    root: Hash,
    store: &PreimageStore,
    operation: &O,
) -> Result<Extraction<O::Output>, WitnessError<O::Error>> {
    extract_with(root, store, |trie| operation.apply(trie))
}

/// [`extract`] for an ad-hoc closure.
pub fn extract_with<'a, T, E, F>(
    root: Hash,
    store: &'a PreimageStore,
    run: F,
) -> Result<Extraction<T>, WitnessError<E>>
where
    F: FnOnce(&mut StateTrie<WitnessRecorder<'a>>) -> Result<T, E>,
{
    debug!(root = %root, available = store.len(), "Extracting witness");

    let mut trie = StateTrie::at(root, WitnessRecorder::new(store));
    let result = run(&mut trie);
    let root_after = trie.root();
    let recorder = trie.into_store();

    // A missing node always wins, even if the operation swallowed or
    // rewrapped the trie error.
    if let Some(hash) = recorder.missing() {
        debug!(root = %root, missing = %hash, "Witness extraction hit a missing preimage");
        return Err(WitnessError::MissingPreimage(hash));
    }

    let output = result.map_err(WitnessError::Operation)?;
    let witness = recorder.into_witness();
    debug!(root = %root, nodes = witness.len(), root_after = %root_after, "Extracted witness");

    Ok(Extraction {
        output,
        witness,
        root_after,
    })
}

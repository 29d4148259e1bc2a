//! Content-addressed preimage store.

use crate::{PreimageError, TrieError};
use faultproof_types::Hash;
use std::collections::BTreeMap;

/// Append-only mapping from a Keccak-256 hash to the bytes that hash to it.
///
/// Every entry satisfies `keccak256(bytes) == key`: [`put`](Self::put)
/// computes the key itself and [`insert_verified`](Self::insert_verified)
/// rejects mismatched pairs. Since keys are content addresses, two stores can
/// never disagree about a key and merging is a plain union.
///
/// Entries iterate in hash order, which keeps serialized output stable.
/// The store is populated once (by merging checkpoints) and then shared
/// read-only; inserts require `&mut self`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PreimageStore {
    entries: BTreeMap<Hash, Vec<u8>>,
}

impl PreimageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` under their hash. Idempotent.
    pub fn put(&mut self, bytes: Vec<u8>) -> Hash {
        let hash = Hash::from_bytes(&bytes);
        self.entries.entry(hash).or_insert(bytes);
        hash
    }

    /// Store a preimage supplied together with its claimed hash.
    pub fn insert_verified(&mut self, hash: Hash, bytes: Vec<u8>) -> Result<(), PreimageError> {
        let actual = Hash::from_bytes(&bytes);
        if actual != hash {
            return Err(PreimageError::Mismatch {
                expected: hash,
                actual,
            });
        }
        self.entries.entry(hash).or_insert(bytes);
        Ok(())
    }

    /// Look up a preimage.
    pub fn get(&self, hash: &Hash) -> Option<&[u8]> {
        self.entries.get(hash).map(Vec::as_slice)
    }

    /// Look up a preimage, failing with [`TrieError::MissingPreimage`].
    pub fn require(&self, hash: &Hash) -> Result<&[u8], TrieError> {
        self.get(hash).ok_or(TrieError::MissingPreimage(*hash))
    }

    /// Check whether a preimage is present.
    pub fn contains(&self, hash: &Hash) -> bool {
        self.entries.contains_key(hash)
    }

    /// Add every entry of `other` that is not already present.
    pub fn merge(&mut self, other: &PreimageStore) {
        for (hash, bytes) in &other.entries {
            self.entries.entry(*hash).or_insert_with(|| bytes.clone());
        }
    }

    /// Union of several stores.
    pub fn merged<'a>(stores: impl IntoIterator<Item = &'a PreimageStore>) -> Self {
        let mut merged = PreimageStore::new();
        for store in stores {
            merged.merge(store);
        }
        merged
    }

    /// Number of stored preimages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(hash, preimage)` pairs in hash order.
    pub fn iter(&self) -> impl Iterator<Item = (&Hash, &[u8])> {
        self.entries.iter().map(|(hash, bytes)| (hash, bytes.as_slice()))
    }

    /// Hashes present in `self` but not in `other`.
    pub fn difference<'a>(&'a self, other: &'a PreimageStore) -> impl Iterator<Item = &'a Hash> {
        self.entries.keys().filter(|hash| !other.contains(hash))
    }
}

impl FromIterator<Vec<u8>> for PreimageStore {
    fn from_iter<I: IntoIterator<Item = Vec<u8>>>(iter: I) -> Self {
        let mut store = PreimageStore::new();
        for bytes in iter {
            store.put(bytes);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_of(items: &[&str]) -> PreimageStore {
        items.iter().map(|item| item.as_bytes().to_vec()).collect()
    }

    #[test]
    fn test_put_returns_content_hash() {
        let mut store = PreimageStore::new();
        let hash = store.put(b"node".to_vec());
        assert_eq!(hash, Hash::from_bytes(b"node"));
        assert_eq!(store.get(&hash), Some(&b"node"[..]));
    }

    #[test]
    fn test_put_is_idempotent() {
        let mut store = PreimageStore::new();
        store.put(b"node".to_vec());
        let snapshot = store.clone();
        store.put(b"node".to_vec());
        assert_eq!(store, snapshot);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_insert_verified_rejects_mismatch() {
        let mut store = PreimageStore::new();
        let wrong = Hash::from_bytes(b"other");
        assert_eq!(
            store.insert_verified(wrong, b"node".to_vec()),
            Err(PreimageError::Mismatch {
                expected: wrong,
                actual: Hash::from_bytes(b"node"),
            })
        );
        assert!(store.is_empty());

        let right = Hash::from_bytes(b"node");
        store.insert_verified(right, b"node".to_vec()).unwrap();
        assert!(store.contains(&right));
    }

    #[test]
    fn test_require_reports_missing_hash() {
        let store = PreimageStore::new();
        let hash = Hash::from_bytes(b"absent");
        assert_eq!(store.require(&hash), Err(TrieError::MissingPreimage(hash)));
    }

    #[test]
    fn test_merge_is_commutative() {
        let a = store_of(&["one", "two"]);
        let b = store_of(&["two", "three"]);
        assert_eq!(
            PreimageStore::merged([&a, &b]),
            PreimageStore::merged([&b, &a])
        );
        assert_eq!(PreimageStore::merged([&a, &b]).len(), 3);
    }

    #[test]
    fn test_merge_is_associative() {
        let a = store_of(&["one"]);
        let b = store_of(&["two", "one"]);
        let c = store_of(&["three"]);

        let left = PreimageStore::merged([&PreimageStore::merged([&a, &b]), &c]);
        let right = PreimageStore::merged([&a, &PreimageStore::merged([&b, &c])]);
        assert_eq!(left, right);
    }

    #[test]
    fn test_difference() {
        let a = store_of(&["one", "two"]);
        let b = store_of(&["two"]);
        let only_a: Vec<_> = a.difference(&b).copied().collect();
        assert_eq!(only_a, vec![Hash::from_bytes(b"one")]);
    }
}

//! Hash-addressed Merkle-Patricia state trie.

use crate::nibbles::common_prefix_len;
use crate::{Nibbles, NodeStore, PreimageStore, TrieError, TrieNode};
use faultproof_types::Hash;

/// A view of a key/value mapping identified by its root hash.
///
/// Nodes are resolved lazily through the [`NodeStore`], so the store may hold
/// only part of the trie: any operation that stays on populated paths
/// succeeds, and the first dereference of an absent node fails with
/// [`TrieError::MissingPreimage`].
///
/// Writes never modify existing nodes. [`put`](Self::put) copies the nodes on
/// the insertion path, re-hashes them bottom-up and inserts the new encodings
/// into the store; every earlier root stays resolvable.
#[derive(Debug, Clone)]
pub struct StateTrie<S> {
    root: Hash,
    store: S,
}

impl<S: NodeStore> StateTrie<S> {
    /// An empty trie over `store`.
    pub fn new(store: S) -> Self {
        Self::at(Hash::EMPTY_ROOT, store)
    }

    /// A trie rooted at `root` over `store`.
    pub fn at(root: Hash, store: S) -> Self {
        Self { root, store }
    }

    /// Current root hash.
    pub fn root(&self) -> Hash {
        self.root
    }

    /// Rebind the view to another root over the same store.
    pub fn checkout(&mut self, root: Hash) {
        self.root = root;
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume the trie and return the backing store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Resolve and decode a node.
    pub fn node(&self, hash: &Hash) -> Result<TrieNode, TrieError> {
        let bytes = self.store.get_node(hash)?;
        TrieNode::decode(&bytes).map_err(|e| TrieError::Corrupt {
            hash: *hash,
            reason: e.to_string(),
        })
    }

    /// Look up the value stored under `key`.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TrieError> {
        let path = Nibbles::from_bytes(key);
        let path = path.as_slice();
        let mut offset = 0;
        let mut current = self.root;

        if current == Hash::EMPTY_ROOT {
            return Ok(None);
        }

        loop {
            match self.node(&current)? {
                TrieNode::Leaf {
                    path: leaf_path,
                    value,
                } => {
                    return Ok((leaf_path.as_slice() == &path[offset..]).then_some(value));
                }
                TrieNode::Extension {
                    path: ext_path,
                    child,
                } => {
                    if !path[offset..].starts_with(ext_path.as_slice()) {
                        return Ok(None);
                    }
                    offset += ext_path.len();
                    current = child;
                }
                TrieNode::Branch { children, value } => {
                    if offset == path.len() {
                        return Ok(value);
                    }
                    match children[path[offset] as usize] {
                        Some(child) => {
                            offset += 1;
                            current = child;
                        }
                        None => return Ok(None),
                    }
                }
            }
        }
    }

    /// Store `value` under `key` and return the new root.
    ///
    /// On error the root is unchanged; nodes already written to the store
    /// stay there but are unreachable from any recorded root.
    pub fn put(&mut self, key: &[u8], value: Vec<u8>) -> Result<Hash, TrieError> {
        if value.is_empty() {
            return Err(TrieError::EmptyValue);
        }
        let path = Nibbles::from_bytes(key);
        let current = (self.root != Hash::EMPTY_ROOT).then_some(self.root);
        let root = self.insert(current, path.as_slice(), value)?;
        self.root = root;
        Ok(root)
    }

    /// Collect every node reachable from the root, re-hashing each one.
    ///
    /// Fails with [`TrieError::Corrupt`] if a preimage does not hash to the
    /// reference its parent holds.
    pub fn reachable_nodes(&self) -> Result<PreimageStore, TrieError> {
        let mut nodes = PreimageStore::new();
        if self.root == Hash::EMPTY_ROOT {
            return Ok(nodes);
        }

        let mut pending = vec![self.root];
        while let Some(hash) = pending.pop() {
            if nodes.contains(&hash) {
                continue;
            }
            let node = self.node(&hash)?;
            let encoded = node.encode();
            if Hash::from_bytes(&encoded) != hash {
                return Err(TrieError::Corrupt {
                    hash,
                    reason: "preimage does not hash to its reference".to_string(),
                });
            }
            pending.extend(node.child_hashes());
            nodes.put(encoded);
        }
        Ok(nodes)
    }

    fn insert(
        &mut self,
        node: Option<Hash>,
        path: &[u8],
        value: Vec<u8>,
    ) -> Result<Hash, TrieError> {
        let Some(hash) = node else {
            return Ok(self.store_node(TrieNode::Leaf {
                path: Nibbles::from_nibbles(path),
                value,
            }));
        };

        match self.node(&hash)? {
            TrieNode::Leaf {
                path: leaf_path,
                value: leaf_value,
            } => {
                let leaf_path = leaf_path.as_slice();
                if leaf_path == path {
                    return Ok(self.store_node(TrieNode::Leaf {
                        path: Nibbles::from_nibbles(path),
                        value,
                    }));
                }

                let common = common_prefix_len(leaf_path, path);
                let mut branch = TrieNode::empty_branch();
                self.place(&mut branch, &leaf_path[common..], leaf_value);
                self.place(&mut branch, &path[common..], value);
                let branch = self.store_node(branch);
                Ok(self.with_prefix(&path[..common], branch))
            }

            TrieNode::Extension {
                path: ext_path,
                child,
            } => {
                let ext_path = ext_path.as_slice();
                let common = common_prefix_len(ext_path, path);

                if common == ext_path.len() {
                    let child = self.insert(Some(child), &path[common..], value)?;
                    return Ok(self.store_node(TrieNode::Extension {
                        path: Nibbles::from_nibbles(ext_path),
                        child,
                    }));
                }

                // Split the extension at the first diverging nibble.
                let mut branch = TrieNode::empty_branch();
                let below = &ext_path[common + 1..];
                let existing = if below.is_empty() {
                    child
                } else {
                    self.store_node(TrieNode::Extension {
                        path: Nibbles::from_nibbles(below),
                        child,
                    })
                };
                if let TrieNode::Branch { children, .. } = &mut branch {
                    children[ext_path[common] as usize] = Some(existing);
                }
                self.place(&mut branch, &path[common..], value);
                let branch = self.store_node(branch);
                Ok(self.with_prefix(&path[..common], branch))
            }

            TrieNode::Branch {
                mut children,
                value: branch_value,
            } => {
                if path.is_empty() {
                    return Ok(self.store_node(TrieNode::Branch {
                        children,
                        value: Some(value),
                    }));
                }
                let slot = path[0] as usize;
                children[slot] = Some(self.insert(children[slot], &path[1..], value)?);
                Ok(self.store_node(TrieNode::Branch {
                    children,
                    value: branch_value,
                }))
            }
        }
    }

    /// Put `value` into a fresh branch: in the value slot when the path ends
    /// here, otherwise in a new leaf under the path's first nibble.
    fn place(&mut self, branch: &mut TrieNode, rest: &[u8], value: Vec<u8>) {
        let leaf = match rest.split_first() {
            None => None,
            Some((&nibble, below)) => Some((
                nibble as usize,
                self.store_node(TrieNode::Leaf {
                    path: Nibbles::from_nibbles(below),
                    value: value.clone(),
                }),
            )),
        };

        if let TrieNode::Branch {
            children,
            value: slot_value,
        } = branch
        {
            match leaf {
                Some((nibble, hash)) => children[nibble] = Some(hash),
                None => *slot_value = Some(value),
            }
        }
    }

    fn with_prefix(&mut self, prefix: &[u8], child: Hash) -> Hash {
        if prefix.is_empty() {
            child
        } else {
            self.store_node(TrieNode::Extension {
                path: Nibbles::from_nibbles(prefix),
                child,
            })
        }
    }

    fn store_node(&mut self, node: TrieNode) -> Hash {
        self.store.insert_node(node.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_entries(seed: u64, count: usize) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                let key_len = rng.gen_range(1..6);
                let key: Vec<u8> = (0..key_len).map(|_| rng.gen()).collect();
                let value: Vec<u8> = (0..rng.gen_range(1..48)).map(|_| rng.gen()).collect();
                (key, value)
            })
            .collect()
    }

    fn build(entries: &[(Vec<u8>, Vec<u8>)]) -> StateTrie<PreimageStore> {
        let mut trie = StateTrie::new(PreimageStore::new());
        for (key, value) in entries {
            trie.put(key, value.clone()).unwrap();
        }
        trie
    }

    /// Last write wins for duplicate keys.
    fn expected(entries: &[(Vec<u8>, Vec<u8>)]) -> std::collections::BTreeMap<Vec<u8>, Vec<u8>> {
        entries.iter().cloned().collect()
    }

    #[test]
    fn test_empty_trie() {
        let trie = StateTrie::new(PreimageStore::new());
        assert_eq!(trie.root(), Hash::EMPTY_ROOT);
        assert_eq!(trie.get(b"anything").unwrap(), None);
        assert!(trie.reachable_nodes().unwrap().is_empty());
    }

    #[test]
    fn test_put_then_get() {
        let mut trie = StateTrie::new(PreimageStore::new());
        trie.put(b"dog", b"puppy".to_vec()).unwrap();
        trie.put(b"horse", b"stallion".to_vec()).unwrap();
        trie.put(b"doge", b"coin".to_vec()).unwrap();
        trie.put(b"do", b"verb".to_vec()).unwrap();

        assert_eq!(trie.get(b"dog").unwrap(), Some(b"puppy".to_vec()));
        assert_eq!(trie.get(b"doge").unwrap(), Some(b"coin".to_vec()));
        assert_eq!(trie.get(b"do").unwrap(), Some(b"verb".to_vec()));
        assert_eq!(trie.get(b"horse").unwrap(), Some(b"stallion".to_vec()));
        assert_eq!(trie.get(b"d").unwrap(), None);
        assert_eq!(trie.get(b"dogs").unwrap(), None);
        assert_eq!(trie.get(b"cat").unwrap(), None);
    }

    #[test]
    fn test_overwrite_changes_root_and_value() {
        let mut trie = StateTrie::new(PreimageStore::new());
        let first = trie.put(b"key", vec![1]).unwrap();
        let second = trie.put(b"key", vec![2]).unwrap();
        assert_ne!(first, second);
        assert_eq!(trie.get(b"key").unwrap(), Some(vec![2]));

        // Writing the original value back restores the original root.
        assert_eq!(trie.put(b"key", vec![1]).unwrap(), first);
    }

    #[test]
    fn test_old_roots_remain_resolvable() {
        let mut trie = StateTrie::new(PreimageStore::new());
        trie.put(b"alpha", vec![1]).unwrap();
        let old_root = trie.put(b"beta", vec![2]).unwrap();
        trie.put(b"beta", vec![3]).unwrap();
        trie.put(b"gamma", vec![4]).unwrap();

        let mut old = StateTrie::at(old_root, trie.store().clone());
        assert_eq!(old.get(b"beta").unwrap(), Some(vec![2]));
        assert_eq!(old.get(b"gamma").unwrap(), None);

        old.checkout(trie.root());
        assert_eq!(old.get(b"beta").unwrap(), Some(vec![3]));
    }

    #[test]
    fn test_random_contents_readable() {
        let entries = random_entries(7, 200);
        let trie = build(&entries);
        for (key, value) in expected(&entries) {
            assert_eq!(trie.get(&key).unwrap(), Some(value));
        }
    }

    #[test]
    fn test_root_independent_of_insertion_order() {
        let entries: Vec<_> = expected(&random_entries(11, 120)).into_iter().collect();
        let root = build(&entries).root();

        let mut rng = ChaCha8Rng::seed_from_u64(99);
        for _ in 0..5 {
            let mut shuffled = entries.clone();
            shuffled.shuffle(&mut rng);
            assert_eq!(build(&shuffled).root(), root);
        }
    }

    #[test]
    fn test_reachable_nodes_reproduce_root() {
        let entries = random_entries(3, 80);
        let trie = build(&entries);

        let nodes = trie.reachable_nodes().unwrap();
        // Older versions of updated paths are not reachable.
        assert!(nodes.len() <= trie.store().len());

        let rebuilt = StateTrie::at(trie.root(), nodes);
        for (key, value) in expected(&entries) {
            assert_eq!(rebuilt.get(&key).unwrap(), Some(value));
        }
        assert_eq!(rebuilt.reachable_nodes().unwrap().len(), rebuilt.store().len());
    }

    #[test]
    fn test_missing_root_preimage() {
        let root = Hash::from_bytes(b"not stored");
        let trie = StateTrie::at(root, PreimageStore::new());
        assert_eq!(trie.get(b"key"), Err(TrieError::MissingPreimage(root)));
    }

    #[test]
    fn test_missing_inner_preimage() {
        let trie = build(&[(b"aa".to_vec(), vec![1]), (b"ab".to_vec(), vec![2])]);
        let mut partial = PreimageStore::new();
        partial.put(trie.store().get(&trie.root()).unwrap().to_vec());

        let view = StateTrie::at(trie.root(), partial);
        assert!(matches!(
            view.get(b"aa"),
            Err(TrieError::MissingPreimage(hash)) if hash != trie.root()
        ));
    }

    #[test]
    fn test_corrupt_preimage_reported() {
        let mut store = PreimageStore::new();
        let root = store.put(b"not a node".to_vec());
        let trie = StateTrie::at(root, store);
        assert!(matches!(trie.get(b"k"), Err(TrieError::Corrupt { .. })));
    }

    #[test]
    fn test_empty_value_rejected() {
        let mut trie = StateTrie::new(PreimageStore::new());
        assert_eq!(trie.put(b"k", vec![]), Err(TrieError::EmptyValue));
        assert_eq!(trie.root(), Hash::EMPTY_ROOT);
    }
}

//! Trie node model and its canonical encoding.
//!
//! Nodes are encoded as RLP lists with hex-prefix compact paths:
//!
//! ```text
//! Leaf      = [compact(path, leaf=true),  value]
//! Extension = [compact(path, leaf=false), child_hash]
//! Branch    = [child_0, ..., child_15, value]      (empty slot = "")
//! ```
//!
//! Child references are always the 32-byte hash of the child's encoding;
//! nodes are never inlined into their parent. This keeps every node
//! independently addressable, so a verifier can be shown exactly one node at
//! a time and check it against the hash its parent committed to.

use crate::{Nibbles, NodeError};
use alloy_rlp::{Encodable, Header};
use faultproof_types::Hash;

/// Number of child slots in a branch node.
pub const BRANCH_WIDTH: usize = 16;

/// A node of the state trie.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrieNode {
    /// Terminal node holding the rest of the key and the value.
    Leaf {
        /// Remaining key nibbles below the parent.
        path: Nibbles,
        /// Stored value (never empty).
        value: Vec<u8>,
    },

    /// Shared key fragment leading to a single child.
    Extension {
        /// Shared nibbles (never empty).
        path: Nibbles,
        /// Hash of the child branch.
        child: Hash,
    },

    /// 16-way fan-out on the next nibble, plus the value of a key that ends here.
    Branch {
        /// Child hashes by nibble.
        children: Box<[Option<Hash>; BRANCH_WIDTH]>,
        /// Value of the key terminating at this branch.
        value: Option<Vec<u8>>,
    },
}

impl TrieNode {
    /// A branch with no children and no value, to be filled in.
    pub(crate) fn empty_branch() -> Self {
        TrieNode::Branch {
            children: Box::new([None; BRANCH_WIDTH]),
            value: None,
        }
    }

    /// Canonical encoding. Identical content always yields identical bytes.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            TrieNode::Leaf { path, value } => {
                let path = path.encode_compact(true);
                encode_list(&[path.as_slice(), value.as_slice()])
            }
            TrieNode::Extension { path, child } => {
                let path = path.encode_compact(false);
                encode_list(&[path.as_slice(), &child.as_bytes()[..]])
            }
            TrieNode::Branch { children, value } => {
                let mut items: Vec<&[u8]> = Vec::with_capacity(BRANCH_WIDTH + 1);
                for child in children.iter() {
                    items.push(match child {
                        Some(hash) => &hash.as_bytes()[..],
                        None => &[][..],
                    });
                }
                items.push(value.as_deref().unwrap_or(&[]));
                encode_list(&items)
            }
        }
    }

    /// Content address of this node.
    pub fn hash(&self) -> Hash {
        Hash::from_bytes(&self.encode())
    }

    /// Decode a node, accepting only canonical encodings.
    pub fn decode(bytes: &[u8]) -> Result<Self, NodeError> {
        let mut buf = bytes;
        let mut payload = Header::decode_bytes(&mut buf, true)?;
        if !buf.is_empty() {
            return Err(NodeError::NonCanonical("trailing bytes after node"));
        }

        let mut items: Vec<&[u8]> = Vec::with_capacity(BRANCH_WIDTH + 1);
        while !payload.is_empty() {
            items.push(Header::decode_bytes(&mut payload, false)?);
        }

        let node = match items.len() {
            2 => decode_short(items[0], items[1])?,
            17 => decode_branch(&items)?,
            n => return Err(NodeError::ItemCount(n)),
        };

        if node.encode() != bytes {
            return Err(NodeError::NonCanonical("re-encoding differs"));
        }
        Ok(node)
    }

    /// Hashes of the nodes this node references.
    pub fn child_hashes(&self) -> Vec<Hash> {
        match self {
            TrieNode::Leaf { .. } => Vec::new(),
            TrieNode::Extension { child, .. } => vec![*child],
            TrieNode::Branch { children, .. } => children.iter().flatten().copied().collect(),
        }
    }
}

fn decode_short(path: &[u8], second: &[u8]) -> Result<TrieNode, NodeError> {
    let (path, is_leaf) = Nibbles::decode_compact(path)?;
    if is_leaf {
        if second.is_empty() {
            return Err(NodeError::NonCanonical("empty leaf value"));
        }
        Ok(TrieNode::Leaf {
            path,
            value: second.to_vec(),
        })
    } else {
        if path.is_empty() {
            return Err(NodeError::NonCanonical("empty extension path"));
        }
        let child = decode_child(second)?.ok_or(NodeError::InvalidChild(0))?;
        Ok(TrieNode::Extension { path, child })
    }
}

fn decode_branch(items: &[&[u8]]) -> Result<TrieNode, NodeError> {
    let mut children = [None; BRANCH_WIDTH];
    for (slot, item) in children.iter_mut().zip(items) {
        *slot = decode_child(item)?;
    }
    let value = (!items[BRANCH_WIDTH].is_empty()).then(|| items[BRANCH_WIDTH].to_vec());

    let populated = children.iter().flatten().count() + usize::from(value.is_some());
    if populated < 2 {
        return Err(NodeError::NonCanonical("branch with fewer than two entries"));
    }

    Ok(TrieNode::Branch {
        children: Box::new(children),
        value,
    })
}

fn decode_child(item: &[u8]) -> Result<Option<Hash>, NodeError> {
    match item.len() {
        0 => Ok(None),
        Hash::BYTES => Hash::from_hash_bytes(item)
            .map(Some)
            .map_err(|_| NodeError::InvalidChild(item.len())),
        n => Err(NodeError::InvalidChild(n)),
    }
}

fn encode_list(items: &[&[u8]]) -> Vec<u8> {
    let payload_length: usize = items.iter().map(|item| Encodable::length(*item)).sum();
    let header = Header {
        list: true,
        payload_length,
    };
    let mut out = Vec::with_capacity(header.length() + payload_length);
    header.encode(&mut out);
    for item in items {
        Encodable::encode(*item, &mut out);
    }
    out
}

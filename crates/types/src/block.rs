//! Blocks of the disputed chain.
//!
//! Blocks travel as raw RLP bytes: the registry commits to `keccak256` of those
//! bytes and the claim carries them unmodified. Decoding is only needed to
//! reach the parent hash and the state root the block's producer asserted.
//!
//! ```text
//! Block = [number, parent, state_root, [Txn, ...]]
//! Txn   = [from, to, value]
//! ```

use crate::Hash;
use alloy_rlp::{BufMut, Decodable, Encodable, Header};
use thiserror::Error;

/// A balance transfer between two accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Txn {
    /// Sending account.
    pub from: Hash,
    /// Receiving account.
    pub to: Hash,
    /// Amount transferred.
    pub value: u64,
}

impl Txn {
    /// Create a new transfer.
    pub fn new(from: Hash, to: Hash, value: u64) -> Self {
        Self { from, to, value }
    }

    fn payload_length(&self) -> usize {
        self.from.length() + self.to.length() + self.value.length()
    }
}

impl Encodable for Txn {
    fn encode(&self, out: &mut dyn BufMut) {
        Header {
            list: true,
            payload_length: self.payload_length(),
        }
        .encode(out);
        self.from.encode(out);
        self.to.encode(out);
        self.value.encode(out);
    }

    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        Header {
            list: true,
            payload_length,
        }
        .length()
            + payload_length
    }
}

impl Decodable for Txn {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let mut payload = Header::decode_bytes(buf, true)?;
        let txn = Txn {
            from: Hash::decode(&mut payload)?,
            to: Hash::decode(&mut payload)?,
            value: u64::decode(&mut payload)?,
        };
        if !payload.is_empty() {
            return Err(alloy_rlp::Error::UnexpectedLength);
        }
        Ok(txn)
    }
}

/// A block of the disputed chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Block number (genesis = 0).
    pub number: u64,

    /// Hash of the parent block's encoding.
    pub parent: Hash,

    /// State root asserted by the block producer after applying `txns`.
    pub state_root: Hash,

    /// Transactions in execution order.
    pub txns: Vec<Txn>,
}

impl Block {
    /// RLP-encode the block.
    pub fn serialize(&self) -> Vec<u8> {
        alloy_rlp::encode(self)
    }

    /// Content hash of the block: `keccak256(serialize())`.
    pub fn hash(&self) -> Hash {
        Hash::from_bytes(&self.serialize())
    }

    /// Decode a block, requiring the input to contain nothing else.
    pub fn decode_exact(bytes: &[u8]) -> Result<Self, BlockDecodeError> {
        let mut buf = bytes;
        let block = Block::decode(&mut buf).map_err(|e| BlockDecodeError(e.to_string()))?;
        if !buf.is_empty() {
            return Err(BlockDecodeError(format!(
                "{} trailing bytes after block",
                buf.len()
            )));
        }
        Ok(block)
    }

    fn txns_payload_length(&self) -> usize {
        self.txns.iter().map(|txn| txn.length()).sum()
    }

    fn payload_length(&self) -> usize {
        let txns_payload = self.txns_payload_length();
        self.number.length()
            + self.parent.length()
            + self.state_root.length()
            + Header {
                list: true,
                payload_length: txns_payload,
            }
            .length()
            + txns_payload
    }
}

impl Encodable for Block {
    fn encode(&self, out: &mut dyn BufMut) {
        Header {
            list: true,
            payload_length: self.payload_length(),
        }
        .encode(out);
        self.number.encode(out);
        self.parent.encode(out);
        self.state_root.encode(out);
        Header {
            list: true,
            payload_length: self.txns_payload_length(),
        }
        .encode(out);
        for txn in &self.txns {
            txn.encode(out);
        }
    }

    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        Header {
            list: true,
            payload_length,
        }
        .length()
            + payload_length
    }
}

impl Decodable for Block {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let mut payload = Header::decode_bytes(buf, true)?;
        let number = u64::decode(&mut payload)?;
        let parent = Hash::decode(&mut payload)?;
        let state_root = Hash::decode(&mut payload)?;

        let mut txns_payload = Header::decode_bytes(&mut payload, true)?;
        let mut txns = Vec::new();
        while !txns_payload.is_empty() {
            txns.push(Txn::decode(&mut txns_payload)?);
        }

        if !payload.is_empty() {
            return Err(alloy_rlp::Error::UnexpectedLength);
        }

        Ok(Block {
            number,
            parent,
            state_root,
            txns,
        })
    }
}

/// A raw block that does not decode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed block: {0}")]
pub struct BlockDecodeError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> Block {
        Block {
            number: 3,
            parent: Hash::from_bytes(b"parent"),
            state_root: Hash::from_bytes(b"root"),
            txns: vec![
                Txn::new(Hash::new([1; 32]), Hash::new([2; 32]), 13),
                Txn::new(Hash::new([2; 32]), Hash::new([1; 32]), 37),
            ],
        }
    }

    #[test]
    fn test_block_decodes_to_same_block() {
        let block = sample_block();
        let bytes = block.serialize();
        assert_eq!(bytes.len(), block.length());
        assert_eq!(Block::decode_exact(&bytes).unwrap(), block);
    }

    #[test]
    fn test_block_hash_is_hash_of_encoding() {
        let block = sample_block();
        assert_eq!(block.hash(), Hash::from_bytes(&block.serialize()));
    }

    #[test]
    fn test_empty_block() {
        let block = Block {
            number: 0,
            parent: Hash::ZERO,
            state_root: Hash::EMPTY_ROOT,
            txns: vec![],
        };
        assert_eq!(Block::decode_exact(&block.serialize()).unwrap(), block);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = sample_block().serialize();
        bytes.push(0x00);
        assert!(Block::decode_exact(&bytes).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(Block::decode_exact(b"not a block").is_err());
        assert!(Block::decode_exact(&[]).is_err());
    }
}

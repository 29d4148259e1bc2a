//! Content-address type using Keccak-256.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;

/// A 32-byte Keccak-256 content address.
///
/// Every preimage, trie node and block is identified by the Keccak-256 hash
/// of its bytes. Equality is byte equality, so the type is safe to use as a
/// map key. All hashing operations are deterministic.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash([u8; 32]);

impl Hash {
    /// Size of hash in bytes.
    pub const BYTES: usize = 32;

    /// Zero hash (all bytes are 0x00).
    pub const ZERO: Self = Self([0u8; 32]);

    /// Root of the empty trie: `keccak256(rlp(""))`.
    ///
    /// The empty trie has no nodes, so this root is never dereferenced.
    pub const EMPTY_ROOT: Self = Self([
        0x56, 0xe8, 0x1f, 0x17, 0x1b, 0xcc, 0x55, 0xa6, 0xff, 0x83, 0x45, 0xe6, 0x92, 0xc0, 0xf8,
        0x6e, 0x5b, 0x48, 0xe0, 0x1b, 0x99, 0x6c, 0xad, 0xc0, 0x01, 0x62, 0x2f, 0xb5, 0xe3, 0x63,
        0xb4, 0x21,
    ]);

    /// Wrap raw hash bytes (without hashing).
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Hash bytes with Keccak-256.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(Keccak256::digest(bytes).into())
    }

    /// Hash the concatenation of multiple byte slices.
    pub fn from_parts(parts: &[&[u8]]) -> Self {
        let mut hasher = Keccak256::new();
        for part in parts {
            hasher.update(part);
        }
        Self(hasher.finalize().into())
    }

    /// Create a Hash from raw hash bytes (without hashing).
    ///
    /// Fails unless `bytes` is exactly 32 bytes long.
    pub fn from_hash_bytes(bytes: &[u8]) -> Result<Self, HexError> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| HexError::InvalidByteLength {
                expected: Self::BYTES,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    /// Parse hash from a hex string, with or without the `0x` marker.
    pub fn from_hex(hex: &str) -> Result<Self, HexError> {
        let digits = strip_hex_prefix(hex);
        if digits.len() != 64 {
            return Err(HexError::InvalidLength {
                expected: 64,
                actual: digits.len(),
            });
        }

        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| HexError::InvalidHex)?;

        Ok(Self(bytes))
    }

    /// Render as `0x` followed by 64 lowercase hex digits.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Get bytes as slice reference.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to bytes array.
    pub fn to_bytes(self) -> [u8; 32] {
        self.0
    }

}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = hex::encode(self.0);
        write!(f, "Hash({}..{})", &hex[..8], &hex[56..])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if !s.starts_with("0x") {
            return Err(de::Error::custom(format!("missing 0x prefix: {:?}", s)));
        }
        Hash::from_hex(&s).map_err(de::Error::custom)
    }
}

impl alloy_rlp::Encodable for Hash {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        alloy_rlp::Encodable::encode(&self.0, out)
    }

    fn length(&self) -> usize {
        alloy_rlp::Encodable::length(&self.0)
    }
}

impl alloy_rlp::Decodable for Hash {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        <[u8; 32] as alloy_rlp::Decodable>::decode(buf).map(Self)
    }
}

/// Strip an optional `0x`/`0X` marker.
pub fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Decode `0x`-prefixed (or bare) hex into bytes.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, HexError> {
    hex::decode(strip_hex_prefix(s)).map_err(|_| HexError::InvalidHex)
}

/// Encode bytes as `0x` followed by lowercase hex digits.
pub fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Errors that can occur when parsing hex strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HexError {
    /// Invalid hex string length.
    #[error("Invalid hex length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Raw byte input of the wrong size.
    #[error("Invalid byte length: expected {expected}, got {actual}")]
    InvalidByteLength {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Invalid hex characters.
    #[error("Invalid hex string")]
    InvalidHex,
}

//! Nibble paths and their hex-prefix (compact) encoding.

use crate::NodeError;

/// A path of half-bytes (each in `0..16`).
///
/// Keys are split into nibbles for traversal: a 4-byte key becomes 8
/// nibbles, high half first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Nibbles(Vec<u8>);

impl Nibbles {
    /// Split bytes into nibbles.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut nibbles = Vec::with_capacity(bytes.len() * 2);
        for byte in bytes {
            nibbles.push(byte >> 4);
            nibbles.push(byte & 0x0F);
        }
        Nibbles(nibbles)
    }

    /// Wrap a nibble sequence.
    ///
    /// # Panics
    ///
    /// Panics if any element is not a nibble.
    pub fn from_nibbles(nibbles: &[u8]) -> Self {
        assert!(nibbles.iter().all(|&n| n < 16), "values must be nibbles");
        Nibbles(nibbles.to_vec())
    }

    /// Nibbles as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Number of nibbles.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the path is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length of the shared prefix with `other`.
    pub fn common_prefix_len(&self, other: &[u8]) -> usize {
        common_prefix_len(&self.0, other)
    }

    /// Hex-prefix encode the path.
    ///
    /// The first nibble carries the flags: `0` extension/even, `1`
    /// extension/odd, `2` leaf/even, `3` leaf/odd. An odd path stores its
    /// first nibble next to the flag; an even path pads with a zero nibble.
    pub fn encode_compact(&self, is_leaf: bool) -> Vec<u8> {
        let odd = self.0.len() % 2 == 1;
        let flag = if is_leaf { 2 } else { 0 } + u8::from(odd);

        let mut out = Vec::with_capacity(self.0.len() / 2 + 1);
        let rest = if odd {
            out.push((flag << 4) | self.0[0]);
            &self.0[1..]
        } else {
            out.push(flag << 4);
            &self.0[..]
        };
        for pair in rest.chunks(2) {
            out.push((pair[0] << 4) | pair[1]);
        }
        out
    }

    /// Decode a hex-prefix encoded path, returning the path and the leaf flag.
    pub fn decode_compact(encoded: &[u8]) -> Result<(Self, bool), NodeError> {
        let Some((&first, rest)) = encoded.split_first() else {
            return Err(NodeError::InvalidPath("empty encoding".to_string()));
        };

        let flag = first >> 4;
        if flag > 3 {
            return Err(NodeError::InvalidPath(format!("unknown flag {}", flag)));
        }
        let is_leaf = flag >= 2;
        let odd = flag % 2 == 1;

        let mut nibbles = Vec::with_capacity(rest.len() * 2 + 1);
        if odd {
            nibbles.push(first & 0x0F);
        } else if first & 0x0F != 0 {
            return Err(NodeError::InvalidPath("non-zero padding nibble".to_string()));
        }
        for byte in rest {
            nibbles.push(byte >> 4);
            nibbles.push(byte & 0x0F);
        }

        Ok((Nibbles(nibbles), is_leaf))
    }
}

/// Length of the shared prefix of two nibble slices.
pub(crate) fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_splits_high_first() {
        let nibbles = Nibbles::from_bytes(&[0x30, 0x00, 0x08, 0x04]);
        assert_eq!(nibbles.as_slice(), &[3, 0, 0, 0, 0, 8, 0, 4]);
    }

    #[test]
    fn test_compact_known_encodings() {
        // Yellow Paper appendix C examples.
        let ext_odd = Nibbles::from_nibbles(&[1, 2, 3, 4, 5]);
        assert_eq!(ext_odd.encode_compact(false), vec![0x11, 0x23, 0x45]);

        let ext_even = Nibbles::from_nibbles(&[0, 1, 2, 3, 4, 5]);
        assert_eq!(ext_even.encode_compact(false), vec![0x00, 0x01, 0x23, 0x45]);

        let leaf_even = Nibbles::from_nibbles(&[0, 15, 1, 12, 11, 8]);
        assert_eq!(leaf_even.encode_compact(true), vec![0x20, 0x0f, 0x1c, 0xb8]);

        let leaf_odd = Nibbles::from_nibbles(&[15, 1, 12, 11, 8]);
        assert_eq!(leaf_odd.encode_compact(true), vec![0x3f, 0x1c, 0xb8]);

        assert_eq!(Nibbles::default().encode_compact(true), vec![0x20]);
    }

    #[test]
    fn test_compact_decode_inverts_encode() {
        for (path, leaf) in [
            (vec![], true),
            (vec![7], false),
            (vec![1, 2, 3, 4], true),
            (vec![0, 0, 15], false),
        ] {
            let nibbles = Nibbles::from_nibbles(&path);
            let encoded = nibbles.encode_compact(leaf);
            assert_eq!(Nibbles::decode_compact(&encoded).unwrap(), (nibbles, leaf));
        }
    }

    #[test]
    fn test_compact_rejects_bad_flags_and_padding() {
        assert!(Nibbles::decode_compact(&[]).is_err());
        assert!(Nibbles::decode_compact(&[0x40]).is_err());
        assert!(Nibbles::decode_compact(&[0x05, 0x12]).is_err());
    }

    #[test]
    fn test_common_prefix_len() {
        let a = Nibbles::from_nibbles(&[1, 2, 3, 4]);
        assert_eq!(a.common_prefix_len(&[1, 2, 9]), 2);
        assert_eq!(a.common_prefix_len(&[]), 0);
        assert_eq!(a.common_prefix_len(&[1, 2, 3, 4, 5]), 4);
    }
}

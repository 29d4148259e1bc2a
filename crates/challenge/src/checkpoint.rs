//! Checkpoint files.
//!
//! A checkpoint records the system-state root after some number of steps,
//! together with the node preimages touched while reaching it:
//!
//! ```json
//! { "root": "0x…", "step": 1234, "preimages": { "0x<hash>": "0x<node>" } }
//! ```
//!
//! Every value is checked when the file is read: hashes and payloads must be
//! `0x`-prefixed hex and each payload must hash to its key.

use crate::{ChallengeError, ConfigError};
use faultproof_trie::PreimageStore;
use faultproof_types::{decode_hex, encode_hex, Hash};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// System-state root after `step` steps, with supporting preimages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    /// System-state root.
    pub root: Hash,
    /// Steps executed to reach `root`.
    pub step: u64,
    /// Node preimages.
    pub preimages: PreimageStore,
}

#[derive(Serialize, Deserialize)]
struct CheckpointFile {
    root: Hash,
    step: u64,
    preimages: BTreeMap<Hash, String>,
}

impl Checkpoint {
    /// Parse and validate checkpoint JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let file: CheckpointFile = serde_json::from_str(json)
            .map_err(|e| ConfigError::InvalidCheckpoint(e.to_string()))?;

        let mut preimages = PreimageStore::new();
        for (hash, value) in file.preimages {
            let bytes = parse_prefixed_hex(&value)?;
            preimages
                .insert_verified(hash, bytes)
                .map_err(|e| ConfigError::InvalidCheckpoint(e.to_string()))?;
        }

        Ok(Checkpoint {
            root: file.root,
            step: file.step,
            preimages,
        })
    }

    /// Render as checkpoint JSON, preimages sorted by hash.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        let file = CheckpointFile {
            root: self.root,
            step: self.step,
            preimages: self
                .preimages
                .iter()
                .map(|(hash, bytes)| (*hash, encode_hex(bytes)))
                .collect(),
        };
        serde_json::to_string_pretty(&file)
            .map_err(|e| ConfigError::InvalidCheckpoint(e.to_string()))
    }

    /// Read and validate a checkpoint file.
    pub fn load(path: &Path) -> Result<Self, ChallengeError> {
        let json = std::fs::read_to_string(path).map_err(|e| ChallengeError::io(path, e))?;
        Self::from_json_str(&json).map_err(|e| {
            ChallengeError::from(match e {
                ConfigError::InvalidCheckpoint(reason) => {
                    ConfigError::InvalidCheckpoint(format!("{}: {}", path.display(), reason))
                }
                other => other,
            })
        })
    }

    /// Write the checkpoint to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ChallengeError> {
        let json = self.to_json_string()?;
        std::fs::write(path, json).map_err(|e| ChallengeError::io(path, e))
    }
}

/// Render a raw 32-byte root as `0x` followed by 64 lowercase hex digits.
pub fn render_root(bytes: &[u8]) -> Result<String, ConfigError> {
    if bytes.len() != Hash::BYTES {
        return Err(ConfigError::InvalidAssertionRoot(bytes.len()));
    }
    Ok(encode_hex(bytes))
}

/// Read the asserted post-state root: a file of exactly 32 raw bytes.
pub fn load_assertion_root(path: &Path) -> Result<Hash, ChallengeError> {
    let bytes = std::fs::read(path).map_err(|e| ChallengeError::io(path, e))?;
    let rendered = render_root(&bytes)?;
    tracing::debug!(path = %path.display(), root = %rendered, "Loaded assertion root");
    Hash::from_hash_bytes(&bytes)
        .map_err(|_| ChallengeError::from(ConfigError::InvalidAssertionRoot(bytes.len())))
}

fn parse_prefixed_hex(value: &str) -> Result<Vec<u8>, ConfigError> {
    if !value.starts_with("0x") {
        return Err(ConfigError::InvalidCheckpoint(format!(
            "missing 0x prefix: {:?}",
            value
        )));
    }
    decode_hex(value).map_err(|e| ConfigError::InvalidCheckpoint(format!("{}: {:?}", e, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Checkpoint {
        let preimages: PreimageStore = [b"first".to_vec(), b"second".to_vec()]
            .into_iter()
            .collect();
        Checkpoint {
            root: Hash::from_bytes(b"first"),
            step: 17,
            preimages,
        }
    }

    #[test]
    fn test_render_root_two_digits_per_byte() {
        let bytes: Vec<u8> = (1..=32).collect();
        assert_eq!(
            render_root(&bytes).unwrap(),
            "0x0102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f20"
        );
        assert_eq!(
            render_root(&[0u8; 31]),
            Err(ConfigError::InvalidAssertionRoot(31))
        );
    }

    #[test]
    fn test_json_shape() {
        let json = sample().to_json_string().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["step"], 17);
        assert_eq!(value["root"], Hash::from_bytes(b"first").to_hex());
        let key = Hash::from_bytes(b"second").to_hex();
        assert_eq!(value["preimages"][key.as_str()], encode_hex(b"second"));
    }

    #[test]
    fn test_parse_rendered_checkpoint() {
        let checkpoint = sample();
        assert_eq!(
            Checkpoint::from_json_str(&checkpoint.to_json_string().unwrap()).unwrap(),
            checkpoint
        );
    }

    #[test]
    fn test_rejects_mismatched_preimage() {
        let json = format!(
            r#"{{"root":"{}","step":1,"preimages":{{"{}":"{}"}}}}"#,
            Hash::ZERO.to_hex(),
            Hash::from_bytes(b"one").to_hex(),
            encode_hex(b"two"),
        );
        assert!(matches!(
            Checkpoint::from_json_str(&json),
            Err(ConfigError::InvalidCheckpoint(_))
        ));
    }

    #[test]
    fn test_rejects_unprefixed_and_short_hashes() {
        let unprefixed = format!(
            r#"{{"root":"{}","step":1,"preimages":{{}}}}"#,
            hex_digits(&Hash::ZERO)
        );
        assert!(Checkpoint::from_json_str(&unprefixed).is_err());

        let short = r#"{"root":"0x1234","step":1,"preimages":{}}"#;
        assert!(Checkpoint::from_json_str(short).is_err());

        let unprefixed_key = format!(
            r#"{{"root":"{}","step":1,"preimages":{{"{}":"{}"}}}}"#,
            Hash::ZERO.to_hex(),
            hex_digits(&Hash::from_bytes(b"one")),
            encode_hex(b"one"),
        );
        assert!(matches!(
            Checkpoint::from_json_str(&unprefixed_key),
            Err(ConfigError::InvalidCheckpoint(_))
        ));

        let negative = format!(
            r#"{{"root":"{}","step":-1,"preimages":{{}}}}"#,
            Hash::ZERO.to_hex()
        );
        assert!(Checkpoint::from_json_str(&negative).is_err());
    }

    fn hex_digits(hash: &Hash) -> String {
        hash.to_hex().trim_start_matches("0x").to_string()
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        let checkpoint = sample();
        checkpoint.save(&path).unwrap();
        assert_eq!(Checkpoint::load(&path).unwrap(), checkpoint);

        let missing = dir.path().join("absent.json");
        assert!(matches!(
            Checkpoint::load(&missing),
            Err(ChallengeError::Io { .. })
        ));
    }

    #[test]
    fn test_load_assertion_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output");
        let root = Hash::from_bytes(b"post state");
        std::fs::write(&path, root.as_bytes()).unwrap();
        assert_eq!(load_assertion_root(&path).unwrap(), root);

        std::fs::write(&path, [0u8; 33]).unwrap();
        assert!(matches!(
            load_assertion_root(&path),
            Err(ChallengeError::Configuration(
                ConfigError::InvalidAssertionRoot(33)
            ))
        ));
    }
}

//! Canonical block registry.

use crate::config::block_path;
use crate::{ChallengeError, ConfigError, RegistryError};
use faultproof_types::{BlockNumber, Hash};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Mapping from block number to the hash a block must have to be disputed.
///
/// The registry is an external collaborator: this crate populates it during
/// preload and consults it before initiating a challenge, but never owns the
/// record.
pub trait BlockRegistry {
    /// Commit `hash` as the canonical hash of block `number`.
    fn register_block(&self, number: BlockNumber, hash: Hash) -> Result<(), RegistryError>;

    /// Hash committed for block `number`, if any.
    fn committed_hash(&self, number: BlockNumber) -> Result<Option<Hash>, RegistryError>;
}

impl<R: BlockRegistry + ?Sized> BlockRegistry for &R {
    fn register_block(&self, number: BlockNumber, hash: Hash) -> Result<(), RegistryError> {
        (**self).register_block(number, hash)
    }

    fn committed_hash(&self, number: BlockNumber) -> Result<Option<Hash>, RegistryError> {
        (**self).committed_hash(number)
    }
}

/// Registry held in memory.
///
/// Clones share the same records, so a verifier and the preload step can
/// hold handles to one registry.
#[derive(Clone, Debug, Default)]
pub struct InMemoryBlockRegistry {
    blocks: Arc<RwLock<BTreeMap<BlockNumber, Hash>>>,
}

impl InMemoryBlockRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered blocks.
    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    /// Whether no block is registered.
    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }
}

impl BlockRegistry for InMemoryBlockRegistry {
    fn register_block(&self, number: BlockNumber, hash: Hash) -> Result<(), RegistryError> {
        let mut blocks = self.blocks.write();
        match blocks.get(&number) {
            Some(&registered) if registered != hash => Err(RegistryError::Conflict {
                block: number,
                registered,
                attempted: hash,
            }),
            Some(_) => Ok(()),
            None => {
                blocks.insert(number, hash);
                Ok(())
            }
        }
    }

    fn committed_hash(&self, number: BlockNumber) -> Result<Option<Hash>, RegistryError> {
        Ok(self.blocks.read().get(&number).copied())
    }
}

/// Register the demo chain's blocks.
///
/// The directory for block `N` holds the raw bytes of its successor, so
/// `<base_dir>/0_N/block` is committed as block `N + 1`.
pub fn preload_blocks<R>(
    base_dir: &Path,
    blocks: impl IntoIterator<Item = BlockNumber>,
    registry: &R,
) -> Result<Vec<(BlockNumber, Hash)>, ChallengeError>
where
    R: BlockRegistry + ?Sized,
{
    let mut registered = Vec::new();
    for number in blocks {
        let successor = number.next().ok_or(ConfigError::NoSuccessor(number))?;
        let path = block_path(base_dir, number);
        let bytes = std::fs::read(&path).map_err(|e| ChallengeError::io(&path, e))?;
        let hash = Hash::from_bytes(&bytes);

        registry.register_block(successor, hash)?;
        debug!(block = successor.0, hash = %hash, "Registered block");
        registered.push((successor, hash));
    }

    info!(count = registered.len(), "Preloaded blocks");
    Ok(registered)
}

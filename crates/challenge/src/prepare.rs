//! Loading the inputs of a challenge from disk.

use crate::call::ChallengeArgs;
use crate::checkpoint::{load_assertion_root, Checkpoint};
use crate::config::ChallengeConfig;
use crate::ChallengeError;
use faultproof_trie::PreimageStore;
use faultproof_types::{BlockNumber, Hash};
use tracing::info;

/// A dispute claim as the challenger sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisputeClaim {
    /// Last agreed-upon block `N`.
    pub block_number: BlockNumber,
    /// Raw bytes of block `N + 1`.
    pub next_block: Vec<u8>,
    /// Hash the challenger expects block `N + 1` to be registered under.
    pub claimed_next_block_hash: Hash,
    /// Post-state root the challenger asserts for block `N + 1`.
    pub disputed_post_state_root: Hash,
    /// System state after the program halted.
    pub final_system_state: Hash,
    /// Steps taken to reach `final_system_state`.
    pub step: u64,
}

impl DisputeClaim {
    /// Claim over `next_block`, expecting it to be registered under its own
    /// hash.
    pub fn new(
        block_number: BlockNumber,
        next_block: Vec<u8>,
        disputed_post_state_root: Hash,
        final_system_state: Hash,
        step: u64,
    ) -> Self {
        Self {
            block_number,
            claimed_next_block_hash: Hash::from_bytes(&next_block),
            next_block,
            disputed_post_state_root,
            final_system_state,
            step,
        }
    }

    /// Arguments of the call submitted to the verifier.
    pub fn to_args(&self) -> ChallengeArgs {
        ChallengeArgs {
            block_number: self.block_number,
            next_block: self.next_block.clone(),
            assertion_root: self.disputed_post_state_root,
            final_system_state: self.final_system_state,
            step: self.step,
        }
    }
}

/// Everything needed to initiate one challenge.
#[derive(Debug, Clone)]
pub struct PreparedChallenge {
    /// The claim to submit.
    pub claim: DisputeClaim,
    /// System state every dispute starts from.
    pub global_start_state: Hash,
    /// Union of the start and final checkpoints' preimages.
    pub preimages: PreimageStore,
}

impl PreparedChallenge {
    /// Load checkpoints, assertion root and block bytes named by `config`.
    pub fn load(config: &ChallengeConfig) -> Result<Self, ChallengeError> {
        config.validate()?;

        let start = Checkpoint::load(&config.start_checkpoint_path())?;
        let final_checkpoint = Checkpoint::load(&config.final_checkpoint_path())?;
        let assertion_root = load_assertion_root(&config.assertion_root_path())?;

        let block_path = config.block_path();
        let next_block =
            std::fs::read(&block_path).map_err(|e| ChallengeError::io(&block_path, e))?;

        let preimages = PreimageStore::merged([&start.preimages, &final_checkpoint.preimages]);
        let global_start_state = config.global_start_state.unwrap_or(start.root);

        info!(
            block = config.block_number.0,
            assertion_root = %assertion_root,
            final_system_state = %final_checkpoint.root,
            step = final_checkpoint.step,
            preimages = preimages.len(),
            "Loaded challenge inputs"
        );

        Ok(Self {
            claim: DisputeClaim::new(
                config.block_number,
                next_block,
                assertion_root,
                final_checkpoint.root,
                final_checkpoint.step,
            ),
            global_start_state,
            preimages,
        })
    }
}

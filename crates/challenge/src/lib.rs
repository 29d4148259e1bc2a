//! Challenge initiation for disputed block transitions.
//!
//! A challenger disputes the post-state root published for block `N + 1` by
//! showing a verifier the system state of a program run over that block.
//! This crate covers the off-chain half of opening such a dispute:
//!
//! 1. [`preload_blocks`] commits block hashes to a [`BlockRegistry`]
//! 2. [`PreparedChallenge::load`] reads the start and final [`Checkpoint`]s,
//!    the asserted root and the raw block, merging the preimages
//! 3. [`ChallengeInitiator`] extracts the witness of the dispute call, pushes
//!    it to the [`Verifier`] and submits the claim
//!
//! The registry and the verifier are external collaborators, reached through
//! traits. [`InMemoryBlockRegistry`] and [`LocalVerifier`] implement them
//! in-process.

mod call;
mod checkpoint;
mod config;
mod error;
mod initiator;
mod prepare;
mod registry;
mod verifier;

pub use call::{
    initiate_challenge_selector, CallError, ChallengeArgs, ChallengeCall, DisputeStart,
    INITIATE_CHALLENGE_SIGNATURE,
};
pub use checkpoint::{load_assertion_root, render_root, Checkpoint};
pub use config::{
    block_dir, block_path, ChallengeConfig, ASSERTION_ROOT_FILE, BLOCK_FILE,
    FINAL_CHECKPOINT_FILE, START_CHECKPOINT_FILE,
};
pub use error::{ChallengeError, ConfigError, RegistryError, SubmissionError};
pub use initiator::{ChallengeContext, ChallengeInitiator, ChallengePhase};
pub use prepare::{DisputeClaim, PreparedChallenge};
pub use registry::{preload_blocks, BlockRegistry, InMemoryBlockRegistry};
pub use verifier::{Challenge, LocalVerifier, Verifier, VerifierEvent};

//! Test helpers for fault-proof challenges.
//!
//! Everything here is deterministic: the same seed always yields the same
//! chain, the same system-state roots and byte-identical fixture files.
//!
//! - [`DemoChain`]: a balance-transfer chain with one fraudulent block
//! - [`SystemRun`]: system-state checkpoints of a program run over a block
//! - [`ChallengeFixture`]: both, written to a temporary base directory in the
//!   layout the challenger reads

mod chain;
mod fixture;
mod system;

pub use chain::DemoChain;
pub use fixture::{checkpoint_json, ChallengeFixture};
pub use system::{StepCheckpoint, SystemRun};

/// Seed used when a test does not care about chain contents.
pub const DEFAULT_SEED: u64 = 12345;

//! Challenge inputs written to a temporary base directory.

use crate::{DemoChain, StepCheckpoint, SystemRun, DEFAULT_SEED};
use faultproof_types::{encode_hex, BlockNumber, Hash};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Render a checkpoint in the on-disk JSON format.
pub fn checkpoint_json(checkpoint: &StepCheckpoint) -> String {
    let preimages: serde_json::Map<String, serde_json::Value> = checkpoint
        .preimages
        .iter()
        .map(|(hash, bytes)| (hash.to_hex(), encode_hex(bytes).into()))
        .collect();
    let value = serde_json::json!({
        "root": checkpoint.root.to_hex(),
        "step": checkpoint.step,
        "preimages": preimages,
    });
    serde_json::to_string_pretty(&value).expect("json values always serialize")
}

/// A base directory prepared for disputing block `N + 1`.
///
/// Layout:
///
/// ```text
/// <base>/golden.json                      start checkpoint
/// <base>/0_<i>/block                      raw block i + 1, for every i
/// <base>/0_<N>/output                     honest post-state root of N + 1
/// <base>/0_<N>/checkpoint_<step>.json     disjoint step checkpoints
/// <base>/0_<N>/checkpoint_final.json      halt checkpoint
/// ```
pub struct ChallengeFixture {
    dir: TempDir,
    /// The chain; block `N + 1` is published with a wrong state root.
    pub chain: DemoChain,
    /// The program run over block `N + 1`.
    pub run: SystemRun,
    /// Last agreed-upon block `N`.
    pub block_number: BlockNumber,
}

impl ChallengeFixture {
    /// Number of blocks after genesis in the demo chain.
    pub const CHAIN_LENGTH: u64 = 4;

    /// Fixture disputing the successor of `block_number`.
    pub fn new(block_number: u64) -> Self {
        Self::with_seed(DEFAULT_SEED, block_number)
    }

    /// Fixture with a specific chain seed.
    pub fn with_seed(seed: u64, block_number: u64) -> Self {
        assert!(
            block_number < Self::CHAIN_LENGTH,
            "block {} has no successor in the demo chain",
            block_number
        );
        let disputed = block_number + 1;
        let chain = DemoChain::generate(seed, Self::CHAIN_LENGTH, Some(disputed));
        let run = SystemRun::execute(
            &chain.block(disputed).serialize(),
            chain.honest_root(disputed),
        );

        let fixture = Self {
            dir: TempDir::new().expect("create temp dir"),
            chain,
            run,
            block_number: BlockNumber(block_number),
        };
        fixture.write_files();
        fixture
    }

    /// Base directory holding the files.
    pub fn base_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Directory for block `N`.
    pub fn block_dir(&self) -> PathBuf {
        self.base_dir()
            .join(format!("0_{}", self.block_number.0))
    }

    /// Raw bytes of the disputed block as published.
    pub fn next_block(&self) -> Vec<u8> {
        self.chain.block(self.block_number.0 + 1).serialize()
    }

    /// Root the challenger asserts for the disputed block.
    pub fn assertion_root(&self) -> Hash {
        self.chain.honest_root(self.block_number.0 + 1)
    }

    /// Path of the step checkpoint with index `index`.
    pub fn step_checkpoint_path(&self, index: usize) -> PathBuf {
        self.block_dir()
            .join(format!("checkpoint_{}.json", self.run.steps[index].step))
    }

    /// Hashes of every block file, by the block number they commit.
    pub fn block_hashes(&self) -> Vec<(BlockNumber, Hash)> {
        (1..=Self::CHAIN_LENGTH)
            .map(|number| (BlockNumber(number), self.chain.block(number).hash()))
            .collect()
    }

    fn write_files(&self) {
        let base = self.base_dir();
        write(&base.join("golden.json"), checkpoint_json(&self.run.golden));

        for number in 0..Self::CHAIN_LENGTH {
            let dir = base.join(format!("0_{}", number));
            write(&dir.join("block"), self.chain.block(number + 1).serialize());
        }

        let dir = self.block_dir();
        write(&dir.join("output"), self.assertion_root().to_bytes());
        for (index, step) in self.run.steps.iter().enumerate() {
            write(&self.step_checkpoint_path(index), checkpoint_json(step));
        }
        write(
            &dir.join("checkpoint_final.json"),
            checkpoint_json(&self.run.final_checkpoint),
        );
    }
}

fn write(path: &Path, contents: impl AsRef<[u8]>) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture directory");
    }
    fs::write(path, contents).expect("write fixture file");
}

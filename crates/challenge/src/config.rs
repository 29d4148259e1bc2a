//! Configuration for challenge preparation.

use crate::ConfigError;
use faultproof_types::{BlockNumber, Hash};
use std::path::{Path, PathBuf};

/// Name of the start (pre-dispute) checkpoint under the base directory.
pub const START_CHECKPOINT_FILE: &str = "golden.json";

/// Name of the final (post-dispute) checkpoint in a block directory.
pub const FINAL_CHECKPOINT_FILE: &str = "checkpoint_final.json";

/// Name of the raw assertion root in a block directory.
pub const ASSERTION_ROOT_FILE: &str = "output";

/// Name of the raw successor block in a block directory.
pub const BLOCK_FILE: &str = "block";

/// Directory holding the artifacts for disputing block `number`.
pub fn block_dir(base_dir: &Path, number: BlockNumber) -> PathBuf {
    base_dir.join(format!("0_{}", number.0))
}

/// Raw bytes of the successor of block `number`.
pub fn block_path(base_dir: &Path, number: BlockNumber) -> PathBuf {
    block_dir(base_dir, number).join(BLOCK_FILE)
}

/// Configuration for one challenge.
#[derive(Clone, Debug)]
pub struct ChallengeConfig {
    /// Directory holding checkpoints and block data.
    pub base_dir: PathBuf,

    /// Last agreed-upon block `N`; block `N + 1` is disputed.
    pub block_number: BlockNumber,

    /// Raw bytes of block `N + 1`. Defaults to [`block_path`].
    pub real_block: Option<PathBuf>,

    /// System state every dispute starts from.
    ///
    /// Defaults to the root of the start checkpoint.
    pub global_start_state: Option<Hash>,

    /// Whether to confirm every pushed node is cached before submitting the
    /// claim.
    pub verify_node_cache: bool,
}

impl ChallengeConfig {
    /// Create a configuration for disputing the successor of `block_number`.
    pub fn new(base_dir: impl Into<PathBuf>, block_number: BlockNumber) -> Self {
        Self {
            base_dir: base_dir.into(),
            block_number,
            real_block: None,
            global_start_state: None,
            verify_node_cache: true,
        }
    }

    /// Read `BASEDIR`, `BLOCK` and `REAL_BLOCK` from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read `BASEDIR`, `BLOCK` and `REAL_BLOCK` through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_dir = lookup("BASEDIR")
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::MissingVar("BASEDIR"))?;

        let block = lookup("BLOCK").ok_or(ConfigError::MissingVar("BLOCK"))?;
        let block_number = block
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|number| BlockNumber(*number).next().is_some())
            .ok_or_else(|| ConfigError::InvalidVar {
                name: "BLOCK",
                value: block.clone(),
            })?;

        let mut config = Self::new(base_dir, BlockNumber(block_number));
        if let Some(real_block) = lookup("REAL_BLOCK").filter(|value| !value.is_empty()) {
            config = config.with_real_block(real_block);
        }
        Ok(config)
    }

    /// Read the disputed block from `path`.
    pub fn with_real_block(mut self, path: impl Into<PathBuf>) -> Self {
        self.real_block = Some(path.into());
        self
    }

    /// Start disputes from `root` instead of the start checkpoint's root.
    pub fn with_global_start_state(mut self, root: Hash) -> Self {
        self.global_start_state = Some(root);
        self
    }

    /// Enable or disable the post-push cache check.
    pub fn with_verify_node_cache(mut self, enabled: bool) -> Self {
        self.verify_node_cache = enabled;
        self
    }

    /// Start (pre-dispute) checkpoint.
    pub fn start_checkpoint_path(&self) -> PathBuf {
        self.base_dir.join(START_CHECKPOINT_FILE)
    }

    /// Final (post-dispute) checkpoint.
    pub fn final_checkpoint_path(&self) -> PathBuf {
        block_dir(&self.base_dir, self.block_number).join(FINAL_CHECKPOINT_FILE)
    }

    /// Raw 32-byte assertion root.
    pub fn assertion_root_path(&self) -> PathBuf {
        block_dir(&self.base_dir, self.block_number).join(ASSERTION_ROOT_FILE)
    }

    /// Raw bytes of the disputed block.
    pub fn block_path(&self) -> PathBuf {
        self.real_block
            .clone()
            .unwrap_or_else(|| block_path(&self.base_dir, self.block_number))
    }

    /// Check every input file exists.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for path in [
            self.start_checkpoint_path(),
            self.final_checkpoint_path(),
            self.assertion_root_path(),
            self.block_path(),
        ] {
            if !path.is_file() {
                return Err(ConfigError::MissingFile(path));
            }
        }
        Ok(())
    }
}

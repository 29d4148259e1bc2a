//! Memory layout of the disputed program's system state.
//!
//! The program's memory is a state trie keyed by 4-byte big-endian addresses.
//! Before the run the challenger writes the hash of the block under dispute
//! to [`INPUT_HASH_KEY`]; a program that ran to completion leaves
//! [`HALT_MAGIC`] at [`MAGIC_KEY`] and the post-state root it computed at
//! [`OUTPUT_HASH_KEY`].

/// Address holding the 32-byte hash of the input block.
pub const INPUT_HASH_KEY: [u8; 4] = 0x3000_0000u32.to_be_bytes();

/// Address holding [`HALT_MAGIC`] once the program halted normally.
pub const MAGIC_KEY: [u8; 4] = 0x3000_0800u32.to_be_bytes();

/// Address holding the 32-byte output (post-state root) hash.
pub const OUTPUT_HASH_KEY: [u8; 4] = 0x3000_0804u32.to_be_bytes();

/// Marker written by a program that halted normally.
pub const HALT_MAGIC: [u8; 4] = 0x1337_f00du32.to_be_bytes();

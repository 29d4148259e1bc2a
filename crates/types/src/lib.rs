//! Core types shared by the fault-proof crates.
//!
//! - [`Hash`]: Keccak-256 content address of every preimage, node and block
//! - [`Block`] / [`Txn`]: RLP-encoded blocks of the disputed chain
//! - [`BlockNumber`] / [`ChallengeId`]: identifiers
//! - [`layout`]: addresses in the disputed program's system state

mod block;
mod hash;
mod identifiers;
pub mod layout;

pub use block::{Block, BlockDecodeError, Txn};
pub use hash::{decode_hex, encode_hex, strip_hex_prefix, Hash, HexError};
pub use identifiers::{BlockNumber, ChallengeId};

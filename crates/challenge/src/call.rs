//! The call that opens a dispute, and its execution against system state.

use alloy_rlp::{Decodable, Encodable, Header};
use faultproof_trie::{NodeStore, Operation, StateTrie, TrieError};
use faultproof_types::layout::{HALT_MAGIC, INPUT_HASH_KEY, MAGIC_KEY, OUTPUT_HASH_KEY};
use faultproof_types::{Block, BlockDecodeError, BlockNumber, Hash};
use thiserror::Error;

/// Signature whose hash prefixes encoded dispute calls.
pub const INITIATE_CHALLENGE_SIGNATURE: &str =
    "initiateChallenge(uint256,bytes,bytes32,bytes32,uint256)";

/// First four bytes of `keccak256(INITIATE_CHALLENGE_SIGNATURE)`.
pub fn initiate_challenge_selector() -> [u8; 4] {
    let hash = Hash::from_bytes(INITIATE_CHALLENGE_SIGNATURE.as_bytes());
    let bytes = hash.as_bytes();
    [bytes[0], bytes[1], bytes[2], bytes[3]]
}

/// Arguments of a dispute claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeArgs {
    /// Last agreed-upon block `N`.
    pub block_number: BlockNumber,
    /// Raw bytes of block `N + 1`, passed through unmodified.
    pub next_block: Vec<u8>,
    /// Post-state root the challenger asserts for block `N + 1`.
    pub assertion_root: Hash,
    /// Root of the system state after the program halted.
    pub final_system_state: Hash,
    /// Number of execution steps taken to reach `final_system_state`.
    pub step: u64,
}

impl ChallengeArgs {
    fn payload_length(&self) -> usize {
        self.block_number.0.length()
            + self.next_block.as_slice().length()
            + self.assertion_root.length()
            + self.final_system_state.length()
            + self.step.length()
    }

    /// Selector followed by the RLP list of the five arguments.
    pub fn encode_call(&self) -> Vec<u8> {
        let header = Header {
            list: true,
            payload_length: self.payload_length(),
        };
        let mut out = Vec::with_capacity(4 + header.length() + header.payload_length);
        out.extend_from_slice(&initiate_challenge_selector());
        header.encode(&mut out);
        self.block_number.0.encode(&mut out);
        self.next_block.as_slice().encode(&mut out);
        self.assertion_root.encode(&mut out);
        self.final_system_state.encode(&mut out);
        self.step.encode(&mut out);
        out
    }

    /// Inverse of [`encode_call`](Self::encode_call).
    pub fn decode_call(data: &[u8]) -> Result<Self, CallError> {
        let Some((selector, mut buf)) = data.split_first_chunk::<4>() else {
            return Err(CallError::MalformedCall("shorter than a selector".to_string()));
        };
        if *selector != initiate_challenge_selector() {
            return Err(CallError::UnknownSelector(*selector));
        }

        let malformed = |e: alloy_rlp::Error| CallError::MalformedCall(e.to_string());
        let mut payload = Header::decode_bytes(&mut buf, true).map_err(malformed)?;
        let args = ChallengeArgs {
            block_number: BlockNumber(u64::decode(&mut payload).map_err(malformed)?),
            next_block: Header::decode_bytes(&mut payload, false)
                .map_err(malformed)?
                .to_vec(),
            assertion_root: Hash::decode(&mut payload).map_err(malformed)?,
            final_system_state: Hash::decode(&mut payload).map_err(malformed)?,
            step: u64::decode(&mut payload).map_err(malformed)?,
        };
        if !payload.is_empty() || !buf.is_empty() {
            return Err(CallError::MalformedCall("trailing bytes".to_string()));
        }
        Ok(args)
    }
}

/// State the dispute starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisputeStart {
    /// System state with the input hash written in: step 0 of the bisection.
    pub start_state: Hash,
    /// `keccak256` of the disputed block.
    pub input_hash: Hash,
}

/// Failures of a dispute call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// Call data does not start with the dispute selector.
    #[error("Unknown call selector {0:02x?}")]
    UnknownSelector([u8; 4]),

    /// Call data does not decode.
    #[error("Malformed call data: {0}")]
    MalformedCall(String),

    /// The disputed block does not decode.
    #[error(transparent)]
    MalformedBlock(#[from] BlockDecodeError),

    /// The block carried in the call is not the successor of the disputed one.
    #[error("Expected block {expected}, call carries block {found}")]
    WrongBlock {
        /// Successor of the call's block number.
        expected: BlockNumber,
        /// Number decoded from the block bytes.
        found: BlockNumber,
    },

    /// The asserted root is the one the block producer already committed to.
    #[error("Asserted root {0} matches the block's state root, nothing to dispute")]
    NotADispute(Hash),

    /// The final system state has no halt marker.
    #[error("System state {0} has not halted")]
    NotHalted(Hash),

    /// The final system state computed a different output.
    #[error("System state commits to output {found:?}, asserted {expected}")]
    AssertionMismatch {
        /// Root asserted in the call.
        expected: Hash,
        /// Output stored in the final system state, if it is a hash.
        found: Option<Hash>,
    },

    /// A trie lookup or write failed.
    #[error(transparent)]
    Trie(#[from] TrieError),
}

/// Execution of a dispute call against system state.
///
/// The trie is expected to be bound to the final system state. The call
/// derives the start state by writing the input hash into the global start
/// state, then checks the final state for the halt marker and the asserted
/// output.
#[derive(Debug, Clone, Copy)]
pub struct ChallengeCall<'a> {
    args: &'a ChallengeArgs,
    global_start_state: Hash,
}

impl<'a> ChallengeCall<'a> {
    /// Dispute call for `args` on top of `global_start_state`.
    pub fn new(args: &'a ChallengeArgs, global_start_state: Hash) -> Self {
        Self {
            args,
            global_start_state,
        }
    }

    /// The call's arguments.
    pub fn args(&self) -> &ChallengeArgs {
        self.args
    }
}

impl Operation for ChallengeCall<'_> {
    type Output = DisputeStart;
    type Error = CallError;

    fn apply<S: NodeStore>(&self, trie: &mut StateTrie<S>) -> Result<DisputeStart, CallError> {
        let args = self.args;
        let block = Block::decode_exact(&args.next_block)?;

        let expected = args.block_number.next().ok_or_else(|| {
            CallError::MalformedCall(format!("{} has no successor", args.block_number))
        })?;
        if block.number != expected.0 {
            return Err(CallError::WrongBlock {
                expected,
                found: BlockNumber(block.number),
            });
        }
        if args.assertion_root == block.state_root {
            return Err(CallError::NotADispute(args.assertion_root));
        }

        let input_hash = Hash::from_bytes(&args.next_block);
        trie.checkout(self.global_start_state);
        let start_state = trie.put(&INPUT_HASH_KEY, input_hash.as_bytes().to_vec())?;

        trie.checkout(args.final_system_state);
        if trie.get(&MAGIC_KEY)?.as_deref() != Some(&HALT_MAGIC[..]) {
            return Err(CallError::NotHalted(args.final_system_state));
        }
        let output = trie.get(&OUTPUT_HASH_KEY)?;
        let found = output
            .as_deref()
            .and_then(|bytes| Hash::from_hash_bytes(bytes).ok());
        if found != Some(args.assertion_root) {
            return Err(CallError::AssertionMismatch {
                expected: args.assertion_root,
                found,
            });
        }

        Ok(DisputeStart {
            start_state,
            input_hash,
        })
    }
}

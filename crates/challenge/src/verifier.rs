//! Verifier seam and an in-process verifier.

use crate::call::{ChallengeArgs, ChallengeCall};
use crate::registry::BlockRegistry;
use crate::SubmissionError;
use faultproof_trie::{extract, PreimageStore, TrieNode};
use faultproof_types::{BlockNumber, ChallengeId, Hash};
use tracing::{debug, info, warn};

/// A dispute opened by the verifier.
///
/// The verifier owns this record; the challenger only reads it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Challenge {
    /// Identifier assigned by the verifier.
    pub id: ChallengeId,
    /// Last agreed-upon block.
    pub block_number: BlockNumber,
    /// System state at step 0 of the bisection.
    pub start_state: Hash,
    /// `keccak256` of the disputed block.
    pub input_hash: Hash,
}

/// The party that adjudicates disputes.
///
/// A verifier holds none of the trie. It can only check a node against a
/// hash it has been shown, so every node a claim depends on must be pushed
/// before the claim is submitted.
pub trait Verifier {
    /// Add a node to the verifier's cache. Idempotent.
    fn push_node(&mut self, node: &[u8]) -> Result<Hash, SubmissionError>;

    /// Whether the node with `hash` is cached.
    fn has_node(&self, hash: &Hash) -> Result<bool, SubmissionError>;

    /// Submit a dispute claim.
    fn submit_claim(&mut self, args: &ChallengeArgs) -> Result<Challenge, SubmissionError>;
}

/// Calls received by a [`LocalVerifier`], in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifierEvent {
    /// A node was pushed.
    NodePushed(Hash),
    /// A claim was submitted.
    ClaimSubmitted(BlockNumber),
}

/// Passive verifier running in-process.
///
/// Holds only the nodes pushed to it. A claim is accepted if the successor
/// block matches the registry commitment and the dispute call replays over
/// the cached nodes alone.
pub struct LocalVerifier<R> {
    registry: R,
    global_start_state: Hash,
    nodes: PreimageStore,
    challenges: Vec<Challenge>,
    history: Vec<VerifierEvent>,
}

impl<R: BlockRegistry> LocalVerifier<R> {
    /// Create a verifier consulting `registry`, with disputes starting from
    /// `global_start_state`.
    pub fn new(registry: R, global_start_state: Hash) -> Self {
        Self {
            registry,
            global_start_state,
            nodes: PreimageStore::new(),
            challenges: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Nodes pushed so far, plus nodes written by accepted claims.
    pub fn nodes(&self) -> &PreimageStore {
        &self.nodes
    }

    /// Accepted challenges by id.
    pub fn challenges(&self) -> &[Challenge] {
        &self.challenges
    }

    /// Look up a challenge.
    pub fn challenge(&self, id: ChallengeId) -> Option<&Challenge> {
        self.challenges.iter().find(|challenge| challenge.id == id)
    }

    /// Every call received, in order.
    pub fn history(&self) -> &[VerifierEvent] {
        &self.history
    }

    fn check_claim(&mut self, args: &ChallengeArgs) -> Result<Challenge, String> {
        let successor = args
            .block_number
            .next()
            .ok_or_else(|| format!("{} has no successor", args.block_number))?;
        let committed = self
            .registry
            .committed_hash(successor)
            .map_err(|e| e.to_string())?;
        let presented = Hash::from_bytes(&args.next_block);
        if committed != Some(presented) {
            return Err(format!(
                "block {} is not the committed {}",
                presented, successor
            ));
        }

        // Writes stay in the extraction overlay until the claim is accepted.
        let call = ChallengeCall::new(args, self.global_start_state);
        let extraction =
            extract(args.final_system_state, &self.nodes, &call).map_err(|e| e.to_string())?;
        let start = extraction.output;
        self.nodes.merge(&extraction.witness.into_store());

        Ok(Challenge {
            id: ChallengeId(self.challenges.len() as u64),
            block_number: args.block_number,
            start_state: start.start_state,
            input_hash: start.input_hash,
        })
    }
}

impl<R: BlockRegistry> Verifier for LocalVerifier<R> {
    fn push_node(&mut self, node: &[u8]) -> Result<Hash, SubmissionError> {
        TrieNode::decode(node).map_err(|e| SubmissionError::NodeRejected(e.to_string()))?;
        let hash = self.nodes.put(node.to_vec());
        self.history.push(VerifierEvent::NodePushed(hash));
        debug!(node = %hash, cached = self.nodes.len(), "Verifier cached node");
        Ok(hash)
    }

    fn has_node(&self, hash: &Hash) -> Result<bool, SubmissionError> {
        Ok(self.nodes.contains(hash))
    }

    fn submit_claim(&mut self, args: &ChallengeArgs) -> Result<Challenge, SubmissionError> {
        self.history
            .push(VerifierEvent::ClaimSubmitted(args.block_number));

        match self.check_claim(args) {
            Ok(challenge) => {
                info!(
                    challenge_id = challenge.id.0,
                    block = args.block_number.0,
                    "Verifier opened challenge"
                );
                self.challenges.push(challenge);
                Ok(challenge)
            }
            Err(reason) => {
                warn!(block = args.block_number.0, reason = %reason, "Verifier rejected claim");
                Err(SubmissionError::ClaimRejected(reason))
            }
        }
    }
}

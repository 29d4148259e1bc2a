//! Challenge initiation.
//!
//! # Flow
//!
//! ```text
//! registry pre-check ──► encode call ──► extract witness over merged store
//!                                                │
//!                 submit claim ◄── verify cache ◄┴── push nodes in order
//! ```
//!
//! Nothing is sent to the verifier until the registry check passed and the
//! call replayed locally; a missing preimage or a local call failure aborts
//! the attempt with no side effects. Once nodes are pushed they stay pushed:
//! they are content addressed and harmless if the claim is later rejected.
//! No step is retried.

use crate::call::{ChallengeArgs, ChallengeCall};
use crate::config::ChallengeConfig;
use crate::prepare::PreparedChallenge;
use crate::registry::BlockRegistry;
use crate::verifier::{Challenge, Verifier};
use crate::{ChallengeError, ConfigError, SubmissionError};
use faultproof_trie::{extract, WitnessError};
use faultproof_types::Hash;
use tracing::{debug, info, warn};

/// Collaborators and configuration for one challenger.
pub struct ChallengeContext<R, V> {
    /// Challenge configuration.
    pub config: ChallengeConfig,
    /// Canonical block registry.
    pub registry: R,
    /// Verifier adjudicating the dispute.
    pub verifier: V,
}

/// Where a challenge attempt stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengePhase {
    /// Nothing has been sent.
    NotStarted,
    /// Every witness node has been pushed.
    WitnessPushed {
        /// Number of nodes pushed.
        nodes: usize,
    },
    /// The claim has been submitted.
    Claimed,
    /// The verifier opened the challenge.
    Accepted(Challenge),
    /// The verifier refused a node or the claim.
    Rejected(String),
}

/// Drives one challenge from prepared inputs to an opened dispute.
pub struct ChallengeInitiator<R, V> {
    context: ChallengeContext<R, V>,
    phase: ChallengePhase,
}

impl<R: BlockRegistry, V: Verifier> ChallengeInitiator<R, V> {
    /// Create an initiator.
    pub fn new(context: ChallengeContext<R, V>) -> Self {
        Self {
            context,
            phase: ChallengePhase::NotStarted,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> &ChallengePhase {
        &self.phase
    }

    /// Challenge configuration.
    pub fn config(&self) -> &ChallengeConfig {
        &self.context.config
    }

    /// The registry.
    pub fn registry(&self) -> &R {
        &self.context.registry
    }

    /// The verifier.
    pub fn verifier(&self) -> &V {
        &self.context.verifier
    }

    /// Release the collaborators.
    pub fn into_context(self) -> ChallengeContext<R, V> {
        self.context
    }

    /// Load the inputs named by the configuration and initiate the challenge.
    pub fn run(&mut self) -> Result<Challenge, ChallengeError> {
        let prepared = PreparedChallenge::load(&self.context.config)?;
        self.initiate(&prepared)
    }

    /// Initiate a challenge from prepared inputs.
    pub fn initiate(&mut self, prepared: &PreparedChallenge) -> Result<Challenge, ChallengeError> {
        self.phase = ChallengePhase::NotStarted;
        let claim = &prepared.claim;
        info!(
            block = claim.block_number.0,
            assertion_root = %claim.disputed_post_state_root,
            final_system_state = %claim.final_system_state,
            step = claim.step,
            "Initiating challenge"
        );

        // Registry pre-check.
        let successor = claim
            .block_number
            .next()
            .ok_or(ConfigError::NoSuccessor(claim.block_number))?;
        let presented = Hash::from_bytes(&claim.next_block);
        if presented != claim.claimed_next_block_hash {
            return Err(ChallengeError::RegistryMismatch {
                block: successor,
                expected: Some(claim.claimed_next_block_hash),
                actual: presented,
            });
        }
        let committed = self.context.registry.committed_hash(successor)?;
        if committed != Some(presented) {
            return Err(ChallengeError::RegistryMismatch {
                block: successor,
                expected: committed,
                actual: presented,
            });
        }

        // Replay exactly what the verifier will decode.
        let call_data = claim.to_args().encode_call();
        let args = ChallengeArgs::decode_call(&call_data)?;
        debug!(bytes = call_data.len(), "Encoded dispute call");

        let call = ChallengeCall::new(&args, prepared.global_start_state);
        let extraction = extract(args.final_system_state, &prepared.preimages, &call)
            .map_err(|e| match e {
                WitnessError::MissingPreimage(hash) => ChallengeError::MissingPreimage(hash),
                WitnessError::Operation(e) => ChallengeError::Call(e),
            })?;
        let witness = extraction.witness;
        info!(
            nodes = witness.len(),
            start_state = %extraction.output.start_state,
            "Extracted witness"
        );

        for (hash, node) in witness.iter() {
            let pushed = self
                .context
                .verifier
                .push_node(node)
                .map_err(|e| self.reject(e))?;
            if pushed != *hash {
                return Err(self.reject(SubmissionError::NodeRejected(format!(
                    "verifier cached {} as {}",
                    hash, pushed
                ))));
            }
            debug!(node = %hash, "Pushed node");
        }
        self.phase = ChallengePhase::WitnessPushed {
            nodes: witness.len(),
        };

        if self.context.config.verify_node_cache {
            for hash in witness.hashes() {
                let cached = self
                    .context
                    .verifier
                    .has_node(hash)
                    .map_err(|e| self.reject(e))?;
                if !cached {
                    return Err(self.reject(SubmissionError::NodeNotCached(*hash)));
                }
            }
            debug!(nodes = witness.len(), "Verifier cache confirmed");
        }

        self.phase = ChallengePhase::Claimed;
        let challenge = self
            .context
            .verifier
            .submit_claim(&args)
            .map_err(|e| self.reject(e))?;

        if challenge.start_state != extraction.output.start_state {
            warn!(
                local = %extraction.output.start_state,
                verifier = %challenge.start_state,
                "Verifier derived a different start state"
            );
        }
        info!(
            challenge_id = challenge.id.0,
            start_state = %challenge.start_state,
            input_hash = %challenge.input_hash,
            "Challenge created"
        );
        self.phase = ChallengePhase::Accepted(challenge);
        Ok(challenge)
    }

    fn reject(&mut self, error: SubmissionError) -> ChallengeError {
        warn!(phase = ?self.phase, error = %error, "Submission rejected");
        self.phase = ChallengePhase::Rejected(error.to_string());
        error.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{preload_blocks, InMemoryBlockRegistry};
    use crate::verifier::{LocalVerifier, VerifierEvent};
    use crate::RegistryError;
    use faultproof_test_helpers::ChallengeFixture;
    use faultproof_types::BlockNumber;
    use tracing_test::traced_test;

    type Initiator<V> = ChallengeInitiator<InMemoryBlockRegistry, V>;

    fn setup(fixture: &ChallengeFixture) -> Initiator<LocalVerifier<InMemoryBlockRegistry>> {
        let registry = InMemoryBlockRegistry::new();
        preload_blocks(
            fixture.base_dir(),
            (0..ChallengeFixture::CHAIN_LENGTH).map(BlockNumber),
            &registry,
        )
        .unwrap();
        let verifier = LocalVerifier::new(registry.clone(), fixture.run.global_start_state());
        ChallengeInitiator::new(ChallengeContext {
            config: ChallengeConfig::new(fixture.base_dir(), fixture.block_number),
            registry,
            verifier,
        })
    }

    /// Verifier that accepts pushes but forgets one node.
    struct ForgetfulVerifier {
        inner: LocalVerifier<InMemoryBlockRegistry>,
        forgotten: Option<Hash>,
    }

    impl Verifier for ForgetfulVerifier {
        fn push_node(&mut self, node: &[u8]) -> Result<Hash, SubmissionError> {
            let hash = self.inner.push_node(node)?;
            self.forgotten.get_or_insert(hash);
            Ok(hash)
        }

        fn has_node(&self, hash: &Hash) -> Result<bool, SubmissionError> {
            Ok(Some(*hash) != self.forgotten && self.inner.has_node(hash)?)
        }

        fn submit_claim(&mut self, args: &ChallengeArgs) -> Result<Challenge, SubmissionError> {
            self.inner.submit_claim(args)
        }
    }

    #[traced_test]
    #[test]
    fn test_run_opens_challenge() {
        let fixture = ChallengeFixture::new(1);
        let mut initiator = setup(&fixture);

        let challenge = initiator.run().unwrap();
        assert_eq!(challenge.block_number, BlockNumber(1));
        assert_eq!(challenge.input_hash, Hash::from_bytes(&fixture.next_block()));
        assert_eq!(initiator.phase(), &ChallengePhase::Accepted(challenge));
        assert!(logs_contain("Challenge created"));
    }

    #[traced_test]
    #[test]
    fn test_nodes_pushed_before_claim() {
        let fixture = ChallengeFixture::new(2);
        let mut initiator = setup(&fixture);
        initiator.run().unwrap();

        let history = initiator.verifier().history();
        let (last, pushes) = history.split_last().unwrap();
        assert_eq!(last, &VerifierEvent::ClaimSubmitted(BlockNumber(2)));
        assert!(!pushes.is_empty());
        assert!(pushes
            .iter()
            .all(|event| matches!(event, VerifierEvent::NodePushed(_))));
    }

    #[traced_test]
    #[test]
    fn test_registry_mismatch_before_any_push() {
        let fixture = ChallengeFixture::new(0);
        let verifier = LocalVerifier::new(
            InMemoryBlockRegistry::new(),
            fixture.run.global_start_state(),
        );
        let mut initiator = ChallengeInitiator::new(ChallengeContext {
            config: ChallengeConfig::new(fixture.base_dir(), fixture.block_number),
            registry: InMemoryBlockRegistry::new(),
            verifier,
        });

        let result = initiator.run();
        assert!(matches!(
            result,
            Err(ChallengeError::RegistryMismatch { expected: None, .. })
        ));
        assert!(initiator.verifier().history().is_empty());
        assert_eq!(initiator.phase(), &ChallengePhase::NotStarted);
    }

    #[test]
    fn test_claimed_hash_must_match_block_bytes() {
        let fixture = ChallengeFixture::new(0);
        let mut initiator = setup(&fixture);
        let mut prepared = PreparedChallenge::load(initiator.config()).unwrap();
        prepared.claim.claimed_next_block_hash = Hash::from_bytes(b"something else");

        assert!(matches!(
            initiator.initiate(&prepared),
            Err(ChallengeError::RegistryMismatch { .. })
        ));
        assert!(initiator.verifier().history().is_empty());
    }

    #[test]
    fn test_last_block_has_nothing_to_dispute() {
        let fixture = ChallengeFixture::new(0);
        let mut initiator = setup(&fixture);
        let mut prepared = PreparedChallenge::load(initiator.config()).unwrap();
        prepared.claim.block_number = BlockNumber(u64::MAX);

        assert!(matches!(
            initiator.initiate(&prepared),
            Err(ChallengeError::Configuration(ConfigError::NoSuccessor(BlockNumber(u64::MAX))))
        ));
        assert!(initiator.verifier().history().is_empty());
        assert_eq!(initiator.phase(), &ChallengePhase::NotStarted);
    }

    #[test]
    fn test_missing_preimage_before_any_push() {
        let fixture = ChallengeFixture::new(1);
        let mut initiator = setup(&fixture);
        let mut prepared = PreparedChallenge::load(initiator.config()).unwrap();
        prepared.preimages = fixture.run.final_checkpoint.preimages.clone();

        assert!(matches!(
            initiator.initiate(&prepared),
            Err(ChallengeError::MissingPreimage(_))
        ));
        assert!(initiator.verifier().history().is_empty());
    }

    #[test]
    fn test_undisputed_root_fails_locally() {
        let fixture = ChallengeFixture::new(1);
        let mut initiator = setup(&fixture);
        let mut prepared = PreparedChallenge::load(initiator.config()).unwrap();
        prepared.claim.disputed_post_state_root = fixture.chain.block(2).state_root;

        assert!(matches!(
            initiator.initiate(&prepared),
            Err(ChallengeError::Call(_))
        ));
        assert!(initiator.verifier().history().is_empty());
    }

    #[traced_test]
    #[test]
    fn test_rejected_claim_is_not_retried() {
        let fixture = ChallengeFixture::new(1);
        let registry = InMemoryBlockRegistry::new();
        preload_blocks(fixture.base_dir(), [BlockNumber(1)], &registry).unwrap();
        // The verifier disagrees on where disputes start.
        let verifier = LocalVerifier::new(registry.clone(), Hash::from_bytes(b"elsewhere"));
        let mut initiator = ChallengeInitiator::new(ChallengeContext {
            config: ChallengeConfig::new(fixture.base_dir(), fixture.block_number),
            registry,
            verifier,
        });

        let result = initiator.run();
        assert!(matches!(
            result,
            Err(ChallengeError::Submission(SubmissionError::ClaimRejected(_)))
        ));
        assert!(matches!(initiator.phase(), ChallengePhase::Rejected(_)));

        let claims = initiator
            .verifier()
            .history()
            .iter()
            .filter(|event| matches!(event, VerifierEvent::ClaimSubmitted(_)))
            .count();
        assert_eq!(claims, 1);
        assert!(logs_contain("Submission rejected"));
    }

    #[test]
    fn test_cache_check_catches_dropped_node() {
        let fixture = ChallengeFixture::new(1);
        let registry = InMemoryBlockRegistry::new();
        preload_blocks(fixture.base_dir(), [BlockNumber(1)], &registry).unwrap();
        let verifier = ForgetfulVerifier {
            inner: LocalVerifier::new(registry.clone(), fixture.run.global_start_state()),
            forgotten: None,
        };
        let mut initiator = ChallengeInitiator::new(ChallengeContext {
            config: ChallengeConfig::new(fixture.base_dir(), fixture.block_number),
            registry,
            verifier,
        });

        let result = initiator.run();
        assert!(matches!(
            result,
            Err(ChallengeError::Submission(SubmissionError::NodeNotCached(_)))
        ));
        assert!(initiator.verifier().inner.challenges().is_empty());
    }

    #[test]
    fn test_cache_check_can_be_disabled() {
        let fixture = ChallengeFixture::new(1);
        let registry = InMemoryBlockRegistry::new();
        preload_blocks(fixture.base_dir(), [BlockNumber(1)], &registry).unwrap();
        let verifier = ForgetfulVerifier {
            inner: LocalVerifier::new(registry.clone(), fixture.run.global_start_state()),
            forgotten: None,
        };
        let mut initiator = ChallengeInitiator::new(ChallengeContext {
            config: ChallengeConfig::new(fixture.base_dir(), fixture.block_number)
                .with_verify_node_cache(false),
            registry,
            verifier,
        });

        // The node is only hidden from the check, the claim still replays.
        assert!(initiator.run().is_ok());
    }

    #[test]
    fn test_registry_conflict_surfaces() {
        let fixture = ChallengeFixture::new(0);
        let registry = InMemoryBlockRegistry::new();
        registry
            .register_block(BlockNumber(1), Hash::from_bytes(b"other"))
            .unwrap();
        let result = preload_blocks(fixture.base_dir(), [BlockNumber(0)], &registry);
        assert!(matches!(
            result,
            Err(ChallengeError::Registry(RegistryError::Conflict { .. }))
        ));
    }
}

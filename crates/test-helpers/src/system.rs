//! System-state checkpoints of a simulated program run.

use faultproof_trie::{PreimageStore, StateTrie};
use faultproof_types::layout::{HALT_MAGIC, INPUT_HASH_KEY, MAGIC_KEY, OUTPUT_HASH_KEY};
use faultproof_types::Hash;

const PROGRAM_BASE: u32 = 0x0040_0000;
const PROGRAM_WORDS: u32 = 24;
const STACK_BASE: u32 = 0x7fff_e000;
const HEAP_BASE: u32 = 0x2000_0000;

/// System-state root after `step` steps, with the preimages needed to reach
/// it from the previous checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepCheckpoint {
    /// System-state root.
    pub root: Hash,
    /// Steps executed.
    pub step: u64,
    /// Node preimages.
    pub preimages: PreimageStore,
}

/// A program run over one block, cut into checkpoints.
///
/// The golden checkpoint holds the loaded program. Each step checkpoint only
/// holds the nodes created since the previous one, so their preimage sets
/// are pairwise disjoint. The final checkpoint holds every node created
/// during the run; together with the golden checkpoint it covers both ends
/// of the transition.
#[derive(Debug, Clone)]
pub struct SystemRun {
    /// Loaded program, step 0.
    pub golden: StepCheckpoint,
    /// Intermediate checkpoints in step order, the last one at the halt.
    pub steps: Vec<StepCheckpoint>,
    /// State at the halt with every node created during the run.
    pub final_checkpoint: StepCheckpoint,
}

impl SystemRun {
    /// The loaded program image.
    pub fn golden() -> StepCheckpoint {
        let mut trie = StateTrie::new(PreimageStore::new());
        for i in 0..PROGRAM_WORDS {
            let word = Hash::from_bytes(&i.to_be_bytes()).as_bytes()[..4].to_vec();
            write(&mut trie, PROGRAM_BASE + i * 4, word);
        }
        write(&mut trie, STACK_BASE, STACK_BASE.to_be_bytes().to_vec());

        let root = trie.root();
        StepCheckpoint {
            root,
            step: 0,
            preimages: trie.into_store(),
        }
    }

    /// Run the program over `input`, halting with `output` as its result.
    pub fn execute(input: &[u8], output: Hash) -> Self {
        let golden = Self::golden();
        let input_hash = Hash::from_bytes(input);

        let mut trie = StateTrie::at(golden.root, golden.preimages.clone());
        let mut steps = Vec::new();

        // Read the input, scatter some words over the heap.
        steps.push(checkpoint(&mut trie, 1_000, |trie| {
            write(trie, u32::from_be_bytes(INPUT_HASH_KEY), input_hash.to_bytes().to_vec());
            for (i, chunk) in input_hash.as_bytes().chunks(4).enumerate() {
                write(trie, HEAP_BASE + i as u32 * 4, chunk.to_vec());
            }
        }));

        // Grow the stack.
        steps.push(checkpoint(&mut trie, 2_500, |trie| {
            for i in 1..=6u32 {
                write(trie, STACK_BASE - i * 4, (i * 0x0101_0101).to_be_bytes().to_vec());
            }
        }));

        // Store the result and halt.
        steps.push(checkpoint(&mut trie, 4_096, |trie| {
            write(trie, u32::from_be_bytes(OUTPUT_HASH_KEY), output.to_bytes().to_vec());
            write(trie, u32::from_be_bytes(MAGIC_KEY), HALT_MAGIC.to_vec());
        }));

        let last = steps.last().map(|step| (step.root, step.step));
        let (root, step) = last.unwrap_or((golden.root, 0));
        let final_checkpoint = StepCheckpoint {
            root,
            step,
            preimages: PreimageStore::merged(steps.iter().map(|step| &step.preimages)),
        };

        Self {
            golden,
            steps,
            final_checkpoint,
        }
    }

    /// Root every dispute starts from.
    pub fn global_start_state(&self) -> Hash {
        self.golden.root
    }

    /// Union of the golden and final preimages.
    pub fn merged_preimages(&self) -> PreimageStore {
        PreimageStore::merged([&self.golden.preimages, &self.final_checkpoint.preimages])
    }
}

fn write(trie: &mut StateTrie<PreimageStore>, address: u32, value: Vec<u8>) {
    trie.put(&address.to_be_bytes(), value)
        .expect("in-memory trie write");
}

fn checkpoint(
    trie: &mut StateTrie<PreimageStore>,
    step: u64,
    run: impl FnOnce(&mut StateTrie<PreimageStore>),
) -> StepCheckpoint {
    let before = trie.store().clone();
    run(trie);

    let after = trie.store();
    let preimages = after
        .difference(&before)
        .filter_map(|hash| after.get(hash))
        .map(<[u8]>::to_vec)
        .collect();

    StepCheckpoint {
        root: trie.root(),
        step,
        preimages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_checkpoints_are_disjoint() {
        let run = SystemRun::execute(b"block", Hash::from_bytes(b"output"));
        assert_eq!(run.steps.len(), 3);

        let mut seen = run.golden.preimages.clone();
        for step in &run.steps {
            assert!(!step.preimages.is_empty());
            assert_eq!(step.preimages.difference(&seen).count(), step.preimages.len());
            seen.merge(&step.preimages);
        }
    }

    #[test]
    fn test_final_state_readable_from_merged_preimages() {
        let output = Hash::from_bytes(b"output");
        let run = SystemRun::execute(b"block", output);
        let trie = StateTrie::at(run.final_checkpoint.root, run.merged_preimages());

        assert_eq!(trie.get(&MAGIC_KEY).unwrap(), Some(HALT_MAGIC.to_vec()));
        assert_eq!(
            trie.get(&OUTPUT_HASH_KEY).unwrap(),
            Some(output.to_bytes().to_vec())
        );
        assert_eq!(run.final_checkpoint.step, 4_096);
    }
}

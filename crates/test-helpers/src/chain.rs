//! Deterministic demo chain.

use faultproof_trie::{PreimageStore, StateTrie};
use faultproof_types::{Block, Hash, Txn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

const NUM_ACCOUNTS: usize = 6;
const INITIAL_BALANCE: u64 = 1_000;
const TXNS_PER_BLOCK: usize = 3;

/// A chain of balance transfers.
///
/// Balances live in a state trie keyed by account hash, values are
/// little-endian `u64`. Every block is published with the honest post-state
/// root except the fraudulent one, which carries a made-up root.
#[derive(Debug, Clone)]
pub struct DemoChain {
    accounts: Vec<Hash>,
    published: Vec<Block>,
    honest_roots: Vec<Hash>,
}

impl DemoChain {
    /// Generate blocks `0..=num_blocks`, publishing block `fraudulent` (if
    /// any) with a wrong state root.
    pub fn generate(seed: u64, num_blocks: u64, fraudulent: Option<u64>) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let accounts: Vec<Hash> = (0..NUM_ACCOUNTS)
            .map(|i| Hash::from_bytes(format!("account {}", i).as_bytes()))
            .collect();

        let mut balances = BTreeMap::new();
        let mut state = StateTrie::new(PreimageStore::new());
        for account in &accounts {
            balances.insert(*account, INITIAL_BALANCE);
            state
                .put(account.as_bytes(), INITIAL_BALANCE.to_le_bytes().to_vec())
                .expect("in-memory trie write");
        }

        let genesis = Block {
            number: 0,
            parent: Hash::ZERO,
            state_root: state.root(),
            txns: Vec::new(),
        };
        let mut published = vec![genesis];
        let mut honest_roots = vec![state.root()];

        for number in 1..=num_blocks {
            let txns: Vec<Txn> = (0..TXNS_PER_BLOCK)
                .map(|_| {
                    let from = rng.gen_range(0..NUM_ACCOUNTS);
                    let to = (from + rng.gen_range(1..NUM_ACCOUNTS)) % NUM_ACCOUNTS;
                    Txn::new(accounts[from], accounts[to], rng.gen_range(1..400))
                })
                .collect();

            for txn in &txns {
                let from_balance = balances[&txn.from];
                if from_balance < txn.value {
                    continue;
                }
                let to_balance = balances[&txn.to] + txn.value;
                balances.insert(txn.from, from_balance - txn.value);
                balances.insert(txn.to, to_balance);
                for account in [txn.from, txn.to] {
                    state
                        .put(account.as_bytes(), balances[&account].to_le_bytes().to_vec())
                        .expect("in-memory trie write");
                }
            }

            let honest = state.root();
            let state_root = if fraudulent == Some(number) {
                Hash::from_parts(&[b"fraudulent state root".as_slice(), &number.to_be_bytes()])
            } else {
                honest
            };
            let parent = published.last().map(Block::hash).unwrap_or(Hash::ZERO);
            published.push(Block {
                number,
                parent,
                state_root,
                txns,
            });
            honest_roots.push(honest);
        }

        Self {
            accounts,
            published,
            honest_roots,
        }
    }

    /// Published blocks, genesis first.
    pub fn blocks(&self) -> &[Block] {
        &self.published
    }

    /// Published block `number`.
    pub fn block(&self, number: u64) -> &Block {
        &self.published[number as usize]
    }

    /// Correct post-state root of block `number`.
    pub fn honest_root(&self, number: u64) -> Hash {
        self.honest_roots[number as usize]
    }

    /// Account hashes.
    pub fn accounts(&self) -> &[Hash] {
        &self.accounts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_is_deterministic_and_linked() {
        let chain = DemoChain::generate(7, 4, Some(3));
        assert_eq!(chain.blocks().len(), 5);
        for pair in chain.blocks().windows(2) {
            assert_eq!(pair[1].parent, pair[0].hash());
        }

        let again = DemoChain::generate(7, 4, Some(3));
        assert_eq!(again.blocks(), chain.blocks());
    }

    #[test]
    fn test_only_fraudulent_block_differs() {
        let chain = DemoChain::generate(7, 4, Some(3));
        for number in 0..=4 {
            let honest = chain.block(number).state_root == chain.honest_root(number);
            assert_eq!(honest, number != 3);
        }
    }
}

use crate::block::Block;
use crate::error::{LedgerError, Result};
use crate::transaction::{OutPoint, Transaction};
use crate::utxo::{scan_address, spent_outpoints, Utxo};
use crate::Hash;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, warn};

/// Append-only sequence of blocks. Never empty: index 0 is genesis.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "RawBlockchain")]
pub struct Blockchain {
    blocks: Vec<Block>,
}

#[derive(Deserialize)]
struct RawBlockchain {
    blocks: Vec<Block>,
}

impl TryFrom<RawBlockchain> for Blockchain {
    type Error = LedgerError;

    fn try_from(raw: RawBlockchain) -> Result<Self> {
        if raw.blocks.is_empty() {
            return Err(LedgerError::EmptyChain);
        }
        Ok(Self { blocks: raw.blocks })
    }
}

impl Blockchain {
    /// A chain holding only genesis, whose hash is taken as given.
    pub fn new(genesis_hash: Hash) -> Self {
        Self {
            blocks: vec![Block::genesis(genesis_hash)],
        }
    }

    pub fn tip(&self) -> &Block {
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn height(&self) -> u64 {
        self.tip().height
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, height: u64) -> Option<&Block> {
        self.blocks.iter().find(|block| block.height == height)
    }

    /// Every committed transaction in commit order.
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.blocks.iter().flat_map(|block| block.data.iter())
    }

    pub fn contains_transaction(&self, hash: &Hash) -> bool {
        self.transactions().any(|tx| tx.hash() == *hash)
    }

    /// Sum of every coinbase output in the chain, saturating at `u64::MAX`.
    pub fn minted_supply(&self) -> u64 {
        self.transactions()
            .filter(|tx| tx.is_coinbase())
            .flat_map(|tx| tx.outputs().iter())
            .fold(0u64, |acc, output| acc.saturating_add(output.value))
    }

    /// Check that `txs` could be committed on top of the current tip.
    pub fn validate_candidates(&self, txs: &[Transaction]) -> Result<()> {
        match self.find_invalid_candidate(txs) {
            Some((_, err)) => Err(err),
            None => Ok(()),
        }
    }

    /// Position of the first transaction in `txs` that cannot be committed,
    /// with the reason. Candidates are checked in order, each against the
    /// chain plus the candidates before it:
    ///
    /// * its hash must be new,
    /// * a coinbase must not push the minted supply past `u64::MAX`,
    /// * every input must reference an existing output that is not yet spent.
    pub fn find_invalid_candidate(&self, txs: &[Transaction]) -> Option<(usize, LedgerError)> {
        let candidates: HashSet<Hash> = txs.iter().map(Transaction::hash).collect();
        let committed: HashSet<Hash> = self
            .blocks
            .par_iter()
            .flat_map_iter(|block| block.data.iter().map(Transaction::hash))
            .filter(|hash| candidates.contains(hash))
            .collect();

        let mut seen = HashSet::with_capacity(txs.len());
        let mut supply = self.minted_supply();
        let mut created = created_outpoints(self.transactions());
        let mut consumed = spent_outpoints(self.transactions());

        for (position, tx) in txs.iter().enumerate() {
            let hash = tx.hash();
            if committed.contains(&hash) || !seen.insert(hash) {
                return Some((position, LedgerError::DuplicateTransaction(hash)));
            }

            if tx.is_coinbase() {
                let minted = tx
                    .outputs()
                    .iter()
                    .try_fold(supply, |acc, output| acc.checked_add(output.value));
                match minted {
                    Some(total) => supply = total,
                    None => return Some((position, LedgerError::SupplyOverflow)),
                }
            } else {
                for input in tx.inputs() {
                    let outpoint = input.referenced_output;
                    if !created.contains(&outpoint) {
                        return Some((
                            position,
                            LedgerError::UnknownOutput {
                                txid: outpoint.txid,
                                index: outpoint.index,
                            },
                        ));
                    }
                    if !consumed.insert(outpoint) {
                        return Some((
                            position,
                            LedgerError::DoubleSpend {
                                txid: outpoint.txid,
                                index: outpoint.index,
                            },
                        ));
                    }
                }
            }
            created.extend((0..tx.outputs().len() as u32).map(|index| OutPoint::new(hash, index)));
        }
        None
    }

    /// Assemble a candidate block over the tip. The chain is not modified.
    pub fn mine_block(&self, txs: Vec<Transaction>) -> Result<Block> {
        self.validate_candidates(&txs)?;
        let block = Block::new(txs, self.tip());
        info!(
            height = block.height,
            hash = %hex::encode(block.hash),
            txs = block.data.len(),
            "mined block"
        );
        Ok(block)
    }

    /// Append `candidate` if it sits directly on the tip: height one above
    /// it and `prev_hash` equal to its hash. On error the chain is left
    /// untouched. Transactions are not re-checked here.
    pub fn add_block(&mut self, candidate: Block) -> Result<()> {
        let tip = self.tip();
        if candidate.height <= tip.height {
            warn!(
                candidate = candidate.height,
                tip = tip.height,
                "rejected block with stale height"
            );
            return Err(LedgerError::StaleHeight {
                candidate: candidate.height,
                tip: tip.height,
            });
        }
        if candidate.height != tip.height + 1 {
            warn!(
                candidate = candidate.height,
                tip = tip.height,
                "rejected block that skips heights"
            );
            return Err(LedgerError::BrokenHeight {
                position: self.blocks.len(),
                height: candidate.height,
            });
        }
        if candidate.prev_hash != tip.hash {
            warn!(height = candidate.height, "rejected block not linked to tip");
            return Err(LedgerError::BrokenLink {
                height: candidate.height,
            });
        }
        info!(
            height = candidate.height,
            hash = %hex::encode(candidate.hash),
            "appended block"
        );
        self.blocks.push(candidate);
        Ok(())
    }

    pub fn find_spendable_outputs(&self, address: &str) -> Vec<Utxo> {
        scan_address(self.transactions(), address).unspent
    }

    /// `(total, values)` of everything `address` can spend.
    pub fn find_spendable_utxo(&self, address: &str) -> (u64, Vec<u64>) {
        let scan = scan_address(self.transactions(), address);
        (scan.total(), scan.values())
    }

    pub fn balance(&self, address: &str) -> u64 {
        scan_address(self.transactions(), address).total()
    }

    /// Full integrity walk: heights, linkage, recomputed hashes (genesis
    /// excepted), transaction uniqueness and a minted supply that fits in
    /// a `u64`.
    pub fn verify(&self) -> Result<()> {
        for (position, pair) in self.blocks.windows(2).enumerate() {
            let (parent, block) = (&pair[0], &pair[1]);
            if block.height != parent.height + 1 {
                return Err(LedgerError::BrokenHeight {
                    position: position + 1,
                    height: block.height,
                });
            }
            if block.prev_hash != parent.hash {
                return Err(LedgerError::BrokenLink {
                    height: block.height,
                });
            }
            if block.compute_hash() != block.hash {
                return Err(LedgerError::HashMismatch {
                    height: block.height,
                });
            }
        }

        let mut seen = HashSet::new();
        let mut supply = 0u64;
        for tx in self.transactions() {
            if !seen.insert(tx.hash()) {
                return Err(LedgerError::DuplicateTransaction(tx.hash()));
            }
            if tx.is_coinbase() {
                supply = tx
                    .outputs()
                    .iter()
                    .try_fold(supply, |acc, output| acc.checked_add(output.value))
                    .ok_or(LedgerError::SupplyOverflow)?;
            }
        }
        Ok(())
    }
}

fn created_outpoints<'a, I>(txs: I) -> HashSet<OutPoint>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    txs.into_iter()
        .flat_map(|tx| {
            let hash = tx.hash();
            (0..tx.outputs().len() as u32).map(move |index| OutPoint::new(hash, index))
        })
        .collect()
}

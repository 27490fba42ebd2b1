//! Unspent-output resolution.
//!
//! Nothing here is cached: every query replays the transactions it is given,
//! in commit order, and rebuilds the view for one address.
use crate::transaction::{OutPoint, Transaction};
use crate::Hash;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub outpoint: OutPoint,
    pub value: u64,
}

/// Result of [`scan_address`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UtxoScan {
    /// Outputs still spendable, in the order they were created.
    pub unspent: Vec<Utxo>,
    /// Output indices consumed by the address, keyed by origin transaction.
    pub spent: HashMap<Hash, Vec<u32>>,
}

impl UtxoScan {
    /// Sum of the unspent values, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.unspent
            .iter()
            .fold(0u64, |acc, utxo| acc.saturating_add(utxo.value))
    }

    pub fn values(&self) -> Vec<u64> {
        self.unspent.iter().map(|utxo| utxo.value).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.unspent.is_empty()
    }
}

/// Replay `txs` in order and collect the outputs locked to `address` that no
/// later input unlocked by `address` has consumed.
///
/// Runs in one forward pass, linear in the number of inputs and outputs.
pub fn scan_address<'a, I>(txs: I, address: &str) -> UtxoScan
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut spent: HashMap<Hash, Vec<u32>> = HashMap::new();
    // Slots keep creation order; a spend clears its slot in O(1).
    let mut slots: Vec<Option<Utxo>> = Vec::new();
    let mut positions: HashMap<OutPoint, usize> = HashMap::new();

    for tx in txs {
        let txid = tx.hash();
        {
            let consumed = spent.get(&txid).map(Vec::as_slice).unwrap_or(&[]);
            for (index, output) in tx.outputs().iter().enumerate() {
                let index = index as u32;
                if consumed.contains(&index) {
                    continue;
                }
                if output.lock_script == address {
                    let outpoint = OutPoint::new(txid, index);
                    positions.insert(outpoint, slots.len());
                    slots.push(Some(Utxo {
                        outpoint,
                        value: output.value,
                    }));
                }
            }
        }

        if tx.is_coinbase() {
            continue;
        }
        for input in tx.inputs() {
            if input.unlock_script != address {
                continue;
            }
            let outpoint = input.referenced_output;
            spent.entry(outpoint.txid).or_default().push(outpoint.index);
            if let Some(position) = positions.remove(&outpoint) {
                slots[position] = None;
            }
        }
    }

    let unspent: Vec<Utxo> = slots.into_iter().flatten().collect();
    debug!(address, unspent = unspent.len(), "scanned address");
    UtxoScan { unspent, spent }
}

/// Every outpoint consumed by any input in `txs`, regardless of owner.
pub fn spent_outpoints<'a, I>(txs: I) -> HashSet<OutPoint>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    txs.into_iter()
        .filter(|tx| !tx.is_coinbase())
        .flat_map(|tx| tx.inputs().iter().map(|input| input.referenced_output))
        .collect()
}

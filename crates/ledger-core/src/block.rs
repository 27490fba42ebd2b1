use crate::transaction::Transaction;
use crate::{now_secs, sha256, Hash};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub timestamp: u64,
    pub hash: Hash,
    pub data: Vec<Transaction>,
    pub prev_hash: Hash,
    pub height: u64,
}

impl Block {
    /// Assemble a block on top of `parent`, stamped with the current time.
    pub fn new(txs: Vec<Transaction>, parent: &Block) -> Self {
        Self::with_timestamp(txs, parent, now_secs())
    }

    pub fn with_timestamp(txs: Vec<Transaction>, parent: &Block, timestamp: u64) -> Self {
        let hash = block_hash(timestamp, &parent.hash, &hash_all_transactions(&txs));
        Self {
            timestamp,
            hash,
            data: txs,
            prev_hash: parent.hash,
            height: parent.height + 1,
        }
    }

    /// Height-0 block carrying a trusted, caller-supplied hash.
    pub fn genesis(hash: Hash) -> Self {
        Self {
            timestamp: now_secs(),
            hash,
            data: Vec::new(),
            prev_hash: [0u8; 32],
            height: 0,
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.height == 0
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.data
    }

    /// Bytes the block hash is computed over:
    /// `timestamp (u64 LE) || prev_hash || hash_all_transactions(data)`.
    pub fn hash_bytes(&self) -> Vec<u8> {
        header_bytes(self.timestamp, &self.prev_hash, &hash_all_transactions(&self.data))
    }

    /// Recompute the hash from the stored fields.
    pub fn compute_hash(&self) -> Hash {
        sha256(&self.hash_bytes())
    }
}

/// SHA-256 over the concatenated transaction hashes, in order.
pub fn hash_all_transactions(txs: &[Transaction]) -> Hash {
    let mut data = Vec::with_capacity(txs.len() * 32);
    for tx in txs {
        data.extend_from_slice(&tx.hash());
    }
    sha256(&data)
}

fn block_hash(timestamp: u64, prev_hash: &Hash, data_hash: &Hash) -> Hash {
    sha256(&header_bytes(timestamp, prev_hash, data_hash))
}

fn header_bytes(timestamp: u64, prev_hash: &Hash, data_hash: &Hash) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8 + 32 + 32);
    bytes.extend_from_slice(&timestamp.to_le_bytes());
    bytes.extend_from_slice(prev_hash);
    bytes.extend_from_slice(data_hash);
    bytes
}

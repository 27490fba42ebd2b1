//! A minimal UTXO ledger: content-addressed transactions, hash-chained blocks,
//! and an on-demand unspent-output scan used for balances and coin selection.
pub mod block;
pub mod chain;
pub mod constants;
pub mod error;
pub mod pool;
pub mod transaction;
pub mod utxo;
pub mod wallet;

use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub use block::{hash_all_transactions, Block};
pub use chain::Blockchain;
pub use error::{LedgerError, Result};
pub use pool::{Ledger, TransactionPool};
pub use transaction::{OutPoint, Transaction, TransactionInput, TransactionOutput};
pub use utxo::{scan_address, Utxo, UtxoScan};
pub use wallet::{Address, Signature, Signer, Wallet};

pub type Hash = [u8; 32];

/// SHA-256 of `bytes` as a fixed-size array.
pub fn sha256(bytes: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}

/// Seconds since the Unix epoch. A clock set before 1970 reads as zero.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

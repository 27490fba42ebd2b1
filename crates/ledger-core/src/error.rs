use crate::Hash;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("transaction {} already exists", hex::encode(.0))]
    DuplicateTransaction(Hash),

    #[error("output {}:{index} is already spent", hex::encode(.txid))]
    DoubleSpend { txid: Hash, index: u32 },

    #[error("output {}:{index} does not exist", hex::encode(.txid))]
    UnknownOutput { txid: Hash, index: u32 },

    #[error("coin supply would exceed u64::MAX")]
    SupplyOverflow,

    #[error("a chain must hold at least its genesis block")]
    EmptyChain,

    #[error("block height {candidate} does not extend tip height {tip}")]
    StaleHeight { candidate: u64, tip: u64 },

    #[error("block {height} does not link to its parent")]
    BrokenLink { height: u64 },

    #[error("block at position {position} has height {height}")]
    BrokenHeight { position: usize, height: u64 },

    #[error("block {height} hash does not match its contents")]
    HashMismatch { height: u64 },
}

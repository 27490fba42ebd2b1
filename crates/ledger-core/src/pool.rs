//! Shared access to a chain from many producers.
//!
//! Lock order is always chain first, then pool. Transfers are built while the
//! pool lock is held, against committed plus pending transactions, so two
//! producers spending for the same sender chain their change instead of
//! claiming the same outputs.
use crate::block::Block;
use crate::chain::Blockchain;
use crate::error::{LedgerError, Result};
use crate::transaction::Transaction;
use crate::utxo::scan_address;
use crate::wallet::Signer;
use crate::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Transactions waiting for the next block, in submission order.
#[derive(Debug, Default)]
pub struct TransactionPool {
    pending: Mutex<Vec<Transaction>>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Transaction>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `tx`. A transaction already pending is refused.
    pub fn submit(&self, tx: Transaction) -> Result<Hash> {
        let hash = tx.hash();
        let mut pending = self.lock();
        if pending.iter().any(|queued| queued.hash() == hash) {
            return Err(LedgerError::DuplicateTransaction(hash));
        }
        pending.push(tx);
        debug!(tx = %hex::encode(hash), pending = pending.len(), "queued transaction");
        Ok(hash)
    }

    /// Queue a coinbase paying `to` in the block after `chain`'s tip.
    ///
    /// The nonce carries that block's height in its high 32 bits and a
    /// per-block counter in the low bits, and is bumped until the hash is
    /// neither pending nor committed.
    pub fn submit_coinbase(&self, chain: &Blockchain, to: &str, amount: u64) -> Hash {
        let mut pending = self.lock();
        let height = chain.height() + 1;
        let queued = pending.iter().filter(|tx| tx.is_coinbase()).count() as u64;
        let mut nonce = (height << 32) | queued;
        let tx = loop {
            let tx = Transaction::new_coinbase_with_nonce(to, amount, nonce);
            let hash = tx.hash();
            if !pending.iter().any(|queued| queued.hash() == hash)
                && !chain.contains_transaction(&hash)
            {
                break tx;
            }
            nonce = nonce.wrapping_add(1);
        };
        let hash = tx.hash();
        pending.push(tx);
        debug!(tx = %hex::encode(hash), nonce, pending = pending.len(), "queued coinbase");
        hash
    }

    /// Build a transfer from `from` against `chain` plus everything already
    /// pending, and queue it. Building and queueing happen under one lock.
    pub fn submit_transfer<S: Signer + ?Sized>(
        &self,
        chain: &Blockchain,
        from: &S,
        to: &str,
        amount: u64,
    ) -> Result<Hash> {
        let mut pending = self.lock();
        let sender = from.address();
        let spendable = scan_address(chain.transactions().chain(pending.iter()), &sender).unspent;
        let tx = Transaction::build_transfer(from, to, amount, spendable)?;
        let hash = tx.hash();
        pending.push(tx);
        debug!(tx = %hex::encode(hash), pending = pending.len(), "queued transfer");
        Ok(hash)
    }

    pub fn pending(&self) -> Vec<Transaction> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Take every pending transaction, leaving the pool empty.
    pub fn drain(&self) -> Vec<Transaction> {
        std::mem::take(&mut *self.lock())
    }

    /// Put `txs` back ahead of anything submitted since they were drained.
    pub fn restore(&self, txs: Vec<Transaction>) {
        let mut pending = self.lock();
        let newer = std::mem::replace(&mut *pending, txs);
        pending.extend(newer);
    }
}

/// A chain and its pending pool, safe to share as `Arc<Ledger>`.
///
/// Readers scan the chain concurrently; [`Ledger::commit_pending`] is the
/// only writer.
#[derive(Debug)]
pub struct Ledger {
    chain: RwLock<Blockchain>,
    pool: TransactionPool,
}

impl Ledger {
    pub fn new(genesis_hash: Hash) -> Self {
        Self::from_chain(Blockchain::new(genesis_hash))
    }

    pub fn from_chain(chain: Blockchain) -> Self {
        Self {
            chain: RwLock::new(chain),
            pool: TransactionPool::new(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Blockchain> {
        self.chain.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Blockchain> {
        self.chain.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn pool(&self) -> &TransactionPool {
        &self.pool
    }

    /// Queue a coinbase for the next block. Any number of rewards to the
    /// same address may be pending at once.
    pub fn reward(&self, to: &str, amount: u64) -> Hash {
        let chain = self.read();
        self.pool.submit_coinbase(&chain, to, amount)
    }

    pub fn transfer<S: Signer + ?Sized>(&self, from: &S, to: &str, amount: u64) -> Result<Hash> {
        let chain = self.read();
        self.pool.submit_transfer(&chain, from, to, amount)
    }

    /// Mine everything pending into one block and append it.
    ///
    /// If a pending transaction cannot be committed, the chain is unchanged,
    /// that transaction is dropped from the pool and the rest are put back,
    /// so a later commit can go through.
    pub fn commit_pending(&self) -> Result<Block> {
        let mut chain = self.write();
        let mut txs = self.pool.drain();
        if let Some((position, err)) = chain.find_invalid_candidate(&txs) {
            let dropped = txs.remove(position);
            warn!(
                %err,
                tx = %hex::encode(dropped.hash()),
                kept = txs.len(),
                "dropped pending transaction"
            );
            self.pool.restore(txs);
            return Err(err);
        }

        let block = Block::new(txs, chain.tip());
        chain.add_block(block.clone())?;
        info!(
            height = block.height,
            txs = block.data.len(),
            "committed pending transactions"
        );
        Ok(block)
    }

    pub fn balance(&self, address: &str) -> u64 {
        self.read().balance(address)
    }

    pub fn find_spendable_utxo(&self, address: &str) -> (u64, Vec<u64>) {
        self.read().find_spendable_utxo(address)
    }

    pub fn height(&self) -> u64 {
        self.read().height()
    }

    /// Copy of the chain as it stands now.
    pub fn snapshot(&self) -> Blockchain {
        self.read().clone()
    }

    pub fn verify(&self) -> Result<()> {
        self.read().verify()
    }
}

#![allow(dead_code)]

use ledger_core::{sha256, Blockchain, Ledger, Signer, Transaction, Wallet};

pub fn genesis_hash() -> [u8; 32] {
    sha256(b"integration-genesis")
}

pub fn new_chain() -> Blockchain {
    Blockchain::new(genesis_hash())
}

/// Deterministic wallet so failures are reproducible.
pub fn wallet(seed: u8) -> Wallet {
    Wallet::from_secret([seed; 32])
}

/// Mine `txs` on top of the tip and append the block.
pub fn commit(chain: &mut Blockchain, txs: Vec<Transaction>) -> anyhow::Result<()> {
    let block = chain.mine_block(txs)?;
    chain.add_block(block)?;
    Ok(())
}

/// A chain whose only spendable output is a coinbase of `amount` to `owner`.
pub fn funded_chain(owner: &Wallet, amount: u64) -> anyhow::Result<Blockchain> {
    let mut chain = new_chain();
    commit(&mut chain, vec![Transaction::new_coinbase(owner.address(), amount)])?;
    Ok(chain)
}

pub fn funded_ledger(owner: &Wallet, amount: u64) -> anyhow::Result<Ledger> {
    let ledger = Ledger::new(genesis_hash());
    ledger.reward(&owner.address(), amount);
    ledger.commit_pending()?;
    Ok(ledger)
}

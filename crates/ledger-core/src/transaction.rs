use crate::chain::Blockchain;
use crate::error::{LedgerError, Result};
use crate::utxo::Utxo;
use crate::wallet::{Address, Signature, Signer};
use crate::{sha256, Hash};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Reference to one output of an earlier transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: Hash,
    pub index: u32,
}

impl OutPoint {
    pub fn new(txid: Hash, index: u32) -> Self {
        Self { txid, index }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", hex::encode(self.txid), self.index)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub referenced_output: OutPoint,
    pub value: u64,
    pub signature: Signature,
    pub unlock_script: Address,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub value: u64,
    pub lock_script: Address,
}

/// An immutable transfer of value, identified by the SHA-256 of its
/// canonical encoding. Signatures are excluded from that encoding so the
/// hash can be signed after it is known.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    hash: Hash,
    inputs: Vec<TransactionInput>,
    outputs: Vec<TransactionOutput>,
    is_coinbase: bool,
    nonce: u64,
}

impl Transaction {
    /// Reward `amount` to `to` out of nothing.
    pub fn new_coinbase(to: impl Into<Address>, amount: u64) -> Self {
        Self::new_coinbase_with_nonce(to, amount, 0)
    }

    /// Coinbase with an explicit nonce, so the same recipient and amount can
    /// be rewarded more than once without a hash collision.
    pub fn new_coinbase_with_nonce(to: impl Into<Address>, amount: u64, nonce: u64) -> Self {
        let outputs = vec![TransactionOutput {
            value: amount,
            lock_script: to.into(),
        }];
        let hash = sha256(&encode_body(true, nonce, &[], &outputs));
        Self {
            hash,
            inputs: Vec::new(),
            outputs,
            is_coinbase: true,
            nonce,
        }
    }

    /// Send `amount` from `from` to `to`, spending every output the chain
    /// currently holds for the sender.
    pub fn new_transfer<S: Signer + ?Sized>(
        from: &S,
        to: &str,
        amount: u64,
        chain: &Blockchain,
    ) -> Result<Self> {
        let spendable = chain.find_spendable_outputs(&from.address());
        Self::build_transfer(from, to, amount, spendable)
    }

    /// Build a transfer over an explicit spendable set. One input per
    /// output in `spendable`; outputs are the payment and, when non-zero,
    /// the change back to the sender.
    pub fn build_transfer<S: Signer + ?Sized>(
        from: &S,
        to: &str,
        amount: u64,
        spendable: Vec<Utxo>,
    ) -> Result<Self> {
        let available = spendable
            .iter()
            .try_fold(0u64, |acc, utxo| acc.checked_add(utxo.value))
            .ok_or(LedgerError::SupplyOverflow)?;
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available,
            });
        }

        let sender = from.address();
        let mut inputs: Vec<TransactionInput> = spendable
            .into_iter()
            .map(|utxo| TransactionInput {
                referenced_output: utxo.outpoint,
                value: utxo.value,
                signature: Signature::new(),
                unlock_script: sender.clone(),
            })
            .collect();

        let mut outputs = vec![TransactionOutput {
            value: amount,
            lock_script: to.to_owned(),
        }];
        let change = available - amount;
        if change > 0 {
            outputs.push(TransactionOutput {
                value: change,
                lock_script: sender.clone(),
            });
        }

        let hash = sha256(&encode_body(false, 0, &inputs, &outputs));
        let signature = from.sign(&hash);
        for input in &mut inputs {
            input.signature = signature.clone();
        }

        debug!(
            tx = %hex::encode(hash),
            from = %sender,
            to,
            amount,
            change,
            inputs = inputs.len(),
            "built transfer"
        );

        Ok(Self {
            hash,
            inputs,
            outputs,
            is_coinbase: false,
            nonce: 0,
        })
    }

    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn inputs(&self) -> &[TransactionInput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TransactionOutput] {
        &self.outputs
    }

    pub fn is_coinbase(&self) -> bool {
        self.is_coinbase
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Saturates at `u64::MAX`, as does [`Transaction::total_output`].
    pub fn total_input(&self) -> u64 {
        self.inputs
            .iter()
            .fold(0u64, |acc, input| acc.saturating_add(input.value))
    }

    pub fn total_output(&self) -> u64 {
        self.outputs
            .iter()
            .fold(0u64, |acc, output| acc.saturating_add(output.value))
    }

    /// Value consumed but not re-created. Always zero for coinbase.
    pub fn fee(&self) -> u64 {
        if self.is_coinbase {
            return 0;
        }
        self.total_input().saturating_sub(self.total_output())
    }

    /// Canonical bytes the hash is computed over.
    pub fn encode(&self) -> Vec<u8> {
        encode_body(self.is_coinbase, self.nonce, &self.inputs, &self.outputs)
    }

    pub fn compute_hash(&self) -> Hash {
        sha256(&self.encode())
    }

    /// False when the stored hash no longer matches the contents, e.g. after
    /// deserializing tampered data.
    pub fn has_valid_hash(&self) -> bool {
        self.compute_hash() == self.hash
    }
}

fn encode_body(
    is_coinbase: bool,
    nonce: u64,
    inputs: &[TransactionInput],
    outputs: &[TransactionOutput],
) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(1 + 8 + 4 + inputs.len() * 96 + 4 + outputs.len() * 56);
    bytes.push(u8::from(is_coinbase));
    bytes.extend_from_slice(&nonce.to_le_bytes());

    bytes.extend_from_slice(&(inputs.len() as u32).to_le_bytes());
    for input in inputs {
        bytes.extend_from_slice(&input.referenced_output.txid);
        bytes.extend_from_slice(&input.referenced_output.index.to_le_bytes());
        bytes.extend_from_slice(&input.value.to_le_bytes());
        put_str(&mut bytes, &input.unlock_script);
    }

    bytes.extend_from_slice(&(outputs.len() as u32).to_le_bytes());
    for output in outputs {
        bytes.extend_from_slice(&output.value.to_le_bytes());
        put_str(&mut bytes, &output.lock_script);
    }
    bytes
}

// length-prefixed
fn put_str(bytes: &mut Vec<u8>, s: &str) {
    bytes.extend_from_slice(&(s.len() as u32).to_le_bytes());
    bytes.extend_from_slice(s.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::Wallet;

    fn utxo(seed: u8, index: u32, value: u64) -> Utxo {
        Utxo {
            outpoint: OutPoint::new([seed; 32], index),
            value,
        }
    }

    #[test]
    fn coinbase_has_single_output_and_no_inputs() {
        let tx = Transaction::new_coinbase("alice", 20);
        assert!(tx.is_coinbase());
        assert!(tx.inputs().is_empty());
        assert_eq!(tx.outputs().len(), 1);
        assert_eq!(tx.outputs()[0].value, 20);
        assert_eq!(tx.outputs()[0].lock_script, "alice");
        assert_eq!(tx.fee(), 0);
        assert!(tx.has_valid_hash());
    }

    #[test]
    fn coinbase_hash_is_content_derived() {
        let a = Transaction::new_coinbase("alice", 20);
        let b = Transaction::new_coinbase("alice", 20);
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), Transaction::new_coinbase("alice", 21).hash());
        assert_ne!(a.hash(), Transaction::new_coinbase("bob", 20).hash());
        assert_ne!(
            a.hash(),
            Transaction::new_coinbase_with_nonce("alice", 20, 1).hash()
        );
        assert_ne!(a.hash(), [0u8; 32]);
    }

    #[test]
    fn transfer_spends_everything_and_returns_change() {
        let alice = Wallet::from_secret([1u8; 32]);
        let spendable = vec![utxo(9, 0, 15), utxo(8, 1, 5)];
        let tx = Transaction::build_transfer(&alice, "bob", 12, spendable).unwrap();

        assert!(!tx.is_coinbase());
        assert_eq!(tx.inputs().len(), 2);
        assert!(tx
            .inputs()
            .iter()
            .all(|input| input.unlock_script == alice.address()));
        assert_eq!(tx.inputs()[0].referenced_output, OutPoint::new([9; 32], 0));
        assert_eq!(tx.inputs()[1].referenced_output, OutPoint::new([8; 32], 1));

        assert_eq!(tx.outputs().len(), 2);
        assert_eq!(tx.outputs()[0].value, 12);
        assert_eq!(tx.outputs()[0].lock_script, "bob");
        assert_eq!(tx.outputs()[1].value, 8);
        assert_eq!(tx.outputs()[1].lock_script, alice.address());

        assert_eq!(tx.total_input(), 20);
        assert_eq!(tx.total_output(), 20);
        assert_eq!(tx.fee(), 0);
    }

    #[test]
    fn exact_amount_omits_zero_change() {
        let alice = Wallet::from_secret([1u8; 32]);
        let tx = Transaction::build_transfer(&alice, "bob", 20, vec![utxo(9, 0, 20)]).unwrap();
        assert_eq!(tx.outputs().len(), 1);
        assert_eq!(tx.outputs()[0].value, 20);
    }

    #[test]
    fn insufficient_funds_builds_nothing() {
        let alice = Wallet::from_secret([1u8; 32]);
        let err = Transaction::build_transfer(&alice, "bob", 21, vec![utxo(9, 0, 20)]).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                required: 21,
                available: 20
            }
        );
    }

    #[test]
    fn overflowing_spendable_set_is_rejected() {
        let alice = Wallet::from_secret([1u8; 32]);
        let spendable = vec![utxo(9, 0, u64::MAX), utxo(8, 0, 1)];
        let err = Transaction::build_transfer(&alice, "bob", 1, spendable).unwrap_err();
        assert_eq!(err, LedgerError::SupplyOverflow);
    }

    #[test]
    fn totals_saturate() {
        let tx = Transaction::new_coinbase("alice", u64::MAX);
        assert_eq!(tx.total_output(), u64::MAX);
        assert_eq!(tx.total_input(), 0);
        assert_eq!(tx.fee(), 0);
    }

    #[test]
    fn transfer_hash_is_real_and_signed() {
        let alice = Wallet::from_secret([1u8; 32]);
        let tx = Transaction::build_transfer(&alice, "bob", 5, vec![utxo(9, 0, 20)]).unwrap();
        assert_ne!(tx.hash(), [0u8; 32]);
        assert!(tx.has_valid_hash());
        let expected = alice.sign(&tx.hash());
        assert!(tx.inputs().iter().all(|input| input.signature == expected));
    }

    #[test]
    fn signatures_do_not_affect_hash() {
        let alice = Wallet::from_secret([1u8; 32]);
        let mut tx = Transaction::build_transfer(&alice, "bob", 5, vec![utxo(9, 0, 20)]).unwrap();
        tx.inputs[0].signature = vec![0xff];
        assert!(tx.has_valid_hash());
    }

    #[test]
    fn tampered_output_breaks_hash() {
        let mut tx = Transaction::new_coinbase("alice", 20);
        tx.outputs[0].value = 2_000;
        assert!(!tx.has_valid_hash());
    }

    #[test]
    fn encoding_layout_for_coinbase() {
        let tx = Transaction::new_coinbase_with_nonce("ab", 7, 3);
        let bytes = tx.encode();
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[1..9], &3u64.to_le_bytes());
        assert_eq!(&bytes[9..13], &0u32.to_le_bytes());
        assert_eq!(&bytes[13..17], &1u32.to_le_bytes());
        assert_eq!(&bytes[17..25], &7u64.to_le_bytes());
        assert_eq!(&bytes[25..29], &2u32.to_le_bytes());
        assert_eq!(&bytes[29..], b"ab");
    }

    #[test]
    fn outpoint_display() {
        let outpoint = OutPoint::new([0u8; 32], 2);
        assert_eq!(outpoint.to_string(), format!("{}:2", "00".repeat(32)));
    }
}

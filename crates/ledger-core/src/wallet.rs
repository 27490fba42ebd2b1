//! Addressing and signing as seen by the ledger.
//!
//! The ledger only ever asks a key holder for its address and for a signature
//! over a transaction hash. [`Wallet`] is a small stand-in implementation used
//! by the CLI and tests; signatures are keyed digests and nothing verifies them.
use crate::constants::ADDRESS_SIZE;
use crate::{sha256, Hash};
use rand::Rng;
use std::fmt;

pub type Address = String;
pub type Signature = Vec<u8>;

/// Capability to identify and sign for a set of outputs.
pub trait Signer {
    /// Stable address that outputs are locked to.
    fn address(&self) -> Address;
    fn sign(&self, message: &[u8]) -> Signature;
}

#[derive(Clone)]
pub struct Wallet {
    secret: [u8; 32],
    public_key: Hash,
}

impl Wallet {
    /// Generate a wallet from a random secret.
    pub fn new() -> Self {
        Self::from_secret(rand::thread_rng().gen())
    }

    pub fn from_secret(secret: [u8; 32]) -> Self {
        Self {
            secret,
            public_key: sha256(&secret),
        }
    }

    pub fn public_key(&self) -> &Hash {
        &self.public_key
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

impl Signer for Wallet {
    fn address(&self) -> Address {
        hex::encode(&sha256(&self.public_key)[..ADDRESS_SIZE])
    }

    fn sign(&self, message: &[u8]) -> Signature {
        let mut bytes = Vec::with_capacity(self.secret.len() + message.len());
        bytes.extend_from_slice(&self.secret);
        bytes.extend_from_slice(message);
        sha256(&bytes).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_is_deterministic_per_secret() {
        let a = Wallet::from_secret([7u8; 32]);
        let b = Wallet::from_secret([7u8; 32]);
        assert_eq!(a.address(), b.address());
        assert_eq!(a.address().len(), ADDRESS_SIZE * 2);
    }

    #[test]
    fn random_wallets_have_distinct_addresses() {
        let a = Wallet::new();
        let b = Wallet::new();
        assert_ne!(a.address(), b.address());
    }

    #[test]
    fn signature_depends_on_key_and_message() {
        let a = Wallet::from_secret([1u8; 32]);
        let b = Wallet::from_secret([2u8; 32]);
        assert_eq!(a.sign(b"msg"), a.sign(b"msg"));
        assert_ne!(a.sign(b"msg"), a.sign(b"other"));
        assert_ne!(a.sign(b"msg"), b.sign(b"msg"));
        assert_eq!(a.sign(b"msg").len(), 32);
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let wallet = Wallet::from_secret([0xee; 32]);
        let rendered = format!("{wallet:?}");
        assert!(rendered.contains(&wallet.address()));
        assert!(!rendered.contains("238, 238"));
    }
}

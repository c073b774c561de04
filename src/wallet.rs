//! Programmable accounts that attest to signatures on their own behalf.

use crate::crypto::recover_signer;
use crate::types::Address;
use std::fmt;

/// Capability of an account with code to judge whether `signature` over
/// `digest` is valid for itself.
pub trait SignatureValidator: fmt::Debug {
    /// Returns true when the pair is valid for this account.
    fn is_valid_signature(&self, digest: &[u8; 32], signature: &[u8]) -> bool;
}

/// Contract wallet that accepts signatures produced by a single owner key.
#[derive(Debug, Clone)]
pub struct SmartWallet {
    signer: Address,
}

impl SmartWallet {
    /// Wallet controlled by `signer`.
    pub fn new(signer: Address) -> Self {
        Self { signer }
    }

    /// Key that may sign for the wallet.
    pub fn signer(&self) -> Address {
        self.signer
    }
}

impl SignatureValidator for SmartWallet {
    fn is_valid_signature(&self, digest: &[u8; 32], signature: &[u8]) -> bool {
        recover_signer(digest, signature) == Some(self.signer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{keccak256, KeyPair};

    #[test]
    fn test_wallet_accepts_only_its_signer() {
        let owner = KeyPair::from_seed("wallet-owner");
        let stranger = KeyPair::from_seed("stranger");
        let wallet = SmartWallet::new(owner.address());
        let digest = keccak256(b"message");
        assert!(wallet.is_valid_signature(&digest, &owner.sign_digest(&digest).unwrap()));
        assert!(!wallet.is_valid_signature(&digest, &stranger.sign_digest(&digest).unwrap()));
    }
}

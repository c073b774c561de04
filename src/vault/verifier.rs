//! Owner signature checks, polymorphic over key-pair and programmable owners.

use crate::crypto::recover_signer;
use crate::ledger::Ledger;
use crate::types::Address;
use crate::wallet::SignatureValidator;

/// Decides whether `signature` over `digest` was produced by `signer`.
pub trait SignatureVerifier {
    /// Returns true when the signature is valid for `signer`.
    fn verify(&self, signer: &Address, digest: &[u8; 32], signature: &[u8]) -> bool;
}

/// Direct secp256k1 recovery for key-pair owners.
#[derive(Debug, Default, Clone, Copy)]
pub struct EcdsaVerifier;

impl SignatureVerifier for EcdsaVerifier {
    fn verify(&self, signer: &Address, digest: &[u8; 32], signature: &[u8]) -> bool {
        recover_signer(digest, signature).as_ref() == Some(signer)
    }
}

/// Asks a programmable owner to attest for itself.
///
/// An owner with code but without the validation capability accepts nothing.
#[derive(Debug)]
pub struct DelegatedVerifier<'a> {
    validator: Option<&'a dyn SignatureValidator>,
}

impl<'a> DelegatedVerifier<'a> {
    /// Wraps the owner's capability, if any.
    pub fn new(validator: Option<&'a dyn SignatureValidator>) -> Self {
        Self { validator }
    }
}

impl SignatureVerifier for DelegatedVerifier<'_> {
    fn verify(&self, _signer: &Address, digest: &[u8; 32], signature: &[u8]) -> bool {
        self.validator
            .map(|validator| validator.is_valid_signature(digest, signature))
            .unwrap_or(false)
    }
}

/// Picks the verifier for `owner` by whether it has code on the ledger.
pub fn verifier_for<'a>(ledger: &'a Ledger, owner: &Address) -> Box<dyn SignatureVerifier + 'a> {
    if ledger.has_code(owner) {
        Box::new(DelegatedVerifier::new(ledger.signature_validator(owner)))
    } else {
        Box::new(EcdsaVerifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{keccak256, KeyPair};

    #[test]
    fn test_selects_by_code_presence() {
        let mut ledger = Ledger::new(1, 0);
        let key = KeyPair::from_seed("owner");
        let wallet = ledger.deploy_wallet(key.address(), key.address());
        let digest = keccak256(b"permission");
        let sig = key.sign_digest(&digest).unwrap();

        assert!(verifier_for(&ledger, &key.address()).verify(&key.address(), &digest, &sig));
        // The wallet is not the recovered signer, but it vouches for its key.
        assert!(verifier_for(&ledger, &wallet).verify(&wallet, &digest, &sig));
        assert!(!EcdsaVerifier.verify(&wallet, &digest, &sig));
    }

    #[test]
    fn test_contract_without_capability_rejects() {
        let mut ledger = Ledger::new(1, 0);
        let key = KeyPair::from_seed("owner");
        let plain_contract = ledger.deploy_contract(key.address(), "vault");
        let digest = keccak256(b"permission");
        let sig = key.sign_digest(&digest).unwrap();
        assert!(!verifier_for(&ledger, &plain_contract).verify(&plain_contract, &digest, &sig));
    }
}

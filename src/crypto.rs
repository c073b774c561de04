//! secp256k1 key pairs, recoverable signatures and keccak/ABI helpers.

use crate::error::Error;
use crate::types::{Address, TokenAmount};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use sha2::Sha512;
use sha3::{Digest, Keccak256};
use std::fmt;

/// Length of an `r ‖ s ‖ v` signature.
pub const SIGNATURE_LENGTH: usize = 65;

/// Keccak-256 of `bytes`.
pub fn keccak256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Left-pads an address into a 32-byte ABI word.
pub fn word_address(address: &Address) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[12..].copy_from_slice(address.as_bytes());
    out
}

/// Big-endian 32-byte ABI word for an unsigned integer.
pub fn word_u128(value: u128) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[16..].copy_from_slice(&value.to_be_bytes());
    out
}

/// ABI word for a token amount.
pub fn word_amount(amount: TokenAmount) -> [u8; 32] {
    word_u128(amount.0)
}

/// Hashes the concatenation of 32-byte words.
pub fn hash_words(words: &[[u8; 32]]) -> [u8; 32] {
    let mut buf = Vec::with_capacity(words.len() * 32);
    for word in words {
        buf.extend_from_slice(word);
    }
    keccak256(&buf)
}

/// `keccak256(0x19 ‖ 0x01 ‖ domainSeparator ‖ structHash)`.
pub fn typed_data_digest(domain_separator: &[u8; 32], struct_hash: &[u8; 32]) -> [u8; 32] {
    let mut buf = Vec::with_capacity(66);
    buf.extend_from_slice(&[0x19, 0x01]);
    buf.extend_from_slice(domain_separator);
    buf.extend_from_slice(struct_hash);
    keccak256(&buf)
}

/// Derives the account address controlled by `key`.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let digest = keccak256(&point.as_bytes()[1..]);
    Address::from_word(&digest)
}

/// Recovers the signer of `digest` from a 65-byte `r ‖ s ‖ v` signature.
///
/// Returns `None` for malformed input, `v` outside `{27, 28}`, high-`s`
/// signatures, or failed recovery.
pub fn recover_signer(digest: &[u8; 32], signature: &[u8]) -> Option<Address> {
    if signature.len() != SIGNATURE_LENGTH {
        return None;
    }
    let v = signature[64];
    if v != 27 && v != 28 {
        return None;
    }
    let sig = Signature::from_slice(&signature[..64]).ok()?;
    if sig.normalize_s().is_some() {
        return None;
    }
    let recid = RecoveryId::from_byte(v - 27)?;
    let key = VerifyingKey::recover_from_prehash(digest, &sig, recid).ok()?;
    Some(address_of(&key))
}

/// secp256k1 signing identity.
#[derive(Clone)]
pub struct KeyPair {
    signing: SigningKey,
    address: Address,
}

impl KeyPair {
    /// Generates a fresh random key pair.
    pub fn random() -> Self {
        Self::from_signing_key(SigningKey::random(&mut rand::thread_rng()))
    }

    /// Deterministically derives a key pair from a seed string.
    pub fn from_seed(seed: &str) -> Self {
        let mut hasher = Sha512::new();
        hasher.update(seed.as_bytes());
        let mut digest = hasher.finalize();
        loop {
            if let Ok(signing) = SigningKey::from_slice(&digest[..32]) {
                return Self::from_signing_key(signing);
            }
            // Out-of-range scalar; rehash.
            let mut hasher = Sha512::new();
            hasher.update(digest);
            digest = hasher.finalize();
        }
    }

    fn from_signing_key(signing: SigningKey) -> Self {
        let address = address_of(signing.verifying_key());
        Self { signing, address }
    }

    /// Account address of this key.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Signs a prehashed digest, returning `r ‖ s ‖ v` with `v ∈ {27, 28}`.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<Vec<u8>, Error> {
        let (sig, recid) = self
            .signing
            .sign_prehash_recoverable(digest)
            .map_err(|_| Error::InvalidSignature)?;
        let mut out = Vec::with_capacity(SIGNATURE_LENGTH);
        out.extend_from_slice(&sig.to_bytes());
        out.push(27 + recid.to_byte());
        Ok(out)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_recover() {
        let key = KeyPair::from_seed("alice");
        let digest = keccak256(b"payload");
        let sig = key.sign_digest(&digest).unwrap();
        assert_eq!(sig.len(), SIGNATURE_LENGTH);
        assert_eq!(recover_signer(&digest, &sig), Some(key.address()));
        let other = keccak256(b"other");
        assert_ne!(recover_signer(&other, &sig), Some(key.address()));
    }

    #[test]
    fn test_seed_is_deterministic() {
        assert_eq!(
            KeyPair::from_seed("seed").address(),
            KeyPair::from_seed("seed").address()
        );
        assert_ne!(
            KeyPair::from_seed("seed").address(),
            KeyPair::random().address()
        );
    }

    #[test]
    fn test_rejects_bad_recovery_byte() {
        let key = KeyPair::from_seed("bob");
        let digest = keccak256(b"x");
        let mut sig = key.sign_digest(&digest).unwrap();
        sig[64] = 2;
        assert_eq!(recover_signer(&digest, &sig), None);
        assert_eq!(recover_signer(&digest, &sig[..64]), None);
    }

    #[test]
    fn test_known_keccak_vector() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }
}

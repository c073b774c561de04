//! Typed-data digests for signed lock and unlock permissions.

use crate::crypto::{
    hash_words, keccak256, typed_data_digest, word_address, word_amount, word_u128, KeyPair,
};
use crate::error::Error;
use crate::types::{Address, TokenAmount};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Domain name bound into every permission.
pub const DOMAIN_NAME: &str = "UniversalVault";
/// Domain version bound into every permission.
pub const DOMAIN_VERSION: &str = "1.0.0";

static DOMAIN_TYPEHASH: Lazy<[u8; 32]> = Lazy::new(|| {
    keccak256(b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)")
});
static LOCK_TYPEHASH: Lazy<[u8; 32]> = Lazy::new(|| {
    keccak256(b"Lock(address delegate,address token,uint256 amount,uint256 nonce)")
});
static UNLOCK_TYPEHASH: Lazy<[u8; 32]> = Lazy::new(|| {
    keccak256(b"Unlock(address delegate,address token,uint256 amount,uint256 nonce)")
});

/// Method a permission authorises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionKind {
    /// Create or increase a lock.
    Lock,
    /// Decrease or remove a lock.
    Unlock,
}

impl PermissionKind {
    fn typehash(self) -> [u8; 32] {
        match self {
            PermissionKind::Lock => *LOCK_TYPEHASH,
            PermissionKind::Unlock => *UNLOCK_TYPEHASH,
        }
    }
}

/// Domain separator binding a permission to one vault on one chain.
pub fn domain_separator(chain_id: u64, vault: &Address) -> [u8; 32] {
    hash_words(&[
        *DOMAIN_TYPEHASH,
        keccak256(DOMAIN_NAME.as_bytes()),
        keccak256(DOMAIN_VERSION.as_bytes()),
        word_u128(u128::from(chain_id)),
        word_address(vault),
    ])
}

/// Message the vault owner signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Authorised method.
    pub kind: PermissionKind,
    /// Delegate that will present the signature.
    pub delegate: Address,
    /// Token to lock or unlock.
    pub token: Address,
    /// Amount to lock or unlock.
    pub amount: TokenAmount,
    /// Vault nonce at the time of use.
    pub nonce: u128,
}

impl Permission {
    /// Struct hash of the message.
    pub fn struct_hash(&self) -> [u8; 32] {
        hash_words(&[
            self.kind.typehash(),
            word_address(&self.delegate),
            word_address(&self.token),
            word_amount(self.amount),
            word_u128(self.nonce),
        ])
    }

    /// Digest to sign for `vault` on `chain_id`.
    pub fn digest(&self, chain_id: u64, vault: &Address) -> [u8; 32] {
        typed_data_digest(&domain_separator(chain_id, vault), &self.struct_hash())
    }

    /// Signs the digest with `key`, producing a 65-byte signature.
    pub fn sign(&self, key: &KeyPair, chain_id: u64, vault: &Address) -> Result<Vec<u8>, Error> {
        key.sign_digest(&self.digest(chain_id, vault))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permission(kind: PermissionKind) -> Permission {
        Permission {
            kind,
            delegate: Address([1u8; 20]),
            token: Address([2u8; 20]),
            amount: TokenAmount(10),
            nonce: 0,
        }
    }

    #[test]
    fn test_digest_binds_every_field() {
        let vault = Address([3u8; 20]);
        let base = permission(PermissionKind::Lock).digest(1, &vault);
        assert_ne!(base, permission(PermissionKind::Unlock).digest(1, &vault));
        assert_ne!(base, permission(PermissionKind::Lock).digest(2, &vault));
        assert_ne!(base, permission(PermissionKind::Lock).digest(1, &Address([4u8; 20])));
        let mut bumped = permission(PermissionKind::Lock);
        bumped.nonce = 1;
        assert_ne!(base, bumped.digest(1, &vault));
        let mut more = permission(PermissionKind::Lock);
        more.amount = TokenAmount(11);
        assert_ne!(base, more.digest(1, &vault));
    }

    #[test]
    fn test_signature_recovers_to_owner() {
        let owner = KeyPair::from_seed("vault-owner");
        let vault = Address([5u8; 20]);
        let message = permission(PermissionKind::Unlock);
        let sig = message.sign(&owner, 1, &vault).unwrap();
        assert_eq!(
            crate::crypto::recover_signer(&message.digest(1, &vault), &sig),
            Some(owner.address())
        );
    }
}

//! Per-owner token custody with signed, per-delegate locks.
//!
//! A vault holds tokens for its owner. Delegates (for example a reward
//! engine) may reserve part of a token balance by presenting a permission
//! signed by the owner over `(method, delegate, token, amount, nonce)`.
//! Each accepted permission bumps the nonce, so no signature is accepted
//! twice. The owner can always drop a lock with [`UniversalVault::rage_quit`].

mod factory;
mod permission;
mod rage_quit;
mod verifier;

pub use factory::VaultFactory;
pub use permission::{domain_separator, Permission, PermissionKind, DOMAIN_NAME, DOMAIN_VERSION};
pub use rage_quit::{
    call_with_budget, CallOutcome, DelegateRef, GasMeter, RageQuit, RageQuitReport,
    RAGE_QUIT_GAS, RAGE_QUIT_RESERVE_GAS,
};
pub use verifier::{verifier_for, DelegatedVerifier, EcdsaVerifier, SignatureVerifier};

use crate::crypto::keccak256;
use crate::error::Error;
use crate::ledger::{Event, Ledger};
use crate::types::{Address, TokenAmount};
use log::{info, warn};
use serde::Serialize;

/// Balance reserved for one delegate in one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LockData {
    /// Delegate holding the lock.
    pub delegate: Address,
    /// Locked token.
    pub token: Address,
    /// Reserved amount.
    pub balance: TokenAmount,
}

/// A vault minted by a [`VaultFactory`].
#[derive(Debug, Clone)]
pub struct UniversalVault {
    address: Address,
    nft: Address,
    owner: Address,
    nonce: u128,
    locks: Vec<LockData>,
}

impl UniversalVault {
    pub(crate) fn new(address: Address, nft: Address, owner: Address) -> Self {
        Self {
            address,
            nft,
            owner,
            nonce: 0,
            locks: Vec::new(),
        }
    }

    pub(crate) fn set_owner(&mut self, owner: Address) {
        self.owner = owner;
    }

    /// Identity of the vault.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Factory that minted the vault (its ownership token contract).
    pub fn nft(&self) -> Address {
        self.nft
    }

    /// Current owner.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Nonce the next permission must carry.
    pub fn nonce(&self) -> u128 {
        self.nonce
    }

    /// Identifier of the (delegate, token) lock.
    pub fn lock_id(delegate: &Address, token: &Address) -> [u8; 32] {
        let mut packed = [0u8; 40];
        packed[..20].copy_from_slice(delegate.as_bytes());
        packed[20..].copy_from_slice(token.as_bytes());
        keccak256(&packed)
    }

    /// Number of live locks.
    pub fn lock_set_count(&self) -> usize {
        self.locks.len()
    }

    /// Lock at `index`, if any.
    pub fn lock_at(&self, index: usize) -> Option<&LockData> {
        self.locks.get(index)
    }

    /// Amount of `token` reserved for `delegate`.
    pub fn balance_delegated(&self, token: &Address, delegate: &Address) -> TokenAmount {
        self.lock_index(delegate, token)
            .map(|index| self.locks[index].balance)
            .unwrap_or_default()
    }

    /// Total amount of `token` reserved across all delegates.
    pub fn balance_locked(&self, token: &Address) -> TokenAmount {
        TokenAmount(
            self.locks
                .iter()
                .filter(|lock| lock.token == *token)
                .map(|lock| lock.balance.0)
                .sum(),
        )
    }

    /// Returns true when every token's locks are covered by the vault's balance.
    pub fn check_balances(&self, ledger: &Ledger) -> bool {
        self.locks.iter().all(|lock| {
            ledger
                .balance_of(&lock.token, &self.address)
                .map(|held| held >= self.balance_locked(&lock.token))
                .unwrap_or(false)
        })
    }

    /// Digest the owner signs to authorise `kind` at `nonce`.
    pub fn permission_hash(
        &self,
        chain_id: u64,
        kind: PermissionKind,
        delegate: Address,
        token: Address,
        amount: TokenAmount,
        nonce: u128,
    ) -> [u8; 32] {
        Permission {
            kind,
            delegate,
            token,
            amount,
            nonce,
        }
        .digest(chain_id, &self.address)
    }

    /// Permission for the current nonce.
    pub fn next_permission(
        &self,
        kind: PermissionKind,
        delegate: Address,
        token: Address,
        amount: TokenAmount,
    ) -> Permission {
        Permission {
            kind,
            delegate,
            token,
            amount,
            nonce: self.nonce,
        }
    }

    fn lock_index(&self, delegate: &Address, token: &Address) -> Option<usize> {
        self.locks
            .iter()
            .position(|lock| lock.delegate == *delegate && lock.token == *token)
    }

    fn only_owner(&self, caller: Address) -> Result<(), Error> {
        if caller != self.owner {
            return Err(Error::NotOwner { caller });
        }
        Ok(())
    }

    fn verify_permission(
        &self,
        ledger: &Ledger,
        kind: PermissionKind,
        delegate: Address,
        token: Address,
        amount: TokenAmount,
        signature: &[u8],
    ) -> Result<(), Error> {
        let digest =
            self.permission_hash(ledger.chain_id(), kind, delegate, token, amount, self.nonce);
        if !verifier_for(ledger, &self.owner).verify(&self.owner, &digest, signature) {
            return Err(Error::InvalidSignature);
        }
        Ok(())
    }

    /// Reserves `amount` of `token` for `caller`, authorised by the owner's
    /// signature over the current nonce.
    pub fn lock(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        token: Address,
        amount: TokenAmount,
        signature: &[u8],
    ) -> Result<(), Error> {
        self.verify_permission(ledger, PermissionKind::Lock, caller, token, amount, signature)?;

        let locked_after = self
            .balance_locked(&token)
            .checked_add(amount)
            .ok_or(Error::Overflow)?;
        if ledger.balance_of(&token, &self.address)? < locked_after {
            return Err(Error::InsufficientBalance);
        }

        self.nonce += 1;
        match self.lock_index(&caller, &token) {
            Some(index) => self.locks[index].balance.0 += amount.0,
            None => self.locks.push(LockData {
                delegate: caller,
                token,
                balance: amount,
            }),
        }
        ledger.emit(
            self.address,
            Event::Locked {
                delegate: caller,
                token,
                amount,
            },
        );
        info!(
            "QSYS|mod=VAULT|evt=LOCK|vault={} delegate={} token={} amount={} nonce={}",
            self.address, caller, token, amount, self.nonce
        );
        Ok(())
    }

    /// Releases up to `amount` of `caller`'s lock on `token`; clamps at the
    /// lock balance and removes the lock when it reaches zero.
    pub fn unlock(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        token: Address,
        amount: TokenAmount,
        signature: &[u8],
    ) -> Result<(), Error> {
        self.verify_permission(ledger, PermissionKind::Unlock, caller, token, amount, signature)?;
        let index = self.lock_index(&caller, &token).ok_or(Error::MissingLock)?;

        self.nonce += 1;
        if self.locks[index].balance <= amount {
            self.locks.swap_remove(index);
        } else {
            self.locks[index].balance.0 -= amount.0;
        }
        ledger.emit(
            self.address,
            Event::Unlocked {
                delegate: caller,
                token,
                amount,
            },
        );
        info!(
            "QSYS|mod=VAULT|evt=UNLOCK|vault={} delegate={} token={} amount={} nonce={}",
            self.address, caller, token, amount, self.nonce
        );
        Ok(())
    }

    /// Owner-only forced removal of `delegate`'s lock on `token`.
    ///
    /// The delegate gets `min(budget - RAGE_QUIT_RESERVE_GAS, RAGE_QUIT_GAS)`
    /// to react. Whatever it does, the lock is removed.
    pub fn rage_quit(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        delegate: DelegateRef<'_>,
        token: Address,
        budget: u64,
    ) -> Result<RageQuitReport, Error> {
        self.only_owner(caller)?;
        let delegate_address = delegate.address();
        let has_code = ledger.has_code(&delegate_address);
        if has_code != matches!(delegate, DelegateRef::Contract(_)) {
            return Err(Error::DelegateMismatch(delegate_address));
        }
        let index = self
            .lock_index(&delegate_address, &token)
            .ok_or(Error::MissingLock)?;
        if budget < RAGE_QUIT_RESERVE_GAS {
            return Err(Error::InsufficientGas {
                supplied: budget,
                required: RAGE_QUIT_RESERVE_GAS,
            });
        }

        let forwarded = (budget - RAGE_QUIT_RESERVE_GAS).min(RAGE_QUIT_GAS);
        let outcome = match delegate {
            DelegateRef::Account(_) => CallOutcome::NoCode,
            DelegateRef::Contract(callee) => call_with_budget(ledger, callee, self.address, forwarded),
        };
        self.locks.swap_remove(index);

        let report = RageQuitReport::from(outcome);
        ledger.emit(
            self.address,
            Event::RageQuit {
                delegate: delegate_address,
                token,
                notified: report.notified,
                reason: report.error.clone(),
            },
        );
        if has_code && !report.notified {
            warn!(
                "QSYS|mod=VAULT|evt=RAGE_QUIT_UNNOTIFIED|vault={} delegate={} outcome={:?}",
                self.address, delegate_address, report.outcome
            );
        }
        info!(
            "QSYS|mod=VAULT|evt=RAGE_QUIT|vault={} delegate={} token={} notified={}",
            self.address, delegate_address, token, report.notified
        );
        Ok(report)
    }

    /// Owner transfer of tokens not reserved by any lock.
    pub fn transfer_erc20(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        token: Address,
        to: Address,
        amount: TokenAmount,
    ) -> Result<(), Error> {
        self.only_owner(caller)?;
        let held = ledger.balance_of(&token, &self.address)?;
        let unlocked = held.saturating_sub(self.balance_locked(&token));
        if amount > unlocked {
            return Err(Error::InsufficientBalance);
        }
        ledger.transfer(token, self.address, to, amount)
    }
}

//! Failure taxonomy shared by the vault, pool, switch and reward engine.
//!
//! Every mutating operation validates before it writes, so an `Err` always
//! means nothing changed.

use crate::types::{Address, TokenAmount};
use thiserror::Error;

/// Coarse grouping of [`Error`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad signature or unauthorised caller.
    Authorization,
    /// Operation attempted in the wrong power state.
    PowerState,
    /// Balance, stake, amount or set-membership constraint violated.
    Capacity,
    /// Not enough execution budget.
    Resource,
    /// Integer overflow or division by zero.
    Arithmetic,
    /// Invalid configuration value or unreadable config file.
    Configuration,
}

/// Errors raised by token accounts held in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("unknown token {0}")]
    /// No token account is deployed at the address.
    UnknownToken(Address),
    #[error("transfer amount exceeds balance (balance {balance}, needed {needed})")]
    /// Sender balance is too small.
    InsufficientBalance {
        /// Sender balance at the time of the call.
        balance: TokenAmount,
        /// Requested amount.
        needed: TokenAmount,
    },
    #[error("transfer amount exceeds allowance (allowance {allowance}, needed {needed})")]
    /// Spender allowance is too small.
    InsufficientAllowance {
        /// Remaining allowance.
        allowance: TokenAmount,
        /// Requested amount.
        needed: TokenAmount,
    },
    #[error("token is not elastic")]
    /// Rebase attempted on a fixed-supply token.
    NotElastic,
    #[error("only the supply controller can rebase")]
    /// Rebase attempted by someone other than the supply controller.
    UnauthorizedRebase,
    #[error("supply must be non-zero")]
    /// Zero initial or rebased supply.
    ZeroSupply,
    #[error("token arithmetic overflow")]
    /// Balance or supply arithmetic overflowed.
    Overflow,
}

/// Outcome of a forwarded rage-quit notification that did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("reverted: {}", .0.as_deref().unwrap_or(""))]
    /// The delegate rejected the notification, optionally with a reason.
    Reverted(Option<String>),
    #[error("out of gas")]
    /// The forwarded budget ran out.
    OutOfGas,
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    /// Underlying filesystem failure.
    Io(String),
    #[error("decode error: {0}")]
    /// Input decoding/serialization failure.
    Decode(String),
    #[error("invalid config: {0}")]
    /// A value failed validation.
    Invalid(#[from] Error),
}

/// Crate-wide error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    // ---------------------------------------------------------------------
    // Authorization
    // ---------------------------------------------------------------------
    #[error("invalid signature")]
    /// Permission signature did not verify for the vault owner.
    InvalidSignature,
    #[error("caller {caller} is not the owner")]
    /// Caller is not the owner of the contract or vault.
    NotOwner {
        /// Rejected caller.
        caller: Address,
    },
    #[error("caller {caller} is not the power controller")]
    /// Caller does not control the power switch.
    NotController {
        /// Rejected caller.
        caller: Address,
    },
    #[error("only controller can withdraw after shutdown")]
    /// Shutdown rescue attempted by someone other than the controller.
    NotRescueController,

    // ---------------------------------------------------------------------
    // Power state
    // ---------------------------------------------------------------------
    #[error("is not online")]
    /// Operation requires the Online state.
    NotOnline,
    #[error("is not offline")]
    /// Operation requires the Offline state.
    NotOffline,
    #[error("is shutdown")]
    /// Operation is not available after shutdown.
    IsShutdown,
    #[error("is not shutdown")]
    /// Operation requires the Shutdown state.
    NotShutdown,
    #[error("cannot power on")]
    /// Power on attempted outside Offline.
    CannotPowerOn,
    #[error("cannot power off")]
    /// Power off attempted outside Online.
    CannotPowerOff,
    #[error("cannot shutdown")]
    /// Shutdown attempted twice.
    CannotShutdown,

    // ---------------------------------------------------------------------
    // Capacity and invariants
    // ---------------------------------------------------------------------
    #[error("insufficient balance")]
    /// Locks for the token would exceed the vault's balance.
    InsufficientBalance,
    #[error("missing lock")]
    /// No lock exists for the (delegate, token) pair.
    MissingLock,
    #[error("no amount staked")]
    /// Stake amount is zero.
    NoAmountStaked,
    #[error("no amount unstaked")]
    /// Unstake amount is zero.
    NoAmountUnstaked,
    #[error("insufficient vault stake")]
    /// Unstake amount exceeds the vault's recorded stake.
    InsufficientVaultStake,
    #[error("no stake")]
    /// The vault has nothing staked in this program.
    NoStake,
    #[error("MAX_STAKES_PER_VAULT reached")]
    /// The vault's stake list is full.
    MaxStakesReached,
    #[error("vault is not registered")]
    /// The vault was not minted by a registered factory.
    InvalidVault,
    #[error("unknown vault {0}")]
    /// No vault is known at the address.
    UnknownVault(Address),
    #[error("invalid duration")]
    /// Funding duration is zero.
    InvalidDuration,
    #[error("invalid address")]
    /// Address is zero or one of the reserved identities.
    InvalidAddress,
    #[error("recipient not defined")]
    /// Shutdown rescue recipient is the zero address.
    RecipientNotDefined,
    #[error("invalid reward scaling")]
    /// Scaling floor exceeds ceiling or its time is zero.
    InvalidScaling,
    #[error("invalid config: {0}")]
    /// A tunable is out of range.
    InvalidConfig(&'static str),
    #[error("already registered")]
    /// Factory or bonus token is already a member.
    AlreadyRegistered,
    #[error("not registered")]
    /// Factory is not a member.
    NotRegistered,
    #[error("max bonus tokens reached")]
    /// Bonus token set is full.
    MaxBonusTokensReached,
    #[error("timestamp too early")]
    /// Projection requested for a time before the last update.
    TimestampTooEarly,
    #[error("reward pool has no balance backing outstanding shares")]
    /// Funding with shares outstanding but an empty pool.
    EmptyRewardPool,
    #[error("delegate {0} does not match the supplied callee")]
    /// The rage-quit callee does not match the ledger's code registry.
    DelegateMismatch(Address),
    #[error("address {0} is already in use")]
    /// Deterministic deployment collided with an existing account.
    AddressInUse(Address),

    // ---------------------------------------------------------------------
    // Resource
    // ---------------------------------------------------------------------
    #[error("insufficient gas (supplied {supplied}, required {required})")]
    /// Rage-quit budget is below the deletion reserve.
    InsufficientGas {
        /// Supplied budget.
        supplied: u64,
        /// Minimum reserve.
        required: u64,
    },

    // ---------------------------------------------------------------------
    // Arithmetic
    // ---------------------------------------------------------------------
    #[error("arithmetic overflow")]
    /// Checked arithmetic overflowed.
    Overflow,
    #[error("division by zero")]
    /// Denominator was zero.
    DivisionByZero,

    // ---------------------------------------------------------------------
    // Wrapped
    // ---------------------------------------------------------------------
    #[error("token error: {0}")]
    /// Token account failure.
    Token(#[from] TokenError),
}

impl Error {
    /// Maps the error onto its taxonomy class.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::InvalidSignature
            | Error::NotOwner { .. }
            | Error::NotController { .. }
            | Error::NotRescueController => ErrorClass::Authorization,
            Error::NotOnline
            | Error::NotOffline
            | Error::IsShutdown
            | Error::NotShutdown
            | Error::CannotPowerOn
            | Error::CannotPowerOff
            | Error::CannotShutdown => ErrorClass::PowerState,
            Error::InsufficientGas { .. } => ErrorClass::Resource,
            Error::Overflow | Error::DivisionByZero => ErrorClass::Arithmetic,
            Error::InvalidScaling | Error::InvalidConfig(_) => ErrorClass::Configuration,
            Error::Token(TokenError::Overflow) => ErrorClass::Arithmetic,
            Error::Token(TokenError::UnauthorizedRebase) => ErrorClass::Authorization,
            _ => ErrorClass::Capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(Error::InvalidSignature.class(), ErrorClass::Authorization);
        assert_eq!(Error::CannotPowerOn.class(), ErrorClass::PowerState);
        assert_eq!(Error::MaxStakesReached.class(), ErrorClass::Capacity);
        assert_eq!(
            Error::InsufficientGas {
                supplied: 1,
                required: 2
            }
            .class(),
            ErrorClass::Resource
        );
        assert_eq!(Error::Overflow.class(), ErrorClass::Arithmetic);
    }

    #[test]
    fn test_token_error_converts() {
        let err: Error = TokenError::NotElastic.into();
        assert_eq!(err.to_string(), "token error: token is not elastic");
    }
}

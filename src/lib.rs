#![deny(missing_docs)]

//! # aludel
//!
//! **Aludel** is a non-custodial staking and reward engine. Users keep their
//! stake inside a personal [`UniversalVault`]; a reward program ([`Aludel`])
//! only holds a signed lock on it. Rewards vest linearly per funding and are
//! paid out in proportion to time-weighted stake, trimmed for early exits by
//! a floor/ceiling curve.
//!
//! ## Components
//!
//! * **Ledger**: the [`ledger`](ledger/index.html) module simulates the host
//!   chain. It owns the clock, token balances (fixed supply and elastic
//!   rebasing), code registration and the event log. Every operation takes
//!   it by `&mut`, and the caller's identity is an explicit argument.
//! * **Power switch**: [`PowerSwitch`] is a tri-state circuit breaker
//!   (Online, Offline, Shutdown) shared by an engine and its pool through
//!   the [`Powered`] guards.
//! * **Vaults**: the [`vault`](vault/index.html) module implements signed
//!   lock/unlock permissions (typed-data digests over secp256k1 or a smart
//!   wallet validator), the rage-quit escape hatch with a bounded budget,
//!   and the factory that mints vaults.
//! * **Reward pool**: [`RewardPool`] is the treasury; only its engine may
//!   disburse, and only the power controller may sweep it after shutdown.
//! * **Engine**: the [`engine`](engine/index.html) module holds funding
//!   schedules, stake units, bonus tokens and the reward math.
//!
//! ## Usage
//!
//! ```rust
//! use aludel::{
//!     Aludel, AludelConfig, KeyPair, Ledger, PermissionKind, TokenAmount, TokenKind,
//!     VaultFactory,
//! };
//!
//! let mut ledger = Ledger::new(1, 0);
//! let admin = KeyPair::from_seed("admin").address();
//! let user = KeyPair::from_seed("user");
//! let staking = ledger
//!     .deploy_token(admin, "STK", TokenKind::Fixed, TokenAmount(1_000))
//!     .unwrap();
//! let reward = ledger
//!     .deploy_token(admin, "RWD", TokenKind::Fixed, TokenAmount(1_000))
//!     .unwrap();
//! let mut aludel =
//!     Aludel::deploy(&mut ledger, admin, staking, reward, AludelConfig::default()).unwrap();
//! let mut factory = VaultFactory::deploy(&mut ledger, admin);
//! aludel
//!     .register_vault_factory(&mut ledger, admin, factory.address())
//!     .unwrap();
//!
//! // Vest 600 reward tokens over one day.
//! ledger
//!     .approve(reward, admin, aludel.address(), TokenAmount(600))
//!     .unwrap();
//! aludel
//!     .fund(&mut ledger, admin, TokenAmount(600), 86_400)
//!     .unwrap();
//!
//! let vault = factory.create(&mut ledger, user.address()).unwrap();
//! ledger
//!     .transfer(staking, admin, vault, TokenAmount(100))
//!     .unwrap();
//! let sig = factory
//!     .vault(&vault)
//!     .unwrap()
//!     .next_permission(PermissionKind::Lock, aludel.address(), staking, TokenAmount(100))
//!     .sign(&user, ledger.chain_id(), &vault)
//!     .unwrap();
//! aludel
//!     .stake(&mut ledger, factory.vault_mut(&vault).unwrap(), TokenAmount(100), &sig)
//!     .unwrap();
//!
//! // Past the scaling window the whole unlocked balance is earned.
//! ledger.advance(60 * 86_400);
//! let sig = factory
//!     .vault(&vault)
//!     .unwrap()
//!     .next_permission(PermissionKind::Unlock, aludel.address(), staking, TokenAmount(100))
//!     .sign(&user, ledger.chain_id(), &vault)
//!     .unwrap();
//! let receipt = aludel
//!     .unstake_and_claim(&mut ledger, factory.vault_mut(&vault).unwrap(), TokenAmount(100), &sig)
//!     .unwrap();
//! assert_eq!(receipt.reward, TokenAmount(600));
//! ```

pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod math;
pub mod power;
pub mod reward_pool;
pub mod types;
pub mod vault;
pub mod wallet;

pub use config::{AludelConfig, RewardScaling};
pub use crypto::KeyPair;
pub use engine::{Aludel, AludelData, RewardSchedule, StakeRecord, UnstakeReceipt, VaultData};
pub use error::{CallError, ConfigError, Error, ErrorClass, TokenError};
pub use ledger::{Event, Ledger, LogEntry, TokenKind};
pub use power::{PowerStatus, PowerSwitch, Powered};
pub use reward_pool::RewardPool;
pub use types::{Address, Shares, StakeUnits, Timestamp, TokenAmount};
pub use vault::{
    CallOutcome, DelegateRef, GasMeter, LockData, Permission, PermissionKind, RageQuit,
    RageQuitReport, UniversalVault, VaultFactory,
};
pub use wallet::{SignatureValidator, SmartWallet};

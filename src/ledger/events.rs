use crate::types::{Address, Shares, Timestamp, TokenAmount};
use serde::Serialize;

/// Observable event emitted by a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum Event {
    /// Switch moved Offline to Online.
    PowerOn,
    /// Switch moved Online to Offline.
    PowerOff,
    /// Switch reached the terminal state.
    EmergencyShutdown,
    /// Switch control handed over.
    ControlTransferred {
        /// Previous controller.
        previous: Address,
        /// New controller.
        controller: Address,
    },
    /// Token units moved.
    Transfer {
        /// Token account.
        token: Address,
        /// Sender.
        from: Address,
        /// Recipient.
        to: Address,
        /// Raw units.
        amount: TokenAmount,
    },
    /// Allowance set.
    Approval {
        /// Token account.
        token: Address,
        /// Holder.
        owner: Address,
        /// Authorised spender.
        spender: Address,
        /// New allowance.
        amount: TokenAmount,
    },
    /// Elastic supply changed.
    Rebase {
        /// Token account.
        token: Address,
        /// Supply after the rebase.
        total_supply: TokenAmount,
    },
    /// Vault minted by a factory.
    VaultCreated {
        /// New vault.
        vault: Address,
        /// Initial owner.
        owner: Address,
    },
    /// Vault ownership token moved.
    VaultTransferred {
        /// Vault.
        vault: Address,
        /// Previous owner.
        from: Address,
        /// New owner.
        to: Address,
    },
    /// Delegate lock created or increased.
    Locked {
        /// Delegate holding the lock.
        delegate: Address,
        /// Locked token.
        token: Address,
        /// Amount added.
        amount: TokenAmount,
    },
    /// Delegate lock decreased or removed.
    Unlocked {
        /// Delegate holding the lock.
        delegate: Address,
        /// Locked token.
        token: Address,
        /// Amount requested.
        amount: TokenAmount,
    },
    /// Owner forcibly removed a lock.
    RageQuit {
        /// Delegate whose lock was removed.
        delegate: Address,
        /// Locked token.
        token: Address,
        /// Whether the delegate's notification completed.
        notified: bool,
        /// Revert reason, empty when notified or out of budget.
        reason: String,
    },
    /// Reward schedule appended.
    AludelFunded {
        /// Raw reward units pulled in.
        amount: TokenAmount,
        /// Vesting window in seconds.
        duration: u64,
        /// Shares minted for the schedule.
        shares: Shares,
    },
    /// Stake recorded.
    Staked {
        /// Staking vault.
        vault: Address,
        /// Staked amount.
        amount: TokenAmount,
    },
    /// Stake removed.
    Unstaked {
        /// Staking vault.
        vault: Address,
        /// Unstaked amount.
        amount: TokenAmount,
    },
    /// Reward or bonus paid to a vault.
    RewardClaimed {
        /// Receiving vault.
        vault: Address,
        /// Paid token.
        token: Address,
        /// Paid amount.
        amount: TokenAmount,
    },
    /// Vault factory added to the whitelist.
    VaultFactoryRegistered {
        /// Factory identity.
        factory: Address,
    },
    /// Vault factory removed from the whitelist.
    VaultFactoryRemoved {
        /// Factory identity.
        factory: Address,
    },
    /// Bonus token registered.
    BonusTokenRegistered {
        /// Token identity.
        token: Address,
    },
}

/// Event with its emitter and ledger time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Emitting component.
    pub emitter: Address,
    /// Ledger time of emission.
    pub timestamp: Timestamp,
    /// Payload.
    pub event: Event,
}

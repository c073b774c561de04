use crate::config::RewardScaling;
use crate::types::{Address, Shares, StakeUnits, Timestamp, TokenAmount};
use serde::{Deserialize, Serialize};

/// One funding event's linear vesting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSchedule {
    /// Funding time.
    pub start: Timestamp,
    /// Vesting window in seconds.
    pub duration: u64,
    /// Shares minted for this funding.
    pub shares: Shares,
}

/// One stake lot of a vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRecord {
    /// Amount still staked from this lot.
    pub amount: TokenAmount,
    /// Time the lot was staked.
    pub timestamp: Timestamp,
}

/// Global state of one reward program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AludelData {
    /// Token staked by vaults.
    pub staking_token: Address,
    /// Token paid as the vesting reward.
    pub reward_token: Address,
    /// Treasury holding reward and bonus tokens.
    pub reward_pool: Address,
    /// Early-exit penalty curve.
    pub reward_scaling: RewardScaling,
    /// Unclaimed shares across all schedules.
    pub reward_shares_outstanding: Shares,
    /// Sum of every vault's stake.
    pub total_stake: TokenAmount,
    /// Stake units accrued up to `last_update`.
    pub total_stake_units: StakeUnits,
    /// Time `total_stake_units` was last rolled forward.
    pub last_update: Timestamp,
    /// Funding history, append-only.
    pub reward_schedules: Vec<RewardSchedule>,
    /// Tokens distributed pro-rata alongside the reward.
    pub bonus_tokens: Vec<Address>,
    /// Factories whose vaults may stake.
    pub vault_factories: Vec<Address>,
}

/// Per-vault stake bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultData {
    /// Sum of the lots.
    pub total_stake: TokenAmount,
    /// Lots, oldest first.
    pub stakes: Vec<StakeRecord>,
}

/// What an unstake paid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnstakeReceipt {
    /// Vault that unstaked.
    pub vault: Address,
    /// Amount unstaked.
    pub amount: TokenAmount,
    /// Reward-token payout.
    pub reward: TokenAmount,
    /// Shares burned for the payout.
    pub shares_burned: Shares,
    /// Bonus-token payouts, in registration order.
    pub bonuses: Vec<(Address, TokenAmount)>,
}

//! Pure reward arithmetic.
//!
//! Nothing here touches the ledger, so every function can be evaluated for a
//! hypothetical timestamp. All divisions floor; rounding dust stays in the
//! pool for the remaining stakers.

use super::state::{RewardSchedule, StakeRecord};
use crate::config::RewardScaling;
use crate::error::Error;
use crate::math::{checked_add, checked_mul, mul_div};
use crate::types::{Shares, StakeUnits, Timestamp, TokenAmount};

impl Shares {
    /// Shares minted for `amount` newly funded reward units.
    ///
    /// With shares outstanding the current rate `outstanding / backing` is
    /// kept; otherwise `base_shares_per_unit` seeds it.
    pub fn for_funding(
        amount: TokenAmount,
        outstanding: Shares,
        backing: TokenAmount,
        base_shares_per_unit: u128,
    ) -> Result<Shares, Error> {
        if outstanding.is_zero() {
            return checked_mul(amount.0, base_shares_per_unit).map(Shares);
        }
        if backing.is_zero() {
            return Err(Error::EmptyRewardPool);
        }
        mul_div(outstanding.0, amount.0, backing.0).map(Shares)
    }

    /// Shares worth `amount` at the rate `outstanding / backing`.
    pub fn from_amount(
        amount: TokenAmount,
        outstanding: Shares,
        backing: TokenAmount,
    ) -> Result<Shares, Error> {
        if backing.is_zero() {
            return Ok(Shares::ZERO);
        }
        mul_div(outstanding.0, amount.0, backing.0).map(Shares)
    }

    /// Raw units these shares are worth at the rate `backing / outstanding`.
    pub fn to_amount(self, outstanding: Shares, backing: TokenAmount) -> Result<TokenAmount, Error> {
        if outstanding.is_zero() {
            return Ok(TokenAmount::ZERO);
        }
        mul_div(self.0, backing.0, outstanding.0).map(TokenAmount)
    }
}

/// `amount * (end - start)`, zero when `end <= start`.
pub fn stake_units(amount: TokenAmount, start: Timestamp, end: Timestamp) -> Result<StakeUnits, Error> {
    let held = u128::from(end.saturating_sub(start));
    checked_mul(amount.0, held).map(StakeUnits)
}

/// Stake units accrued by every lot up to `timestamp`.
pub fn total_stake_units(stakes: &[StakeRecord], timestamp: Timestamp) -> Result<StakeUnits, Error> {
    stakes.iter().try_fold(StakeUnits::ZERO, |acc, lot| {
        let units = stake_units(lot.amount, lot.timestamp, timestamp)?;
        acc.checked_add(units).ok_or(Error::Overflow)
    })
}

/// Reward units vested and unclaimed at `timestamp`.
///
/// Each schedule still vesting keeps `shares - shares * elapsed / duration`
/// locked; locked shares convert to units at the pool rate and the rest of
/// the pool balance is unlocked.
pub fn unlocked_rewards(
    schedules: &[RewardSchedule],
    reward_balance: TokenAmount,
    shares_outstanding: Shares,
    timestamp: Timestamp,
) -> Result<TokenAmount, Error> {
    if schedules.is_empty() || shares_outstanding.is_zero() {
        return Ok(TokenAmount::ZERO);
    }
    let mut shares_locked = 0u128;
    for schedule in schedules {
        let elapsed = timestamp.saturating_sub(schedule.start);
        if elapsed < schedule.duration {
            let vested = mul_div(
                schedule.shares.0,
                u128::from(elapsed),
                u128::from(schedule.duration),
            )?;
            shares_locked = checked_add(shares_locked, schedule.shares.0 - vested)?;
        }
    }
    let reward_locked = Shares(shares_locked).to_amount(shares_outstanding, reward_balance)?;
    Ok(reward_balance.saturating_sub(reward_locked))
}

/// Reward for one lot of `stake_amount` held `stake_duration` seconds.
///
/// The base reward is the lot's fraction of `total_stake_units` applied to
/// `unlocked`; the scaling curve then trims it for lots younger than
/// `scaling.time`.
pub fn scaled_reward(
    unlocked: TokenAmount,
    stake_amount: TokenAmount,
    stake_duration: u64,
    total_stake_units: StakeUnits,
    scaling: &RewardScaling,
) -> Result<TokenAmount, Error> {
    let units = checked_mul(stake_amount.0, u128::from(stake_duration))?;
    let base = if total_stake_units.is_zero() {
        0
    } else {
        mul_div(unlocked.0, units, total_stake_units.0)?
    };
    if stake_duration >= scaling.time || scaling.floor == scaling.ceiling {
        return Ok(TokenAmount(base));
    }
    let ceiling = u128::from(scaling.ceiling);
    let minimum = mul_div(base, u128::from(scaling.floor), ceiling)?;
    let bonus = mul_div(
        base,
        u128::from(scaling.ceiling - scaling.floor) * u128::from(stake_duration),
        ceiling * u128::from(scaling.time),
    )?;
    checked_add(minimum, bonus).map(TokenAmount)
}

/// Result of consuming lots for an unstake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RewardOutput {
    /// Lots fully consumed from the front.
    pub lots_consumed: usize,
    /// New amount of the next lot when it was only partly consumed.
    pub partial_remainder: Option<TokenAmount>,
    /// Stake units released by the unstake.
    pub stake_units: StakeUnits,
    /// Unlocked rewards left after the payout.
    pub new_unlocked_rewards: TokenAmount,
    /// Global stake units left after the unstake.
    pub new_total_stake_units: StakeUnits,
    /// Payout.
    pub reward: TokenAmount,
}

/// Consumes lots oldest-first until `unstake_amount` is covered, pricing each
/// lot with its own age and removing its payout and units before the next.
pub fn reward_from_stakes(
    stakes: &[StakeRecord],
    unstake_amount: TokenAmount,
    unlocked: TokenAmount,
    total_stake_units: StakeUnits,
    timestamp: Timestamp,
    scaling: &RewardScaling,
) -> Result<RewardOutput, Error> {
    let mut out = RewardOutput {
        new_unlocked_rewards: unlocked,
        new_total_stake_units: total_stake_units,
        ..RewardOutput::default()
    };
    let mut remaining = unstake_amount.0;
    for lot in stakes {
        if remaining == 0 {
            break;
        }
        let consumed = TokenAmount(lot.amount.0.min(remaining));
        let duration = timestamp.saturating_sub(lot.timestamp);
        let units = stake_units(consumed, lot.timestamp, timestamp)?;
        let reward = scaled_reward(
            out.new_unlocked_rewards,
            consumed,
            duration,
            out.new_total_stake_units,
            scaling,
        )?;

        out.reward = out.reward.checked_add(reward).ok_or(Error::Overflow)?;
        out.new_unlocked_rewards = out.new_unlocked_rewards.saturating_sub(reward);
        out.new_total_stake_units = out.new_total_stake_units.saturating_sub(units);
        out.stake_units = out.stake_units.checked_add(units).ok_or(Error::Overflow)?;
        remaining -= consumed.0;
        if consumed == lot.amount {
            out.lots_consumed += 1;
        } else {
            out.partial_remainder = Some(TokenAmount(lot.amount.0 - consumed.0));
        }
    }
    if remaining > 0 {
        return Err(Error::InsufficientVaultStake);
    }
    Ok(out)
}

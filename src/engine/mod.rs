//! Reward engine: funding, staking, time-weighted payouts and bonus tokens.
//!
//! Stake units (`amount * seconds held`) are the currency of reward
//! allocation. The global total is rolled forward lazily at each mutating
//! call with `total += total_stake * (now - last_update)`; it never ticks
//! on its own. Funding mints [`Shares`] instead of tracking raw reward
//! units, so rebases of an elastic reward token rescale payouts without
//! touching the bookkeeping.

mod rewards;
mod state;

pub use rewards::{
    reward_from_stakes, scaled_reward, stake_units, total_stake_units, unlocked_rewards,
    RewardOutput,
};
pub use state::{AludelData, RewardSchedule, StakeRecord, UnstakeReceipt, VaultData};

use crate::config::AludelConfig;
use crate::error::{CallError, Error};
use crate::ledger::{Event, Ledger};
use crate::math::checked_sub;
use crate::power::{PowerSwitch, Powered};
use crate::reward_pool::RewardPool;
use crate::types::{Address, Shares, StakeUnits, Timestamp, TokenAmount};
use crate::vault::{GasMeter, RageQuit, UniversalVault};
use log::{debug, info};
use std::collections::HashMap;
use std::rc::Rc;

/// Cost charged to the forwarded budget before a rage-quit is processed.
pub const RAGE_QUIT_HOOK_BASE_GAS: u64 = 30_000;
/// Additional cost per stake lot released by a rage quit.
pub const RAGE_QUIT_HOOK_GAS_PER_STAKE: u64 = 10_000;

/// One reward program.
#[derive(Debug)]
pub struct Aludel {
    address: Address,
    owner: Address,
    config: AludelConfig,
    switch: Rc<PowerSwitch>,
    pool: RewardPool,
    data: AludelData,
    vaults: HashMap<Address, VaultData>,
}

impl Aludel {
    /// Deploys a program administered by `owner`, with its own power switch
    /// (controlled by `owner`) and reward pool.
    pub fn deploy(
        ledger: &mut Ledger,
        owner: Address,
        staking_token: Address,
        reward_token: Address,
        config: AludelConfig,
    ) -> Result<Self, Error> {
        config.validate()?;
        ledger.token(&staking_token)?;
        ledger.token(&reward_token)?;

        let address = ledger.deploy_contract(owner, "aludel");
        let switch = Rc::new(PowerSwitch::deploy(ledger, address, owner));
        let pool = RewardPool::deploy(ledger, address, address, Rc::clone(&switch));
        let data = AludelData {
            staking_token,
            reward_token,
            reward_pool: pool.address(),
            reward_scaling: config.reward_scaling,
            reward_shares_outstanding: Shares::ZERO,
            total_stake: TokenAmount::ZERO,
            total_stake_units: StakeUnits::ZERO,
            last_update: ledger.now(),
            reward_schedules: Vec::new(),
            bonus_tokens: Vec::new(),
            vault_factories: Vec::new(),
        };
        info!(
            "QSYS|mod=ENGINE|evt=DEPLOY|aludel={} owner={} staking={} reward={} pool={}",
            address,
            owner,
            staking_token,
            reward_token,
            pool.address()
        );
        Ok(Self {
            address,
            owner,
            config,
            switch,
            pool,
            data,
            vaults: HashMap::new(),
        })
    }

    /// Identity of the engine; the delegate vaults lock under.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Administrator.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Active configuration.
    pub fn config(&self) -> &AludelConfig {
        &self.config
    }

    /// Shared handle to the program's power switch.
    pub fn switch_handle(&self) -> Rc<PowerSwitch> {
        Rc::clone(&self.switch)
    }

    /// The program's treasury.
    pub fn reward_pool(&self) -> &RewardPool {
        &self.pool
    }

    fn only_owner(&self, caller: Address) -> Result<(), Error> {
        if caller != self.owner {
            return Err(Error::NotOwner { caller });
        }
        Ok(())
    }

    /// Hands administration to `new_owner`.
    pub fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<(), Error> {
        self.only_owner(caller)?;
        if new_owner.is_zero() {
            return Err(Error::InvalidAddress);
        }
        self.owner = new_owner;
        info!(
            "QSYS|mod=ENGINE|evt=OWNER|aludel={} owner={}",
            self.address, new_owner
        );
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Views
    // ---------------------------------------------------------------------

    /// Snapshot of the global state.
    pub fn aludel_data(&self) -> &AludelData {
        &self.data
    }

    /// Stake bookkeeping of `vault`; empty when it never staked.
    pub fn vault_data(&self, vault: &Address) -> VaultData {
        self.vaults.get(vault).cloned().unwrap_or_default()
    }

    /// Registered bonus tokens.
    pub fn bonus_tokens(&self) -> &[Address] {
        &self.data.bonus_tokens
    }

    /// Number of registered bonus tokens.
    pub fn bonus_token_set_length(&self) -> usize {
        self.data.bonus_tokens.len()
    }

    /// Bonus token at `index`.
    pub fn bonus_token_at(&self, index: usize) -> Option<Address> {
        self.data.bonus_tokens.get(index).copied()
    }

    /// Registered vault factories.
    pub fn vault_factories(&self) -> &[Address] {
        &self.data.vault_factories
    }

    /// Returns true when `factory` is whitelisted.
    pub fn is_valid_address(&self, factory: &Address) -> bool {
        self.data.vault_factories.contains(factory)
    }

    /// Returns true when `vault` was minted by a whitelisted factory.
    pub fn is_valid_vault(&self, vault: &UniversalVault) -> bool {
        self.is_valid_address(&vault.nft())
    }

    /// Global stake units projected to `timestamp`.
    pub fn future_total_stake_units(&self, timestamp: Timestamp) -> Result<StakeUnits, Error> {
        if timestamp < self.data.last_update {
            return Err(Error::TimestampTooEarly);
        }
        let accrued = stake_units(self.data.total_stake, self.data.last_update, timestamp)?;
        self.data
            .total_stake_units
            .checked_add(accrued)
            .ok_or(Error::Overflow)
    }

    /// Global stake units now.
    pub fn current_total_stake_units(&self, ledger: &Ledger) -> Result<StakeUnits, Error> {
        self.future_total_stake_units(ledger.now())
    }

    /// Stake units of `vault` projected to `timestamp`.
    pub fn future_vault_stake_units(
        &self,
        vault: &Address,
        timestamp: Timestamp,
    ) -> Result<StakeUnits, Error> {
        match self.vaults.get(vault) {
            Some(data) => total_stake_units(&data.stakes, timestamp),
            None => Ok(StakeUnits::ZERO),
        }
    }

    /// Stake units of `vault` now.
    pub fn current_vault_stake_units(
        &self,
        ledger: &Ledger,
        vault: &Address,
    ) -> Result<StakeUnits, Error> {
        self.future_vault_stake_units(vault, ledger.now())
    }

    fn pool_reward_balance(&self, ledger: &Ledger) -> Result<TokenAmount, Error> {
        self.pool.balance(ledger, &self.data.reward_token)
    }

    /// Unlocked rewards projected to `timestamp` at the current pool balance.
    pub fn future_unlocked_rewards(
        &self,
        ledger: &Ledger,
        timestamp: Timestamp,
    ) -> Result<TokenAmount, Error> {
        if timestamp < self.data.last_update {
            return Err(Error::TimestampTooEarly);
        }
        unlocked_rewards(
            &self.data.reward_schedules,
            self.pool_reward_balance(ledger)?,
            self.data.reward_shares_outstanding,
            timestamp,
        )
    }

    /// Unlocked rewards now.
    pub fn current_unlocked_rewards(&self, ledger: &Ledger) -> Result<TokenAmount, Error> {
        self.future_unlocked_rewards(ledger, ledger.now())
    }

    /// Reward for unstaking `amount` from `vault` at `timestamp`.
    pub fn future_stake_reward(
        &self,
        ledger: &Ledger,
        vault: &Address,
        amount: TokenAmount,
        timestamp: Timestamp,
    ) -> Result<TokenAmount, Error> {
        let stakes = self
            .vaults
            .get(vault)
            .map(|data| data.stakes.as_slice())
            .unwrap_or(&[]);
        let out = reward_from_stakes(
            stakes,
            amount,
            self.future_unlocked_rewards(ledger, timestamp)?,
            self.future_total_stake_units(timestamp)?,
            timestamp,
            &self.data.reward_scaling,
        )?;
        Ok(out.reward)
    }

    /// Reward for unstaking `amount` from `vault` now.
    pub fn current_stake_reward(
        &self,
        ledger: &Ledger,
        vault: &Address,
        amount: TokenAmount,
    ) -> Result<TokenAmount, Error> {
        self.future_stake_reward(ledger, vault, amount, ledger.now())
    }

    /// Reward for unstaking all of `vault` at `timestamp`.
    pub fn future_vault_reward(
        &self,
        ledger: &Ledger,
        vault: &Address,
        timestamp: Timestamp,
    ) -> Result<TokenAmount, Error> {
        let total = self.vault_data(vault).total_stake;
        self.future_stake_reward(ledger, vault, total, timestamp)
    }

    /// Reward for unstaking all of `vault` now.
    pub fn current_vault_reward(&self, ledger: &Ledger, vault: &Address) -> Result<TokenAmount, Error> {
        self.future_vault_reward(ledger, vault, ledger.now())
    }

    // ---------------------------------------------------------------------
    // Admin
    // ---------------------------------------------------------------------

    /// Pulls `amount` reward tokens from the owner into the pool and vests
    /// them linearly over `duration` seconds from now.
    ///
    /// The owner must have approved the engine for `amount` beforehand.
    pub fn fund(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        amount: TokenAmount,
        duration: u64,
    ) -> Result<Shares, Error> {
        self.only_owner(caller)?;
        self.only_online()?;
        if duration == 0 {
            return Err(Error::InvalidDuration);
        }

        let shares = Shares::for_funding(
            amount,
            self.data.reward_shares_outstanding,
            self.pool_reward_balance(ledger)?,
            self.config.base_shares_per_unit,
        )?;
        let outstanding = self
            .data
            .reward_shares_outstanding
            .checked_add(shares)
            .ok_or(Error::Overflow)?;
        ledger.transfer_from(
            self.data.reward_token,
            self.address,
            caller,
            self.pool.address(),
            amount,
        )?;

        let start = ledger.now();
        self.data.reward_schedules.push(RewardSchedule {
            start,
            duration,
            shares,
        });
        self.data.reward_shares_outstanding = outstanding;
        ledger.emit(
            self.address,
            Event::AludelFunded {
                amount,
                duration,
                shares,
            },
        );
        info!(
            "QSYS|mod=ENGINE|evt=FUND|aludel={} amount={} duration={} shares={} outstanding={}",
            self.address, amount, duration, shares, outstanding
        );
        Ok(shares)
    }

    /// Whitelists a vault factory.
    pub fn register_vault_factory(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        factory: Address,
    ) -> Result<(), Error> {
        self.only_owner(caller)?;
        self.not_shutdown()?;
        if self.data.vault_factories.contains(&factory) {
            return Err(Error::AlreadyRegistered);
        }
        self.data.vault_factories.push(factory);
        ledger.emit(self.address, Event::VaultFactoryRegistered { factory });
        info!(
            "QSYS|mod=ENGINE|evt=FACTORY_ADD|aludel={} factory={}",
            self.address, factory
        );
        Ok(())
    }

    /// Removes a vault factory from the whitelist.
    pub fn remove_vault_factory(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        factory: Address,
    ) -> Result<(), Error> {
        self.only_owner(caller)?;
        self.not_shutdown()?;
        let index = self
            .data
            .vault_factories
            .iter()
            .position(|known| *known == factory)
            .ok_or(Error::NotRegistered)?;
        self.data.vault_factories.swap_remove(index);
        ledger.emit(self.address, Event::VaultFactoryRemoved { factory });
        info!(
            "QSYS|mod=ENGINE|evt=FACTORY_REMOVE|aludel={} factory={}",
            self.address, factory
        );
        Ok(())
    }

    /// Registers a token distributed pro-rata from the pool on unstake.
    pub fn register_bonus_token(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        token: Address,
    ) -> Result<(), Error> {
        self.only_owner(caller)?;
        self.only_online()?;
        let reserved = [
            Address::ZERO,
            self.address,
            self.data.staking_token,
            self.data.reward_token,
            self.pool.address(),
        ];
        if reserved.contains(&token) {
            return Err(Error::InvalidAddress);
        }
        if self.data.bonus_tokens.contains(&token) {
            return Err(Error::AlreadyRegistered);
        }
        if self.data.bonus_tokens.len() >= self.config.max_bonus_tokens {
            return Err(Error::MaxBonusTokensReached);
        }
        ledger.token(&token)?;
        self.data.bonus_tokens.push(token);
        ledger.emit(self.address, Event::BonusTokenRegistered { token });
        info!(
            "QSYS|mod=ENGINE|evt=BONUS_ADD|aludel={} token={}",
            self.address, token
        );
        Ok(())
    }

    /// Moves stray tokens out of the pool. The reward token and bonus
    /// tokens only leave through payouts or the shutdown sweep.
    pub fn rescue_tokens_from_reward_pool(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        token: Address,
        recipient: Address,
        amount: TokenAmount,
    ) -> Result<(), Error> {
        self.only_owner(caller)?;
        self.only_online()?;
        if token == self.data.reward_token || self.data.bonus_tokens.contains(&token) {
            return Err(Error::InvalidAddress);
        }
        let forbidden_recipients = [
            Address::ZERO,
            self.address,
            self.data.staking_token,
            self.data.reward_token,
            self.pool.address(),
        ];
        if forbidden_recipients.contains(&recipient) {
            return Err(Error::InvalidAddress);
        }
        self.pool
            .send_erc20(ledger, self.address, token, recipient, amount)?;
        info!(
            "QSYS|mod=ENGINE|evt=RESCUE|aludel={} token={} recipient={} amount={}",
            self.address, token, recipient, amount
        );
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Staking
    // ---------------------------------------------------------------------

    fn roll_forward(&mut self, now: Timestamp) -> Result<(), Error> {
        self.data.total_stake_units = self.future_total_stake_units(now)?;
        self.data.last_update = now;
        Ok(())
    }

    /// Locks `amount` of the staking token in `vault` under this engine and
    /// records a new stake lot.
    ///
    /// `permission` is the owner's signed Lock permission naming this engine.
    pub fn stake(
        &mut self,
        ledger: &mut Ledger,
        vault: &mut UniversalVault,
        amount: TokenAmount,
        permission: &[u8],
    ) -> Result<(), Error> {
        self.only_online()?;
        if !self.is_valid_vault(vault) {
            return Err(Error::InvalidVault);
        }
        if amount.is_zero() {
            return Err(Error::NoAmountStaked);
        }
        let vault_address = vault.address();
        let current = self.vault_data(&vault_address);
        if current.stakes.len() >= self.config.max_stakes_per_vault {
            return Err(Error::MaxStakesReached);
        }
        let now = ledger.now();
        let total_stake = self
            .data
            .total_stake
            .checked_add(amount)
            .ok_or(Error::Overflow)?;
        let vault_stake = current
            .total_stake
            .checked_add(amount)
            .ok_or(Error::Overflow)?;
        let rolled_units = self.future_total_stake_units(now)?;

        vault.lock(
            ledger,
            self.address,
            self.data.staking_token,
            amount,
            permission,
        )?;

        self.data.total_stake_units = rolled_units;
        self.data.last_update = now;
        self.data.total_stake = total_stake;
        let entry = self.vaults.entry(vault_address).or_default();
        entry.stakes.push(StakeRecord {
            amount,
            timestamp: now,
        });
        entry.total_stake = vault_stake;

        ledger.emit(
            self.address,
            Event::Staked {
                vault: vault_address,
                amount,
            },
        );
        info!(
            "QSYS|mod=ENGINE|evt=STAKE|aludel={} vault={} amount={} lots={} total_stake={}",
            self.address,
            vault_address,
            amount,
            entry.stakes.len(),
            total_stake
        );
        Ok(())
    }

    /// Releases `amount` of `vault`'s stake, oldest lots first, and pays the
    /// reward and every bonus token into the vault.
    ///
    /// `permission` is the owner's signed Unlock permission naming this engine.
    pub fn unstake_and_claim(
        &mut self,
        ledger: &mut Ledger,
        vault: &mut UniversalVault,
        amount: TokenAmount,
        permission: &[u8],
    ) -> Result<UnstakeReceipt, Error> {
        self.not_shutdown()?;
        if amount.is_zero() {
            return Err(Error::NoAmountUnstaked);
        }
        let vault_address = vault.address();
        let current = self.vault_data(&vault_address);
        if amount > current.total_stake {
            return Err(Error::InsufficientVaultStake);
        }

        let now = ledger.now();
        let total_units = self.future_total_stake_units(now)?;
        let reward_balance = self.pool_reward_balance(ledger)?;
        let unlocked = unlocked_rewards(
            &self.data.reward_schedules,
            reward_balance,
            self.data.reward_shares_outstanding,
            now,
        )?;
        let scaling = self.data.reward_scaling;
        let out = reward_from_stakes(&current.stakes, amount, unlocked, total_units, now, &scaling)?;
        let shares_burned = Shares::from_amount(
            out.reward,
            self.data.reward_shares_outstanding,
            reward_balance,
        )?;
        let mut bonuses = Vec::with_capacity(self.data.bonus_tokens.len());
        for token in &self.data.bonus_tokens {
            let balance = self.pool.balance(ledger, token)?;
            let bonus =
                reward_from_stakes(&current.stakes, amount, balance, total_units, now, &scaling)?;
            bonuses.push((*token, bonus.reward));
        }
        let vault_stake = TokenAmount(checked_sub(current.total_stake.0, amount.0)?);
        let total_stake = TokenAmount(checked_sub(self.data.total_stake.0, amount.0)?);
        let outstanding = Shares(checked_sub(
            self.data.reward_shares_outstanding.0,
            shares_burned.0,
        )?);
        debug!(
            "QSYS|mod=ENGINE|evt=REWARD|vault={} unlocked={} units={} total_units={} reward={} burned={}",
            vault_address, unlocked, out.stake_units, total_units, out.reward, shares_burned
        );

        vault.unlock(
            ledger,
            self.address,
            self.data.staking_token,
            amount,
            permission,
        )?;

        let mut stakes = current.stakes;
        stakes.drain(..out.lots_consumed);
        if let Some(remainder) = out.partial_remainder {
            if let Some(first) = stakes.first_mut() {
                first.amount = remainder;
            }
        }
        if stakes.is_empty() {
            self.vaults.remove(&vault_address);
        } else {
            self.vaults.insert(
                vault_address,
                VaultData {
                    total_stake: vault_stake,
                    stakes,
                },
            );
        }
        self.data.total_stake_units = out.new_total_stake_units;
        self.data.last_update = now;
        self.data.total_stake = total_stake;
        self.data.reward_shares_outstanding = outstanding;
        ledger.emit(
            self.address,
            Event::Unstaked {
                vault: vault_address,
                amount,
            },
        );

        self.pay_out(ledger, vault_address, self.data.reward_token, out.reward)?;
        for (token, bonus) in &bonuses {
            self.pay_out(ledger, vault_address, *token, *bonus)?;
        }
        info!(
            "QSYS|mod=ENGINE|evt=UNSTAKE|aludel={} vault={} amount={} reward={} bonuses={} total_stake={}",
            self.address,
            vault_address,
            amount,
            out.reward,
            bonuses.len(),
            self.data.total_stake
        );
        Ok(UnstakeReceipt {
            vault: vault_address,
            amount,
            reward: out.reward,
            shares_burned,
            bonuses,
        })
    }

    fn pay_out(
        &self,
        ledger: &mut Ledger,
        vault: Address,
        token: Address,
        amount: TokenAmount,
    ) -> Result<(), Error> {
        if amount.is_zero() {
            return Ok(());
        }
        self.pool
            .send_erc20(ledger, self.address, token, vault, amount)?;
        ledger.emit(
            self.address,
            Event::RewardClaimed {
                vault,
                token,
                amount,
            },
        );
        Ok(())
    }
}

impl Powered for Aludel {
    fn power_switch(&self) -> &PowerSwitch {
        &self.switch
    }
}

impl RageQuit for Aludel {
    fn address(&self) -> Address {
        self.address
    }

    /// Forgets the whole stake of `vault` after its owner dropped the lock.
    /// Runs in every power state.
    fn rage_quit(
        &mut self,
        ledger: &mut Ledger,
        vault: Address,
        meter: &mut GasMeter,
    ) -> Result<(), CallError> {
        meter.charge(RAGE_QUIT_HOOK_BASE_GAS)?;
        let data = match self.vaults.get(&vault) {
            Some(data) if !data.total_stake.is_zero() => data,
            _ => return Err(CallError::Reverted(Some(Error::NoStake.to_string()))),
        };
        let lots = data.stakes.len() as u64;
        meter.charge(RAGE_QUIT_HOOK_GAS_PER_STAKE.saturating_mul(lots))?;

        let now = ledger.now();
        let reason = |err: Error| CallError::Reverted(Some(err.to_string()));
        let vault_units = total_stake_units(&data.stakes, now).map_err(reason)?;
        let vault_stake = data.total_stake;
        let total_stake =
            TokenAmount(checked_sub(self.data.total_stake.0, vault_stake.0).map_err(reason)?);
        let total_units = self.future_total_stake_units(now).map_err(reason)?;
        let total_units =
            StakeUnits(checked_sub(total_units.0, vault_units.0).map_err(reason)?);

        self.roll_forward(now).map_err(reason)?;
        self.data.total_stake_units = total_units;
        self.data.total_stake = total_stake;
        self.vaults.remove(&vault);
        ledger.emit(
            self.address,
            Event::Unstaked {
                vault,
                amount: vault_stake,
            },
        );
        info!(
            "QSYS|mod=ENGINE|evt=RAGE_QUIT|aludel={} vault={} amount={} gas_used={}",
            self.address,
            vault,
            vault_stake,
            meter.used()
        );
        Ok(())
    }
}

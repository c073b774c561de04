//! Power-gated treasury holding reward and bonus tokens for one engine.

use crate::error::Error;
use crate::ledger::Ledger;
use crate::power::{PowerSwitch, Powered};
use crate::types::{Address, TokenAmount};
use log::info;
use std::rc::Rc;

/// Treasury owned by exactly one reward engine.
///
/// Holds no bookkeeping of its own; balances live in the token accounts.
#[derive(Debug)]
pub struct RewardPool {
    address: Address,
    owner: Address,
    switch: Rc<PowerSwitch>,
}

impl RewardPool {
    /// Deploys a pool owned by `owner` and gated by `switch`.
    pub fn deploy(
        ledger: &mut Ledger,
        deployer: Address,
        owner: Address,
        switch: Rc<PowerSwitch>,
    ) -> Self {
        Self {
            address: ledger.deploy_contract(deployer, "reward_pool"),
            owner,
            switch,
        }
    }

    /// Identity of the pool.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Engine allowed to disburse.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Pool balance of `token`.
    pub fn balance(&self, ledger: &Ledger, token: &Address) -> Result<TokenAmount, Error> {
        ledger.balance_of(token, &self.address)
    }

    /// Owner-only disbursement while Online or Offline.
    pub fn send_erc20(
        &self,
        ledger: &mut Ledger,
        caller: Address,
        token: Address,
        to: Address,
        amount: TokenAmount,
    ) -> Result<(), Error> {
        if caller != self.owner {
            return Err(Error::NotOwner { caller });
        }
        self.not_shutdown()?;
        ledger.transfer(token, self.address, to, amount)
    }

    /// Controller-only sweep of every listed token after shutdown.
    pub fn rescue_erc20(
        &self,
        ledger: &mut Ledger,
        caller: Address,
        tokens: &[Address],
        recipient: Address,
    ) -> Result<(), Error> {
        if caller != self.power_controller() {
            return Err(Error::NotRescueController);
        }
        self.only_shutdown()?;
        if recipient.is_zero() {
            return Err(Error::RecipientNotDefined);
        }
        for token in tokens {
            ledger.token(token)?;
        }
        // Balances are read per token so a repeated entry sweeps zero.
        for &token in tokens {
            let amount = self.balance(ledger, &token)?;
            ledger.transfer(token, self.address, recipient, amount)?;
            info!(
                "QSYS|mod=POOL|evt=RESCUE|pool={} token={} amount={} recipient={}",
                self.address, token, amount, recipient
            );
        }
        Ok(())
    }
}

impl Powered for RewardPool {
    fn power_switch(&self) -> &PowerSwitch {
        &self.switch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TokenError;
    use crate::ledger::{Event, TokenKind};

    struct Fixture {
        ledger: Ledger,
        pool: RewardPool,
        switch: Rc<PowerSwitch>,
        admin: Address,
        controller: Address,
        tokens: Vec<Address>,
    }

    fn setup(token_count: usize) -> Fixture {
        let mut ledger = Ledger::new(1, 0);
        let admin = Address([1u8; 20]);
        let controller = Address([2u8; 20]);
        let switch = Rc::new(PowerSwitch::deploy(&mut ledger, admin, controller));
        let pool = RewardPool::deploy(&mut ledger, admin, admin, Rc::clone(&switch));
        let mut tokens = Vec::new();
        for _ in 0..token_count {
            let token = ledger
                .deploy_token(admin, "MOCK", TokenKind::Fixed, TokenAmount(2_000))
                .unwrap();
            ledger
                .transfer(token, admin, pool.address(), TokenAmount(1_000))
                .unwrap();
            tokens.push(token);
        }
        Fixture {
            ledger,
            pool,
            switch,
            admin,
            controller,
            tokens,
        }
    }

    #[test]
    fn test_send_only_owner_and_not_shutdown() {
        let mut fx = setup(1);
        let token = fx.tokens[0];
        let recipient = Address([3u8; 20]);
        assert_eq!(
            fx.pool
                .send_erc20(&mut fx.ledger, fx.controller, token, recipient, TokenAmount(1)),
            Err(Error::NotOwner { caller: fx.controller })
        );
        fx.switch.power_off(&mut fx.ledger, fx.controller).unwrap();
        fx.pool
            .send_erc20(&mut fx.ledger, fx.admin, token, recipient, TokenAmount(500))
            .unwrap();
        fx.pool
            .send_erc20(&mut fx.ledger, fx.admin, token, recipient, TokenAmount::ZERO)
            .unwrap();
        fx.switch
            .emergency_shutdown(&mut fx.ledger, fx.controller)
            .unwrap();
        assert_eq!(
            fx.pool
                .send_erc20(&mut fx.ledger, fx.admin, token, recipient, TokenAmount(1)),
            Err(Error::IsShutdown)
        );
        assert_eq!(
            fx.ledger.balance_of(&token, &recipient).unwrap(),
            TokenAmount(500)
        );
    }

    #[test]
    fn test_rescue_requires_controller_and_shutdown() {
        let mut fx = setup(1);
        let tokens = fx.tokens.clone();
        let recipient = Address([3u8; 20]);
        assert_eq!(
            fx.pool
                .rescue_erc20(&mut fx.ledger, fx.admin, &tokens, recipient),
            Err(Error::NotRescueController)
        );
        assert_eq!(
            fx.pool
                .rescue_erc20(&mut fx.ledger, fx.controller, &tokens, recipient),
            Err(Error::NotShutdown)
        );
        fx.switch.power_off(&mut fx.ledger, fx.controller).unwrap();
        assert_eq!(
            fx.pool
                .rescue_erc20(&mut fx.ledger, fx.controller, &tokens, recipient),
            Err(Error::NotShutdown)
        );
        fx.switch
            .emergency_shutdown(&mut fx.ledger, fx.controller)
            .unwrap();
        assert_eq!(
            fx.pool
                .rescue_erc20(&mut fx.ledger, fx.controller, &tokens, Address::ZERO),
            Err(Error::RecipientNotDefined)
        );
    }

    #[test]
    fn test_rescue_with_repeated_token_sweeps_once() {
        let mut fx = setup(1);
        let token = fx.tokens[0];
        let recipient = Address([3u8; 20]);
        fx.switch
            .emergency_shutdown(&mut fx.ledger, fx.controller)
            .unwrap();
        fx.pool
            .rescue_erc20(&mut fx.ledger, fx.controller, &[token, token], recipient)
            .unwrap();
        assert_eq!(
            fx.ledger.balance_of(&token, &recipient).unwrap(),
            TokenAmount(1_000)
        );
        assert_eq!(fx.pool.balance(&fx.ledger, &token).unwrap(), TokenAmount::ZERO);
    }

    #[test]
    fn test_rescue_with_unknown_token_moves_nothing() {
        let mut fx = setup(1);
        let token = fx.tokens[0];
        let unknown = Address([9u8; 20]);
        let recipient = Address([3u8; 20]);
        fx.switch
            .emergency_shutdown(&mut fx.ledger, fx.controller)
            .unwrap();
        assert!(matches!(
            fx.pool
                .rescue_erc20(&mut fx.ledger, fx.controller, &[token, unknown], recipient),
            Err(Error::Token(TokenError::UnknownToken(_)))
        ));
        assert_eq!(
            fx.pool.balance(&fx.ledger, &token).unwrap(),
            TokenAmount(1_000)
        );
    }

    #[test]
    fn test_rescue_sweeps_many_tokens() {
        let mut fx = setup(100);
        let tokens = fx.tokens.clone();
        let recipient = Address([3u8; 20]);
        fx.switch
            .emergency_shutdown(&mut fx.ledger, fx.controller)
            .unwrap();
        fx.ledger.take_events();
        fx.pool
            .rescue_erc20(&mut fx.ledger, fx.controller, &tokens, recipient)
            .unwrap();
        for token in &tokens {
            assert_eq!(
                fx.ledger.balance_of(token, &recipient).unwrap(),
                TokenAmount(1_000)
            );
            assert_eq!(fx.pool.balance(&fx.ledger, token).unwrap(), TokenAmount::ZERO);
        }
        let transfers = fx
            .ledger
            .events()
            .iter()
            .filter(|entry| matches!(entry.event, Event::Transfer { .. }))
            .count();
        assert_eq!(transfers, 100);
    }
}

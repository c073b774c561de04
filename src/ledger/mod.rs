//! Ordered execution environment every component runs against.
//!
//! The ledger owns the clock, the chain id, address allocation, the code
//! registry used to tell key-pair accounts from programmable ones, every
//! token account, and the event log. Calls are applied one at a time, so
//! there is no interleaving to guard against.

mod events;
mod token;

pub use events::{Event, LogEntry};
pub use token::{TokenAccount, TokenKind};

use crate::crypto::keccak256;
use crate::error::{Error, TokenError};
use crate::types::{Address, Timestamp, TokenAmount};
use crate::wallet::{SignatureValidator, SmartWallet};
use std::collections::HashMap;

/// What lives at an address with code.
#[derive(Debug)]
enum Code {
    /// Component implemented in this crate (vault, engine, pool, factory, switch).
    Contract(&'static str),
    /// Account able to validate signatures for itself.
    Validator(Box<dyn SignatureValidator>),
}

/// In-memory ledger.
#[derive(Debug)]
pub struct Ledger {
    chain_id: u64,
    now: Timestamp,
    nonces: HashMap<Address, u64>,
    code: HashMap<Address, Code>,
    tokens: HashMap<Address, TokenAccount>,
    log: Vec<LogEntry>,
}

impl Ledger {
    /// Creates an empty ledger at `genesis` time.
    pub fn new(chain_id: u64, genesis: Timestamp) -> Self {
        Self {
            chain_id,
            now: genesis,
            nonces: HashMap::new(),
            code: HashMap::new(),
            tokens: HashMap::new(),
            log: Vec::new(),
        }
    }

    // ---------------------------------------------------------------------
    // Clock
    // ---------------------------------------------------------------------

    /// Chain id bound into permission signatures.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Current ledger time.
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Moves the clock forward by `seconds`.
    pub fn advance(&mut self, seconds: u64) {
        self.now = self.now.saturating_add(seconds);
    }

    /// Moves the clock to `timestamp`; time never runs backwards.
    pub fn warp_to(&mut self, timestamp: Timestamp) -> Result<(), Error> {
        if timestamp < self.now {
            return Err(Error::TimestampTooEarly);
        }
        self.now = timestamp;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Addresses and code
    // ---------------------------------------------------------------------

    /// Allocates the next sequential address for `deployer` and marks it as
    /// a crate component of kind `label`.
    pub fn deploy_contract(&mut self, deployer: Address, label: &'static str) -> Address {
        let address = self.next_address(deployer);
        self.code.insert(address, Code::Contract(label));
        address
    }

    /// Allocates a salted address for `deployer`; fails if already taken.
    pub fn deploy_contract_salted(
        &mut self,
        deployer: Address,
        salt: [u8; 32],
        label: &'static str,
    ) -> Result<Address, Error> {
        let mut preimage = Vec::with_capacity(1 + 20 + 32 + label.len());
        preimage.push(0xff);
        preimage.extend_from_slice(deployer.as_bytes());
        preimage.extend_from_slice(&salt);
        preimage.extend_from_slice(label.as_bytes());
        let address = Address::from_word(&keccak256(&preimage));
        if self.has_code(&address) {
            return Err(Error::AddressInUse(address));
        }
        self.code.insert(address, Code::Contract(label));
        Ok(address)
    }

    /// Deploys a programmable account.
    pub fn deploy_validator(
        &mut self,
        deployer: Address,
        validator: Box<dyn SignatureValidator>,
    ) -> Address {
        let address = self.next_address(deployer);
        self.code.insert(address, Code::Validator(validator));
        address
    }

    /// Deploys a [`SmartWallet`] controlled by `signer`.
    pub fn deploy_wallet(&mut self, deployer: Address, signer: Address) -> Address {
        self.deploy_validator(deployer, Box::new(SmartWallet::new(signer)))
    }

    fn next_address(&mut self, deployer: Address) -> Address {
        let nonce = self.nonces.entry(deployer).or_insert(0);
        let mut preimage = Vec::with_capacity(28);
        preimage.extend_from_slice(deployer.as_bytes());
        preimage.extend_from_slice(&nonce.to_be_bytes());
        *nonce += 1;
        Address::from_word(&keccak256(&preimage))
    }

    /// Returns true when `address` holds code of any kind.
    pub fn has_code(&self, address: &Address) -> bool {
        self.code.contains_key(address) || self.tokens.contains_key(address)
    }

    /// Label of a crate component deployed at `address`.
    pub fn contract_label(&self, address: &Address) -> Option<&'static str> {
        match self.code.get(address) {
            Some(Code::Contract(label)) => Some(*label),
            _ => None,
        }
    }

    /// Signature-validation capability of `address`, if it has one.
    pub fn signature_validator(&self, address: &Address) -> Option<&dyn SignatureValidator> {
        match self.code.get(address) {
            Some(Code::Validator(validator)) => Some(validator.as_ref()),
            _ => None,
        }
    }

    // ---------------------------------------------------------------------
    // Tokens
    // ---------------------------------------------------------------------

    /// Deploys a token minting `initial_supply` to `deployer`.
    pub fn deploy_token(
        &mut self,
        deployer: Address,
        symbol: &str,
        kind: TokenKind,
        initial_supply: TokenAmount,
    ) -> Result<Address, Error> {
        let account = TokenAccount::new(symbol, kind, initial_supply, deployer)?;
        let address = self.next_address(deployer);
        self.tokens.insert(address, account);
        self.emit(
            address,
            Event::Transfer {
                token: address,
                from: Address::ZERO,
                to: deployer,
                amount: initial_supply,
            },
        );
        Ok(address)
    }

    /// Token account at `token`.
    pub fn token(&self, token: &Address) -> Result<&TokenAccount, TokenError> {
        self.tokens
            .get(token)
            .ok_or(TokenError::UnknownToken(*token))
    }

    fn token_mut(&mut self, token: &Address) -> Result<&mut TokenAccount, TokenError> {
        self.tokens
            .get_mut(token)
            .ok_or(TokenError::UnknownToken(*token))
    }

    /// Balance of `holder` in `token`.
    pub fn balance_of(&self, token: &Address, holder: &Address) -> Result<TokenAmount, Error> {
        Ok(self.token(token)?.balance_of(holder))
    }

    /// Current supply of `token`.
    pub fn total_supply(&self, token: &Address) -> Result<TokenAmount, Error> {
        Ok(self.token(token)?.total_supply())
    }

    /// Transfers `amount` of `token` from `from` (the acting account) to `to`.
    pub fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: TokenAmount,
    ) -> Result<(), Error> {
        self.token_mut(&token)?.transfer(from, to, amount)?;
        self.emit(
            token,
            Event::Transfer {
                token,
                from,
                to,
                amount,
            },
        );
        Ok(())
    }

    /// Sets `spender`'s allowance over `owner`'s `token` balance.
    pub fn approve(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: TokenAmount,
    ) -> Result<(), Error> {
        self.token_mut(&token)?.approve(owner, spender, amount);
        self.emit(
            token,
            Event::Approval {
                token,
                owner,
                spender,
                amount,
            },
        );
        Ok(())
    }

    /// Remaining allowance.
    pub fn allowance(
        &self,
        token: &Address,
        owner: &Address,
        spender: &Address,
    ) -> Result<TokenAmount, Error> {
        Ok(self.token(token)?.allowance(owner, spender))
    }

    /// Moves `amount` from `from` to `to` using `spender`'s allowance.
    pub fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: TokenAmount,
    ) -> Result<(), Error> {
        self.token_mut(&token)?
            .transfer_from(spender, from, to, amount)?;
        self.emit(
            token,
            Event::Transfer {
                token,
                from,
                to,
                amount,
            },
        );
        Ok(())
    }

    /// Rebases an elastic token; only its supply controller may call.
    pub fn rebase(
        &mut self,
        token: Address,
        caller: Address,
        new_supply: TokenAmount,
    ) -> Result<(), Error> {
        self.token_mut(&token)?.rebase(caller, new_supply)?;
        self.emit(
            token,
            Event::Rebase {
                token,
                total_supply: new_supply,
            },
        );
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------------

    /// Appends an event to the log.
    pub fn emit(&mut self, emitter: Address, event: Event) {
        self.log.push(LogEntry {
            emitter,
            timestamp: self.now,
            event,
        });
    }

    /// Every event emitted so far.
    pub fn events(&self) -> &[LogEntry] {
        &self.log
    }

    /// Drains and returns the event log.
    pub fn take_events(&mut self) -> Vec<LogEntry> {
        std::mem::take(&mut self.log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addresses_are_unique_per_deployer_nonce() {
        let mut ledger = Ledger::new(1, 0);
        let deployer = Address([1u8; 20]);
        let a = ledger.deploy_contract(deployer, "vault");
        let b = ledger.deploy_contract(deployer, "vault");
        assert_ne!(a, b);
        assert!(ledger.has_code(&a));
        assert_eq!(ledger.contract_label(&b), Some("vault"));
        assert!(!ledger.has_code(&deployer));
    }

    #[test]
    fn test_salted_address_collides() {
        let mut ledger = Ledger::new(1, 0);
        let deployer = Address([2u8; 20]);
        let salt = [9u8; 32];
        let first = ledger.deploy_contract_salted(deployer, salt, "vault").unwrap();
        assert_eq!(
            ledger.deploy_contract_salted(deployer, salt, "vault"),
            Err(Error::AddressInUse(first))
        );
    }

    #[test]
    fn test_clock_is_monotonic() {
        let mut ledger = Ledger::new(1, 100);
        ledger.advance(50);
        assert_eq!(ledger.now(), 150);
        assert_eq!(ledger.warp_to(10), Err(Error::TimestampTooEarly));
        ledger.warp_to(200).unwrap();
        assert_eq!(ledger.now(), 200);
    }

    #[test]
    fn test_token_transfer_emits_event() {
        let mut ledger = Ledger::new(1, 0);
        let alice = Address([3u8; 20]);
        let bob = Address([4u8; 20]);
        let token = ledger
            .deploy_token(alice, "STK", TokenKind::Fixed, TokenAmount(100))
            .unwrap();
        ledger.take_events();
        ledger.transfer(token, alice, bob, TokenAmount(30)).unwrap();
        assert_eq!(ledger.balance_of(&token, &bob).unwrap(), TokenAmount(30));
        assert_eq!(ledger.events().len(), 1);
        assert!(matches!(
            ledger.events()[0].event,
            Event::Transfer { amount: TokenAmount(30), .. }
        ));
    }
}

//! Token accounts held by the ledger: fixed supply and gon-based elastic supply.

use crate::error::TokenError;
use crate::types::{Address, TokenAmount};
use std::collections::HashMap;

/// Supply model of a token account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Balances never change out-of-band.
    Fixed,
    /// Balances scale with supply rebases triggered by the supply controller.
    Elastic,
}

#[derive(Debug, Clone)]
enum Supply {
    Fixed,
    Elastic {
        controller: Address,
        total_gons: u128,
        gons_per_unit: u128,
    },
}

/// A single token account: balances, allowances and supply.
#[derive(Debug, Clone)]
pub struct TokenAccount {
    symbol: String,
    supply: Supply,
    total_supply: u128,
    // Raw units for fixed tokens, gons for elastic tokens.
    balances: HashMap<Address, u128>,
    allowances: HashMap<(Address, Address), u128>,
}

impl TokenAccount {
    /// Mints `initial_supply` to `holder`; for elastic tokens `holder` is also
    /// the supply controller.
    pub fn new(
        symbol: &str,
        kind: TokenKind,
        initial_supply: TokenAmount,
        holder: Address,
    ) -> Result<Self, TokenError> {
        if initial_supply.is_zero() {
            return Err(TokenError::ZeroSupply);
        }
        let supply_raw = initial_supply.0;
        let (supply, holder_units) = match kind {
            TokenKind::Fixed => (Supply::Fixed, supply_raw),
            TokenKind::Elastic => {
                let total_gons = u128::MAX - (u128::MAX % supply_raw);
                (
                    Supply::Elastic {
                        controller: holder,
                        total_gons,
                        gons_per_unit: total_gons / supply_raw,
                    },
                    total_gons,
                )
            }
        };
        let mut balances = HashMap::new();
        balances.insert(holder, holder_units);
        Ok(Self {
            symbol: symbol.to_string(),
            supply,
            total_supply: supply_raw,
            balances,
            allowances: HashMap::new(),
        })
    }

    /// Ticker.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Supply model.
    pub fn kind(&self) -> TokenKind {
        match self.supply {
            Supply::Fixed => TokenKind::Fixed,
            Supply::Elastic { .. } => TokenKind::Elastic,
        }
    }

    /// Current total supply.
    pub fn total_supply(&self) -> TokenAmount {
        TokenAmount(self.total_supply)
    }

    fn units_per_token(&self) -> u128 {
        match self.supply {
            Supply::Fixed => 1,
            Supply::Elastic { gons_per_unit, .. } => gons_per_unit,
        }
    }

    /// Balance of `holder` in raw token units.
    pub fn balance_of(&self, holder: &Address) -> TokenAmount {
        let units = self.balances.get(holder).copied().unwrap_or(0);
        TokenAmount(units / self.units_per_token())
    }

    /// Remaining allowance of `spender` over `owner`'s balance.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> TokenAmount {
        TokenAmount(
            self.allowances
                .get(&(*owner, *spender))
                .copied()
                .unwrap_or(0),
        )
    }

    /// Sets the allowance of `spender` over `owner`'s balance.
    pub fn approve(&mut self, owner: Address, spender: Address, amount: TokenAmount) {
        self.allowances.insert((owner, spender), amount.0);
    }

    /// Moves `amount` raw units from `from` to `to`.
    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: TokenAmount,
    ) -> Result<(), TokenError> {
        let balance = self.balance_of(&from);
        if balance < amount {
            return Err(TokenError::InsufficientBalance {
                balance,
                needed: amount,
            });
        }
        let units = amount
            .0
            .checked_mul(self.units_per_token())
            .ok_or(TokenError::Overflow)?;
        let from_units = self.balances.get(&from).copied().unwrap_or(0);
        let to_units = self.balances.get(&to).copied().unwrap_or(0);
        if from == to {
            return Ok(());
        }
        let to_after = to_units.checked_add(units).ok_or(TokenError::Overflow)?;
        self.balances.insert(from, from_units - units);
        self.balances.insert(to, to_after);
        Ok(())
    }

    /// Moves `amount` from `from` to `to` on behalf of `spender`, consuming allowance.
    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: TokenAmount,
    ) -> Result<(), TokenError> {
        let allowance = self.allowance(&from, &spender);
        if allowance < amount {
            return Err(TokenError::InsufficientAllowance {
                allowance,
                needed: amount,
            });
        }
        self.transfer(from, to, amount)?;
        self.allowances
            .insert((from, spender), allowance.0 - amount.0);
        Ok(())
    }

    /// Changes the elastic supply; every balance scales proportionally.
    pub fn rebase(&mut self, caller: Address, new_supply: TokenAmount) -> Result<(), TokenError> {
        match &mut self.supply {
            Supply::Fixed => Err(TokenError::NotElastic),
            Supply::Elastic {
                controller,
                total_gons,
                gons_per_unit,
            } => {
                if caller != *controller {
                    return Err(TokenError::UnauthorizedRebase);
                }
                if new_supply.is_zero() {
                    return Err(TokenError::ZeroSupply);
                }
                if new_supply.0 > *total_gons {
                    return Err(TokenError::Overflow);
                }
                *gons_per_unit = *total_gons / new_supply.0;
                self.total_supply = new_supply.0;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address([byte; 20])
    }

    #[test]
    fn test_fixed_transfer_and_allowance() {
        let mut token = TokenAccount::new("STK", TokenKind::Fixed, TokenAmount(1_000), addr(1)).unwrap();
        token.transfer(addr(1), addr(2), TokenAmount(400)).unwrap();
        assert_eq!(token.balance_of(&addr(2)), TokenAmount(400));
        assert!(matches!(
            token.transfer(addr(2), addr(3), TokenAmount(401)),
            Err(TokenError::InsufficientBalance { .. })
        ));
        assert!(matches!(
            token.transfer_from(addr(9), addr(1), addr(3), TokenAmount(1)),
            Err(TokenError::InsufficientAllowance { .. })
        ));
        token.approve(addr(1), addr(9), TokenAmount(50));
        token.transfer_from(addr(9), addr(1), addr(3), TokenAmount(50)).unwrap();
        assert_eq!(token.allowance(&addr(1), &addr(9)), TokenAmount::ZERO);
        assert_eq!(token.balance_of(&addr(3)), TokenAmount(50));
    }

    #[test]
    fn test_elastic_rebase_scales_balances() {
        let supply = TokenAmount(1_000_000_000_000_000);
        let mut token = TokenAccount::new("AMPL", TokenKind::Elastic, supply, addr(1)).unwrap();
        token.transfer(addr(1), addr(2), TokenAmount(250_000_000_000_000)).unwrap();
        token.rebase(addr(1), TokenAmount(2_000_000_000_000_000)).unwrap();
        assert_eq!(token.balance_of(&addr(2)), TokenAmount(500_000_000_000_000));
        token.rebase(addr(1), TokenAmount(500_000_000_000_000)).unwrap();
        assert_eq!(token.balance_of(&addr(2)), TokenAmount(125_000_000_000_000));
        assert_eq!(
            token.rebase(addr(2), TokenAmount(1)),
            Err(TokenError::UnauthorizedRebase)
        );
    }

    #[test]
    fn test_fixed_token_cannot_rebase() {
        let mut token = TokenAccount::new("STK", TokenKind::Fixed, TokenAmount(10), addr(1)).unwrap();
        assert_eq!(token.rebase(addr(1), TokenAmount(20)), Err(TokenError::NotElastic));
    }
}

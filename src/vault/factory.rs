use super::UniversalVault;
use crate::error::Error;
use crate::ledger::{Event, Ledger};
use crate::types::Address;
use log::info;
use std::collections::HashMap;

const VAULT_LABEL: &str = "universal_vault";

/// Mints vaults and tracks their ownership tokens.
///
/// The factory is the only way to obtain a [`UniversalVault`], so a vault's
/// [`nft`](UniversalVault::nft) always names the factory that minted it.
#[derive(Debug)]
pub struct VaultFactory {
    address: Address,
    vaults: HashMap<Address, UniversalVault>,
    instances: Vec<Address>,
}

impl VaultFactory {
    /// Deploys an empty factory.
    pub fn deploy(ledger: &mut Ledger, deployer: Address) -> Self {
        Self {
            address: ledger.deploy_contract(deployer, "vault_factory"),
            vaults: HashMap::new(),
            instances: Vec::new(),
        }
    }

    /// Identity of the factory.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Mints a vault owned by `caller`.
    pub fn create(&mut self, ledger: &mut Ledger, caller: Address) -> Result<Address, Error> {
        let vault = ledger.deploy_contract(self.address, VAULT_LABEL);
        Ok(self.register(ledger, vault, caller))
    }

    /// Mints a vault owned by `caller` at an address fixed by `salt`.
    pub fn create2(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        salt: [u8; 32],
    ) -> Result<Address, Error> {
        let vault = ledger.deploy_contract_salted(self.address, salt, VAULT_LABEL)?;
        Ok(self.register(ledger, vault, caller))
    }

    fn register(&mut self, ledger: &mut Ledger, vault: Address, owner: Address) -> Address {
        self.vaults
            .insert(vault, UniversalVault::new(vault, self.address, owner));
        self.instances.push(vault);
        ledger.emit(self.address, Event::VaultCreated { vault, owner });
        info!(
            "QSYS|mod=FACTORY|evt=CREATE|factory={} vault={} owner={}",
            self.address, vault, owner
        );
        vault
    }

    /// Returns true when `vault` was minted here.
    pub fn is_instance(&self, vault: &Address) -> bool {
        self.vaults.contains_key(vault)
    }

    /// Number of vaults minted.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Vault minted `index`-th, if any.
    pub fn instance_at(&self, index: usize) -> Option<Address> {
        self.instances.get(index).copied()
    }

    /// Vault at `address`.
    pub fn vault(&self, address: &Address) -> Result<&UniversalVault, Error> {
        self.vaults
            .get(address)
            .ok_or(Error::UnknownVault(*address))
    }

    /// Mutable vault at `address`.
    pub fn vault_mut(&mut self, address: &Address) -> Result<&mut UniversalVault, Error> {
        self.vaults
            .get_mut(address)
            .ok_or(Error::UnknownVault(*address))
    }

    /// Owner of the vault's ownership token.
    pub fn owner_of(&self, vault: &Address) -> Result<Address, Error> {
        Ok(self.vault(vault)?.owner())
    }

    /// Moves ownership of `vault` from `from` to `to`; locks stay in place.
    pub fn transfer_from(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        from: Address,
        to: Address,
        vault: Address,
    ) -> Result<(), Error> {
        let factory = self.address;
        let entry = self.vault_mut(&vault)?;
        if caller != entry.owner() || from != entry.owner() {
            return Err(Error::NotOwner { caller });
        }
        if to.is_zero() {
            return Err(Error::InvalidAddress);
        }
        entry.set_owner(to);
        ledger.emit(factory, Event::VaultTransferred { vault, from, to });
        info!(
            "QSYS|mod=FACTORY|evt=TRANSFER|vault={} from={} to={}",
            vault, from, to
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_assigns_owner_and_nft() {
        let mut ledger = Ledger::new(1, 0);
        let alice = Address([1u8; 20]);
        let mut factory = VaultFactory::deploy(&mut ledger, alice);
        let vault = factory.create(&mut ledger, alice).unwrap();
        assert!(factory.is_instance(&vault));
        assert_eq!(factory.owner_of(&vault).unwrap(), alice);
        assert_eq!(factory.vault(&vault).unwrap().nft(), factory.address());
        assert_eq!(factory.instance_at(0), Some(vault));
        assert_eq!(factory.instance_count(), 1);
        assert!(ledger.has_code(&vault));
    }

    #[test]
    fn test_create2_is_deterministic_and_unique() {
        let mut ledger = Ledger::new(1, 0);
        let alice = Address([1u8; 20]);
        let mut factory = VaultFactory::deploy(&mut ledger, alice);
        let salt = [7u8; 32];
        let vault = factory.create2(&mut ledger, alice, salt).unwrap();
        assert!(factory.is_instance(&vault));
        assert_eq!(
            factory.create2(&mut ledger, alice, salt),
            Err(Error::AddressInUse(vault))
        );
    }

    #[test]
    fn test_transfer_requires_owner() {
        let mut ledger = Ledger::new(1, 0);
        let alice = Address([1u8; 20]);
        let bob = Address([2u8; 20]);
        let mut factory = VaultFactory::deploy(&mut ledger, alice);
        let vault = factory.create(&mut ledger, alice).unwrap();
        assert_eq!(
            factory.transfer_from(&mut ledger, bob, alice, bob, vault),
            Err(Error::NotOwner { caller: bob })
        );
        factory
            .transfer_from(&mut ledger, alice, alice, bob, vault)
            .unwrap();
        assert_eq!(factory.owner_of(&vault).unwrap(), bob);
        assert!(matches!(
            factory.owner_of(&Address([9u8; 20])),
            Err(Error::UnknownVault(_))
        ));
    }
}

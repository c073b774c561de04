//! Tri-state circuit breaker and the guards components derive from it.

use crate::error::Error;
use crate::ledger::{Event, Ledger};
use crate::types::Address;
use log::info;
use serde::{Deserialize, Serialize};
use std::cell::Cell;

/// Switch position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerStatus {
    /// Everything permitted.
    Online = 0,
    /// Entry points paused; exits still permitted.
    Offline = 1,
    /// Terminal wind-down state.
    Shutdown = 2,
}

/// Circuit breaker shared by an engine and its reward pool.
///
/// Components hold it behind an `Rc`, so state lives in `Cell`s and every
/// transition takes `&self`.
#[derive(Debug)]
pub struct PowerSwitch {
    address: Address,
    controller: Cell<Address>,
    status: Cell<PowerStatus>,
}

impl PowerSwitch {
    /// Deploys a switch in the Online state controlled by `controller`.
    pub fn deploy(ledger: &mut Ledger, deployer: Address, controller: Address) -> Self {
        let address = ledger.deploy_contract(deployer, "power_switch");
        Self {
            address,
            controller: Cell::new(controller),
            status: Cell::new(PowerStatus::Online),
        }
    }

    /// Identity of the switch.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Current controller.
    pub fn controller(&self) -> Address {
        self.controller.get()
    }

    /// Current position.
    pub fn status(&self) -> PowerStatus {
        self.status.get()
    }

    /// Returns true when Online.
    pub fn is_online(&self) -> bool {
        self.status() == PowerStatus::Online
    }

    /// Returns true when Offline.
    pub fn is_offline(&self) -> bool {
        self.status() == PowerStatus::Offline
    }

    /// Returns true when Shutdown.
    pub fn is_shutdown(&self) -> bool {
        self.status() == PowerStatus::Shutdown
    }

    fn only_controller(&self, caller: Address) -> Result<(), Error> {
        if caller != self.controller() {
            return Err(Error::NotController { caller });
        }
        Ok(())
    }

    /// Offline -> Online.
    pub fn power_on(&self, ledger: &mut Ledger, caller: Address) -> Result<(), Error> {
        self.only_controller(caller)?;
        if self.status() != PowerStatus::Offline {
            return Err(Error::CannotPowerOn);
        }
        self.transition(ledger, PowerStatus::Online, Event::PowerOn);
        Ok(())
    }

    /// Online -> Offline.
    pub fn power_off(&self, ledger: &mut Ledger, caller: Address) -> Result<(), Error> {
        self.only_controller(caller)?;
        if self.status() != PowerStatus::Online {
            return Err(Error::CannotPowerOff);
        }
        self.transition(ledger, PowerStatus::Offline, Event::PowerOff);
        Ok(())
    }

    /// Online or Offline -> Shutdown. Irreversible.
    pub fn emergency_shutdown(&self, ledger: &mut Ledger, caller: Address) -> Result<(), Error> {
        self.only_controller(caller)?;
        if self.status() == PowerStatus::Shutdown {
            return Err(Error::CannotShutdown);
        }
        self.transition(ledger, PowerStatus::Shutdown, Event::EmergencyShutdown);
        Ok(())
    }

    /// Hands control of the switch to `new_controller`.
    pub fn transfer_control(
        &self,
        ledger: &mut Ledger,
        caller: Address,
        new_controller: Address,
    ) -> Result<(), Error> {
        self.only_controller(caller)?;
        if new_controller.is_zero() {
            return Err(Error::InvalidAddress);
        }
        self.controller.set(new_controller);
        ledger.emit(
            self.address,
            Event::ControlTransferred {
                previous: caller,
                controller: new_controller,
            },
        );
        info!(
            "QSYS|mod=POWER|evt=CONTROL|switch={} controller={}",
            self.address, new_controller
        );
        Ok(())
    }

    fn transition(&self, ledger: &mut Ledger, next: PowerStatus, event: Event) {
        let previous = self.status.replace(next);
        ledger.emit(self.address, event);
        info!(
            "QSYS|mod=POWER|evt=TRANSITION|switch={} from={:?} to={:?}",
            self.address, previous, next
        );
    }
}

/// Guards for components gated by a [`PowerSwitch`].
pub trait Powered {
    /// The switch gating this component.
    fn power_switch(&self) -> &PowerSwitch;

    /// Controller of the gating switch.
    fn power_controller(&self) -> Address {
        self.power_switch().controller()
    }

    /// Requires Online.
    fn only_online(&self) -> Result<(), Error> {
        if !self.power_switch().is_online() {
            return Err(Error::NotOnline);
        }
        Ok(())
    }

    /// Requires Offline.
    fn only_offline(&self) -> Result<(), Error> {
        if !self.power_switch().is_offline() {
            return Err(Error::NotOffline);
        }
        Ok(())
    }

    /// Requires Online or Offline.
    fn not_shutdown(&self) -> Result<(), Error> {
        if self.power_switch().is_shutdown() {
            return Err(Error::IsShutdown);
        }
        Ok(())
    }

    /// Requires Shutdown.
    fn only_shutdown(&self) -> Result<(), Error> {
        if !self.power_switch().is_shutdown() {
            return Err(Error::NotShutdown);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Gated(PowerSwitch);

    impl Powered for Gated {
        fn power_switch(&self) -> &PowerSwitch {
            &self.0
        }
    }

    fn setup() -> (Ledger, PowerSwitch, Address) {
        let mut ledger = Ledger::new(1, 0);
        let admin = Address([1u8; 20]);
        let switch = PowerSwitch::deploy(&mut ledger, admin, admin);
        (ledger, switch, admin)
    }

    #[test]
    fn test_online_allows_only_off_and_shutdown() {
        let (mut ledger, switch, admin) = setup();
        assert_eq!(switch.power_on(&mut ledger, admin), Err(Error::CannotPowerOn));
        switch.power_off(&mut ledger, admin).unwrap();
        assert_eq!(switch.status(), PowerStatus::Offline);
        assert_eq!(switch.power_off(&mut ledger, admin), Err(Error::CannotPowerOff));
        switch.power_on(&mut ledger, admin).unwrap();
        assert!(switch.is_online());
    }

    #[test]
    fn test_shutdown_is_terminal() {
        let (mut ledger, switch, admin) = setup();
        switch.power_off(&mut ledger, admin).unwrap();
        switch.emergency_shutdown(&mut ledger, admin).unwrap();
        assert_eq!(switch.power_on(&mut ledger, admin), Err(Error::CannotPowerOn));
        assert_eq!(switch.power_off(&mut ledger, admin), Err(Error::CannotPowerOff));
        assert_eq!(
            switch.emergency_shutdown(&mut ledger, admin),
            Err(Error::CannotShutdown)
        );
        assert_eq!(switch.status() as u8, 2);
    }

    #[test]
    fn test_only_controller_can_switch() {
        let (mut ledger, switch, admin) = setup();
        let stranger = Address([2u8; 20]);
        assert_eq!(
            switch.power_off(&mut ledger, stranger),
            Err(Error::NotController { caller: stranger })
        );
        switch.transfer_control(&mut ledger, admin, stranger).unwrap();
        switch.emergency_shutdown(&mut ledger, stranger).unwrap();
        assert!(matches!(
            ledger.events().last().map(|entry| &entry.event),
            Some(Event::EmergencyShutdown)
        ));
    }

    #[test]
    fn test_guards_follow_status() {
        let (mut ledger, switch, admin) = setup();
        let gated = Gated(switch);
        assert!(gated.only_online().is_ok());
        assert_eq!(gated.only_offline(), Err(Error::NotOffline));
        assert_eq!(gated.only_shutdown(), Err(Error::NotShutdown));
        gated.0.power_off(&mut ledger, admin).unwrap();
        assert_eq!(gated.only_online(), Err(Error::NotOnline));
        assert!(gated.not_shutdown().is_ok());
        gated.0.emergency_shutdown(&mut ledger, admin).unwrap();
        assert_eq!(gated.not_shutdown(), Err(Error::IsShutdown));
        assert!(gated.only_shutdown().is_ok());
        assert_eq!(gated.power_controller(), admin);
    }
}

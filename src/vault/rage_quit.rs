//! Bounded, failure-swallowing notification of a delegate whose lock is
//! being forcibly removed.

use crate::error::CallError;
use crate::ledger::Ledger;
use crate::types::Address;
use std::fmt;

/// Maximum budget forwarded to the delegate.
pub const RAGE_QUIT_GAS: u64 = 500_000;

/// Budget kept back so lock deletion always completes. Callers must supply
/// at least this much.
pub const RAGE_QUIT_RESERVE_GAS: u64 = 50_000;

/// Execution budget handed to a delegate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasMeter {
    limit: u64,
    used: u64,
}

impl GasMeter {
    /// Meter with `limit` units available.
    pub fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    /// Consumes `amount`; fails once the limit would be exceeded.
    pub fn charge(&mut self, amount: u64) -> Result<(), CallError> {
        let next = self.used.checked_add(amount).ok_or(CallError::OutOfGas)?;
        if next > self.limit {
            self.used = self.limit;
            return Err(CallError::OutOfGas);
        }
        self.used = next;
        Ok(())
    }

    /// Units left.
    pub fn remaining(&self) -> u64 {
        self.limit - self.used
    }

    /// Units consumed.
    pub fn used(&self) -> u64 {
        self.used
    }
}

/// A delegate able to react when a vault owner rage-quits its lock.
///
/// Implementations must leave their state untouched when returning `Err`.
pub trait RageQuit {
    /// Identity the delegate locks under.
    fn address(&self) -> Address;

    /// Reacts to `vault` forcibly dropping this delegate's lock.
    fn rage_quit(
        &mut self,
        ledger: &mut Ledger,
        vault: Address,
        meter: &mut GasMeter,
    ) -> Result<(), CallError>;
}

/// The delegate named in a rage quit.
pub enum DelegateRef<'a> {
    /// Key-pair account; nothing to notify.
    Account(Address),
    /// Programmable delegate to notify.
    Contract(&'a mut dyn RageQuit),
}

impl DelegateRef<'_> {
    /// Address of the delegate.
    pub fn address(&self) -> Address {
        match self {
            DelegateRef::Account(address) => *address,
            DelegateRef::Contract(callee) => callee.address(),
        }
    }
}

impl fmt::Debug for DelegateRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelegateRef::Account(address) => f.debug_tuple("Account").field(address).finish(),
            DelegateRef::Contract(callee) => {
                f.debug_tuple("Contract").field(&callee.address()).finish()
            }
        }
    }
}

/// Result of the forwarded notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// Delegate handled the notification.
    Success,
    /// Delegate rejected it, optionally with a reason.
    Reverted(Option<String>),
    /// Forwarded budget ran out.
    OutOfBudget,
    /// Delegate has no code; nothing ran.
    NoCode,
}

impl CallOutcome {
    /// Whether the delegate was notified successfully.
    pub fn notified(&self) -> bool {
        matches!(self, CallOutcome::Success)
    }

    /// Revert reason, empty when there is none.
    pub fn reason(&self) -> String {
        match self {
            CallOutcome::Reverted(Some(reason)) => reason.clone(),
            _ => String::new(),
        }
    }
}

/// Outcome of a completed rage quit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RageQuitReport {
    /// Whether the delegate was notified successfully.
    pub notified: bool,
    /// Revert reason, empty when notified, out of budget or without code.
    pub error: String,
    /// Tagged call result.
    pub outcome: CallOutcome,
}

impl From<CallOutcome> for RageQuitReport {
    fn from(outcome: CallOutcome) -> Self {
        Self {
            notified: outcome.notified(),
            error: outcome.reason(),
            outcome,
        }
    }
}

/// Invokes `callee` with `budget` and converts every failure into a tag.
pub fn call_with_budget(
    ledger: &mut Ledger,
    callee: &mut dyn RageQuit,
    vault: Address,
    budget: u64,
) -> CallOutcome {
    let mut meter = GasMeter::new(budget);
    match callee.rage_quit(ledger, vault, &mut meter) {
        Ok(()) => CallOutcome::Success,
        Err(CallError::Reverted(reason)) => CallOutcome::Reverted(reason),
        Err(CallError::OutOfGas) => CallOutcome::OutOfBudget,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meter_stops_at_limit() {
        let mut meter = GasMeter::new(100);
        meter.charge(60).unwrap();
        assert_eq!(meter.remaining(), 40);
        assert_eq!(meter.charge(41), Err(CallError::OutOfGas));
        assert_eq!(meter.remaining(), 0);
    }

    #[test]
    fn test_report_flags() {
        let report = RageQuitReport::from(CallOutcome::Reverted(Some("nope".into())));
        assert!(!report.notified);
        assert_eq!(report.error, "nope");
        let report = RageQuitReport::from(CallOutcome::OutOfBudget);
        assert!(!report.notified);
        assert!(report.error.is_empty());
        assert!(RageQuitReport::from(CallOutcome::Success).notified);
    }
}

//! Per-node energy ledger.
//!
//! Energy only ever decreases. Crossing zero clamps the balance and marks
//! the node permanently inert; the owning node then runs its depletion
//! bookkeeping exactly once and refuses all further work.

use serde::{Deserialize, Serialize};

use crate::config::EnergyCosts;

/// The kind of action being charged for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Transmit a data packet.
    TxData,
    /// Receive a data packet.
    RxData,
    /// Transmit a control packet.
    TxControl,
    /// Receive a control packet.
    RxControl,
    /// One decision-module invocation.
    Decision,
    /// One LIA read or write.
    Learning,
}

impl EnergyCosts {
    /// Fixed cost for an action kind.
    pub fn cost(&self, kind: ActionKind) -> f64 {
        match kind {
            ActionKind::TxData => self.tx_data,
            ActionKind::RxData => self.rx_data,
            ActionKind::TxControl => self.tx_control,
            ActionKind::RxControl => self.rx_control,
            ActionKind::Decision => self.decision,
            ActionKind::Learning => self.learning,
        }
    }
}

/// Result of charging the meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charge {
    /// Cost deducted, node still alive.
    Applied,
    /// This charge crossed zero; the node just became inert.
    Depleted,
    /// The node was already inert; nothing happened.
    Ignored,
}

/// Energy balance and liveness for one node.
#[derive(Debug, Clone)]
pub struct EnergyMeter {
    balance: f64,
    alive: bool,
}

impl EnergyMeter {
    /// Create a meter with the given starting balance.
    pub fn new(initial: f64) -> Self {
        Self {
            balance: initial,
            alive: initial > 0.0,
        }
    }

    /// Remaining energy, clamped at zero.
    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// Whether the node can still act.
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Deduct `amount`. No-op on an inert node.
    pub fn charge(&mut self, amount: f64) -> Charge {
        if !self.alive {
            return Charge::Ignored;
        }
        self.balance -= amount;
        if self.balance <= 0.0 {
            self.balance = 0.0;
            self.alive = false;
            return Charge::Depleted;
        }
        Charge::Applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charge_deducts() {
        let mut meter = EnergyMeter::new(1.0);
        assert_eq!(meter.charge(0.3), Charge::Applied);
        assert!((meter.balance() - 0.7).abs() < 1e-12);
        assert!(meter.is_alive());
    }

    #[test]
    fn test_depletion_clamps_and_kills() {
        let mut meter = EnergyMeter::new(0.5);
        assert_eq!(meter.charge(0.7), Charge::Depleted);
        assert_eq!(meter.balance(), 0.0);
        assert!(!meter.is_alive());
    }

    #[test]
    fn test_dead_meter_ignores_charges() {
        let mut meter = EnergyMeter::new(0.1);
        assert_eq!(meter.charge(0.1), Charge::Depleted);
        assert_eq!(meter.charge(0.5), Charge::Ignored);
        assert_eq!(meter.balance(), 0.0);
    }

    #[test]
    fn test_energy_monotone_non_increasing() {
        let mut meter = EnergyMeter::new(10.0);
        let mut prev = meter.balance();
        for _ in 0..100 {
            meter.charge(0.3);
            assert!(meter.balance() <= prev);
            assert!(meter.balance() >= 0.0);
            prev = meter.balance();
        }
    }

    #[test]
    fn test_action_kind_costs() {
        let costs = EnergyCosts::default();
        assert_eq!(costs.cost(ActionKind::TxData), 0.05);
        assert_eq!(costs.cost(ActionKind::RxControl), 0.005);
        assert_eq!(costs.cost(ActionKind::Learning), 0.0005);
    }
}

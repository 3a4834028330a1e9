//! Metrics collection for simulation analysis.
//!
//! `SimMetrics` is the concrete write-only sink the nodes feed through
//! [`StatsSink`]. Every map is a `BTreeMap` so the serialized form is
//! byte-identical across runs with the same seed.

use std::collections::BTreeMap;

use desist::{DropCause, Duration, NodeId, Outcome, PacketKind, StatsSink};
use serde::Serialize;

/// Cooperate / defect counters for one observer-neighbor pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    /// Observed cooperations.
    pub cooperate: u64,
    /// Observed defections.
    pub defect: u64,
}

/// Outcome counters for a decision module at one node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChoiceTally {
    /// Decisions that picked nobody.
    pub held: u64,
    /// Decisions per chosen neighbor.
    pub chosen: BTreeMap<NodeId, u64>,
}

impl ChoiceTally {
    fn record(&mut self, choice: Option<NodeId>) {
        match choice {
            Some(id) => *self.chosen.entry(id).or_default() += 1,
            None => self.held += 1,
        }
    }

    /// Total decisions recorded.
    pub fn total(&self) -> u64 {
        self.held + self.chosen.values().sum::<u64>()
    }
}

/// Aggregated statistics for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimMetrics {
    /// Data packets generated, per origin.
    pub generated: BTreeMap<NodeId, u64>,
    /// Data packets that reached their destination.
    pub delivered: u64,
    /// Data packets dropped, per attributed cause.
    pub drops: BTreeMap<DropCause, u64>,
    /// Sum of end-to-end delivery delays.
    pub total_delay: Duration,
    /// Latest energy balance per node.
    pub energy: BTreeMap<NodeId, f64>,
    /// Parent adoptions that changed the parent, per node.
    pub parent_changes: BTreeMap<NodeId, u64>,
    /// Watchdog outcomes, keyed by observer then observed neighbor.
    pub pfg_outcomes: BTreeMap<NodeId, BTreeMap<NodeId, Tally>>,
    /// Forwarding-game decisions per node.
    pub pfg_choices: BTreeMap<NodeId, ChoiceTally>,
    /// Parent-selection decisions per node.
    pub psg_choices: BTreeMap<NodeId, ChoiceTally>,
    /// Misbehavior reports per reporting node.
    pub reports: BTreeMap<NodeId, u64>,
    /// Link-layer transmissions, keyed by sender then packet kind.
    pub sent: BTreeMap<NodeId, BTreeMap<PacketKind, u64>>,
}

impl SimMetrics {
    /// Create new empty metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total data packets generated across all origins.
    pub fn total_generated(&self) -> u64 {
        self.generated.values().sum()
    }

    /// Total data packets dropped across all causes.
    pub fn total_dropped(&self) -> u64 {
        self.drops.values().sum()
    }

    /// Delivered / generated, or 0 when nothing was generated.
    pub fn delivery_ratio(&self) -> f64 {
        let generated = self.total_generated();
        if generated == 0 {
            return 0.0;
        }
        self.delivered as f64 / generated as f64
    }

    /// Mean end-to-end delay over delivered packets, in time units.
    pub fn average_delay(&self) -> Option<f64> {
        if self.delivered == 0 {
            return None;
        }
        Some(self.total_delay.as_units() / self.delivered as f64)
    }

    /// Nodes whose last energy snapshot was zero.
    pub fn depleted_nodes(&self) -> Vec<NodeId> {
        self.energy
            .iter()
            .filter(|(_, &e)| e == 0.0)
            .map(|(&id, _)| id)
            .collect()
    }
}

impl StatsSink for SimMetrics {
    fn packet_generated(&mut self, node: NodeId) {
        *self.generated.entry(node).or_default() += 1;
    }

    fn packet_delivered(&mut self, delay: Duration) {
        self.delivered += 1;
        self.total_delay += delay;
    }

    fn packet_dropped(&mut self, cause: DropCause) {
        *self.drops.entry(cause).or_default() += 1;
    }

    fn energy_snapshot(&mut self, node: NodeId, remaining: f64) {
        self.energy.insert(node, remaining);
    }

    fn parent_changed(&mut self, node: NodeId) {
        *self.parent_changes.entry(node).or_default() += 1;
    }

    fn pfg_outcome(&mut self, observer: NodeId, neighbor: NodeId, outcome: Outcome) {
        let tally = self
            .pfg_outcomes
            .entry(observer)
            .or_default()
            .entry(neighbor)
            .or_default();
        match outcome {
            Outcome::Cooperate => tally.cooperate += 1,
            Outcome::Defect => tally.defect += 1,
        }
    }

    fn pfg_choice(&mut self, node: NodeId, forwarder: Option<NodeId>) {
        self.pfg_choices.entry(node).or_default().record(forwarder);
    }

    fn psg_choice(&mut self, node: NodeId, parent: Option<NodeId>) {
        self.psg_choices.entry(node).or_default().record(parent);
    }

    fn report_made(&mut self, node: NodeId) {
        *self.reports.entry(node).or_default() += 1;
    }

    fn packet_sent(&mut self, node: NodeId, kind: PacketKind) {
        *self
            .sent
            .entry(node)
            .or_default()
            .entry(kind)
            .or_default() += 1;
    }
}

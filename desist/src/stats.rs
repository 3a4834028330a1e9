//! Statistics aggregation surface.
//!
//! The core writes counters and gauges into a [`StatsSink`] and never reads
//! them back, so no decision can feed on its own reporting. The simulator
//! supplies the concrete implementation.

use crate::time::Duration;
use crate::types::{DropCause, NodeId, Outcome, PacketKind};

/// Write-only sink for run statistics. One method per metric family.
pub trait StatsSink {
    /// A data packet was generated at `node`.
    fn packet_generated(&mut self, node: NodeId);

    /// A data packet reached its destination after `delay`.
    fn packet_delivered(&mut self, delay: Duration);

    /// A data packet was dropped, attributed to `cause`.
    fn packet_dropped(&mut self, cause: DropCause);

    /// `node`'s energy balance after a charge.
    fn energy_snapshot(&mut self, node: NodeId, remaining: f64);

    /// `node` adopted a parent different from its previous one.
    fn parent_changed(&mut self, node: NodeId);

    /// `observer` recorded a forwarding `outcome` for `neighbor`.
    fn pfg_outcome(&mut self, observer: NodeId, neighbor: NodeId, outcome: Outcome);

    /// `node` ran the forwarding game; `forwarder` is `None` on Hold.
    fn pfg_choice(&mut self, node: NodeId, forwarder: Option<NodeId>);

    /// `node` ran the parent-selection game; `parent` is `None` when no
    /// parent qualified.
    fn psg_choice(&mut self, node: NodeId, parent: Option<NodeId>);

    /// `node` decided to report a misbehaving neighbor.
    fn report_made(&mut self, node: NodeId);

    /// `node` transmitted a packet of `kind` to one link-layer target.
    fn packet_sent(&mut self, node: NodeId, kind: PacketKind);
}

/// Sink that discards everything. Useful in unit tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStats;

impl StatsSink for NullStats {
    fn packet_generated(&mut self, _node: NodeId) {}
    fn packet_delivered(&mut self, _delay: Duration) {}
    fn packet_dropped(&mut self, _cause: DropCause) {}
    fn energy_snapshot(&mut self, _node: NodeId, _remaining: f64) {}
    fn parent_changed(&mut self, _node: NodeId) {}
    fn pfg_outcome(&mut self, _observer: NodeId, _neighbor: NodeId, _outcome: Outcome) {}
    fn pfg_choice(&mut self, _node: NodeId, _forwarder: Option<NodeId>) {}
    fn psg_choice(&mut self, _node: NodeId, _parent: Option<NodeId>) {}
    fn report_made(&mut self, _node: NodeId) {}
    fn packet_sent(&mut self, _node: NodeId, _kind: PacketKind) {}
}

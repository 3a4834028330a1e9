//! Core types for the desist protocol.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Node identifier. The sink is always node 0.
pub type NodeId = u16;

/// The sink node's identifier.
pub const SINK_ID: NodeId = 0;

/// A node's advertised distance proxy from the sink.
///
/// `Infinite` means no parent has been adopted yet; any comparison against
/// it resolves as "not yet eligible". Derived `Ord` places `Infinite` after
/// every finite rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    /// A concrete hop-distance proxy from the sink.
    Finite(u32),
    /// No parent adopted yet.
    Infinite,
}

impl Rank {
    /// The sink's rank.
    pub const ROOT: Rank = Rank::Finite(0);

    /// Whether this rank is finite.
    pub fn is_finite(self) -> bool {
        matches!(self, Rank::Finite(_))
    }

    /// The rank a child adopting this rank's owner would take.
    pub fn successor(self) -> Rank {
        match self {
            Rank::Finite(r) => Rank::Finite(r + 1),
            Rank::Infinite => Rank::Infinite,
        }
    }

    /// The rank as a score term for parent evaluation.
    ///
    /// Only meaningful for finite ranks; callers filter `Infinite` out
    /// before scoring.
    pub fn score_value(self) -> f64 {
        match self {
            Rank::Finite(r) => r as f64,
            Rank::Infinite => f64::INFINITY,
        }
    }

    /// Whether the jump between two advertised ranks counts as erratic
    /// (|delta| > 2).
    ///
    /// A one-sided `Infinite` is erratic; `Infinite` against `Infinite` is
    /// not (no movement was observed).
    pub fn erratic_jump(a: Rank, b: Rank) -> bool {
        match (a, b) {
            (Rank::Finite(x), Rank::Finite(y)) => x.abs_diff(y) > 2,
            (Rank::Infinite, Rank::Infinite) => false,
            _ => true,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rank::Finite(r) => write!(f, "{}", r),
            Rank::Infinite => write!(f, "inf"),
        }
    }
}

/// A node's role for the duration of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    /// The DODAG root; rank 0, destination for all data traffic.
    Sink,
    /// Honest participant.
    Benign,
    /// Drops every data packet it is asked to forward.
    Blackhole,
    /// Holds every data packet it is asked to forward, saving energy.
    Selfish,
    /// Advertises a falsified rank and never adopts a parent.
    RankSpoof,
}

impl NodeRole {
    /// Whether this role is one of the attacker variants.
    pub fn is_attacker(self) -> bool {
        matches!(
            self,
            NodeRole::Blackhole | NodeRole::Selfish | NodeRole::RankSpoof
        )
    }
}

/// Observed forwarding outcome for a neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Outcome {
    /// The neighbor delivered or forwarded the packet.
    Cooperate,
    /// The neighbor dropped the packet.
    Defect,
}

/// Why a data packet was dropped, for statistics attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DropCause {
    /// Dropped by a blackhole attacker.
    Blackhole,
    /// Withheld by a selfish attacker.
    Selfish,
    /// Held by the forwarding game, loop guard, or depletion mid-decision.
    Other,
}

/// Packet type on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PacketKind {
    /// Application data, routed toward its destination hop by hop.
    Data,
    /// Rank advertisement, broadcast to all neighbors.
    Advertise,
    /// Delivery acknowledgment (extension point, never emitted).
    Ack,
    /// Misbehavior report sent toward the sink.
    Report,
}

impl PacketKind {
    /// Control packets use the control energy tariff; data uses its own.
    pub fn is_control(self) -> bool {
        !matches!(self, PacketKind::Data)
    }
}

/// Packet identity: origin plus a per-origin sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PacketId {
    /// Node that created the packet.
    pub origin: NodeId,
    /// Origin-local sequence number.
    pub seq: u64,
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.origin, self.seq)
    }
}

/// Final destination of a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Destination {
    /// A specific node.
    Unicast(NodeId),
    /// All neighbors of the sender (advertisements only).
    Broadcast,
}

/// Rank advertisement payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advertisement {
    /// Advertised rank (possibly falsified).
    pub rank: Rank,
    /// Monotonically non-decreasing topology version.
    pub version: u32,
}

/// A simulated packet.
///
/// Identity fields are immutable after creation; only the traversal path
/// grows, one node id per forwarding hop. The path always starts with the
/// originating node.
#[derive(Debug, Clone)]
pub struct Packet {
    /// Packet identity.
    pub id: PacketId,
    /// Packet type.
    pub kind: PacketKind,
    /// Originating node.
    pub source: NodeId,
    /// Final destination.
    pub dest: Destination,
    /// Virtual time of creation.
    pub created_at: Timestamp,
    /// Advertisement payload, present iff `kind == Advertise`.
    pub advert: Option<Advertisement>,
    /// Nodes visited so far, origin first. Append-only.
    pub path: Vec<NodeId>,
}

impl Packet {
    /// Create a data packet addressed to `dest`.
    pub fn data(id: PacketId, source: NodeId, dest: NodeId, now: Timestamp) -> Self {
        Self {
            id,
            kind: PacketKind::Data,
            source,
            dest: Destination::Unicast(dest),
            created_at: now,
            advert: None,
            path: vec![source],
        }
    }

    /// Create a broadcast advertisement.
    pub fn advertise(id: PacketId, source: NodeId, advert: Advertisement, now: Timestamp) -> Self {
        Self {
            id,
            kind: PacketKind::Advertise,
            source,
            dest: Destination::Broadcast,
            created_at: now,
            advert: Some(advert),
            path: vec![source],
        }
    }

    /// Create a misbehavior report addressed to `dest`.
    pub fn report(id: PacketId, source: NodeId, dest: NodeId, now: Timestamp) -> Self {
        Self {
            id,
            kind: PacketKind::Report,
            source,
            dest: Destination::Unicast(dest),
            created_at: now,
            advert: None,
            path: vec![source],
        }
    }

    /// Whether `node` already appears in the traversal path.
    pub fn visited(&self, node: NodeId) -> bool {
        self.path.contains(&node)
    }

    /// Record a forwarding hop.
    pub fn record_hop(&mut self, node: NodeId) {
        self.path.push(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_ordering() {
        assert!(Rank::Finite(0) < Rank::Finite(1));
        assert!(Rank::Finite(u32::MAX) < Rank::Infinite);
        assert_eq!(Rank::ROOT.successor(), Rank::Finite(1));
    }

    #[test]
    fn test_rank_erratic_jump() {
        assert!(!Rank::erratic_jump(Rank::Finite(3), Rank::Finite(5)));
        assert!(Rank::erratic_jump(Rank::Finite(3), Rank::Finite(6)));
        assert!(Rank::erratic_jump(Rank::Finite(3), Rank::Infinite));
        assert!(!Rank::erratic_jump(Rank::Infinite, Rank::Infinite));
    }

    #[test]
    fn test_packet_path_starts_with_origin() {
        let now = Timestamp::ZERO;
        let mut pkt = Packet::data(PacketId { origin: 3, seq: 0 }, 3, SINK_ID, now);
        assert_eq!(pkt.path, vec![3]);
        assert!(pkt.visited(3));
        pkt.record_hop(7);
        assert_eq!(pkt.path, vec![3, 7]);
    }

    #[test]
    fn test_packet_kind_tariff() {
        assert!(!PacketKind::Data.is_control());
        assert!(PacketKind::Advertise.is_control());
        assert!(PacketKind::Report.is_control());
    }
}

//! Node state machine.
//!
//! A `Node` holds everything one device knows: routing state, energy,
//! learned neighbor statistics, and a queue of outgoing transmissions. It
//! never touches another node directly; the simulator drives it through
//! `handle_timer` / `handle_delivery` / `generate_data` with explicit time
//! and drains `take_outgoing` after every callback.
//!
//! Death is a flag, not an exception: once energy crosses zero the node
//! runs its shutdown bookkeeping and every later entry point returns
//! immediately, so inbound deliveries to a dead node are silently dropped.

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{EnergyCosts, IrgParams, PfgPayoffs, PsgWeights, SimConfig};
use crate::energy::{ActionKind, Charge, EnergyMeter};
use crate::games::{self, ForwardAction, ParentCandidate};
use crate::lia::LiaTable;
use crate::stats::StatsSink;
use crate::time::{Duration, Timestamp};
use crate::types::{
    Advertisement, Destination, DropCause, NodeId, NodeRole, Outcome, Packet, PacketId,
    PacketKind, Rank,
};

/// A packet queued for transmission with its link-layer target.
///
/// The target is the next hop; the packet's own destination is end-to-end.
#[derive(Debug, Clone)]
pub struct Transmission {
    /// Next-hop target.
    pub target: Destination,
    /// The packet to transmit.
    pub packet: Packet,
}

/// What a node did with a data packet it handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataDisposition {
    /// This node was the destination.
    Delivered,
    /// Handed to the chosen next hop.
    Forwarded(NodeId),
    /// Dropped, with the attributed cause.
    Dropped(DropCause),
}

/// One simulated device.
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    role: NodeRole,
    position: (f64, f64),
    energy: EnergyMeter,
    costs: EnergyCosts,
    pfg: PfgPayoffs,
    psg: PsgWeights,
    irg: IrgParams,
    link_quality_dbm: (f64, f64),
    parent: Option<NodeId>,
    rank: Rank,
    version: u32,
    adv_interval: Duration,
    lia: LiaTable,
    outgoing: Vec<Transmission>,
    rng: StdRng,
    next_seq: u64,
    idle_accounted_at: Timestamp,
}

impl Node {
    /// Create a node. The advertisement interval is drawn once, uniformly
    /// over the configured range, from the node's own seeded RNG.
    pub fn new(id: NodeId, role: NodeRole, position: (f64, f64), cfg: &SimConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let (lo, hi) = cfg.adv_interval;
        let adv_interval = Duration::from_millis(rng.gen_range(lo.as_millis()..=hi.as_millis()));

        Self {
            id,
            role,
            position,
            energy: EnergyMeter::new(cfg.initial_energy),
            costs: cfg.energy,
            pfg: cfg.pfg,
            psg: cfg.psg,
            irg: cfg.irg,
            link_quality_dbm: cfg.link_quality_dbm,
            parent: None,
            rank: if role == NodeRole::Sink {
                Rank::ROOT
            } else {
                Rank::Infinite
            },
            version: 0,
            adv_interval,
            lia: LiaTable::new(),
            outgoing: Vec::new(),
            rng,
            next_seq: 0,
            idle_accounted_at: Timestamp::ZERO,
        }
    }

    /// Node identifier.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Role for the duration of the run.
    pub fn role(&self) -> NodeRole {
        self.role
    }

    /// Fixed position in meters.
    pub fn position(&self) -> (f64, f64) {
        self.position
    }

    /// Current rank.
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Current parent, if adopted.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Current topology version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Remaining energy.
    pub fn energy(&self) -> f64 {
        self.energy.balance()
    }

    /// Whether the node can still act.
    pub fn is_alive(&self) -> bool {
        self.energy.is_alive()
    }

    /// This node's jittered advertisement interval.
    pub fn adv_interval(&self) -> Duration {
        self.adv_interval
    }

    /// Learned per-neighbor statistics.
    pub fn lia(&self) -> &LiaTable {
        &self.lia
    }

    /// Register a discovered neighbor, drawing its link-quality proxy.
    pub fn add_neighbor(&mut self, neighbor: NodeId) {
        let (lo, hi) = self.link_quality_dbm;
        let rssi = self.rng.gen_range(lo..hi);
        self.lia.insert_neighbor(neighbor, rssi);
    }

    /// Drain the outgoing transmission queue.
    pub fn take_outgoing(&mut self) -> Vec<Transmission> {
        std::mem::take(&mut self.outgoing)
    }

    /// Charge transmit energy for one link-layer send of `kind`.
    ///
    /// Returns false if the node is (or just became) inert.
    pub fn charge_tx<S: StatsSink>(&mut self, kind: PacketKind, stats: &mut S) -> bool {
        let action = if kind.is_control() {
            ActionKind::TxControl
        } else {
            ActionKind::TxData
        };
        self.spend(action, stats)
    }

    /// Periodic timer: account idle listening, then broadcast an
    /// advertisement.
    pub fn handle_timer<S: StatsSink>(&mut self, now: Timestamp, stats: &mut S) {
        if !self.is_alive() {
            return;
        }

        let idle = (now - self.idle_accounted_at).as_units() * self.costs.idle_per_unit;
        self.idle_accounted_at = now;
        if !self.spend_amount(idle, stats) {
            return;
        }

        if self.role == NodeRole::Sink {
            self.version += 1;
        }
        let advertised = match self.role {
            // Claims to sit one hop from the sink, whatever the truth.
            NodeRole::RankSpoof => Rank::Finite(1),
            _ => self.rank,
        };
        let advert = Advertisement {
            rank: advertised,
            version: self.version,
        };
        let id = self.next_packet_id();
        self.outgoing.push(Transmission {
            target: Destination::Broadcast,
            packet: Packet::advertise(id, self.id, advert, now),
        });
    }

    /// Deliver a packet to this node. Returns the disposition for data
    /// packets so the previous hop can be told what it observed; `None`
    /// for control packets or when the node is inert.
    pub fn handle_delivery<S: StatsSink>(
        &mut self,
        packet: Packet,
        now: Timestamp,
        live_neighbors: &[NodeId],
        stats: &mut S,
    ) -> Option<DataDisposition> {
        if !self.is_alive() {
            trace!("node {}: dropping inbound {} (inert)", self.id, packet.id);
            return None;
        }

        let rx = if packet.kind.is_control() {
            ActionKind::RxControl
        } else {
            ActionKind::RxData
        };
        if !self.spend(rx, stats) {
            return None;
        }

        match packet.kind {
            PacketKind::Advertise => {
                if let Some(advert) = packet.advert {
                    self.handle_advertisement(packet.source, advert, now, stats);
                }
                None
            }
            PacketKind::Data => Some(self.handle_data(packet, now, live_neighbors, stats)),
            PacketKind::Ack => {
                self.handle_ack(&packet);
                None
            }
            PacketKind::Report => {
                self.handle_report(&packet);
                None
            }
        }
    }

    /// Originate a data packet toward `dest` and run forwarder selection.
    pub fn generate_data<S: StatsSink>(
        &mut self,
        dest: NodeId,
        now: Timestamp,
        live_neighbors: &[NodeId],
        stats: &mut S,
    ) -> Option<DataDisposition> {
        if !self.is_alive() {
            return None;
        }
        let id = self.next_packet_id();
        stats.packet_generated(self.id);
        let packet = Packet::data(id, self.id, dest, now);
        Some(self.forward_data(packet, live_neighbors, stats, false))
    }

    /// Watchdog intake: the previous hop observed `neighbor`'s handling of
    /// a data packet. Updates the LIA and, on a defection, runs the
    /// intrusion-reporting game.
    pub fn observe_outcome<S: StatsSink>(
        &mut self,
        neighbor: NodeId,
        outcome: Outcome,
        now: Timestamp,
        stats: &mut S,
    ) {
        if !self.is_alive() || !self.lia.contains(neighbor) {
            return;
        }
        if !self.spend(ActionKind::Learning, stats) {
            return;
        }
        self.lia.update_pfg(neighbor, outcome);
        stats.pfg_outcome(self.id, neighbor, outcome);

        if outcome != Outcome::Defect {
            return;
        }
        if !self.spend(ActionKind::Decision, stats) {
            return;
        }
        let report = match self.lia.get(neighbor) {
            Some(entry) => games::decide_report(entry, &self.irg, &mut self.rng),
            None => false,
        };
        if report {
            stats.report_made(self.id);
            debug!("node {}: reporting neighbor {}", self.id, neighbor);
            if let Some(parent) = self.parent {
                let id = self.next_packet_id();
                self.outgoing.push(Transmission {
                    target: Destination::Unicast(parent),
                    packet: Packet::report(id, self.id, parent, now),
                });
            }
        }
    }

    /// Handle an inbound rank advertisement.
    fn handle_advertisement<S: StatsSink>(
        &mut self,
        from: NodeId,
        advert: Advertisement,
        now: Timestamp,
        stats: &mut S,
    ) {
        if !self.lia.contains(from) {
            return;
        }
        if !self.spend(ActionKind::Learning, stats) {
            return;
        }
        self.lia.update_psg_from_advert(from, advert.rank, now);

        // Rank spoofers learn from their neighbors but never join the tree.
        if self.role == NodeRole::RankSpoof {
            return;
        }

        if !self.spend(ActionKind::Decision, stats) {
            return;
        }
        let evaluations = 1 + usize::from(self.parent.is_some());
        for _ in 0..evaluations {
            if !self.spend(ActionKind::Learning, stats) {
                return;
            }
        }

        let candidates = [ParentCandidate {
            id: from,
            rank: advert.rank,
        }];
        let chosen = games::select_parent(&self.lia, self.parent, self.rank, &candidates, &self.psg);
        stats.psg_choice(self.id, chosen);

        // Adoption requires the advertised rank to be strictly below ours
        // at evaluation time; re-adopting the incumbent refreshes the rank.
        if chosen == Some(from) && advert.rank < self.rank {
            let old = self.parent;
            self.parent = Some(from);
            self.rank = advert.rank.successor();
            if advert.version > self.version {
                self.version = advert.version;
            }
            if old != Some(from) {
                stats.parent_changed(self.id);
                debug!(
                    "node {}: parent {:?} -> {} (rank {})",
                    self.id, old, from, self.rank
                );
            }
        }
    }

    /// Handle an inbound data packet.
    fn handle_data<S: StatsSink>(
        &mut self,
        packet: Packet,
        now: Timestamp,
        live_neighbors: &[NodeId],
        stats: &mut S,
    ) -> DataDisposition {
        if packet.dest == Destination::Unicast(self.id) {
            let delay = now - packet.created_at;
            trace!("node {}: delivered {} after {:?}", self.id, packet.id, delay);
            stats.packet_delivered(delay);
            return DataDisposition::Delivered;
        }
        self.forward_data(packet, live_neighbors, stats, true)
    }

    /// Forwarder selection and hand-off, shared by origination and relay.
    fn forward_data<S: StatsSink>(
        &mut self,
        mut packet: Packet,
        live_neighbors: &[NodeId],
        stats: &mut S,
        relaying: bool,
    ) -> DataDisposition {
        if relaying {
            // Revisiting a node already on the path would loop forever.
            if packet.visited(self.id) {
                stats.packet_dropped(DropCause::Other);
                return DataDisposition::Dropped(DropCause::Other);
            }
            // Attacker overrides replace the forwarding decision outright.
            match self.role {
                NodeRole::Blackhole => {
                    trace!("node {}: blackhole drop of {}", self.id, packet.id);
                    stats.packet_dropped(DropCause::Blackhole);
                    return DataDisposition::Dropped(DropCause::Blackhole);
                }
                NodeRole::Selfish => {
                    stats.packet_dropped(DropCause::Selfish);
                    return DataDisposition::Dropped(DropCause::Selfish);
                }
                _ => {}
            }
        }

        if !self.spend(ActionKind::Decision, stats) {
            stats.packet_dropped(DropCause::Other);
            return DataDisposition::Dropped(DropCause::Other);
        }
        for _ in live_neighbors {
            if !self.spend(ActionKind::Learning, stats) {
                stats.packet_dropped(DropCause::Other);
                return DataDisposition::Dropped(DropCause::Other);
            }
        }

        let (forwarder, action) = games::select_forwarder(&self.lia, live_neighbors, &self.pfg);
        stats.pfg_choice(self.id, forwarder);

        match (forwarder, action) {
            (Some(next), ForwardAction::Send) => {
                if relaying {
                    packet.record_hop(self.id);
                }
                self.outgoing.push(Transmission {
                    target: Destination::Unicast(next),
                    packet,
                });
                DataDisposition::Forwarded(next)
            }
            _ => {
                stats.packet_dropped(DropCause::Other);
                DataDisposition::Dropped(DropCause::Other)
            }
        }
    }

    /// Extension point: end-to-end acknowledgments are out of scope.
    fn handle_ack(&mut self, _packet: &Packet) {}

    /// Extension point: report aggregation at the sink is out of scope.
    fn handle_report(&mut self, _packet: &Packet) {}

    fn next_packet_id(&mut self) -> PacketId {
        let seq = self.next_seq;
        self.next_seq += 1;
        PacketId {
            origin: self.id,
            seq,
        }
    }

    fn spend<S: StatsSink>(&mut self, kind: ActionKind, stats: &mut S) -> bool {
        self.spend_amount(self.costs.cost(kind), stats)
    }

    fn spend_amount<S: StatsSink>(&mut self, amount: f64, stats: &mut S) -> bool {
        match self.energy.charge(amount) {
            Charge::Applied => {
                stats.energy_snapshot(self.id, self.energy.balance());
                true
            }
            Charge::Depleted => {
                self.on_depleted(stats);
                false
            }
            Charge::Ignored => false,
        }
    }

    /// Shutdown bookkeeping, run exactly once when energy crosses zero.
    fn on_depleted<S: StatsSink>(&mut self, stats: &mut S) {
        debug!("node {}: energy depleted", self.id);
        self.outgoing.clear();
        stats.energy_snapshot(self.id, 0.0);
    }
}

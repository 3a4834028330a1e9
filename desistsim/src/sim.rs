//! Discrete event simulator for desist networks.

use std::collections::BinaryHeap;

use desist::{
    DataDisposition, Destination, Node, NodeId, Outcome, Packet, PacketKind, SimConfig, StatsSink,
    Timestamp, Transmission, SINK_ID,
};
use hashbrown::HashMap;
use log::trace;
use rand::rngs::StdRng;
use rand::Rng;

use crate::event::{Event, ScheduledEvent, SequenceNumber};
use crate::metrics::SimMetrics;
use crate::topology::Topology;

/// Discrete event simulator driving a set of [`Node`]s over a [`Topology`].
///
/// Events execute in (time, insertion sequence) order, so two runs with the
/// same configuration and seed replay the exact same schedule.
pub struct Simulator {
    /// All nodes in the simulation.
    nodes: HashMap<NodeId, Node>,
    /// Node placement and connectivity.
    topology: Topology,
    /// Current simulation time.
    current_time: Timestamp,
    /// Priority queue of scheduled events.
    event_queue: BinaryHeap<ScheduledEvent>,
    /// Collected metrics.
    metrics: SimMetrics,
    /// Next sequence number for event ordering.
    next_seq: u64,
    /// Transport RNG: loss draws and delay factors.
    rng: StdRng,
    /// Immutable run configuration.
    config: SimConfig,
}

impl Simulator {
    /// Create a simulator over a topology, with a dedicated transport RNG.
    pub fn new(config: SimConfig, topology: Topology, rng: StdRng) -> Self {
        Self {
            nodes: HashMap::new(),
            topology,
            current_time: Timestamp::ZERO,
            event_queue: BinaryHeap::new(),
            metrics: SimMetrics::new(),
            next_seq: 0,
            rng,
            config,
        }
    }

    /// Register a node. Its id must match its index in the topology.
    pub fn add_node(&mut self, node: Node) {
        self.metrics.energy_snapshot(node.id(), node.energy());
        self.nodes.insert(node.id(), node);
    }

    /// Get a reference to a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Get the current simulation time.
    pub fn current_time(&self) -> Timestamp {
        self.current_time
    }

    /// Get the topology.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Get collected metrics.
    pub fn metrics(&self) -> &SimMetrics {
        &self.metrics
    }

    /// Get the run configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Schedule an event.
    pub fn schedule(&mut self, time: Timestamp, event: Event) {
        let seq = SequenceNumber::new(self.next_seq);
        self.next_seq += 1;
        self.event_queue.push(ScheduledEvent::new(time, seq, event));
    }

    /// Run the simulation for the configured duration.
    pub fn run(&mut self) -> &SimMetrics {
        self.run_until(Timestamp::ZERO + self.config.duration)
    }

    /// Run simulation until the specified time (inclusive).
    pub fn run_until(&mut self, end_time: Timestamp) -> &SimMetrics {
        while let Some(next) = self.event_queue.peek() {
            if next.time > end_time {
                break;
            }
            // Peek above guarantees the pop succeeds.
            let Some(event) = self.event_queue.pop() else {
                break;
            };
            self.advance_time(event.time);
            self.process_event(event.event);
        }
        self.advance_time(end_time);
        &self.metrics
    }

    /// Advance simulation time.
    fn advance_time(&mut self, time: Timestamp) {
        if time > self.current_time {
            self.current_time = time;
        }
    }

    /// Process a single event.
    fn process_event(&mut self, event: Event) {
        match event {
            Event::TimerFire { node } => self.fire_timer(node),
            Event::DataGen { node } => self.generate_data(node),
            Event::Delivery { from, to, packet } => self.deliver(from, to, packet),
        }
    }

    /// Fire the advertisement timer for a node and reschedule it.
    fn fire_timer(&mut self, node_id: NodeId) {
        let now = self.current_time;
        let Some(node) = self.nodes.get_mut(&node_id) else {
            return;
        };
        node.handle_timer(now, &mut self.metrics);
        let interval = node.adv_interval();
        let alive = node.is_alive();

        self.collect_outgoing(node_id);
        if alive {
            self.schedule(now + interval, Event::TimerFire { node: node_id });
        }
    }

    /// Originate an application data packet toward the sink.
    fn generate_data(&mut self, node_id: NodeId) {
        let now = self.current_time;
        let live = self.live_neighbors(node_id);
        let Some(node) = self.nodes.get_mut(&node_id) else {
            return;
        };
        node.generate_data(SINK_ID, now, &live, &mut self.metrics);
        let alive = node.is_alive();

        self.collect_outgoing(node_id);
        if alive {
            let interval = self.config.data_interval;
            self.schedule(now + interval, Event::DataGen { node: node_id });
        }
    }

    /// Deliver a packet and feed the sender's watchdog with what it saw.
    fn deliver(&mut self, from: NodeId, to: NodeId, packet: Packet) {
        let now = self.current_time;
        let kind = packet.kind;
        let live = self.live_neighbors(to);

        let Some(node) = self.nodes.get_mut(&to) else {
            return;
        };
        let disposition = node.handle_delivery(packet, now, &live, &mut self.metrics);
        self.collect_outgoing(to);

        // The link-layer sender of a data packet overhears whether the
        // receiver passed it on; that observation drives the watchdog.
        if kind == PacketKind::Data {
            if let Some(disposition) = disposition {
                let outcome = match disposition {
                    DataDisposition::Delivered | DataDisposition::Forwarded(_) => {
                        Outcome::Cooperate
                    }
                    DataDisposition::Dropped(_) => Outcome::Defect,
                };
                if let Some(observer) = self.nodes.get_mut(&from) {
                    observer.observe_outcome(to, outcome, now, &mut self.metrics);
                }
                self.collect_outgoing(from);
            }
        }
    }

    /// Collect queued transmissions from a node and route them.
    fn collect_outgoing(&mut self, sender: NodeId) {
        let transmissions = match self.nodes.get_mut(&sender) {
            Some(node) => node.take_outgoing(),
            None => return,
        };
        for transmission in transmissions {
            self.route(sender, transmission);
        }
    }

    /// Route one transmission: per link-layer target, charge the radio,
    /// then draw loss and delay independently. Broadcasts fan out to live
    /// neighbors only; a dead radio is not worth paying to reach.
    fn route(&mut self, sender: NodeId, transmission: Transmission) {
        let Transmission { target, packet } = transmission;

        let targets: Vec<NodeId> = match target {
            Destination::Broadcast => self.live_neighbors(sender),
            Destination::Unicast(to) => {
                if self.topology.in_range(sender, to) {
                    vec![to]
                } else {
                    Vec::new()
                }
            }
        };

        let now = self.current_time;
        for to in targets {
            let Some(dist) = self.topology.distance(sender, to) else {
                continue;
            };
            let Some(node) = self.nodes.get_mut(&sender) else {
                return;
            };
            // A sender that depletes mid-fanout stops transmitting; the
            // remaining targets never hear it.
            if !node.charge_tx(packet.kind, &mut self.metrics) {
                return;
            }
            self.metrics.packet_sent(sender, packet.kind);

            if self.rng.gen::<f64>() < self.config.loss_probability {
                trace!("transmission {} -> {} lost in transit", sender, to);
                continue;
            }
            let (lo, hi) = self.config.delay_factor;
            let factor = self.rng.gen_range(lo..hi);
            let delay = desist::Duration::from_units_f64(factor * dist / 10.0);
            self.schedule(
                now + delay,
                Event::Delivery {
                    from: sender,
                    to,
                    packet: packet.clone(),
                },
            );
        }
    }

    /// Alive neighbors of `node`, in ascending id order.
    fn live_neighbors(&self, node: NodeId) -> Vec<NodeId> {
        self.topology
            .neighbors(node)
            .iter()
            .copied()
            .filter(|id| self.nodes.get(id).is_some_and(Node::is_alive))
            .collect()
    }
}

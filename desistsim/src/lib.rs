//! desistsim - Discrete event simulator for desist mesh networks.
//!
//! This crate provides a deterministic, discrete-event harness for running
//! the `desist` protocol core at scale without real-time delays.
//!
//! # Features
//!
//! - **Discrete event simulation**: events execute in (time, sequence) order
//! - **Whole networks in one process**: tens of nodes, one virtual clock
//! - **Geometric topology**: placement over an area, connectivity by radio range
//! - **Stochastic transport**: distance-proportional delay and random loss,
//!   driven by a dedicated seeded RNG
//! - **Attacker mixes**: blackhole, selfish and rank-spoofing roles by fraction
//! - **Metrics collection**: delivery ratio, drop attribution, energy, game
//!   outcomes, serializable for offline analysis
//!
//! # Example
//!
//! ```
//! use desist::SimConfig;
//! use desistsim::ScenarioBuilder;
//!
//! let cfg = SimConfig {
//!     num_nodes: 10,
//!     duration: desist::Duration::from_units(500),
//!     ..SimConfig::default()
//! };
//! let sim = ScenarioBuilder::new(cfg).with_seed(42).run().unwrap();
//! assert!(sim.metrics().sent.len() > 0);
//! ```
//!
//! # Architecture
//!
//! The simulator keeps a priority queue of events ordered by
//! (time, sequence_number). The main loop:
//! 1. Pop next event from queue
//! 2. Advance simulation time
//! 3. Process event (call node handlers)
//! 4. Collect outgoing transmissions
//! 5. Route through topology, drawing loss and delay, schedule deliveries
//!
//! Nodes are driven through their explicit handlers (`handle_timer`,
//! `handle_delivery`, `generate_data`); nothing in the core blocks or
//! sleeps.

pub mod event;
pub mod metrics;
pub mod scenario;
pub mod sim;
pub mod topology;

// Re-export main types
pub use desist::{Duration, NodeId, NodeRole, SimConfig, Timestamp};
pub use event::{Event, ScheduledEvent, SequenceNumber};
pub use metrics::{ChoiceTally, SimMetrics, Tally};
pub use scenario::{ScenarioBuilder, ScenarioError};
pub use sim::Simulator;
pub use topology::Topology;

#[cfg(test)]
mod tests {
    use desist::{DropCause, PfgPayoffs, Rank, SINK_ID};

    use super::*;

    /// Payoffs under which a neutral prior clears the hold baseline, so
    /// forwarding actually happens before any trust is accumulated.
    fn permissive_payoffs() -> PfgPayoffs {
        PfgPayoffs {
            send_cooperate: 4.0,
            send_defect: -2.0,
            hold: -0.1,
        }
    }

    #[test]
    fn test_line_of_benign_nodes_attaches_to_sink() {
        // Sink - A - B in a line, 50 m spacing, 70 m range: A sees both,
        // B only sees A.
        let cfg = SimConfig {
            num_nodes: 3,
            duration: Duration::from_units(600),
            ..SimConfig::default()
        };
        let sim = ScenarioBuilder::new(cfg)
            .with_seed(7)
            .with_positions(vec![(0.0, 0.0), (50.0, 0.0), (100.0, 0.0)])
            .with_roles(vec![NodeRole::Sink, NodeRole::Benign, NodeRole::Benign])
            .run()
            .unwrap();

        let a = sim.node(1).unwrap();
        let b = sim.node(2).unwrap();
        assert_eq!(a.parent(), Some(SINK_ID));
        assert_eq!(a.rank(), Rank::Finite(1));
        assert_eq!(b.parent(), Some(1));
        assert_eq!(b.rank(), Rank::Finite(2));
    }

    #[test]
    fn test_blackhole_on_the_only_path_kills_delivery() {
        // B's only route to the sink runs through a blackhole; nothing B
        // sends can arrive. Only the blackhole's own traffic gets through.
        let cfg = SimConfig {
            num_nodes: 3,
            duration: Duration::from_units(600),
            pfg: permissive_payoffs(),
            ..SimConfig::default()
        };
        let sim = ScenarioBuilder::new(cfg)
            .with_seed(11)
            .with_positions(vec![(0.0, 0.0), (50.0, 0.0), (100.0, 0.0)])
            .with_roles(vec![NodeRole::Sink, NodeRole::Blackhole, NodeRole::Benign])
            .run()
            .unwrap();

        let metrics = sim.metrics();
        let generated_by_b = metrics.generated.get(&2).copied().unwrap_or(0);
        let generated_by_attacker = metrics.generated.get(&1).copied().unwrap_or(0);
        assert!(generated_by_b > 0);
        // Attackers keep originating their own traffic; only relayed
        // packets die in the blackhole.
        assert!(generated_by_attacker > 0);
        assert!(metrics.drops.get(&DropCause::Blackhole).copied().unwrap_or(0) > 0);
        // Deliveries can only come from node 1's own traffic.
        assert!(metrics.delivered <= generated_by_attacker);
    }

    #[test]
    fn test_watchdog_learns_to_avoid_the_blackhole() {
        // B forwards through the blackhole, overhears the drop, and the
        // cooperation estimate collapses to the floor; from then on B holds
        // its traffic instead of feeding the attacker.
        let cfg = SimConfig {
            num_nodes: 3,
            duration: Duration::from_units(2000),
            pfg: permissive_payoffs(),
            loss_probability: 0.0,
            ..SimConfig::default()
        };
        let sim = ScenarioBuilder::new(cfg)
            .with_seed(13)
            .with_positions(vec![(0.0, 0.0), (50.0, 0.0), (100.0, 0.0)])
            .with_roles(vec![NodeRole::Sink, NodeRole::Blackhole, NodeRole::Benign])
            .run()
            .unwrap();

        let observer = sim.node(2).unwrap();
        let entry = observer.lia().get(1).unwrap();
        assert!(entry.defect_count() >= 1);
        // Once burned, the estimate sits at the floor.
        assert!(observer.lia().p_cooperate(1) < 0.5);

        let choices = sim.metrics().pfg_choices.get(&2).unwrap();
        let fed_to_attacker = choices.chosen.get(&1).copied().unwrap_or(0);
        assert!(fed_to_attacker >= 1);
        assert!(choices.held > fed_to_attacker);
        // The watchdog tally matches what the node learned.
        let tally = &sim.metrics().pfg_outcomes[&2][&1];
        assert_eq!(tally.defect, entry.defect_count());
    }

    #[test]
    fn test_same_seed_same_metrics() {
        let cfg = SimConfig {
            num_nodes: 15,
            duration: Duration::from_units(800),
            pfg: permissive_payoffs(),
            ..SimConfig::default()
        };
        let run = |seed| {
            let sim = ScenarioBuilder::new(cfg.clone())
                .with_seed(seed)
                .run()
                .unwrap();
            serde_json::to_string(sim.metrics()).unwrap()
        };

        assert_eq!(run(21), run(21));
        assert_ne!(run(21), run(22));
    }

    #[test]
    fn test_full_default_scenario_produces_traffic() {
        let cfg = SimConfig {
            duration: Duration::from_units(500),
            pfg: permissive_payoffs(),
            ..SimConfig::default()
        };
        let sim = ScenarioBuilder::new(cfg).with_seed(1).run().unwrap();

        let metrics = sim.metrics();
        assert!(metrics.total_generated() > 0);
        assert!(metrics.sent.contains_key(&SINK_ID));
        assert_eq!(metrics.energy.len(), 50);
        // Every node's balance stayed within [0, initial].
        assert!(metrics.energy.values().all(|&e| (0.0..=100.0).contains(&e)));
        // Bookkeeping closes: everything generated was delivered, dropped,
        // or is still in flight / queued, so delivered never exceeds generated.
        assert!(metrics.delivered <= metrics.total_generated());
    }
}

//! Scenario builder for setting up and running simulations.
//!
//! A scenario turns a validated [`SimConfig`] plus one master seed into a
//! fully wired [`Simulator`]: node placement, role assignment, neighbor
//! discovery, per-node RNG seeds and the initial event schedule. Everything
//! downstream of the seed is deterministic.

use desist::{ConfigError, Duration, Node, NodeId, NodeRole, SimConfig, Timestamp};
use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::event::Event;
use crate::sim::Simulator;
use crate::topology::Topology;

/// Scenario construction rejected.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// The configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// An explicit placement did not cover every node.
    #[error("expected {expected} positions, got {got}")]
    PositionCount {
        /// Configured node count.
        expected: usize,
        /// Positions supplied.
        got: usize,
    },
    /// An explicit role assignment did not cover every node.
    #[error("expected {expected} roles, got {got}")]
    RoleCount {
        /// Configured node count.
        expected: usize,
        /// Roles supplied.
        got: usize,
    },
    /// Node 0 must be the one and only sink.
    #[error("node 0 must be the one and only sink")]
    MisplacedSink,
}

/// Builder for simulation scenarios.
pub struct ScenarioBuilder {
    config: SimConfig,
    seed: u64,
    positions: Option<Vec<(f64, f64)>>,
    roles: Option<Vec<NodeRole>>,
}

impl ScenarioBuilder {
    /// Create a scenario from a configuration.
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            seed: 42,
            positions: None,
            roles: None,
        }
    }

    /// Set the master RNG seed for deterministic construction and transport.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Override random placement with explicit positions, one per node.
    pub fn with_positions(mut self, positions: Vec<(f64, f64)>) -> Self {
        self.positions = Some(positions);
        self
    }

    /// Override random role assignment with explicit roles, one per node.
    /// Node 0 must be the sink.
    pub fn with_roles(mut self, roles: Vec<NodeRole>) -> Self {
        self.roles = Some(roles);
        self
    }

    /// Build the wired simulator without running it.
    pub fn build(self) -> Result<Simulator, ScenarioError> {
        let Self {
            config,
            seed,
            positions,
            roles,
        } = self;
        config.validate().map_err(ScenarioError::Config)?;
        let n = config.num_nodes;

        let mut master = StdRng::seed_from_u64(seed);

        let topology = match positions {
            Some(positions) => {
                if positions.len() != n {
                    return Err(ScenarioError::PositionCount {
                        expected: n,
                        got: positions.len(),
                    });
                }
                Topology::from_positions(positions, config.radio_range)
            }
            None => Topology::random(n, config.area, config.radio_range, &mut master),
        };

        let roles = match roles {
            Some(roles) => {
                if roles.len() != n {
                    return Err(ScenarioError::RoleCount {
                        expected: n,
                        got: roles.len(),
                    });
                }
                let sinks = roles.iter().filter(|r| **r == NodeRole::Sink).count();
                if roles[0] != NodeRole::Sink || sinks != 1 {
                    return Err(ScenarioError::MisplacedSink);
                }
                roles
            }
            None => assign_roles(&config, &mut master),
        };

        // The transport RNG is forked off the master so adding builder
        // overrides does not shift the node seeds.
        let transport = StdRng::seed_from_u64(master.gen());
        let mut sim = Simulator::new(config.clone(), topology, transport);

        for id in 0..n {
            let id = id as NodeId;
            let position = sim.topology().position(id);
            let mut node = Node::new(id, roles[id as usize], position, &config, node_seed(seed, id));
            for &neighbor in sim.topology().neighbors(id) {
                node.add_neighbor(neighbor);
            }
            let timer_at = Timestamp::ZERO + node.adv_interval();
            sim.add_node(node);
            sim.schedule(timer_at, Event::TimerFire { node: id });

            if roles[id as usize] != NodeRole::Sink {
                // Jittered start so sources do not all fire in lockstep.
                let offset =
                    Duration::from_millis(master.gen_range(0..=config.data_interval.as_millis()));
                sim.schedule(
                    Timestamp::ZERO + config.data_interval + offset,
                    Event::DataGen { node: id },
                );
            }
        }

        let attackers = roles.iter().filter(|r| r.is_attacker()).count();
        info!(
            "scenario ready: {} nodes, {} attackers, seed {}",
            n, attackers, seed
        );
        Ok(sim)
    }

    /// Build and run for the configured duration, consuming the builder.
    pub fn run(self) -> Result<Simulator, ScenarioError> {
        let mut sim = self.build()?;
        sim.run();
        Ok(sim)
    }
}

/// Derive a per-node RNG seed from the master seed.
fn node_seed(seed: u64, id: NodeId) -> u64 {
    seed.wrapping_add((id as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Assign roles: node 0 is the sink, attacker counts come from the
/// configured fractions, and attacker identities are drawn by shuffling
/// the remaining ids.
fn assign_roles(config: &SimConfig, rng: &mut StdRng) -> Vec<NodeRole> {
    let n = config.num_nodes;
    let mut roles = vec![NodeRole::Benign; n];
    roles[0] = NodeRole::Sink;
    if n <= 1 {
        return roles;
    }

    let candidates = n - 1;
    let count = |fraction: f64| ((n as f64 * fraction).round() as usize).min(candidates);
    let blackholes = count(config.blackhole_fraction);
    let selfish = count(config.selfish_fraction);
    let spoofers = count(config.rank_spoof_fraction);

    let mut ids: Vec<NodeId> = (1..n as NodeId).collect();
    ids.shuffle(rng);

    let mut ids = ids.into_iter();
    for _ in 0..blackholes {
        if let Some(id) = ids.next() {
            roles[id as usize] = NodeRole::Blackhole;
        }
    }
    for _ in 0..selfish {
        if let Some(id) = ids.next() {
            roles[id as usize] = NodeRole::Selfish;
        }
    }
    for _ in 0..spoofers {
        if let Some(id) = ids.next() {
            roles[id as usize] = NodeRole::RankSpoof;
        }
    }
    roles
}

#[cfg(test)]
mod tests {
    use desist::SINK_ID;

    use super::*;

    #[test]
    fn test_build_rejects_invalid_config() {
        let cfg = SimConfig {
            num_nodes: 0,
            ..SimConfig::default()
        };
        assert!(matches!(
            ScenarioBuilder::new(cfg).build(),
            Err(ScenarioError::Config(ConfigError::ZeroNodes))
        ));
    }

    #[test]
    fn test_build_rejects_short_role_list() {
        let cfg = SimConfig {
            num_nodes: 4,
            ..SimConfig::default()
        };
        let result = ScenarioBuilder::new(cfg)
            .with_roles(vec![NodeRole::Sink, NodeRole::Benign])
            .build();
        assert!(matches!(
            result,
            Err(ScenarioError::RoleCount {
                expected: 4,
                got: 2
            })
        ));
    }

    #[test]
    fn test_build_rejects_non_sink_node_zero() {
        let cfg = SimConfig {
            num_nodes: 2,
            ..SimConfig::default()
        };
        let result = ScenarioBuilder::new(cfg)
            .with_roles(vec![NodeRole::Benign, NodeRole::Sink])
            .build();
        assert!(matches!(result, Err(ScenarioError::MisplacedSink)));
    }

    #[test]
    fn test_role_assignment_counts() {
        let cfg = SimConfig {
            num_nodes: 50,
            ..SimConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let roles = assign_roles(&cfg, &mut rng);

        assert_eq!(roles[0], NodeRole::Sink);
        let count = |role: NodeRole| roles.iter().filter(|r| **r == role).count();
        // 10% blackhole, 10% selfish, 5% rank-spoof of 50 nodes.
        assert_eq!(count(NodeRole::Blackhole), 5);
        assert_eq!(count(NodeRole::Selfish), 5);
        assert_eq!(count(NodeRole::RankSpoof), 3);
        assert_eq!(count(NodeRole::Sink), 1);
        assert_eq!(count(NodeRole::Benign), 36);
    }

    #[test]
    fn test_role_assignment_never_reassigns_the_sink() {
        let cfg = SimConfig {
            num_nodes: 3,
            blackhole_fraction: 1.0,
            selfish_fraction: 0.0,
            rank_spoof_fraction: 0.0,
            ..SimConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let roles = assign_roles(&cfg, &mut rng);
        assert_eq!(roles[0], NodeRole::Sink);
        assert_eq!(roles[1], NodeRole::Blackhole);
        assert_eq!(roles[2], NodeRole::Blackhole);
    }

    #[test]
    fn test_build_registers_every_node() {
        let cfg = SimConfig {
            num_nodes: 10,
            duration: Duration::from_units(100),
            ..SimConfig::default()
        };
        let sim = ScenarioBuilder::new(cfg).with_seed(3).build().unwrap();
        for id in 0..10u16 {
            assert!(sim.node(id).is_some());
        }
        assert_eq!(sim.metrics().energy.len(), 10);
        assert_eq!(sim.node(SINK_ID).unwrap().role(), NodeRole::Sink);
    }
}

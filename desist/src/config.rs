//! Run configuration.
//!
//! A `SimConfig` is supplied once at scenario construction and is immutable
//! for the duration of the run. Malformed configuration is the only fatal
//! condition in the system; everything after `validate` is a policy branch.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::time::Duration;

/// Energy cost per action kind, in abstract joules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyCosts {
    /// Transmit a data packet.
    pub tx_data: f64,
    /// Receive a data packet.
    pub rx_data: f64,
    /// Transmit a control packet.
    pub tx_control: f64,
    /// Receive a control packet.
    pub rx_control: f64,
    /// One decision-module invocation (PFG, PSG or IRG).
    pub decision: f64,
    /// One LIA read or write.
    pub learning: f64,
    /// Idle listening, per time unit.
    pub idle_per_unit: f64,
}

impl Default for EnergyCosts {
    fn default() -> Self {
        Self {
            tx_data: 0.05,
            rx_data: 0.02,
            tx_control: 0.01,
            rx_control: 0.005,
            decision: 0.001,
            learning: 0.0005,
            idle_per_unit: 0.0001,
        }
    }
}

/// Sender payoffs for the packet-forwarding game.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PfgPayoffs {
    /// Reward when the chosen forwarder cooperates.
    pub send_cooperate: f64,
    /// Penalty when the chosen forwarder defects.
    pub send_defect: f64,
    /// Baseline payoff for holding the packet.
    pub hold: f64,
}

impl Default for PfgPayoffs {
    fn default() -> Self {
        Self {
            send_cooperate: 4.0,
            send_defect: -11.0,
            hold: -0.1,
        }
    }
}

/// Weight vector for the parent-selection game.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PsgWeights {
    /// Weight on negated rank (lower rank preferred).
    pub rank: f64,
    /// Weight on the rank stability score.
    pub stability: f64,
    /// Weight on normalized link quality.
    pub link_quality: f64,
    /// Additive penalty for switching away from the current parent.
    pub change_penalty: f64,
}

impl Default for PsgWeights {
    fn default() -> Self {
        Self {
            rank: 0.5,
            stability: 0.3,
            link_quality: 0.2,
            change_penalty: -2.0,
        }
    }
}

/// Parameters for the intrusion-reporting game.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrgParams {
    /// Minimum defect count before a report is considered.
    pub defect_threshold: u64,
    /// Probability of actually reporting once triggered (storm damping).
    pub report_probability: f64,
}

impl Default for IrgParams {
    fn default() -> Self {
        Self {
            defect_threshold: 3,
            report_probability: 0.8,
        }
    }
}

/// Immutable run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Total simulated time.
    pub duration: Duration,
    /// Number of nodes, sink included.
    pub num_nodes: usize,
    /// Fraction of nodes acting as blackhole attackers.
    pub blackhole_fraction: f64,
    /// Fraction of nodes acting as selfish attackers.
    pub selfish_fraction: f64,
    /// Fraction of nodes acting as rank-spoofing attackers.
    pub rank_spoof_fraction: f64,
    /// Radio range in meters.
    pub radio_range: f64,
    /// Simulation area extents (x, y) in meters.
    pub area: (f64, f64),
    /// Initial per-node energy.
    pub initial_energy: f64,
    /// Per-action energy costs.
    pub energy: EnergyCosts,
    /// Packet-forwarding game payoffs.
    pub pfg: PfgPayoffs,
    /// Parent-selection game weights.
    pub psg: PsgWeights,
    /// Intrusion-reporting game parameters.
    pub irg: IrgParams,
    /// Advertisement interval bounds; each node draws once, uniformly.
    pub adv_interval: (Duration, Duration),
    /// Interval between application data packets per source.
    pub data_interval: Duration,
    /// Probability that any single transmission is lost in transit.
    pub loss_probability: f64,
    /// Per-transmission delay multiplier bounds, in time units per
    /// 10 meters of link distance.
    pub delay_factor: (f64, f64),
    /// RSSI bounds (dBm) for the randomized link-quality proxy.
    pub link_quality_dbm: (f64, f64),
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_units(5000),
            num_nodes: 50,
            blackhole_fraction: 0.1,
            selfish_fraction: 0.1,
            rank_spoof_fraction: 0.05,
            radio_range: 70.0,
            area: (300.0, 300.0),
            initial_energy: 100.0,
            energy: EnergyCosts::default(),
            pfg: PfgPayoffs::default(),
            psg: PsgWeights::default(),
            irg: IrgParams::default(),
            adv_interval: (Duration::from_units(20), Duration::from_units(40)),
            data_interval: Duration::from_units(50),
            loss_probability: 0.02,
            delay_factor: (0.01, 0.05),
            link_quality_dbm: (-80.0, -40.0),
        }
    }
}

/// Configuration rejected before the run starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The network needs at least one node.
    #[error("node count must be at least 1")]
    ZeroNodes,
    /// The run needs a positive duration.
    #[error("duration must be positive")]
    ZeroDuration,
    /// An attacker fraction outside [0, 1], or fractions summing above 1.
    #[error("invalid attacker fraction {name}: {value}")]
    Fraction {
        /// Offending field.
        name: &'static str,
        /// Offending value.
        value: f64,
    },
    /// A length, cost or energy value that must be strictly positive.
    #[error("{name} must be positive, got {value}")]
    NonPositive {
        /// Offending field.
        name: &'static str,
        /// Offending value.
        value: f64,
    },
    /// A payoff or weight that is NaN or infinite.
    #[error("{name} must be finite")]
    NonFinite {
        /// Offending field.
        name: &'static str,
    },
    /// An interval whose lower bound exceeds its upper bound, or is empty.
    #[error("invalid range for {name}")]
    InvalidRange {
        /// Offending field.
        name: &'static str,
    },
    /// A probability outside [0, 1].
    #[error("{name} must be a probability in [0, 1], got {value}")]
    Probability {
        /// Offending field.
        name: &'static str,
        /// Offending value.
        value: f64,
    },
}

impl SimConfig {
    /// Validate the configuration. Must pass before a scenario is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_nodes == 0 {
            return Err(ConfigError::ZeroNodes);
        }
        if self.duration == Duration::ZERO {
            return Err(ConfigError::ZeroDuration);
        }

        let fractions = [
            ("blackhole_fraction", self.blackhole_fraction),
            ("selfish_fraction", self.selfish_fraction),
            ("rank_spoof_fraction", self.rank_spoof_fraction),
        ];
        for (name, value) in fractions {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Fraction { name, value });
            }
        }
        let total = self.blackhole_fraction + self.selfish_fraction + self.rank_spoof_fraction;
        if total > 1.0 {
            return Err(ConfigError::Fraction {
                name: "attacker fractions (sum)",
                value: total,
            });
        }

        let positives = [
            ("radio_range", self.radio_range),
            ("area.x", self.area.0),
            ("area.y", self.area.1),
            ("initial_energy", self.initial_energy),
        ];
        for (name, value) in positives {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositive { name, value });
            }
        }

        let finite = [
            ("energy.tx_data", self.energy.tx_data),
            ("energy.rx_data", self.energy.rx_data),
            ("energy.tx_control", self.energy.tx_control),
            ("energy.rx_control", self.energy.rx_control),
            ("energy.decision", self.energy.decision),
            ("energy.learning", self.energy.learning),
            ("energy.idle_per_unit", self.energy.idle_per_unit),
            ("pfg.send_cooperate", self.pfg.send_cooperate),
            ("pfg.send_defect", self.pfg.send_defect),
            ("pfg.hold", self.pfg.hold),
            ("psg.rank", self.psg.rank),
            ("psg.stability", self.psg.stability),
            ("psg.link_quality", self.psg.link_quality),
            ("psg.change_penalty", self.psg.change_penalty),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { name });
            }
        }

        if self.adv_interval.0 == Duration::ZERO || self.adv_interval.0 > self.adv_interval.1 {
            return Err(ConfigError::InvalidRange {
                name: "adv_interval",
            });
        }
        if self.data_interval == Duration::ZERO {
            return Err(ConfigError::InvalidRange {
                name: "data_interval",
            });
        }
        if !self.delay_factor.0.is_finite()
            || self.delay_factor.0 < 0.0
            || self.delay_factor.0 >= self.delay_factor.1
        {
            return Err(ConfigError::InvalidRange {
                name: "delay_factor",
            });
        }
        if self.link_quality_dbm.0 >= self.link_quality_dbm.1 {
            return Err(ConfigError::InvalidRange {
                name: "link_quality_dbm",
            });
        }

        let probabilities = [
            ("loss_probability", self.loss_probability),
            ("irg.report_probability", self.irg.report_probability),
        ];
        for (name, value) in probabilities {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Probability { name, value });
            }
        }

        Ok(())
    }
}

//! Learned Interaction Archive.
//!
//! Each node owns one `LiaTable`, keyed by neighbor id, holding everything
//! the node has locally learned about that neighbor: forwarding outcomes,
//! advertised-rank history, and a link-quality proxy. All three game
//! modules read from here and nowhere else.
//!
//! Entries are created explicitly at neighbor discovery; there is no
//! implicit creation on first access.

use std::collections::{BTreeMap, VecDeque};

use crate::config::PsgWeights;
use crate::time::{Duration, Timestamp};
use crate::types::{NodeId, Outcome, Rank};

/// Bounded length of the advertisement recency window.
const ADVERT_WINDOW: usize = 5;

/// Span over the three most recent advertisements that counts as flooding.
const FLOOD_SPAN: Duration = Duration::from_units(10);

/// Parent-score penalty applied when flooding is detected.
const FLOOD_PENALTY: f64 = -0.5;

/// Stability multiplier after an erratic rank jump.
const STABILITY_DECAY: f64 = 0.8;

/// Stability recovery: `s = min(1, s * 1.05 + 0.05)` after a stable advert.
const STABILITY_GROWTH: f64 = 1.05;
const STABILITY_BONUS: f64 = 0.05;

/// Learned state about one neighbor.
#[derive(Debug, Clone)]
pub struct LiaEntry {
    coop_count: u64,
    defect_count: u64,
    last_outcome: Option<Outcome>,
    last_advertised_rank: Option<Rank>,
    advert_times: VecDeque<Timestamp>,
    stability: f64,
    link_quality_dbm: f64,
}

impl LiaEntry {
    fn new(link_quality_dbm: f64) -> Self {
        Self {
            coop_count: 0,
            defect_count: 0,
            last_outcome: None,
            last_advertised_rank: None,
            advert_times: VecDeque::with_capacity(ADVERT_WINDOW),
            stability: 1.0,
            link_quality_dbm,
        }
    }

    /// Observed cooperations. Monotonically non-decreasing.
    pub fn coop_count(&self) -> u64 {
        self.coop_count
    }

    /// Observed defections. Monotonically non-decreasing.
    pub fn defect_count(&self) -> u64 {
        self.defect_count
    }

    /// Most recent observed outcome.
    pub fn last_outcome(&self) -> Option<Outcome> {
        self.last_outcome
    }

    /// Most recent advertised rank.
    pub fn last_advertised_rank(&self) -> Option<Rank> {
        self.last_advertised_rank
    }

    /// Rank stability score in [0, 1].
    pub fn stability(&self) -> f64 {
        self.stability
    }

    /// Link-quality RSSI proxy in dBm.
    pub fn link_quality_dbm(&self) -> f64 {
        self.link_quality_dbm
    }
}

/// Per-neighbor learned statistics for one observing node.
///
/// Keyed by a `BTreeMap` so every iteration is in ascending neighbor id,
/// the stable tie-break order the decision modules rely on.
#[derive(Debug, Clone, Default)]
pub struct LiaTable {
    entries: BTreeMap<NodeId, LiaEntry>,
}

impl LiaTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the entry for a freshly discovered neighbor.
    pub fn insert_neighbor(&mut self, neighbor: NodeId, link_quality_dbm: f64) {
        self.entries
            .entry(neighbor)
            .or_insert_with(|| LiaEntry::new(link_quality_dbm));
    }

    /// Whether `neighbor` was discovered.
    pub fn contains(&self, neighbor: NodeId) -> bool {
        self.entries.contains_key(&neighbor)
    }

    /// Entry for one neighbor, if discovered.
    pub fn get(&self, neighbor: NodeId) -> Option<&LiaEntry> {
        self.entries.get(&neighbor)
    }

    /// Known neighbor ids in ascending order.
    pub fn neighbor_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.keys().copied()
    }

    /// Record a forwarding outcome for `neighbor`.
    pub fn update_pfg(&mut self, neighbor: NodeId, outcome: Outcome) {
        let Some(entry) = self.entries.get_mut(&neighbor) else {
            return;
        };
        match outcome {
            Outcome::Cooperate => entry.coop_count += 1,
            Outcome::Defect => entry.defect_count += 1,
        }
        entry.last_outcome = Some(outcome);
    }

    /// Fold an advertisement from `neighbor` into its PSG state.
    pub fn update_psg_from_advert(&mut self, neighbor: NodeId, rank: Rank, now: Timestamp) {
        let Some(entry) = self.entries.get_mut(&neighbor) else {
            return;
        };

        if entry.advert_times.len() == ADVERT_WINDOW {
            entry.advert_times.pop_front();
        }
        entry.advert_times.push_back(now);

        if let Some(prev) = entry.last_advertised_rank {
            if Rank::erratic_jump(prev, rank) {
                entry.stability *= STABILITY_DECAY;
            } else {
                entry.stability = (entry.stability * STABILITY_GROWTH + STABILITY_BONUS).min(1.0);
            }
        }
        entry.last_advertised_rank = Some(rank);
    }

    /// Estimated probability that `neighbor` cooperates when handed a packet.
    ///
    /// Returns the neutral prior 0.5 with zero observations; otherwise the
    /// empirical cooperate ratio, biased by the most recent outcome and
    /// clamped to [0.01, 0.99].
    pub fn p_cooperate(&self, neighbor: NodeId) -> f64 {
        let Some(entry) = self.entries.get(&neighbor) else {
            return 0.5;
        };
        let total = entry.coop_count + entry.defect_count;
        if total == 0 {
            return 0.5;
        }

        let mut p = entry.coop_count as f64 / total as f64;
        match entry.last_outcome {
            Some(Outcome::Defect) => p = (p * 0.3).max(0.01),
            Some(Outcome::Cooperate) => p = (p * 1.1 + 0.2).min(0.99),
            None => {}
        }
        p.clamp(0.01, 0.99)
    }

    /// Parent-candidate score: weighted sum of negated rank, stability and
    /// normalized link quality, minus a flooding penalty when the three most
    /// recent advertisements arrived within [`FLOOD_SPAN`].
    pub fn parent_score(&self, candidate: NodeId, rank: Rank, weights: &PsgWeights) -> f64 {
        let Some(entry) = self.entries.get(&candidate) else {
            return f64::NEG_INFINITY;
        };

        let mut freq_penalty = 0.0;
        let n = entry.advert_times.len();
        if n >= 3 && entry.advert_times[n - 1] - entry.advert_times[n - 3] < FLOOD_SPAN {
            freq_penalty = FLOOD_PENALTY;
        }

        weights.rank * -rank.score_value()
            + weights.stability * entry.stability
            + weights.link_quality * (entry.link_quality_dbm / -40.0)
            + freq_penalty
    }
}

//! The three DeSIST decision games.
//!
//! Pure expected-utility / threshold decisions over LIA state. Candidate
//! slices are always iterated in the order given; callers pass ascending
//! neighbor id so ties keep the first-seen maximum deterministically.
//! Energy accounting for these invocations is charged by the caller.

use rand::Rng;

use crate::config::{IrgParams, PfgPayoffs, PsgWeights};
use crate::lia::{LiaEntry, LiaTable};
use crate::types::{NodeId, Rank};

/// Action chosen by the packet-forwarding game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardAction {
    /// Hand the packet to the chosen forwarder.
    Send,
    /// Keep the packet; no candidate beats the hold baseline.
    Hold,
}

/// A parent candidate proposed to the parent-selection game.
#[derive(Debug, Clone, Copy)]
pub struct ParentCandidate {
    /// Candidate node.
    pub id: NodeId,
    /// Rank the candidate advertised.
    pub rank: Rank,
}

/// PFG: pick the forwarder with the greatest expected utility, or hold.
///
/// The hold baseline is the fixed hold payoff; a candidate wins only with a
/// strictly greater expected utility. An empty candidate set forces Hold.
pub fn select_forwarder(
    lia: &LiaTable,
    candidates: &[NodeId],
    payoffs: &PfgPayoffs,
) -> (Option<NodeId>, ForwardAction) {
    let mut best: Option<NodeId> = None;
    let mut max_eu = payoffs.hold;

    for &candidate in candidates {
        let p = lia.p_cooperate(candidate);
        let eu = p * payoffs.send_cooperate + (1.0 - p) * payoffs.send_defect;
        if eu > max_eu {
            max_eu = eu;
            best = Some(candidate);
        }
    }

    match best {
        Some(id) => (Some(id), ForwardAction::Send),
        None => (None, ForwardAction::Hold),
    }
}

/// PSG: pick the best parent among the incumbent and the proposed
/// candidates, or keep the incumbent.
///
/// The incumbent (if still a known neighbor with an advertised finite rank)
/// sets the utility to beat. Candidates must have advertised a rank
/// strictly below `own_rank`; non-incumbents pay the switching penalty.
/// Returns `None` when nothing qualifies and there is no incumbent.
pub fn select_parent(
    lia: &LiaTable,
    current: Option<NodeId>,
    own_rank: Rank,
    candidates: &[ParentCandidate],
    weights: &PsgWeights,
) -> Option<NodeId> {
    let mut best: Option<NodeId> = None;
    let mut max_utility = f64::NEG_INFINITY;

    if let Some(parent) = current {
        if let Some(rank) = lia.get(parent).and_then(LiaEntry::last_advertised_rank) {
            if rank.is_finite() {
                max_utility = lia.parent_score(parent, rank, weights);
                best = Some(parent);
            }
        }
    }

    for candidate in candidates {
        if candidate.rank >= own_rank {
            continue;
        }
        let mut utility = lia.parent_score(candidate.id, candidate.rank, weights);
        if current != Some(candidate.id) {
            utility += weights.change_penalty;
        }
        if utility > max_utility {
            max_utility = utility;
            best = Some(candidate.id);
        }
    }

    best
}

/// IRG: decide whether to report `observed` as misbehaving.
///
/// Fires only when the defect count reaches the threshold and strictly
/// exceeds the cooperate count; the final coin flip damps report storms.
pub fn decide_report<R: Rng>(observed: &LiaEntry, params: &IrgParams, rng: &mut R) -> bool {
    if observed.defect_count() < params.defect_threshold
        || observed.defect_count() <= observed.coop_count()
    {
        return false;
    }
    rng.gen::<f64>() < params.report_probability
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::time::Timestamp;
    use crate::types::Outcome;

    fn table(neighbors: &[NodeId]) -> LiaTable {
        let mut lia = LiaTable::new();
        for &n in neighbors {
            lia.insert_neighbor(n, -60.0);
        }
        lia
    }

    #[test]
    fn test_pfg_empty_candidates_holds() {
        let lia = table(&[]);
        let (fw, action) = select_forwarder(&lia, &[], &PfgPayoffs::default());
        assert_eq!(fw, None);
        assert_eq!(action, ForwardAction::Hold);
    }

    #[test]
    fn test_pfg_holds_when_all_below_baseline() {
        // Neutral prior 0.5 with the default payoffs gives
        // 0.5 * 4 + 0.5 * -11 = -3.5, below the -0.1 hold baseline.
        let lia = table(&[1, 2, 3]);
        let (fw, action) = select_forwarder(&lia, &[1, 2, 3], &PfgPayoffs::default());
        assert_eq!(fw, None);
        assert_eq!(action, ForwardAction::Hold);
    }

    #[test]
    fn test_pfg_picks_strictly_best() {
        let mut lia = table(&[1, 2]);
        for _ in 0..5 {
            lia.update_pfg(1, Outcome::Cooperate);
        }
        for _ in 0..5 {
            lia.update_pfg(2, Outcome::Defect);
        }
        let payoffs = PfgPayoffs {
            send_cooperate: 4.0,
            send_defect: -2.0,
            hold: -0.1,
        };
        let (fw, action) = select_forwarder(&lia, &[1, 2], &payoffs);
        assert_eq!(fw, Some(1));
        assert_eq!(action, ForwardAction::Send);
    }

    #[test]
    fn test_pfg_tie_keeps_first_seen() {
        // Two indistinguishable candidates: neither strictly beats the
        // other, so the first one evaluated wins.
        let lia = table(&[4, 7]);
        let payoffs = PfgPayoffs {
            send_cooperate: 4.0,
            send_defect: -2.0,
            hold: -0.1,
        };
        let (fw, _) = select_forwarder(&lia, &[4, 7], &payoffs);
        assert_eq!(fw, Some(4));
    }

    #[test]
    fn test_psg_requires_strictly_lower_rank() {
        let mut lia = table(&[1]);
        lia.update_psg_from_advert(1, Rank::Finite(3), Timestamp::ZERO);
        let candidates = [ParentCandidate {
            id: 1,
            rank: Rank::Finite(3),
        }];
        // Own rank 3: candidate at rank 3 is not eligible.
        let chosen = select_parent(
            &lia,
            None,
            Rank::Finite(3),
            &candidates,
            &PsgWeights::default(),
        );
        assert_eq!(chosen, None);
    }

    #[test]
    fn test_psg_infinite_own_rank_accepts_any_finite() {
        let mut lia = table(&[1]);
        lia.update_psg_from_advert(1, Rank::Finite(7), Timestamp::ZERO);
        let candidates = [ParentCandidate {
            id: 1,
            rank: Rank::Finite(7),
        }];
        let chosen = select_parent(
            &lia,
            None,
            Rank::Infinite,
            &candidates,
            &PsgWeights::default(),
        );
        assert_eq!(chosen, Some(1));
    }

    #[test]
    fn test_psg_switching_penalty_protects_incumbent() {
        let mut lia = table(&[1, 2]);
        // Both advertise rank 1 with identical link quality; the challenger
        // pays the switching penalty and loses.
        lia.update_psg_from_advert(1, Rank::Finite(1), Timestamp::ZERO);
        lia.update_psg_from_advert(2, Rank::Finite(1), Timestamp::ZERO);
        let candidates = [ParentCandidate {
            id: 2,
            rank: Rank::Finite(1),
        }];
        let chosen = select_parent(
            &lia,
            Some(1),
            Rank::Finite(2),
            &candidates,
            &PsgWeights::default(),
        );
        assert_eq!(chosen, Some(1));
    }

    #[test]
    fn test_psg_empty_candidates_keeps_parent() {
        let mut lia = table(&[1]);
        lia.update_psg_from_advert(1, Rank::Finite(1), Timestamp::ZERO);
        let chosen = select_parent(&lia, Some(1), Rank::Finite(2), &[], &PsgWeights::default());
        assert_eq!(chosen, Some(1));
    }

    #[test]
    fn test_irg_threshold() {
        let mut lia = table(&[1]);
        let params = IrgParams {
            defect_threshold: 3,
            report_probability: 1.0,
        };
        let mut rng = StdRng::seed_from_u64(1);

        lia.update_pfg(1, Outcome::Defect);
        lia.update_pfg(1, Outcome::Defect);
        assert!(!decide_report(lia.get(1).unwrap(), &params, &mut rng));

        lia.update_pfg(1, Outcome::Defect);
        assert!(decide_report(lia.get(1).unwrap(), &params, &mut rng));
    }

    #[test]
    fn test_irg_requires_defects_to_dominate() {
        let mut lia = table(&[1]);
        let params = IrgParams {
            defect_threshold: 3,
            report_probability: 1.0,
        };
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..4 {
            lia.update_pfg(1, Outcome::Defect);
            lia.update_pfg(1, Outcome::Cooperate);
        }
        // 4 defects, 4 cooperations: threshold met but defects do not
        // strictly exceed cooperations.
        assert!(!decide_report(lia.get(1).unwrap(), &params, &mut rng));
    }

    #[test]
    fn test_irg_damping_never_fires_at_zero_probability() {
        let mut lia = table(&[1]);
        let params = IrgParams {
            defect_threshold: 1,
            report_probability: 0.0,
        };
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..10 {
            lia.update_pfg(1, Outcome::Defect);
            assert!(!decide_report(lia.get(1).unwrap(), &params, &mut rng));
        }
    }
}

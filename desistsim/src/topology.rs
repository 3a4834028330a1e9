//! Node placement and radio connectivity.
//!
//! Positions are fixed for the duration of a run. Two nodes are neighbors
//! iff their Euclidean distance is within the radio range; neighbor lists
//! are kept in ascending node id so every iteration over them is stable.

use desist::NodeId;
use hashbrown::HashMap;
use rand::Rng;

/// Fixed node placement plus the derived connectivity graph.
#[derive(Debug, Clone)]
pub struct Topology {
    positions: Vec<(f64, f64)>,
    radio_range: f64,
    /// Neighbor ids per node, ascending.
    neighbors: HashMap<NodeId, Vec<NodeId>>,
    /// Pairwise distances for connected pairs, canonical ordering.
    distances: HashMap<(NodeId, NodeId), f64>,
}

impl Topology {
    /// Build a topology from explicit positions, in meters.
    ///
    /// Node `i` gets id `i`; callers index nodes the same way.
    pub fn from_positions(positions: Vec<(f64, f64)>, radio_range: f64) -> Self {
        let mut neighbors: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        let mut distances = HashMap::new();

        for i in 0..positions.len() {
            neighbors.entry(i as NodeId).or_default();
            for j in (i + 1)..positions.len() {
                let dx = positions[i].0 - positions[j].0;
                let dy = positions[i].1 - positions[j].1;
                let dist = (dx * dx + dy * dy).sqrt();
                if dist <= radio_range {
                    let (a, b) = (i as NodeId, j as NodeId);
                    neighbors.entry(a).or_default().push(b);
                    neighbors.entry(b).or_default().push(a);
                    distances.insert(Self::canonical_pair(a, b), dist);
                }
            }
        }
        // Pushes above go low-to-high for the first id but not the second.
        for list in neighbors.values_mut() {
            list.sort_unstable();
        }

        Self {
            positions,
            radio_range,
            neighbors,
            distances,
        }
    }

    /// Place `count` nodes uniformly at random over `area` meters.
    pub fn random<R: Rng>(count: usize, area: (f64, f64), radio_range: f64, rng: &mut R) -> Self {
        let positions = (0..count)
            .map(|_| (rng.gen_range(0.0..area.0), rng.gen_range(0.0..area.1)))
            .collect();
        Self::from_positions(positions, radio_range)
    }

    /// Number of placed nodes.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the topology is empty.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Position of one node.
    pub fn position(&self, node: NodeId) -> (f64, f64) {
        self.positions[node as usize]
    }

    /// Radio range used to derive connectivity.
    pub fn radio_range(&self) -> f64 {
        self.radio_range
    }

    /// Neighbors of `node` in ascending id order.
    pub fn neighbors(&self, node: NodeId) -> &[NodeId] {
        self.neighbors
            .get(&node)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether two distinct nodes are within radio range.
    pub fn in_range(&self, a: NodeId, b: NodeId) -> bool {
        self.distances.contains_key(&Self::canonical_pair(a, b))
    }

    /// Distance between two connected nodes, in meters.
    pub fn distance(&self, a: NodeId, b: NodeId) -> Option<f64> {
        self.distances.get(&Self::canonical_pair(a, b)).copied()
    }

    /// Canonical pair ordering for consistent distance storage.
    fn canonical_pair(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
        if a < b {
            (a, b)
        } else {
            (b, a)
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_connectivity_respects_range() {
        let topo = Topology::from_positions(
            vec![(0.0, 0.0), (50.0, 0.0), (200.0, 0.0)],
            70.0,
        );
        assert!(topo.in_range(0, 1));
        assert!(!topo.in_range(0, 2));
        assert!(!topo.in_range(1, 2));
        assert_eq!(topo.distance(0, 1), Some(50.0));
        assert_eq!(topo.distance(0, 2), None);
    }

    #[test]
    fn test_neighbors_ascending() {
        let topo = Topology::from_positions(
            vec![(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (5.0, 5.0)],
            70.0,
        );
        assert_eq!(topo.neighbors(2), &[0, 1, 3]);
        assert_eq!(topo.neighbors(0), &[1, 2, 3]);
    }

    #[test]
    fn test_isolated_node_has_no_neighbors() {
        let topo = Topology::from_positions(vec![(0.0, 0.0), (500.0, 500.0)], 70.0);
        assert!(topo.neighbors(1).is_empty());
        assert!(topo.neighbors(0).is_empty());
    }

    #[test]
    fn test_distance_is_symmetric() {
        let topo = Topology::from_positions(vec![(0.0, 0.0), (30.0, 40.0)], 70.0);
        assert_eq!(topo.distance(0, 1), Some(50.0));
        assert_eq!(topo.distance(1, 0), Some(50.0));
    }

    #[test]
    fn test_random_placement_is_deterministic_per_seed() {
        let mut rng1 = StdRng::seed_from_u64(7);
        let mut rng2 = StdRng::seed_from_u64(7);
        let t1 = Topology::random(20, (300.0, 300.0), 70.0, &mut rng1);
        let t2 = Topology::random(20, (300.0, 300.0), 70.0, &mut rng2);
        for i in 0..20 {
            assert_eq!(t1.position(i as NodeId), t2.position(i as NodeId));
            assert_eq!(t1.neighbors(i as NodeId), t2.neighbors(i as NodeId));
        }
    }

    #[test]
    fn test_random_placement_stays_in_area() {
        let mut rng = StdRng::seed_from_u64(11);
        let area = (300.0, 150.0);
        let topo = Topology::random(50, area, 70.0, &mut rng);
        for i in 0..50 {
            let (x, y) = topo.position(i as NodeId);
            assert!((0.0..area.0).contains(&x));
            assert!((0.0..area.1).contains(&y));
        }
    }
}

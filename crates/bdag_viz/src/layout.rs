//! Derivation of block references for the current window.
//!
//! Every block after the first references between one and [`MAX_REFERENCES`] earlier
//! blocks, each drawn from at most [`LOOKBACK`] positions back. Creation order already
//! rules out cycles; nothing else about consensus is encoded here. Edges are recomputed
//! from scratch whenever the window changes, so topology is not stable across rebuilds
//! unless the random source is.

use crate::dag::{DagEdge, DagNode};
use rand::Rng;

/// Upper bound on references per block.
pub const MAX_REFERENCES: usize = 3;

/// How many positions back a reference may reach.
pub const LOOKBACK: usize = 5;

/// Derives reference edges for `nodes` (window order, oldest first).
///
/// For each index `i >= 1` the reference count is `min(random(1..=3), i)` and each
/// referenced index is `i - random(0..min(5, i)) - 1`. Repeated draws of the same
/// reference yield repeated edges. At most `3 * nodes.len()` edges are produced.
pub fn derive_edges<R: Rng>(nodes: &[DagNode], rng: &mut R) -> Vec<DagEdge> {
    let mut edges = Vec::with_capacity(nodes.len() * 2);

    for (i, node) in nodes.iter().enumerate().skip(1) {
        let ref_count = rng.random_range(1..=MAX_REFERENCES).min(i);
        let reach = LOOKBACK.min(i);
        for _ in 0..ref_count {
            let back = rng.random_range(0..reach);
            let ref_index = i.saturating_sub(back + 1);
            let referenced = &nodes[ref_index];
            edges.push(DagEdge::reference(i, ref_index, &referenced.id, &node.id));
        }
    }

    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::{DagNodeBuilder, DagView};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn window(len: u64) -> Vec<DagNode> {
        (0..len)
            .map(|h| DagNodeBuilder::new(h).timestamp(h as i64).build())
            .collect()
    }

    #[test]
    fn test_empty_and_single() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(derive_edges(&[], &mut rng).is_empty());
        assert!(derive_edges(&window(1), &mut rng).is_empty());
    }

    #[test]
    fn test_second_block_references_first() {
        let mut rng = StdRng::seed_from_u64(5);
        let nodes = window(2);
        let edges = derive_edges(&nodes, &mut rng);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source, "block_0");
        assert_eq!(edges[0].target, "block_1");
        assert_eq!(edges[0].id, "edge_1_0");
    }

    #[test]
    fn test_references_point_backwards_within_lookback() {
        let nodes = window(50);
        let index: HashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let edges = derive_edges(&nodes, &mut rng);
            assert!(edges.len() <= MAX_REFERENCES * nodes.len());

            let mut per_target: HashMap<&str, usize> = HashMap::new();
            for e in &edges {
                let s = index[e.source.as_str()];
                let t = index[e.target.as_str()];
                assert!(s < t, "reference must point to an earlier block");
                assert!(t - s <= LOOKBACK);
                *per_target.entry(e.target.as_str()).or_default() += 1;
            }
            for (i, n) in nodes.iter().enumerate().skip(1) {
                let count = per_target.get(n.id.as_str()).copied().unwrap_or(0);
                assert!(count >= 1 && count <= MAX_REFERENCES.min(i));
            }
            assert!(!per_target.contains_key("block_0"));
        }
    }

    #[test]
    fn test_no_dangling_edges() {
        let nodes = window(30);
        let mut rng = StdRng::seed_from_u64(11);
        let edges = derive_edges(&nodes, &mut rng);
        let dag = DagView::new(nodes, edges);
        assert!(dag.dangling_edges().is_empty());
    }

    #[test]
    fn test_same_seed_same_topology() {
        let nodes = window(25);
        let a = derive_edges(&nodes, &mut StdRng::seed_from_u64(3));
        let b = derive_edges(&nodes, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }
}

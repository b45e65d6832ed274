//! Deterministic label propagation.
//!
//! Every node starts with its own label (its index in ascending id order).
//! Each round visits nodes in that same order and updates in place, so later
//! nodes in a round already see earlier updates. A node takes the most common
//! label among its neighbors, keeping its current label whenever that label is
//! among the most common and otherwise taking the lowest one. Isolated nodes
//! never change.

use std::collections::BTreeMap;

use genelattice_core::EntityId;
use rustc_hash::FxHashMap;

use crate::closure::{sort_components, Component};
use crate::graph::{IndexedGraph, RelationGraph};

pub const DEFAULT_MAX_ITERATIONS: usize = 100;

fn propagate(view: &IndexedGraph<'_>, max_iterations: usize) -> Vec<usize> {
    let mut labels: Vec<usize> = (0..view.len()).collect();
    let mut counts: FxHashMap<usize, usize> = FxHashMap::default();

    for round in 0..max_iterations {
        let mut changed = false;

        for node in 0..view.len() {
            let neighbors = &view.adj[node];
            if neighbors.is_empty() {
                continue;
            }

            counts.clear();
            for &n in neighbors {
                *counts.entry(labels[n]).or_insert(0) += 1;
            }
            let best = counts.values().copied().max().unwrap_or(0);

            let current = labels[node];
            if counts.get(&current) == Some(&best) {
                continue;
            }

            let next = counts
                .iter()
                .filter(|&(_, &c)| c == best)
                .map(|(&label, _)| label)
                .min()
                .unwrap_or(current);
            if next != current {
                labels[node] = next;
                changed = true;
            }
        }

        if !changed {
            log::debug!("label propagation converged after {} round(s)", round + 1);
            return labels;
        }
    }

    log::debug!("label propagation stopped at the {max_iterations}-round cap");
    labels
}

/// Communities as sorted member lists, ordered by descending size then
/// smallest member. Singletons included.
pub fn label_propagation(graph: &RelationGraph, max_iterations: usize) -> Vec<Component> {
    let view = graph.indexed();
    let labels = propagate(&view, max_iterations);

    let mut blocks: BTreeMap<usize, Component> = BTreeMap::new();
    for (i, label) in labels.into_iter().enumerate() {
        blocks.entry(label).or_default().push(view.ids[i].to_string());
    }

    let mut communities: Vec<Component> = blocks.into_values().collect();
    sort_components(&mut communities);
    communities
}

/// Community id → members. Ids are assigned 0.. in `label_propagation` order.
/// Empty graph yields an empty map.
pub fn community_detection(graph: &RelationGraph, max_iterations: usize) -> BTreeMap<usize, Vec<EntityId>> {
    label_propagation(graph, max_iterations).into_iter().enumerate().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::RelationKind;

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> RelationGraph {
        let mut g = RelationGraph::with_nodes(nodes.iter().copied());
        for (a, b) in edges {
            g.upsert_edge(a, b, RelationKind::Phenotype, None);
        }
        g
    }

    #[test]
    fn empty_graph_has_no_communities() {
        assert!(community_detection(&RelationGraph::new(), DEFAULT_MAX_ITERATIONS).is_empty());
    }

    #[test]
    fn separate_triangles() {
        let g = graph(
            &["F", "E", "D", "C", "B", "A"],
            &[("A", "B"), ("B", "C"), ("A", "C"), ("D", "E"), ("E", "F"), ("D", "F")],
        );
        let communities = community_detection(&g, DEFAULT_MAX_ITERATIONS);
        assert_eq!(communities.len(), 2);
        assert_eq!(communities[&0], vec!["A", "B", "C"]);
        assert_eq!(communities[&1], vec!["D", "E", "F"]);
    }

    #[test]
    fn label_crosses_single_bridge_in_first_round() {
        // C takes label 1 before D is visited, and D's neighbors then tie.
        let g = graph(
            &["A", "B", "C", "D", "E", "F"],
            &[("A", "B"), ("B", "C"), ("A", "C"), ("D", "E"), ("E", "F"), ("D", "F"), ("C", "D")],
        );
        let communities = community_detection(&g, DEFAULT_MAX_ITERATIONS);
        assert_eq!(communities.len(), 1);
        assert_eq!(communities[&0].len(), 6);
    }

    #[test]
    fn isolated_nodes_are_singletons() {
        let g = graph(&["A", "B", "Z"], &[("A", "B")]);
        let communities = community_detection(&g, DEFAULT_MAX_ITERATIONS);
        assert_eq!(communities[&0], vec!["A", "B"]);
        assert_eq!(communities[&1], vec!["Z"]);
    }

    #[test]
    fn every_node_lands_in_exactly_one_community() {
        let g = graph(
            &["A", "B", "C", "D", "E", "F", "G"],
            &[("A", "B"), ("B", "C"), ("C", "D"), ("D", "E"), ("E", "A"), ("F", "G")],
        );
        let communities = community_detection(&g, DEFAULT_MAX_ITERATIONS);
        let mut all: Vec<&str> = communities.values().flatten().map(String::as_str).collect();
        all.sort_unstable();
        assert_eq!(all, vec!["A", "B", "C", "D", "E", "F", "G"]);
    }

    #[test]
    fn repeated_runs_agree() {
        let g = graph(&["A", "B", "C", "D"], &[("A", "B"), ("B", "C"), ("C", "D"), ("D", "A")]);
        assert_eq!(label_propagation(&g, 100), label_propagation(&g, 100));
    }
}

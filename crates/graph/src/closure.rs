//! Transitive closure as connected components.
//!
//! If A ~ B and B ~ C then {A, B, C} is one component, whatever relation
//! kinds the edges carry.

use std::collections::BTreeMap;

use genelattice_core::{EntityId, Unified};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::builder::{build_relationship_graph, build_typed_graph};
use crate::graph::RelationGraph;
use crate::relation::{RelationKind, RelationRules};

/// Component members, ascending.
pub type Component = Vec<EntityId>;

// ---------------------------------------------------------------------------
// Union-find
// ---------------------------------------------------------------------------

struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Path compression
        while self.parent[x] != root {
            let next = self.parent[x];
            self.parent[x] = root;
            x = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Closure
// ---------------------------------------------------------------------------

/// Connected components of `graph`, singletons included.
///
/// Members are sorted ascending; components are sorted by descending size,
/// then by smallest member.
pub fn transitive_closure(graph: &RelationGraph) -> Vec<Component> {
    let view = graph.indexed();
    let mut sets = DisjointSet::new(view.len());

    for (i, neighbors) in view.adj.iter().enumerate() {
        for &j in neighbors {
            if i < j {
                sets.union(i, j);
            }
        }
    }

    // Nodes are visited in ascending order, so members come out sorted.
    let mut by_root: BTreeMap<usize, Component> = BTreeMap::new();
    for (i, id) in view.ids.iter().enumerate() {
        let root = sets.find(i);
        by_root.entry(root).or_default().push(id.to_string());
    }

    let mut components: Vec<Component> = by_root.into_values().collect();
    sort_components(&mut components);
    components
}

/// Descending size, then smallest member. Members must already be sorted.
pub(crate) fn sort_components(components: &mut [Component]) {
    components.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.first().cmp(&b.first())));
}

/// Non-singleton components per relation kind and for the combined graph.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosureByRelation {
    pub per_kind: BTreeMap<RelationKind, Vec<Component>>,
    pub combined: Vec<Component>,
}

/// Serializes as `{"phenotype_components": [...], ..., "all_components": [...]}`.
impl Serialize for ClosureByRelation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.per_kind.len() + 1))?;
        for (kind, components) in &self.per_kind {
            map.serialize_entry(&format!("{kind}_components"), components)?;
        }
        map.serialize_entry("all_components", &self.combined)?;
        map.end()
    }
}

pub fn closure_by_relation_type(records: &Unified, rules: &RelationRules) -> ClosureByRelation {
    let non_singleton = |graph: &RelationGraph| -> Vec<Component> {
        transitive_closure(graph).into_iter().filter(|c| c.len() > 1).collect()
    };

    let per_kind = RelationKind::ALL
        .into_iter()
        .map(|kind| (kind, non_singleton(&build_typed_graph(records, rules, kind))))
        .collect();

    let combined = non_singleton(&build_relationship_graph(records, rules));

    ClosureByRelation { per_kind, combined }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::fixtures::{list, records};

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> RelationGraph {
        let mut g = RelationGraph::with_nodes(nodes.iter().copied());
        for (a, b) in edges {
            g.upsert_edge(a, b, RelationKind::Ppi, None);
        }
        g
    }

    fn ids(c: &Component) -> Vec<&str> {
        c.iter().map(String::as_str).collect()
    }

    #[test]
    fn chain_and_pair_are_ordered() {
        let g = graph(&["D", "C", "B", "A", "E"], &[("C", "D"), ("A", "B"), ("B", "C")]);
        let components = transitive_closure(&g);
        assert_eq!(components.len(), 2);
        assert_eq!(ids(&components[0]), vec!["A", "B", "C", "D"]);
        assert_eq!(ids(&components[1]), vec!["E"]);
    }

    #[test]
    fn equal_sizes_break_ties_on_smallest_member() {
        let g = graph(&["X", "Y", "B", "A", "Q"], &[("X", "Y"), ("B", "A")]);
        let components = transitive_closure(&g);
        assert_eq!(ids(&components[0]), vec!["A", "B"]);
        assert_eq!(ids(&components[1]), vec!["X", "Y"]);
        assert_eq!(ids(&components[2]), vec!["Q"]);
    }

    #[test]
    fn result_independent_of_insertion_order() {
        let edges = [("A", "B"), ("C", "D"), ("B", "C"), ("E", "F")];
        let mut reversed = edges;
        reversed.reverse();
        let nodes = ["A", "B", "C", "D", "E", "F", "G"];
        assert_eq!(
            transitive_closure(&graph(&nodes, &edges)),
            transitive_closure(&graph(&nodes, &reversed))
        );
    }

    #[test]
    fn empty_graph_has_no_components() {
        assert!(transitive_closure(&RelationGraph::new()).is_empty());
    }

    #[test]
    fn per_kind_closure_drops_singletons() {
        let records = records(vec![
            ("A", vec![("phenotypes", list(&["cleft lip"])), ("string_partners", list(&["C"]))]),
            ("B", vec![("phenotypes", list(&["cleft lip"]))]),
            ("C", vec![]),
            ("D", vec![]),
        ]);
        let result = closure_by_relation_type(&records, &RelationRules::default());

        assert_eq!(result.per_kind.len(), 4);
        assert_eq!(result.per_kind[&RelationKind::Phenotype].len(), 1);
        assert_eq!(ids(&result.per_kind[&RelationKind::Phenotype][0]), vec!["A", "B"]);
        assert_eq!(ids(&result.per_kind[&RelationKind::Ppi][0]), vec!["A", "C"]);
        assert!(result.per_kind[&RelationKind::Syndrome].is_empty());
        assert_eq!(result.combined.len(), 1);
        assert_eq!(ids(&result.combined[0]), vec!["A", "B", "C"]);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["phenotype_components"][0][1], "B");
        assert_eq!(json["all_components"][0].as_array().unwrap().len(), 3);
    }
}

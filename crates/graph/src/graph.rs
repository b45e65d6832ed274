//! Undirected multi-typed relationship graph.
//!
//! ```text
//! A -- B  with kinds {phenotype, pathway}
//!        evidence  {phenotype: ["cleft lip"], pathway: ["palate development"]}
//! ```
//!
//! One edge per unordered pair; a second relation between the same pair is
//! folded into the existing edge.

use std::collections::{BTreeMap, BTreeSet};

use genelattice_core::EntityId;
use rustc_hash::FxHashMap;

use crate::relation::RelationKind;

/// Unordered pair, stored with `a < b`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey {
    a: EntityId,
    b: EntityId,
}

impl EdgeKey {
    pub fn new(x: &str, y: &str) -> Self {
        let (a, b) = if x <= y { (x, y) } else { (y, x) };
        Self {
            a: a.to_string(),
            b: b.to_string(),
        }
    }

    pub fn endpoints(&self) -> (&str, &str) {
        (&self.a, &self.b)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeData {
    pub kinds: BTreeSet<RelationKind>,
    /// Shared terms per kind, in insertion order. Partner links carry none.
    pub evidence: BTreeMap<RelationKind, Vec<String>>,
}

/// Relationship graph over an entity universe.
///
/// # Invariants
///
/// 1. **Symmetric adjacency:** `b ∈ adjacency[a]` iff `a ∈ adjacency[b]` iff `EdgeKey(a, b)` is in `edges`.
/// 2. **No self-loops.**
/// 3. **Every edge has at least one kind.**
/// 4. **Endpoints are nodes:** isolated nodes are kept, edge endpoints always exist.
#[derive(Debug, Clone, Default)]
pub struct RelationGraph {
    nodes: BTreeSet<EntityId>,
    edges: BTreeMap<EdgeKey, EdgeData>,
    adjacency: BTreeMap<EntityId, BTreeSet<EntityId>>,
}

impl RelationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph with every id as an isolated node.
    pub fn with_nodes<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        let mut graph = Self::new();
        for id in ids {
            graph.add_node(id);
        }
        graph
    }

    pub fn add_node(&mut self, id: &str) {
        if !self.nodes.contains(id) {
            self.nodes.insert(id.to_string());
        }
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains(id)
    }

    /// Add `kind` (and `term` as its evidence) to the edge `a -- b`, creating the
    /// edge if needed. Missing endpoints become nodes; self-pairs are ignored.
    ///
    /// Returns true when a new edge was created.
    pub fn upsert_edge(&mut self, a: &str, b: &str, kind: RelationKind, term: Option<&str>) -> bool {
        if a == b {
            return false;
        }
        self.add_node(a);
        self.add_node(b);

        let key = EdgeKey::new(a, b);
        let created = !self.edges.contains_key(&key);
        let data = self.edges.entry(key).or_default();
        data.kinds.insert(kind);
        if let Some(term) = term {
            data.evidence.entry(kind).or_default().push(term.to_string());
        }

        if created {
            self.adjacency.entry(a.to_string()).or_default().insert(b.to_string());
            self.adjacency.entry(b.to_string()).or_default().insert(a.to_string());
        }
        created
    }

    pub fn edge(&self, a: &str, b: &str) -> Option<&EdgeData> {
        self.edges.get(&EdgeKey::new(a, b))
    }

    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        self.edge(a, b).is_some()
    }

    /// Nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> + '_ {
        self.nodes.iter().map(String::as_str)
    }

    /// Edges in ascending key order.
    pub fn edges(&self) -> impl Iterator<Item = (&EdgeKey, &EdgeData)> + '_ {
        self.edges.iter()
    }

    /// Neighbors of `id` in ascending order.
    pub fn neighbors(&self, id: &str) -> impl Iterator<Item = &str> + '_ {
        self.adjacency
            .get(id)
            .into_iter()
            .flat_map(|s| s.iter().map(String::as_str))
    }

    pub fn degree(&self, id: &str) -> usize {
        self.adjacency.get(id).map_or(0, BTreeSet::len)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// `2m / (n(n-1))`, or 0 for fewer than two nodes.
    pub fn density(&self) -> f64 {
        let n = self.node_count();
        if n <= 1 {
            return 0.0;
        }
        (2 * self.edge_count()) as f64 / (n * (n - 1)) as f64
    }

    /// Index-based adjacency for the traversal algorithms.
    pub(crate) fn indexed(&self) -> IndexedGraph<'_> {
        let ids: Vec<&str> = self.nodes().collect();
        let mut index: FxHashMap<&str, usize> = FxHashMap::default();
        for (i, &id) in ids.iter().enumerate() {
            index.insert(id, i);
        }

        let adj = ids
            .iter()
            .map(|id| self.neighbors(id).filter_map(|n| index.get(n).copied()).collect())
            .collect();

        IndexedGraph { ids, index, adj }
    }

    /// Check all invariants. Panics if any are violated.
    #[cfg(test)]
    pub fn assert_consistent(&self) {
        for (key, data) in &self.edges {
            let (a, b) = key.endpoints();
            assert!(a < b, "edge key not ordered: {a} / {b}");
            assert!(!data.kinds.is_empty(), "edge {a} -- {b} has no kinds");
            assert!(self.nodes.contains(a) && self.nodes.contains(b), "dangling edge {a} -- {b}");
            assert!(self.adjacency.get(a).is_some_and(|s| s.contains(b)), "missing adjacency {a} -> {b}");
            assert!(self.adjacency.get(b).is_some_and(|s| s.contains(a)), "missing adjacency {b} -> {a}");
        }
        let directed: usize = self.adjacency.values().map(BTreeSet::len).sum();
        assert_eq!(directed, 2 * self.edges.len(), "adjacency has edges not in the edge map");
    }
}

/// Dense view: node `i` is `ids[i]`, ids ascending, neighbor lists ascending.
pub(crate) struct IndexedGraph<'g> {
    pub ids: Vec<&'g str>,
    pub index: FxHashMap<&'g str, usize>,
    pub adj: Vec<Vec<usize>>,
}

impl IndexedGraph<'_> {
    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_graph() {
        let graph = RelationGraph::new();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.density(), 0.0);
        assert_eq!(graph.neighbors("A").count(), 0);
        graph.assert_consistent();
    }

    #[test]
    fn upsert_unions_kinds_without_duplicating() {
        let mut graph = RelationGraph::with_nodes(["A", "B", "C"]);
        assert!(graph.upsert_edge("B", "A", RelationKind::Phenotype, Some("cleft lip")));
        assert!(!graph.upsert_edge("A", "B", RelationKind::Pathway, Some("palate development")));
        assert!(!graph.upsert_edge("A", "B", RelationKind::Phenotype, Some("hypodontia")));

        assert_eq!(graph.edge_count(), 1);
        let edge = graph.edge("A", "B").unwrap();
        assert_eq!(
            edge.kinds.iter().copied().collect::<Vec<_>>(),
            vec![RelationKind::Phenotype, RelationKind::Pathway]
        );
        assert_eq!(edge.evidence[&RelationKind::Phenotype], vec!["cleft lip", "hypodontia"]);
        assert_eq!(graph.degree("A"), 1);
        assert_eq!(graph.degree("C"), 0);
        graph.assert_consistent();
    }

    #[test]
    fn self_pairs_are_ignored() {
        let mut graph = RelationGraph::with_nodes(["A"]);
        assert!(!graph.upsert_edge("A", "A", RelationKind::Ppi, None));
        assert_eq!(graph.edge_count(), 0);
        graph.assert_consistent();
    }

    #[test]
    fn density_of_five_nodes_four_edges() {
        let mut graph = RelationGraph::with_nodes(["A", "B", "C", "D", "E"]);
        for (a, b) in [("A", "B"), ("B", "C"), ("C", "D"), ("D", "E")] {
            graph.upsert_edge(a, b, RelationKind::Ppi, None);
        }
        assert!((graph.density() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn indexed_view_is_sorted() {
        let mut graph = RelationGraph::with_nodes(["C", "A", "B"]);
        graph.upsert_edge("C", "A", RelationKind::Ppi, None);
        graph.upsert_edge("B", "C", RelationKind::Ppi, None);
        let view = graph.indexed();
        assert_eq!(view.ids, vec!["A", "B", "C"]);
        assert_eq!(view.adj, vec![vec![2], vec![2], vec![0, 1]]);
        assert_eq!(view.index["C"], 2);
    }
}

//! Full closure analysis over unified records.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use genelattice_core::{EntityId, Unified};
use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::builder::build_relationship_graph;
use crate::centrality::{centrality_analysis, round6, CentralityScores};
use crate::closure::{transitive_closure, Component};
use crate::community::{community_detection, DEFAULT_MAX_ITERATIONS};
use crate::graph::RelationGraph;
use crate::relation::{RelationKind, RelationRules};

/// Reported when a component has no edges at all.
pub const NO_RELATION: &str = "none";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisOptions {
    /// Length cap for the hub and bridge lists.
    pub top_n: usize,
    pub max_label_iterations: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            top_n: 10,
            max_label_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub components: usize,
    pub density: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentSummary {
    pub genes: Component,
    pub size: usize,
    pub edges: usize,
    pub dominant_relationship: String,
    pub edge_breakdown: BTreeMap<RelationKind, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HubGene {
    pub symbol: EntityId,
    pub degree: usize,
    pub betweenness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeGene {
    pub symbol: EntityId,
    pub betweenness: f64,
    pub degree: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommunitySummary {
    pub community_id: usize,
    pub genes: Vec<EntityId>,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LargestClosure {
    pub genes: Component,
    pub size: usize,
    pub dominant_role: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosureReport {
    pub graph_stats: GraphStats,
    /// Edges carrying each kind; an edge with two kinds counts for both.
    pub edge_type_counts: BTreeMap<RelationKind, usize>,
    pub components: Vec<ComponentSummary>,
    pub hub_genes: Vec<HubGene>,
    pub bridge_genes: Vec<BridgeGene>,
    pub communities: Vec<CommunitySummary>,
    pub largest_closure: LargestClosure,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Kind with the most edges; ties go to the earlier kind. `None` when empty.
fn dominant(breakdown: &BTreeMap<RelationKind, usize>) -> String {
    let mut best: Option<(RelationKind, usize)> = None;
    for (&kind, &count) in breakdown {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((kind, count));
        }
    }
    best.map_or_else(|| NO_RELATION.to_string(), |(kind, _)| kind.to_string())
}

/// Per-component edge counts and kind breakdowns, indexed like `components`.
fn component_edges(graph: &RelationGraph, components: &[Component]) -> Vec<(usize, BTreeMap<RelationKind, usize>)> {
    let mut owner: FxHashMap<&str, usize> = FxHashMap::default();
    for (i, members) in components.iter().enumerate() {
        for id in members {
            owner.insert(id, i);
        }
    }

    let mut out = vec![(0usize, BTreeMap::new()); components.len()];
    for (key, data) in graph.edges() {
        let (a, _) = key.endpoints();
        // Both endpoints always share a component.
        let Some(&i) = owner.get(a) else {
            continue;
        };
        out[i].0 += 1;
        for &kind in &data.kinds {
            *out[i].1.entry(kind).or_insert(0) += 1;
        }
    }
    out
}

fn edge_type_counts(graph: &RelationGraph) -> BTreeMap<RelationKind, usize> {
    let mut counts: BTreeMap<RelationKind, usize> = RelationKind::ALL.into_iter().map(|k| (k, 0)).collect();
    for (_, data) in graph.edges() {
        for kind in &data.kinds {
            *counts.entry(*kind).or_insert(0) += 1;
        }
    }
    counts
}

fn hub_genes(scores: &BTreeMap<EntityId, CentralityScores>, top_n: usize) -> Vec<HubGene> {
    let mut ranked: Vec<(&EntityId, &CentralityScores)> = scores.iter().filter(|(_, s)| s.degree > 0).collect();
    ranked.sort_by_key(|(id, s)| (Reverse(s.degree), *id));
    ranked
        .into_iter()
        .take(top_n)
        .map(|(id, s)| HubGene {
            symbol: id.clone(),
            degree: s.degree,
            betweenness: s.betweenness,
        })
        .collect()
}

fn bridge_genes(scores: &BTreeMap<EntityId, CentralityScores>, top_n: usize) -> Vec<BridgeGene> {
    let mut ranked: Vec<(&EntityId, &CentralityScores)> =
        scores.iter().filter(|(_, s)| s.betweenness > 0.0).collect();
    ranked.sort_by_key(|(id, s)| (Reverse(OrderedFloat(s.betweenness)), *id));
    ranked
        .into_iter()
        .take(top_n)
        .map(|(id, s)| BridgeGene {
            symbol: id.clone(),
            betweenness: s.betweenness,
            degree: s.degree,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Build the combined graph over `records` and analyse it.
pub fn closure_report(records: &Unified, rules: &RelationRules, options: &AnalysisOptions) -> ClosureReport {
    let graph = build_relationship_graph(records, rules);
    report_for_graph(&graph, options)
}

/// Analyse an already built graph.
pub fn report_for_graph(graph: &RelationGraph, options: &AnalysisOptions) -> ClosureReport {
    let components = transitive_closure(graph);
    let per_component = component_edges(graph, &components);

    let graph_stats = GraphStats {
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        components: components.len(),
        density: round6(graph.density()),
    };

    let summaries: Vec<ComponentSummary> = components
        .iter()
        .zip(&per_component)
        .filter(|(members, _)| members.len() > 1)
        .map(|(members, (edges, breakdown))| ComponentSummary {
            genes: members.clone(),
            size: members.len(),
            edges: *edges,
            dominant_relationship: dominant(breakdown),
            edge_breakdown: breakdown.clone(),
        })
        .collect();

    let scores = centrality_analysis(graph, options.max_label_iterations);

    let communities = community_detection(graph, options.max_label_iterations)
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|(community_id, genes)| CommunitySummary {
            community_id,
            size: genes.len(),
            genes,
        })
        .collect();

    let largest_closure = match components.first() {
        Some(members) => LargestClosure {
            genes: members.clone(),
            size: members.len(),
            dominant_role: dominant(&per_component[0].1),
        },
        None => LargestClosure {
            genes: Vec::new(),
            size: 0,
            dominant_role: NO_RELATION.to_string(),
        },
    };

    log::info!(
        "closure report: {} nodes, {} edges, {} components",
        graph_stats.nodes,
        graph_stats.edges,
        graph_stats.components
    );

    ClosureReport {
        graph_stats,
        edge_type_counts: edge_type_counts(graph),
        components: summaries,
        hub_genes: hub_genes(&scores, options.top_n),
        bridge_genes: bridge_genes(&scores, options.top_n),
        communities,
        largest_closure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::fixtures::{go_term, list, records};
    use genelattice_core::FieldValue;

    fn ppi_graph(nodes: &[&str], edges: &[(&str, &str)]) -> RelationGraph {
        let mut g = RelationGraph::with_nodes(nodes.iter().copied());
        for (a, b) in edges {
            g.upsert_edge(a, b, RelationKind::Ppi, None);
        }
        g
    }

    #[test]
    fn empty_records_give_empty_report() {
        let report = closure_report(&Unified::new(), &RelationRules::default(), &AnalysisOptions::default());
        assert_eq!(report.graph_stats.nodes, 0);
        assert_eq!(report.graph_stats.density, 0.0);
        assert!(report.components.is_empty());
        assert!(report.hub_genes.is_empty());
        assert!(report.communities.is_empty());
        assert_eq!(report.largest_closure.size, 0);
        assert_eq!(report.largest_closure.dominant_role, "none");
        assert_eq!(report.edge_type_counts.len(), 4);
        assert!(report.edge_type_counts.values().all(|&c| c == 0));
    }

    #[test]
    fn two_kind_edge_counts_for_both() {
        let records = records(vec![
            (
                "MSX1",
                vec![
                    ("phenotypes", list(&["hypodontia"])),
                    ("go_terms", FieldValue::List(vec![go_term("odontogenesis", "P")])),
                ],
            ),
            (
                "PAX9",
                vec![
                    ("phenotypes", list(&["hypodontia"])),
                    ("go_terms", FieldValue::List(vec![go_term("odontogenesis", "P")])),
                ],
            ),
        ]);
        let report = closure_report(&records, &RelationRules::default(), &AnalysisOptions::default());
        assert_eq!(report.graph_stats.edges, 1);
        assert_eq!(report.edge_type_counts[&RelationKind::Phenotype], 1);
        assert_eq!(report.edge_type_counts[&RelationKind::Pathway], 1);
        assert_eq!(report.edge_type_counts[&RelationKind::Syndrome], 0);

        // Tie between phenotype and pathway goes to phenotype.
        assert_eq!(report.components[0].dominant_relationship, "phenotype");
        assert_eq!(report.largest_closure.dominant_role, "phenotype");
        assert_eq!(report.components[0].edges, 1);
    }

    #[test]
    fn stats_and_components() {
        let g = ppi_graph(&["A", "B", "C", "D", "E"], &[("A", "B"), ("B", "C"), ("C", "D"), ("D", "E")]);
        let report = report_for_graph(&g, &AnalysisOptions::default());
        assert_eq!(report.graph_stats.nodes, 5);
        assert_eq!(report.graph_stats.edges, 4);
        assert_eq!(report.graph_stats.components, 1);
        assert_eq!(report.graph_stats.density, 0.4);
        assert_eq!(report.components.len(), 1);
        assert_eq!(report.components[0].dominant_relationship, "ppi");
        assert_eq!(report.components[0].edge_breakdown[&RelationKind::Ppi], 4);
    }

    #[test]
    fn hubs_and_bridges_skip_zero_scores() {
        // Star around H plus an isolated node.
        let g = ppi_graph(
            &["H", "A", "B", "C", "Z"],
            &[("H", "A"), ("H", "B"), ("H", "C")],
        );
        let report = report_for_graph(&g, &AnalysisOptions::default());

        let hubs: Vec<_> = report.hub_genes.iter().map(|h| h.symbol.as_str()).collect();
        assert_eq!(hubs, vec!["H", "A", "B", "C"]);
        assert!(report.hub_genes.iter().all(|h| h.degree > 0));

        let bridges: Vec<_> = report.bridge_genes.iter().map(|b| b.symbol.as_str()).collect();
        assert_eq!(bridges, vec!["H"]);
    }

    #[test]
    fn top_n_truncates_rankings() {
        let g = ppi_graph(&["A", "B", "C", "D"], &[("A", "B"), ("C", "D")]);
        let options = AnalysisOptions {
            top_n: 3,
            ..AnalysisOptions::default()
        };
        let report = report_for_graph(&g, &options);
        let hubs: Vec<_> = report.hub_genes.iter().map(|h| h.symbol.as_str()).collect();
        assert_eq!(hubs, vec!["A", "B", "C"]);
    }

    #[test]
    fn singleton_components_are_not_listed() {
        let g = ppi_graph(&["A", "B", "C"], &[("A", "B")]);
        let report = report_for_graph(&g, &AnalysisOptions::default());
        assert_eq!(report.graph_stats.components, 2);
        assert_eq!(report.components.len(), 1);
        assert_eq!(report.communities.len(), 1);
        assert_eq!(report.communities[0].genes, vec!["A", "B"]);
    }

    #[test]
    fn serializes_expected_keys() {
        let g = ppi_graph(&["A", "B"], &[("A", "B")]);
        let json = serde_json::to_value(report_for_graph(&g, &AnalysisOptions::default())).unwrap();
        for key in [
            "graph_stats",
            "edge_type_counts",
            "components",
            "hub_genes",
            "bridge_genes",
            "communities",
            "largest_closure",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["edge_type_counts"]["ppi"], 1);
        assert_eq!(json["components"][0]["edge_breakdown"]["ppi"], 1);
        assert_eq!(json["largest_closure"]["dominant_role"], "ppi");
    }
}

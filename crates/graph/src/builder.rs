use genelattice_core::Unified;

use crate::graph::RelationGraph;
use crate::index::{index_for_rule, InvertedIndex};
use crate::relation::{RelationKind, RelationRule, RelationRules};

/// Connect every pair of entities that share a retained term.
///
/// Existing edges gain `kind` and the term as evidence. Returns the number of
/// edges created.
pub fn add_edges_from_index(graph: &mut RelationGraph, index: &InvertedIndex, kind: RelationKind) -> usize {
    let mut added = 0;
    for (term, ids) in index {
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                if graph.upsert_edge(a, b, kind, Some(term)) {
                    added += 1;
                }
            }
        }
    }
    added
}

/// Link each entity to the partners it lists, when the partner is also in
/// `records`. No evidence terms are recorded.
pub fn add_partner_edges(graph: &mut RelationGraph, records: &Unified, rule: &RelationRule) -> usize {
    let mut added = 0;
    for (id, record) in records {
        for item in record.list(rule.field) {
            let Some(partner) = rule.extraction.term(item) else {
                continue;
            };
            if records.contains_key(partner) && graph.upsert_edge(id, partner, rule.kind, None) {
                added += 1;
            }
        }
    }
    added
}

fn add_rule(graph: &mut RelationGraph, records: &Unified, rule: &RelationRule) -> usize {
    if rule.extraction.is_partner() {
        add_partner_edges(graph, records, rule)
    } else {
        let index = index_for_rule(records, rule);
        add_edges_from_index(graph, &index, rule.kind)
    }
}

/// Combined graph over every record, with edges from all relation kinds.
pub fn build_relationship_graph(records: &Unified, rules: &RelationRules) -> RelationGraph {
    let mut graph = RelationGraph::with_nodes(records.keys().map(String::as_str));
    for rule in rules.iter() {
        let added = add_rule(&mut graph, records, rule);
        log::debug!("{}: {added} new edges", rule.kind);
    }
    graph
}

/// Graph over every record with edges from `kind` only.
pub fn build_typed_graph(records: &Unified, rules: &RelationRules, kind: RelationKind) -> RelationGraph {
    let mut graph = RelationGraph::with_nodes(records.keys().map(String::as_str));
    add_rule(&mut graph, records, rules.get(kind));
    graph
}

//! Per-node centrality on unweighted graphs.
//!
//! - **Betweenness:** Brandes' accumulation from every source, summed over
//!   ordered pairs and scaled by `1 / ((n-1)(n-2))`. Zero when `n <= 2`.
//! - **Closeness:** Wasserman–Faust, `(r-1)/Σd · (r-1)/(n-1)` where `r` counts
//!   the nodes reachable from the source including itself.
//!
//! Each BFS only explores the source's own component.

use std::collections::{BTreeMap, VecDeque};

use genelattice_core::EntityId;
use serde::Serialize;

use crate::community::community_detection;
use crate::graph::{IndexedGraph, RelationGraph};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CentralityScores {
    pub degree: usize,
    pub betweenness: f64,
    pub closeness: f64,
    pub community: usize,
}

/// Round to six decimal places.
pub fn round6(x: f64) -> f64 {
    (x * 1e6).round() / 1e6
}

// ---------------------------------------------------------------------------
// BFS helpers
// ---------------------------------------------------------------------------

/// Shortest-path distances from `source`; `None` for unreachable nodes.
fn bfs_distances(view: &IndexedGraph<'_>, source: usize) -> Vec<Option<usize>> {
    let mut dist = vec![None; view.len()];
    let mut queue = VecDeque::new();
    dist[source] = Some(0);
    queue.push_back(source);

    while let Some(v) = queue.pop_front() {
        let next = dist[v].map_or(0, |d| d + 1);
        for &w in &view.adj[v] {
            if dist[w].is_none() {
                dist[w] = Some(next);
                queue.push_back(w);
            }
        }
    }
    dist
}

// ---------------------------------------------------------------------------
// Scores
// ---------------------------------------------------------------------------

pub(crate) fn betweenness(view: &IndexedGraph<'_>) -> Vec<f64> {
    let n = view.len();
    let mut scores = vec![0.0; n];
    if n <= 2 {
        return scores;
    }

    let mut stack: Vec<usize> = Vec::with_capacity(n);
    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut sigma = vec![0.0f64; n];
    let mut dist: Vec<Option<usize>> = vec![None; n];
    let mut delta = vec![0.0f64; n];
    let mut queue = VecDeque::new();

    for s in 0..n {
        stack.clear();
        for p in &mut preds {
            p.clear();
        }
        sigma.fill(0.0);
        dist.fill(None);
        delta.fill(0.0);

        sigma[s] = 1.0;
        dist[s] = Some(0);
        queue.push_back(s);

        while let Some(v) = queue.pop_front() {
            stack.push(v);
            let dv = dist[v].unwrap_or(0);
            for &w in &view.adj[v] {
                if dist[w].is_none() {
                    dist[w] = Some(dv + 1);
                    queue.push_back(w);
                }
                if dist[w] == Some(dv + 1) {
                    sigma[w] += sigma[v];
                    preds[w].push(v);
                }
            }
        }

        while let Some(w) = stack.pop() {
            for &v in &preds[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != s {
                scores[w] += delta[w];
            }
        }
    }

    let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
    for score in &mut scores {
        *score *= scale;
    }
    scores
}

pub(crate) fn closeness(view: &IndexedGraph<'_>) -> Vec<f64> {
    let n = view.len();
    (0..n)
        .map(|u| {
            let dist = bfs_distances(view, u);
            let reached: Vec<usize> = dist.iter().flatten().copied().collect();
            let total: usize = reached.iter().sum();
            if total == 0 || n <= 1 {
                return 0.0;
            }
            let r = (reached.len() - 1) as f64;
            (r / total as f64) * (r / (n - 1) as f64)
        })
        .collect()
}

/// Degree, betweenness, closeness and community id for every node.
///
/// Scores are rounded to six decimals. An empty graph gives an empty map.
pub fn centrality_analysis(graph: &RelationGraph, max_label_iterations: usize) -> BTreeMap<EntityId, CentralityScores> {
    if graph.node_count() == 0 {
        return BTreeMap::new();
    }

    let view = graph.indexed();
    let between = betweenness(&view);
    let close = closeness(&view);

    let mut community_of: BTreeMap<&str, usize> = BTreeMap::new();
    let communities = community_detection(graph, max_label_iterations);
    for (id, members) in &communities {
        for member in members {
            community_of.insert(member, *id);
        }
    }

    view.ids
        .iter()
        .enumerate()
        .map(|(i, &id)| {
            let scores = CentralityScores {
                degree: view.adj[i].len(),
                betweenness: round6(between[i]),
                closeness: round6(close[i]),
                community: community_of.get(id).copied().unwrap_or(0),
            };
            (id.to_string(), scores)
        })
        .collect()
}

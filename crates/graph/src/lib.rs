//! `genelattice-graph`: relationship graphs and closure analysis.
//!
//! Builds typed gene–gene graphs from unified records, then derives connected
//! components, centrality, communities and the full closure report. Every
//! operation is deterministic for a given input and never fails; empty input
//! gives empty results.

pub mod builder;
pub mod centrality;
pub mod closure;
pub mod community;
pub mod graph;
pub mod index;
pub mod relation;
pub mod report;

pub use builder::{add_edges_from_index, build_relationship_graph, build_typed_graph};
pub use centrality::{centrality_analysis, CentralityScores};
pub use closure::{closure_by_relation_type, transitive_closure, ClosureByRelation, Component};
pub use community::{community_detection, label_propagation};
pub use graph::{EdgeData, EdgeKey, RelationGraph};
pub use index::{build_inverted_index, InvertedIndex};
pub use relation::{Extraction, RelationKind, RelationRule, RelationRules, SharingBounds};
pub use report::{closure_report, report_for_graph, AnalysisOptions, ClosureReport};

//! `genelattice-merge`: lattice merge engine.
//!
//! Pure engine crate: receives the entity universe and pre-loaded per-source
//! contributions, returns one unified record per entity or every conflict found.
//! No CLI or IO dependencies.

pub mod config;
pub mod contribution;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod lattice;
pub mod prove;

pub use config::{schema_from_toml, SchemaConfig};
pub use contribution::{extract_contribution, meet_contributions, Contribution};
pub use engine::{merge_all, merge_record, ConflictPolicy, MergeOptions, MergeOutput};
pub use error::{Conflict, FieldConflict, MergeError};
pub use evidence::MergeSummary;
pub use lattice::{merge_field, merge_optional};
pub use prove::{diff_unified, prove_all, ProofReport};

//! `genelattice-core`: field values, records, and the record schema.
//!
//! Pure description crate: no merge or graph behavior lives here.

pub mod record;
pub mod schema;
pub mod value;

pub use record::{EntityId, FieldMap, Record, Unified};
pub use schema::{FieldKind, FieldSpec, Schema, SchemaViolation, ViolationKind};
pub use value::{FieldType, FieldValue};

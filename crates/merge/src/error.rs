use std::fmt;

use genelattice_core::{EntityId, FieldValue};
use serde::Serialize;

/// Two incomparable values met on one field. Carries no entity; the engine
/// attaches that when it lifts this into a [`Conflict`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldConflict {
    pub field: String,
    pub existing: FieldValue,
    pub incoming: FieldValue,
}

impl fmt::Display for FieldConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conflict on {}: {} vs {}", self.field, self.existing, self.incoming)
    }
}

/// A merge conflict with full context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conflict {
    pub entity: EntityId,
    pub field: String,
    pub existing: FieldValue,
    pub incoming: FieldValue,
    /// Source whose contribution collided with the value already merged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Conflict {
    pub fn from_field(entity: &str, source: Option<&str>, c: FieldConflict) -> Self {
        Self {
            entity: entity.to_string(),
            field: c.field,
            existing: c.existing,
            incoming: c.incoming,
            source: source.map(str::to_string),
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "entity '{}', field '{}': {} vs {}",
            self.entity, self.field, self.existing, self.incoming
        )?;
        if let Some(source) = &self.source {
            write!(f, " (from source '{source}')")?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum MergeError {
    /// One or more conflicts. Batch policy reports all of them; fail-fast reports one.
    Conflicts(Vec<Conflict>),
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Schema config validation error (bad default, reserved field, etc.).
    ConfigValidation(String),
}

impl MergeError {
    pub fn conflicts(&self) -> &[Conflict] {
        match self {
            Self::Conflicts(c) => c,
            _ => &[],
        }
    }
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflicts(conflicts) => {
                write!(f, "{} merge conflict(s)", conflicts.len())?;
                if let Some(first) = conflicts.first() {
                    write!(f, "; first: {first}")?;
                }
                Ok(())
            }
            Self::ConfigParse(msg) => write!(f, "schema config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "schema config validation error: {msg}"),
        }
    }
}

impl std::error::Error for MergeError {}

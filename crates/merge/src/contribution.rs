use std::collections::BTreeMap;

use genelattice_core::{EntityId, FieldMap, FieldValue, Schema};
use serde::Serialize;

use crate::error::{Conflict, MergeError};
use crate::lattice::meet_value;

/// One source's partial assertion about some entities' fields.
///
/// Holds only data the source actually has: defaulted fields at their default
/// and absent optional fields are simply not listed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Contribution {
    pub source: String,
    pub entries: BTreeMap<EntityId, FieldMap>,
}

impl Contribution {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn from_entries(source: impl Into<String>, entries: BTreeMap<EntityId, FieldMap>) -> Self {
        Self {
            source: source.into(),
            entries,
        }
    }

    /// Builder-style insert of a single field assertion.
    pub fn with(mut self, entity: &str, field: &str, value: impl Into<FieldValue>) -> Self {
        self.insert(entity, field, value.into());
        self
    }

    pub fn insert(&mut self, entity: &str, field: &str, value: FieldValue) {
        self.entries
            .entry(entity.to_string())
            .or_default()
            .insert(field.to_string(), value);
    }

    pub fn get(&self, entity: &str) -> Option<&FieldMap> {
        self.entries.get(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Derive a contribution from one source's full export.
///
/// Drops the key field and every defaulted field still at its default; keeps
/// optional and unknown fields as-is. Entities left with nothing are dropped.
pub fn extract_contribution(
    schema: &Schema,
    source: &str,
    full_records: &BTreeMap<EntityId, FieldMap>,
) -> Contribution {
    let mut contribution = Contribution::new(source);

    for (entity, fields) in full_records {
        let kept: FieldMap = fields
            .iter()
            .filter(|(name, value)| {
                name.as_str() != schema.key_field() && schema.default_of(name) != Some(*value)
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        if !kept.is_empty() {
            contribution.entries.insert(entity.clone(), kept);
        }
    }

    contribution
}

/// Meet of two contributions, itself a contribution.
///
/// Absent entries are top, so entities or fields present on one side only pass
/// through unchanged. All conflicts are collected before failing.
pub fn meet_contributions(
    schema: &Schema,
    a: &Contribution,
    b: &Contribution,
) -> Result<Contribution, MergeError> {
    let mut merged = Contribution::new(format!("{}+{}", a.source, b.source));
    merged.entries = a.entries.clone();
    let mut conflicts = Vec::new();

    for (entity, fields) in &b.entries {
        let target = merged.entries.entry(entity.clone()).or_default();
        for (field, incoming) in fields {
            match meet_value(schema, field, target.get(field), incoming) {
                Ok(value) => {
                    target.insert(field.clone(), value);
                }
                Err(c) => conflicts.push(Conflict::from_field(entity, Some(&b.source), c)),
            }
        }
    }

    if conflicts.is_empty() {
        Ok(merged)
    } else {
        Err(MergeError::Conflicts(conflicts))
    }
}

use std::collections::BTreeMap;

use serde::Serialize;

use crate::value::FieldValue;

/// Opaque, externally supplied entity key (a gene symbol for the gene schema).
pub type EntityId = String;

/// Field name → value. Ordered so serialized output is stable.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// Entity id → unified record. Ordered by id.
pub type Unified = BTreeMap<EntityId, Record>;

/// One record per entity: the id plus its field mapping.
///
/// Serializes as the bare field mapping (the key field is one of the fields).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    #[serde(skip)]
    id: EntityId,
    fields: FieldMap,
}

impl Record {
    pub fn from_fields(id: impl Into<EntityId>, fields: FieldMap) -> Self {
        Self { id: id.into(), fields }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Copy-on-write update: returns a new record with `field` set.
    pub fn with_field(&self, field: impl Into<String>, value: FieldValue) -> Self {
        let mut next = self.clone();
        next.fields.insert(field.into(), value);
        next
    }

    /// List-valued field items; empty for absent or non-list fields.
    pub fn list(&self, field: &str) -> &[FieldValue] {
        self.get(field).and_then(FieldValue::as_list).unwrap_or(&[])
    }

    pub fn into_fields(self) -> FieldMap {
        self.fields
    }
}

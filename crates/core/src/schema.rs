//! Record schema: which fields exist, which carry a default, and what type each expects.
//!
//! A schema is pure description. It builds fresh records (`new_record`) and
//! checks finished ones (`validate`); merge semantics live in `genelattice-merge`.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::record::{EntityId, FieldMap, Record};
use crate::value::{FieldType, FieldValue};

/// How a field behaves before any source has contributed to it.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Always present; starts at this least-informative value.
    Defaulted(FieldValue),
    /// Absent until some contribution sets it.
    Optional,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub ty: FieldType,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    key_field: String,
    fields: BTreeMap<String, FieldSpec>,
}

impl Schema {
    /// An empty schema whose records are keyed by `key_field`.
    pub fn new(key_field: impl Into<String>) -> Self {
        Self {
            key_field: key_field.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_defaulted(mut self, name: impl Into<String>, ty: FieldType, default: FieldValue) -> Self {
        self.fields.insert(
            name.into(),
            FieldSpec {
                ty,
                kind: FieldKind::Defaulted(default),
            },
        );
        self
    }

    pub fn with_optional(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.insert(
            name.into(),
            FieldSpec {
                ty,
                kind: FieldKind::Optional,
            },
        );
        self
    }

    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> + '_ {
        self.fields.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    /// The default of a defaulted field; `None` for optional or unknown fields.
    pub fn default_of(&self, field: &str) -> Option<&FieldValue> {
        match self.fields.get(field).map(|s| &s.kind) {
            Some(FieldKind::Defaulted(d)) => Some(d),
            _ => None,
        }
    }

    /// True only for declared optional fields. Unknown fields are not "optional"
    /// in the schema sense, although the merge engine treats them alike.
    pub fn is_optional(&self, field: &str) -> bool {
        matches!(self.fields.get(field).map(|s| &s.kind), Some(FieldKind::Optional))
    }

    pub fn type_of(&self, field: &str) -> Option<FieldType> {
        self.fields.get(field).map(|s| s.ty)
    }

    /// Boolean defaulted fields named `_in_<source>`: one presence flag per source.
    pub fn source_flags(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(name, spec)| name.starts_with("_in_") && spec.ty == FieldType::Bool)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// A record with the key set, every defaulted field at its default and no
    /// optional fields.
    pub fn new_record(&self, id: &str) -> Record {
        let mut fields = FieldMap::new();
        fields.insert(self.key_field.clone(), FieldValue::Str(id.to_string()));
        for (name, spec) in &self.fields {
            if let FieldKind::Defaulted(default) = &spec.kind {
                fields.insert(name.clone(), default.clone());
            }
        }
        Record::from_fields(id, fields)
    }

    /// Check a record against the schema. Empty result means valid.
    ///
    /// Fields the schema does not declare are forward-compatible and never
    /// reported.
    pub fn validate(&self, record: &Record) -> Vec<SchemaViolation> {
        let mut violations = Vec::new();
        let entity = record.id().to_string();

        match record.get(&self.key_field) {
            Some(FieldValue::Str(s)) if !s.is_empty() => {}
            Some(FieldValue::Str(_)) => violations.push(SchemaViolation {
                entity: entity.clone(),
                field: self.key_field.clone(),
                expected: FieldType::String,
                actual: Some(FieldType::String),
                kind: ViolationKind::EmptyKey,
            }),
            other => violations.push(SchemaViolation {
                entity: entity.clone(),
                field: self.key_field.clone(),
                expected: FieldType::String,
                actual: other.map(FieldValue::field_type),
                kind: if other.is_some() {
                    ViolationKind::WrongType
                } else {
                    ViolationKind::MissingRequired
                },
            }),
        }

        for (name, spec) in &self.fields {
            match (record.get(name), &spec.kind) {
                (None, FieldKind::Defaulted(_)) => violations.push(SchemaViolation {
                    entity: entity.clone(),
                    field: name.clone(),
                    expected: spec.ty,
                    actual: None,
                    kind: ViolationKind::MissingRequired,
                }),
                (None, FieldKind::Optional) => {}
                (Some(value), _) if !spec.ty.accepts(value) => violations.push(SchemaViolation {
                    entity: entity.clone(),
                    field: name.clone(),
                    expected: spec.ty,
                    actual: Some(value.field_type()),
                    kind: ViolationKind::WrongType,
                }),
                (Some(_), _) => {}
            }
        }

        violations
    }

    /// Validate every record of a dataset, in id order.
    pub fn validate_all<'a>(&self, records: impl IntoIterator<Item = &'a Record>) -> Vec<SchemaViolation> {
        records.into_iter().flat_map(|r| self.validate(r)).collect()
    }

    /// The gene schema: per-source ids, per-source presence flags, and the
    /// optional annotation fields each source may fill in.
    pub fn gene() -> Self {
        let mut schema = Schema::new("symbol");

        for id_field in GENE_ID_FIELDS {
            schema = schema.with_defaulted(*id_field, FieldType::String, FieldValue::Str(String::new()));
        }
        for source in GENE_SOURCES {
            schema = schema.with_defaulted(format!("_in_{source}"), FieldType::Bool, FieldValue::Bool(false));
        }
        for (name, ty) in GENE_OPTIONAL_FIELDS {
            schema = schema.with_optional(*name, *ty);
        }

        schema
    }
}

const GENE_ID_FIELDS: &[&str] = &[
    "go_id",
    "omim_id",
    "hpo_gene_id",
    "uniprot_id",
    "facebase_id",
    "clinvar_gene_id",
    "pubmed_gene_id",
    "gnomad_id",
    "gtex_id",
    "string_id",
];

const GENE_SOURCES: &[&str] = &[
    "go",
    "omim",
    "hpo",
    "uniprot",
    "facebase",
    "clinvar",
    "pubmed",
    "gnomad",
    "nih_reporter",
    "gtex",
    "clinicaltrials",
    "string",
];

const GENE_OPTIONAL_FIELDS: &[(&str, FieldType)] = &[
    ("go_terms", FieldType::List),
    ("omim_title", FieldType::String),
    ("omim_syndromes", FieldType::List),
    ("inheritance", FieldType::String),
    ("phenotypes", FieldType::List),
    ("protein_name", FieldType::String),
    ("organism", FieldType::String),
    ("sequence_length", FieldType::Int),
    ("subcellular_locations", FieldType::List),
    ("functions", FieldType::List),
    ("facebase_datasets", FieldType::List),
    ("pathogenic_count", FieldType::Int),
    ("clinvar_variants", FieldType::List),
    ("pubmed_total", FieldType::Int),
    ("pubmed_recent", FieldType::Int),
    ("pubmed_papers", FieldType::List),
    ("pli_score", FieldType::Float),
    ("loeuf_score", FieldType::Float),
    ("oe_lof", FieldType::Float),
    ("active_grant_count", FieldType::Int),
    ("nih_reporter_projects", FieldType::List),
    ("top_tissues", FieldType::List),
    ("craniofacial_expression", FieldType::Float),
    ("active_trial_count", FieldType::Int),
    ("clinicaltrials_studies", FieldType::List),
    ("string_interaction_count", FieldType::Int),
    ("string_partners", FieldType::List),
];

// ---------------------------------------------------------------------------
// Violations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    WrongType,
    MissingRequired,
    EmptyKey,
}

/// A record field whose presence or type disagrees with the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaViolation {
    pub entity: EntityId,
    pub field: String,
    pub expected: FieldType,
    /// `None` when the field is missing.
    pub actual: Option<FieldType>,
    pub kind: ViolationKind,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.actual) {
            (ViolationKind::MissingRequired, _) | (_, None) => write!(
                f,
                "entity '{}': required field '{}' ({}) is missing",
                self.entity, self.field, self.expected
            ),
            (ViolationKind::EmptyKey, _) => {
                write!(f, "entity '{}': key field '{}' is empty", self.entity, self.field)
            }
            (ViolationKind::WrongType, Some(actual)) => write!(
                f,
                "entity '{}': field '{}' must be {}, got {}",
                self.entity, self.field, self.expected, actual
            ),
        }
    }
}

impl std::error::Error for SchemaViolation {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_has_every_default_and_no_optionals() {
        let schema = Schema::gene();
        let rec = schema.new_record("MSX1");
        assert_eq!(rec.get("symbol"), Some(&FieldValue::from("MSX1")));
        assert_eq!(rec.get("go_id"), Some(&FieldValue::from("")));
        assert_eq!(rec.get("_in_string"), Some(&FieldValue::Bool(false)));
        assert!(!rec.contains("phenotypes"));
        // key + 10 ids + 12 flags
        assert_eq!(rec.len(), 23);
        assert!(schema.validate(&rec).is_empty());
    }

    #[test]
    fn field_queries() {
        let schema = Schema::gene();
        assert_eq!(schema.default_of("_in_go"), Some(&FieldValue::Bool(false)));
        assert_eq!(schema.default_of("phenotypes"), None);
        assert!(schema.is_optional("phenotypes"));
        assert!(!schema.is_optional("go_id"));
        assert!(!schema.is_optional("not_a_field"));
        assert_eq!(schema.type_of("pli_score"), Some(FieldType::Float));
        assert_eq!(schema.type_of("not_a_field"), None);
        assert_eq!(schema.source_flags().len(), 12);
    }

    #[test]
    fn validate_reports_wrong_type() {
        let schema = Schema::gene();
        let rec = schema
            .new_record("PAX3")
            .with_field("_in_go", FieldValue::from("yes"))
            .with_field("sequence_length", FieldValue::Float(479.5))
            .with_field("pli_score", FieldValue::Int(1));
        let violations = schema.validate(&rec);
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().all(|v| v.kind == ViolationKind::WrongType));
        let flag = violations.iter().find(|v| v.field == "_in_go").unwrap();
        assert_eq!(flag.expected, FieldType::Bool);
        assert_eq!(flag.actual, Some(FieldType::String));
        assert_eq!(flag.entity, "PAX3");
        assert!(flag.to_string().contains("must be bool, got string"));
    }

    #[test]
    fn validate_reports_missing_required_and_empty_key() {
        let schema = Schema::new("symbol").with_defaulted("go_id", FieldType::String, "".into());
        let mut fields = FieldMap::new();
        fields.insert("symbol".into(), "".into());
        let rec = Record::from_fields("", fields);
        let violations = schema.validate(&rec);
        let kinds: Vec<_> = violations.iter().map(|v| v.kind).collect();
        assert_eq!(kinds, vec![ViolationKind::EmptyKey, ViolationKind::MissingRequired]);
    }

    #[test]
    fn unknown_fields_are_not_violations() {
        let schema = Schema::gene();
        let rec = schema.new_record("SOX9").with_field("future_field", FieldValue::from(vec![1i64]));
        assert!(schema.validate(&rec).is_empty());
    }
}

use std::collections::BTreeSet;

use genelattice_core::{EntityId, FieldMap, Record, Schema, SchemaViolation, Unified};
use serde::{Deserialize, Serialize};

use crate::contribution::Contribution;
use crate::error::{Conflict, MergeError};
use crate::evidence::{compute_summary, MergeSummary};
use crate::lattice::meet_value;

/// What happens after the first conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Keep merging every remaining field and entity, then fail with all conflicts.
    #[default]
    Batch,
    /// Stop at the first conflict and report only that one.
    FailFast,
}

impl std::fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Batch => write!(f, "batch"),
            Self::FailFast => write!(f, "fail_fast"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    pub policy: ConflictPolicy,
    /// Validate every unified record against the schema after merging.
    pub validate: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeOutput {
    pub records: Unified,
    pub summary: MergeSummary,
    /// Populated only when `MergeOptions::validate` is set.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<SchemaViolation>,
}

/// Merge one contribution's fields for a single entity into `base`.
///
/// Returns a new record; `base` is never modified. The key field is skipped.
/// Every conflicting field is reported.
pub fn merge_record(schema: &Schema, base: &Record, contribution: &FieldMap) -> Result<Record, MergeError> {
    let mut conflicts = Vec::new();
    let merged = merge_record_into(schema, base, contribution, None, ConflictPolicy::Batch, &mut conflicts);
    if conflicts.is_empty() {
        Ok(merged)
    } else {
        Err(MergeError::Conflicts(conflicts))
    }
}

/// Core of `merge_record`. A conflicting field keeps its pre-conflict value so
/// the batch can continue.
fn merge_record_into(
    schema: &Schema,
    base: &Record,
    contribution: &FieldMap,
    source: Option<&str>,
    policy: ConflictPolicy,
    conflicts: &mut Vec<Conflict>,
) -> Record {
    let mut fields = base.fields().clone();

    for (field, incoming) in contribution {
        if field == schema.key_field() {
            continue;
        }
        match meet_value(schema, field, fields.get(field), incoming) {
            Ok(value) => {
                fields.insert(field.clone(), value);
            }
            Err(c) => {
                conflicts.push(Conflict::from_field(base.id(), source, c));
                if policy == ConflictPolicy::FailFast {
                    break;
                }
            }
        }
    }

    Record::from_fields(base.id(), fields)
}

/// Unify `contributions` over the entity universe.
///
/// Every id starts as `schema.new_record(id)`; contributions are folded in
/// order. Entries for ids outside the universe are skipped and counted in the
/// summary. The result does not depend on contribution order.
pub fn merge_all<'a>(
    schema: &Schema,
    entity_ids: impl IntoIterator<Item = &'a str>,
    contributions: &[Contribution],
    options: &MergeOptions,
) -> Result<MergeOutput, MergeError> {
    let mut records: Unified = Unified::new();
    for id in entity_ids {
        if records.contains_key(id) {
            log::debug!("duplicate entity id '{id}' in universe ignored");
            continue;
        }
        records.insert(id.to_string(), schema.new_record(id));
    }

    let mut conflicts: Vec<Conflict> = Vec::new();
    let mut skipped: Vec<(String, EntityId)> = Vec::new();

    for contribution in contributions {
        for (entity, fields) in &contribution.entries {
            let Some(base) = records.get(entity) else {
                skipped.push((contribution.source.clone(), entity.clone()));
                continue;
            };
            let merged = merge_record_into(
                schema,
                base,
                fields,
                Some(&contribution.source),
                options.policy,
                &mut conflicts,
            );
            records.insert(entity.clone(), merged);

            if options.policy == ConflictPolicy::FailFast && !conflicts.is_empty() {
                return Err(MergeError::Conflicts(conflicts));
            }
        }
    }

    if !skipped.is_empty() {
        let sources: BTreeSet<&str> = skipped.iter().map(|(s, _)| s.as_str()).collect();
        log::warn!(
            "{} contribution entries reference ids outside the universe (sources: {})",
            skipped.len(),
            sources.into_iter().collect::<Vec<_>>().join(", ")
        );
    }

    if !conflicts.is_empty() {
        log::debug!("merge failed with {} conflict(s)", conflicts.len());
        return Err(MergeError::Conflicts(conflicts));
    }

    let violations = if options.validate {
        schema.validate_all(records.values())
    } else {
        Vec::new()
    };

    let summary = compute_summary(&records, contributions, skipped.len());
    log::debug!(
        "merged {} contribution(s) into {} record(s), {} entries applied",
        summary.contributions,
        summary.entities,
        summary.applied_entries
    );

    Ok(MergeOutput {
        records,
        summary,
        violations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use genelattice_core::FieldValue;

    fn ids() -> Vec<&'static str> {
        vec!["IRF6", "MSX1", "PAX9"]
    }

    #[test]
    fn zero_contributions_preserve_defaults() {
        let schema = Schema::gene();
        let out = merge_all(&schema, ids(), &[], &MergeOptions::default()).unwrap();
        assert_eq!(out.records.len(), 3);
        for (id, rec) in &out.records {
            assert_eq!(rec, &schema.new_record(id));
        }
    }

    #[test]
    fn merge_record_does_not_mutate_base() {
        let schema = Schema::gene();
        let base = schema.new_record("MSX1");
        let mut contribution = FieldMap::new();
        contribution.insert("_in_go".into(), true.into());
        contribution.insert("symbol".into(), "SOMETHING_ELSE".into());

        let merged = merge_record(&schema, &base, &contribution).unwrap();
        assert_eq!(base.get("_in_go"), Some(&FieldValue::Bool(false)));
        assert_eq!(merged.get("_in_go"), Some(&FieldValue::Bool(true)));
        // Key field is never overwritten.
        assert_eq!(merged.get("symbol"), Some(&FieldValue::from("MSX1")));
    }

    #[test]
    fn merge_record_reports_all_field_conflicts() {
        let schema = Schema::gene();
        let base = schema
            .new_record("MSX1")
            .with_field("omim_id", "142983".into())
            .with_field("organism", "Homo sapiens".into());
        let mut contribution = FieldMap::new();
        contribution.insert("omim_id".into(), "000000".into());
        contribution.insert("organism".into(), "Mus musculus".into());
        let err = merge_record(&schema, &base, &contribution).unwrap_err();
        let fields: Vec<_> = err.conflicts().iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["omim_id", "organism"]);
        assert!(err.conflicts().iter().all(|c| c.entity == "MSX1" && c.source.is_none()));
    }

    #[test]
    fn batch_collects_conflicts_across_entities() {
        let schema = Schema::gene();
        let a = Contribution::new("OMIM")
            .with("MSX1", "omim_id", "142983")
            .with("PAX9", "omim_id", "167416");
        let b = Contribution::new("other")
            .with("MSX1", "omim_id", "1")
            .with("PAX9", "omim_id", "2")
            .with("IRF6", "omim_id", "607199");
        let err = merge_all(&schema, ids(), &[a, b], &MergeOptions::default()).unwrap_err();
        assert_eq!(err.conflicts().len(), 2);
        let first = &err.conflicts()[0];
        assert_eq!(first.entity, "MSX1");
        assert_eq!(first.existing, FieldValue::from("142983"));
        assert_eq!(first.incoming, FieldValue::from("1"));
        assert_eq!(first.source.as_deref(), Some("other"));
    }

    #[test]
    fn fail_fast_stops_at_first_conflict() {
        let schema = Schema::gene();
        let a = Contribution::new("a")
            .with("MSX1", "omim_id", "1")
            .with("PAX9", "omim_id", "1");
        let b = Contribution::new("b")
            .with("MSX1", "omim_id", "2")
            .with("PAX9", "omim_id", "2");
        let options = MergeOptions {
            policy: ConflictPolicy::FailFast,
            validate: false,
        };
        let err = merge_all(&schema, ids(), &[a, b], &options).unwrap_err();
        assert_eq!(err.conflicts().len(), 1);
        assert_eq!(err.conflicts()[0].entity, "MSX1");
    }

    #[test]
    fn out_of_universe_entries_are_skipped() {
        let schema = Schema::gene();
        let c = Contribution::new("GO")
            .with("MSX1", "_in_go", true)
            .with("NOT_IN_UNIVERSE", "_in_go", true);
        let out = merge_all(&schema, ids(), &[c], &MergeOptions::default()).unwrap();
        assert_eq!(out.records.len(), 3);
        assert!(!out.records.contains_key("NOT_IN_UNIVERSE"));
        assert_eq!(out.summary.skipped_entries, 1);
        assert_eq!(out.summary.applied_entries, 1);
    }

    #[test]
    fn same_value_from_two_sources_is_not_a_conflict() {
        let schema = Schema::gene();
        let a = Contribution::new("UniProt").with("IRF6", "organism", "Homo sapiens");
        let b = Contribution::new("GTEx").with("IRF6", "organism", "Homo sapiens");
        let out = merge_all(&schema, ids(), &[a, b], &MergeOptions::default()).unwrap();
        assert_eq!(out.records["IRF6"].get("organism"), Some(&FieldValue::from("Homo sapiens")));
    }

    #[test]
    fn validation_runs_when_requested() {
        let schema = Schema::gene();
        let c = Contribution::new("bad").with("PAX9", "pubmed_total", "many");
        let options = MergeOptions {
            policy: ConflictPolicy::Batch,
            validate: true,
        };
        let out = merge_all(&schema, ids(), &[c], &options).unwrap();
        assert_eq!(out.violations.len(), 1);
        assert_eq!(out.violations[0].entity, "PAX9");
        assert_eq!(out.violations[0].field, "pubmed_total");
    }
}

//! Equivalence checks over real inputs.
//!
//! The meet rules make `merge_all` commutative, associative and idempotent.
//! These checks re-run the merge under reordered, duplicated and pre-grouped
//! contribution lists and deep-compare every result against the canonical
//! merge, so a batch run can demonstrate the properties on its own data.

use std::collections::BTreeSet;

use genelattice_core::{EntityId, FieldValue, Schema, Unified};
use serde::Serialize;

use crate::contribution::{meet_contributions, Contribution};
use crate::engine::{merge_all, MergeOptions};
use crate::error::MergeError;

// ---------------------------------------------------------------------------
// Deep compare
// ---------------------------------------------------------------------------

/// One differing location between two unified datasets.
///
/// Values are rendered as compact JSON; `None` means the location is missing
/// on that side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueDiff {
    pub path: String,
    pub left: Option<String>,
    pub right: Option<String>,
}

/// Deep-compare two unified datasets. Paths look like `MSX1.go_terms[0].aspect`.
pub fn diff_unified(left: &Unified, right: &Unified) -> Vec<ValueDiff> {
    let mut diffs = Vec::new();
    let ids: BTreeSet<&EntityId> = left.keys().chain(right.keys()).collect();

    for id in ids {
        match (left.get(id), right.get(id)) {
            (Some(l), Some(r)) => {
                let fields: BTreeSet<&String> = l.fields().keys().chain(r.fields().keys()).collect();
                for field in fields {
                    let path = format!("{id}.{field}");
                    diff_values(&path, l.get(field), r.get(field), &mut diffs);
                }
            }
            (l, r) => diffs.push(ValueDiff {
                path: id.clone(),
                left: l.map(|_| "<record>".to_string()),
                right: r.map(|_| "<record>".to_string()),
            }),
        }
    }

    diffs
}

fn diff_values(path: &str, left: Option<&FieldValue>, right: Option<&FieldValue>, out: &mut Vec<ValueDiff>) {
    match (left, right) {
        (Some(FieldValue::List(l)), Some(FieldValue::List(r))) => {
            if l.len() != r.len() {
                out.push(ValueDiff {
                    path: format!("{path}[len]"),
                    left: Some(l.len().to_string()),
                    right: Some(r.len().to_string()),
                });
            }
            for (i, (a, b)) in l.iter().zip(r.iter()).enumerate() {
                diff_values(&format!("{path}[{i}]"), Some(a), Some(b), out);
            }
        }
        (Some(FieldValue::Map(l)), Some(FieldValue::Map(r))) => {
            let keys: BTreeSet<&String> = l.keys().chain(r.keys()).collect();
            for key in keys {
                diff_values(&format!("{path}.{key}"), l.get(key), r.get(key), out);
            }
        }
        (l, r) if l != r => out.push(ValueDiff {
            path: path.to_string(),
            left: l.map(|v| v.to_string()),
            right: r.map(|v| v.to_string()),
        }),
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ProofCheck {
    pub name: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diffs: Vec<ValueDiff>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProofCheck {
    fn compare(name: String, canonical: &Unified, candidate: Result<Unified, MergeError>) -> Self {
        match candidate {
            Ok(records) => {
                let diffs = diff_unified(canonical, &records);
                Self {
                    name,
                    passed: diffs.is_empty(),
                    diffs,
                    error: None,
                }
            }
            Err(e) => Self {
                name,
                passed: false,
                diffs: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProofReport {
    pub checks: Vec<ProofCheck>,
}

impl ProofReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ProofCheck> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

fn merged(schema: &Schema, ids: &[EntityId], contributions: &[Contribution]) -> Result<Unified, MergeError> {
    merge_all(schema, ids.iter().map(String::as_str), contributions, &MergeOptions::default())
        .map(|out| out.records)
}

/// Reversed order plus every non-trivial rotation must match the canonical merge.
pub fn check_commutativity(
    schema: &Schema,
    ids: &[EntityId],
    contributions: &[Contribution],
    canonical: &Unified,
) -> Vec<ProofCheck> {
    let mut checks = Vec::new();

    let mut reversed = contributions.to_vec();
    reversed.reverse();
    checks.push(ProofCheck::compare(
        "commutativity: reversed".into(),
        canonical,
        merged(schema, ids, &reversed),
    ));

    for k in 1..contributions.len() {
        let mut rotated = contributions.to_vec();
        rotated.rotate_left(k);
        checks.push(ProofCheck::compare(
            format!("commutativity: rotate {k}"),
            canonical,
            merged(schema, ids, &rotated),
        ));
    }

    checks
}

/// Merging any contribution a second time must change nothing.
pub fn check_idempotency(
    schema: &Schema,
    ids: &[EntityId],
    contributions: &[Contribution],
    canonical: &Unified,
) -> Vec<ProofCheck> {
    contributions
        .iter()
        .map(|c| {
            let mut doubled = contributions.to_vec();
            doubled.push(c.clone());
            ProofCheck::compare(
                format!("idempotency: {}", c.source),
                canonical,
                merged(schema, ids, &doubled),
            )
        })
        .collect()
}

/// For each consecutive triple, `(a⊓b)⊓c` and `a⊓(b⊓c)` must merge to the
/// same records as `[a, b, c]` merged one by one.
pub fn check_associativity(schema: &Schema, ids: &[EntityId], contributions: &[Contribution]) -> Vec<ProofCheck> {
    contributions
        .windows(3)
        .map(|w| {
            let (a, b, c) = (&w[0], &w[1], &w[2]);
            let name = format!("associativity: {}, {}, {}", a.source, b.source, c.source);

            let sequential = match merged(schema, ids, w) {
                Ok(records) => records,
                Err(e) => return ProofCheck::compare(name, &Unified::new(), Err(e)),
            };

            let left = meet_contributions(schema, a, b).and_then(|ab| meet_contributions(schema, &ab, c));
            let right = meet_contributions(schema, b, c).and_then(|bc| meet_contributions(schema, a, &bc));

            let left = left.and_then(|l| merged(schema, ids, &[l]));
            let right = right.and_then(|r| merged(schema, ids, &[r]));

            let mut check = ProofCheck::compare(name.clone(), &sequential, left);
            if check.passed {
                check = ProofCheck::compare(name, &sequential, right);
            }
            check
        })
        .collect()
}

/// Run the canonical merge and every equivalence check.
pub fn prove_all(schema: &Schema, ids: &[EntityId], contributions: &[Contribution]) -> ProofReport {
    let canonical = match merged(schema, ids, contributions) {
        Ok(records) => records,
        Err(e) => {
            return ProofReport {
                checks: vec![ProofCheck {
                    name: "canonical merge".into(),
                    passed: false,
                    diffs: Vec::new(),
                    error: Some(e.to_string()),
                }],
            };
        }
    };

    let mut checks = check_commutativity(schema, ids, contributions, &canonical);
    checks.extend(check_idempotency(schema, ids, contributions, &canonical));
    checks.extend(check_associativity(schema, ids, contributions));

    log::debug!("ran {} equivalence checks", checks.len());
    ProofReport { checks }
}

//! Per-field meet rules.
//!
//! Defaulted fields form a two-point lattice `{default ⊑ anything-else}`:
//!
//! ```text
//! default ⊓ x       = x
//! x       ⊓ default = x
//! x       ⊓ x       = x
//! x       ⊓ y       = conflict   (x != y, neither is the default)
//! ```
//!
//! Optional and unknown fields treat absence as top and only define equality
//! between present values. Every rule is commutative, associative and
//! idempotent, which is what makes the fold in `engine` order-independent.

use genelattice_core::{FieldValue, Schema};

use crate::error::FieldConflict;

/// Meet of two concrete values of a defaulted field.
pub fn merge_field(
    name: &str,
    existing: &FieldValue,
    incoming: &FieldValue,
    default: &FieldValue,
) -> Result<FieldValue, FieldConflict> {
    if incoming == default {
        return Ok(existing.clone());
    }
    if existing == default || existing == incoming {
        return Ok(incoming.clone());
    }
    Err(conflict(name, existing, incoming))
}

/// Meet of two possibly-absent values of an optional field.
pub fn merge_optional(
    name: &str,
    existing: Option<&FieldValue>,
    incoming: Option<&FieldValue>,
) -> Result<Option<FieldValue>, FieldConflict> {
    match (existing, incoming) {
        (e, None) => Ok(e.cloned()),
        (None, Some(i)) => Ok(Some(i.clone())),
        (Some(e), Some(i)) if e == i => Ok(Some(e.clone())),
        (Some(e), Some(i)) => Err(conflict(name, e, i)),
    }
}

/// Meet `incoming` into whatever `existing` holds for `field`, choosing the rule
/// from the schema. A missing defaulted value counts as its default; unknown
/// fields follow the optional rule.
pub fn meet_value(
    schema: &Schema,
    field: &str,
    existing: Option<&FieldValue>,
    incoming: &FieldValue,
) -> Result<FieldValue, FieldConflict> {
    match schema.default_of(field) {
        Some(default) => merge_field(field, existing.unwrap_or(default), incoming, default),
        None => merge_optional(field, existing, Some(incoming))
            .map(|merged| merged.unwrap_or_else(|| incoming.clone())),
    }
}

fn conflict(name: &str, existing: &FieldValue, incoming: &FieldValue) -> FieldConflict {
    FieldConflict {
        field: name.to_string(),
        existing: existing.clone(),
        incoming: incoming.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> FieldValue {
        FieldValue::from(v)
    }

    #[test]
    fn defaulted_bool_rules() {
        let f = FieldValue::Bool(false);
        let t = FieldValue::Bool(true);
        assert_eq!(merge_field("_in_go", &f, &f, &f).unwrap(), f);
        assert_eq!(merge_field("_in_go", &f, &t, &f).unwrap(), t);
        assert_eq!(merge_field("_in_go", &t, &f, &f).unwrap(), t);
        assert_eq!(merge_field("_in_go", &t, &t, &f).unwrap(), t);
    }

    #[test]
    fn defaulted_string_conflict() {
        let d = s("");
        assert_eq!(merge_field("go_id", &d, &s("GO:1"), &d).unwrap(), s("GO:1"));
        assert_eq!(merge_field("go_id", &s("GO:1"), &d, &d).unwrap(), s("GO:1"));
        assert_eq!(merge_field("go_id", &s("GO:1"), &s("GO:1"), &d).unwrap(), s("GO:1"));

        let err = merge_field("go_id", &s("GO:1"), &s("GO:2"), &d).unwrap_err();
        assert_eq!(err.field, "go_id");
        assert_eq!(err.existing, s("GO:1"));
        assert_eq!(err.incoming, s("GO:2"));
    }

    #[test]
    fn defaulted_field_is_commutative() {
        let d = s("");
        let values = [s(""), s("a"), s("b")];
        for x in &values {
            for y in &values {
                let xy = merge_field("f", x, y, &d);
                let yx = merge_field("f", y, x, &d);
                assert_eq!(xy.is_ok(), yx.is_ok());
                if let (Ok(a), Ok(b)) = (xy, yx) {
                    assert_eq!(a, b);
                }
            }
        }
    }

    #[test]
    fn optional_rules() {
        let a = FieldValue::from(vec!["cleft palate"]);
        let b = FieldValue::from(vec!["micrognathia"]);
        assert_eq!(merge_optional("phenotypes", None, None).unwrap(), None);
        assert_eq!(merge_optional("phenotypes", None, Some(&a)).unwrap(), Some(a.clone()));
        assert_eq!(merge_optional("phenotypes", Some(&a), None).unwrap(), Some(a.clone()));
        assert_eq!(merge_optional("phenotypes", Some(&a), Some(&a)).unwrap(), Some(a.clone()));
        assert!(merge_optional("phenotypes", Some(&a), Some(&b)).is_err());
    }

    #[test]
    fn meet_value_dispatches_on_schema() {
        let schema = Schema::gene();
        // Missing defaulted value counts as default.
        assert_eq!(meet_value(&schema, "_in_hpo", None, &FieldValue::Bool(true)).unwrap(), FieldValue::Bool(true));
        // Optional: a different present value conflicts.
        assert!(meet_value(&schema, "organism", Some(&s("Homo sapiens")), &s("Mus musculus")).is_err());
        // Unknown field behaves like optional.
        assert_eq!(meet_value(&schema, "new_field", None, &FieldValue::Int(4)).unwrap(), FieldValue::Int(4));
        assert!(meet_value(&schema, "new_field", Some(&FieldValue::Int(4)), &FieldValue::Int(5)).is_err());
    }
}

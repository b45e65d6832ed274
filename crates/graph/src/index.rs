use std::collections::{BTreeMap, BTreeSet};

use genelattice_core::{EntityId, FieldValue, Unified};

use crate::relation::{RelationRule, SharingBounds};

/// Term → ids of entities carrying it.
pub type InvertedIndex = BTreeMap<String, BTreeSet<EntityId>>;

/// Group entities by the terms found in their `field` list.
///
/// `extract` maps a list item to its term; items yielding `None` are ignored.
/// Only terms shared by a count of entities within `bounds` are kept.
pub fn build_inverted_index<'a, F>(records: &'a Unified, field: &str, extract: F, bounds: SharingBounds) -> InvertedIndex
where
    F: Fn(&'a FieldValue) -> Option<&'a str>,
{
    let mut index: InvertedIndex = BTreeMap::new();

    for (id, record) in records {
        for item in record.list(field) {
            if let Some(term) = extract(item) {
                index.entry(term.to_string()).or_default().insert(id.clone());
            }
        }
    }

    index.retain(|_, ids| bounds.contains(ids.len()));
    index
}

/// Index for a term-based rule.
pub fn index_for_rule(records: &Unified, rule: &RelationRule) -> InvertedIndex {
    build_inverted_index(records, rule.field, |item| rule.extraction.term(item), rule.bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use genelattice_core::Schema;

    fn records(entries: &[(&str, &[&str])]) -> Unified {
        let schema = Schema::gene();
        entries
            .iter()
            .map(|(id, phenotypes)| {
                let rec = schema
                    .new_record(id)
                    .with_field("phenotypes", FieldValue::from(phenotypes.to_vec()));
                (id.to_string(), rec)
            })
            .collect()
    }

    #[test]
    fn sharing_range_filters_terms() {
        let records = records(&[
            ("A", &["cleft lip", "hypodontia", "unique"]),
            ("B", &["cleft lip", "hypodontia"]),
            ("C", &["hypodontia"]),
        ]);
        let bounds = SharingBounds {
            min_sharing: 2,
            max_sharing: 2,
        };
        let index = build_inverted_index(&records, "phenotypes", FieldValue::as_str, bounds);
        assert_eq!(index.len(), 1);
        let ids: Vec<_> = index["cleft lip"].iter().map(String::as_str).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn missing_or_non_list_field_contributes_nothing() {
        let schema = Schema::gene();
        let mut records = Unified::new();
        records.insert("A".into(), schema.new_record("A"));
        records.insert(
            "B".into(),
            schema.new_record("B").with_field("phenotypes", FieldValue::from("not a list")),
        );
        let bounds = SharingBounds {
            min_sharing: 1,
            max_sharing: 10,
        };
        assert!(build_inverted_index(&records, "phenotypes", FieldValue::as_str, bounds).is_empty());
    }
}

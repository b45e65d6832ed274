use std::collections::BTreeMap;

use genelattice_core::Unified;
use serde::Serialize;

use crate::contribution::Contribution;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeSummary {
    pub entities: usize,
    pub contributions: usize,
    /// Entity entries folded into a record.
    pub applied_entries: usize,
    /// Entity entries dropped because their id is not in the universe.
    pub skipped_entries: usize,
    /// Entities touched per source, in universe only.
    pub per_source: BTreeMap<String, usize>,
}

/// Compute summary statistics for a successful merge.
pub fn compute_summary(records: &Unified, contributions: &[Contribution], skipped_entries: usize) -> MergeSummary {
    let mut per_source: BTreeMap<String, usize> = BTreeMap::new();
    let mut applied_entries = 0;

    for c in contributions {
        let touched = c.entries.keys().filter(|id| records.contains_key(*id)).count();
        applied_entries += touched;
        *per_source.entry(c.source.clone()).or_insert(0) += touched;
    }

    MergeSummary {
        entities: records.len(),
        contributions: contributions.len(),
        applied_entries,
        skipped_entries,
        per_source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genelattice_core::Schema;

    #[test]
    fn summary_counts() {
        let schema = Schema::gene();
        let mut records = Unified::new();
        for id in ["IRF6", "MSX1"] {
            records.insert(id.to_string(), schema.new_record(id));
        }
        let contributions = vec![
            Contribution::new("GO").with("IRF6", "_in_go", true).with("MSX1", "_in_go", true),
            Contribution::new("HPO").with("IRF6", "_in_hpo", true).with("ZZZ", "_in_hpo", true),
        ];
        let summary = compute_summary(&records, &contributions, 1);
        assert_eq!(summary.entities, 2);
        assert_eq!(summary.contributions, 2);
        assert_eq!(summary.applied_entries, 3);
        assert_eq!(summary.skipped_entries, 1);
        assert_eq!(summary.per_source["GO"], 2);
        assert_eq!(summary.per_source["HPO"], 1);
    }
}

//! Relation kinds and the rules that derive edges for them.
//!
//! Each kind is backed by one list-valued record field. Term kinds group
//! entities sharing a term through an inverted index; the partner kind links
//! an entity straight to the ids it lists.

use std::fmt;
use std::str::FromStr;

use genelattice_core::FieldValue;
use serde::{Deserialize, Serialize};

/// The closed set of relationship types.
///
/// Declaration order is the tie-break order used when picking a dominant
/// relation: phenotype < syndrome < pathway < ppi.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Phenotype,
    Syndrome,
    Pathway,
    Ppi,
}

impl RelationKind {
    pub const ALL: [RelationKind; 4] = [Self::Phenotype, Self::Syndrome, Self::Pathway, Self::Ppi];

    pub fn name(self) -> &'static str {
        match self {
            Self::Phenotype => "phenotype",
            Self::Syndrome => "syndrome",
            Self::Pathway => "pathway",
            Self::Ppi => "ppi",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RelationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| format!("unknown relation kind '{s}' (expected phenotype, syndrome, pathway or ppi)"))
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// How a list item turns into something an edge can be built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// The item is a string term.
    Item,
    /// The item is a map; the term is its `key` entry, and the item counts only
    /// when `filter` (key, expected string) matches.
    MapField {
        key: &'static str,
        filter: Option<(&'static str, &'static str)>,
    },
    /// The item is the id of another entity, linked directly.
    Partner,
}

impl Extraction {
    /// Term (or partner id) carried by `item`, if any.
    pub fn term<'a>(&self, item: &'a FieldValue) -> Option<&'a str> {
        match self {
            Self::Item | Self::Partner => item.as_str(),
            Self::MapField { key, filter } => {
                if let Some((fk, expected)) = filter {
                    if item.get(fk).and_then(FieldValue::as_str) != Some(*expected) {
                        return None;
                    }
                }
                item.get(key).and_then(FieldValue::as_str)
            }
        }
    }

    pub fn is_partner(&self) -> bool {
        matches!(self, Self::Partner)
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Inclusive range of how many entities may share a term for it to produce
/// edges. Filters out terms that are unique or near-universal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SharingBounds {
    pub min_sharing: usize,
    pub max_sharing: usize,
}

impl SharingBounds {
    pub fn contains(&self, count: usize) -> bool {
        self.min_sharing <= count && count <= self.max_sharing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationRule {
    pub kind: RelationKind,
    pub field: &'static str,
    pub extraction: Extraction,
    /// Ignored for partner links.
    pub bounds: SharingBounds,
}

impl RelationRule {
    pub fn default_for(kind: RelationKind) -> Self {
        let bounds = |min_sharing, max_sharing| SharingBounds {
            min_sharing,
            max_sharing,
        };
        match kind {
            RelationKind::Phenotype => Self {
                kind,
                field: "phenotypes",
                extraction: Extraction::Item,
                bounds: bounds(2, 5),
            },
            RelationKind::Syndrome => Self {
                kind,
                field: "omim_syndromes",
                extraction: Extraction::Item,
                bounds: bounds(2, 100),
            },
            RelationKind::Pathway => Self {
                kind,
                field: "go_terms",
                extraction: Extraction::MapField {
                    key: "term_name",
                    filter: Some(("aspect", "P")),
                },
                bounds: bounds(2, 8),
            },
            RelationKind::Ppi => Self {
                kind,
                field: "string_partners",
                extraction: Extraction::Partner,
                bounds: bounds(1, usize::MAX),
            },
        }
    }
}

/// One rule per relation kind, in kind order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationRules {
    rules: [RelationRule; 4],
}

impl Default for RelationRules {
    fn default() -> Self {
        Self {
            rules: RelationKind::ALL.map(RelationRule::default_for),
        }
    }
}

impl RelationRules {
    pub fn get(&self, kind: RelationKind) -> &RelationRule {
        &self.rules[kind as usize]
    }

    /// Replace the sharing bounds for `kind`.
    pub fn with_bounds(mut self, kind: RelationKind, bounds: SharingBounds) -> Self {
        self.rules[kind as usize].bounds = bounds;
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &RelationRule> {
        self.rules.iter()
    }
}

// Run settings
// Loaded from ~/.config/genelattice/settings.toml

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use genelattice_graph::{RelationKind, RelationRules, SharingBounds};
use genelattice_merge::{ConflictPolicy, MergeOptions};
use serde::{Deserialize, Serialize};

pub use genelattice_graph::AnalysisOptions;

use crate::error::ConfigError;

/// Merge behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeSettings {
    /// `batch` collects every conflict; `fail_fast` stops at the first
    pub policy: ConflictPolicy,
    /// Validate unified records against the schema after merging
    pub validate: bool,
}

/// ```toml
/// [merge]
/// policy = "batch"
/// validate = true
///
/// [relations.phenotype]
/// min_sharing = 2
/// max_sharing = 8
///
/// [analysis]
/// top_n = 20
/// ```
///
/// Every section is optional; relation kinds not listed keep their built-in bounds.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub merge: MergeSettings,
    pub relations: BTreeMap<RelationKind, SharingBounds>,
    pub analysis: AnalysisOptions,
}

impl Settings {
    /// Default settings file location, if the platform has a config directory.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("genelattice").join("settings.toml"))
    }

    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(input).map_err(|e| ConfigError::Parse {
            path: None,
            message: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from an explicit file. A missing file is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml(&contents).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: Some(path.to_path_buf()),
                message,
            },
            other => other,
        })
    }

    /// Load from `explicit` when given, otherwise from the default location,
    /// falling back to built-in defaults when no default file exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        match Self::config_path() {
            Some(path) if path.exists() => {
                log::debug!("loading settings from {}", path.display());
                Self::load_from(&path)
            }
            _ => {
                log::debug!("no settings file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (kind, bounds) in &self.relations {
            if bounds.min_sharing == 0 {
                return Err(ConfigError::Invalid(format!("relations.{kind}: min_sharing must be at least 1")));
            }
            if bounds.min_sharing > bounds.max_sharing {
                return Err(ConfigError::Invalid(format!(
                    "relations.{kind}: min_sharing ({}) exceeds max_sharing ({})",
                    bounds.min_sharing, bounds.max_sharing
                )));
            }
        }

        if self.analysis.max_label_iterations == 0 {
            return Err(ConfigError::Invalid("analysis.max_label_iterations must be at least 1".into()));
        }

        Ok(())
    }

    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            policy: self.merge.policy,
            validate: self.merge.validate,
        }
    }

    /// Built-in relation rules with configured bounds applied.
    pub fn relation_rules(&self) -> RelationRules {
        self.relations
            .iter()
            .fold(RelationRules::default(), |rules, (kind, bounds)| rules.with_bounds(*kind, *bounds))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use std::collections::BTreeMap;

use genelattice_core::{FieldType, FieldValue, Schema};
use serde::Deserialize;

use crate::error::MergeError;

// ---------------------------------------------------------------------------
// Schema config
// ---------------------------------------------------------------------------

/// Record schema supplied as TOML.
///
/// ```toml
/// key_field = "symbol"
///
/// [fields.go_id]
/// type = "string"
/// default = ""
///
/// [fields.phenotypes]
/// type = "list"
/// ```
///
/// A field with a `default` is defaulted; one without is optional.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    #[serde(default = "default_key_field")]
    pub key_field: String,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
    #[serde(rename = "type")]
    pub ty: FieldType,
    #[serde(default)]
    pub default: Option<FieldValue>,
}

fn default_key_field() -> String {
    "symbol".into()
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl SchemaConfig {
    pub fn from_toml(input: &str) -> Result<Self, MergeError> {
        let config: SchemaConfig =
            toml::from_str(input).map_err(|e| MergeError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MergeError> {
        if self.key_field.is_empty() {
            return Err(MergeError::ConfigValidation("key_field must not be empty".into()));
        }

        if self.fields.contains_key(&self.key_field) {
            return Err(MergeError::ConfigValidation(format!(
                "key field '{}' must not be declared under [fields]",
                self.key_field
            )));
        }

        for (name, field) in &self.fields {
            if let Some(default) = &field.default {
                if !field.ty.accepts(default) {
                    return Err(MergeError::ConfigValidation(format!(
                        "field '{name}': default {default} is not a {}",
                        field.ty
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn into_schema(self) -> Schema {
        let mut schema = Schema::new(self.key_field);
        for (name, field) in self.fields {
            schema = match field.default {
                Some(default) => schema.with_defaulted(name, field.ty, default),
                None => schema.with_optional(name, field.ty),
            };
        }
        schema
    }
}

/// Parse, validate and build a schema in one step.
pub fn schema_from_toml(input: &str) -> Result<Schema, MergeError> {
    SchemaConfig::from_toml(input).map(SchemaConfig::into_schema)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

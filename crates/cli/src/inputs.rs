// Input loading and JSON output for the batch commands.
//
// Every loader maps its failure to a CliError with the exit code the shell
// contract promises; nothing below panics on bad input.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use genelattice_core::{EntityId, FieldMap, Record, Schema, Unified};
use genelattice_merge::{schema_from_toml, Contribution};
use serde::Serialize;

use crate::CliError;

fn read(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|e| CliError::usage(format!("cannot read {}: {e}", path.display())))
}

fn parse_json<T: serde::de::DeserializeOwned>(path: &Path, contents: &str) -> Result<T, CliError> {
    serde_json::from_str(contents).map_err(|e| CliError::usage(format!("{}: invalid JSON: {e}", path.display())))
}

/// Entity universe: a JSON array of ids.
pub fn load_universe(path: &Path) -> Result<Vec<EntityId>, CliError> {
    let contents = read(path)?;
    parse_json(path, &contents).map_err(|e| e.with_hint("the universe file must be a JSON array of ids"))
}

/// One contribution per file: `{id: {field: value}}`, source named after the file stem.
pub fn load_contribution(path: &Path) -> Result<Contribution, CliError> {
    let contents = read(path)?;
    let entries: BTreeMap<EntityId, FieldMap> = parse_json(path, &contents)?;
    let source = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| CliError::usage(format!("{}: cannot derive a source name", path.display())))?;
    Ok(Contribution::from_entries(source, entries))
}

pub fn load_contributions(paths: &[impl AsRef<Path>]) -> Result<Vec<Contribution>, CliError> {
    paths.iter().map(|p| load_contribution(p.as_ref())).collect()
}

/// Unified records as written by `glat merge`.
pub fn load_unified(path: &Path) -> Result<Unified, CliError> {
    let contents = read(path)?;
    let raw: BTreeMap<EntityId, FieldMap> = parse_json(path, &contents)?;
    Ok(raw
        .into_iter()
        .map(|(id, fields)| {
            let record = Record::from_fields(id.clone(), fields);
            (id, record)
        })
        .collect())
}

/// TOML schema when given, otherwise the built-in gene schema.
pub fn load_schema(path: Option<&Path>) -> Result<Schema, CliError> {
    match path {
        Some(path) => {
            let contents = read(path)?;
            schema_from_toml(&contents).map_err(|e| CliError::config(format!("{}: {e}", path.display())))
        }
        None => Ok(Schema::gene()),
    }
}

/// Pretty JSON to `output`, or to stdout when `None`.
pub fn write_json<T: Serialize + ?Sized>(value: &T, output: Option<&Path>) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| CliError::general(format!("cannot serialize output: {e}")))?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .map_err(|e| CliError::usage(format!("cannot create {}: {e}", parent.display())))?;
            }
            fs::write(path, json + "\n").map_err(|e| CliError::usage(format!("cannot write {}: {e}", path.display())))?;
            log::info!("wrote {}", path.display());
            Ok(())
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{json}").map_err(|e| CliError::general(format!("cannot write stdout: {e}")))
        }
    }
}

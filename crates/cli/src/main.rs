// genelattice CLI - batch merge and closure analysis
// Human summaries go to stderr; JSON goes to stdout or --output.

mod exit_codes;
mod inputs;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand};
use genelattice_config::{ConfigError, Settings};
use genelattice_core::{EntityId, Schema, Unified};
use genelattice_graph::{closure_by_relation_type, closure_report};
use genelattice_merge::{merge_all, prove_all, ConflictPolicy, MergeError, MergeOptions, MergeOutput};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use exit_codes::{
    EXIT_CONFIG, EXIT_ERROR, EXIT_MERGE_CONFLICT, EXIT_PROOF_FAILED, EXIT_SCHEMA_VIOLATION, EXIT_SUCCESS,
    EXIT_USAGE,
};
use inputs::{load_contributions, load_schema, load_unified, load_universe, write_json};

#[derive(Parser)]
#[command(name = "glat")]
#[command(about = "Unify per-source gene records and analyse their relationship closure")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Settings file (default: <config dir>/genelattice/settings.toml)
    #[arg(long, global = true, env = "GLAT_CONFIG")]
    config: Option<PathBuf>,

    /// Log more on stderr (-v info, -vv debug). RUST_LOG applies when absent.
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct MergeInputs {
    /// JSON array of entity ids
    #[arg(long)]
    universe: PathBuf,

    /// Contribution files, one per source (source name = file stem)
    #[arg(long, num_args = 1.., required = true)]
    contributions: Vec<PathBuf>,

    /// Record schema as TOML (default: built-in gene schema)
    #[arg(long)]
    schema: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge contributions into one record per entity
    #[command(after_help = "\
Examples:
  glat merge --universe ids.json --contributions GO.json HPO.json
  glat merge --universe ids.json --contributions *.json --fail-fast -o unified.json")]
    Merge {
        #[command(flatten)]
        inputs: MergeInputs,

        /// Stop at the first conflict
        #[arg(long)]
        fail_fast: bool,

        /// Validate unified records against the schema
        #[arg(long)]
        validate: bool,

        /// Output file (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Closure report over unified records
    #[command(after_help = "\
Examples:
  glat closure unified.json
  glat closure unified.json --by-relation -o components.json")]
    Closure {
        /// Unified records written by `glat merge`
        unified: PathBuf,

        /// Report non-singleton components per relation kind instead
        #[arg(long)]
        by_relation: bool,

        /// Output file (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Merge, then analyse; writes unified.json, closure_report.json and run_summary.json
    Run {
        #[command(flatten)]
        inputs: MergeInputs,

        /// Stop at the first conflict
        #[arg(long)]
        fail_fast: bool,

        /// Validate unified records against the schema
        #[arg(long)]
        validate: bool,

        /// Directory for the output files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Check unified records against the schema
    Validate {
        /// Unified records written by `glat merge`
        unified: PathBuf,

        /// Record schema as TOML (default: built-in gene schema)
        #[arg(long)]
        schema: Option<PathBuf>,
    },

    /// Check that merge order, duplication and grouping do not change the result
    Prove {
        #[command(flatten)]
        inputs: MergeInputs,

        /// Output file (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  genelattice-merge ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  genelattice-merge ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    // Also installs the `log` bridge, so library crates' records show up here.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = Settings::load(cli.config.as_deref())
        .map_err(CliError::from)
        .and_then(|settings| match cli.command {
            Commands::Merge {
                inputs,
                fail_fast,
                validate,
                output,
            } => cmd_merge(&settings, &inputs, fail_fast, validate, output.as_deref()),
            Commands::Closure {
                unified,
                by_relation,
                output,
            } => cmd_closure(&settings, &unified, by_relation, output.as_deref()),
            Commands::Run {
                inputs,
                fail_fast,
                validate,
                output_dir,
            } => cmd_run(&settings, &inputs, fail_fast, validate, &output_dir),
            Commands::Validate { unified, schema } => cmd_validate(&unified, schema.as_deref()),
            Commands::Prove { inputs, output } => cmd_prove(&inputs, output.as_deref()),
        });

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_CONFIG, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::config(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn merge_options(settings: &Settings, fail_fast: bool, validate: bool) -> MergeOptions {
    let mut options = settings.merge_options();
    if fail_fast {
        options.policy = ConflictPolicy::FailFast;
    }
    options.validate |= validate;
    options
}

#[derive(Serialize)]
struct ViolationOutput<'a, T: Serialize> {
    records: usize,
    violations: &'a [T],
}

/// Merge, mapping conflicts and violations to their exit codes. Conflict and
/// violation lists are printed to stdout as JSON before failing.
fn run_merge(
    schema: &Schema,
    universe: &[EntityId],
    inputs: &MergeInputs,
    options: &MergeOptions,
) -> Result<MergeOutput, CliError> {
    let contributions = load_contributions(&inputs.contributions)?;

    match merge_all(schema, universe.iter().map(String::as_str), &contributions, options) {
        Ok(out) if !out.violations.is_empty() => {
            write_json(
                &ViolationOutput {
                    records: out.records.len(),
                    violations: &out.violations,
                },
                None,
            )?;
            Err(CliError {
                code: EXIT_SCHEMA_VIOLATION,
                message: format!("{} schema violation(s); first: {}", out.violations.len(), out.violations[0]),
                hint: None,
            })
        }
        Ok(out) => Ok(out),
        Err(MergeError::Conflicts(conflicts)) => {
            #[derive(Serialize)]
            struct ConflictOutput<'a> {
                conflicts: &'a [genelattice_merge::Conflict],
            }
            write_json(&ConflictOutput { conflicts: &conflicts }, None)?;
            let hint = (options.policy == ConflictPolicy::FailFast)
                .then(|| "rerun without --fail-fast to list every conflict".to_string());
            Err(CliError {
                code: EXIT_MERGE_CONFLICT,
                message: match conflicts.first() {
                    Some(first) => format!("{} merge conflict(s); first: {first}", conflicts.len()),
                    None => "merge conflict".to_string(),
                },
                hint,
            })
        }
        Err(e) => Err(CliError::general(e.to_string())),
    }
}

fn report_merge(out: &MergeOutput) {
    let s = &out.summary;
    eprintln!(
        "merged {} source(s) into {} record(s): {} entries applied, {} outside the universe",
        s.contributions, s.entities, s.applied_entries, s.skipped_entries
    );
}

fn cmd_merge(
    settings: &Settings,
    inputs: &MergeInputs,
    fail_fast: bool,
    validate: bool,
    output: Option<&Path>,
) -> Result<(), CliError> {
    let schema = load_schema(inputs.schema.as_deref())?;
    let universe = load_universe(&inputs.universe)?;
    let out = run_merge(&schema, &universe, inputs, &merge_options(settings, fail_fast, validate))?;

    write_json(&out.records, output)?;
    report_merge(&out);
    Ok(())
}

fn cmd_closure(settings: &Settings, unified: &Path, by_relation: bool, output: Option<&Path>) -> Result<(), CliError> {
    let records = load_unified(unified)?;
    let rules = settings.relation_rules();

    if by_relation {
        let result = closure_by_relation_type(&records, &rules);
        write_json(&result, output)?;
        for (kind, components) in &result.per_kind {
            eprintln!("{kind}: {} component(s)", components.len());
        }
        eprintln!("combined: {} component(s)", result.combined.len());
        return Ok(());
    }

    let report = closure_report(&records, &rules, &settings.analysis);
    write_json(&report, output)?;
    let stats = &report.graph_stats;
    eprintln!(
        "graph: {} nodes, {} edges, {} components, density {}",
        stats.nodes, stats.edges, stats.components, stats.density
    );
    Ok(())
}

#[derive(Serialize)]
struct RunSummary<'a> {
    generated_at: String,
    merge: &'a genelattice_merge::MergeSummary,
    graph: &'a genelattice_graph::report::GraphStats,
    outputs: Vec<String>,
}

fn cmd_run(
    settings: &Settings,
    inputs: &MergeInputs,
    fail_fast: bool,
    validate: bool,
    output_dir: &Path,
) -> Result<(), CliError> {
    let schema = load_schema(inputs.schema.as_deref())?;
    let universe = load_universe(&inputs.universe)?;
    let out = run_merge(&schema, &universe, inputs, &merge_options(settings, fail_fast, validate))?;
    report_merge(&out);

    let unified_path = output_dir.join("unified.json");
    write_json(&out.records, Some(&unified_path))?;

    let report = closure_report(&out.records, &settings.relation_rules(), &settings.analysis);
    let report_path = output_dir.join("closure_report.json");
    write_json(&report, Some(&report_path))?;

    let summary_path = output_dir.join("run_summary.json");
    let summary = RunSummary {
        generated_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        merge: &out.summary,
        graph: &report.graph_stats,
        outputs: [&unified_path, &report_path]
            .iter()
            .map(|p| p.display().to_string())
            .collect(),
    };
    write_json(&summary, Some(&summary_path))?;

    eprintln!(
        "wrote {}, {} and {}",
        unified_path.display(),
        report_path.display(),
        summary_path.display()
    );
    Ok(())
}

fn cmd_validate(unified: &Path, schema: Option<&Path>) -> Result<(), CliError> {
    let schema = load_schema(schema)?;
    let records: Unified = load_unified(unified)?;
    let violations = schema.validate_all(records.values());

    write_json(
        &ViolationOutput {
            records: records.len(),
            violations: &violations,
        },
        None,
    )?;

    match violations.first() {
        None => {
            eprintln!("{} record(s) valid", records.len());
            Ok(())
        }
        Some(first) => Err(CliError {
            code: EXIT_SCHEMA_VIOLATION,
            message: format!("{} schema violation(s); first: {first}", violations.len()),
            hint: None,
        }),
    }
}

fn cmd_prove(inputs: &MergeInputs, output: Option<&Path>) -> Result<(), CliError> {
    let schema = load_schema(inputs.schema.as_deref())?;
    let universe = load_universe(&inputs.universe)?;
    let contributions = load_contributions(&inputs.contributions)?;

    let report = prove_all(&schema, &universe, &contributions);
    write_json(&report, output)?;

    let failed = report.failures().count();
    if failed == 0 {
        eprintln!("all {} equivalence check(s) passed", report.checks.len());
        return Ok(());
    }

    Err(CliError {
        code: EXIT_PROOF_FAILED,
        message: format!("{failed} of {} equivalence check(s) failed", report.checks.len()),
        hint: None,
    })
}

//! Binary entry point for the saldup CLI.
//!
//! This module provides the command-line interface over the duplication
//! engine: precondition checks, tracing setup, dispatch, and report
//! rendering.
//!
//! ## Usage
//!
//! ```bash
//! # Duplicate GroupA as GroupB (writes files and patches the manifest)
//! saldup duplicate --from GroupA --to GroupB
//!
//! # Preview the same run without writing anything
//! saldup duplicate --from GroupA --to GroupB --dry-run
//!
//! # Report project-wide identifier maxima
//! saldup scan
//!
//! # Add a per-group summary, as JSON
//! saldup --format json scan --group GroupA
//! ```

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::error;

use saldup_core::duplicate::{self, DuplicateRequest, DuplicationReport, ScanReport};
use saldup_core::error::SaldupError;

mod validate;

// ============================================================================
// CLI Structure
// ============================================================================

/// Group duplication for SAL projects.
///
/// Saldup copies a group subtree under a new name, remapping every GUID and
/// definition ID so the duplicate cannot collide with the rest of the
/// project, and patches the project manifest to include the new files.
#[derive(Parser, Debug)]
#[command(
    name = "saldup",
    version,
    about = "Duplicate a SAL project group with fresh identifiers"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Project root directory (default: current directory).
    #[arg(long, global = true, default_value = ".")]
    project: PathBuf,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Report format.
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Output format for reports and errors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable text summary (default).
    #[default]
    Text,
    /// Status-first JSON envelope.
    Json,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Duplicate a group under a new name.
    ///
    /// Discovery and planning run first; files are written and the manifest
    /// is patched only once the whole remapping is decided.
    Duplicate {
        /// Name of the group to copy.
        #[arg(long)]
        from: String,
        /// Name of the group to create.
        #[arg(long)]
        to: String,
        /// Plan and report without writing anything.
        #[arg(long)]
        dry_run: bool,
    },
    /// Scan the project and report identifier maxima. Never mutates.
    Scan {
        /// Group to summarize in addition to the project-wide counts.
        #[arg(long)]
        group: Option<String>,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.global.log_level);
    let format = cli.global.format;

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err.error_code();
            error!("{}", err);
            if format == OutputFormat::Json {
                let response = ErrorResponse {
                    status: "error",
                    code: code.code(),
                    message: err.to_string(),
                };
                if let Ok(json) = serde_json::to_string_pretty(&response) {
                    println!("{}", json);
                    let _ = io::stdout().flush();
                }
            }
            ExitCode::from(code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), SaldupError> {
    let root = validate::resolve_project_root(&cli.global.project)?;
    match cli.command {
        Command::Duplicate { from, to, dry_run } => {
            execute_duplicate(root, from, to, dry_run, cli.global.format)
        }
        Command::Scan { group } => execute_scan(&root, group.as_deref(), cli.global.format),
    }
}

// ============================================================================
// Command Executors
// ============================================================================

/// Execute the duplicate command.
fn execute_duplicate(
    root: PathBuf,
    from: String,
    to: String,
    dry_run: bool,
    format: OutputFormat,
) -> Result<(), SaldupError> {
    validate::check_duplicate(&root, &from, &to)?;
    let report = duplicate::duplicate_group(&DuplicateRequest {
        root,
        from,
        to,
        dry_run,
    })?;
    render_duplication(&report, format)
}

/// Execute the scan command.
fn execute_scan(root: &Path, group: Option<&str>, format: OutputFormat) -> Result<(), SaldupError> {
    if let Some(name) = group {
        validate::check_group_name(name)?;
    }
    let report = duplicate::scan_project(root, group)?;
    render_scan(&report, format)
}

// ============================================================================
// Report Rendering
// ============================================================================

/// Status-first JSON envelope wrapping a successful report.
#[derive(Debug, Serialize)]
struct Response<'a, T> {
    status: &'static str,
    #[serde(flatten)]
    report: &'a T,
}

/// JSON error envelope for `--format json`.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: &'static str,
    code: u8,
    message: String,
}

/// Serialize a report into the JSON envelope on stdout.
fn emit_json<T: Serialize>(report: &T) -> Result<(), SaldupError> {
    let envelope = Response {
        status: "ok",
        report,
    };
    let json = serde_json::to_string_pretty(&envelope)
        .map_err(|e| SaldupError::internal(e.to_string()))?;
    println!("{}", json);
    let _ = io::stdout().flush();
    Ok(())
}

/// Render a duplication report, maxima first, one line per remap.
fn render_duplication(report: &DuplicationReport, format: OutputFormat) -> Result<(), SaldupError> {
    if format == OutputFormat::Json {
        return emit_json(report);
    }
    if report.dry_run {
        println!("Dry run: would duplicate '{}' as '{}'", report.from, report.to);
    } else {
        println!("Duplicated '{}' as '{}'", report.from, report.to);
    }
    println!(
        "  max definition id {}, max order id {}; duplicate order id {}",
        report.max_definition_id, report.max_order_id, report.new_order_id
    );
    for entry in &report.definitions {
        println!(
            "  definition {} -> {}  {} ({})",
            entry.old_id, entry.new_id, entry.name, entry.new_path
        );
    }
    let written = if report.dry_run { "planned" } else { "written" };
    println!(
        "  {} GUID(s) replaced, {} file(s) {}",
        report.guids_remapped,
        report.files_written.len(),
        written
    );
    if let Some(ref manifest) = report.manifest {
        println!(
            "  manifest {} patched, {} line(s) inserted (backup {})",
            manifest.manifest, manifest.lines_inserted, manifest.backup
        );
    }
    Ok(())
}

/// Render a scan report.
fn render_scan(report: &ScanReport, format: OutputFormat) -> Result<(), SaldupError> {
    if format == OutputFormat::Json {
        return emit_json(report);
    }
    println!("Scanned {}", report.root);
    println!(
        "  {} definition file(s), max definition id {}, max order id {}",
        report.definitions, report.max_definition_id, report.max_order_id
    );
    if let Some(ref group) = report.group {
        println!(
            "  group {}: {} file(s) ({} definition, {} guid-bearing, {} plain), {} GUID(s)",
            group.group,
            group.files,
            group.definition_files,
            group.guid_bearing_files,
            group.plain_files,
            group.guids
        );
        if !group.definition_ids.is_empty() {
            let ids: Vec<String> = group.definition_ids.iter().map(|id| id.to_string()).collect();
            println!("  definition ids: {}", ids.join(", "));
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod cli_parsing {
        use super::*;

        #[test]
        fn parse_duplicate_defaults() {
            let args = ["saldup", "duplicate", "--from", "GroupA", "--to", "GroupB"];
            let cli = Cli::try_parse_from(args).unwrap();
            assert_eq!(cli.global.project, PathBuf::from("."));
            assert!(matches!(cli.global.format, OutputFormat::Text));
            assert!(matches!(cli.global.log_level, LogLevel::Warn));
            match cli.command {
                Command::Duplicate { from, to, dry_run } => {
                    assert_eq!(from, "GroupA");
                    assert_eq!(to, "GroupB");
                    assert!(!dry_run);
                }
                _ => panic!("expected Duplicate"),
            }
        }

        #[test]
        fn parse_duplicate_dry_run() {
            let args = [
                "saldup",
                "duplicate",
                "--from",
                "GroupA",
                "--to",
                "GroupB",
                "--dry-run",
            ];
            let cli = Cli::try_parse_from(args).unwrap();
            match cli.command {
                Command::Duplicate { dry_run, .. } => assert!(dry_run),
                _ => panic!("expected Duplicate"),
            }
        }

        #[test]
        fn duplicate_requires_both_names() {
            let args = ["saldup", "duplicate", "--from", "GroupA"];
            assert!(Cli::try_parse_from(args).is_err());
        }

        #[test]
        fn parse_scan_without_group() {
            let args = ["saldup", "scan"];
            let cli = Cli::try_parse_from(args).unwrap();
            match cli.command {
                Command::Scan { group } => assert!(group.is_none()),
                _ => panic!("expected Scan"),
            }
        }

        #[test]
        fn parse_scan_with_group() {
            let args = ["saldup", "scan", "--group", "GroupA"];
            let cli = Cli::try_parse_from(args).unwrap();
            match cli.command {
                Command::Scan { group } => assert_eq!(group, Some("GroupA".to_string())),
                _ => panic!("expected Scan"),
            }
        }

        #[test]
        fn parse_global_args_before_subcommand() {
            let args = ["saldup", "--project", "/plant", "--format", "json", "scan"];
            let cli = Cli::try_parse_from(args).unwrap();
            assert_eq!(cli.global.project, PathBuf::from("/plant"));
            assert!(matches!(cli.global.format, OutputFormat::Json));
        }

        #[test]
        fn parse_global_args_after_subcommand() {
            let args = [
                "saldup",
                "duplicate",
                "--from",
                "GroupA",
                "--to",
                "GroupB",
                "--format",
                "json",
                "--log-level",
                "debug",
            ];
            let cli = Cli::try_parse_from(args).unwrap();
            assert!(matches!(cli.global.format, OutputFormat::Json));
            assert!(matches!(cli.global.log_level, LogLevel::Debug));
        }

        #[test]
        fn unknown_subcommand_is_rejected() {
            let args = ["saldup", "copy", "--from", "GroupA", "--to", "GroupB"];
            assert!(Cli::try_parse_from(args).is_err());
        }
    }

    mod json_envelopes {
        use super::*;

        #[test]
        fn error_response_serializes_status_first() {
            let response = ErrorResponse {
                status: "error",
                code: 3,
                message: "group 'GroupA' not found at /plant/GroupA".to_string(),
            };
            let json = serde_json::to_string(&response).unwrap();
            assert!(json.starts_with(r#"{"status":"error""#));
            assert!(json.contains(r#""code":3"#));
        }

        #[test]
        fn ok_envelope_flattens_the_report() {
            #[derive(Serialize)]
            struct Probe {
                value: u64,
            }
            let probe = Probe { value: 7 };
            let envelope = Response {
                status: "ok",
                report: &probe,
            };
            let json = serde_json::to_string(&envelope).unwrap();
            assert_eq!(json, r#"{"status":"ok","value":7}"#);
        }
    }
}

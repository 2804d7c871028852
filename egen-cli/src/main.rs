use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use egen_codegen::emitters::PLUGIN_IDS;
use egen_codegen::{DirSink, GenConfig, Pipeline, StreamSink};
use egen_spec::loader::{self, SpecError, STDIN_NAME};
use egen_spec::types::common::Severity;
use egen_spec::types::error::ErrorEntry;
use egen_spec::SpecDocument;

#[derive(Parser)]
#[command(name = "egen", about = "egen – C++ source generator for opcode, dtype and API specifications")]
#[command(version, propagate_version = true)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate sources from one or more specification documents
    Generate(GenerateArgs),
    /// Validate specification documents without generating
    Validate {
        /// Spec files or directories (reads standard input when omitted)
        specs: Vec<PathBuf>,
    },
    /// Print the JSON Schema of the specification document
    Schema,
}

#[derive(Args)]
struct GenerateArgs {
    /// Plugin to run, repeatable (defaults to every plugin)
    #[arg(short, long = "plugin")]
    plugins: Vec<String>,
    /// Spec files or directories, merged in order (reads standard input when omitted)
    specs: Vec<PathBuf>,
    /// Output directory (prints every file to standard output when omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
    /// Prefix removed from the output directory to form include paths
    #[arg(long, default_value = "")]
    strip_prefix: String,
    /// Generator settings (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Generate(args) => cmd_generate(&args),
        Command::Validate { specs } => cmd_validate(&specs),
        Command::Schema => cmd_schema(),
    };

    match result {
        Ok(success) => {
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            ExitCode::from(1)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Load the merged document and the file name validation entries refer to.
fn load_spec(paths: &[PathBuf]) -> Result<(SpecDocument, String), SpecError> {
    match paths {
        [] => Ok((loader::load_reader(std::io::stdin().lock())?, STDIN_NAME.to_string())),
        [single] => Ok((
            loader::load_specs(paths)?,
            single.to_string_lossy().into_owned(),
        )),
        _ => Ok((loader::load_specs(paths)?, String::new())),
    }
}

fn print_entries(entries: &[ErrorEntry]) {
    for entry in entries {
        let severity_str = match entry.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
            Severity::Info => "info".blue().bold(),
        };

        if entry.file.is_empty() {
            eprintln!(
                "  {} [{}] {} ({})",
                severity_str,
                entry.code.dimmed(),
                entry.message,
                entry.path.dimmed(),
            );
        } else {
            eprintln!(
                "  {} [{}] {} ({}:{})",
                severity_str,
                entry.code.dimmed(),
                entry.message,
                entry.file.dimmed(),
                entry.path.dimmed(),
            );
        }

        if let Some(suggestion) = &entry.suggestion {
            eprintln!("    {} {}", "hint:".cyan(), suggestion);
        }
    }
}

fn count(entries: &[ErrorEntry], severity: Severity) -> usize {
    entries.iter().filter(|e| e.severity == severity).count()
}

/// Load and validate, printing every problem found. Returns `None` when
/// the document has errors.
fn checked_spec(paths: &[PathBuf]) -> Result<Option<SpecDocument>> {
    let (doc, source) = match load_spec(paths) {
        Ok(loaded) => loaded,
        Err(SpecError::Schema(entries)) => {
            print_entries(&entries);
            eprintln!(
                "{} {} schema violation(s)",
                "✗".red().bold(),
                entries.len()
            );
            return Ok(None);
        }
        Err(e) => return Err(e).context("failed to load specification"),
    };

    let report = egen_valid::validator::validate_file(&doc, &source);
    print_entries(&report.errors);

    let error_count = count(&report.errors, Severity::Error);
    let warning_count = count(&report.errors, Severity::Warning);
    if error_count > 0 {
        eprintln!(
            "{} {} error(s), {} warning(s)",
            "✗".red().bold(),
            error_count,
            warning_count,
        );
        return Ok(None);
    }
    if warning_count > 0 {
        eprintln!(
            "{} Valid with {} warning(s)",
            "⚠".yellow().bold(),
            warning_count,
        );
    }
    Ok(Some(doc))
}

fn cmd_validate(paths: &[PathBuf]) -> Result<bool> {
    let Some(doc) = checked_spec(paths)? else {
        return Ok(false);
    };

    let opcodes = doc.opcode.as_ref().map_or(0, |o| o.opcalls.len());
    let dtypes = doc.dtype.as_ref().map_or(0, |d| d.len());
    let namespaces = doc.api.as_ref().map_or(0, |a| a.namespaces.len());
    println!(
        "{} Specification is valid ({} opcodes, {} dtypes, {} namespaces)",
        "✓".green().bold(),
        opcodes,
        dtypes,
        namespaces,
    );
    Ok(true)
}

fn cmd_generate(args: &GenerateArgs) -> Result<bool> {
    let config = match &args.config {
        Some(path) => GenConfig::load(path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => GenConfig::default(),
    };

    let Some(doc) = checked_spec(&args.specs)? else {
        eprintln!("{} fix the errors above before generating", "✗".red().bold());
        return Ok(false);
    };

    let ids: Vec<String> = if args.plugins.is_empty() {
        PLUGIN_IDS.iter().map(|id| id.to_string()).collect()
    } else {
        args.plugins.clone()
    };
    let mut pipeline = Pipeline::from_ids(ids.as_slice());
    log::info!("running plugins {:?}", pipeline.plugin_ids());
    let generated = pipeline
        .run(&doc, &config)
        .context("code generation failed")?;

    match &args.out {
        Some(out_dir) => {
            let mut sink = DirSink::new(out_dir, &args.strip_prefix);
            let written = Pipeline::emit(&generated, &mut sink)
                .with_context(|| format!("failed to write to '{}'", out_dir.display()))?;
            println!(
                "{} Generated {} file(s) → {}",
                "✓".green().bold(),
                written,
                out_dir.display()
            );
            for name in generated.keys() {
                println!("  {} {}", "→".dimmed(), name);
            }
        }
        None => {
            let include_path = egen_codegen::sink::include_path(Path::new(""), &args.strip_prefix);
            let mut sink = StreamSink::new(std::io::stdout().lock(), include_path);
            Pipeline::emit(&generated, &mut sink).context("failed to write to standard output")?;
            sink.into_inner().flush()?;
        }
    }
    Ok(true)
}

fn cmd_schema() -> Result<bool> {
    let schema = egen_spec::schema_def::document_schema();
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(true)
}

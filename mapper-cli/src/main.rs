use std::fs::File;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use mapper_cli::{convert_directory, init_logging, FileConfig, LogConfig, LogFormat, RunSummary};
use mapper_core::MapperConfig;
use mapper_fhir::{CodeTables, Mapper, SourceFormat, StateTable};

#[derive(Parser, Debug)]
#[command(
    name = "fhir-mapper",
    version,
    about = "Convert Synthea or Cerner flat exports into FHIR R4 collection bundles."
)]
struct Args {
    /// Source format: synthea or cerner (alias brainai).
    #[arg(value_parser = parse_format)]
    format: SourceFormat,
    /// Directory holding the .csv/.tsv exports.
    input: PathBuf,
    /// Existing directory that receives the bundles.
    output: PathBuf,
    /// JSON file with mapper settings.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write bundles without indentation.
    #[arg(long)]
    compact: bool,
    /// Log and skip malformed lines instead of failing the file.
    #[arg(long)]
    skip_malformed: bool,
    /// zipcodes.csv-style table replacing the built-in state names.
    #[arg(long)]
    states: Option<PathBuf>,
    /// Overrides RUST_LOG (error, warn, info, debug, trace).
    #[arg(long)]
    log_level: Option<tracing::Level>,
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

fn parse_format(value: &str) -> Result<SourceFormat, String> {
    SourceFormat::from_name(value)
        .ok_or_else(|| format!("unknown format {value:?} (expected synthea or cerner)"))
}

fn main() -> ExitCode {
    let args = Args::parse();
    let log_config = LogConfig::default()
        .with_level(args.log_level)
        .with_format(args.log_format)
        .with_ansi(std::io::stderr().is_terminal());
    if let Err(err) = init_logging(&log_config) {
        eprintln!("warning: logging disabled: {err}");
    }

    match run(&args) {
        Ok(summary) => {
            print_summary(&summary);
            if summary.has_failures() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<RunSummary> {
    let mut config = match &args.config {
        Some(path) => MapperConfig::from(FileConfig::load(path)?),
        None => MapperConfig::default(),
    };
    if args.compact {
        config.pretty_print = false;
    }
    if args.skip_malformed {
        config.skip_malformed_records = true;
    }

    let tables = match &args.states {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("cannot open state table {}", path.display()))?;
            let states = StateTable::from_reader(file)
                .with_context(|| format!("invalid state table {}", path.display()))?;
            CodeTables::with_states(states)
        }
        None => CodeTables::builtin(),
    };

    let mapper = Mapper::new(args.format, config, tables);
    convert_directory(&mapper, &args.input, &args.output)
}

fn print_summary(summary: &RunSummary) {
    for file in &summary.files {
        println!(
            "{}: {} {} mapped, {} skipped, {} malformed",
            file.path.display(),
            file.mapped,
            file.entity.label(),
            file.skipped,
            file.recovered
        );
    }
    for failure in &summary.failures {
        println!("{}: FAILED {}", failure.path.display(), failure.error);
    }
    for bundle in &summary.bundles {
        println!("wrote {} ({} entries)", bundle.path.display(), bundle.entries);
    }
}

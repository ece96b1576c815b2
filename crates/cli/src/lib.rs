use anyhow::{Context as AnyhowContext, Result};
use clap::{Parser, ValueEnum};
use code_splitter::{
    oracle_from_config, Decomposer, DecompositionStats, LengthOracle, MetricKind, SplitterConfig,
};
use models::{FileReport, InputFile, Report, UnitReport};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

mod models;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "code-splitter")]
#[command(about = "Split oversized method bodies into budget-bounded chunk trees", long_about = None)]
#[command(version)]
struct Cli {
    /// Parsed source files (JSON: {"path": ..., "units": [...]})
    #[arg(short, long = "input", required = true, num_args = 1..)]
    inputs: Vec<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the unit budget
    #[arg(long)]
    unit_budget: Option<usize>,

    /// Override the chunk budget
    #[arg(long)]
    chunk_budget: Option<usize>,

    /// Override the length metric
    #[arg(long, value_enum)]
    metric: Option<MetricArg>,

    /// Write the JSON report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the run summary and every diagnostic to this file
    #[arg(long)]
    diagnostics: Option<PathBuf>,

    /// Abort on the first unreadable or malformed input
    #[arg(long)]
    fail_fast: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MetricArg {
    Chars,
    #[value(name = "approx_tokens")]
    ApproxTokens,
    Bpe,
}

impl MetricArg {
    const fn as_domain(self) -> MetricKind {
        match self {
            Self::Chars => MetricKind::Chars,
            Self::ApproxTokens => MetricKind::ApproxTokens,
            Self::Bpe => MetricKind::Bpe,
        }
    }
}

pub fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = load_config(&cli)?;
    let oracle = oracle_from_config(&config).context("Failed to build length oracle")?;
    log::debug!(
        "Budgets: unit={} chunk={} metric={}",
        config.unit_budget,
        config.chunk_budget,
        config.metric.as_str()
    );

    let mut total = DecompositionStats::new();
    let mut files = Vec::with_capacity(cli.inputs.len());

    for input in &cli.inputs {
        let mut file_stats = DecompositionStats::new();
        match split_input(input, oracle.as_ref(), &config, &mut file_stats) {
            Ok(report) => {
                files.push(report);
                total.merge(file_stats);
            }
            Err(err) if cli.fail_fast => return Err(err),
            Err(err) => {
                log::warn!("Skipping {}: {err:#}", input.display());
                total.record_failed_input(input.display().to_string(), format!("{err:#}"));
            }
        }
    }

    let summary = total.summary();
    log::info!(
        "Split {} file(s) into {} chunk(s), {} truncated, {} failed input(s)",
        files.len(),
        summary.chunks,
        summary.truncated,
        summary.failed_inputs
    );

    let report = Report {
        files,
        stats: summary,
    };
    let json = serde_json::to_string_pretty(&report)?;
    match &cli.output {
        Some(path) => write_file(path, &json)?,
        None => print_stdout(&json)?,
    }

    if let Some(path) = &cli.diagnostics {
        write_file(path, &total.render_log())?;
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<SplitterConfig> {
    let mut config = match &cli.config {
        Some(path) => SplitterConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SplitterConfig::default(),
    };

    if let Some(unit) = cli.unit_budget {
        config.unit_budget = unit;
    }
    if let Some(chunk) = cli.chunk_budget {
        config.chunk_budget = chunk;
    }
    if let Some(metric) = cli.metric {
        config.metric = metric.as_domain();
    }
    Ok(config)
}

/// Decompose every unit of one input file, recording into `stats`
fn split_input(
    path: &Path,
    oracle: &dyn LengthOracle,
    config: &SplitterConfig,
    stats: &mut DecompositionStats,
) -> Result<FileReport> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let input: InputFile = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid input file {}", path.display()))?;

    let decomposer = Decomposer::new(oracle, config).with_source(input.path.clone());
    let units = input
        .units
        .iter()
        .map(|unit| UnitReport {
            name: unit.name.clone(),
            signature: unit.signature.clone(),
            chunk: decomposer.split_unit(unit, stats),
        })
        .collect();

    Ok(FileReport {
        path: input.path,
        units,
    })
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

//! gsm-overlap command line.
//!
//! ## Commands
//!
//! - `resolve`: one run over a catalog and an overlap file
//! - `windows`: one run per month between `--start` and `--end`
//!
//! ## Logging
//!
//! - `RUST_LOG`: log level filter (default: `gsm_overlap=info`)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! Logs go to stderr. Exit status is non-zero on any error.
//!
//! ## Usage
//!
//! ```bash
//! gsm-overlap resolve --catalog series.tsv --overlap overlap.tsv --out report/ --max-overlap 1
//! gsm-overlap windows --catalog series.tsv --overlap overlap.tsv --out monthly/ --start 2010.01 --end 2012.12
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gsm_overlap::{
    load_catalog, Config, Month, ReportWriter, ResolutionEngine, ResolutionPolicy, WindowError,
    WindowedDriver,
};

/// Resolve overlapping sample series: drop duplicates and supersets, trim
/// shared samples, report clusters.
#[derive(Parser)]
#[command(name = "gsm-overlap", version, about)]
struct Cli {
    /// Optional TOML configuration file with `[policy]` and `[window]` sections.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one catalog and overlap file.
    Resolve {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        policy: PolicyArgs,
    },

    /// Resolve monthly windows of a growing corpus.
    ///
    /// Window M holds the series published before the first day of M.
    /// Reports go to `<out>/<YYYY.MM>/`.
    Windows {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        policy: PolicyArgs,
        /// First month, `YYYY.MM`.
        #[arg(long)]
        start: Option<Month>,
        /// Last month, `YYYY.MM`, inclusive.
        #[arg(long)]
        end: Option<Month>,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Catalog file: one series per line, tab-delimited.
    #[arg(long)]
    catalog: PathBuf,
    /// Overlap evidence file: `ID1<TAB>ID2[<TAB>evidence...]` per line.
    #[arg(long)]
    overlap: PathBuf,
    /// Output directory.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args)]
struct PolicyArgs {
    /// Series with fewer samples are removed.
    #[arg(long)]
    min_samples: Option<usize>,
    /// Largest number of samples two kept series may share.
    #[arg(long)]
    max_overlap: Option<usize>,
    /// Smallest cluster written to the cluster files.
    #[arg(long)]
    min_cluster_size: Option<usize>,
}

impl PolicyArgs {
    fn apply(&self, mut policy: ResolutionPolicy) -> Result<ResolutionPolicy> {
        if let Some(n) = self.min_samples {
            policy.min_samples = n;
        }
        if let Some(n) = self.max_overlap {
            policy.max_overlap = n;
        }
        if let Some(n) = self.min_cluster_size {
            policy.min_cluster_size = n;
        }
        policy.validate()?;
        Ok(policy)
    }
}

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "gsm_overlap=info".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Read overlap lines. Lines that cannot be read are logged and skipped;
/// blank lines are dropped.
fn read_overlap_lines(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).with_context(|| format!("Failed to open overlap file: {}", path.display()))?;

    let mut lines = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        match line {
            Ok(line) if line.trim().is_empty() => {}
            Ok(line) => lines.push(line),
            Err(e) => warn!(path = %path.display(), line_no = idx + 1, error = %e, "Skipping unreadable overlap line"),
        }
    }

    info!(path = %path.display(), lines = lines.len(), "Overlap evidence read");
    Ok(lines)
}

fn resolve(input: &InputArgs, policy: ResolutionPolicy) -> Result<()> {
    let catalog = Arc::new(
        load_catalog(&input.catalog)
            .with_context(|| format!("Failed to load catalog: {}", input.catalog.display()))?,
    );
    let lines = read_overlap_lines(&input.overlap)?;

    let mut engine = ResolutionEngine::new(Arc::clone(&catalog));
    for (idx, line) in lines.iter().enumerate() {
        engine
            .add_overlap_line(line)
            .with_context(|| format!("{}: overlap line {}", input.overlap.display(), idx + 1))?;
    }

    let result = engine.find_with(policy)?.clone();
    result
        .check_invariants()
        .context("Classification invariant violated")?;

    let writer = ReportWriter::create(&input.out)?;
    let manifest = writer.write_result(&result, &engine.find_clusters(), catalog.as_ref())?;

    info!(
        out = %input.out.display(),
        duplicates = manifest.counts.duplicates,
        supersets = manifest.counts.supersets,
        removed = manifest.counts.removed,
        trimmed = manifest.counts.trimmed_series,
        fingerprint = %manifest.fingerprint,
        "Resolution finished"
    );
    Ok(())
}

fn windows(input: &InputArgs, policy: ResolutionPolicy, start: Month, end: Month) -> Result<()> {
    let catalog = Arc::new(
        load_catalog(&input.catalog)
            .with_context(|| format!("Failed to load catalog: {}", input.catalog.display()))?,
    );
    let lines = read_overlap_lines(&input.overlap)?;

    let driver = WindowedDriver::new(Arc::clone(&catalog), policy);
    let count = driver.run(start, end, &lines, |report| {
        let month = report.month;
        let report_err = |source| WindowError::Report { month, source };
        let writer = ReportWriter::create(input.out.join(month.to_string())).map_err(report_err)?;
        writer.write_window(&report, &catalog).map_err(report_err)?;
        Ok(())
    })?;

    info!(out = %input.out.display(), windows = count, "Windowed resolution finished");
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Resolve { input, policy } => {
            let policy = policy.apply(config.policy.clone())?;
            resolve(&input, policy)
        }
        Commands::Windows {
            input,
            policy,
            start,
            end,
        } => {
            let policy = policy.apply(config.policy.clone())?;
            let (Some(start), Some(end)) = (start.or(config.window.start), end.or(config.window.end)) else {
                bail!("windows needs --start and --end (or a [window] section in the config file)");
            };
            windows(&input, policy, start, end)
        }
    }
}

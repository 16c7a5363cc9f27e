//! har-compare
//!
//! Loads two HAR captures, normalizes them in parallel, compares them and
//! writes an HTML report (optionally JSON and a SQLite history as well).

mod cli;
mod summary;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use har_archive::load_archive;
use har_core::NormalizedExchange;
use har_diff::{Comparator, Comparison, Normalizer};
use har_report::{ReportOptions, ReportRenderer};
use har_store::ComparisonStore;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.compare_config()?;
    info!(
        baseline = %cli.baseline.display(),
        comparison = %cli.comparison.display(),
        timing_threshold_ms = config.timing_threshold_ms,
        "Starting comparison"
    );

    let comparator = Comparator::new(config).context("invalid configuration")?;

    let (baseline, candidate) = tokio::try_join!(
        load_side(comparator.normalizer().clone(), cli.baseline.clone()),
        load_side(comparator.normalizer().clone(), cli.comparison.clone()),
    )?;

    let comparison = comparator.compare_normalized(baseline, candidate);
    let selected: BTreeSet<String> = cli.domains.iter().cloned().collect();

    let options = ReportOptions::default()
        .with_title(cli.title.clone())
        .with_domains(selected.iter().cloned());
    ReportRenderer::new()
        .context("failed to prepare report template")?
        .write(&comparison, &options, &cli.output)
        .context("failed to write HTML report")?;

    if let Some(path) = &cli.json {
        write_json(&comparison, path)?;
    }

    if let Some(path) = &cli.db {
        record_run(&comparison, path, &cli)?;
    }

    print!("{}", summary::format_summary(&comparison.summary, &selected));
    println!("Report written to {}", cli.output.display());

    Ok(())
}

/// Load and normalize one archive on a blocking worker
async fn load_side(normalizer: Normalizer, path: PathBuf) -> Result<Vec<NormalizedExchange>> {
    tokio::task::spawn_blocking(move || -> Result<Vec<NormalizedExchange>> {
        let raw = load_archive(&path)
            .with_context(|| format!("failed to load archive {}", path.display()))?;
        Ok(normalizer.normalize_all(&raw))
    })
    .await
    .context("archive worker panicked")?
}

fn write_json(comparison: &Comparison, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, comparison)
        .with_context(|| format!("failed to write JSON to {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("failed to write JSON to {}", path.display()))?;
    info!(path = %path.display(), "Wrote JSON result");
    Ok(())
}

fn record_run(comparison: &Comparison, path: &Path, cli: &Cli) -> Result<()> {
    let mut store = ComparisonStore::open(path)
        .with_context(|| format!("failed to open database {}", path.display()))?;
    let run = store
        .record(
            comparison,
            &absolute(&cli.baseline),
            &absolute(&cli.comparison),
        )
        .context("failed to record comparison run")?;
    info!(run_id = %run.run_id, db = %path.display(), "Recorded run");
    Ok(())
}

fn absolute(path: &Path) -> String {
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

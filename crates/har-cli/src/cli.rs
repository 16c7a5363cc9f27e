use anyhow::{Context, Result};
use clap::Parser;
use har_config::{load_config_or_default, CompareConfig};
use std::path::PathBuf;

/// Compare two HAR captures of the same user flow.
#[derive(Parser, Debug)]
#[command(name = "har-compare", version)]
pub struct Cli {
    /// Baseline (old) HAR file.
    #[arg(value_name = "BASELINE")]
    pub baseline: PathBuf,

    /// Comparison (new) HAR file.
    #[arg(value_name = "COMPARISON")]
    pub comparison: PathBuf,

    /// HTML report to write.
    #[arg(long, short = 'o', value_name = "FILE", default_value = "har_compare.html")]
    pub output: PathBuf,

    /// Also write the full comparison as JSON.
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Record the run in this SQLite database.
    #[arg(long, value_name = "FILE")]
    pub db: Option<PathBuf>,

    /// YAML configuration file.
    #[arg(long, value_name = "FILE", env = "HAR_COMPARE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Timing deltas at or below this many milliseconds are noise.
    #[arg(long, value_name = "MS")]
    pub timing_threshold_ms: Option<f64>,

    /// Additional volatile query parameter (repeatable).
    #[arg(long = "volatile-param", value_name = "NAME")]
    pub volatile_params: Vec<String>,

    /// Additional volatile header (repeatable).
    #[arg(long = "volatile-header", value_name = "NAME")]
    pub volatile_headers: Vec<String>,

    /// Domains preselected in the report filter and shown in the summary
    /// (repeatable; default is all).
    #[arg(long = "domain", value_name = "DOMAIN")]
    pub domains: Vec<String>,

    /// Report page title.
    #[arg(long, default_value = "HAR Compare")]
    pub title: String,
}

impl Cli {
    /// Configuration file (or defaults) with command line overrides applied
    pub fn compare_config(&self) -> Result<CompareConfig> {
        let mut config = load_config_or_default(self.config.as_deref())
            .context("failed to load configuration")?;

        for param in &self.volatile_params {
            config = config.with_volatile_param(param);
        }
        for header in &self.volatile_headers {
            config = config.with_volatile_header(header);
        }
        if let Some(threshold) = self.timing_threshold_ms {
            config = config.with_timing_threshold_ms(threshold);
        }

        config
            .validate()
            .context("invalid command line configuration")?;
        Ok(config)
    }
}

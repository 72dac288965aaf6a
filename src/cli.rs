//! Command-line interface definitions for netsweep.
//!
//! Uses `clap` derive macros for declarative argument parsing.

use crate::config::AppSettings;
use crate::error::{CliResult, InputError};
use crate::input::read_targets;
use crate::output;
use crate::scanner::{scan_targets, Admission, ScanSummary, TcpProber};
use crate::types::parse_ports;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Concurrent TCP reachability scanner for address lists and CIDR ranges.
#[derive(Parser, Debug)]
#[command(name = "netsweep")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Scan addresses and CIDR ranges for reachable TCP ports", long_about = None)]
pub struct Args {
    /// File with one IP address or CIDR range per line
    #[arg(short = 'i', long, value_name = "FILE")]
    pub input: PathBuf,

    /// File to write `address:port:state` result lines to
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: PathBuf,

    /// Comma-separated list of ports to scan (e.g. "22,80,443")
    #[arg(short = 'p', long)]
    pub ports: String,

    /// Maximum number of hosts scanned at once [default: 100]
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Connection timeout per probe in milliseconds [default: 10000]
    #[arg(long = "timeout", value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Stop writing results after this many seconds without one
    #[arg(long = "idle-timeout", value_name = "SECS")]
    pub idle_timeout_secs: Option<u64>,

    /// How hosts are admitted once the thread cap is reached [default: pool]
    #[arg(long, value_enum)]
    pub admission: Option<Admission>,

    /// Append to the result file instead of truncating it
    #[arg(long)]
    pub append: bool,

    /// Path to a settings file (defaults to the XDG config directory)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Format of the summary printed after the scan
    #[arg(long, value_enum, default_value = "plain")]
    pub summary: OutputFormat,

    /// Show a progress bar over scanned hosts
    #[arg(long)]
    pub progress: bool,

    /// Verbose output (debug level, with module paths)
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Output format for the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable plain text
    #[default]
    Plain,
    /// JSON structured output
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl Args {
    /// Load the settings file and apply command-line overrides.
    pub fn settings(&self) -> CliResult<AppSettings> {
        let settings = match &self.config {
            Some(path) => AppSettings::load_from(path)?,
            None => AppSettings::load()?,
        };
        Ok(self.apply(settings))
    }

    fn apply(&self, mut settings: AppSettings) -> AppSettings {
        if let Some(threads) = self.threads {
            settings.threads = threads;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            settings.probe_timeout_ms = timeout_ms;
        }
        if self.idle_timeout_secs.is_some() {
            settings.idle_timeout_secs = self.idle_timeout_secs;
        }
        if let Some(admission) = self.admission {
            settings.admission = admission;
        }
        settings.append |= self.append;
        settings
    }

    /// Run the scan described by these arguments.
    ///
    /// Ports and targets are parsed before the result file is opened, so a
    /// bad port list leaves no output behind.
    pub async fn execute(&self, settings: &AppSettings) -> CliResult<ScanSummary> {
        let ports = parse_ports(&self.ports).map_err(InputError::from)?;
        let targets = read_targets(&self.input, &ports).await?;
        let writer = output::open_log(&self.output, settings.append).await?;

        let mut config = settings.scan_config();
        if self.progress {
            config = config.with_progress();
        }

        if !self.quiet && self.summary == OutputFormat::Plain {
            output::print_scan_header(
                &self.input,
                &self.output,
                ports.len(),
                config.threads,
                config.admission,
            );
        }
        info!(input = %self.input.display(), output = %self.output.display(), "targets loaded");

        let prober = Arc::new(TcpProber::new(config.probe_timeout));
        let summary = scan_targets(&targets, writer, prober, &config).await?;
        Ok(summary)
    }
}

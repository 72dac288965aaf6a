//! Scanner module - orchestrates a scan over a list of targets.
//!
//! Targets are walked in input order. Ranges are expanded into host
//! addresses, and every address becomes one dispatcher unit. Units publish
//! result lines onto a bounded channel that a single sink task drains into
//! the output log.

pub mod dispatcher;
pub mod probe;
pub mod range;
pub mod sink;

use crate::error::{ScanError, ScanResult};
use crate::types::{Port, Target};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWrite;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, info_span, warn, Instrument};

pub use dispatcher::{Admission, DispatchStats, Dispatcher, HostUnit};
pub use probe::{Prober, TcpProber, DEFAULT_PROBE_TIMEOUT};
pub use range::{expand_range, hosts_in_range, usable_hosts, RangeHosts};
pub use sink::{ResultSink, SinkStats};

/// One probe outcome, rendered as `address:port:state`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultLine {
    pub address: Option<IpAddr>,
    /// Copy of the scanned port with `is_open` filled in.
    pub port: Port,
}

impl ResultLine {
    pub fn new(address: Option<IpAddr>, port: Port) -> Self {
        Self { address, port }
    }
}

impl fmt::Display for ResultLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.address {
            Some(ip) => write!(f, "{}:{}:{}", ip, self.port, self.port.state()),
            None => write!(f, "<invalid>:{}:{}", self.port, self.port.state()),
        }
    }
}

/// Runtime settings for a scan.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Maximum number of units in flight; also the result channel capacity.
    pub threads: usize,
    /// Upper bound on a single connection attempt.
    pub probe_timeout: Duration,
    /// Stop logging after this long without results. `None` waits for the
    /// dispatcher to finish.
    pub idle_timeout: Option<Duration>,
    pub admission: Admission,
    /// Show a progress bar over expanded hosts.
    pub progress: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            threads: 100,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            idle_timeout: None,
            admission: Admission::default(),
            progress: false,
        }
    }
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_idle_timeout(mut self, idle: Option<Duration>) -> Self {
        self.idle_timeout = idle;
        self
    }

    pub fn with_admission(mut self, admission: Admission) -> Self {
        self.admission = admission;
        self
    }

    pub fn with_progress(mut self) -> Self {
        self.progress = true;
        self
    }
}

/// Totals for a finished scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub targets: usize,
    pub hosts: usize,
    pub lines_written: usize,
    pub open: usize,
    pub closed: usize,
    /// Results lost because the sink stopped on its idle timeout, including
    /// those of hosts that were never dispatched.
    pub dropped: usize,
    /// Hosts left unscanned after the sink stopped.
    pub skipped_hosts: usize,
    pub idle_timed_out: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Scan `targets` with the TCP connect prober and default settings.
pub async fn run_scan<W>(targets: &[Target], writer: W, threads: usize) -> ScanResult<ScanSummary>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let config = ScanConfig::new().with_threads(threads);
    let prober = Arc::new(TcpProber::new(config.probe_timeout));
    scan_targets(targets, writer, prober, &config).await
}

/// Scan `targets` with the given prober, writing result lines to `writer`.
///
/// Returns once every unit has finished and the sink has flushed its last
/// line (or given up on its idle timeout).
pub async fn scan_targets<W, P>(
    targets: &[Target],
    writer: W,
    prober: Arc<P>,
    config: &ScanConfig,
) -> ScanResult<ScanSummary>
where
    W: AsyncWrite + Unpin + Send + 'static,
    P: Prober,
{
    if config.threads == 0 {
        return Err(ScanError::InvalidConfig(
            "threads must be at least 1".to_string(),
        ));
    }
    if config.threads > Semaphore::MAX_PERMITS {
        return Err(ScanError::InvalidConfig(format!(
            "threads must be at most {}",
            Semaphore::MAX_PERMITS
        )));
    }

    let started_at = Utc::now();
    let start = Instant::now();
    info!(
        targets = targets.len(),
        threads = config.threads,
        admission = %config.admission,
        "starting scan"
    );

    let (tx, mut rx) = mpsc::channel(config.threads);
    let mut sink = ResultSink::new(writer).with_idle_timeout(config.idle_timeout);
    let sink_task = tokio::spawn(
        async move { sink.drain(&mut rx).await }.instrument(info_span!("result_sink")),
    );

    let progress = progress_bar(targets, config.progress);
    let mut dispatcher = Dispatcher::new(prober, tx, config.admission, config.threads)
        .with_progress(progress.clone());

    let mut hosts = 0usize;
    let mut stopped = false;
    'targets: for target in targets {
        match target.range {
            Some(network) => {
                debug!(%network, usable = %usable_hosts(network), "expanding range");
                for ip in expand_range(network) {
                    if !dispatcher
                        .admit(HostUnit::new(Some(ip), Arc::clone(&target.ports)))
                        .await
                    {
                        stopped = true;
                        break 'targets;
                    }
                    hosts += 1;
                }
            }
            None => {
                if !dispatcher
                    .admit(HostUnit::new(target.address, Arc::clone(&target.ports)))
                    .await
                {
                    stopped = true;
                    break 'targets;
                }
                hosts += 1;
            }
        }
    }

    let dispatch = dispatcher.finish().await;
    let sink_stats = sink_task.await??;
    progress.finish_and_clear();

    let (skipped_hosts, skipped_results) = if stopped {
        let ports = targets.first().map_or(0, |t| t.ports.len()) as u128;
        let skipped = planned_hosts(targets).saturating_sub(hosts as u128);
        warn!(skipped = %skipped, "result log closed, remaining hosts not scanned");
        (saturate(skipped), saturate(skipped.saturating_mul(ports)))
    } else {
        (0, 0)
    };

    let summary = ScanSummary {
        targets: targets.len(),
        hosts,
        lines_written: sink_stats.lines_written,
        open: dispatch.open,
        closed: dispatch.closed,
        dropped: dispatch.dropped.saturating_add(skipped_results),
        skipped_hosts,
        idle_timed_out: sink_stats.idle_timed_out,
        started_at,
        finished_at: Utc::now(),
        duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        hosts = summary.hosts,
        open = summary.open,
        lines = summary.lines_written,
        duration_ms = summary.duration_ms,
        "scan complete"
    );
    Ok(summary)
}

/// Number of hosts the targets expand to, saturating.
fn planned_hosts(targets: &[Target]) -> u128 {
    targets
        .iter()
        .map(|t| t.range.map_or(1, usable_hosts))
        .fold(0u128, u128::saturating_add)
}

fn saturate(n: u128) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

fn progress_bar(targets: &[Target], enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let total = planned_hosts(targets);
    let pb = ProgressBar::new(u64::try_from(total).unwrap_or(u64::MAX));
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} hosts ({percent}%)",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-"),
    );
    pb
}

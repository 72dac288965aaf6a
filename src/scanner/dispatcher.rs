//! Bounded-concurrency dispatch of scan units.
//!
//! A unit is one address together with the full port set; it is the only
//! thing the concurrency cap counts. Ports inside a unit are probed one after
//! another and each outcome is published on the result channel as soon as it
//! is known.

use super::probe::Prober;
use super::ResultLine;
use crate::types::PortSet;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

/// Rule deciding when the next unit may start.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Admission {
    /// Counting semaphore: a finishing unit frees exactly one slot.
    #[default]
    Pool,
    /// Fill up to `threads` units, then wait for all of them before
    /// starting the next batch.
    Batch,
}

impl fmt::Display for Admission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pool => write!(f, "pool"),
            Self::Batch => write!(f, "batch"),
        }
    }
}

/// One address and the ports to probe on it.
#[derive(Debug, Clone)]
pub struct HostUnit {
    /// `None` for targets whose input line did not parse.
    pub address: Option<IpAddr>,
    pub ports: PortSet,
}

impl HostUnit {
    pub fn new(address: Option<IpAddr>, ports: PortSet) -> Self {
        Self { address, ports }
    }
}

/// Totals over every unit the dispatcher ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub units: usize,
    pub open: usize,
    pub closed: usize,
    /// Results that could not be published because the sink had stopped.
    pub dropped: usize,
}

#[derive(Debug, Default)]
struct UnitOutcome {
    open: usize,
    closed: usize,
    dropped: usize,
}

/// Launches one task per [`HostUnit`], never more than `threads` at a time.
pub struct Dispatcher<P: Prober> {
    prober: Arc<P>,
    results: mpsc::Sender<ResultLine>,
    admission: Admission,
    threads: usize,
    running: usize,
    slots: Arc<Semaphore>,
    tasks: JoinSet<UnitOutcome>,
    progress: ProgressBar,
    stats: DispatchStats,
}

impl<P: Prober> Dispatcher<P> {
    /// Create a dispatcher. `threads` is clamped to `1..=Semaphore::MAX_PERMITS`.
    pub fn new(
        prober: Arc<P>,
        results: mpsc::Sender<ResultLine>,
        admission: Admission,
        threads: usize,
    ) -> Self {
        let threads = threads.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            prober,
            results,
            admission,
            threads,
            running: 0,
            slots: Arc::new(Semaphore::new(threads)),
            tasks: JoinSet::new(),
            progress: ProgressBar::hidden(),
            stats: DispatchStats::default(),
        }
    }

    /// Advance `progress` by one for every finished unit.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Start a unit, suspending first if the concurrency cap is reached.
    ///
    /// Returns `false` without starting anything once the result channel is
    /// closed; no further unit could publish, so the run is over.
    pub async fn admit(&mut self, unit: HostUnit) -> bool {
        let permit = match self.admission {
            Admission::Batch => {
                if self.running == self.threads {
                    debug!(batch = self.running, "batch full, waiting for it to drain");
                    self.join_all().await;
                    self.running = 0;
                }
                None
            }
            Admission::Pool => {
                self.reap_finished();
                // The semaphore is never closed, so acquiring cannot fail.
                Arc::clone(&self.slots).acquire_owned().await.ok()
            }
        };

        if self.results.is_closed() {
            debug!("result channel closed, not admitting further units");
            return false;
        }

        if self.admission == Admission::Batch {
            self.running += 1;
        }
        self.stats.units += 1;
        self.tasks.spawn(run_unit(
            Arc::clone(&self.prober),
            self.results.clone(),
            unit,
            self.progress.clone(),
            permit,
        ));
        true
    }

    /// Wait for every outstanding unit and return the run totals.
    ///
    /// Dropping the dispatcher's sender here is what lets the sink see the
    /// channel close once the last unit is done.
    pub async fn finish(mut self) -> DispatchStats {
        self.join_all().await;
        self.stats
    }

    async fn join_all(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            self.record(joined);
        }
    }

    fn reap_finished(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            self.record(joined);
        }
    }

    fn record(&mut self, joined: Result<UnitOutcome, JoinError>) {
        match joined {
            Ok(outcome) => {
                self.stats.open += outcome.open;
                self.stats.closed += outcome.closed;
                self.stats.dropped += outcome.dropped;
            }
            Err(e) => warn!(error = %e, "scan unit aborted"),
        }
    }
}

async fn run_unit<P: Prober>(
    prober: Arc<P>,
    results: mpsc::Sender<ResultLine>,
    unit: HostUnit,
    progress: ProgressBar,
    _permit: Option<OwnedSemaphorePermit>,
) -> UnitOutcome {
    let mut outcome = UnitOutcome::default();

    for (index, port) in unit.ports.iter().enumerate() {
        let open = match unit.address {
            Some(ip) => prober.probe(SocketAddr::new(ip, port.number())).await,
            None => false,
        };

        let line = ResultLine::new(unit.address, port.with_state(open));
        if open {
            info!(result = %line, "open port");
        }

        // Only published results count as open or closed; the rest of the
        // unit, this port included, is dropped.
        if results.send(line).await.is_err() {
            outcome.dropped = unit.ports.len() - index;
            debug!("result channel closed, abandoning unit");
            break;
        }
        if open {
            outcome.open += 1;
        } else {
            outcome.closed += 1;
        }
    }

    progress.inc(1);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::parse_ports;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        Start(IpAddr),
        End(IpAddr),
    }

    /// Records probe start/end order and the peak number of probes in flight.
    #[derive(Default)]
    struct RecordingProber {
        delays: HashMap<IpAddr, Duration>,
        default_delay: Duration,
        open_ports: Vec<u16>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        events: Mutex<Vec<Event>>,
    }

    impl RecordingProber {
        fn with_delay(delay: Duration) -> Self {
            Self {
                default_delay: delay,
                ..Self::default()
            }
        }

        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn position(&self, event: Event) -> usize {
            self.events()
                .iter()
                .position(|e| *e == event)
                .unwrap_or_else(|| panic!("missing event {:?}", event))
        }
    }

    #[async_trait]
    impl Prober for RecordingProber {
        async fn probe(&self, addr: SocketAddr) -> bool {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.events.lock().unwrap().push(Event::Start(addr.ip()));

            let delay = self
                .delays
                .get(&addr.ip())
                .copied()
                .unwrap_or(self.default_delay);
            tokio::time::sleep(delay).await;

            self.events.lock().unwrap().push(Event::End(addr.ip()));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.open_ports.contains(&addr.port())
        }
    }

    fn host(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    fn drain(mut rx: mpsc::Receiver<ResultLine>) -> tokio::task::JoinHandle<Vec<ResultLine>> {
        tokio::spawn(async move {
            let mut lines = Vec::new();
            while let Some(line) = rx.recv().await {
                lines.push(line);
            }
            lines
        })
    }

    async fn dispatch(
        prober: Arc<RecordingProber>,
        admission: Admission,
        threads: usize,
        hosts: &[u8],
        ports: &str,
    ) -> (DispatchStats, Vec<ResultLine>) {
        let ports = parse_ports(ports).unwrap();
        let (tx, rx) = mpsc::channel(threads);
        let collector = drain(rx);

        let mut dispatcher = Dispatcher::new(prober, tx, admission, threads);
        for &last in hosts {
            assert!(
                dispatcher
                    .admit(HostUnit::new(Some(host(last)), Arc::clone(&ports)))
                    .await
            );
        }
        let stats = dispatcher.finish().await;
        (stats, collector.await.unwrap())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pool_respects_cap() {
        let prober = Arc::new(RecordingProber::with_delay(Duration::from_millis(30)));
        let hosts: Vec<u8> = (1..=10).collect();

        let (stats, lines) = dispatch(Arc::clone(&prober), Admission::Pool, 3, &hosts, "80").await;

        assert_eq!(stats.units, 10);
        assert_eq!(lines.len(), 10);
        assert!(prober.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_batch_respects_cap_and_barrier() {
        let prober = Arc::new(RecordingProber::with_delay(Duration::from_millis(20)));
        let hosts: Vec<u8> = (1..=7).collect();

        let (stats, _) = dispatch(Arc::clone(&prober), Admission::Batch, 3, &hosts, "80").await;

        assert_eq!(stats.units, 7);
        assert!(prober.peak.load(Ordering::SeqCst) <= 3);

        // Every unit of batch k+1 starts after every unit of batch k ended.
        let batches: Vec<&[u8]> = hosts.chunks(3).collect();
        for pair in batches.windows(2) {
            for &earlier in pair[0] {
                for &later in pair[1] {
                    assert!(
                        prober.position(Event::End(host(earlier)))
                            < prober.position(Event::Start(host(later)))
                    );
                }
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pool_refills_single_slot() {
        let mut prober = RecordingProber::with_delay(Duration::from_millis(10));
        prober.delays.insert(host(1), Duration::from_millis(400));
        let prober = Arc::new(prober);

        dispatch(Arc::clone(&prober), Admission::Pool, 2, &[1, 2, 3], "80").await;

        assert!(prober.position(Event::Start(host(3))) < prober.position(Event::End(host(1))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_batch_waits_for_slowest_unit() {
        let mut prober = RecordingProber::with_delay(Duration::from_millis(10));
        prober.delays.insert(host(1), Duration::from_millis(200));
        let prober = Arc::new(prober);

        dispatch(Arc::clone(&prober), Admission::Batch, 2, &[1, 2, 3], "80").await;

        assert!(prober.position(Event::End(host(1))) < prober.position(Event::Start(host(3))));
    }

    #[tokio::test]
    async fn test_unit_publishes_ports_in_order() {
        let prober = Arc::new(RecordingProber {
            open_ports: vec![443],
            ..RecordingProber::default()
        });

        let (stats, lines) = dispatch(prober, Admission::Pool, 1, &[5], "22,443,80").await;

        let rendered: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
        assert_eq!(
            rendered,
            vec!["10.0.0.5:22:Close", "10.0.0.5:443:Open", "10.0.0.5:80:Close"]
        );
        assert_eq!(stats.open, 1);
        assert_eq!(stats.closed, 2);
    }

    #[tokio::test]
    async fn test_invalid_address_is_never_probed() {
        let prober = Arc::new(RecordingProber::default());
        let ports = parse_ports("80,443").unwrap();
        let (tx, rx) = mpsc::channel(1);
        let collector = drain(rx);

        let mut dispatcher = Dispatcher::new(Arc::clone(&prober), tx, Admission::Batch, 1);
        assert!(dispatcher.admit(HostUnit::new(None, ports)).await);
        let stats = dispatcher.finish().await;
        let lines = collector.await.unwrap();

        assert!(prober.events().is_empty());
        assert_eq!(stats.closed, 2);
        assert!(lines.iter().all(|l| !l.port.is_open()));
    }

    #[tokio::test]
    async fn test_closed_channel_abandons_unit() {
        let prober = Arc::new(RecordingProber::with_delay(Duration::from_millis(50)));
        let ports = parse_ports("1,2,3").unwrap();
        let (tx, mut rx) = mpsc::channel(1);

        let mut dispatcher = Dispatcher::new(Arc::clone(&prober), tx, Admission::Pool, 0);
        assert!(dispatcher.admit(HostUnit::new(Some(host(1)), ports)).await);
        rx.close();
        let stats = dispatcher.finish().await;

        assert_eq!(stats.units, 1);
        assert_eq!(stats.open + stats.closed, 0);
        assert_eq!(stats.dropped, 3);
        assert_eq!(prober.events().len(), 2);
    }

    #[tokio::test]
    async fn test_partially_published_unit_adds_up() {
        let prober = Arc::new(RecordingProber::default());
        let ports = parse_ports("1,2,3").unwrap();
        let (tx, mut rx) = mpsc::channel(1);

        let mut dispatcher = Dispatcher::new(prober, tx, Admission::Pool, 1);
        assert!(dispatcher.admit(HostUnit::new(Some(host(1)), ports)).await);
        // Take the first line, then stop listening.
        assert!(rx.recv().await.is_some());
        rx.close();
        let stats = dispatcher.finish().await;

        assert_eq!(stats.closed + stats.dropped, 3);
        assert!(stats.dropped >= 1);
    }

    #[tokio::test]
    async fn test_closed_channel_refuses_admission() {
        for admission in [Admission::Pool, Admission::Batch] {
            let prober = Arc::new(RecordingProber::default());
            let ports = parse_ports("80").unwrap();
            let (tx, rx) = mpsc::channel(1);
            drop(rx);

            let mut dispatcher = Dispatcher::new(Arc::clone(&prober), tx, admission, 2);
            assert!(!dispatcher.admit(HostUnit::new(Some(host(1)), ports)).await);
            let stats = dispatcher.finish().await;

            assert_eq!(stats.units, 0);
            assert!(prober.events().is_empty());
        }
    }

    #[test]
    fn test_thread_count_is_clamped() {
        let (tx, _rx) = mpsc::channel(1);
        let prober = Arc::new(RecordingProber::default());
        let dispatcher = Dispatcher::new(prober, tx, Admission::Pool, usize::MAX);
        assert_eq!(dispatcher.threads, Semaphore::MAX_PERMITS);
    }

    #[test]
    fn test_admission_display() {
        assert_eq!(Admission::default(), Admission::Pool);
        assert_eq!(Admission::Batch.to_string(), "batch");
    }
}

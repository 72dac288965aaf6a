//! TCP connect probing.
//!
//! A probe opens a full TCP connection and closes it straight away. Every
//! failure (refused, filtered, unreachable, timed out) reads as "closed".

use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

/// Default upper bound on a single connection attempt.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Reachability check for one address:port pair.
///
/// The dispatcher only depends on this trait, so tests can swap in a
/// prober that never touches the network.
#[async_trait]
pub trait Prober: Send + Sync + 'static {
    /// Return true if a connection to `addr` could be established.
    async fn probe(&self, addr: SocketAddr) -> bool;
}

/// Prober backed by the operating system's `connect()`.
///
/// Does not require elevated privileges.
#[derive(Debug, Clone)]
pub struct TcpProber {
    timeout: Duration,
}

impl TcpProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for TcpProber {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, addr: SocketAddr) -> bool {
        match timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                true
            }
            Ok(Err(e)) => {
                trace!(%addr, error = %e, "connect failed");
                false
            }
            Err(_) => {
                trace!(%addr, "connect timed out");
                false
            }
        }
    }
}

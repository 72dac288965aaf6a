//! # netsweep - Concurrent TCP Reachability Scanner
//!
//! netsweep takes a list of targets (single addresses or CIDR ranges) and a
//! list of ports, probes every address:port pair with a TCP connect, and
//! appends one `address:port:state` line per pair to a result log.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use netsweep::input::targets_from_lines;
//! use netsweep::scanner::run_scan;
//! use netsweep::types::parse_ports;
//!
//! #[tokio::main]
//! async fn main() {
//!     let ports = parse_ports("22,80,443").unwrap();
//!     let targets = targets_from_lines(["192.168.1.0/24", "10.0.0.5"], &ports);
//!     let log = tokio::fs::File::create("results.log").await.unwrap();
//!
//!     let summary = run_scan(&targets, log, 100).await.unwrap();
//!     println!("{} open ports", summary.open);
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Ports, port sets and targets
//! - [`scanner`] - Range expansion, probing, dispatch and the result sink
//! - [`input`] - Loading targets from a file
//! - [`config`] - Settings file handling
//! - [`output`] - Result log creation and terminal output
//! - [`error`] - Error types

pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod logging;
pub mod output;
pub mod scanner;
pub mod types;

// Re-export commonly used types
pub use error::{CliError, ConfigError, InputError, ScanError};
pub use scanner::{run_scan, scan_targets, Admission, ScanConfig, ScanSummary};
pub use types::{parse_ports, Port, PortSet, PortState, Target};

//! Core type definitions: ports, port sets and scan targets.
//!
//! Everything here is built once while reading the inputs and stays
//! read-only for the rest of the run.

mod port;
mod target;

pub use port::{parse_ports, Port, PortError, PortParseError, PortSet, PortState};
pub use target::Target;

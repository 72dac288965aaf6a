//! Scan target parsed from one line of input.
//!
//! A line is either CIDR notation (192.168.1.0/24, 2001:db8::/120) or a plain
//! address. Anything else becomes an invalid target that is still scanned,
//! with every probe reporting `Close`.

use super::PortSet;
use ipnetwork::IpNetwork;
use std::fmt;
use std::net::IpAddr;
use tracing::warn;

/// One input line resolved into an address, an optional range and its ports.
#[derive(Debug, Clone)]
pub struct Target {
    /// Parsed address, `None` when the line was neither CIDR nor an address.
    pub address: Option<IpAddr>,
    /// Network range, present only when the line used CIDR notation.
    pub range: Option<IpNetwork>,
    /// Port set shared with every other target of the run.
    pub ports: PortSet,
}

impl Target {
    /// Build a target from a raw input line.
    ///
    /// CIDR parsing is attempted first, then plain address parsing. This
    /// never fails.
    pub fn from_line(line: &str, ports: PortSet) -> Self {
        let line = line.trim();

        // IpNetwork also accepts bare addresses as /32 or /128, so only
        // lines with an explicit prefix are treated as ranges.
        if line.contains('/') {
            if let Ok(network) = line.parse::<IpNetwork>() {
                return Self {
                    address: Some(network.ip()),
                    range: Some(network),
                    ports,
                };
            }
        }

        match line.parse::<IpAddr>() {
            Ok(ip) => Self::host(ip, ports),
            Err(_) => {
                warn!(line, "line is neither a CIDR range nor an address");
                Self::invalid(ports)
            }
        }
    }

    /// A single-host target.
    pub fn host(address: IpAddr, ports: PortSet) -> Self {
        Self {
            address: Some(address),
            range: None,
            ports,
        }
    }

    /// A target whose line could not be parsed.
    pub fn invalid(ports: PortSet) -> Self {
        Self {
            address: None,
            range: None,
            ports,
        }
    }

    /// Check if this target covers a network range.
    pub fn is_range(&self) -> bool {
        self.range.is_some()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.range, &self.address) {
            (Some(network), _) => write!(f, "{}", network),
            (None, Some(ip)) => write!(f, "{}", ip),
            (None, None) => write!(f, "<invalid>"),
        }
    }
}

//! Port entities and port list parsing.
//!
//! A run parses its port list once into a [`PortSet`], which every target
//! then shares by reference.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A TCP port plus the scan-result flag.
///
/// Ports inside a [`PortSet`] always carry `is_open == false`; probing hands
/// out copies with the flag filled in via [`Port::with_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Port {
    number: u16,
    is_open: bool,
}

impl Port {
    /// Minimum valid port number.
    pub const MIN: u16 = 1;
    /// Maximum valid port number.
    pub const MAX: u16 = 65535;

    /// Create a new unscanned Port, returning None if the number is 0.
    #[inline]
    pub const fn new(number: u16) -> Option<Self> {
        if number >= Self::MIN {
            Some(Self {
                number,
                is_open: false,
            })
        } else {
            None
        }
    }

    /// Get the raw port number.
    #[inline]
    pub const fn number(self) -> u16 {
        self.number
    }

    #[inline]
    pub const fn is_open(self) -> bool {
        self.is_open
    }

    /// Copy of this port carrying a probe outcome.
    #[inline]
    pub const fn with_state(self, is_open: bool) -> Self {
        Self {
            number: self.number,
            is_open,
        }
    }

    /// State as written to the result log.
    pub const fn state(self) -> PortState {
        if self.is_open {
            PortState::Open
        } else {
            PortState::Close
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number)
    }
}

/// Reachability of a port, spelled the way the result log spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortState {
    Open,
    Close,
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::Close => write!(f, "Close"),
        }
    }
}

/// Ordered, immutable port list shared by every target of a run.
pub type PortSet = Arc<[Port]>;

/// Reason a port list was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("invalid port number: '{0}'")]
    InvalidFormat(String),
    #[error("port {0} is out of valid range (1-65535)")]
    OutOfRange(u32),
    #[error("empty port list")]
    Empty,
}

/// Port list parse failure.
///
/// Carries the ports accepted before the offending token so callers can
/// report how far parsing got.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}")]
pub struct PortParseError {
    pub kind: PortError,
    pub parsed: Vec<Port>,
}

/// Parse a comma-separated list of decimal port numbers.
///
/// Whitespace around tokens is ignored and repeated ports are kept once, in
/// first-seen order. Parsing stops at the first malformed token.
pub fn parse_ports(list: &str) -> Result<PortSet, PortParseError> {
    let mut parsed: Vec<Port> = Vec::new();

    if list.trim().is_empty() {
        return Err(PortParseError {
            kind: PortError::Empty,
            parsed,
        });
    }

    for token in list.split(',') {
        let token = token.trim();
        let value: u32 = match token.parse() {
            Ok(value) => value,
            Err(_) => {
                return Err(PortParseError {
                    kind: PortError::InvalidFormat(token.to_string()),
                    parsed,
                })
            }
        };

        let port = match u16::try_from(value).ok().and_then(Port::new) {
            Some(port) => port,
            None => {
                return Err(PortParseError {
                    kind: PortError::OutOfRange(value),
                    parsed,
                })
            }
        };

        if !parsed.contains(&port) {
            parsed.push(port);
        }
    }

    Ok(parsed.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(ports: &[Port]) -> Vec<u16> {
        ports.iter().map(|p| p.number()).collect()
    }

    #[test]
    fn test_port_validation() {
        assert!(Port::new(0).is_none());
        assert!(Port::new(1).is_some());
        assert!(Port::new(65535).is_some());
        assert!(!Port::new(80).unwrap().is_open());
    }

    #[test]
    fn test_with_state_leaves_original_untouched() {
        let port = Port::new(443).unwrap();
        let scanned = port.with_state(true);
        assert!(scanned.is_open());
        assert_eq!(scanned.state(), PortState::Open);
        assert_eq!(port.state(), PortState::Close);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(PortState::Open.to_string(), "Open");
        assert_eq!(PortState::Close.to_string(), "Close");
    }

    #[test]
    fn test_parse_comma_separated() {
        let ports = parse_ports("80,443,8080").unwrap();
        assert_eq!(numbers(&ports), vec![80, 443, 8080]);
    }

    #[test]
    fn test_parse_keeps_input_order() {
        let ports = parse_ports("443, 22 ,80").unwrap();
        assert_eq!(numbers(&ports), vec![443, 22, 80]);
    }

    #[test]
    fn test_parse_deduplication() {
        let ports = parse_ports("80,443,80").unwrap();
        assert_eq!(numbers(&ports), vec![80, 443]);
    }

    #[test]
    fn test_parse_stops_at_first_bad_token() {
        let err = parse_ports("80,foo,443").unwrap_err();
        assert_eq!(err.kind, PortError::InvalidFormat("foo".to_string()));
        assert_eq!(numbers(&err.parsed), vec![80]);
    }

    #[test]
    fn test_parse_rejects_ranges() {
        let err = parse_ports("1-100").unwrap_err();
        assert!(matches!(err.kind, PortError::InvalidFormat(_)));
        assert!(err.parsed.is_empty());
    }

    #[test]
    fn test_parse_out_of_range() {
        assert_eq!(parse_ports("0").unwrap_err().kind, PortError::OutOfRange(0));
        let err = parse_ports("22,70000").unwrap_err();
        assert_eq!(err.kind, PortError::OutOfRange(70000));
        assert_eq!(numbers(&err.parsed), vec![22]);
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse_ports("  ").unwrap_err().kind, PortError::Empty);
        assert!(matches!(
            parse_ports("80,").unwrap_err().kind,
            PortError::InvalidFormat(_)
        ));
    }
}

//! CIDR range expansion.
//!
//! Walks a network from its masked base address upward, treating the
//! address as a big-endian integer, and yields every address except the
//! first (network) and the last (broadcast) one.

use ipnetwork::IpNetwork;
use std::net::IpAddr;

/// Lazy iterator over the usable host addresses of a network.
///
/// Ranges with two or fewer addresses yield nothing.
#[derive(Debug, Clone)]
pub struct RangeHosts {
    network: IpNetwork,
    next: Option<IpAddr>,
}

impl Iterator for RangeHosts {
    type Item = IpAddr;

    fn next(&mut self) -> Option<IpAddr> {
        let current = self.next?;
        // The last address of the range is only known once its successor
        // falls outside, so look one step ahead before yielding.
        self.next = increment(current).filter(|ip| self.network.contains(*ip));
        self.next.map(|_| current)
    }
}

/// Expand a network into its usable host addresses, in ascending order.
pub fn expand_range(network: IpNetwork) -> RangeHosts {
    let first = increment(network.network()).filter(|ip| network.contains(*ip));
    RangeHosts {
        network,
        next: first,
    }
}

/// Collect the usable host addresses of a network.
pub fn hosts_in_range(network: IpNetwork) -> Vec<IpAddr> {
    expand_range(network).collect()
}

/// Number of addresses [`expand_range`] yields, saturating at `u128::MAX`.
pub fn usable_hosts(network: IpNetwork) -> u128 {
    let width: u32 = match network {
        IpNetwork::V4(_) => 32,
        IpNetwork::V6(_) => 128,
    };
    let bits = width - u32::from(network.prefix());
    let total = if bits >= 128 { u128::MAX } else { 1u128 << bits };
    total.saturating_sub(2)
}

/// Next address, or `None` when incrementing would wrap around.
fn increment(ip: IpAddr) -> Option<IpAddr> {
    match ip {
        IpAddr::V4(addr) => {
            let mut octets = addr.octets();
            carry_one(&mut octets).then(|| IpAddr::from(octets))
        }
        IpAddr::V6(addr) => {
            let mut octets = addr.octets();
            carry_one(&mut octets).then(|| IpAddr::from(octets))
        }
    }
}

/// Add one to a big-endian byte string. Returns false on overflow.
fn carry_one(bytes: &mut [u8]) -> bool {
    for byte in bytes.iter_mut().rev() {
        let (value, overflowed) = byte.overflowing_add(1);
        *byte = value;
        if !overflowed {
            return true;
        }
    }
    false
}

//! Port range specifications used by the `publish` and `expose` filters.

use roster_common::types::{Port, Protocol};

/// An inclusive range of ports of one protocol, e.g. `8000-8080/tcp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    /// First port in the range.
    pub start: u16,
    /// Last port in the range.
    pub end: u16,
    /// Protocol every port in the range uses.
    pub protocol: Protocol,
}

impl PortRange {
    /// Parses `80`, `80/udp`, `8000-8080`, or `8000-8080/tcp`.
    ///
    /// Returns `None` if the specification is malformed or the range is
    /// reversed.
    #[must_use]
    pub fn parse(spec: &str) -> Option<Self> {
        let (ports, protocol) = match spec.split_once('/') {
            Some((ports, protocol)) => (ports, protocol.parse().ok()?),
            None => (spec, Protocol::Tcp),
        };
        let (start, end) = match ports.split_once('-') {
            Some((start, end)) => (start.parse().ok()?, end.parse().ok()?),
            None => {
                let port = ports.parse().ok()?;
                (port, port)
            }
        };
        if start > end {
            return None;
        }
        Some(Self {
            start,
            end,
            protocol,
        })
    }

    /// Returns whether `port` falls inside the range.
    #[must_use]
    pub fn contains(&self, port: Port) -> bool {
        port.protocol == self.protocol && (self.start..=self.end).contains(&port.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_port_defaults_to_tcp() {
        let range = PortRange::parse("80").unwrap();
        assert!(range.contains(Port::tcp(80)));
        assert!(!range.contains(Port::udp(80)));
        assert!(!range.contains(Port::tcp(81)));
    }

    #[test]
    fn range_with_protocol() {
        let range = PortRange::parse("8000-8080/udp").unwrap();
        assert!(range.contains(Port::udp(8000)));
        assert!(range.contains(Port::udp(8080)));
        assert!(!range.contains(Port::udp(8081)));
        assert!(!range.contains(Port::tcp(8040)));
    }

    #[test]
    fn malformed_specs_are_rejected() {
        for spec in ["", "http", "80/icmp", "90-80", "1-", "-1", "70000"] {
            assert!(PortRange::parse(spec).is_none(), "accepted {spec:?}");
        }
    }
}

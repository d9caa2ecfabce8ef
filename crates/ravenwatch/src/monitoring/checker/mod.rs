//! Protocol probes, one submodule per transport.
//!
//! [`probe`] is the single dispatch point over [`CheckKind`]. Probes return
//! the success details or a [`ProbeError`]; turning that into a
//! [`CheckResult`](crate::monitoring::CheckResult) is the executor's job.

mod http;
mod icmp;
mod qos;
mod ravenna;
mod tcp;
mod udp;

use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use thiserror::Error;
use tokio::net::lookup_host;

use crate::models::CheckKind;

pub use udp::{PtpHeader, RtpHeader, parse_ptp, parse_rtp, parse_sap};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("DNS resolution failed for {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("No address found for {0}")]
    NoAddress(String),

    #[error("Connection to {0} refused")]
    Refused(String),

    #[error("Connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("{0} timed out")]
    Timeout(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status code: {got} (expected: {expected})")]
    UnexpectedStatus { got: u16, expected: String },

    #[error("Unreachable ports: {0}")]
    PortsDown(String),

    #[error("Ping failed: {0}")]
    Ping(String),

    #[error("No {what} received on {addr} within {waited_ms}ms")]
    NoTraffic { what: &'static str, addr: String, waited_ms: u128 },

    #[error("Could not join multicast group {group}: {source}")]
    Join {
        group: Ipv4Addr,
        #[source]
        source: io::Error,
    },

    #[error("{0} is not an IPv4 multicast address")]
    NotMulticast(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Socket error: {0}")]
    Io(#[from] io::Error),
}

/// Run the probe for one check kind
pub(crate) async fn probe(
    client: &reqwest::Client,
    kind: &CheckKind,
    timeout: Duration,
) -> Result<String, ProbeError> {
    match kind {
        CheckKind::Ping { target } => icmp::ping(target, timeout, None).await,
        CheckKind::Http { url, expected_status, method } => {
            http::request(client, url, *method, *expected_status, timeout).await
        }
        CheckKind::Port { host, ports } => tcp::ports(host, ports, timeout).await,
        CheckKind::Ptp { host, multicast, ptp_ports, domain, interface } => {
            udp::ptp(host.as_deref(), multicast, ptp_ports, *domain, *interface, timeout).await
        }
        CheckKind::Multicast { multicast_group, port, interface } => {
            udp::multicast(multicast_group, *port, *interface, timeout).await
        }
        CheckKind::Rtp { host, port, interface } => udp::rtp(host, *port, *interface, timeout).await,
        CheckKind::Qos { host, dscp, port } => qos::dscp(host, *dscp, *port, timeout).await,
        CheckKind::Ravenna { host, port, service_type, url } => {
            ravenna::service(client, host, *port, *service_type, url.as_deref(), timeout).await
        }
    }
}

/// Resolve a host freshly on every call, preferring IPv4
pub(crate) async fn resolve(host: &str) -> Result<IpAddr, ProbeError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    let addrs: Vec<IpAddr> = lookup_host((host, 0))
        .await
        .map_err(|source| ProbeError::Resolve { host: host.to_string(), source })?
        .map(|addr| addr.ip())
        .collect();

    addrs
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| ProbeError::NoAddress(host.to_string()))
}

/// Resolve a group name or literal into an IPv4 multicast address
pub(crate) async fn resolve_group(group: &str) -> Result<Ipv4Addr, ProbeError> {
    match resolve(group).await? {
        IpAddr::V4(addr) if addr.is_multicast() => Ok(addr),
        _ => Err(ProbeError::NotMulticast(group.to_string())),
    }
}

pub(crate) fn connect_error(addr: impl ToString, source: io::Error) -> ProbeError {
    if source.kind() == io::ErrorKind::ConnectionRefused {
        ProbeError::Refused(addr.to_string())
    } else {
        ProbeError::Connect { addr: addr.to_string(), source }
    }
}

/// Listening probes stop slightly before the hard check timeout so they can
/// report what they were waiting for instead of a bare timeout.
pub(crate) fn listen_window(timeout: Duration) -> Duration {
    timeout.mul_f64(0.9)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_literal_skips_dns() {
        assert_eq!(resolve("10.0.0.5").await.unwrap(), IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)));
    }

    #[tokio::test]
    async fn test_resolve_failure_is_probe_error() {
        let err = resolve("does-not-exist.invalid").await.unwrap_err();
        assert!(matches!(err, ProbeError::Resolve { .. } | ProbeError::NoAddress(_)));
        assert!(err.to_string().contains("does-not-exist.invalid"));
    }

    #[tokio::test]
    async fn test_resolve_group_rejects_unicast() {
        assert!(matches!(resolve_group("10.0.0.1").await, Err(ProbeError::NotMulticast(_))));
        assert_eq!(resolve_group("239.69.0.1").await.unwrap(), Ipv4Addr::new(239, 69, 0, 1));
    }
}

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use socket2::SockRef;
use tokio::net::TcpSocket;
use tokio::time::timeout as with_timeout;

use super::{ProbeError, connect_error, icmp, resolve};

/// Common name of a DSCP code point, for log-friendly details
pub fn dscp_name(dscp: u8) -> String {
    match dscp {
        0 => "BE".to_string(),
        46 => "EF".to_string(),
        44 => "VOICE-ADMIT".to_string(),
        d if d % 8 == 0 && d <= 56 => format!("CS{}", d / 8),
        d if (10..=38).contains(&d) && d % 2 == 0 && (d % 8) / 2 >= 1 && (d % 8) / 2 <= 3 => {
            format!("AF{}{}", d / 8, (d % 8) / 2)
        }
        d => d.to_string(),
    }
}

/// Send traffic towards `host` marked with `dscp`.
///
/// With a port a TCP connection is opened from a socket carrying the TOS
/// byte; without one a marked ping is sent. Up means the marked traffic got
/// through. Whether the network preserves the marking is not observed.
pub(super) async fn dscp(
    host: &str,
    dscp: u8,
    port: Option<u16>,
    timeout: Duration,
) -> Result<String, ProbeError> {
    let tos = dscp << 2;

    let Some(port) = port else {
        return icmp::ping(host, timeout, Some(tos))
            .await
            .map(|details| format!("{details}, DSCP {dscp} ({}) marking applied", dscp_name(dscp)));
    };

    let ip = resolve(host).await?;
    if ip.is_ipv6() {
        return Err(ProbeError::Protocol("DSCP marking is only supported over IPv4".to_string()));
    }
    let addr = SocketAddr::new(ip, port);

    let socket = TcpSocket::new_v4()?;
    SockRef::from(&socket).set_tos(u32::from(tos))?;

    with_timeout(timeout, socket.connect(addr))
        .await
        .map_err(|_| ProbeError::Timeout(format!("Connection to {addr}")))?
        .map_err(|e| connect_error(addr, e))?;

    Ok(format!("DSCP {dscp} ({}) marking applied on connection to {}", dscp_name(dscp), display(addr)))
}

fn display(addr: SocketAddr) -> String {
    match addr.ip() {
        IpAddr::V4(ip) => format!("{ip}:{}", addr.port()),
        IpAddr::V6(ip) => format!("[{ip}]:{}", addr.port()),
    }
}

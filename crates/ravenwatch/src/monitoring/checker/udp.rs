//! Passive UDP probes: PTP, multicast group membership, RTP and SAP.
//!
//! Each probe binds the relevant port (shared with any local daemon through
//! SO_REUSEADDR/SO_REUSEPORT), joins the group when there is one and waits
//! for a datagram that passes the protocol filter. On Unix a group listener
//! is bound to the group address itself, so unicast and other groups' traffic
//! on the same port never reach it.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use futures::future::select_ok;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::time::{Instant, timeout_at};

use super::{ProbeError, listen_window, resolve, resolve_group};

const RECV_BUFFER: usize = 2048;

/// Fields of a PTPv2 common header the probe cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtpHeader {
    pub message_type: u8,
    pub version: u8,
    pub domain: u8,
}

impl PtpHeader {
    /// Sync, Delay_Req, Pdelay_Req and Pdelay_Resp travel on the event port
    pub fn is_event(&self) -> bool {
        self.message_type <= 0x3
    }

    pub fn is_general(&self) -> bool {
        (0x8..=0xD).contains(&self.message_type)
    }

    /// Event messages belong on 319, general messages on 320
    pub fn matches_port(&self, port: u16) -> bool {
        match port {
            319 => self.is_event(),
            320 => self.is_general(),
            _ => self.is_event() || self.is_general(),
        }
    }

    pub fn message_name(&self) -> &'static str {
        match self.message_type {
            0x0 => "Sync",
            0x1 => "Delay_Req",
            0x2 => "Pdelay_Req",
            0x3 => "Pdelay_Resp",
            0x8 => "Follow_Up",
            0x9 => "Delay_Resp",
            0xA => "Pdelay_Resp_Follow_Up",
            0xB => "Announce",
            0xC => "Signaling",
            0xD => "Management",
            _ => "Unknown",
        }
    }
}

/// Parse a PTPv2 header (34 bytes minimum)
pub fn parse_ptp(buf: &[u8]) -> Option<PtpHeader> {
    if buf.len() < 34 {
        return None;
    }

    let header =
        PtpHeader { message_type: buf[0] & 0x0F, version: buf[1] & 0x0F, domain: buf[4] };

    (header.version == 2 && (header.is_event() || header.is_general())).then_some(header)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpHeader {
    pub payload_type: u8,
    pub sequence: u16,
    pub ssrc: u32,
}

/// Parse a fixed RTP header, rejecting RTCP packets that share the port range
pub fn parse_rtp(buf: &[u8]) -> Option<RtpHeader> {
    if buf.len() < 12 || buf[0] >> 6 != 2 {
        return None;
    }

    let payload_type = buf[1] & 0x7F;
    if (72..=76).contains(&payload_type) {
        return None;
    }

    Some(RtpHeader {
        payload_type,
        sequence: u16::from_be_bytes([buf[2], buf[3]]),
        ssrc: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
    })
}

/// Parse a SAPv1 header and return the originating source
pub fn parse_sap(buf: &[u8]) -> Option<IpAddr> {
    let first = *buf.first()?;
    if first >> 5 != 1 {
        return None;
    }

    if first & 0x10 == 0 {
        let octets: [u8; 4] = buf.get(4..8)?.try_into().ok()?;
        Some(IpAddr::from(octets))
    } else {
        let octets: [u8; 16] = buf.get(4..20)?.try_into().ok()?;
        Some(IpAddr::from(octets))
    }
}

/// Local address for a listener. Windows cannot bind a multicast address.
fn bind_addr(port: u16, group: Option<Ipv4Addr>) -> SocketAddrV4 {
    match group {
        Some(group) if cfg!(unix) => SocketAddrV4::new(group, port),
        _ => SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port),
    }
}

/// Bind a UDP port and optionally join a multicast group
pub(super) fn listener(
    port: u16,
    group: Option<Ipv4Addr>,
    interface: Option<Ipv4Addr>,
) -> Result<UdpSocket, ProbeError> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
    socket.set_reuse_port(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&bind_addr(port, group).into())?;

    if let Some(group) = group {
        socket
            .join_multicast_v4(&group, &interface.unwrap_or(Ipv4Addr::UNSPECIFIED))
            .map_err(|source| ProbeError::Join { group, source })?;
    }

    Ok(UdpSocket::from_std(socket.into())?)
}

/// Receive until `accept` returns details or the window closes
pub(super) async fn wait_for<F>(
    socket: &UdpSocket,
    window: Duration,
    mut accept: F,
) -> Result<Option<String>, ProbeError>
where
    F: FnMut(&[u8], SocketAddr) -> Option<String>,
{
    let deadline = Instant::now() + window;
    let mut buf = vec![0u8; RECV_BUFFER];

    loop {
        match timeout_at(deadline, socket.recv_from(&mut buf)).await {
            Err(_) => return Ok(None),
            Ok(Err(e)) => return Err(e.into()),
            Ok(Ok((len, from))) => {
                if let Some(details) = accept(&buf[..len], from) {
                    return Ok(Some(details));
                }
            }
        }
    }
}

fn no_traffic(what: &'static str, addr: String, window: Duration) -> ProbeError {
    ProbeError::NoTraffic { what, addr, waited_ms: window.as_millis() }
}

pub(super) async fn ptp(
    host: Option<&str>,
    multicast: &str,
    ports: &[u16],
    domain: Option<u8>,
    interface: Option<Ipv4Addr>,
    timeout: Duration,
) -> Result<String, ProbeError> {
    let group = resolve_group(multicast).await?;
    let source = match host {
        Some(host) => Some(resolve(host).await?),
        None => None,
    };
    let window = listen_window(timeout);
    let label = format!(
        "{group}:{}",
        ports.iter().map(u16::to_string).collect::<Vec<_>>().join("/")
    );

    let sockets = ports
        .iter()
        .map(|&port| listener(port, Some(group), interface).map(|socket| (port, socket)))
        .collect::<Result<Vec<_>, _>>()?;

    if sockets.is_empty() {
        return Err(ProbeError::Protocol("no PTP ports configured".to_string()));
    }

    let waits = sockets.iter().map(|(port, socket)| {
        let port = *port;
        Box::pin(async move {
            let found = wait_for(socket, window, |buf, from| {
                if source.is_some_and(|expected| expected != from.ip()) {
                    return None;
                }
                let header = parse_ptp(buf)?;
                if !header.matches_port(port) || domain.is_some_and(|d| d != header.domain) {
                    return None;
                }
                Some(format!(
                    "PTP {} from {} on port {port} (domain {})",
                    header.message_name(),
                    from.ip(),
                    header.domain
                ))
            })
            .await?;
            found.ok_or_else(|| no_traffic("PTP traffic", format!("{group}:{port}"), window))
        })
    });

    match select_ok(waits).await {
        Ok((details, _)) => Ok(details),
        Err(ProbeError::NoTraffic { .. }) => Err(no_traffic("PTP traffic", label, window)),
        Err(other) => Err(other),
    }
}

pub(super) async fn multicast(
    group: &str,
    port: u16,
    interface: Option<Ipv4Addr>,
    timeout: Duration,
) -> Result<String, ProbeError> {
    let addr = resolve_group(group).await?;
    let window = listen_window(timeout);
    let socket = listener(port, Some(addr), interface)?;

    let name = if group == addr.to_string() { group.to_string() } else { format!("{group} ({addr})") };

    wait_for(&socket, window, |buf, from| {
        Some(format!("Multicast group {name}:{port} receiving ({} bytes from {})", buf.len(), from.ip()))
    })
    .await?
    .ok_or_else(|| no_traffic("multicast traffic", format!("{addr}:{port}"), window))
}

pub(super) async fn rtp(
    host: &str,
    port: u16,
    interface: Option<Ipv4Addr>,
    timeout: Duration,
) -> Result<String, ProbeError> {
    let ip = resolve(host).await?;
    let window = listen_window(timeout);

    let (socket, source) = match ip {
        IpAddr::V4(group) if group.is_multicast() => (listener(port, Some(group), interface)?, None),
        other => (listener(port, None, interface)?, Some(other)),
    };

    wait_for(&socket, window, |buf, from| {
        if source.is_some_and(|expected| expected != from.ip()) {
            return None;
        }
        let header = parse_rtp(buf)?;
        Some(format!(
            "RTP stream from {} (PT {}, SSRC 0x{:08x}, seq {})",
            from.ip(),
            header.payload_type,
            header.ssrc,
            header.sequence
        ))
    })
    .await?
    .ok_or_else(|| no_traffic("RTP packets", format!("{ip}:{port}"), window))
}

/// Well-known SAP announcement group for administratively scoped sessions
const SAP_GROUP: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 255);

pub(super) async fn sap(host: &str, port: u16, timeout: Duration) -> Result<String, ProbeError> {
    let origin = resolve(host).await?;
    let window = listen_window(timeout);
    let socket = listener(port, Some(SAP_GROUP), None)?;

    wait_for(&socket, window, |buf, from| {
        let announced = parse_sap(buf)?;
        (announced == origin || from.ip() == origin)
            .then(|| format!("SAP announcement from {origin} ({} bytes)", buf.len()))
    })
    .await?
    .ok_or_else(|| no_traffic("SAP announcements", format!("{SAP_GROUP}:{port} from {origin}"), window))
}

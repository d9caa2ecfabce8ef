use std::net::SocketAddr;
use std::time::Duration;

use futures::future::join_all;
use tokio::net::TcpStream;
use tokio::time::timeout as with_timeout;

use super::{ProbeError, connect_error, resolve};

/// Connect to a single port
pub(super) async fn connect(
    host: &str,
    port: u16,
    timeout: Duration,
) -> Result<(SocketAddr, TcpStream), ProbeError> {
    let addr = SocketAddr::new(resolve(host).await?, port);
    let stream = with_timeout(timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| ProbeError::Timeout(format!("Connection to {addr}")))?
        .map_err(|e| connect_error(addr, e))?;
    Ok((addr, stream))
}

/// Connect to every port concurrently, all of them have to accept
pub(super) async fn ports(host: &str, ports: &[u16], timeout: Duration) -> Result<String, ProbeError> {
    let ip = resolve(host).await?;

    let attempts = ports.iter().map(|&port| async move {
        let addr = SocketAddr::new(ip, port);
        let outcome = match with_timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => Err(connect_error(addr, e)),
            Err(_) => Err(ProbeError::Timeout(format!("Connection to {addr}"))),
        };
        (port, outcome)
    });

    let failures: Vec<String> = join_all(attempts)
        .await
        .into_iter()
        .filter_map(|(port, outcome)| outcome.err().map(|e| format!("port {port}: {e}")))
        .collect();

    if failures.is_empty() {
        let listed = ports.iter().map(u16::to_string).collect::<Vec<_>>().join(", ");
        let noun = if ports.len() == 1 { "Port" } else { "Ports" };
        Ok(format!("{noun} {listed} on {ip} reachable"))
    } else {
        Err(ProbeError::PortsDown(failures.join("; ")))
    }
}

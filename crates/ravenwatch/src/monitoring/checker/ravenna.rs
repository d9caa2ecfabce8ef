//! RAVENNA service probes: RTSP stream control, SAP announcements and the
//! device's web interface.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout as with_timeout;

use super::{ProbeError, http, tcp, udp};
use crate::APP_NAME;
use crate::models::{HttpMethod, RavennaService};

pub(super) async fn service(
    client: &reqwest::Client,
    host: &str,
    port: Option<u16>,
    service: RavennaService,
    url: Option<&str>,
    timeout: Duration,
) -> Result<String, ProbeError> {
    let port = port.unwrap_or_else(|| service.default_port());

    match service {
        RavennaService::Rtsp => rtsp(host, port, timeout).await,
        RavennaService::Sap => udp::sap(host, port, timeout).await,
        RavennaService::Http | RavennaService::Https => {
            let url = match url {
                Some(url) => url.to_string(),
                None => format!("{}://{host}:{port}/", service.label().to_lowercase()),
            };
            let status = http::send(client, &url, HttpMethod::Get, timeout).await?;
            if status < 400 {
                Ok(format!("{} interface answered with {status}", service.label()))
            } else {
                Err(ProbeError::UnexpectedStatus { got: status, expected: "< 400".to_string() })
            }
        }
    }
}

/// Send an RTSP OPTIONS request and accept any non-error response
async fn rtsp(host: &str, port: u16, timeout: Duration) -> Result<String, ProbeError> {
    let (addr, mut stream) = tcp::connect(host, port, timeout).await?;

    let request = format!(
        "OPTIONS rtsp://{host}:{port}/ RTSP/1.0\r\nCSeq: 1\r\nUser-Agent: {APP_NAME}\r\n\r\n"
    );

    let exchange = async {
        stream.write_all(request.as_bytes()).await?;
        let mut buf = vec![0u8; 1024];
        let len = stream.read(&mut buf).await?;
        Ok::<_, std::io::Error>(String::from_utf8_lossy(&buf[..len]).into_owned())
    };

    let response = with_timeout(timeout, exchange)
        .await
        .map_err(|_| ProbeError::Timeout(format!("RTSP OPTIONS to {addr}")))??;

    match parse_rtsp_status(&response) {
        Some(code) if code < 400 => Ok(format!("RTSP service on {addr} answered {code}")),
        Some(code) => Err(ProbeError::UnexpectedStatus { got: code, expected: "< 400".to_string() }),
        None => Err(ProbeError::Protocol(format!("no RTSP status line from {addr}"))),
    }
}

/// Status code of an `RTSP/1.0 <code> <reason>` line
fn parse_rtsp_status(response: &str) -> Option<u16> {
    let line = response.lines().next()?;
    let mut parts = line.split_whitespace();
    if !parts.next()?.starts_with("RTSP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_rtsp_status() {
        assert_eq!(parse_rtsp_status("RTSP/1.0 200 OK\r\nCSeq: 1\r\n\r\n"), Some(200));
        assert_eq!(parse_rtsp_status("RTSP/1.0 454 Session Not Found\r\n"), Some(454));
        assert_eq!(parse_rtsp_status("HTTP/1.1 200 OK\r\n"), None);
        assert_eq!(parse_rtsp_status(""), None);
    }

    async fn rtsp_server(reply: &'static str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 1024];
            let len = socket.read(&mut buf).await.unwrap();
            assert!(String::from_utf8_lossy(&buf[..len]).starts_with("OPTIONS rtsp://"));
            socket.write_all(reply.as_bytes()).await.unwrap();
        });
        port
    }

    #[tokio::test]
    async fn test_rtsp_options_round_trip() {
        let client = reqwest::Client::new();
        let port = rtsp_server("RTSP/1.0 200 OK\r\nCSeq: 1\r\nPublic: DESCRIBE, SETUP\r\n\r\n").await;

        let details = service(&client, "127.0.0.1", Some(port), RavennaService::Rtsp, None, Duration::from_secs(2))
            .await
            .unwrap();
        assert!(details.contains("answered 200"));
    }

    #[tokio::test]
    async fn test_rtsp_error_status_is_down() {
        let client = reqwest::Client::new();
        let port = rtsp_server("RTSP/1.0 503 Service Unavailable\r\nCSeq: 1\r\n\r\n").await;

        let err = service(&client, "127.0.0.1", Some(port), RavennaService::Rtsp, None, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::UnexpectedStatus { got: 503, .. }));
    }
}

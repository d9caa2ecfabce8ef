//! Reachability through the platform `ping` binary.
//!
//! Raw ICMP sockets need elevated privileges, the system ping does not.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use super::{ProbeError, resolve};

/// Send one echo request. `tos` marks the request's TOS byte (Unix only).
pub(super) async fn ping(
    host: &str,
    timeout: Duration,
    tos: Option<u8>,
) -> Result<String, ProbeError> {
    let addr = resolve(host).await?;

    let mut command = Command::new("ping");
    if cfg!(windows) {
        command.args(["-n", "1", "-w", &timeout.as_millis().max(1).to_string()]);
    } else {
        command.args(["-c", "1", "-W", &timeout.as_secs().max(1).to_string()]);
        if let Some(tos) = tos {
            command.args(["-Q", &tos.to_string()]);
        }
    }
    command
        .arg(addr.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let status = command
        .status()
        .await
        .map_err(|e| ProbeError::Ping(format!("could not run ping: {e}")))?;

    if status.success() {
        Ok(format!("Ping to {addr} answered"))
    } else {
        let code = status.code().map_or_else(|| "signal".to_string(), |code| code.to_string());
        Err(ProbeError::Ping(format!("no reply from {addr} (exit code: {code})")))
    }
}

use std::time::Duration;

use super::ProbeError;
use crate::models::HttpMethod;

/// Issue the request and compare the status code exactly
pub(super) async fn request(
    client: &reqwest::Client,
    url: &str,
    method: HttpMethod,
    expected_status: u16,
    timeout: Duration,
) -> Result<String, ProbeError> {
    let status = send(client, url, method, timeout).await?;

    if status == expected_status {
        Ok(format!("HTTP {status}"))
    } else {
        Err(ProbeError::UnexpectedStatus { got: status, expected: expected_status.to_string() })
    }
}

/// Send a request and return the status code, any status counts as a response
pub(super) async fn send(
    client: &reqwest::Client,
    url: &str,
    method: HttpMethod,
    timeout: Duration,
) -> Result<u16, ProbeError> {
    let request = match method {
        HttpMethod::Get => client.get(url),
        HttpMethod::Head => client.head(url),
    };

    let response = request.timeout(timeout).send().await.map_err(|e| {
        if e.is_timeout() { ProbeError::Timeout(format!("HTTP request to {url}")) } else { e.into() }
    })?;

    Ok(response.status().as_u16())
}

//! Device and check validation.
//!
//! Everything entering the registry goes through here, so invalid input is
//! rejected before it can reach the scheduler or the durable document.

use std::net::{IpAddr, Ipv4Addr};

use thiserror::Error;
use url::Url;

use crate::models::{Check, CheckKind, CheckType, Device, RavennaService};

const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Device name cannot be empty")]
    EmptyName,

    #[error("Device name too long (max {MAX_NAME_LEN} characters)")]
    NameTooLong,

    #[error("A device named '{0}' already exists")]
    DuplicateName(String),

    #[error("At least one port is required")]
    EmptyPorts,

    #[error("Invalid port {0}: must be between 1 and 65535")]
    InvalidPort(i64),

    #[error("{check} check: {field} is required")]
    MissingField { check: CheckType, field: &'static str },

    #[error("{check} check: invalid host '{host}'")]
    InvalidHost { check: CheckType, host: String },

    #[error("{check} check: invalid URL '{url}': {reason}")]
    InvalidUrl { check: CheckType, url: String, reason: String },

    #[error("{check} check: {value} is not a multicast address")]
    NotMulticast { check: CheckType, value: String },

    #[error("DSCP value {0} out of range (0-63)")]
    InvalidDscp(u8),

    #[error("Expected HTTP status {0} out of range (100-599)")]
    InvalidStatus(u16),
}

/// Validate a device name
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }

    if trimmed.len() > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong);
    }

    Ok(())
}

/// Validate a list of ports coming from the management surface
pub fn validate_ports(ports: &[i64]) -> Result<Vec<u16>, ValidationError> {
    if ports.is_empty() {
        return Err(ValidationError::EmptyPorts);
    }

    ports
        .iter()
        .map(|&port| match u16::try_from(port) {
            Ok(valid) if valid > 0 => Ok(valid),
            _ => Err(ValidationError::InvalidPort(port)),
        })
        .collect()
}

/// Validate a hostname or IP address
pub fn validate_host(host: &str, check: CheckType) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidHost { check, host: host.to_string() };

    if host.trim().is_empty() {
        return Err(ValidationError::MissingField { check, field: "host" });
    }

    if host.parse::<IpAddr>().is_ok() {
        return Ok(());
    }

    if host.contains(' ') || host.starts_with('-') || host.ends_with('-') {
        return Err(invalid());
    }

    if host.chars().all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == '_') {
        Ok(())
    } else {
        Err(invalid())
    }
}

/// Validate an HTTP/HTTPS URL
pub fn validate_url(url: &str, check: CheckType) -> Result<(), ValidationError> {
    if url.trim().is_empty() {
        return Err(ValidationError::MissingField { check, field: "url" });
    }

    let invalid = |reason: String| ValidationError::InvalidUrl { check, url: url.to_string(), reason };

    let parsed = Url::parse(url).map_err(|e| {
        if url.contains("://") {
            invalid(e.to_string())
        } else {
            invalid("URL must include scheme (http:// or https://)".to_string())
        }
    })?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme '{other}'"))),
    }

    if parsed.host_str().is_none() {
        return Err(invalid("URL must have a valid host".to_string()));
    }

    Ok(())
}

/// Groups may be given as names; only IP literals can be checked up front
fn validate_group(group: &str, check: CheckType) -> Result<(), ValidationError> {
    validate_host(group, check)?;

    match group.parse::<Ipv4Addr>() {
        Ok(addr) if !addr.is_multicast() => {
            Err(ValidationError::NotMulticast { check, value: group.to_string() })
        }
        _ => Ok(()),
    }
}

fn validate_port_list(ports: &[u16]) -> Result<(), ValidationError> {
    if ports.is_empty() {
        return Err(ValidationError::EmptyPorts);
    }
    if ports.contains(&0) {
        return Err(ValidationError::InvalidPort(0));
    }
    Ok(())
}

fn validate_port(port: u16) -> Result<(), ValidationError> {
    validate_port_list(&[port])
}

/// Validate the required fields of a check according to its kind
pub fn validate_check(check: &Check) -> Result<(), ValidationError> {
    let check_type = check.check_type();

    match &check.kind {
        CheckKind::Ping { target } => validate_host(target, check_type),
        CheckKind::Http { url, expected_status, .. } => {
            validate_url(url, check_type)?;
            if !(100..=599).contains(expected_status) {
                return Err(ValidationError::InvalidStatus(*expected_status));
            }
            Ok(())
        }
        CheckKind::Port { host, ports } => {
            validate_host(host, check_type)?;
            validate_port_list(ports)
        }
        CheckKind::Ptp { host, multicast, ptp_ports, .. } => {
            if let Some(host) = host {
                validate_host(host, check_type)?;
            }
            validate_group(multicast, check_type)?;
            validate_port_list(ptp_ports)
        }
        CheckKind::Multicast { multicast_group, port, .. } => {
            validate_group(multicast_group, check_type)?;
            validate_port(*port)
        }
        CheckKind::Rtp { host, port, .. } => {
            validate_host(host, check_type)?;
            validate_port(*port)
        }
        CheckKind::Qos { host, dscp, port } => {
            validate_host(host, check_type)?;
            if *dscp > 63 {
                return Err(ValidationError::InvalidDscp(*dscp));
            }
            port.map_or(Ok(()), validate_port)
        }
        CheckKind::Ravenna { host, port, service_type, url } => {
            validate_host(host, check_type)?;
            if let Some(port) = port {
                validate_port(*port)?;
            }
            match (service_type, url) {
                (RavennaService::Http | RavennaService::Https, Some(url)) => {
                    validate_url(url, check_type)
                }
                _ => Ok(()),
            }
        }
    }
}

/// Validate a device and all of its checks
pub fn validate_device(device: &Device) -> Result<(), ValidationError> {
    validate_name(&device.name)?;
    device.checks.iter().try_for_each(validate_check)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_ports() {
        assert_eq!(validate_ports(&[80, 443]).unwrap(), vec![80, 443]);
        assert_eq!(validate_ports(&[65535]).unwrap(), vec![65535]);

        assert_eq!(validate_ports(&[]), Err(ValidationError::EmptyPorts));
        assert_eq!(validate_ports(&[80, 0]), Err(ValidationError::InvalidPort(0)));
        assert_eq!(validate_ports(&[70000]), Err(ValidationError::InvalidPort(70000)));
        assert_eq!(validate_ports(&[-1]), Err(ValidationError::InvalidPort(-1)));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Core switch").is_ok());
        assert_eq!(validate_name("   "), Err(ValidationError::EmptyName));
        assert_eq!(validate_name(&"x".repeat(101)), Err(ValidationError::NameTooLong));
    }

    #[test]
    fn test_validate_host() {
        assert!(validate_host("10.0.0.5", CheckType::Ping).is_ok());
        assert!(validate_host("fe80::1", CheckType::Ping).is_ok());
        assert!(validate_host("stagebox-1.local", CheckType::Ping).is_ok());

        assert!(validate_host("", CheckType::Ping).is_err());
        assert!(validate_host("bad host", CheckType::Ping).is_err());
        assert!(validate_host("-leading", CheckType::Ping).is_err());
        assert!(validate_host("semi;colon", CheckType::Ping).is_err());
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("http://10.0.0.5", CheckType::Http).is_ok());
        assert!(validate_url("https://example.com:8443/status", CheckType::Http).is_ok());

        assert!(validate_url("example.com", CheckType::Http).is_err());
        assert!(validate_url("ftp://example.com", CheckType::Http).is_err());
        assert!(validate_url("", CheckType::Http).is_err());
    }

    #[test]
    fn test_validate_check_per_type() {
        let ok = Check::new(CheckKind::Port { host: "10.0.0.5".into(), ports: vec![80, 443] });
        assert!(validate_check(&ok).is_ok());

        let empty = Check::new(CheckKind::Port { host: "10.0.0.5".into(), ports: vec![] });
        assert_eq!(validate_check(&empty), Err(ValidationError::EmptyPorts));

        let missing = Check::new(CheckKind::Ping { target: String::new() });
        assert_eq!(
            validate_check(&missing),
            Err(ValidationError::MissingField { check: CheckType::Ping, field: "host" })
        );

        let unicast_group = Check::new(CheckKind::Multicast {
            multicast_group: "10.0.0.1".into(),
            port: 5004,
            interface: None,
        });
        assert!(matches!(
            validate_check(&unicast_group),
            Err(ValidationError::NotMulticast { .. })
        ));

        let dscp = Check::new(CheckKind::Qos { host: "10.0.0.5".into(), dscp: 64, port: None });
        assert_eq!(validate_check(&dscp), Err(ValidationError::InvalidDscp(64)));

        let status = Check::new(CheckKind::Http {
            url: "http://10.0.0.5".into(),
            expected_status: 42,
            method: Default::default(),
        });
        assert_eq!(validate_check(&status), Err(ValidationError::InvalidStatus(42)));
    }

    #[test]
    fn test_validate_device_checks_every_check() {
        let device = Device::new(
            "Stagebox",
            vec![
                Check::new(CheckKind::Ping { target: "10.0.0.7".into() }),
                Check::new(CheckKind::Rtp { host: String::new(), port: 5004, interface: None }),
            ],
        );
        assert!(validate_device(&device).is_err());
    }
}

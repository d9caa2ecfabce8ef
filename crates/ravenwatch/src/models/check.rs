//! Check definitions.
//!
//! A [`Check`] is one probe configured on a device. The probe itself is a
//! closed set of kinds ([`CheckKind`]) so that adding a kind is an
//! exhaustiveness change in the executor.

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_PTP_MULTICAST: &str = "224.0.1.129";
pub const DEFAULT_PTP_PORTS: [u16; 2] = [319, 320];
pub const DEFAULT_MEDIA_GROUP: &str = "239.69.0.1";
pub const DEFAULT_MEDIA_PORT: u16 = 5004;
/// Expedited forwarding, the usual marking for PTP
pub const DEFAULT_DSCP: u8 = 46;

/// A configured check: the probe kind plus fields shared by every kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check {
    #[serde(flatten)]
    pub kind: CheckKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Free-form labels used to select checks for troubleshooting runs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Check {
    pub fn new(kind: CheckKind) -> Self {
        Self { kind, description: None, tags: Vec::new() }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn check_type(&self) -> CheckType {
        self.kind.check_type()
    }

    pub fn target(&self) -> String {
        self.kind.target()
    }

    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        self.tags.iter().any(|tag| tags.contains(tag))
    }
}

/// Probe kinds with their type-specific fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CheckKind {
    Ping {
        target: String,
    },
    Http {
        url: String,
        #[serde(default = "default_expected_status")]
        expected_status: u16,
        #[serde(default)]
        method: HttpMethod,
    },
    Port {
        host: String,
        /// Every listed port has to accept a connection
        #[serde(alias = "port", deserialize_with = "one_or_many")]
        ports: Vec<u16>,
    },
    Ptp {
        /// Only count traffic sent by this host
        #[serde(default, skip_serializing_if = "Option::is_none")]
        host: Option<String>,
        #[serde(default = "default_ptp_multicast")]
        multicast: String,
        #[serde(default = "default_ptp_ports")]
        ptp_ports: Vec<u16>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        domain: Option<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        interface: Option<Ipv4Addr>,
    },
    Multicast {
        #[serde(default = "default_media_group")]
        multicast_group: String,
        #[serde(default = "default_media_port")]
        port: u16,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        interface: Option<Ipv4Addr>,
    },
    Rtp {
        /// Multicast group to join, or the unicast sender to listen for
        host: String,
        #[serde(default = "default_media_port")]
        port: u16,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        interface: Option<Ipv4Addr>,
    },
    Qos {
        host: String,
        #[serde(default = "default_dscp")]
        dscp: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        port: Option<u16>,
    },
    Ravenna {
        host: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        port: Option<u16>,
        #[serde(default)]
        service_type: RavennaService,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
}

impl CheckKind {
    pub fn check_type(&self) -> CheckType {
        match self {
            CheckKind::Ping { .. } => CheckType::Ping,
            CheckKind::Http { .. } => CheckType::Http,
            CheckKind::Port { .. } => CheckType::Port,
            CheckKind::Ptp { .. } => CheckType::Ptp,
            CheckKind::Multicast { .. } => CheckType::Multicast,
            CheckKind::Rtp { .. } => CheckType::Rtp,
            CheckKind::Qos { .. } => CheckType::Qos,
            CheckKind::Ravenna { .. } => CheckType::Ravenna,
        }
    }

    /// Short human readable target, shown next to results
    pub fn target(&self) -> String {
        match self {
            CheckKind::Ping { target } => target.clone(),
            CheckKind::Http { url, .. } => url.clone(),
            CheckKind::Port { host, ports } => format!("{host}:{}", join_ports(ports)),
            CheckKind::Ptp { host, multicast, ptp_ports, .. } => match host {
                Some(host) => format!("{host} via {multicast}:{}", join_ports(ptp_ports)),
                None => format!("{multicast}:{}", join_ports(ptp_ports)),
            },
            CheckKind::Multicast { multicast_group, port, .. } => format!("{multicast_group}:{port}"),
            CheckKind::Rtp { host, port, .. } => format!("{host}:{port}"),
            CheckKind::Qos { host, port: Some(port), .. } => format!("{host}:{port}"),
            CheckKind::Qos { host, port: None, .. } => host.clone(),
            CheckKind::Ravenna { host, port, service_type, .. } => {
                format!("{host}:{}", port.unwrap_or_else(|| service_type.default_port()))
            }
        }
    }
}

fn join_ports(ports: &[u16]) -> String {
    ports.iter().map(u16::to_string).collect::<Vec<_>>().join(",")
}

/// Kind of a check without its fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckType {
    Ping,
    Http,
    Port,
    Ptp,
    Multicast,
    Rtp,
    Qos,
    Ravenna,
}

impl CheckType {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckType::Ping => "ping",
            CheckType::Http => "http",
            CheckType::Port => "port",
            CheckType::Ptp => "ptp",
            CheckType::Multicast => "multicast",
            CheckType::Rtp => "rtp",
            CheckType::Qos => "qos",
            CheckType::Ravenna => "ravenna",
        }
    }
}

impl fmt::Display for CheckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    #[default]
    Get,
    Head,
}

/// RAVENNA-associated services that can be probed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RavennaService {
    #[default]
    Rtsp,
    Sap,
    Http,
    Https,
}

impl RavennaService {
    pub fn default_port(self) -> u16 {
        match self {
            RavennaService::Rtsp => 554,
            RavennaService::Sap => 9875,
            RavennaService::Http => 80,
            RavennaService::Https => 443,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RavennaService::Rtsp => "RTSP",
            RavennaService::Sap => "SAP",
            RavennaService::Http => "HTTP",
            RavennaService::Https => "HTTPS",
        }
    }
}

fn default_expected_status() -> u16 {
    200
}

fn default_ptp_multicast() -> String {
    DEFAULT_PTP_MULTICAST.to_string()
}

fn default_ptp_ports() -> Vec<u16> {
    DEFAULT_PTP_PORTS.to_vec()
}

fn default_media_group() -> String {
    DEFAULT_MEDIA_GROUP.to_string()
}

fn default_media_port() -> u16 {
    DEFAULT_MEDIA_PORT
}

fn default_dscp() -> u8 {
    DEFAULT_DSCP
}

/// Accepts `port = 80` as well as `ports = [80, 443]`
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(u16),
        Many(Vec<u16>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(port) => vec![port],
        OneOrMany::Many(ports) => ports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_port_alias() {
        let check: Check = serde_json::from_str(
            r#"{"type":"port","host":"10.0.0.5","port":80,"description":"Web"}"#,
        )
        .unwrap();
        assert_eq!(check.kind, CheckKind::Port { host: "10.0.0.5".into(), ports: vec![80] });
        assert_eq!(check.description.as_deref(), Some("Web"));
        assert_eq!(check.target(), "10.0.0.5:80");
    }

    #[test]
    fn test_defaults_are_applied() {
        let check: Check = toml::from_str("type = \"ptp\"\n").unwrap();
        match check.kind {
            CheckKind::Ptp { host, multicast, ptp_ports, domain, interface } => {
                assert!(host.is_none());
                assert_eq!(multicast, DEFAULT_PTP_MULTICAST);
                assert_eq!(ptp_ports, vec![319, 320]);
                assert!(domain.is_none());
                assert!(interface.is_none());
            }
            other => panic!("unexpected kind {other:?}"),
        }

        let check: Check =
            toml::from_str("type = \"http\"\nurl = \"http://10.0.0.5/\"\ntags = [\"web\"]\n")
                .unwrap();
        assert_eq!(
            check.kind,
            CheckKind::Http {
                url: "http://10.0.0.5/".into(),
                expected_status: 200,
                method: HttpMethod::Get
            }
        );
        assert_eq!(check.tags, vec!["web".to_string()]);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let parsed = serde_json::from_str::<Check>(r#"{"type":"snmp","host":"10.0.0.5"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_ravenna_target_uses_service_default_port() {
        let kind = CheckKind::Ravenna {
            host: "10.0.0.9".into(),
            port: None,
            service_type: RavennaService::Sap,
            url: None,
        };
        assert_eq!(kind.target(), "10.0.0.9:9875");
        assert_eq!(kind.check_type(), CheckType::Ravenna);
    }
}

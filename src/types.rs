use serde::{Deserialize, Serialize};
use time::{format_description::well_known, OffsetDateTime};

/// One neighbor-cache entry: an IP paired with its hardware address.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub ip: String,
    pub mac: String,
}

/// Outcome of a single TCP connect probe.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PortStatus {
    Open,
    Closed,
}

/// One probed port with its status and any captured service banner.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PortResult {
    pub port: u16,
    pub status: PortStatus,
    pub banner: String,
}

/// Scan-time snapshot of one host's open ports. Not persisted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub host: String,
    pub open_ports: Vec<PortResult>,
}

/// One established outbound connection from the local connection table.
///
/// `endpoint` is the raw `localIP:localPort->remoteIP:remotePort` field.
/// Identity across polls is `command:endpoint`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub command: String,
    pub pid: u32,
    pub endpoint: String,
}

impl Connection {
    pub fn key(&self) -> String {
        format!("{}:{}", self.command, self.endpoint)
    }

    /// Remote port of the `local->remote` pair, if parseable.
    pub fn remote_port(&self) -> Option<u16> {
        let remote = self.endpoint.split("->").nth(1)?;
        remote.rsplit(':').next()?.parse().ok()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    High,
    Warning,
    Info,
}

/// A newly observed outbound connection, classified. Transient; surfaced
/// via notification, never stored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RiskEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub command: String,
    pub pid: u32,
    pub endpoint: String,
    pub level: RiskLevel,
    /// Human-readable alert text; `None` when the event is recorded but
    /// not worth surfacing (allow-listed or unremarkable).
    pub alert: Option<String>,
    pub timestamp: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    #[serde(rename = "NEW_CONN")]
    NewConn,
}

/// RFC3339 UTC timestamp for event records.
pub fn timestamp_now() -> String {
    OffsetDateTime::now_utc()
        .format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_key_joins_command_and_endpoint() {
        let c = Connection {
            command: "curl".into(),
            pid: 4242,
            endpoint: "192.168.1.5:54321->93.184.216.34:443".into(),
        };
        assert_eq!(c.key(), "curl:192.168.1.5:54321->93.184.216.34:443");
    }

    #[test]
    fn remote_port_extracted_from_endpoint() {
        let c = Connection {
            command: "nc".into(),
            pid: 1,
            endpoint: "10.0.0.2:50000->10.0.0.9:4444".into(),
        };
        assert_eq!(c.remote_port(), Some(4444));
    }

    #[test]
    fn remote_port_none_without_arrow() {
        let c = Connection {
            command: "nc".into(),
            pid: 1,
            endpoint: "*:68".into(),
        };
        assert_eq!(c.remote_port(), None);
    }
}

use std::collections::HashSet;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::MonitorRules;
use crate::types::{timestamp_now, Connection, EventKind, RiskEvent, RiskLevel};

/// Watches the host's own established outbound connections.
///
/// Retains exactly one snapshot: the set of connection identity keys from
/// the most recent poll. Each poll diffs the current table against it and
/// then replaces it wholesale. `&mut self` keeps polls serialized against
/// the snapshot; a monitor instance has a single writer by construction.
pub struct ConnectionMonitor {
    last: HashSet<String>,
    rules: MonitorRules,
}

impl ConnectionMonitor {
    pub fn new(rules: MonitorRules) -> Self {
        Self {
            last: HashSet::new(),
            rules,
        }
    }

    /// Snapshot the current established connections and report the new
    /// ones since the previous poll.
    ///
    /// Fails soft: if `lsof` is unavailable or exits non-zero (it exits 1
    /// when nothing matches), the table is treated as empty.
    pub async fn poll(&mut self) -> Vec<RiskEvent> {
        let raw = match Command::new("lsof").args(["-i", "-P", "-n"]).output().await {
            Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout).into_owned(),
            Ok(out) => {
                debug!("lsof exited with {}; treating as no connections", out.status);
                String::new()
            }
            Err(e) => {
                debug!("lsof unavailable: {e}");
                String::new()
            }
        };
        self.observe(&raw)
    }

    /// Diff raw connection-table output against the retained snapshot.
    ///
    /// Pure with respect to the OS: all table reading happens in
    /// [`poll`]; this is the seam the tests drive directly.
    pub fn observe(&mut self, raw: &str) -> Vec<RiskEvent> {
        let mut current = HashSet::new();
        let mut events = Vec::new();

        for line in raw.lines() {
            if !line.contains("ESTABLISHED") {
                continue;
            }
            let Some(conn) = parse_connection_line(line) else {
                continue;
            };
            let key = conn.key();
            if !current.insert(key.clone()) {
                continue; // same identity listed twice in one table
            }
            if self.last.contains(&key) {
                continue; // already reported on an earlier poll
            }

            let (level, alert) = self.rules.classify(&conn);
            if let Some(msg) = &alert {
                warn!("{msg}");
            } else {
                debug!(command = %conn.command, endpoint = %conn.endpoint, "new connection");
            }
            events.push(RiskEvent {
                kind: EventKind::NewConn,
                command: conn.command,
                pid: conn.pid,
                endpoint: conn.endpoint,
                level,
                alert,
                timestamp: timestamp_now(),
            });
        }

        // Wholesale replacement, never a merge.
        self.last = current;
        events
    }

}

impl MonitorRules {
    /// Classify a new outbound connection; first matching rule wins.
    ///
    /// Allow-listed commands are never alerted on, even toward suspicious
    /// ports. After that the remote-port blacklist outranks the
    /// shell-tool heuristic.
    pub fn classify(&self, conn: &Connection) -> (RiskLevel, Option<String>) {
        if self.known_apps.contains(&conn.command) {
            return (RiskLevel::Info, None);
        }

        if let Some(port) = conn.remote_port() {
            if self.suspicious_ports.contains(&port) {
                let msg = format!(
                    "HIGH RISK: {} connected to suspicious port {port}!",
                    conn.command
                );
                return (RiskLevel::High, Some(msg));
            }
        }

        if self.shell_tools.contains(&conn.command) {
            let remote = conn.endpoint.split("->").nth(1).unwrap_or(&conn.endpoint);
            let msg = format!(
                "WARNING: shell tool '{}' opened a network connection to {remote}",
                conn.command
            );
            return (RiskLevel::Warning, Some(msg));
        }

        (RiskLevel::Info, None)
    }
}

/// Parse one `lsof -i -P -n` line:
/// `COMMAND PID USER FD TYPE DEVICE SIZE/OFF NODE NAME`.
///
/// A command name containing a space shifts every later column right by
/// one, so the pid is taken from column 1 or 2 (first that parses) and
/// the endpoint from column 8 or 9 (first containing `->`).
pub fn parse_connection_line(line: &str) -> Option<Connection> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 9 {
        return None;
    }

    let command = parts[0].to_string();
    let pid = parts[1..=2].iter().find_map(|p| p.parse().ok())?;
    let endpoint = parts[8..]
        .iter()
        .take(2)
        .find(|f| f.contains("->"))?
        .to_string();

    Some(Connection {
        command,
        pid,
        endpoint,
    })
}

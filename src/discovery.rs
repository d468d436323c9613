use regex::Regex;
use std::sync::OnceLock;
use tokio::process::Command;
use tracing::debug;

use crate::types::Host;

/// Neighbor-cache line shape shared by macOS and Linux `arp -a`:
/// `gateway (192.168.1.1) at aa:bb:cc:dd:ee:ff on en0 ifscope [ethernet]`.
fn neighbor_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\((.*?)\) at (.*?) on").expect("valid neighbor pattern"))
}

/// List hosts the OS has recently resolved, from the neighbor cache.
///
/// Purely reads local state via `arp -a`; generates no network traffic,
/// so it only reveals peers the machine has already talked to. Fails
/// soft: if the command is unavailable or exits non-zero, the list is
/// empty.
pub async fn discover_hosts() -> Vec<Host> {
    let output = match Command::new("arp").arg("-a").output().await {
        Ok(o) => o,
        Err(e) => {
            debug!("arp unavailable: {e}");
            return Vec::new();
        }
    };
    if !output.status.success() {
        debug!("arp exited with {}", output.status);
        return Vec::new();
    }
    parse_neighbors(&String::from_utf8_lossy(&output.stdout))
}

/// Extract `(ip, mac)` pairs from raw neighbor-cache output, one `Host`
/// per matching line in input order. Non-matching lines are skipped.
pub fn parse_neighbors(raw: &str) -> Vec<Host> {
    let pattern = neighbor_pattern();
    raw.lines()
        .filter_map(|line| {
            let caps = pattern.captures(line)?;
            Some(Host {
                ip: caps[1].to_string(),
                mac: caps[2].to_string(),
            })
        })
        .collect()
}

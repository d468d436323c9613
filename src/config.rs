use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ports;

/// Top-level configuration, loaded from an optional TOML file.
///
/// Every field has a default, so a missing file or a partial file yields
/// a fully working configuration. The defaults mirror the built-in
/// heuristics; the file exists so the allow/deny lists are inputs rather
/// than constants.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub monitor: MonitorRules,
    pub adblock: AdblockConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load from `path` if given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}

/// Port scanner settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// TCP ports probed per host.
    pub ports: Vec<u16>,
    /// Per-probe connect timeout in milliseconds.
    pub timeout_ms: u64,
    /// Max concurrent probes against a single host.
    pub port_batch: usize,
    /// Max hosts scanned concurrently in a subnet scan.
    pub host_batch: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            ports: ports::DEFAULT_PORTS.to_vec(),
            timeout_ms: 1000,
            port_batch: 5,
            host_batch: 3,
        }
    }
}

impl ScanConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Classification rules for the connection monitor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorRules {
    /// Commands whose connections are never alerted on.
    pub known_apps: HashSet<String>,
    /// Remote ports that always raise a high-risk alert.
    pub suspicious_ports: HashSet<u16>,
    /// Generic shells/interpreters/network tools whose outbound
    /// connections raise a warning.
    pub shell_tools: HashSet<String>,
}

impl Default for MonitorRules {
    fn default() -> Self {
        Self {
            known_apps: [
                "Google Chrome",
                "Safari",
                "Firefox",
                "System Monitor",
                "Code Helper",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            // SSH, Telnet, Metasploit default, leet, IRC
            suspicious_ports: [22, 23, 4444, 1337, 6667].into_iter().collect(),
            shell_tools: ["bash", "zsh", "sh", "python", "nc", "curl"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Adblock paths and blocklist source.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdblockConfig {
    /// The live name-resolution override file.
    pub hosts_path: PathBuf,
    /// Where the one-time backup of the original hosts file lives.
    pub backup_path: PathBuf,
    /// Plain-text hosts-format blocklist, fetched fresh on every enable.
    pub blocklist_url: String,
}

impl Default for AdblockConfig {
    fn default() -> Self {
        Self {
            hosts_path: PathBuf::from("/etc/hosts"),
            backup_path: default_backup_path(),
            blocklist_url: String::from(
                "https://raw.githubusercontent.com/StevenBlack/hosts/master/hosts",
            ),
        }
    }
}

fn default_backup_path() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".local/share/lan-sentry/hosts.backup"),
        None => std::env::temp_dir().join("lan-sentry-hosts.backup"),
    }
}

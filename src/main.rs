use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use lan_sentry_rs::adblock::AdblockManager;
use lan_sentry_rs::config::Config;
use lan_sentry_rs::monitor::ConnectionMonitor;
use lan_sentry_rs::types::ScanReport;
use lan_sentry_rs::{discovery, ports, scanner};

/// lan-sentry-rs — local network security monitor: neighbor-cache host
/// discovery, batched TCP port scanning, outbound connection watching,
/// and reversible hosts-file ad blocking.
#[derive(Debug, Parser)]
#[command(name = "lan-sentry-rs", version, about, long_about = None)]
struct Cli {
    /// Optional TOML config file; built-in defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List hosts from the OS neighbor cache (sends no probes).
    Discover {
        /// Print hosts as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Port-scan one host, or every discovered host when TARGET is omitted.
    Scan {
        /// IP to scan; omit to discover and scan the whole neighbor set.
        target: Option<String>,

        /// Ports file (one port or range per line); overrides the config list.
        #[arg(long)]
        ports: Option<PathBuf>,

        /// Per-probe connect timeout in milliseconds.
        #[arg(long = "timeout-ms")]
        timeout_ms: Option<u64>,

        /// Write reports as pretty JSON to this path (optional).
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print reports as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Poll established outbound connections and alert on new risky ones.
    Monitor {
        /// Seconds between polls.
        #[arg(long = "interval-secs", default_value_t = 10)]
        interval_secs: u64,

        /// Run a single poll, print its events as JSON, and exit.
        #[arg(long, default_value_t = false)]
        once: bool,
    },
    /// System-wide ad blocking through the hosts file.
    Adblock {
        #[command(subcommand)]
        action: AdblockAction,
    },
}

#[derive(Debug, Subcommand)]
enum AdblockAction {
    /// Back up the hosts file (first run only), fetch the blocklist, and
    /// install it. Prompts for administrator authorization.
    Enable,
    /// Restore the original hosts file from the backup.
    Disable,
    /// Search the live hosts file for blocked entries.
    Search { query: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = Config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Discover { json } => cmd_discover(json).await,
        Commands::Scan {
            target,
            ports,
            timeout_ms,
            output,
            json,
        } => cmd_scan(cfg, target, ports, timeout_ms, output, json).await,
        Commands::Monitor {
            interval_secs,
            once,
        } => cmd_monitor(cfg, interval_secs, once).await,
        Commands::Adblock { action } => cmd_adblock(cfg, action).await,
    }
}

async fn cmd_discover(json: bool) -> Result<()> {
    let hosts = discovery::discover_hosts().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&hosts)?);
        return Ok(());
    }
    if hosts.is_empty() {
        println!("No neighbors in the ARP cache (or `arp` is unavailable).");
        return Ok(());
    }
    println!("Known neighbors ({}):", hosts.len());
    for h in &hosts {
        println!("  {:<15}  {}", h.ip, h.mac);
    }
    Ok(())
}

async fn cmd_scan(
    cfg: Config,
    target: Option<String>,
    ports_file: Option<PathBuf>,
    timeout_ms: Option<u64>,
    output: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let mut scan_cfg = cfg.scan;
    if let Some(path) = ports_file {
        scan_cfg.ports = ports::load_ports_or_default(path);
    }
    if let Some(ms) = timeout_ms {
        scan_cfg.timeout_ms = ms;
    }

    // Ctrl-C stops admitting new probes; in-flight ones finish.
    let cancel = CancellationToken::new();
    let cancel_ctrlc = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        cancel_ctrlc.cancel();
    });

    let reports = match target {
        Some(ip) => {
            println!(
                "Scanning {ip} on {} ports (timeout {}ms)...",
                scan_cfg.ports.len(),
                scan_cfg.timeout_ms
            );
            let report = scanner::scan_host_with_cancel(&ip, &scan_cfg, cancel).await;
            vec![report]
        }
        None => {
            let hosts = discovery::discover_hosts().await;
            if hosts.is_empty() {
                println!("No neighbors to scan.");
                return Ok(());
            }
            println!(
                "Scanning {} discovered hosts on {} ports each...",
                hosts.len(),
                scan_cfg.ports.len()
            );
            scanner::scan_hosts_with_cancel(&hosts, &scan_cfg, cancel).await
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        print_reports(&reports);
    }
    if let Some(path) = output.as_deref() {
        write_reports_json(path, &reports)?;
        println!("Wrote JSON reports to {}", path.display());
    }
    Ok(())
}

async fn cmd_monitor(cfg: Config, interval_secs: u64, once: bool) -> Result<()> {
    let mut monitor = ConnectionMonitor::new(cfg.monitor);

    if once {
        let events = monitor.poll().await;
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }

    println!(
        "Watching outbound connections every {interval_secs}s (Ctrl+C to stop)..."
    );
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let events = monitor.poll().await;
                for ev in &events {
                    if let Some(alert) = &ev.alert {
                        println!("[SECURITY] {alert}");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopping monitor.");
                break;
            }
        }
    }
    Ok(())
}

async fn cmd_adblock(cfg: Config, action: AdblockAction) -> Result<()> {
    let mgr = AdblockManager::new(cfg.adblock);
    match action {
        AdblockAction::Enable => println!("{}", mgr.enable().await?),
        AdblockAction::Disable => println!("{}", mgr.disable().await?),
        AdblockAction::Search { query } => {
            let matches = mgr.search(&query)?;
            if matches.is_empty() {
                println!("No blocked entries match '{query}'.");
            } else {
                for line in &matches {
                    println!("{line}");
                }
            }
        }
    }
    Ok(())
}

fn print_reports(reports: &[ScanReport]) {
    let open_total: usize = reports.iter().map(|r| r.open_ports.len()).sum();
    if open_total == 0 {
        println!("No open ports found.");
        return;
    }

    let mut host_w = "host".len();
    let mut banner_w = "banner".len();
    for r in reports {
        host_w = host_w.max(r.host.len());
        for p in &r.open_ports {
            banner_w = banner_w.max(p.banner.len());
        }
    }
    let port_w = "port".len();

    println!("\nOpen ports: {open_total}");
    println!(
        "{:<host_w$}  {:>port_w$}  {:<banner_w$}",
        "host", "port", "banner"
    );
    println!(
        "{:-<host_w$}  {:-<port_w$}  {:-<banner_w$}",
        "", "", ""
    );
    for r in reports {
        for p in &r.open_ports {
            println!(
                "{:<host_w$}  {:>port_w$}  {:<banner_w$}",
                r.host, p.port, p.banner
            );
        }
    }
}

fn write_reports_json(path: &std::path::Path, reports: &[ScanReport]) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, reports)?;
    Ok(())
}

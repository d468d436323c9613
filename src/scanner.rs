use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::ScanConfig;
use crate::types::{Host, PortResult, PortStatus, ScanReport};

/// Ports where a minimal HEAD request is written to elicit a banner.
const WEB_PORTS: &[u16] = &[80, 443, 8080, 8443];

/// Captured banners are cut to this many chars plus an ellipsis.
const BANNER_MAX: usize = 50;

/// Probe one TCP port with a bounded-time connect and an opportunistic
/// banner read.
///
/// On connect, web ports get a `HEAD / HTTP/1.0` request to provoke a
/// response; the first bytes received become the banner and the socket
/// is dropped immediately. Connect timeout or error yields a `closed`
/// result with an empty banner. The probe always resolves: the connect
/// and the read are each bounded by `timeout`.
pub async fn probe(host: &str, port: u16, timeout: Duration) -> PortResult {
    match time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(mut stream)) => {
            let banner = grab_banner(&mut stream, port, timeout).await;
            PortResult {
                port,
                status: PortStatus::Open,
                banner,
            }
        }
        _ => PortResult {
            port,
            status: PortStatus::Closed,
            banner: String::new(),
        },
    }
}

async fn grab_banner(stream: &mut TcpStream, port: u16, timeout: Duration) -> String {
    if WEB_PORTS.contains(&port) {
        // Best effort; a failed write just means no banner.
        let _ = stream.write_all(b"HEAD / HTTP/1.0\r\n\r\n").await;
    }
    let mut buf = vec![0u8; 256];
    match time::timeout(timeout, stream.read(&mut buf)).await {
        Ok(Ok(n)) if n > 0 => {
            buf.truncate(n);
            truncate_banner(String::from_utf8_lossy(&buf).trim())
        }
        _ => String::new(),
    }
}

/// Cut a banner to [`BANNER_MAX`] chars plus `...`, on char boundaries.
fn truncate_banner(s: &str) -> String {
    if s.chars().count() > BANNER_MAX {
        let mut out: String = s.chars().take(BANNER_MAX).collect();
        out.push_str("...");
        out
    } else {
        s.to_string()
    }
}

/// Scan one host across the configured port list.
///
/// Probes are admitted through a semaphore of `port_batch` permits so no
/// more than that many sockets are open against the host at once. Closed
/// results are discarded; open ports come back sorted.
pub async fn scan_host(host: &str, cfg: &ScanConfig) -> ScanReport {
    scan_host_with_cancel(host, cfg, CancellationToken::new()).await
}

pub async fn scan_host_with_cancel(
    host: &str,
    cfg: &ScanConfig,
    cancel: CancellationToken,
) -> ScanReport {
    let timeout = cfg.timeout();
    let sem = Arc::new(Semaphore::new(cfg.port_batch.max(1)));
    let mut set = JoinSet::new();

    for &port in &cfg.ports {
        if cancel.is_cancelled() {
            break;
        }
        let permit = sem
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore in scope");
        let host = host.to_string();
        let cancel = cancel.clone();
        set.spawn(async move {
            let _permit = permit; // hold until the probe resolves

            if cancel.is_cancelled() {
                return None;
            }
            let result = probe(&host, port, timeout).await;
            (result.status == PortStatus::Open).then_some(result)
        });
    }

    let mut open_ports = Vec::new();
    while let Some(res) = set.join_next().await {
        if let Ok(Some(r)) = res {
            open_ports.push(r);
        }
    }
    open_ports.sort_by_key(|r| r.port);

    debug!(host, open = open_ports.len(), "host scan complete");
    ScanReport {
        host: host.to_string(),
        open_ports,
    }
}

/// Scan a set of discovered hosts, `host_batch` hosts at a time.
///
/// Combined with the per-host port semaphore this caps sockets in flight
/// at `host_batch * port_batch`. Hosts with no open ports are dropped
/// from the result; reports come back sorted by host for stable output.
pub async fn scan_hosts(hosts: &[Host], cfg: &ScanConfig) -> Vec<ScanReport> {
    scan_hosts_with_cancel(hosts, cfg, CancellationToken::new()).await
}

pub async fn scan_hosts_with_cancel(
    hosts: &[Host],
    cfg: &ScanConfig,
    cancel: CancellationToken,
) -> Vec<ScanReport> {
    let sem = Arc::new(Semaphore::new(cfg.host_batch.max(1)));
    let mut set = JoinSet::new();

    for host in hosts {
        if host.ip.is_empty() {
            continue;
        }
        if cancel.is_cancelled() {
            break;
        }
        let permit = sem
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore in scope");
        let ip = host.ip.clone();
        let cfg = cfg.clone();
        let cancel = cancel.clone();
        set.spawn(async move {
            let _permit = permit;
            scan_host_with_cancel(&ip, &cfg, cancel).await
        });
    }

    let mut reports = Vec::new();
    while let Some(res) = set.join_next().await {
        if let Ok(report) = res {
            if !report.open_ports.is_empty() {
                reports.push(report);
            }
        }
    }
    reports.sort_by(|a, b| a.host.cmp(&b.host));
    reports
}

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time;

/// Whole-request ceiling: connect, TLS handshake, and body read combined.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetch a text resource over plain HTTP or HTTPS with a single
/// `HTTP/1.0` GET.
///
/// `Connection: close` plus HTTP/1.0 keeps the response unchunked, so
/// the body is simply everything after the header block. Redirects are
/// not followed; anything but status 200 is an error.
pub async fn get_text(url: &str) -> Result<String> {
    time::timeout(FETCH_TIMEOUT, get_text_inner(url))
        .await
        .map_err(|_| anyhow!("fetching {url} timed out"))?
}

async fn get_text_inner(url: &str) -> Result<String> {
    let (tls, host, port, path) = split_url(url)?;
    let request = format!(
        "GET {path} HTTP/1.0\r\nHost: {host}\r\nUser-Agent: lan-sentry-rs\r\nConnection: close\r\n\r\n"
    );

    let stream = TcpStream::connect((host.as_str(), port))
        .await
        .with_context(|| format!("failed to connect to {host}:{port}"))?;

    let raw = if tls {
        let connector = tokio_native_tls::TlsConnector::from(
            native_tls::TlsConnector::new().context("failed to build TLS connector")?,
        );
        let mut stream = connector
            .connect(&host, stream)
            .await
            .with_context(|| format!("TLS handshake with {host} failed"))?;
        stream.write_all(request.as_bytes()).await?;
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await?;
        buf
    } else {
        let mut stream = stream;
        stream.write_all(request.as_bytes()).await?;
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await?;
        buf
    };

    parse_response(&raw)
}

/// Split a URL into (tls, host, port, path). Only http/https schemes.
fn split_url(url: &str) -> Result<(bool, String, u16, String)> {
    let (tls, rest) = if let Some(r) = url.strip_prefix("https://") {
        (true, r)
    } else if let Some(r) = url.strip_prefix("http://") {
        (false, r)
    } else {
        bail!("unsupported URL scheme: {url}");
    };

    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, "/"),
    };
    let (host, port) = match authority.rsplit_once(':') {
        Some((h, p)) => (
            h.to_string(),
            p.parse()
                .with_context(|| format!("invalid port in URL: {p}"))?,
        ),
        None => (authority.to_string(), if tls { 443 } else { 80 }),
    };
    if host.is_empty() {
        bail!("missing host in URL: {url}");
    }
    Ok((tls, host, port, path.to_string()))
}

fn parse_response(raw: &[u8]) -> Result<String> {
    let text = String::from_utf8_lossy(raw);
    let (head, body) = text
        .split_once("\r\n\r\n")
        .ok_or_else(|| anyhow!("malformed HTTP response: no header terminator"))?;
    let status_line = head.lines().next().unwrap_or("");
    let code = status_line.split_whitespace().nth(1).unwrap_or("");
    if code != "200" {
        bail!("unexpected HTTP status: {status_line}");
    }
    Ok(body.to_string())
}

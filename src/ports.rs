use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// The default scan target list: the most commonly exposed TCP services
/// worth flagging on a LAN. Deliberately short; full port coverage is not
/// the goal.
pub const DEFAULT_PORTS: &[u16] = &[
    21, 22, 23, 25, 53, 80, 110, 135, 139, 143, 443, 445, 993, 995, 1433, 3306, 3389, 5900, 8080,
    8443,
];

/// Parse a port-list file into a deduplicated list of TCP ports.
///
/// One entry per line: a single port (`80`), an inclusive range
/// (`8000-8010`), or a comment (`# ...`). Blank lines are ignored.
pub fn parse_port_list(s: &str) -> Result<Vec<u16>> {
    let mut ports = Vec::new();
    let mut seen = HashSet::new();

    for (idx, raw) in s.lines().enumerate() {
        let line_no = idx + 1;
        let entry = raw.split('#').next().map(str::trim).unwrap_or("");
        if entry.is_empty() {
            continue;
        }

        let (lo, hi) = match entry.split_once('-') {
            Some((a, b)) => {
                let lo = parse_port(a.trim())
                    .with_context(|| format!("line {line_no}: bad range start: {a}"))?;
                let hi = parse_port(b.trim())
                    .with_context(|| format!("line {line_no}: bad range end: {b}"))?;
                if lo > hi {
                    bail!("line {line_no}: range {lo}-{hi} runs backwards");
                }
                (lo, hi)
            }
            None => {
                let p = parse_port(entry)
                    .with_context(|| format!("line {line_no}: bad port value: {entry}"))?;
                (p, p)
            }
        };

        for p in lo..=hi {
            if seen.insert(p) {
                ports.push(p);
            }
        }
    }

    Ok(ports)
}

/// Load a port list from a file, falling back to [`DEFAULT_PORTS`] if the
/// file is missing, unreadable, or empty.
pub fn load_ports_or_default(path: impl AsRef<Path>) -> Vec<u16> {
    match fs::read_to_string(path.as_ref()) {
        Ok(content) => match parse_port_list(&content) {
            Ok(v) if !v.is_empty() => v,
            _ => DEFAULT_PORTS.to_vec(),
        },
        Err(_) => DEFAULT_PORTS.to_vec(),
    }
}

fn parse_port(s: &str) -> Result<u16> {
    let val: u32 = s.parse().map_err(|e| anyhow::anyhow!("{e}"))?;
    if val == 0 || val > 65535 {
        bail!("port out of range: {val}");
    }
    Ok(val as u16)
}

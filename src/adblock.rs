use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use crate::config::AdblockConfig;
use crate::{fetch, privilege};

const MAX_SEARCH_RESULTS: usize = 50;

/// Reversible system-wide ad blocking through the hosts file.
///
/// `enable` replaces the live hosts file wholesale with a fetched
/// blocklist, so the original content (loopback entries, custom hosts)
/// only survives through the one-time backup. The backup is therefore
/// written before any mutation and never overwritten once it exists.
pub struct AdblockManager {
    cfg: AdblockConfig,
}

impl AdblockManager {
    pub fn new(cfg: AdblockConfig) -> Self {
        Self { cfg }
    }

    /// Back up the live hosts file exactly once.
    ///
    /// The backup is created with `create_new`, an atomic
    /// create-if-absent, so there is no check-then-write window and a
    /// second call can never clobber the original content.
    pub fn ensure_backup(&self) -> Result<()> {
        let current = fs::read(&self.cfg.hosts_path).with_context(|| {
            format!("failed to read hosts file: {}", self.cfg.hosts_path.display())
        })?;

        if let Some(parent) = self.cfg.backup_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create backup directory: {}", parent.display())
            })?;
        }

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.cfg.backup_path)
        {
            Ok(mut file) => {
                file.write_all(&current).with_context(|| {
                    format!("failed to write backup: {}", self.cfg.backup_path.display())
                })?;
                info!("hosts file backed up to {}", self.cfg.backup_path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("backup already exists, leaving it untouched");
                Ok(())
            }
            Err(e) => Err(e).with_context(|| {
                format!("failed to create backup: {}", self.cfg.backup_path.display())
            }),
        }
    }

    /// Swap the fetched blocklist over the live hosts file.
    ///
    /// Order matters: backup first, then fetch (a download failure aborts
    /// with the live file untouched), then stage to a temp file, then one
    /// privileged copy as the sole mutation point.
    pub async fn enable(&self) -> Result<String> {
        self.ensure_backup()?;

        let blocklist = fetch::get_text(&self.cfg.blocklist_url)
            .await
            .context("failed to download blocklist")?;

        let staged = self.staging_path();
        fs::write(&staged, &blocklist)
            .with_context(|| format!("failed to stage blocklist: {}", staged.display()))?;

        let result = privilege::copy_file(&staged, &self.cfg.hosts_path).await;
        let _ = fs::remove_file(&staged);
        result?;

        info!(
            lines = blocklist.lines().count(),
            "blocklist installed over {}",
            self.cfg.hosts_path.display()
        );
        Ok(String::from("ad blocking enabled (system-wide)"))
    }

    /// Restore the original hosts file from the backup.
    pub async fn disable(&self) -> Result<String> {
        if !self.cfg.backup_path.exists() {
            bail!("no backup found; ad blocking was never enabled");
        }
        privilege::copy_file(&self.cfg.backup_path, &self.cfg.hosts_path).await?;
        Ok(String::from("ad blocking disabled; original hosts file restored"))
    }

    /// Search the live hosts file for lines containing `query`.
    ///
    /// Case-sensitive substring match; comment and blank lines are
    /// dropped and at most [`MAX_SEARCH_RESULTS`] lines come back. Reads
    /// only local state, never re-downloads.
    pub fn search(&self, query: &str) -> Result<Vec<String>> {
        let content = fs::read_to_string(&self.cfg.hosts_path).with_context(|| {
            format!("failed to read hosts file: {}", self.cfg.hosts_path.display())
        })?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#') && l.contains(query))
            .take(MAX_SEARCH_RESULTS)
            .map(str::to_string)
            .collect())
    }

    fn staging_path(&self) -> PathBuf {
        // Unique per call so concurrent managers never share a staging file.
        static SEQ: AtomicU64 = AtomicU64::new(0);
        let n = SEQ.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "lan-sentry-hosts.staged.{}.{n}",
            std::process::id()
        ))
    }
}

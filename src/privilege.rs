use std::io::ErrorKind;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::debug;

/// Copy `src` over `dst`, escalating privileges only when needed.
///
/// A plain copy is attempted first; on `PermissionDenied` the copy is
/// rerun through the OS's interactive authorization mechanism. The
/// elevated copy is a single shell `cp`, so the destination is either
/// fully replaced or untouched. A cancelled prompt surfaces as an error.
pub async fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    match std::fs::copy(src, dst) {
        Ok(_) => return Ok(()),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            debug!("plain copy to {} denied, escalating", dst.display());
        }
        Err(e) => {
            return Err(e).with_context(|| {
                format!("failed to copy {} to {}", src.display(), dst.display())
            });
        }
    }
    elevated_copy(src, dst).await
}

#[cfg(target_os = "macos")]
async fn elevated_copy(src: &Path, dst: &Path) -> Result<()> {
    // `do shell script ... with administrator privileges` pops the
    // system authorization dialog. Paths are single-quoted inside the
    // shell command; double quotes must be escaped for AppleScript.
    let script = format!(
        "do shell script \"cp '{}' '{}'\" with administrator privileges",
        escape_quotes(src),
        escape_quotes(dst),
    );
    let status = Command::new("osascript")
        .arg("-e")
        .arg(&script)
        .status()
        .await
        .context("failed to run osascript")?;
    if !status.success() {
        bail!("administrator authorization was cancelled or failed");
    }
    Ok(())
}

#[cfg(target_os = "macos")]
fn escape_quotes(path: &Path) -> String {
    path.display().to_string().replace('"', "\\\"")
}

#[cfg(not(target_os = "macos"))]
async fn elevated_copy(src: &Path, dst: &Path) -> Result<()> {
    let status = Command::new("pkexec")
        .arg("cp")
        .arg(src)
        .arg(dst)
        .status()
        .await
        .context("failed to run pkexec")?;
    if !status.success() {
        bail!("elevated copy was cancelled or failed");
    }
    Ok(())
}

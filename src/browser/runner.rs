// SPDX-License-Identifier: MIT
//! Headless browser lifecycle: detection, spawn, and DOM retrieval.
//!
//! Strategy:
//!   1. `detect_browser()` searches PATH for a supported Chromium build
//!      (unless the config pins an explicit binary).
//!   2. The assembled page is written into its own scratch directory.
//!   3. The browser runs with `--headless --dump-dom`; once the in-page
//!      script has emitted its payload the serialized DOM arrives on
//!      stdout.
//!   4. The scratch directory is dropped on every exit path — success,
//!      failure, or timeout — and a timed-out child is killed.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tempfile::TempDir;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::BrowserConfig;
use crate::error::{Result, SaverError};

/// Browser binaries to probe, in preference order.
const CANDIDATE_BROWSERS: &[&str] = &["chromium", "chrome", "google-chrome", "chromium-browser"];

/// Wall-clock slack on top of the in-page virtual time budget, covering
/// browser startup and profile initialization.
const STARTUP_GRACE_SECS: u64 = 5;

/// Detect the first headless-capable browser binary on PATH.
pub fn detect_browser() -> Option<PathBuf> {
    for candidate in CANDIDATE_BROWSERS {
        if let Some(path) = which(candidate) {
            debug!(browser = *candidate, "headless browser detected on PATH");
            return Some(path);
        }
    }
    None
}

fn which(binary: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(binary);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Render `html` headlessly and return the serialized DOM.
pub(crate) async fn dump_dom(html: &str, config: &BrowserConfig) -> Result<String> {
    let browser = match &config.browser_path {
        Some(path) => path.clone(),
        None => detect_browser().ok_or(SaverError::NoBrowser)?,
    };

    let tmp = TempDir::new()?;
    let page_path = tmp.path().join("page.html");
    std::fs::write(&page_path, html)?;

    // The virtual time budget bounds how long the page waits for CDN
    // loads and async rendering before the DOM is dumped; the wall-clock
    // deadline adds startup slack and is enforced with a kill.
    let budget_ms = config.timeout_secs.saturating_mul(1000);
    debug!(browser = %browser.display(), "spawning headless browser");
    let mut child = Command::new(&browser)
        .arg("--headless")
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--dump-dom")
        .arg(format!("--virtual-time-budget={budget_ms}"))
        .arg(&page_path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;
    drop(child.stdin.take());

    let deadline = Duration::from_secs(config.timeout_secs + STARTUP_GRACE_SECS);
    let out = match timeout(deadline, child.wait_with_output()).await {
        Ok(result) => result?,
        Err(_elapsed) => {
            warn!(secs = config.timeout_secs, "headless browser timed out");
            return Err(SaverError::Timeout {
                tool: browser.display().to_string(),
                secs: config.timeout_secs,
            });
        }
    };

    if !out.status.success() {
        if out.stdout.is_empty() {
            return Err(SaverError::ToolFailed {
                tool: browser.display().to_string(),
                status: out.status.to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        // A partial DOM may still carry the payload; let extraction decide.
        warn!(status = %out.status, "browser exited with non-zero status");
    }

    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn which_misses_nonexistent_binary() {
        assert!(which("vegasave-no-such-browser-binary").is_none());
    }
}

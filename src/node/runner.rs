// SPDX-License-Identifier: MIT
//! npm converter toolchain: root discovery and subprocess invocation.
//!
//! Each converter reads a JSON spec on stdin and writes the converted
//! result to stdout. The npm root is resolved once per [`NpmTools`]
//! instance and cached for its lifetime; it is never invalidated, so a
//! changed installation requires a new instance.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tokio::time::timeout;
use tracing::debug;

use crate::config::NodeConfig;
use crate::error::{Result, SaverError};

/// Converter binaries and the npm packages that ship them.
pub(crate) const CONVERTERS: &[(&str, &str)] = &[
    ("vega-lite", "vl2vg"),
    ("vega-cli", "vg2png"),
    ("vega-cli", "vg2svg"),
    ("vega-cli", "vg2pdf"),
];

/// Handle on the installed npm converter toolchain.
pub struct NpmTools {
    config: NodeConfig,
    root: OnceCell<PathBuf>,
}

impl NpmTools {
    pub fn new(config: NodeConfig) -> Self {
        Self {
            config,
            root: OnceCell::new(),
        }
    }

    /// The npm installation root, resolved once and cached.
    pub async fn npm_root(&self) -> Result<&Path> {
        self.root
            .get_or_try_init(|| self.resolve_root())
            .await
            .map(PathBuf::as_path)
    }

    async fn resolve_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.config.npm_root {
            if !root.is_dir() {
                return Err(SaverError::NpmRootNotFound(root.clone()));
            }
            return Ok(root.clone());
        }

        let mut cmd = Command::new(&self.config.npm_program);
        cmd.arg("root");
        if self.config.global {
            cmd.arg("--global");
        }
        let out = run_with_deadline(cmd, "npm root", self.config.timeout_secs).await?;

        let root = PathBuf::from(String::from_utf8_lossy(&out).trim());
        if !root.is_dir() {
            return Err(SaverError::NpmRootNotFound(root));
        }
        debug!(root = %root.display(), "npm root resolved");
        Ok(root)
    }

    /// Absolute path of `tool`; a missing binary is a configuration error
    /// carrying an install hint for the configured npm scope.
    async fn tool_path(&self, package: &str, tool: &'static str) -> Result<PathBuf> {
        let path = self.npm_root().await?.join(package).join("bin").join(tool);
        if !path.exists() {
            return Err(SaverError::MissingTool {
                tool,
                path,
                hint: self.config.install_hint(),
            });
        }
        Ok(path)
    }

    /// Pipe the spec JSON to `tool`'s stdin and collect its stdout.
    async fn convert(&self, package: &str, tool: &'static str, spec: &Value) -> Result<Vec<u8>> {
        let path = self.tool_path(package, tool).await?;
        let input = serde_json::to_vec(spec)?;

        debug!(tool, bytes = input.len(), "invoking npm converter");
        let mut cmd = Command::new(&path);
        cmd.stdin(Stdio::piped());
        run_with_input(cmd, tool, &input, self.config.timeout_secs).await
    }

    /// vega-lite spec → compiled vega spec.
    pub async fn vl2vg(&self, spec: &Value) -> Result<Value> {
        let out = self.convert("vega-lite", "vl2vg", spec).await?;
        Ok(serde_json::from_slice(&out)?)
    }

    /// vega spec → PNG bytes.
    pub async fn vg2png(&self, spec: &Value) -> Result<Vec<u8>> {
        self.convert("vega-cli", "vg2png", spec).await
    }

    /// vega spec → PDF bytes.
    pub async fn vg2pdf(&self, spec: &Value) -> Result<Vec<u8>> {
        self.convert("vega-cli", "vg2pdf", spec).await
    }

    /// vega spec → SVG markup.
    pub async fn vg2svg(&self, spec: &Value) -> Result<String> {
        let out = self.convert("vega-cli", "vg2svg", spec).await?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// vega-lite spec → PNG bytes, chained through `vl2vg`.
    pub async fn vl2png(&self, spec: &Value) -> Result<Vec<u8>> {
        let vg = self.vl2vg(spec).await?;
        self.vg2png(&vg).await
    }

    /// vega-lite spec → PDF bytes, chained through `vl2vg`.
    pub async fn vl2pdf(&self, spec: &Value) -> Result<Vec<u8>> {
        let vg = self.vl2vg(spec).await?;
        self.vg2pdf(&vg).await
    }

    /// vega-lite spec → SVG markup, chained through `vl2vg`.
    pub async fn vl2svg(&self, spec: &Value) -> Result<String> {
        let vg = self.vl2vg(spec).await?;
        self.vg2svg(&vg).await
    }
}

/// Run `cmd` with nothing on stdin and return its stdout.
async fn run_with_deadline(mut cmd: Command, tool: &str, deadline_secs: u64) -> Result<Vec<u8>> {
    cmd.stdin(Stdio::null());
    run_with_input(cmd, tool, &[], deadline_secs).await
}

/// Spawn `cmd`, write `input` to its stdin, and wait under a deadline.
/// Non-zero exit propagates as a failure carrying the tool's stderr; on
/// timeout the child is killed (via kill-on-drop) and a timeout error
/// returned.
async fn run_with_input(
    mut cmd: Command,
    tool: &str,
    input: &[u8],
    deadline_secs: u64,
) -> Result<Vec<u8>> {
    let mut child = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input).await?;
        // Dropping the handle closes the pipe so the tool sees EOF.
    }

    let deadline = Duration::from_secs(deadline_secs);
    let out = match timeout(deadline, child.wait_with_output()).await {
        Ok(result) => result?,
        Err(_elapsed) => {
            return Err(SaverError::Timeout {
                tool: tool.to_string(),
                secs: deadline_secs,
            });
        }
    };

    if !out.status.success() {
        return Err(SaverError::ToolFailed {
            tool: tool.to_string(),
            status: out.status.to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
        });
    }
    Ok(out.stdout)
}

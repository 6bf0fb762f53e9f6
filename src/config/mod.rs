// SPDX-License-Identifier: MIT
//! Backend configuration, loadable from a TOML file and overridable by
//! CLI flags. All fields default so an empty file (or no file) works.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::saver::{VEGAEMBED_VERSION, VEGALITE_VERSION, VEGA_VERSION};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ─── NodeConfig ───────────────────────────────────────────────────────────────

/// Node backend configuration (`[node]` in vegasave.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Query the global npm prefix (`npm root --global`). Default: true.
    pub global: bool,

    /// Skip discovery and use this npm root directly.
    /// None = run `npm root` once and cache the result.
    pub npm_root: Option<PathBuf>,

    /// npm executable used for root discovery. Default: `npm` (from PATH).
    pub npm_program: PathBuf,

    /// Per-invocation deadline for converter subprocesses, in seconds.
    /// The child is killed on expiry. Default: 30.
    pub timeout_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            global: true,
            npm_root: None,
            npm_program: PathBuf::from("npm"),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl NodeConfig {
    /// Actionable install hint matching the configured npm scope.
    pub fn install_hint(&self) -> String {
        if self.global {
            "Install with npm install -g vega-lite vega-cli".to_string()
        } else {
            "Install with npm install vega-lite vega-cli".to_string()
        }
    }
}

// ─── BrowserConfig ────────────────────────────────────────────────────────────

/// Browser backend configuration (`[browser]` in vegasave.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Explicit browser binary. None = probe PATH for a Chromium build.
    pub browser_path: Option<PathBuf>,

    /// Seconds the browser may take to load the CDN stack and render.
    /// The process is killed on expiry. Default: 30.
    pub timeout_secs: u64,

    /// Pinned jsDelivr version of the `vega` package.
    pub vega_version: String,

    /// Pinned jsDelivr version of the `vega-lite` package.
    pub vegalite_version: String,

    /// Pinned jsDelivr version of the `vega-embed` package.
    pub vegaembed_version: String,

    /// Raster scale factor, merged into embed options as `scaleFactor`
    /// when it differs from 1. Default: 1.
    pub scale_factor: f64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            browser_path: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            vega_version: VEGA_VERSION.to_string(),
            vegalite_version: VEGALITE_VERSION.to_string(),
            vegaembed_version: VEGAEMBED_VERSION.to_string(),
            scale_factor: 1.0,
        }
    }
}

// ─── Config ───────────────────────────────────────────────────────────────────

/// Top-level configuration for both backends.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub node: NodeConfig,
    pub browser: BrowserConfig,
}

impl Config {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }
}

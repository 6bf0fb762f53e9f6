// SPDX-License-Identifier: MIT
//! Error taxonomy shared by both saver backends.
//!
//! Discovery and invalid-request errors are raised before any external
//! process is spawned; tool and script failures carry whatever diagnostic
//! the external side emitted. There are no retries anywhere — a conversion
//! either fully succeeds or fully fails.

use std::path::PathBuf;

use thiserror::Error;

use crate::saver::{FileFormat, Mode};

pub type Result<T> = std::result::Result<T, SaverError>;

#[derive(Debug, Error)]
pub enum SaverError {
    /// `npm root` reported a directory that does not exist on disk.
    #[error("npm root not found; got {0}")]
    NpmRootNotFound(PathBuf),

    /// A converter binary is not installed under the npm root.
    #[error("cannot find {tool}: tried {}\n{hint}", .path.display())]
    MissingTool {
        tool: &'static str,
        path: PathBuf,
        hint: String,
    },

    /// No headless-capable browser binary on PATH.
    #[error(
        "no headless browser found on PATH; install Chromium or Chrome \
         (tried: chromium, chrome, google-chrome, chromium-browser)"
    )]
    NoBrowser,

    /// The requested mode/format pair is not supported by this backend.
    #[error("mode '{mode}' is not compatible with format '{format}'")]
    Incompatible { mode: Mode, format: FileFormat },

    /// Unrecognized format wire string.
    #[error("unrecognized format: {0}")]
    UnknownFormat(String),

    /// Unrecognized mode wire string.
    #[error("unrecognized mode: {0}")]
    UnknownMode(String),

    /// An external tool exited with a non-zero status.
    #[error("{tool} failed ({status}): {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    /// An external process exceeded its deadline and was killed.
    #[error("{tool} did not complete within {secs}s")]
    Timeout { tool: String, secs: u64 },

    /// The in-page script reported an error across the evaluation bridge.
    /// The message is the page-reported string, preserved verbatim.
    #[error("script execution failed: {0}")]
    Script(String),

    /// The browser exited without emitting a result payload.
    #[error("browser produced no result payload")]
    NoResult,

    /// The page returned a payload the host side cannot decode
    /// (e.g. a malformed PNG data URL).
    #[error("malformed result payload: {0}")]
    BadPayload(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

// SPDX-License-Identifier: MIT
//! The shared saver contract: chart spec in, tagged mimebundle out.
//!
//! Both backends implement [`Saver`], which converts an opaque JSON chart
//! spec into a single-entry mapping from a versioned MIME-type string to
//! content (bytes, text, or JSON). The spec itself is never inspected or
//! validated here — it is passed through to the external toolchain as-is.
//!
//! # Architecture
//!
//! - [`crate::node::NodeSaver`] pipes specs through npm-installed converter
//!   binaries (`vl2vg`, `vg2png`, `vg2svg`, `vg2pdf`).
//! - [`crate::browser::BrowserSaver`] renders with the real JS stack
//!   (vega, vega-lite, vega-embed) inside headless Chromium.
//!
//! The two backends declare different compatibility matrices; the
//! difference reflects real capability differences and is intentional.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SaverError};

/// Default pinned `vega` version (jsDelivr package / MIME major).
pub const VEGA_VERSION: &str = "5.25.0";
/// Default pinned `vega-lite` version.
pub const VEGALITE_VERSION: &str = "5.17.0";
/// Default pinned `vega-embed` version.
pub const VEGAEMBED_VERSION: &str = "6.24.0";

/// Which grammar the input spec is written in.
///
/// Vega-Lite compiles down to Vega; the reverse direction does not exist,
/// which is why `vega` mode can never target the `vega-lite` format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    #[serde(rename = "vega")]
    Vega,
    #[serde(rename = "vega-lite")]
    VegaLite,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vega => "vega",
            Self::VegaLite => "vega-lite",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = SaverError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "vega" => Ok(Self::Vega),
            "vega-lite" => Ok(Self::VegaLite),
            other => Err(SaverError::UnknownMode(other.to_string())),
        }
    }
}

/// The requested output representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileFormat {
    #[serde(rename = "png")]
    Png,
    #[serde(rename = "svg")]
    Svg,
    #[serde(rename = "pdf")]
    Pdf,
    #[serde(rename = "vega")]
    Vega,
    #[serde(rename = "vega-lite")]
    VegaLite,
}

impl FileFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
            Self::Pdf => "pdf",
            Self::Vega => "vega",
            Self::VegaLite => "vega-lite",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileFormat {
    type Err = SaverError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "png" => Ok(Self::Png),
            "svg" => Ok(Self::Svg),
            "pdf" => Ok(Self::Pdf),
            "vega" => Ok(Self::Vega),
            "vega-lite" => Ok(Self::VegaLite),
            other => Err(SaverError::UnknownFormat(other.to_string())),
        }
    }
}

/// Content of a single mimebundle entry.
#[derive(Debug, Clone, PartialEq)]
pub enum MimeContent {
    /// Pass-through or compiled spec (`application/vnd.vega*.v{n}+json`).
    Json(Value),
    /// SVG markup (`image/svg+xml`).
    Text(String),
    /// Raw PNG or PDF bytes.
    Binary(Vec<u8>),
}

impl MimeContent {
    /// Raw bytes suitable for writing to a file or stdout.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Self::Json(value) => Ok(serde_json::to_vec_pretty(value)?),
            Self::Text(text) => Ok(text.clone().into_bytes()),
            Self::Binary(bytes) => Ok(bytes.clone()),
        }
    }
}

/// A mapping from a MIME-type string to the content it represents.
/// Every successful conversion yields exactly one entry.
pub type Mimebundle = HashMap<String, MimeContent>;

/// Versioned MIME-type string for `fmt`.
///
/// The vega and vega-lite JSON types carry the major component of the
/// pinned library version, e.g. `application/vnd.vegalite.v5+json`.
pub fn mime_type(fmt: FileFormat, vega_version: &str, vegalite_version: &str) -> String {
    match fmt {
        FileFormat::Png => "image/png".to_string(),
        FileFormat::Svg => "image/svg+xml".to_string(),
        FileFormat::Pdf => "application/pdf".to_string(),
        FileFormat::Vega => format!("application/vnd.vega.v{}+json", major(vega_version)),
        FileFormat::VegaLite => {
            format!("application/vnd.vegalite.v{}+json", major(vegalite_version))
        }
    }
}

fn major(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

/// Trait for spec-to-output converters.
///
/// A saver is constructed with `(spec, mode, backend-specific config)` and
/// holds them for its lifetime; each `mimebundle` call is one full
/// conversion. Instances are not designed for overlapping concurrent calls
/// on the same saver.
pub trait Saver {
    /// Formats this backend can produce for its configured mode.
    fn supported_formats(&self) -> &'static [FileFormat];

    /// Convert the spec and return a `{mime type: content}` map with
    /// exactly one entry.
    ///
    /// Blocking: backends with asynchronous internals resolve them before
    /// returning, so the node and browser backends stay interchangeable
    /// behind the same synchronous surface.
    fn mimebundle(&self, fmt: FileFormat) -> Result<Mimebundle>;
}

/// Reject an illegal mode/format pair before anything external is spawned.
pub(crate) fn check_format(mode: Mode, fmt: FileFormat, supported: &[FileFormat]) -> Result<()> {
    if supported.contains(&fmt) {
        Ok(())
    } else {
        Err(SaverError::Incompatible { mode, format: fmt })
    }
}

/// Build the single-entry bundle.
pub(crate) fn single(mime: String, content: MimeContent) -> Mimebundle {
    let mut bundle = Mimebundle::with_capacity(1);
    bundle.insert(mime, content);
    bundle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_types_carry_pinned_majors() {
        assert_eq!(
            mime_type(FileFormat::Vega, VEGA_VERSION, VEGALITE_VERSION),
            "application/vnd.vega.v5+json"
        );
        assert_eq!(
            mime_type(FileFormat::VegaLite, VEGA_VERSION, VEGALITE_VERSION),
            "application/vnd.vegalite.v5+json"
        );
        assert_eq!(mime_type(FileFormat::Png, "5.25.0", "5.17.0"), "image/png");
        assert_eq!(
            mime_type(FileFormat::Svg, "5.25.0", "5.17.0"),
            "image/svg+xml"
        );
        assert_eq!(
            mime_type(FileFormat::Pdf, "5.25.0", "5.17.0"),
            "application/pdf"
        );
    }

    #[test]
    fn mime_major_tracks_version_string() {
        assert_eq!(
            mime_type(FileFormat::Vega, "6.0.0", "5.17.0"),
            "application/vnd.vega.v6+json"
        );
    }

    #[test]
    fn format_wire_strings_round_trip() {
        for fmt in [
            FileFormat::Png,
            FileFormat::Svg,
            FileFormat::Pdf,
            FileFormat::Vega,
            FileFormat::VegaLite,
        ] {
            assert_eq!(fmt.as_str().parse::<FileFormat>().unwrap(), fmt);
        }
    }

    #[test]
    fn unknown_format_is_an_invalid_request() {
        let err = "jpeg".parse::<FileFormat>().unwrap_err();
        assert!(matches!(err, SaverError::UnknownFormat(s) if s == "jpeg"));
    }

    #[test]
    fn unknown_mode_is_an_invalid_request() {
        let err = "altair".parse::<Mode>().unwrap_err();
        assert!(matches!(err, SaverError::UnknownMode(s) if s == "altair"));
    }

    #[test]
    fn check_format_rejects_pairs_outside_the_table() {
        let err = check_format(
            Mode::Vega,
            FileFormat::VegaLite,
            &[FileFormat::Png, FileFormat::Svg],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SaverError::Incompatible {
                mode: Mode::Vega,
                format: FileFormat::VegaLite
            }
        ));
    }

    #[test]
    fn json_content_serializes_to_bytes() {
        let content = MimeContent::Json(serde_json::json!({"mark": "bar"}));
        let bytes = content.to_bytes().unwrap();
        assert!(String::from_utf8(bytes).unwrap().contains("\"mark\""));
    }
}

// SPDX-License-Identifier: MIT
//! Node backend: conversions through npm-installed converter binaries.
//!
//! The only backend that can produce PDF output or pass a vega-lite spec
//! through unchanged. Vega-lite specs headed anywhere else are compiled
//! to vega with `vl2vg` first, then handed to the matching `vg2*` tool.

pub mod runner;

pub use runner::NpmTools;

use serde_json::Value;
use tracing::debug;

use crate::config::NodeConfig;
use crate::error::{Result, SaverError};
use crate::saver::{
    check_format, mime_type, single, FileFormat, MimeContent, Mimebundle, Mode, Saver,
    VEGALITE_VERSION, VEGA_VERSION,
};

const VEGA_FORMATS: &[FileFormat] = &[
    FileFormat::Png,
    FileFormat::Svg,
    FileFormat::Pdf,
    FileFormat::Vega,
];

const VEGALITE_FORMATS: &[FileFormat] = &[
    FileFormat::Png,
    FileFormat::Svg,
    FileFormat::Pdf,
    FileFormat::Vega,
    FileFormat::VegaLite,
];

/// Saver backed by the npm `vega-lite` / `vega-cli` toolchain.
pub struct NodeSaver {
    spec: Value,
    mode: Mode,
    tools: NpmTools,
    runtime: tokio::runtime::Runtime,
}

impl NodeSaver {
    /// Create a saver for `spec`. No discovery happens here; the npm root
    /// is resolved lazily on first conversion and cached per instance.
    pub fn new(spec: Value, mode: Mode, config: NodeConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            spec,
            mode,
            tools: NpmTools::new(config),
            runtime,
        })
    }

    async fn bundle(&self, fmt: FileFormat) -> Result<Mimebundle> {
        // vega-lite passthrough needs no tooling at all.
        if self.mode == Mode::VegaLite && fmt == FileFormat::VegaLite {
            return Ok(single(
                mime_type(fmt, VEGA_VERSION, VEGALITE_VERSION),
                MimeContent::Json(self.spec.clone()),
            ));
        }

        let spec = match self.mode {
            Mode::VegaLite => self.tools.vl2vg(&self.spec).await?,
            Mode::Vega => self.spec.clone(),
        };

        let content = match fmt {
            FileFormat::Vega => MimeContent::Json(spec),
            FileFormat::Png => MimeContent::Binary(self.tools.vg2png(&spec).await?),
            FileFormat::Svg => MimeContent::Text(self.tools.vg2svg(&spec).await?),
            FileFormat::Pdf => MimeContent::Binary(self.tools.vg2pdf(&spec).await?),
            FileFormat::VegaLite => {
                return Err(SaverError::Incompatible {
                    mode: self.mode,
                    format: fmt,
                })
            }
        };
        debug!(mode = %self.mode, format = %fmt, "node conversion complete");
        Ok(single(mime_type(fmt, VEGA_VERSION, VEGALITE_VERSION), content))
    }
}

impl Saver for NodeSaver {
    fn supported_formats(&self) -> &'static [FileFormat] {
        match self.mode {
            Mode::Vega => VEGA_FORMATS,
            Mode::VegaLite => VEGALITE_FORMATS,
        }
    }

    fn mimebundle(&self, fmt: FileFormat) -> Result<Mimebundle> {
        check_format(self.mode, fmt, self.supported_formats())?;
        self.runtime.block_on(self.bundle(fmt))
    }
}

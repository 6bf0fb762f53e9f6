// SPDX-License-Identifier: MIT
//! Browser backend: render with the real JS stack in headless Chromium.
//!
//! The page loads version-pinned vega, vega-lite, and vega-embed from
//! jsDelivr, so this backend needs network access but no npm install.
//! PNG results cross the bridge as `data:image/png;base64,...` URLs and
//! are decoded to raw bytes here; SVG and compiled vega specs pass
//! through unchanged.

mod page;
pub mod runner;

pub use runner::detect_browser;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::BrowserConfig;
use crate::error::{Result, SaverError};
use crate::saver::{
    check_format, mime_type, single, FileFormat, MimeContent, Mimebundle, Mode, Saver,
};

const VEGA_FORMATS: &[FileFormat] = &[FileFormat::Png, FileFormat::Svg];

const VEGALITE_FORMATS: &[FileFormat] = &[FileFormat::Png, FileFormat::Svg, FileFormat::Vega];

/// Saver backed by a headless Chromium instance.
pub struct BrowserSaver {
    spec: Value,
    mode: Mode,
    embed_options: Map<String, Value>,
    config: BrowserConfig,
    runtime: tokio::runtime::Runtime,
}

impl BrowserSaver {
    /// Create a saver for `spec`. `embed_options` is arbitrary
    /// pass-through configuration for vega-embed; a non-unit scale factor
    /// from the config is merged in as `scaleFactor` unless already set.
    pub fn new(
        spec: Value,
        mode: Mode,
        embed_options: Option<Map<String, Value>>,
        config: BrowserConfig,
    ) -> Result<Self> {
        let mut embed_options = embed_options.unwrap_or_default();
        if (config.scale_factor - 1.0).abs() > f64::EPSILON {
            embed_options
                .entry("scaleFactor".to_string())
                .or_insert_with(|| {
                    Value::from(config.scale_factor)
                });
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            spec,
            mode,
            embed_options,
            config,
            runtime,
        })
    }

    /// Run the in-page conversion and return the raw payload result.
    async fn extract(&self, fmt: FileFormat) -> Result<Value> {
        let mut opt = self.embed_options.clone();
        opt.insert(
            "mode".to_string(),
            Value::String(self.mode.as_str().to_string()),
        );
        let html = page::build_page(&self.spec, &Value::Object(opt), fmt, &self.config)?;
        let dom = runner::dump_dom(&html, &self.config).await?;
        page::extract_payload(&dom)
    }

    /// Post-process the payload by format: PNG data URLs are split at the
    /// comma and base64-decoded; SVG and vega pass through.
    fn serialize(&self, fmt: FileFormat, out: Value) -> Result<MimeContent> {
        match fmt {
            FileFormat::Png => {
                let url = out
                    .as_str()
                    .ok_or_else(|| SaverError::BadPayload("expected a data-URL string".into()))?;
                let b64 = url
                    .split_once(',')
                    .map(|(_, data)| data)
                    .ok_or_else(|| SaverError::BadPayload("data URL has no comma".into()))?;
                let bytes = BASE64
                    .decode(b64)
                    .map_err(|e| SaverError::BadPayload(format!("invalid base64: {e}")))?;
                Ok(MimeContent::Binary(bytes))
            }
            FileFormat::Svg => {
                let svg = out
                    .as_str()
                    .ok_or_else(|| SaverError::BadPayload("expected SVG text".into()))?;
                Ok(MimeContent::Text(svg.to_string()))
            }
            FileFormat::Vega => Ok(MimeContent::Json(out)),
            other => Err(SaverError::Incompatible {
                mode: self.mode,
                format: other,
            }),
        }
    }
}

impl Saver for BrowserSaver {
    fn supported_formats(&self) -> &'static [FileFormat] {
        match self.mode {
            Mode::Vega => VEGA_FORMATS,
            Mode::VegaLite => VEGALITE_FORMATS,
        }
    }

    fn mimebundle(&self, fmt: FileFormat) -> Result<Mimebundle> {
        check_format(self.mode, fmt, self.supported_formats())?;
        let out = self.runtime.block_on(self.extract(fmt))?;
        let content = self.serialize(fmt, out)?;
        debug!(mode = %self.mode, format = %fmt, "browser conversion complete");
        Ok(single(
            mime_type(fmt, &self.config.vega_version, &self.config.vegalite_version),
            content,
        ))
    }
}

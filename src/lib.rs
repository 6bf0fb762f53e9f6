// SPDX-License-Identifier: MIT
//! vegasave — render Vega and Vega-Lite chart specs to PNG, SVG, PDF, or
//! a compiled Vega spec by delegating to external toolchains.
//!
//! Two backends implement the shared [`Saver`] contract:
//!
//! - [`NodeSaver`] pipes specs through npm-installed converter binaries
//!   (`vl2vg`, `vg2png`, `vg2svg`, `vg2pdf`).
//! - [`BrowserSaver`] renders with the real JS stack (vega, vega-lite,
//!   vega-embed from jsDelivr) inside headless Chromium.
//!
//! Both produce a *mimebundle*: a single-entry mapping from a versioned
//! MIME-type string to the converted content.
//!
//! ```no_run
//! use serde_json::json;
//! use vegasave::config::NodeConfig;
//! use vegasave::{FileFormat, Mode, NodeSaver, Saver};
//!
//! # fn main() -> vegasave::Result<()> {
//! let spec = json!({"mark": "bar", "encoding": {"x": {"field": "a"}}});
//! let saver = NodeSaver::new(spec, Mode::VegaLite, NodeConfig::default())?;
//! let bundle = saver.mimebundle(FileFormat::Png)?;
//! assert!(bundle.contains_key("image/png"));
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod config;
pub mod doctor;
pub mod error;
pub mod node;
pub mod saver;

pub use browser::BrowserSaver;
pub use error::{Result, SaverError};
pub use node::NodeSaver;
pub use saver::{FileFormat, MimeContent, Mimebundle, Mode, Saver};

// SPDX-License-Identifier: MIT
//! Static page assembly and the in-page conversion script.
//!
//! The page embeds the spec, the merged embed options, and the target
//! format as JSON literals, loads the pinned CDN stack, and runs a script
//! that either compiles the spec (`vega` format) or renders it with
//! vega-embed and exports PNG/SVG from the view. The outcome —
//! `{"result": ...}` or `{"error": "..."}` — is written as the text
//! content of an `<output>` element, which the runner reads back out of
//! the dumped DOM.

use serde::Deserialize;
use serde_json::Value;

use crate::config::BrowserConfig;
use crate::error::{Result, SaverError};
use crate::saver::FileFormat;

/// Element id the in-page script writes the payload into.
pub(crate) const RESULT_ID: &str = "vegasave-result";

const PAGE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>vegasave</title>
</head>
<body>
  <div id="vis"></div>
__SCRIPT_TAGS__
  <script>
  (function () {
    "use strict";
    var spec = __SPEC__;
    var embedOpt = __EMBED_OPT__;
    var format = __FORMAT__;

    function emit(payload) {
      var el = document.createElement("output");
      el.id = "__RESULT_ID__";
      el.textContent = JSON.stringify(payload);
      document.body.appendChild(el);
    }

    function fail(err) {
      emit({ error: String(err) });
    }

    window.addEventListener("error", function (ev) {
      fail(ev.message || "script error");
    });

    try {
      if (format === "vega") {
        if (embedOpt.mode === "vega-lite") {
          var compiler = typeof vegaLite === "undefined" ? vl : vegaLite;
          try {
            spec = compiler.compile(spec).spec;
          } catch (err) {
            return fail(err);
          }
        }
        return emit({ result: spec });
      }

      vegaEmbed("#vis", spec, embedOpt)
        .then(function (res) {
          if (format === "png") {
            return res.view.toCanvas(embedOpt.scaleFactor || 1).then(function (canvas) {
              emit({ result: canvas.toDataURL("image/png") });
            });
          }
          if (format === "svg") {
            return res.view.toSVG(embedOpt.scaleFactor || 1).then(function (svg) {
              emit({ result: svg });
            });
          }
          return fail("unrecognized format: " + format);
        })
        .catch(fail);
    } catch (err) {
      fail(err);
    }
  })();
  </script>
</body>
</html>
"##;

fn cdn_url(package: &str, version: &str) -> String {
    format!("https://cdn.jsdelivr.net/npm/{package}@{version}")
}

/// A literal `</` inside a `<script>` block would terminate it early;
/// JSON string escapes make `<\/` equivalent.
fn script_json(value: &Value) -> Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

/// Assemble the HTML page for one conversion.
pub(crate) fn build_page(
    spec: &Value,
    embed_opt: &Value,
    fmt: FileFormat,
    config: &BrowserConfig,
) -> Result<String> {
    let tags = [
        ("vega", config.vega_version.as_str()),
        ("vega-lite", config.vegalite_version.as_str()),
        ("vega-embed", config.vegaembed_version.as_str()),
    ]
    .iter()
    .map(|(package, version)| format!("  <script src=\"{}\"></script>", cdn_url(package, version)))
    .collect::<Vec<_>>()
    .join("\n");

    Ok(PAGE_TEMPLATE
        .replace("__SCRIPT_TAGS__", &tags)
        .replace("__SPEC__", &script_json(spec)?)
        .replace("__EMBED_OPT__", &script_json(embed_opt)?)
        .replace("__FORMAT__", &format!("\"{}\"", fmt.as_str()))
        .replace("__RESULT_ID__", RESULT_ID))
}

#[derive(Debug, Deserialize)]
struct ScriptPayload {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Pull the script payload back out of a dumped DOM.
///
/// A non-empty `error` field raises [`SaverError::Script`] with the
/// page-reported message preserved verbatim; a DOM with no payload
/// element (script never ran, budget expired) is [`SaverError::NoResult`].
pub(crate) fn extract_payload(dom: &str) -> Result<Value> {
    let open = format!("<output id=\"{RESULT_ID}\">");
    let start = dom.find(&open).ok_or(SaverError::NoResult)? + open.len();
    let end = dom[start..].find("</output>").ok_or(SaverError::NoResult)? + start;

    let payload: ScriptPayload = serde_json::from_str(&unescape_html(&dom[start..end]))?;
    if let Some(error) = payload.error {
        if !error.is_empty() {
            return Err(SaverError::Script(error));
        }
    }
    payload.result.ok_or(SaverError::NoResult)
}

/// Inverse of the DOM serializer's text-node escaping. `&amp;` must be
/// handled last so doubly-escaped sequences survive one level.
fn unescape_html(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> BrowserConfig {
        BrowserConfig::default()
    }

    #[test]
    fn page_pins_all_three_cdn_scripts() {
        let page = build_page(&json!({"mark": "bar"}), &json!({}), FileFormat::Svg, &config())
            .unwrap();
        assert!(page.contains("https://cdn.jsdelivr.net/npm/vega@5.25.0"));
        assert!(page.contains("https://cdn.jsdelivr.net/npm/vega-lite@5.17.0"));
        assert!(page.contains("https://cdn.jsdelivr.net/npm/vega-embed@6.24.0"));
    }

    #[test]
    fn page_embeds_spec_and_format() {
        let page = build_page(
            &json!({"mark": "bar"}),
            &json!({"mode": "vega-lite"}),
            FileFormat::Png,
            &config(),
        )
        .unwrap();
        assert!(page.contains(r#"var spec = {"mark":"bar"};"#));
        assert!(page.contains(r#"var format = "png";"#));
        assert!(page.contains(r#"el.id = "vegasave-result";"#));
    }

    #[test]
    fn script_close_tags_in_spec_are_neutralized() {
        let page = build_page(
            &json!({"title": "</script><script>alert(1)"}),
            &json!({}),
            FileFormat::Svg,
            &config(),
        )
        .unwrap();
        assert!(!page.contains("</script><script>alert(1)"));
        assert!(page.contains(r#"<\/script>"#));
    }

    #[test]
    fn payload_result_is_returned() {
        let dom = r#"<html><body><output id="vegasave-result">{"result":{"width":100}}</output></body></html>"#;
        let value = extract_payload(dom).unwrap();
        assert_eq!(value, json!({"width": 100}));
    }

    #[test]
    fn escaped_svg_payload_round_trips() {
        let dom = r#"<output id="vegasave-result">{"result":"&lt;svg width=\"10\"&gt;&lt;/svg&gt;"}</output>"#;
        let value = extract_payload(dom).unwrap();
        assert_eq!(value.as_str().unwrap(), r#"<svg width="10"></svg>"#);
    }

    #[test]
    fn error_payload_raises_script_error_verbatim() {
        let dom = r#"<output id="vegasave-result">{"error":"Error: Invalid specification"}</output>"#;
        let err = extract_payload(dom).unwrap_err();
        assert!(matches!(
            err,
            SaverError::Script(msg) if msg == "Error: Invalid specification"
        ));
    }

    #[test]
    fn missing_payload_is_no_result() {
        let err = extract_payload("<html><body></body></html>").unwrap_err();
        assert!(matches!(err, SaverError::NoResult));
    }

    #[test]
    fn unescape_handles_double_escaping() {
        assert_eq!(unescape_html("&amp;lt;"), "&lt;");
        assert_eq!(unescape_html("a &amp; b &lt;c&gt;"), "a & b <c>");
    }
}

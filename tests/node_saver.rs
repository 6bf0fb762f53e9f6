// SPDX-License-Identifier: MIT
//! End-to-end node backend tests against stub converter binaries.
//!
//! A scratch npm root is scaffolded with shell-script stand-ins for
//! `vl2vg` / `vg2*`, so the full pipe-spec-through-stdin path runs
//! without a real npm installation. Unix-only: the stubs are shell
//! scripts.
#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use tempfile::TempDir;
use vegasave::config::NodeConfig;
use vegasave::node::NpmTools;
use vegasave::{FileFormat, MimeContent, Mode, NodeSaver, Saver, SaverError};

fn write_stub(dir: &Path, name: &str, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Stub toolchain: vl2vg renames the "mark" key (so its involvement is
/// observable), vg2png prefixes the PNG magic and echoes its input,
/// vg2svg/vg2pdf emit fixed markup.
fn scaffold_npm_root(root: &Path) {
    let vl_bin = root.join("vega-lite").join("bin");
    let vg_bin = root.join("vega-cli").join("bin");
    fs::create_dir_all(&vl_bin).unwrap();
    fs::create_dir_all(&vg_bin).unwrap();

    write_stub(
        &vl_bin,
        "vl2vg",
        "#!/bin/sh\nsed 's/\"mark\"/\"compiled_mark\"/g'\n",
    );
    write_stub(
        &vg_bin,
        "vg2png",
        "#!/bin/sh\nprintf '\\211PNG\\r\\n\\032\\n'\ncat\n",
    );
    write_stub(
        &vg_bin,
        "vg2svg",
        "#!/bin/sh\ncat >/dev/null\nprintf '<svg xmlns=\"http://www.w3.org/2000/svg\"></svg>'\n",
    );
    write_stub(
        &vg_bin,
        "vg2pdf",
        "#!/bin/sh\ncat >/dev/null\nprintf '%%PDF-1.4'\n",
    );
}

fn stub_config(root: &Path) -> NodeConfig {
    NodeConfig {
        npm_root: Some(root.to_path_buf()),
        ..Default::default()
    }
}

fn bar_spec() -> serde_json::Value {
    json!({
        "mark": "bar",
        "encoding": {
            "x": {"field": "a", "type": "ordinal"},
            "y": {"field": "b", "type": "quantitative"}
        }
    })
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

#[test]
fn vega_lite_to_png_yields_png_magic() {
    let tmp = TempDir::new().unwrap();
    scaffold_npm_root(tmp.path());

    let saver = NodeSaver::new(bar_spec(), Mode::VegaLite, stub_config(tmp.path())).unwrap();
    let bundle = saver.mimebundle(FileFormat::Png).unwrap();

    assert_eq!(bundle.len(), 1);
    match bundle.get("image/png").unwrap() {
        MimeContent::Binary(bytes) => {
            assert!(!bytes.is_empty());
            assert_eq!(&bytes[..4], &[0x89, 0x50, 0x4E, 0x47]);
        }
        other => panic!("expected binary PNG content, got {other:?}"),
    }
}

#[test]
fn vega_lite_to_svg_yields_markup() {
    let tmp = TempDir::new().unwrap();
    scaffold_npm_root(tmp.path());

    let saver = NodeSaver::new(bar_spec(), Mode::VegaLite, stub_config(tmp.path())).unwrap();
    let bundle = saver.mimebundle(FileFormat::Svg).unwrap();

    match bundle.get("image/svg+xml").unwrap() {
        MimeContent::Text(svg) => assert!(svg.starts_with("<svg")),
        other => panic!("expected SVG text content, got {other:?}"),
    }
}

#[test]
fn vega_lite_to_pdf_yields_pdf_header() {
    let tmp = TempDir::new().unwrap();
    scaffold_npm_root(tmp.path());

    let saver = NodeSaver::new(bar_spec(), Mode::VegaLite, stub_config(tmp.path())).unwrap();
    let bundle = saver.mimebundle(FileFormat::Pdf).unwrap();

    match bundle.get("application/pdf").unwrap() {
        MimeContent::Binary(bytes) => assert!(bytes.starts_with(b"%PDF")),
        other => panic!("expected binary PDF content, got {other:?}"),
    }
}

#[test]
fn vega_output_goes_through_the_compiler() {
    let tmp = TempDir::new().unwrap();
    scaffold_npm_root(tmp.path());

    let saver = NodeSaver::new(bar_spec(), Mode::VegaLite, stub_config(tmp.path())).unwrap();
    let bundle = saver.mimebundle(FileFormat::Vega).unwrap();

    match bundle.get("application/vnd.vega.v5+json").unwrap() {
        MimeContent::Json(spec) => {
            // The stub compiler renames the key; seeing the new name
            // proves vl2vg actually ran.
            assert!(spec.get("compiled_mark").is_some());
            assert!(spec.get("mark").is_none());
        }
        other => panic!("expected JSON content, got {other:?}"),
    }
}

#[test]
fn chained_and_direct_png_paths_agree() {
    let tmp = TempDir::new().unwrap();
    scaffold_npm_root(tmp.path());

    let tools = NpmTools::new(stub_config(tmp.path()));
    let spec = bar_spec();

    let rt = runtime();
    let two_step = rt.block_on(async {
        let vg = tools.vl2vg(&spec).await?;
        tools.vg2png(&vg).await
    });
    let direct = rt.block_on(tools.vl2png(&spec));

    assert_eq!(two_step.unwrap(), direct.unwrap());
}

#[test]
fn vega_mode_skips_the_compiler() {
    let tmp = TempDir::new().unwrap();
    scaffold_npm_root(tmp.path());

    let spec = json!({"marks": [], "signals": []});
    let saver = NodeSaver::new(spec.clone(), Mode::Vega, stub_config(tmp.path())).unwrap();
    let bundle = saver.mimebundle(FileFormat::Vega).unwrap();

    assert_eq!(
        bundle.get("application/vnd.vega.v5+json"),
        Some(&MimeContent::Json(spec))
    );
}

#[test]
fn failing_tool_propagates_stderr() {
    let tmp = TempDir::new().unwrap();
    scaffold_npm_root(tmp.path());
    write_stub(
        &tmp.path().join("vega-cli").join("bin"),
        "vg2png",
        "#!/bin/sh\ncat >/dev/null\necho 'render failed: out of memory' >&2\nexit 1\n",
    );

    let saver = NodeSaver::new(bar_spec(), Mode::VegaLite, stub_config(tmp.path())).unwrap();
    let err = saver.mimebundle(FileFormat::Png).unwrap_err();

    match err {
        SaverError::ToolFailed { tool, stderr, .. } => {
            assert_eq!(tool, "vg2png");
            assert!(stderr.contains("render failed"));
        }
        other => panic!("expected ToolFailed, got {other:?}"),
    }
}

#[test]
fn missing_binary_names_path_and_hint() {
    let tmp = TempDir::new().unwrap();
    scaffold_npm_root(tmp.path());
    fs::remove_file(tmp.path().join("vega-cli").join("bin").join("vg2pdf")).unwrap();

    let saver = NodeSaver::new(bar_spec(), Mode::VegaLite, stub_config(tmp.path())).unwrap();
    let err = saver.mimebundle(FileFormat::Pdf).unwrap_err();

    match err {
        SaverError::MissingTool { tool, hint, .. } => {
            assert_eq!(tool, "vg2pdf");
            assert!(hint.contains("npm install"));
        }
        other => panic!("expected MissingTool, got {other:?}"),
    }
}

#[test]
fn hung_tool_is_killed_on_deadline() {
    let tmp = TempDir::new().unwrap();
    scaffold_npm_root(tmp.path());
    write_stub(
        &tmp.path().join("vega-cli").join("bin"),
        "vg2png",
        "#!/bin/sh\nsleep 30\n",
    );

    let config = NodeConfig {
        npm_root: Some(tmp.path().to_path_buf()),
        timeout_secs: 1,
        ..Default::default()
    };
    let saver = NodeSaver::new(bar_spec(), Mode::VegaLite, config).unwrap();
    let err = saver.mimebundle(FileFormat::Png).unwrap_err();

    assert!(matches!(err, SaverError::Timeout { secs: 1, .. }));
}

#[test]
fn discovery_uses_the_configured_npm_program() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("lib").join("node_modules");
    scaffold_npm_root(&root);
    let npm = write_stub(
        tmp.path(),
        "npm",
        &format!("#!/bin/sh\necho '{}'\n", root.display()),
    );

    let config = NodeConfig {
        npm_program: npm,
        global: false,
        ..Default::default()
    };
    let saver = NodeSaver::new(bar_spec(), Mode::VegaLite, config).unwrap();
    let bundle = saver.mimebundle(FileFormat::Svg).unwrap();
    assert!(bundle.contains_key("image/svg+xml"));
}

#[test]
fn discovery_rejects_a_root_that_does_not_exist() {
    let tmp = TempDir::new().unwrap();
    let npm = write_stub(tmp.path(), "npm", "#!/bin/sh\necho /nonexistent/npm/root\n");

    let config = NodeConfig {
        npm_program: npm,
        ..Default::default()
    };
    let saver = NodeSaver::new(bar_spec(), Mode::VegaLite, config).unwrap();
    let err = saver.mimebundle(FileFormat::Png).unwrap_err();

    assert!(matches!(err, SaverError::NpmRootNotFound(_)));
}

// SPDX-License-Identifier: MIT
//! Pre-flight environment checks for both backends.
//!
//! Self-contained and synchronous: run before any conversion to catch
//! toolchain problems early, with an actionable hint per failure.

use std::path::PathBuf;
use std::process::Command;

use serde::Serialize;

use crate::browser::detect_browser;
use crate::config::Config;
use crate::node::runner::CONVERTERS;

/// Outcome of a single diagnostic check.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

/// Run all diagnostic checks and return a list of results.
pub fn run_doctor(config: &Config) -> Vec<CheckResult> {
    let mut results = vec![check_npm_installed(config)];

    match resolve_npm_root(config) {
        Ok(root) => {
            results.push(CheckResult {
                name: "npm root".to_string(),
                passed: true,
                detail: root.display().to_string(),
            });
            for (package, tool) in CONVERTERS {
                results.push(check_converter(&root, package, tool, config));
            }
        }
        Err(detail) => results.push(CheckResult {
            name: "npm root".to_string(),
            passed: false,
            detail,
        }),
    }

    results.push(check_browser(config));
    results
}

/// `npm --version` probes both presence and executability.
fn check_npm_installed(config: &Config) -> CheckResult {
    match Command::new(&config.node.npm_program)
        .arg("--version")
        .output()
    {
        Ok(out) if out.status.success() => CheckResult {
            name: "npm installed".to_string(),
            passed: true,
            detail: format!("npm {}", String::from_utf8_lossy(&out.stdout).trim()),
        },
        _ => CheckResult {
            name: "npm installed".to_string(),
            passed: false,
            detail: "npm not found in PATH — install Node.js".to_string(),
        },
    }
}

fn resolve_npm_root(config: &Config) -> Result<PathBuf, String> {
    if let Some(root) = &config.node.npm_root {
        return if root.is_dir() {
            Ok(root.clone())
        } else {
            Err(format!("configured npm_root {} does not exist", root.display()))
        };
    }

    let mut cmd = Command::new(&config.node.npm_program);
    cmd.arg("root");
    if config.node.global {
        cmd.arg("--global");
    }
    let out = cmd
        .output()
        .map_err(|e| format!("failed to run npm root: {e}"))?;
    if !out.status.success() {
        return Err(format!("npm root exited with {}", out.status));
    }
    let root = PathBuf::from(String::from_utf8_lossy(&out.stdout).trim());
    if root.is_dir() {
        Ok(root)
    } else {
        Err(format!("npm root reported {} which does not exist", root.display()))
    }
}

fn check_converter(root: &std::path::Path, package: &str, tool: &str, config: &Config) -> CheckResult {
    let path = root.join(package).join("bin").join(tool);
    let passed = path.exists();
    CheckResult {
        name: format!("{tool} installed"),
        passed,
        detail: if passed {
            path.display().to_string()
        } else {
            format!("not found at {} — {}", path.display(), config.node.install_hint())
        },
    }
}

fn check_browser(config: &Config) -> CheckResult {
    let found = match &config.browser.browser_path {
        Some(path) if path.is_file() => Some(path.clone()),
        Some(_) | None => detect_browser(),
    };
    match found {
        Some(path) => CheckResult {
            name: "headless browser".to_string(),
            passed: true,
            detail: path.display().to_string(),
        },
        None => CheckResult {
            name: "headless browser".to_string(),
            passed: false,
            detail: "not found in PATH — install Chromium or Chrome".to_string(),
        },
    }
}

// ─── Output ───────────────────────────────────────────────────────────────────

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Print a formatted table of check results to stdout.
pub fn print_doctor_results(results: &[CheckResult]) {
    println!();
    println!("{BOLD}vegasave doctor — toolchain checks{RESET}");
    println!("{}", "─".repeat(60));

    for r in results {
        let (symbol, color) = if r.passed { ("✓", GREEN) } else { ("✗", RED) };
        println!("  {color}{symbol}{RESET}  {:<22}  {}", r.name, r.detail);
    }

    println!("{}", "─".repeat(60));

    let failed = results.iter().filter(|r| !r.passed).count();
    if failed == 0 {
        println!("{GREEN}All checks passed.{RESET}");
    } else {
        println!("{RED}{failed} check(s) failed. See above for details.{RESET}");
    }
    println!();
}

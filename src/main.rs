// SPDX-License-Identifier: MIT

use std::io::{Read as _, Write as _};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};

use vegasave::config::Config;
use vegasave::{doctor, BrowserSaver, FileFormat, Mode, NodeSaver, Saver};

#[derive(Parser)]
#[command(
    name = "vegasave",
    about = "Render Vega and Vega-Lite specs via npm converters or a headless browser",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log filter (trace, debug, info, warn, error)
    #[arg(long, env = "VEGASAVE_LOG", default_value = "warn", global = true)]
    log: String,

    /// TOML config file
    #[arg(long, env = "VEGASAVE_CONFIG", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a spec to the requested format.
    ///
    /// Reads a JSON spec from --input (or stdin) and writes the converted
    /// output to --output (or stdout).
    ///
    /// Examples:
    ///   vegasave convert -i chart.vl.json -o chart.png
    ///   cat chart.vl.json | vegasave convert -f svg -b browser
    Convert {
        /// Input spec file (defaults to stdin)
        #[arg(long, short = 'i')]
        input: Option<PathBuf>,

        /// Output file (defaults to stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Grammar of the input spec: vega or vega-lite
        #[arg(long, short = 'm', default_value = "vega-lite")]
        mode: String,

        /// Output format: png, svg, pdf, vega, vega-lite.
        /// Inferred from the output extension when omitted.
        #[arg(long, short = 'f')]
        format: Option<String>,

        /// Backend: node or browser
        #[arg(long, short = 'b', default_value = "node")]
        backend: String,
    },
    /// Check that the external toolchain is usable.
    ///
    /// Probes npm, the npm root, each converter binary, and the headless
    /// browser, and prints one line per check.
    Doctor,
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(args.log.as_str())
        .compact()
        .init();

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match args.command {
        Command::Convert {
            input,
            output,
            mode,
            format,
            backend,
        } => convert(&config, input, output, &mode, format.as_deref(), &backend),
        Command::Doctor => {
            let results = doctor::run_doctor(&config);
            doctor::print_doctor_results(&results);
            let failed = results.iter().filter(|r| !r.passed).count();
            std::process::exit(if failed == 0 { 0 } else { 1 });
        }
    }
}

fn convert(
    config: &Config,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    mode: &str,
    format: Option<&str>,
    backend: &str,
) -> Result<()> {
    let mode: Mode = mode.parse()?;
    let fmt: FileFormat = match format {
        Some(f) => f.parse()?,
        None => infer_format(output.as_deref())?,
    };

    let raw = match &input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading spec from {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading spec from stdin")?;
            buf
        }
    };
    let spec: serde_json::Value = serde_json::from_str(&raw).context("parsing spec JSON")?;

    let bundle = match backend {
        "node" => NodeSaver::new(spec, mode, config.node.clone())?.mimebundle(fmt)?,
        "browser" => {
            BrowserSaver::new(spec, mode, None, config.browser.clone())?.mimebundle(fmt)?
        }
        other => bail!("unknown backend '{other}' (expected 'node' or 'browser')"),
    };

    let (mime, content) = bundle
        .into_iter()
        .next()
        .context("conversion produced an empty mimebundle")?;
    tracing::info!(%mime, "conversion complete");

    let bytes = content.to_bytes()?;
    match &output {
        Some(path) => std::fs::write(path, bytes)
            .with_context(|| format!("writing output to {}", path.display()))?,
        None => std::io::stdout()
            .write_all(&bytes)
            .context("writing output to stdout")?,
    }
    Ok(())
}

/// Infer the format from the output file extension when `--format` is
/// omitted. JSON extensions are ambiguous (vega vs. vega-lite), so they
/// still require an explicit flag.
fn infer_format(output: Option<&Path>) -> Result<FileFormat> {
    let Some(path) = output else {
        bail!("--format is required when writing to stdout");
    };
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => Ok(FileFormat::Png),
        Some("svg") => Ok(FileFormat::Svg),
        Some("pdf") => Ok(FileFormat::Pdf),
        _ => bail!(
            "cannot infer format from {}; pass --format explicitly",
            path.display()
        ),
    }
}

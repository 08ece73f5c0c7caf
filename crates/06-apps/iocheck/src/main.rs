//! Command-line runner for the firmware I/O probe suites.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use iocheck::{compare, Suite, SuiteRun};
use services_io::IoServiceConfig;
use std::fs;
use std::path::{Path, PathBuf};
use vfs_core::VfsConfig;

/// Rendering helpers for suite results.
mod render {
    use iocheck::SuiteRun;

    /// Concatenated text logs, in run order.
    pub fn text(runs: &[SuiteRun]) -> String {
        runs.iter().map(|run| run.log.render_text()).collect()
    }

    pub fn json(runs: &[SuiteRun]) -> serde_json::Result<String> {
        serde_json::to_string_pretty(runs)
    }
}

/// Replay firmware I/O probes against the device filesystem.
#[derive(Parser, Debug)]
#[command(author, version, about = "Run firmware I/O probe suites", long_about = None)]
struct Cli {
    /// Suites to run (defaults to every suite).
    #[arg(value_enum, value_name = "SUITE")]
    suites: Vec<SuiteArg>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Golden file to compare the text rendering against.
    #[arg(long, value_name = "FILE")]
    expect: Option<PathBuf>,

    /// Size of the console's descriptor table.
    #[arg(long, env = "IOCHECK_MAX_OPEN_FILES", default_value_t = VfsConfig::default().max_open_files)]
    max_open_files: usize,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SuiteArg {
    /// Path resolution probes.
    Filename,
    /// Seek family probes.
    Seek,
}

impl From<SuiteArg> for Suite {
    fn from(arg: SuiteArg) -> Self {
        match arg {
            SuiteArg::Filename => Suite::Filename,
            SuiteArg::Seek => Suite::Seek,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = IoServiceConfig {
        vfs: VfsConfig {
            max_open_files: cli.max_open_files,
            ..VfsConfig::default()
        },
        ..IoServiceConfig::default()
    };
    let suites: Vec<Suite> = if cli.suites.is_empty() {
        Suite::ALL.to_vec()
    } else {
        cli.suites.iter().copied().map(Suite::from).collect()
    };

    let runs = suites
        .into_iter()
        .map(|suite| {
            let log = suite
                .run(&config)
                .with_context(|| format!("running suite {}", suite.name()))?;
            Ok(SuiteRun { suite, log })
        })
        .collect::<Result<Vec<_>>>()?;

    let text = render::text(&runs);
    match cli.format {
        Format::Text => print!("{text}"),
        Format::Json => println!("{}", render::json(&runs).context("encoding JSON")?),
    }

    if let Some(path) = cli.expect {
        check_expected(&path, &text)?;
    }
    Ok(())
}

fn check_expected(path: &Path, actual: &str) -> Result<()> {
    let expected =
        fs::read_to_string(path).with_context(|| format!("failed to read golden file {path:?}"))?;
    let mismatches = compare(actual, &expected);
    if mismatches.is_empty() {
        return Ok(());
    }
    for mismatch in &mismatches {
        eprintln!("{mismatch}");
    }
    bail!("{} line(s) differ from {path:?}", mismatches.len());
}

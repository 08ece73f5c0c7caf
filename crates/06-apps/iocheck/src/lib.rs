//! Firmware I/O probe runner.
//!
//! Replays the `filename` and `seek` probe programs against a freshly built
//! console and renders the checkpoint log they would print on hardware.

#![allow(missing_docs)]

pub mod checkpoint;
pub mod console;
pub mod suites;

pub use checkpoint::{compare, CheckpointLog, Mismatch};
pub use console::console;

use serde::Serialize;
use services_io::{DispatchError, IoServiceConfig};
use thiserror::Error;
use vfs_core::IoError;

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("loading fixture: {0}")]
    Fixture(#[from] std::io::Error),
    #[error("building console: {0}")]
    Console(#[from] IoError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Probe programs the runner knows how to replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Suite {
    Filename,
    Seek,
}

impl Suite {
    pub const ALL: [Suite; 2] = [Suite::Filename, Suite::Seek];

    pub fn name(self) -> &'static str {
        match self {
            Suite::Filename => "filename",
            Suite::Seek => "seek",
        }
    }

    /// Golden rendering checked into the repository.
    pub fn golden(self) -> &'static str {
        match self {
            Suite::Filename => include_str!("../golden/filename.expected"),
            Suite::Seek => include_str!("../golden/seek.expected"),
        }
    }

    /// Runs the suite on its own console.
    pub fn run(self, config: &IoServiceConfig) -> Result<CheckpointLog, CheckError> {
        let io = console(config.clone())?;
        log::debug!("running suite {}", self.name());
        let log = match self {
            Suite::Filename => suites::filename(&io)?,
            Suite::Seek => suites::seek(&io)?,
        };
        Ok(log)
    }
}

/// A suite together with the log it produced.
#[derive(Clone, Debug, Serialize)]
pub struct SuiteRun {
    pub suite: Suite,
    #[serde(flatten)]
    pub log: CheckpointLog,
}

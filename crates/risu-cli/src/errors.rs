//! Error types for the CLI runtime.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use risu_runner::{JobReadError, ModuleError};
use thiserror::Error;

use crate::telemetry::TelemetryError;

/// Exit code for usage and configuration problems.
pub(crate) const USAGE_EXIT_CODE: u8 = 2;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("failed to read module arguments from {}: {source}", .path.display())]
    ReadArgs { path: PathBuf, source: io::Error },
    #[error("invalid module arguments: {0}")]
    DecodeArgs(serde_json::Error),
    #[error("{0}")]
    InvalidJobId(ModuleError),
    #[error("{0}")]
    ReadStatus(JobReadError),
    #[error("failed to serialise result: {0}")]
    SerialiseOutput(serde_json::Error),
    #[error("failed to write result: {0}")]
    WriteOutput(io::Error),
}

impl AppError {
    /// Exit code reported for this error.
    pub(crate) fn exit_code(&self) -> ExitCode {
        match self {
            Self::ReadStatus(_) => ExitCode::FAILURE,
            _ => ExitCode::from(USAGE_EXIT_CODE),
        }
    }
}

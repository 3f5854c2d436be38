//! Domain errors raised while orchestrating a RISU invocation.
//!
//! All errors use `thiserror`-derived enums with structured context so the
//! orchestrator can turn them into a failure record carrying the path,
//! timeout and remediation hint. I/O errors are wrapped in `Arc` to satisfy
//! the `result_large_err` Clippy lint and keep the error `Clone`.
//!
//! Result-file problems are deliberately absent: they are downgraded to
//! warnings by [`crate::parser::ResultFileError`] and never abort a run.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::args::State;
use crate::process::ProcessError;

/// Hint attached when the executable cannot be located.
pub const INSTALL_HINT: &str =
    "Ensure RISU is installed. Try: risu --version or specify risu_path parameter.";

/// Hint attached when listing or running exceeds its bound.
pub const TIMEOUT_HINT: &str = "Increase timeout or use filter to reduce scope";

/// Hint attached when listing fails without producing any plugin.
pub const LISTING_HINT: &str = "Check RISU installation and permissions";

/// Fatal errors arising from a module invocation.
#[derive(Debug, Clone, Error)]
pub enum ModuleError {
    /// The executable is neither an existing file nor found on `PATH`.
    #[error("RISU not found in PATH or at provided path: {path}")]
    InstallationNotFound {
        /// Path or name that was checked.
        path: String,
    },

    /// The child process exceeded its wall-clock bound and was killed.
    #[error("{} timed out after {timeout_secs} seconds", .operation.timeout_subject())]
    Timeout {
        /// Operation that timed out.
        operation: State,
        /// Bound that elapsed, in seconds.
        timeout_secs: u64,
    },

    /// The child process could not be launched or observed.
    #[error("{}: {source}", .operation.failure_prefix())]
    Execution {
        /// Operation being executed.
        operation: State,
        /// Underlying process failure.
        #[source]
        source: ProcessError,
    },

    /// The parent directory of the explicit output path could not be created.
    #[error("Failed to create output directory {}: {source}", .path.display())]
    OutputDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The temporary result file could not be created.
    #[error("Failed to create temporary output file: {source}")]
    TemporaryOutput {
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The async job status file could not be written.
    #[error("Failed to write job status file {}: {source}", .path.display())]
    JobFile {
        /// Status file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The job identifier would escape the job directory.
    #[error("invalid job_id '{job_id}': must be a plain file name component")]
    InvalidJobId {
        /// Rejected identifier.
        job_id: String,
    },

    /// `risu --version` exited with a non-zero status.
    #[error("RISU validation failed")]
    ValidationFailed {
        /// Return code of the version query.
        rc: i32,
    },

    /// Listing exited with a non-zero status and produced no plugin.
    #[error("Failed to list plugins")]
    ListingFailed {
        /// Return code of the listing.
        rc: i32,
    },
}

impl ModuleError {
    /// Remediation hint shown alongside the failure message, if any.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        match self {
            Self::InstallationNotFound { .. } => Some(INSTALL_HINT),
            Self::Timeout {
                operation: State::List | State::Run,
                ..
            } => Some(TIMEOUT_HINT),
            Self::ListingFailed { .. } => Some(LISTING_HINT),
            _ => None,
        }
    }

    /// Wraps an I/O error raised while writing the job status file.
    pub(crate) fn job_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::JobFile {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}

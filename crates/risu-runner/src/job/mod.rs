//! Async job status files.
//!
//! When a run is tracked, a small JSON record is written to
//! `<job_dir>/risu-job-<job_id>.status` right before RISU starts and is
//! overwritten once it exits, so a separate poller can follow the run. Files
//! are never deleted here and no locking is attempted; callers pick unique
//! identifiers.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;

use crate::error::ModuleError;

const JOB_TARGET: &str = "risu_runner::job";

const FILE_PREFIX: &str = "risu-job-";
const FILE_SUFFIX: &str = ".status";

/// Lifecycle state recorded in a job status file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobState {
    /// RISU has been started and has not exited yet.
    Running,
    /// RISU exited; `rc` and `finished` are set.
    Completed,
}

/// Contents of a job status file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    /// Lifecycle state.
    pub status: JobState,
    /// Start time in seconds since the Unix epoch.
    pub started: f64,
    /// Completion time in seconds since the Unix epoch.
    #[serde(default)]
    pub finished: Option<f64>,
    /// Return code of the run.
    #[serde(default)]
    pub rc: Option<i32>,
    /// Explicit result file of the run.
    #[serde(default)]
    pub output_file: Option<PathBuf>,
}

impl JobStatus {
    fn running(started: f64) -> Self {
        Self {
            status: JobState::Running,
            started,
            finished: None,
            rc: None,
            output_file: None,
        }
    }
}

/// Failures while reading a job status file.
#[derive(Debug, Clone, Error)]
pub enum JobReadError {
    /// The file could not be read.
    #[error("failed to read job status file {}: {source}", .path.display())]
    Read {
        /// Status file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The file does not hold a job status record.
    #[error("invalid job status file {}: {source}", .path.display())]
    Decode {
        /// Status file path.
        path: PathBuf,
        /// Underlying decoding error.
        #[source]
        source: Arc<serde_json::Error>,
    },
}

impl JobReadError {
    /// Returns whether the status file does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Read { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Writes the status file of one tracked run.
#[derive(Debug, Clone)]
pub struct JobTracker {
    job_id: String,
    path: PathBuf,
    started: Option<f64>,
}

impl JobTracker {
    /// Creates a tracker for `job_id` without touching the file system.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::InvalidJobId`] when the identifier is empty or
    /// would resolve outside `job_dir`.
    pub fn new(job_dir: &Path, job_id: &str) -> Result<Self, ModuleError> {
        Ok(Self {
            job_id: job_id.to_owned(),
            path: Self::path_for(job_dir, job_id)?,
            started: None,
        })
    }

    /// Status file path for `job_id` inside `job_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::InvalidJobId`] when the identifier is empty or
    /// contains a path separator or `..`.
    pub fn path_for(job_dir: &Path, job_id: &str) -> Result<PathBuf, ModuleError> {
        if !is_plain_component(job_id) {
            return Err(ModuleError::InvalidJobId {
                job_id: job_id.to_owned(),
            });
        }
        Ok(job_dir.join(format!("{FILE_PREFIX}{job_id}{FILE_SUFFIX}")))
    }

    /// Identifier of the tracked job.
    #[must_use]
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Status file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start time recorded by [`JobTracker::start`].
    #[must_use]
    pub const fn started(&self) -> Option<f64> {
        self.started
    }

    /// Records that the run is starting.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::JobFile`] when the status file cannot be
    /// written.
    pub fn start(&mut self) -> Result<(), ModuleError> {
        let started = unix_now();
        self.write(&JobStatus::running(started))?;
        self.started = Some(started);
        Ok(())
    }

    /// Records that the run finished with `rc`.
    ///
    /// The start time written by [`JobTracker::start`] is kept.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::JobFile`] when the status file cannot be
    /// written.
    pub fn complete(&self, rc: i32, output_file: Option<&Path>) -> Result<(), ModuleError> {
        let finished = unix_now();
        self.write(&JobStatus {
            status: JobState::Completed,
            started: self.started.unwrap_or(finished),
            finished: Some(finished),
            rc: Some(rc),
            output_file: output_file.map(Path::to_path_buf),
        })
    }

    fn write(&self, status: &JobStatus) -> Result<(), ModuleError> {
        let path = self.path.as_path();
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }
        let mut file = options
            .open(path)
            .map_err(|source| ModuleError::job_file(path, source))?;
        serde_json::to_writer(&mut file, status)
            .map_err(|source| ModuleError::job_file(path, source.into()))?;
        file.write_all(b"\n")
            .map_err(|source| ModuleError::job_file(path, source))?;
        file.sync_all()
            .map_err(|source| ModuleError::job_file(path, source))?;

        info!(
            target: JOB_TARGET,
            job_id = %self.job_id,
            status = %status.status,
            file = %path.display(),
            "job status updated"
        );
        Ok(())
    }

    /// Loads the status file at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`JobReadError`] when the file cannot be read or decoded.
    pub fn read(path: &Path) -> Result<JobStatus, JobReadError> {
        let text = fs::read_to_string(path).map_err(|source| JobReadError::Read {
            path: path.to_path_buf(),
            source: Arc::new(source),
        })?;
        serde_json::from_str(&text).map_err(|source| JobReadError::Decode {
            path: path.to_path_buf(),
            source: Arc::new(source),
        })
    }
}

fn is_plain_component(job_id: &str) -> bool {
    !job_id.is_empty()
        && job_id != "."
        && !job_id.contains("..")
        && !job_id.contains(['/', '\\', '\0'])
}

/// Current time in seconds since the Unix epoch.
fn unix_now() -> f64 {
    (OffsetDateTime::now_utc() - OffsetDateTime::UNIX_EPOCH).as_seconds_f64()
}

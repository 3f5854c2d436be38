//! Structured outcome handed back to the automation caller.
//!
//! Every invocation ends in exactly one [`ModuleResult`]. Success and
//! failure share the [`ResultFields`] accumulated along the way, so a failure
//! late in a run still reports the captured output.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::error::ModuleError;
use crate::parser::{PluginListing, RunSummary};
use crate::process::ExecutionResult;

/// Fields shared by successful and failed invocations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultFields {
    /// Whether the run found failing plugins.
    pub changed: bool,
    /// Return code of RISU.
    pub rc: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Wall-clock seconds spent executing RISU.
    pub elapsed: f64,
    /// Human-readable outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    /// Command that would run, reported in check mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,
    /// First line of `risu --version`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risu_version: Option<String>,
    /// Plugin records from a listing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Vec<crate::parser::PluginRecord>>,
    /// Number of listed plugins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_count: Option<usize>,
    /// Listed plugins per category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugins_by_category: Option<BTreeMap<String, usize>>,
    /// Decoded result file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Value>,
    /// Outcome counts from the result file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,
    /// Result file written by the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
    /// Identifier of the tracked job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Status file of the tracked job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_file: Option<PathBuf>,
    /// Non-fatal problems encountered along the way.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ResultFields {
    /// Fields populated from a finished child process.
    #[must_use]
    pub fn from_execution(execution: &ExecutionResult) -> Self {
        Self {
            rc: execution.rc(),
            stdout: execution.stdout().to_owned(),
            stderr: execution.stderr().to_owned(),
            elapsed: execution.elapsed().as_secs_f64(),
            ..Self::default()
        }
    }

    /// Records a plugin listing.
    pub fn set_listing(&mut self, listing: PluginListing) {
        self.plugins_by_category = Some(listing.by_category());
        self.plugin_count = Some(listing.len());
        self.plugins = Some(listing.into_plugins());
    }
}

/// A failed invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleFailure {
    failed: bool,
    msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    risu_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    elapsed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_file: Option<PathBuf>,
    #[serde(flatten)]
    fields: Option<ResultFields>,
}

impl ModuleFailure {
    /// Builds a failure from `error`, keeping any `fields` gathered so far.
    ///
    /// The message, hint and context (attempted path, elapsed bound) are
    /// taken from the error.
    #[must_use]
    pub fn new(error: &ModuleError, fields: Option<ResultFields>) -> Self {
        let mut failure = Self {
            failed: true,
            msg: error.to_string(),
            hint: error.hint(),
            risu_path: None,
            timeout: None,
            elapsed: None,
            job_id: None,
            job_file: None,
            fields: fields.map(|mut fields| {
                fields.msg = None;
                fields
            }),
        };

        match error {
            ModuleError::InstallationNotFound { path } => {
                failure.risu_path = Some(path.clone());
            }
            ModuleError::Timeout { timeout_secs, .. } => {
                failure.timeout = Some(*timeout_secs);
                let elapsed = Duration::from_secs(*timeout_secs).as_secs_f64();
                match failure.fields.as_mut() {
                    Some(fields) => fields.elapsed = elapsed,
                    None => failure.elapsed = Some(elapsed),
                }
            }
            _ => {}
        }

        failure
    }

    /// Attaches the tracked job to a failure that has no execution fields.
    ///
    /// When execution fields are present the job is recorded there instead,
    /// so each key is serialised once.
    #[must_use]
    pub fn with_job(mut self, job_id: impl Into<String>, job_file: impl Into<PathBuf>) -> Self {
        match self.fields.as_mut() {
            Some(fields) => {
                fields.job_id = Some(job_id.into());
                fields.job_file = Some(job_file.into());
            }
            None => {
                self.job_id = Some(job_id.into());
                self.job_file = Some(job_file.into());
            }
        }
        self
    }

    /// Failure message.
    #[must_use]
    pub fn msg(&self) -> &str {
        &self.msg
    }

    /// Remediation hint.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.hint
    }

    /// Executable path that could not be found.
    #[must_use]
    pub fn risu_path(&self) -> Option<&str> {
        self.risu_path.as_deref()
    }

    /// Bound that elapsed, for timeouts.
    #[must_use]
    pub const fn timeout(&self) -> Option<u64> {
        self.timeout
    }

    /// Elapsed seconds reported with the failure.
    #[must_use]
    pub fn elapsed(&self) -> Option<f64> {
        self.fields
            .as_ref()
            .map(|fields| fields.elapsed)
            .or(self.elapsed)
    }

    /// Identifier of the tracked job.
    #[must_use]
    pub fn job_id(&self) -> Option<&str> {
        self.fields
            .as_ref()
            .and_then(|fields| fields.job_id.as_deref())
            .or(self.job_id.as_deref())
    }

    /// Status file of the tracked job.
    #[must_use]
    pub fn job_file(&self) -> Option<&std::path::Path> {
        self.fields
            .as_ref()
            .and_then(|fields| fields.job_file.as_deref())
            .or(self.job_file.as_deref())
    }

    /// Partial fields gathered before the failure.
    #[must_use]
    pub const fn fields(&self) -> Option<&ResultFields> {
        self.fields.as_ref()
    }
}

/// Outcome of one invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ModuleResult {
    /// The operation completed.
    Success(ResultFields),
    /// The operation failed.
    Failure(ModuleFailure),
}

impl ModuleResult {
    /// Returns whether the invocation failed.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Result fields, including partial ones of a failure.
    #[must_use]
    pub const fn fields(&self) -> Option<&ResultFields> {
        match self {
            Self::Success(fields) => Some(fields),
            Self::Failure(failure) => failure.fields(),
        }
    }

    /// Failure details, if the invocation failed.
    #[must_use]
    pub const fn failure(&self) -> Option<&ModuleFailure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }
}

impl From<Result<ResultFields, ModuleFailure>> for ModuleResult {
    fn from(outcome: Result<ResultFields, ModuleFailure>) -> Self {
        match outcome {
            Ok(fields) => Self::Success(fields),
            Err(failure) => Self::Failure(failure),
        }
    }
}

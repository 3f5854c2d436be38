//! Module arguments supplied by the automation caller.
//!
//! [`ModuleArgs`] is the immutable request for one invocation. It is usually
//! decoded from a JSON argument record; unknown keys are rejected so typos in
//! a playbook surface as errors instead of silently falling back to defaults.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Default location of the RISU executable.
pub const DEFAULT_RISU_PATH: &str = "/usr/bin/risu";

/// Default execution bound for listing and running, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Fixed execution bound for the version query, in seconds.
pub const VALIDATE_TIMEOUT_SECS: u64 = 30;

/// Operation selected for an invocation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum State {
    /// Query the RISU version to confirm the installation works.
    Validate,
    /// List the available plugins with categories and descriptions.
    #[default]
    List,
    /// Execute the diagnostics and summarise the result file.
    Run,
}

impl State {
    /// Subject used in timeout messages, e.g. "Plugin listing timed out".
    #[must_use]
    pub const fn timeout_subject(self) -> &'static str {
        match self {
            Self::Validate => "RISU validation",
            Self::List => "Plugin listing",
            Self::Run => "RISU execution",
        }
    }

    /// Prefix used when an execution failure is reported to the caller.
    #[must_use]
    pub const fn failure_prefix(self) -> &'static str {
        match self {
            Self::Validate => "Failed to validate RISU",
            Self::List => "Failed to list plugins",
            Self::Run => "Failed to run diagnostics",
        }
    }
}

/// Format RISU writes its result file in.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum OutputFormat {
    /// Machine-readable JSON, the only format parsed back.
    #[default]
    Json,
    /// HTML report (`-h`).
    Html,
    /// Plain text report (`-t`).
    Text,
}

impl OutputFormat {
    /// RISU flag selecting this format, if it differs from the default.
    #[must_use]
    pub const fn flag(self) -> Option<&'static str> {
        match self {
            Self::Json => None,
            Self::Html => Some("-h"),
            Self::Text => Some("-t"),
        }
    }
}

/// Arguments for a single module invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleArgs {
    /// Operation to perform.
    #[serde(default)]
    pub state: State,
    /// Path to `risu`, or a bare command name looked up on `PATH`.
    #[serde(default = "default_risu_path")]
    pub risu_path: String,
    /// Include filter passed to RISU with `-i`.
    #[serde(default)]
    pub filter: Option<String>,
    /// Explicit result file for run mode.
    #[serde(default)]
    pub output: Option<PathBuf>,
    /// Result file format; only honoured together with `output`.
    #[serde(default)]
    pub output_format: OutputFormat,
    /// Pass `-q` to RISU.
    #[serde(default = "default_quiet")]
    pub quiet: bool,
    /// Execution bound for listing and running, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Track the run in a job status file.
    #[serde(default)]
    pub async_mode: bool,
    /// Identifier of the job status file written in async mode.
    #[serde(default)]
    pub job_id: Option<String>,
    /// Report the intended run without executing anything.
    #[serde(default)]
    pub check_mode: bool,
}

impl ModuleArgs {
    /// Creates arguments for `state` with every other field at its default.
    #[must_use]
    pub fn new(state: State) -> Self {
        Self {
            state,
            risu_path: default_risu_path(),
            filter: None,
            output: None,
            output_format: OutputFormat::Json,
            quiet: default_quiet(),
            timeout: default_timeout(),
            async_mode: false,
            job_id: None,
            check_mode: false,
        }
    }

    /// Filter value as passed to RISU: trimmed, with blank values dropped.
    #[must_use]
    pub fn normalized_filter(&self) -> Option<&str> {
        self.filter
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Job identifier when async tracking is active.
    #[must_use]
    pub fn tracked_job_id(&self) -> Option<&str> {
        if self.async_mode {
            self.job_id.as_deref()
        } else {
            None
        }
    }

    /// Execution bound for the selected operation.
    #[must_use]
    pub const fn timeout_secs(&self) -> u64 {
        match self.state {
            State::Validate => VALIDATE_TIMEOUT_SECS,
            State::List | State::Run => self.timeout,
        }
    }

    /// Execution bound for the selected operation as a [`Duration`].
    #[must_use]
    pub const fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs())
    }
}

impl Default for ModuleArgs {
    fn default() -> Self {
        Self::new(State::default())
    }
}

fn default_risu_path() -> String {
    DEFAULT_RISU_PATH.to_owned()
}

const fn default_quiet() -> bool {
    true
}

const fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

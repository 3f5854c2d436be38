//! Summary of a RISU JSON result file.
//!
//! Each entry of the top-level `"results"` mapping is one plugin outcome
//! whose return code sits at `entry.result.rc`. Return codes are classified
//! by RISU's fixed thresholds; anything unrecognised counts as a failure so
//! the four classes always add up to the number of entries.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};
use thiserror::Error;
use tracing::debug;

const RESULTS_TARGET: &str = "risu_runner::parser::results";

/// Return code of a plugin that passed.
pub const RC_PASSED: i64 = 0;
/// RISU's explicit "okay" return code, also counted as passed.
pub const RC_OKAY: i64 = 10;
/// Return code of a plugin that did not apply to the host.
pub const RC_SKIPPED: i64 = 30;
/// Return code of a purely informational plugin.
pub const RC_INFO: i64 = 40;

/// Key of the per-plugin mapping inside the result document.
const RESULTS_KEY: &str = "results";

/// Class a plugin return code falls into.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OutcomeClass {
    /// `0` or `10`.
    Passed,
    /// `30`.
    Skipped,
    /// `40`.
    Info,
    /// Any other code, or no code at all.
    Failed,
}

impl OutcomeClass {
    /// Classifies a plugin return code.
    #[must_use]
    pub const fn classify(rc: Option<i64>) -> Self {
        match rc {
            Some(RC_PASSED | RC_OKAY) => Self::Passed,
            Some(RC_SKIPPED) => Self::Skipped,
            Some(RC_INFO) => Self::Info,
            _ => Self::Failed,
        }
    }
}

/// Outcome of one plugin as read from the result document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticOutcome {
    /// Plugin identifier, the key in the `"results"` mapping.
    pub plugin_id: String,
    /// Nested return code, absent when missing or not an integer.
    pub rc: Option<i64>,
}

impl DiagnosticOutcome {
    fn from_entry(plugin_id: &str, entry: &Value) -> Self {
        let rc = entry
            .get("result")
            .and_then(|result| result.get("rc"))
            .and_then(Value::as_i64);
        Self {
            plugin_id: plugin_id.to_owned(),
            rc,
        }
    }

    /// Class of this outcome.
    #[must_use]
    pub const fn class(&self) -> OutcomeClass {
        OutcomeClass::classify(self.rc)
    }
}

/// Counts of plugin outcomes per class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of entries examined.
    pub total_plugins: usize,
    /// Plugins that passed.
    pub passed: usize,
    /// Plugins that were skipped.
    pub skipped: usize,
    /// Informational plugins.
    pub info: usize,
    /// Plugins that failed.
    pub failed: usize,
}

impl RunSummary {
    fn record(&mut self, class: OutcomeClass) {
        self.total_plugins += 1;
        match class {
            OutcomeClass::Passed => self.passed += 1,
            OutcomeClass::Skipped => self.skipped += 1,
            OutcomeClass::Info => self.info += 1,
            OutcomeClass::Failed => self.failed += 1,
        }
    }

    /// Returns whether any plugin failed.
    #[must_use]
    pub const fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Summarises `outcomes`.
#[must_use]
pub fn summarize(outcomes: &[DiagnosticOutcome]) -> RunSummary {
    let mut summary = RunSummary::default();
    for outcome in outcomes {
        summary.record(outcome.class());
    }
    summary
}

/// A parsed result file.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultDocument {
    document: Value,
    outcomes: Vec<DiagnosticOutcome>,
    summary: RunSummary,
}

impl ResultDocument {
    /// Interprets an already decoded result document.
    ///
    /// # Errors
    ///
    /// Returns [`ResultFileError::Malformed`] when the document or its
    /// `"results"` member is not a JSON object.
    pub fn from_value(path: &Path, document: Value) -> Result<Self, ResultFileError> {
        let Some(root) = document.as_object() else {
            return Err(ResultFileError::malformed(path, "top level is not an object"));
        };

        let outcomes = match root.get(RESULTS_KEY) {
            None => Vec::new(),
            Some(Value::Object(entries)) => entries
                .iter()
                .map(|(plugin_id, entry)| DiagnosticOutcome::from_entry(plugin_id, entry))
                .collect(),
            Some(_) => {
                return Err(ResultFileError::malformed(
                    path,
                    "\"results\" is not an object",
                ));
            }
        };
        let summary = summarize(&outcomes);

        Ok(Self {
            document,
            outcomes,
            summary,
        })
    }

    /// Full decoded document.
    #[must_use]
    pub const fn document(&self) -> &Value {
        &self.document
    }

    /// Per-plugin outcomes.
    #[must_use]
    pub fn outcomes(&self) -> &[DiagnosticOutcome] {
        &self.outcomes
    }

    /// Outcome counts.
    #[must_use]
    pub const fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Consumes the document, returning the decoded JSON and the summary.
    #[must_use]
    pub fn into_parts(self) -> (Value, RunSummary) {
        (self.document, self.summary)
    }
}

/// A result file that could not be read or understood.
///
/// These never fail a run; the orchestrator reports them as warnings.
#[derive(Debug, Clone, Error)]
pub enum ResultFileError {
    /// The file could not be read.
    #[error("Failed to read output file {}: {source}", .path.display())]
    Read {
        /// Result file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The file is not valid JSON.
    #[error("Failed to parse JSON output {}: {source}", .path.display())]
    Json {
        /// Result file path.
        path: PathBuf,
        /// Underlying decoding error.
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// The JSON does not have the expected shape.
    #[error("Failed to parse JSON output {}: {reason}", .path.display())]
    Malformed {
        /// Result file path.
        path: PathBuf,
        /// What was wrong.
        reason: &'static str,
    },
}

impl ResultFileError {
    fn malformed(path: &Path, reason: &'static str) -> Self {
        Self::Malformed {
            path: path.to_path_buf(),
            reason,
        }
    }
}

/// Reads and summarises the result file at `path`.
///
/// # Errors
///
/// Returns a [`ResultFileError`] when the file cannot be read, is not JSON,
/// or does not have the expected shape.
pub fn parse_result_file(path: &Path) -> Result<ResultDocument, ResultFileError> {
    let text = fs::read_to_string(path).map_err(|source| ResultFileError::Read {
        path: path.to_path_buf(),
        source: Arc::new(source),
    })?;
    let document: Value = serde_json::from_str(&text).map_err(|source| ResultFileError::Json {
        path: path.to_path_buf(),
        source: Arc::new(source),
    })?;
    let parsed = ResultDocument::from_value(path, document)?;

    debug!(
        target: RESULTS_TARGET,
        path = %path.display(),
        total_plugins = parsed.summary.total_plugins,
        failed = parsed.summary.failed,
        "parsed result file"
    );

    Ok(parsed)
}

//! Shared ambient configuration for the RISU orchestration module.
//!
//! [`Config`] carries the settings that sit around a single invocation rather
//! than inside it: how the binary logs and where async job status files live.
//! Values are layered by `ortho_config` in the order defaults, configuration
//! file (`--config-path` or `RISU_MODULE_CONFIG_PATH`), environment
//! (`RISU_MODULE_*`) and finally command-line flags.
//!
//! The per-invocation request (which operation to run, the RISU path, the
//! filter and so on) is not part of this configuration; it arrives as a
//! module argument record handled by `risu-runner`.

mod defaults;
mod logging;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_JOB_DIR, DEFAULT_LOG_FILTER, default_job_dir, default_log_filter,
    default_log_filter_string, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Layered configuration for the `risu-module` binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "RISU_MODULE")]
pub struct Config {
    /// Tracing filter expression, for example `info` or `risu_runner=debug`.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for log events written to stderr.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Directory receiving `risu-job-<id>.status` files in async mode.
    #[serde(default = "default_job_dir")]
    #[ortho_config(default = default_job_dir())]
    pub job_dir: Utf8PathBuf,
}

impl Config {
    /// Returns the configured log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Returns the configured log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Returns the directory holding async job status files.
    #[must_use]
    pub fn job_dir(&self) -> &Utf8Path {
        self.job_dir.as_path()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            job_dir: default_job_dir(),
        }
    }
}

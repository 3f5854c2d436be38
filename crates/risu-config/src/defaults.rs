use camino::Utf8PathBuf;

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Directory holding async job status files unless overridden.
pub const DEFAULT_JOB_DIR: &str = "/tmp";

/// Default log filter expression used by the binary.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binary.
#[must_use]
pub const fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Directory where `risu-job-<id>.status` files are written.
#[must_use]
pub fn default_job_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_JOB_DIR)
}

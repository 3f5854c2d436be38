//! Command-line argument definitions for `risu-module`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use risu_runner::args::{DEFAULT_RISU_PATH, DEFAULT_TIMEOUT_SECS};
use risu_runner::{ModuleArgs, OutputFormat, State};

/// Runs RISU diagnostics and reports structured JSON results.
#[derive(Parser, Debug)]
#[command(name = "risu-module", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Operation to perform.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Operations offered by the binary.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Reads a JSON argument record from a file, or from stdin when `-`.
    Invoke {
        /// Path of the JSON argument record.
        #[arg(value_name = "ARGS_FILE")]
        args_file: PathBuf,
    },
    /// Checks that RISU is installed and working.
    Validate(InvocationArgs),
    /// Lists the available RISU plugins.
    List(InvocationArgs),
    /// Runs RISU diagnostics and summarises the results.
    Run(InvocationArgs),
    /// Prints the status file of an async run.
    Status {
        /// Identifier passed as `--job-id` to the tracked run.
        #[arg(value_name = "JOB_ID")]
        job_id: String,
    },
}

/// Flags shared by `validate`, `list` and `run`.
#[derive(Args, Debug, Clone)]
pub(crate) struct InvocationArgs {
    /// Path to `risu`, or a command name looked up on `PATH`.
    #[arg(long, default_value = DEFAULT_RISU_PATH)]
    risu_path: String,
    /// Include filter passed to RISU.
    #[arg(long)]
    filter: Option<String>,
    /// Result file written by `run`.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Result file format (`json`, `html` or `text`).
    #[arg(long, default_value_t = OutputFormat::Json)]
    output_format: OutputFormat,
    /// Lets RISU print its progress output.
    #[arg(long)]
    no_quiet: bool,
    /// Execution bound in seconds for `list` and `run`.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,
    /// Tracks the run in a job status file.
    #[arg(long)]
    async_mode: bool,
    /// Identifier of the job status file.
    #[arg(long)]
    job_id: Option<String>,
    /// Reports the command without running it.
    #[arg(long)]
    check: bool,
}

impl InvocationArgs {
    /// Converts the flags into module arguments for `state`.
    pub(crate) fn into_module_args(self, state: State) -> ModuleArgs {
        ModuleArgs {
            state,
            risu_path: self.risu_path,
            filter: self.filter,
            output: self.output,
            output_format: self.output_format,
            quiet: !self.no_quiet,
            timeout: self.timeout,
            async_mode: self.async_mode,
            job_id: self.job_id,
            check_mode: self.check,
        }
    }
}

//! Command-line runtime for the `risu-module` binary.
//!
//! The runtime splits global configuration flags from the subcommand, loads
//! [`risu_config::Config`] through `ortho_config`, installs telemetry and
//! then either runs one RISU operation or reads a job status file. Results
//! are written to stdout as a single JSON document; diagnostics go to stderr.
//!
//! Exit codes: `0` when the operation succeeded, `1` when it failed, `2` for
//! usage, configuration and I/O problems of the binary itself.

use std::ffi::OsString;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use risu_config::Config;
use risu_runner::{
    CommandExecutor, JobTracker, ModuleArgs, ProcessExecutor, RisuModule, State,
};
use serde::Serialize;
use tracing::debug;

mod cli;
mod config;
mod errors;
pub mod telemetry;

use cli::{Cli, CliCommand};
use config::{ConfigLoader, OrthoConfigLoader, command_arguments, split_config_arguments};
use errors::AppError;

const CLI_TARGET: &str = "risu_cli";

/// Argument file name that selects stdin.
const STDIN_ARGUMENT: &str = "-";

/// Bundles the IO streams provided to the CLI runtime.
pub(crate) struct IoStreams<'a, R: Read, W: Write, E: Write> {
    pub(crate) stdin: &'a mut R,
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, R, W, E>(args: I, stdin: &mut R, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: Read,
    W: Write,
    E: Write,
{
    let mut io = IoStreams {
        stdin,
        stdout,
        stderr,
    };
    run_with(args, &mut io, &OrthoConfigLoader, ProcessExecutor)
}

/// Runs the CLI with a custom configuration loader and executor.
pub(crate) fn run_with<I, R, W, E, L, X>(
    args: I,
    io: &mut IoStreams<'_, R, W, E>,
    loader: &L,
    executor: X,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: Read,
    W: Write,
    E: Write,
    L: ConfigLoader,
    X: CommandExecutor,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&args);

    let outcome = Cli::try_parse_from(command_arguments(&args, &split))
        .map_err(AppError::CliUsage)
        .and_then(|cli| {
            let config = loader.load(&split.config_arguments)?;
            telemetry::initialise(&config)?;
            dispatch(cli.command, &config, io, executor)
        });

    match outcome {
        Ok(exit_code) => exit_code,
        Err(AppError::CliUsage(error))
            if matches!(
                error.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
            ) =>
        {
            match write!(io.stdout, "{}", error.render()) {
                Ok(()) => ExitCode::SUCCESS,
                Err(_) => ExitCode::from(errors::USAGE_EXIT_CODE),
            }
        }
        Err(error) => {
            drop(writeln!(io.stderr, "{error}"));
            error.exit_code()
        }
    }
}

fn dispatch<R, W, E, X>(
    command: CliCommand,
    config: &Config,
    io: &mut IoStreams<'_, R, W, E>,
    executor: X,
) -> Result<ExitCode, AppError>
where
    R: Read,
    W: Write,
    E: Write,
    X: CommandExecutor,
{
    let args = match command {
        CliCommand::Invoke { args_file } => read_module_args(&args_file, io.stdin)?,
        CliCommand::Validate(flags) => flags.into_module_args(State::Validate),
        CliCommand::List(flags) => flags.into_module_args(State::List),
        CliCommand::Run(flags) => flags.into_module_args(State::Run),
        CliCommand::Status { job_id } => return print_job_status(&job_id, config, io.stdout),
    };

    let module = RisuModule::new(executor).with_job_dir(config.job_dir().as_std_path());
    let result = module.run(&args);
    write_json(io.stdout, &result)?;

    if result.is_failure() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn read_module_args<R: Read>(path: &Path, stdin: &mut R) -> Result<ModuleArgs, AppError> {
    let read_error = |source| AppError::ReadArgs {
        path: path.to_path_buf(),
        source,
    };
    let text = if path.as_os_str() == STDIN_ARGUMENT {
        let mut buffer = String::new();
        stdin.read_to_string(&mut buffer).map_err(read_error)?;
        buffer
    } else {
        fs::read_to_string(path).map_err(read_error)?
    };

    debug!(
        target: CLI_TARGET,
        source = %path.display(),
        bytes = text.len(),
        "read module arguments"
    );
    serde_json::from_str(&text).map_err(AppError::DecodeArgs)
}

fn print_job_status<W: Write>(
    job_id: &str,
    config: &Config,
    stdout: &mut W,
) -> Result<ExitCode, AppError> {
    let path =
        JobTracker::path_for(config.job_dir().as_std_path(), job_id).map_err(AppError::InvalidJobId)?;
    let status = JobTracker::read(&path).map_err(AppError::ReadStatus)?;
    write_json(stdout, &status)?;
    Ok(ExitCode::SUCCESS)
}

fn write_json<W: Write>(stdout: &mut W, value: &impl Serialize) -> Result<(), AppError> {
    serde_json::to_writer(&mut *stdout, value).map_err(AppError::SerialiseOutput)?;
    stdout.write_all(b"\n").map_err(AppError::WriteOutput)?;
    stdout.flush().map_err(AppError::WriteOutput)
}

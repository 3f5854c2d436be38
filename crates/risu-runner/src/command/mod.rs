//! Translation of module arguments into RISU command lines.
//!
//! Building is split in two steps. [`CommandPlan::build`] is pure: it fixes
//! the flag order for the selected operation and records where run output
//! should go without touching the file system, which is what check mode
//! renders. [`CommandPlan::prepare`] performs the side effects a real run
//! needs (creating the output directory or acquiring a temporary result
//! file) and yields a [`PreparedCommand`] ready for the executor.
//!
//! The flag spellings are RISU's external contract and must not change.

use std::ffi::{OsStr, OsString};
use std::fs::DirBuilder;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempPath;
use tracing::debug;

use crate::args::{ModuleArgs, OutputFormat, State};
use crate::error::ModuleError;

const COMMAND_TARGET: &str = "risu_runner::command";

/// Version query flag.
pub const VERSION_FLAG: &str = "--version";
/// Flags requesting the plugin listing with categories and descriptions.
pub const LIST_FLAGS: [&str; 3] = ["--list-plugins", "--list-categories", "--description"];
/// Flag requesting a diagnostic run.
pub const RUN_FLAG: &str = "-l";
/// Include filter flag, followed by the filter value.
pub const FILTER_FLAG: &str = "-i";
/// Quiet flag.
pub const QUIET_FLAG: &str = "-q";
/// Output path flag, followed by the path.
pub const OUTPUT_FLAG: &str = "--output";

/// Placeholder shown in check mode where a temporary path would appear.
pub const TEMPORARY_OUTPUT_PLACEHOLDER: &str = "<temporary>.json";

const TEMPORARY_PREFIX: &str = "risu-";
const TEMPORARY_SUFFIX: &str = ".json";

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: PathBuf,
    args: Vec<OsString>,
}

impl CommandLine {
    /// Creates a command line.
    #[must_use]
    pub const fn new(program: PathBuf, args: Vec<OsString>) -> Self {
        Self { program, args }
    }

    /// Returns the program path.
    #[must_use]
    pub fn program(&self) -> &Path {
        self.program.as_path()
    }

    /// Returns the arguments following the program.
    #[must_use]
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Renders the command as a single space-joined line.
    #[must_use]
    pub fn render(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(OsStr::to_string_lossy)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Where a run writes its result file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Caller-supplied path, reported back and kept after the run.
    Explicit(PathBuf),
    /// Scoped temporary JSON file, removed once parsed.
    Temporary,
}

/// Pure description of the command an invocation would execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPlan {
    state: State,
    program: PathBuf,
    args: Vec<OsString>,
    output: Option<OutputTarget>,
    format_flag: Option<&'static str>,
}

impl CommandPlan {
    /// Builds the plan for `args` using the resolved `program`.
    #[must_use]
    pub fn build(args: &ModuleArgs, program: &Path) -> Self {
        let mut plan = Self {
            state: args.state,
            program: program.to_path_buf(),
            args: Vec::new(),
            output: None,
            format_flag: None,
        };

        match args.state {
            State::Validate => plan.push(VERSION_FLAG),
            State::List => {
                for flag in LIST_FLAGS {
                    plan.push(flag);
                }
                plan.push_selection(args);
            }
            State::Run => {
                plan.push(RUN_FLAG);
                plan.push_selection(args);
                plan.output = Some(args.output.clone().map_or(
                    OutputTarget::Temporary,
                    OutputTarget::Explicit,
                ));
                plan.format_flag = format_flag(args.output.as_deref(), args.output_format);
            }
        }

        plan
    }

    fn push(&mut self, argument: impl Into<OsString>) {
        self.args.push(argument.into());
    }

    fn push_selection(&mut self, args: &ModuleArgs) {
        if let Some(filter) = args.normalized_filter() {
            self.push(FILTER_FLAG);
            self.push(filter);
        }
        if args.quiet {
            self.push(QUIET_FLAG);
        }
    }

    /// Operation the plan was built for.
    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    /// Output target of a run plan.
    #[must_use]
    pub const fn output_target(&self) -> Option<&OutputTarget> {
        self.output.as_ref()
    }

    /// Assembles the full command line with `output` as the result path.
    fn command_line(&self, output: Option<&OsStr>) -> CommandLine {
        let mut args = self.args.clone();
        if let Some(path) = output {
            args.push(OsString::from(OUTPUT_FLAG));
            args.push(path.to_os_string());
        }
        if let Some(flag) = self.format_flag {
            args.push(OsString::from(flag));
        }
        CommandLine::new(self.program.clone(), args)
    }

    /// Renders the command line without any file system side effect.
    ///
    /// A temporary output path is shown as
    /// [`TEMPORARY_OUTPUT_PLACEHOLDER`].
    #[must_use]
    pub fn preview(&self) -> String {
        let output = self.output.as_ref().map(|target| match target {
            OutputTarget::Explicit(path) => path.as_os_str(),
            OutputTarget::Temporary => OsStr::new(TEMPORARY_OUTPUT_PLACEHOLDER),
        });
        self.command_line(output).render()
    }

    /// Performs the file system preparation a real run needs.
    ///
    /// For an explicit output path whose parent directory is missing, the
    /// directory tree is created. Without an explicit path a temporary `.json`
    /// file is acquired; it is removed when the returned command is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::OutputDirectory`] when the directory cannot be
    /// created, or [`ModuleError::TemporaryOutput`] when no temporary file can
    /// be acquired.
    pub fn prepare(self) -> Result<PreparedCommand, ModuleError> {
        let output = match &self.output {
            None => None,
            Some(OutputTarget::Explicit(path)) => {
                ensure_parent_directory(path)?;
                Some(RunOutput::Explicit(path.clone()))
            }
            Some(OutputTarget::Temporary) => Some(RunOutput::Temporary(acquire_temporary()?)),
        };

        let line = self.command_line(output.as_ref().map(|out| out.path().as_os_str()));
        Ok(PreparedCommand { line, output })
    }
}

fn format_flag(explicit_output: Option<&Path>, format: OutputFormat) -> Option<&'static str> {
    explicit_output.and_then(|_| format.flag())
}

fn ensure_parent_directory(path: &Path) -> Result<(), ModuleError> {
    let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) else {
        return Ok(());
    };
    if parent.exists() {
        return Ok(());
    }

    debug!(
        target: COMMAND_TARGET,
        directory = %parent.display(),
        "creating output directory"
    );

    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder
        .create(parent)
        .map_err(|source| ModuleError::OutputDirectory {
            path: parent.to_path_buf(),
            source: Arc::new(source),
        })
}

fn acquire_temporary() -> Result<TempPath, ModuleError> {
    let file = tempfile::Builder::new()
        .prefix(TEMPORARY_PREFIX)
        .suffix(TEMPORARY_SUFFIX)
        .tempfile()
        .map_err(|source| ModuleError::TemporaryOutput {
            source: Arc::new(source),
        })?;
    Ok(file.into_temp_path())
}

/// Result file of a prepared run.
#[derive(Debug)]
pub enum RunOutput {
    /// Caller-supplied path.
    Explicit(PathBuf),
    /// Temporary file deleted on drop.
    Temporary(TempPath),
}

impl RunOutput {
    /// Path RISU writes to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Explicit(path) => path.as_path(),
            Self::Temporary(path) => &**path,
        }
    }

    /// Returns the caller-supplied path, if any.
    #[must_use]
    pub fn explicit(&self) -> Option<&Path> {
        match self {
            Self::Explicit(path) => Some(path.as_path()),
            Self::Temporary(_) => None,
        }
    }

    /// Releases the output, deleting a temporary file.
    ///
    /// Deletion failure is logged and otherwise ignored.
    pub fn release(self) {
        if let Self::Temporary(path) = self {
            let shown = path.display().to_string();
            if let Err(error) = path.close() {
                debug!(
                    target: COMMAND_TARGET,
                    path = shown,
                    %error,
                    "failed to remove temporary output file"
                );
            }
        }
    }
}

/// Command line ready to execute plus its scoped output file.
#[derive(Debug)]
pub struct PreparedCommand {
    line: CommandLine,
    output: Option<RunOutput>,
}

impl PreparedCommand {
    /// Command line to execute.
    #[must_use]
    pub const fn line(&self) -> &CommandLine {
        &self.line
    }

    /// Output file of a run.
    #[must_use]
    pub const fn output(&self) -> Option<&RunOutput> {
        self.output.as_ref()
    }

    /// Splits the command into its line and output.
    #[must_use]
    pub fn into_parts(self) -> (CommandLine, Option<RunOutput>) {
        (self.line, self.output)
    }
}

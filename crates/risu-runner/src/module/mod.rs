//! Orchestration of one RISU invocation.
//!
//! [`RisuModule`] dispatches on [`State`]: it resolves the executable,
//! builds the command, runs it through the [`CommandExecutor`] seam and folds
//! everything it learns into a [`ModuleResult`]. Every error path ends in a
//! [`ModuleFailure`] carrying the message, hint and whatever fields were
//! gathered; nothing propagates to the caller as a bare error.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::args::{ModuleArgs, State};
use crate::command::{CommandLine, CommandPlan, RunOutput};
use crate::error::ModuleError;
use crate::job::JobTracker;
use crate::parser::{parse_listing, parse_result_file};
use crate::process::{CommandExecutor, ExecutionResult, ProcessError};
use crate::resolver::ExecutableResolver;
use crate::result::{ModuleFailure, ModuleResult, ResultFields};

const MODULE_TARGET: &str = "risu_runner::module";

/// Default directory for async job status files.
pub const DEFAULT_JOB_DIR: &str = "/tmp";

/// Message reported by a check-mode run.
pub const CHECK_MODE_MSG: &str = "Would run RISU diagnostics";

/// Suffix of result files that are parsed back.
const JSON_SUFFIX: &str = ".json";

type Outcome = Result<ResultFields, ModuleFailure>;

fn fail(error: &ModuleError, fields: Option<ResultFields>) -> ModuleFailure {
    warn!(
        target: MODULE_TARGET,
        error = %error,
        "module invocation failed"
    );
    ModuleFailure::new(error, fields)
}

/// Runs RISU operations on behalf of an automation caller.
#[derive(Debug, Clone)]
pub struct RisuModule<E> {
    executor: E,
    resolver: ExecutableResolver,
    job_dir: PathBuf,
}

impl<E: CommandExecutor> RisuModule<E> {
    /// Creates a module running commands through `executor`.
    #[must_use]
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            resolver: ExecutableResolver::new(),
            job_dir: PathBuf::from(DEFAULT_JOB_DIR),
        }
    }

    /// Replaces the directory job status files are written to.
    #[must_use]
    pub fn with_job_dir(mut self, job_dir: impl Into<PathBuf>) -> Self {
        self.job_dir = job_dir.into();
        self
    }

    /// Replaces the executable resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: ExecutableResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Directory job status files are written to.
    #[must_use]
    pub fn job_dir(&self) -> &Path {
        &self.job_dir
    }

    /// Performs the operation selected by `args`.
    pub fn run(&self, args: &ModuleArgs) -> ModuleResult {
        info!(
            target: MODULE_TARGET,
            state = %args.state,
            risu_path = %args.risu_path,
            check_mode = args.check_mode,
            "module invocation started"
        );

        let outcome = match args.state {
            State::Validate => self.validate(args),
            State::List => self.list(args),
            State::Run => self.run_diagnostics(args),
        };

        if let Ok(fields) = &outcome {
            info!(
                target: MODULE_TARGET,
                state = %args.state,
                rc = fields.rc,
                changed = fields.changed,
                "module invocation finished"
            );
        }
        ModuleResult::from(outcome)
    }

    fn resolve(&self, args: &ModuleArgs) -> Result<PathBuf, ModuleFailure> {
        self.resolver
            .resolve(&args.risu_path)
            .map_err(|error| fail(&error, None))
    }

    fn execute(
        &self,
        args: &ModuleArgs,
        line: &CommandLine,
    ) -> Result<ExecutionResult, ModuleError> {
        self.executor
            .execute(line, args.execution_timeout())
            .map_err(|source| match source {
                ProcessError::TimedOut { timeout_secs, .. } => ModuleError::Timeout {
                    operation: args.state,
                    timeout_secs,
                },
                other => ModuleError::Execution {
                    operation: args.state,
                    source: other,
                },
            })
    }

    fn command_line(args: &ModuleArgs, program: &Path) -> Result<CommandLine, ModuleFailure> {
        let (line, _output) = CommandPlan::build(args, program)
            .prepare()
            .map_err(|error| fail(&error, None))?
            .into_parts();
        Ok(line)
    }

    fn validate(&self, args: &ModuleArgs) -> Outcome {
        let program = self.resolve(args)?;
        let line = Self::command_line(args, &program)?;
        let execution = self
            .execute(args, &line)
            .map_err(|error| fail(&error, None))?;

        let mut fields = ResultFields::from_execution(&execution);
        if !execution.success() {
            return Err(fail(
                &ModuleError::ValidationFailed { rc: execution.rc() },
                Some(fields),
            ));
        }

        let version = execution
            .stdout()
            .trim()
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_owned();
        fields.msg = Some(format!("RISU is installed and working: {version}"));
        fields.risu_version = Some(version);
        Ok(fields)
    }

    fn list(&self, args: &ModuleArgs) -> Outcome {
        let program = self.resolve(args)?;
        let line = Self::command_line(args, &program)?;
        let execution = self
            .execute(args, &line)
            .map_err(|error| fail(&error, None))?;

        let mut fields = ResultFields::from_execution(&execution);
        let listing = parse_listing(execution.stdout());
        let empty = listing.is_empty();
        info!(
            target: MODULE_TARGET,
            plugin_count = listing.len(),
            rc = execution.rc(),
            "plugin listing parsed"
        );
        fields.set_listing(listing);

        if !execution.success() && empty {
            return Err(fail(
                &ModuleError::ListingFailed { rc: execution.rc() },
                Some(fields),
            ));
        }
        Ok(fields)
    }

    fn run_diagnostics(&self, args: &ModuleArgs) -> Outcome {
        let program = self.resolve(args)?;
        let plan = CommandPlan::build(args, &program);
        let mut tracker = args
            .tracked_job_id()
            .map(|job_id| JobTracker::new(&self.job_dir, job_id))
            .transpose()
            .map_err(|error| fail(&error, None))?;

        if args.check_mode {
            let cmd = plan.preview();
            info!(target: MODULE_TARGET, cmd = %cmd, "check mode, not running RISU");
            return Ok(ResultFields {
                msg: Some(String::from(CHECK_MODE_MSG)),
                cmd: Some(cmd),
                ..ResultFields::default()
            });
        }

        let (line, output) = plan
            .prepare()
            .map_err(|error| fail(&error, None))?
            .into_parts();

        if let Some(tracker) = tracker.as_mut() {
            tracker.start().map_err(|error| fail(&error, None))?;
        }

        let execution = self.execute(args, &line).map_err(|error| {
            let failure = fail(&error, None);
            match tracker.as_ref() {
                Some(tracker) => failure.with_job(tracker.job_id(), tracker.path()),
                None => failure,
            }
        })?;

        let mut fields = ResultFields::from_execution(&execution);
        if let Some(tracker) = tracker.as_ref() {
            fields.job_id = Some(tracker.job_id().to_owned());
            fields.job_file = Some(tracker.path().to_path_buf());
        }

        let explicit_output = output
            .as_ref()
            .and_then(RunOutput::explicit)
            .map(Path::to_path_buf);
        if let Some(output) = output {
            collect_results(&output, &mut fields);
            output.release();
        }

        if let Some(tracker) = tracker.as_ref() {
            tracker
                .complete(execution.rc(), explicit_output.as_deref())
                .map_err(|error| fail(&error, Some(fields.clone())))?;
        }

        Ok(fields)
    }
}

/// Reads the run's result file into `fields`.
///
/// Problems with the file are recorded as warnings.
fn collect_results(output: &RunOutput, fields: &mut ResultFields) {
    let path = output.path();
    if !path.exists() {
        info!(
            target: MODULE_TARGET,
            path = %path.display(),
            "RISU wrote no result file"
        );
        return;
    }

    fields.output_file = Some(path.to_path_buf());

    if !path.as_os_str().to_string_lossy().ends_with(JSON_SUFFIX) {
        return;
    }

    match parse_result_file(path) {
        Ok(parsed) => {
            let (document, summary) = parsed.into_parts();
            fields.changed = summary.has_failures();
            fields.summary = Some(summary);
            fields.results = Some(document);
        }
        Err(error) => {
            warn!(
                target: MODULE_TARGET,
                path = %path.display(),
                error = %error,
                "result file could not be parsed"
            );
            fields.warnings.push(error.to_string());
        }
    }
}

#[cfg(test)]
mod tests;

//! Orchestration of the RISU diagnostics tool for automation callers.
//!
//! The `risu-runner` crate drives a single request/response cycle against an
//! installed RISU executable. A caller hands over a [`ModuleArgs`] record and
//! receives a [`ModuleResult`]; nothing escapes as a panic or a bare error.
//!
//! # Architecture
//!
//! An invocation flows through the components leaves-first:
//!
//! 1. [`resolver`] locates the executable on `PATH` or the file system.
//! 2. [`command`] turns the arguments into a [`CommandPlan`] and, when the run
//!    is real, prepares output directories or a scoped temporary result file.
//! 3. [`process`] spawns the child with a wall-clock bound and captures its
//!    output through the [`CommandExecutor`] seam.
//! 4. [`parser`] extracts plugin records from listing output and classifies
//!    per-plugin return codes from the JSON result file.
//! 5. [`job`] writes the async status file polled by a separate process.
//! 6. [`module`] ties these together and assembles the final result.
//!
//! # Example
//!
//! ```rust,no_run
//! use risu_runner::{ModuleArgs, ProcessExecutor, RisuModule, State};
//!
//! let mut args = ModuleArgs::new(State::Run);
//! args.filter = Some(String::from("security"));
//! args.check_mode = true;
//!
//! let module = RisuModule::new(ProcessExecutor);
//! let result = module.run(&args);
//! println!("{}", serde_json::to_string(&result).unwrap_or_default());
//! ```

pub mod args;
pub mod command;
pub mod error;
pub mod job;
pub mod module;
pub mod parser;
pub mod process;
pub mod resolver;
pub mod result;

#[cfg(test)]
mod tests;

pub use self::args::{ModuleArgs, OutputFormat, State};
pub use self::command::{CommandLine, CommandPlan, OutputTarget, PreparedCommand};
pub use self::error::ModuleError;
pub use self::job::{JobReadError, JobState, JobStatus, JobTracker};
pub use self::module::RisuModule;
pub use self::parser::{
    DiagnosticOutcome, OutcomeClass, PluginListing, PluginRecord, ResultDocument, RunSummary,
};
pub use self::process::{CommandExecutor, ExecutionResult, ProcessError, ProcessExecutor};
pub use self::resolver::ExecutableResolver;
pub use self::result::{ModuleFailure, ModuleResult, ResultFields};

//! Unit tests for the orchestrator.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mockall::mock;
use rstest::{fixture, rstest};
use serde_json::json;
use tempfile::TempDir;

use super::*;
use crate::args::OutputFormat;
use crate::job::JobState;

mock! {
    Executor {}
    impl CommandExecutor for Executor {
        fn execute(
            &self,
            command: &CommandLine,
            timeout: Duration,
        ) -> Result<ExecutionResult, ProcessError>;
    }
}

const FAILING_RESULTS: &str =
    r#"{"results": {"p1": {"result": {"rc": 0}}, "p2": {"result": {"rc": 25}}}}"#;

struct Sandbox {
    dir: TempDir,
    risu: PathBuf,
}

impl Sandbox {
    fn args(&self, state: State) -> ModuleArgs {
        let mut args = ModuleArgs::new(state);
        args.risu_path = self.risu.to_string_lossy().into_owned();
        args
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    fn module(&self, executor: MockExecutor) -> RisuModule<MockExecutor> {
        RisuModule::new(executor).with_job_dir(self.dir.path())
    }
}

#[fixture]
fn sandbox() -> Sandbox {
    let dir = TempDir::new().expect("temp dir");
    let risu = dir.path().join("risu");
    fs::write(&risu, "#!/bin/sh\n").expect("write fake risu");
    Sandbox { dir, risu }
}

fn argv(command: &CommandLine) -> Vec<String> {
    command
        .args()
        .iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}

fn output_argument(command: &CommandLine) -> PathBuf {
    let args = argv(command);
    let position = args
        .iter()
        .position(|arg| arg == "--output")
        .expect("--output flag");
    PathBuf::from(args.get(position + 1).expect("output path"))
}

fn executor_returning(rc: i32, stdout: &'static str, stderr: &'static str) -> MockExecutor {
    let mut executor = MockExecutor::new();
    executor.expect_execute().once().returning(move |_, _| {
        Ok(ExecutionResult::new(
            rc,
            stdout,
            stderr,
            Duration::from_millis(120),
        ))
    });
    executor
}

fn executor_failing(error: ProcessError) -> MockExecutor {
    let mut executor = MockExecutor::new();
    executor
        .expect_execute()
        .once()
        .returning(move |_, _| Err(error.clone()));
    executor
}

fn timed_out(timeout_secs: u64) -> ProcessError {
    ProcessError::TimedOut {
        program: PathBuf::from("risu"),
        timeout_secs,
    }
}

/// Executor that writes `content` to the `--output` path and records it.
fn executor_writing(content: &'static str, seen: Arc<Mutex<Option<PathBuf>>>) -> MockExecutor {
    let mut executor = MockExecutor::new();
    executor.expect_execute().once().returning(move |command, _| {
        let output = output_argument(command);
        fs::write(&output, content).expect("write result file");
        *seen.lock().expect("lock") = Some(output);
        Ok(ExecutionResult::new(1, "done\n", "", Duration::from_secs(2)))
    });
    executor
}

fn success(result: &ModuleResult) -> &ResultFields {
    match result {
        ModuleResult::Success(fields) => fields,
        ModuleResult::Failure(failure) => panic!("unexpected failure: {}", failure.msg()),
    }
}

fn failure(result: &ModuleResult) -> &ModuleFailure {
    result.failure().expect("expected failure")
}

#[rstest]
fn validate_reports_version(sandbox: Sandbox) {
    let mut executor = MockExecutor::new();
    executor
        .expect_execute()
        .once()
        .withf(|command, timeout| {
            argv(command) == ["--version"] && *timeout == Duration::from_secs(30)
        })
        .returning(|_, _| {
            Ok(ExecutionResult::new(
                0,
                "RISU 3.1.4\nCopyright\n",
                "",
                Duration::from_millis(40),
            ))
        });

    let result = sandbox.module(executor).run(&sandbox.args(State::Validate));
    let fields = success(&result);
    assert_eq!(fields.risu_version.as_deref(), Some("RISU 3.1.4"));
    assert_eq!(
        fields.msg.as_deref(),
        Some("RISU is installed and working: RISU 3.1.4")
    );
    assert!(!fields.changed);
}

#[rstest]
fn validate_nonzero_rc_fails_with_output(sandbox: Sandbox) {
    let executor = executor_returning(2, "", "traceback");
    let result = sandbox.module(executor).run(&sandbox.args(State::Validate));

    let failure = failure(&result);
    assert_eq!(failure.msg(), "RISU validation failed");
    let fields = failure.fields().expect("partial fields");
    assert_eq!(fields.rc, 2);
    assert_eq!(fields.stderr, "traceback");
}

#[rstest]
fn validate_timeout_uses_fixed_bound(sandbox: Sandbox) {
    let executor = executor_failing(timed_out(30));
    let mut args = sandbox.args(State::Validate);
    args.timeout = 5;

    let result = sandbox.module(executor).run(&args);
    let failure = failure(&result);
    assert_eq!(failure.msg(), "RISU validation timed out after 30 seconds");
    assert_eq!(failure.elapsed(), Some(30.0));
    assert_eq!(failure.hint(), None);
}

#[rstest]
#[case::validate(State::Validate)]
#[case::list(State::List)]
#[case::run(State::Run)]
fn missing_executable_never_spawns(sandbox: Sandbox, #[case] state: State) {
    let mut args = sandbox.args(state);
    args.risu_path = sandbox.path("nowhere/risu").to_string_lossy().into_owned();

    let result = sandbox.module(MockExecutor::new()).run(&args);
    let failure = failure(&result);
    assert_eq!(failure.risu_path(), Some(args.risu_path.as_str()));
    assert!(failure.msg().contains(&args.risu_path));
    assert!(failure.hint().is_some_and(|hint| hint.contains("risu_path")));
}

#[rstest]
fn list_counts_plugin_lines_only(sandbox: Sandbox) {
    let mut executor = MockExecutor::new();
    executor
        .expect_execute()
        .once()
        .withf(|command, timeout| {
            argv(command)
                == [
                    "--list-plugins",
                    "--list-categories",
                    "--description",
                    "-i",
                    "security",
                    "-q",
                ]
                && *timeout == Duration::from_secs(300)
        })
        .returning(|_, _| {
            Ok(ExecutionResult::new(
                0,
                "{\"plugin\": \"/a/b.sh\", \"category\": \"security\"}\nnot-a-plugin-line\n",
                "",
                Duration::from_millis(80),
            ))
        });
    let mut args = sandbox.args(State::List);
    args.filter = Some(String::from("security"));

    let result = sandbox.module(executor).run(&args);
    let fields = success(&result);
    assert_eq!(fields.plugin_count, Some(1));
    let value = serde_json::to_value(&result).expect("encode");
    assert_eq!(value["plugins_by_category"], json!({"security": 1}));
    assert_eq!(value["plugins"][0]["plugin"], "/a/b.sh");
}

#[rstest]
fn list_failure_without_plugins(sandbox: Sandbox) {
    let executor = executor_returning(1, "permission denied\n", "");
    let result = sandbox.module(executor).run(&sandbox.args(State::List));

    let failure = failure(&result);
    assert_eq!(failure.msg(), "Failed to list plugins");
    assert_eq!(failure.hint(), Some("Check RISU installation and permissions"));
    assert_eq!(failure.fields().and_then(|fields| fields.plugin_count), Some(0));
}

#[rstest]
fn list_nonzero_rc_with_plugins_succeeds(sandbox: Sandbox) {
    let executor = executor_returning(3, "{'plugin': '/a.sh'}\n", "warning");
    let result = sandbox.module(executor).run(&sandbox.args(State::List));

    let fields = success(&result);
    assert_eq!(fields.rc, 3);
    assert_eq!(fields.plugin_count, Some(1));
}

#[rstest]
fn list_timeout_carries_hint(sandbox: Sandbox) {
    let executor = executor_failing(timed_out(7));
    let mut args = sandbox.args(State::List);
    args.timeout = 7;

    let result = sandbox.module(executor).run(&args);
    let failure = failure(&result);
    assert_eq!(failure.msg(), "Plugin listing timed out after 7 seconds");
    assert_eq!(failure.timeout(), Some(7));
    assert_eq!(
        failure.hint(),
        Some("Increase timeout or use filter to reduce scope")
    );
}

#[rstest]
fn run_with_temporary_output_summarises_and_cleans_up(sandbox: Sandbox) {
    let seen = Arc::new(Mutex::new(None));
    let executor = executor_writing(FAILING_RESULTS, Arc::clone(&seen));

    let result = sandbox.module(executor).run(&sandbox.args(State::Run));
    let fields = success(&result);
    let summary = fields.summary.expect("summary");
    assert_eq!(summary.total_plugins, 2);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.failed, 1);
    assert!(fields.changed);
    assert_eq!(fields.rc, 1);
    assert!(fields.results.is_some());

    let temporary = seen.lock().expect("lock").clone().expect("output path");
    assert_eq!(fields.output_file.as_deref(), Some(temporary.as_path()));
    assert!(!temporary.exists(), "temporary result file must be removed");
}

#[rstest]
fn run_with_explicit_json_output_keeps_file(sandbox: Sandbox) {
    let seen = Arc::new(Mutex::new(None));
    let executor = executor_writing(
        r#"{"results": {"p1": {"result": {"rc": 10}}}}"#,
        Arc::clone(&seen),
    );
    let output = sandbox.path("reports/scan.json");
    let mut args = sandbox.args(State::Run);
    args.output = Some(output.clone());

    let result = sandbox.module(executor).run(&args);
    let fields = success(&result);
    assert_eq!(fields.output_file.as_deref(), Some(output.as_path()));
    assert!(!fields.changed);
    assert_eq!(fields.summary.map(|summary| summary.passed), Some(1));
    assert!(output.exists());
}

#[rstest]
fn run_with_bare_json_file_name_is_parsed(sandbox: Sandbox) {
    let seen = Arc::new(Mutex::new(None));
    let executor = executor_writing(FAILING_RESULTS, Arc::clone(&seen));
    let output = sandbox.path(".json");
    let mut args = sandbox.args(State::Run);
    args.output = Some(output.clone());

    let result = sandbox.module(executor).run(&args);
    let fields = success(&result);
    assert_eq!(fields.output_file.as_deref(), Some(output.as_path()));
    assert_eq!(fields.summary.map(|summary| summary.total_plugins), Some(2));
}

#[rstest]
fn run_with_html_output_is_not_parsed(sandbox: Sandbox) {
    let seen = Arc::new(Mutex::new(None));
    let executor = executor_writing("<html></html>", Arc::clone(&seen));
    let output = sandbox.path("scan.html");
    let mut args = sandbox.args(State::Run);
    args.output = Some(output.clone());
    args.output_format = OutputFormat::Html;

    let result = sandbox.module(executor).run(&args);
    let fields = success(&result);
    assert_eq!(fields.output_file.as_deref(), Some(output.as_path()));
    assert!(fields.summary.is_none());
    assert!(fields.warnings.is_empty());
}

#[rstest]
fn run_with_unparseable_results_warns(sandbox: Sandbox) {
    let seen = Arc::new(Mutex::new(None));
    let executor = executor_writing("{truncated", Arc::clone(&seen));

    let result = sandbox.module(executor).run(&sandbox.args(State::Run));
    let fields = success(&result);
    assert!(fields.summary.is_none());
    assert!(fields.results.is_none());
    assert_eq!(fields.warnings.len(), 1);
    assert!(
        fields
            .warnings
            .first()
            .is_some_and(|warning| warning.starts_with("Failed to parse JSON output"))
    );
}

#[rstest]
fn run_without_result_file_still_succeeds(sandbox: Sandbox) {
    let mut executor = MockExecutor::new();
    executor.expect_execute().once().returning(|command, _| {
        fs::remove_file(output_argument(command)).expect("remove temporary");
        Ok(ExecutionResult::new(0, "", "", Duration::ZERO))
    });

    let result = sandbox.module(executor).run(&sandbox.args(State::Run));
    let fields = success(&result);
    assert!(fields.summary.is_none());
    assert!(fields.warnings.is_empty());
}

#[rstest]
fn check_mode_touches_nothing(sandbox: Sandbox) {
    let output = sandbox.path("var/log/risu/scan.json");
    let mut args = sandbox.args(State::Run);
    args.check_mode = true;
    args.output = Some(output.clone());
    args.async_mode = true;
    args.job_id = Some(String::from("dry"));

    let result = sandbox.module(MockExecutor::new()).run(&args);
    let fields = success(&result);
    assert_eq!(fields.msg.as_deref(), Some(CHECK_MODE_MSG));
    assert_eq!(
        fields.cmd.as_deref(),
        Some(format!("{} -l -q --output {}", sandbox.risu.display(), output.display()).as_str())
    );
    assert!(!sandbox.path("var").exists());
    assert!(!sandbox.path("risu-job-dry.status").exists());
}

#[rstest]
fn async_run_tracks_job_status(sandbox: Sandbox) {
    let status_path = sandbox.path("risu-job-abc.status");
    let observed = status_path.clone();
    let mut executor = MockExecutor::new();
    executor.expect_execute().once().returning(move |_, _| {
        let running = JobTracker::read(&observed).expect("running status");
        assert_eq!(running.status, JobState::Running);
        Ok(ExecutionResult::new(0, "", "", Duration::from_secs(1)))
    });
    let mut args = sandbox.args(State::Run);
    args.async_mode = true;
    args.job_id = Some(String::from("abc"));

    let result = sandbox.module(executor).run(&args);
    let fields = success(&result);
    assert_eq!(fields.job_id.as_deref(), Some("abc"));
    assert_eq!(fields.job_file.as_deref(), Some(status_path.as_path()));

    let completed = JobTracker::read(&status_path).expect("completed status");
    assert_eq!(completed.status, JobState::Completed);
    assert_eq!(completed.rc, Some(0));
    assert_eq!(completed.output_file, None);
}

#[rstest]
fn job_id_without_async_mode_is_ignored(sandbox: Sandbox) {
    let executor = executor_returning(0, "", "");
    let mut args = sandbox.args(State::Run);
    args.job_id = Some(String::from("abc"));

    let result = sandbox.module(executor).run(&args);
    assert!(success(&result).job_id.is_none());
    assert!(!sandbox.path("risu-job-abc.status").exists());
}

#[rstest]
fn invalid_job_id_fails_before_spawning(sandbox: Sandbox) {
    let mut args = sandbox.args(State::Run);
    args.async_mode = true;
    args.job_id = Some(String::from("../escape"));

    let result = sandbox.module(MockExecutor::new()).run(&args);
    assert!(failure(&result).msg().contains("../escape"));
}

#[rstest]
fn timeout_leaves_job_running(sandbox: Sandbox) {
    let executor = executor_failing(timed_out(300));
    let mut args = sandbox.args(State::Run);
    args.async_mode = true;
    args.job_id = Some(String::from("slow"));

    let result = sandbox.module(executor).run(&args);
    let failure = failure(&result);
    assert_eq!(failure.msg(), "RISU execution timed out after 300 seconds");
    assert_eq!(failure.elapsed(), Some(300.0));
    assert_eq!(failure.job_id(), Some("slow"));
    assert_eq!(
        failure.job_file(),
        Some(sandbox.path("risu-job-slow.status").as_path())
    );
    assert!(failure.fields().is_none());

    let value = serde_json::to_value(&result).expect("encode");
    for absent in ["rc", "stdout", "stderr"] {
        assert!(value.get(absent).is_none(), "{absent} present in {value}");
    }
    assert_eq!(value["job_id"], "slow");

    let status = JobTracker::read(&sandbox.path("risu-job-slow.status")).expect("status");
    assert_eq!(status.status, JobState::Running);
}

#[rstest]
fn spawn_failure_is_reported(sandbox: Sandbox) {
    let executor = executor_failing(ProcessError::Spawn {
        program: sandbox.risu.clone(),
        source: Arc::new(std::io::Error::from(std::io::ErrorKind::PermissionDenied)),
    });

    let result = sandbox.module(executor).run(&sandbox.args(State::Run));
    let failure = failure(&result);
    assert!(
        failure.msg().starts_with("Failed to run diagnostics: failed to start"),
        "{}",
        failure.msg()
    );
}

#[rstest]
fn output_directory_failure_is_reported(sandbox: Sandbox) {
    let blocker = sandbox.path("blocker");
    fs::write(&blocker, "file").expect("write blocker");
    let mut args = sandbox.args(State::Run);
    args.output = Some(blocker.join("nested/scan.json"));

    let result = sandbox.module(MockExecutor::new()).run(&args);
    assert!(
        failure(&result)
            .msg()
            .starts_with("Failed to create output directory")
    );
}

#[test]
fn default_job_dir_is_tmp() {
    let module = RisuModule::new(MockExecutor::new());
    assert_eq!(module.job_dir(), Path::new("/tmp"));
}

//! Entry point for the `risu-module` binary.
//!
//! Delegates to [`risu_cli::run`], which loads configuration, installs
//! telemetry, runs the requested RISU operation and writes the JSON result to
//! stdout.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    risu_cli::run(std::env::args_os(), &mut stdin, &mut stdout, &mut stderr)
}

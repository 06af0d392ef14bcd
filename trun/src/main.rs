// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `trun <command> [args...]`
//!
//! A thin CLI shell over [`trun_runner::orchestrator`]. Argument parsing is
//! deliberately minimal: everything after the binary name is the command to
//! run, unmodified, with no flags of its own to collide with the child's.

use camino::Utf8PathBuf;
use trun_runner::orchestrator;
use trun_runner::registry::Invocation;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("TRUN_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("usage: trun <command> [args...]");
        std::process::exit(2);
    }

    let cwd = match std::env::current_dir() {
        Ok(path) => match Utf8PathBuf::try_from(path) {
            Ok(path) => path,
            Err(error) => {
                eprintln!("error: current directory is not valid UTF-8: {error}");
                std::process::exit(1);
            }
        },
        Err(error) => {
            eprintln!("error: failed to read current directory: {error}");
            std::process::exit(1);
        }
    };

    let runtime = tokio::runtime::Runtime::new().expect("failed to start tokio runtime");
    let outcome = runtime.block_on(orchestrator::run(Invocation::new(args), cwd));

    match outcome {
        Ok(outcome) => std::process::exit(outcome.exit_code),
        Err(error) => {
            eprintln!("trun: {error}");
            std::process::exit(1);
        }
    }
}

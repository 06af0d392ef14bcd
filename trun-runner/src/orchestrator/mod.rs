// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The run lifecycle: detect a runner, stand up the run directory and
//! event channel, spawn the child, ingest its events concurrently with its
//! stdio, and finalize the report tree.
//!
//! Shutdown discipline matters here as much as in
//! [`crate::channel::ChannelReader`]: events must keep draining for a
//! window after the child exits (see that module's docs), and the report
//! tree's authoritative final write must happen strictly after every event
//! has been applied to the group store, not on a timer racing it.

mod dispatcher;

use crate::channel::{self, ChannelReader};
use crate::config::Settings;
use crate::console::FinalSummary;
use crate::errors::{ChannelError, RunnerError};
use crate::group::{GroupStatus, GroupStore};
use crate::registry::{Invocation, NativeStreamParser, ProjectMetadata, Registry};
use crate::report::{ReportWriter, RunStatus};
use crate::run_id::RunId;
use crate::signal::{self, ShutdownReason};
use camino::Utf8PathBuf;
use chrono::Utc;
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use trun_metadata::Event;

/// Below this many discovered groups, a non-zero child exit is classified
/// as a configuration/startup error rather than "tests failed": the child
/// never got far enough to report anything meaningful.
const STARTUP_ERROR_GROUP_THRESHOLD: usize = 1;

/// How many non-empty lines from the combined stdio log get surfaced as
/// the startup error banner and recorded in the run index.
const STARTUP_ERROR_LINE_COUNT: usize = 20;

/// The filename of the combined child stdio log, per the run directory
/// layout.
const OUTPUT_LOG_FILE_NAME: &str = "output.log";

/// The outcome of a completed run: the exit code the `trun` binary should
/// use, mirroring the child's own code unless shutdown preempted it.
pub struct RunOutcome {
    pub exit_code: i32,
}

enum WaitOutcome {
    Exited(std::process::ExitStatus),
    Signalled(ShutdownReason),
}

/// Runs one full invocation: detect, spawn, ingest, report.
///
/// `cwd` is both the directory runner detection reads project manifests
/// from and the parent of the `.3pio` run directory tree.
pub async fn run(invocation: Invocation, cwd: Utf8PathBuf) -> Result<RunOutcome, RunnerError> {
    let project = ProjectMetadata::load(&cwd);
    let registry = Registry::standard();
    let definition = registry.detect(&invocation, &project)?;
    tracing::info!(runner = definition.name(), "detected runner");

    let settings = Settings::load(&cwd);
    let run_id = RunId::generate();
    let run_dir = cwd.join(".3pio").join("runs").join(run_id.as_str());
    tokio::fs::create_dir_all(&run_dir)
        .await
        .map_err(|error| RunnerError::CreateRunDir {
            path: run_dir.clone(),
            error,
        })?;

    let adapter_path = match definition.adapter() {
        Some(adapter) => {
            let adapters_dir = run_dir.join("adapters");
            tokio::fs::create_dir_all(&adapters_dir)
                .await
                .map_err(|error| RunnerError::AdapterExtraction {
                    adapter: adapter.file_name,
                    path: adapters_dir.clone(),
                    error,
                })?;
            let path = adapters_dir.join(adapter.file_name);
            tokio::fs::write(&path, adapter.contents)
                .await
                .map_err(|error| RunnerError::AdapterExtraction {
                    adapter: adapter.file_name,
                    path: path.clone(),
                    error,
                })?;
            Some(path)
        }
        None => None,
    };

    let channel_path = run_dir.join(channel::CHANNEL_FILE_NAME);
    tokio::fs::File::create(&channel_path)
        .await
        .map_err(|error| {
            RunnerError::Channel(ChannelError::Create {
                path: channel_path.clone(),
                error,
            })
        })?;

    let argv = definition.rewrite_command(&invocation, &project, adapter_path.as_deref());
    let (program, args) = argv.split_first().expect("invocation is never empty");

    let mut command = tokio::process::Command::new(program);
    command
        .args(args)
        .current_dir(&cwd)
        .stdin(std::process::Stdio::inherit())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .env(channel::CHANNEL_PATH_ENV, channel_path.as_str())
        .env(channel::DEBUG_LEVEL_ENV, &settings.debug_level);
    for (key, value) in definition.extra_env_vars() {
        command.env(key, value);
    }

    let mut child = command.spawn().map_err(|error| RunnerError::ChildSpawn {
        command: argv.clone(),
        error,
    })?;

    let output_log_path = run_dir.join(OUTPUT_LOG_FILE_NAME);
    let output_log = File::create(&output_log_path)
        .await
        .map_err(|error| RunnerError::CreateOutputLog {
            path: output_log_path.clone(),
            error,
        })?;

    let store = GroupStore::new();
    let (event_tx, event_rx) = mpsc::channel::<Event>(channel::DISPATCH_CHANNEL_CAPACITY);
    let (dirty_tx, dirty_rx) = mpsc::channel::<()>(1);

    let dispatcher_handle = tokio::spawn(dispatcher::run(
        store.clone(),
        event_rx,
        dirty_tx,
        run_dir.clone(),
    ));

    let start = Instant::now();
    let writer = ReportWriter::new(
        run_dir.clone(),
        run_id.clone(),
        argv.clone(),
        store.clone(),
        &settings,
    );
    let writer_handle = tokio::spawn(async move {
        writer.run(dirty_rx, || (RunStatus::Running, start.elapsed())).await;
        writer
    });

    // For an adapter-based runner, events arrive solely via the event
    // channel file; for a native-stream runner, we parse the child's own
    // stdout directly and there is no channel reader task at all.
    let channel_task = if definition.native_parser().is_none() {
        let reader = ChannelReader::open(&channel_path).await?;
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let tx = event_tx.clone();
        let handle = tokio::spawn(async move { reader.run(tx, shutdown_rx).await });
        Some((handle, shutdown_tx))
    } else {
        None
    };

    let stdout = child.stdout.take().expect("stdout is always piped");
    let stderr = child.stderr.take().expect("stderr is always piped");
    let tx = event_tx.clone();
    let native_parser = definition.native_parser();
    let stdio_task = tokio::spawn(run_stdio_capture(stdout, stderr, output_log, tx, native_parser));

    drop(event_tx);

    let outcome = tokio::select! {
        biased;
        reason = signal::wait_for_shutdown() => WaitOutcome::Signalled(reason),
        status = child.wait() => WaitOutcome::Exited(status.map_err(RunnerError::ChildWait)?),
    };

    let (shutdown_reason, exit_status) = match outcome {
        WaitOutcome::Signalled(reason) => {
            let _ = child.start_kill();
            let deadline = tokio::time::Instant::now() + reason.deadline();
            let status = tokio::time::timeout_at(deadline, child.wait())
                .await
                .ok()
                .and_then(|r| r.ok());
            (Some(reason), status)
        }
        WaitOutcome::Exited(status) => (None, Some(status)),
    };

    if let Some((handle, shutdown_tx)) = channel_task {
        let _ = shutdown_tx.send(());
        let _ = handle.await;
    }
    let _ = stdio_task.await;

    dispatcher_handle
        .await
        .map_err(|_| RunnerError::ChildWait(std::io::Error::other("dispatcher task panicked")))?;
    let writer = writer_handle
        .await
        .map_err(|_| RunnerError::ChildWait(std::io::Error::other("report writer task panicked")))?;

    let exit_code = match shutdown_reason {
        Some(reason) => reason.exit_code(),
        None => exit_status.and_then(|status| status.code()).unwrap_or(1),
    };

    let error_details = if shutdown_reason.is_none() && exit_code != 0 {
        classify_startup_error(&store, &output_log_path).await
    } else {
        None
    };

    let final_status = final_run_status(&store, shutdown_reason, error_details.is_some());
    writer
        .write_all(final_status, start.elapsed(), Utc::now(), error_details.as_deref())
        .await?;

    if let Some(details) = &error_details {
        eprintln!("Error: {details}");
    }
    print_final_summary(&store, start.elapsed());

    Ok(RunOutcome { exit_code })
}

/// Reads both stdio streams concurrently: every line (from either stream)
/// is appended to the combined `output.log`, in receipt order. Native-
/// stream runners additionally get their stdout lines fed to the parser as
/// they arrive, and the parser's synthesized events (from `finish`) are
/// sent through the same `tx` clone this task owns, guaranteeing delivery
/// before that sender drops.
async fn run_stdio_capture(
    stdout: tokio::process::ChildStdout,
    stderr: tokio::process::ChildStderr,
    mut log: File,
    tx: mpsc::Sender<Event>,
    mut parser: Option<Box<dyn NativeStreamParser>>,
) {
    let mut out_lines = BufReader::new(stdout).lines();
    let mut err_lines = BufReader::new(stderr).lines();
    let mut stderr_buf = String::new();
    let mut out_done = false;
    let mut err_done = false;

    while !out_done || !err_done {
        tokio::select! {
            line = out_lines.next_line(), if !out_done => {
                match line {
                    Ok(Some(line)) => {
                        let _ = log.write_all(line.as_bytes()).await;
                        let _ = log.write_all(b"\n").await;
                        if let Some(parser) = &mut parser {
                            for event in parser.feed_line(&line) {
                                if tx.send(event).await.is_err() {
                                    out_done = true;
                                    break;
                                }
                            }
                        }
                    }
                    _ => out_done = true,
                }
            }
            line = err_lines.next_line(), if !err_done => {
                match line {
                    Ok(Some(line)) => {
                        let _ = log.write_all(line.as_bytes()).await;
                        let _ = log.write_all(b"\n").await;
                        stderr_buf.push_str(&line);
                        stderr_buf.push('\n');
                    }
                    _ => err_done = true,
                }
            }
        }
    }

    if let Some(mut parser) = parser {
        for event in parser.finish(&stderr_buf) {
            let _ = tx.send(event).await;
        }
    }

    let _ = log.flush().await;
}

/// Classifies a non-zero child exit as a configuration/startup error when
/// the run never got far enough to discover more than a handful of
/// groups, returning the first few non-empty lines of the combined stdio
/// log when so.
async fn classify_startup_error(store: &GroupStore, output_log_path: &Utf8PathBuf) -> Option<String> {
    if store.group_count() >= STARTUP_ERROR_GROUP_THRESHOLD {
        return None;
    }

    let contents = tokio::fs::read_to_string(output_log_path).await.ok()?;
    let lines: Vec<&str> = contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(STARTUP_ERROR_LINE_COUNT)
        .collect();
    if lines.is_empty() {
        return None;
    }
    Some(lines.join("\n"))
}

fn final_run_status(
    store: &GroupStore,
    shutdown_reason: Option<ShutdownReason>,
    is_startup_error: bool,
) -> RunStatus {
    if shutdown_reason.is_some() {
        return RunStatus::Interrupted;
    }
    if is_startup_error {
        return RunStatus::Fail;
    }
    let any_failed = store.root_ids().iter().any(|id| {
        store
            .get_group(id)
            .map(|view| view.rolled_up_status == GroupStatus::Fail)
            .unwrap_or(false)
    });
    if any_failed { RunStatus::Fail } else { RunStatus::Pass }
}

fn print_final_summary(store: &GroupStore, elapsed: Duration) {
    let mut totals = trun_metadata::Totals::default();
    let mut counts_are_cases = false;
    for id in store.root_ids() {
        if let Some(view) = store.get_group(&id) {
            if view.recursive_stats.total > 0 {
                counts_are_cases = true;
            }
            totals.passed += view.recursive_stats.passed;
            totals.failed += view.recursive_stats.failed;
            totals.skipped += view.recursive_stats.skipped;
            totals.total += view.recursive_stats.total;
        }
    }
    if !counts_are_cases {
        totals.total = store.group_count() as u64;
    }
    println!(
        "{}",
        FinalSummary {
            totals,
            counts_are_cases,
            elapsed,
        }
    );
}

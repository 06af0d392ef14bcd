// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end run against a fake runner that crashes before discovering
//! anything: no event ever lands on the channel, only noise on stderr.
//! This exercises the configuration/startup-error classification, as
//! opposed to the "tests failed" path covered by the other two
//! end-to-end tests.

#![cfg(unix)]

use camino::Utf8PathBuf;
use std::os::unix::fs::PermissionsExt;
use trun_runner::orchestrator;
use trun_runner::registry::Invocation;

fn write_fake_pytest(dir: &camino::Utf8Path) -> Utf8PathBuf {
    let path = dir.join("pytest");
    std::fs::write(
        &path,
        r#"#!/bin/sh
echo "ModuleNotFoundError: No module named 'nonexistent_plugin'" >&2
echo "pytest: command line error" >&2
exit 4
"#,
    )
    .unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[tokio::test(flavor = "multi_thread")]
async fn crash_before_discovery_is_a_startup_error() {
    let dir = camino_tempfile::tempdir().unwrap();
    let bin_dir = dir.path().join("bin");
    std::fs::create_dir_all(&bin_dir).unwrap();
    write_fake_pytest(&bin_dir);

    let path_var = format!("{}:{}", bin_dir, std::env::var("PATH").unwrap_or_default());
    // SAFETY: see the equivalent comment in adapter_based_run.rs.
    unsafe {
        std::env::set_var("PATH", &path_var);
    }

    let outcome = orchestrator::run(
        Invocation::new(vec!["pytest".to_string()]),
        dir.path().to_path_buf(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.exit_code, 4);

    let runs_dir = dir.path().join(".3pio").join("runs");
    let run_dir = std::fs::read_dir(&runs_dir)
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    let run_dir = Utf8PathBuf::try_from(run_dir).unwrap();

    let output_log = std::fs::read_to_string(run_dir.join("output.log")).unwrap();
    assert!(output_log.contains("ModuleNotFoundError"));

    let index = std::fs::read_to_string(run_dir.join("test-run.md")).unwrap();
    assert!(index.contains("status: FAIL"));
    assert!(index.contains("## Error"));
    assert!(index.contains("ModuleNotFoundError"));
}

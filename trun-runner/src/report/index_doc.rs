// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rendering for the run's top-level `test-run.md`.

use crate::group::{GroupStatus, GroupStore};
use crate::run_id::RunId;
use camino::Utf8Path;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::time::Duration;

/// Overall lifecycle status of the run itself, independent of any one
/// group's status: whether the child is still running, finished cleanly,
/// or was cut short by a signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Pass,
    Fail,
    Interrupted,
}

impl RunStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Interrupted => "INTERRUPTED",
        }
    }
}

/// Everything [`render`] needs beyond the group store itself, bundled so
/// the function doesn't grow an ever-longer positional argument list as
/// the frontmatter gains fields.
pub struct IndexContext<'a> {
    pub run_id: &'a RunId,
    pub run_path: &'a Utf8Path,
    pub command: &'a [String],
    pub status: RunStatus,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub elapsed: Duration,
    /// Set only when the run is classified as a configuration/startup
    /// error (non-zero exit, no groups ever discovered): the first few
    /// non-empty lines of the combined child stdio log.
    pub error_details: Option<&'a str>,
}

/// Renders the Markdown body for `$trun_dir/test-run.md`.
pub fn render(ctx: &IndexContext<'_>, store: &GroupStore) -> String {
    let mut out = String::new();

    writeln!(out, "---").unwrap();
    writeln!(out, "run_id: {}", ctx.run_id).unwrap();
    writeln!(out, "run_path: {}", ctx.run_path).unwrap();
    writeln!(out, "created: {}", ctx.created.to_rfc3339()).unwrap();
    writeln!(out, "updated: {}", ctx.updated.to_rfc3339()).unwrap();
    writeln!(out, "status: {}", ctx.status.as_str()).unwrap();
    if let Some(error_details) = ctx.error_details {
        writeln!(out, "errorDetails: |").unwrap();
        for line in error_details.lines() {
            writeln!(out, "  {line}").unwrap();
        }
    }
    writeln!(out, "---").unwrap();
    writeln!(out).unwrap();

    writeln!(out, "# Test run {}", ctx.run_id).unwrap();
    writeln!(out).unwrap();
    writeln!(out, "Command: `{}`", ctx.command.join(" ")).unwrap();
    writeln!(out, "Elapsed: {:.2}s", ctx.elapsed.as_secs_f64()).unwrap();
    writeln!(out).unwrap();

    if let Some(error_details) = ctx.error_details {
        writeln!(out, "## Error").unwrap();
        writeln!(out).unwrap();
        writeln!(out, "```\n{error_details}\n```").unwrap();
        writeln!(out).unwrap();
    }

    let roots = store.root_ids();
    let mut completed = 0usize;
    let mut files_passed = 0usize;
    let mut files_failed = 0usize;
    let mut files_skipped = 0usize;
    for root_id in &roots {
        if store.is_complete(root_id) {
            completed += 1;
        }
        if let Some(view) = store.get_group(root_id) {
            match view.rolled_up_status {
                GroupStatus::Pass => files_passed += 1,
                GroupStatus::Fail => files_failed += 1,
                GroupStatus::Skip | GroupStatus::NoTests => files_skipped += 1,
                GroupStatus::Pending | GroupStatus::Running => {}
            }
        }
    }

    writeln!(out, "## Summary").unwrap();
    writeln!(out).unwrap();
    writeln!(out, "- Files: {}", roots.len()).unwrap();
    writeln!(out, "- Completed: {completed}").unwrap();
    writeln!(out, "- Files passed: {files_passed}").unwrap();
    writeln!(out, "- Files failed: {files_failed}").unwrap();
    writeln!(out, "- Files skipped: {files_skipped}").unwrap();
    writeln!(out).unwrap();

    writeln!(out, "## Groups").unwrap();
    writeln!(out).unwrap();
    writeln!(out, "| Group | Status | Report |").unwrap();
    writeln!(out, "|---|---|---|").unwrap();
    for root_id in &roots {
        let Some(view) = store.get_group(root_id) else {
            continue;
        };
        writeln!(
            out,
            "| {} | {} | [reports/{}/index.md](reports/{}/index.md) |",
            view.group.name,
            view.rolled_up_status.as_str(),
            root_id.as_str(),
            root_id.as_str(),
        )
        .unwrap();
    }
    writeln!(out).unwrap();

    out
}

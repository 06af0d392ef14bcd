// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rendering for a single group's `index.md`.

use crate::group::{GroupStatus, GroupStore, GroupView};
use std::fmt::Write as _;
use trun_metadata::CaseStatus;

fn case_status_str(status: CaseStatus) -> &'static str {
    match status {
        CaseStatus::Pass => "PASS",
        CaseStatus::Fail => "FAIL",
        CaseStatus::Skip => "SKIP",
    }
}

/// Renders the Markdown body for one group's report document: its own
/// status and totals, its direct test cases (with failure detail), and
/// links to its child groups' own `index.md` files.
pub fn render(view: &GroupView, store: &GroupStore) -> String {
    let group = &view.group;
    let mut out = String::new();

    writeln!(out, "---").unwrap();
    writeln!(out, "status: {}", view.rolled_up_status.as_str()).unwrap();
    if let Some(start_time) = group.start_time {
        writeln!(out, "start_time: {}", start_time.to_rfc3339()).unwrap();
    }
    if let Some(duration_ms) = group.duration_ms {
        writeln!(out, "duration_ms: {duration_ms}").unwrap();
    }
    writeln!(out, "---").unwrap();
    writeln!(out).unwrap();

    writeln!(out, "# {}", group.name).unwrap();
    writeln!(out).unwrap();
    writeln!(
        out,
        "Status: **{}** ({} passed, {} failed, {} skipped, {} total)",
        view.rolled_up_status.as_str(),
        view.recursive_stats.passed,
        view.recursive_stats.failed,
        view.recursive_stats.skipped,
        view.recursive_stats.total,
    )
    .unwrap();
    if let Some(duration_ms) = group.duration_ms {
        writeln!(out, "Duration: {duration_ms}ms").unwrap();
    }
    writeln!(out).unwrap();

    if group.setup_failed {
        writeln!(out, "## Setup failure").unwrap();
        writeln!(out).unwrap();
        if let Some(error) = &group.error {
            writeln!(out, "{}", error.message).unwrap();
        }
        writeln!(out).unwrap();
    }

    if !group.children.is_empty() {
        writeln!(out, "## Subgroups").unwrap();
        writeln!(out).unwrap();
        writeln!(out, "| Group | Status | Report |").unwrap();
        writeln!(out, "|---|---|---|").unwrap();
        for child_id in &group.children {
            if let Some(child) = store.get_group(child_id) {
                writeln!(
                    out,
                    "| {} | {} | [{}/index.md]({}/index.md) |",
                    child.group.name,
                    child.rolled_up_status.as_str(),
                    child_id.as_str(),
                    child_id.as_str(),
                )
                .unwrap();
            }
        }
        writeln!(out).unwrap();
    }

    if !group.cases.is_empty() {
        writeln!(out, "## Test cases").unwrap();
        writeln!(out).unwrap();
        for case in &group.cases {
            writeln!(
                out,
                "- `{}` — {} ({}ms)",
                case.name,
                case_status_str(case.status),
                case.duration_ms,
            )
            .unwrap();
            if let Some(error) = &case.error {
                writeln!(out).unwrap();
                writeln!(out, "  ```").unwrap();
                for line in error.message.lines() {
                    writeln!(out, "  {line}").unwrap();
                }
                writeln!(out, "  ```").unwrap();
                if let Some(stack) = &error.stack {
                    writeln!(out).unwrap();
                    writeln!(out, "  Stack:").unwrap();
                    writeln!(out, "  ```").unwrap();
                    for line in stack.lines() {
                        writeln!(out, "  {line}").unwrap();
                    }
                    writeln!(out, "  ```").unwrap();
                }
                writeln!(out).unwrap();
            }
        }
        writeln!(out).unwrap();
    }

    if !group.stdout.is_empty() {
        writeln!(out, "## stdout").unwrap();
        writeln!(out).unwrap();
        writeln!(out, "```\n{}\n```", group.stdout).unwrap();
        writeln!(out).unwrap();
    }

    if !group.stderr.is_empty() {
        writeln!(out, "## stderr").unwrap();
        writeln!(out).unwrap();
        writeln!(out, "```\n{}\n```", group.stderr).unwrap();
        writeln!(out).unwrap();
    }

    out
}

/// Whether a group's rolled-up status means it's worth showing on its
/// parent's subgroup list at all during an in-progress run (every group is
/// shown; this exists to keep `Pending` groups visually distinguishable in
/// tests without duplicating the match in two places).
pub fn is_pending(status: GroupStatus) -> bool {
    matches!(status, GroupStatus::Pending)
}

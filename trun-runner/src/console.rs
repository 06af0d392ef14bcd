// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Console output: per-top-level-group completion lines and the final
//! summary.
//!
//! Console output is deliberately thin. Per the design, restricting it to
//! per-group-completion and the final summary (rather than one line per
//! event, or a `RUNNING` line per file) keeps the dispatcher from
//! serializing against the terminal under load.

use crate::group::GroupStatus;
use camino::Utf8Path;
use std::fmt;
use trun_metadata::Totals;

/// A group's completion line, as described in the design: `STATUS_TAGS
/// $trun_dir/reports/<sanitized>/index.md`, printed only for groups that
/// failed or had no tests.
pub struct GroupLine<'a> {
    pub status: GroupStatus,
    pub totals: Totals,
    pub report_path: &'a Utf8Path,
}

impl fmt::Display for GroupLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            GroupStatus::NoTests => write!(f, "NO_TESTS {}", display_run_dir_path(self.report_path)),
            GroupStatus::Pass => Ok(()),
            GroupStatus::Pending | GroupStatus::Running => Ok(()),
            GroupStatus::Fail | GroupStatus::Skip => {
                let tags = StatusTags(self.totals).to_string();
                // A setup failure counts zero cases in every bucket (the
                // naive "count test cases" rollup would otherwise hide a
                // clearly failed group behind an empty tag set), so fall
                // back to the bare status name.
                let tags = if tags.is_empty() {
                    self.status.as_str().to_string()
                } else {
                    tags
                };
                write!(f, "{} {}", tags, display_run_dir_path(self.report_path))
            }
        }
    }
}

/// Whether a group's completion deserves a console line at all: only
/// failures and no-tests groups do, per spec §4.7 ("Passing groups emit
/// nothing").
pub fn should_print(status: GroupStatus) -> bool {
    matches!(status, GroupStatus::Fail | GroupStatus::Skip | GroupStatus::NoTests)
}

/// The ordered `FAIL(n) PASS(n) SKIP(n)` tag set for a group line.
struct StatusTags(Totals);

impl fmt::Display for StatusTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        let mut tag = |f: &mut fmt::Formatter<'_>, name: &str, n: u64| -> fmt::Result {
            if n > 0 {
                if !first {
                    write!(f, " ")?;
                }
                write!(f, "{name}({n})")?;
                first = false;
            }
            Ok(())
        };
        tag(f, "FAIL", self.0.failed)?;
        tag(f, "PASS", self.0.passed)?;
        tag(f, "SKIP", self.0.skipped)?;
        let _ = first;
        Ok(())
    }
}

/// Replaces a report-tree path's run-directory prefix with the
/// `$trun_dir` placeholder used throughout console and report output, per
/// spec §4.6 ("Pathing").
pub fn display_run_dir_path(path: &Utf8Path) -> String {
    format!("$trun_dir/{path}")
}

/// The final summary line: either test-case totals (when the runner
/// reports cases) or group totals (otherwise), followed by wall-clock
/// time.
pub struct FinalSummary {
    pub totals: Totals,
    pub counts_are_cases: bool,
    pub elapsed: std::time::Duration,
}

impl fmt::Display for FinalSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.counts_are_cases { "tests" } else { "groups" };
        write!(
            f,
            "{} passed, {} failed, {} skipped ({} {noun}) in {:.2}s",
            self.totals.passed,
            self.totals.failed,
            self.totals.skipped,
            self.totals.total,
            self.elapsed.as_secs_f64(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    #[test]
    fn passing_group_emits_nothing() {
        let path = Utf8PathBuf::from("reports/abc/index.md");
        let line = GroupLine {
            status: GroupStatus::Pass,
            totals: Totals { passed: 3, failed: 0, skipped: 0, total: 3 },
            report_path: &path,
        };
        assert_eq!(line.to_string(), "");
    }

    #[test]
    fn failing_group_line_matches_spec_format() {
        let path = Utf8PathBuf::from("reports/file-2/index.md");
        let line = GroupLine {
            status: GroupStatus::Fail,
            totals: Totals { passed: 2, failed: 1, skipped: 0, total: 3 },
            report_path: &path,
        };
        assert_eq!(
            line.to_string(),
            "FAIL(1) PASS(2) $trun_dir/reports/file-2/index.md"
        );
    }

    #[test]
    fn setup_failure_with_zero_totals_falls_back_to_bare_status() {
        let path = Utf8PathBuf::from("reports/pkg/index.md");
        let line = GroupLine {
            status: GroupStatus::Fail,
            totals: Totals::default(),
            report_path: &path,
        };
        assert_eq!(line.to_string(), "FAIL $trun_dir/reports/pkg/index.md");
    }

    #[test]
    fn no_tests_group_uses_sentinel() {
        let path = Utf8PathBuf::from("reports/pkg/index.md");
        let line = GroupLine {
            status: GroupStatus::NoTests,
            totals: Totals::default(),
            report_path: &path,
        };
        assert_eq!(line.to_string(), "NO_TESTS $trun_dir/reports/pkg/index.md");
    }

    #[test]
    fn should_print_excludes_pass_and_pending() {
        assert!(!should_print(GroupStatus::Pass));
        assert!(!should_print(GroupStatus::Pending));
        assert!(!should_print(GroupStatus::Running));
        assert!(should_print(GroupStatus::Fail));
        assert!(should_print(GroupStatus::NoTests));
    }
}

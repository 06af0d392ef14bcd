// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The hierarchical group model: groups, test cases, derived statistics,
//! and status rollup.

mod id;
mod store;

pub use id::{GroupId, normalize_group_name};
pub use store::{GroupStore, GroupView};

use trun_metadata::{ErrorPayload, Totals};

/// The lifecycle status of a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum GroupStatus {
    #[default]
    Pending,
    Running,
    Pass,
    Fail,
    Skip,
    NoTests,
}

impl GroupStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Skip => "SKIP",
            Self::NoTests => "NO_TESTS",
        }
    }
}

/// A leaf test case. Created by `testCase` events and never mutated after
/// creation.
#[derive(Clone, Debug, PartialEq)]
pub struct TestCase {
    pub name: String,
    /// Ordered ancestor names, including the file/top-level group.
    pub parent_chain: Vec<String>,
    pub status: trun_metadata::CaseStatus,
    pub duration_ms: u64,
    pub error: Option<ErrorPayload>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

/// A node in the group tree.
#[derive(Clone, Debug)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    /// Ordered ancestor names (the parent chain), not including this
    /// group's own name.
    pub parent_chain: Vec<String>,
    pub status: GroupStatus,
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    pub duration_ms: Option<u64>,
    /// Direct statistics: counts of this group's own test cases only.
    pub direct_stats: Totals,
    pub children: Vec<GroupId>,
    pub cases: Vec<TestCase>,
    pub stdout: String,
    pub stderr: String,
    pub setup_failed: bool,
    pub error: Option<ErrorPayload>,
}

impl Group {
    pub(super) fn new(id: GroupId, name: String, parent_chain: Vec<String>) -> Self {
        Self {
            id,
            name,
            parent_chain,
            status: GroupStatus::Pending,
            // The group node is created the moment the first event
            // touching it (discovery, start, a case, output, or a
            // result) is applied, so creation time is start time.
            start_time: Some(chrono::Utc::now()),
            duration_ms: None,
            direct_stats: Totals::default(),
            children: Vec::new(),
            cases: Vec::new(),
            stdout: String::new(),
            stderr: String::new(),
            setup_failed: false,
            error: None,
        }
    }

    /// Whether this group is complete: it has reached a terminal status
    /// and (checked by the store, which has access to children) every
    /// child group is also complete. This method only checks this group's
    /// own status; see [`GroupStore::is_complete`] for the recursive
    /// check.
    pub fn own_status_is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

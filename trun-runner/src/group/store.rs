// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{Group, GroupId, GroupStatus, TestCase, normalize_group_name};
use crate::errors::GroupStoreError;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use trun_metadata::{CaseStatus, ErrorPayload, OutputStream, Totals};

/// A snapshot-friendly view of a group, suitable for the Report Writer:
/// the group's own fields plus its recursive statistics and rolled-up
/// status.
#[derive(Clone, Debug)]
pub struct GroupView {
    pub group: Group,
    pub recursive_stats: Totals,
    pub rolled_up_status: GroupStatus,
}

struct Inner {
    groups: IndexMap<GroupId, Group>,
    roots: Vec<GroupId>,
    /// Lazily (re)computed on read, invalidated on every mutation. `None`
    /// means stale.
    rollup: Option<HashMap<GroupId, (Totals, GroupStatus)>>,
    /// Groups mutated (directly, or by a descendant's mutation rolling
    /// up into their own aggregate stats) since the last
    /// [`GroupStore::take_dirty`]. Drained by the Report Writer so it can
    /// re-render only the documents that actually changed.
    dirty: HashSet<GroupId>,
}

impl Inner {
    fn invalidate(&mut self) {
        self.rollup = None;
    }

    /// Marks every node along `full_chain` (the mutated group and all of
    /// its ancestors) dirty: an ancestor's own document embeds the
    /// mutated group's contribution to its recursive totals and rolled-up
    /// status, so it needs rewriting too.
    fn mark_dirty_chain(&mut self, full_chain: &[String]) {
        for depth in 0..full_chain.len() {
            let id = GroupId::derive(&full_chain[..depth], &full_chain[depth]);
            self.dirty.insert(id);
        }
    }

    /// Ensures every node along `full_chain` exists, creating missing
    /// ancestors, and returns the id of the final (innermost) node.
    ///
    /// `full_chain` must be non-empty.
    fn ensure_chain(&mut self, full_chain: &[String]) -> GroupId {
        let mut id = GroupId::derive(&[], &full_chain[0]);
        if !self.groups.contains_key(&id) {
            self.groups.insert(
                id.clone(),
                Group::new(id.clone(), full_chain[0].clone(), vec![]),
            );
            self.roots.push(id.clone());
        }

        for depth in 1..full_chain.len() {
            let parents = &full_chain[..depth];
            let name = &full_chain[depth];
            let child_id = GroupId::derive(parents, name);
            if !self.groups.contains_key(&child_id) {
                self.groups.insert(
                    child_id.clone(),
                    Group::new(child_id.clone(), name.clone(), parents.to_vec()),
                );
                if let Some(parent) = self.groups.get_mut(&id) {
                    if !parent.children.contains(&child_id) {
                        parent.children.push(child_id.clone());
                    }
                }
            }
            id = child_id;
        }

        id
    }

    fn rollup_map(&mut self) -> &HashMap<GroupId, (Totals, GroupStatus)> {
        if self.rollup.is_none() {
            let mut map = HashMap::with_capacity(self.groups.len());
            let roots = self.roots.clone();
            for root in &roots {
                compute_rollup(&self.groups, root, &mut map);
            }
            self.rollup = Some(map);
        }
        self.rollup.as_ref().unwrap()
    }
}

fn compute_rollup(
    groups: &IndexMap<GroupId, Group>,
    id: &GroupId,
    memo: &mut HashMap<GroupId, (Totals, GroupStatus)>,
) -> (Totals, GroupStatus) {
    if let Some(cached) = memo.get(id) {
        return *cached;
    }

    let group = &groups[id];
    let mut totals = group.direct_stats;
    let mut any_fail = group.cases.iter().any(|c| c.status == CaseStatus::Fail);

    for child in &group.children {
        let (child_totals, child_status) = compute_rollup(groups, child, memo);
        totals.passed += child_totals.passed;
        totals.failed += child_totals.failed;
        totals.skipped += child_totals.skipped;
        totals.total += child_totals.total;
        any_fail |= child_status == GroupStatus::Fail;
    }

    let status = if any_fail || group.status == GroupStatus::Fail {
        GroupStatus::Fail
    } else if !group.status.is_terminal() {
        group.status
    } else if group.status == GroupStatus::NoTests {
        GroupStatus::NoTests
    } else if totals.total == 0 {
        GroupStatus::Skip
    } else {
        GroupStatus::Pass
    };

    memo.insert(id.clone(), (totals, status));
    (totals, status)
}

/// The in-memory hierarchical model of test groups and cases for one run.
///
/// Cheaply cloneable: clones share the same underlying state, guarded by a
/// single coarse mutex, matching the spec's "thread-confined mutation,
/// single coarse lock for readers" contract. Only the ingestion loop
/// (dispatcher) is expected to call the mutating methods; the Report
/// Writer only calls the read methods.
#[derive(Clone)]
pub struct GroupStore {
    inner: Arc<Mutex<Inner>>,
}

impl Default for GroupStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                groups: IndexMap::new(),
                roots: Vec::new(),
                rollup: None,
                dirty: HashSet::new(),
            })),
        }
    }

    fn normalized_chain(parent_names: &[String], name: Option<&str>) -> Vec<String> {
        let mut chain: Vec<String> = parent_names.iter().map(|n| normalize_group_name(n)).collect();
        if let Some(name) = name {
            chain.push(normalize_group_name(name));
        }
        chain
    }

    /// Creates missing ancestors and returns the stable id of the group
    /// named `name` under `parent_names`.
    pub fn upsert_group(&self, name: &str, parent_names: &[String]) -> GroupId {
        let chain = Self::normalized_chain(parent_names, Some(name));
        let mut inner = self.inner.lock().unwrap();
        let id = inner.ensure_chain(&chain);
        if let Some(group) = inner.groups.get_mut(&id)
            && group.status == GroupStatus::Pending
        {
            group.status = GroupStatus::Running;
        }
        inner.mark_dirty_chain(&chain);
        inner.invalidate();
        id
    }

    /// Records that a group was discovered (but not necessarily started),
    /// attaching metadata. Ancestors are created as needed; the group's own
    /// lifecycle status is left at `Pending` (discovery alone doesn't mean
    /// the group is running).
    pub fn discover_group(&self, name: &str, parent_names: &[String]) -> GroupId {
        let chain = Self::normalized_chain(parent_names, Some(name));
        let mut inner = self.inner.lock().unwrap();
        let id = inner.ensure_chain(&chain);
        inner.mark_dirty_chain(&chain);
        inner.invalidate();
        id
    }

    /// Appends a test case to the innermost group named by `parent_names`
    /// (the case's full ancestor chain, file first), creating missing
    /// ancestors.
    pub fn add_case(
        &self,
        parent_names: &[String],
        name: String,
        status: CaseStatus,
        duration_ms: u64,
        error: Option<ErrorPayload>,
        stdout: Option<String>,
        stderr: Option<String>,
    ) -> Result<GroupId, GroupStoreError> {
        if parent_names.is_empty() {
            return Err(GroupStoreError::EmptyParentChain);
        }
        let chain = Self::normalized_chain(parent_names, None);
        let mut inner = self.inner.lock().unwrap();
        let id = inner.ensure_chain(&chain);

        let case = TestCase {
            name,
            parent_chain: chain.clone(),
            status,
            duration_ms,
            error,
            stdout,
            stderr,
        };

        let group = inner.groups.get_mut(&id).expect("just ensured");
        group.direct_stats.add(status);
        group.cases.push(case);
        inner.mark_dirty_chain(&chain);
        inner.invalidate();
        Ok(id)
    }

    /// Appends a chunk of captured output to the innermost group named by
    /// `name`/`parent_names`, creating missing ancestors.
    pub fn append_output(
        &self,
        name: &str,
        parent_names: &[String],
        stream: OutputStream,
        chunk: &str,
    ) -> GroupId {
        let chain = Self::normalized_chain(parent_names, Some(name));
        let mut inner = self.inner.lock().unwrap();
        let id = inner.ensure_chain(&chain);
        let group = inner.groups.get_mut(&id).expect("just ensured");
        match stream {
            OutputStream::Stdout => group.stdout.push_str(chunk),
            OutputStream::Stderr => group.stderr.push_str(chunk),
        }
        inner.mark_dirty_chain(&chain);
        inner.invalidate();
        id
    }

    /// Applies a terminal result to the group named by `name`/`parent_names`.
    ///
    /// Per the spec, totals reported by a runner that counts by tests may
    /// legitimately be zero on a setup failure; the store always prefers
    /// its own recursively-derived counts over the event's `totals`, but
    /// preserves the event's `setup_failed` flag (a case-counting rollup
    /// alone cannot distinguish "no tests" from "failed before any test
    /// ran").
    #[allow(clippy::too_many_arguments)]
    pub fn apply_group_result(
        &self,
        name: &str,
        parent_names: &[String],
        status: GroupStatus,
        duration_ms: u64,
        setup_failed: bool,
        error: Option<ErrorPayload>,
    ) -> GroupId {
        let chain = Self::normalized_chain(parent_names, Some(name));
        let mut inner = self.inner.lock().unwrap();
        let id = inner.ensure_chain(&chain);
        let group = inner.groups.get_mut(&id).expect("just ensured");
        group.status = status;
        group.duration_ms = Some(duration_ms);
        group.setup_failed = setup_failed;
        if error.is_some() {
            group.error = error;
        }
        inner.mark_dirty_chain(&chain);
        inner.invalidate();
        id
    }

    /// Drains and returns the set of groups mutated since the last call,
    /// for the Report Writer to re-render only what actually changed.
    pub fn take_dirty(&self) -> HashSet<GroupId> {
        std::mem::take(&mut self.inner.lock().unwrap().dirty)
    }

    /// Returns the ids of top-level groups, in discovery order.
    pub fn root_ids(&self) -> Vec<GroupId> {
        self.inner.lock().unwrap().roots.clone()
    }

    /// Returns a snapshot view of a group, including recursive statistics
    /// and rolled-up status, or `None` if the id is unknown.
    pub fn get_group(&self, id: &GroupId) -> Option<GroupView> {
        let mut inner = self.inner.lock().unwrap();
        let group = inner.groups.get(id)?.clone();
        let (recursive_stats, rolled_up_status) = *inner.rollup_map().get(id)?;
        Some(GroupView {
            group,
            recursive_stats,
            rolled_up_status,
        })
    }

    /// True if the group and every descendant group has reached a terminal
    /// status.
    pub fn is_complete(&self, id: &GroupId) -> bool {
        let inner = self.inner.lock().unwrap();
        is_complete_inner(&inner.groups, id)
    }

    /// Total number of groups in the store (used for console/report
    /// summaries and the configuration/startup-error heuristic).
    pub fn group_count(&self) -> usize {
        self.inner.lock().unwrap().groups.len()
    }
}

fn is_complete_inner(groups: &IndexMap<GroupId, Group>, id: &GroupId) -> bool {
    let Some(group) = groups.get(id) else {
        return false;
    };
    group.own_status_is_terminal()
        && group
            .children
            .iter()
            .all(|child| is_complete_inner(groups, child))
}

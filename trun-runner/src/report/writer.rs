// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Incremental, crash-safe report writing.
//!
//! Every document is written to a sibling temp file and renamed into
//! place, so a reader never observes a half-written file; a crash between
//! the write and the rename simply leaves the previous (complete) version
//! in place. Writes are debounced: a burst of group-store mutations
//! collapses into one filesystem pass, bounded by
//! [`crate::config::Settings::debounce_max_wait`] so updates stay visible
//! within a predictable ceiling even under sustained load.

use crate::config::Settings;
use crate::errors::ReportWriteError;
use crate::group::{GroupId, GroupStore};
use crate::run_id::RunId;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::group_doc;
use super::index_doc::{self, IndexContext, RunStatus};

/// The subdirectory (relative to the run directory) that per-group
/// documents are written under.
const REPORTS_DIR: &str = "reports";

/// The filename of the run's own top-level report document.
const INDEX_FILE_NAME: &str = "test-run.md";

/// Writes one document's contents via write-temp-then-rename.
async fn atomic_write(path: &Utf8Path, contents: &str) -> Result<(), ReportWriteError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|error| ReportWriteError::CreateDir {
                path: parent.to_owned(),
                error,
            })?;
    }

    let tmp_path: Utf8PathBuf = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(|error| ReportWriteError::WriteTemp {
            path: tmp_path.clone(),
            error,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|error| ReportWriteError::Rename {
            path: path.to_owned(),
            error,
        })?;

    Ok(())
}

/// Writes the run index plus every group's own document.
pub struct ReportWriter {
    run_dir: Utf8PathBuf,
    run_id: RunId,
    command: Vec<String>,
    store: GroupStore,
    debounce_max_wait: Duration,
    created: DateTime<Utc>,
}

impl ReportWriter {
    pub fn new(
        run_dir: Utf8PathBuf,
        run_id: RunId,
        command: Vec<String>,
        store: GroupStore,
        settings: &Settings,
    ) -> Self {
        Self {
            run_dir,
            run_id,
            command,
            store,
            debounce_max_wait: settings.debounce_max_wait,
            created: Utc::now(),
        }
    }

    fn group_report_path(&self, id: &crate::group::GroupId) -> Utf8PathBuf {
        self.run_dir.join(REPORTS_DIR).join(id.as_str()).join("index.md")
    }

    fn index_path(&self) -> Utf8PathBuf {
        self.run_dir.join(INDEX_FILE_NAME)
    }

    async fn write_index(
        &self,
        status: RunStatus,
        elapsed: Duration,
        updated: DateTime<Utc>,
        error_details: Option<&str>,
    ) -> Result<(), ReportWriteError> {
        let ctx = IndexContext {
            run_id: &self.run_id,
            run_path: &self.run_dir,
            command: &self.command,
            status,
            created: self.created,
            updated,
            elapsed,
            error_details,
        };
        let index = index_doc::render(&ctx, &self.store);
        atomic_write(&self.index_path(), &index).await
    }

    async fn write_group(&self, id: &GroupId) -> Result<(), ReportWriteError> {
        let Some(view) = self.store.get_group(id) else {
            return Ok(());
        };
        let rendered = group_doc::render(&view, &self.store);
        atomic_write(&self.group_report_path(id), &rendered).await
    }

    /// Writes the full report tree: the run index plus every known
    /// group's document. Used for the final, authoritative write at the
    /// end of a run, where correctness matters more than the physical
    /// write count.
    pub async fn write_all(
        &self,
        status: RunStatus,
        elapsed: Duration,
        updated: DateTime<Utc>,
        error_details: Option<&str>,
    ) -> Result<(), ReportWriteError> {
        self.write_index(status, elapsed, updated, error_details).await?;

        for root_id in self.store.root_ids() {
            self.write_subtree(&root_id).await?;
        }

        Ok(())
    }

    /// Writes the run index plus only the groups named in `dirty` (and,
    /// transitively, their ancestors — [`GroupStore::take_dirty`] already
    /// includes those). O(1) group-document writes per mutated group per
    /// debounce window, not O(total groups).
    pub async fn write_dirty(
        &self,
        status: RunStatus,
        elapsed: Duration,
        updated: DateTime<Utc>,
        error_details: Option<&str>,
        dirty: &HashSet<GroupId>,
    ) -> Result<(), ReportWriteError> {
        self.write_index(status, elapsed, updated, error_details).await?;

        for id in dirty {
            self.write_group(id).await?;
        }

        Ok(())
    }

    fn write_subtree<'a>(
        &'a self,
        id: &'a crate::group::GroupId,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), ReportWriteError>> + 'a>>
    {
        Box::pin(async move {
            let Some(view) = self.store.get_group(id) else {
                return Ok(());
            };
            self.write_group(id).await?;
            for child in &view.group.children {
                self.write_subtree(child).await?;
            }
            Ok(())
        })
    }

    /// Runs the debounced write loop until `dirty_rx` closes (signaling
    /// shutdown). Every "dirty" ping coalesces with any already pending,
    /// and a full write happens at most once per `debounce_max_wait`
    /// window while pings keep arriving, or immediately once they stop.
    pub async fn run(
        &self,
        mut dirty_rx: mpsc::Receiver<()>,
        status_of: impl Fn() -> (RunStatus, Duration),
    ) {
        loop {
            let Some(()) = dirty_rx.recv().await else {
                return;
            };

            let deadline = Instant::now() + self.debounce_max_wait;
            loop {
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => break,
                    more = dirty_rx.recv() => {
                        if more.is_none() {
                            let (status, elapsed) = status_of();
                            let dirty = self.store.take_dirty();
                            let _ = self.write_dirty(status, elapsed, Utc::now(), None, &dirty).await;
                            return;
                        }
                    }
                }
            }

            let (status, elapsed) = status_of();
            let dirty = self.store.take_dirty();
            if let Err(error) = self.write_dirty(status, elapsed, Utc::now(), None, &dirty).await {
                tracing::warn!(%error, "failed to write report tree");
            }
        }
    }
}

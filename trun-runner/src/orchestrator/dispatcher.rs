// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The dispatcher: the single task that mutates the group store in
//! response to events, prints console lines, and pings the report writer.
//!
//! Centralizing every mutation in one task (rather than letting the
//! channel reader and the native-stream feeder touch the store directly)
//! is what lets [`crate::group::GroupStore`] get away with a single coarse
//! lock: contention is never a concern because there is only ever one
//! writer.

use crate::console::{self, GroupLine};
use crate::group::{GroupId, GroupStatus, GroupStore};
use tokio::sync::mpsc;
use trun_metadata::{Event, GroupResultStatus};

fn to_group_status(status: GroupResultStatus) -> GroupStatus {
    match status {
        GroupResultStatus::Pass => GroupStatus::Pass,
        GroupResultStatus::Fail => GroupStatus::Fail,
        GroupResultStatus::Skip => GroupStatus::Skip,
        GroupResultStatus::NoTests => GroupStatus::NoTests,
    }
}

/// Applies one event to the store, returning the id of the group it
/// touched (if any) so the caller can decide whether a console line is
/// due.
fn apply_event(store: &GroupStore, event: Event) -> Option<GroupId> {
    match event {
        Event::TestGroupDiscovered(payload) => {
            let parents: Vec<String> = payload.parent_names.iter().map(|s| s.to_string()).collect();
            Some(store.discover_group(&payload.group_name, &parents))
        }
        Event::TestGroupStart(payload) => {
            let parents: Vec<String> = payload.parent_names.iter().map(|s| s.to_string()).collect();
            Some(store.upsert_group(&payload.group_name, &parents))
        }
        Event::TestGroupResult(payload) => {
            let parents: Vec<String> = payload.parent_names.iter().map(|s| s.to_string()).collect();
            Some(store.apply_group_result(
                &payload.group_name,
                &parents,
                to_group_status(payload.status),
                payload.duration,
                payload.setup_failed.unwrap_or(false),
                payload.error,
            ))
        }
        Event::TestCase(payload) => {
            let parents: Vec<String> = payload.parent_names.iter().map(|s| s.to_string()).collect();
            store
                .add_case(
                    &parents,
                    payload.test_name.to_string(),
                    payload.status,
                    payload.duration,
                    payload.error,
                    payload.stdout,
                    payload.stderr,
                )
                .map_err(|error| tracing::warn!(%error, "dropping malformed test case event"))
                .ok()
        }
        Event::GroupStdout(payload) => {
            let parents: Vec<String> = payload.parent_names.iter().map(|s| s.to_string()).collect();
            Some(store.append_output(
                &payload.group_name,
                &parents,
                trun_metadata::OutputStream::Stdout,
                &payload.chunk,
            ))
        }
        Event::GroupStderr(payload) => {
            let parents: Vec<String> = payload.parent_names.iter().map(|s| s.to_string()).collect();
            Some(store.append_output(
                &payload.group_name,
                &parents,
                trun_metadata::OutputStream::Stderr,
                &payload.chunk,
            ))
        }
        Event::CollectionStart | Event::CollectionFinish | Event::RunComplete => None,
        Event::CollectionError(payload) => {
            tracing::warn!(
                message = payload.message.as_deref().unwrap_or(""),
                "collection error reported by runner"
            );
            None
        }
    }
}

/// Runs the dispatch loop until `events` closes. Returns once every event
/// has been applied and no more can arrive.
pub async fn run(
    store: GroupStore,
    mut events: mpsc::Receiver<Event>,
    dirty_tx: mpsc::Sender<()>,
    run_dir: camino::Utf8PathBuf,
) {
    while let Some(event) = events.recv().await {
        let touched = apply_event(&store, event);
        let _ = dirty_tx.try_send(());

        if let Some(id) = touched
            && let Some(view) = store.get_group(&id)
            && view.group.parent_chain.is_empty()
            && store.is_complete(&id)
            && console::should_print(view.rolled_up_status)
        {
            let report_path = run_dir.join("reports").join(id.as_str()).join("index.md");
            let line = GroupLine {
                status: view.rolled_up_status,
                totals: view.recursive_stats,
                report_path: &report_path,
            };
            println!("{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use trun_metadata::{CaseStatus, GroupResultPayload, GroupStartPayload, TestCasePayload};

    #[tokio::test]
    async fn dispatch_loop_applies_events_and_pings_dirty_channel() {
        let store = GroupStore::new();
        let (event_tx, event_rx) = mpsc::channel(16);
        let (dirty_tx, mut dirty_rx) = mpsc::channel(16);
        let run_dir = Utf8PathBuf::from("/tmp/run");

        let store_clone = store.clone();
        let handle = tokio::spawn(async move {
            run(store_clone, event_rx, dirty_tx, run_dir).await;
        });

        event_tx
            .send(Event::TestGroupStart(GroupStartPayload {
                group_name: "file.test.js".into(),
                parent_names: vec![],
            }))
            .await
            .unwrap();
        event_tx
            .send(Event::TestCase(TestCasePayload {
                test_name: "case".into(),
                parent_names: vec!["file.test.js".into()],
                status: CaseStatus::Pass,
                duration: 1,
                error: None,
                stdout: None,
                stderr: None,
            }))
            .await
            .unwrap();
        event_tx
            .send(Event::TestGroupResult(GroupResultPayload {
                group_name: "file.test.js".into(),
                parent_names: vec![],
                status: GroupResultStatus::Pass,
                duration: 1,
                totals: Default::default(),
                setup_failed: None,
                error: None,
            }))
            .await
            .unwrap();
        drop(event_tx);
        handle.await.unwrap();

        assert!(dirty_rx.try_recv().is_ok());
        let root = &store.root_ids()[0];
        assert_eq!(store.get_group(root).unwrap().group.name, "file.test.js");
    }
}

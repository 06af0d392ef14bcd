// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared stream parser for the libtest JSON wire format (`--format json
//! --report-time`), used by both `cargo test` and `cargo nextest run`.
//!
//! The format brackets one test binary's run between a `{"type":"suite",
//! "event":"started",...}` line and a matching `{"type":"suite","event":
//! "ok"|"failed",...}` summary line, with `{"type":"test",...}` lines for
//! each case in between. The suite lines carry no identifying name, so the
//! binary's group is inferred from its first test's name (cargo test
//! prefixes test names with the crate/binary path, e.g.
//! `mycrate::mybinary$tests::it_works`).

use super::NativeStreamParser;
use serde_json::Value;
use std::collections::HashSet;
use trun_metadata::{
    CaseStatus, Event, GroupDiscoveredPayload, GroupResultPayload, GroupResultStatus,
    GroupStartPayload, TestCasePayload,
};

/// Splits a libtest test name into its (binary group, bare test name).
/// `mycrate::mybinary$tests::it_works` becomes `("mycrate::mybinary",
/// "tests::it_works")`; a name with no `$` separator is its own group.
fn split_test_name(name: &str) -> (String, String) {
    match name.split_once('$') {
        Some((group, test)) => (group.to_string(), test.to_string()),
        None => ("tests".to_string(), name.to_string()),
    }
}

#[derive(Default)]
pub struct LibtestStreamParser {
    current_group: Option<String>,
    discovered: HashSet<String>,
    finished: HashSet<String>,
}

impl LibtestStreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    fn discover(&mut self, group: &str) -> Vec<Event> {
        if self.discovered.insert(group.to_string()) {
            vec![
                Event::TestGroupDiscovered(GroupDiscoveredPayload {
                    group_name: group.into(),
                    parent_names: Vec::new(),
                    metadata: Default::default(),
                }),
                Event::TestGroupStart(GroupStartPayload {
                    group_name: group.into(),
                    parent_names: Vec::new(),
                }),
            ]
        } else {
            Vec::new()
        }
    }
}

impl NativeStreamParser for LibtestStreamParser {
    fn feed_line(&mut self, line: &str) -> Vec<Event> {
        let Ok(value) = serde_json::from_str::<Value>(line) else {
            return Vec::new();
        };

        match value.get("type").and_then(Value::as_str) {
            Some("suite") => match value.get("event").and_then(Value::as_str) {
                Some("ok") | Some("failed") => {
                    let Some(group) = self.current_group.take() else {
                        return Vec::new();
                    };
                    let status = if value.get("event").and_then(Value::as_str) == Some("ok") {
                        GroupResultStatus::Pass
                    } else {
                        GroupResultStatus::Fail
                    };
                    let duration = exec_time_millis(&value);
                    self.finished.insert(group.clone());
                    vec![Event::TestGroupResult(GroupResultPayload {
                        group_name: group.into(),
                        parent_names: Vec::new(),
                        status,
                        duration,
                        totals: Default::default(),
                        setup_failed: None,
                        error: None,
                    })]
                }
                _ => Vec::new(),
            },
            Some("test") => {
                let Some(name) = value.get("name").and_then(Value::as_str) else {
                    return Vec::new();
                };
                let (group, test_name) = split_test_name(name);
                let mut events = self.discover(&group);
                self.current_group = Some(group.clone());

                let status = match value.get("event").and_then(Value::as_str) {
                    Some("ok") => Some(CaseStatus::Pass),
                    Some("failed") => Some(CaseStatus::Fail),
                    Some("ignored") => Some(CaseStatus::Skip),
                    _ => None,
                };

                if let Some(status) = status {
                    let error = if status == CaseStatus::Fail {
                        value
                            .get("stdout")
                            .and_then(Value::as_str)
                            .map(trun_metadata::ErrorPayload::from_message)
                    } else {
                        None
                    };
                    events.push(Event::TestCase(TestCasePayload {
                        test_name: test_name.into(),
                        parent_names: vec![group.into()],
                        status,
                        duration: exec_time_millis(&value),
                        error,
                        stdout: None,
                        stderr: None,
                    }));
                }
                events
            }
            _ => Vec::new(),
        }
    }

    fn finish(&mut self, captured_stderr: &str) -> Vec<Event> {
        self.discovered
            .difference(&self.finished)
            .cloned()
            .collect::<Vec<_>>()
            .into_iter()
            .map(|group| {
                Event::TestGroupResult(GroupResultPayload {
                    group_name: group.into(),
                    parent_names: Vec::new(),
                    status: GroupResultStatus::Fail,
                    duration: 0,
                    totals: Default::default(),
                    setup_failed: Some(true),
                    error: Some(trun_metadata::ErrorPayload::from_message(format!(
                        "test binary exited before reporting a result\n{captured_stderr}"
                    ))),
                })
            })
            .collect()
    }
}

fn exec_time_millis(value: &Value) -> u64 {
    value
        .get("exec_time")
        .and_then(Value::as_f64)
        .map(|secs| (secs * 1000.0) as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_passing_test_produces_discovery_start_case_and_result() {
        let mut parser = LibtestStreamParser::new();
        let mut events = Vec::new();
        events.extend(parser.feed_line(r#"{"type":"suite","event":"started","test_count":1}"#));
        events.extend(parser.feed_line(r#"{"type":"test","event":"started","name":"mycrate$it_works"}"#));
        events.extend(parser.feed_line(
            r#"{"type":"test","name":"mycrate$it_works","event":"ok","exec_time":0.002}"#,
        ));
        events.extend(parser.feed_line(
            r#"{"type":"suite","event":"ok","passed":1,"failed":0,"ignored":0,"measured":0,"filtered_out":0,"exec_time":0.002}"#,
        ));

        assert!(matches!(events[0], Event::TestGroupDiscovered(_)));
        assert!(matches!(events[1], Event::TestGroupStart(_)));
        match &events[2] {
            Event::TestCase(payload) => assert_eq!(payload.status, CaseStatus::Pass),
            other => panic!("unexpected event: {other:?}"),
        }
        match &events[3] {
            Event::TestGroupResult(payload) => assert_eq!(payload.status, GroupResultStatus::Pass),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn unfinished_group_gets_setup_failure_on_finish() {
        let mut parser = LibtestStreamParser::new();
        parser.feed_line(r#"{"type":"test","event":"started","name":"mycrate$it_works"}"#);
        let events = parser.finish("process killed");
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::TestGroupResult(payload) => {
                assert_eq!(payload.status, GroupResultStatus::Fail);
                assert_eq!(payload.setup_failed, Some(true));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}

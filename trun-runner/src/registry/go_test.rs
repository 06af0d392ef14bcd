// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `go test`: native-stream via `-json`.
//!
//! Each package is a top-level group. `test2json`'s action vocabulary has
//! no dedicated "build failed" action: a package that failed to compile
//! emits a bare `{"Action":"fail","Package":"..."}` with no `Test` field
//! and no prior per-test events, indistinguishable on the wire from an
//! ordinary package result except by that absence — so that absence is
//! what this parser treats as a setup failure. A `skip` action with no
//! `Test` field means the package had no tests to run at all.

use super::{Invocation, NativeStreamParser, ProjectMetadata, RunnerDefinition};
use camino::Utf8Path;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use trun_metadata::{
    CaseStatus, ErrorPayload, Event, GroupDiscoveredPayload, GroupResultPayload,
    GroupResultStatus, GroupStartPayload, TestCasePayload,
};

pub struct GoTestRunner;

fn is_direct_invocation(args: &[String]) -> bool {
    args.first().map(String::as_str) == Some("go")
        && args.get(1).map(String::as_str) == Some("test")
}

impl RunnerDefinition for GoTestRunner {
    fn name(&self) -> &'static str {
        "go-test"
    }

    fn matches(&self, invocation: &Invocation, _project: &ProjectMetadata) -> bool {
        is_direct_invocation(&invocation.args)
    }

    fn rewrite_command(
        &self,
        invocation: &Invocation,
        _project: &ProjectMetadata,
        _adapter_path: Option<&Utf8Path>,
    ) -> Vec<String> {
        let mut argv = invocation.args.clone();
        if !argv.iter().any(|a| a == "-json") {
            argv.insert(2, "-json".to_string());
        }
        argv
    }

    fn native_parser(&self) -> Option<Box<dyn NativeStreamParser>> {
        Some(Box::new(GoTestParser::default()))
    }
}

#[derive(Deserialize)]
struct GoEvent<'a> {
    #[serde(borrow)]
    #[serde(rename = "Action")]
    action: &'a str,
    #[serde(rename = "Package")]
    package: Option<&'a str>,
    #[serde(rename = "Test")]
    test: Option<&'a str>,
    #[serde(rename = "Elapsed")]
    elapsed: Option<f64>,
    #[serde(rename = "Output")]
    output: Option<&'a str>,
}

#[derive(Default)]
pub struct GoTestParser {
    discovered: HashSet<String>,
    finished: HashSet<String>,
    /// Buffered output per `package\x1ftest`, used to build the error
    /// message of a failed case.
    case_output: HashMap<String, String>,
    /// Buffered output per package with no `Test` key, used for the error
    /// message of a setup failure (a package that never reported a test).
    package_output: HashMap<String, String>,
    /// Packages that have emitted at least one per-test event. A package
    /// absent from this set when it reports `fail` never ran a test at
    /// all, i.e. it failed to build.
    package_has_test: HashSet<String>,
}

fn case_key(package: &str, test: &str) -> String {
    format!("{package}\x1f{test}")
}

impl GoTestParser {
    fn discover(&mut self, package: &str) -> Vec<Event> {
        if self.discovered.insert(package.to_string()) {
            vec![
                Event::TestGroupDiscovered(GroupDiscoveredPayload {
                    group_name: package.into(),
                    parent_names: Vec::new(),
                    metadata: Default::default(),
                }),
                Event::TestGroupStart(GroupStartPayload {
                    group_name: package.into(),
                    parent_names: Vec::new(),
                }),
            ]
        } else {
            Vec::new()
        }
    }
}

impl NativeStreamParser for GoTestParser {
    fn feed_line(&mut self, line: &str) -> Vec<Event> {
        let Ok(event) = serde_json::from_str::<GoEvent>(line) else {
            return Vec::new();
        };
        let Some(package) = event.package else {
            return Vec::new();
        };

        let mut events = self.discover(package);
        let duration_millis = event.elapsed.map(|s| (s * 1000.0) as u64).unwrap_or(0);

        if event.test.is_some() {
            self.package_has_test.insert(package.to_string());
        }

        match (event.test, event.action) {
            (Some(test), "output") => {
                if let Some(output) = event.output {
                    self.case_output
                        .entry(case_key(package, test))
                        .or_default()
                        .push_str(output);
                }
            }
            (None, "output") => {
                if let Some(output) = event.output {
                    self.package_output
                        .entry(package.to_string())
                        .or_default()
                        .push_str(output);
                }
            }
            (Some(test), "pass" | "fail" | "skip") => {
                let status = match event.action {
                    "pass" => CaseStatus::Pass,
                    "fail" => CaseStatus::Fail,
                    _ => CaseStatus::Skip,
                };
                let error = (status == CaseStatus::Fail)
                    .then(|| self.case_output.remove(&case_key(package, test)))
                    .flatten()
                    .map(ErrorPayload::from_message);
                events.push(Event::TestCase(TestCasePayload {
                    test_name: test.into(),
                    parent_names: vec![package.into()],
                    status,
                    duration: duration_millis,
                    error,
                    stdout: None,
                    stderr: None,
                }));
            }
            (None, "pass" | "fail") => {
                self.finished.insert(package.to_string());
                if event.action == "fail" && !self.package_has_test.contains(package) {
                    let message = self
                        .package_output
                        .remove(package)
                        .unwrap_or_else(|| "go vet/build failed".to_string());
                    events.push(Event::TestGroupResult(GroupResultPayload {
                        group_name: package.into(),
                        parent_names: Vec::new(),
                        status: GroupResultStatus::Fail,
                        duration: duration_millis,
                        totals: Default::default(),
                        setup_failed: Some(true),
                        error: Some(ErrorPayload::from_message(message)),
                    }));
                } else {
                    let status = if event.action == "pass" {
                        GroupResultStatus::Pass
                    } else {
                        GroupResultStatus::Fail
                    };
                    events.push(Event::TestGroupResult(GroupResultPayload {
                        group_name: package.into(),
                        parent_names: Vec::new(),
                        status,
                        duration: duration_millis,
                        totals: Default::default(),
                        setup_failed: None,
                        error: None,
                    }));
                }
            }
            (None, "skip") => {
                self.finished.insert(package.to_string());
                events.push(Event::TestGroupResult(GroupResultPayload {
                    group_name: package.into(),
                    parent_names: Vec::new(),
                    status: GroupResultStatus::NoTests,
                    duration: duration_millis,
                    totals: Default::default(),
                    setup_failed: None,
                    error: None,
                }));
            }
            _ => {}
        }

        events
    }

    fn finish(&mut self, captured_stderr: &str) -> Vec<Event> {
        self.discovered
            .difference(&self.finished)
            .cloned()
            .collect::<Vec<_>>()
            .into_iter()
            .map(|package| {
                Event::TestGroupResult(GroupResultPayload {
                    group_name: package.into(),
                    parent_names: Vec::new(),
                    status: GroupResultStatus::Fail,
                    duration: 0,
                    totals: Default::default(),
                    setup_failed: Some(true),
                    error: Some(ErrorPayload::from_message(format!(
                        "go test exited before reporting a package result\n{captured_stderr}"
                    ))),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_go_test() {
        let project = ProjectMetadata::default();
        let invocation = Invocation::new(vec!["go".to_string(), "test".to_string()]);
        assert!(GoTestRunner.matches(&invocation, &project));
    }

    #[test]
    fn passing_case_then_package_result() {
        let mut parser = GoTestParser::default();
        let mut events = Vec::new();
        events.extend(parser.feed_line(
            r#"{"Action":"run","Package":"example.com/pkg","Test":"TestFoo"}"#,
        ));
        events.extend(parser.feed_line(
            r#"{"Action":"pass","Package":"example.com/pkg","Test":"TestFoo","Elapsed":0.01}"#,
        ));
        events.extend(parser.feed_line(
            r#"{"Action":"pass","Package":"example.com/pkg","Elapsed":0.02}"#,
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
    fn package_build_failure_is_a_setup_failure() {
        let mut parser = GoTestParser::default();
        parser.feed_line(
            r#"{"Action":"output","Package":"example.com/broken","Output":"undefined: Foo\n"}"#,
        );
        // A real `test2json` build failure: a bare "fail" action, no
        // "Test" field, and no per-test event ever preceded it.
        let events = parser.feed_line(r#"{"Action":"fail","Package":"example.com/broken"}"#);
        match &events.last().unwrap() {
            Event::TestGroupResult(payload) => {
                assert_eq!(payload.setup_failed, Some(true));
                assert!(payload.error.as_ref().unwrap().message.contains("undefined: Foo"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn package_with_no_tests_is_no_tests_status() {
        let mut parser = GoTestParser::default();
        let events = parser.feed_line(r#"{"Action":"skip","Package":"example.com/empty"}"#);
        match &events.last().unwrap() {
            Event::TestGroupResult(payload) => {
                assert_eq!(payload.status, GroupResultStatus::NoTests);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}

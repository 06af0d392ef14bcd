// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cargo nextest run`: native-stream via its libtest-compatible JSON
//! reporter.
//!
//! Checked ahead of [`super::cargo_test`] in the registry, since `cargo
//! nextest run` also starts with `cargo` and must not be swallowed by a
//! looser `cargo test` match.

use super::libtest_stream::LibtestStreamParser;
use super::{Invocation, NativeStreamParser, ProjectMetadata, RunnerDefinition};
use camino::Utf8Path;

pub struct NextestRunner;

fn is_direct_invocation(args: &[String]) -> bool {
    args.first().map(String::as_str) == Some("cargo")
        && args.get(1).map(String::as_str) == Some("nextest")
        && args.get(2).map(String::as_str) == Some("run")
}

impl RunnerDefinition for NextestRunner {
    fn name(&self) -> &'static str {
        "cargo-nextest"
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
        argv.push("--message-format".to_string());
        argv.push("libtest-json".to_string());
        argv
    }

    fn extra_env_vars(&self) -> Vec<(&'static str, &'static str)> {
        // cargo-nextest gates --message-format libtest-json behind this
        // experimental flag; without it the child exits immediately with
        // ExpectedError::ExperimentalFeatureNotEnabled.
        vec![("NEXTEST_EXPERIMENTAL_LIBTEST_JSON", "1")]
    }

    fn native_parser(&self) -> Option<Box<dyn NativeStreamParser>> {
        Some(Box::new(LibtestStreamParser::new()))
    }
}

// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cargo test`: native-stream via libtest's unstable `--format json`
//! output.

use super::libtest_stream::LibtestStreamParser;
use super::{Invocation, NativeStreamParser, ProjectMetadata, RunnerDefinition};
use camino::Utf8Path;

pub struct CargoTestRunner;

fn is_direct_invocation(args: &[String]) -> bool {
    args.first().map(String::as_str) == Some("cargo")
        && args.get(1).map(String::as_str) == Some("test")
}

impl RunnerDefinition for CargoTestRunner {
    fn name(&self) -> &'static str {
        "cargo-test"
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
        if !argv.iter().any(|a| a == "--") {
            argv.push("--".to_string());
        }
        argv.push("-Z".to_string());
        argv.push("unstable-options".to_string());
        argv.push("--format".to_string());
        argv.push("json".to_string());
        argv.push("--report-time".to_string());
        argv
    }

    fn extra_env_vars(&self) -> Vec<(&'static str, &'static str)> {
        // The unstable JSON formatter requires a nightly toolchain unless
        // this is set, matching how the teacher's own CI invokes it.
        vec![("RUSTC_BOOTSTRAP", "1")]
    }

    fn native_parser(&self) -> Option<Box<dyn NativeStreamParser>> {
        Some(Box::new(LibtestStreamParser::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_cargo_test() {
        let project = ProjectMetadata::default();
        let invocation = Invocation::new(vec!["cargo".to_string(), "test".to_string()]);
        assert!(CargoTestRunner.matches(&invocation, &project));
    }

    #[test]
    fn does_not_match_cargo_nextest() {
        let project = ProjectMetadata::default();
        let invocation = Invocation::new(vec![
            "cargo".to_string(),
            "nextest".to_string(),
            "run".to_string(),
        ]);
        assert!(!CargoTestRunner.matches(&invocation, &project));
    }

    #[test]
    fn rewrite_appends_json_format_flags() {
        let project = ProjectMetadata::default();
        let invocation = Invocation::new(vec!["cargo".to_string(), "test".to_string()]);
        let argv = CargoTestRunner.rewrite_command(&invocation, &project, None);
        assert!(argv.contains(&"--format".to_string()));
        assert!(argv.contains(&"json".to_string()));
    }
}

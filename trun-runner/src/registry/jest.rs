// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Jest: adapter-based via a custom reporter registered through
//! `--reporters`.

use super::package_manager::resolve_indirect_script;
use super::{Adapter, Invocation, ProjectMetadata, RunnerDefinition};
use camino::Utf8Path;

const ADAPTER_SOURCE: &str = include_str!("../../assets/adapters/jest_reporter.js");

pub struct JestRunner;

fn looks_like_jest(program: &str) -> bool {
    let base = program.rsplit(['/', '\\']).next().unwrap_or(program);
    base == "jest" || base == "jest.js"
}

fn is_direct_invocation(args: &[String]) -> bool {
    match args.first().map(String::as_str) {
        Some("npx") => args.get(1).is_some_and(|s| looks_like_jest(s)),
        Some(program) => looks_like_jest(program),
        None => false,
    }
}

impl RunnerDefinition for JestRunner {
    fn name(&self) -> &'static str {
        "jest"
    }

    fn matches(&self, invocation: &Invocation, project: &ProjectMetadata) -> bool {
        if is_direct_invocation(&invocation.args) {
            return true;
        }
        resolve_indirect_script(&invocation.args, project)
            .is_some_and(|resolved| is_direct_invocation(&resolved))
    }

    fn rewrite_command(
        &self,
        invocation: &Invocation,
        _project: &ProjectMetadata,
        adapter_path: Option<&Utf8Path>,
    ) -> Vec<String> {
        let adapter_path = adapter_path.expect("jest is adapter-based");
        let mut argv = invocation.args.clone();

        // A package-manager indirection (`npm test`) needs its extra flags
        // appended after `--` to reach the underlying jest invocation; a
        // direct invocation takes them as ordinary trailing args.
        if matches!(argv.first().map(String::as_str), Some("npm" | "yarn" | "pnpm")) {
            argv.push("--".to_string());
        }

        argv.push("--reporters".to_string());
        argv.push(adapter_path.to_string());
        argv.push("--watchAll=false".to_string());
        argv
    }

    fn adapter(&self) -> Option<Adapter> {
        Some(Adapter {
            file_name: "jest_reporter.js",
            contents: ADAPTER_SOURCE,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_direct_invocation() {
        let project = ProjectMetadata::default();
        let invocation = Invocation::new(vec!["jest".to_string()]);
        assert!(JestRunner.matches(&invocation, &project));
    }

    #[test]
    fn matches_npx_invocation() {
        let project = ProjectMetadata::default();
        let invocation = Invocation::new(vec!["npx".to_string(), "jest".to_string()]);
        assert!(JestRunner.matches(&invocation, &project));
    }

    #[test]
    fn rewrite_appends_reporter_flag() {
        let project = ProjectMetadata::default();
        let invocation = Invocation::new(vec!["jest".to_string()]);
        let path = Utf8Path::new("/run/adapters/jest_reporter.js");
        let argv = JestRunner.rewrite_command(&invocation, &project, Some(path));
        assert!(argv.contains(&"--reporters".to_string()));
        assert!(argv.contains(&path.to_string()));
    }
}

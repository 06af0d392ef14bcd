// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vitest: adapter-based via a custom reporter registered through
//! `--reporter`.

use super::package_manager::resolve_indirect_script;
use super::{Adapter, Invocation, ProjectMetadata, RunnerDefinition};
use camino::Utf8Path;

const ADAPTER_SOURCE: &str = include_str!("../../assets/adapters/vitest_reporter.js");

pub struct VitestRunner;

fn looks_like_vitest(program: &str) -> bool {
    let base = program.rsplit(['/', '\\']).next().unwrap_or(program);
    base == "vitest" || base == "vitest.js"
}

fn is_direct_invocation(args: &[String]) -> bool {
    match args.first().map(String::as_str) {
        Some("npx") => args.get(1).is_some_and(|s| looks_like_vitest(s)),
        Some(program) => looks_like_vitest(program),
        None => false,
    }
}

impl RunnerDefinition for VitestRunner {
    fn name(&self) -> &'static str {
        "vitest"
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
        let adapter_path = adapter_path.expect("vitest is adapter-based");
        let mut argv = invocation.args.clone();

        if matches!(argv.first().map(String::as_str), Some("npm" | "yarn" | "pnpm")) {
            argv.push("--".to_string());
        }

        // `vitest` watches by default unless a subcommand like `run` is
        // given; inserting `run` right after the binary/script name forces
        // a single pass regardless of how it was invoked.
        if !argv.iter().any(|a| a == "run") {
            argv.insert(1, "run".to_string());
        }
        argv.push("--reporter".to_string());
        argv.push(adapter_path.to_string());
        argv
    }

    fn adapter(&self) -> Option<Adapter> {
        Some(Adapter {
            file_name: "vitest_reporter.js",
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
        let invocation = Invocation::new(vec!["vitest".to_string()]);
        assert!(VitestRunner.matches(&invocation, &project));
    }

    #[test]
    fn rewrite_forces_run_subcommand() {
        let project = ProjectMetadata::default();
        let invocation = Invocation::new(vec!["vitest".to_string()]);
        let path = Utf8Path::new("/run/adapters/vitest_reporter.js");
        let argv = VitestRunner.rewrite_command(&invocation, &project, Some(path));
        assert_eq!(argv[1], "run");
        assert!(argv.contains(&"--reporter".to_string()));
    }
}

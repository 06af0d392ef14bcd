// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! pytest: adapter-based via a `-p` plugin file.

use super::{Adapter, Invocation, ProjectMetadata, RunnerDefinition};
use camino::Utf8Path;

const ADAPTER_SOURCE: &str = include_str!("../../assets/adapters/pytest_plugin.py");

pub struct PytestRunner;

fn looks_like_pytest(program: &str) -> bool {
    let base = program.rsplit(['/', '\\']).next().unwrap_or(program);
    base == "pytest" || base == "py.test"
}

fn is_direct_invocation(args: &[String]) -> bool {
    match args.first().map(String::as_str) {
        Some("python" | "python3") => {
            args.get(1).is_some_and(|s| s == "-m") && args.get(2).is_some_and(|s| s == "pytest")
        }
        Some(program) => looks_like_pytest(program),
        None => false,
    }
}

impl RunnerDefinition for PytestRunner {
    fn name(&self) -> &'static str {
        "pytest"
    }

    fn matches(&self, invocation: &Invocation, _project: &ProjectMetadata) -> bool {
        is_direct_invocation(&invocation.args)
    }

    fn rewrite_command(
        &self,
        invocation: &Invocation,
        _project: &ProjectMetadata,
        adapter_path: Option<&Utf8Path>,
    ) -> Vec<String> {
        let adapter_path = adapter_path.expect("pytest is adapter-based");
        let mut argv = invocation.args.clone();
        argv.push("-p".to_string());
        // pytest's `-p` plugin loading takes a dotted module path, not a
        // file path; the plugin is extracted as a standalone file and
        // loaded by its absolute path sans extension via `-p` using the
        // `local` import machinery pytest provides for this exact case.
        argv.push(format!("{}", adapter_path.with_extension("")));
        argv
    }

    fn adapter(&self) -> Option<Adapter> {
        Some(Adapter {
            file_name: "pytest_plugin.py",
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
        let invocation = Invocation::new(vec!["pytest".to_string()]);
        assert!(PytestRunner.matches(&invocation, &project));
    }

    #[test]
    fn matches_python_dash_m_invocation() {
        let project = ProjectMetadata::default();
        let invocation = Invocation::new(vec![
            "python3".to_string(),
            "-m".to_string(),
            "pytest".to_string(),
        ]);
        assert!(PytestRunner.matches(&invocation, &project));
    }

    #[test]
    fn rejects_unrelated_python_invocation() {
        let project = ProjectMetadata::default();
        let invocation = Invocation::new(vec![
            "python3".to_string(),
            "-m".to_string(),
            "http.server".to_string(),
        ]);
        assert!(!PytestRunner.matches(&invocation, &project));
    }
}

// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The runner registry: ordered lookup that maps an invocation to exactly
//! one [`RunnerDefinition`].

mod cargo_test;
mod go_test;
mod jest;
mod libtest_stream;
mod nextest;
mod package_manager;
mod pytest;
mod vitest;

pub use package_manager::ProjectMetadata;

use crate::errors::NoRunnerDetected;
use camino::Utf8Path;
use trun_metadata::Event;

/// The user's invocation: the child command and args, exactly as given
/// after the tool's own name (and any `--` separator already stripped by
/// the caller).
#[derive(Clone, Debug)]
pub struct Invocation {
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(args: Vec<String>) -> Self {
        Self { args }
    }

    pub fn program(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

/// An adapter payload to extract into the run directory before the child
/// is spawned.
pub struct Adapter {
    /// File name the payload is written as, under `<run-dir>/adapters/`.
    pub file_name: &'static str,
    /// The adapter's source, embedded at compile time. Source/implementation
    /// detail; only the wire contract in `trun-metadata` is specified.
    pub contents: &'static str,
}

/// A parser that turns a native-stream runner's own stdout into Event
/// Channel events. Invoked per line by the stdio tail worker.
pub trait NativeStreamParser: Send {
    /// Feeds one line of the child's stdout to the parser, returning any
    /// events it produced.
    fn feed_line(&mut self, line: &str) -> Vec<Event>;

    /// Called once the child's stdout reaches EOF. Synthesizes a final
    /// `testGroupResult`/setup-failure event for any group this parser
    /// never saw a terminal result for (spec §4.4: "handle the case where
    /// the runner exits before emitting a group result").
    fn finish(&mut self, captured_stderr: &str) -> Vec<Event>;
}

/// Per-runner strategy: detection, command rewriting, and (for
/// native-stream runners) stream parsing.
pub trait RunnerDefinition: Send + Sync {
    /// Human-readable name, used in the registry's "no runner detected"
    /// message and in logs.
    fn name(&self) -> &'static str;

    /// Returns true if this definition should handle `invocation`.
    fn matches(&self, invocation: &Invocation, project: &ProjectMetadata) -> bool;

    /// Rewrites the child command to inject the reporter (adapter-based
    /// runners, given the adapter's extracted path) or enable the runner's
    /// own structured output (native-stream runners, `adapter_path` is
    /// `None`), and to force a non-watch, single-run mode.
    fn rewrite_command(
        &self,
        invocation: &Invocation,
        project: &ProjectMetadata,
        adapter_path: Option<&Utf8Path>,
    ) -> Vec<String>;

    /// Extra environment variables the child needs beyond the channel path
    /// and debug level, which the orchestrator sets unconditionally (e.g.
    /// the Rust nightly-output toggle for `cargo test`, or nextest's JSON
    /// toggle).
    fn extra_env_vars(&self) -> Vec<(&'static str, &'static str)> {
        Vec::new()
    }

    /// `Some(adapter)` for adapter-based runners; `None` for native-stream
    /// runners.
    fn adapter(&self) -> Option<Adapter> {
        None
    }

    /// `Some(parser)` for native-stream runners; `None` for adapter-based
    /// runners, whose events arrive solely over the event channel.
    fn native_parser(&self) -> Option<Box<dyn NativeStreamParser>> {
        None
    }
}

/// Ordered lookup from an invocation to exactly one [`RunnerDefinition`].
///
/// Registry order is deterministic: native-language tools (identified by
/// their own binary name) are checked first since they're unambiguous,
/// followed by the JS/Python adapter-based runners, with package-manager
/// indirection resolved by each definition's own `matches` implementation.
pub struct Registry {
    definitions: Vec<Box<dyn RunnerDefinition>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

impl Registry {
    /// The registry wired up with every Runner Definition this crate
    /// ships.
    pub fn standard() -> Self {
        Self {
            definitions: vec![
                Box::new(nextest::NextestRunner),
                Box::new(cargo_test::CargoTestRunner),
                Box::new(go_test::GoTestRunner),
                Box::new(jest::JestRunner),
                Box::new(vitest::VitestRunner),
                Box::new(pytest::PytestRunner),
            ],
        }
    }

    /// Returns the single definition that matches `invocation`, or an
    /// error listing the supported runners.
    pub fn detect(
        &self,
        invocation: &Invocation,
        project: &ProjectMetadata,
    ) -> Result<&dyn RunnerDefinition, NoRunnerDetected> {
        self.definitions
            .iter()
            .find(|def| def.matches(invocation, project))
            .map(|def| def.as_ref())
            .ok_or_else(|| NoRunnerDetected {
                command: invocation.args.clone(),
                supported: self.definitions.iter().map(|d| d.name()).collect(),
            })
    }
}

/// Reads project metadata (package manifests) needed for indirect
/// invocation detection. Never fatal: a missing or unparseable manifest
/// just yields an empty [`ProjectMetadata`], meaning only direct
/// invocations will be recognized.
pub fn load_project_metadata(cwd: &Utf8Path) -> ProjectMetadata {
    ProjectMetadata::load(cwd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmatched_invocation_lists_supported_runners() {
        let registry = Registry::standard();
        let invocation = Invocation::new(vec!["some-unknown-tool".to_string()]);
        let project = ProjectMetadata::default();
        let error = registry.detect(&invocation, &project).unwrap_err();
        assert!(error.supported.contains(&"jest"));
        assert!(error.supported.contains(&"cargo-nextest"));
    }
}

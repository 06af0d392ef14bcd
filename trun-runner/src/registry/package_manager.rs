// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Project manifest introspection used to resolve indirect invocations
//! such as `npm test` or `pnpm run test` down to the underlying runner.

use camino::Utf8Path;
use std::collections::HashMap;

/// The subset of a `package.json` needed to resolve an npm/yarn/pnpm
/// script indirection to the binary it ultimately invokes.
#[derive(Debug, Clone, Default)]
pub struct ProjectMetadata {
    /// `scripts` entries from `package.json`, if present.
    pub npm_scripts: HashMap<String, String>,
}

impl ProjectMetadata {
    /// Reads `package.json` from `dir`, if present. Never fails: a missing
    /// or malformed manifest just yields no scripts, meaning only direct
    /// invocations will be recognized.
    pub fn load(dir: &Utf8Path) -> Self {
        let path = dir.join("package.json");
        let Ok(contents) = std::fs::read_to_string(&path) else {
            return Self::default();
        };

        let parsed: serde_json::Value = match serde_json::from_str(&contents) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(%error, path = %path, "failed to parse package.json, ignoring");
                return Self::default();
            }
        };

        let npm_scripts = parsed
            .get("scripts")
            .and_then(|scripts| scripts.as_object())
            .map(|scripts| {
                scripts
                    .iter()
                    .filter_map(|(key, value)| Some((key.clone(), value.as_str()?.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        Self { npm_scripts }
    }

    /// Resolves an npm/yarn/pnpm script name (e.g. `"test"` from `npm run
    /// test`, or `"test"` implied by bare `npm test`) to the command line
    /// it runs.
    pub fn resolve_script(&self, name: &str) -> Option<Vec<String>> {
        let command = self.npm_scripts.get(name)?;
        let tokens = shell_words::split(command).ok()?;
        if tokens.is_empty() { None } else { Some(tokens) }
    }
}

/// The package managers whose script indirection `matches` implementations
/// need to recognize.
pub const NODE_PACKAGE_MANAGERS: &[&str] = &["npm", "yarn", "pnpm", "npx", "pnpm dlx"];

/// If `invocation_args` is a package-manager invocation of an npm script
/// (`npm test`, `npm run test`, `yarn test`, `pnpm test`, ...), returns the
/// resolved command line for that script. Returns `None` for direct
/// invocations (`jest`, `npx jest`, ...) and unrecognized indirections.
pub fn resolve_indirect_script(args: &[String], project: &ProjectMetadata) -> Option<Vec<String>> {
    let program = args.first()?.as_str();
    if !matches!(program, "npm" | "yarn" | "pnpm") {
        return None;
    }

    let script_name = match args.get(1).map(String::as_str) {
        Some("test") => "test",
        Some("run") => args.get(2)?.as_str(),
        _ => return None,
    };

    project.resolve_script(script_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_npm_test_shorthand() {
        let project = ProjectMetadata {
            npm_scripts: HashMap::from([("test".to_string(), "jest --ci".to_string())]),
        };
        let args = vec!["npm".to_string(), "test".to_string()];
        assert_eq!(
            resolve_indirect_script(&args, &project),
            Some(vec!["jest".to_string(), "--ci".to_string()])
        );
    }

    #[test]
    fn resolves_npm_run_with_explicit_script_name() {
        let project = ProjectMetadata {
            npm_scripts: HashMap::from([("unit".to_string(), "vitest run".to_string())]),
        };
        let args = vec!["npm".to_string(), "run".to_string(), "unit".to_string()];
        assert_eq!(
            resolve_indirect_script(&args, &project),
            Some(vec!["vitest".to_string(), "run".to_string()])
        );
    }

    #[test]
    fn direct_invocation_is_not_resolved() {
        let project = ProjectMetadata::default();
        let args = vec!["jest".to_string()];
        assert_eq!(resolve_indirect_script(&args, &project), None);
    }

    #[test]
    fn missing_script_yields_none() {
        let project = ProjectMetadata::default();
        let args = vec!["npm".to_string(), "test".to_string()];
        assert_eq!(resolve_indirect_script(&args, &project), None);
    }
}

// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stable group identity: derivation and filesystem-safe sanitization.

use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use xxhash_rust::xxh3::xxh3_64;

/// A stable identifier for a group, derived by hashing the normalized
/// parent chain plus the group's own name.
///
/// Two references to the same physical file (`./a.test.js`, an absolute
/// path, or a path reached through a symlink) must normalize to the same
/// [`GroupId`]. The hash is also the sanitized directory name used under
/// `reports/`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(String);

impl GroupId {
    /// Derives a `GroupId` from an already-normalized parent chain and name.
    ///
    /// Callers are responsible for normalization (see
    /// [`normalize_group_name`]): this function only hashes.
    pub fn derive(normalized_parent_names: &[String], normalized_name: &str) -> Self {
        let mut joined = String::new();
        for parent in normalized_parent_names {
            joined.push_str(parent);
            joined.push('\u{1}'); // separator unlikely to appear in names
        }
        joined.push_str(normalized_name);

        let hash = xxh3_64(joined.as_bytes());
        Self(format!("{hash:016x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalizes a group name for the purposes of identity derivation.
///
/// If the name looks like a filesystem path (contains a path separator, or
/// resolves to an existing file), it's resolved to an absolute,
/// symlink-free path so that `./a.test.js`, `a.test.js`, and a symlink
/// pointing at either collapse to the same identity. Names that aren't
/// paths (a `describe` block's display name, say) are passed through
/// unchanged.
pub fn normalize_group_name(name: &str) -> String {
    let candidate = Utf8Path::new(name);
    if !looks_like_path(name) {
        return name.to_string();
    }

    match candidate.canonicalize_utf8() {
        Ok(resolved) => resolved.into_string(),
        // The file may not exist yet (e.g. under test, or a virtual group
        // name that happens to contain a slash); fall back to a
        // best-effort lexical normalization.
        Err(_) => lexically_normalize(candidate).into_string(),
    }
}

fn looks_like_path(name: &str) -> bool {
    name.contains('/') || name.contains('\\')
}

fn lexically_normalize(path: &Utf8Path) -> Utf8PathBuf {
    let mut out = Utf8PathBuf::new();
    for component in path.components() {
        use camino::Utf8Component::*;
        match component {
            CurDir => {}
            ParentDir => {
                out.pop();
            }
            other => out.push(other.as_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_parent_chain_and_name_yields_same_id() {
        let a = GroupId::derive(&["file.js".to_string()], "suite");
        let b = GroupId::derive(&["file.js".to_string()], "suite");
        assert_eq!(a, b);
    }

    #[test]
    fn different_name_yields_different_id() {
        let a = GroupId::derive(&["file.js".to_string()], "suite-a");
        let b = GroupId::derive(&["file.js".to_string()], "suite-b");
        assert_ne!(a, b);
    }

    #[test]
    fn id_is_filesystem_safe_hex() {
        let id = GroupId::derive(&[], "weird/../name");
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id.as_str().len(), 16);
    }

    #[test]
    fn relative_and_absolute_paths_to_same_file_normalize_equal() {
        let dir = camino_tempfile::tempdir().unwrap();
        let file = dir.path().join("a.test.js");
        std::fs::write(&file, "").unwrap();

        let abs = normalize_group_name(file.as_str());
        let cwd_guard = dir.path().to_path_buf();
        std::env::set_current_dir(&cwd_guard).unwrap();
        let rel = normalize_group_name("./a.test.js");
        assert_eq!(abs, rel);
    }

    #[test]
    fn non_path_names_pass_through() {
        assert_eq!(normalize_group_name("describes a widget"), "describes a widget");
    }

    #[test]
    fn nonexistent_path_falls_back_to_lexical_normalization() {
        // No such file exists, so this can't canonicalize; normalization
        // still has to collapse `./` and `..` lexically.
        let normalized = normalize_group_name("pkg/./sub/../a.test.js");
        assert!(normalized.ends_with("pkg/a.test.js"));
    }
}

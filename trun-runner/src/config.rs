// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Project-level configuration.
//!
//! Flag parsing is out of scope for this crate, so the configuration
//! surface is deliberately small: the two knobs the design calls out as
//! externally tunable (the debug-level threshold and the report writer's
//! debounce ceiling). Absence of a config file is not an error; defaults
//! apply. Reads `.3pio/config.toml` relative to the current directory, the
//! same directory family as the run directory root.

use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, File, FileFormat};
use serde::Deserialize;
use std::time::Duration;

/// Default ceiling on the report writer's debounce window (spec §4.6: "The
/// debounce must be bounded by a max-wait so that updates become visible
/// within a predictable ceiling").
const DEFAULT_DEBOUNCE_MAX_WAIT: Duration = Duration::from_millis(200);

/// Default log threshold, mirrored into the adapters' environment variable.
const DEFAULT_DEBUG_LEVEL: &str = "info";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct RawSettings {
    debug_level: String,
    #[serde(with = "humantime_serde")]
    debounce_max_wait: Duration,
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            debug_level: DEFAULT_DEBUG_LEVEL.to_string(),
            debounce_max_wait: DEFAULT_DEBOUNCE_MAX_WAIT,
        }
    }
}

/// Resolved project settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub debug_level: String,
    pub debounce_max_wait: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        RawSettings::default().into()
    }
}

impl From<RawSettings> for Settings {
    fn from(raw: RawSettings) -> Self {
        Self {
            debug_level: raw.debug_level,
            debounce_max_wait: raw.debounce_max_wait,
        }
    }
}

impl Settings {
    /// Loads settings from `<dir>/.3pio/config.toml`, if present.
    ///
    /// A missing file yields defaults. A present-but-malformed file is
    /// logged and defaults are used rather than aborting the run: this
    /// file only affects ambient tuning, not run correctness.
    pub fn load(dir: &Utf8Path) -> Self {
        let path = Self::config_path(dir);
        if !path.exists() {
            return Self::default();
        }

        let builder = Config::builder().add_source(File::new(path.as_str(), FileFormat::Toml));
        match builder.build().and_then(|c| c.try_deserialize::<RawSettings>()) {
            Ok(raw) => raw.into(),
            Err(error) => {
                tracing::warn!(%error, path = %path, "failed to parse config, using defaults");
                Self::default()
            }
        }
    }

    pub fn config_path(dir: &Utf8Path) -> Utf8PathBuf {
        dir.join(".3pio").join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_file_yields_defaults() {
        let dir = camino_tempfile::tempdir().unwrap();
        let settings = Settings::load(dir.path());
        assert_eq!(settings.debug_level, DEFAULT_DEBUG_LEVEL);
        assert_eq!(settings.debounce_max_wait, DEFAULT_DEBOUNCE_MAX_WAIT);
    }

    #[test]
    fn config_file_overrides_defaults() {
        let dir = camino_tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".3pio")).unwrap();
        std::fs::write(
            Settings::config_path(dir.path()),
            "debug-level = \"debug\"\ndebounce-max-wait = \"500ms\"\n",
        )
        .unwrap();

        let settings = Settings::load(dir.path());
        assert_eq!(settings.debug_level, "debug");
        assert_eq!(settings.debounce_max_wait, Duration::from_millis(500));
    }

    #[test]
    fn malformed_config_file_falls_back_to_defaults() {
        let dir = camino_tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".3pio")).unwrap();
        std::fs::write(Settings::config_path(dir.path()), "not = [valid").unwrap();

        let settings = Settings::load(dir.path());
        assert_eq!(settings.debug_level, DEFAULT_DEBUG_LEVEL);
    }
}

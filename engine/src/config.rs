//! Runtime settings.
//!
//! Loaded from the environment (a `.env` file is honored when present):
//!
//! | Variable                | Default                     |
//! |-------------------------|-----------------------------|
//! | `CURATOR_EXPORT_DIR`    | `exports`                   |
//! | `CURATOR_CONSOLE_LEVEL` | `info`                      |
//! | `CURATOR_CHANGELOG`     | `<export dir>/changelog.txt`|

use std::env;
use std::path::PathBuf;

use crate::diagnostics::Level;
use crate::error::{ConfigError, ConfigResult};

pub const DEFAULT_EXPORT_DIR: &str = "exports";
pub const CHANGELOG_FILE: &str = "changelog.txt";

/// Where artifacts go and how loud the console is.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Default directory for exported artifacts.
    pub export_dir: PathBuf,
    /// Console echo threshold.
    pub console_level: Level,
    /// Append-mode changelog file.
    pub changelog_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        let export_dir = PathBuf::from(DEFAULT_EXPORT_DIR);
        Self {
            changelog_path: export_dir.join(CHANGELOG_FILE),
            export_dir,
            console_level: Level::Info,
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let export_dir = lookup("CURATOR_EXPORT_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_DIR));

        let console_level = match lookup("CURATOR_CONSOLE_LEVEL") {
            Some(raw) => raw.parse::<Level>().map_err(|e| ConfigError::InvalidSetting {
                key: "CURATOR_CONSOLE_LEVEL".to_string(),
                message: e.to_string(),
            })?,
            None => Level::Info,
        };

        let changelog_path = lookup("CURATOR_CHANGELOG")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| export_dir.join(CHANGELOG_FILE));

        Ok(Self {
            export_dir,
            console_level,
            changelog_path,
        })
    }

    /// Same settings with another export directory (changelog follows unless set explicitly).
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if self.changelog_path == self.export_dir.join(CHANGELOG_FILE) {
            self.changelog_path = dir.join(CHANGELOG_FILE);
        }
        self.export_dir = dir;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(|_| None).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.changelog_path, PathBuf::from("exports/changelog.txt"));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CURATOR_EXPORT_DIR", "/tmp/out"),
            ("CURATOR_CONSOLE_LEVEL", "Warning"),
        ]
        .into_iter()
        .collect();
        let settings = Settings::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(settings.export_dir, PathBuf::from("/tmp/out"));
        assert_eq!(settings.console_level, Level::Warning);
        assert_eq!(settings.changelog_path, PathBuf::from("/tmp/out/changelog.txt"));
    }

    #[test]
    fn test_invalid_level() {
        let err = Settings::from_lookup(|k| {
            (k == "CURATOR_CONSOLE_LEVEL").then(|| "shouty".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { .. }));
    }

    #[test]
    fn test_with_export_dir_moves_default_changelog() {
        let settings = Settings::default().with_export_dir("out");
        assert_eq!(settings.changelog_path, PathBuf::from("out/changelog.txt"));
    }
}

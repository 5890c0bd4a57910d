//! Project configuration (`pinfile.toml`).
//!
//! ```toml
//! [project]
//! manifests = ["requirements.txt", "requirements/*.txt"]
//! exclude = ["requirements/legacy.txt"]
//!
//! [check]
//! duplicates = "deny"
//! editable-paths = "deny"
//! absolute-editable = "warn"
//! ```
//!
//! Every field is optional; a project without the file uses the defaults.

use crate::manifest::MANIFEST_FILE;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// The configuration filename.
pub const CONFIG_FILE: &str = "pinfile.toml";

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// The complete pinfile.toml configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Which manifests belong to the project.
    #[serde(default)]
    pub project: ProjectConfig,

    /// How findings are reported.
    #[serde(default)]
    pub check: CheckConfig,
}

/// The `[project]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Glob patterns, relative to the project root, selecting manifests.
    #[serde(default = "default_manifests")]
    pub manifests: Vec<String>,

    /// Glob patterns of manifests to skip.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            manifests: default_manifests(),
            exclude: Vec::new(),
        }
    }
}

fn default_manifests() -> Vec<String> {
    vec![MANIFEST_FILE.to_string()]
}

/// The `[check]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct CheckConfig {
    /// Identical declarations repeated in one manifest.
    #[serde(default = "Level::deny")]
    pub duplicates: Level,

    /// Editable install whose path does not exist.
    #[serde(default = "Level::deny")]
    pub editable_paths: Level,

    /// Editable install with an absolute path.
    #[serde(default = "Level::warn")]
    pub absolute_editable: Level,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            duplicates: Level::Deny,
            editable_paths: Level::Deny,
            absolute_editable: Level::Warn,
        }
    }
}

/// How a configurable finding is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Not reported.
    Allow,
    /// Reported as a warning.
    Warn,
    /// Reported as an error.
    Deny,
}

impl Level {
    fn warn() -> Self {
        Self::Warn
    }

    fn deny() -> Self {
        Self::Deny
    }
}

impl Config {
    /// Load configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load `pinfile.toml` from a directory, or the defaults if it is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = dir.as_ref().join(CONFIG_FILE);
        if path.exists() {
            Self::from_path(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or has unknown fields.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize the configuration to a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.project.manifests, vec!["requirements.txt"]);
        assert_eq!(config.check.duplicates, Level::Deny);
        assert_eq!(config.check.absolute_editable, Level::Warn);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[project]
manifests = ["requirements.txt", "requirements/*.txt"]
exclude = ["requirements/legacy.txt"]

[check]
duplicates = "warn"
editable-paths = "allow"
absolute-editable = "deny"
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.project.manifests.len(), 2);
        assert_eq!(config.project.exclude, vec!["requirements/legacy.txt"]);
        assert_eq!(config.check.duplicates, Level::Warn);
        assert_eq!(config.check.editable_paths, Level::Allow);
        assert_eq!(config.check.absolute_editable, Level::Deny);
    }

    #[test]
    fn partial_check_section_keeps_defaults() {
        let config = Config::parse("[check]\nduplicates = \"allow\"\n").unwrap();
        assert_eq!(config.check.duplicates, Level::Allow);
        assert_eq!(config.check.editable_paths, Level::Deny);
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = Config::parse("[check]\nhashes = \"deny\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_unknown_level() {
        let err = Config::parse("[check]\nduplicates = \"fatal\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_missing_file_is_default() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load_or_default(tmp.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_from_directory() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE),
            "[project]\nmanifests = [\"deps/*.txt\"]\n",
        )
        .unwrap();
        let config = Config::load_or_default(tmp.path()).unwrap();
        assert_eq!(config.project.manifests, vec!["deps/*.txt"]);
    }

    #[test]
    fn toml_round_trip_of_defaults() {
        let text = Config::default().to_toml_string().unwrap();
        assert_eq!(Config::parse(&text).unwrap(), Config::default());
    }
}

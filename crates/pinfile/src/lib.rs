//! Pinned dependency manifests.
//!
//! This crate provides:
//! - Parsing of `requirements.txt` manifests made of exact pins
//!   (`name==version`), editable installs (`-e ./path`), comments and blanks
//! - Structural checks: line grammar, duplicate and conflicting pins,
//!   editable paths that are missing or absolute
//! - Editing (add, bump, remove) that leaves every other line untouched
//! - Project configuration (`pinfile.toml`) and manifest discovery

mod check;
mod config;
mod manifest;
mod name;
mod project;
mod requirement;
mod version;

pub use check::{Checker, Code, Diagnostic, Report, Severity};
pub use config::{CheckConfig, Config, ConfigError, Level, ProjectConfig, CONFIG_FILE};
pub use manifest::{Manifest, ManifestError, MANIFEST_FILE};
pub use name::{normalize, NameError, PackageName, MAX_NAME_LEN};
pub use project::{
    ManifestReport, Project, ProjectError, ProjectLayout, ProjectManifest, ProjectReport,
};
pub use requirement::{
    EditableInstall, Line, LineError, LineErrorKind, Pin, Requirement, EDITABLE_FLAG,
    PIN_OPERATOR,
};
pub use version::{BumpLevel, PinVersion, VersionError};

//! Structural validation of manifests.
//!
//! The checker reports, per manifest:
//! - lines that are not blank, a comment, an exact pin or an editable install
//! - packages pinned more than once, as an error when the versions conflict
//! - editable installs declared more than once
//! - editable installs whose path is absolute or does not exist

use crate::config::{CheckConfig, Level};
use crate::manifest::Manifest;
use crate::requirement::{LineError, Pin, Requirement};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Severity of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    fn from_level(level: Level) -> Option<Self> {
        match level {
            Level::Allow => None,
            Level::Warn => Some(Self::Warning),
            Level::Deny => Some(Self::Error),
        }
    }

    /// Returns the severity as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identifier of a kind of finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Code {
    Syntax,
    ConflictingPin,
    DuplicatePin,
    DuplicateEditable,
    MissingEditablePath,
    AbsoluteEditable,
}

impl Code {
    /// Returns the code as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Syntax => "syntax",
            Self::ConflictingPin => "conflicting-pin",
            Self::DuplicatePin => "duplicate-pin",
            Self::DuplicateEditable => "duplicate-editable",
            Self::MissingEditablePath => "missing-editable-path",
            Self::AbsoluteEditable => "absolute-editable",
        }
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// 1-based line number.
    pub line: usize,
    pub code: Code,
    pub message: String,
}

/// Renders as `line: severity[code]: message`; [`Report::render`] prefixes
/// the origin.
impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}[{}]: {}",
            self.line, self.severity, self.code, self.message
        )
    }
}

/// All findings for one manifest, ordered by line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    /// Returns true if there are no findings at all.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Returns true if any finding is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// All error findings.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(Severity::Error)
    }

    /// All warning findings.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(Severity::Warning)
    }

    /// Findings with a given code.
    pub fn with_code(&self, code: Code) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.code == code)
    }

    /// Render as `origin:line: severity[code]: message`, one finding per line.
    #[must_use]
    pub fn render(&self, origin: &str) -> String {
        self.diagnostics
            .iter()
            .map(|d| format!("{origin}:{d}\n"))
            .collect()
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.severity == severity)
    }

    fn push(&mut self, severity: Severity, line: usize, code: Code, message: String) {
        self.diagnostics.push(Diagnostic {
            severity,
            line,
            code,
            message,
        });
    }

    fn push_at(&mut self, level: Level, line: usize, code: Code, message: String) {
        if let Some(severity) = Severity::from_level(level) {
            self.push(severity, line, code, message);
        }
    }
}

/// Manifest checker.
#[derive(Debug, Clone, Copy, Default)]
pub struct Checker {
    config: CheckConfig,
}

impl Checker {
    /// Create a checker with the given settings.
    #[must_use]
    pub fn new(config: CheckConfig) -> Self {
        Self { config }
    }

    /// Check manifest text. Editable paths are resolved against `base_dir`.
    #[must_use]
    pub fn check_source(&self, content: &str, base_dir: &Path) -> Report {
        let (manifest, errors) = Manifest::parse_lenient(content);
        self.check_lenient(&manifest, &errors, base_dir)
    }

    /// Check an already parsed manifest.
    #[must_use]
    pub fn check_manifest(&self, manifest: &Manifest, base_dir: &Path) -> Report {
        self.check_lenient(manifest, &[], base_dir)
    }

    /// Check the result of [`Manifest::parse_lenient`], reporting its line
    /// errors alongside the findings on the lines that did parse.
    #[must_use]
    pub fn check_lenient(&self, manifest: &Manifest, errors: &[LineError], base_dir: &Path) -> Report {
        let mut report = Report::default();
        for err in errors {
            report.push(Severity::Error, err.line, Code::Syntax, err.kind.to_string());
        }
        self.check_declarations(manifest, base_dir, &mut report);
        report.diagnostics.sort_by_key(|d| d.line);

        report
    }

    fn check_declarations(&self, manifest: &Manifest, base_dir: &Path, report: &mut Report) {
        let mut pins: HashMap<&str, (usize, &Pin)> = HashMap::new();
        let mut editables: HashMap<&str, usize> = HashMap::new();

        for (line, requirement) in manifest.numbered_requirements() {
            match requirement {
                Requirement::Pin(pin) => match pins.get(pin.name.normalized()).copied() {
                    None => {
                        pins.insert(pin.name.normalized(), (line, pin));
                    }
                    Some((first_line, first)) if first.version != pin.version => {
                        report.push(
                            Severity::Error,
                            line,
                            Code::ConflictingPin,
                            format!(
                                "package '{}' is pinned to {} but line {first_line} pins it to {}",
                                pin.name, pin.version, first.version
                            ),
                        );
                    }
                    Some((first_line, _)) => {
                        report.push_at(
                            self.config.duplicates,
                            line,
                            Code::DuplicatePin,
                            format!("package '{}' is already pinned on line {first_line}", pin.name),
                        );
                    }
                },
                Requirement::Editable(editable) => {
                    if let Some(first_line) = editables.get(editable.normalized_path()).copied() {
                        report.push_at(
                            self.config.duplicates,
                            line,
                            Code::DuplicateEditable,
                            format!(
                                "editable install '{}' is already declared on line {first_line}",
                                editable.path
                            ),
                        );
                        continue;
                    }
                    editables.insert(editable.normalized_path(), line);

                    if editable.is_absolute() {
                        report.push_at(
                            self.config.absolute_editable,
                            line,
                            Code::AbsoluteEditable,
                            format!(
                                "editable path '{}' is absolute, expected a path relative to the project root",
                                editable.path
                            ),
                        );
                    }

                    if !base_dir.join(&editable.path).exists() {
                        report.push_at(
                            self.config.editable_paths,
                            line,
                            Code::MissingEditablePath,
                            format!("editable path '{}' does not exist", editable.path),
                        );
                    }
                }
            }
        }
    }
}

//! Dependency manifest (`requirements.txt`) parsing and editing.
//!
//! A manifest is kept line by line. Lines that are not touched by an edit
//! render back exactly as they were read, so comments, blank separators and
//! ordering survive an `add`, `bump` or `remove`.

use crate::name::normalize;
use crate::requirement::{EditableInstall, Line, LineError, Pin, Requirement};
use crate::version::{BumpLevel, PinVersion, VersionError};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

/// The conventional manifest filename.
pub const MANIFEST_FILE: &str = "requirements.txt";

/// Errors that can occur when working with manifests.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse manifest: {0}")]
    Line(#[from] LineError),

    #[error("package '{0}' is already declared")]
    DuplicatePackage(String),

    #[error("editable install '{0}' is already declared")]
    DuplicateEditable(String),

    #[error("package '{0}' is not declared")]
    PackageNotFound(String),

    #[error("editable install '{0}' is not declared")]
    EditableNotFound(String),

    #[error("cannot update version of '{package}': {source}")]
    Version {
        package: String,
        source: VersionError,
    },

    #[error("failed to serialize manifest: {0}")]
    Json(#[from] serde_json::Error),
}

/// One physical line of the manifest.
#[derive(Debug, Clone)]
struct Entry {
    /// Text as read (without the line terminator), or canonical text after an edit.
    text: String,
    /// `None` for lines kept by a lenient parse that did not parse.
    line: Option<Line>,
}

impl Entry {
    fn requirement(&self) -> Option<&Requirement> {
        self.line.as_ref().and_then(Line::requirement)
    }

    fn pin(&self) -> Option<&Pin> {
        match self.requirement() {
            Some(Requirement::Pin(pin)) => Some(pin),
            _ => None,
        }
    }

    fn editable(&self) -> Option<&EditableInstall> {
        match self.requirement() {
            Some(Requirement::Editable(editable)) => Some(editable),
            _ => None,
        }
    }

    fn from_requirement(requirement: Requirement) -> Self {
        Self {
            text: requirement.to_string(),
            line: Some(Line::Requirement(requirement)),
        }
    }
}

/// A parsed dependency manifest.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    entries: Vec<Entry>,
    trailing_newline: bool,
}

#[derive(Serialize)]
struct Export<'a> {
    requirements: Vec<&'a Requirement>,
}

impl Manifest {
    /// Create an empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a manifest from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a line does not parse.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a manifest, failing on the first invalid line.
    ///
    /// # Errors
    ///
    /// Returns the first line that is neither blank, a comment, a pin nor an
    /// editable install.
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let (manifest, errors) = Self::parse_lenient(content);
        match errors.into_iter().next() {
            Some(err) => Err(err.into()),
            None => Ok(manifest),
        }
    }

    /// Parse a manifest, collecting every invalid line instead of stopping.
    ///
    /// Invalid lines are kept verbatim so line numbers and rendering are
    /// unaffected, but they contribute no declarations.
    #[must_use]
    pub fn parse_lenient(content: &str) -> (Self, Vec<LineError>) {
        let trailing_newline = content.ends_with('\n');
        let body = content.strip_suffix('\n').unwrap_or(content);

        let mut entries = Vec::new();
        let mut errors = Vec::new();

        if !content.is_empty() {
            for (idx, raw) in body.split('\n').enumerate() {
                let text = raw.strip_suffix('\r').unwrap_or(raw).to_string();
                let line = match Line::parse(&text) {
                    Ok(line) => Some(line),
                    Err(kind) => {
                        errors.push(LineError {
                            line: idx + 1,
                            kind,
                        });
                        None
                    }
                };
                entries.push(Entry { text, line });
            }
        }

        (
            Self {
                entries,
                trailing_newline,
            },
            errors,
        )
    }

    /// All declarations in file order.
    pub fn requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.entries.iter().filter_map(Entry::requirement)
    }

    /// All declarations with their 1-based line numbers.
    pub fn numbered_requirements(&self) -> impl Iterator<Item = (usize, &Requirement)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(idx, entry)| entry.requirement().map(|req| (idx + 1, req)))
    }

    /// All registry pins in file order.
    pub fn pins(&self) -> impl Iterator<Item = &Pin> {
        self.entries.iter().filter_map(Entry::pin)
    }

    /// All editable installs in file order.
    pub fn editables(&self) -> impl Iterator<Item = &EditableInstall> {
        self.entries.iter().filter_map(Entry::editable)
    }

    /// Get the pin for a package. Names are compared normalized.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Pin> {
        self.pin_position(name).and_then(|idx| self.entries[idx].pin())
    }

    /// Returns true if the package is pinned in this manifest.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.pin_position(name).is_some()
    }

    /// Number of declarations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.requirements().count()
    }

    /// Returns true if the manifest declares nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requirements().next().is_none()
    }

    /// Number of physical lines, including comments and blanks.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.entries.len()
    }

    /// Append a pin.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::DuplicatePackage`] if the package is already
    /// pinned.
    pub fn add(&mut self, pin: Pin) -> Result<(), ManifestError> {
        if self.contains(pin.name.normalized()) {
            return Err(ManifestError::DuplicatePackage(pin.name.to_string()));
        }
        self.push(Requirement::Pin(pin));
        Ok(())
    }

    /// Append an editable install.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::DuplicateEditable`] if the path is already
    /// declared.
    pub fn add_editable(&mut self, editable: EditableInstall) -> Result<(), ManifestError> {
        if self.editable_position(editable.normalized_path()).is_some() {
            return Err(ManifestError::DuplicateEditable(editable.path));
        }
        self.push(Requirement::Editable(editable));
        Ok(())
    }

    /// Replace the version of a pinned package, returning the old version.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::PackageNotFound`] if the package is not pinned.
    pub fn set_version(
        &mut self,
        name: &str,
        version: PinVersion,
    ) -> Result<PinVersion, ManifestError> {
        let idx = self
            .pin_position(name)
            .ok_or_else(|| ManifestError::PackageNotFound(name.to_string()))?;

        let Some(mut pin) = self.entries[idx].pin().cloned() else {
            return Err(ManifestError::PackageNotFound(name.to_string()));
        };
        let previous = std::mem::replace(&mut pin.version, version);
        self.entries[idx] = Entry::from_requirement(Requirement::Pin(pin));

        Ok(previous)
    }

    /// Bump a pinned package's version, returning the new version.
    ///
    /// # Errors
    ///
    /// Returns an error if the package is not pinned or its version cannot be
    /// bumped.
    pub fn bump(&mut self, name: &str, level: BumpLevel) -> Result<PinVersion, ManifestError> {
        let pin = self
            .get(name)
            .ok_or_else(|| ManifestError::PackageNotFound(name.to_string()))?;

        let next = pin
            .version
            .bumped(level)
            .map_err(|source| ManifestError::Version {
                package: pin.name.to_string(),
                source,
            })?;

        self.set_version(name, next.clone())?;
        Ok(next)
    }

    /// Remove a pinned package, returning its pin.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::PackageNotFound`] if the package is not pinned.
    pub fn remove(&mut self, name: &str) -> Result<Pin, ManifestError> {
        let idx = self
            .pin_position(name)
            .ok_or_else(|| ManifestError::PackageNotFound(name.to_string()))?;

        match self.entries.remove(idx).line {
            Some(Line::Requirement(Requirement::Pin(pin))) => Ok(pin),
            _ => Err(ManifestError::PackageNotFound(name.to_string())),
        }
    }

    /// Remove an editable install by path.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::EditableNotFound`] if no editable install has
    /// this path.
    pub fn remove_editable(&mut self, path: &str) -> Result<EditableInstall, ManifestError> {
        let wanted = EditableInstall::new(path);
        let idx = self
            .editable_position(wanted.normalized_path())
            .ok_or_else(|| ManifestError::EditableNotFound(path.to_string()))?;

        match self.entries.remove(idx).line {
            Some(Line::Requirement(Requirement::Editable(editable))) => Ok(editable),
            _ => Err(ManifestError::EditableNotFound(path.to_string())),
        }
    }

    /// Write the manifest to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), ManifestError> {
        std::fs::write(path, self.to_string())?;
        Ok(())
    }

    /// Serialize the declarations to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ManifestError> {
        let export = Export {
            requirements: self.requirements().collect(),
        };
        Ok(serde_json::to_string_pretty(&export)?)
    }

    fn push(&mut self, requirement: Requirement) {
        if self.entries.is_empty() {
            self.trailing_newline = true;
        }
        self.entries.push(Entry::from_requirement(requirement));
    }

    fn pin_position(&self, name: &str) -> Option<usize> {
        let wanted = normalize(name);
        self.entries
            .iter()
            .position(|e| e.pin().is_some_and(|pin| pin.name.normalized() == wanted))
    }

    fn editable_position(&self, normalized_path: &str) -> Option<usize> {
        self.entries.iter().position(|e| {
            e.editable()
                .is_some_and(|editable| editable.normalized_path() == normalized_path)
        })
    }
}

impl std::fmt::Display for Manifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (idx, entry) in self.entries.iter().enumerate() {
            if idx > 0 {
                f.write_str("\n")?;
            }
            f.write_str(&entry.text)?;
        }
        if self.trailing_newline && !self.entries.is_empty() {
            f.write_str("\n")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Manifest {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

//! The grammar of a single manifest line.
//!
//! ```text
//! # comment                  -> Line::Comment
//!                            -> Line::Blank
//! torch==2.0.1               -> Requirement::Pin
//! -e ./pykan_editable        -> Requirement::Editable
//! ```
//!
//! Everything else (other comparison operators, extras, environment markers,
//! hashes and installer options) is rejected with a specific error.

use crate::name::{NameError, PackageName};
use crate::version::{PinVersion, VersionError};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

/// The flag that introduces an editable install.
pub const EDITABLE_FLAG: &str = "-e";

/// The only accepted version operator.
pub const PIN_OPERATOR: &str = "==";

/// Characters that make up a version comparison operator.
const OPERATOR_CHARS: &[char] = &['=', '<', '>', '!', '~'];

/// Why a line failed to parse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineErrorKind {
    #[error(transparent)]
    InvalidName(#[from] NameError),

    #[error(transparent)]
    InvalidVersion(#[from] VersionError),

    #[error("unsupported version operator '{0}', only exact pins ('==') are allowed")]
    UnsupportedOperator(String),

    #[error("extras are not supported")]
    Extras,

    #[error("environment markers are not supported")]
    EnvironmentMarker,

    #[error("unsupported option '{0}'")]
    UnsupportedOption(String),

    #[error("comments must be on their own line")]
    InlineComment,

    #[error("package '{0}' is not pinned, expected '{0}==<version>'")]
    MissingPin(String),

    #[error("'-e' requires a path")]
    MissingEditablePath,
}

/// A line that failed to parse, with its 1-based line number.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {kind}")]
pub struct LineError {
    pub line: usize,
    pub kind: LineErrorKind,
}

/// An exact version pin resolved from the package registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pin {
    pub name: PackageName,
    pub version: PinVersion,
}

impl Pin {
    /// Create a pin.
    #[must_use]
    pub fn new(name: PackageName, version: PinVersion) -> Self {
        Self { name, version }
    }

    /// Parse a pin from `name==version`.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a single exact pin.
    pub fn parse(text: &str) -> Result<Self, LineErrorKind> {
        match Requirement::parse(text)? {
            Requirement::Pin(pin) => Ok(pin),
            Requirement::Editable(_) => {
                Err(LineErrorKind::UnsupportedOption(EDITABLE_FLAG.to_string()))
            }
        }
    }
}

impl std::fmt::Display for Pin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{PIN_OPERATOR}{}", self.name, self.version)
    }
}

/// A dependency installed in editable mode from a local path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditableInstall {
    pub path: String,
}

impl EditableInstall {
    /// Create an editable install for a path.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// The last component of the path, usually the local package directory.
    #[must_use]
    pub fn name_hint(&self) -> Option<&str> {
        Path::new(&self.path).file_name().and_then(|s| s.to_str())
    }

    /// Returns true if the path is absolute rather than project-relative.
    #[must_use]
    pub fn is_absolute(&self) -> bool {
        Path::new(&self.path).is_absolute()
    }

    /// The path with leading `./` segments and trailing separators removed,
    /// used to compare two editable entries.
    #[must_use]
    pub fn normalized_path(&self) -> &str {
        let mut path = self.path.trim_end_matches('/');
        while let Some(rest) = path.strip_prefix("./") {
            path = rest.trim_start_matches('/');
        }
        path
    }
}

impl std::fmt::Display for EditableInstall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{EDITABLE_FLAG} {}", self.path)
    }
}

/// A dependency declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source")]
pub enum Requirement {
    /// Registry package pinned to an exact version.
    #[serde(rename = "registry")]
    Pin(Pin),
    /// Local editable install.
    #[serde(rename = "local")]
    Editable(EditableInstall),
}

impl Requirement {
    /// Parse a declaration. The text must not be blank or a comment.
    ///
    /// # Errors
    ///
    /// Returns the reason the text is not a supported declaration.
    pub fn parse(text: &str) -> Result<Self, LineErrorKind> {
        let text = text.trim();

        if let Some(rest) = text.strip_prefix(EDITABLE_FLAG) {
            if rest.is_empty() {
                return Err(LineErrorKind::MissingEditablePath);
            }
            if rest.starts_with(char::is_whitespace) {
                return parse_editable(rest.trim());
            }
        }

        if text.starts_with('-') {
            return Err(unsupported_option(text));
        }

        if text.contains('#') {
            return Err(LineErrorKind::InlineComment);
        }

        if let Some(idx) = text.find(" -").or_else(|| text.find("\t-")) {
            return Err(unsupported_option(&text[idx..]));
        }

        if text.contains(';') {
            return Err(LineErrorKind::EnvironmentMarker);
        }

        if text.contains('[') {
            return Err(LineErrorKind::Extras);
        }

        let Some(op_start) = text.find(OPERATOR_CHARS) else {
            let name = PackageName::new(text)?;
            return Err(LineErrorKind::MissingPin(name.to_string()));
        };

        let op_len = text[op_start..]
            .find(|c: char| !OPERATOR_CHARS.contains(&c))
            .unwrap_or(text.len() - op_start);
        let op = &text[op_start..op_start + op_len];
        if op != PIN_OPERATOR {
            return Err(LineErrorKind::UnsupportedOperator(op.to_string()));
        }

        let name = PackageName::new(text[..op_start].trim_end())?;
        let version = PinVersion::parse(text[op_start + op_len..].trim_start())?;

        Ok(Self::Pin(Pin { name, version }))
    }

    /// The package name, for pins.
    #[must_use]
    pub fn name(&self) -> Option<&PackageName> {
        match self {
            Self::Pin(pin) => Some(&pin.name),
            Self::Editable(_) => None,
        }
    }

    /// The pinned version, for pins.
    #[must_use]
    pub fn version(&self) -> Option<&PinVersion> {
        match self {
            Self::Pin(pin) => Some(&pin.version),
            Self::Editable(_) => None,
        }
    }

    /// Returns true if this is an editable install.
    #[must_use]
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Editable(_))
    }
}

impl std::fmt::Display for Requirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pin(pin) => write!(f, "{pin}"),
            Self::Editable(editable) => write!(f, "{editable}"),
        }
    }
}

impl std::str::FromStr for Requirement {
    type Err = LineErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The meaning of one manifest line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Empty or whitespace-only separator.
    Blank,
    /// `#` comment, text kept without surrounding whitespace.
    Comment(String),
    /// A dependency declaration.
    Requirement(Requirement),
}

impl Line {
    /// Classify and parse one line of text.
    ///
    /// # Errors
    ///
    /// Returns the reason a non-blank, non-comment line is not a supported
    /// declaration.
    pub fn parse(text: &str) -> Result<Self, LineErrorKind> {
        let trimmed = text.trim();

        if trimmed.is_empty() {
            Ok(Self::Blank)
        } else if trimmed.starts_with('#') {
            Ok(Self::Comment(trimmed.to_string()))
        } else {
            Requirement::parse(trimmed).map(Self::Requirement)
        }
    }

    /// The declaration on this line, if any.
    #[must_use]
    pub fn requirement(&self) -> Option<&Requirement> {
        match self {
            Self::Requirement(req) => Some(req),
            Self::Blank | Self::Comment(_) => None,
        }
    }
}

fn parse_editable(path: &str) -> Result<Requirement, LineErrorKind> {
    if path.contains('#') {
        return Err(LineErrorKind::InlineComment);
    }
    if let Some(idx) = path.find(char::is_whitespace) {
        return Err(unsupported_option(path[idx..].trim_start()));
    }
    Ok(Requirement::Editable(EditableInstall::new(path)))
}

fn unsupported_option(text: &str) -> LineErrorKind {
    let token = text
        .trim_start()
        .split(|c: char| c.is_whitespace() || c == '=')
        .next()
        .unwrap_or_default();
    LineErrorKind::UnsupportedOption(token.to_string())
}

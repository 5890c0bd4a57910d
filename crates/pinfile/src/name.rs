//! Package names.

use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Longest accepted package name.
pub const MAX_NAME_LEN: usize = 128;

/// Errors produced when validating a package name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("package name cannot be empty")]
    Empty,

    #[error("package name '{0}' exceeds {MAX_NAME_LEN} characters")]
    TooLong(String),

    #[error("package name '{0}' must start and end with a letter or digit")]
    BadBoundary(String),

    #[error("package name '{name}' contains invalid character '{ch}'")]
    InvalidChar { name: String, ch: char },
}

/// A validated package name.
///
/// The name keeps its original spelling for rendering, but equality,
/// ordering and hashing go through [`PackageName::normalized`], so `Torch`,
/// `torch` and `TORCH` denote the same package, as do `typing_extensions`
/// and `typing-extensions`.
#[derive(Debug, Clone)]
pub struct PackageName {
    raw: String,
    normalized: String,
}

impl PackageName {
    /// Validate and wrap a package name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, too long, or contains
    /// characters outside `[A-Za-z0-9._-]`.
    pub fn new(raw: impl Into<String>) -> Result<Self, NameError> {
        let raw = raw.into();

        if raw.is_empty() {
            return Err(NameError::Empty);
        }

        if raw.len() > MAX_NAME_LEN {
            return Err(NameError::TooLong(raw));
        }

        if let Some(ch) = raw
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_' | '.'))
        {
            return Err(NameError::InvalidChar { name: raw, ch });
        }

        let first = raw.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
        let last = raw.chars().last().is_some_and(|c| c.is_ascii_alphanumeric());
        if !first || !last {
            return Err(NameError::BadBoundary(raw));
        }

        let normalized = normalize(&raw);
        Ok(Self { raw, normalized })
    }

    /// The name as written in the manifest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The normalized name used for comparisons.
    #[must_use]
    pub fn normalized(&self) -> &str {
        &self.normalized
    }
}

/// Lowercase and collapse runs of `-`, `_` and `.` into a single `-`.
#[must_use]
pub fn normalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;

    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_separator {
                out.push('-');
            }
            in_separator = true;
        } else {
            out.push(c.to_ascii_lowercase());
            in_separator = false;
        }
    }

    out
}

impl PartialEq for PackageName {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for PackageName {}

impl Hash for PackageName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl PartialOrd for PackageName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.normalized.cmp(&other.normalized)
    }
}

impl std::fmt::Display for PackageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for PackageName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for PackageName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_names() {
        for name in ["torch", "numpy", "pykan", "typing_extensions", "ruff", "types-tqdm", "A1"] {
            assert!(PackageName::new(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(PackageName::new(""), Err(NameError::Empty));
    }

    #[test]
    fn rejects_bad_boundaries() {
        assert!(matches!(PackageName::new("-torch"), Err(NameError::BadBoundary(_))));
        assert!(matches!(PackageName::new("torch."), Err(NameError::BadBoundary(_))));
    }

    #[test]
    fn rejects_invalid_characters() {
        let err = PackageName::new("torch vision").unwrap_err();
        assert_eq!(
            err,
            NameError::InvalidChar {
                name: "torch vision".to_string(),
                ch: ' '
            }
        );
    }

    #[test]
    fn rejects_overlong_names() {
        let name = "a".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(PackageName::new(name), Err(NameError::TooLong(_))));
    }

    #[test]
    fn normalization_collapses_separators() {
        assert_eq!(normalize("Typing__Extensions"), "typing-extensions");
        assert_eq!(normalize("zope.interface"), "zope-interface");
        assert_eq!(normalize("a-_.b"), "a-b");
    }

    #[test]
    fn equality_uses_normalized_form() {
        let a = PackageName::new("Typing_Extensions").unwrap();
        let b = PackageName::new("typing-extensions").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "Typing_Extensions");
        assert_eq!(b.to_string(), "typing-extensions");
    }
}

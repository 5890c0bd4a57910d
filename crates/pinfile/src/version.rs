//! Pinned versions.
//!
//! A pin version is a dot-separated numeric release optionally followed by a
//! suffix (`2.0.1`, `1.26`, `2.0.0rc1`, `0.3.post1`, `1.0+cpu`). The text is
//! kept exactly as written so that a manifest renders back unchanged.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Errors produced when parsing or manipulating a version.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("version cannot be empty")]
    Empty,

    #[error("invalid version '{0}': expected a numeric release such as 1.2.3")]
    InvalidRelease(String),

    #[error("invalid version '{0}': suffix may only contain letters, digits, '.', '+', '-', '_' and '!'")]
    InvalidSuffix(String),

    #[error("version '{0}' cannot be bumped: only plain releases with up to three components can")]
    NotSemver(String),

    #[error("unknown bump level '{0}', expected one of: major, minor, patch")]
    UnknownBumpLevel(String),

    #[error("version '{0}' cannot be bumped: a release component would overflow")]
    Overflow(String),
}

/// A parsed pin version.
#[derive(Debug, Clone)]
pub struct PinVersion {
    raw: String,
    release: Vec<u64>,
    suffix: String,
}

/// Which release component a bump increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpLevel {
    Major,
    Minor,
    Patch,
}

impl BumpLevel {
    /// Returns the level as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
        }
    }

    /// Number of release components needed to express this level.
    fn components(self) -> usize {
        match self {
            Self::Major => 1,
            Self::Minor => 2,
            Self::Patch => 3,
        }
    }
}

impl std::fmt::Display for BumpLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BumpLevel {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "major" => Ok(Self::Major),
            "minor" => Ok(Self::Minor),
            "patch" => Ok(Self::Patch),
            _ => Err(VersionError::UnknownBumpLevel(s.to_string())),
        }
    }
}

impl PinVersion {
    /// Parse a version string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string does not start with a numeric release
    /// or the suffix contains unsupported characters.
    pub fn parse(raw: &str) -> Result<Self, VersionError> {
        if raw.is_empty() {
            return Err(VersionError::Empty);
        }

        let bytes = raw.as_bytes();
        let mut release = Vec::new();
        let mut pos = 0;

        loop {
            let start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            if start == pos {
                return Err(VersionError::InvalidRelease(raw.to_string()));
            }

            let component = raw[start..pos]
                .parse::<u64>()
                .map_err(|_| VersionError::InvalidRelease(raw.to_string()))?;
            release.push(component);

            // A dot continues the release only when a digit follows it;
            // otherwise it opens the suffix (`0.3.post1`).
            let continues = bytes.get(pos) == Some(&b'.')
                && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit);
            if !continues {
                break;
            }
            pos += 1;
        }

        let suffix = &raw[pos..];
        if !suffix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-' | '_' | '!'))
        {
            return Err(VersionError::InvalidSuffix(raw.to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            release,
            suffix: suffix.to_string(),
        })
    }

    /// The version exactly as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The numeric release components.
    #[must_use]
    pub fn release(&self) -> &[u64] {
        &self.release
    }

    /// Everything after the numeric release, possibly empty.
    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Convert to a semantic version.
    ///
    /// Only plain releases with at most three components convert; missing
    /// components are zero.
    #[must_use]
    pub fn to_semver(&self) -> Option<semver::Version> {
        if !self.suffix.is_empty() || self.release.len() > 3 {
            return None;
        }

        let component = |i: usize| self.release.get(i).copied().unwrap_or(0);
        Some(semver::Version::new(component(0), component(1), component(2)))
    }

    /// The next version at the given level.
    ///
    /// The result keeps as many release components as the original, growing
    /// only when the level needs more (`1.26` bumped at patch level gives
    /// `1.26.1`).
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::NotSemver`] if the version has a suffix or more
    /// than three release components, and [`VersionError::Overflow`] if the
    /// bumped component is already `u64::MAX`.
    pub fn bumped(&self, level: BumpLevel) -> Result<Self, VersionError> {
        let current = self
            .to_semver()
            .ok_or_else(|| VersionError::NotSemver(self.raw.clone()))?;

        let overflow = || VersionError::Overflow(self.raw.clone());
        let next = match level {
            BumpLevel::Major => {
                let major = current.major.checked_add(1).ok_or_else(overflow)?;
                semver::Version::new(major, 0, 0)
            }
            BumpLevel::Minor => {
                let minor = current.minor.checked_add(1).ok_or_else(overflow)?;
                semver::Version::new(current.major, minor, 0)
            }
            BumpLevel::Patch => {
                let patch = current.patch.checked_add(1).ok_or_else(overflow)?;
                semver::Version::new(current.major, current.minor, patch)
            }
        };

        let width = self.release.len().max(level.components());
        let text = [next.major, next.minor, next.patch][..width]
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".");

        Self::parse(&text)
    }

    /// Release with trailing zero components removed, for comparisons.
    fn significant_release(&self) -> &[u64] {
        let len = self
            .release
            .iter()
            .rposition(|&c| c != 0)
            .map_or(0, |i| i + 1);
        &self.release[..len]
    }
}

impl PartialEq for PinVersion {
    fn eq(&self, other: &Self) -> bool {
        self.significant_release() == other.significant_release()
            && self.suffix.eq_ignore_ascii_case(&other.suffix)
    }
}

impl Eq for PinVersion {}

impl std::fmt::Display for PinVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for PinVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for PinVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> PinVersion {
        PinVersion::parse(s).unwrap()
    }

    #[test]
    fn parse_plain_release() {
        let version = v("2.0.1");
        assert_eq!(version.release(), &[2, 0, 1]);
        assert_eq!(version.suffix(), "");
        assert_eq!(version.as_str(), "2.0.1");
    }

    #[test]
    fn parse_with_suffixes() {
        assert_eq!(v("2.0.0rc1").suffix(), "rc1");
        assert_eq!(v("0.3.post1").release(), &[0, 3]);
        assert_eq!(v("0.3.post1").suffix(), ".post1");
        assert_eq!(v("1.0+cpu").suffix(), "+cpu");
    }

    #[test]
    fn parse_errors() {
        assert_eq!(PinVersion::parse(""), Err(VersionError::Empty));
        assert!(matches!(
            PinVersion::parse("latest"),
            Err(VersionError::InvalidRelease(_))
        ));
        assert!(matches!(
            PinVersion::parse(".1"),
            Err(VersionError::InvalidRelease(_))
        ));
        assert!(matches!(
            PinVersion::parse("1.0 beta"),
            Err(VersionError::InvalidSuffix(_))
        ));
    }

    #[test]
    fn equality_ignores_trailing_zeros() {
        assert_eq!(v("2.0"), v("2.0.0"));
        assert_eq!(v("1.0RC1"), v("1.0rc1"));
        assert_ne!(v("2.0.1"), v("2.0.2"));
        assert_ne!(v("2.0"), v("2.0rc1"));
    }

    #[test]
    fn converts_to_semver() {
        assert_eq!(v("1.26").to_semver(), Some(semver::Version::new(1, 26, 0)));
        assert_eq!(v("24.4.2").to_semver(), Some(semver::Version::new(24, 4, 2)));
        assert_eq!(v("1.2.3.4").to_semver(), None);
        assert_eq!(v("2.0.0rc1").to_semver(), None);
    }

    #[test]
    fn bump_keeps_component_count() {
        assert_eq!(v("2.0.1").bumped(BumpLevel::Patch).unwrap().as_str(), "2.0.2");
        assert_eq!(v("2.0.1").bumped(BumpLevel::Minor).unwrap().as_str(), "2.1.0");
        assert_eq!(v("2.0.1").bumped(BumpLevel::Major).unwrap().as_str(), "3.0.0");
        assert_eq!(v("1.26").bumped(BumpLevel::Minor).unwrap().as_str(), "1.27");
        assert_eq!(v("1.26").bumped(BumpLevel::Patch).unwrap().as_str(), "1.26.1");
        assert_eq!(v("5").bumped(BumpLevel::Major).unwrap().as_str(), "6");
    }

    #[test]
    fn bump_rejects_non_semver() {
        let err = v("0.3.post1").bumped(BumpLevel::Patch).unwrap_err();
        assert_eq!(err, VersionError::NotSemver("0.3.post1".to_string()));
    }

    #[test]
    fn bump_reports_overflow() {
        let max = u64::MAX.to_string();
        assert_eq!(
            v(&max).bumped(BumpLevel::Major).unwrap_err(),
            VersionError::Overflow(max.clone())
        );

        let minor = format!("1.{max}");
        assert_eq!(
            v(&minor).bumped(BumpLevel::Minor).unwrap_err(),
            VersionError::Overflow(minor.clone())
        );

        let patch = format!("1.2.{max}");
        assert_eq!(
            v(&patch).bumped(BumpLevel::Patch).unwrap_err(),
            VersionError::Overflow(patch.clone())
        );

        // Lower levels reset the overflowing component instead.
        assert_eq!(v(&patch).bumped(BumpLevel::Minor).unwrap().as_str(), "1.3.0");
    }

    #[test]
    fn bump_level_from_str() {
        assert_eq!("minor".parse::<BumpLevel>().unwrap(), BumpLevel::Minor);
        assert!(matches!(
            "huge".parse::<BumpLevel>(),
            Err(VersionError::UnknownBumpLevel(_))
        ));
    }
}

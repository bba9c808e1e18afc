//! Version values and the arithmetic that produces the next one.
//!
//! The engine works on [`SemVer`], a plain value with the core triple and
//! the prerelease/build identifier lists kept as strings. Parsing goes
//! through the `semver` crate so that anything accepted here is valid
//! SemVer 2.0.0; rendering is a plain join and does not re-validate.
//!
//! - [`calculate`] - major/minor/patch bump accounting
//! - [`extension`] - prerelease and build identifier resolution
//! - [`expr`] - the restricted arithmetic used by incremental identifiers
//! - [`release_as`] - explicit `Release-As` footer directives

pub mod calculate;
pub mod expr;
pub mod extension;
pub mod release_as;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors from version operations.
#[derive(Error, Debug)]
pub enum VersionError {
    /// Failed to parse a semver string.
    #[error("invalid semver: {0}")]
    InvalidSemver(#[from] semver::Error),
}

/// Result alias for version operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// Semver core field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoreField {
    /// Major release (X.0.0).
    Major,
    /// Minor release (x.Y.0).
    Minor,
    /// Patch release (x.y.Z).
    Patch,
}

impl fmt::Display for CoreField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
            Self::Patch => write!(f, "patch"),
        }
    }
}

/// A semantic version with its identifier lists.
///
/// Identifiers are stored unvalidated once constructed; see
/// [`extension`] for how resolved lists can contain an empty identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SemVer {
    /// Major version number.
    pub major: u64,
    /// Minor version number.
    pub minor: u64,
    /// Patch version number.
    pub patch: u64,
    /// Prerelease identifiers (`alpha`, `1` for `-alpha.1`).
    pub prerelease: Vec<String>,
    /// Build metadata identifiers.
    pub build: Vec<String>,
}

impl SemVer {
    /// Create a version with empty identifier lists.
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: Vec::new(),
            build: Vec::new(),
        }
    }

    /// Parse a version string, stripping an optional `v` prefix.
    pub fn parse(s: &str) -> VersionResult<Self> {
        let s = s.trim();
        let s = s.strip_prefix('v').unwrap_or(s);
        let parsed = semver::Version::parse(s)?;
        Ok(Self::from(parsed))
    }

    /// The `(major, minor, patch)` triple.
    pub const fn core(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }

    /// Whether the core triple differs from `other`'s.
    pub const fn core_differs(&self, other: &Self) -> bool {
        self.major != other.major || self.minor != other.minor || self.patch != other.patch
    }

    /// Replace the identifier lists, keeping the core triple.
    #[must_use]
    pub fn with_extensions(mut self, prerelease: Vec<String>, build: Vec<String>) -> Self {
        self.prerelease = prerelease;
        self.build = build;
        self
    }
}

impl From<semver::Version> for SemVer {
    fn from(v: semver::Version) -> Self {
        Self {
            major: v.major,
            minor: v.minor,
            patch: v.patch,
            prerelease: split_identifiers(v.pre.as_str()),
            build: split_identifiers(v.build.as_str()),
        }
    }
}

fn split_identifiers(s: &str) -> Vec<String> {
    if s.is_empty() {
        Vec::new()
    } else {
        s.split('.').map(str::to_string).collect()
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.prerelease.is_empty() {
            write!(f, "-{}", self.prerelease.join("."))?;
        }
        if !self.build.is_empty() {
            write!(f, "+{}", self.build.join("."))?;
        }
        Ok(())
    }
}

impl FromStr for SemVer {
    type Err = VersionError;

    fn from_str(s: &str) -> VersionResult<Self> {
        Self::parse(s)
    }
}

impl Serialize for SemVer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SemVer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_with_v_prefix() {
        assert_eq!(SemVer::parse("v1.2.3").unwrap(), SemVer::new(1, 2, 3));
    }

    #[test]
    fn parse_without_v_prefix() {
        assert_eq!(SemVer::parse("1.2.3").unwrap(), SemVer::new(1, 2, 3));
    }

    #[test]
    fn parse_invalid() {
        assert!(SemVer::parse("not-a-version").is_err());
        assert!(SemVer::parse("1.2").is_err());
        assert!(SemVer::parse("").is_err());
    }

    #[test]
    fn parse_splits_identifiers() {
        let v = SemVer::parse("1.0.0-alpha.7+build.20240101").unwrap();
        assert_eq!(v.prerelease, vec!["alpha", "7"]);
        assert_eq!(v.build, vec!["build", "20240101"]);
    }

    #[test]
    fn display_round_trips_full_version() {
        let v = SemVer::parse("2.1.0-rc.1+sha.abc").unwrap();
        assert_eq!(v.to_string(), "2.1.0-rc.1+sha.abc");
    }

    #[test]
    fn display_joins_empty_identifier_verbatim() {
        let v = SemVer::new(1, 0, 0).with_extensions(vec!["beta".into(), String::new()], vec![]);
        assert_eq!(v.to_string(), "1.0.0-beta.");
    }

    #[test]
    fn core_differs_ignores_extensions() {
        let a = SemVer::parse("1.2.3-alpha").unwrap();
        let b = SemVer::parse("1.2.3+meta").unwrap();
        assert!(!a.core_differs(&b));
        assert!(a.core_differs(&SemVer::new(1, 2, 4)));
    }

    #[test]
    fn serde_uses_string_form() {
        let v = SemVer::parse("0.3.2-dev.4").unwrap();
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"0.3.2-dev.4\"");
        let back: SemVer = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}

// SPDX-License-Identifier: MPL-2.0

//! Versions the solver can pick.
//!
//! [SemanticVersion] is `major.minor.patch[-pre][+build]`, with pre-release and build identifiers
//! validated and ordered by the [semver] crate. Missing minor or patch numbers default to zero,
//! so `"1.2"` parses as `1.2.0`, which is how most released Python projects number themselves.
//! [NumberVersion] is a plain counter, handy for tests and benchmarks.

use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::str::FromStr;

use semver::{BuildMetadata, Prerelease};
use thiserror::Error;

/// Type for semantic versions: major.minor.patch, plus optional pre-release and build metadata.
///
/// Ordering follows semver precedence: numeric parts first, then a pre-release sorts before the
/// same release without one. Build metadata is compared last, so that equality stays structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemanticVersion {
    major: u64,
    minor: u64,
    patch: u64,
    pre: Prerelease,
    build: BuildMetadata,
}

/// Error creating [SemanticVersion] from [String].
/// This is the `InvalidVersionFormat` condition: malformed text is never coerced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionParseError {
    /// Nothing to parse.
    #[error("empty version string")]
    Empty,
    /// [SemanticVersion] holds at most major, minor and patch numbers.
    #[error("version {full_version} must contain at most 3 numbers separated by dot")]
    TooManyParts {
        /// [SemanticVersion] that was being parsed.
        full_version: String,
    },
    /// Wrapper around [ParseIntError](core::num::ParseIntError).
    #[error("cannot parse '{version_part}' in '{full_version}' as u64: {parse_error}")]
    ParseIntError {
        /// [SemanticVersion] that was being parsed.
        full_version: String,
        /// A version part where parsing failed.
        version_part: String,
        /// A specific error resulted from parsing a part of the version as [u64].
        parse_error: String,
    },
    /// Pre-release or build identifiers rejected by semver rules.
    #[error("invalid identifier in '{full_version}': {reason}")]
    InvalidIdentifier {
        /// [SemanticVersion] that was being parsed.
        full_version: String,
        /// What was wrong with the identifier.
        reason: String,
    },
}

impl FromStr for SemanticVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (version, _) = Self::parse_with_precision(s)?;
        Ok(version)
    }
}

impl SemanticVersion {
    /// Parse a version and also report how many numeric parts were written.
    /// `"1.4"` gives `(1.4.0, 2)`. Constraint operators such as `~=` and `^` depend on it.
    pub fn parse_with_precision(s: &str) -> Result<(Self, usize), VersionParseError> {
        let full_version = s.trim();
        if full_version.is_empty() {
            return Err(VersionParseError::Empty);
        }
        let invalid_identifier = |reason: String| VersionParseError::InvalidIdentifier {
            full_version: full_version.to_string(),
            reason,
        };

        let (rest, build) = match full_version.split_once('+') {
            Some((_, "")) => return Err(invalid_identifier("empty build metadata".into())),
            Some((rest, build)) => (
                rest,
                BuildMetadata::new(build).map_err(|e| invalid_identifier(e.to_string()))?,
            ),
            None => (full_version, BuildMetadata::EMPTY),
        };
        let (core, pre) = match rest.split_once('-') {
            Some((_, "")) => return Err(invalid_identifier("empty pre-release".into())),
            Some((core, pre)) => (
                core,
                Prerelease::new(pre).map_err(|e| invalid_identifier(e.to_string()))?,
            ),
            None => (rest, Prerelease::EMPTY),
        };

        let parse_part = |part: &str| {
            part.parse::<u64>()
                .map_err(|e| VersionParseError::ParseIntError {
                    full_version: full_version.to_string(),
                    version_part: part.to_string(),
                    parse_error: e.to_string(),
                })
        };
        let parts = core
            .split('.')
            .map(parse_part)
            .collect::<Result<Vec<_>, _>>()?;
        let (major, minor, patch) = match parts.as_slice() {
            [major] => (*major, 0, 0),
            [major, minor] => (*major, *minor, 0),
            [major, minor, patch] => (*major, *minor, *patch),
            _ => {
                return Err(VersionParseError::TooManyParts {
                    full_version: full_version.to_string(),
                })
            }
        };
        let version = Self {
            major,
            minor,
            patch,
            pre,
            build,
        };
        Ok((version, parts.len()))
    }
}

// Constructors
impl SemanticVersion {
    /// Create a release version with "major", "minor" and "patch" values.
    /// `version = major.minor.patch`
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: Prerelease::EMPTY,
            build: BuildMetadata::EMPTY,
        }
    }

    /// Version 0.0.0.
    pub fn zero() -> Self {
        Self::new(0, 0, 0)
    }

    /// Version 1.0.0.
    pub fn one() -> Self {
        Self::new(1, 0, 0)
    }

    /// Version 2.0.0.
    pub fn two() -> Self {
        Self::new(2, 0, 0)
    }

    /// Major number.
    pub fn major(&self) -> u64 {
        self.major
    }

    /// Minor number.
    pub fn minor(&self) -> u64 {
        self.minor
    }

    /// Patch number.
    pub fn patch(&self) -> u64 {
        self.patch
    }

    /// Pre-release identifiers, empty for a release.
    pub fn pre(&self) -> &Prerelease {
        &self.pre
    }

    /// Whether this is a pre-release.
    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }
}

// Convert a tuple (major, minor, patch) into a version.
impl From<(u64, u64, u64)> for SemanticVersion {
    fn from(tuple: (u64, u64, u64)) -> Self {
        let (major, minor, patch) = tuple;
        Self::new(major, minor, patch)
    }
}

// Bump versions. Pre-release and build identifiers are dropped.
// A number already at `u64::MAX` cannot be bumped.
impl SemanticVersion {
    /// Bump the patch number of a version.
    pub fn bump_patch(&self) -> Option<Self> {
        Some(Self::new(self.major, self.minor, self.patch.checked_add(1)?))
    }

    /// Bump the minor number of a version.
    pub fn bump_minor(&self) -> Option<Self> {
        Some(Self::new(self.major, self.minor.checked_add(1)?, 0))
    }

    /// Bump the major number of a version.
    pub fn bump_major(&self) -> Option<Self> {
        Some(Self::new(self.major.checked_add(1)?, 0, 0))
    }

    /// The lowest pre-release of this release, `1.2.0` gives `1.2.0-0`.
    /// Used as an exclusive upper bound, it keeps the pre-releases of `self` out.
    pub fn lowest_prerelease(&self) -> Self {
        Self {
            pre: Prerelease::new("0").expect("0 is a valid pre-release identifier"),
            ..Self::new(self.major, self.minor, self.patch)
        }
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| self.pre.cmp(&other.pre))
            .then_with(|| self.build.cmp(&other.build))
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.pre.is_empty() {
            write!(f, "-{}", self.pre)?;
        }
        if !self.build.is_empty() {
            write!(f, "+{}", self.build)?;
        }
        Ok(())
    }
}

impl serde::Serialize for SemanticVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for SemanticVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FromStr::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Simplest versions possible, just a positive number.
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct NumberVersion(pub u32);

// Convert an u32 into a version.
impl From<u32> for NumberVersion {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

impl From<NumberVersion> for u32 {
    fn from(version: NumberVersion) -> Self {
        version.0
    }
}

impl Display for NumberVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// TESTS #######################################################################

// SPDX-License-Identifier: MPL-2.0

//! Trait for identifying packages, and the identity used for Python distributions.

use std::collections::BTreeSet;
use std::fmt::{self, Debug, Display};
use std::hash::Hash;

/// Trait for identifying packages.
/// Automatically implemented for types already implementing
/// [Clone] + [Eq] + [Hash] + [Debug] + [Display].
pub trait Package: Clone + Eq + Hash + Debug + Display {}

/// Automatically implement the Package trait for any type
/// that already implement [Clone] + [Eq] + [Hash] + [Debug] + [Display].
impl<T: Clone + Eq + Hash + Debug + Display> Package for T {}

/// Name reserved for the synthetic root package.
/// Normalised names never contain `<`, so no real distribution can collide with it.
const ROOT_NAME: &str = "<root>";

/// A distribution name plus the extras requested for it.
///
/// Names compare case-insensitively, with runs of `-`, `_` and `.` treated as a single `-`,
/// so `Flask_SQLAlchemy` and `flask-sqlalchemy` are the same package.
/// `requests` and `requests[security]` are different packages: the latter depends on the
/// former at the same version, plus the requirements gated behind the `security` extra.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId {
    name: String,
    extras: BTreeSet<String>,
}

impl PackageId {
    /// Package without extras.
    pub fn new(name: &str) -> Self {
        Self {
            name: normalize_name(name),
            extras: BTreeSet::new(),
        }
    }

    /// Package with the given extras enabled.
    pub fn with_extras<S: AsRef<str>>(name: &str, extras: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: normalize_name(name),
            extras: extras
                .into_iter()
                .map(|extra| normalize_name(extra.as_ref()))
                .collect(),
        }
    }

    /// The synthetic package holding the top level requirements of a solve.
    pub fn root() -> Self {
        Self {
            name: ROOT_NAME.to_string(),
            extras: BTreeSet::new(),
        }
    }

    /// Whether this is the synthetic root package.
    pub fn is_root(&self) -> bool {
        self.name == ROOT_NAME
    }

    /// Normalised distribution name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalised extras, sorted.
    pub fn extras(&self) -> &BTreeSet<String> {
        &self.extras
    }

    /// The same distribution without extras.
    pub fn base(&self) -> Self {
        Self {
            name: self.name.clone(),
            extras: BTreeSet::new(),
        }
    }
}

impl Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, "root");
        }
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            let extras: Vec<&str> = self.extras.iter().map(String::as_str).collect();
            write!(f, "[{}]", extras.join(","))?;
        }
        Ok(())
    }
}

/// Lowercase a distribution or extra name and collapse separator runs into `-`.
pub fn normalize_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut pending_separator = false;
    for c in name.trim().chars() {
        if matches!(c, '-' | '_' | '.') {
            pending_separator = true;
            continue;
        }
        if pending_separator && !normalized.is_empty() {
            normalized.push('-');
        }
        pending_separator = false;
        normalized.extend(c.to_lowercase());
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_compare_case_insensitively() {
        assert_eq!(PackageId::new("Flask_SQLAlchemy"), PackageId::new("flask-sqlalchemy"));
        assert_eq!(PackageId::new("zope.interface"), PackageId::new("Zope-Interface"));
        assert_eq!(normalize_name("a__b--c"), "a-b-c");
    }

    #[test]
    fn extras_are_part_of_identity() {
        let plain = PackageId::new("requests");
        let secure = PackageId::with_extras("Requests", ["Security", "socks"]);
        assert_ne!(plain, secure);
        assert_eq!(secure.base(), plain);
        assert_eq!(secure.to_string(), "requests[security,socks]");
    }

    #[test]
    fn root_is_distinct() {
        assert!(PackageId::root().is_root());
        assert!(!PackageId::new("root").is_root());
        assert_eq!(PackageId::root().to_string(), "root");
    }
}

// SPDX-License-Identifier: MPL-2.0

//! Requirement strings as stored in the dependency database,
//! such as `requests[security]>=2.0,<3; python_version >= "3.6"`.
//!
//! Specifiers accept the usual Python operators (`==`, `!=`, `>=`, `<=`, `>`, `<`,
//! `~=`, `===` and `.*` prefix matches) as well as the caret (`^`) and tilde (`~`)
//! shorthands of semver constraints. Clauses separated by `,` or whitespace
//! must all hold, alternatives separated by `||` are unioned.
//!
//! An exclusive upper bound that is a release also excludes its pre-releases:
//! `<2.0` and `^1.4` admit neither `2.0.0` nor `2.0.0-rc.1`.
//! Writing the bound as a pre-release (`<2.0.0-rc.2`) keeps the earlier ones in.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::package::{normalize_name, PackageId};
use crate::solver::Dependency;
use crate::type_aliases::SemanticVersionSet;
use crate::version::{SemanticVersion, VersionParseError};

/// Error parsing a constraint or a requirement.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstraintParseError {
    /// A version inside the constraint is malformed.
    #[error("invalid version in constraint '{constraint}'")]
    InvalidVersion {
        /// The clause being parsed.
        constraint: String,
        /// Why the version was rejected.
        source: VersionParseError,
    },
    /// The constraint is not made of known operators and versions.
    #[error("invalid constraint '{constraint}': {reason}")]
    InvalidConstraint {
        /// The text being parsed.
        constraint: String,
        /// What was wrong with it.
        reason: String,
    },
}

/// Operators, longest first so that prefixes do not shadow them.
const OPERATORS: [&str; 11] = ["===", "~=", "==", "!=", ">=", "<=", ">", "<", "^", "~", "="];

/// Parse a version constraint. Empty text and `*` allow any version.
pub fn parse_constraint(text: &str) -> Result<SemanticVersionSet, ConstraintParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(SemanticVersionSet::full());
    }
    let mut alternatives = SemanticVersionSet::empty();
    for alternative in text.split("||") {
        let alternative = alternative.trim();
        if alternative.is_empty() {
            return Err(invalid_constraint(text, "empty alternative"));
        }
        alternatives = alternatives.union(&parse_conjunction(alternative)?);
    }
    Ok(alternatives)
}

fn parse_conjunction(text: &str) -> Result<SemanticVersionSet, ConstraintParseError> {
    let mut tokens = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty());
    let mut set = SemanticVersionSet::full();
    while let Some(token) = tokens.next() {
        // `>= 1.0` is written with the operator apart from its version.
        let clause = if OPERATORS.contains(&token) {
            match tokens.next() {
                Some(version) => format!("{}{}", token, version),
                None => return Err(invalid_constraint(text, "operator without a version")),
            }
        } else {
            token.to_string()
        };
        set = set.intersection(&parse_clause(&clause)?);
    }
    Ok(set)
}

fn parse_clause(clause: &str) -> Result<SemanticVersionSet, ConstraintParseError> {
    if clause == "*" {
        return Ok(SemanticVersionSet::full());
    }
    let (operator, version_text) = OPERATORS
        .iter()
        .find_map(|op| clause.strip_prefix(op).map(|rest| (*op, rest)))
        .unwrap_or(("", clause));
    if version_text.starts_with(|c: char| "<>=!~^".contains(c)) {
        return Err(invalid_constraint(clause, "unknown operator"));
    }

    if let Some(prefix) = version_text.strip_suffix(".*") {
        let prefix_set = match operator {
            "==" | "!=" => prefix_match(clause, prefix)?,
            _ => return Err(invalid_constraint(clause, "wildcard only applies to == and !=")),
        };
        return Ok(if operator == "!=" {
            prefix_set.complement()
        } else {
            prefix_set
        });
    }
    if version_text == "*" && matches!(operator, "==" | "=") {
        return Ok(SemanticVersionSet::full());
    }

    let (version, precision) = parse_version(clause, version_text)?;
    let set = match operator {
        "" | "=" | "==" | "===" => SemanticVersionSet::singleton(version),
        "!=" => SemanticVersionSet::singleton(version).complement(),
        ">=" => SemanticVersionSet::higher_than(version),
        ">" => SemanticVersionSet::strictly_higher_than(version),
        "<=" => SemanticVersionSet::lower_than(version),
        "<" => SemanticVersionSet::strictly_lower_than(exclusive_upper(version)),
        "~=" => {
            if precision < 2 {
                return Err(invalid_constraint(
                    clause,
                    "~= needs at least a major and a minor number",
                ));
            }
            let upper = if precision == 2 {
                version.bump_major()
            } else {
                version.bump_minor()
            };
            SemanticVersionSet::between(version, bumped(clause, upper)?)
        }
        "^" => {
            let upper = if version.major() > 0 || precision == 1 {
                version.bump_major()
            } else if version.minor() > 0 || precision == 2 {
                version.bump_minor()
            } else {
                version.bump_patch()
            };
            SemanticVersionSet::between(version, bumped(clause, upper)?)
        }
        "~" => {
            let upper = if precision == 1 {
                version.bump_major()
            } else {
                version.bump_minor()
            };
            SemanticVersionSet::between(version, bumped(clause, upper)?)
        }
        _ => unreachable!("every operator is handled"),
    };
    Ok(set)
}

/// Versions starting with the given numbers: `1.2` matches `1.2.0` up to `1.3.0` excluded.
fn prefix_match(clause: &str, prefix: &str) -> Result<SemanticVersionSet, ConstraintParseError> {
    let (version, precision) = parse_version(clause, prefix)?;
    let upper = match precision {
        1 => version.bump_major(),
        2 => version.bump_minor(),
        _ => version.bump_patch(),
    };
    Ok(SemanticVersionSet::between(version, bumped(clause, upper)?))
}

/// Upper bound of a bumped range, below the pre-releases of the bumped version.
fn bumped(
    clause: &str,
    upper: Option<SemanticVersion>,
) -> Result<SemanticVersion, ConstraintParseError> {
    upper
        .map(|upper| upper.lowest_prerelease())
        .ok_or_else(|| invalid_constraint(clause, "version number too large to bump"))
}

fn exclusive_upper(version: SemanticVersion) -> SemanticVersion {
    if version.is_prerelease() {
        version
    } else {
        version.lowest_prerelease()
    }
}

fn parse_version(
    clause: &str,
    text: &str,
) -> Result<(SemanticVersion, usize), ConstraintParseError> {
    SemanticVersion::parse_with_precision(text).map_err(|source| {
        ConstraintParseError::InvalidVersion {
            constraint: clause.to_string(),
            source,
        }
    })
}

fn invalid_constraint(constraint: &str, reason: &str) -> ConstraintParseError {
    ConstraintParseError::InvalidConstraint {
        constraint: constraint.to_string(),
        reason: reason.to_string(),
    }
}

/// One dependency line: a distribution, its extras, a version constraint
/// and an optional environment marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    name: String,
    extras: Vec<String>,
    specifier: String,
    constraint: SemanticVersionSet,
    marker: Option<String>,
}

impl Requirement {
    /// Parse a requirement line.
    pub fn parse(text: &str) -> Result<Self, ConstraintParseError> {
        let (requirement, marker) = match text.split_once(';') {
            Some((requirement, marker)) => {
                let marker = marker.trim();
                (requirement, (!marker.is_empty()).then(|| marker.to_string()))
            }
            None => (text, None),
        };
        let requirement = requirement.trim();

        let name_len = requirement
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
            .unwrap_or(requirement.len());
        if name_len == 0 {
            return Err(invalid_constraint(text, "missing package name"));
        }
        let (name, mut rest) = requirement.split_at(name_len);
        rest = rest.trim_start();

        let mut extras = Vec::new();
        if let Some(after_bracket) = rest.strip_prefix('[') {
            let (inside, after) = after_bracket
                .split_once(']')
                .ok_or_else(|| invalid_constraint(text, "unclosed extras"))?;
            extras = inside
                .split(',')
                .map(str::trim)
                .filter(|extra| !extra.is_empty())
                .map(normalize_name)
                .collect();
            rest = after.trim_start();
        }

        if rest.starts_with('@') {
            return Err(invalid_constraint(text, "direct references are not supported"));
        }
        let specifier = rest
            .strip_prefix('(')
            .and_then(|inner| inner.strip_suffix(')'))
            .unwrap_or(rest)
            .trim();
        let constraint = parse_constraint(specifier)?;

        Ok(Self {
            name: name.to_string(),
            extras,
            specifier: specifier.to_string(),
            constraint,
            marker,
        })
    }

    /// Distribution name, as written.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Requested extras, normalised.
    pub fn extras(&self) -> &[String] {
        &self.extras
    }

    /// Allowed versions.
    pub fn constraint(&self) -> &SemanticVersionSet {
        &self.constraint
    }

    /// Environment marker, kept as text and never evaluated.
    pub fn marker(&self) -> Option<&str> {
        self.marker.as_deref()
    }

    /// The extras this requirement is gated behind, from `extra == "socks"` clauses.
    /// `extra == "a" or extra == "b"` gives both. Empty when no clause names an extra.
    pub fn marker_extras(&self) -> Vec<String> {
        let Some(mut rest) = self.marker.as_deref() else {
            return Vec::new();
        };
        let mut extras = Vec::new();
        while let Some(start) = rest.find("extra") {
            let starts_word = !rest[..start]
                .ends_with(|c: char| c.is_ascii_alphanumeric() || c == '_');
            rest = &rest[start + "extra".len()..];
            match quoted_equal(rest) {
                Some(extra) if starts_word => extras.push(normalize_name(extra)),
                _ => {}
            }
        }
        extras
    }

    /// Package identity of the requirement, extras included.
    pub fn package(&self) -> PackageId {
        PackageId::with_extras(&self.name, &self.extras)
    }

    /// The requirement as a solver dependency, remembering its text for explanations.
    pub fn dependency(&self) -> Dependency<PackageId, SemanticVersionSet> {
        Dependency::new(self.package(), self.constraint.clone()).with_text(self.to_string())
    }
}

/// The quoted value of an `== "value"` comparison at the start of `text`.
fn quoted_equal(text: &str) -> Option<&str> {
    let rest = text.trim_start().strip_prefix("==")?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let rest = &rest[1..];
    let end = rest.find(quote)?;
    Some(&rest[..end])
}

impl FromStr for Requirement {
    type Err = ConstraintParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            write!(f, "[{}]", self.extras.join(","))?;
        }
        write!(f, "{}", self.specifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(text: &str) -> SemanticVersion {
        text.parse().unwrap()
    }

    fn set(text: &str) -> SemanticVersionSet {
        parse_constraint(text).unwrap()
    }

    #[test]
    fn empty_and_star_mean_any() {
        assert!(set("").is_full());
        assert!(set("*").is_full());
        assert!(set("==*").is_full());
    }

    #[test]
    fn comparison_operators() {
        assert_eq!(set(">=1.0"), SemanticVersionSet::higher_than(v("1.0.0")));
        assert_eq!(set("> 1.0"), SemanticVersionSet::strictly_higher_than(v("1.0.0")));
        assert_eq!(set("<2"), SemanticVersionSet::strictly_lower_than(v("2.0.0-0")));
        assert_eq!(set("<=2.1"), SemanticVersionSet::lower_than(v("2.1.0")));
        assert_eq!(set("==1.2.3"), SemanticVersionSet::singleton(v("1.2.3")));
        assert_eq!(set("1.2.3"), SemanticVersionSet::singleton(v("1.2.3")));
    }

    #[test]
    fn clauses_are_intersected() {
        let requests = set(">=2.0, <3");
        assert_eq!(requests, SemanticVersionSet::between(v("2.0.0"), v("3.0.0-0")));
        assert_eq!(set(">=2.0 <3"), requests);
        assert_eq!(set(">= 2.0,< 3"), requests);
    }

    #[test]
    fn alternatives_are_unioned() {
        let either = set("<1 || >=2");
        assert!(either.contains(&v("0.9")));
        assert!(!either.contains(&v("1.5")));
        assert!(either.contains(&v("2.0")));
    }

    #[test]
    fn not_equal_splits_the_range() {
        let set = set("!=1.5.0");
        assert_eq!(set.ranges().len(), 2);
        assert!(!set.contains(&v("1.5.0")));
        assert!(set.contains(&v("1.5.1")));
    }

    #[test]
    fn wildcards_match_prefixes() {
        let minor = set("==1.2.*");
        assert!(minor.contains(&v("1.2.0")));
        assert!(minor.contains(&v("1.2.9")));
        assert!(!minor.contains(&v("1.3.0")));
        let not_major = set("!=1.*");
        assert!(!not_major.contains(&v("1.4.0")));
        assert!(not_major.contains(&v("2.0.0")));
    }

    #[test]
    fn compatible_release() {
        assert_eq!(set("~=2.2"), SemanticVersionSet::between(v("2.2.0"), v("3.0.0-0")));
        assert_eq!(set("~=1.4.5"), SemanticVersionSet::between(v("1.4.5"), v("1.5.0-0")));
        assert!(matches!(
            parse_constraint("~=1"),
            Err(ConstraintParseError::InvalidConstraint { .. })
        ));
    }

    #[test]
    fn caret_and_tilde() {
        assert_eq!(set("^1.2.3"), SemanticVersionSet::between(v("1.2.3"), v("2.0.0-0")));
        assert_eq!(set("^0.2.3"), SemanticVersionSet::between(v("0.2.3"), v("0.3.0-0")));
        assert_eq!(set("^0.0.3"), SemanticVersionSet::between(v("0.0.3"), v("0.0.4-0")));
        assert_eq!(set("^0.0"), SemanticVersionSet::between(v("0.0.0"), v("0.1.0-0")));
        assert_eq!(set("~1.2.3"), SemanticVersionSet::between(v("1.2.3"), v("1.3.0-0")));
        assert_eq!(set("~1"), SemanticVersionSet::between(v("1.0.0"), v("2.0.0-0")));
    }

    #[test]
    fn exclusive_upper_bounds_leave_out_prereleases() {
        assert!(!set("<2.0").contains(&v("2.0.0-rc.1")));
        assert!(set("<2.0").contains(&v("1.9.9")));
        assert!(!set("^1.4").contains(&v("2.0.0-alpha")));
        assert!(!set("==1.2.*").contains(&v("1.3.0-rc.1")));
        assert!(set("<=2.0").contains(&v("2.0.0-rc.1")));
        let before_rc2 = set("<2.0.0-rc.2");
        assert!(before_rc2.contains(&v("2.0.0-rc.1")));
        assert!(!before_rc2.contains(&v("2.0.0-rc.2")));
    }

    #[test]
    fn bumping_the_largest_number_is_an_error() {
        let max = u64::MAX;
        for text in [
            format!("^{}", max),
            format!("~1.{}", max),
            format!("~=1.{}.0", max),
            format!("==1.2.{}.*", max),
            format!("!={}.*", max),
        ] {
            assert!(
                matches!(
                    parse_constraint(&text),
                    Err(ConstraintParseError::InvalidConstraint { .. })
                ),
                "{}",
                text
            );
        }
        assert!(set(&format!("<{}", max)).contains(&v("1.0.0")));
    }

    #[test]
    fn malformed_versions_are_not_any() {
        assert!(matches!(
            parse_constraint(">=1.x"),
            Err(ConstraintParseError::InvalidVersion { .. })
        ));
        assert!(matches!(
            parse_constraint("=>1.0"),
            Err(ConstraintParseError::InvalidConstraint { .. })
        ));
        assert!(matches!(
            parse_constraint(">="),
            Err(ConstraintParseError::InvalidConstraint { .. })
        ));
    }

    #[test]
    fn requirement_parts() {
        let req = Requirement::parse("Requests[Security, socks] (>=2.0,<3) ; extra == 'http'")
            .unwrap();
        assert_eq!(req.name(), "Requests");
        assert_eq!(req.extras(), ["security", "socks"]);
        assert_eq!(req.constraint(), &set(">=2.0,<3"));
        assert_eq!(req.marker(), Some("extra == 'http'"));
        assert_eq!(req.marker_extras(), ["http"]);
        assert_eq!(
            req.package(),
            PackageId::with_extras("requests", ["security", "socks"])
        );
        assert_eq!(req.to_string(), "Requests[security,socks]>=2.0,<3");
    }

    #[test]
    fn bare_name_and_markers_without_extra() {
        let req: Requirement = "six; python_version < \"3\"".parse().unwrap();
        assert!(req.constraint().is_full());
        assert!(req.marker_extras().is_empty());
        let dep = req.dependency();
        assert_eq!(dep.package, PackageId::new("six"));
        assert_eq!(dep.text.as_deref(), Some("six"));
    }

    #[test]
    fn every_extra_of_a_marker_is_found() {
        let req = Requirement::parse(r#"bar; extra == "a" or extra=='B_c'"#).unwrap();
        assert_eq!(req.marker_extras(), ["a", "b-c"]);
        let req = Requirement::parse(r#"bar; python_version < "3" and extra == "a""#).unwrap();
        assert_eq!(req.marker_extras(), ["a"]);
        let req = Requirement::parse(r#"bar; myextra == "a""#).unwrap();
        assert!(req.marker_extras().is_empty());
    }

    #[test]
    fn malformed_requirements() {
        assert!(Requirement::parse(">=1.0").is_err());
        assert!(Requirement::parse("foo[bar").is_err());
        assert!(Requirement::parse("foo @ https://example.com/foo.whl").is_err());
        assert!(Requirement::parse("foo>=1.x").is_err());
    }
}

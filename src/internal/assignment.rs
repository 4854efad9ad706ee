// SPDX-License-Identifier: MPL-2.0

//! Assignments are the building blocks of a PubGrub partial solution.
//! (partial solution = the current state of the solution we are building in the algorithm).

use crate::internal::arena::Arena;
use crate::internal::incompatibility::{IncompId, Incompatibility};
use crate::package::Package;
use crate::term::Term;
use crate::version_set::VersionSet;

/// Number of decisions taken so far, used to scope backtracking.
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct DecisionLevel(pub u32);

impl DecisionLevel {
    pub fn increment(self) -> Self {
        Self(self.0 + 1)
    }
}

/// An assignment is either a decision, with the chosen version,
/// or a derivation term, specifying compatible versions
/// according to previous assignments and all incompatibilities.
/// We also record the incompatibility responsible for
/// that derivation term as its "cause".
#[derive(Debug, Clone)]
pub enum Assignment<P: Package, VS: VersionSet> {
    /// The decision.
    Decision {
        /// The package corresponding to the decision.
        package: P,
        /// The decided version.
        version: VS::V,
    },
    /// The derivation.
    Derivation {
        /// The package corresponding to the derivation.
        package: P,
        /// Incompatibility cause of the derivation.
        cause: IncompId<P, VS>,
    },
}

/// An assignment together with the decision level it was made at.
#[derive(Debug, Clone)]
pub struct DatedAssignment<P: Package, VS: VersionSet> {
    pub decision_level: DecisionLevel,
    pub assignment: Assignment<P, VS>,
}

impl<P: Package, VS: VersionSet> Assignment<P, VS> {
    /// Return the package for this assignment
    pub fn package(&self) -> &P {
        match self {
            Self::Decision { package, .. } => package,
            Self::Derivation { package, .. } => package,
        }
    }

    /// Retrieve the current assignment as a [Term].
    /// If this is decision, it returns a positive term with that exact version.
    /// Otherwise, if this is a derivation, it returns the negated term
    /// of its cause for that package.
    pub fn as_term(&self, store: &Arena<Incompatibility<P, VS>>) -> Term<VS> {
        match self {
            Self::Decision { version, .. } => Term::exact(version.clone()),
            Self::Derivation { package, cause } => store[*cause].derived_term(package),
        }
    }
}

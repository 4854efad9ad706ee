// SPDX-License-Identifier: MPL-2.0

//! A Memory acts like a structured partial solution
//! where terms are regrouped by package in a [FnvIndexMap](crate::type_aliases::FnvIndexMap).

use crate::package::Package;
use crate::term::Term;
use crate::type_aliases::{FnvIndexMap, SelectedDependencies};
use crate::version_set::VersionSet;

/// A memory is the set of all assignments in the partial solution,
/// organized by package instead of historically ordered.
///
/// Contrary to PartialSolution, Memory does not store derivations causes, only the terms.
/// Packages keep the position they were first assigned at, which gives the discovery order.
#[derive(Debug, Clone)]
pub struct Memory<P: Package, VS: VersionSet> {
    assignments: FnvIndexMap<P, PackageAssignments<VS>>,
}

/// A package memory contains the potential decision and the intersection
/// of the derivations that have already been made for a given package.
#[derive(Debug, Clone)]
enum PackageAssignments<VS: VersionSet> {
    Decision { version: VS::V, term: Term<VS> },
    Derivations(Term<VS>),
}

impl<P: Package, VS: VersionSet> Memory<P, VS> {
    /// Initialize an empty memory.
    pub fn empty() -> Self {
        Self {
            assignments: FnvIndexMap::default(),
        }
    }

    /// Retrieve intersection of terms in memory related to package.
    pub fn term_intersection_for_package(&self, package: &P) -> Option<&Term<VS>> {
        self.assignments.get(package).map(|pa| match pa {
            PackageAssignments::Decision { term, .. } => term,
            PackageAssignments::Derivations(term) => term,
        })
    }

    /// Position of the package in discovery order.
    pub fn discovery_index(&self, package: &P) -> Option<usize> {
        self.assignments.get_index_of(package)
    }

    /// Add a decision to a Memory.
    pub fn add_decision(&mut self, package: P, version: VS::V) {
        if cfg!(debug_assertions) {
            if let Some(PackageAssignments::Derivations(term)) = self.assignments.get(&package) {
                debug_assert!(term.contains(&version));
            }
        }
        let term = Term::exact(version.clone());
        self.assignments
            .insert(package, PackageAssignments::Decision { version, term });
    }

    /// Add a derivation to a Memory.
    pub fn add_derivation(&mut self, package: P, term: Term<VS>) {
        let pa = self
            .assignments
            .entry(package)
            .or_insert_with(|| PackageAssignments::Derivations(Term::any()));
        match pa {
            PackageAssignments::Decision { version, .. } => {
                debug_assert!(term.contains(version));
            }
            PackageAssignments::Derivations(intersected) => {
                *intersected = intersected.intersection(&term);
            }
        }
    }

    /// Extract all packages that may potentially be picked next
    /// to continue solving package dependencies.
    /// A package is a potential pick if there isn't an already
    /// selected version (no "decision")
    /// and if it contains at least one positive derivation term
    /// in the partial solution.
    pub fn potential_packages(&self) -> impl Iterator<Item = (&P, &VS)> {
        self.assignments.iter().filter_map(|(p, pa)| match pa {
            PackageAssignments::Derivations(Term::Positive(set)) => Some((p, set)),
            _ => None,
        })
    }

    /// Versions still allowed for an undecided package with a positive derivation.
    pub fn potential_versions(&self, package: &P) -> Option<&VS> {
        match self.assignments.get(package) {
            Some(PackageAssignments::Derivations(Term::Positive(set))) => Some(set),
            _ => None,
        }
    }

    /// If a partial solution has, for every positive derivation,
    /// a corresponding decision that satisfies that assignment,
    /// it's a total solution and version solving has succeeded.
    pub fn extract_solution(&self) -> Option<SelectedDependencies<P, VS::V>> {
        let mut solution = SelectedDependencies::default();
        for (package, pa) in &self.assignments {
            match pa {
                PackageAssignments::Decision { version, .. } => {
                    solution.insert(package.clone(), version.clone());
                }
                PackageAssignments::Derivations(term) if term.is_positive() => return None,
                PackageAssignments::Derivations(_) => {}
            }
        }
        Some(solution)
    }
}

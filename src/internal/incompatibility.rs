// SPDX-License-Identifier: MPL-2.0

//! An incompatibility is a set of terms for different packages
//! that should never be satisfied all together.

use std::fmt;

use crate::internal::arena::{Arena, Id};
use crate::internal::small_map::SmallMap;
use crate::package::Package;
use crate::report::{DefaultStringReporter, DerivationTree, Derived, External};
use crate::solver::Dependency;
use crate::term::{self, Term};
use crate::type_aliases::Set;
use crate::version_set::VersionSet;

/// An incompatibility is a set of terms for different packages
/// that should never be satisfied all together.
/// An incompatibility usually originates from a package dependency.
/// For example, if package A at version 1 depends on package B
/// at version 2, you can never have both terms `A = 1`
/// and `not B = 2` satisfied at the same time in a partial solution.
/// This would mean that we found a solution with package A at version 1
/// but not with package B at version 2.
/// Yet A at version 1 depends on B at version 2 so this is not possible.
/// Therefore, the set `{ A = 1, not B = 2 }` is an incompatibility,
/// defined from dependencies of A at version 1.
///
/// Incompatibilities can also be derived from two other incompatibilities
/// during conflict resolution. More about all this in
/// [PubGrub documentation](https://github.com/dart-lang/pub/blob/master/doc/solver.md#incompatibility).
#[derive(Debug, Clone)]
pub struct Incompatibility<P: Package, VS: VersionSet> {
    package_terms: SmallMap<P, Term<VS>>,
    kind: Kind<P, VS>,
}

/// Type alias of unique identifiers for incompatibilities.
pub type IncompId<P, VS> = Id<Incompatibility<P, VS>>;

#[derive(Debug, Clone)]
enum Kind<P: Package, VS: VersionSet> {
    /// Initial incompatibility aiming at picking the root package for the first decision.
    NotRoot(P, VS::V),
    /// There are no versions in the given set for this package.
    NoVersions(P, VS),
    /// The package source knows no version at all of this package.
    PackageNotFound(P),
    /// Incompatibility coming from the dependencies of a given package.
    FromDependencyOf {
        package: P,
        versions: VS,
        dependency: P,
        constraint: VS,
        text: Option<String>,
    },
    /// Derived from two causes. Stores cause ids.
    DerivedFrom(IncompId<P, VS>, IncompId<P, VS>),
}

/// A Relation describes how a set of terms can be compared to an incompatibility.
/// Typically, the set of terms comes from the partial solution.
#[derive(Debug, Eq, PartialEq)]
pub enum Relation<P: Package> {
    /// We say that a set of terms S satisfies an incompatibility I
    /// if S satisfies every term in I.
    Satisfied,
    /// We say that S contradicts I
    /// if S contradicts at least one term in I.
    Contradicted(P),
    /// If S satisfies all but one of I's terms and is inconclusive for the remaining term,
    /// we say S "almost satisfies" I and we call the remaining term the "unsatisfied term".
    AlmostSatisfied(P),
    /// Otherwise, we say that their relation is inconclusive.
    Inconclusive,
}

impl<P: Package, VS: VersionSet> Incompatibility<P, VS> {
    /// Create the initial "not Root" incompatibility.
    pub fn not_root(package: P, version: VS::V) -> Self {
        Self {
            package_terms: SmallMap::One([(
                package.clone(),
                Term::Negative(VS::singleton(version.clone())),
            )]),
            kind: Kind::NotRoot(package, version),
        }
    }

    /// Create an incompatibility to remember
    /// that a given set does not contain any version.
    pub fn no_versions(package: P, set: VS) -> Self {
        Self {
            package_terms: SmallMap::One([(package.clone(), Term::Positive(set.clone()))]),
            kind: Kind::NoVersions(package, set),
        }
    }

    /// Create an incompatibility to remember
    /// that the package source knows no version of a package.
    pub fn package_not_found(package: P) -> Self {
        Self {
            package_terms: SmallMap::One([(package.clone(), Term::Positive(VS::full()))]),
            kind: Kind::PackageNotFound(package),
        }
    }

    /// Build an incompatibility from a given dependency.
    /// A dependency on the empty set forbids the depending versions outright.
    pub fn from_dependency(package: P, versions: VS, dep: &Dependency<P, VS>) -> Self {
        let package_terms = if dep.constraint == VS::empty() {
            SmallMap::One([(package.clone(), Term::Positive(versions.clone()))])
        } else {
            SmallMap::Two([
                (package.clone(), Term::Positive(versions.clone())),
                (dep.package.clone(), Term::Negative(dep.constraint.clone())),
            ])
        };
        Self {
            package_terms,
            kind: Kind::FromDependencyOf {
                package,
                versions,
                dependency: dep.package.clone(),
                constraint: dep.constraint.clone(),
                text: dep.text.clone(),
            },
        }
    }

    /// Prior cause of two incompatibilities using the rule of resolution.
    pub fn prior_cause(
        incompat: IncompId<P, VS>,
        satisfier_cause: IncompId<P, VS>,
        package: &P,
        incompatibility_store: &Arena<Self>,
    ) -> Self {
        let kind = Kind::DerivedFrom(incompat, satisfier_cause);
        let mut package_terms = incompatibility_store[incompat].package_terms.clone();
        let t1 = package_terms
            .remove(package)
            .expect("the resolved package is in the conflicting incompatibility");
        let satisfier_cause_terms = &incompatibility_store[satisfier_cause].package_terms;
        package_terms.merge(
            satisfier_cause_terms.iter().filter(|(p, _)| *p != package),
            |t1, t2| Some(t1.intersection(t2)),
        );
        let term = t1.union(
            satisfier_cause_terms
                .get(package)
                .expect("the resolved package is in the satisfier cause"),
        );
        if term != Term::any() {
            package_terms.insert(package.clone(), term);
        }
        Self {
            package_terms,
            kind,
        }
    }

    /// CF definition of Relation enum.
    pub fn relation(&self, mut terms: impl FnMut(&P) -> Option<Term<VS>>) -> Relation<P> {
        let mut relation = Relation::Satisfied;
        for (package, incompat_term) in self.package_terms.iter() {
            match terms(package).map(|term| incompat_term.relation_with(&term)) {
                Some(term::Relation::Satisfied) => {}
                Some(term::Relation::Contradicted) => {
                    return Relation::Contradicted(package.clone());
                }
                None | Some(term::Relation::Inconclusive) => {
                    // If a package is not present, the intersection is the same as [Term::any].
                    // According to the rules of satisfactions, the relation would be inconclusive.
                    // It could also be satisfied if the incompatibility term was also [Term::any],
                    // but we systematically remove those from incompatibilities
                    // so we're safe on that front.
                    if relation == Relation::Satisfied {
                        relation = Relation::AlmostSatisfied(package.clone());
                    } else {
                        relation = Relation::Inconclusive;
                    }
                }
            }
        }
        relation
    }

    /// Check if an incompatibility should mark the end of the algorithm
    /// because it satisfies the root package.
    pub fn is_terminal(&self, root_package: &P, root_version: &VS::V) -> bool {
        let mut terms = self.package_terms.iter();
        match (terms.next(), terms.next()) {
            (None, _) => true,
            (Some((package, term)), None) => {
                package == root_package && term.contains(root_version)
            }
            _ => false,
        }
    }

    /// Get the term related to a given package (if it exists).
    pub fn get(&self, package: &P) -> Option<&Term<VS>> {
        self.package_terms.get(package)
    }

    /// The term a derivation caused by this incompatibility asserts for `package`.
    pub fn derived_term(&self, package: &P) -> Term<VS> {
        self.get(package).map_or_else(Term::any, Term::negate)
    }

    /// Iterate over packages.
    pub fn iter(&self) -> impl Iterator<Item = (&P, &Term<VS>)> {
        self.package_terms.iter()
    }

    // Reporting ###############################################################

    /// Retrieve parent causes if of type DerivedFrom.
    pub fn causes(&self) -> Option<(IncompId<P, VS>, IncompId<P, VS>)> {
        match self.kind {
            Kind::DerivedFrom(id1, id2) => Some((id1, id2)),
            _ => None,
        }
    }

    /// Build a derivation tree for error reporting.
    pub fn build_derivation_tree(
        self_id: IncompId<P, VS>,
        shared_ids: &Set<IncompId<P, VS>>,
        store: &Arena<Self>,
    ) -> DerivationTree<P, VS> {
        match &store[self_id].kind {
            Kind::DerivedFrom(id1, id2) => {
                let cause1 = Self::build_derivation_tree(*id1, shared_ids, store);
                let cause2 = Self::build_derivation_tree(*id2, shared_ids, store);
                let derived = Derived {
                    terms: store[self_id].package_terms.as_map(),
                    shared_id: shared_ids.get(&self_id).map(|id| id.into_raw()),
                    cause1: Box::new(cause1),
                    cause2: Box::new(cause2),
                };
                DerivationTree::Derived(derived)
            }
            Kind::NotRoot(package, version) => {
                DerivationTree::External(External::NotRoot(package.clone(), version.clone()))
            }
            Kind::NoVersions(package, set) => {
                DerivationTree::External(External::NoVersions(package.clone(), set.clone()))
            }
            Kind::PackageNotFound(package) => {
                DerivationTree::External(External::PackageNotFound(package.clone()))
            }
            Kind::FromDependencyOf {
                package,
                versions,
                dependency,
                constraint,
                text,
            } => DerivationTree::External(External::FromDependencyOf {
                package: package.clone(),
                versions: versions.clone(),
                dependency: dependency.clone(),
                constraint: constraint.clone(),
                text: text.clone(),
            }),
        }
    }
}

impl<P: Package, VS: VersionSet> fmt::Display for Incompatibility<P, VS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            DefaultStringReporter::string_terms(&self.package_terms.as_map())
        )
    }
}

// TESTS #######################################################################

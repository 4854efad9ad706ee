// SPDX-License-Identifier: MPL-2.0

//! PubGrub version solving algorithm.
//!
//! It consists in efficiently finding a set of packages and versions
//! that satisfy all the constraints of a given project dependencies.
//! In addition, when that is not possible,
//! PubGrub tries to provide a very human-readable and clear
//! explanation as to why that failed.
//! Below is an example of explanation present in
//! the introductory blog post about PubGrub
//!
//! ```txt
//! Because dropdown >=2.0.0 depends on icons >=2.0.0 and
//!   root depends on icons <2.0.0, dropdown >=2.0.0 is forbidden.
//!
//! And because menu >=1.1.0 depends on dropdown >=2.0.0,
//!   menu >=1.1.0 is forbidden.
//!
//! And because menu <1.1.0 depends on dropdown >=1.0.0 <2.0.0
//!   which depends on intl <4.0.0, every version of menu
//!   requires intl <4.0.0.
//!
//! So, because root depends on both menu >=1.0.0 and intl >=5.0.0,
//!   version solving failed.
//! ```
//!
//! ## API
//!
//! ```
//! # use pipgrub::solver::{resolve, OfflineDependencyProvider, Resolution};
//! # use pipgrub::version::NumberVersion;
//! # use pipgrub::error::SolveError;
//! # use pipgrub::ConstraintSet;
//! #
//! # type NumVS = ConstraintSet<NumberVersion>;
//! #
//! # fn try_main() -> Result<(), SolveError<&'static str, NumVS>> {
//! #     let dependency_provider = OfflineDependencyProvider::<&str, NumVS>::new();
//! #     let package = "root";
//! #     let version = 1u32;
//! let resolution = resolve(&dependency_provider, package, version)?;
//! #     assert!(matches!(resolution, Resolution::Unsatisfiable(_)));
//! #     Ok(())
//! # }
//! # fn main() {
//! #     try_main().unwrap();
//! # }
//! ```
//!
//! Where `dependency_provider` supplies the list of available packages and versions,
//! as well as the dependencies of every available package
//! by implementing the [DependencyProvider] trait.
//! The call to [resolve] for a given package at a given version
//! will compute the set of packages and versions needed
//! to satisfy the dependencies of that package and version pair.
//! If there is no solution, the result is [Resolution::Unsatisfiable]
//! holding the reason, as clear as possible.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::{info, trace};

use crate::config::SolverConfig;
use crate::error::{ProviderError, SolveError};
use crate::internal::core::State;
use crate::internal::incompatibility::Incompatibility;
use crate::package::Package;
use crate::report::DerivationTree;
use crate::type_aliases::{Map, SelectedDependencies};
use crate::version_set::VersionSet;

/// Outcome of a completed solve.
#[derive(Debug, Clone)]
pub enum Resolution<P: Package, VS: VersionSet> {
    /// One version for every package reachable from the root.
    Solved(SelectedDependencies<P, VS::V>),
    /// The requirements conflict, the tree explains why.
    Unsatisfiable(DerivationTree<P, VS>),
}

impl<P: Package, VS: VersionSet> Resolution<P, VS> {
    /// Whether a solution was found.
    pub fn is_solved(&self) -> bool {
        matches!(self, Self::Solved(_))
    }

    /// The selected versions, if solved.
    pub fn solution(&self) -> Option<&SelectedDependencies<P, VS::V>> {
        match self {
            Self::Solved(solution) => Some(solution),
            Self::Unsatisfiable(_) => None,
        }
    }

    /// Consume the resolution and keep the selected versions, if solved.
    pub fn into_solution(self) -> Option<SelectedDependencies<P, VS::V>> {
        match self {
            Self::Solved(solution) => Some(solution),
            Self::Unsatisfiable(_) => None,
        }
    }

    /// The explanation of the conflict, if unsatisfiable.
    pub fn derivation_tree(&self) -> Option<&DerivationTree<P, VS>> {
        match self {
            Self::Solved(_) => None,
            Self::Unsatisfiable(tree) => Some(tree),
        }
    }
}

/// Main function of the library.
/// Finds a set of packages satisfying dependency bounds for a given package + version pair.
pub fn resolve<P: Package, VS: VersionSet>(
    dependency_provider: &impl DependencyProvider<P, VS>,
    package: P,
    version: impl Into<VS::V>,
) -> Result<Resolution<P, VS>, SolveError<P, VS>> {
    resolve_with_config(
        dependency_provider,
        package,
        version,
        &SolverConfig::default(),
    )
}

/// Same as [resolve], with explicit limits.
pub fn resolve_with_config<P: Package, VS: VersionSet>(
    dependency_provider: &impl DependencyProvider<P, VS>,
    package: P,
    version: impl Into<VS::V>,
    config: &SolverConfig,
) -> Result<Resolution<P, VS>, SolveError<P, VS>> {
    let mut state = State::<P, VS>::init(package.clone(), version.into());
    let mut added_dependencies: Map<P, BTreeSet<VS::V>> = Map::default();
    let mut next = package;
    let mut iterations = 0;
    loop {
        dependency_provider
            .should_cancel()
            .map_err(SolveError::Cancelled)?;
        if iterations == config.max_iterations {
            return Err(SolveError::SolverExhausted { iterations });
        }
        iterations += 1;

        trace!("unit propagation from {}", next);
        if let Err(terminal) = state.unit_propagation(next) {
            info!(
                "conflict reached the root: {}",
                state.incompatibility_store[terminal]
            );
            return Ok(Resolution::Unsatisfiable(
                state.build_derivation_tree(terminal),
            ));
        }

        // Pick the next package.
        let picked = state
            .partial_solution
            .pick_highest_priority_pkg(|p, set| {
                let versions = dependency_provider
                    .versions_for(p, Some(set))
                    .map_err(|source| SolveError::VersionsUnavailable {
                        package: p.clone(),
                        source,
                    })?;
                Ok::<_, SolveError<P, VS>>(versions.iter().filter(|v| set.contains(v)).count())
            })?;
        let (p, set) = match picked {
            None => {
                return state
                    .partial_solution
                    .extract_solution()
                    .map(Resolution::Solved)
                    .ok_or_else(|| {
                        SolveError::Failure(
                            "no package left to decide but the partial solution is incomplete"
                                .into(),
                        )
                    });
            }
            Some(picked) => picked,
        };
        next = p.clone();

        // Pick the newest compatible version.
        let candidates = dependency_provider
            .versions_for(&p, Some(&set))
            .map_err(|source| SolveError::VersionsUnavailable {
                package: p.clone(),
                source,
            })?;
        let v = match candidates.into_iter().find(|v| set.contains(v)) {
            Some(v) => v,
            None => {
                let known = dependency_provider.versions_for(&p, None).map_err(|source| {
                    SolveError::VersionsUnavailable {
                        package: p.clone(),
                        source,
                    }
                })?;
                if known.is_empty() {
                    info!("package {} not found", p);
                    state.add_incompatibility(Incompatibility::package_not_found(p));
                } else {
                    info!("no version of {} in {}", p, set);
                    state.add_incompatibility(Incompatibility::no_versions(p, set));
                }
                continue;
            }
        };

        let is_new_dependency = added_dependencies
            .entry(p.clone())
            .or_default()
            .insert(v.clone());
        if !is_new_dependency {
            // Dependencies of this version are already incompatibilities,
            // unit propagation took them into account.
            state.partial_solution.add_decision(p, v);
            continue;
        }

        // Retrieve that package dependencies.
        let dependencies = dependency_provider
            .dependencies_for(&p, &v)
            .map_err(|source| SolveError::MetadataUnavailable {
                package: p.clone(),
                version: v.clone(),
                source,
            })?;
        if dependencies.iter().any(|dep| dep.package == p) {
            return Err(SolveError::SelfDependency {
                package: p,
                version: v,
            });
        }

        // Add that package and version if the dependencies are not problematic.
        let dep_incompats =
            state.add_incompatibility_from_dependencies(p.clone(), v.clone(), &dependencies);
        state
            .partial_solution
            .add_version(p, v, &dep_incompats, &state.incompatibility_store);
    }
}

/// A direct dependency of a package version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency<P, VS> {
    /// The package depended upon.
    pub package: P,
    /// Acceptable versions of that package.
    pub constraint: VS,
    /// The dependency as originally written, used in explanations only.
    pub text: Option<String>,
}

impl<P, VS> Dependency<P, VS> {
    /// Dependency without any original text.
    pub fn new(package: P, constraint: VS) -> Self {
        Self {
            package,
            constraint,
            text: None,
        }
    }

    /// Remember how the dependency was written.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

impl<P: fmt::Display, VS: fmt::Display> fmt::Display for Dependency<P, VS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.text {
            Some(text) => write!(f, "{}", text),
            None => write!(f, "{} {}", self.package, self.constraint),
        }
    }
}

/// All the direct dependencies of one package version.
/// An empty list means the version is known to have no dependency,
/// which is different from a [DependencyProvider::dependencies_for] error.
pub type DependencyConstraints<P, VS> = Vec<Dependency<P, VS>>;

/// Trait that allows the algorithm to retrieve available packages and their dependencies.
/// An implementor needs to be supplied to the [resolve] function.
pub trait DependencyProvider<P: Package, VS: VersionSet> {
    /// Lists known versions of a package contained in `constraint`, or all of them.
    /// Versions are listed newest first, the first one is the preferred pick.
    /// An unknown package has no version, this is not an error.
    fn versions_for(
        &self,
        package: &P,
        constraint: Option<&VS>,
    ) -> Result<Vec<VS::V>, ProviderError>;

    /// Retrieves the package dependencies.
    /// Failing here aborts the solve with
    /// [SolveError::MetadataUnavailable].
    fn dependencies_for(
        &self,
        package: &P,
        version: &VS::V,
    ) -> Result<DependencyConstraints<P, VS>, ProviderError>;

    /// This is called at the start of each iteration of the main loop,
    /// if it returns an Err then resolution will be terminated.
    /// This is helpful if you want to add some form of early termination like a timeout,
    /// or you want to add some form of user feedback if things are taking a while.
    /// If not provided the resolver will run as long as needed.
    fn should_cancel(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// A basic implementation of [DependencyProvider].
#[derive(Debug, Clone)]
pub struct OfflineDependencyProvider<P: Package, VS: VersionSet> {
    dependencies: Map<P, BTreeMap<VS::V, DependencyConstraints<P, VS>>>,
}

impl<P: Package, VS: VersionSet> Default for OfflineDependencyProvider<P, VS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Package, VS: VersionSet> OfflineDependencyProvider<P, VS> {
    /// Creates an empty OfflineDependencyProvider with no dependencies.
    pub fn new() -> Self {
        Self {
            dependencies: Map::default(),
        }
    }

    /// Registers the dependencies of a package and version pair.
    /// All subsequent calls to
    /// [add_dependencies](OfflineDependencyProvider::add_dependencies) for a given
    /// package version pair will replace the dependencies by the new ones.
    pub fn add_dependencies<I: IntoIterator<Item = (P, VS)>>(
        &mut self,
        package: P,
        version: impl Into<VS::V>,
        dependencies: I,
    ) {
        let package_deps = dependencies
            .into_iter()
            .map(|(p, constraint)| Dependency::new(p, constraint))
            .collect();
        self.add_dependency_list(package, version, package_deps);
    }

    /// Same as [add_dependencies](OfflineDependencyProvider::add_dependencies)
    /// for dependencies that carry their original text.
    pub fn add_dependency_list(
        &mut self,
        package: P,
        version: impl Into<VS::V>,
        dependencies: DependencyConstraints<P, VS>,
    ) {
        self.dependencies
            .entry(package)
            .or_default()
            .insert(version.into(), dependencies);
    }

    /// Lists packages that have been saved.
    pub fn packages(&self) -> impl Iterator<Item = &P> {
        self.dependencies.keys()
    }

    /// Lists versions of saved packages, oldest first.
    /// Returns [None] if no information is available regarding that package.
    pub fn versions(&self, package: &P) -> Option<impl Iterator<Item = &VS::V>> {
        self.dependencies.get(package).map(|k| k.keys())
    }

    /// Lists dependencies of a given package and version.
    /// Returns [None] if no information is available regarding that package and version pair.
    pub fn dependencies(&self, package: &P, version: &VS::V) -> Option<&DependencyConstraints<P, VS>> {
        self.dependencies.get(package)?.get(version)
    }
}

/// An implementation of [DependencyProvider] that
/// contains all dependency information available in memory.
/// Versions are listed with the newest versions first.
impl<P: Package, VS: VersionSet> DependencyProvider<P, VS> for OfflineDependencyProvider<P, VS> {
    fn versions_for(
        &self,
        package: &P,
        constraint: Option<&VS>,
    ) -> Result<Vec<VS::V>, ProviderError> {
        Ok(self
            .dependencies
            .get(package)
            .map(|versions| {
                versions
                    .keys()
                    .rev()
                    .filter(|v| constraint.map_or(true, |set| set.contains(v)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn dependencies_for(
        &self,
        package: &P,
        version: &VS::V,
    ) -> Result<DependencyConstraints<P, VS>, ProviderError> {
        self.dependencies(package, version)
            .cloned()
            .ok_or_else(|| format!("no metadata for {} {}", package, version).into())
    }
}

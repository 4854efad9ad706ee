// SPDX-License-Identifier: MPL-2.0

//! PubGrub version solving for Python package requirements.
//!
//! Version solving consists in efficiently finding a set of packages and versions
//! that satisfy all the constraints of a given project dependencies.
//! In addition, when that is not possible,
//! we should try to provide a very human-readable and clear
//! explanation as to why that failed.
//!
//! # Package and VersionSet traits
//!
//! The solver core is generic over packages and sets of versions,
//! through the [Package](package::Package) and [VersionSet](version_set::VersionSet) traits.
//!
//! Package identifiers need to implement `Package`,
//! which is automatic if the type already implements
//! `Clone + Eq + Hash + Debug + Display`.
//! So things like `String` or `&str` will work out of the box.
//! Python distributions are identified by [PackageId](package::PackageId),
//! a normalised name plus the extras requested for it.
//!
//! `VersionSet` is implemented for [ConstraintSet] over any ordered version type.
//! This crate provides two version types,
//! [NumberVersion](version::NumberVersion), a newtype for `u32`,
//! and [SemanticVersion](version::SemanticVersion), used for Python releases.
//!
//! # Basic example
//!
//! Let's imagine that we are building a user interface
//! with a menu containing dropdowns with some icons,
//! icons that we are also directly using in other parts of the interface.
//! For this scenario our direct dependencies are `menu` and `icons`,
//! but the complete set of dependencies looks like follows:
//!
//! - `root` depends on `menu` and `icons`
//! - `menu` depends on `dropdown`
//! - `dropdown` depends on `icons`
//! - `icons` has no dependency
//!
//! We can model that scenario with this library as follows
//! ```
//! # use pipgrub::solver::{OfflineDependencyProvider, resolve};
//! # use pipgrub::version::NumberVersion;
//! # use pipgrub::ConstraintSet;
//! type NumVS = ConstraintSet<NumberVersion>;
//!
//! let mut dependency_provider = OfflineDependencyProvider::<&str, NumVS>::new();
//!
//! dependency_provider.add_dependencies(
//!     "root", 1u32, [("menu", ConstraintSet::full()), ("icons", ConstraintSet::full())],
//! );
//! dependency_provider.add_dependencies("menu", 1u32, [("dropdown", ConstraintSet::full())]);
//! dependency_provider.add_dependencies("dropdown", 1u32, [("icons", ConstraintSet::full())]);
//! dependency_provider.add_dependencies("icons", 1u32, []);
//!
//! // Run the algorithm.
//! let resolution = resolve(&dependency_provider, "root", 1u32).unwrap();
//! assert!(resolution.is_solved());
//! ```
//!
//! # Python requirements
//!
//! [PackageSource](source::PackageSource) answers the solver from package metadata:
//! for each distribution, its releases and the requirement strings of each release,
//! such as `urllib3>=1.21,<2` or `PySocks>=1.5; extra == "socks"`.
//! The metadata comes from any [MetadataProvider](cache::MetadataProvider),
//! either a [DependencyDatabase](cache::DependencyDatabase) loaded from JSON,
//! or a [CachedMetadata](cache::CachedMetadata) refreshing entries older than
//! [SolverConfig::cache_timeout](config::SolverConfig::cache_timeout).
//!
//! ```
//! # use pipgrub::cache::DependencyDatabase;
//! # use pipgrub::config::SolverConfig;
//! # use pipgrub::package::PackageId;
//! # use pipgrub::source::PackageSource;
//! let database = DependencyDatabase::from_json_str(r#"{
//!     "flask": {"2.0.0": ["click>=7.1"], "2.3.0": ["click>=8.1"]},
//!     "click": {"7.1.2": [], "8.1.7": []}
//! }"#).unwrap();
//!
//! let mut source = PackageSource::new(&database);
//! source.add_root_requirement("Flask>=2").unwrap();
//! let solution = source.resolve(&SolverConfig::default()).unwrap().into_solution().unwrap();
//! assert_eq!(solution[&PackageId::new("click")].to_string(), "8.1.7");
//! ```
//!
//! # DependencyProvider trait
//!
//! In our previous examples we used the
//! [OfflineDependencyProvider](solver::OfflineDependencyProvider) and the
//! [PackageSource](source::PackageSource),
//! which are implementations of the [DependencyProvider](solver::DependencyProvider) trait.
//!
//! But we might want to implement that trait for our own type,
//! for example one querying a package index over the network.
//! This may be done by implementing the two following methods.
//! ```
//! # use pipgrub::solver::{DependencyProvider, DependencyConstraints};
//! # use pipgrub::error::ProviderError;
//! # use pipgrub::version::SemanticVersion;
//! # use pipgrub::ConstraintSet;
//! #
//! # struct MyDependencyProvider;
//! #
//! type SemVS = ConstraintSet<SemanticVersion>;
//!
//! impl DependencyProvider<String, SemVS> for MyDependencyProvider {
//!     fn versions_for(
//!         &self,
//!         package: &String,
//!         constraint: Option<&SemVS>,
//!     ) -> Result<Vec<SemanticVersion>, ProviderError> {
//!         unimplemented!()
//!     }
//!
//!     fn dependencies_for(
//!         &self,
//!         package: &String,
//!         version: &SemanticVersion,
//!     ) -> Result<DependencyConstraints<String, SemVS>, ProviderError> {
//!         unimplemented!()
//!     }
//! }
//! ```
//!
//! The first method lists the versions of a package, newest first,
//! keeping only those in the given constraint when there is one.
//! The newest version listed is the one the solver tries first.
//! An unknown package simply has no version.
//! The second method retrieves the dependencies of a package at a given version.
//! Failing there aborts the solve with
//! [SolveError::MetadataUnavailable](error::SolveError::MetadataUnavailable).
//!
//! On a real scenario, these two methods may involve reading the file system
//! or doing network request, so you may want to hold a cache in your
//! [DependencyProvider](solver::DependencyProvider) implementation.
//! The optional [should_cancel](solver::DependencyProvider::should_cancel)
//! method is called once per iteration and can stop a solve that takes too long.
//!
//! # Solution and error reporting
//!
//! When everything goes well, the solver finds and returns the complete
//! set of direct and indirect dependencies satisfying all the constraints,
//! as [Resolution::Solved](solver::Resolution::Solved).
//! But sometimes there is no solution because dependencies are incompatible.
//! In such cases, the result is
//! [Resolution::Unsatisfiable](solver::Resolution::Unsatisfiable),
//! where the provided derivation tree is a custom binary tree
//! containing the full chain of reasons why there is no solution.
//!
//! All the items in the tree are called incompatibilities
//! and may be of two types, either "external" or "derived".
//! Leaves of the tree are external incompatibilities,
//! and nodes are derived.
//! External incompatibilities have reasons that are independent
//! of the way this solver is implemented such as
//!  - dependencies: "flask" at version 2.3.0 depends on "click" >=8.1
//!  - unknown packages: "flsk" could not be found
//!  - absence of version: there is no version of "click" in >=9
//!
//! Derived incompatibilities are obtained by the solver by deduction,
//! such as if "a" depends on "b" and "b" depends on "c", "a" depends on "c".
//!
//! This crate defines a [Reporter](report::Reporter) trait, with an associated
//! [Output](report::Reporter::Output) type and a single method
//! [report](report::Reporter::report).
//! Implementing a [Reporter](report::Reporter) may involve a lot of heuristics
//! to make the output human-readable and natural.
//! For convenience, we provide a default implementation
//! [DefaultStringReporter](report::DefaultStringReporter),
//! that outputs the report as a [String].
//! You may use it as follows:
//! ```
//! # use pipgrub::solver::{resolve, OfflineDependencyProvider, Resolution};
//! # use pipgrub::report::{DefaultStringReporter, Reporter};
//! # use pipgrub::version::NumberVersion;
//! # use pipgrub::ConstraintSet;
//! #
//! # type NumVS = ConstraintSet<NumberVersion>;
//! #
//! # let mut dependency_provider = OfflineDependencyProvider::<&str, NumVS>::new();
//! # dependency_provider.add_dependencies("root", 1u32, [("icons", ConstraintSet::higher_than(2u32))]);
//! # dependency_provider.add_dependencies("icons", 1u32, []);
//! # let root_package = "root";
//! # let root_version = 1u32;
//! match resolve(&dependency_provider, root_package, root_version) {
//!     Ok(Resolution::Solved(solution)) => println!("{:?}", solution),
//!     Ok(Resolution::Unsatisfiable(mut derivation_tree)) => {
//!         derivation_tree.collapse_no_versions();
//!         eprintln!("{}", DefaultStringReporter::report(&derivation_tree));
//!     }
//!     Err(err) => panic!("{:?}", err),
//! };
//! ```
//! Notice that we also used
//! [collapse_no_versions](report::DerivationTree::collapse_no_versions) above.
//! This method simplifies the derivation tree to get rid of the
//! [NoVersions](report::External::NoVersions)
//! external incompatibilities in the derivation tree.
//! So instead of seeing things like this in the report:
//! ```txt
//! Because there is no version of foo in >=1.0.1, <2.0.0
//! and foo 1.0.0 depends on bar >=2.0.0, <3.0.0,
//! foo >=1.0.0, <2.0.0 depends on bar >=2.0.0, <3.0.0.
//! ```
//! you may have directly:
//! ```txt
//! foo >=1.0.0, <2.0.0 depends on bar >=2.0.0, <3.0.0.
//! ```
//! Beware though that if you are using some kind of offline mode
//! with a cache, you may want to know that some versions
//! do not exist in your cache.

#![warn(missing_docs)]

pub mod cache;
pub mod config;
pub mod error;
pub mod package;
pub mod report;
pub mod requirement;
pub mod solver;
pub mod source;
pub mod term;
pub mod type_aliases;
pub mod version;
pub mod version_set;

pub use version_ranges::{ConstraintSet, Range};

mod internal;

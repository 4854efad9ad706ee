// SPDX-License-Identifier: MPL-2.0

//! Handling solver errors.

use thiserror::Error;

use crate::package::Package;
use crate::version_set::VersionSet;

/// Error type returned by the callbacks of a
/// [DependencyProvider](crate::solver::DependencyProvider).
pub type ProviderError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that abort a solve.
///
/// Conflicting requirements are not an error: they produce
/// [Resolution::Unsatisfiable](crate::solver::Resolution::Unsatisfiable).
#[derive(Error, Debug)]
pub enum SolveError<P: Package, VS: VersionSet> {
    /// Error arising when the implementer of
    /// [DependencyProvider](crate::solver::DependencyProvider)
    /// returned an error in the method
    /// [dependencies_for](crate::solver::DependencyProvider::dependencies_for).
    #[error("metadata of {package} {version} is unavailable")]
    MetadataUnavailable {
        /// Package whose dependencies we want.
        package: P,
        /// Version of the package for which we want the dependencies.
        version: VS::V,
        /// Error raised by the implementer of
        /// [DependencyProvider](crate::solver::DependencyProvider).
        source: ProviderError,
    },

    /// Error arising when the implementer of
    /// [DependencyProvider](crate::solver::DependencyProvider)
    /// returned an error in the method
    /// [versions_for](crate::solver::DependencyProvider::versions_for).
    #[error("retrieving available versions of package {package} failed")]
    VersionsUnavailable {
        /// Package for which we want the list of versions.
        package: P,
        /// Error raised by the implementer of
        /// [DependencyProvider](crate::solver::DependencyProvider).
        source: ProviderError,
    },

    /// Error arising when the implementer of
    /// [DependencyProvider](crate::solver::DependencyProvider)
    /// returned a dependency on the requested package.
    /// This technically means that the package directly depends on itself,
    /// and is clearly some kind of mistake.
    #[error("{package} {version} depends on itself")]
    SelfDependency {
        /// Package whose dependencies we want.
        package: P,
        /// Version of the package for which we want the dependencies.
        version: VS::V,
    },

    /// The main loop ran more iterations than allowed by
    /// [SolverConfig::max_iterations](crate::config::SolverConfig::max_iterations).
    /// This points at a defect in the solver, not at conflicting requirements.
    #[error("solver gave up after {iterations} iterations")]
    SolverExhausted {
        /// Number of iterations performed.
        iterations: usize,
    },

    /// The provider asked for the solve to stop.
    #[error("version solving was cancelled")]
    Cancelled(#[source] ProviderError),

    /// Something unexpected happened.
    #[error("{0}")]
    Failure(String),
}

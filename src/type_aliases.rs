// SPDX-License-Identifier: MPL-2.0

//! Publicly exported type aliases.

use std::hash::BuildHasherDefault;

use rustc_hash::FxHasher;

use crate::version::SemanticVersion;

/// Map implementation used by the library.
pub type Map<K, V> = rustc_hash::FxHashMap<K, V>;

/// Set implementation used by the library.
pub type Set<V> = rustc_hash::FxHashSet<V>;

/// Insertion ordered map, iteration order is the order of first discovery.
pub type FnvIndexMap<K, V> = indexmap::IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Concrete dependencies picked by the library during [resolve](crate::solver::resolve)
/// from [DependencyConstraints](crate::solver::DependencyConstraints).
pub type SelectedDependencies<P, V> = Map<P, V>;

/// Sets of semantic versions, the constraint type of Python requirements.
pub type SemanticVersionSet = version_ranges::ConstraintSet<SemanticVersion>;

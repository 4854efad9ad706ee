// SPDX-License-Identifier: MPL-2.0

//! Core model and functions
//! to write a functional PubGrub algorithm.

use log::debug;

use crate::internal::arena::Arena;
use crate::internal::assignment::DecisionLevel;
use crate::internal::incompatibility::{IncompId, Incompatibility, Relation};
use crate::internal::partial_solution::{PartialSolution, SatisfierSearch};
use crate::package::Package;
use crate::report::DerivationTree;
use crate::solver::Dependency;
use crate::type_aliases::{Map, Set};
use crate::version_set::VersionSet;

/// Current state of the PubGrub algorithm.
#[derive(Clone)]
pub struct State<P: Package, VS: VersionSet> {
    root_package: P,
    root_version: VS::V,

    /// Incompatibilities indexed by the packages they mention.
    incompatibilities: Map<P, Vec<IncompId<P, VS>>>,

    /// Partial solution.
    pub partial_solution: PartialSolution<P, VS>,

    /// The store is the reference storage for all incompatibilities.
    pub incompatibility_store: Arena<Incompatibility<P, VS>>,

    /// This is a stack of work to be done in `unit_propagation`.
    /// It can definitely be a local variable to that method, but
    /// this way we can reuse the same allocation for better performance.
    unit_propagation_buffer: Vec<P>,
}

impl<P: Package, VS: VersionSet> State<P, VS> {
    /// Initialization of PubGrub state.
    pub fn init(root_package: P, root_version: VS::V) -> Self {
        let mut state = Self {
            root_package: root_package.clone(),
            root_version: root_version.clone(),
            incompatibilities: Map::default(),
            partial_solution: PartialSolution::empty(),
            incompatibility_store: Arena::new(),
            unit_propagation_buffer: Vec::new(),
        };
        state.add_incompatibility(Incompatibility::not_root(root_package, root_version));
        state
    }

    /// Add an incompatibility to the state.
    pub fn add_incompatibility(&mut self, incompat: Incompatibility<P, VS>) -> IncompId<P, VS> {
        let id = self.incompatibility_store.alloc(incompat);
        self.merge_incompatibility(id);
        id
    }

    /// Add the incompatibilities stating the dependencies of one package version.
    pub fn add_incompatibility_from_dependencies(
        &mut self,
        package: P,
        version: VS::V,
        deps: &[Dependency<P, VS>],
    ) -> Vec<IncompId<P, VS>> {
        let versions = VS::singleton(version);
        let new_incompats_ids =
            self.incompatibility_store
                .alloc_iter(deps.iter().map(|dep| {
                    Incompatibility::from_dependency(package.clone(), versions.clone(), dep)
                }));
        for &id in &new_incompats_ids {
            self.merge_incompatibility(id);
        }
        new_incompats_ids
    }

    /// Unit propagation is the core mechanism of the solving algorithm.
    /// CF <https://github.com/dart-lang/pub/blob/master/doc/solver.md#unit-propagation>
    ///
    /// The error is the terminal incompatibility proving there is no solution.
    pub fn unit_propagation(&mut self, package: P) -> Result<(), IncompId<P, VS>> {
        self.unit_propagation_buffer.clear();
        self.unit_propagation_buffer.push(package);
        while let Some(current_package) = self.unit_propagation_buffer.pop() {
            let mut conflict_id = None;
            // Iterate over incompatibilities in reverse order
            // to evaluate first the newest incompatibilities.
            let incompat_ids = self
                .incompatibilities
                .get(&current_package)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for &incompat_id in incompat_ids.iter().rev() {
                let current_incompat = &self.incompatibility_store[incompat_id];
                match self.partial_solution.relation(current_incompat) {
                    // If the partial solution satisfies the incompatibility
                    // we must perform conflict resolution.
                    Relation::Satisfied => {
                        conflict_id = Some(incompat_id);
                        break;
                    }
                    Relation::AlmostSatisfied(package_almost) => {
                        if !self.unit_propagation_buffer.contains(&package_almost) {
                            self.unit_propagation_buffer.push(package_almost.clone());
                        }
                        // Add (not term) to the partial solution with incompat as cause.
                        self.partial_solution.add_derivation(
                            package_almost,
                            incompat_id,
                            &self.incompatibility_store,
                        );
                    }
                    Relation::Contradicted(_) | Relation::Inconclusive => {}
                }
            }
            if let Some(incompat_id) = conflict_id {
                debug!("conflict: {}", self.incompatibility_store[incompat_id]);
                let (package_almost, root_cause) = self.conflict_resolution(incompat_id)?;
                self.unit_propagation_buffer.clear();
                self.unit_propagation_buffer.push(package_almost.clone());
                // Add to the partial solution with incompat as cause.
                self.partial_solution.add_derivation(
                    package_almost,
                    root_cause,
                    &self.incompatibility_store,
                );
            }
        }
        // If there are no more changed packages, unit propagation is done.
        Ok(())
    }

    /// Return the root cause and the backtracked model.
    /// CF <https://github.com/dart-lang/pub/blob/master/doc/solver.md#conflict-resolution>
    fn conflict_resolution(
        &mut self,
        incompatibility: IncompId<P, VS>,
    ) -> Result<(P, IncompId<P, VS>), IncompId<P, VS>> {
        let mut current_incompat_id = incompatibility;
        let mut current_incompat_changed = false;
        loop {
            if self.incompatibility_store[current_incompat_id]
                .is_terminal(&self.root_package, &self.root_version)
            {
                return Err(current_incompat_id);
            }
            let (package, satisfier_search_result) = self.partial_solution.satisfier_search(
                &self.incompatibility_store[current_incompat_id],
                &self.incompatibility_store,
            );
            match satisfier_search_result {
                SatisfierSearch::DifferentDecisionLevels {
                    previous_satisfier_level,
                } => {
                    self.backtrack(
                        current_incompat_id,
                        current_incompat_changed,
                        previous_satisfier_level,
                    );
                    return Ok((package, current_incompat_id));
                }
                SatisfierSearch::SameDecisionLevels { satisfier_cause } => {
                    let prior_cause = Incompatibility::prior_cause(
                        current_incompat_id,
                        satisfier_cause,
                        &package,
                        &self.incompatibility_store,
                    );
                    debug!("prior cause: {}", prior_cause);
                    current_incompat_id = self.incompatibility_store.alloc(prior_cause);
                    current_incompat_changed = true;
                }
            }
        }
    }

    /// Backtracking.
    fn backtrack(
        &mut self,
        incompat: IncompId<P, VS>,
        incompat_changed: bool,
        decision_level: DecisionLevel,
    ) {
        self.partial_solution
            .backtrack(decision_level, &self.incompatibility_store);
        if incompat_changed {
            self.merge_incompatibility(incompat);
        }
    }

    /// Register an allocated incompatibility under each package it mentions.
    fn merge_incompatibility(&mut self, id: IncompId<P, VS>) {
        for (package, _) in self.incompatibility_store[id].iter() {
            self.incompatibilities
                .entry(package.clone())
                .or_default()
                .push(id);
        }
    }

    // Error reporting #########################################################

    /// Explanation of why the root package cannot be solved,
    /// starting from the terminal incompatibility.
    pub fn build_derivation_tree(&self, incompat: IncompId<P, VS>) -> DerivationTree<P, VS> {
        let shared_ids = self.find_shared_ids(incompat);
        Incompatibility::build_derivation_tree(incompat, &shared_ids, &self.incompatibility_store)
    }

    fn find_shared_ids(&self, incompat: IncompId<P, VS>) -> Set<IncompId<P, VS>> {
        let mut all_ids = Set::default();
        let mut shared_ids = Set::default();
        let mut stack = vec![incompat];
        while let Some(i) = stack.pop() {
            if let Some((id1, id2)) = self.incompatibility_store[i].causes() {
                if all_ids.contains(&i) {
                    shared_ids.insert(i);
                } else {
                    all_ids.insert(i);
                    stack.push(id1);
                    stack.push(id2);
                }
            }
        }
        shared_ids
    }
}

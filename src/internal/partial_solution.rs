// SPDX-License-Identifier: MPL-2.0

//! The partial solution is the current state
//! of the solution being built by the algorithm.

use std::cmp::Reverse;
use std::hash::BuildHasherDefault;

use log::{debug, info};
use priority_queue::PriorityQueue;
use rustc_hash::FxHasher;

use crate::internal::arena::Arena;
use crate::internal::assignment::{Assignment, DatedAssignment, DecisionLevel};
use crate::internal::incompatibility::{IncompId, Incompatibility, Relation};
use crate::internal::memory::Memory;
use crate::package::Package;
use crate::term::Term;
use crate::type_aliases::{Map, SelectedDependencies, Set};
use crate::version_set::VersionSet;

/// Packages with fewer candidate versions come first,
/// ties go to the package discovered first.
type Priority = (Reverse<usize>, Reverse<usize>);

/// The partial solution contains all package assignments,
/// organized by package and historically ordered.
#[derive(Clone, Debug)]
pub struct PartialSolution<P: Package, VS: VersionSet> {
    current_decision_level: DecisionLevel,
    history: Vec<DatedAssignment<P, VS>>,
    memory: Memory<P, VS>,
    prioritized_potential_packages: PriorityQueue<P, Priority, BuildHasherDefault<FxHasher>>,
    outdated_priorities: Set<P>,
}

/// What conflict resolution should do once the satisfier is known.
#[derive(Clone, Debug)]
pub enum SatisfierSearch<P: Package, VS: VersionSet> {
    DifferentDecisionLevels {
        previous_satisfier_level: DecisionLevel,
    },
    SameDecisionLevels {
        satisfier_cause: IncompId<P, VS>,
    },
}

impl<P: Package, VS: VersionSet> PartialSolution<P, VS> {
    /// Initialize an empty PartialSolution.
    pub fn empty() -> Self {
        Self {
            current_decision_level: DecisionLevel(0),
            history: Vec::new(),
            memory: Memory::empty(),
            prioritized_potential_packages: PriorityQueue::default(),
            outdated_priorities: Set::default(),
        }
    }

    #[cfg(test)]
    pub fn current_decision_level(&self) -> DecisionLevel {
        self.current_decision_level
    }

    /// Add a decision.
    pub fn add_decision(&mut self, package: P, version: VS::V) {
        self.current_decision_level = self.current_decision_level.increment();
        info!(
            "decision level {}: {} @ {}",
            self.current_decision_level.0, package, version
        );
        self.prioritized_potential_packages.remove(&package);
        self.outdated_priorities.remove(&package);
        self.history.push(DatedAssignment {
            decision_level: self.current_decision_level,
            assignment: Assignment::Decision {
                package: package.clone(),
                version: version.clone(),
            },
        });
        self.memory.add_decision(package, version);
    }

    /// Add a derivation.
    pub fn add_derivation(
        &mut self,
        package: P,
        cause: IncompId<P, VS>,
        store: &Arena<Incompatibility<P, VS>>,
    ) {
        let term = store[cause].derived_term(&package);
        debug!("derived {} {} from {}", package, term, store[cause]);
        self.history.push(DatedAssignment {
            decision_level: self.current_decision_level,
            assignment: Assignment::Derivation {
                package: package.clone(),
                cause,
            },
        });
        self.memory.add_derivation(package.clone(), term);
        self.outdated_priorities.insert(package);
    }

    /// Pick the undecided package that should be decided next, with its allowed versions.
    /// The prioritizer counts the candidate versions of a package.
    pub fn pick_highest_priority_pkg<E>(
        &mut self,
        mut prioritizer: impl FnMut(&P, &VS) -> Result<usize, E>,
    ) -> Result<Option<(P, VS)>, E> {
        for package in std::mem::take(&mut self.outdated_priorities) {
            match self.memory.potential_versions(&package) {
                Some(set) => {
                    let versions_count = prioritizer(&package, set)?;
                    let discovered = self.memory.discovery_index(&package).unwrap_or(usize::MAX);
                    self.prioritized_potential_packages
                        .push(package, (Reverse(versions_count), Reverse(discovered)));
                }
                None => {
                    self.prioritized_potential_packages.remove(&package);
                }
            }
        }
        while let Some((package, _)) = self.prioritized_potential_packages.pop() {
            if let Some(set) = self.memory.potential_versions(&package) {
                return Ok(Some((package, set.clone())));
            }
        }
        Ok(None)
    }

    /// If a partial solution has, for every positive derivation,
    /// a corresponding decision that satisfies that assignment,
    /// it's a total solution and version solving has succeeded.
    pub fn extract_solution(&self) -> Option<SelectedDependencies<P, VS::V>> {
        self.memory.extract_solution()
    }

    /// Backtrack the partial solution to a given decision level.
    pub fn backtrack(
        &mut self,
        decision_level: DecisionLevel,
        store: &Arena<Incompatibility<P, VS>>,
    ) {
        debug!(
            "backtrack from level {} to level {}",
            self.current_decision_level.0, decision_level.0
        );
        let kept = self
            .history
            .partition_point(|dated| dated.decision_level <= decision_level);
        self.history.truncate(kept);
        self.current_decision_level = decision_level;

        let mut memory = Memory::empty();
        for dated in &self.history {
            match &dated.assignment {
                Assignment::Decision { package, version } => {
                    memory.add_decision(package.clone(), version.clone());
                }
                Assignment::Derivation { package, .. } => {
                    memory.add_derivation(package.clone(), dated.assignment.as_term(store));
                }
            }
        }
        self.memory = memory;

        self.prioritized_potential_packages.clear();
        self.outdated_priorities = self
            .memory
            .potential_packages()
            .map(|(p, _)| p.clone())
            .collect();
    }

    /// We can add the version to the partial solution as a decision
    /// if it doesn't produce any conflict with the new incompatibilities.
    /// In practice I think it can only produce a conflict if one of the dependencies
    /// (which are used to make the new incompatibilities)
    /// is already in the partial solution with an incompatible version.
    pub fn add_version(
        &mut self,
        package: P,
        version: VS::V,
        new_incompatibilities: &[IncompId<P, VS>],
        store: &Arena<Incompatibility<P, VS>>,
    ) {
        let exact = Term::exact(version.clone());
        let not_satisfied = |incompat: &Incompatibility<P, VS>| {
            incompat.relation(|p| {
                if p == &package {
                    Some(exact.clone())
                } else {
                    self.memory.term_intersection_for_package(p).cloned()
                }
            }) != Relation::Satisfied
        };

        if new_incompatibilities
            .iter()
            .all(|id| not_satisfied(&store[*id]))
        {
            self.add_decision(package, version);
        } else {
            info!(
                "not deciding {} @ {}: its dependencies conflict with the partial solution",
                package, version
            );
        }
    }

    /// Check if the terms in the partial solution satisfy the incompatibility.
    pub fn relation(&self, incompat: &Incompatibility<P, VS>) -> Relation<P> {
        incompat.relation(|package| self.memory.term_intersection_for_package(package).cloned())
    }

    /// Retrieve intersection of terms related to package.
    #[cfg(test)]
    pub fn term_intersection_for_package(&self, package: &P) -> Option<&Term<VS>> {
        self.memory.term_intersection_for_package(package)
    }

    /// Figure out if the satisfier and previous satisfier are of different decision levels.
    pub fn satisfier_search(
        &self,
        incompat: &Incompatibility<P, VS>,
        store: &Arena<Incompatibility<P, VS>>,
    ) -> (P, SatisfierSearch<P, VS>) {
        let satisfied_map = Self::find_satisfier(incompat, &self.history, store);
        let (satisfier_package, satisfier_index) = satisfied_map
            .iter()
            .max_by_key(|(_, index)| **index)
            .map(|(p, index)| (p.clone(), *index))
            .expect("a satisfied incompatibility has a satisfier");
        let previous_satisfier_level = Self::find_previous_satisfier(
            incompat,
            &satisfier_package,
            &satisfied_map,
            &self.history,
            store,
        );
        let satisfier = &self.history[satisfier_index];
        let search_result = match &satisfier.assignment {
            Assignment::Derivation { cause, .. }
                if previous_satisfier_level >= satisfier.decision_level =>
            {
                SatisfierSearch::SameDecisionLevels {
                    satisfier_cause: *cause,
                }
            }
            _ => SatisfierSearch::DifferentDecisionLevels {
                previous_satisfier_level,
            },
        };
        (satisfier_package, search_result)
    }

    /// A satisfier is the earliest assignment in partial solution such that the incompatibility
    /// is satisfied by the partial solution up to and including that assignment.
    ///
    /// Returns a map indicating for each package term, when that was first satisfied in history.
    /// If we effectively found a satisfier, the returned map must be the same size that incompat.
    fn find_satisfier(
        incompat: &Incompatibility<P, VS>,
        history: &[DatedAssignment<P, VS>],
        store: &Arena<Incompatibility<P, VS>>,
    ) -> Map<P, usize> {
        let terms_count = incompat.iter().count();
        let mut accumulated: Map<P, Term<VS>> = Map::default();
        let mut satisfied: Map<P, usize> = Map::default();
        for (index, dated) in history.iter().enumerate() {
            let package = dated.assignment.package();
            let incompat_term = match incompat.get(package) {
                Some(term) if !satisfied.contains_key(package) => term,
                _ => continue,
            };
            let accum = accumulated
                .entry(package.clone())
                .or_insert_with(Term::any);
            *accum = accum.intersection(&dated.assignment.as_term(store));
            if accum.subset_of(incompat_term) {
                satisfied.insert(package.clone(), index);
                if satisfied.len() == terms_count {
                    break;
                }
            }
        }
        satisfied
    }

    /// Earliest assignment in the partial solution before satisfier
    /// such that incompatibility is satisfied by the partial solution up to
    /// and including that assignment plus satisfier.
    fn find_previous_satisfier(
        incompat: &Incompatibility<P, VS>,
        satisfier_package: &P,
        satisfied_map: &Map<P, usize>,
        history: &[DatedAssignment<P, VS>],
        store: &Arena<Incompatibility<P, VS>>,
    ) -> DecisionLevel {
        let mut previous_level = satisfied_map
            .iter()
            .filter(|(p, _)| *p != satisfier_package)
            .map(|(_, index)| history[*index].decision_level)
            .max()
            .unwrap_or(DecisionLevel(0));

        let satisfier_index = satisfied_map[satisfier_package];
        let incompat_term = incompat
            .get(satisfier_package)
            .expect("the satisfier package is in the incompatibility");
        let mut accum = history[satisfier_index].assignment.as_term(store);
        if !accum.subset_of(incompat_term) {
            for dated in &history[..satisfier_index] {
                if dated.assignment.package() != satisfier_package {
                    continue;
                }
                accum = accum.intersection(&dated.assignment.as_term(store));
                if accum.subset_of(incompat_term) {
                    previous_level = previous_level.max(dated.decision_level);
                    break;
                }
            }
        }
        previous_level.max(DecisionLevel(1))
    }
}

#[cfg(test)]
mod tests {
    use version_ranges::ConstraintSet;

    use super::*;
    use crate::solver::Dependency;

    type VS = ConstraintSet<u32>;

    #[test]
    fn picks_the_most_constrained_package_first() {
        let mut store = Arena::new();
        let mut solution = PartialSolution::<&str, VS>::empty();
        solution.add_decision("root", 0);
        let deps = [
            Dependency::new("wide", VS::full()),
            Dependency::new("narrow", VS::between(1u32, 3u32)),
        ];
        for dep in &deps {
            let id = store.alloc(Incompatibility::from_dependency(
                "root",
                VS::singleton(0u32),
                dep,
            ));
            solution.add_derivation(dep.package, id, &store);
        }
        let picked = solution
            .pick_highest_priority_pkg(|_, set: &VS| {
                Ok::<_, ()>((0..10u32).filter(|v| set.contains(v)).count())
            })
            .unwrap();
        assert_eq!(picked, Some(("narrow", VS::between(1u32, 3u32))));
    }

    #[test]
    fn backtrack_drops_later_levels() {
        let mut store = Arena::new();
        let mut solution = PartialSolution::<&str, VS>::empty();
        solution.add_decision("root", 0);
        let dep = Dependency::new("a", VS::higher_than(2u32));
        let id = store.alloc(Incompatibility::from_dependency(
            "root",
            VS::singleton(0u32),
            &dep,
        ));
        solution.add_derivation("a", id, &store);
        solution.add_decision("a", 3);
        assert_eq!(solution.current_decision_level(), DecisionLevel(2));
        assert!(solution.extract_solution().is_some());

        solution.backtrack(DecisionLevel(1), &store);
        assert_eq!(solution.current_decision_level(), DecisionLevel(1));
        assert!(solution.extract_solution().is_none());
        assert_eq!(
            solution.term_intersection_for_package(&"a"),
            Some(&Term::Positive(VS::higher_than(2u32)))
        );
    }
}

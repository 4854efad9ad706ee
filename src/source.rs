// SPDX-License-Identifier: MPL-2.0

//! Package source over a [MetadataProvider]: the [DependencyProvider]
//! used to solve Python requirements.

use std::cell::RefCell;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::rc::Rc;

use log::debug;

use crate::cache::MetadataProvider;
use crate::config::SolverConfig;
use crate::error::{ProviderError, SolveError};
use crate::package::PackageId;
use crate::requirement::{parse_constraint, ConstraintParseError, Requirement};
use crate::solver::{resolve_with_config, Dependency, DependencyConstraints, DependencyProvider, Resolution};
use crate::type_aliases::{Map, SemanticVersionSet};
use crate::version::SemanticVersion;

type Releases = BTreeMap<SemanticVersion, Vec<String>>;
type Dependencies = DependencyConstraints<PackageId, SemanticVersionSet>;

/// Package source of one solve.
///
/// The top level requirements are attached to a synthetic root package,
/// [PackageId::root] at version `0.0.0`.
/// Release lists and dependency lists are memoised for the lifetime of the source,
/// build a new source for each solve.
///
/// A package with extras, `foo[bar]` at version `v`, depends on `foo == v`
/// and on the requirements of `foo` gated behind `extra == "bar"`.
/// Requirements with other markers always apply: markers are not evaluated.
pub struct PackageSource<'m, M: ?Sized> {
    metadata: &'m M,
    root_version: SemanticVersion,
    root_dependencies: Dependencies,
    releases: RefCell<Map<String, Rc<Releases>>>,
    dependencies: RefCell<Map<(PackageId, SemanticVersion), Rc<Dependencies>>>,
}

impl<'m, M: MetadataProvider + ?Sized> PackageSource<'m, M> {
    /// Source without any top level requirement yet.
    pub fn new(metadata: &'m M) -> Self {
        Self {
            metadata,
            root_version: SemanticVersion::zero(),
            root_dependencies: Vec::new(),
            releases: RefCell::new(Map::default()),
            dependencies: RefCell::new(Map::default()),
        }
    }

    /// Version of the synthetic root package.
    pub fn root_version(&self) -> &SemanticVersion {
        &self.root_version
    }

    /// Top level requirements registered so far.
    pub fn root_dependencies(&self) -> &[Dependency<PackageId, SemanticVersionSet>] {
        &self.root_dependencies
    }

    /// Require `package` in versions allowed by `constraint`.
    pub fn root_dep(&mut self, package: PackageId, constraint: &str) -> Result<(), ConstraintParseError> {
        let set = parse_constraint(constraint)?;
        let text = format!("{}{}", package, constraint.trim());
        self.root_dependencies
            .push(Dependency::new(package, set).with_text(text));
        Ok(())
    }

    /// Require what a requirement line asks for, such as `flask[async]>=2`.
    pub fn add_root_requirement(&mut self, requirement: &str) -> Result<(), ConstraintParseError> {
        let requirement = Requirement::parse(requirement)?;
        self.root_dependencies.push(requirement.dependency());
        Ok(())
    }

    /// Solve the top level requirements.
    pub fn resolve(
        &self,
        config: &SolverConfig,
    ) -> Result<Resolution<PackageId, SemanticVersionSet>, SolveError<PackageId, SemanticVersionSet>>
    {
        resolve_with_config(self, PackageId::root(), self.root_version.clone(), config)
    }

    fn releases(&self, name: &str) -> Result<Rc<Releases>, ProviderError> {
        if let Some(releases) = self.releases.borrow().get(name) {
            return Ok(Rc::clone(releases));
        }
        let raw = self.metadata.releases(name)?.unwrap_or_default();
        let mut parsed = Releases::new();
        for (text, requirements) in raw {
            let version: SemanticVersion = text.parse()?;
            match parsed.entry(version) {
                Entry::Vacant(entry) => {
                    entry.insert(requirements);
                }
                // `1.0` and `1.0.0` name the same release, both lists must hold.
                Entry::Occupied(mut entry) => {
                    debug!("{} lists {} more than once", name, entry.key());
                    let known = entry.get_mut();
                    for requirement in requirements {
                        if !known.contains(&requirement) {
                            known.push(requirement);
                        }
                    }
                }
            }
        }
        debug!("{} has {} releases", name, parsed.len());
        let parsed = Rc::new(parsed);
        self.releases
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&parsed));
        Ok(parsed)
    }

    fn load_dependencies(
        &self,
        package: &PackageId,
        version: &SemanticVersion,
    ) -> Result<Dependencies, ProviderError> {
        let releases = self.releases(package.name())?;
        let requirements = releases
            .get(version)
            .ok_or_else(|| format!("no metadata for {} {}", package, version))?;

        let mut dependencies = Vec::new();
        if !package.extras().is_empty() {
            dependencies.push(Dependency::new(
                package.base(),
                SemanticVersionSet::singleton(version.clone()),
            ));
        }
        // Unconditional requirements must all hold. Requirements behind markers are
        // alternatives for different environments, any one of them may be the one that applies.
        let mut merged: Vec<(Dependency<PackageId, SemanticVersionSet>, Option<SemanticVersionSet>)> = Vec::new();
        for text in requirements {
            let requirement = Requirement::parse(text)?;
            let gated_by = requirement.marker_extras();
            let applies = if gated_by.is_empty() {
                package.extras().is_empty()
            } else {
                gated_by.iter().any(|extra| package.extras().contains(extra))
            };
            if !applies {
                continue;
            }
            let conditional = requirement.marker().is_some() && gated_by.is_empty();
            let dependency = requirement.dependency();
            match merged.iter_mut().find(|(dep, _)| dep.package == dependency.package) {
                None => {
                    let (dependency, alternatives) = if conditional {
                        let alternatives = dependency.constraint.clone();
                        let unconstrained = Dependency {
                            constraint: SemanticVersionSet::full(),
                            ..dependency
                        };
                        (unconstrained, Some(alternatives))
                    } else {
                        (dependency, None)
                    };
                    merged.push((dependency, alternatives));
                }
                Some((existing, alternatives)) => {
                    if conditional {
                        *alternatives = Some(match alternatives.take() {
                            Some(set) => set.union(&dependency.constraint),
                            None => dependency.constraint.clone(),
                        });
                    } else {
                        existing.constraint = existing.constraint.intersection(&dependency.constraint);
                    }
                    let text = match (existing.text.take(), dependency.text) {
                        (Some(left), Some(right)) => format!("{}, {}", left, right),
                        (left, right) => left.or(right).unwrap_or_default(),
                    };
                    existing.text = Some(text);
                }
            }
        }
        dependencies.extend(merged.into_iter().map(|(mut dependency, alternatives)| {
            if let Some(alternatives) = alternatives {
                dependency.constraint = dependency.constraint.intersection(&alternatives);
            }
            dependency
        }));
        Ok(dependencies)
    }
}

impl<'m, M: MetadataProvider + ?Sized> DependencyProvider<PackageId, SemanticVersionSet>
    for PackageSource<'m, M>
{
    fn versions_for(
        &self,
        package: &PackageId,
        constraint: Option<&SemanticVersionSet>,
    ) -> Result<Vec<SemanticVersion>, ProviderError> {
        let allowed = |v: &SemanticVersion| constraint.map_or(true, |set| set.contains(v));
        if package.is_root() {
            return Ok(Some(self.root_version.clone())
                .filter(|v| allowed(v))
                .into_iter()
                .collect());
        }
        let releases = self.releases(package.name())?;
        Ok(releases.keys().rev().filter(|v| allowed(v)).cloned().collect())
    }

    fn dependencies_for(
        &self,
        package: &PackageId,
        version: &SemanticVersion,
    ) -> Result<Dependencies, ProviderError> {
        if package.is_root() {
            if version != &self.root_version {
                return Err(format!("the root package only exists at {}", self.root_version).into());
            }
            return Ok(self.root_dependencies.clone());
        }
        let key = (package.clone(), version.clone());
        if let Some(dependencies) = self.dependencies.borrow().get(&key) {
            return Ok(dependencies.as_ref().clone());
        }
        let dependencies = Rc::new(self.load_dependencies(package, version)?);
        self.dependencies
            .borrow_mut()
            .insert(key, Rc::clone(&dependencies));
        Ok(dependencies.as_ref().clone())
    }
}

// SPDX-License-Identifier: MPL-2.0

use pipgrub::package::Package;
use pipgrub::solver::OfflineDependencyProvider;
use pipgrub::type_aliases::{Map, SelectedDependencies};
use pipgrub::version_set::VersionSet;
use varisat::ExtendFormula;

/// At most one of the variables is true, encoded pairwise.
/// Packages have few versions here, so the quadratic clause count is fine.
fn sat_at_most_one(cnf: &mut impl ExtendFormula, vars: &[varisat::Var]) {
    for (i, a) in vars.iter().enumerate() {
        for b in &vars[i + 1..] {
            cnf.add_clause(&[a.negative(), b.negative()]);
        }
    }
}

/// Resolution as a SAT problem, to cross-check the solver.
///
/// Every package version is a variable.
/// A selected version implies that each of its dependencies is satisfied
/// by one of the matching versions, and a package has at most one selected version.
pub struct SatResolve<P: Package, VS: VersionSet> {
    solver: varisat::Solver<'static>,
    all_versions_by_p: Map<P, Vec<(VS::V, varisat::Var)>>,
}

impl<P: Package, VS: VersionSet> SatResolve<P, VS> {
    pub fn new(dp: &OfflineDependencyProvider<P, VS>) -> Self {
        let mut cnf = varisat::CnfFormula::new();

        let mut all_versions = vec![];
        let mut all_versions_by_p: Map<P, Vec<(VS::V, varisat::Var)>> = Map::default();

        for p in dp.packages() {
            let Some(versions) = dp.versions(p) else {
                continue;
            };
            for v in versions {
                let new_var = cnf.new_var();
                all_versions.push((p.clone(), v.clone(), new_var));
                all_versions_by_p
                    .entry(p.clone())
                    .or_default()
                    .push((v.clone(), new_var));
            }
        }

        // Only one version of each package.
        for list in all_versions_by_p.values() {
            let vars: Vec<_> = list.iter().map(|(_, var)| *var).collect();
            sat_at_most_one(&mut cnf, &vars);
        }

        // Selected versions need each of their dependencies satisfied.
        let empty_vec = vec![];
        for (p, v, var) in &all_versions {
            let Some(deps) = dp.dependencies(p, v) else {
                continue;
            };
            for dep in deps {
                let mut matches: Vec<varisat::Lit> = all_versions_by_p
                    .get(&dep.package)
                    .unwrap_or(&empty_vec)
                    .iter()
                    .filter(|(v1, _)| dep.constraint.contains(v1))
                    .map(|(_, var1)| var1.positive())
                    .collect();
                matches.push(var.negative());
                cnf.add_clause(&matches);
            }
        }

        let mut solver = varisat::Solver::new();
        solver.add_formula(&cnf);

        // Selecting nothing always satisfies the formula.
        solver
            .solve()
            .expect("docs say it can't error in default config");

        Self {
            solver,
            all_versions_by_p,
        }
    }

    /// Whether some selection contains that package version.
    pub fn resolve(&mut self, name: &P, ver: &VS::V) -> bool {
        let Some(vers) = self.all_versions_by_p.get(name) else {
            return false;
        };
        let Some((_, var)) = vers.iter().find(|(v, _)| v == ver) else {
            return false;
        };
        self.solver.assume(&[var.positive()]);
        self.solver
            .solve()
            .expect("docs say it can't error in default config")
    }

    /// Whether the selection satisfies every dependency it implies.
    pub fn is_valid_solution(&mut self, pids: &SelectedDependencies<P, VS::V>) -> bool {
        let mut assumption = vec![];

        for (p, vs) in &self.all_versions_by_p {
            let pid_for_p = pids.get(p);
            for (v, var) in vs {
                assumption.push(var.lit(pid_for_p == Some(v)))
            }
        }

        self.solver.assume(&assumption);

        self.solver
            .solve()
            .expect("docs say it can't error in default config")
    }
}

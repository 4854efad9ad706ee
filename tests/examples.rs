// SPDX-License-Identifier: MPL-2.0

use std::time::Duration;

use pipgrub::cache::{CachedMetadata, DependencyDatabase, MetadataFetcher};
use pipgrub::config::SolverConfig;
use pipgrub::package::PackageId;
use pipgrub::report::{DefaultStringReporter, Reporter};
use pipgrub::solver::{resolve, OfflineDependencyProvider};
use pipgrub::source::PackageSource;
use pipgrub::type_aliases::{Map, SemanticVersionSet};
use pipgrub::version::SemanticVersion;

type SemVS = SemanticVersionSet;

#[test]
/// https://github.com/dart-lang/pub/blob/master/doc/solver.md#no-conflicts
fn no_conflict() {
    let mut dependency_provider = OfflineDependencyProvider::<&str, SemVS>::new();
    #[rustfmt::skip]
    dependency_provider.add_dependencies(
        "root", (1, 0, 0),
        [("foo", SemVS::between((1, 0, 0), (2, 0, 0)))],
    );
    #[rustfmt::skip]
    dependency_provider.add_dependencies(
        "foo", (1, 0, 0),
        [("bar", SemVS::between((1, 0, 0), (2, 0, 0)))],
    );
    dependency_provider.add_dependencies("bar", (1, 0, 0), []);
    dependency_provider.add_dependencies("bar", (2, 0, 0), []);

    // Run the algorithm.
    let computed_solution = resolve(&dependency_provider, "root", (1, 0, 0))
        .unwrap()
        .into_solution()
        .unwrap();

    // Solution.
    let mut expected_solution = Map::default();
    expected_solution.insert("root", (1, 0, 0).into());
    expected_solution.insert("foo", (1, 0, 0).into());
    expected_solution.insert("bar", (1, 0, 0).into());

    // Comparing the true solution with the one computed by the algorithm.
    assert_eq!(expected_solution, computed_solution);
}

#[test]
/// https://github.com/dart-lang/pub/blob/master/doc/solver.md#avoiding-conflict-during-decision-making
fn avoiding_conflict_during_decision_making() {
    let mut dependency_provider = OfflineDependencyProvider::<&str, SemVS>::new();
    #[rustfmt::skip]
    dependency_provider.add_dependencies(
        "root", (1, 0, 0),
        [
            ("foo", SemVS::between((1, 0, 0), (2, 0, 0))),
            ("bar", SemVS::between((1, 0, 0), (2, 0, 0))),
        ],
    );
    #[rustfmt::skip]
    dependency_provider.add_dependencies(
        "foo", (1, 1, 0),
        [("bar", SemVS::between((2, 0, 0), (3, 0, 0)))],
    );
    dependency_provider.add_dependencies("foo", (1, 0, 0), []);
    dependency_provider.add_dependencies("bar", (1, 0, 0), []);
    dependency_provider.add_dependencies("bar", (1, 1, 0), []);
    dependency_provider.add_dependencies("bar", (2, 0, 0), []);

    // Run the algorithm.
    let computed_solution = resolve(&dependency_provider, "root", (1, 0, 0))
        .unwrap()
        .into_solution()
        .unwrap();

    // Solution.
    let mut expected_solution = Map::default();
    expected_solution.insert("root", (1, 0, 0).into());
    expected_solution.insert("foo", (1, 0, 0).into());
    expected_solution.insert("bar", (1, 1, 0).into());

    // Comparing the true solution with the one computed by the algorithm.
    assert_eq!(expected_solution, computed_solution);
}

#[test]
/// https://github.com/dart-lang/pub/blob/master/doc/solver.md#performing-conflict-resolution
fn conflict_resolution() {
    let mut dependency_provider = OfflineDependencyProvider::<&str, SemVS>::new();
    #[rustfmt::skip]
    dependency_provider.add_dependencies(
        "root", (1, 0, 0),
        [("foo", SemVS::higher_than((1, 0, 0)))],
    );
    #[rustfmt::skip]
    dependency_provider.add_dependencies(
        "foo", (2, 0, 0),
        [("bar", SemVS::between((1, 0, 0), (2, 0, 0)))],
    );
    dependency_provider.add_dependencies("foo", (1, 0, 0), []);
    #[rustfmt::skip]
    dependency_provider.add_dependencies(
        "bar", (1, 0, 0),
        [("foo", SemVS::between((1, 0, 0), (2, 0, 0)))],
    );

    // Run the algorithm.
    let computed_solution = resolve(&dependency_provider, "root", (1, 0, 0))
        .unwrap()
        .into_solution()
        .unwrap();

    // Solution.
    let mut expected_solution = Map::default();
    expected_solution.insert("root", (1, 0, 0).into());
    expected_solution.insert("foo", (1, 0, 0).into());

    // Comparing the true solution with the one computed by the algorithm.
    assert_eq!(expected_solution, computed_solution);
}

#[test]
/// https://github.com/dart-lang/pub/blob/master/doc/solver.md#conflict-resolution-with-a-partial-satisfier
fn conflict_with_partial_satisfier() {
    let mut dependency_provider = OfflineDependencyProvider::<&str, SemVS>::new();
    #[rustfmt::skip]
    // root 1.0.0 depends on foo ^1.0.0 and target ^2.0.0
    dependency_provider.add_dependencies(
        "root", (1, 0, 0),
        [
            ("foo", SemVS::between((1, 0, 0), (2, 0, 0))),
            ("target", SemVS::between((2, 0, 0), (3, 0, 0))),
        ],
    );
    #[rustfmt::skip]
    // foo 1.1.0 depends on left ^1.0.0 and right ^1.0.0
    dependency_provider.add_dependencies(
        "foo", (1, 1, 0),
        [
            ("left", SemVS::between((1, 0, 0), (2, 0, 0))),
            ("right", SemVS::between((1, 0, 0), (2, 0, 0))),
        ],
    );
    dependency_provider.add_dependencies("foo", (1, 0, 0), []);
    #[rustfmt::skip]
    // left 1.0.0 depends on shared >=1.0.0
    dependency_provider.add_dependencies(
        "left", (1, 0, 0),
        [("shared", SemVS::higher_than((1, 0, 0)))],
    );
    #[rustfmt::skip]
    // right 1.0.0 depends on shared <2.0.0
    dependency_provider.add_dependencies(
        "right", (1, 0, 0),
        [("shared", SemVS::strictly_lower_than((2, 0, 0)))],
    );
    dependency_provider.add_dependencies("shared", (2, 0, 0), []);
    #[rustfmt::skip]
    // shared 1.0.0 depends on target ^1.0.0
    dependency_provider.add_dependencies(
        "shared", (1, 0, 0),
        [("target", SemVS::between((1, 0, 0), (2, 0, 0)))],
    );
    dependency_provider.add_dependencies("target", (2, 0, 0), []);
    dependency_provider.add_dependencies("target", (1, 0, 0), []);

    // Run the algorithm.
    let computed_solution = resolve(&dependency_provider, "root", (1, 0, 0))
        .unwrap()
        .into_solution()
        .unwrap();

    // Solution.
    let mut expected_solution = Map::default();
    expected_solution.insert("root", (1, 0, 0).into());
    expected_solution.insert("foo", (1, 0, 0).into());
    expected_solution.insert("target", (2, 0, 0).into());

    // Comparing the true solution with the one computed by the algorithm.
    assert_eq!(expected_solution, computed_solution);
}

#[test]
/// a0 dep on b and c
/// b0 dep on d0
/// b1 dep on d1 (not existing)
/// c0 has no dep
/// c1 dep on d2 (not existing)
/// d0 has no dep
///
/// Solution: a0, b0, c0, d0
fn double_choices() {
    let mut dependency_provider = OfflineDependencyProvider::<&str, SemVS>::new();
    dependency_provider.add_dependencies("a", (0, 0, 0), [("b", SemVS::full()), ("c", SemVS::full())]);
    dependency_provider.add_dependencies("b", (0, 0, 0), [("d", SemVS::singleton((0, 0, 0)))]);
    dependency_provider.add_dependencies("b", (1, 0, 0), [("d", SemVS::singleton((1, 0, 0)))]);
    dependency_provider.add_dependencies("c", (0, 0, 0), []);
    dependency_provider.add_dependencies("c", (1, 0, 0), [("d", SemVS::singleton((2, 0, 0)))]);
    dependency_provider.add_dependencies("d", (0, 0, 0), []);

    // Solution.
    let mut expected_solution = Map::default();
    expected_solution.insert("a", (0, 0, 0).into());
    expected_solution.insert("b", (0, 0, 0).into());
    expected_solution.insert("c", (0, 0, 0).into());
    expected_solution.insert("d", (0, 0, 0).into());

    // Run the algorithm.
    let computed_solution = resolve(&dependency_provider, "a", (0, 0, 0))
        .unwrap()
        .into_solution()
        .unwrap();
    assert_eq!(expected_solution, computed_solution);
}

const INDEX: &str = r#"{
    "flask": {
        "2.0.0": ["Werkzeug>=2.0", "Jinja2>=3.0", "click>=7.1.2"],
        "2.3.0": ["Werkzeug>=2.3", "Jinja2>=3.1", "click>=8.1.3", "asgiref>=3.2; extra == 'async'"]
    },
    "werkzeug": {"2.0.3": [], "2.3.7": ["MarkupSafe>=2.1.1"]},
    "jinja2": {"3.0.3": ["MarkupSafe>=2.0"], "3.1.2": ["MarkupSafe>=2.0"]},
    "markupsafe": {"2.0.1": [], "2.1.3": []},
    "click": {"7.1.2": [], "8.1.7": ["colorama; platform_system == 'Windows'"]},
    "colorama": {"0.4.6": []},
    "asgiref": {"3.7.2": []},
    "numpy": {"1.19.0": [], "1.24.0": [], "1.26.0": [], "2.0.0": []},
    "app": {
        "1.0.0": [
            "numpy>=1.20",
            "numpy<1.25; python_version < '3.8'",
            "numpy<2; python_version >= '3.8'"
        ]
    }
}"#;

fn v(text: &str) -> SemanticVersion {
    text.parse().unwrap()
}

#[test]
fn python_requirements_with_extras() {
    let database = DependencyDatabase::from_json_str(INDEX).unwrap();
    let mut source = PackageSource::new(&database);
    source.add_root_requirement("Flask[async]~=2.0").unwrap();

    let solution = source
        .resolve(&SolverConfig::default())
        .unwrap()
        .into_solution()
        .unwrap();
    let flask_async = PackageId::with_extras("flask", ["async"]);
    assert_eq!(solution[&flask_async], v("2.3.0"));
    assert_eq!(solution[&PackageId::new("flask")], v("2.3.0"));
    assert_eq!(solution[&PackageId::new("werkzeug")], v("2.3.7"));
    assert_eq!(solution[&PackageId::new("markupsafe")], v("2.1.3"));
    assert_eq!(solution[&PackageId::new("asgiref")], v("3.7.2"));
    assert_eq!(solution[&PackageId::new("colorama")], v("0.4.6"));
}

#[test]
fn pinned_requirements_pull_older_releases() {
    let database = DependencyDatabase::from_json_str(INDEX).unwrap();
    let mut source = PackageSource::new(&database);
    source.add_root_requirement("flask").unwrap();
    source.add_root_requirement("click<8").unwrap();

    let solution = source
        .resolve(&SolverConfig::default())
        .unwrap()
        .into_solution()
        .unwrap();
    assert_eq!(solution[&PackageId::new("flask")], v("2.0.0"));
    assert_eq!(solution[&PackageId::new("click")], v("7.1.2"));
    assert!(!solution.contains_key(&PackageId::new("asgiref")));
}

#[test]
fn requirements_behind_markers_are_alternatives() {
    let database = DependencyDatabase::from_json_str(INDEX).unwrap();
    let mut source = PackageSource::new(&database);
    source.add_root_requirement("app").unwrap();

    let solution = source
        .resolve(&SolverConfig::default())
        .unwrap()
        .into_solution()
        .unwrap();
    assert_eq!(solution[&PackageId::new("numpy")], v("1.26.0"));
}

#[test]
fn unsatisfiable_python_requirements() {
    let database = DependencyDatabase::from_json_str(INDEX).unwrap();
    let mut source = PackageSource::new(&database);
    source.add_root_requirement("flask>=2.3").unwrap();
    source.add_root_requirement("werkzeug<2.3").unwrap();

    let resolution = source.resolve(&SolverConfig::default()).unwrap();
    let mut tree = resolution.derivation_tree().unwrap().clone();
    assert!(tree.packages().contains(&PackageId::new("werkzeug")));
    tree.collapse_no_versions();
    let report = DefaultStringReporter::report(&tree);
    assert!(report.contains("Werkzeug>=2.3"), "{}", report);
}

#[test]
fn cached_metadata_feeds_the_solver() {
    let database = DependencyDatabase::from_json_str(INDEX).unwrap();
    let fetcher = |name: &str| database.fetch(name);
    let cache = CachedMetadata::new(fetcher, Duration::from_secs(60));
    let mut source = PackageSource::new(&cache);
    source.root_dep(PackageId::new("jinja2"), "==3.0.*").unwrap();

    let solution = source
        .resolve(&SolverConfig::default())
        .unwrap()
        .into_solution()
        .unwrap();
    assert_eq!(solution[&PackageId::new("jinja2")], v("3.0.3"));
    assert_eq!(solution[&PackageId::new("markupsafe")], v("2.1.3"));
    assert!(!cache.is_stale("markupsafe"));
}

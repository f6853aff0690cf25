//! Solver scenario tests
//!
//! Each test builds a small package universe, records a request in a
//! [`DepCache`] and checks the transaction the solver turns it into.

use super::*;
use crate::cache::{Cache, CacheBuilder, PackageId, VersionSpec};
use crate::config::{RequestFlags, SolverConfig};
use crate::depcache::DepCache;
use crate::error::SolverError;
use crate::policy::StaticPolicy;
use crate::transaction::Transaction;

/// Build an amd64 cache from version records
fn universe(specs: Vec<VersionSpec>) -> Cache {
    let mut builder = CacheBuilder::new("amd64");
    for spec in specs {
        builder.add(spec).unwrap();
    }
    builder.build()
}

/// Mark `name` for install the way a command line request does
fn request_install(depcache: &mut DepCache<'_>, name: &str) {
    let pkg = depcache.cache().find_package(name).unwrap();
    depcache.mark_install(pkg, true);
    depcache.protect(pkg);
}

/// Solve and render the resulting transaction
fn solve(
    cache: &Cache,
    policy: &StaticPolicy,
    config: &SolverConfig,
    flags: RequestFlags,
    request: impl FnOnce(&mut DepCache<'_>),
) -> Result<Vec<String>, SolverError> {
    let mut depcache = DepCache::new(cache, policy);
    request(&mut depcache);
    DependencySolver::resolve(cache, policy, &mut depcache, config, flags)?;
    let transaction = Transaction::from_dep_cache(&depcache);
    Ok(transaction
        .operations
        .iter()
        .map(|op| op.display(cache).to_string())
        .collect())
}

fn upgrade() -> RequestFlags {
    RequestFlags {
        upgrade_all: true,
        ..Default::default()
    }
}

// ============================================================================
// Installing
// ============================================================================

#[test]
fn test_solver_install_versioned_dependency() {
    let cache = universe(vec![
        VersionSpec::new("a", "1").depends("b (>= 2)"),
        VersionSpec::new("b", "1"),
        VersionSpec::new("b", "2"),
    ]);
    let policy = StaticPolicy::new();

    let ops = solve(&cache, &policy, &SolverConfig::default(), RequestFlags::default(), |d| {
        request_install(d, "a")
    })
    .unwrap();
    assert_eq!(ops, vec!["Install a (1)", "Install b (2) [auto]"]);
}

#[test]
fn test_solver_dependency_overrides_pinned_candidate() {
    let cache = universe(vec![
        VersionSpec::new("a", "1").depends("b (>= 2)"),
        VersionSpec::new("b", "1"),
        VersionSpec::new("b", "2"),
    ]);
    let policy = StaticPolicy::new().with_pin("b", "1", 990);
    let config = SolverConfig::default().with_strict_pinning(false);

    let ops = solve(&cache, &policy, &config, RequestFlags::default(), |d| request_install(d, "a")).unwrap();
    assert_eq!(ops, vec!["Install a (1)", "Install b (2) [auto]"]);
}

#[test]
fn test_solver_strict_pinning_rejects_other_versions() {
    let cache = universe(vec![
        VersionSpec::new("a", "1").depends("b (>= 2)"),
        VersionSpec::new("b", "1"),
        VersionSpec::new("b", "2"),
    ]);
    let policy = StaticPolicy::new().with_pin("b", "1", 990);

    let result = solve(&cache, &policy, &SolverConfig::default(), RequestFlags::default(), |d| {
        request_install(d, "a")
    });
    match result {
        Err(SolverError::Unsatisfiable(conflict)) => {
            assert!(
                conflict
                    .explanation
                    .starts_with("Unable to satisfy dependencies. Reached two conflicting assignments:"),
                "unexpected explanation: {}",
                conflict.explanation
            );
        }
        other => panic!("expected unsatisfiable, got {:?}", other),
    }
}

#[test]
fn test_solver_backtracks_to_second_alternative() {
    let cache = universe(vec![
        VersionSpec::new("a", "1").depends("b | c"),
        VersionSpec::new("b", "1").depends("x (>= 2)"),
        VersionSpec::new("c", "1"),
        VersionSpec::new("x", "1"),
    ]);
    let policy = StaticPolicy::new();

    let ops = solve(&cache, &policy, &SolverConfig::default(), RequestFlags::default(), |d| {
        request_install(d, "a")
    })
    .unwrap();
    assert_eq!(ops, vec!["Install a (1)", "Install c (1) [auto]"]);
}

#[test]
fn test_solver_timeout_while_backtracking() {
    let cache = universe(vec![
        VersionSpec::new("a", "1").depends("b | c"),
        VersionSpec::new("b", "1").depends("x (>= 2)"),
        VersionSpec::new("c", "1"),
        VersionSpec::new("x", "1"),
    ]);
    let policy = StaticPolicy::new();
    let config = SolverConfig::default().with_timeout(0);

    let result = solve(&cache, &policy, &config, RequestFlags::default(), |d| request_install(d, "a"));
    assert!(matches!(result, Err(SolverError::Timeout)), "expected timeout, got {:?}", result);
}

// ============================================================================
// Providers
// ============================================================================

#[test]
fn test_solver_installed_provider_wins() {
    let cache = universe(vec![
        VersionSpec::new("app", "1").depends("mta"),
        VersionSpec::new("exim", "1").provides("mta"),
        VersionSpec::new("postfix", "1").provides("mta").installed(),
    ]);
    let policy = StaticPolicy::new();

    let ops = solve(&cache, &policy, &SolverConfig::default(), RequestFlags::default(), |d| {
        request_install(d, "app")
    })
    .unwrap();
    assert_eq!(ops, vec!["Install app (1)"]);
}

#[test]
fn test_solver_provider_chosen_by_name() {
    let cache = universe(vec![
        VersionSpec::new("app", "1").depends("mta"),
        VersionSpec::new("postfix", "1").provides("mta"),
        VersionSpec::new("exim", "1").provides("mta"),
    ]);
    let policy = StaticPolicy::new();

    let ops = solve(&cache, &policy, &SolverConfig::default(), RequestFlags::default(), |d| {
        request_install(d, "app")
    })
    .unwrap();
    assert_eq!(ops, vec!["Install app (1)", "Install exim (1) [auto]"]);
}

// ============================================================================
// Conflicts and removals
// ============================================================================

#[test]
fn test_solver_conflict_removes_manual_package() {
    let cache = universe(vec![
        VersionSpec::new("a", "1").conflicts("b"),
        VersionSpec::new("b", "1").installed(),
    ]);
    let policy = StaticPolicy::new();

    let ops = solve(&cache, &policy, &SolverConfig::default(), RequestFlags::default(), |d| {
        request_install(d, "a")
    })
    .unwrap();
    assert_eq!(ops, vec!["Remove b (1)", "Install a (1)"]);
}

#[test]
fn test_solver_conflict_with_protected_package() {
    let cache = universe(vec![
        VersionSpec::new("a", "1").conflicts("b"),
        VersionSpec::new("b", "1").installed(),
    ]);
    let policy = StaticPolicy::new();

    let result = solve(&cache, &policy, &SolverConfig::default(), RequestFlags::default(), |d| {
        request_install(d, "a");
        let b = d.cache().find_package("b").unwrap();
        d.protect(b);
    });
    assert!(matches!(result, Err(SolverError::Unsatisfiable(_))));
}

#[test]
fn test_solver_forbid_remove_keeps_installed() {
    let cache = universe(vec![
        VersionSpec::new("a", "1").conflicts("b"),
        VersionSpec::new("b", "1").installed(),
    ]);
    let policy = StaticPolicy::new();
    let flags = RequestFlags {
        forbid_remove: true,
        ..Default::default()
    };

    let result = solve(&cache, &policy, &SolverConfig::default(), flags, |d| request_install(d, "a"));
    assert!(matches!(result, Err(SolverError::Unsatisfiable(_))));
}

#[test]
fn test_solver_conflicting_requests_install_exactly_one() {
    let cache = universe(vec![
        VersionSpec::new("a", "1").conflicts("b"),
        VersionSpec::new("b", "1"),
    ]);
    let policy = StaticPolicy::new();
    let config = SolverConfig::default();
    let a = cache.find_package("a").unwrap();
    let b = cache.find_package("b").unwrap();

    let mut depcache = DepCache::new(&cache, &policy);
    depcache.mark_install(a, true);
    depcache.mark_install(b, true);

    let mut solver = DependencySolver::new(&cache, &policy, &config, RequestFlags::default()).unwrap();
    solver.from_dep_cache(&depcache).unwrap();
    solver.solve().unwrap();

    let installed: Vec<PackageId> = [a, b]
        .into_iter()
        .filter(|&pkg| solver.value(Var::Package(pkg)) == LiftedBool::True)
        .collect();
    assert_eq!(installed.len(), 1, "expected exactly one of a and b");
    let rejected = if installed[0] == a { b } else { a };
    assert_eq!(solver.value(Var::Package(rejected)), LiftedBool::False);

    let explanation = DependencySolver::why(&cache, &policy, &depcache, &config, rejected, false).unwrap();
    assert!(explanation.contains("Conflicts"), "unexpected explanation: {}", explanation);

    solver.to_dep_cache(&mut depcache);
    let ops: Vec<String> = Transaction::from_dep_cache(&depcache)
        .operations
        .iter()
        .map(|op| op.display(&cache).to_string())
        .collect();
    assert_eq!(ops, vec![format!("Install {} (1)", cache.package(installed[0]).name)]);
}

#[test]
fn test_solver_why_not_names_the_conflict() {
    let cache = universe(vec![
        VersionSpec::new("a", "1").conflicts("b"),
        VersionSpec::new("b", "1").installed(),
    ]);
    let policy = StaticPolicy::new();
    let mut depcache = DepCache::new(&cache, &policy);
    request_install(&mut depcache, "a");

    let b = cache.find_package("b").unwrap();
    let explanation =
        DependencySolver::why(&cache, &policy, &depcache, &SolverConfig::default(), b, false).unwrap();
    assert!(
        explanation.contains("b:amd64=1 is not selected for install because:"),
        "unexpected explanation: {}",
        explanation
    );
    assert!(explanation.contains("a:amd64=1 is selected for install"));
    assert!(explanation.contains("a:amd64 Conflicts b"));
}

// ============================================================================
// Upgrades
// ============================================================================

#[test]
fn test_solver_held_package_is_not_upgraded() {
    let cache = universe(vec![
        VersionSpec::new("x", "1").installed().hold(),
        VersionSpec::new("x", "2"),
    ]);
    let policy = StaticPolicy::new();

    let ops = solve(&cache, &policy, &SolverConfig::default(), upgrade(), |_| {}).unwrap();
    assert!(ops.is_empty(), "held package changed: {:?}", ops);
}

#[test]
fn test_solver_held_package_blocks_dependency() {
    let cache = universe(vec![
        VersionSpec::new("x", "1").installed().hold(),
        VersionSpec::new("x", "2"),
        VersionSpec::new("y", "1").depends("x (>= 2)"),
    ]);
    let policy = StaticPolicy::new();

    let result = solve(&cache, &policy, &SolverConfig::default(), RequestFlags::default(), |d| {
        request_install(d, "y")
    });
    assert!(matches!(result, Err(SolverError::Unsatisfiable(_))));
}

#[test]
fn test_solver_upgrade_installs_new_recommends() {
    let cache = universe(vec![
        VersionSpec::new("a", "1").installed(),
        VersionSpec::new("a", "2").recommends("r"),
        VersionSpec::new("r", "1"),
    ]);
    let policy = StaticPolicy::new();

    let ops = solve(&cache, &policy, &SolverConfig::default(), upgrade(), |_| {}).unwrap();
    assert_eq!(ops, vec!["Upgrade a (1 => 2)", "Install r (1) [auto]"]);
}

#[test]
fn test_solver_upgrade_ignores_unsatisfied_recommends() {
    let cache = universe(vec![
        VersionSpec::new("a", "1").installed().recommends("r"),
        VersionSpec::new("a", "2").recommends("r"),
        VersionSpec::new("r", "1"),
    ]);
    let policy = StaticPolicy::new();

    let ops = solve(&cache, &policy, &SolverConfig::default(), upgrade(), |_| {}).unwrap();
    assert_eq!(ops, vec!["Upgrade a (1 => 2)"]);
}

#[test]
fn test_solver_upgrade_keeps_formerly_recommended_package() {
    let cache = universe(vec![
        VersionSpec::new("p", "1").installed().recommends("q"),
        VersionSpec::new("p", "2"),
        VersionSpec::new("q", "1").installed().auto(),
    ]);
    let policy = StaticPolicy::new();
    let q = cache.find_package("q").unwrap();
    let current = cache.package(q).current_version;

    for forbid_remove in [false, true] {
        let flags = RequestFlags {
            upgrade_all: true,
            forbid_remove,
            ..Default::default()
        };
        let mut depcache = DepCache::new(&cache, &policy);
        DependencySolver::resolve(&cache, &policy, &mut depcache, &SolverConfig::default(), flags).unwrap();

        assert_eq!(depcache.resulting_version(q), current, "q removed with forbid_remove={}", forbid_remove);
        let ops: Vec<String> = Transaction::from_dep_cache(&depcache)
            .operations
            .iter()
            .map(|op| op.display(&cache).to_string())
            .collect();
        assert_eq!(ops, vec!["Upgrade p (1 => 2)"]);
    }
}

#[test]
fn test_solver_without_upgrade_keeps_installed_version() {
    let cache = universe(vec![VersionSpec::new("a", "1").installed(), VersionSpec::new("a", "2")]);
    let policy = StaticPolicy::new();

    let ops = solve(&cache, &policy, &SolverConfig::default(), RequestFlags::default(), |_| {}).unwrap();
    assert!(ops.is_empty(), "unexpected changes: {:?}", ops);
}

// ============================================================================
// Automatically installed packages
// ============================================================================

fn autoremove_universe() -> Cache {
    universe(vec![
        VersionSpec::new("app", "1").installed().depends("libx"),
        VersionSpec::new("libx", "1").installed().auto(),
        VersionSpec::new("liby", "1").installed().auto(),
    ])
}

fn autoremove_config() -> SolverConfig {
    SolverConfig {
        solver: "internal".to_string(),
        automatic_remove: true,
        ..Default::default()
    }
}

#[test]
fn test_solver_removes_unneeded_auto_packages() {
    let cache = autoremove_universe();
    let policy = StaticPolicy::new();

    let ops = solve(&cache, &policy, &autoremove_config(), RequestFlags::default(), |_| {}).unwrap();
    assert_eq!(ops, vec!["Remove liby (1)"]);
}

#[test]
fn test_solver_never_auto_remove_keeps_root_set() {
    let cache = autoremove_universe();
    let policy = StaticPolicy::new();
    let config = SolverConfig {
        never_auto_remove: vec!["^liby$".to_string()],
        ..autoremove_config()
    };

    let ops = solve(&cache, &policy, &config, RequestFlags::default(), |_| {}).unwrap();
    assert!(ops.is_empty(), "unexpected changes: {:?}", ops);
}

#[test]
fn test_solver_keeps_auto_packages_by_default() {
    let cache = autoremove_universe();
    let policy = StaticPolicy::new();

    let ops = solve(&cache, &policy, &SolverConfig::default(), RequestFlags::default(), |_| {}).unwrap();
    assert!(ops.is_empty(), "unexpected changes: {:?}", ops);
}

// ============================================================================
// Explanations
// ============================================================================

#[test]
fn test_solver_why_names_the_dependency_chain() {
    let cache = universe(vec![
        VersionSpec::new("a", "1").depends("b"),
        VersionSpec::new("b", "1"),
        VersionSpec::new("c", "1"),
    ]);
    let policy = StaticPolicy::new();
    let mut depcache = DepCache::new(&cache, &policy);
    request_install(&mut depcache, "a");
    let config = SolverConfig::default();

    let b = cache.find_package("b").unwrap();
    let explanation = DependencySolver::why(&cache, &policy, &depcache, &config, b, true).unwrap();
    assert_eq!(
        explanation,
        "b:amd64 is selected for install because:\n\
         1. a:amd64=1 is selected for install\n\
         2. a:amd64 Depends b\n"
    );

    let c = cache.find_package("c").unwrap();
    let explanation = DependencySolver::why(&cache, &policy, &depcache, &config, c, true).unwrap();
    assert_eq!(explanation, "c:amd64 is undecided\n");
}

// ============================================================================
// Solution properties
// ============================================================================

/// Check version exclusivity and that every clause whose reason holds is met.
fn assert_sound(solver: &DependencySolver<'_>, cache: &Cache) {
    for pkg in cache.package_ids() {
        let versions = &cache.package(pkg).versions;
        let selected = versions
            .iter()
            .filter(|&&ver| solver.value(Var::Version(ver)) == LiftedBool::True)
            .count();
        let name = cache.full_name(pkg, false);
        assert!(selected <= 1, "{} has {} versions selected", name, selected);
        if solver.value(Var::Package(pkg)) == LiftedBool::True && !versions.is_empty() {
            assert_eq!(selected, 1, "{} is installed without a version", name);
        }
    }

    let engine = solver.solver();
    for index in 0..engine.clause_count() {
        let clause = engine.clause(ClauseId(index as u32));
        if engine.value(clause.reason) != LiftedBool::True {
            continue;
        }
        let text = clause.to_string(cache, false, false);
        if clause.negative {
            assert!(
                clause.solutions.iter().all(|&sol| engine.value(sol) == LiftedBool::False),
                "violated: {}",
                text
            );
        } else if !clause.optional {
            assert!(
                clause.solutions.iter().any(|&sol| engine.value(sol) == LiftedBool::True),
                "unsatisfied: {}",
                text
            );
        }
    }
}

/// Solve, check the solution and return the plan with every assignment.
fn solve_checked(
    cache: &Cache,
    flags: RequestFlags,
    install: &[&str],
) -> (Vec<String>, Vec<LiftedBool>) {
    let policy = StaticPolicy::new();
    let config = SolverConfig::default();
    let mut depcache = DepCache::new(cache, &policy);
    for name in install {
        let pkg = cache.find_package(name).unwrap();
        depcache.mark_install(pkg, true);
    }

    let mut solver = DependencySolver::new(cache, &policy, &config, flags).unwrap();
    solver.from_dep_cache(&depcache).unwrap();
    solver.solve().unwrap();
    assert_sound(&solver, cache);

    let mut assignments = Vec::new();
    for pkg in cache.package_ids() {
        assignments.push(solver.value(Var::Package(pkg)));
        for &ver in &cache.package(pkg).versions {
            assignments.push(solver.value(Var::Version(ver)));
        }
    }

    solver.to_dep_cache(&mut depcache);
    let ops = Transaction::from_dep_cache(&depcache)
        .operations
        .iter()
        .map(|op| op.display(cache).to_string())
        .collect();
    (ops, assignments)
}

fn property_fixtures() -> Vec<(Cache, RequestFlags, Vec<&'static str>)> {
    vec![
        (
            universe(vec![
                VersionSpec::new("app", "1").depends("mta, lib (>= 3)"),
                VersionSpec::new("postfix", "1").provides("mta"),
                VersionSpec::new("exim", "1").provides("mta"),
                VersionSpec::new("lib", "2"),
                VersionSpec::new("lib", "3"),
            ]),
            RequestFlags::default(),
            vec!["app"],
        ),
        (
            universe(vec![
                VersionSpec::new("a", "1").depends("b | c"),
                VersionSpec::new("b", "1").depends("x (>= 2)"),
                VersionSpec::new("c", "1"),
                VersionSpec::new("x", "1"),
            ]),
            RequestFlags::default(),
            vec!["a"],
        ),
        (
            universe(vec![
                VersionSpec::new("a", "1").conflicts("b"),
                VersionSpec::new("b", "1"),
            ]),
            RequestFlags::default(),
            vec!["a", "b"],
        ),
        (
            universe(vec![
                VersionSpec::new("a", "1").conflicts("b"),
                VersionSpec::new("b", "1").installed(),
            ]),
            RequestFlags::default(),
            vec!["a"],
        ),
        (
            universe(vec![
                VersionSpec::new("a", "1").installed(),
                VersionSpec::new("a", "2").recommends("r"),
                VersionSpec::new("r", "1"),
                VersionSpec::new("p", "1").installed().recommends("q"),
                VersionSpec::new("p", "2"),
                VersionSpec::new("q", "1").installed().auto(),
            ]),
            upgrade(),
            vec![],
        ),
    ]
}

#[test]
fn test_solver_solutions_are_sound_and_deterministic() {
    for (cache, flags, install) in property_fixtures() {
        let first = solve_checked(&cache, flags, &install);
        for _ in 0..3 {
            assert_eq!(solve_checked(&cache, flags, &install), first, "request {:?} changed", install);
        }
    }
}

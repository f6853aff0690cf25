//! Turning package relations into clauses.

use crate::cache::{DepType, DependencyId, PackageId};

use super::clause::{Clause, ClauseId, Group};
use super::dependency::Domain;
use super::solver::Solver;
use super::var::Var;

impl Domain<'_> {
    /// Translate one OR-group (`a | b | c`) declared by `reason` into a clause.
    ///
    /// Relations that impose nothing come back as an empty optional clause.
    pub(super) fn translate_or_group(&self, solver: &Solver<'_>, group: &[DependencyId], reason: Var) -> Clause {
        let cache = self.cache;
        let (Some(&first), Some(&last)) = (group.first(), group.last()) else {
            return Clause::optional(reason, Group::Satisfy);
        };
        let parent = cache.version(cache.dependency(first).parent);
        let parent_installed = cache.package(parent.package).current_version;
        let first_data = cache.dep_data(first);

        // Unimportant relations can only be kept, never newly installed
        if parent_installed.is_none() && !self.policy.is_important_dep(cache, first) {
            return Clause::optional(reason, Group::Satisfy);
        }
        if matches!(first_data.dep_type, DepType::Replaces | DepType::Enhances) {
            return Clause::optional(reason, Group::Satisfy);
        }
        if self.options.debug >= 3 {
            log::debug!(
                "Found dependency critical {} -> {}",
                reason.to_string(cache),
                cache.full_name(first_data.target, false)
            );
        }

        let mut clause = Clause::with_flags(
            reason,
            Group::Satisfy,
            !first_data.dep_type.is_critical(),
            first_data.dep_type.is_negative(),
        );
        clause.dep = Some(first);

        for &dep in group {
            let data = cache.dep_data(dep);
            let begin = clause.solutions.len();

            if self.options.defer_version_selection
                && !clause.negative
                && cache.package(data.target).provided_by.is_empty()
                && cache.is_satisfied_by_package(dep)
            {
                clause.solutions.push(Var::Package(data.target));
                continue;
            }

            for ver in cache.all_targets(dep) {
                if self.options.debug >= 3 {
                    log::debug!(
                        "Adding work to item {} -> {}={}{}",
                        reason.to_string(cache),
                        cache.full_name(cache.version(ver).package, false),
                        cache.version(ver).version,
                        if clause.negative { " (negative)" } else { "" }
                    );
                }
                clause.solutions.push(Var::Version(ver));
            }
            self.sort_providers(solver, Some(data.target), &mut clause.solutions[begin..]);
        }

        // Obsolete packages to the end, installed ones to the front
        if !self.options.fix_policy_broken {
            clause.solutions.sort_by_cached_key(|&var| {
                let obsolete = self.options.is_upgrade && self.var_obsolete(solver, var, false);
                (obsolete, !self.var_installed(var))
            });
        }

        if clause.solutions.iter().all(|&var| !self.var_installed(var)) {
            clause.group = Group::SatisfyNew;
        }
        if clause
            .solutions
            .iter()
            .any(|&var| self.var_obsolete(solver, var, true))
        {
            clause.group = Group::SatisfyObsolete;
        }

        // Try to preserve satisfied soft dependencies of installed packages
        let Some(current) = parent_installed.filter(|_| clause.optional) else {
            return clause;
        };
        let important = self.policy.is_important_dep(cache, last);
        let important_to_keep = |dep: DependencyId| {
            self.policy.is_important_dep(cache, dep)
                || (self.options.keep_recommends && cache.dep_data(dep).dep_type == DepType::Recommends)
                || (self.options.keep_suggests && cache.dep_data(dep).dep_type == DepType::Suggests)
        };
        let satisfied = clause.solutions.iter().any(|&var| match var {
            Var::Package(pkg) => cache.package(pkg).is_installed(),
            Var::Version(ver) => cache.package(cache.version(ver).package).current_version == Some(ver),
            Var::Root => false,
        });
        let target = cache.dep_data(last).target;
        let existing = cache.version(current).depends.iter().copied().find(|&dep| {
            let data = cache.dep_data(dep);
            !data.dep_type.is_critical() && important_to_keep(dep) && data.target == target
        });

        if existing.is_some() && !important && important_to_keep(last) && satisfied {
            if self.options.debug >= 3 {
                log::debug!("Try to keep satisfied: {}", clause.to_string(cache, true, true));
            }
            // Only the previously installed solutions remain, tried last
            clause.group = Group::SatisfySuggests;
            clause.solutions.retain(|&var| self.var_installed(var));
        } else if !important {
            if self.options.debug >= 3 {
                log::debug!("Ignore unimportant clause: {}", clause.to_string(cache, true, true));
            }
            return Clause::optional(reason, Group::Satisfy);
        } else if existing.is_some_and(|dep| self.policy.is_important_dep(cache, dep)) && !satisfied {
            if self.options.debug >= 3 {
                log::debug!("Ignoring unsatisfied clause: {}", clause.to_string(cache, true, true));
            }
            return Clause::optional(reason, Group::Satisfy);
        } else if self.options.is_upgrade && existing.is_some() && satisfied {
            if self.options.debug >= 3 {
                log::debug!(
                    "Promoting previously satisfied clause to hard dependency: {}",
                    clause.to_string(cache, true, true)
                );
            }
            clause.optional = false;
            clause.eager = true;
        } else if self.options.is_upgrade
            && !(self.options.allow_remove && self.options.allow_install)
            && reason
                .version()
                .is_some_and(|ver| cache.package(cache.version(ver).package).current_version != Some(ver))
            && existing.map_or(true, |dep| !self.policy.is_important_dep(cache, dep))
        {
            // New Recommends of an upgraded package, outside of a full upgrade
            if self.options.debug >= 3 {
                log::debug!("Promoting new clause to hard dependency: {}", clause.to_string(cache, false, true));
            }
            clause.optional = false;
            clause.eager = true;
        } else if existing.is_some() && important_to_keep(last) && satisfied {
            if self.options.debug >= 3 {
                log::debug!(
                    "Restricting existing Recommends to installed packages: {}",
                    clause.to_string(cache, true, true)
                );
            }
            clause.solutions.retain(|&var| self.var_installed(var));
            clause.eager = true;
        }

        clause
    }

    /// Add `clause` to the solver, or fold it into an earlier clause of the
    /// same reason on the same target.
    ///
    /// Two single-alternative relations on one name, such as
    /// `pkg (>> 2), pkg (<< 4)`, end up as one clause over the versions
    /// satisfying both. Returns `None` when the clause was folded away.
    pub(super) fn register_clause(&self, solver: &mut Solver<'_>, mut clause: Clause) -> Option<ClauseId> {
        let cache = self.cache;
        let single = clause.dep.filter(|&dep| !cache.dep_data(dep).or_next);

        if let Some(dep) = single.filter(|_| !clause.negative) {
            let target = cache.dep_data(dep).target;
            let mut merged = false;

            for id in solver.state(clause.reason).clauses.clone() {
                let earlier = solver.clause(id);
                if earlier.negative {
                    continue;
                }
                let Some(earlier_dep) = earlier.dep else {
                    continue;
                };
                let earlier_data = cache.dep_data(earlier_dep);
                if earlier_data.or_next || earlier_data.target != target {
                    continue;
                }
                if !earlier.solutions.iter().any(|sol| clause.solutions.contains(sol)) {
                    continue;
                }

                if earlier.optional == clause.optional {
                    let earlier = solver.clause_mut(id);
                    earlier.solutions.retain(|sol| clause.solutions.contains(sol));
                    earlier.merged.insert(0, clause.clone());
                    merged = true;
                } else if clause.optional {
                    // A hard relation narrows a soft one on the same name
                    clause.solutions.retain(|sol| earlier.solutions.contains(sol));
                    let mut copy = earlier.clone();
                    clause.merged = std::mem::take(&mut copy.merged);
                    clause.merged.insert(0, copy);
                }
            }

            if merged {
                return None;
            }
        }

        Some(solver.insert_clause(clause))
    }

    /// Register the OR-groups every version of `pkg` declares against the
    /// package itself.
    pub(super) fn register_common_dependencies(&self, solver: &mut Solver<'_>, pkg: PackageId) {
        let cache = self.cache;
        let Some((&first, rest)) = cache.package(pkg).versions.split_first() else {
            return;
        };

        for group in cache.or_groups(first) {
            let shared = rest.iter().all(|&ver| {
                cache
                    .or_groups(ver)
                    .iter()
                    .any(|other| cache.same_or_group(group, other))
            });
            if !shared {
                continue;
            }
            let clause = self.translate_or_group(solver, group, Var::Package(pkg));
            self.register_clause(solver, clause);
        }
    }

    fn var_installed(&self, var: Var) -> bool {
        var.cast_package(self.cache)
            .is_some_and(|pkg| self.cache.package(pkg).is_installed())
    }

    fn var_obsolete(&self, solver: &Solver<'_>, var: Var, allow_manual: bool) -> bool {
        var.cast_package(self.cache)
            .is_some_and(|pkg| self.obsolete(solver, pkg, allow_manual))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Cache, CacheBuilder, VersionSpec};
    use crate::config::{RequestFlags, SolverConfig, SolverOptions};
    use crate::policy::StaticPolicy;

    fn setup<'a>(cache: &'a Cache, policy: &'a StaticPolicy, config: SolverConfig) -> (Domain<'a>, Solver<'a>) {
        let options = SolverOptions::new(&config, RequestFlags::default()).unwrap();
        let solver = Solver::new(cache, options.timeout, 0);
        (Domain::new(cache, policy, options), solver)
    }

    fn first_group(cache: &Cache, name: &str, version: &str) -> (Var, Vec<DependencyId>) {
        let pkg = cache.find_package(name).unwrap();
        let ver = cache.find_version(pkg, version).unwrap();
        (Var::Version(ver), cache.or_groups(ver)[0].to_vec())
    }

    fn versions(cache: &Cache, clause: &Clause) -> Vec<String> {
        clause.solutions.iter().map(|sol| sol.to_string(cache)).collect()
    }

    #[test]
    fn test_versioned_alternatives_expand() {
        let mut builder = CacheBuilder::new("amd64");
        builder.add(VersionSpec::new("a", "1").depends("b (>= 2) | c")).unwrap();
        builder.add(VersionSpec::new("b", "1")).unwrap();
        builder.add(VersionSpec::new("b", "2")).unwrap();
        builder.add(VersionSpec::new("b", "3")).unwrap();
        builder.add(VersionSpec::new("c", "1")).unwrap();
        let cache = builder.build();
        let policy = StaticPolicy::new();
        let (domain, solver) = setup(&cache, &policy, SolverConfig::default());

        let (reason, group) = first_group(&cache, "a", "1");
        let clause = domain.translate_or_group(&solver, &group, reason);
        assert!(!clause.optional);
        assert!(!clause.negative);
        assert_eq!(clause.group, Group::SatisfyNew);
        // c is unversioned and satisfied by every version, so it is deferred
        assert_eq!(versions(&cache, &clause), vec!["b:amd64=3", "b:amd64=2", "c:amd64"]);
    }

    #[test]
    fn test_negative_relation() {
        let mut builder = CacheBuilder::new("amd64");
        builder.add(VersionSpec::new("a", "1").conflicts("b")).unwrap();
        builder.add(VersionSpec::new("b", "1").installed()).unwrap();
        let cache = builder.build();
        let policy = StaticPolicy::new();
        let (domain, solver) = setup(&cache, &policy, SolverConfig::default());

        let (reason, group) = first_group(&cache, "a", "1");
        let clause = domain.translate_or_group(&solver, &group, reason);
        assert!(clause.negative);
        assert!(!clause.optional);
        assert_eq!(clause.group, Group::Satisfy);
        assert_eq!(versions(&cache, &clause), vec!["b:amd64=1"]);
    }

    #[test]
    fn test_soft_relation_of_new_package_is_dropped() {
        let mut builder = CacheBuilder::new("amd64");
        builder.add(VersionSpec::new("a", "1").suggests("b")).unwrap();
        builder.add(VersionSpec::new("b", "1")).unwrap();
        let cache = builder.build();
        let policy = StaticPolicy::new();
        let (domain, solver) = setup(&cache, &policy, SolverConfig::default());

        let (reason, group) = first_group(&cache, "a", "1");
        let clause = domain.translate_or_group(&solver, &group, reason);
        assert!(clause.optional);
        assert!(clause.solutions.is_empty());
        assert_eq!(clause.dep, None);
    }

    #[test]
    fn test_satisfied_suggests_is_kept() {
        let mut builder = CacheBuilder::new("amd64");
        builder.add(VersionSpec::new("a", "1").suggests("b | c").installed()).unwrap();
        builder.add(VersionSpec::new("b", "1")).unwrap();
        builder.add(VersionSpec::new("c", "1").installed()).unwrap();
        let cache = builder.build();
        let policy = StaticPolicy::new();
        let (domain, solver) = setup(&cache, &policy, SolverConfig::default());

        let (reason, group) = first_group(&cache, "a", "1");
        let clause = domain.translate_or_group(&solver, &group, reason);
        assert!(clause.optional);
        assert_eq!(clause.group, Group::SatisfySuggests);
        assert_eq!(versions(&cache, &clause), vec!["c:amd64"]);
    }

    #[test]
    fn test_satisfied_recommends_promoted_on_upgrade() {
        let mut builder = CacheBuilder::new("amd64");
        builder.add(VersionSpec::new("a", "1").recommends("b").installed()).unwrap();
        builder.add(VersionSpec::new("a", "2").recommends("b")).unwrap();
        builder.add(VersionSpec::new("b", "1").installed()).unwrap();
        let cache = builder.build();
        let policy = StaticPolicy::new();
        let (domain, solver) = setup(&cache, &policy, SolverConfig::default().with_upgrade(true));

        let (reason, group) = first_group(&cache, "a", "2");
        let clause = domain.translate_or_group(&solver, &group, reason);
        assert!(!clause.optional);
        assert!(clause.eager);
    }

    #[test]
    fn test_register_merges_same_target() {
        let mut builder = CacheBuilder::new("amd64");
        builder
            .add(VersionSpec::new("a", "1").depends("b (>= 2), b (<< 4)"))
            .unwrap();
        for version in ["1", "2", "3", "4"] {
            builder.add(VersionSpec::new("b", version)).unwrap();
        }
        let cache = builder.build();
        let policy = StaticPolicy::new();
        let (domain, mut solver) = setup(&cache, &policy, SolverConfig::default());

        let a = cache.find_package("a").unwrap();
        let a1 = cache.find_version(a, "1").unwrap();
        let groups = cache.or_groups(a1);

        let lower = domain.translate_or_group(&solver, groups[0], Var::Version(a1));
        let upper = domain.translate_or_group(&solver, groups[1], Var::Version(a1));
        let id = domain.register_clause(&mut solver, lower).unwrap();
        assert_eq!(domain.register_clause(&mut solver, upper), None);

        let merged = solver.clause(id);
        assert_eq!(versions(&cache, merged), vec!["b:amd64=3", "b:amd64=2"]);
        assert_eq!(merged.merged.len(), 1);
        assert_eq!(solver.state(Var::Version(a1)).clauses, vec![id]);
    }
}

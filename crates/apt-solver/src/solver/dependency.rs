//! The package layer on top of the engine: lazy clause discovery, seeding
//! from the desired-state ledger and writing the result back.

use std::cell::{Cell, OnceCell};
use std::collections::{HashSet, VecDeque};

use crate::cache::{Cache, IdMap, PackageId, SelectedState, VersionId};
use crate::config::{RequestFlags, SolverConfig, SolverOptions};
use crate::depcache::DepCache;
use crate::error::Result;
use crate::policy::Policy;

use super::clause::{Clause, Group};
use super::solver::{Discover, Solver};
use super::var::{LiftedBool, Var};
use super::work::Work;

/// Package knowledge the engine asks for while searching.
pub(super) struct Domain<'a> {
    pub(super) cache: &'a Cache,
    pub(super) policy: &'a dyn Policy,
    pub(super) options: SolverOptions,
    pub(super) pkg_obsolete: IdMap<PackageId, Cell<LiftedBool>>,
    priorities: IdMap<VersionId, OnceCell<i32>>,
    candidates: IdMap<PackageId, OnceCell<Option<VersionId>>>,
    discover_queue: VecDeque<Var>,
}

impl<'a> Domain<'a> {
    pub(super) fn new(cache: &'a Cache, policy: &'a dyn Policy, options: SolverOptions) -> Self {
        Self {
            cache,
            policy,
            options,
            pkg_obsolete: IdMap::from_fn(cache.package_count(), |_| Cell::new(LiftedBool::Undefined)),
            priorities: IdMap::from_fn(cache.version_count(), |_| OnceCell::new()),
            candidates: IdMap::from_fn(cache.package_count(), |_| OnceCell::new()),
            discover_queue: VecDeque::new(),
        }
    }

    pub(super) fn priority(&self, ver: VersionId) -> i32 {
        *self.priorities[ver].get_or_init(|| self.policy.priority(self.cache, ver))
    }

    pub(super) fn candidate(&self, pkg: PackageId) -> Option<VersionId> {
        *self.candidates[pkg].get_or_init(|| self.policy.candidate(self.cache, pkg))
    }

    fn discover_package(&self, solver: &mut Solver<'_>, pkg: PackageId) {
        let mut solutions: Vec<Var> = self
            .cache
            .package(pkg)
            .versions
            .iter()
            .map(|&ver| Var::Version(ver))
            .collect();
        self.sort_providers(solver, Some(pkg), &mut solutions);
        self.register_clause(
            solver,
            Clause::new(Var::Package(pkg), Group::SelectVersion).with_solutions(solutions),
        );
        self.register_common_dependencies(solver, pkg);
    }

    fn discover_version(&self, solver: &mut Solver<'_>, ver: VersionId) {
        let cache = self.cache;
        let pkg = cache.version(ver).package;
        let reason = Var::Version(ver);

        self.register_clause(
            solver,
            Clause::new(reason, Group::SelectVersion).with_solutions(vec![Var::Package(pkg)]),
        );
        for &other in &cache.package(pkg).versions {
            if other == ver {
                continue;
            }
            let exclusive = Clause::with_flags(reason, Group::SelectVersion, false, true)
                .with_solutions(vec![Var::Version(other)]);
            self.register_clause(solver, exclusive);
        }

        for group in cache.or_groups(ver) {
            // Shared by all versions and already registered on the package
            let shared = solver
                .state(Var::Package(pkg))
                .clauses
                .iter()
                .any(|&id| {
                    solver
                        .clause(id)
                        .dep
                        .is_some_and(|dep| cache.same_or_group(group, cache.or_group_at(dep)))
                });
            if shared {
                continue;
            }
            let clause = self.translate_or_group(solver, group, reason);
            self.register_clause(solver, clause);
        }
    }
}

impl Discover for Domain<'_> {
    fn discover(&mut self, solver: &mut Solver<'_>, var: Var) {
        self.discover_queue.push_back(var);

        while let Some(mut var) = self.discover_queue.pop_front() {
            // The package goes first so shared relations can be hoisted onto it
            if let Var::Version(ver) = var {
                let pkg = self.cache.version(ver).package;
                if !solver.state(Var::Package(pkg)).discovered {
                    var = Var::Package(pkg);
                }
            }

            if solver.state(var).discovered {
                continue;
            }
            solver.state_mut(var).discovered = true;

            match var {
                Var::Package(pkg) => self.discover_package(solver, pkg),
                Var::Version(ver) => self.discover_version(solver, ver),
                Var::Root => {}
            }

            // Everything not ruled out by a fact at level 0
            for &id in &solver.state(var).clauses {
                for &sol in &solver.clause(id).solutions {
                    if solver.value(sol) != LiftedBool::False || solver.state(sol).level > 0 {
                        self.discover_queue.push_back(sol);
                    }
                }
            }
        }
    }
}

/// Solves a request recorded in a [`DepCache`].
///
/// ```ignore
/// let mut solver = DependencySolver::new(&cache, &policy, &config, flags)?;
/// solver.from_dep_cache(&depcache)?;
/// solver.solve()?;
/// solver.to_dep_cache(&mut depcache);
/// ```
pub struct DependencySolver<'a> {
    domain: Domain<'a>,
    solver: Solver<'a>,
}

impl<'a> DependencySolver<'a> {
    pub fn new(
        cache: &'a Cache,
        policy: &'a dyn Policy,
        config: &SolverConfig,
        flags: RequestFlags,
    ) -> Result<Self> {
        let options = SolverOptions::new(config, flags)?;
        let solver = Solver::new(cache, options.timeout, options.debug);
        Ok(Self {
            domain: Domain::new(cache, policy, options),
            solver,
        })
    }

    pub fn solver(&self) -> &Solver<'a> {
        &self.solver
    }

    pub fn options(&self) -> &SolverOptions {
        &self.domain.options
    }

    pub fn value(&self, var: Var) -> LiftedBool {
        self.solver.value(var)
    }

    /// Register the clauses reachable from `var` without assigning anything.
    pub fn discover(&mut self, var: Var) {
        self.domain.discover(&mut self.solver, var);
    }

    /// Seed the solver with the requests and the installed state in `depcache`.
    pub fn from_dep_cache(&mut self, depcache: &DepCache<'_>) -> Result<()> {
        let cache = self.domain.cache;
        let debug = self.domain.options.debug;

        // Strict pinning: only the installed and the candidate version exist
        if self.domain.options.strict_pinning {
            for pkg in cache.package_ids() {
                let state = depcache.state(pkg);
                let forced = state.protect && state.install();
                let phasing = self.domain.options.is_upgrade && depcache.phasing_applied(pkg) && !forced;
                let package = cache.package(pkg);
                for &ver in &package.versions {
                    if package.current_version != Some(ver)
                        && (depcache.candidate_version(pkg) != Some(ver) || phasing)
                    {
                        self.solver.enqueue(!Var::Version(ver), None)?;
                    }
                }
            }
        }

        // Discovery reads the manual flag, so it is set before anything else
        for pkg in cache.package_ids() {
            let state = depcache.state(pkg);
            if cache.package(pkg).is_installed() && !state.auto && (state.keep() || state.install()) {
                self.solver.state_mut(Var::Package(pkg)).manual = true;
            }
        }

        let mut manual_packages = Vec::new();
        for pkg in cache.package_ids() {
            let package = cache.package(pkg);
            if package.versions.is_empty() {
                continue;
            }
            let state = depcache.state(pkg);
            let options = &self.domain.options;

            if package.selected_state == SelectedState::Hold && !state.protect {
                if debug >= 1 {
                    log::debug!("Hold {}", cache.full_name(pkg, false));
                }
                match package.current_version {
                    Some(current) => self.solver.enqueue(Var::Version(current).into(), None)?,
                    None => self.solver.enqueue(!Var::Package(pkg), None)?,
                }
            } else if state.delete()
                || (!package.is_installed() && state.keep() && state.protect)
                || (!package.is_installed() && state.keep() && !options.allow_install)
            {
                if debug >= 1 {
                    log::debug!("Delete {}", cache.full_name(pkg, false));
                }
                self.solver.enqueue(!Var::Package(pkg), None)?;
            } else if state.install() || (state.keep() && package.is_installed()) {
                let is_essential = package.essential || package.important;
                let is_auto = state.auto;
                let is_optional = ((is_auto && options.allow_remove) || options.allow_remove_manual)
                    && !is_essential
                    && !state.protect;
                let in_root_set = options.in_root_set(&package.name);
                let upgrade = depcache.candidate_version(pkg) != package.current_version;
                let group = match (is_auto, upgrade) {
                    (true, true) => Group::UpgradeAuto,
                    (true, false) => Group::KeepAuto,
                    (false, true) => Group::UpgradeManual,
                    (false, false) => Group::InstallManual,
                };
                let flags = format!(
                    "{}{}{}",
                    if is_essential { "E" } else { "" },
                    if is_auto { "A" } else { "" },
                    if in_root_set { "R" } else { "" }
                );

                if is_auto && !state.protect && !is_essential && !options.keep_auto && !in_root_set {
                    if debug >= 1 {
                        log::debug!("Ignore automatic install {} ({})", cache.full_name(pkg, false), flags);
                    }
                    continue;
                }
                if debug >= 1 {
                    log::debug!("Install {} ({})", cache.full_name(pkg, false), flags);
                }

                if !is_optional {
                    // Hard requests are facts, no need to queue them
                    let var = match depcache.candidate_version(pkg) {
                        Some(candidate) if state.install() => Var::Version(candidate),
                        _ => Var::Package(pkg),
                    };
                    self.solver.enqueue(var.into(), None)?;
                    continue;
                }

                let install = Clause::optional(Var::Root, group).with_solutions(vec![Var::Package(pkg)]);
                self.add_root_clause(install)?;
                if !is_auto {
                    manual_packages.push(Var::Package(pkg));
                }

                // Given A -> A2 | A1 and B -> B1 | B2 with Bn -> An, rejecting A1
                // should try A2 before B, so we end up with A2 and B2 rather
                // than removing A to keep B1.
                let mut versions: Vec<Var> = package.versions.iter().map(|&ver| Var::Version(ver)).collect();
                self.domain.sort_providers(&self.solver, Some(pkg), &mut versions);
                let shortcircuit = Clause::optional(Var::Root, group).with_solutions(versions);
                self.add_root_clause(shortcircuit)?;

                // The shortcircuit clause can only become unit once discovered
                if package.versions.len() > 1 {
                    self.discover(Var::Package(pkg));
                }
            } else if options.is_upgrade && options.allow_remove && options.allow_install && package.essential {
                let mut essentials: Vec<Var> = cache
                    .group_packages(package.group)
                    .iter()
                    .filter(|&&p| cache.package(p).essential)
                    .map(|&p| Var::Package(p))
                    .collect();
                self.domain.sort_providers(&self.solver, Some(pkg), &mut essentials);
                if debug >= 1 {
                    log::debug!("Install essential package {}", cache.full_name(pkg, false));
                }
                self.add_root_clause(Clause::new(Var::Root, Group::InstallManual).with_solutions(essentials))?;
            }
        }

        self.solver.propagate(&mut self.domain)?;

        self.domain.sort_providers(&self.solver, None, &mut manual_packages);
        for var in manual_packages {
            let result = match self.solver.assume(var.into(), None) {
                Ok(()) => self.solver.propagate(&mut self.domain),
                Err(conflict) => Err(conflict),
            };
            if let Err(conflict) = result {
                self.solver.pop(conflict)?;
            }
        }

        Ok(())
    }

    fn add_root_clause(&mut self, clause: Clause) -> Result<()> {
        if let Some(id) = self.domain.register_clause(&mut self.solver, clause) {
            let work = Work::new(id, self.solver.clause(id), self.solver.decision_level());
            self.solver.add_work(work)?;
        }
        Ok(())
    }

    pub fn solve(&mut self) -> Result<()> {
        self.solver.solve(&mut self.domain)
    }

    /// Record the solution in `depcache`.
    pub fn to_dep_cache(&self, depcache: &mut DepCache<'_>) {
        let cache = self.domain.cache;
        let options = &self.domain.options;
        let mut moved_manual: IdMap<PackageId, bool> = IdMap::new(cache.package_count(), false);

        for pkg in cache.package_ids() {
            let package = cache.package(pkg);
            depcache.set_marked(pkg, false, false);

            if self.value(Var::Package(pkg)) == LiftedBool::True {
                let Some(candidate) = package
                    .versions
                    .iter()
                    .copied()
                    .find(|&ver| self.value(Var::Version(ver)) == LiftedBool::True)
                else {
                    log::warn!("No version of {} selected, keeping it", cache.full_name(pkg, false));
                    depcache.mark_keep(pkg, false);
                    depcache.set_marked(pkg, true, false);
                    continue;
                };

                let reason_of = |var: Var| {
                    self.solver
                        .state(var)
                        .reason
                        .map_or(Var::Root, |id| self.solver.clause(id).reason)
                };
                let mut reason = reason_of(Var::Version(candidate));
                if reason == Var::Package(pkg) {
                    reason = reason_of(Var::Package(pkg));
                }

                if package.current_version != Some(candidate) {
                    let automatic = (!reason.is_root() || depcache.is_auto(pkg)) && !moved_manual[pkg];
                    depcache.set_candidate_version(candidate);
                    depcache.mark_install(pkg, !automatic);

                    match package.current_version {
                        None => depcache.mark_auto(pkg, automatic),
                        Some(current) if !depcache.is_auto(pkg) => {
                            let current_section = cache.version(current).section.as_deref();
                            let new_section = cache.version(candidate).section.as_deref();
                            if let (Some(current_section), Some(new_section)) = (current_section, new_section) {
                                if !options.is_move_autobit_section(current_section)
                                    && options.is_move_autobit_section(new_section)
                                {
                                    self.move_manual_bit(depcache, pkg, candidate, &mut moved_manual);
                                }
                            }
                        }
                        Some(_) => {}
                    }
                } else {
                    depcache.mark_keep(pkg, reason.is_root() && !depcache.is_auto(pkg));
                }
                depcache.set_marked(pkg, true, false);
            } else if package.is_installed() || depcache.state(pkg).install() {
                let state = self.solver.state(Var::Package(pkg));
                let automatic = state.reason.is_none() && state.reason_str.is_none();
                let purge = depcache.state(pkg).delete() && depcache.state(pkg).purge;
                depcache.mark_delete(pkg, purge, automatic);
                depcache.set_marked(pkg, false, true);
            }
        }
    }

    /// A manually installed package moved to a section like oldlibs hands its
    /// manual bit to the new packages it pulls in.
    fn move_manual_bit(
        &self,
        depcache: &mut DepCache<'_>,
        pkg: PackageId,
        candidate: VersionId,
        moved_manual: &mut IdMap<PackageId, bool>,
    ) {
        let cache = self.domain.cache;
        let mut moved = false;
        for &id in &self.solver.state(Var::Version(candidate)).clauses {
            for &sol in &self.solver.clause(id).solutions {
                let Some(target) = sol.cast_package(cache) else {
                    continue;
                };
                if target == pkg || cache.package(target).is_installed() {
                    continue;
                }
                log::info!(
                    "Move manual bit from {} to {}",
                    cache.full_name(pkg, false),
                    cache.package(target).name
                );
                moved_manual[target] = true;
                depcache.mark_auto(target, false);
                moved = true;
            }
        }
        if moved {
            depcache.mark_auto(pkg, true);
        }
    }

    /// Solve the request in `depcache` and record the result there.
    pub fn resolve(
        cache: &'a Cache,
        policy: &'a dyn Policy,
        depcache: &mut DepCache<'_>,
        config: &SolverConfig,
        flags: RequestFlags,
    ) -> Result<()> {
        let mut solver = DependencySolver::new(cache, policy, config, flags)?;
        solver.from_dep_cache(depcache)?;
        solver.solve()?;
        solver.to_dep_cache(depcache);
        Ok(())
    }

    /// Explain why `pkg` ends up installed (`assignment`) or not.
    pub fn why(
        cache: &'a Cache,
        policy: &'a dyn Policy,
        depcache: &DepCache<'_>,
        config: &SolverConfig,
        pkg: PackageId,
        assignment: bool,
    ) -> Result<String> {
        let mut solver = DependencySolver::new(cache, policy, config, RequestFlags::default())?;
        // Nothing may depend on pkg, so it is discovered explicitly
        solver.discover(Var::Package(pkg));
        solver.from_dep_cache(depcache)?;
        solver.solve()?;

        let name = cache.full_name(pkg, false);
        let var = Var::Package(pkg);
        let explanation = match solver.value(var) {
            LiftedBool::Undefined => format!("{} is undecided\n", name),
            value if assignment && value != LiftedBool::True => {
                format!("{} is not actually marked for install\n", name)
            }
            LiftedBool::True if !assignment => format!("{} is actually marked for install\n", name),
            _ => {
                let mut seen = HashSet::new();
                let reason = solver.solver.state(var).reason;
                solver.solver.long_why_str(var, assignment, reason, "", &mut seen)
            }
        };
        Ok(explanation)
    }
}

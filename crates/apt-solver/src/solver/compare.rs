//! Preference order among candidate versions and providers.
//!
//! The same order decides what the search tries first and how solutions are
//! listed in explanations.

use std::cmp::Ordering;

use apt_version::compare_versions;

use crate::cache::{MultiArch, PackageId, Version, VersionId};

use super::dependency::Domain;
use super::solver::Solver;
use super::var::Var;

impl Domain<'_> {
    /// Sort `vars` most preferred first, keeping the given order among equals.
    ///
    /// `target` is the package a relation names, if any; providers from the
    /// same group as the target are preferred.
    pub(super) fn sort_providers(&self, solver: &Solver<'_>, target: Option<PackageId>, vars: &mut [Var]) {
        // Insertion sort: across packages the order is a heuristic that need
        // not be transitive, so it must not be handed to the std sorts.
        for i in 1..vars.len() {
            let mut j = i;
            while j > 0 && self.compare_providers(solver, target, vars[j], vars[j - 1]) == Ordering::Less {
                vars.swap(j, j - 1);
                j -= 1;
            }
        }
    }

    pub(super) fn compare_providers(
        &self,
        solver: &Solver<'_>,
        target: Option<PackageId>,
        a: Var,
        b: Var,
    ) -> Ordering {
        match (self.representative(solver, a), self.representative(solver, b)) {
            (Some(va), Some(vb)) => {
                if self.prefer_version(solver, target, va, vb) {
                    Ordering::Less
                } else if self.prefer_version(solver, target, vb, va) {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    /// Packages are compared by their best version.
    fn representative(&self, solver: &Solver<'_>, var: Var) -> Option<VersionId> {
        match var {
            Var::Root => None,
            Var::Package(pkg) => self.best_version(solver, pkg),
            Var::Version(ver) => Some(ver),
        }
    }

    /// The most preferred version of `pkg`, the one its SelectVersion clause
    /// tries first. Packages rank by this version, so the winner of a tie is
    /// the version the search would actually pick.
    pub(super) fn best_version(&self, solver: &Solver<'_>, pkg: PackageId) -> Option<VersionId> {
        self.cache
            .package(pkg)
            .versions
            .iter()
            .copied()
            .reduce(|best, ver| {
                if self.prefer_version(solver, Some(pkg), ver, best) {
                    ver
                } else {
                    best
                }
            })
    }

    /// Whether `a` should be tried before `b`.
    pub(super) fn prefer_version(
        &self,
        solver: &Solver<'_>,
        target: Option<PackageId>,
        a: VersionId,
        b: VersionId,
    ) -> bool {
        let cache = self.cache;
        let (av, bv) = (cache.version(a), cache.version(b));
        let (pa, pb) = (av.package, bv.package);
        let (ap, bp) = (cache.package(pa), cache.package(pb));

        if pa == pb {
            if a == b {
                return false;
            }
            if self.options.is_upgrade {
                let candidate = self.candidate(pa);
                if candidate == Some(a) || candidate == Some(b) {
                    return candidate == Some(a);
                }
            }
            let current = ap.current_version;
            if current == Some(a) || current == Some(b) {
                return current == Some(a);
            }
            let (prio_a, prio_b) = (self.priority(a), self.priority(b));
            if prio_a != prio_b {
                return prio_a > prio_b;
            }
            return compare_versions(&av.version, &bv.version) == Ordering::Greater;
        }

        // Obsolete packages only once everything else is exhausted, so that
        // upgrades install their replacements
        if self.options.is_upgrade {
            let (obsolete_a, obsolete_b) = (self.obsolete(solver, pa, false), self.obsolete(solver, pb, false));
            if obsolete_a != obsolete_b {
                return obsolete_b;
            }
        }

        if av.multi_arch == MultiArch::Same || bv.multi_arch == MultiArch::Same {
            let group_installed = |ver: &Version, group| {
                ver.multi_arch == MultiArch::Same
                    && cache
                        .group_packages(group)
                        .iter()
                        .any(|&p| cache.package(p).is_installed())
            };
            let installed_a = group_installed(av, ap.group);
            let installed_b = group_installed(bv, bp.group);
            if installed_a != installed_b {
                return installed_a;
            }
        }

        if ap.is_installed() != bp.is_installed() {
            return ap.is_installed();
        }

        if let Some(target) = target {
            let group = cache.package(target).group;
            if ap.group != bp.group {
                if ap.group == group {
                    return true;
                }
                if bp.group == group {
                    return false;
                }
            }
        }

        if ap.essential != bp.essential {
            return ap.essential;
        }
        if ap.important != bp.important {
            return ap.important;
        }

        if ap.arch != bp.arch {
            if ap.arch == cache.native_arch() {
                return true;
            }
            if bp.arch == cache.native_arch() {
                return false;
            }
            for arch in cache.architectures() {
                if *arch == ap.arch {
                    return true;
                }
                if *arch == bp.arch {
                    return false;
                }
            }
        }

        if av.priority != bv.priority {
            return av.priority < bv.priority;
        }
        if ap.name != bp.name {
            return ap.name < bp.name;
        }
        pa > pb
    }
}

use std::cmp::Ordering;

use apt_version::compare_versions;

use crate::cache::{PackageId, VersionId};

use super::dependency::Domain;
use super::solver::Solver;
use super::var::{LiftedBool, Var};

impl Domain<'_> {
    /// Whether `pkg` is obsolete: not installable, or replaced by a newer
    /// binary of the same source package.
    ///
    /// Manually installed packages are never obsolete unless `allow_manual`.
    pub(super) fn obsolete(&self, solver: &Solver<'_>, pkg: PackageId, allow_manual: bool) -> bool {
        if solver.state(Var::Package(pkg)).manual && !allow_manual {
            return false;
        }
        match self.pkg_obsolete[pkg].get() {
            LiftedBool::True => return true,
            LiftedBool::False => return false,
            LiftedBool::Undefined => {}
        }

        let package = self.cache.package(pkg);
        let candidate = match self.candidate(pkg) {
            Some(ver) => Some(ver),
            None if !self.options.strict_pinning => package.versions.first().copied(),
            None => None,
        };
        let Some(candidate) = candidate else {
            if self.options.debug >= 3 {
                log::debug!("Obsolete: {} - not installable", self.cache.full_name(pkg, false));
            }
            self.pkg_obsolete[pkg].set(LiftedBool::True);
            return true;
        };

        if self.obsoleted_by_newer_source_version(candidate) {
            return true;
        }

        // Any downloadable version will do
        if package
            .versions
            .iter()
            .any(|&ver| self.cache.version(ver).downloadable)
        {
            self.pkg_obsolete[pkg].set(LiftedBool::False);
            return false;
        }

        if self.options.debug >= 3 {
            log::debug!(
                "Obsolete: {}={} - not installable",
                self.cache.full_name(pkg, false),
                self.cache.version(candidate).version
            );
        }
        self.pkg_obsolete[pkg].set(LiftedBool::True);
        true
    }

    /// Whether another binary of the candidate's source package, built for the
    /// same architecture, has a higher source version at no lower priority.
    fn obsoleted_by_newer_source_version(&self, candidate: VersionId) -> bool {
        let cache = self.cache;
        let cand = cache.version(candidate);
        let cand_package = cache.package(cand.package);
        let cand_priority = self.priority(candidate);

        for &ver in cache.versions_in_source(&cand.source_package) {
            let version = cache.version(ver);
            if version.package == cand.package
                || cache.package(version.package).arch != cand_package.arch
                || version.is_arch_all() != cand.is_arch_all()
                || compare_versions(&version.source_version, &cand.source_version) != Ordering::Greater
            {
                continue;
            }

            // Equal priority is fine given the higher version
            let priority = self.priority(ver);
            if priority == 0 || priority < cand_priority {
                continue;
            }

            self.pkg_obsolete[cand.package].set(LiftedBool::True);
            if self.options.debug >= 3 {
                log::debug!(
                    "Obsolete: {}={} due to {}={}",
                    cache.full_name(cand.package, false),
                    cand.version,
                    cache.full_name(version.package, false),
                    version.version
                );
            }
            return true;
        }

        false
    }
}

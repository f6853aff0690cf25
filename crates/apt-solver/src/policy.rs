use std::collections::HashMap;

use apt_version::compare_versions;

use crate::cache::{Cache, DepType, DependencyId, PackageId, VersionId};

/// Pin priority given to versions available from an archive.
pub const DEFAULT_PRIORITY: i32 = 500;
/// Pin priority of an installed version no archive offers any more.
pub const STATUS_PRIORITY: i32 = 100;

/// Source of pin priorities, candidate versions and relation importance.
pub trait Policy {
    /// Pin priority of a version. Zero or less means it must not be installed.
    fn priority(&self, cache: &Cache, ver: VersionId) -> i32;

    /// The version that would be installed for a package, if any.
    fn candidate(&self, cache: &Cache, pkg: PackageId) -> Option<VersionId>;

    /// Whether a relation should be followed when installing.
    fn is_important_dep(&self, cache: &Cache, dep: DependencyId) -> bool;
}

/// Policy with fixed pins.
///
/// Archive versions get [`DEFAULT_PRIORITY`], installed-only versions
/// [`STATUS_PRIORITY`], and explicit pins override both.
#[derive(Debug, Clone)]
pub struct StaticPolicy {
    /// Install Recommends
    pub install_recommends: bool,
    /// Install Suggests
    pub install_suggests: bool,
    /// Pins keyed by (package name, version)
    pub pins: HashMap<(String, String), i32>,
}

impl Default for StaticPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticPolicy {
    /// Create a new policy with default settings
    pub fn new() -> Self {
        Self {
            install_recommends: true,
            install_suggests: false,
            pins: HashMap::new(),
        }
    }

    pub fn install_recommends(mut self, install: bool) -> Self {
        self.install_recommends = install;
        self
    }

    pub fn install_suggests(mut self, install: bool) -> Self {
        self.install_suggests = install;
        self
    }

    /// Pin one version of a package.
    pub fn with_pin(mut self, package: &str, version: &str, priority: i32) -> Self {
        self.pins
            .insert((package.to_string(), version.to_string()), priority);
        self
    }
}

impl Policy for StaticPolicy {
    fn priority(&self, cache: &Cache, ver: VersionId) -> i32 {
        let version = cache.version(ver);
        let package = cache.package(version.package);
        if let Some(&pin) = self
            .pins
            .get(&(package.name.clone(), version.version.clone()))
        {
            return pin;
        }
        if version.downloadable {
            DEFAULT_PRIORITY
        } else if package.current_version == Some(ver) {
            STATUS_PRIORITY
        } else {
            0
        }
    }

    /// Highest priority wins, then highest version. A version lower than the
    /// installed one is only chosen when pinned to 1000 or more.
    fn candidate(&self, cache: &Cache, pkg: PackageId) -> Option<VersionId> {
        let package = cache.package(pkg);
        let mut best: Option<(VersionId, i32)> = None;

        for &ver in &package.versions {
            let priority = self.priority(cache, ver);
            if priority <= 0 {
                continue;
            }
            best = match best {
                // versions are sorted highest first, so ties keep the earlier one
                Some((_, best_priority)) if best_priority >= priority => best,
                _ => Some((ver, priority)),
            };
        }

        if let (Some((ver, priority)), Some(current)) = (best, package.current_version) {
            let is_downgrade = compare_versions(
                &cache.version(ver).version,
                &cache.version(current).version,
            )
            .is_lt();
            if is_downgrade && priority < 1000 && self.priority(cache, current) > 0 {
                return Some(current);
            }
        }

        best.map(|(ver, _)| ver)
    }

    fn is_important_dep(&self, cache: &Cache, dep: DependencyId) -> bool {
        let dep_type = cache.dep_data(dep).dep_type;
        dep_type.is_critical()
            || (dep_type == DepType::Recommends && self.install_recommends)
            || (dep_type == DepType::Suggests && self.install_suggests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheBuilder, VersionSpec};

    fn cache() -> Cache {
        let mut builder = CacheBuilder::new("amd64");
        builder.add(VersionSpec::new("a", "1").installed()).unwrap();
        builder.add(VersionSpec::new("a", "2")).unwrap();
        builder.add(VersionSpec::new("a", "3")).unwrap();
        builder
            .add(VersionSpec::new("b", "1").depends("a").recommends("c").suggests("d"))
            .unwrap();
        builder.add(VersionSpec::new("c", "1")).unwrap();
        builder.add(VersionSpec::new("c", "2").installed()).unwrap();
        builder.add(VersionSpec::new("old", "1").installed().local_only()).unwrap();
        builder.build()
    }

    fn version(cache: &Cache, name: &str, version: &str) -> VersionId {
        let pkg = cache.find_package(name).unwrap();
        cache.find_version(pkg, version).unwrap()
    }

    #[test]
    fn test_candidate_prefers_highest_version() {
        let cache = cache();
        let policy = StaticPolicy::new();
        let a = cache.find_package("a").unwrap();
        assert_eq!(policy.candidate(&cache, a), Some(version(&cache, "a", "3")));
    }

    #[test]
    fn test_candidate_follows_pins() {
        let cache = cache();
        let policy = StaticPolicy::new().with_pin("a", "2", 990);
        let a = cache.find_package("a").unwrap();
        assert_eq!(policy.candidate(&cache, a), Some(version(&cache, "a", "2")));
    }

    #[test]
    fn test_candidate_no_downgrade_without_force() {
        let cache = cache();
        let a = cache.find_package("a").unwrap();

        let policy = StaticPolicy::new()
            .with_pin("a", "2", -1)
            .with_pin("a", "3", -1)
            .with_pin("a", "1", 50);
        assert_eq!(policy.candidate(&cache, a), Some(version(&cache, "a", "1")));

        let c = cache.find_package("c").unwrap();
        let policy = StaticPolicy::new().with_pin("c", "1", 600);
        assert_eq!(policy.candidate(&cache, c), Some(version(&cache, "c", "2")));

        let policy = StaticPolicy::new().with_pin("c", "1", 1001);
        assert_eq!(policy.candidate(&cache, c), Some(version(&cache, "c", "1")));
    }

    #[test]
    fn test_status_only_priority() {
        let cache = cache();
        let policy = StaticPolicy::new();
        let old = version(&cache, "old", "1");
        assert_eq!(policy.priority(&cache, old), STATUS_PRIORITY);
        assert_eq!(policy.priority(&cache, version(&cache, "a", "2")), DEFAULT_PRIORITY);
    }

    #[test]
    fn test_important_dependencies() {
        let cache = cache();
        let b = version(&cache, "b", "1");
        let deps: Vec<DependencyId> = cache.version(b).depends.clone();

        let policy = StaticPolicy::new();
        let important: Vec<bool> = deps.iter().map(|&d| policy.is_important_dep(&cache, d)).collect();
        // Depends, Suggests, Recommends in storage order
        assert_eq!(important, vec![true, false, true]);

        let policy = StaticPolicy::new().install_recommends(false).install_suggests(true);
        let important: Vec<bool> = deps.iter().map(|&d| policy.is_important_dep(&cache, d)).collect();
        assert_eq!(important, vec![true, true, false]);
    }
}

//! The package universe: packages, versions, relations and provides.
//!
//! Everything is stored in flat arrays indexed by dense ids so that solver
//! state can live in parallel arrays of the same shape.

mod builder;
mod package;

use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

use indexmap::IndexMap;

pub use builder::{CacheBuilder, VersionSpec};
pub use package::{
    DepType, Dependency, DependencyData, Group, MultiArch, Package, Priority, Provide,
    SelectedState, Version,
};

/// Dense index into one of the cache arrays.
pub trait EntityId: Copy {
    fn index(self) -> usize;
    fn from_index(index: usize) -> Self;
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl EntityId for $name {
            #[inline]
            fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            fn from_index(index: usize) -> Self {
                $name(index as u32)
            }
        }
    };
}

entity_id!(PackageId);
entity_id!(VersionId);
entity_id!(DependencyId);
entity_id!(
    /// Shared relation record, see [`DependencyData`].
    DependencyDataId
);
entity_id!(ProvideId);
entity_id!(GroupId);

/// A dense side table keyed by an entity id.
#[derive(Debug, Clone)]
pub struct IdMap<K, V> {
    values: Vec<V>,
    _key: PhantomData<K>,
}

impl<K: EntityId, V> IdMap<K, V> {
    pub fn from_fn(len: usize, f: impl FnMut(usize) -> V) -> Self {
        Self {
            values: (0..len).map(f).collect(),
            _key: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| (K::from_index(i), v))
    }
}

impl<K: EntityId, V: Clone> IdMap<K, V> {
    pub fn new(len: usize, value: V) -> Self {
        Self {
            values: vec![value; len],
            _key: PhantomData,
        }
    }
}

impl<K: EntityId, V> Index<K> for IdMap<K, V> {
    type Output = V;

    fn index(&self, key: K) -> &V {
        &self.values[key.index()]
    }
}

impl<K: EntityId, V> IndexMut<K> for IdMap<K, V> {
    fn index_mut(&mut self, key: K) -> &mut V {
        &mut self.values[key.index()]
    }
}

/// Read-only package graph.
#[derive(Debug, Clone)]
pub struct Cache {
    native_arch: String,
    architectures: Vec<String>,
    packages: Vec<Package>,
    versions: Vec<Version>,
    dependencies: Vec<Dependency>,
    dependency_data: Vec<DependencyData>,
    provides: Vec<Provide>,
    groups: Vec<Group>,
    by_name: IndexMap<(String, String), PackageId>,
    groups_by_name: IndexMap<String, GroupId>,
    sources: IndexMap<String, Vec<VersionId>>,
}

impl Cache {
    pub fn native_arch(&self) -> &str {
        &self.native_arch
    }

    /// Configured architectures, native first.
    pub fn architectures(&self) -> &[String] {
        &self.architectures
    }

    pub fn package(&self, id: PackageId) -> &Package {
        &self.packages[id.index()]
    }

    pub fn version(&self, id: VersionId) -> &Version {
        &self.versions[id.index()]
    }

    pub fn dependency(&self, id: DependencyId) -> &Dependency {
        &self.dependencies[id.index()]
    }

    /// The relation record of a dependency.
    pub fn dep_data(&self, id: DependencyId) -> &DependencyData {
        &self.dependency_data[self.dependency(id).data.index()]
    }

    pub fn provide(&self, id: ProvideId) -> &Provide {
        &self.provides[id.index()]
    }

    pub fn group(&self, id: GroupId) -> &Group {
        &self.groups[id.index()]
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.iter()
    }

    pub fn package_ids(&self) -> impl Iterator<Item = PackageId> {
        (0..self.packages.len()).map(PackageId::from_index)
    }

    /// Look a package up by `name` or `name:arch`.
    pub fn find_package(&self, spec: &str) -> Option<PackageId> {
        let (name, arch) = match spec.split_once(':') {
            Some((name, arch)) if arch != "any" => (name, arch),
            Some((name, _)) => (name, self.native_arch.as_str()),
            None => (spec, self.native_arch.as_str()),
        };
        self.by_name
            .get(&(name.to_string(), arch.to_string()))
            .copied()
    }

    pub fn find_version(&self, pkg: PackageId, version: &str) -> Option<VersionId> {
        self.package(pkg)
            .versions
            .iter()
            .copied()
            .find(|&v| self.version(v).version == version)
    }

    pub fn find_group(&self, name: &str) -> Option<GroupId> {
        self.groups_by_name.get(name).copied()
    }

    pub fn group_packages(&self, group: GroupId) -> &[PackageId] {
        &self.group(group).packages
    }

    /// Every version built from the source package `name`.
    pub fn versions_in_source(&self, name: &str) -> &[VersionId] {
        self.sources.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `name:arch`, or just `name` for native and `all` packages when `pretty`.
    pub fn full_name(&self, pkg: PackageId, pretty: bool) -> String {
        let package = self.package(pkg);
        if pretty && (package.arch == "all" || package.arch == self.native_arch) {
            package.name.clone()
        } else {
            format!("{}:{}", package.name, package.arch)
        }
    }

    /// Split the relations of a version into OR-groups.
    pub fn or_groups(&self, ver: VersionId) -> Vec<&[DependencyId]> {
        let depends = &self.version(ver).depends;
        let mut groups = Vec::new();
        let mut start = 0;
        for (i, &dep) in depends.iter().enumerate() {
            if !self.dep_data(dep).or_next {
                groups.push(&depends[start..=i]);
                start = i + 1;
            }
        }
        if start < depends.len() {
            groups.push(&depends[start..]);
        }
        groups
    }

    /// The OR-group starting at `dep`.
    pub fn or_group_at(&self, dep: DependencyId) -> &[DependencyId] {
        let depends = &self.version(self.dependency(dep).parent).depends;
        let start = depends.iter().position(|&d| d == dep).unwrap_or(depends.len());
        let end = depends[start..]
            .iter()
            .position(|&d| !self.dep_data(d).or_next)
            .map_or(depends.len(), |i| start + i + 1);
        &depends[start..end]
    }

    /// Whether two OR-groups consist of the same relation records.
    pub fn same_or_group(&self, a: &[DependencyId], b: &[DependencyId]) -> bool {
        a.len() == b.len()
            && a.iter()
                .zip(b)
                .all(|(&x, &y)| self.dependency(x).data == self.dependency(y).data)
    }

    pub fn is_satisfied_by_version(&self, dep: DependencyId, ver: VersionId) -> bool {
        match &self.dep_data(dep).constraint {
            Some(constraint) => constraint.matches(&self.version(ver).version),
            None => true,
        }
    }

    /// Whether the target package satisfies the relation whichever version
    /// gets picked: the relation is unversioned or every version matches.
    pub fn is_satisfied_by_package(&self, dep: DependencyId) -> bool {
        let data = self.dep_data(dep);
        match &data.constraint {
            None => true,
            Some(_) => {
                let versions = &self.package(data.target).versions;
                !versions.is_empty()
                    && versions
                        .iter()
                        .all(|&v| self.is_satisfied_by_version(dep, v))
            }
        }
    }

    pub fn is_satisfied_by_provide(&self, dep: DependencyId, prv: ProvideId) -> bool {
        match &self.dep_data(dep).constraint {
            Some(constraint) => self
                .provide(prv)
                .provided_version
                .as_deref()
                .is_some_and(|v| constraint.matches(v)),
            None => true,
        }
    }

    /// All versions that can satisfy (or, for negative relations, violate) the
    /// relation: matching versions of the target first, then matching providers.
    /// Negative relations never target the package declaring them.
    pub fn all_targets(&self, dep: DependencyId) -> Vec<VersionId> {
        let data = self.dep_data(dep);
        let parent_pkg = self.version(self.dependency(dep).parent).package;
        let mut targets = Vec::new();

        for &ver in &self.package(data.target).versions {
            if data.dep_type.is_negative() && self.version(ver).package == parent_pkg {
                continue;
            }
            if self.is_satisfied_by_version(dep, ver) {
                targets.push(ver);
            }
        }

        for &prv in &self.package(data.target).provided_by {
            let provider = self.provide(prv).version;
            if data.dep_type.is_negative() && self.version(provider).package == parent_pkg {
                continue;
            }
            if self.is_satisfied_by_provide(dep, prv) && !targets.contains(&provider) {
                targets.push(provider);
            }
        }

        targets
    }

    /// `Target (op version)` rendering of a single relation.
    pub fn relation_string(&self, dep: DependencyId) -> String {
        let data = self.dep_data(dep);
        let mut out = self.full_name(data.target, true);
        if let Some(constraint) = &data.constraint {
            out.push_str(&format!(" ({})", constraint));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> Cache {
        let mut builder = CacheBuilder::new("amd64");
        builder
            .add(VersionSpec::new("a", "1").depends("b (>= 2) | c, d").conflicts("x"))
            .unwrap();
        builder.add(VersionSpec::new("a", "2").depends("b (>= 2) | c")).unwrap();
        builder.add(VersionSpec::new("b", "1")).unwrap();
        builder.add(VersionSpec::new("b", "2")).unwrap();
        builder.add(VersionSpec::new("b", "3")).unwrap();
        builder.add(VersionSpec::new("c", "1").provides("x")).unwrap();
        builder.add(VersionSpec::new("d", "1").provides("mail (= 2)")).unwrap();
        builder.build()
    }

    #[test]
    fn test_versions_sorted_highest_first() {
        let cache = cache();
        let b = cache.find_package("b").unwrap();
        let versions: Vec<&str> = cache
            .package(b)
            .versions
            .iter()
            .map(|&v| cache.version(v).version.as_str())
            .collect();
        assert_eq!(versions, vec!["3", "2", "1"]);
    }

    #[test]
    fn test_or_groups_and_identity() {
        let cache = cache();
        let a = cache.find_package("a").unwrap();
        let a1 = cache.find_version(a, "1").unwrap();
        let a2 = cache.find_version(a, "2").unwrap();

        let groups1 = cache.or_groups(a1);
        let groups2 = cache.or_groups(a2);
        assert_eq!(groups1.len(), 3);
        assert_eq!(groups1[0].len(), 2);
        assert_eq!(groups2.len(), 1);
        assert!(cache.same_or_group(groups1[0], groups2[0]));
        assert!(!cache.same_or_group(groups1[1], groups2[0]));
        assert_eq!(cache.or_group_at(groups1[0][0]), groups1[0]);
        assert_eq!(cache.or_group_at(groups1[0][1]), &groups1[0][1..]);
    }

    #[test]
    fn test_all_targets_filters_versions() {
        let cache = cache();
        let a = cache.find_package("a").unwrap();
        let a1 = cache.find_version(a, "1").unwrap();
        let dep = cache.or_groups(a1)[0][0];
        let targets: Vec<&str> = cache
            .all_targets(dep)
            .iter()
            .map(|&v| cache.version(v).version.as_str())
            .collect();
        assert_eq!(targets, vec!["3", "2"]);
        assert!(!cache.is_satisfied_by_package(dep));
    }

    #[test]
    fn test_all_targets_includes_providers() {
        let cache = cache();
        let a = cache.find_package("a").unwrap();
        let a1 = cache.find_version(a, "1").unwrap();
        let conflict = cache.or_groups(a1)[2][0];
        assert_eq!(cache.dep_data(conflict).dep_type, DepType::Conflicts);
        let c = cache.find_package("c").unwrap();
        assert_eq!(cache.all_targets(conflict), cache.package(c).versions);
    }

    #[test]
    fn test_full_name() {
        let cache = cache();
        let a = cache.find_package("a:amd64").unwrap();
        assert_eq!(cache.full_name(a, true), "a");
        assert_eq!(cache.full_name(a, false), "a:amd64");
    }
}

//! Assembling a [`Cache`] from control-file style records

use std::collections::HashMap;

use apt_version::{compare_versions, parse_relations, Relation, Version as DebVersion};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::package::{
    DepType, Dependency, DependencyData, Group, MultiArch, Package, Priority, Provide,
    SelectedState, Version,
};
use super::{Cache, DependencyDataId, DependencyId, EntityId, GroupId, PackageId, ProvideId, VersionId};
use crate::error::{Result, SolverError};

/// One version of a package, the way it appears in a `Packages` or `status` file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct VersionSpec {
    pub package: String,
    pub version: String,
    /// Defaults to the native architecture.
    pub architecture: Option<String>,
    pub multi_arch: MultiArch,
    pub priority: Priority,
    pub section: Option<String>,
    /// Defaults to the package name.
    pub source: Option<String>,
    /// Defaults to the version.
    pub source_version: Option<String>,
    pub essential: bool,
    pub important: bool,
    /// This version is the one currently installed.
    pub installed: bool,
    /// The installed package was pulled in automatically.
    pub auto: bool,
    /// dpkg selection is `hold`.
    pub hold: bool,
    /// Only available from the status file when false.
    #[serde(default = "default_true")]
    pub downloadable: bool,
    pub depends: Option<String>,
    pub pre_depends: Option<String>,
    pub recommends: Option<String>,
    pub suggests: Option<String>,
    pub conflicts: Option<String>,
    pub breaks: Option<String>,
    pub replaces: Option<String>,
    pub obsoletes: Option<String>,
    pub enhances: Option<String>,
    pub provides: Option<String>,
}

fn default_true() -> bool {
    true
}

impl VersionSpec {
    pub fn new(package: &str, version: &str) -> Self {
        Self {
            package: package.to_string(),
            version: version.to_string(),
            downloadable: true,
            ..Default::default()
        }
    }

    pub fn arch(mut self, arch: &str) -> Self {
        self.architecture = Some(arch.to_string());
        self
    }

    pub fn multi_arch(mut self, multi_arch: MultiArch) -> Self {
        self.multi_arch = multi_arch;
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn section(mut self, section: &str) -> Self {
        self.section = Some(section.to_string());
        self
    }

    pub fn source(mut self, source: &str, version: &str) -> Self {
        self.source = Some(source.to_string());
        self.source_version = Some(version.to_string());
        self
    }

    pub fn essential(mut self) -> Self {
        self.essential = true;
        self
    }

    pub fn important(mut self) -> Self {
        self.important = true;
        self
    }

    pub fn installed(mut self) -> Self {
        self.installed = true;
        self
    }

    pub fn auto(mut self) -> Self {
        self.auto = true;
        self
    }

    pub fn hold(mut self) -> Self {
        self.hold = true;
        self
    }

    /// Mark the version as not available from any archive.
    pub fn local_only(mut self) -> Self {
        self.downloadable = false;
        self
    }

    pub fn depends(mut self, field: &str) -> Self {
        self.depends = Some(field.to_string());
        self
    }

    pub fn pre_depends(mut self, field: &str) -> Self {
        self.pre_depends = Some(field.to_string());
        self
    }

    pub fn recommends(mut self, field: &str) -> Self {
        self.recommends = Some(field.to_string());
        self
    }

    pub fn suggests(mut self, field: &str) -> Self {
        self.suggests = Some(field.to_string());
        self
    }

    pub fn conflicts(mut self, field: &str) -> Self {
        self.conflicts = Some(field.to_string());
        self
    }

    pub fn breaks(mut self, field: &str) -> Self {
        self.breaks = Some(field.to_string());
        self
    }

    pub fn replaces(mut self, field: &str) -> Self {
        self.replaces = Some(field.to_string());
        self
    }

    pub fn obsoletes(mut self, field: &str) -> Self {
        self.obsoletes = Some(field.to_string());
        self
    }

    pub fn enhances(mut self, field: &str) -> Self {
        self.enhances = Some(field.to_string());
        self
    }

    pub fn provides(mut self, field: &str) -> Self {
        self.provides = Some(field.to_string());
        self
    }

    /// Relation fields in the order they are stored on the version.
    fn relation_fields(&self) -> [(DepType, Option<&str>); 9] {
        [
            (DepType::PreDepends, self.pre_depends.as_deref()),
            (DepType::Depends, self.depends.as_deref()),
            (DepType::Conflicts, self.conflicts.as_deref()),
            (DepType::Breaks, self.breaks.as_deref()),
            (DepType::Suggests, self.suggests.as_deref()),
            (DepType::Recommends, self.recommends.as_deref()),
            (DepType::Enhances, self.enhances.as_deref()),
            (DepType::Replaces, self.replaces.as_deref()),
            (DepType::Obsoletes, self.obsoletes.as_deref()),
        ]
    }
}

/// A validated record waiting for [`CacheBuilder::build`].
#[derive(Debug)]
struct PendingVersion {
    spec: VersionSpec,
    relations: Vec<(DepType, Vec<Vec<Relation>>)>,
    provides: Vec<Relation>,
}

/// Collects versions and resolves names into a [`Cache`].
#[derive(Debug)]
pub struct CacheBuilder {
    native_arch: String,
    architectures: Vec<String>,
    pending: Vec<PendingVersion>,
}

impl CacheBuilder {
    pub fn new(native_arch: &str) -> Self {
        Self {
            native_arch: native_arch.to_string(),
            architectures: vec![native_arch.to_string()],
            pending: Vec::new(),
        }
    }

    /// Enable a foreign architecture; order matters for provider selection.
    pub fn foreign_arch(&mut self, arch: &str) -> &mut Self {
        if !self.architectures.iter().any(|a| a == arch) {
            self.architectures.push(arch.to_string());
        }
        self
    }

    /// Validate and queue a version.
    pub fn add(&mut self, spec: VersionSpec) -> Result<&mut Self> {
        if spec.package.is_empty() {
            return Err(SolverError::Config("package record without a name".to_string()));
        }
        DebVersion::parse(&spec.version).map_err(|source| SolverError::Version {
            package: spec.package.clone(),
            source,
        })?;

        let relation_error = |source: apt_version::RelationError| SolverError::Relation {
            package: spec.package.clone(),
            source,
        };

        let mut relations = Vec::new();
        for (dep_type, field) in spec.relation_fields() {
            if let Some(field) = field {
                relations.push((dep_type, parse_relations(field).map_err(relation_error)?));
            }
        }

        let mut provides = Vec::new();
        if let Some(field) = spec.provides.as_deref() {
            for group in parse_relations(field).map_err(relation_error)? {
                // Provides cannot carry alternatives
                if group.len() != 1 {
                    return Err(SolverError::Config(format!(
                        "{} provides an alternative: {}",
                        spec.package, field
                    )));
                }
                provides.extend(group);
            }
        }

        self.pending.push(PendingVersion {
            spec,
            relations,
            provides,
        });
        Ok(self)
    }

    pub fn build(self) -> Cache {
        let mut state = BuildState {
            native_arch: self.native_arch.clone(),
            packages: Vec::new(),
            groups: Vec::new(),
            by_name: IndexMap::new(),
            groups_by_name: IndexMap::new(),
        };

        let mut versions: Vec<Version> = Vec::new();
        let mut dependencies: Vec<Dependency> = Vec::new();
        let mut dependency_data: Vec<DependencyData> = Vec::new();
        let mut data_index: HashMap<DependencyData, DependencyDataId> = HashMap::new();
        let mut provides: Vec<Provide> = Vec::new();
        let mut sources: IndexMap<String, Vec<VersionId>> = IndexMap::new();

        // Real packages first so their ids follow input order
        for pending in &self.pending {
            state.intern(&pending.spec.package, &package_arch(&pending.spec, &self.native_arch));
        }

        for pending in self.pending {
            let spec = pending.spec;
            let arch = package_arch(&spec, &self.native_arch);
            let pkg = state.intern(&spec.package, &arch);
            let ver = VersionId::from_index(versions.len());

            let mut depends = Vec::new();
            for (dep_type, groups) in &pending.relations {
                for group in groups {
                    for (i, relation) in group.iter().enumerate() {
                        let target_arch = relation_arch(relation, &arch, &self.native_arch);
                        let target = state.intern(&relation.name, &target_arch);
                        let data = DependencyData {
                            dep_type: *dep_type,
                            target,
                            constraint: relation.constraint.clone(),
                            or_next: i + 1 < group.len(),
                        };
                        let data = *data_index.entry(data.clone()).or_insert_with(|| {
                            dependency_data.push(data);
                            DependencyDataId::from_index(dependency_data.len() - 1)
                        });
                        let id = DependencyId::from_index(dependencies.len());
                        dependencies.push(Dependency {
                            id,
                            parent: ver,
                            data,
                        });
                        depends.push(id);
                    }
                }
            }

            let mut provided = Vec::new();
            for relation in &pending.provides {
                let target_arch = relation_arch(relation, &arch, &self.native_arch);
                let target = state.intern(&relation.name, &target_arch);
                let id = ProvideId::from_index(provides.len());
                provides.push(Provide {
                    id,
                    version: ver,
                    target,
                    provided_version: relation.constraint.as_ref().map(|c| c.version().to_string()),
                });
                state.packages[target.index()].provided_by.push(id);
                provided.push(id);
            }

            let source_package = spec.source.clone().unwrap_or_else(|| spec.package.clone());
            sources.entry(source_package.clone()).or_default().push(ver);

            let package = &mut state.packages[pkg.index()];
            package.versions.push(ver);
            package.essential |= spec.essential;
            package.important |= spec.important;
            if spec.installed {
                package.current_version = Some(ver);
                package.auto_installed = spec.auto;
                package.selected_state = SelectedState::Install;
            }
            if spec.hold {
                package.selected_state = SelectedState::Hold;
            }

            versions.push(Version {
                id: ver,
                package: pkg,
                version: spec.version.clone(),
                arch: spec.architecture.clone().unwrap_or_else(|| self.native_arch.clone()),
                multi_arch: spec.multi_arch,
                priority: spec.priority,
                section: spec.section.clone(),
                source_package,
                source_version: spec.source_version.clone().unwrap_or_else(|| spec.version.clone()),
                downloadable: spec.downloadable,
                depends,
                provides: provided,
            });
        }

        for package in &mut state.packages {
            package
                .versions
                .sort_by(|&a, &b| compare_versions(&versions[b.index()].version, &versions[a.index()].version));
        }

        log::debug!(
            "Built package cache: {} packages, {} versions, {} relations",
            state.packages.len(),
            versions.len(),
            dependencies.len()
        );

        Cache {
            native_arch: self.native_arch,
            architectures: self.architectures,
            packages: state.packages,
            versions,
            dependencies,
            dependency_data,
            provides,
            groups: state.groups,
            by_name: state.by_name,
            groups_by_name: state.groups_by_name,
            sources,
        }
    }
}

struct BuildState {
    native_arch: String,
    packages: Vec<Package>,
    groups: Vec<Group>,
    by_name: IndexMap<(String, String), PackageId>,
    groups_by_name: IndexMap<String, GroupId>,
}

impl BuildState {
    /// Find or create the package `name:arch`, creating virtual packages on demand.
    fn intern(&mut self, name: &str, arch: &str) -> PackageId {
        let key = (name.to_string(), arch.to_string());
        if let Some(&id) = self.by_name.get(&key) {
            return id;
        }

        let group = match self.groups_by_name.get(name) {
            Some(&group) => group,
            None => {
                let group = GroupId::from_index(self.groups.len());
                self.groups.push(Group {
                    id: group,
                    name: name.to_string(),
                    packages: Vec::new(),
                });
                self.groups_by_name.insert(name.to_string(), group);
                group
            }
        };

        let id = PackageId::from_index(self.packages.len());
        self.packages.push(Package {
            id,
            name: name.to_string(),
            arch: if arch == "all" { self.native_arch.clone() } else { arch.to_string() },
            group,
            essential: false,
            important: false,
            selected_state: SelectedState::Unknown,
            current_version: None,
            auto_installed: false,
            versions: Vec::new(),
            provided_by: Vec::new(),
        });
        self.groups[group.index()].packages.push(id);
        self.by_name.insert(key, id);
        id
    }
}

/// `Architecture: all` packages live in the native architecture.
fn package_arch(spec: &VersionSpec, native: &str) -> String {
    match spec.architecture.as_deref() {
        None | Some("all") => native.to_string(),
        Some(arch) => arch.to_string(),
    }
}

/// Unqualified relations resolve in the architecture of the declaring package.
fn relation_arch(relation: &Relation, parent_arch: &str, native: &str) -> String {
    match relation.arch.as_deref() {
        None => parent_arch.to_string(),
        Some("any") | Some("native") => native.to_string(),
        Some(arch) => arch.to_string(),
    }
}

//! Records stored in the package graph

use apt_version::Constraint;
use serde::{Deserialize, Serialize};

use super::{DependencyDataId, DependencyId, GroupId, PackageId, ProvideId, VersionId};

/// Relation kinds of a binary package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepType {
    Depends,
    PreDepends,
    Suggests,
    Recommends,
    Conflicts,
    Replaces,
    Obsoletes,
    Breaks,
    Enhances,
}

impl DepType {
    /// Relations that must hold for the system to be consistent.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            DepType::Depends
                | DepType::PreDepends
                | DepType::Conflicts
                | DepType::Breaks
                | DepType::Obsoletes
        )
    }

    /// Relations that forbid their targets.
    pub fn is_negative(&self) -> bool {
        matches!(self, DepType::Conflicts | DepType::Breaks | DepType::Obsoletes)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DepType::Depends => "Depends",
            DepType::PreDepends => "PreDepends",
            DepType::Suggests => "Suggests",
            DepType::Recommends => "Recommends",
            DepType::Conflicts => "Conflicts",
            DepType::Replaces => "Replaces",
            DepType::Obsoletes => "Obsoletes",
            DepType::Breaks => "Breaks",
            DepType::Enhances => "Enhances",
        }
    }
}

impl std::fmt::Display for DepType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Multi-Arch field of a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiArch {
    #[default]
    No,
    Same,
    Foreign,
    Allowed,
    /// Architecture `all` packages, which are implicitly foreign.
    All,
}

/// Priority field of a version; lower values are more important.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Required = 1,
    Important = 2,
    Standard = 3,
    #[default]
    Optional = 4,
    Extra = 5,
}

/// dpkg selection state of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectedState {
    #[default]
    Unknown,
    Install,
    Hold,
    DeInstall,
    Purge,
}

#[derive(Debug, Clone)]
pub struct Package {
    pub id: PackageId,
    pub name: String,
    pub arch: String,
    pub group: GroupId,
    pub essential: bool,
    pub important: bool,
    pub selected_state: SelectedState,
    pub current_version: Option<VersionId>,
    /// Installed as a dependency rather than by explicit request.
    pub auto_installed: bool,
    /// Highest version first.
    pub versions: Vec<VersionId>,
    pub provided_by: Vec<ProvideId>,
}

impl Package {
    pub fn is_installed(&self) -> bool {
        self.current_version.is_some()
    }

    /// A package without versions that only exists as a relation target.
    pub fn is_virtual(&self) -> bool {
        self.versions.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Version {
    pub id: VersionId,
    pub package: PackageId,
    pub version: String,
    pub arch: String,
    pub multi_arch: MultiArch,
    pub priority: Priority,
    pub section: Option<String>,
    pub source_package: String,
    pub source_version: String,
    pub downloadable: bool,
    pub depends: Vec<DependencyId>,
    pub provides: Vec<ProvideId>,
}

impl Version {
    /// Built for `Architecture: all`.
    pub fn is_arch_all(&self) -> bool {
        self.arch == "all" || self.multi_arch == MultiArch::All
    }
}

/// The interned, comparable part of a relation.
///
/// Two relations written identically in different versions share one
/// record, so OR-groups can be compared by identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyData {
    pub dep_type: DepType,
    pub target: PackageId,
    pub constraint: Option<Constraint>,
    /// Another alternative of the same OR-group follows.
    pub or_next: bool,
}

#[derive(Debug, Clone)]
pub struct Dependency {
    pub id: DependencyId,
    /// The version declaring the relation.
    pub parent: VersionId,
    pub data: DependencyDataId,
}

#[derive(Debug, Clone)]
pub struct Provide {
    pub id: ProvideId,
    /// The providing version.
    pub version: VersionId,
    /// The provided (usually virtual) package.
    pub target: PackageId,
    pub provided_version: Option<String>,
}

/// All architectures of one package name.
#[derive(Debug, Clone)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub packages: Vec<PackageId>,
}

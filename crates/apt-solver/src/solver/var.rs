use std::ops::Not;

use crate::cache::{Cache, PackageId, VersionId};

/// Tri-state truth value of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LiftedBool {
    /// No choice has been made yet
    #[default]
    Undefined,
    True,
    False,
}

impl Not for LiftedBool {
    type Output = LiftedBool;

    fn not(self) -> LiftedBool {
        match self {
            LiftedBool::Undefined => LiftedBool::Undefined,
            LiftedBool::True => LiftedBool::False,
            LiftedBool::False => LiftedBool::True,
        }
    }
}

impl From<bool> for LiftedBool {
    fn from(value: bool) -> Self {
        if value {
            LiftedBool::True
        } else {
            LiftedBool::False
        }
    }
}

/// A decision variable: install a package, or select one exact version.
///
/// `Root` stands for "no reason": user requests and facts hang off it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Var {
    #[default]
    Root,
    Package(PackageId),
    Version(VersionId),
}

impl Var {
    pub fn is_root(self) -> bool {
        self == Var::Root
    }

    pub fn package(self) -> Option<PackageId> {
        match self {
            Var::Package(pkg) => Some(pkg),
            _ => None,
        }
    }

    pub fn version(self) -> Option<VersionId> {
        match self {
            Var::Version(ver) => Some(ver),
            _ => None,
        }
    }

    /// The package itself, or the package a version belongs to.
    pub fn cast_package(self, cache: &Cache) -> Option<PackageId> {
        match self {
            Var::Root => None,
            Var::Package(pkg) => Some(pkg),
            Var::Version(ver) => Some(cache.version(ver).package),
        }
    }

    /// `name:arch`, `name:arch=version` or `(root)`.
    pub fn to_string(self, cache: &Cache) -> String {
        match self {
            Var::Root => "(root)".to_string(),
            Var::Package(pkg) => cache.full_name(pkg, false),
            Var::Version(ver) => {
                let version = cache.version(ver);
                format!("{}={}", cache.full_name(version.package, false), version.version)
            }
        }
    }
}

impl From<PackageId> for Var {
    fn from(pkg: PackageId) -> Self {
        Var::Package(pkg)
    }
}

impl From<VersionId> for Var {
    fn from(ver: VersionId) -> Self {
        Var::Version(ver)
    }
}

/// A variable with a required polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lit {
    var: Var,
    negative: bool,
}

impl Lit {
    pub fn var(self) -> Var {
        self.var
    }

    /// Whether the variable must be false.
    pub fn is_negative(self) -> bool {
        self.negative
    }
}

impl From<Var> for Lit {
    fn from(var: Var) -> Self {
        Lit { var, negative: false }
    }
}

impl Not for Lit {
    type Output = Lit;

    fn not(self) -> Lit {
        Lit {
            var: self.var,
            negative: !self.negative,
        }
    }
}

impl Not for Var {
    type Output = Lit;

    fn not(self) -> Lit {
        !Lit::from(self)
    }
}

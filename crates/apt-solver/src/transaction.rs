use std::cmp::Ordering;
use std::fmt;

use apt_version::compare_versions;

use crate::cache::{Cache, PackageId, VersionId};
use crate::depcache::DepCache;

/// The changes a solved ledger applies to the installed system.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    /// Operations to perform
    pub operations: Vec<Operation>,
}

/// A single operation in a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Install a package that is not installed yet
    Install { package: PackageId, version: VersionId, auto: bool },
    /// Replace the installed version with a newer one
    Upgrade { package: PackageId, from: VersionId, to: VersionId },
    /// Replace the installed version with an older one
    Downgrade { package: PackageId, from: VersionId, to: VersionId },
    /// Remove an installed package
    Remove { package: PackageId, version: VersionId, purge: bool },
}

impl Operation {
    pub fn package(&self) -> PackageId {
        match self {
            Operation::Install { package, .. }
            | Operation::Upgrade { package, .. }
            | Operation::Downgrade { package, .. }
            | Operation::Remove { package, .. } => *package,
        }
    }

    /// Render against the cache the ids belong to.
    pub fn display<'a>(&'a self, cache: &'a Cache) -> OperationDisplay<'a> {
        OperationDisplay { op: self, cache }
    }
}

pub struct OperationDisplay<'a> {
    op: &'a Operation,
    cache: &'a Cache,
}

impl fmt::Display for OperationDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = self.cache;
        let name = cache.full_name(self.op.package(), true);
        let ver = |v: &VersionId| cache.version(*v).version.as_str();
        match self.op {
            Operation::Install { version, auto, .. } => {
                write!(f, "Install {} ({})", name, ver(version))?;
                if *auto {
                    f.write_str(" [auto]")?;
                }
                Ok(())
            }
            Operation::Upgrade { from, to, .. } => {
                write!(f, "Upgrade {} ({} => {})", name, ver(from), ver(to))
            }
            Operation::Downgrade { from, to, .. } => {
                write!(f, "Downgrade {} ({} => {})", name, ver(from), ver(to))
            }
            Operation::Remove { version, purge, .. } => {
                write!(f, "{} {} ({})", if *purge { "Purge" } else { "Remove" }, name, ver(version))
            }
        }
    }
}

impl Transaction {
    /// Create a new empty transaction
    pub fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    /// Compare the installed system with the ledger's resulting state.
    ///
    /// Removals come first, then installs, upgrades and downgrades, each
    /// section ordered by package name.
    pub fn from_dep_cache(depcache: &DepCache<'_>) -> Self {
        let cache = depcache.cache();
        let mut removals = Vec::new();
        let mut changes = Vec::new();

        for package in cache.packages() {
            let current = package.current_version;
            let result = depcache.resulting_version(package.id);
            match (current, result) {
                (Some(from), None) => removals.push(Operation::Remove {
                    package: package.id,
                    version: from,
                    purge: depcache.state(package.id).purge,
                }),
                (None, Some(to)) => changes.push(Operation::Install {
                    package: package.id,
                    version: to,
                    auto: depcache.is_auto(package.id),
                }),
                (Some(from), Some(to)) if from != to => {
                    let order = compare_versions(&cache.version(to).version, &cache.version(from).version);
                    changes.push(if order == Ordering::Less {
                        Operation::Downgrade { package: package.id, from, to }
                    } else {
                        Operation::Upgrade { package: package.id, from, to }
                    });
                }
                _ => {}
            }
        }

        let by_name = |a: &Operation, b: &Operation| {
            cache
                .full_name(a.package(), false)
                .cmp(&cache.full_name(b.package(), false))
        };
        removals.sort_by(by_name);
        changes.sort_by(by_name);

        let mut tx = Self::new();
        tx.operations.extend(removals);
        tx.operations.extend(changes);
        tx
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn installs(&self) -> impl Iterator<Item = &Operation> {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Install { .. }))
    }

    pub fn removals(&self) -> impl Iterator<Item = &Operation> {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Remove { .. }))
    }
}

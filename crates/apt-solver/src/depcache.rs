//! Desired-state ledger: what should happen to each package.

use crate::cache::{Cache, EntityId, IdMap, PackageId, VersionId};
use crate::policy::Policy;

/// Requested action for a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Keep,
    Install,
    Delete,
}

/// Ledger entry of one package.
#[derive(Debug, Clone, Default)]
pub struct StateEntry {
    pub mode: Mode,
    /// Installed automatically, a candidate for autoremoval.
    pub auto: bool,
    /// Requested explicitly, do not override.
    pub protect: bool,
    pub candidate: Option<VersionId>,
    /// Version to end up with in `Install` mode.
    pub install_version: Option<VersionId>,
    pub purge: bool,
    /// The removal was not requested by anyone.
    pub automatic_delete: bool,
    /// Updates of this package are held back by phasing.
    pub phasing: bool,
    pub marked: bool,
    pub garbage: bool,
}

impl StateEntry {
    pub fn keep(&self) -> bool {
        self.mode == Mode::Keep
    }

    pub fn install(&self) -> bool {
        self.mode == Mode::Install
    }

    pub fn delete(&self) -> bool {
        self.mode == Mode::Delete
    }
}

/// Mutable ledger of requested and resulting package states.
pub struct DepCache<'a> {
    cache: &'a Cache,
    states: IdMap<PackageId, StateEntry>,
}

impl<'a> DepCache<'a> {
    /// Start from the installed system: every package kept, candidates from `policy`.
    pub fn new(cache: &'a Cache, policy: &dyn Policy) -> Self {
        let states = IdMap::from_fn(cache.package_count(), |i| {
            let pkg = PackageId::from_index(i);
            let package = cache.package(pkg);
            StateEntry {
                auto: package.auto_installed,
                candidate: policy.candidate(cache, pkg),
                install_version: package.current_version,
                ..Default::default()
            }
        });
        Self { cache, states }
    }

    pub fn cache(&self) -> &'a Cache {
        self.cache
    }

    pub fn state(&self, pkg: PackageId) -> &StateEntry {
        &self.states[pkg]
    }

    pub fn candidate_version(&self, pkg: PackageId) -> Option<VersionId> {
        self.states[pkg].candidate
    }

    pub fn is_auto(&self, pkg: PackageId) -> bool {
        self.states[pkg].auto
    }

    pub fn phasing_applied(&self, pkg: PackageId) -> bool {
        self.states[pkg].phasing
    }

    pub fn set_candidate_version(&mut self, ver: VersionId) {
        let pkg = self.cache.version(ver).package;
        self.states[pkg].candidate = Some(ver);
    }

    /// Install the candidate. Installing the current version is a keep.
    pub fn mark_install(&mut self, pkg: PackageId, from_user: bool) {
        let current = self.cache.package(pkg).current_version;
        let entry = &mut self.states[pkg];
        if entry.candidate.is_some() && entry.candidate == current {
            entry.mode = Mode::Keep;
            entry.install_version = current;
        } else {
            entry.mode = Mode::Install;
            entry.install_version = entry.candidate;
            if current.is_none() {
                entry.auto = !from_user;
            }
        }
        if from_user {
            entry.auto = false;
        }
        entry.purge = false;
        entry.automatic_delete = false;
    }

    pub fn mark_keep(&mut self, pkg: PackageId, from_user: bool) {
        let current = self.cache.package(pkg).current_version;
        let entry = &mut self.states[pkg];
        entry.mode = Mode::Keep;
        entry.install_version = current;
        entry.purge = false;
        entry.automatic_delete = false;
        if from_user && current.is_some() {
            entry.auto = false;
        }
    }

    pub fn mark_delete(&mut self, pkg: PackageId, purge: bool, automatic: bool) {
        let entry = &mut self.states[pkg];
        entry.mode = Mode::Delete;
        entry.install_version = None;
        entry.purge = purge;
        entry.automatic_delete = automatic;
    }

    pub fn mark_auto(&mut self, pkg: PackageId, auto: bool) {
        self.states[pkg].auto = auto;
    }

    pub fn protect(&mut self, pkg: PackageId) {
        self.states[pkg].protect = true;
    }

    pub fn set_phasing(&mut self, pkg: PackageId, phasing: bool) {
        self.states[pkg].phasing = phasing;
    }

    pub fn set_marked(&mut self, pkg: PackageId, marked: bool, garbage: bool) {
        let entry = &mut self.states[pkg];
        entry.marked = marked;
        entry.garbage = garbage;
    }

    /// Version the package ends up with, `None` when not installed.
    pub fn resulting_version(&self, pkg: PackageId) -> Option<VersionId> {
        let entry = &self.states[pkg];
        match entry.mode {
            Mode::Delete => None,
            Mode::Install => entry.install_version,
            Mode::Keep => self.cache.package(pkg).current_version,
        }
    }
}

//! Self-contained solver inputs.
//!
//! A scenario describes a package universe, the installed system, pins and a
//! request in one JSON document:
//!
//! ```json
//! {
//!   "architectures": ["amd64", "i386"],
//!   "packages": [
//!     { "package": "a", "version": "1", "depends": "b (>= 2)" },
//!     { "package": "b", "version": "2" }
//!   ],
//!   "request": { "install": ["a"] }
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cache::{Cache, CacheBuilder, PackageId, VersionSpec};
use crate::config::{RequestFlags, SolverConfig};
use crate::depcache::DepCache;
use crate::error::{Result, SolverError};
use crate::policy::{Policy, StaticPolicy};

/// A package universe together with a request against it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Scenario {
    /// Native architecture first; defaults to amd64 only.
    pub architectures: Vec<String>,
    pub packages: Vec<VersionSpec>,
    pub pins: Vec<Pin>,
    /// Packages whose updates are held back by phasing.
    pub phasing: Vec<String>,
    pub install_recommends: Option<bool>,
    pub install_suggests: Option<bool>,
    pub request: ScenarioRequest,
    pub config: SolverConfig,
}

/// Pin priority for one version of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pin {
    pub package: String,
    pub version: String,
    pub priority: i32,
}

/// What the user asked for.
///
/// Install entries are `name`, `name:arch` or `name=version`. Packages named
/// for install or removal are protected from being changed by the solver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ScenarioRequest {
    pub install: Vec<String>,
    pub remove: Vec<String>,
    pub purge: Vec<String>,
    pub keep: Vec<String>,
    pub protect: Vec<String>,
    #[serde(flatten)]
    pub flags: RequestFlags,
}

impl Scenario {
    /// Load a scenario from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a scenario from a JSON string.
    pub fn parse(content: &str) -> Result<Self> {
        let scenario: Scenario = serde_json::from_str(content)?;
        Ok(scenario)
    }

    /// Build the package graph.
    pub fn cache(&self) -> Result<Cache> {
        let (native, foreign) = match self.architectures.split_first() {
            Some((native, foreign)) => (native.as_str(), foreign),
            None => ("amd64", &[][..]),
        };
        let mut builder = CacheBuilder::new(native);
        for arch in foreign {
            builder.foreign_arch(arch);
        }
        for spec in &self.packages {
            builder.add(spec.clone())?;
        }
        Ok(builder.build())
    }

    pub fn policy(&self) -> StaticPolicy {
        let mut policy = StaticPolicy::new();
        if let Some(install) = self.install_recommends {
            policy = policy.install_recommends(install);
        }
        if let Some(install) = self.install_suggests {
            policy = policy.install_suggests(install);
        }
        self.pins.iter().fold(policy, |policy, pin| {
            policy.with_pin(&pin.package, &pin.version, pin.priority)
        })
    }

    pub fn flags(&self) -> RequestFlags {
        self.request.flags
    }

    /// Record the request in a fresh ledger over `cache`.
    pub fn dep_cache<'a>(&self, cache: &'a Cache, policy: &dyn Policy) -> Result<DepCache<'a>> {
        let mut depcache = DepCache::new(cache, policy);

        for name in &self.phasing {
            let pkg = find_package(cache, name)?;
            depcache.set_phasing(pkg, true);
        }

        for entry in &self.request.install {
            let (name, version) = match entry.split_once('=') {
                Some((name, version)) => (name, Some(version)),
                None => (entry.as_str(), None),
            };
            let pkg = find_package(cache, name)?;
            if let Some(version) = version {
                let ver = cache
                    .find_version(pkg, version)
                    .ok_or_else(|| SolverError::UnknownVersion {
                        name: name.to_string(),
                        version: version.to_string(),
                    })?;
                depcache.set_candidate_version(ver);
            }
            log::debug!("Request install {}", entry);
            depcache.mark_install(pkg, true);
            depcache.protect(pkg);
        }

        for (names, purge) in [(&self.request.remove, false), (&self.request.purge, true)] {
            for name in names {
                let pkg = find_package(cache, name)?;
                log::debug!("Request {} {}", if purge { "purge" } else { "remove" }, name);
                depcache.mark_delete(pkg, purge, false);
                depcache.protect(pkg);
            }
        }

        for name in &self.request.keep {
            let pkg = find_package(cache, name)?;
            depcache.mark_keep(pkg, true);
        }

        for name in &self.request.protect {
            let pkg = find_package(cache, name)?;
            depcache.protect(pkg);
        }

        Ok(depcache)
    }
}

fn find_package(cache: &Cache, name: &str) -> Result<PackageId> {
    cache
        .find_package(name)
        .ok_or_else(|| SolverError::UnknownPackage { name: name.to_string() })
}

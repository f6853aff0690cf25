//! Solver configuration.
//!
//! [`SolverConfig`] is the serializable form; [`SolverOptions`] is what the
//! solver actually reads, resolved once from the config and the request flags.

use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};

/// Solver settings, all optional in serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Solver generation; "3.0" keeps automatically installed packages.
    #[serde(rename = "solver", default = "default_solver")]
    pub solver: String,

    /// Trace verbosity from 0 (quiet) to 4 (every assignment undone).
    #[serde(rename = "debug", default)]
    pub debug: u8,

    /// Wall-clock budget in seconds, checked when backtracking.
    #[serde(rename = "timeout", default = "default_timeout")]
    pub timeout: u64,

    /// Treat the request as an upgrade; defaults to the request's upgrade flag.
    #[serde(rename = "upgrade", skip_serializing_if = "Option::is_none")]
    pub upgrade: Option<bool>,

    /// Allow removals; defaults to the inverse of the request's forbid-remove flag.
    #[serde(rename = "remove", skip_serializing_if = "Option::is_none")]
    pub remove: Option<bool>,

    #[serde(rename = "remove-manual", default = "default_true")]
    pub remove_manual: bool,

    /// Allow new installs; defaults to the inverse of the request's forbid-new-install flag.
    #[serde(rename = "install", skip_serializing_if = "Option::is_none")]
    pub install: Option<bool>,

    #[serde(rename = "strict-pinning", default = "default_true")]
    pub strict_pinning: bool,

    #[serde(rename = "fix-policy-broken", default)]
    pub fix_policy_broken: bool,

    #[serde(rename = "defer-version-selection", default = "default_true")]
    pub defer_version_selection: bool,

    /// Keep installed Recommends satisfied.
    #[serde(rename = "keep-recommends", default = "default_true")]
    pub keep_recommends: bool,

    /// Keep installed Suggests satisfied.
    #[serde(rename = "keep-suggests", default = "default_true")]
    pub keep_suggests: bool,

    /// Remove unneeded automatically installed packages.
    #[serde(rename = "automatic-remove", default)]
    pub automatic_remove: bool,

    /// Sections whose packages hand their manual bit to new dependencies on upgrade.
    #[serde(rename = "move-autobit-sections", default = "default_move_autobit_sections")]
    pub move_autobit_sections: Vec<String>,

    /// Regular expressions of package names never removed as unneeded.
    #[serde(rename = "never-auto-remove", default)]
    pub never_auto_remove: Vec<String>,
}

fn default_solver() -> String {
    "3.0".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_move_autobit_sections() -> Vec<String> {
    vec!["oldlibs".to_string()]
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            solver: default_solver(),
            debug: 0,
            timeout: default_timeout(),
            upgrade: None,
            remove: None,
            remove_manual: true,
            install: None,
            strict_pinning: true,
            fix_policy_broken: false,
            defer_version_selection: true,
            keep_recommends: true,
            keep_suggests: true,
            automatic_remove: false,
            move_autobit_sections: default_move_autobit_sections(),
            never_auto_remove: Vec::new(),
        }
    }
}

impl SolverConfig {
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    pub fn with_debug(mut self, level: u8) -> Self {
        self.debug = level;
        self
    }

    pub fn with_upgrade(mut self, upgrade: bool) -> Self {
        self.upgrade = Some(upgrade);
        self
    }

    pub fn with_strict_pinning(mut self, strict: bool) -> Self {
        self.strict_pinning = strict;
        self
    }
}

/// Flags carried by the request itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RequestFlags {
    pub upgrade_all: bool,
    pub forbid_remove: bool,
    pub forbid_new_install: bool,
}

/// Resolved options, computed once per solver.
#[derive(Debug, Clone)]
pub struct SolverOptions {
    pub debug: u8,
    pub timeout: Duration,
    pub keep_auto: bool,
    pub is_upgrade: bool,
    pub allow_remove: bool,
    pub allow_remove_manual: bool,
    pub allow_install: bool,
    pub strict_pinning: bool,
    pub fix_policy_broken: bool,
    pub defer_version_selection: bool,
    pub keep_recommends: bool,
    pub keep_suggests: bool,
    pub move_autobit_sections: Vec<String>,
    pub never_auto_remove: Vec<Regex>,
}

impl SolverOptions {
    pub fn new(config: &SolverConfig, flags: RequestFlags) -> Result<Self> {
        let never_auto_remove = config
            .never_auto_remove
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    SolverError::Config(format!("invalid never-auto-remove pattern '{}': {}", pattern, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if config.debug > 4 {
            log::warn!("Solver debug level {} is above the maximum of 4", config.debug);
        }

        let allow_remove = config.remove.unwrap_or(!flags.forbid_remove);
        Ok(Self {
            debug: config.debug,
            timeout: Duration::from_secs(config.timeout),
            keep_auto: config.solver == "3.0" || !config.automatic_remove,
            is_upgrade: config.upgrade.unwrap_or(flags.upgrade_all),
            allow_remove,
            allow_remove_manual: allow_remove && config.remove_manual,
            allow_install: config.install.unwrap_or(!flags.forbid_new_install),
            strict_pinning: config.strict_pinning,
            fix_policy_broken: config.fix_policy_broken,
            defer_version_selection: config.defer_version_selection,
            keep_recommends: config.keep_recommends,
            keep_suggests: config.keep_suggests,
            move_autobit_sections: config.move_autobit_sections.clone(),
            never_auto_remove,
        })
    }

    /// Whether `section` (possibly `component/section`) is one of the
    /// sections that move the manual bit.
    pub fn is_move_autobit_section(&self, section: &str) -> bool {
        let name = section.rsplit('/').next().unwrap_or(section);
        self.move_autobit_sections
            .iter()
            .any(|s| s == section || s == name)
    }

    /// Packages matching a never-auto-remove pattern.
    pub fn in_root_set(&self, name: &str) -> bool {
        self.never_auto_remove.iter().any(|re| re.is_match(name))
    }
}

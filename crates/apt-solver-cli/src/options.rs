//! Arguments shared by every command: the scenario and solver overrides.

use anyhow::{Context, Result};
use apt_solver::{Cache, Scenario, SolverConfig, StaticPolicy};
use clap::Args;
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Default)]
pub struct SolverArgs {
    /// Scenario file (JSON)
    pub scenario: PathBuf,

    /// Solver configuration file (TOML), used instead of the scenario's config
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Give up after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Solver trace level (0-4)
    #[arg(long)]
    pub debug: Option<u8>,

    /// Treat the request as an upgrade
    #[arg(long)]
    pub upgrade: bool,

    /// Allow versions other than the installed and the candidate one
    #[arg(long)]
    pub no_strict_pinning: bool,
}

/// Everything a command needs to set up a solver.
pub struct Loaded {
    pub scenario: Scenario,
    pub cache: Cache,
    pub policy: StaticPolicy,
    pub config: SolverConfig,
}

impl SolverArgs {
    pub fn load(&self) -> Result<Loaded> {
        let scenario = Scenario::load(&self.scenario)
            .with_context(|| format!("Failed to load scenario {}", self.scenario.display()))?;

        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => scenario.config.clone(),
        };
        self.apply(&mut config);
        log::debug!("Solver configuration: {:?}", config);

        let cache = scenario.cache().context("Invalid package universe")?;
        log::debug!(
            "Loaded {} packages with {} versions",
            cache.package_count(),
            cache.version_count()
        );
        let policy = scenario.policy();

        Ok(Loaded {
            scenario,
            cache,
            policy,
            config,
        })
    }

    /// Command line flags take precedence over configuration files.
    pub fn apply(&self, config: &mut SolverConfig) {
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(debug) = self.debug {
            config.debug = debug;
        }
        if self.upgrade {
            config.upgrade = Some(true);
        }
        if self.no_strict_pinning {
            config.strict_pinning = false;
        }
    }
}

pub fn load_config(path: &Path) -> Result<SolverConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

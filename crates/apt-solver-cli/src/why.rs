//! Why / why-not commands - explain the solver's decision about a package.

use anyhow::{anyhow, Context, Result};
use apt_solver::{DependencySolver, SolverError};
use clap::Args;
use console::style;

use crate::options::SolverArgs;

#[derive(Args, Debug)]
pub struct WhyArgs {
    #[command(flatten)]
    pub solver: SolverArgs,

    /// Package to explain (`name` or `name:arch`)
    pub package: String,
}

pub fn execute(args: WhyArgs, installed: bool) -> Result<i32> {
    let loaded = args.solver.load()?;
    let depcache = loaded
        .scenario
        .dep_cache(&loaded.cache, &loaded.policy)
        .context("Invalid request")?;
    let pkg = loaded
        .cache
        .find_package(&args.package)
        .ok_or_else(|| anyhow!("Unable to locate package {}", args.package))?;

    match DependencySolver::why(&loaded.cache, &loaded.policy, &depcache, &loaded.config, pkg, installed) {
        Ok(explanation) => {
            print!("{}", explanation);
            Ok(0)
        }
        Err(e @ (SolverError::Unsatisfiable(_) | SolverError::Timeout)) => {
            eprintln!("{} {}", style("E:").red().bold(), e);
            Ok(100)
        }
        Err(e) => Err(e).context("Solver failed"),
    }
}

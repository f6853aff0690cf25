//! Solve command - run the request and print the plan.

use anyhow::{Context, Result};
use apt_solver::{Cache, DepCache, DependencySolver, Operation, PackageId, Policy, SolverError, Transaction};
use clap::Args;
use console::style;
use serde::Serialize;

use crate::options::SolverArgs;

#[derive(Args, Debug)]
pub struct SolveArgs {
    #[command(flatten)]
    pub solver: SolverArgs,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

/// One line of the plan in `--json` output.
#[derive(Debug, Serialize)]
struct PlanEntry {
    action: &'static str,
    package: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    auto: bool,
}

pub fn execute(args: SolveArgs) -> Result<i32> {
    let loaded = args.solver.load()?;
    let cache = &loaded.cache;
    let mut depcache = loaded
        .scenario
        .dep_cache(cache, &loaded.policy)
        .context("Invalid request")?;

    let result = DependencySolver::resolve(
        cache,
        &loaded.policy,
        &mut depcache,
        &loaded.config,
        loaded.scenario.flags(),
    );
    match result {
        Ok(()) => {}
        Err(e @ (SolverError::Unsatisfiable(_) | SolverError::Timeout)) => {
            eprintln!("{} {}", style("E:").red().bold(), e);
            return Ok(100);
        }
        Err(e) => return Err(e).context("Solver failed"),
    }

    let transaction = Transaction::from_dep_cache(&depcache);
    let kept = kept_back(cache, &loaded.policy, &depcache);

    if args.json {
        let plan = plan_entries(cache, &transaction, &kept);
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(cache, &transaction, &kept);
    }
    Ok(0)
}

/// Installed packages with a newer candidate that stay at their version.
fn kept_back(cache: &Cache, policy: &dyn Policy, depcache: &DepCache<'_>) -> Vec<PackageId> {
    cache
        .packages()
        .filter(|package| {
            let Some(current) = package.current_version else {
                return false;
            };
            let candidate = policy.candidate(cache, package.id);
            candidate.is_some_and(|c| c != current) && depcache.resulting_version(package.id) == Some(current)
        })
        .map(|package| package.id)
        .collect()
}

fn plan_entries(cache: &Cache, transaction: &Transaction, kept: &[PackageId]) -> Vec<PlanEntry> {
    let name = |pkg: PackageId| cache.full_name(pkg, true);
    let version = |ver| Some(cache.version(ver).version.clone());

    let mut entries: Vec<PlanEntry> = transaction
        .operations
        .iter()
        .map(|op| match *op {
            Operation::Install { package, version: to, auto } => PlanEntry {
                action: "install",
                package: name(package),
                from: None,
                to: version(to),
                auto,
            },
            Operation::Upgrade { package, from, to } | Operation::Downgrade { package, from, to } => PlanEntry {
                action: if matches!(op, Operation::Upgrade { .. }) { "upgrade" } else { "downgrade" },
                package: name(package),
                from: version(from),
                to: version(to),
                auto: false,
            },
            Operation::Remove { package, version: from, purge } => PlanEntry {
                action: if purge { "purge" } else { "remove" },
                package: name(package),
                from: version(from),
                to: None,
                auto: false,
            },
        })
        .collect();

    entries.extend(kept.iter().map(|&pkg| PlanEntry {
        action: "keep",
        package: name(pkg),
        from: cache.package(pkg).current_version.and_then(version),
        to: None,
        auto: false,
    }));
    entries
}

fn print_plan(cache: &Cache, transaction: &Transaction, kept: &[PackageId]) {
    let (mut installed, mut upgraded, mut downgraded, mut removed) = (0, 0, 0, 0);

    for op in &transaction.operations {
        let line = op.display(cache).to_string();
        let line = match op {
            Operation::Install { .. } => {
                installed += 1;
                style(line).green()
            }
            Operation::Upgrade { .. } => {
                upgraded += 1;
                style(line).cyan()
            }
            Operation::Downgrade { .. } => {
                downgraded += 1;
                style(line).yellow()
            }
            Operation::Remove { .. } => {
                removed += 1;
                style(line).red()
            }
        };
        println!("  {}", line);
    }
    for &pkg in kept {
        let current = cache
            .package(pkg)
            .current_version
            .map(|ver| cache.version(ver).version.as_str())
            .unwrap_or("");
        println!("  {}", style(format!("Keep {} ({})", cache.full_name(pkg, true), current)).dim());
    }

    println!(
        "{} upgraded, {} newly installed, {} downgraded, {} to remove and {} not upgraded.",
        upgraded,
        installed,
        downgraded,
        removed,
        kept.len()
    );
}

mod options;
mod solve;
mod why;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::io::Write;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "apt-solve")]
#[command(about = "Run the APT dependency solver on a scenario file")]
struct Args {
    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Solve the scenario's request and print the resulting plan
    Solve(solve::SolveArgs),

    /// Explain why a package ends up installed
    Why(why::WhyArgs),

    /// Explain why a package ends up not installed
    #[command(name = "why-not")]
    WhyNot(why::WhyArgs),
}

impl Commands {
    fn solver_debug(&self) -> u8 {
        let options = match self {
            Commands::Solve(args) => &args.solver,
            Commands::Why(args) | Commands::WhyNot(args) => &args.solver,
        };
        options.debug.unwrap_or(0)
    }
}

fn init_logger(verbose: u8, solver_debug: u8) {
    // Solver traces are emitted at debug level
    let level = match verbose {
        0 if solver_debug > 0 => LevelFilter::Debug,
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::builder()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

fn run() -> Result<i32> {
    let args = Args::parse();
    init_logger(args.verbose, args.command.solver_debug());

    match args.command {
        Commands::Solve(args) => solve::execute(args),
        Commands::Why(args) => why::execute(args, true),
        Commands::WhyNot(args) => why::execute(args, false),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("Error: {}", e);
            for cause in e.chain().skip(1) {
                eprintln!("  Caused by: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}

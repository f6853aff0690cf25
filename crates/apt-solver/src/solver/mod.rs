//! The dependency solver.
//!
//! [`Solver`] is a small DPLL-style engine over [`Var`]s: install a package,
//! or select one exact version of it. It keeps a trail of assignments, a
//! queue of pending propagations and a heap of clauses still waiting for a
//! choice, and backtracks one decision level at a time.
//!
//! [`DependencySolver`] feeds it. Clauses are created lazily from the package
//! graph as variables become true, which keeps the search to the part of the
//! universe the request actually touches.

mod clause;
mod compare;
mod dependency;
mod explain;
mod obsolete;
#[allow(clippy::module_inception)]
mod solver;
mod state;
mod translate;
mod var;
mod work;

pub use clause::{Clause, ClauseId, Group};
pub use dependency::DependencySolver;
pub use solver::{Discover, Solver};
pub use state::{State, Trail};
pub use var::{LiftedBool, Lit, Var};
pub use work::Work;

#[cfg(test)]
mod tests;

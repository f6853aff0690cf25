//! Relation operators and versioned constraints

mod constraint;
mod operator;

pub use constraint::{check_dep, Constraint};
pub use operator::{InvalidOperatorError, Operator};

//! Debian version handling
//!
//! This crate implements dpkg's version ordering, the relation operators used in
//! `Depends`-style control fields and a parser for those fields.

pub mod constraint;
mod comparator;
mod relation;
mod version;

pub use comparator::Comparator;
pub use constraint::{check_dep, Constraint, InvalidOperatorError, Operator};
pub use relation::{parse_relations, Relation, RelationError};
pub use version::{compare_versions, Version, VersionError};

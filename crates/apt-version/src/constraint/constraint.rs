//! A single versioned restriction such as `>= 1.2-1`

use std::fmt;

use super::Operator;
use crate::version::compare_versions;

/// Operator plus the version it compares against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constraint {
    operator: Operator,
    version: String,
}

impl Constraint {
    pub fn new(operator: Operator, version: impl Into<String>) -> Self {
        Self {
            operator,
            version: version.into(),
        }
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Check whether `version` satisfies this constraint.
    pub fn matches(&self, version: &str) -> bool {
        check_dep(version, self.operator, &self.version)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operator, self.version)
    }
}

/// Check `version op target`, e.g. `check_dep("1.2", GreaterEqual, "1.0")`.
pub fn check_dep(version: &str, op: Operator, target: &str) -> bool {
    op.matches(compare_versions(version, target))
}

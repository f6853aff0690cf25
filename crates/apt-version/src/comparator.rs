//! Version comparison utilities

use crate::constraint::{check_dep, Operator};

/// Comparator for comparing version strings
pub struct Comparator;

impl Comparator {
    /// Check if version1 > version2
    pub fn greater_than(version1: &str, version2: &str) -> bool {
        check_dep(version1, Operator::GreaterThan, version2)
    }

    /// Check if version1 >= version2
    pub fn greater_than_or_equal_to(version1: &str, version2: &str) -> bool {
        check_dep(version1, Operator::GreaterEqual, version2)
    }

    /// Check if version1 < version2
    pub fn less_than(version1: &str, version2: &str) -> bool {
        check_dep(version1, Operator::LessThan, version2)
    }

    /// Check if version1 <= version2
    pub fn less_than_or_equal_to(version1: &str, version2: &str) -> bool {
        check_dep(version1, Operator::LessEqual, version2)
    }

    /// Check if version1 == version2
    pub fn equal_to(version1: &str, version2: &str) -> bool {
        check_dep(version1, Operator::Equal, version2)
    }

    /// Check if version1 != version2
    pub fn not_equal_to(version1: &str, version2: &str) -> bool {
        check_dep(version1, Operator::NotEqual, version2)
    }

    /// Compare version1 to version2 using an operator spelled as in a control file
    pub fn compare(version1: &str, operator: &str, version2: &str) -> bool {
        operator
            .parse::<Operator>()
            .map(|op| check_dep(version1, op, version2))
            .unwrap_or(false)
    }
}

//! Operators allowed in a versioned relation

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Comparison operators of Debian relations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Strictly earlier (<<)
    LessThan,
    /// Earlier or equal (<=)
    LessEqual,
    /// Exactly equal (=)
    Equal,
    /// Later or equal (>=)
    GreaterEqual,
    /// Strictly later (>>)
    GreaterThan,
    /// Not equal (!=), only produced internally
    NotEqual,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid operator: {0}")]
pub struct InvalidOperatorError(pub String);

impl Operator {
    /// Get the string representation of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::LessThan => "<<",
            Operator::LessEqual => "<=",
            Operator::Equal => "=",
            Operator::GreaterEqual => ">=",
            Operator::GreaterThan => ">>",
            Operator::NotEqual => "!=",
        }
    }

    /// Whether a version comparing as `ordering` against the relation's
    /// version satisfies this operator.
    pub fn matches(&self, ordering: Ordering) -> bool {
        match self {
            Operator::LessThan => ordering == Ordering::Less,
            Operator::LessEqual => ordering != Ordering::Greater,
            Operator::Equal => ordering == Ordering::Equal,
            Operator::GreaterEqual => ordering != Ordering::Less,
            Operator::GreaterThan => ordering == Ordering::Greater,
            Operator::NotEqual => ordering != Ordering::Equal,
        }
    }

    /// Get all spellings accepted by the parser
    pub fn supported_operators() -> &'static [&'static str] {
        &["<<", "<=", "=", ">=", ">>", "!=", "<", ">"]
    }
}

impl FromStr for Operator {
    type Err = InvalidOperatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "<<" => Ok(Operator::LessThan),
            // `<` and `>` are the obsolete spellings of `<=` and `>=`
            "<=" | "<" => Ok(Operator::LessEqual),
            "=" => Ok(Operator::Equal),
            ">=" | ">" => Ok(Operator::GreaterEqual),
            ">>" => Ok(Operator::GreaterThan),
            "!=" => Ok(Operator::NotEqual),
            _ => Err(InvalidOperatorError(s.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_operators() {
        assert_eq!("<<".parse::<Operator>().unwrap(), Operator::LessThan);
        assert_eq!(">>".parse::<Operator>().unwrap(), Operator::GreaterThan);
        assert_eq!("=".parse::<Operator>().unwrap(), Operator::Equal);
    }

    #[test]
    fn test_parse_legacy_spellings() {
        assert_eq!("<".parse::<Operator>().unwrap(), Operator::LessEqual);
        assert_eq!(">".parse::<Operator>().unwrap(), Operator::GreaterEqual);
    }

    #[test]
    fn test_parse_invalid() {
        let err = "==".parse::<Operator>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid operator: ==");
    }

    #[test]
    fn test_matches() {
        assert!(Operator::LessEqual.matches(Ordering::Equal));
        assert!(!Operator::LessThan.matches(Ordering::Equal));
        assert!(Operator::NotEqual.matches(Ordering::Greater));
        assert!(!Operator::GreaterEqual.matches(Ordering::Less));
    }
}

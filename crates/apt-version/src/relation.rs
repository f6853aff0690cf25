//! Parsing of relation fields such as `Depends: a (>= 1) | b, c:any`

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::constraint::{Constraint, InvalidOperatorError, Operator};

lazy_static! {
    static ref RELATION_RE: Regex = Regex::new(
        r"^(?P<name>[A-Za-z0-9][A-Za-z0-9.+-]*)(?::(?P<arch>[A-Za-z0-9-]+))?\s*(?:\(\s*(?P<op><<|<=|>=|>>|!=|=|<|>)\s*(?P<version>[^\s()]+)\s*\))?$"
    )
    .unwrap();
}

/// Error type for relation parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelationError {
    #[error("Empty alternative in relation field \"{0}\"")]
    EmptyAlternative(String),
    #[error("Could not parse relation \"{0}\"")]
    Invalid(String),
    #[error(transparent)]
    Operator(#[from] InvalidOperatorError),
}

/// One alternative of a relation: a package name, an optional
/// architecture qualifier and an optional versioned constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relation {
    pub name: String,
    pub arch: Option<String>,
    pub constraint: Option<Constraint>,
}

impl Relation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arch: None,
            constraint: None,
        }
    }

    pub fn with_constraint(mut self, operator: Operator, version: impl Into<String>) -> Self {
        self.constraint = Some(Constraint::new(operator, version));
        self
    }

    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = Some(arch.into());
        self
    }
}

impl FromStr for Relation {
    type Err = RelationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let caps = RELATION_RE
            .captures(s)
            .ok_or_else(|| RelationError::Invalid(s.to_string()))?;

        let constraint = match (caps.name("op"), caps.name("version")) {
            (Some(op), Some(version)) => Some(Constraint::new(
                op.as_str().parse::<Operator>()?,
                version.as_str(),
            )),
            _ => None,
        };

        Ok(Self {
            name: caps["name"].to_string(),
            arch: caps.name("arch").map(|a| a.as_str().to_string()),
            constraint,
        })
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(arch) = &self.arch {
            write!(f, ":{}", arch)?;
        }
        if let Some(constraint) = &self.constraint {
            write!(f, " ({})", constraint)?;
        }
        Ok(())
    }
}

/// Parse a relation field into its AND-list of OR-groups.
///
/// An empty or whitespace-only field yields no groups.
pub fn parse_relations(field: &str) -> Result<Vec<Vec<Relation>>, RelationError> {
    let mut groups = Vec::new();
    if field.trim().is_empty() {
        return Ok(groups);
    }

    for group in field.split(',') {
        let mut alternatives = Vec::new();
        for alternative in group.split('|') {
            if alternative.trim().is_empty() {
                return Err(RelationError::EmptyAlternative(field.to_string()));
            }
            alternatives.push(alternative.parse::<Relation>()?);
        }
        groups.push(alternatives);
    }

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let rel: Relation = "libc6".parse().unwrap();
        assert_eq!(rel, Relation::new("libc6"));
    }

    #[test]
    fn test_parse_versioned_with_arch() {
        let rel: Relation = "python3:any (>= 3.11~)".parse().unwrap();
        assert_eq!(rel.name, "python3");
        assert_eq!(rel.arch.as_deref(), Some("any"));
        assert_eq!(
            rel.constraint,
            Some(Constraint::new(Operator::GreaterEqual, "3.11~"))
        );
        assert_eq!(rel.to_string(), "python3:any (>= 3.11~)");
    }

    #[test]
    fn test_parse_field() {
        let groups = parse_relations("a (<< 2) | b, c").unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[0][1].name, "b");
        assert_eq!(groups[1][0].name, "c");
    }

    #[test]
    fn test_parse_empty_field() {
        assert!(parse_relations("  ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_relations("a, | b"),
            Err(RelationError::EmptyAlternative(_))
        ));
        assert!(matches!(
            parse_relations("a (~> 1)"),
            Err(RelationError::Invalid(_))
        ));
    }
}

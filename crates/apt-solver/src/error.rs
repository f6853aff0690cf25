use thiserror::Error;

/// A branch-local contradiction, rendered as the two competing
/// justification chains that led to it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{explanation}")]
pub struct Conflict {
    pub explanation: String,
}

impl Conflict {
    pub fn new(explanation: impl Into<String>) -> Self {
        Self {
            explanation: explanation.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum SolverError {
    // Solving errors
    #[error("{0}")]
    Unsatisfiable(Conflict),

    #[error("Solver timed out.")]
    Timeout,

    // Package graph errors
    #[error("Unable to locate package {name}")]
    UnknownPackage { name: String },

    #[error("Version '{version}' for '{name}' was not found")]
    UnknownVersion { name: String, version: String },

    #[error("Invalid relation field for {package}: {source}")]
    Relation {
        package: String,
        #[source]
        source: apt_version::RelationError,
    },

    #[error("Invalid version for {package}: {source}")]
    Version {
        package: String,
        #[source]
        source: apt_version::VersionError,
    },

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Scenario errors
    #[error("Failed to parse scenario: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<Conflict> for SolverError {
    fn from(conflict: Conflict) -> Self {
        SolverError::Unsatisfiable(conflict)
    }
}

pub type Result<T> = std::result::Result<T, SolverError>;

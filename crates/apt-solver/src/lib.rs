pub mod cache;
pub mod config;
pub mod depcache;
pub mod error;
pub mod policy;
pub mod scenario;
pub mod solver;
pub mod transaction;

pub use cache::{Cache, CacheBuilder, PackageId, VersionId, VersionSpec};
pub use config::{RequestFlags, SolverConfig, SolverOptions};
pub use depcache::DepCache;
pub use error::{Conflict, Result, SolverError};
pub use policy::{Policy, StaticPolicy};
pub use scenario::{Pin, Scenario, ScenarioRequest};
pub use solver::{DependencySolver, Solver};
pub use transaction::{Operation, Transaction};

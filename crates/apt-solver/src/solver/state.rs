use super::clause::ClauseId;
use super::var::{LiftedBool, Var};
use super::work::Work;

/// Mutable solver record of one variable.
#[derive(Debug, Clone, Default)]
pub struct State {
    pub assignment: LiftedBool,
    /// The clause that implied the assignment, `None` for facts and choices.
    pub reason: Option<ClauseId>,
    /// Annotation for assignments without a clause.
    pub reason_str: Option<&'static str>,
    /// Decision level the assignment was made at.
    pub level: usize,
    pub discovered: bool,
    /// Explicitly requested by the user rather than installed as a dependency.
    pub manual: bool,
    /// Clauses this variable is the reason of.
    pub clauses: Vec<ClauseId>,
    /// Clauses this variable is a solution of.
    pub rclauses: Vec<ClauseId>,
}

/// One entry of the undo log.
#[derive(Debug, Clone)]
pub struct Trail {
    /// `Var::Root` when the entry only records solved work.
    pub assigned: Var,
    pub work: Option<Work>,
}

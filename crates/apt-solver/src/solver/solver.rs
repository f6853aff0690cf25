use std::collections::{BinaryHeap, VecDeque};
use std::time::{Duration, Instant};

use crate::cache::{Cache, IdMap, PackageId, VersionId};
use crate::error::{Conflict, SolverError};

use super::clause::{Clause, ClauseId};
use super::state::{State, Trail};
use super::var::{LiftedBool, Lit, Var};
use super::work::Work;

/// Lazy clause expansion, called whenever a variable becomes true.
pub trait Discover {
    /// Register the clauses of `var`, and of whatever it leads to, with `solver`.
    fn discover(&mut self, solver: &mut Solver<'_>, var: Var);
}

/// The search engine: trail, decision levels, propagation queue and work heap.
///
/// It knows nothing about packaging; clauses come in through [`Discover`]
/// and [`Solver::insert_clause`].
pub struct Solver<'a> {
    cache: &'a Cache,
    root: State,
    packages: IdMap<PackageId, State>,
    versions: IdMap<VersionId, State>,
    clauses: Vec<Clause>,
    work: BinaryHeap<Work>,
    trail: Vec<Trail>,
    /// Trail length at the start of each decision level
    trail_lim: Vec<usize>,
    prop_queue: VecDeque<Var>,
    start_time: Option<Instant>,
    timeout: Duration,
    debug: u8,
}

impl<'a> Solver<'a> {
    pub fn new(cache: &'a Cache, timeout: Duration, debug: u8) -> Self {
        Self {
            cache,
            root: State {
                assignment: LiftedBool::True,
                ..Default::default()
            },
            packages: IdMap::from_fn(cache.package_count(), |_| State::default()),
            versions: IdMap::from_fn(cache.version_count(), |_| State::default()),
            clauses: Vec::new(),
            work: BinaryHeap::new(),
            trail: Vec::new(),
            trail_lim: Vec::new(),
            prop_queue: VecDeque::new(),
            start_time: None,
            timeout,
            debug,
        }
    }

    pub fn cache(&self) -> &'a Cache {
        self.cache
    }

    pub fn debug(&self) -> u8 {
        self.debug
    }

    pub fn state(&self, var: Var) -> &State {
        match var {
            Var::Root => &self.root,
            Var::Package(pkg) => &self.packages[pkg],
            Var::Version(ver) => &self.versions[ver],
        }
    }

    pub fn state_mut(&mut self, var: Var) -> &mut State {
        match var {
            Var::Root => &mut self.root,
            Var::Package(pkg) => &mut self.packages[pkg],
            Var::Version(ver) => &mut self.versions[ver],
        }
    }

    pub fn value(&self, var: Var) -> LiftedBool {
        self.state(var).assignment
    }

    pub fn lit_value(&self, lit: Lit) -> LiftedBool {
        let value = self.value(lit.var());
        if lit.is_negative() {
            !value
        } else {
            value
        }
    }

    pub fn decision_level(&self) -> usize {
        self.trail_lim.len()
    }

    pub fn clause(&self, id: ClauseId) -> &Clause {
        &self.clauses[id.index()]
    }

    pub fn clause_mut(&mut self, id: ClauseId) -> &mut Clause {
        &mut self.clauses[id.index()]
    }

    pub fn clause_count(&self) -> usize {
        self.clauses.len()
    }

    /// Move a clause into the arena and index it under its reason and solutions.
    pub fn insert_clause(&mut self, clause: Clause) -> ClauseId {
        let id = ClauseId(self.clauses.len() as u32);
        self.state_mut(clause.reason).clauses.push(id);
        for &sol in &clause.solutions {
            self.state_mut(sol).rclauses.push(id);
        }
        self.clauses.push(clause);
        id
    }

    /// Open a new decision level and assert `lit` in it.
    pub fn assume(&mut self, lit: Lit, reason: Option<ClauseId>) -> Result<(), Conflict> {
        self.trail_lim.push(self.trail.len());
        self.enqueue(lit, reason)
    }

    /// Assert `lit`. Asserting what already holds is a no-op; asserting the
    /// opposite of an existing assignment is a conflict.
    pub fn enqueue(&mut self, lit: Lit, reason: Option<ClauseId>) -> Result<(), Conflict> {
        let var = lit.var();
        let assignment = LiftedBool::from(!lit.is_negative());
        let current = self.value(var);

        if current != LiftedBool::Undefined {
            if current != assignment {
                let existing = self.state(var).reason;
                return Err(self.conflict(
                    var,
                    (current == LiftedBool::True, existing),
                    (!lit.is_negative(), reason),
                ));
            }
            return Ok(());
        }

        let level = self.decision_level();
        let state = self.state_mut(var);
        state.assignment = assignment;
        state.level = level;
        state.reason = reason;

        if self.debug >= 1 {
            log::debug!(
                "[{}] {}:{} ({})",
                level,
                if lit.is_negative() { "Reject" } else { "Install" },
                var.to_string(self.cache),
                self.why_str(self.best_reason(reason, var))
            );
        }

        self.trail.push(Trail {
            assigned: var,
            work: None,
        });
        self.prop_queue.push_back(var);
        Ok(())
    }

    /// Drain the propagation queue.
    pub fn propagate(&mut self, discover: &mut dyn Discover) -> Result<(), Conflict> {
        while let Some(var) = self.prop_queue.pop_front() {
            match self.value(var) {
                LiftedBool::True => self.propagate_true(discover, var)?,
                LiftedBool::False => self.propagate_false(var)?,
                LiftedBool::Undefined => {}
            }
        }
        Ok(())
    }

    fn propagate_true(&mut self, discover: &mut dyn Discover, var: Var) -> Result<(), Conflict> {
        discover.discover(self, var);

        for id in self.state(var).clauses.clone() {
            let work = Work::new(id, self.clause(id), self.decision_level());
            self.add_work(work)?;
        }

        for id in self.state(var).rclauses.clone() {
            let clause = self.clause(id);
            if !clause.negative || clause.optional || clause.reason.is_root() {
                continue;
            }
            let reason = clause.reason;
            if self.debug >= 3 {
                log::debug!(
                    "Propagate {} to NOT {} for dep {}",
                    var.to_string(self.cache),
                    reason.to_string(self.cache),
                    clause.to_string(self.cache, false, true)
                );
            }
            self.enqueue(!reason, Some(id))?;
        }
        Ok(())
    }

    fn propagate_false(&mut self, var: Var) -> Result<(), Conflict> {
        for id in self.state(var).rclauses.clone() {
            let clause = self.clause(id);
            if clause.negative || clause.reason.is_root() {
                continue;
            }
            let reason = clause.reason;
            if self.value(reason) == LiftedBool::False {
                continue;
            }

            let count = clause
                .solutions
                .iter()
                .filter(|&&sol| self.value(sol) != LiftedBool::False)
                .count();

            if count == 1 && self.value(reason) == LiftedBool::True {
                if self.debug >= 3 {
                    log::debug!(
                        "Propagate NOT {} to unit clause {}",
                        var.to_string(self.cache),
                        clause.to_string(self.cache, false, true)
                    );
                }
                if clause.optional {
                    // Queue the clause again so it is looked at in its new standing
                    let work = Work::new(id, clause, self.decision_level());
                    self.add_work(work)?;
                } else {
                    let undecided: Vec<Var> = clause
                        .solutions
                        .iter()
                        .copied()
                        .filter(|&sol| self.value(sol) == LiftedBool::Undefined)
                        .collect();
                    for sol in undecided {
                        self.enqueue(sol.into(), Some(id))?;
                    }
                }
                continue;
            }
            if count >= 1 || clause.optional {
                continue;
            }

            if self.debug >= 3 {
                log::debug!(
                    "Propagate NOT {} to {} for dep {}",
                    var.to_string(self.cache),
                    reason.to_string(self.cache),
                    clause.to_string(self.cache, false, true)
                );
            }
            // The last remaining solution is gone
            self.enqueue(!reason, Some(id))?;
        }
        Ok(())
    }

    /// Open a decision level for trying `var` as the solution of `work`.
    fn push(&mut self, var: Var, work: Work) {
        if self.debug >= 2 {
            log::debug!("Trying choice for {}", self.work_string(&work));
        }
        self.trail_lim.push(self.trail.len());
        self.trail.push(Trail {
            assigned: var,
            work: Some(work),
        });
    }

    fn undo_one(&mut self) {
        let Some(item) = self.trail.pop() else {
            return;
        };
        if self.debug >= 4 {
            log::debug!("Undoing a single assignment");
        }

        if !item.assigned.is_root() {
            if self.debug >= 4 {
                log::debug!("Unassign {}", item.assigned.to_string(self.cache));
            }
            let state = self.state_mut(item.assigned);
            state.assignment = LiftedBool::Undefined;
            state.reason = None;
            state.reason_str = None;
            state.level = 0;
        }

        if let Some(work) = item.work {
            if self.debug >= 4 {
                log::debug!("Adding work item {}", self.work_string(&work));
            }
            self.push_work(work);
        }
    }

    /// Backtrack one decision level after `cause` made the current branch fail,
    /// and assert the opposite of the choice made at that level.
    ///
    /// Fails at level 0, where `cause` is the final answer, and once the
    /// timeout has passed.
    pub fn pop(&mut self, cause: Conflict) -> Result<(), SolverError> {
        let Some(&limit) = self.trail_lim.last() else {
            return Err(SolverError::Unsatisfiable(cause));
        };

        let start = *self.start_time.get_or_insert_with(Instant::now);
        if start.elapsed() >= self.timeout {
            return Err(SolverError::Timeout);
        }

        if self.debug >= 2 {
            log::debug!("Branch failed: {}", cause);
        }

        // The assumption opening this level did not assign anything
        if limit == self.trail.len() {
            self.trail_lim.pop();
            return Ok(());
        }

        let choice = self.trail[limit].assigned;
        while self.trail.len() > limit {
            self.undo_one();
        }
        self.trail_lim.pop();
        // Whatever was still queued belonged to the failed level
        self.prop_queue.clear();

        let level = self.decision_level();
        self.work.retain(|w| w.level <= level && !w.erased);

        if self.debug >= 2 {
            log::debug!("Backtracking to choice {}", choice.to_string(self.cache));
        }

        if !choice.is_root() {
            self.enqueue(!choice, None)
                .map_err(SolverError::Unsatisfiable)?;
        }
        self.state_mut(choice).reason_str = Some("backtracked");

        if self.debug >= 2 {
            log::debug!("Backtracked to choice {}", choice.to_string(self.cache));
        }
        Ok(())
    }

    /// Schedule a clause whose reason holds.
    ///
    /// Negative clauses and hard single-solution clauses are asserted right
    /// away, everything else goes on the work heap.
    pub fn add_work(&mut self, work: Work) -> Result<(), Conflict> {
        let clause = self.clause(work.clause);
        if clause.negative {
            for sol in clause.solutions.clone() {
                self.enqueue(!sol, Some(work.clause))?;
            }
            return Ok(());
        }

        if self.debug >= 3 && clause.optional {
            log::debug!("Enqueuing Recommends {}", clause.to_string(self.cache, false, true));
        }
        if clause.solutions.len() == 1 && !clause.optional {
            let sol = clause.solutions[0];
            return self.enqueue(sol.into(), Some(work.clause));
        }

        self.push_work(work);
        Ok(())
    }

    fn push_work(&mut self, mut work: Work) {
        work.size = self
            .clause(work.clause)
            .solutions
            .iter()
            .filter(|&&sol| self.value(sol) != LiftedBool::False)
            .count();
        self.work.push(work);
    }

    /// Run the search until every scheduled clause is settled.
    pub fn solve(&mut self, discover: &mut dyn Discover) -> Result<(), SolverError> {
        self.start_time = Some(Instant::now());

        loop {
            while let Err(conflict) = self.propagate(discover) {
                self.pop(conflict)?;
            }

            let Some(item) = self.work.pop() else {
                break;
            };
            if item.erased {
                continue;
            }
            self.trail.push(Trail {
                assigned: Var::Root,
                work: Some(item.clone()),
            });

            let clause = self.clause(item.clause);
            if clause
                .solutions
                .iter()
                .any(|&sol| self.value(sol) == LiftedBool::True)
            {
                if self.debug >= 2 {
                    log::debug!("ELIDED {}", self.work_string(&item));
                }
                continue;
            }

            if self.debug >= 1 {
                log::debug!("{}", self.work_string(&item));
            }

            let optional = clause.optional;
            let reason = clause.reason;
            let mut found = false;
            for sol in clause.solutions.clone() {
                if self.value(sol) == LiftedBool::False {
                    if self.debug >= 3 {
                        log::debug!("(existing conflict: {})", sol.to_string(self.cache));
                    }
                    continue;
                }
                if item.size > 1 || optional {
                    self.push(sol, item.clone());
                }
                if self.debug >= 3 {
                    log::debug!("(try it: {})", sol.to_string(self.cache));
                }
                if let Err(conflict) = self.enqueue(sol.into(), Some(item.clause)) {
                    self.pop(conflict)?;
                }
                found = true;
                break;
            }

            if !found && !optional {
                let conflict = self.conflict(
                    reason,
                    (true, self.state(reason).reason),
                    (false, Some(item.clause)),
                );
                self.pop(conflict)?;
            }
        }

        Ok(())
    }

    fn work_string(&self, work: &Work) -> String {
        work.to_string(self.cache, self.clause(work.clause))
    }
}

//! Human readable justification of assignments and conflicts.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt::Write;

use apt_version::compare_versions;

use crate::error::Conflict;

use super::clause::{Clause, ClauseId, Group};
use super::solver::Solver;
use super::var::{LiftedBool, Var};

impl Solver<'_> {
    /// The variable that made `clause` force an assignment of `var`.
    ///
    /// For a clause `var` is the reason of, this is the solution that was
    /// decided against it; otherwise it is the clause's reason.
    pub fn best_reason(&self, clause: Option<ClauseId>, var: Var) -> Var {
        let Some(id) = clause else {
            return Var::Root;
        };
        let clause = self.clause(id);
        if clause.reason == var {
            let blocking = if clause.negative {
                LiftedBool::True
            } else {
                LiftedBool::False
            };
            if let Some(&choice) = clause
                .solutions
                .iter()
                .find(|&&sol| self.value(sol) == blocking)
            {
                return choice;
            }
        }
        clause.reason
    }

    /// Implication chain leading to `reason`, as `a -> b -> not c`.
    pub fn why_str(&self, mut reason: Var) -> String {
        let mut chain = Vec::new();
        while !reason.is_root() {
            if self.value(reason) == LiftedBool::False {
                chain.push(format!("not {}", reason.to_string(self.cache())));
            } else {
                chain.push(reason.to_string(self.cache()));
            }
            reason = self.best_reason(self.state(reason).reason, reason);
        }
        chain.reverse();
        chain.join(" -> ")
    }

    /// Explain `var` being set to `assignment` by `rclause`.
    ///
    /// `assignment` need not be the actual value: a conflict explains the
    /// assignment that failed as well. Variables in `seen` are only referred to.
    pub fn long_why_str(
        &self,
        mut var: Var,
        assignment: bool,
        mut rclause: Option<ClauseId>,
        prefix: &str,
        seen: &mut HashSet<Var>,
    ) -> String {
        let mut out = String::new();

        // pkg=ver -> pkg is noise, explain the version instead
        if var.package().is_some() && assignment {
            if let Some(id) = rclause.filter(|&id| self.clause(id).group == Group::SelectVersion) {
                var = self.clause(id).reason;
                rclause = self.state(var).reason;
            }
        }

        let Some(rclause_id) = rclause else {
            let _ = writeln!(out, "{}{}", prefix, self.print_selection(var, assignment));
            return out;
        };
        let clause = self.clause(rclause_id);

        let actual = self.value(var);
        if actual != LiftedBool::Undefined
            && assignment == (actual == LiftedBool::True)
            && self.state(var).reason == rclause
        {
            if seen.contains(&var) {
                let _ = writeln!(out, "{}{} as above", prefix, self.print_selection(var, assignment));
                return out;
            }
            seen.insert(var);
        }

        if !assignment && !clause.negative {
            let _ = writeln!(out, "{}{}", prefix, clause.to_string(self.cache(), true, true));
            let _ = writeln!(out, "{}but none of the choices are installable:", prefix);
            self.recurse_children(&mut out, clause, Var::Root, prefix, seen);
            return out;
        }

        // Strongest path from a root to the leaf, leaf side first
        let mut path = Vec::new();
        let mut reason = self.best_reason(rclause, var);
        while !reason.is_root() {
            path.push(reason);
            reason = self.best_reason(self.state(reason).reason, reason);
        }

        let _ = writeln!(out, "{}{} because:", prefix, self.print_selection(var, assignment));
        let w = (path.len() + 1).to_string().len();
        let mut i = 1;
        for pos in (0..path.len()).rev() {
            let step = path[pos];
            let state = self.state(step);
            let step_assignment = state.assignment == LiftedBool::True;
            if step.package().is_some()
                && state
                    .reason
                    .is_some_and(|id| self.clause(id).group == Group::SelectVersion)
            {
                continue;
            }
            if seen.contains(&step) {
                if pos == 0 || !seen.contains(&path[pos - 1]) {
                    let _ = writeln!(
                        out,
                        "{}{}{}. {} as above",
                        prefix,
                        if i == 1 { "" } else { "1-" },
                        i,
                        self.print_selection(step, step_assignment)
                    );
                }
                i += 1;
                continue;
            }
            seen.insert(step);
            match state.reason {
                Some(id) => {
                    let reason = self.clause(id);
                    let _ = writeln!(
                        out,
                        "{}{:>w$}. {}",
                        prefix,
                        i,
                        reason.to_string(self.cache(), true, true)
                    );
                    if reason.solutions.len() > 1 {
                        let _ = writeln!(
                            out,
                            "{}{:>w$}  [selected {} for {}]",
                            prefix,
                            "",
                            step.to_string(self.cache()),
                            if step_assignment { "install" } else { "remove" }
                        );
                    }
                }
                None => {
                    let _ = writeln!(
                        out,
                        "{}{:>w$}. {}",
                        prefix,
                        i,
                        self.print_selection(step, step_assignment)
                    );
                }
            }
            i += 1;
        }

        // The leaf is printed on its own: it may be an assignment that failed
        let _ = writeln!(
            out,
            "{}{:>w$}. {}",
            prefix,
            i,
            clause.to_string(self.cache(), true, true)
        );
        if clause.solutions.len() > 1 {
            let _ = writeln!(
                out,
                "{}{:>w$}  [selected {}]",
                prefix,
                "",
                self.best_reason(rclause, var).to_string(self.cache())
            );
        }

        // Alternatives that were not taken along the way
        let mut first_context = true;
        let mut context_header = |out: &mut String| {
            if first_context {
                let _ = writeln!(
                    out,
                    "{}For context, additional choices that could not be installed:",
                    prefix
                );
                first_context = false;
            }
        };
        let nested = format!("{}  ", prefix);
        for &step in path.iter().rev() {
            let Some(id) = self.state(step).reason else {
                continue;
            };
            let reason = self.clause(id);
            if reason.solutions.len() <= 1 || reason.negative {
                continue;
            }
            context_header(&mut out);
            let _ = writeln!(out, "{}* In {}:", prefix, reason.to_string(self.cache(), true, true));
            self.recurse_children(&mut out, reason, step, &nested, seen);
        }
        if clause.solutions.len() > 1 && !clause.negative {
            context_header(&mut out);
            let _ = writeln!(out, "{}* In {}:", prefix, clause.to_string(self.cache(), true, true));
            self.recurse_children(&mut out, clause, var, &nested, seen);
        }

        out
    }

    /// The assignment of every solution of `clause` other than `skip`.
    fn recurse_children(
        &self,
        out: &mut String,
        clause: &Clause,
        skip: Var,
        prefix: &str,
        seen: &mut HashSet<Var>,
    ) {
        if clause.solutions.is_empty() {
            let _ = writeln!(out, "{}[no choices]", prefix);
        }
        let nested = format!("{}  ", prefix);
        for &choice in &clause.solutions {
            if choice == skip {
                continue;
            }
            match self.value(choice) {
                LiftedBool::Undefined => {
                    let _ = writeln!(out, "{}- {} is undecided", prefix, choice.to_string(self.cache()));
                }
                value => {
                    let why = self.long_why_str(
                        choice,
                        value == LiftedBool::True,
                        self.state(choice).reason,
                        &nested,
                        seen,
                    );
                    let _ = write!(out, "{}- {}", prefix, why.get(nested.len()..).unwrap_or(""));
                }
            }
        }
    }

    /// "is selected for install", "as an upgrade", and so on.
    fn print_selection(&self, var: Var, assignment: bool) -> String {
        let cache = self.cache();
        let name = var.to_string(cache);

        if let Some(pkg) = var.package() {
            if !assignment && cache.package(pkg).is_installed() {
                return format!("{} is selected for removal", name);
            }
        }
        if let Some(ver) = var.version().filter(|_| assignment) {
            let version = cache.version(ver);
            if let Some(current) = cache.package(version.package).current_version {
                if current != ver {
                    let current = &cache.version(current).version;
                    return match compare_versions(current, &version.version) {
                        Ordering::Less => format!("{} is selected as an upgrade", name),
                        _ => format!("{} is selected as a downgrade", name),
                    };
                }
            }
        }
        if assignment {
            format!("{} is selected for install", name)
        } else {
            format!("{} is not selected for install", name)
        }
    }

    /// Render why setting `var` to `second` contradicts its `first` assignment.
    pub(crate) fn conflict(
        &self,
        var: Var,
        first: (bool, Option<ClauseId>),
        second: (bool, Option<ClauseId>),
    ) -> Conflict {
        let mut seen = HashSet::new();
        let one = self.long_why_str(var, first.0, first.1, "   ", &mut seen);
        let two = self.long_why_str(var, second.0, second.1, "   ", &mut seen);
        let explanation = format!(
            "Unable to satisfy dependencies. Reached two conflicting assignments:\n1. {}\n2. {}",
            one.get(3..).unwrap_or(""),
            two.get(3..).unwrap_or("")
        );
        Conflict::new(explanation.trim_end())
    }
}

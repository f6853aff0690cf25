use crate::cache::{Cache, DependencyId};

use super::var::Var;

/// Scheduling bucket of a clause. Earlier variants are worked on first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Group {
    HoldOrDelete,

    /// Dependencies only satisfiable by new packages; these may be renamed
    /// replacements that later dependencies resolve to through Provides.
    SatisfyNew,
    Satisfy,
    /// Dependencies involving obsolete packages are tried last.
    SatisfyObsolete,

    /// Select a version of a package chosen for install.
    SelectVersion,

    // Upgrades first, so that newer packages with stricter dependencies
    // guide the resolution for older ones.
    UpgradeManual,
    InstallManual,
    ObsoleteManual,

    // Automatically installed packages come last, so we learn whether a
    // manually installed package pulled them in.
    UpgradeAuto,
    KeepAuto,
    ObsoleteAuto,

    /// Optional dependencies that were satisfied before and would not be
    /// installed otherwise.
    SatisfySuggests,
}

/// Index of a clause in the solver's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClauseId(pub u32);

impl ClauseId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A normalized dependency: `reason -> solutions[0] | ... | solutions[n]`.
///
/// Negative clauses mean `reason -> not solutions[0] & ... & not solutions[n]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    /// The variable whose truth makes this clause matter.
    pub reason: Var,
    pub group: Group,
    /// Acceptable choices, most preferred first. Only ever shrinks.
    pub solutions: Vec<Var>,
    pub optional: bool,
    pub negative: bool,
    /// Tried before other optional clauses of the same standing.
    pub eager: bool,
    /// Clauses folded into this one, kept for rendering only.
    pub merged: Vec<Clause>,
    /// First relation of the OR-group this clause was translated from.
    pub dep: Option<DependencyId>,
}

impl Clause {
    pub fn new(reason: Var, group: Group) -> Self {
        Self::with_flags(reason, group, false, false)
    }

    pub fn optional(reason: Var, group: Group) -> Self {
        Self::with_flags(reason, group, true, false)
    }

    pub fn with_flags(reason: Var, group: Group, optional: bool, negative: bool) -> Self {
        Self {
            reason,
            group,
            solutions: Vec::new(),
            optional,
            negative,
            eager: !optional,
            merged: Vec::new(),
            dep: None,
        }
    }

    pub fn with_solutions(mut self, solutions: Vec<Var>) -> Self {
        self.solutions = solutions;
        self
    }

    /// Render the clause. `pretty` prints the relation as written in the
    /// package metadata where known; `show_merged` includes the reason and
    /// the merged clauses.
    pub fn to_string(&self, cache: &Cache, pretty: bool, show_merged: bool) -> String {
        let mut out = String::new();
        if show_merged {
            out.push_str(&self.reason.to_string(cache));
        }

        match self.dep {
            Some(dep) if pretty => {
                out.push(' ');
                out.push_str(cache.dep_data(dep).dep_type.as_str());
                out.push(' ');
                let alternatives: Vec<String> = cache
                    .or_group_at(dep)
                    .iter()
                    .map(|&d| cache.relation_string(d))
                    .collect();
                out.push_str(&alternatives.join(" | "));
            }
            _ if pretty && self.group == Group::SelectVersion && self.negative => {
                out.push_str(" conflicts with other versions of itself");
            }
            _ if pretty && self.group == Group::SelectVersion && self.reason.package().is_some() => {
                out.push_str(if self.solutions.len() > 1 {
                    " is available in versions "
                } else {
                    " is available in version "
                });
                let versions: Vec<&str> = self
                    .solutions
                    .iter()
                    .filter_map(|sol| sol.version())
                    .map(|ver| cache.version(ver).version.as_str())
                    .collect();
                out.push_str(&versions.join(", "));
            }
            _ => {
                out.push_str(" -> ");
                for sol in &self.solutions {
                    out.push_str(" | ");
                    out.push_str(&sol.to_string(cache));
                }
            }
        }

        if show_merged {
            for clause in &self.merged {
                out.push_str(" and");
                out.push_str(&clause.to_string(cache, pretty, false));
            }
        }
        out
    }
}

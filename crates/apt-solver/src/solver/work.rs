use std::cmp::Ordering;

use crate::cache::Cache;

use super::clause::{Clause, ClauseId, Group};

/// A pending clause evaluation on the work heap.
///
/// The scheduling key of the clause is captured when the item is created, so
/// the heap can order items without access to the clause arena.
#[derive(Debug, Clone)]
pub struct Work {
    pub clause: ClauseId,
    /// Decision level the item was queued at.
    pub level: usize,
    /// Number of solutions not yet known to be false.
    pub size: usize,
    pub erased: bool,
    optional: bool,
    eager: bool,
    group: Group,
    solutions: usize,
}

impl Work {
    pub fn new(id: ClauseId, clause: &Clause, level: usize) -> Self {
        Self {
            clause: id,
            level,
            size: 0,
            erased: false,
            optional: clause.optional,
            eager: clause.eager,
            group: clause.group,
            solutions: clause.solutions.len(),
        }
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    fn is_unit(&self) -> bool {
        !self.optional && self.size < 2
    }

    /// Whether `self` is less urgent than `other`.
    fn less(&self, other: &Work) -> bool {
        if self.is_unit() != other.is_unit() {
            return other.is_unit();
        }
        if self.eager != other.eager {
            return !self.eager;
        }
        if self.group != other.group {
            return self.group > other.group;
        }
        if (self.size < 2) != (other.size < 2) {
            return other.size < 2;
        }
        // Single remaining choices: the wider original clause goes first, so
        // the clause over all versions of a package beats its install clause.
        if self.size == 1 && other.size == 1 {
            return self.solutions < other.solutions;
        }
        false
    }

    pub fn to_string(&self, cache: &Cache, clause: &Clause) -> String {
        let mut out = String::new();
        if self.erased {
            out.push_str("Erased ");
        }
        if self.optional {
            out.push_str("Optional ");
        }
        let size = if self.size <= clause.solutions.len() {
            self.size as i64
        } else {
            -1
        };
        out.push_str(&format!("Item ({}@{}) ", size, self.level));
        out.push_str(&clause.to_string(cache, false, true));
        out
    }
}

impl PartialEq for Work {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Work {}

impl PartialOrd for Work {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Max-heap order: the most urgent item is the greatest.
impl Ord for Work {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.less(other) {
            Ordering::Less
        } else if other.less(self) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }
}

//! The boolean valuation and the clause-occurrence index WalkSAT flips against.
//!
//! Unlike a CDCL trail, there is no decision level, no reason clause, and no
//! notion of unassigned: every proposition holds a value at all times, and a
//! "move" is simply flipping one. What does need to be fast is, for a given
//! proposition, the set of clauses it appears in positively and the set it
//! appears in negatively — those are consulted on every candidate flip to
//! recompute how many currently-unsatisfied clauses the flip would fix or
//! break. This module keeps that index the way a watch-literal list keeps
//! clause membership: a pair of `Vec<ClauseId>` per proposition rather than a
//! scan over the whole clause database.
use crate::clause::ClauseDb;
use crate::types::{ClauseId, Literal, PropId};

/// API for a proposition's clause-occurrence lists.
pub trait OccurrenceDBIF {
    /// Record that `clause` contains a literal over this proposition with
    /// the given polarity.
    fn register(&mut self, positive: bool, clause: ClauseId);
    /// The clauses in which this proposition occurs with the given polarity.
    fn occurrences(&self, positive: bool) -> &[ClauseId];
}

/// Per-proposition occurrence lists, indexed in parallel with positive and
/// negative polarity.
#[derive(Clone, Debug, Default)]
struct Occurrence {
    positive: Vec<ClauseId>,
    negative: Vec<ClauseId>,
}

impl OccurrenceDBIF for Occurrence {
    fn register(&mut self, positive: bool, clause: ClauseId) {
        if positive {
            self.positive.push(clause);
        } else {
            self.negative.push(clause);
        }
    }
    fn occurrences(&self, positive: bool) -> &[ClauseId] {
        if positive {
            &self.positive
        } else {
            &self.negative
        }
    }
}

/// The current boolean valuation plus the bookkeeping WalkSAT needs to
/// evaluate and perform flips in time proportional to the affected clauses,
/// not the whole clause database.
#[derive(Clone, Debug)]
pub struct Valuation {
    /// `value[p]` is proposition `p`'s current truth value. Index `0` is
    /// unused (see [`crate::types::NULL_PROP`]).
    value: Vec<bool>,
    /// `value[p]`'s occurrence lists, indexed the same way.
    occurrence: Vec<Occurrence>,
    /// `true_count[c]` is the number of `clauses[c]`'s disjuncts currently true.
    true_count: Vec<u32>,
    /// Clauses for which `true_count` falls outside `[min, max]`.
    unsatisfied: Vec<ClauseId>,
    /// `unsatisfied_index[c]` is `Some(i)` iff `unsatisfied[i] == c`, so
    /// membership changes are O(1) instead of a linear scan.
    unsatisfied_index: Vec<Option<usize>>,
}

impl Valuation {
    /// Builds a valuation over `num_props` propositions (`1..=num_props`)
    /// and `clauses`, with the initial truth values given by `initial`
    /// (indexed the same way; entry `0` is ignored).
    pub fn new(num_props: usize, initial: &[bool], clauses: &ClauseDb) -> Valuation {
        let mut value = vec![false; num_props + 1];
        for p in 1..=num_props {
            value[p] = initial.get(p).copied().unwrap_or(false);
        }
        let mut occurrence = vec![Occurrence::default(); num_props + 1];
        for (cid, clause) in clauses.iter_with_ids() {
            for lit in &clause.disjuncts {
                occurrence[lit.prop_id()].register(lit.is_positive(), cid);
            }
        }
        let mut v = Valuation {
            value,
            occurrence,
            true_count: vec![0; clauses.len()],
            unsatisfied: Vec::new(),
            unsatisfied_index: vec![None; clauses.len()],
        };
        v.recompute(clauses);
        v
    }

    /// Recomputes `true_count` and the unsatisfied set from scratch. Called
    /// once at construction and after a random restart reshuffles every value.
    pub fn recompute(&mut self, clauses: &ClauseDb) {
        for c in self.true_count.iter_mut() {
            *c = 0;
        }
        for (cid, clause) in clauses.iter_with_ids() {
            let count = clause
                .disjuncts
                .iter()
                .filter(|l| self.value(l.prop_id()) == l.is_positive())
                .count() as u32;
            self.true_count[cid] = count;
        }
        self.unsatisfied.clear();
        for i in self.unsatisfied_index.iter_mut() {
            *i = None;
        }
        for (cid, clause) in clauses.iter_with_ids() {
            if !clause.is_satisfied_by_count(self.true_count[cid]) {
                self.mark_unsatisfied(cid);
            }
        }
    }

    pub fn value(&self, p: PropId) -> bool {
        self.value[p]
    }

    pub fn num_props(&self) -> usize {
        self.value.len() - 1
    }

    pub fn is_satisfied(&self, lit: Literal) -> bool {
        self.value(lit.prop_id()) == lit.is_positive()
    }

    /// Clauses currently outside their `[min, max]` satisfaction range.
    pub fn unsatisfied(&self) -> &[ClauseId] {
        &self.unsatisfied
    }

    pub fn is_fully_satisfied(&self) -> bool {
        self.unsatisfied.is_empty()
    }

    /// The occurrence list for `p` at the polarity it currently does *not*
    /// hold — i.e. the clauses that would gain a true disjunct if `p` flipped.
    pub fn occurrences_gained_by_flip(&self, p: PropId) -> &[ClauseId] {
        self.occurrence[p].occurrences(!self.value(p))
    }

    /// The occurrence list for `p` at the polarity it currently holds — the
    /// clauses that would lose a true disjunct if `p` flipped.
    pub fn occurrences_lost_by_flip(&self, p: PropId) -> &[ClauseId] {
        self.occurrence[p].occurrences(self.value(p))
    }

    /// Flips proposition `p` and updates `true_count`/`unsatisfied` for every
    /// clause it occurs in.
    pub fn flip(&mut self, p: PropId, clauses: &ClauseDb) {
        for &cid in self.occurrence[p].occurrences(self.value(p)) {
            self.true_count[cid] -= 1;
            self.update_membership(cid, clauses);
        }
        for &cid in self.occurrence[p].occurrences(!self.value(p)) {
            self.true_count[cid] += 1;
            self.update_membership(cid, clauses);
        }
        self.value[p] = !self.value[p];
    }

    /// How many currently-true disjuncts clause `cid` has.
    pub fn true_count(&self, cid: ClauseId) -> u32 {
        self.true_count[cid]
    }

    fn update_membership(&mut self, cid: ClauseId, clauses: &ClauseDb) {
        let satisfied = clauses.get(cid).is_satisfied_by_count(self.true_count[cid]);
        match (satisfied, self.unsatisfied_index[cid]) {
            (true, Some(_)) => self.unmark_unsatisfied(cid),
            (false, None) => self.mark_unsatisfied(cid),
            _ => {}
        }
    }

    fn mark_unsatisfied(&mut self, cid: ClauseId) {
        self.unsatisfied_index[cid] = Some(self.unsatisfied.len());
        self.unsatisfied.push(cid);
    }

    fn unmark_unsatisfied(&mut self, cid: ClauseId) {
        if let Some(i) = self.unsatisfied_index[cid].take() {
            let last = self.unsatisfied.pop().expect("unsatisfied set nonempty");
            if i < self.unsatisfied.len() {
                self.unsatisfied[i] = last;
                self.unsatisfied_index[last] = Some(i);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::Clause;

    fn db(clauses: Vec<Clause>) -> ClauseDb {
        let mut db = ClauseDb::new();
        for c in clauses {
            db.push(c);
        }
        db
    }

    #[test]
    fn flip_updates_true_count_and_unsatisfied_set() {
        let clauses = db(vec![Clause::or(vec![Literal::new(1, true), Literal::new(2, true)])]);
        let mut v = Valuation::new(2, &[false, false, false], &clauses);
        assert_eq!(v.unsatisfied(), &[0]);
        v.flip(1, &clauses);
        assert!(v.is_fully_satisfied());
        assert_eq!(v.true_count(0), 1);
        v.flip(1, &clauses);
        assert_eq!(v.unsatisfied(), &[0]);
    }

    #[test]
    fn cardinality_clause_tracks_count_within_window() {
        let clauses = db(vec![Clause::new(
            1,
            1,
            vec![Literal::new(1, true), Literal::new(2, true), Literal::new(3, true)],
        )]);
        let mut v = Valuation::new(3, &[false, true, false, false], &clauses);
        assert!(v.is_fully_satisfied());
        v.flip(2, &clauses);
        assert!(v.is_fully_satisfied());
        v.flip(1, &clauses);
        assert!(!v.is_fully_satisfied());
    }
}

//! The seam between the boolean WalkSAT core and an arithmetic theory such
//! as [`crate::float::FloatTheory`].
//!
//! A theory gets three hooks, called in this order for every `solve()`:
//! [`TheorySolver::preprocess`] once, at `finalize()` time, to add whatever
//! clauses it needs the boolean solver to respect (e.g. bound-implication
//! clauses derived from constant bounds); [`TheorySolver::propagate_predetermined`]
//! once per search attempt, to fix any propositions whose value the theory
//! can already determine before a single flip happens; and
//! [`TheorySolver::solve`] once per *candidate* boolean model WalkSAT finds,
//! to check whether that model's float obligations are jointly satisfiable
//! and, if so, produce a witness assignment.
use rand::rngs::SmallRng;

use crate::assign::Valuation;
use crate::builder::Problem;
use crate::error::Error;

/// A theory layered on top of the boolean core.
///
/// Only one theory is attached per [`Problem`]; a crate wanting several
/// theories composes them behind a single `TheorySolver` impl rather than
/// this trait supporting a list.
pub trait TheorySolver {
    /// Called once during `finalize()`. May register additional clauses on
    /// `problem` (e.g. via `problem.assert_clause`) encoding facts the
    /// theory can derive statically, such as transitive bounds between
    /// constant-bounded variables.
    fn preprocess(&mut self, problem: &mut Problem) -> Result<(), Error>;

    /// Called once per search attempt, before the first flip. Returns the
    /// set of propositions (by [`crate::types::PropId`]) whose value is
    /// forced by the theory regardless of the rest of the boolean model,
    /// paired with the forced value, so the solver can fix them instead of
    /// spending flips discovering the same thing by trial and error.
    fn propagate_predetermined(&mut self, problem: &Problem) -> Vec<(usize, bool)>;

    /// Called whenever WalkSAT reaches a fully boolean-satisfying valuation.
    /// Returns `Some(values)` (indexed by [`crate::types::FloatVarId`]) if
    /// the float obligations implied by `valuation`'s true propositions are
    /// jointly satisfiable, `None` if this boolean model admits no witness
    /// and the search should keep flipping. `rng` drives the randomized
    /// sampling used to pick a witness point inside the narrowed intervals.
    fn solve(&mut self, problem: &Problem, valuation: &Valuation, rng: &mut SmallRng) -> Option<Vec<f32>>;
}

/// The theory used when a [`Problem`] declares no float variables: every
/// hook is a no-op, so a boolean-only model never pays for the seam.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullTheory;

impl TheorySolver for NullTheory {
    fn preprocess(&mut self, _problem: &mut Problem) -> Result<(), Error> {
        Ok(())
    }
    fn propagate_predetermined(&mut self, _problem: &Problem) -> Vec<(usize, bool)> {
        Vec::new()
    }
    fn solve(&mut self, _problem: &Problem, _valuation: &Valuation, _rng: &mut SmallRng) -> Option<Vec<f32>> {
        Some(Vec::new())
    }
}

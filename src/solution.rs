//! The model a successful [`crate::builder::Problem::solve`] produces.
use std::fmt;
use std::ops::Index;

use crate::assign::Valuation;
use crate::builder::Problem;
use crate::types::{FloatVarId, Literal, PropId};

/// A model: a truth value for every proposition and a value for every float
/// variable, both consistent with the problem that produced them.
#[derive(Clone, Debug)]
pub struct Solution {
    values: Vec<bool>,
    float_values: Vec<f32>,
}

impl Solution {
    pub(crate) fn new(valuation: Valuation, float_values: Vec<f32>, problem: &Problem) -> Solution {
        let mut values = vec![false; problem.num_propositions() + 1];
        for p in 1..=problem.num_propositions() {
            values[p] = valuation.value(p);
        }
        Solution { values, float_values }
    }

    /// The truth value of proposition `p` in this model.
    pub fn value(&self, p: PropId) -> bool {
        self.values[p]
    }

    /// `true` iff `lit` holds in this model.
    pub fn is_true(&self, lit: Literal) -> bool {
        self.value(lit.prop_id()) == lit.is_positive()
    }

    /// The value assigned to a float variable in this model.
    pub fn float_value(&self, var: FloatVarId) -> f32 {
        self.float_values[var.0]
    }

    /// Independently re-checks this solution against `problem`. See
    /// [`crate::validator::validate`].
    pub fn validate(&self, problem: &Problem) -> Result<(), Vec<crate::validator::Violation>> {
        crate::validator::validate(problem, self)
    }
}

/// Indexes by the literal's proposition, ignoring its polarity — use
/// [`Solution::is_true`] if you want the literal's truth value rather than
/// its proposition's.
impl Index<Literal> for Solution {
    type Output = bool;
    fn index(&self, lit: Literal) -> &bool {
        &self.values[lit.prop_id()]
    }
}

impl Index<FloatVarId> for Solution {
    type Output = f32;
    fn index(&self, var: FloatVarId) -> &f32 {
        &self.float_values[var.0]
    }
}

impl FloatVarId {
    /// The value this variable was assigned in `solution`; spec.md §6's
    /// `FloatVariable.Value(solution) -> float`, expressed on the handle
    /// rather than on a borrowed `FloatVariable` since variables live in the
    /// problem's arena, not as freestanding owned objects.
    pub fn value(self, solution: &Solution) -> f32 {
        solution.float_value(self)
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.values.iter().enumerate().skip(1) {
            if i > 1 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", i, v)?;
        }
        write!(f, "]")
    }
}

//! Independent re-checking of a [`Solution`] against the [`Problem`] that
//! produced it — useful for tests and for a caller who wants to confirm a
//! solution survives serialization/deserialization round trips.
use crate::builder::Problem;
use crate::float::FloatViolation;
use crate::solution::Solution;
use crate::types::FloatVarId;

/// A single constraint a [`Solution`] failed to satisfy.
#[derive(Clone, Debug, PartialEq)]
pub enum Violation {
    /// Clause index `clause` had `true_count` true disjuncts, outside `[min, max]`.
    Clause { clause: usize, true_count: u32, min: u32, max: u32 },
    /// Float variable `var` held a value outside its theory's narrowed bounds.
    FloatOutOfBounds { var: usize, value: f32 },
    /// Float variable `var`'s value was not a multiple of its quantization step.
    NotQuantized { var: usize, value: f32, step: f32 },
    /// A bound, variable bound, or functional constraint the float theory
    /// asserts true in this model did not hold of the sampled values.
    Float(FloatViolation),
}

/// Re-checks every clause (after Clark completion) and every float variable's
/// declared domain/quantization against `solution`. Does *not* re-run the
/// float theory's constraint propagation — it checks the witness values
/// directly satisfy the declared domains, which is necessarily implied by a
/// correctly-functioning theory but is worth checking independently of it.
pub fn validate(problem: &Problem, solution: &Solution) -> Result<(), Vec<Violation>> {
    let mut violations = Vec::new();

    for (cid, clause) in problem.clauses().iter_with_ids() {
        let true_count = clause
            .disjuncts
            .iter()
            .filter(|lit| solution.is_true(**lit))
            .count() as u32;
        if !clause.is_satisfied_by_count(true_count) {
            violations.push(Violation::Clause { clause: cid, true_count, min: clause.min, max: clause.max });
        }
    }

    let mut float_values = Vec::with_capacity(problem.float().num_variables());
    for i in 0..problem.float().num_variables() {
        let var = FloatVarId(i);
        let value = solution.float_value(var);
        float_values.push(value);
        let decl = &problem.float().variable_info(i);
        if !decl.domain.contains(value) {
            violations.push(Violation::FloatOutOfBounds { var: i, value });
        }
        if decl.quantization > 0.0 {
            let steps = value / decl.quantization;
            if (steps - steps.round()).abs() > problem.config().quantization_tolerance {
                violations.push(Violation::NotQuantized { var: i, value, step: decl.quantization });
            }
        }
    }
    violations.extend(
        problem
            .float()
            .check(|lit| solution.is_true(lit), &float_values, problem.config().quantization_tolerance)
            .into_iter()
            .map(Violation::Float),
    );

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn a_clean_solve_validates() {
        let mut p = Problem::new(Config::with_seed(3));
        let a = p.proposition("a");
        let b = p.proposition("b");
        p.exists(vec![a, b]).unwrap();
        p.finalize().unwrap();
        let solution = p.solve().expect("solvable");
        assert_eq!(validate(&p, &solution), Ok(()));
    }
}

//! End-to-end scenarios exercising the float theory: constant bounds tied to
//! boolean propositions, the preprocess-time transitivity clauses between
//! them, and quantized domains.
use catsat::interval::Interval;
use catsat::prelude::*;

#[test]
fn unit_interval_with_four_bound_propositions() {
    let mut problem = Problem::new(Config::with_seed(4));
    let x = problem.floats().variable("x", Interval::new(0.0, 1.0), 0.0);

    let x_ge_quarter = problem.proposition("x_ge_quarter");
    let x_ge_half = problem.proposition("x_ge_half");
    let x_le_three_quarters = problem.proposition("x_le_three_quarters");
    let x_le_full = problem.proposition("x_le_full");

    problem.floats().bound_ge(x, x_ge_quarter, 0.25);
    problem.floats().bound_ge(x, x_ge_half, 0.5);
    problem.floats().bound_le(x, x_le_three_quarters, 0.75);
    problem.floats().bound_le(x, x_le_full, 1.0);

    // force the tighter bounds true; the looser ones must follow by
    // the transitivity clauses `finalize()` derives, not a direct assertion.
    problem.assert(x_ge_half).unwrap();
    problem.assert(x_le_three_quarters).unwrap();

    problem.finalize().unwrap();
    let solution = problem.solve().expect("0.5 <= x <= 0.75 is satisfiable");
    assert_eq!(solution.validate(&problem), Ok(()));

    assert!(solution.is_true(x_ge_quarter), "x>=0.5 must imply x>=0.25");
    assert!(solution.is_true(x_le_full), "x<=0.75 must imply x<=1.0");
    let v = solution.float_value(x);
    assert!((0.5..=0.75).contains(&v), "x={v} out of range");
}

#[test]
fn quantized_domain_samples_on_grid() {
    let mut problem = Problem::new(Config::with_seed(9));
    let step = problem.floats().variable("step_count", Interval::new(0.0, 10.0), 2.0);

    problem.finalize().unwrap();
    let solution = problem.solve().expect("dense domain is trivially satisfiable");
    let v = solution.float_value(step);
    let multiple = (v / 2.0).round() * 2.0;
    assert!((v - multiple).abs() < 1e-3, "{v} is not a multiple of 2.0");
}

#[test]
fn transitive_constant_bounds_are_derived_at_finalize() {
    let mut problem = Problem::new(Config::with_seed(12));
    let y = problem.floats().variable("y", Interval::new(0.0, 100.0), 0.0);

    let y_ge_10 = problem.proposition("y_ge_10");
    let y_ge_50 = problem.proposition("y_ge_50");
    problem.floats().bound_ge(y, y_ge_10, 10.0);
    problem.floats().bound_ge(y, y_ge_50, 50.0);

    problem.assert(y_ge_50).unwrap();
    problem.finalize().unwrap();

    let solution = problem.solve().expect("y>=50 is satisfiable");
    assert!(solution.is_true(y_ge_10), "y>=50 must transitively force y>=10");
    assert!(solution.float_value(y) >= 50.0);
}

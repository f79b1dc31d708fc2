//! The WalkSAT search loop: random restarts of greedy-with-noise flipping,
//! with the float theory consulted every time a candidate model is reached.
use log::{debug, info, trace};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::assign::Valuation;
use crate::builder::Problem;
use crate::clause::ClauseDb;
use crate::config::Config;
use crate::float::FloatTheory;
use crate::solution::Solution;
use crate::theory::TheorySolver;
use crate::types::PropId;

/// Runs the configured number of tries/flips against `problem`, consulting
/// its float theory on every fully boolean-satisfying valuation. Returns
/// `None` if no model is found within budget.
pub fn solve(problem: &mut Problem) -> Option<Solution> {
    let config = problem.config().clone();
    let mut rng = match config.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    };

    info!(
        "starting search: {} propositions, {} clauses, {} tries x {} flips",
        problem.num_propositions(),
        problem.clauses().len(),
        config.max_tries,
        config.max_flips
    );

    // Held separately from `problem` for the duration of the search so the
    // theory can be called with a plain `&Problem` alongside its own
    // `&mut self`, instead of fighting the borrow checker over one field.
    let mut float = problem.take_float();
    let result = search(problem, &mut float, &mut rng, &config);
    problem.restore_float(float);
    result
}

fn search(problem: &Problem, float: &mut FloatTheory, rng: &mut SmallRng, config: &Config) -> Option<Solution> {
    let num_props = problem.num_propositions();
    // Propositions the theory hook is allowed to perturb when it rejects a
    // candidate model: every non-constant variable, since a constant's value
    // is pinned for the whole search (see `Problem::constant_true`/`constant_false`).
    let non_constant: Vec<PropId> = (1..=num_props).filter(|p| !problem.forced_values().contains_key(p)).collect();
    for attempt in 0..config.max_tries.max(1) {
        let mut initial = vec![false; num_props + 1];
        for p in 1..=num_props {
            initial[p] = rng.gen_bool(0.5);
        }
        for (&p, &v) in problem.forced_values() {
            initial[p] = v;
        }
        for (p, v) in float.propagate_predetermined(problem) {
            initial[p] = v;
        }

        let mut valuation = Valuation::new(num_props, &initial, problem.clauses());
        debug!("attempt {attempt}: {} clauses initially unsatisfied", valuation.unsatisfied().len());

        for flip in 0..config.max_flips {
            if valuation.is_fully_satisfied() {
                trace!("attempt {attempt}: boolean model found after {flip} flips");
                for float_try in 0..config.max_float_tries.max(1) {
                    if let Some(values) = float.solve(problem, &valuation, rng) {
                        info!("solution found on attempt {attempt}, float try {float_try}");
                        return Some(Solution::new(valuation, values, problem));
                    }
                }
                trace!("attempt {attempt}: boolean model admits no float witness, perturbing and resuming search");
                // Spec: keep flipping from the current assignment rather than
                // restarting with a fresh random one. There is no unsatisfied
                // clause to drive `choose_flip`, so perturb a uniformly random
                // non-constant variable instead, same as the noise move.
                if !non_constant.is_empty() {
                    let p = non_constant[rng.gen_range(0..non_constant.len())];
                    valuation.flip(p, problem.clauses());
                }
                continue;
            }
            let p = choose_flip(&valuation, problem.clauses(), rng, config.noise);
            valuation.flip(p, problem.clauses());
        }
    }
    None
}

/// Picks the proposition to flip next: with probability `noise%`, a uniformly
/// random variable from some unsatisfied clause (a "random walk" step);
/// otherwise the variable whose flip causes the fewest clauses to become
/// newly unsatisfied (breaking ties by preferring more clauses newly
/// satisfied, then uniformly at random).
fn choose_flip(valuation: &Valuation, clauses: &ClauseDb, rng: &mut SmallRng, noise: u8) -> PropId {
    let unsatisfied = valuation.unsatisfied();
    debug_assert!(!unsatisfied.is_empty());
    let pick_clause = unsatisfied[rng.gen_range(0..unsatisfied.len())];
    let candidates = &clauses.get(pick_clause).disjuncts;

    if rng.gen_range(0..100) < noise as u32 {
        return candidates[rng.gen_range(0..candidates.len())].prop_id();
    }

    let mut best_break = u32::MAX;
    let mut best_make = 0u32;
    let mut best: Vec<PropId> = Vec::new();
    for lit in candidates {
        let p = lit.prop_id();
        let broken = flip_break_count(valuation, clauses, p);
        let made = flip_make_count(valuation, clauses, p);
        if broken < best_break || (broken == best_break && made > best_make) {
            best_break = broken;
            best_make = made;
            best.clear();
            best.push(p);
        } else if broken == best_break && made == best_make {
            best.push(p);
        }
    }
    best[rng.gen_range(0..best.len())]
}

/// How many currently-satisfied clauses would become unsatisfied if `p` flipped.
fn flip_break_count(valuation: &Valuation, clauses: &ClauseDb, p: PropId) -> u32 {
    valuation
        .occurrences_lost_by_flip(p)
        .iter()
        .filter(|&&cid| {
            let clause = clauses.get(cid);
            let after = valuation.true_count(cid) - 1;
            clause.is_satisfied_by_count(valuation.true_count(cid)) && !clause.is_satisfied_by_count(after)
        })
        .count() as u32
}

/// How many currently-unsatisfied clauses would become satisfied if `p` flipped.
fn flip_make_count(valuation: &Valuation, clauses: &ClauseDb, p: PropId) -> u32 {
    valuation
        .occurrences_gained_by_flip(p)
        .iter()
        .filter(|&&cid| {
            let clause = clauses.get(cid);
            let after = valuation.true_count(cid) + 1;
            !clause.is_satisfied_by_count(valuation.true_count(cid)) && clause.is_satisfied_by_count(after)
        })
        .count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Problem;
    use crate::config::Config;

    #[test]
    fn trivial_satisfiable_problem_is_solved() {
        let mut p = Problem::new(Config::with_seed(42));
        let a = p.proposition("a");
        let b = p.proposition("b");
        p.exists(vec![a, b]).unwrap();
        p.finalize().unwrap();
        assert!(solve(&mut p).is_some());
    }

    #[test]
    fn contradictory_unit_clauses_are_caught_by_unit_propagation() {
        let mut config = Config::with_seed(7);
        config.max_tries = 2;
        config.max_flips = 50;
        let mut p = Problem::new(config);
        let a = p.proposition("a");
        p.assert(a).unwrap();
        p.assert(a.negate()).unwrap();
        assert_eq!(p.finalize(), Err(crate::error::Error::UnsatAtCompileTime));
    }

    #[test]
    fn contradictory_cardinality_clauses_fail_within_budget() {
        // `unit_propagate` only reasons about normal (OR) clauses, so a
        // contradiction expressed through cardinality clauses still has to
        // be discovered by search instead of at compile time.
        let mut config = Config::with_seed(7);
        config.max_tries = 2;
        config.max_flips = 50;
        let mut p = Problem::new(config);
        let a = p.proposition("a");
        let b = p.proposition("b");
        p.assert_clause(2, 2, vec![a, b.negate()]).unwrap();
        p.assert_clause(0, 0, vec![a, b.negate()]).unwrap();
        p.finalize().unwrap();
        assert!(solve(&mut p).is_none());
    }
}

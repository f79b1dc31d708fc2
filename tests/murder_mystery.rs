//! A small "logic puzzle" scenario: exactly one of three suspects is the
//! murderer, ruling two out through implications built from evidence
//! propositions rather than direct assertion.
use catsat::prelude::*;

#[test]
fn exactly_one_suspect_is_guilty() {
    let mut problem = Problem::new(Config::with_seed(1888));

    let scarlett = problem.proposition("scarlett_did_it");
    let plum = problem.proposition("plum_did_it");
    let mustard = problem.proposition("mustard_did_it");

    let has_alibi = problem.proposition("mustard_has_alibi");
    problem.assert(has_alibi).unwrap();
    // an alibi clears mustard
    problem.assert_implication(has_alibi, mustard.negate()).unwrap();

    let left_handed_evidence = problem.proposition("killer_was_left_handed");
    problem.assert(left_handed_evidence.negate()).unwrap();
    // plum is right-handed, so he's only a suspect if the killer was left-handed
    problem.assert_implication(plum, left_handed_evidence).unwrap();

    problem.unique(vec![scarlett, plum, mustard]).unwrap();

    problem.finalize().unwrap();
    let solution = problem.solve().expect("puzzle is solvable");
    assert_eq!(solution.validate(&problem), Ok(()));

    assert!(solution.is_true(scarlett));
    assert!(!solution.is_true(plum));
    assert!(!solution.is_true(mustard));
}

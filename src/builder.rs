//! Crate `builder` implements the problem-declaration API: proposition
//! interning, clause/rule assertion, Clark completion, and the `finalize`/
//! `solve` entry points.
use std::collections::{HashMap, HashSet};

use crate::clause::{Call, Clause, ClauseDb, PropositionName, Term};
use crate::config::Config;
use crate::error::{Error, Unsatisfiable};
use crate::float::FloatTheory;
use crate::solution::Solution;
use crate::theory::TheorySolver;
use crate::types::{Literal, PropId};

/// A rule `head :- body`: `head` becomes true exactly when some rule with
/// that head has every literal in its `body` true (supported-model /
/// Clark-completion semantics).
#[derive(Clone, Debug)]
struct Rule {
    head: Literal,
    body: Vec<Literal>,
}

/// A callable factory returned by [`Problem::predicate`]: binds a predicate
/// symbol once so repeated calls with different argument tuples intern
/// propositions keyed by `(name, args…)` without re-spelling the symbol.
#[derive(Clone, Debug)]
pub struct Predicate {
    name: String,
}

impl Predicate {
    /// Interns (or looks up) the proposition `name(args…)`.
    pub fn of(&self, problem: &mut Problem, args: Vec<Term>) -> Literal {
        problem.proposition(Call::new(self.name.clone(), args))
    }
}

/// A constraint-satisfaction problem under construction: propositions,
/// clauses, rules and float variables accumulate here until [`Problem::finalize`]
/// compiles them into the form the solver consumes.
pub struct Problem {
    config: Config,
    clauses: ClauseDb,
    prop_names: Vec<Option<PropositionName>>,
    prop_index: HashMap<PropositionName, PropId>,
    rules: Vec<Rule>,
    /// Propositions that occur positively in some rule body — the only
    /// propositions a functional constraint is forbidden to depend on
    /// a functional-constraint result/argument may never be one of these,
    /// since its truth probability is effectively zero.
    dependency: HashSet<PropId>,
    finalized: bool,
    float: FloatTheory,
    constant_true: Option<PropId>,
    constant_false: Option<PropId>,
    /// Propositions pinned to a value by [`Problem::unit_propagate`], fed to
    /// the solver as a starting assignment instead of a coin flip.
    forced: HashMap<PropId, bool>,
    /// Source of fresh names for synthetic propositions (`$and_N`, …),
    /// separate from the per-head counters `complete_rules` uses so the two
    /// schemes never collide.
    aux_counter: usize,
}

impl Default for Problem {
    fn default() -> Problem {
        Problem::new(Config::default())
    }
}

impl Problem {
    /// Builds an empty problem with the given search parameters.
    pub fn new(config: Config) -> Problem {
        Problem {
            config,
            clauses: ClauseDb::new(),
            prop_names: vec![None],
            prop_index: HashMap::new(),
            rules: Vec::new(),
            dependency: HashSet::new(),
            finalized: false,
            float: FloatTheory::default(),
            constant_true: None,
            constant_false: None,
            forced: HashMap::new(),
            aux_counter: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Interns `name`, returning the positive literal of its proposition.
    /// Calling this twice with an equal name returns the same literal.
    pub fn proposition(&mut self, name: impl Into<PropositionName>) -> Literal {
        let name = name.into();
        if let Some(&id) = self.prop_index.get(&name) {
            return Literal::new(id, true);
        }
        self.prop_names.push(Some(name.clone()));
        let id = self.prop_names.len() - 1;
        self.prop_index.insert(name, id);
        Literal::new(id, true)
    }

    /// Looks up a previously-interned proposition without creating one.
    pub fn get_proposition(&self, name: impl Into<PropositionName>) -> Option<Literal> {
        self.prop_index.get(&name.into()).map(|&id| Literal::new(id, true))
    }

    pub fn proposition_name(&self, id: PropId) -> Option<&PropositionName> {
        self.prop_names.get(id).and_then(|n| n.as_ref())
    }

    pub fn num_propositions(&self) -> usize {
        self.prop_names.len() - 1
    }

    /// A literal that is true in every model. Asserting its negation is an error.
    pub fn constant_true(&mut self) -> Literal {
        if let Some(id) = self.constant_true {
            return Literal::new(id, true);
        }
        let lit = self.proposition("$true");
        self.constant_true = Some(lit.prop_id());
        // Pin the value: a unit clause so the boolean search must respect it,
        // and a forced entry so the initial assignment already does.
        self.clauses.push(Clause::or(vec![lit]));
        self.forced.insert(lit.prop_id(), true);
        lit
    }

    /// A literal that is false in every model. Asserting it is an error.
    pub fn constant_false(&mut self) -> Literal {
        if let Some(id) = self.constant_false {
            return Literal::new(id, true);
        }
        let lit = self.proposition("$false");
        self.constant_false = Some(lit.prop_id());
        self.clauses.push(Clause::or(vec![lit.negate()]));
        self.forced.insert(lit.prop_id(), false);
        lit
    }

    fn is_asserting_false(&self, lit: Literal) -> bool {
        (self.constant_false == Some(lit.prop_id()) && lit.is_positive())
            || (self.constant_true == Some(lit.prop_id()) && !lit.is_positive())
    }

    /// Asserts a single literal as a hard fact.
    pub fn assert(&mut self, lit: Literal) -> Result<(), Error> {
        self.assert_clause(1, 0, vec![lit])
    }

    /// Asserts a generalized cardinality clause: `[min, max]` of `disjuncts`
    /// must be true (`max == 0` means unbounded above).
    pub fn assert_clause(&mut self, min: u32, max: u32, disjuncts: Vec<Literal>) -> Result<(), Error> {
        if self.finalized {
            return Err(Error::ProgramFinalized);
        }
        if disjuncts.len() == 1 && min == 1 && self.is_asserting_false(disjuncts[0]) {
            return Err(Error::AssertedFalse);
        }
        self.clauses.push(Clause::new(min, max, disjuncts));
        Ok(())
    }

    /// Asserts `a => b`.
    pub fn assert_implication(&mut self, a: Literal, b: Literal) -> Result<(), Error> {
        self.assert_clause(1, 0, vec![a.negate(), b])
    }

    /// Asserts `a <-> b`.
    pub fn assert_biconditional(&mut self, a: Literal, b: Literal) -> Result<(), Error> {
        self.assert_clause(1, 0, vec![a.negate(), b])?;
        self.assert_clause(1, 0, vec![b.negate(), a])
    }

    /// Asserts every literal in `lits` as a hard fact.
    pub fn assert_conjunction(&mut self, lits: impl IntoIterator<Item = Literal>) -> Result<(), Error> {
        for lit in lits {
            self.assert(lit)?;
        }
        Ok(())
    }

    /// Declares a rule: `head` becomes true iff some such rule's `body` is
    /// fully true. Several rules may share a head; they are OR'd together
    /// by [`Problem::finalize`]'s Clark completion. `head` must be a
    /// proposition's positive literal (the conventional "rule head is an
    /// atom" restriction) — to define a negative fact conditionally, give
    /// the negated proposition its own name and rule that instead.
    pub fn rule(&mut self, head: Literal, body: Vec<Literal>) -> Result<(), Error> {
        if self.finalized {
            return Err(Error::ProgramFinalized);
        }
        debug_assert!(head.is_positive(), "rule heads must be positive literals");
        if self.constant_true == Some(head.prop_id()) || self.constant_false == Some(head.prop_id()) {
            return Err(Error::ConstantRuleHead);
        }
        for lit in &body {
            if lit.is_positive() {
                self.dependency.insert(lit.prop_id());
            }
        }
        self.rules.push(Rule { head, body });
        Ok(())
    }

    /// `true` iff `p` occurs positively in some rule body: the only
    /// propositions functional constraints may not depend on.
    pub fn is_dependency(&self, p: PropId) -> bool {
        self.dependency.contains(&p)
    }

    /// At least one of `props` is true.
    pub fn exists(&mut self, props: Vec<Literal>) -> Result<(), Error> {
        self.assert_clause(1, 0, props)
    }
    /// Every one of `props` is true.
    pub fn all(&mut self, props: Vec<Literal>) -> Result<(), Error> {
        self.assert_conjunction(props)
    }
    /// Exactly one of `props` is true.
    pub fn unique(&mut self, props: Vec<Literal>) -> Result<(), Error> {
        let n = props.len() as u32;
        self.assert_clause(1.min(n), 1, props)
    }
    /// Exactly `n` of `props` are true.
    pub fn exactly(&mut self, n: u32, props: Vec<Literal>) -> Result<(), Error> {
        self.assert_clause(n, n, props)
    }
    /// At most `n` of `props` are true.
    pub fn at_most(&mut self, n: u32, props: Vec<Literal>) -> Result<(), Error> {
        self.assert_clause(0, n, props)
    }
    /// At least `n` of `props` are true.
    pub fn at_least(&mut self, n: u32, props: Vec<Literal>) -> Result<(), Error> {
        self.assert_clause(n, 0, props)
    }

    /// The negation of `lit`. A thin wrapper around [`Literal::negate`] kept
    /// here so `problem.not(lit)` reads next to `problem.and(lits)` at a
    /// call site, matching spec.md §6's `And`/`Not` combinator pairing.
    pub fn not(&self, lit: Literal) -> Literal {
        lit.negate()
    }

    /// A fresh proposition biconditional to the conjunction of `lits`:
    /// `aux <-> (l1 & l2 & ... & lk)`. Unlike [`Problem::rule`], this is a
    /// plain logical definition compiled directly to clauses, not a
    /// logic-programming rule subject to Clark completion — `and` always
    /// produces a *new* proposition rather than adding support for an
    /// existing head.
    pub fn and(&mut self, lits: Vec<Literal>) -> Literal {
        let aux = self.proposition(format!("$and_{}", self.aux_counter));
        self.aux_counter += 1;
        for &lit in &lits {
            self.assert_clause(1, 0, vec![aux.negate(), lit]).expect("fresh aux literal cannot be a constant");
        }
        let mut clause: Vec<Literal> = lits.iter().map(|l| l.negate()).collect();
        clause.push(aux);
        self.assert_clause(1, 0, clause).expect("fresh aux literal cannot be a constant");
        aux
    }

    /// A callable factory that interns propositions keyed by `(name, args…)`,
    /// e.g. `let rook = problem.predicate("rook"); rook.of(&mut problem, vec![Term::Int(1), Term::Int(2)])`.
    /// Exists so call sites can build a family of related propositions
    /// without repeating the predicate symbol at every call, mirroring
    /// spec.md §6's `Predicate<…>(name)`.
    pub fn predicate(&self, name: impl Into<String>) -> Predicate {
        Predicate { name: name.into() }
    }

    /// Access to the float theory's declaration API (variable and
    /// functional-constraint registration). Panics if called after
    /// [`Problem::finalize`].
    pub fn floats(&mut self) -> &mut FloatTheory {
        assert!(!self.finalized, "float variables cannot be declared after finalize()");
        &mut self.float
    }

    /// `var >= value`, as a proposition (memoized: the same call returns the
    /// same literal). The Rust-idiomatic form of spec.md §6's infix `>`
    /// against a constant — the float theory's [`crate::float::FloatTheory`]
    /// `ConstantBound` only tracks `<=`/`>=` (see spec.md §3), so `>` and
    /// `>=` compile to the same non-strict bound.
    pub fn float_ge(&mut self, var: crate::types::FloatVarId, value: f32) -> Literal {
        if let Some(lit) = self.float.cached_bound(var, true, value) {
            return lit;
        }
        let lit = self.proposition(format!("$ge_{}_{:x}", var.0, value.to_bits()));
        self.float.bound_ge(var, lit, value);
        self.float.cache_bound(var, true, value, lit);
        lit
    }

    /// `var <= value`, as a proposition (memoized). See [`Problem::float_ge`].
    pub fn float_le(&mut self, var: crate::types::FloatVarId, value: f32) -> Literal {
        if let Some(lit) = self.float.cached_bound(var, false, value) {
            return lit;
        }
        let lit = self.proposition(format!("$le_{}_{:x}", var.0, value.to_bits()));
        self.float.bound_le(var, lit, value);
        self.float.cache_bound(var, false, value, lit);
        lit
    }

    /// `var > value`. Alias for [`Problem::float_ge`]: see its doc comment
    /// for why the strict and non-strict forms share one representation.
    pub fn float_gt(&mut self, var: crate::types::FloatVarId, value: f32) -> Literal {
        self.float_ge(var, value)
    }

    /// `var < value`. Alias for [`Problem::float_le`].
    pub fn float_lt(&mut self, var: crate::types::FloatVarId, value: f32) -> Literal {
        self.float_le(var, value)
    }

    /// `lesser <= greater`, as a proposition between two variables (memoized).
    pub fn float_le_var(&mut self, lesser: crate::types::FloatVarId, greater: crate::types::FloatVarId) -> Literal {
        if let Some(lit) = self.float.cached_vbound(lesser, greater) {
            return lit;
        }
        let lit = self.proposition(format!("$vle_{}_{}", lesser.0, greater.0));
        self.float.variable_bound_le(lesser, greater, lit);
        self.float.cache_vbound(lesser, greater, lit);
        lit
    }

    /// `greater >= lesser`, i.e. the same proposition as
    /// `float_le_var(lesser, greater)` with the operands named the other way.
    pub fn float_ge_var(&mut self, greater: crate::types::FloatVarId, lesser: crate::types::FloatVarId) -> Literal {
        self.float_le_var(lesser, greater)
    }

    /// `a == b` between two float variables, true only *in this candidate
    /// model* while the returned literal holds (as opposed to
    /// [`crate::float::FloatTheory::equal`], which permanently merges `a`
    /// and `b`'s equivalence classes at declaration time — see DESIGN.md's
    /// "Permanent vs. per-model variable equality"). Compiled as a pair of
    /// variable bounds sharing one literal: `a <= b` and `b <= a` both
    /// active exactly when that literal is true.
    pub fn float_eq_var(&mut self, a: crate::types::FloatVarId, b: crate::types::FloatVarId) -> Literal {
        if let Some(lit) = self.float.cached_veq(a, b) {
            return lit;
        }
        let lit = self.proposition(format!("$veq_{}_{}", a.0.min(b.0), a.0.max(b.0)));
        self.float.variable_bound_le(a, b, lit);
        self.float.variable_bound_le(b, a, lit);
        self.float.cache_veq(a, b, lit);
        lit
    }

    /// `true` once [`Problem::finalize`] has run.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Compiles accumulated rules into clauses via Clark completion, checks
    /// tightness (if [`Config::tight`]), and lets the float theory add
    /// whatever clauses it statically can. Idempotent: a second call is a no-op.
    pub fn finalize(&mut self) -> Result<(), Error> {
        if self.finalized {
            return Ok(());
        }
        if self.config.tight {
            self.check_tight()?;
        }
        self.complete_rules();

        let mut float = std::mem::take(&mut self.float);
        float.preprocess(self)?;
        self.float = float;

        if self.config.unit_propagate {
            self.unit_propagate()?;
        }

        self.finalized = true;
        Ok(())
    }

    /// Forces any normal (OR) clause down to a single undetermined disjunct,
    /// to a fixpoint, so the solver can start from a partially-solved
    /// assignment instead of discovering the same forced literals by trial
    /// flips. Never touches generalized cardinality clauses (`min > 1` or
    /// `max > 0`): those don't reduce to a single forced literal the same way.
    fn unit_propagate(&mut self) -> Result<(), Error> {
        loop {
            let mut changed = false;
            for clause in self.clauses.iter() {
                if !clause.is_normal() {
                    continue;
                }
                let mut satisfied = false;
                let mut undetermined = Vec::new();
                for &lit in &clause.disjuncts {
                    match self.forced.get(&lit.prop_id()) {
                        Some(&value) => {
                            if value == lit.is_positive() {
                                satisfied = true;
                                break;
                            }
                        }
                        None => undetermined.push(lit),
                    }
                }
                if satisfied {
                    continue;
                }
                match undetermined.len() {
                    0 => return Err(Error::UnsatAtCompileTime),
                    1 => {
                        let lit = undetermined[0];
                        let prop = lit.prop_id();
                        let value = lit.is_positive();
                        match self.forced.get(&prop) {
                            Some(&existing) if existing != value => return Err(Error::UnsatAtCompileTime),
                            Some(_) => {}
                            None => {
                                self.forced.insert(prop, value);
                                changed = true;
                            }
                        }
                    }
                    _ => {}
                }
            }
            if !changed {
                return Ok(());
            }
        }
    }

    /// Propositions pinned to a value by [`Problem::unit_propagate`].
    pub(crate) fn forced_values(&self) -> &HashMap<PropId, bool> {
        &self.forced
    }

    /// Depth-first search for a positive-literal cycle through rule bodies:
    /// a head depending (through a chain of positive body literals) on itself.
    fn check_tight(&self) -> Result<(), Error> {
        let mut heads_by_prop: HashMap<PropId, Vec<usize>> = HashMap::new();
        for (i, r) in self.rules.iter().enumerate() {
            heads_by_prop.entry(r.head.prop_id()).or_default().push(i);
        }
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Active,
            Done,
        }
        let mut marks: HashMap<PropId, Mark> = HashMap::new();

        fn visit(
            p: PropId,
            rules: &[Rule],
            heads_by_prop: &HashMap<PropId, Vec<usize>>,
            marks: &mut HashMap<PropId, Mark>,
        ) -> Result<(), Error> {
            match marks.get(&p) {
                Some(Mark::Active) => return Err(Error::NonTightProgram),
                Some(Mark::Done) => return Ok(()),
                None => {}
            }
            marks.insert(p, Mark::Active);
            if let Some(rule_idxs) = heads_by_prop.get(&p) {
                for &ri in rule_idxs {
                    for lit in &rules[ri].body {
                        if lit.is_positive() {
                            visit(lit.prop_id(), rules, heads_by_prop, marks)?;
                        }
                    }
                }
            }
            marks.insert(p, Mark::Done);
            Ok(())
        }

        let heads: Vec<PropId> = heads_by_prop.keys().copied().collect();
        for p in heads {
            visit(p, &self.rules, &heads_by_prop, &mut marks)?;
        }
        Ok(())
    }

    /// Clark completion: for each proposition that is some rule's head,
    /// asserts `head <-> OR_i (AND body_i)` using one auxiliary proposition
    /// per rule to represent its (conjunctive) body. A head with no rules
    /// is forced false.
    fn complete_rules(&mut self) {
        let rules = std::mem::take(&mut self.rules);
        let mut by_head: HashMap<PropId, Vec<usize>> = HashMap::new();
        for (i, r) in rules.iter().enumerate() {
            by_head.entry(r.head.prop_id()).or_default().push(i);
        }
        for (&head_prop, rule_idxs) in &by_head {
            let head = Literal::new(head_prop, true);
            let mut auxes = Vec::with_capacity(rule_idxs.len());
            for &ri in rule_idxs {
                let body = &rules[ri].body;
                if body.len() == 1 {
                    // no auxiliary needed: the body *is* its own support literal.
                    auxes.push(body[0]);
                    continue;
                }
                let aux = self.proposition(format!("$rule_{}_{}", head_prop, ri));
                for lit in body {
                    // aux -> lit
                    self.clauses.push(Clause::or(vec![aux.negate(), *lit]));
                }
                // (AND body) -> aux, i.e. OR of negated body literals plus aux
                let mut clause = body.iter().map(|l| l.negate()).collect::<Vec<_>>();
                clause.push(aux);
                self.clauses.push(Clause::or(clause));
                auxes.push(aux);
            }
            // head <-> OR(auxes): each aux -> head, plus head -> OR(auxes).
            for &aux in &auxes {
                self.clauses.push(Clause::or(vec![aux.negate(), head]));
            }
            let mut clause = vec![head.negate()];
            clause.extend(auxes.iter().copied());
            self.clauses.push(Clause::or(clause));
        }
    }

    pub(crate) fn clauses(&self) -> &ClauseDb {
        &self.clauses
    }

    pub(crate) fn clauses_mut(&mut self) -> &mut ClauseDb {
        &mut self.clauses
    }

    pub(crate) fn float(&self) -> &FloatTheory {
        &self.float
    }

    /// Moves the float theory out of `self`, leaving an empty one behind.
    /// Lets the solver hold the theory and `&Problem` at the same time
    /// without an aliasing conflict; pair with [`Problem::restore_float`].
    pub(crate) fn take_float(&mut self) -> FloatTheory {
        std::mem::take(&mut self.float)
    }

    pub(crate) fn restore_float(&mut self, float: FloatTheory) {
        self.float = float;
    }

    /// Finalizes (if needed) and searches for a model.
    ///
    /// # Panics
    ///
    /// Panics if the program is structurally malformed (non-tight, a
    /// constant asserted false, etc.) — call [`Problem::finalize`] directly
    /// beforehand to handle that case without panicking.
    pub fn solve(&mut self) -> Result<Solution, Unsatisfiable> {
        self.finalize().expect("problem is malformed");
        crate::solver::solve(self).ok_or(Unsatisfiable)
    }

    /// Like [`Problem::solve`], but panics instead of returning `Err` when the
    /// search budget is exhausted — mirrors spec.md §6's `Solve(throwOnFailure=true)`.
    pub fn solve_or_panic(&mut self) -> Solution {
        self.solve().expect("no solution found within the configured search budget")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable() {
        let mut p = Problem::default();
        let a = p.proposition("a");
        let a2 = p.proposition("a");
        assert_eq!(a, a2);
        assert_eq!(p.num_propositions(), 1);
    }

    #[test]
    fn non_tight_program_is_rejected() {
        let mut p = Problem::default();
        let a = p.proposition("a");
        let b = p.proposition("b");
        p.rule(a, vec![b]).unwrap();
        p.rule(b, vec![a]).unwrap();
        assert_eq!(p.finalize(), Err(Error::NonTightProgram));
    }

    #[test]
    fn tight_rule_completes_without_error() {
        let mut p = Problem::default();
        let a = p.proposition("a");
        let b = p.proposition("b");
        p.assert(b).unwrap();
        p.rule(a, vec![b]).unwrap();
        assert!(p.finalize().is_ok());
    }

    #[test]
    fn rule_head_is_false_when_its_only_body_is_false() {
        let mut p = Problem::default();
        let a = p.proposition("a");
        let b = p.proposition("b");
        p.assert(b.negate()).unwrap();
        p.rule(a, vec![b]).unwrap();
        p.finalize().unwrap();
        let solution = p.solve().expect("a is simply forced false");
        assert!(!solution.is_true(a));
    }

    #[test]
    fn asserting_constant_false_is_an_error() {
        let mut p = Problem::default();
        let f = p.constant_false();
        assert_eq!(p.assert(f), Err(Error::AssertedFalse));
    }

    #[test]
    fn rule_headed_by_a_constant_is_an_error() {
        let mut p = Problem::default();
        let t = p.constant_true();
        assert_eq!(p.rule(t, vec![]), Err(Error::ConstantRuleHead));
    }

    #[test]
    fn rules_after_finalize_are_rejected() {
        let mut p = Problem::default();
        p.finalize().unwrap();
        let a = p.proposition("a");
        assert_eq!(p.rule(a, vec![]), Err(Error::ProgramFinalized));
    }

    #[test]
    fn and_is_true_only_when_every_conjunct_is() {
        let mut p = Problem::new(Config::with_seed(5));
        let a = p.proposition("a");
        let b = p.proposition("b");
        let both = p.and(vec![a, b]);
        p.assert(a).unwrap();
        p.assert(b.negate()).unwrap();
        p.finalize().unwrap();
        let solution = p.solve().expect("a & !b is consistent");
        assert!(!solution.is_true(both));
    }

    #[test]
    fn predicate_interns_by_name_and_args() {
        let mut p = Problem::default();
        let rook = p.predicate("rook");
        let a = rook.of(&mut p, vec![Term::Int(1), Term::Int(2)]);
        let b = rook.of(&mut p, vec![Term::Int(1), Term::Int(2)]);
        let c = rook.of(&mut p, vec![Term::Int(1), Term::Int(3)]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn not_is_negation() {
        let mut p = Problem::default();
        let a = p.proposition("a");
        assert_eq!(p.not(a), a.negate());
    }
}

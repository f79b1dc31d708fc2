//! The float theory: arithmetic variables and constraints layered on top of
//! the boolean WalkSAT core.
//!
//! A variable's *declared* domain is the interval it can range over before
//! any boolean proposition is considered; a *bound* ties a boolean literal
//! to a constant inequality (`x <= c` or `x >= c`) that only constrains the
//! domain further while its literal is true in the candidate model. Bounds
//! that are constants of the same kind on the same variable are related
//! by implication at [`FloatTheory::preprocess`] time, so the boolean layer
//! never has to discover `x <= 3 => x <= 5` by trial and error. Functional
//! constraints (`Sum`, `Product`, `Power`, `ScaledSum`, `MonotoneUnary`)
//! narrow each other's intervals to a fixpoint via a dedup'd work queue,
//! grounded on the bound-propagation design used by
//! [IntegerVariable](https://github.com/ConSol-Lab/Munchkin)-style CP solvers,
//! adapted here to continuous intervals instead of integer domains.
use rand::rngs::SmallRng;
use rand::Rng;

use crate::assign::Valuation;
use crate::builder::Problem;
use crate::error::Error;
use crate::interval::Interval;
use crate::theory::TheorySolver;
use crate::types::{FloatVarId, Literal, PropId};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum BoundKind {
    /// `x >= value`
    Ge,
    /// `x <= value`
    Le,
}

impl BoundKind {
    /// The bound implied by this proposition being *false* rather than true.
    fn opposite(self) -> BoundKind {
        match self {
            BoundKind::Ge => BoundKind::Le,
            BoundKind::Le => BoundKind::Ge,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct ConstantBound {
    var: FloatVarId,
    literal: Literal,
    kind: BoundKind,
    value: f32,
}

/// A bound between two variables, active only while `literal` is true:
/// `lesser <= greater`. Asserting `a > b` registers the same record with
/// the operands swapped.
#[derive(Clone, Copy, Debug)]
struct VariableBound {
    lesser: FloatVarId,
    greater: FloatVarId,
    literal: Literal,
}

/// A declared float variable: its name (for diagnostics) and its domain
/// before any boolean bound is applied.
#[derive(Clone, Debug)]
pub struct FloatVariable {
    pub name: String,
    pub domain: Interval,
    /// `0.0` means dense (no quantization step).
    pub quantization: f32,
    /// If set, this variable's value is fixed before any bound or
    /// constraint runs, instead of ranging over `domain`.
    pub predetermined: Option<f32>,
    /// If set, sampling fixes every other representative first and defers
    /// this one to the end, since its value is functionally determined by
    /// the others (e.g. a `Sum` result whose terms are sampled freely).
    pub pick_last: bool,
}

#[derive(Clone, Debug)]
enum Constraint {
    Sum { result: FloatVarId, terms: Vec<FloatVarId> },
    ScaledSum { result: FloatVarId, terms: Vec<(f32, FloatVarId)>, offset: f32 },
    Product { result: FloatVarId, terms: Vec<FloatVarId> },
    Power { result: FloatVarId, base: FloatVarId, exponent: i32 },
    MonotoneUnary { result: FloatVarId, arg: FloatVarId, forward: fn(f32) -> f32, inverse: fn(f32) -> f32 },
}

impl Constraint {
    fn vars(&self) -> Vec<FloatVarId> {
        match self {
            Constraint::Sum { result, terms } => {
                let mut v = terms.clone();
                v.push(*result);
                v
            }
            Constraint::ScaledSum { result, terms, .. } => {
                let mut v: Vec<FloatVarId> = terms.iter().map(|(_, t)| *t).collect();
                v.push(*result);
                v
            }
            Constraint::Product { result, terms } => {
                let mut v = terms.clone();
                v.push(*result);
                v
            }
            Constraint::Power { result, base, .. } => vec![*result, *base],
            Constraint::MonotoneUnary { result, arg, .. } => vec![*result, *arg],
        }
    }
}

/// Union-find over float variable indices, so `equal(a, b)` can merge two
/// variables' domains without rewriting every constraint that mentions them.
#[derive(Clone, Debug, Default)]
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn push(&mut self) -> usize {
        let id = self.parent.len();
        self.parent.push(id);
        id
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            let root = self.find(self.parent[x]);
            self.parent[x] = root;
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra] = rb;
        }
    }
}

/// A memoization key for a builder-level arithmetic expression: calling the
/// same operator factory (`+`, `-`, `*`, `/`, unary `-`, integer power,
/// `Sum`, `Average`, `Variance`) with the same operands returns the same
/// synthetic variable rather than allocating a fresh one each time, per
/// spec.md §6 ("Arithmetic operations memoize").
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
enum ExprKey {
    Add(FloatVarId, FloatVarId),
    Sub(FloatVarId, FloatVarId),
    Mul(FloatVarId, FloatVarId),
    Div(FloatVarId, FloatVarId),
    Neg(FloatVarId),
    Pow(FloatVarId, i32),
    Sum(Vec<FloatVarId>),
    Average(Vec<FloatVarId>),
    Variance(Vec<FloatVarId>),
}

/// The arithmetic theory attached to a [`Problem`].
#[derive(Clone, Debug, Default)]
pub struct FloatTheory {
    variables: Vec<FloatVariable>,
    uf: UnionFind,
    bounds: Vec<ConstantBound>,
    variable_bounds: Vec<VariableBound>,
    /// Each constraint paired with the literal that must be true for it to
    /// be "defined in the solution" (`None` means always active, which is
    /// the common case — most functional constraints have no condition).
    constraints: Vec<(Constraint, Option<Literal>)>,
    /// Memoized results of the arithmetic operator factories (`add`, `sub`, …).
    expr_cache: std::collections::HashMap<ExprKey, FloatVarId>,
    /// Memoized constant-bound propositions, keyed by `(var, is_ge, value-bits)`
    /// so `problem.float_ge(v, 3.0)` returns the same literal on every call.
    bound_cache: std::collections::HashMap<(usize, bool, u32), Literal>,
    /// Memoized variable-bound propositions, keyed by `(lesser, greater)`.
    vbound_cache: std::collections::HashMap<(usize, usize), Literal>,
    /// Memoized variable-equation propositions, keyed by the pair of
    /// variable indices in a canonical (sorted) order.
    veq_cache: std::collections::HashMap<(usize, usize), Literal>,
}

impl FloatTheory {
    /// Declares a float variable ranging over `domain`, optionally quantized
    /// to multiples of `quantization` (`0.0` for a dense variable).
    pub fn variable(&mut self, name: impl Into<String>, domain: Interval, quantization: f32) -> FloatVarId {
        let id = self.uf.push();
        self.variables.push(FloatVariable {
            name: name.into(),
            domain,
            quantization,
            predetermined: None,
            pick_last: false,
        });
        FloatVarId(id)
    }

    /// Fixes `var`'s value for every future solve, bypassing its domain.
    pub fn set_predetermined(&mut self, var: FloatVarId, value: f32) {
        self.variables[var.0].predetermined = Some(value);
    }

    /// Marks `var` as functionally determined by other variables, so
    /// sampling defers choosing its value until every other representative
    /// has one.
    pub fn mark_pick_last(&mut self, var: FloatVarId) {
        self.variables[var.0].pick_last = true;
    }

    fn representative(&mut self, var: FloatVarId) -> usize {
        self.uf.find(var.0)
    }

    /// Merges two variables into one equivalence class; their declared
    /// domains are intersected.
    pub fn equal(&mut self, a: FloatVarId, b: FloatVarId) {
        let (ra, rb) = (self.representative(a), self.representative(b));
        if ra == rb {
            return;
        }
        let merged = self.variables[ra].domain.intersect(self.variables[rb].domain);
        let pick_last = self.variables[ra].pick_last || self.variables[rb].pick_last;
        let predetermined = self.variables[ra].predetermined.or(self.variables[rb].predetermined);
        self.uf.union(ra, rb);
        let root = self.uf.find(ra);
        self.variables[root].domain = merged;
        self.variables[root].pick_last = pick_last;
        self.variables[root].predetermined = predetermined;
    }

    /// Ties `literal` to the constant bound `var >= value`.
    pub fn bound_ge(&mut self, var: FloatVarId, literal: Literal, value: f32) {
        self.bounds.push(ConstantBound { var, literal, kind: BoundKind::Ge, value });
    }

    /// Ties `literal` to the constant bound `var <= value`.
    pub fn bound_le(&mut self, var: FloatVarId, literal: Literal, value: f32) {
        self.bounds.push(ConstantBound { var, literal, kind: BoundKind::Le, value });
    }

    /// Ties `literal` to the variable bound `lesser <= greater`. Used to
    /// compile an infix `<=`/`<` between two float variables (as opposed to
    /// [`FloatTheory::bound_le`], which compares a variable to a constant).
    pub fn variable_bound_le(&mut self, lesser: FloatVarId, greater: FloatVarId, literal: Literal) {
        self.variable_bounds.push(VariableBound { lesser, greater, literal });
    }

    /// Ties `literal` to the variable bound `greater >= lesser`, i.e. an
    /// infix `>=`/`>` with the operands the other way around from
    /// [`FloatTheory::variable_bound_le`].
    pub fn variable_bound_ge(&mut self, greater: FloatVarId, lesser: FloatVarId, literal: Literal) {
        self.variable_bounds.push(VariableBound { lesser, greater, literal });
    }

    /// A result variable is sampled only after every variable it depends on
    /// has a concrete value, since its own value is determined by theirs.
    fn mark_result_pick_last(&mut self, result: FloatVarId) {
        self.variables[result.0].pick_last = true;
    }

    pub fn sum(&mut self, result: FloatVarId, terms: Vec<FloatVarId>) {
        self.sum_if(result, terms, None);
    }

    /// `result = sum(terms)`, active only while `condition` is true (or
    /// always, if `None`).
    pub fn sum_if(&mut self, result: FloatVarId, terms: Vec<FloatVarId>, condition: Option<Literal>) {
        self.mark_result_pick_last(result);
        self.constraints.push((Constraint::Sum { result, terms }, condition));
    }

    pub fn scaled_sum(&mut self, result: FloatVarId, terms: Vec<(f32, FloatVarId)>, offset: f32) {
        self.scaled_sum_if(result, terms, offset, None);
    }

    /// `result = offset + sum(coefficient * term)`, conditionally active.
    pub fn scaled_sum_if(&mut self, result: FloatVarId, terms: Vec<(f32, FloatVarId)>, offset: f32, condition: Option<Literal>) {
        self.mark_result_pick_last(result);
        self.constraints.push((Constraint::ScaledSum { result, terms, offset }, condition));
    }

    pub fn product(&mut self, result: FloatVarId, terms: Vec<FloatVarId>) {
        self.product_if(result, terms, None);
    }

    /// `result = product(terms)`, conditionally active.
    pub fn product_if(&mut self, result: FloatVarId, terms: Vec<FloatVarId>, condition: Option<Literal>) {
        self.mark_result_pick_last(result);
        self.constraints.push((Constraint::Product { result, terms }, condition));
    }

    pub fn power(&mut self, result: FloatVarId, base: FloatVarId, exponent: i32) {
        self.power_if(result, base, exponent, None);
    }

    /// `result = base^exponent`, conditionally active.
    pub fn power_if(&mut self, result: FloatVarId, base: FloatVarId, exponent: i32, condition: Option<Literal>) {
        self.mark_result_pick_last(result);
        self.constraints.push((Constraint::Power { result, base, exponent }, condition));
    }

    pub fn monotone_unary(&mut self, result: FloatVarId, arg: FloatVarId, forward: fn(f32) -> f32, inverse: fn(f32) -> f32) {
        self.monotone_unary_if(result, arg, forward, inverse, None);
    }

    /// `result = forward(arg)`, conditionally active.
    pub fn monotone_unary_if(
        &mut self,
        result: FloatVarId,
        arg: FloatVarId,
        forward: fn(f32) -> f32,
        inverse: fn(f32) -> f32,
        condition: Option<Literal>,
    ) {
        self.mark_result_pick_last(result);
        self.constraints.push((Constraint::MonotoneUnary { result, arg, forward, inverse }, condition));
    }

    fn unbounded() -> Interval {
        Interval::new(f32::NEG_INFINITY, f32::INFINITY)
    }

    /// `a + b`, as a fresh (memoized) variable: the Rust-idiomatic
    /// replacement for operator-overload builders that need an implicit
    /// "current problem" (spec.md §9's design note) — a plain method call
    /// through the same `&mut FloatTheory` every other declaration goes
    /// through, instead of `std::ops::Add` (which has no way to thread that
    /// reference in). Calling this twice with the same operands returns the
    /// same variable.
    pub fn add(&mut self, a: FloatVarId, b: FloatVarId) -> FloatVarId {
        if let Some(&r) = self.expr_cache.get(&ExprKey::Add(a, b)) {
            return r;
        }
        let r = self.variable("$add", Self::unbounded(), 0.0);
        self.sum(r, vec![a, b]);
        self.expr_cache.insert(ExprKey::Add(a, b), r);
        r
    }

    /// `a - b`, as a fresh (memoized) variable.
    pub fn sub(&mut self, a: FloatVarId, b: FloatVarId) -> FloatVarId {
        if let Some(&r) = self.expr_cache.get(&ExprKey::Sub(a, b)) {
            return r;
        }
        let r = self.variable("$sub", Self::unbounded(), 0.0);
        self.scaled_sum(r, vec![(1.0, a), (-1.0, b)], 0.0);
        self.expr_cache.insert(ExprKey::Sub(a, b), r);
        r
    }

    /// `a * b`, as a fresh (memoized) variable.
    pub fn mul(&mut self, a: FloatVarId, b: FloatVarId) -> FloatVarId {
        if let Some(&r) = self.expr_cache.get(&ExprKey::Mul(a, b)) {
            return r;
        }
        let r = self.variable("$mul", Self::unbounded(), 0.0);
        self.product(r, vec![a, b]);
        self.expr_cache.insert(ExprKey::Mul(a, b), r);
        r
    }

    /// `a / b`, as a fresh (memoized) variable. Expressed as a [`Constraint::Product`]
    /// with `a` itself in the result position (`a = r * b`) rather than
    /// introducing a dedicated division constraint — narrowing is symmetric
    /// regardless of which named slot is the "result", so this gives exactly
    /// the bidirectional `r = a/b`, `b = a/r` narrowing spec.md §4.4.3's
    /// table describes for `a × b`, read in the other direction. Pushed
    /// directly (instead of through [`FloatTheory::product`]) so `r`, not
    /// `a`, is the variable deferred to the end of sampling — `a` is `div`'s
    /// input, `r` is the quantity that falls out of it.
    pub fn div(&mut self, a: FloatVarId, b: FloatVarId) -> FloatVarId {
        if let Some(&r) = self.expr_cache.get(&ExprKey::Div(a, b)) {
            return r;
        }
        let r = self.variable("$div", Self::unbounded(), 0.0);
        self.constraints.push((Constraint::Product { result: a, terms: vec![r, b] }, None));
        self.mark_pick_last(r);
        self.expr_cache.insert(ExprKey::Div(a, b), r);
        r
    }

    /// Unary `-a`, as a fresh (memoized) variable.
    pub fn neg(&mut self, a: FloatVarId) -> FloatVarId {
        if let Some(&r) = self.expr_cache.get(&ExprKey::Neg(a)) {
            return r;
        }
        let r = self.variable("$neg", Self::unbounded(), 0.0);
        self.scaled_sum(r, vec![(-1.0, a)], 0.0);
        self.expr_cache.insert(ExprKey::Neg(a), r);
        r
    }

    /// Integer power `a^n`, as a fresh (memoized) variable.
    pub fn pow_var(&mut self, a: FloatVarId, n: i32) -> FloatVarId {
        if let Some(&r) = self.expr_cache.get(&ExprKey::Pow(a, n)) {
            return r;
        }
        let r = self.variable("$pow", Self::unbounded(), 0.0);
        self.power(r, a, n);
        self.expr_cache.insert(ExprKey::Pow(a, n), r);
        r
    }

    /// `Sum(terms)`, as a fresh (memoized) variable — the factory form of
    /// [`FloatTheory::sum`] that doesn't require the caller to pre-declare a
    /// result variable.
    pub fn sum_vars(&mut self, terms: Vec<FloatVarId>) -> FloatVarId {
        if let Some(&r) = self.expr_cache.get(&ExprKey::Sum(terms.clone())) {
            return r;
        }
        let r = self.variable("$sum", Self::unbounded(), 0.0);
        self.sum(r, terms.clone());
        self.expr_cache.insert(ExprKey::Sum(terms), r);
        r
    }

    /// `Average(terms)`, as a fresh (memoized) variable. Fails the same way
    /// [`FloatTheory::average`] does if any term carries a condition.
    pub fn average_vars(&mut self, terms: Vec<FloatVarId>) -> Result<FloatVarId, Error> {
        if let Some(&r) = self.expr_cache.get(&ExprKey::Average(terms.clone())) {
            return Ok(r);
        }
        let r = self.variable("$avg", Self::unbounded(), 0.0);
        let pairs: Vec<(FloatVarId, Option<Literal>)> = terms.iter().map(|&v| (v, None)).collect();
        self.average(r, &pairs)?;
        self.expr_cache.insert(ExprKey::Average(terms), r);
        Ok(r)
    }

    /// `Variance(terms)`, as a fresh (memoized) variable. Fails the same way
    /// [`FloatTheory::variance`] does if any term carries a condition.
    pub fn variance_vars(&mut self, terms: Vec<FloatVarId>) -> Result<FloatVarId, Error> {
        if let Some(&r) = self.expr_cache.get(&ExprKey::Variance(terms.clone())) {
            return Ok(r);
        }
        let r = self.variable("$var", Interval::new(0.0, f32::INFINITY), 0.0);
        let pairs: Vec<(FloatVarId, Option<Literal>)> = terms.iter().map(|&v| (v, None)).collect();
        self.variance(r, &pairs)?;
        self.expr_cache.insert(ExprKey::Variance(terms), r);
        Ok(r)
    }

    /// Looks up a memoized constant-bound literal, if `problem.float_ge`/
    /// `float_le` already built one for this exact `(var, kind, value)`.
    pub(crate) fn cached_bound(&self, var: FloatVarId, ge: bool, value: f32) -> Option<Literal> {
        self.bound_cache.get(&(var.0, ge, value.to_bits())).copied()
    }

    pub(crate) fn cache_bound(&mut self, var: FloatVarId, ge: bool, value: f32, lit: Literal) {
        self.bound_cache.insert((var.0, ge, value.to_bits()), lit);
    }

    pub(crate) fn cached_vbound(&self, lesser: FloatVarId, greater: FloatVarId) -> Option<Literal> {
        self.vbound_cache.get(&(lesser.0, greater.0)).copied()
    }

    pub(crate) fn cache_vbound(&mut self, lesser: FloatVarId, greater: FloatVarId, lit: Literal) {
        self.vbound_cache.insert((lesser.0, greater.0), lit);
    }

    pub(crate) fn cached_veq(&self, a: FloatVarId, b: FloatVarId) -> Option<Literal> {
        let key = (a.0.min(b.0), a.0.max(b.0));
        self.veq_cache.get(&key).copied()
    }

    pub(crate) fn cache_veq(&mut self, a: FloatVarId, b: FloatVarId, lit: Literal) {
        let key = (a.0.min(b.0), a.0.max(b.0));
        self.veq_cache.insert(key, lit);
    }

    /// `result = mean(terms)`. Rejects any term carrying a condition: an
    /// aggregate's membership is fixed at assertion time.
    pub fn average(&mut self, result: FloatVarId, terms: &[(FloatVarId, Option<Literal>)]) -> Result<(), Error> {
        let plain = Self::reject_conditions(terms)?;
        let n = plain.len() as f32;
        let weighted = plain.into_iter().map(|v| (1.0 / n, v)).collect();
        self.scaled_sum(result, weighted, 0.0);
        Ok(())
    }

    /// `result = variance(terms)`, desugared into `average(x^2) - average(x)^2`
    /// using hidden intermediate variables.
    pub fn variance(&mut self, result: FloatVarId, terms: &[(FloatVarId, Option<Literal>)]) -> Result<(), Error> {
        let plain = Self::reject_conditions(terms)?;
        let n = plain.len() as f32;
        let wide = Interval::new(f32::NEG_INFINITY, f32::INFINITY);

        let mean = self.variable("$mean", wide, 0.0);
        let mean_terms = plain.iter().map(|&v| (1.0 / n, v)).collect();
        self.scaled_sum(mean, mean_terms, 0.0);

        let mut sq_terms = Vec::with_capacity(plain.len());
        for &v in &plain {
            let dev = self.variable("$deviation", wide, 0.0);
            self.scaled_sum(dev, vec![(1.0, v), (-1.0, mean)], 0.0);
            let sq = self.variable("$sq_deviation", Interval::new(0.0, f32::INFINITY), 0.0);
            self.power(sq, dev, 2);
            sq_terms.push((1.0 / n, sq));
        }
        self.scaled_sum(result, sq_terms, 0.0);
        Ok(())
    }

    fn reject_conditions(terms: &[(FloatVarId, Option<Literal>)]) -> Result<Vec<FloatVarId>, Error> {
        if terms.iter().any(|(_, cond)| cond.is_some()) {
            return Err(Error::ConditionalVariableInAggregate);
        }
        Ok(terms.iter().map(|(v, _)| *v).collect())
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// The declaration (name, domain, quantization) of float variable `i`.
    pub fn variable_info(&self, i: usize) -> &FloatVariable {
        &self.variables[i]
    }

    /// The declared domain of `var`'s equivalence-class representative.
    fn declared_domain(&mut self, var: FloatVarId) -> Interval {
        let r = self.representative(var);
        self.variables[r].domain
    }

    /// Seeds `intervals[var's representative]` from `domain` (or the point
    /// interval `{predetermined}` if set), intersects in every currently-true
    /// bound, then runs [`FloatTheory::run_fixpoint`] over every
    /// representative. Returns `None` if any variable's interval becomes
    /// empty. The active variable bounds and the per-constraint activity mask
    /// are returned alongside so sampling can reuse them without recomputing
    /// them from the model.
    ///
    /// A bound proposition that is *false* in the model ordinarily carries no
    /// information (the variable could lie anywhere outside the bound, or
    /// simply be unconstrained if the proposition isn't tied to this variable
    /// at all) — except when `is_dependency` reports the proposition occurs
    /// positively in some rule body. In that case its completion semantics
    /// guarantee the proposition is false only because its defining condition
    /// failed, so the strict complementary bound is known to hold and gets
    /// intersected in too.
    fn propagate(
        &mut self,
        valuation_true: impl Fn(Literal) -> bool,
        is_dependency: impl Fn(PropId) -> bool,
    ) -> Option<(Vec<Interval>, Vec<(usize, usize)>, Vec<bool>)> {
        let n = self.variables.len();
        let mut intervals: Vec<Interval> = (0..n)
            .map(|i| match self.variables[i].predetermined {
                Some(v) => Interval::point(v),
                None => self.variables[i].domain,
            })
            .collect();

        for b in self.bounds.clone() {
            let kind = if valuation_true(b.literal) {
                b.kind
            } else if is_dependency(b.literal.prop_id()) {
                b.kind.opposite()
            } else {
                continue;
            };
            let r = self.representative(b.var);
            let constant = match kind {
                BoundKind::Ge => Interval::new(b.value, f32::INFINITY),
                BoundKind::Le => Interval::new(f32::NEG_INFINITY, b.value),
            };
            intervals[r] = intervals[r].intersect(constant);
            if intervals[r].is_empty() {
                return None;
            }
        }

        let active_vbounds: Vec<(usize, usize)> = self
            .variable_bounds
            .clone()
            .into_iter()
            .filter(|b| valuation_true(b.literal))
            .map(|b| (self.representative(b.lesser), self.representative(b.greater)))
            .collect();

        let active_constraints: Vec<bool> = self
            .constraints
            .iter()
            .map(|(_, cond)| cond.map_or(true, |lit| valuation_true(lit)))
            .collect();

        self.run_fixpoint(&mut intervals, &active_vbounds, &active_constraints, (0..n).collect())?;
        Some((intervals, active_vbounds, active_constraints))
    }

    /// Drains a work queue of representative indices, narrowing every
    /// active functional constraint and variable bound that touches a
    /// dequeued representative, re-enqueueing whichever representatives
    /// changed as a result. A constraint whose `active_constraints` entry is
    /// `false` (its condition literal doesn't hold in the candidate model)
    /// is skipped entirely. Terminates because every narrowing is monotone
    /// (intervals only shrink) and an unchanged interval is never
    /// re-enqueued. Returns `None` if any interval becomes empty.
    fn run_fixpoint(
        &mut self,
        intervals: &mut Vec<Interval>,
        active_vbounds: &[(usize, usize)],
        active_constraints: &[bool],
        seed: Vec<usize>,
    ) -> Option<()> {
        let n = intervals.len();
        let mut queued = vec![false; n];
        let mut queue = Vec::with_capacity(seed.len());
        for r in seed {
            queued[r] = true;
            queue.push(r);
        }
        while let Some(r) = queue.pop() {
            queued[r] = false;
            for ci in 0..self.constraints.len() {
                if !active_constraints[ci] {
                    continue;
                }
                let vars = self.constraints[ci].0.vars();
                let touches_r = vars.iter().any(|v| self.representative(*v) == r);
                if !touches_r {
                    continue;
                }
                let changed = self.narrow_constraint(ci, intervals)?;
                for v in changed {
                    if !queued[v] {
                        queued[v] = true;
                        queue.push(v);
                    }
                }
            }
            for &(lesser, greater) in active_vbounds {
                if lesser != r && greater != r {
                    continue;
                }
                let new_greater = intervals[greater].intersect(Interval::new(intervals[lesser].lo, f32::INFINITY));
                if new_greater.is_empty() {
                    return None;
                }
                if new_greater != intervals[greater] {
                    intervals[greater] = new_greater;
                    if !queued[greater] {
                        queued[greater] = true;
                        queue.push(greater);
                    }
                }
                let new_lesser = intervals[lesser].intersect(Interval::new(f32::NEG_INFINITY, intervals[greater].hi));
                if new_lesser.is_empty() {
                    return None;
                }
                if new_lesser != intervals[lesser] {
                    intervals[lesser] = new_lesser;
                    if !queued[lesser] {
                        queued[lesser] = true;
                        queue.push(lesser);
                    }
                }
            }
        }
        if intervals.iter().any(|iv| iv.is_empty()) {
            return None;
        }
        Some(())
    }

    /// Narrows the variables mentioned by constraint `ci` against each
    /// other; returns the set of representative indices whose interval
    /// changed (so the caller can re-enqueue dependents), or `None` if the
    /// narrowing made some interval empty.
    fn narrow_constraint(&mut self, ci: usize, intervals: &mut [Interval]) -> Option<Vec<usize>> {
        let mut changed = Vec::new();
        macro_rules! set {
            ($r:expr, $new:expr) => {{
                let r = $r;
                let new = $new;
                if new.is_empty() {
                    return None;
                }
                if new != intervals[r] {
                    intervals[r] = new;
                    changed.push(r);
                }
            }};
        }

        match self.constraints[ci].0.clone() {
            Constraint::Sum { result, terms } => {
                let rr = self.representative(result);
                let rs: Vec<usize> = terms.iter().map(|t| self.representative(*t)).collect();
                let sum = rs.iter().fold(Interval::point(0.0), |acc, &r| acc + intervals[r]);
                set!(rr, intervals[rr].intersect(sum));
                for (i, &r) in rs.iter().enumerate() {
                    let others = rs
                        .iter()
                        .enumerate()
                        .filter(|(j, _)| *j != i)
                        .fold(Interval::point(0.0), |acc, (_, &rj)| acc + intervals[rj]);
                    set!(r, intervals[r].intersect(intervals[rr] - others));
                }
            }
            Constraint::ScaledSum { result, terms, offset } => {
                let rr = self.representative(result);
                let rs: Vec<(f32, usize)> = terms.iter().map(|(c, t)| (*c, self.representative(*t))).collect();
                let sum = rs
                    .iter()
                    .fold(Interval::point(offset), |acc, &(c, r)| acc + intervals[r] * Interval::point(c));
                set!(rr, intervals[rr].intersect(sum));
                for (i, &(c, r)) in rs.iter().enumerate() {
                    if c == 0.0 {
                        continue;
                    }
                    let others = rs
                        .iter()
                        .enumerate()
                        .filter(|(j, _)| *j != i)
                        .fold(Interval::point(offset), |acc, (_, &(cj, rj))| acc + intervals[rj] * Interval::point(cj));
                    let narrowed = (intervals[rr] - others) / Interval::point(c);
                    set!(r, intervals[r].intersect(narrowed));
                }
            }
            Constraint::Product { result, terms } => {
                let rr = self.representative(result);
                let rs: Vec<usize> = terms.iter().map(|t| self.representative(*t)).collect();
                let product = rs.iter().fold(Interval::point(1.0), |acc, &r| acc * intervals[r]);
                set!(rr, intervals[rr].intersect(product));
                for (i, &r) in rs.iter().enumerate() {
                    let others = rs
                        .iter()
                        .enumerate()
                        .filter(|(j, _)| *j != i)
                        .fold(Interval::point(1.0), |acc, (_, &rj)| acc * intervals[rj]);
                    if others.contains(0.0) {
                        continue; // division by a range containing zero narrows nothing
                    }
                    set!(r, intervals[r].intersect(intervals[rr] / others));
                }
            }
            Constraint::Power { result, base, exponent } => {
                let rr = self.representative(result);
                let rb = self.representative(base);
                set!(rr, intervals[rr].intersect(intervals[rb].powi(exponent)));
                set!(rb, intervals[rb].intersect(intervals[rr].root(exponent)));
            }
            Constraint::MonotoneUnary { result, arg, forward, inverse } => {
                let rr = self.representative(result);
                let ra = self.representative(arg);
                let fwd = Interval::new(forward(intervals[ra].lo).min(forward(intervals[ra].hi)), forward(intervals[ra].lo).max(forward(intervals[ra].hi)));
                set!(rr, intervals[rr].intersect(fwd));
                let inv = Interval::new(inverse(intervals[rr].lo).min(inverse(intervals[rr].hi)), inverse(intervals[rr].lo).max(inverse(intervals[rr].hi)));
                set!(ra, intervals[ra].intersect(inv));
            }
        }
        Some(changed)
    }

    /// Randomized sampling of a witness point per equivalence-class
    /// representative, honoring quantization; retried up to
    /// [`crate::config::Config::max_float_tries`] times by the caller.
    ///
    /// Representatives are shuffled and fixed to a concrete point one at a
    /// time, re-running [`FloatTheory::run_fixpoint`] after each pick so
    /// later choices respect every earlier one — e.g. once `a` is fixed in
    /// `r = a + b`, `b`'s interval narrows to the single value that keeps
    /// the sum exact, rather than being drawn independently from its
    /// pre-sampling bounds. Variables marked [`FloatVariable::pick_last`]
    /// (functional-constraint results) are deferred to the end, since their
    /// value falls out of their arguments rather than the other way around.
    fn sample(
        &mut self,
        intervals: &[Interval],
        active_vbounds: &[(usize, usize)],
        active_constraints: &[bool],
        rng: &mut SmallRng,
    ) -> Option<Vec<f32>> {
        use rand::seq::SliceRandom;
        let n = self.variables.len();
        let mut intervals = intervals.to_vec();

        let roots: Vec<usize> = (0..n).filter(|&i| self.uf.find(i) == i).collect();
        let (mut deferred, mut normal): (Vec<usize>, Vec<usize>) =
            roots.into_iter().partition(|&r| self.variables[r].pick_last);
        normal.shuffle(rng);
        deferred.shuffle(rng);

        let mut values = vec![0.0_f32; n];
        for r in normal.into_iter().chain(deferred) {
            let q = self.variables[r].quantization;
            let quantized = intervals[r].quantize(q);
            if quantized.is_empty() {
                return None;
            }
            let v = if quantized.is_unique() {
                quantized.lo
            } else if q > 0.0 {
                let steps = ((quantized.hi - quantized.lo) / q).round() as i64;
                let k = rng.gen_range(0..=steps.max(0));
                quantized.lo + k as f32 * q
            } else {
                rng.gen_range(quantized.lo..=quantized.hi)
            };
            values[r] = v;
            intervals[r] = Interval::point(v);
            self.run_fixpoint(&mut intervals, active_vbounds, active_constraints, vec![r])?;
        }

        let mut out = vec![0.0_f32; n];
        for i in 0..n {
            out[i] = values[self.uf.find(i)];
        }
        Some(out)
    }
}

impl TheorySolver for FloatTheory {
    fn preprocess(&mut self, problem: &mut Problem) -> Result<(), Error> {
        use std::collections::HashMap;
        for (_, cond) in &self.constraints {
            if let Some(lit) = cond {
                if problem.is_dependency(lit.prop_id()) {
                    return Err(Error::FunctionalConstraintAsDependency);
                }
            }
        }
        let mut ge: HashMap<usize, Vec<(f32, Literal)>> = HashMap::new();
        let mut le: HashMap<usize, Vec<(f32, Literal)>> = HashMap::new();
        for b in self.bounds.clone() {
            let r = self.representative(b.var);
            match b.kind {
                BoundKind::Ge => ge.entry(r).or_default().push((b.value, b.literal)),
                BoundKind::Le => le.entry(r).or_default().push((b.value, b.literal)),
            }
        }
        // x >= 5 implies x >= 3: the larger constant's literal implies the smaller's.
        for (_, mut bounds) in ge {
            bounds.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap());
            for pair in bounds.windows(2) {
                problem.assert_implication(pair[0].1, pair[1].1)?;
            }
        }
        // x <= 3 implies x <= 5: the smaller constant's literal implies the larger's.
        for (_, mut bounds) in le {
            bounds.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
            for pair in bounds.windows(2) {
                problem.assert_implication(pair[0].1, pair[1].1)?;
            }
        }
        Ok(())
    }

    fn propagate_predetermined(&mut self, _problem: &Problem) -> Vec<(usize, bool)> {
        let mut forced = Vec::new();
        for b in self.bounds.clone() {
            let r = self.representative(b.var);
            if let Some(value) = self.variables[r].predetermined {
                // the variable's value is fixed, so the bound's truth is
                // already decided: force the literal to match it.
                let holds = match b.kind {
                    BoundKind::Ge => value >= b.value,
                    BoundKind::Le => value <= b.value,
                };
                forced.push((b.literal.prop_id(), holds == b.literal.is_positive()));
                continue;
            }
            let dom = self.declared_domain(b.var);
            let consistent = match b.kind {
                BoundKind::Ge => dom.hi >= b.value,
                BoundKind::Le => dom.lo <= b.value,
            };
            if !consistent {
                forced.push((b.literal.prop_id(), false));
            }
        }
        forced
    }

    fn solve(&mut self, problem: &Problem, valuation: &Valuation, rng: &mut SmallRng) -> Option<Vec<f32>> {
        if self.variables.is_empty() {
            return Some(Vec::new());
        }
        let (intervals, active_vbounds, active_constraints) =
            self.propagate(|lit| valuation.is_satisfied(lit), |p| problem.is_dependency(p))?;
        self.sample(&intervals, &active_vbounds, &active_constraints, rng)
    }
}

/// A float-theory obligation a [`crate::solution::Solution`] failed to meet,
/// found by [`FloatTheory::check`] — used by [`crate::validator::validate`]
/// to re-verify a solve's witness values independently of the solver that
/// produced them.
#[derive(Clone, Debug, PartialEq)]
pub enum FloatViolation {
    /// A true constant bound (`var >= c` or `var <= c`) did not hold of the sampled value.
    ConstantBound { var: FloatVarId, value: f32 },
    /// A true variable bound (`lesser <= greater`) did not hold of the sampled values.
    VariableBound { lesser: FloatVarId, greater: FloatVarId },
    /// An active functional constraint's `result = f(args)` did not hold
    /// within tolerance of the sampled values.
    FunctionalConstraint { index: usize },
}

impl FloatTheory {
    /// Checks every bound and functional constraint active under `is_true`
    /// against the concrete `values` (indexed by raw [`FloatVarId`], not by
    /// equivalence-class representative — a correct [`FloatTheory::sample`]
    /// already gives every variable in a class the same value, so no
    /// union-find lookup is needed here). `tolerance` is the quantization
    /// tolerance also used for rounding (spec.md §4.3), floored at `1e-3` for
    /// the multiplicative constraints where strict equality is unrealistic
    /// for single-precision products/powers.
    pub fn check(&self, is_true: impl Fn(Literal) -> bool, values: &[f32], tolerance: f32) -> Vec<FloatViolation> {
        let tol = tolerance.max(1e-3);
        let mut out = Vec::new();

        for b in &self.bounds {
            if !is_true(b.literal) {
                continue;
            }
            let v = values[b.var.0];
            let ok = match b.kind {
                BoundKind::Ge => v >= b.value - tol,
                BoundKind::Le => v <= b.value + tol,
            };
            if !ok {
                out.push(FloatViolation::ConstantBound { var: b.var, value: v });
            }
        }

        for vb in &self.variable_bounds {
            if !is_true(vb.literal) {
                continue;
            }
            if values[vb.lesser.0] > values[vb.greater.0] + tol {
                out.push(FloatViolation::VariableBound { lesser: vb.lesser, greater: vb.greater });
            }
        }

        for (i, (c, cond)) in self.constraints.iter().enumerate() {
            if let Some(lit) = cond {
                if !is_true(*lit) {
                    continue;
                }
            }
            let (lhs, rhs) = match c {
                Constraint::Sum { result, terms } => {
                    (values[result.0], terms.iter().map(|t| values[t.0]).sum::<f32>())
                }
                Constraint::ScaledSum { result, terms, offset } => (
                    values[result.0],
                    offset + terms.iter().map(|(coeff, t)| coeff * values[t.0]).sum::<f32>(),
                ),
                Constraint::Product { result, terms } => {
                    (values[result.0], terms.iter().map(|t| values[t.0]).product::<f32>())
                }
                Constraint::Power { result, base, exponent } => (values[result.0], values[base.0].powi(*exponent)),
                Constraint::MonotoneUnary { result, arg, forward, .. } => (values[result.0], forward(values[arg.0])),
            };
            if (lhs - rhs).abs() > tol * rhs.abs().max(1.0) {
                out.push(FloatViolation::FunctionalConstraint { index: i });
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng() -> SmallRng {
        use rand::SeedableRng;
        SmallRng::seed_from_u64(1)
    }

    #[test]
    fn sum_propagates_bidirectionally() {
        let mut ft = FloatTheory::default();
        let a = ft.variable("a", Interval::new(0.0, 10.0), 0.0);
        let b = ft.variable("b", Interval::new(0.0, 10.0), 0.0);
        let s = ft.variable("s", Interval::new(5.0, 5.0), 0.0);
        ft.sum(s, vec![a, b]);
        let (intervals, _, _) = ft.propagate(|_| false, |_| false).unwrap();
        let ra = ft.representative(a);
        assert!(intervals[ra].lo <= 5.0 && intervals[ra].hi >= 0.0);
    }

    #[test]
    fn equal_merges_domains() {
        let mut ft = FloatTheory::default();
        let a = ft.variable("a", Interval::new(0.0, 5.0), 0.0);
        let b = ft.variable("b", Interval::new(3.0, 10.0), 0.0);
        ft.equal(a, b);
        let (intervals, _, _) = ft.propagate(|_| false, |_| false).unwrap();
        let r = ft.representative(a);
        assert_eq!(intervals[r], Interval::new(3.0, 5.0));
    }

    #[test]
    fn contradictory_constant_bounds_make_the_domain_empty() {
        let mut ft = FloatTheory::default();
        let a = ft.variable("a", Interval::new(0.0, 1.0), 0.0);
        // fabricate a literal without a Problem: any nonzero prop id works for this unit test
        let lit = Literal::new(1, true);
        ft.bound_ge(a, lit, 5.0);
        assert!(ft.propagate(|l| l == lit, |_| false).is_none());
    }

    #[test]
    fn false_dependency_bound_narrows_by_its_complement() {
        let mut ft = FloatTheory::default();
        let a = ft.variable("a", Interval::new(0.0, 10.0), 0.0);
        let lit = Literal::new(1, true);
        // `lit` represents `a >= 6.0`; false, and a rule-body dependency, so
        // its complement `a <= 6.0` is known to hold.
        ft.bound_ge(a, lit, 6.0);
        let (intervals, _, _) = ft.propagate(|_| false, |p| p == lit.prop_id()).unwrap();
        let ra = ft.representative(a);
        assert_eq!(intervals[ra], Interval::new(0.0, 6.0));
    }

    #[test]
    fn false_non_dependency_bound_narrows_nothing() {
        let mut ft = FloatTheory::default();
        let a = ft.variable("a", Interval::new(0.0, 10.0), 0.0);
        let lit = Literal::new(1, true);
        ft.bound_ge(a, lit, 6.0);
        let (intervals, _, _) = ft.propagate(|_| false, |_| false).unwrap();
        let ra = ft.representative(a);
        assert_eq!(intervals[ra], Interval::new(0.0, 10.0));
    }

    #[test]
    fn sampling_respects_quantization() {
        let mut ft = FloatTheory::default();
        let a = ft.variable("a", Interval::new(0.0, 10.0), 2.5);
        let (intervals, active_vbounds, active_constraints) = ft.propagate(|_| false, |_| false).unwrap();
        let mut r = rng();
        let values = ft.sample(&intervals, &active_vbounds, &active_constraints, &mut r).unwrap();
        let v = values[a.0];
        assert!((v / 2.5).fract().abs() < 1e-4 || (v / 2.5).fract().abs() > 1.0 - 1e-4);
    }

    #[test]
    fn sampling_a_sum_keeps_the_total_exact() {
        let mut ft = FloatTheory::default();
        let a = ft.variable("a", Interval::new(0.0, 10.0), 0.0);
        let b = ft.variable("b", Interval::new(0.0, 10.0), 0.0);
        let s = ft.variable("s", Interval::new(10.0, 10.0), 0.0);
        ft.sum(s, vec![a, b]);
        let (intervals, active_vbounds, active_constraints) = ft.propagate(|_| false, |_| false).unwrap();
        let mut r = rng();
        let values = ft.sample(&intervals, &active_vbounds, &active_constraints, &mut r).unwrap();
        assert!((values[a.0] + values[b.0] - 10.0).abs() < 1e-3);
    }

    #[test]
    fn check_accepts_a_consistent_sample_and_rejects_a_tampered_one() {
        let mut ft = FloatTheory::default();
        let a = ft.variable("a", Interval::new(0.0, 10.0), 0.0);
        let b = ft.variable("b", Interval::new(0.0, 10.0), 0.0);
        let s = ft.variable("s", Interval::new(10.0, 10.0), 0.0);
        ft.sum(s, vec![a, b]);
        let (intervals, active_vbounds, active_constraints) = ft.propagate(|_| false, |_| false).unwrap();
        let mut r = rng();
        let values = ft.sample(&intervals, &active_vbounds, &active_constraints, &mut r).unwrap();
        assert!(ft.check(|_| false, &values, 1e-5).is_empty());

        let mut tampered = values.clone();
        tampered[s.0] += 1.0;
        let violations = ft.check(|_| false, &tampered, 1e-5);
        assert_eq!(violations, vec![FloatViolation::FunctionalConstraint { index: 0 }]);
    }

    #[test]
    fn variable_bound_forces_ordering() {
        let mut ft = FloatTheory::default();
        let a = ft.variable("a", Interval::new(0.0, 10.0), 0.0);
        let b = ft.variable("b", Interval::new(0.0, 10.0), 0.0);
        let lit = Literal::new(1, true);
        ft.variable_bound_le(a, b, lit);
        let (intervals, active_vbounds, active_constraints) = ft.propagate(|l| l == lit, |_| false).unwrap();
        let mut r = rng();
        let values = ft.sample(&intervals, &active_vbounds, &active_constraints, &mut r).unwrap();
        assert!(values[a.0] <= values[b.0] + 1e-4);
    }

    #[test]
    fn predetermined_value_overrides_domain() {
        let mut ft = FloatTheory::default();
        let a = ft.variable("a", Interval::new(0.0, 10.0), 0.0);
        ft.set_predetermined(a, 4.0);
        let (intervals, _, _) = ft.propagate(|_| false, |_| false).unwrap();
        let ra = ft.representative(a);
        assert_eq!(intervals[ra], Interval::point(4.0));
    }

    #[test]
    fn conditional_constraint_is_ignored_while_its_literal_is_false() {
        let mut ft = FloatTheory::default();
        let a = ft.variable("a", Interval::new(0.0, 10.0), 0.0);
        let b = ft.variable("b", Interval::new(0.0, 10.0), 0.0);
        let s = ft.variable("s", Interval::new(10.0, 10.0), 0.0);
        let lit = Literal::new(1, true);
        ft.sum_if(s, vec![a, b], Some(lit));
        let (intervals, _, active_constraints) = ft.propagate(|_l| false, |_| false).unwrap();
        assert!(!active_constraints[0]);
        let ra = ft.representative(a);
        assert_eq!(intervals[ra], Interval::new(0.0, 10.0));
    }

    #[test]
    fn add_is_memoized() {
        let mut ft = FloatTheory::default();
        let a = ft.variable("a", Interval::new(0.0, 10.0), 0.0);
        let b = ft.variable("b", Interval::new(0.0, 10.0), 0.0);
        let s1 = ft.add(a, b);
        let s2 = ft.add(a, b);
        assert_eq!(s1, s2);
    }

    #[test]
    fn div_narrows_as_the_inverse_of_mul() {
        let mut ft = FloatTheory::default();
        let a = ft.variable("a", Interval::new(10.0, 10.0), 0.0);
        let b = ft.variable("b", Interval::new(2.0, 2.0), 0.0);
        let r = ft.div(a, b);
        let (intervals, _, _) = ft.propagate(|_| false, |_| false).unwrap();
        let rr = ft.representative(r);
        assert_eq!(intervals[rr], Interval::new(5.0, 5.0));
    }

    #[test]
    fn sum_vars_is_memoized_and_narrows() {
        let mut ft = FloatTheory::default();
        let a = ft.variable("a", Interval::new(1.0, 1.0), 0.0);
        let b = ft.variable("b", Interval::new(2.0, 2.0), 0.0);
        let s1 = ft.sum_vars(vec![a, b]);
        let s2 = ft.sum_vars(vec![a, b]);
        assert_eq!(s1, s2);
        let (intervals, _, _) = ft.propagate(|_| false, |_| false).unwrap();
        let rs = ft.representative(s1);
        assert_eq!(intervals[rs], Interval::new(3.0, 3.0));
    }

    #[test]
    fn average_vars_rejects_conditional_terms() {
        let mut ft = FloatTheory::default();
        let a = ft.variable("a", Interval::new(0.0, 1.0), 0.0);
        let r = ft.variable("r", Interval::new(0.0, 1.0), 0.0);
        let lit = Literal::new(1, true);
        assert_eq!(ft.average(r, &[(a, Some(lit))]), Err(Error::ConditionalVariableInAggregate));
    }

    #[test]
    fn conditional_constraint_narrows_once_its_literal_holds() {
        let mut ft = FloatTheory::default();
        let a = ft.variable("a", Interval::new(0.0, 10.0), 0.0);
        let b = ft.variable("b", Interval::new(0.0, 10.0), 0.0);
        let s = ft.variable("s", Interval::new(10.0, 10.0), 0.0);
        let lit = Literal::new(1, true);
        ft.sum_if(s, vec![a, b], Some(lit));
        let (intervals, _, active_constraints) = ft.propagate(|l| l == lit, |_| false).unwrap();
        assert!(active_constraints[0]);
        let ra = ft.representative(a);
        assert!(intervals[ra].lo <= 10.0 && intervals[ra].hi >= 0.0);
        assert!(intervals[ra].hi <= 10.0);
    }
}

/*!
# CatSAT: a constraint solver for procedural content generation

CatSAT builds models the way a generator needs them: fast, plentiful, and
each one different from the last. It compiles a declarative program — facts,
rules, generalized cardinality clauses, and (optionally) arithmetic
constraints over continuous variables — and searches for a model with
WalkSAT-family stochastic local search rather than a complete
DPLL/CDCL decision procedure.

That tradeoff is the point: a generator doesn't need a *proof* that no model
exists, and it rarely wants the *same* model twice. What it needs is "give me
a consistent world, quickly, and a different one next time I ask." WalkSAT
gives up completeness for exactly that — it can say "found one" far faster
than a complete solver for problems in its sweet spot, it samples solutions
with enough diversity to avoid visibly repeating itself, and a fresh seed or
restart produces a different valid outcome instead of retracing the same
search tree. A companion float theory layers bounded arithmetic (sums,
products, powers, monotone functions) onto the same boolean core so a
generator can mix structural constraints ("this room connects to that one")
with numeric ones ("total treasure value stays under budget") in one model.

## Example

```
use catsat::prelude::*;

let mut problem = Problem::default();
let a = problem.proposition("a");
let b = problem.proposition("b");
problem.exists(vec![a, b]).unwrap();
problem.finalize().unwrap();
let solution = problem.solve().expect("solvable");
assert!(solution.is_true(a) || solution.is_true(b));
```

## Layout

- [`types`] — shared index types ([`types::Literal`], [`types::PropId`], [`types::FloatVarId`]).
- [`interval`] — closed-interval arithmetic used by the float theory.
- [`clause`] — the generalized cardinality clause model and proposition naming.
- [`builder`] — [`builder::Problem`]: the declaration API, Clark completion, `finalize`/`solve`.
- [`assign`] — the boolean valuation and clause-occurrence index WalkSAT flips against.
- [`solver`] — the WalkSAT search loop.
- [`theory`] — the seam between the boolean core and an arithmetic theory.
- [`float`] — the float theory: variables, bounds, and functional constraints.
- [`solution`] — [`solution::Solution`], the model a successful solve produces.
- [`validator`] — independent re-checking of a solution against its problem.
- [`config`] — search parameters ([`config::Config`]).
- [`error`] — build-time [`error::Error`] and the runtime [`error::Unsatisfiable`] marker.
*/
pub mod assign;
pub mod builder;
pub mod clause;
pub mod config;
pub mod error;
pub mod float;
pub mod interval;
pub mod solution;
pub mod solver;
pub mod theory;
pub mod types;
pub mod validator;

/// Re-exports of the names most programs need; `use catsat::prelude::*;`.
pub mod prelude {
    pub use crate::builder::{Predicate, Problem};
    pub use crate::clause::{Call, PropositionName, Term};
    pub use crate::config::Config;
    pub use crate::error::{Error, Unsatisfiable};
    pub use crate::solution::Solution;
    pub use crate::types::{FloatVarId, Literal};
}

pub use builder::Problem;
pub use config::Config;
pub use error::{Error, Unsatisfiable};
pub use solution::Solution;

/// Crate version number.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Build-time error kinds and the runtime search-failure marker.
//!
//! Build-time errors (malformed programs, non-tight rule sets, compile-time
//! unsatisfiability) are reported immediately through [`Error`] and abort
//! the build. Runtime search failure is terminal only for that particular
//! `solve()` call — it does not invalidate the `Problem` — so it is kept
//! out of `Error` entirely and represented by the separate [`Unsatisfiable`]
//! marker, selectable by the caller between a plain `Option` and a `Result`
//! (see [`crate::builder::Problem::solve`] and
//! [`crate::builder::Problem::solve_or_panic`]).
use thiserror::Error;

/// Errors produced while declaring or compiling a [`crate::builder::Problem`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("cannot assert the constant False")]
    AssertedFalse,

    #[error("a rule's head must not be a constant")]
    ConstantRuleHead,

    #[error("rules cannot be added after the program has been finalized")]
    ProgramFinalized,

    #[error("a functional-constraint proposition cannot be used as a dependency")]
    FunctionalConstraintAsDependency,

    #[error("Average/Variance reject variables that have a condition")]
    ConditionalVariableInAggregate,

    #[error("program is not tight: a positive dependency cycle was found")]
    NonTightProgram,

    #[error("unit propagation derived a contradiction at compile time")]
    UnsatAtCompileTime,

    #[error("arithmetic domain error: {0}")]
    Domain(String),
}

/// Result alias for build-time operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The search budget (`max_tries * max_flips` for the boolean solver, or
/// `max_float_tries` for the float theory layered on top) was exhausted
/// without finding a model.
///
/// This is not an [`Error`]: it does not indicate a malformed program, only
/// that this particular `solve()` call failed. The caller may adjust
/// [`crate::config::Config`] and retry on the same `Problem`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unsatisfiable;

impl std::fmt::Display for Unsatisfiable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no solution found within the configured search budget")
    }
}

impl std::error::Error for Unsatisfiable {}

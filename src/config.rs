//! Crate `config` provides the solver's tunable parameters.

/// Parameters governing both the boolean (WalkSAT) search and the float
/// theory solver layered on top of it.
///
/// No command-line derive is attached to this struct: a CLI is explicitly
/// out of scope for this crate — a consumer embedding `catsat` is expected
/// to build a `Config` directly or via its own argument parser.
#[derive(Clone, Debug)]
pub struct Config {
    //
    //## boolean search
    //
    /// Number of random-restart attempts before `solve()` gives up.
    pub max_tries: usize,

    /// Number of flips attempted within a single try before restarting.
    pub max_flips: usize,

    /// Chance, as a percentage in `0..=100`, of making a uniformly random
    /// flip instead of the greedy minimum-damage flip.
    pub noise: u8,

    /// Run the tightness check (positive-cycle detection) over rule bodies
    /// during `finalize()`. Disabling this is only safe when the caller
    /// knows their rules are tight by construction.
    pub tight: bool,

    /// Run unit propagation over normal (OR) clauses to fixpoint during
    /// `finalize()`, forcing any clause down to a single undetermined
    /// disjunct. Shrinks the search space before WalkSAT ever starts;
    /// purely an optimization, never changes the set of solutions.
    pub unit_propagate: bool,

    //
    //## float theory
    //
    /// Number of randomized sampling attempts the float theory makes per
    /// boolean candidate model before reporting failure.
    pub max_float_tries: usize,

    /// Tolerance against floating-point jitter when testing a value for
    /// being a multiple of a variable's quantization step.
    pub quantization_tolerance: f32,

    //
    //## reproducibility
    //
    /// PRNG seed. `None` seeds from entropy; `Some(seed)` makes `solve()`
    /// deterministic for a fixed `Problem` and `Config`.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            // boolean search
            max_tries: 20,
            max_flips: 10_000,
            noise: 5,
            tight: true,
            unit_propagate: true,

            // float theory
            max_float_tries: 10,
            quantization_tolerance: crate::interval::QUANTIZATION_TOLERANCE,

            // reproducibility
            seed: None,
        }
    }
}

impl Config {
    /// A `Config` seeded for a reproducible run; all other parameters keep
    /// their defaults.
    pub fn with_seed(seed: u64) -> Config {
        Config { seed: Some(seed), ..Config::default() }
    }
}

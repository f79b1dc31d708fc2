//! Closed interval arithmetic over `f32`, used by the float theory to bound
//! variables and narrow functional constraints.
//!
//! All operations bound the set of possible results of the pointwise
//! operation applied to any pair of members of the operand intervals.
//! Values are never NaN: callers must pre-clamp infinities and this module
//! asserts on entry that it never receives one.
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Tolerance against floating-point jitter when snapping to a quantization step.
pub const QUANTIZATION_TOLERANCE: f32 = 1e-5;

/// A closed interval `[lo, hi]` of `f32`.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Interval {
    pub lo: f32,
    pub hi: f32,
}

impl Interval {
    /// Builds `[lo, hi]`. Panics (via `debug_assert`) if either bound is NaN.
    pub fn new(lo: f32, hi: f32) -> Interval {
        debug_assert!(!lo.is_nan() && !hi.is_nan(), "interval bounds must not be NaN");
        Interval { lo, hi }
    }

    /// The single-point interval `[x, x]`.
    pub fn point(x: f32) -> Interval {
        Interval::new(x, x)
    }

    /// `true` iff the interval contains no point, i.e. `hi < lo`.
    pub fn is_empty(self) -> bool {
        self.hi < self.lo
    }

    /// `true` iff the interval contains exactly one point.
    pub fn is_unique(self) -> bool {
        self.hi == self.lo
    }

    /// `true` iff `lo < 0 < hi`.
    pub fn crosses_zero(self) -> bool {
        self.lo < 0.0 && 0.0 < self.hi
    }

    /// Intersection of two intervals; may be empty.
    pub fn intersect(self, other: Interval) -> Interval {
        Interval::new(self.lo.max(other.lo), self.hi.min(other.hi))
    }

    /// Union (convex hull) of two intervals.
    pub fn union(self, other: Interval) -> Interval {
        Interval::new(self.lo.min(other.lo), self.hi.max(other.hi))
    }

    /// `true` iff `x` lies within this interval (inclusive).
    pub fn contains(self, x: f32) -> bool {
        self.lo <= x && x <= self.hi
    }

    /// Integer power `self ^ n`, standard interval-power semantics.
    ///
    /// Handles the sign of `self` and the parity of `n`: an interval that
    /// crosses zero, raised to an even power, always yields `[0, max(lo, hi)^n]`;
    /// raised to an odd power it yields `[lo^n, hi^n]` directly since the sign
    /// is preserved monotonically.
    pub fn powi(self, n: i32) -> Interval {
        if n == 0 {
            return Interval::point(1.0);
        }
        if n % 2 == 1 {
            return Interval::new(self.lo.powi(n), self.hi.powi(n));
        }
        if self.crosses_zero() {
            let m = self.lo.abs().max(self.hi.abs());
            Interval::new(0.0, m.powi(n))
        } else if self.hi <= 0.0 {
            Interval::new(self.hi.powi(n), self.lo.powi(n))
        } else {
            Interval::new(self.lo.powi(n), self.hi.powi(n))
        }
    }

    /// The `n`-th root of this interval, the inverse of [`Interval::powi`].
    ///
    /// For even `n` and a result interval crossing (or touching) zero, this
    /// inflates to the symmetric envelope `[-n-th root of |hi|, +n-th root of |hi|]`
    /// rather than attempting to further narrow using the positive branch;
    /// this is the deliberately conservative choice between two equally
    /// defensible rounding rules.
    pub fn root(self, n: i32) -> Interval {
        debug_assert!(n > 0);
        if n % 2 == 1 {
            let root = |x: f32| x.signum() * x.abs().powf(1.0 / n as f32);
            return Interval::new(root(self.lo), root(self.hi));
        }
        // even root: only defined for non-negative arguments
        let hi = self.lo.max(self.hi);
        if hi < 0.0 {
            return Interval::new(1.0, -1.0); // empty
        }
        let bound = hi.max(0.0).powf(1.0 / n as f32);
        Interval::new(-bound, bound)
    }

    /// Rounds `x` up to the nearest multiple of `q`, within [`QUANTIZATION_TOLERANCE`].
    pub fn round_up(x: f32, q: f32) -> f32 {
        if q <= 0.0 {
            return x;
        }
        let steps = (x / q - QUANTIZATION_TOLERANCE).ceil();
        steps * q
    }

    /// Rounds `x` down to the nearest multiple of `q`, within [`QUANTIZATION_TOLERANCE`].
    pub fn round_down(x: f32, q: f32) -> f32 {
        if q <= 0.0 {
            return x;
        }
        let steps = (x / q + QUANTIZATION_TOLERANCE).floor();
        steps * q
    }

    /// Rounds the lower bound up and the upper bound down to multiples of
    /// `q`. `q <= 0.0` means dense (no quantization); the result may be empty.
    pub fn quantize(self, q: f32) -> Interval {
        if q <= 0.0 {
            return self;
        }
        Interval::new(Interval::round_up(self.lo, q), Interval::round_down(self.hi, q))
    }
}

impl Add for Interval {
    type Output = Interval;
    fn add(self, rhs: Interval) -> Interval {
        Interval::new(self.lo + rhs.lo, self.hi + rhs.hi)
    }
}

impl Neg for Interval {
    type Output = Interval;
    fn neg(self) -> Interval {
        Interval::new(-self.hi, -self.lo)
    }
}

impl Sub for Interval {
    type Output = Interval;
    fn sub(self, rhs: Interval) -> Interval {
        self + (-rhs)
    }
}

impl Mul for Interval {
    type Output = Interval;
    fn mul(self, rhs: Interval) -> Interval {
        let corners = [
            self.lo * rhs.lo,
            self.lo * rhs.hi,
            self.hi * rhs.lo,
            self.hi * rhs.hi,
        ];
        let lo = corners.iter().copied().fold(f32::INFINITY, f32::min);
        let hi = corners.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        Interval::new(lo, hi)
    }
}

impl Div for Interval {
    type Output = Interval;
    fn div(self, rhs: Interval) -> Interval {
        if rhs.lo == 0.0 && rhs.hi == 0.0 {
            return Interval::new(f32::NEG_INFINITY, f32::INFINITY);
        }
        if rhs.lo == 0.0 && 0.0 < rhs.hi {
            let a = self.hi / rhs.hi;
            let b = self.lo / rhs.hi;
            return Interval::new(a.min(b), f32::INFINITY);
        }
        if rhs.hi == 0.0 && rhs.lo < 0.0 {
            let a = self.hi / rhs.lo;
            let b = self.lo / rhs.lo;
            return Interval::new(f32::NEG_INFINITY, a.max(b));
        }
        if rhs.crosses_zero() {
            return Interval::new(f32::NEG_INFINITY, f32::INFINITY);
        }
        let recip = Interval::new(1.0 / rhs.hi, 1.0 / rhs.lo);
        self * recip
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_sub() {
        let a = Interval::new(1.0, 3.0);
        let b = Interval::new(-1.0, 2.0);
        assert_eq!(a + b, Interval::new(0.0, 5.0));
        assert_eq!(a - b, Interval::new(-1.0, 4.0));
    }

    #[test]
    fn mul_corners() {
        let a = Interval::new(-2.0, 3.0);
        let b = Interval::new(-1.0, 4.0);
        assert_eq!(a * b, Interval::new(-8.0, 12.0));
    }

    #[test]
    fn div_straddling_zero_denominator_is_all_reals() {
        let a = Interval::new(1.0, 2.0);
        let b = Interval::new(-1.0, 1.0);
        let r = a / b;
        assert_eq!(r, Interval::new(f32::NEG_INFINITY, f32::INFINITY));
    }

    #[test]
    fn powi_even_crossing_zero_inflates_symmetrically() {
        let a = Interval::new(-3.0, 2.0);
        assert_eq!(a.powi(2), Interval::new(0.0, 9.0));
    }

    #[test]
    fn powi_odd_preserves_monotonicity() {
        let a = Interval::new(-3.0, 2.0);
        assert_eq!(a.powi(3), Interval::new(-27.0, 8.0));
    }

    #[test]
    fn quantize_rounds_inward() {
        let a = Interval::new(2.3, 4.6);
        let q = a.quantize(0.5);
        assert_eq!(q, Interval::new(2.5, 4.5));
    }

    #[test]
    fn quantize_can_become_empty() {
        let a = Interval::new(2.1, 2.4);
        let q = a.quantize(0.5);
        assert!(q.is_empty());
    }

    #[test]
    fn root_even_is_symmetric_envelope() {
        let r = Interval::new(0.0, 9.0).root(2);
        assert_eq!(r, Interval::new(-3.0, 3.0));
    }
}

//! Basic index types shared by every other module.
use std::fmt;

/// A proposition's position in the problem's proposition table.
///
/// Index `0` is reserved and never handed out by [`crate::builder::Problem::proposition`];
/// it is used internally by [`Literal`] to represent the two constants.
pub type PropId = usize;

/// Index `0` is reserved: no real proposition is ever assigned it.
pub const NULL_PROP: PropId = 0;

/// A signed reference to a proposition: positive for the proposition itself,
/// negative for its negation. The magnitude is the proposition's [`PropId`].
///
/// ```
/// use catsat::types::Literal;
/// let p = Literal::new(3, true);
/// assert_eq!(p.negate(), Literal::new(3, false));
/// assert_eq!(p.prop_id(), 3);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Literal(i32);

impl Literal {
    /// Builds a literal referring to `prop_id` with the given polarity.
    pub fn new(prop_id: PropId, positive: bool) -> Literal {
        debug_assert_ne!(prop_id, NULL_PROP, "proposition 0 is reserved");
        Literal(if positive { prop_id as i32 } else { -(prop_id as i32) })
    }

    /// The proposition this literal refers to, independent of polarity.
    pub fn prop_id(self) -> PropId {
        self.0.unsigned_abs() as PropId
    }

    /// `true` if this literal asserts its proposition positively.
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// The literal with the opposite polarity over the same proposition.
    pub fn negate(self) -> Literal {
        Literal(-self.0)
    }

    /// Raw signed encoding: magnitude is the proposition index, sign is polarity.
    pub fn as_i32(self) -> i32 {
        self.0
    }
}

impl fmt::Debug for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_positive() {
            write!(f, "{}", self.prop_id())
        } else {
            write!(f, "-{}", self.prop_id())
        }
    }
}

/// Index of a clause inside a [`crate::clause::ClauseDb`].
pub type ClauseId = usize;

/// Index of a float variable inside a `Problem`'s variable arena.
///
/// A thin newtype rather than a bare `usize`, so a variable handle can't be
/// accidentally mixed up with a `PropId` or a plain array index.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct FloatVarId(pub usize);

impl fmt::Display for FloatVarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

//! Positions on the 64-bit hash ring.

use std::fmt;

/// A position on the ring.
///
/// Both virtual nodes and routing keys are mapped to tokens by the same
/// [`Partitioner`](crate::partitioner::Partitioner), so a key can be placed
/// relative to the vnodes around it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Token(pub u64);

impl Token {
    /// Start of the ring.
    pub const MIN: Token = Token(0);
    /// End of the ring; the next position wraps to [`Token::MIN`].
    pub const MAX: Token = Token(u64::MAX);

    /// Clockwise distance from `self` to `other`.
    #[inline]
    pub fn distance_to(&self, other: &Self) -> u64 {
        other.0.wrapping_sub(self.0)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

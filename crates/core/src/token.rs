//! Ring tokens, owned token ranges, and the range planner.
//!
//! A node owns the interval that ends at each of its tokens and starts just
//! after the previous token on the ring. [`compute_owned_ranges`] turns the
//! ring listing into one [`TokenRange`] per local token.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// A position on the partition ring.
///
/// Held as `i128` so that both Murmur3 (signed 64-bit) and Random
/// partitioner (0..2^127) tokens fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub i128);

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Token {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i128>().map(Token)
    }
}

impl From<i64> for Token {
    fn from(value: i64) -> Self {
        Token(i128::from(value))
    }
}

// Serialized as a decimal string: JSON consumers generally cannot hold
// 128-bit integers without losing precision.
impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One contiguous ring interval owned by the local node, `(start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TokenRange {
    /// Exclusive lower bound: the ring predecessor of `end`.
    pub start: Token,
    /// Inclusive upper bound: a token owned by the local node.
    pub end: Token,
}

impl TokenRange {
    pub fn new(start: Token, end: Token) -> Self {
        Self { start, end }
    }

    /// True for the single range that crosses the ring's minimum.
    pub fn wraps(&self) -> bool {
        self.start >= self.end
    }
}

impl fmt::Display for TokenRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}]", self.start, self.end)
    }
}

/// Compute the ranges owned by the local node.
///
/// `all` is every token listed on the ring and `local` the subset owned by
/// this node. Both are treated as sets. The result holds one range per
/// distinct local token, in ascending local-token order; each range starts at
/// the token's predecessor on the sorted ring, wrapping to the largest ring
/// token for the smallest one.
///
/// Local tokens missing from `all` are folded into the ring first so they
/// still receive a well-defined predecessor.
///
/// Returns an empty vec when the ring holds fewer than two tokens or `local`
/// is empty.
pub fn compute_owned_ranges(all: &[Token], local: &[Token]) -> Vec<TokenRange> {
    let mut ring: Vec<Token> = all.iter().chain(local.iter()).copied().collect();
    ring.sort_unstable();
    ring.dedup();

    let mut owned = local.to_vec();
    owned.sort_unstable();
    owned.dedup();

    if ring.len() < 2 || owned.is_empty() {
        return Vec::new();
    }

    let last = ring[ring.len() - 1];

    owned
        .into_iter()
        .filter_map(|end| {
            let idx = ring.binary_search(&end).ok()?;
            let start = if idx == 0 { last } else { ring[idx - 1] };
            Some(TokenRange::new(start, end))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

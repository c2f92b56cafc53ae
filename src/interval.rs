//! Integer interval domain.
//!
//! Values are bounded by [`Bound`]s which may be infinite. Finite arithmetic
//! saturates at the `i64` range, and integer division follows the JVM:
//! truncation towards zero.

use std::cmp::{max, min};
use std::fmt;

use serde::Serialize;

use crate::domain::Lattice;

/// Bound of an interval: -∞, finite value, or +∞.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Bound {
    NegInf,
    Finite(i64),
    PosInf,
}

impl Bound {
    pub fn as_finite(&self) -> Option<i64> {
        match self {
            Bound::Finite(n) => Some(*n),
            _ => None,
        }
    }

    fn signum(&self) -> i64 {
        match self {
            Bound::NegInf => -1,
            Bound::Finite(n) => n.signum(),
            Bound::PosInf => 1,
        }
    }

    fn infinity(sign: i64) -> Bound {
        if sign < 0 {
            Bound::NegInf
        } else {
            Bound::PosInf
        }
    }

    pub fn add(&self, other: &Bound) -> Bound {
        match (self, other) {
            (Bound::Finite(a), Bound::Finite(b)) => Bound::Finite(a.saturating_add(*b)),
            (Bound::NegInf, Bound::PosInf) | (Bound::PosInf, Bound::NegInf) => {
                // Undefined: only reachable through empty operands
                Bound::PosInf
            }
            (Bound::NegInf, _) | (_, Bound::NegInf) => Bound::NegInf,
            (Bound::PosInf, _) | (_, Bound::PosInf) => Bound::PosInf,
        }
    }

    pub fn sub(&self, other: &Bound) -> Bound {
        match (self, other) {
            (Bound::Finite(a), Bound::Finite(b)) => Bound::Finite(a.saturating_sub(*b)),
            (Bound::PosInf, Bound::NegInf) => Bound::PosInf,
            (Bound::NegInf, Bound::PosInf) => Bound::NegInf,
            (Bound::PosInf, _) => Bound::PosInf,
            (Bound::NegInf, _) => Bound::NegInf,
            (_, Bound::PosInf) => Bound::NegInf,
            (_, Bound::NegInf) => Bound::PosInf,
        }
    }

    pub fn mul(&self, other: &Bound) -> Bound {
        match (self, other) {
            (Bound::Finite(a), Bound::Finite(b)) => Bound::Finite(a.saturating_mul(*b)),
            (Bound::Finite(0), _) | (_, Bound::Finite(0)) => Bound::Finite(0),
            _ => Bound::infinity(self.signum() * other.signum()),
        }
    }

    /// Truncating division. The divisor must not be zero.
    pub fn div(&self, other: &Bound) -> Bound {
        match (self, other) {
            (Bound::Finite(a), Bound::Finite(b)) => Bound::Finite(a.saturating_div(*b)),
            (Bound::Finite(_), _) => Bound::Finite(0),
            _ => Bound::infinity(self.signum() * other.signum()),
        }
    }

    pub fn neg(&self) -> Bound {
        match self {
            Bound::NegInf => Bound::PosInf,
            Bound::Finite(n) => Bound::Finite(n.saturating_neg()),
            Bound::PosInf => Bound::NegInf,
        }
    }

    pub fn abs(&self) -> Bound {
        match self {
            Bound::Finite(n) => Bound::Finite(n.saturating_abs()),
            _ => Bound::PosInf,
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::NegInf => write!(f, "-∞"),
            Bound::Finite(n) => write!(f, "{}", n),
            Bound::PosInf => write!(f, "+∞"),
        }
    }
}

/// Interval: [low, high].
///
/// The empty interval is kept in the canonical form `[+∞, -∞]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Interval {
    pub low: Bound,
    pub high: Bound,
}

impl Interval {
    pub fn new(low: Bound, high: Bound) -> Self {
        if low > high || low == Bound::PosInf || high == Bound::NegInf {
            Self::bottom()
        } else {
            Self { low, high }
        }
    }

    pub fn finite(low: i64, high: i64) -> Self {
        Self::new(Bound::Finite(low), Bound::Finite(high))
    }

    pub fn constant(value: i64) -> Self {
        Self {
            low: Bound::Finite(value),
            high: Bound::Finite(value),
        }
    }

    /// `[value, +∞]`
    pub fn at_least(value: i64) -> Self {
        Self::new(Bound::Finite(value), Bound::PosInf)
    }

    /// `[-∞, value]`
    pub fn at_most(value: i64) -> Self {
        Self::new(Bound::NegInf, Bound::Finite(value))
    }

    pub fn top() -> Self {
        Self {
            low: Bound::NegInf,
            high: Bound::PosInf,
        }
    }

    pub fn bottom() -> Self {
        Self {
            low: Bound::PosInf,
            high: Bound::NegInf,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.low > self.high
    }

    pub fn contains(&self, value: i64) -> bool {
        !self.is_empty() && self.low <= Bound::Finite(value) && Bound::Finite(value) <= self.high
    }

    pub fn is_singleton(&self) -> Option<i64> {
        match (self.low, self.high) {
            (Bound::Finite(l), Bound::Finite(h)) if l == h => Some(l),
            _ => None,
        }
    }

    /// Drop `value` from the interval. Only an endpoint can be removed; a
    /// value strictly inside leaves the interval unchanged.
    pub fn excluding(&self, value: i64) -> Interval {
        if !self.contains(value) {
            return *self;
        }
        if self.is_singleton() == Some(value) {
            return Interval::bottom();
        }
        if self.low == Bound::Finite(value) {
            return Interval::new(Bound::Finite(value.saturating_add(1)), self.high);
        }
        if self.high == Bound::Finite(value) {
            return Interval::new(self.low, Bound::Finite(value.saturating_sub(1)));
        }
        *self
    }

    pub fn add(&self, other: &Interval) -> Interval {
        if self.is_empty() || other.is_empty() {
            return Interval::bottom();
        }
        Interval::new(self.low.add(&other.low), self.high.add(&other.high))
    }

    pub fn sub(&self, other: &Interval) -> Interval {
        if self.is_empty() || other.is_empty() {
            return Interval::bottom();
        }
        Interval::new(self.low.sub(&other.high), self.high.sub(&other.low))
    }

    pub fn neg(&self) -> Interval {
        if self.is_empty() {
            return Interval::bottom();
        }
        Interval::new(self.high.neg(), self.low.neg())
    }

    pub fn mul(&self, other: &Interval) -> Interval {
        if self.is_empty() || other.is_empty() {
            return Interval::bottom();
        }
        Self::hull([
            self.low.mul(&other.low),
            self.low.mul(&other.high),
            self.high.mul(&other.low),
            self.high.mul(&other.high),
        ])
    }

    /// Truncating division over the non-zero part of the divisor.
    ///
    /// A divisor that is exactly `{0}` yields ⊥: no execution survives it.
    pub fn div(&self, other: &Interval) -> Interval {
        if self.is_empty() || other.is_empty() {
            return Interval::bottom();
        }
        let negative = other.meet(&Interval::at_most(-1));
        let positive = other.meet(&Interval::at_least(1));
        [negative, positive]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| {
                Self::hull([
                    self.low.div(&part.low),
                    self.low.div(&part.high),
                    self.high.div(&part.low),
                    self.high.div(&part.high),
                ])
            })
            .fold(Interval::bottom(), |acc, q| acc.join(&q))
    }

    /// Remainder with the sign of the dividend, bounded by the largest
    /// divisor magnitude.
    pub fn rem(&self, other: &Interval) -> Interval {
        if self.is_empty() || other.is_empty() {
            return Interval::bottom();
        }
        let divisor = other.excluding(0);
        if divisor.is_empty() {
            return Interval::bottom();
        }
        if let (Some(a), Some(b)) = (self.is_singleton(), divisor.is_singleton()) {
            if b != 0 {
                return Interval::constant(a.wrapping_rem(b));
            }
        }

        let magnitude = max(divisor.low.abs(), divisor.high.abs());
        let bound = magnitude.sub(&Bound::Finite(1));
        let low = if self.low >= Bound::Finite(0) {
            Bound::Finite(0)
        } else {
            max(self.low, bound.neg())
        };
        let high = if self.high <= Bound::Finite(0) {
            Bound::Finite(0)
        } else {
            min(self.high, bound)
        };
        Interval::new(low, high)
    }

    fn hull(bounds: [Bound; 4]) -> Interval {
        let low = bounds.iter().copied().min().unwrap_or(Bound::NegInf);
        let high = bounds.iter().copied().max().unwrap_or(Bound::PosInf);
        Interval::new(low, high)
    }
}

impl Lattice for Interval {
    fn bottom() -> Self {
        Interval::bottom()
    }

    fn top() -> Self {
        Interval::top()
    }

    fn is_bottom(&self) -> bool {
        self.is_empty()
    }

    fn le(&self, other: &Self) -> bool {
        if self.is_empty() {
            return true;
        }
        if other.is_empty() {
            return false;
        }
        other.low <= self.low && self.high <= other.high
    }

    fn join(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Interval {
            low: min(self.low, other.low),
            high: max(self.high, other.high),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        Interval::new(max(self.low, other.low), min(self.high, other.high))
    }

    fn widen(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let low = if other.low < self.low { Bound::NegInf } else { self.low };
        let high = if other.high > self.high { Bound::PosInf } else { self.high };
        Interval { low, high }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "⊥")
        } else {
            write!(f, "[{}, {}]", self.low, self.high)
        }
    }
}

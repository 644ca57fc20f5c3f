//! Lattice operations for the interval and Boolean domains.

use std::cmp::Ordering;

/// A lattice element with the operations the fixpoint engine needs.
pub trait Lattice: Clone + PartialEq + Sized {
    fn bottom() -> Self;
    fn top() -> Self;
    fn is_bottom(&self) -> bool;

    /// Least upper bound, for merging control-flow paths.
    fn join(&self, other: &Self) -> Self;

    /// Greatest lower bound, for intersecting constraints.
    fn meet(&self, other: &Self) -> Self;

    /// `self` is at least as precise as `other`.
    fn leq(&self, other: &Self) -> bool;

    /// Widening, to force termination on infinite ascending chains.
    /// Defaults to join; infinite domains override.
    fn widen(&self, other: &Self) -> Self {
        self.join(other)
    }
}

/// An integer bound, possibly infinite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    NegInf,
    Finite(i64),
    PosInf,
}

impl Bound {
    fn cmp_key(&self) -> (i8, i64) {
        match self {
            Bound::NegInf => (-1, 0),
            Bound::Finite(v) => (0, *v),
            Bound::PosInf => (1, 0),
        }
    }

    pub fn add(self, other: Bound) -> Bound {
        use Bound::*;
        match (self, other) {
            (NegInf, PosInf) | (PosInf, NegInf) => {
                // Only reachable through malformed intervals.
                Finite(0)
            }
            (NegInf, _) | (_, NegInf) => NegInf,
            (PosInf, _) | (_, PosInf) => PosInf,
            (Finite(a), Finite(b)) => Finite(a.saturating_add(b)),
        }
    }

    pub fn neg(self) -> Bound {
        match self {
            Bound::NegInf => Bound::PosInf,
            Bound::PosInf => Bound::NegInf,
            Bound::Finite(v) => Bound::Finite(v.saturating_neg()),
        }
    }

    pub fn mul(self, other: Bound) -> Bound {
        use Bound::*;
        let sign = |b: &Bound| match b {
            NegInf => -1,
            PosInf => 1,
            Finite(v) => v.signum() as i32,
        };
        match (self, other) {
            (Finite(0), _) | (_, Finite(0)) => Finite(0),
            (Finite(a), Finite(b)) => Finite(a.saturating_mul(b)),
            (a, b) => {
                if sign(&a) * sign(&b) >= 0 {
                    PosInf
                } else {
                    NegInf
                }
            }
        }
    }

    /// The largest integer strictly below this bound.
    pub fn pred(self) -> Bound {
        match self {
            Bound::Finite(v) => Bound::Finite(v.saturating_sub(1)),
            inf => inf,
        }
    }

    /// The smallest integer strictly above this bound.
    pub fn succ(self) -> Bound {
        match self {
            Bound::Finite(v) => Bound::Finite(v.saturating_add(1)),
            inf => inf,
        }
    }
}

impl PartialOrd for Bound {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Bound {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_key().cmp(&other.cmp_key())
    }
}

/// A (possibly empty) integer interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Bottom,
    Range { lo: Bound, hi: Bound },
}

impl Interval {
    pub fn range(lo: Bound, hi: Bound) -> Interval {
        if lo > hi {
            Interval::Bottom
        } else {
            Interval::Range { lo, hi }
        }
    }

    pub fn singleton(v: i64) -> Interval {
        Interval::Range {
            lo: Bound::Finite(v),
            hi: Bound::Finite(v),
        }
    }

    pub fn below(hi: Bound) -> Interval {
        Interval::range(Bound::NegInf, hi)
    }

    pub fn above(lo: Bound) -> Interval {
        Interval::range(lo, Bound::PosInf)
    }

    pub fn bounds(&self) -> Option<(Bound, Bound)> {
        match self {
            Interval::Bottom => None,
            Interval::Range { lo, hi } => Some((*lo, *hi)),
        }
    }

    pub fn as_singleton(&self) -> Option<i64> {
        match self {
            Interval::Range {
                lo: Bound::Finite(a),
                hi: Bound::Finite(b),
            } if a == b => Some(*a),
            _ => None,
        }
    }

    pub fn add(&self, other: &Interval) -> Interval {
        match (self.bounds(), other.bounds()) {
            (Some((a, b)), Some((c, d))) => Interval::range(a.add(c), b.add(d)),
            _ => Interval::Bottom,
        }
    }

    pub fn sub(&self, other: &Interval) -> Interval {
        self.add(&other.neg())
    }

    pub fn neg(&self) -> Interval {
        match self.bounds() {
            Some((lo, hi)) => Interval::range(hi.neg(), lo.neg()),
            None => Interval::Bottom,
        }
    }

    pub fn mul(&self, other: &Interval) -> Interval {
        match (self.bounds(), other.bounds()) {
            (Some((a, b)), Some((c, d))) => {
                let products = [a.mul(c), a.mul(d), b.mul(c), b.mul(d)];
                let lo = *products.iter().min().unwrap();
                let hi = *products.iter().max().unwrap();
                Interval::range(lo, hi)
            }
            _ => Interval::Bottom,
        }
    }
}

impl Lattice for Interval {
    fn bottom() -> Self {
        Interval::Bottom
    }

    fn top() -> Self {
        Interval::Range {
            lo: Bound::NegInf,
            hi: Bound::PosInf,
        }
    }

    fn is_bottom(&self) -> bool {
        matches!(self, Interval::Bottom)
    }

    fn join(&self, other: &Self) -> Self {
        match (self.bounds(), other.bounds()) {
            (None, _) => *other,
            (_, None) => *self,
            (Some((a, b)), Some((c, d))) => Interval::range(a.min(c), b.max(d)),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        match (self.bounds(), other.bounds()) {
            (Some((a, b)), Some((c, d))) => Interval::range(a.max(c), b.min(d)),
            _ => Interval::Bottom,
        }
    }

    fn leq(&self, other: &Self) -> bool {
        match (self.bounds(), other.bounds()) {
            (None, _) => true,
            (_, None) => false,
            (Some((a, b)), Some((c, d))) => c <= a && b <= d,
        }
    }

    fn widen(&self, other: &Self) -> Self {
        match (self.bounds(), other.bounds()) {
            (None, _) => *other,
            (_, None) => *self,
            (Some((a, b)), Some((c, d))) => {
                let lo = if c < a { Bound::NegInf } else { a };
                let hi = if d > b { Bound::PosInf } else { b };
                Interval::range(lo, hi)
            }
        }
    }
}

/// Flat Boolean lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsBool {
    Bot,
    True,
    False,
    Top,
}

impl AbsBool {
    pub fn known(b: bool) -> AbsBool {
        if b {
            AbsBool::True
        } else {
            AbsBool::False
        }
    }

    pub fn not(self) -> AbsBool {
        match self {
            AbsBool::True => AbsBool::False,
            AbsBool::False => AbsBool::True,
            other => other,
        }
    }

    pub fn and(self, other: AbsBool) -> AbsBool {
        use AbsBool::*;
        match (self, other) {
            (Bot, _) | (_, Bot) => Bot,
            (False, _) | (_, False) => False,
            (True, True) => True,
            _ => Top,
        }
    }

    pub fn or(self, other: AbsBool) -> AbsBool {
        use AbsBool::*;
        match (self, other) {
            (Bot, _) | (_, Bot) => Bot,
            (True, _) | (_, True) => True,
            (False, False) => False,
            _ => Top,
        }
    }

    pub fn xor(self, other: AbsBool) -> AbsBool {
        use AbsBool::*;
        match (self, other) {
            (Bot, _) | (_, Bot) => Bot,
            (True, True) | (False, False) => False,
            (True, False) | (False, True) => True,
            _ => Top,
        }
    }
}

impl Lattice for AbsBool {
    fn bottom() -> Self {
        AbsBool::Bot
    }

    fn top() -> Self {
        AbsBool::Top
    }

    fn is_bottom(&self) -> bool {
        matches!(self, AbsBool::Bot)
    }

    fn join(&self, other: &Self) -> Self {
        use AbsBool::*;
        match (self, other) {
            (Bot, x) | (x, Bot) => *x,
            (Top, _) | (_, Top) => Top,
            (a, b) if a == b => *a,
            _ => Top,
        }
    }

    fn meet(&self, other: &Self) -> Self {
        use AbsBool::*;
        match (self, other) {
            (Top, x) | (x, Top) => *x,
            (Bot, _) | (_, Bot) => Bot,
            (a, b) if a == b => *a,
            _ => Bot,
        }
    }

    fn leq(&self, other: &Self) -> bool {
        use AbsBool::*;
        matches!(
            (self, other),
            (Bot, _) | (_, Top) | (True, True) | (False, False)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_join_and_meet() {
        let a = Interval::range(Bound::Finite(0), Bound::Finite(5));
        let b = Interval::range(Bound::Finite(3), Bound::Finite(9));
        assert_eq!(
            a.join(&b),
            Interval::range(Bound::Finite(0), Bound::Finite(9))
        );
        assert_eq!(
            a.meet(&b),
            Interval::range(Bound::Finite(3), Bound::Finite(5))
        );

        let c = Interval::range(Bound::Finite(7), Bound::Finite(8));
        assert!(a.meet(&c).is_bottom());
    }

    #[test]
    fn empty_range_normalizes_to_bottom() {
        assert!(Interval::range(Bound::Finite(2), Bound::Finite(1)).is_bottom());
    }

    #[test]
    fn interval_arithmetic() {
        let a = Interval::range(Bound::Finite(1), Bound::Finite(3));
        let b = Interval::range(Bound::Finite(-2), Bound::Finite(2));
        assert_eq!(
            a.add(&b),
            Interval::range(Bound::Finite(-1), Bound::Finite(5))
        );
        assert_eq!(
            a.mul(&b),
            Interval::range(Bound::Finite(-6), Bound::Finite(6))
        );
        assert_eq!(
            a.neg(),
            Interval::range(Bound::Finite(-3), Bound::Finite(-1))
        );
    }

    #[test]
    fn multiplying_zero_by_unbounded_stays_zero() {
        let zero = Interval::singleton(0);
        let top = Interval::top();
        assert_eq!(zero.mul(&top), zero);
    }

    #[test]
    fn widening_pushes_unstable_bounds_to_infinity() {
        let a = Interval::range(Bound::Finite(0), Bound::Finite(1));
        let b = Interval::range(Bound::Finite(0), Bound::Finite(2));
        assert_eq!(a.widen(&b), Interval::range(Bound::Finite(0), Bound::PosInf));
        // Stable bound is kept.
        assert_eq!(a.widen(&a), a);
    }

    #[test]
    fn interval_leq_is_inclusion() {
        let small = Interval::range(Bound::Finite(1), Bound::Finite(2));
        let big = Interval::range(Bound::Finite(0), Bound::Finite(5));
        assert!(small.leq(&big));
        assert!(!big.leq(&small));
        assert!(Interval::Bottom.leq(&small));
    }

    #[test]
    fn absbool_algebra() {
        use AbsBool::*;
        assert_eq!(True.and(False), False);
        assert_eq!(True.and(Top), Top);
        assert_eq!(False.and(Top), False);
        assert_eq!(True.or(Top), True);
        assert_eq!(True.meet(&False), Bot);
        assert_eq!(True.join(&False), Top);
        assert!(Bot.leq(&True));
        assert!(True.leq(&Top));
    }
}

//! Core lattice trait and utilities.

use std::fmt::Debug;

/// Lattice interface implemented by every abstract element of the analysis.
///
/// # Lattice Properties
///
/// An implementation must satisfy:
/// - Reflexivity: `∀a. a ⊑ a`
/// - Transitivity: `∀a,b,c. a ⊑ b ∧ b ⊑ c ⇒ a ⊑ c`
/// - Join is an upper bound: `a ⊑ a ⊔ b`, `b ⊑ a ⊔ b`
/// - Meet is a lower bound: `a ⊓ b ⊑ a`, `a ⊓ b ⊑ b`
/// - Widening is extensive: `a ⊑ a ∇ b` and `b ⊑ a ∇ b`
pub trait Lattice: Clone + Debug + PartialEq {
    /// Bottom element (⊥): no concrete value.
    fn bottom() -> Self;

    /// Top element (⊤): every concrete value.
    fn top() -> Self;

    fn is_bottom(&self) -> bool;

    fn is_top(&self) -> bool {
        *self == Self::top()
    }

    /// Partial order: `self ⊑ other` (self is more precise than other).
    fn le(&self, other: &Self) -> bool;

    /// Join (`⊔`): least upper bound.
    fn join(&self, other: &Self) -> Self;

    /// Meet (`⊓`): greatest lower bound.
    fn meet(&self, other: &Self) -> Self;

    /// Widening (`∇`): extrapolates growing components so that ascending
    /// chains stabilise.
    ///
    /// Must satisfy: `self ⊑ self ∇ other`.
    fn widen(&self, other: &Self) -> Self;

    /// Narrowing (`∆`): recovers precision lost by widening.
    fn narrow(&self, other: &Self) -> Self {
        self.meet(other)
    }

    /// Equality up to the order.
    fn equiv(&self, other: &Self) -> bool {
        self.le(other) && other.le(self)
    }

    /// Join multiple elements.
    fn join_many<I>(elems: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        elems.into_iter().fold(Self::bottom(), |acc, e| acc.join(&e))
    }
}

/// Test helper: validate basic lattice axioms over a set of samples.
///
/// Panics on the first violated axiom.
pub fn check_lattice_axioms<L: Lattice>(samples: &[L]) {
    let bottom = L::bottom();
    let top = L::top();

    for a in samples {
        // Reflexivity: a ⊑ a
        assert!(a.le(a), "Reflexivity failed for {:?}", a);

        // Bounds: ⊥ ⊑ a ⊑ ⊤
        assert!(bottom.le(a), "Bottom is not below {:?}", a);
        assert!(a.le(&top), "{:?} is not below top", a);

        // Identity: a ⊔ ⊥ = a
        assert!(a.join(&bottom).equiv(a), "Join with bottom failed for {:?}", a);

        // Identity: a ⊓ ⊤ = a
        assert!(a.meet(&top).equiv(a), "Meet with top failed for {:?}", a);
    }

    for a in samples {
        for b in samples {
            // Commutativity: a ⊔ b = b ⊔ a
            assert!(
                a.join(b).equiv(&b.join(a)),
                "Join commutativity failed for {:?}, {:?}",
                a,
                b
            );

            // Commutativity: a ⊓ b = b ⊓ a
            assert!(
                a.meet(b).equiv(&b.meet(a)),
                "Meet commutativity failed for {:?}, {:?}",
                a,
                b
            );

            // Join upper bound: a ⊑ (a ⊔ b)
            let joined = a.join(b);
            assert!(a.le(&joined), "Join is not upper bound for {:?}", a);
            assert!(b.le(&joined), "Join is not upper bound for {:?}", b);

            // Meet lower bound: (a ⊓ b) ⊑ a
            let met = a.meet(b);
            assert!(met.le(a), "Meet is not lower bound of {:?}", a);
            assert!(met.le(b), "Meet is not lower bound of {:?}", b);

            // Widening is extensive
            let widened = a.widen(&joined);
            assert!(a.le(&widened), "Widening does not preserve order for {:?}", a);
            assert!(joined.le(&widened), "Widening is below its argument for {:?}", joined);

            // Associativity of join
            for c in samples {
                let left = a.join(b).join(c);
                let right = a.join(&b.join(c));
                assert!(left.equiv(&right), "Join associativity failed");
            }
        }
    }
}

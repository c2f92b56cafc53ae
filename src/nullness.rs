//! Nullability domain.
//!
//! ```text
//!        MaybeNull
//!        /       \
//!   NonNull   DefinitelyNull
//!        \       /
//!       Unreachable
//! ```

use std::fmt;

use serde::Serialize;

use crate::domain::Lattice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Nullness {
    Unreachable,
    NonNull,
    DefinitelyNull,
    MaybeNull,
}

impl Nullness {
    pub fn may_be_null(self) -> bool {
        matches!(self, Nullness::DefinitelyNull | Nullness::MaybeNull)
    }

    pub fn may_be_nonnull(self) -> bool {
        matches!(self, Nullness::NonNull | Nullness::MaybeNull)
    }
}

impl Lattice for Nullness {
    fn bottom() -> Self {
        Nullness::Unreachable
    }

    fn top() -> Self {
        Nullness::MaybeNull
    }

    fn is_bottom(&self) -> bool {
        *self == Nullness::Unreachable
    }

    fn le(&self, other: &Self) -> bool {
        self.join(other) == *other
    }

    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (Nullness::Unreachable, x) | (x, Nullness::Unreachable) => *x,
            (a, b) if a == b => *a,
            _ => Nullness::MaybeNull,
        }
    }

    fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            (Nullness::MaybeNull, x) | (x, Nullness::MaybeNull) => *x,
            (a, b) if a == b => *a,
            _ => Nullness::Unreachable,
        }
    }

    /// Finite height: widening is join.
    fn widen(&self, other: &Self) -> Self {
        self.join(other)
    }
}

impl fmt::Display for Nullness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Nullness::Unreachable => write!(f, "⊥"),
            Nullness::NonNull => write!(f, "non-null"),
            Nullness::DefinitelyNull => write!(f, "null"),
            Nullness::MaybeNull => write!(f, "maybe-null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::domain::check_lattice_axioms;

    #[test]
    fn test_diamond() {
        assert_eq!(Nullness::NonNull.join(&Nullness::DefinitelyNull), Nullness::MaybeNull);
        assert_eq!(Nullness::NonNull.meet(&Nullness::DefinitelyNull), Nullness::Unreachable);
        assert_eq!(Nullness::MaybeNull.meet(&Nullness::NonNull), Nullness::NonNull);
        assert!(Nullness::Unreachable.le(&Nullness::NonNull));
        assert!(!Nullness::MaybeNull.le(&Nullness::NonNull));
        assert!(!Nullness::NonNull.le(&Nullness::DefinitelyNull));
    }

    #[test]
    fn test_predicates() {
        assert!(Nullness::MaybeNull.may_be_null());
        assert!(Nullness::MaybeNull.may_be_nonnull());
        assert!(!Nullness::NonNull.may_be_null());
        assert!(!Nullness::DefinitelyNull.may_be_nonnull());
        assert!(!Nullness::Unreachable.may_be_null());
    }

    #[test]
    fn test_nullness_lattice_axioms() {
        check_lattice_axioms(&[
            Nullness::Unreachable,
            Nullness::NonNull,
            Nullness::DefinitelyNull,
            Nullness::MaybeNull,
        ]);
    }
}

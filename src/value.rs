//! Abstract values and the one-level heap shape.
//!
//! An [`AbstractValue`] is the reduced product of an integer [`Interval`], a
//! [`Nullness`] and, for arrays, an interval of possible lengths. A single
//! product type serves every [`Kind`]: integers are `NonNull`, references
//! carry a `⊤` interval, and [`AbstractValue::as_kind`] projects a value onto
//! the components that are meaningful for a declared kind.
//!
//! A [`Shape`] summarises the object a reference variable points to: one
//! [`Slot`] per known field, a `rest` slot for every other field, and a single
//! amalgamated slot for all array elements.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::domain::Lattice;
use crate::interval::Interval;
use crate::ir::Kind;
use crate::nullness::Nullness;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AbstractValue {
    pub interval: Interval,
    pub nullness: Nullness,
    /// Possible lengths of the array when non-null. `None` is unconstrained.
    pub length: Option<Interval>,
}

impl AbstractValue {
    /// Integer value in `interval`.
    pub fn int(interval: Interval) -> Self {
        Self::normalized(interval, Nullness::NonNull, None)
    }

    pub fn constant(value: i64) -> Self {
        Self::int(Interval::constant(value))
    }

    /// Floating-point value; floats are not tracked numerically.
    pub fn float() -> Self {
        Self::normalized(Interval::top(), Nullness::NonNull, None)
    }

    pub fn reference(nullness: Nullness) -> Self {
        Self::normalized(Interval::top(), nullness, None)
    }

    /// Array reference whose length, when non-null, lies in `length`.
    pub fn array(nullness: Nullness, length: Interval) -> Self {
        Self::normalized(Interval::top(), nullness, Some(length.meet(&Interval::at_least(0))))
    }

    /// The `null` constant.
    pub fn null() -> Self {
        Self::normalized(Interval::top(), Nullness::DefinitelyNull, Some(Interval::bottom()))
    }

    /// Default content of a fresh field or array element: `0` or `null`.
    pub fn zero() -> Self {
        Self::normalized(Interval::constant(0), Nullness::DefinitelyNull, Some(Interval::bottom()))
    }

    /// Least precise value of a declared kind.
    pub fn top_of(kind: Kind) -> Self {
        match kind {
            Kind::Int => Self::int(Interval::top()),
            Kind::Float => Self::float(),
            Kind::Ref => Self::reference(Nullness::MaybeNull),
            Kind::Array(_) => Self::array(Nullness::MaybeNull, Interval::at_least(0)),
        }
    }

    /// Restrict a value to the components meaningful for `kind`.
    pub fn as_kind(&self, kind: Kind) -> Self {
        if self.is_bottom() {
            return Self::bottom();
        }
        match kind {
            Kind::Int => Self::int(self.interval),
            Kind::Float => Self::float(),
            Kind::Ref => Self::reference(self.nullness),
            Kind::Array(_) => Self::array(self.nullness, self.length.unwrap_or_else(|| Interval::at_least(0))),
        }
    }

    /// Length interval, treating an untracked length as `[0, +∞]`.
    pub fn length_or_unknown(&self) -> Interval {
        self.length.unwrap_or_else(|| Interval::at_least(0))
    }

    fn normalized(interval: Interval, nullness: Nullness, length: Option<Interval>) -> Self {
        if interval.is_empty() || nullness.is_bottom() {
            return Self::bottom();
        }
        let (nullness, length) = match (nullness, length) {
            (Nullness::DefinitelyNull, Some(_)) => (nullness, Some(Interval::bottom())),
            (Nullness::MaybeNull, Some(len)) if len.is_empty() => (Nullness::DefinitelyNull, Some(len)),
            (Nullness::NonNull, Some(len)) if len.is_empty() => return Self::bottom(),
            other => other,
        };
        Self {
            interval,
            nullness,
            length,
        }
    }

    /// Refine the nullness, keeping every other component.
    pub fn with_nullness(&self, nullness: Nullness) -> Self {
        Self::normalized(self.interval, self.nullness.meet(&nullness), self.length)
    }

    pub fn with_interval(&self, interval: Interval) -> Self {
        Self::normalized(self.interval.meet(&interval), self.nullness, self.length)
    }

    pub fn with_length(&self, length: Interval) -> Self {
        let current = self.length_or_unknown();
        Self::normalized(self.interval, self.nullness, Some(current.meet(&length)))
    }
}

fn meet_length(a: Option<Interval>, b: Option<Interval>) -> Option<Interval> {
    match (a, b) {
        (None, x) | (x, None) => x,
        (Some(a), Some(b)) => Some(a.meet(&b)),
    }
}

fn join_length(a: Option<Interval>, b: Option<Interval>, widen: bool) -> Option<Interval> {
    match (a, b) {
        (Some(a), Some(b)) if widen => Some(a.widen(&b)),
        (Some(a), Some(b)) => Some(a.join(&b)),
        _ => None,
    }
}

impl Lattice for AbstractValue {
    fn bottom() -> Self {
        Self {
            interval: Interval::bottom(),
            nullness: Nullness::Unreachable,
            length: None,
        }
    }

    fn top() -> Self {
        Self {
            interval: Interval::top(),
            nullness: Nullness::MaybeNull,
            length: None,
        }
    }

    fn is_bottom(&self) -> bool {
        self.nullness.is_bottom() || self.interval.is_empty()
    }

    fn le(&self, other: &Self) -> bool {
        if self.is_bottom() {
            return true;
        }
        if other.is_bottom() {
            return false;
        }
        let length_le = match (self.length, other.length) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(a), Some(b)) => a.le(&b),
        };
        self.interval.le(&other.interval) && self.nullness.le(&other.nullness) && length_le
    }

    fn join(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return *other;
        }
        if other.is_bottom() {
            return *self;
        }
        Self::normalized(
            self.interval.join(&other.interval),
            self.nullness.join(&other.nullness),
            join_length(self.length, other.length, false),
        )
    }

    fn meet(&self, other: &Self) -> Self {
        Self::normalized(
            self.interval.meet(&other.interval),
            self.nullness.meet(&other.nullness),
            meet_length(self.length, other.length),
        )
    }

    fn widen(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return *other;
        }
        if other.is_bottom() {
            return *self;
        }
        Self::normalized(
            self.interval.widen(&other.interval),
            self.nullness.widen(&other.nullness),
            join_length(self.length, other.length, true),
        )
    }
}

impl fmt::Display for AbstractValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bottom() {
            return write!(f, "⊥");
        }
        match (self.nullness, self.length) {
            (Nullness::NonNull, None) if !self.interval.is_top() => write!(f, "{}", self.interval),
            (nullness, None) => write!(f, "{}", nullness),
            (nullness, Some(len)) => write!(f, "{} len={}", nullness, len),
        }
    }
}

/// Content of a field or of the amalgamated array elements.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slot {
    pub value: AbstractValue,
    /// The field must point back to the object holding it.
    pub is_self: bool,
}

impl Slot {
    pub fn new(value: AbstractValue) -> Self {
        Self { value, is_self: false }
    }

    pub fn zero() -> Self {
        Self::new(AbstractValue::zero())
    }

    pub fn self_reference() -> Self {
        Self {
            value: AbstractValue::reference(Nullness::NonNull),
            is_self: true,
        }
    }
}

impl Lattice for Slot {
    fn bottom() -> Self {
        Self::new(AbstractValue::bottom())
    }

    fn top() -> Self {
        Self::new(AbstractValue::top())
    }

    fn is_bottom(&self) -> bool {
        self.value.is_bottom()
    }

    fn le(&self, other: &Self) -> bool {
        if self.is_bottom() {
            return true;
        }
        self.value.le(&other.value) && (self.is_self || !other.is_self)
    }

    fn join(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        Self {
            value: self.value.join(&other.value),
            is_self: self.is_self && other.is_self,
        }
    }

    fn meet(&self, other: &Self) -> Self {
        let value = self.value.meet(&other.value);
        if value.is_bottom() {
            return Self::bottom();
        }
        Self {
            value,
            is_self: self.is_self || other.is_self,
        }
    }

    fn widen(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        Self {
            value: self.value.widen(&other.value),
            is_self: self.is_self && other.is_self,
        }
    }
}

/// One-level summary of the object a reference points to.
///
/// Fields absent from `fields` read as `rest`. Reading a field yields a value
/// whose own shape is unknown unless the slot is a self-reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shape {
    pub fields: BTreeMap<String, Slot>,
    pub rest: Slot,
    pub elements: Slot,
}

impl Shape {
    /// A freshly allocated object: every field holds its default value.
    pub fn fresh_object() -> Self {
        Self {
            fields: BTreeMap::new(),
            rest: Slot::zero(),
            elements: Slot::top(),
        }
    }

    /// A freshly allocated array: every element holds its default value.
    pub fn fresh_array() -> Self {
        Self {
            fields: BTreeMap::new(),
            rest: Slot::top(),
            elements: Slot::zero(),
        }
    }

    pub fn field(&self, name: &str) -> &Slot {
        self.fields.get(name).unwrap_or(&self.rest)
    }

    /// Strong update of a single field.
    pub fn set_field(&mut self, name: &str, slot: Slot) {
        if slot == self.rest {
            self.fields.remove(name);
        } else {
            self.fields.insert(name.to_string(), slot);
        }
    }

    fn combine(&self, other: &Self, op: impl Fn(&Slot, &Slot) -> Slot) -> Self {
        let mut result = Self {
            fields: BTreeMap::new(),
            rest: op(&self.rest, &other.rest),
            elements: op(&self.elements, &other.elements),
        };
        let names: Vec<&String> = self.fields.keys().chain(other.fields.keys()).collect();
        for name in names {
            let slot = op(self.field(name), other.field(name));
            result.set_field(name, slot);
        }
        result
    }
}

impl Lattice for Shape {
    fn bottom() -> Self {
        Self {
            fields: BTreeMap::new(),
            rest: Slot::bottom(),
            elements: Slot::bottom(),
        }
    }

    fn top() -> Self {
        Self {
            fields: BTreeMap::new(),
            rest: Slot::top(),
            elements: Slot::top(),
        }
    }

    fn is_bottom(&self) -> bool {
        self.rest.is_bottom() && self.elements.is_bottom() && self.fields.values().all(Slot::is_bottom)
    }

    fn is_top(&self) -> bool {
        self.rest.is_top() && self.elements.is_top() && self.fields.values().all(Slot::is_top)
    }

    fn le(&self, other: &Self) -> bool {
        self.rest.le(&other.rest)
            && self.elements.le(&other.elements)
            && self
                .fields
                .keys()
                .chain(other.fields.keys())
                .all(|name| self.field(name).le(other.field(name)))
    }

    fn join(&self, other: &Self) -> Self {
        self.combine(other, Slot::join)
    }

    fn meet(&self, other: &Self) -> Self {
        self.combine(other, Slot::meet)
    }

    fn widen(&self, other: &Self) -> Self {
        self.combine(other, Slot::widen)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::domain::check_lattice_axioms;
    use crate::ir::Elem;

    #[test]
    fn test_kinds() {
        let i = AbstractValue::constant(3);
        assert_eq!(i.nullness, Nullness::NonNull);
        assert_eq!(i.interval, Interval::constant(3));

        let r = AbstractValue::top_of(Kind::Ref);
        assert!(r.interval.is_top());
        assert_eq!(r.nullness, Nullness::MaybeNull);

        let a = AbstractValue::top_of(Kind::Array(Elem::Int));
        assert_eq!(a.length, Some(Interval::at_least(0)));
    }

    #[test]
    fn test_null_array_has_no_length() {
        let null = AbstractValue::null();
        assert_eq!(null.length, Some(Interval::bottom()));

        let fresh = AbstractValue::array(Nullness::NonNull, Interval::constant(2));
        let joined = null.join(&fresh);
        assert_eq!(joined.nullness, Nullness::MaybeNull);
        assert_eq!(joined.length, Some(Interval::constant(2)));

        // A maybe-null array refined to have no possible length is null.
        let refined = joined.with_length(Interval::at_least(5));
        assert_eq!(refined.nullness, Nullness::DefinitelyNull);

        // A non-null array with no possible length is impossible.
        assert!(fresh.with_length(Interval::at_least(5)).is_bottom());
    }

    #[test]
    fn test_negative_length_is_clipped() {
        let a = AbstractValue::array(Nullness::NonNull, Interval::finite(-3, 4));
        assert_eq!(a.length, Some(Interval::finite(0, 4)));
        assert!(AbstractValue::array(Nullness::NonNull, Interval::constant(-1)).is_bottom());
    }

    #[test]
    fn test_zero_projects_per_kind() {
        let zero = AbstractValue::zero();
        assert_eq!(zero.as_kind(Kind::Int), AbstractValue::constant(0));
        assert_eq!(zero.as_kind(Kind::Ref).nullness, Nullness::DefinitelyNull);
        assert_eq!(zero.as_kind(Kind::Array(Elem::Ref)), AbstractValue::null());
    }

    #[test]
    fn test_value_lattice_axioms() {
        check_lattice_axioms(&[
            AbstractValue::bottom(),
            AbstractValue::top(),
            AbstractValue::constant(0),
            AbstractValue::int(Interval::finite(-5, 5)),
            AbstractValue::int(Interval::at_least(1)),
            AbstractValue::reference(Nullness::NonNull),
            AbstractValue::reference(Nullness::MaybeNull),
            AbstractValue::null(),
            AbstractValue::array(Nullness::NonNull, Interval::constant(2)),
            AbstractValue::array(Nullness::MaybeNull, Interval::at_least(1)),
        ]);
    }

    #[test]
    fn test_shape_fields() {
        let mut shape = Shape::fresh_object();
        assert_eq!(shape.field("next").value.nullness, Nullness::DefinitelyNull);

        shape.set_field("next", Slot::self_reference());
        assert!(shape.field("next").is_self);
        assert_eq!(shape.field("other").value.nullness, Nullness::DefinitelyNull);

        // Joining with an unknown object loses the self-reference.
        let joined = shape.join(&Shape::top());
        assert!(!joined.field("next").is_self);
        assert!(joined.is_top());
    }

    #[test]
    fn test_shape_join_with_bottom() {
        let shape = Shape::fresh_array();
        assert_eq!(Shape::bottom().join(&shape), shape);
        assert!(Shape::bottom().le(&shape));
    }

    #[test]
    fn test_shape_lattice_axioms() {
        let mut linked = Shape::fresh_object();
        linked.set_field("field", Slot::self_reference());
        let mut written = Shape::fresh_array();
        written.elements = Slot::new(AbstractValue::reference(Nullness::MaybeNull));

        check_lattice_axioms(&[
            Shape::bottom(),
            Shape::top(),
            Shape::fresh_object(),
            Shape::fresh_array(),
            linked,
            written,
        ]);
    }
}

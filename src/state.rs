//! Abstract program state: one [`AbstractValue`] and one [`Shape`] per variable,
//! plus the pairs of reference variables that must hold the same object.
//!
//! Variables missing from the maps are unconstrained (`⊤`), so the top state
//! is the empty map. The bottom state is a distinguished flag that absorbs
//! every update.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::domain::Lattice;
use crate::ir::{Procedure, Var};
use crate::value::{AbstractValue, Shape};

#[derive(Debug, Clone, PartialEq)]
pub struct AbstractState {
    pub unreachable: bool,
    pub values: BTreeMap<Var, AbstractValue>,
    pub shapes: BTreeMap<Var, Shape>,
    /// Must-alias facts, each pair stored in ascending order.
    pub aliases: BTreeSet<(Var, Var)>,
}

fn alias_pair(a: &str, b: &str) -> (Var, Var) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

impl AbstractState {
    /// Entry state of a procedure: every parameter holds `⊤` of its kind.
    pub fn top_for(procedure: &Procedure) -> Self {
        let mut state = Self::top();
        for (var, kind) in procedure.params() {
            state.set(var, AbstractValue::top_of(*kind));
        }
        state
    }

    pub fn get(&self, var: &str) -> AbstractValue {
        if self.unreachable {
            return AbstractValue::bottom();
        }
        self.values.get(var).copied().unwrap_or_else(AbstractValue::top)
    }

    /// Strong update of a variable. Binding a `⊥` value makes the state `⊥`.
    pub fn set(&mut self, var: &str, value: AbstractValue) {
        if self.unreachable {
            return;
        }
        if value.is_bottom() {
            self.make_unreachable();
        } else if value.is_top() {
            self.values.remove(var);
        } else {
            self.values.insert(var.to_string(), value);
        }
    }

    /// Refine a variable by meet.
    pub fn refine(&mut self, var: &str, value: &AbstractValue) {
        let refined = self.get(var).meet(value);
        self.set(var, refined);
    }

    pub fn shape(&self, var: &str) -> Shape {
        if self.unreachable {
            return Shape::bottom();
        }
        self.shapes.get(var).cloned().unwrap_or_else(Shape::top)
    }

    pub fn set_shape(&mut self, var: &str, shape: Shape) {
        if self.unreachable {
            return;
        }
        if shape.is_top() {
            self.shapes.remove(var);
        } else {
            self.shapes.insert(var.to_string(), shape);
        }
    }

    /// Forget every heap shape (e.g. after an opaque call).
    pub fn havoc_heap(&mut self) {
        self.shapes.clear();
    }

    /// Forget the shapes of every other variable that may point to the same
    /// object as `var`, after a write through `var`.
    pub fn invalidate_aliases(&mut self, var: &str) {
        let values = &self.values;
        self.shapes.retain(|other, _| {
            other == var
                || !values
                    .get(other)
                    .copied()
                    .unwrap_or_else(AbstractValue::top)
                    .nullness
                    .may_be_nonnull()
        });
    }

    /// Whether `a` and `b` hold the same object in every execution.
    pub fn must_alias(&self, a: &str, b: &str) -> bool {
        a == b || self.aliases.contains(&alias_pair(a, b))
    }

    /// Record that `a` and `b` hold the same object.
    pub fn add_alias(&mut self, a: &str, b: &str) {
        if self.unreachable || a == b {
            return;
        }
        self.aliases.insert(alias_pair(a, b));
    }

    /// Variables that must hold the same object as `var`.
    pub fn aliases_of(&self, var: &str) -> Vec<Var> {
        self.aliases
            .iter()
            .filter_map(|(a, b)| {
                if a == var {
                    Some(b.clone())
                } else if b == var {
                    Some(a.clone())
                } else {
                    None
                }
            })
            .collect()
    }

    /// Drop every must-alias fact about `var`, which is being overwritten.
    pub fn forget_aliases(&mut self, var: &str) {
        self.aliases.retain(|(a, b)| a != var && b != var);
    }

    pub fn make_unreachable(&mut self) {
        self.unreachable = true;
        self.values.clear();
        self.shapes.clear();
        self.aliases.clear();
    }

    fn pointwise(
        &self,
        other: &Self,
        value_op: impl Fn(&AbstractValue, &AbstractValue) -> AbstractValue,
        shape_op: impl Fn(&Shape, &Shape) -> Shape,
        aliases: BTreeSet<(Var, Var)>,
    ) -> Self {
        let mut result = Self::top();
        let names: Vec<&Var> = self.values.keys().chain(other.values.keys()).collect();
        for var in names {
            result.set(var, value_op(&self.get(var), &other.get(var)));
        }
        let names: Vec<&Var> = self.shapes.keys().chain(other.shapes.keys()).collect();
        for var in names {
            result.set_shape(var, shape_op(&self.shape(var), &other.shape(var)));
        }
        if !result.unreachable {
            result.aliases = aliases;
        }
        result
    }

    fn common_aliases(&self, other: &Self) -> BTreeSet<(Var, Var)> {
        self.aliases.intersection(&other.aliases).cloned().collect()
    }
}

impl Lattice for AbstractState {
    fn bottom() -> Self {
        Self {
            unreachable: true,
            values: BTreeMap::new(),
            shapes: BTreeMap::new(),
            aliases: BTreeSet::new(),
        }
    }

    fn top() -> Self {
        Self {
            unreachable: false,
            values: BTreeMap::new(),
            shapes: BTreeMap::new(),
            aliases: BTreeSet::new(),
        }
    }

    fn is_bottom(&self) -> bool {
        self.unreachable
    }

    fn le(&self, other: &Self) -> bool {
        if self.unreachable {
            return true;
        }
        if other.unreachable {
            return false;
        }
        other.values.iter().all(|(var, value)| self.get(var).le(value))
            && other.shapes.iter().all(|(var, shape)| self.shape(var).le(shape))
            && other.aliases.is_subset(&self.aliases)
    }

    fn join(&self, other: &Self) -> Self {
        if self.unreachable {
            return other.clone();
        }
        if other.unreachable {
            return self.clone();
        }
        self.pointwise(other, AbstractValue::join, Shape::join, self.common_aliases(other))
    }

    fn meet(&self, other: &Self) -> Self {
        if self.unreachable || other.unreachable {
            return Self::bottom();
        }
        let aliases = self.aliases.union(&other.aliases).cloned().collect();
        self.pointwise(other, AbstractValue::meet, Shape::meet, aliases)
    }

    fn widen(&self, other: &Self) -> Self {
        if self.unreachable {
            return other.clone();
        }
        if other.unreachable {
            return self.clone();
        }
        self.pointwise(other, AbstractValue::widen, Shape::widen, self.common_aliases(other))
    }
}

impl fmt::Display for AbstractState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unreachable {
            return write!(f, "⊥");
        }
        write!(f, "{{")?;
        for (i, (var, value)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", var, value)?;
        }
        for (a, b) in &self.aliases {
            write!(f, ", {} ≡ {}", a, b)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::domain::check_lattice_axioms;
    use crate::interval::Interval;
    use crate::nullness::Nullness;

    fn state(bindings: &[(&str, AbstractValue)]) -> AbstractState {
        let mut state = AbstractState::top();
        for (var, value) in bindings {
            state.set(var, *value);
        }
        state
    }

    #[test]
    fn test_missing_variables_are_top() {
        let s = AbstractState::top();
        assert!(s.get("x").is_top());
        assert!(s.shape("x").is_top());
    }

    #[test]
    fn test_bottom_value_makes_state_unreachable() {
        let mut s = state(&[("x", AbstractValue::constant(1))]);
        s.set("y", AbstractValue::bottom());
        assert!(s.is_bottom());
        assert!(s.get("x").is_bottom());
    }

    #[test]
    fn test_join_drops_one_sided_bindings() {
        let a = state(&[("x", AbstractValue::constant(1)), ("y", AbstractValue::constant(2))]);
        let b = state(&[("x", AbstractValue::constant(5))]);
        let joined = a.join(&b);
        assert_eq!(joined.get("x").interval, Interval::finite(1, 5));
        assert!(joined.get("y").is_top());
    }

    #[test]
    fn test_meet_contradiction() {
        let a = state(&[("x", AbstractValue::int(Interval::at_least(1)))]);
        let b = state(&[("x", AbstractValue::int(Interval::at_most(0)))]);
        assert!(a.meet(&b).is_bottom());
    }

    #[test]
    fn test_invalidate_aliases() {
        let mut s = state(&[
            ("a", AbstractValue::reference(Nullness::NonNull)),
            ("b", AbstractValue::reference(Nullness::NonNull)),
            ("n", AbstractValue::null()),
        ]);
        s.set_shape("a", Shape::fresh_object());
        s.set_shape("b", Shape::fresh_object());
        s.set_shape("n", Shape::bottom());
        s.invalidate_aliases("a");
        assert_eq!(s.shape("a"), Shape::fresh_object());
        assert!(s.shape("b").is_top());
        assert!(s.shape("n").is_bottom());
    }

    #[test]
    fn test_must_alias_facts() {
        let mut s = state(&[("n", AbstractValue::reference(Nullness::NonNull))]);
        s.add_alias("t", "n");
        assert!(s.must_alias("n", "t"));
        assert!(s.must_alias("x", "x"));
        assert_eq!(s.aliases_of("n"), vec!["t".to_string()]);

        // join keeps only the facts of both sides, meet keeps either
        let plain = state(&[("n", AbstractValue::reference(Nullness::NonNull))]);
        assert!(!s.join(&plain).must_alias("n", "t"));
        assert!(s.meet(&plain).must_alias("n", "t"));
        assert!(s.le(&plain));
        assert!(!plain.le(&s));

        s.forget_aliases("t");
        assert!(!s.must_alias("n", "t"));

        s.add_alias("n", "t");
        s.make_unreachable();
        assert!(s.aliases.is_empty());
    }

    #[test]
    fn test_havoc_heap() {
        let mut s = state(&[("a", AbstractValue::reference(Nullness::NonNull))]);
        s.set_shape("a", Shape::fresh_array());
        s.havoc_heap();
        assert!(s.shape("a").is_top());
        assert_eq!(s.get("a").nullness, Nullness::NonNull);
    }

    #[test]
    fn test_state_lattice_axioms() {
        let mut with_shape = state(&[("a", AbstractValue::reference(Nullness::NonNull))]);
        with_shape.set_shape("a", Shape::fresh_object());
        let mut with_alias = with_shape.clone();
        with_alias.add_alias("a", "b");

        check_lattice_axioms(&[
            AbstractState::bottom(),
            AbstractState::top(),
            state(&[("x", AbstractValue::constant(0))]),
            state(&[("x", AbstractValue::int(Interval::finite(-3, 3)))]),
            state(&[
                ("x", AbstractValue::int(Interval::at_least(0))),
                ("a", AbstractValue::null()),
            ]),
            with_shape,
            with_alias,
        ]);
    }
}

//! Transfer functions: the abstract semantics of statements and conditions.

use log::trace;
use serde::Serialize;

use crate::domain::Lattice;
use crate::interval::{Bound, Interval};
use crate::ir::{BasicBlock, BinOp, BlockId, CmpOp, Cond, Exit, Expr, FaultKind, Kind, Procedure, SiteId, Statement};
use crate::nullness::Nullness;
use crate::state::AbstractState;
use crate::value::{AbstractValue, Shape, Slot};
use crate::verdict::Verdict;

/// Verdict of one fault site for one abstract execution of its statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Fault {
    pub site: SiteId,
    pub kind: FaultKind,
    pub verdict: Verdict,
}

/// Result of abstractly executing a statement (or a block): the state on the
/// normal-completion path and the verdicts of the sites passed on the way.
#[derive(Debug, Clone)]
pub struct Step {
    pub state: AbstractState,
    pub faults: Vec<Fault>,
}

/// Abstract semantics consumed by the fixpoint engine and the oracle.
pub trait TransferFunction {
    /// Execute one statement.
    fn apply(&self, state: &AbstractState, stmt: &Statement) -> Step;

    /// Keep only the executions satisfying `cond`.
    fn assume(&self, state: &AbstractState, cond: &Cond) -> AbstractState;

    /// Execute every statement of a block.
    fn run_block(&self, state: &AbstractState, block: &BasicBlock) -> Step {
        let mut current = state.clone();
        let mut faults = Vec::new();
        for stmt in &block.statements {
            let step = self.apply(&current, stmt);
            faults.extend(step.faults);
            current = step.state;
        }
        Step { state: current, faults }
    }

    /// States flowing along each outgoing edge of a block.
    fn successors(&self, out: &AbstractState, exit: &Exit) -> Vec<(BlockId, AbstractState)> {
        match exit {
            Exit::Goto(target) => vec![(*target, out.clone())],
            Exit::Branch {
                cond,
                then_block,
                else_block,
            } => vec![
                (*then_block, self.assume(out, cond)),
                (*else_block, self.assume(out, &cond.negated())),
            ],
            Exit::Halt => Vec::new(),
        }
    }
}

/// Runtime-exception semantics over the composite domain.
#[derive(Debug, Clone, Copy)]
pub struct ExceptionTransfer<'p> {
    procedure: &'p Procedure,
    track_array_length: bool,
}

impl<'p> ExceptionTransfer<'p> {
    pub fn new(procedure: &'p Procedure) -> Self {
        Self {
            procedure,
            track_array_length: true,
        }
    }

    /// Keep every array length at `[0, +∞]`.
    pub fn without_array_lengths(mut self) -> Self {
        self.track_array_length = false;
        self
    }

    pub fn procedure(&self) -> &'p Procedure {
        self.procedure
    }

    fn kind_of(&self, var: &str) -> Kind {
        self.procedure.kind_of(var).unwrap_or(Kind::Int)
    }

    /// Static kind of an expression.
    pub fn kind_of_expr(&self, expr: &Expr) -> Kind {
        expr.kind(&|var| self.kind_of(var))
    }

    fn length_of(&self, array: &AbstractValue) -> Interval {
        if self.track_array_length {
            array.length_or_unknown()
        } else {
            Interval::at_least(0)
        }
    }

    /// Abstract value of an expression.
    pub fn eval(&self, state: &AbstractState, expr: &Expr) -> AbstractValue {
        if state.is_bottom() {
            return AbstractValue::bottom();
        }
        match expr {
            Expr::Int(n) => AbstractValue::constant(*n),
            Expr::Float(_) => AbstractValue::float(),
            Expr::Null => AbstractValue::null(),
            Expr::Str(_) => AbstractValue::reference(Nullness::NonNull),
            Expr::Var(v) => state.get(v).as_kind(self.kind_of(v)),
            Expr::Length(v) => {
                let array = state.get(v).as_kind(self.kind_of(v));
                AbstractValue::int(self.length_of(&array))
            }
            _ if self.kind_of_expr(expr) == Kind::Float => AbstractValue::float(),
            Expr::Neg(e) => AbstractValue::int(self.eval(state, e).interval.neg()),
            Expr::Binary(op, lhs, rhs) => {
                let a = self.eval(state, lhs);
                let b = self.eval(state, rhs);
                if a.is_bottom() || b.is_bottom() {
                    return AbstractValue::bottom();
                }
                let (a, b) = (a.interval, b.interval);
                let result = match op {
                    BinOp::Add => a.add(&b),
                    BinOp::Sub => a.sub(&b),
                    BinOp::Mul => a.mul(&b),
                    BinOp::Div => a.div(&b),
                    BinOp::Rem => a.rem(&b),
                };
                AbstractValue::int(result)
            }
        }
    }

    // === Conditions ===

    fn assume_cmp(&self, state: &AbstractState, op: CmpOp, lhs: &Expr, rhs: &Expr) -> AbstractState {
        if self.kind_of_expr(lhs) != Kind::Int || self.kind_of_expr(rhs) != Kind::Int {
            return state.clone();
        }
        if lhs == rhs {
            return match op {
                CmpOp::Lt | CmpOp::Gt | CmpOp::Ne => AbstractState::bottom(),
                CmpOp::Le | CmpOp::Ge | CmpOp::Eq => state.clone(),
            };
        }

        // Reading a length in a condition that holds implies a non-null array.
        let mut state = state.clone();
        for expr in [lhs, rhs] {
            self.require_lengths_nonnull(&mut state, expr);
        }

        let a = self.eval(&state, lhs);
        let b = self.eval(&state, rhs);
        if a.is_bottom() || b.is_bottom() {
            return AbstractState::bottom();
        }
        let (a, b) = (a.interval, b.interval);
        let one = Bound::Finite(1);

        let (target_a, target_b) = match op {
            CmpOp::Lt => (
                Interval::new(Bound::NegInf, b.high.sub(&one)),
                Interval::new(a.low.add(&one), Bound::PosInf),
            ),
            CmpOp::Le => (Interval::new(Bound::NegInf, b.high), Interval::new(a.low, Bound::PosInf)),
            CmpOp::Gt => return self.assume_cmp(&state, CmpOp::Lt, rhs, lhs),
            CmpOp::Ge => return self.assume_cmp(&state, CmpOp::Le, rhs, lhs),
            CmpOp::Eq => (b, a),
            CmpOp::Ne => {
                let target_a = b.is_singleton().map_or(a, |c| a.excluding(c));
                let target_b = a.is_singleton().map_or(b, |c| b.excluding(c));
                (target_a, target_b)
            }
        };

        self.refine_expr(&mut state, lhs, &target_a);
        self.refine_expr(&mut state, rhs, &target_b);
        state
    }

    fn require_lengths_nonnull(&self, state: &mut AbstractState, expr: &Expr) {
        match expr {
            Expr::Length(v) => {
                let refined = state.get(v).as_kind(self.kind_of(v)).with_nullness(Nullness::NonNull);
                state.set(v, refined);
            }
            Expr::Neg(e) => self.require_lengths_nonnull(state, e),
            Expr::Binary(_, lhs, rhs) => {
                self.require_lengths_nonnull(state, lhs);
                self.require_lengths_nonnull(state, rhs);
            }
            _ => {}
        }
    }

    /// Backward refinement: constrain the variables of `expr` so that its
    /// value lies in `target`.
    fn refine_expr(&self, state: &mut AbstractState, expr: &Expr, target: &Interval) {
        if state.is_bottom() {
            return;
        }
        let current = self.eval(state, expr).interval;
        let target = current.meet(target);
        if target.is_empty() {
            state.make_unreachable();
            return;
        }
        match expr {
            Expr::Var(v) if self.kind_of(v) == Kind::Int => {
                let refined = state.get(v).with_interval(target);
                state.set(v, refined);
            }
            Expr::Length(v) if self.track_array_length => {
                let refined = state.get(v).as_kind(self.kind_of(v)).with_length(target);
                state.set(v, refined);
            }
            Expr::Neg(e) => self.refine_expr(state, e, &target.neg()),
            Expr::Binary(op @ (BinOp::Add | BinOp::Sub), lhs, rhs) => {
                let x = self.eval(state, lhs).interval;
                let y = self.eval(state, rhs).interval;
                let (target_x, target_y) = match op {
                    BinOp::Add => (target.sub(&y), target.sub(&x)),
                    _ => (target.add(&y), x.sub(&target)),
                };
                self.refine_expr(state, lhs, &target_x);
                self.refine_expr(state, rhs, &target_y);
            }
            _ => {}
        }
    }

    fn assume_same(&self, state: &AbstractState, a: &str, b: &str) -> AbstractState {
        if state.must_alias(a, b) {
            return state.clone();
        }
        let mut state = state.clone();
        let nullness = state.get(a).nullness.meet(&state.get(b).nullness);
        let va = state.get(a).with_nullness(nullness);
        let vb = state.get(b).with_nullness(nullness);
        state.set(a, va);
        state.set(b, vb);
        state
    }

    fn assume_not_same(&self, state: &AbstractState, a: &str, b: &str) -> AbstractState {
        if state.must_alias(a, b) {
            return AbstractState::bottom();
        }
        let mut state = state.clone();
        let (na, nb) = (state.get(a).nullness, state.get(b).nullness);
        if na == Nullness::DefinitelyNull {
            self.refine_nullness(&mut state, b, Nullness::NonNull);
        }
        if nb == Nullness::DefinitelyNull {
            self.refine_nullness(&mut state, a, Nullness::NonNull);
        }
        state
    }

    fn assume_nullness(&self, state: &AbstractState, var: &str, nullness: Nullness) -> AbstractState {
        let mut state = state.clone();
        self.refine_nullness(&mut state, var, nullness);
        state
    }

    /// Refine the nullness of `var` and of every variable that must alias it.
    fn refine_nullness(&self, state: &mut AbstractState, var: &str, nullness: Nullness) {
        let mut targets = state.aliases_of(var);
        targets.push(var.to_string());
        for target in targets {
            let kind = self.kind_of(&target);
            state.refine(&target, &AbstractValue::top_of(kind).with_nullness(nullness));
            if nullness == Nullness::DefinitelyNull {
                state.set_shape(&target, Shape::bottom());
            }
        }
    }

    // === Statements ===

    /// Check a dereference of `var`. On success the variable is non-null.
    fn dereference(&self, state: &mut AbstractState, var: &str, site: SiteId, faults: &mut Vec<Fault>) {
        let verdict = Verdict::dereference(state.get(var).nullness);
        faults.push(Fault {
            site,
            kind: FaultKind::NullDereference,
            verdict,
        });
        match verdict {
            Verdict::Always => state.make_unreachable(),
            Verdict::May => self.refine_nullness(state, var, Nullness::NonNull),
            Verdict::Never => {}
        }
    }

    /// Check an access of `array[index]`. On success the index is in range
    /// and the array is known to be long enough.
    fn bounds(&self, state: &mut AbstractState, array: &str, index: &Expr, site: SiteId, faults: &mut Vec<Fault>) {
        let value = state.get(array).as_kind(self.kind_of(array));
        let length = self.length_of(&value);
        let idx = self.eval(state, index).interval;
        let verdict = if state.is_bottom() {
            Verdict::Never
        } else {
            Verdict::index(&idx, &length)
        };
        faults.push(Fault {
            site,
            kind: FaultKind::IndexOutOfBounds,
            verdict,
        });
        match verdict {
            Verdict::Always => state.make_unreachable(),
            Verdict::May => {
                let in_range = Interval::new(Bound::Finite(0), length.high.sub(&Bound::Finite(1)));
                self.refine_expr(state, index, &in_range);
                if self.track_array_length && !state.is_bottom() {
                    let idx = self.eval(state, index).interval;
                    let longer = Interval::new(idx.low.add(&Bound::Finite(1)), Bound::PosInf);
                    let refined = state.get(array).as_kind(self.kind_of(array)).with_length(longer);
                    state.set(array, refined);
                }
            }
            Verdict::Never => {}
        }
    }

    fn assign(&self, state: &mut AbstractState, dst: &str, expr: &Expr, site: Option<SiteId>, faults: &mut Vec<Fault>) {
        let kind_of = |var: &str| self.kind_of(var);
        if let Some(site) = site {
            let verdict = expr
                .integer_divisors(&kind_of)
                .into_iter()
                .map(|divisor| Verdict::division(&self.eval(state, divisor).interval))
                .max()
                .unwrap_or(Verdict::Never);
            faults.push(Fault {
                site,
                kind: FaultKind::DivByZero,
                verdict,
            });
            match verdict {
                Verdict::Always => {
                    state.make_unreachable();
                    return;
                }
                Verdict::May => {
                    for divisor in expr.integer_divisors(&kind_of) {
                        let nonzero = self.eval(state, divisor).interval.excluding(0);
                        self.refine_expr(state, divisor, &nonzero);
                    }
                }
                Verdict::Never => {}
            }
        }

        let kind = self.kind_of(dst);
        let value = self.eval(state, expr).as_kind(kind);
        let shape = match expr {
            Expr::Var(src) if kind.is_reference() => state.shape(src),
            Expr::Null => Shape::bottom(),
            _ => Shape::top(),
        };
        state.set(dst, value);
        state.set_shape(dst, shape);
        if let Expr::Var(src) = expr {
            if kind.is_reference() {
                for other in state.aliases_of(src) {
                    state.add_alias(dst, &other);
                }
                state.add_alias(dst, src);
            }
        }
    }

    fn array_store(&self, state: &mut AbstractState, array: &str, value: &Expr) {
        let stored = Slot::new(self.eval(state, value));
        let length = self.length_of(&state.get(array).as_kind(self.kind_of(array)));
        let mut shape = state.shape(array);
        shape.elements = if length.is_singleton() == Some(1) {
            stored
        } else {
            shape.elements.join(&stored)
        };
        state.invalidate_aliases(array);
        state.set_shape(array, shape);
    }

    fn field_read(&self, state: &mut AbstractState, dst: &str, object: &str, field: &str) {
        let kind = self.kind_of(dst);
        let holder = state.shape(object);
        let slot = holder.field(field);
        let (value, shape) = if slot.is_self {
            (state.get(object), holder.clone())
        } else if slot.is_bottom() {
            (AbstractValue::top_of(kind), Shape::top())
        } else {
            let value = slot.value.as_kind(kind);
            let shape = if value.nullness == Nullness::DefinitelyNull {
                Shape::bottom()
            } else {
                Shape::top()
            };
            (value, shape)
        };
        state.set(dst, value);
        state.set_shape(dst, shape);
        if slot.is_self {
            state.add_alias(dst, object);
        }
    }

    fn field_write(&self, state: &mut AbstractState, object: &str, field: &str, value: &Expr) {
        let slot = match value {
            Expr::Var(v) if v == object => Slot::self_reference(),
            _ => Slot::new(self.eval(state, value)),
        };
        let mut shape = state.shape(object);
        shape.set_field(field, slot);
        state.invalidate_aliases(object);
        state.set_shape(object, shape);
    }
}

impl TransferFunction for ExceptionTransfer<'_> {
    fn apply(&self, state: &AbstractState, stmt: &Statement) -> Step {
        if state.is_bottom() {
            let faults = stmt
                .sites()
                .into_iter()
                .map(|(site, kind)| Fault {
                    site,
                    kind,
                    verdict: Verdict::Never,
                })
                .collect();
            return Step {
                state: AbstractState::bottom(),
                faults,
            };
        }

        let mut state = state.clone();
        let mut faults = Vec::new();
        if let Some(dst) = stmt.defined() {
            state.forget_aliases(dst);
        }

        match stmt {
            Statement::Assign { dst, expr, site } => self.assign(&mut state, dst, expr, *site, &mut faults),
            Statement::Assert(cond) => state = self.assume(&state, cond),
            Statement::New { dst, .. } => {
                state.set(dst, AbstractValue::reference(Nullness::NonNull));
                state.set_shape(dst, Shape::fresh_object());
            }
            Statement::NewArray { dst, length } => {
                let length = if self.track_array_length {
                    self.eval(&state, length).interval
                } else {
                    Interval::at_least(0)
                };
                // A negative length cannot be allocated.
                state.set(dst, AbstractValue::array(Nullness::NonNull, length));
                state.set_shape(dst, Shape::fresh_array());
            }
            Statement::ArrayLength { dst, array, site } => {
                self.dereference(&mut state, array, *site, &mut faults);
                let length = self.length_of(&state.get(array).as_kind(self.kind_of(array)));
                state.set(dst, AbstractValue::int(length));
            }
            Statement::ArrayLoad {
                dst,
                array,
                index,
                null_site,
                bounds_site,
            } => {
                self.dereference(&mut state, array, *null_site, &mut faults);
                self.bounds(&mut state, array, index, *bounds_site, &mut faults);
                let elements = state.shape(array).elements;
                let kind = self.kind_of(dst);
                let value = if elements.is_bottom() {
                    AbstractValue::top_of(kind)
                } else {
                    elements.value.as_kind(kind)
                };
                let shape = if value.nullness == Nullness::DefinitelyNull {
                    Shape::bottom()
                } else {
                    Shape::top()
                };
                state.set(dst, value);
                state.set_shape(dst, shape);
            }
            Statement::ArrayStore {
                array,
                index,
                value,
                null_site,
                bounds_site,
            } => {
                self.dereference(&mut state, array, *null_site, &mut faults);
                self.bounds(&mut state, array, index, *bounds_site, &mut faults);
                self.array_store(&mut state, array, value);
            }
            Statement::FieldRead {
                dst,
                object,
                field,
                site,
            } => {
                self.dereference(&mut state, object, *site, &mut faults);
                self.field_read(&mut state, dst, object, field);
            }
            Statement::FieldWrite {
                object,
                field,
                value,
                site,
            } => {
                self.dereference(&mut state, object, *site, &mut faults);
                self.field_write(&mut state, object, field, value);
            }
            Statement::Call {
                dst, receiver, site, ..
            } => {
                if let (Some(receiver), Some(site)) = (receiver, site) {
                    self.dereference(&mut state, receiver, *site, &mut faults);
                }
                state.havoc_heap();
                if let Some(dst) = dst {
                    state.set(dst, AbstractValue::top_of(self.kind_of(dst)));
                }
            }
            Statement::Throw { site } => {
                faults.push(Fault {
                    site: *site,
                    kind: FaultKind::ExplicitThrow,
                    verdict: Verdict::Always,
                });
                state.make_unreachable();
            }
            Statement::Return(_) => state.make_unreachable(),
        }

        // Sites skipped because an earlier check always fails are vacuously safe.
        for (site, kind) in stmt.sites() {
            if !faults.iter().any(|f| f.site == site) {
                faults.push(Fault {
                    site,
                    kind,
                    verdict: Verdict::Never,
                });
            }
        }

        trace!("{} => {}", stmt, state);
        Step { state, faults }
    }

    fn assume(&self, state: &AbstractState, cond: &Cond) -> AbstractState {
        if state.is_bottom() {
            return AbstractState::bottom();
        }
        match cond {
            Cond::True | Cond::Opaque => state.clone(),
            Cond::False => AbstractState::bottom(),
            Cond::Cmp(op, lhs, rhs) => self.assume_cmp(state, *op, lhs, rhs),
            Cond::IsNull(v) => self.assume_nullness(state, v, Nullness::DefinitelyNull),
            Cond::NonNull(v) => self.assume_nullness(state, v, Nullness::NonNull),
            Cond::Same(a, b) => self.assume_same(state, a, b),
            Cond::NotSame(a, b) => self.assume_not_same(state, a, b),
            Cond::Not(c) => self.assume(state, &c.negated()),
            Cond::And(a, b) => {
                let first = self.assume(state, a);
                self.assume(&first, b)
            }
            Cond::Or(a, b) => self.assume(state, a).join(&self.assume(state, b)),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::builder::ProcedureBuilder;
    use crate::ir::Elem;

    fn procedure() -> Procedure {
        let mut b = ProcedureBuilder::new("scratch");
        b.param("i", Kind::Int)
            .param("j", Kind::Int)
            .param("f", Kind::Float)
            .param("a", Kind::Array(Elem::Int))
            .param("o", Kind::Ref)
            .local("x", Kind::Int)
            .local("r", Kind::Ref)
            .local("s", Kind::Array(Elem::Ref));
        let entry = b.entry();
        b.ret(entry, None);
        b.build().unwrap()
    }

    fn state_with(bindings: &[(&str, AbstractValue)]) -> AbstractState {
        let mut state = AbstractState::top();
        for (var, value) in bindings {
            state.set(var, *value);
        }
        state
    }

    fn assign(dst: &str, expr: Expr, site: Option<usize>) -> Statement {
        Statement::Assign {
            dst: dst.to_string(),
            expr,
            site: site.map(SiteId),
        }
    }

    #[test]
    fn test_backward_refinement_through_sub() {
        let proc = procedure();
        let transfer = ExceptionTransfer::new(&proc);
        let state = state_with(&[("i", AbstractValue::int(Interval::finite(0, 10)))]);

        // i - 1 > 0  ⇒  i ∈ [2, 10]
        let cond = Expr::var("i").sub(Expr::int(1)).gt(Expr::int(0));
        let refined = transfer.assume(&state, &cond);
        assert_eq!(refined.get("i").interval, Interval::finite(2, 10));

        let negated = transfer.assume(&state, &cond.negated());
        assert_eq!(negated.get("i").interval, Interval::finite(0, 1));
    }

    #[test]
    fn test_contradictions() {
        let proc = procedure();
        let transfer = ExceptionTransfer::new(&proc);
        let state = AbstractState::top();

        let cond = Expr::var("i").gt(Expr::int(0)).and(Expr::var("i").lt(Expr::int(0)));
        assert!(transfer.assume(&state, &cond).is_bottom());

        assert!(transfer.assume(&state, &Expr::var("i").neq(Expr::var("i"))).is_bottom());
        assert!(!transfer.assume(&state, &Expr::var("i").eq(Expr::var("i"))).is_bottom());

        // Without relational information, i > j does not contradict itself.
        let gt = Expr::var("i").gt(Expr::var("j"));
        let both = transfer.assume(&transfer.assume(&state, &gt), &gt);
        assert!(!both.is_bottom());
    }

    #[test]
    fn test_float_comparisons_do_not_refine() {
        let proc = procedure();
        let transfer = ExceptionTransfer::new(&proc);
        let state = AbstractState::top();
        assert!(!transfer.assume(&state, &Expr::var("f").neq(Expr::var("f"))).is_bottom());
    }

    #[test]
    fn test_disjunction_joins() {
        let proc = procedure();
        let transfer = ExceptionTransfer::new(&proc);
        let state = AbstractState::top();
        let cond = Expr::var("i").eq(Expr::int(1)).or(Expr::var("i").eq(Expr::int(5)));
        assert_eq!(transfer.assume(&state, &cond).get("i").interval, Interval::finite(1, 5));
    }

    #[test]
    fn test_length_condition_implies_nonnull() {
        let proc = procedure();
        let transfer = ExceptionTransfer::new(&proc);
        let state = AbstractState::top_for(&proc);
        let refined = transfer.assume(&state, &Expr::length("a").gt(Expr::int(0)));
        let a = refined.get("a");
        assert_eq!(a.nullness, Nullness::NonNull);
        assert_eq!(a.length, Some(Interval::at_least(1)));
    }

    #[test]
    fn test_division_verdicts() {
        let proc = procedure();
        let transfer = ExceptionTransfer::new(&proc);

        let state = state_with(&[("i", AbstractValue::int(Interval::finite(-1, 1)))]);
        let step = transfer.apply(&state, &assign("x", Expr::int(10).div(Expr::var("i")), Some(0)));
        assert_eq!(step.faults[0].verdict, Verdict::May);
        assert_eq!(step.state.get("x").interval, Interval::finite(-10, 10));

        let state = state_with(&[("i", AbstractValue::constant(0))]);
        let step = transfer.apply(&state, &assign("x", Expr::int(10).div(Expr::var("i")), Some(0)));
        assert_eq!(step.faults[0].verdict, Verdict::Always);
        assert!(step.state.is_bottom());

        // The divisor is non-zero after a successful division.
        let state = state_with(&[("i", AbstractValue::int(Interval::finite(0, 5)))]);
        let step = transfer.apply(&state, &assign("x", Expr::var("j").rem(Expr::var("i")), Some(0)));
        assert_eq!(step.state.get("i").interval, Interval::finite(1, 5));
    }

    #[test]
    fn test_array_access() {
        let proc = procedure();
        let transfer = ExceptionTransfer::new(&proc);
        let state = AbstractState::top_for(&proc);

        let load = Statement::ArrayLoad {
            dst: "x".to_string(),
            array: "a".to_string(),
            index: Expr::var("i"),
            null_site: SiteId(0),
            bounds_site: SiteId(1),
        };
        let step = transfer.apply(&state, &load);
        assert_eq!(step.faults[0].verdict, Verdict::May);
        assert_eq!(step.faults[1].verdict, Verdict::May);

        // Success refines the array and the index.
        let a = step.state.get("a");
        assert_eq!(a.nullness, Nullness::NonNull);
        assert_eq!(a.length, Some(Interval::at_least(1)));
        assert_eq!(step.state.get("i").interval, Interval::at_least(0));
    }

    #[test]
    fn test_null_receiver_short_circuits_bounds() {
        let proc = procedure();
        let transfer = ExceptionTransfer::new(&proc);
        let state = state_with(&[("a", AbstractValue::null())]);

        let load = Statement::ArrayLoad {
            dst: "x".to_string(),
            array: "a".to_string(),
            index: Expr::int(0),
            null_site: SiteId(0),
            bounds_site: SiteId(1),
        };
        let step = transfer.apply(&state, &load);
        assert_eq!(step.faults[0].verdict, Verdict::Always);
        assert_eq!(step.faults[1].verdict, Verdict::Never);
        assert!(step.state.is_bottom());
    }

    #[test]
    fn test_fresh_array_elements() {
        let proc = procedure();
        let transfer = ExceptionTransfer::new(&proc);
        let mut state = AbstractState::top_for(&proc);

        let alloc = Statement::NewArray {
            dst: "s".to_string(),
            length: Expr::int(2),
        };
        state = transfer.apply(&state, &alloc).state;
        let load = Statement::ArrayLoad {
            dst: "r".to_string(),
            array: "s".to_string(),
            index: Expr::int(1),
            null_site: SiteId(0),
            bounds_site: SiteId(1),
        };
        let step = transfer.apply(&state, &load);
        assert_eq!(step.faults[0].verdict, Verdict::Never);
        assert_eq!(step.faults[1].verdict, Verdict::Never);
        assert_eq!(step.state.get("r").nullness, Nullness::DefinitelyNull);

        // A weak store keeps the default element possible.
        let store = Statement::ArrayStore {
            array: "s".to_string(),
            index: Expr::int(0),
            value: Expr::str("1"),
            null_site: SiteId(2),
            bounds_site: SiteId(3),
        };
        let state = transfer.apply(&state, &store).state;
        let step = transfer.apply(&state, &load);
        assert_eq!(step.state.get("r").nullness, Nullness::MaybeNull);
    }

    #[test]
    fn test_untracked_lengths() {
        let proc = procedure();
        let transfer = ExceptionTransfer::new(&proc).without_array_lengths();
        let alloc = Statement::NewArray {
            dst: "a".to_string(),
            length: Expr::int(2),
        };
        let state = transfer.apply(&AbstractState::top(), &alloc).state;
        assert_eq!(state.get("a").length, Some(Interval::at_least(0)));
    }

    #[test]
    fn test_fields() {
        let proc = procedure();
        let transfer = ExceptionTransfer::new(&proc);
        let mut state = AbstractState::top_for(&proc);

        state = transfer
            .apply(
                &state,
                &Statement::New {
                    dst: "r".to_string(),
                    class: "Node".to_string(),
                },
            )
            .state;
        let read = Statement::FieldRead {
            dst: "o".to_string(),
            object: "r".to_string(),
            field: "next".to_string(),
            site: SiteId(0),
        };
        let step = transfer.apply(&state, &read);
        assert_eq!(step.faults[0].verdict, Verdict::Never);
        assert_eq!(step.state.get("o").nullness, Nullness::DefinitelyNull);

        let write = Statement::FieldWrite {
            object: "r".to_string(),
            field: "next".to_string(),
            value: Expr::var("r"),
            site: SiteId(1),
        };
        state = transfer.apply(&state, &write).state;
        let step = transfer.apply(&state, &read);
        assert_eq!(step.state.get("o").nullness, Nullness::NonNull);
        assert_eq!(step.state.shape("o"), state.shape("r"));
    }

    #[test]
    fn test_self_field_read_must_alias() {
        let proc = procedure();
        let transfer = ExceptionTransfer::new(&proc);
        let mut state = AbstractState::top_for(&proc);
        for stmt in [
            Statement::New {
                dst: "r".to_string(),
                class: "Node".to_string(),
            },
            Statement::FieldWrite {
                object: "r".to_string(),
                field: "next".to_string(),
                value: Expr::var("r"),
                site: SiteId(0),
            },
            Statement::FieldRead {
                dst: "o".to_string(),
                object: "r".to_string(),
                field: "next".to_string(),
                site: SiteId(1),
            },
        ] {
            state = transfer.apply(&state, &stmt).state;
        }
        assert!(state.must_alias("o", "r"));
        assert!(transfer.assume(&state, &Cond::NotSame("r".into(), "o".into())).is_bottom());
        assert_eq!(transfer.assume(&state, &Cond::Same("o".into(), "r".into())), state);

        // Overwriting either side breaks the fact.
        let state = transfer.apply(&state, &assign("o", Expr::Null, None)).state;
        assert!(!state.must_alias("o", "r"));
        assert!(!transfer.assume(&state, &Cond::NotSame("r".into(), "o".into())).is_bottom());
    }

    #[test]
    fn test_dereference_refines_aliases() {
        let proc = procedure();
        let transfer = ExceptionTransfer::new(&proc);
        let state = AbstractState::top_for(&proc);
        let state = transfer.apply(&state, &assign("r", Expr::var("o"), None)).state;
        assert!(state.must_alias("r", "o"));

        let call = Statement::Call {
            dst: None,
            receiver: Some("r".to_string()),
            method: "hashCode".to_string(),
            args: vec![],
            site: Some(SiteId(0)),
        };
        let step = transfer.apply(&state, &call);
        assert_eq!(step.faults[0].verdict, Verdict::May);
        assert_eq!(step.state.get("o").nullness, Nullness::NonNull);

        let null = transfer.assume(&state, &Cond::is_null("o"));
        assert_eq!(null.get("r").nullness, Nullness::DefinitelyNull);
    }

    #[test]
    fn test_integer_division_into_float() {
        let proc = procedure();
        let transfer = ExceptionTransfer::new(&proc);
        let state = AbstractState::top_for(&proc);
        let step = transfer.apply(&state, &assign("f", Expr::var("i").div(Expr::int(0)), Some(0)));
        assert_eq!(step.faults[0].verdict, Verdict::Always);
        assert!(step.state.is_bottom());
    }

    #[test]
    fn test_call_havocs_heap() {
        let proc = procedure();
        let transfer = ExceptionTransfer::new(&proc);
        let mut state = AbstractState::top_for(&proc);
        state = transfer
            .apply(
                &state,
                &Statement::New {
                    dst: "r".to_string(),
                    class: "Node".to_string(),
                },
            )
            .state;
        let call = Statement::Call {
            dst: Some("o".to_string()),
            receiver: Some("r".to_string()),
            method: "hashCode".to_string(),
            args: vec![],
            site: Some(SiteId(0)),
        };
        let step = transfer.apply(&state, &call);
        assert_eq!(step.faults[0].verdict, Verdict::Never);
        assert!(step.state.shape("r").is_top());
        assert_eq!(step.state.get("o").nullness, Nullness::MaybeNull);
    }

    #[test]
    fn test_unreachable_statement_reports_never() {
        let proc = procedure();
        let transfer = ExceptionTransfer::new(&proc);
        let step = transfer.apply(&AbstractState::bottom(), &Statement::Throw { site: SiteId(7) });
        assert_eq!(step.faults.len(), 1);
        assert_eq!(step.faults[0].verdict, Verdict::Never);
    }
}

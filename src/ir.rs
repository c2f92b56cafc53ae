//! Intermediate representation consumed by the analysis.
//!
//! A [`Procedure`] is a control-flow graph of [`BasicBlock`]s over a small
//! three-address statement set. Front ends build procedures with
//! [`ProcedureBuilder`][crate::builder::ProcedureBuilder] (or [`Procedure::new`]
//! directly); once built, the IR is immutable.
//!
//! Operations that may raise a runtime exception carry a [`SiteId`]. An array
//! access carries two sites, one for the null check and one for the bounds
//! check, since the two faults are reported independently.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::error::{AnalysisError, Result};

/// Variable name.
pub type Var = String;

/// Element kind of an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Elem {
    Int,
    Float,
    Ref,
}

/// Declared kind of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Kind {
    Int,
    Float,
    Ref,
    Array(Elem),
}

impl Kind {
    /// Whether values of this kind may be `null`.
    pub fn is_reference(self) -> bool {
        matches!(self, Kind::Ref | Kind::Array(_))
    }

    pub fn is_array(self) -> bool {
        matches!(self, Kind::Array(_))
    }

    /// Kind of the elements, for arrays.
    pub fn element(self) -> Option<Kind> {
        match self {
            Kind::Array(Elem::Int) => Some(Kind::Int),
            Kind::Array(Elem::Float) => Some(Kind::Float),
            Kind::Array(Elem::Ref) => Some(Kind::Ref),
            _ => None,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Int => write!(f, "int"),
            Kind::Float => write!(f, "float"),
            Kind::Ref => write!(f, "ref"),
            Kind::Array(Elem::Int) => write!(f, "int[]"),
            Kind::Array(Elem::Float) => write!(f, "float[]"),
            Kind::Array(Elem::Ref) => write!(f, "ref[]"),
        }
    }
}

/// Stable identifier of a fault site within a procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SiteId(pub usize);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BlockId(pub usize);

impl BlockId {
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// Position of a statement: block and index within the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Location {
    pub block: BlockId,
    pub statement: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.block, self.statement)
    }
}

/// Kind of runtime failure guarded by a fault site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum FaultKind {
    DivByZero,
    IndexOutOfBounds,
    NullDereference,
    ExplicitThrow,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::DivByZero => write!(f, "division by zero"),
            FaultKind::IndexOutOfBounds => write!(f, "index out of bounds"),
            FaultKind::NullDereference => write!(f, "null dereference"),
            FaultKind::ExplicitThrow => write!(f, "explicit throw"),
        }
    }
}

/// A fault site: an operation that may fail, and where it lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FaultSite {
    pub id: SiteId,
    pub kind: FaultKind,
    pub location: Location,
}

// === Expressions and conditions ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CmpOp {
    /// Operator of the negated comparison: `!(a < b)` is `a >= b`.
    pub fn negate(self) -> CmpOp {
        match self {
            CmpOp::Lt => CmpOp::Ge,
            CmpOp::Le => CmpOp::Gt,
            CmpOp::Gt => CmpOp::Le,
            CmpOp::Ge => CmpOp::Lt,
            CmpOp::Eq => CmpOp::Ne,
            CmpOp::Ne => CmpOp::Eq,
        }
    }

    /// Operator with swapped operands: `a < b` is `b > a`.
    pub fn flip(self) -> CmpOp {
        match self {
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::Le => CmpOp::Ge,
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::Ge => CmpOp::Le,
            CmpOp::Eq => CmpOp::Eq,
            CmpOp::Ne => CmpOp::Ne,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
        }
    }
}

/// Side-effect free expression.
///
/// Integer division is only allowed on the right-hand side of a
/// [`Statement::Assign`], which then carries the division site.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Null,
    /// String literal (a non-null reference).
    Str(String),
    Var(Var),
    /// Length of an array, read without a null check. Only allowed inside
    /// [`Statement::Assert`], where a holding comparison implies a non-null
    /// array. Elsewhere the length is read with [`Statement::ArrayLength`].
    Length(Var),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn var(name: impl Into<Var>) -> Self {
        Expr::Var(name.into())
    }

    pub fn int(value: i64) -> Self {
        Expr::Int(value)
    }

    pub fn length(array: impl Into<Var>) -> Self {
        Expr::Length(array.into())
    }

    pub fn str(value: impl Into<String>) -> Self {
        Expr::Str(value.into())
    }

    fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    /// Addition: self + other
    pub fn add(self, other: Self) -> Self {
        Self::binary(BinOp::Add, self, other)
    }

    /// Subtraction: self - other
    pub fn sub(self, other: Self) -> Self {
        Self::binary(BinOp::Sub, self, other)
    }

    /// Multiplication: self * other
    pub fn mul(self, other: Self) -> Self {
        Self::binary(BinOp::Mul, self, other)
    }

    /// Division: self / other
    pub fn div(self, other: Self) -> Self {
        Self::binary(BinOp::Div, self, other)
    }

    /// Remainder: self % other
    pub fn rem(self, other: Self) -> Self {
        Self::binary(BinOp::Rem, self, other)
    }

    /// Negation: -self
    pub fn neg(self) -> Self {
        Expr::Neg(Box::new(self))
    }

    pub fn lt(self, other: Self) -> Cond {
        Cond::Cmp(CmpOp::Lt, self, other)
    }

    pub fn le(self, other: Self) -> Cond {
        Cond::Cmp(CmpOp::Le, self, other)
    }

    pub fn gt(self, other: Self) -> Cond {
        Cond::Cmp(CmpOp::Gt, self, other)
    }

    pub fn ge(self, other: Self) -> Cond {
        Cond::Cmp(CmpOp::Ge, self, other)
    }

    pub fn eq(self, other: Self) -> Cond {
        Cond::Cmp(CmpOp::Eq, self, other)
    }

    pub fn neq(self, other: Self) -> Cond {
        Cond::Cmp(CmpOp::Ne, self, other)
    }

    /// Static kind of the expression, given the kinds of its variables.
    pub fn kind(&self, kind_of: &dyn Fn(&str) -> Kind) -> Kind {
        match self {
            Expr::Int(_) | Expr::Length(_) => Kind::Int,
            Expr::Float(_) => Kind::Float,
            Expr::Null | Expr::Str(_) => Kind::Ref,
            Expr::Var(v) => kind_of(v),
            Expr::Neg(e) => e.kind(kind_of),
            Expr::Binary(_, lhs, rhs) => {
                if lhs.kind(kind_of) == Kind::Float || rhs.kind(kind_of) == Kind::Float {
                    Kind::Float
                } else {
                    Kind::Int
                }
            }
        }
    }

    /// Divisors of every integer division or remainder in the expression.
    /// Floating-point divisions never fault and are skipped.
    pub fn integer_divisors(&self, kind_of: &dyn Fn(&str) -> Kind) -> Vec<&Expr> {
        let mut out = Vec::new();
        self.collect_divisors(kind_of, &mut out);
        out
    }

    fn collect_divisors<'a>(&'a self, kind_of: &dyn Fn(&str) -> Kind, out: &mut Vec<&'a Expr>) {
        match self {
            Expr::Binary(op, lhs, rhs) => {
                lhs.collect_divisors(kind_of, out);
                rhs.collect_divisors(kind_of, out);
                if matches!(op, BinOp::Div | BinOp::Rem) && self.kind(kind_of) == Kind::Int {
                    out.push(rhs);
                }
            }
            Expr::Neg(e) => e.collect_divisors(kind_of, out),
            _ => {}
        }
    }

    /// Whether the expression reads an array length.
    pub fn reads_length(&self) -> bool {
        match self {
            Expr::Length(_) => true,
            Expr::Neg(e) => e.reads_length(),
            Expr::Binary(_, lhs, rhs) => lhs.reads_length() || rhs.reads_length(),
            _ => false,
        }
    }

    pub fn visit_vars<'a>(&'a self, f: &mut dyn FnMut(&'a str)) {
        match self {
            Expr::Var(v) | Expr::Length(v) => f(v),
            Expr::Neg(e) => e.visit_vars(f),
            Expr::Binary(_, lhs, rhs) => {
                lhs.visit_vars(f);
                rhs.visit_vars(f);
            }
            Expr::Int(_) | Expr::Float(_) | Expr::Null | Expr::Str(_) => {}
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn operand(f: &mut fmt::Formatter<'_>, e: &Expr) -> fmt::Result {
            match e {
                Expr::Binary(..) => write!(f, "({})", e),
                _ => write!(f, "{}", e),
            }
        }

        match self {
            Expr::Int(n) => write!(f, "{}", n),
            Expr::Float(x) => write!(f, "{:?}", x),
            Expr::Null => write!(f, "null"),
            Expr::Str(s) => write!(f, "{:?}", s),
            Expr::Var(v) => write!(f, "{}", v),
            Expr::Length(v) => write!(f, "{}.length", v),
            Expr::Neg(e) => {
                write!(f, "-")?;
                operand(f, e)
            }
            Expr::Binary(op, lhs, rhs) => {
                operand(f, lhs)?;
                write!(f, " {} ", op.symbol())?;
                operand(f, rhs)
            }
        }
    }
}

/// Boolean condition of an assertion or a branch.
#[derive(Debug, Clone, PartialEq)]
pub enum Cond {
    True,
    False,
    /// A boolean the analysis cannot interpret (e.g. the result of a call).
    Opaque,
    /// Integer comparison.
    Cmp(CmpOp, Expr, Expr),
    IsNull(Var),
    NonNull(Var),
    /// Reference equality: `a == b`.
    Same(Var, Var),
    /// Reference inequality: `a != b`.
    NotSame(Var, Var),
    Not(Box<Cond>),
    And(Box<Cond>, Box<Cond>),
    Or(Box<Cond>, Box<Cond>),
}

impl Cond {
    pub fn is_null(var: impl Into<Var>) -> Self {
        Cond::IsNull(var.into())
    }

    pub fn non_null(var: impl Into<Var>) -> Self {
        Cond::NonNull(var.into())
    }

    /// Negation: !self
    pub fn not(self) -> Self {
        Cond::Not(Box::new(self))
    }

    /// Conjunction: self && other
    pub fn and(self, other: Self) -> Self {
        Cond::And(Box::new(self), Box::new(other))
    }

    /// Disjunction: self || other
    pub fn or(self, other: Self) -> Self {
        Cond::Or(Box::new(self), Box::new(other))
    }

    /// Logical negation pushed down to the atoms (De Morgan).
    pub fn negated(&self) -> Cond {
        match self {
            Cond::True => Cond::False,
            Cond::False => Cond::True,
            Cond::Opaque => Cond::Opaque,
            Cond::Cmp(op, lhs, rhs) => Cond::Cmp(op.negate(), lhs.clone(), rhs.clone()),
            Cond::IsNull(v) => Cond::NonNull(v.clone()),
            Cond::NonNull(v) => Cond::IsNull(v.clone()),
            Cond::Same(a, b) => Cond::NotSame(a.clone(), b.clone()),
            Cond::NotSame(a, b) => Cond::Same(a.clone(), b.clone()),
            Cond::Not(c) => (**c).clone(),
            Cond::And(a, b) => a.negated().or(b.negated()),
            Cond::Or(a, b) => a.negated().and(b.negated()),
        }
    }

    /// Integer operands of every comparison.
    pub fn exprs(&self) -> Vec<&Expr> {
        match self {
            Cond::Cmp(_, lhs, rhs) => vec![lhs, rhs],
            Cond::Not(c) => c.exprs(),
            Cond::And(a, b) | Cond::Or(a, b) => {
                let mut out = a.exprs();
                out.extend(b.exprs());
                out
            }
            _ => Vec::new(),
        }
    }

    pub fn visit_vars<'a>(&'a self, f: &mut dyn FnMut(&'a str)) {
        match self {
            Cond::True | Cond::False | Cond::Opaque => {}
            Cond::Cmp(_, lhs, rhs) => {
                lhs.visit_vars(f);
                rhs.visit_vars(f);
            }
            Cond::IsNull(v) | Cond::NonNull(v) => f(v),
            Cond::Same(a, b) | Cond::NotSame(a, b) => {
                f(a);
                f(b);
            }
            Cond::Not(c) => c.visit_vars(f),
            Cond::And(a, b) | Cond::Or(a, b) => {
                a.visit_vars(f);
                b.visit_vars(f);
            }
        }
    }
}

impl fmt::Display for Cond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cond::True => write!(f, "true"),
            Cond::False => write!(f, "false"),
            Cond::Opaque => write!(f, "*"),
            Cond::Cmp(op, lhs, rhs) => write!(f, "{} {} {}", lhs, op.symbol(), rhs),
            Cond::IsNull(v) => write!(f, "{} == null", v),
            Cond::NonNull(v) => write!(f, "{} != null", v),
            Cond::Same(a, b) => write!(f, "{} == {}", a, b),
            Cond::NotSame(a, b) => write!(f, "{} != {}", a, b),
            Cond::Not(c) => write!(f, "!({})", c),
            Cond::And(a, b) => write!(f, "({}) && ({})", a, b),
            Cond::Or(a, b) => write!(f, "({}) || ({})", a, b),
        }
    }
}

// === Statements and blocks ===

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `dst = expr`. Integer assignments containing `/` or `%` carry a
    /// division site.
    Assign {
        dst: Var,
        expr: Expr,
        site: Option<SiteId>,
    },
    /// Refinement filter; executions violating the condition are discarded.
    Assert(Cond),
    /// `dst = new C()`: a fresh object whose reference fields are all `null`.
    New { dst: Var, class: String },
    /// `dst = new T[length]`: a fresh array of default elements.
    NewArray { dst: Var, length: Expr },
    ArrayLength {
        dst: Var,
        array: Var,
        site: SiteId,
    },
    ArrayLoad {
        dst: Var,
        array: Var,
        index: Expr,
        null_site: SiteId,
        bounds_site: SiteId,
    },
    ArrayStore {
        array: Var,
        index: Expr,
        value: Expr,
        null_site: SiteId,
        bounds_site: SiteId,
    },
    FieldRead {
        dst: Var,
        object: Var,
        field: String,
        site: SiteId,
    },
    FieldWrite {
        object: Var,
        field: String,
        value: Expr,
        site: SiteId,
    },
    /// Opaque call. With a receiver it is a virtual dispatch, and the
    /// receiver is dereferenced.
    Call {
        dst: Option<Var>,
        receiver: Option<Var>,
        method: String,
        args: Vec<Expr>,
        site: Option<SiteId>,
    },
    Throw { site: SiteId },
    Return(Option<Expr>),
}

impl Statement {
    /// Fault sites guarded by this statement, in evaluation order.
    pub fn sites(&self) -> Vec<(SiteId, FaultKind)> {
        match self {
            Statement::Assign { site, .. } => site.iter().map(|&s| (s, FaultKind::DivByZero)).collect(),
            Statement::ArrayLength { site, .. }
            | Statement::FieldRead { site, .. }
            | Statement::FieldWrite { site, .. } => vec![(*site, FaultKind::NullDereference)],
            Statement::ArrayLoad {
                null_site,
                bounds_site,
                ..
            }
            | Statement::ArrayStore {
                null_site,
                bounds_site,
                ..
            } => vec![
                (*null_site, FaultKind::NullDereference),
                (*bounds_site, FaultKind::IndexOutOfBounds),
            ],
            Statement::Call { site, .. } => site.iter().map(|&s| (s, FaultKind::NullDereference)).collect(),
            Statement::Throw { site } => vec![(*site, FaultKind::ExplicitThrow)],
            Statement::Assert(_) | Statement::New { .. } | Statement::NewArray { .. } | Statement::Return(_) => {
                Vec::new()
            }
        }
    }

    /// Variable overwritten by this statement.
    pub fn defined(&self) -> Option<&str> {
        match self {
            Statement::Assign { dst, .. }
            | Statement::New { dst, .. }
            | Statement::NewArray { dst, .. }
            | Statement::ArrayLength { dst, .. }
            | Statement::ArrayLoad { dst, .. }
            | Statement::FieldRead { dst, .. } => Some(dst),
            Statement::Call { dst, .. } => dst.as_deref(),
            _ => None,
        }
    }

    /// Every expression evaluated by this statement.
    pub fn exprs(&self) -> Vec<&Expr> {
        match self {
            Statement::Assign { expr, .. } => vec![expr],
            Statement::Assert(cond) => cond.exprs(),
            Statement::NewArray { length, .. } => vec![length],
            Statement::ArrayLoad { index, .. } => vec![index],
            Statement::ArrayStore { index, value, .. } => vec![index, value],
            Statement::FieldWrite { value, .. } => vec![value],
            Statement::Call { args, .. } => args.iter().collect(),
            Statement::Return(value) => value.iter().collect(),
            Statement::New { .. }
            | Statement::ArrayLength { .. }
            | Statement::FieldRead { .. }
            | Statement::Throw { .. } => Vec::new(),
        }
    }

    /// Whether control never falls through to the next statement.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Statement::Throw { .. } | Statement::Return(_))
    }

    pub fn visit_vars<'a>(&'a self, f: &mut dyn FnMut(&'a str)) {
        match self {
            Statement::Assign { dst, expr, .. } => {
                f(dst);
                expr.visit_vars(f);
            }
            Statement::Assert(cond) => cond.visit_vars(f),
            Statement::New { dst, .. } => f(dst),
            Statement::NewArray { dst, length } => {
                f(dst);
                length.visit_vars(f);
            }
            Statement::ArrayLength { dst, array, .. } => {
                f(dst);
                f(array);
            }
            Statement::ArrayLoad { dst, array, index, .. } => {
                f(dst);
                f(array);
                index.visit_vars(f);
            }
            Statement::ArrayStore {
                array, index, value, ..
            } => {
                f(array);
                index.visit_vars(f);
                value.visit_vars(f);
            }
            Statement::FieldRead { dst, object, .. } => {
                f(dst);
                f(object);
            }
            Statement::FieldWrite { object, value, .. } => {
                f(object);
                value.visit_vars(f);
            }
            Statement::Call {
                dst, receiver, args, ..
            } => {
                if let Some(dst) = dst {
                    f(dst);
                }
                if let Some(receiver) = receiver {
                    f(receiver);
                }
                for arg in args {
                    arg.visit_vars(f);
                }
            }
            Statement::Throw { .. } => {}
            Statement::Return(value) => {
                if let Some(value) = value {
                    value.visit_vars(f);
                }
            }
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Assign { dst, expr, .. } => write!(f, "{} = {}", dst, expr),
            Statement::Assert(cond) => write!(f, "assert {}", cond),
            Statement::New { dst, class } => write!(f, "{} = new {}()", dst, class),
            Statement::NewArray { dst, length } => write!(f, "{} = new [{}]", dst, length),
            Statement::ArrayLength { dst, array, .. } => write!(f, "{} = {}.length", dst, array),
            Statement::ArrayLoad { dst, array, index, .. } => write!(f, "{} = {}[{}]", dst, array, index),
            Statement::ArrayStore {
                array, index, value, ..
            } => write!(f, "{}[{}] = {}", array, index, value),
            Statement::FieldRead { dst, object, field, .. } => write!(f, "{} = {}.{}", dst, object, field),
            Statement::FieldWrite {
                object, field, value, ..
            } => write!(f, "{}.{} = {}", object, field, value),
            Statement::Call {
                dst,
                receiver,
                method,
                args,
                ..
            } => {
                if let Some(dst) = dst {
                    write!(f, "{} = ", dst)?;
                }
                if let Some(receiver) = receiver {
                    write!(f, "{}.", receiver)?;
                }
                write!(f, "{}(", method)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Statement::Throw { .. } => write!(f, "throw"),
            Statement::Return(None) => write!(f, "return"),
            Statement::Return(Some(value)) => write!(f, "return {}", value),
        }
    }
}

/// How control leaves a basic block.
#[derive(Debug, Clone, PartialEq)]
pub enum Exit {
    Goto(BlockId),
    Branch {
        cond: Cond,
        then_block: BlockId,
        else_block: BlockId,
    },
    /// No successors (the block ends in `return` or `throw`).
    Halt,
}

impl Exit {
    pub fn successors(&self) -> Vec<(BlockId, EdgeKind)> {
        match self {
            Exit::Goto(target) => vec![(*target, EdgeKind::Unconditional)],
            Exit::Branch {
                then_block,
                else_block,
                ..
            } => vec![(*then_block, EdgeKind::TrueBranch), (*else_block, EdgeKind::FalseBranch)],
            Exit::Halt => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub id: BlockId,
    pub statements: Vec<Statement>,
    pub exit: Exit,
}

impl BasicBlock {
    pub fn new(id: BlockId) -> Self {
        Self {
            id,
            statements: Vec::new(),
            exit: Exit::Halt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EdgeKind {
    Unconditional,
    TrueBranch,
    FalseBranch,
    /// Retreating edge of the depth-first order from the entry; its target is
    /// a loop head.
    LoopBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: BlockId,
    pub to: BlockId,
    pub kind: EdgeKind,
}

// === Procedures ===

#[derive(Debug, Clone)]
pub struct Procedure {
    name: String,
    params: Vec<(Var, Kind)>,
    vars: BTreeMap<Var, Kind>,
    entry: BlockId,
    blocks: Vec<BasicBlock>,
    sites: Vec<FaultSite>,
}

impl Procedure {
    /// Assemble and validate a procedure. The first block is the entry.
    pub fn new(
        name: impl Into<String>,
        params: Vec<(Var, Kind)>,
        locals: Vec<(Var, Kind)>,
        blocks: Vec<BasicBlock>,
    ) -> Result<Self> {
        let name = name.into();
        let mut declared = BTreeSet::new();
        for (var, _) in params.iter().chain(&locals) {
            if !declared.insert(var) {
                return Err(AnalysisError::MalformedIr {
                    procedure: name,
                    reason: format!("variable `{}` is declared twice", var),
                });
            }
        }

        let procedure = Self::assemble(name, params, locals, blocks);
        procedure.validate()?;
        Ok(procedure)
    }

    /// Assemble without validating, to feed malformed IR to the driver.
    #[cfg(test)]
    pub(crate) fn new_unchecked(
        name: impl Into<String>,
        params: Vec<(Var, Kind)>,
        locals: Vec<(Var, Kind)>,
        blocks: Vec<BasicBlock>,
    ) -> Self {
        Self::assemble(name.into(), params, locals, blocks)
    }

    fn assemble(name: String, params: Vec<(Var, Kind)>, locals: Vec<(Var, Kind)>, blocks: Vec<BasicBlock>) -> Self {
        let vars = params.iter().chain(&locals).cloned().collect();

        let mut sites = Vec::new();
        for block in &blocks {
            for (index, stmt) in block.statements.iter().enumerate() {
                let location = Location {
                    block: block.id,
                    statement: index,
                };
                for (id, kind) in stmt.sites() {
                    sites.push(FaultSite { id, kind, location });
                }
            }
        }
        sites.sort_by_key(|site| site.id);

        Self {
            name,
            params,
            vars,
            entry: BlockId(0),
            blocks,
            sites,
        }
    }

    /// Check the structural invariants of the IR.
    pub fn validate(&self) -> Result<()> {
        let malformed = |reason: String| AnalysisError::MalformedIr {
            procedure: self.name.clone(),
            reason,
        };

        if self.blocks.is_empty() {
            return Err(malformed("procedure has no blocks".to_string()));
        }

        for (index, block) in self.blocks.iter().enumerate() {
            if block.id.index() != index {
                return Err(malformed(format!("block at position {} is labelled {}", index, block.id)));
            }
            for (target, _) in block.exit.successors() {
                if target.index() >= self.blocks.len() {
                    return Err(malformed(format!("{} jumps to unknown block {}", block.id, target)));
                }
            }

            let mut undeclared = None;
            let mut check = |var: &str| {
                if undeclared.is_none() && !self.vars.contains_key(var) {
                    undeclared = Some(var.to_string());
                }
            };
            for stmt in &block.statements {
                stmt.visit_vars(&mut check);
            }
            if let Exit::Branch { cond, .. } = &block.exit {
                cond.visit_vars(&mut check);
            }
            if let Some(var) = undeclared {
                return Err(malformed(format!("{} references undeclared variable `{}`", block.id, var)));
            }

            for stmt in &block.statements {
                self.check_operands(stmt).map_err(|reason| malformed(format!("{}: `{}` {}", block.id, stmt, reason)))?;
            }
            if let Exit::Branch { cond, .. } = &block.exit {
                let kind_of = |var: &str| self.kind_of(var).unwrap_or(Kind::Int);
                for expr in cond.exprs() {
                    if expr.reads_length() {
                        return Err(malformed(format!("{}: branch `{}` reads a length unchecked", block.id, cond)));
                    }
                    if !expr.integer_divisors(&kind_of).is_empty() {
                        return Err(malformed(format!("{}: branch `{}` divides", block.id, cond)));
                    }
                }
            }
        }

        let mut seen = BTreeSet::new();
        for site in &self.sites {
            if !seen.insert(site.id) {
                return Err(malformed(format!("fault site {} is used twice", site.id)));
            }
        }
        for (index, site) in self.sites.iter().enumerate() {
            if site.id != SiteId(index) {
                return Err(malformed(format!("fault sites are not dense: expected {}, found {}", SiteId(index), site.id)));
            }
        }

        let reachable: BTreeSet<BlockId> = self.reverse_postorder().into_iter().collect();
        if let Some(block) = self.blocks.iter().find(|b| !reachable.contains(&b.id)) {
            return Err(malformed(format!("{} is disconnected from the entry", block.id)));
        }

        Ok(())
    }

    /// Unchecked length reads are only allowed in assertions, integer
    /// divisions only in assignments, and an assignment has a division site
    /// exactly when it divides integers.
    fn check_operands(&self, stmt: &Statement) -> std::result::Result<(), String> {
        let kind_of = |var: &str| self.kind_of(var).unwrap_or(Kind::Int);
        for expr in stmt.exprs() {
            if expr.reads_length() && !matches!(stmt, Statement::Assert(_)) {
                return Err("reads a length without a null check".to_string());
            }
            if !expr.integer_divisors(&kind_of).is_empty() && !matches!(stmt, Statement::Assign { .. }) {
                return Err("divides outside an assignment".to_string());
            }
        }
        if let Statement::Assign { expr, site, .. } = stmt {
            let divides = !expr.integer_divisors(&kind_of).is_empty();
            if divides != site.is_some() {
                return Err("has a division site that does not match its divisions".to_string());
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[(Var, Kind)] {
        &self.params
    }

    /// Every declared variable (parameters and locals) with its kind.
    pub fn vars(&self) -> &BTreeMap<Var, Kind> {
        &self.vars
    }

    pub fn kind_of(&self, var: &str) -> Option<Kind> {
        self.vars.get(var).copied()
    }

    pub fn entry(&self) -> BlockId {
        self.entry
    }

    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    pub fn sites(&self) -> &[FaultSite] {
        &self.sites
    }

    pub fn site(&self, id: SiteId) -> Option<&FaultSite> {
        self.sites.iter().find(|site| site.id == id)
    }

    /// Statement guarding a fault site.
    pub fn statement_at(&self, location: Location) -> &Statement {
        &self.block(location.block).statements[location.statement]
    }

    pub fn statement_count(&self) -> usize {
        self.blocks.iter().map(|b| b.statements.len()).sum()
    }

    /// Blocks reachable from the entry, in reverse post-order.
    pub fn reverse_postorder(&self) -> Vec<BlockId> {
        let mut visited = vec![false; self.blocks.len()];
        let mut postorder = Vec::with_capacity(self.blocks.len());
        // Explicit stack of (block, next successor index).
        let mut stack = vec![(self.entry, 0usize)];
        visited[self.entry.index()] = true;

        while let Some((block, next)) = stack.pop() {
            let succs = self.blocks[block.index()].exit.successors();
            if let Some(&(succ, _)) = succs.get(next) {
                stack.push((block, next + 1));
                if succ.index() < visited.len() && !visited[succ.index()] {
                    visited[succ.index()] = true;
                    stack.push((succ, 0));
                }
            } else {
                postorder.push(block);
            }
        }

        postorder.reverse();
        postorder
    }

    /// All control-flow edges. Retreating edges are classified as
    /// [`EdgeKind::LoopBack`].
    pub fn edges(&self) -> Vec<Edge> {
        let order = self.rpo_positions();
        let mut edges = Vec::new();
        for block in &self.blocks {
            for (to, kind) in block.exit.successors() {
                let retreating = match (order.get(&block.id), order.get(&to)) {
                    (Some(from_pos), Some(to_pos)) => to_pos <= from_pos,
                    _ => false,
                };
                edges.push(Edge {
                    from: block.id,
                    to,
                    kind: if retreating { EdgeKind::LoopBack } else { kind },
                });
            }
        }
        edges
    }

    /// Targets of loop-back edges: the widening points.
    pub fn loop_heads(&self) -> BTreeSet<BlockId> {
        self.edges()
            .into_iter()
            .filter(|e| e.kind == EdgeKind::LoopBack)
            .map(|e| e.to)
            .collect()
    }

    pub fn predecessors(&self, id: BlockId) -> Vec<BlockId> {
        self.blocks
            .iter()
            .filter(|b| b.exit.successors().iter().any(|&(to, _)| to == id))
            .map(|b| b.id)
            .collect()
    }

    pub(crate) fn rpo_positions(&self) -> BTreeMap<BlockId, usize> {
        self.reverse_postorder()
            .into_iter()
            .enumerate()
            .map(|(pos, id)| (id, pos))
            .collect()
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, (var, kind)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", kind, var)?;
        }
        writeln!(f, ")")?;
        for block in &self.blocks {
            writeln!(f, "  {}:", block.id)?;
            for stmt in &block.statements {
                writeln!(f, "    {}", stmt)?;
            }
            match &block.exit {
                Exit::Goto(target) => writeln!(f, "    goto {}", target)?,
                Exit::Branch {
                    cond,
                    then_block,
                    else_block,
                } => writeln!(f, "    if {} then {} else {}", cond, then_block, else_block)?,
                Exit::Halt => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::builder::ProcedureBuilder;

    fn counting_loop() -> Procedure {
        // i = 0; while (i < 10) { i = i + 1 }; return
        let mut b = ProcedureBuilder::new("loop");
        b.local("i", Kind::Int);
        let entry = b.entry();
        let head = b.new_block();
        let body = b.new_block();
        let exit = b.new_block();
        b.assign(entry, "i", Expr::int(0));
        b.goto(entry, head);
        b.branch(head, Expr::var("i").lt(Expr::int(10)), body, exit);
        b.assign(body, "i", Expr::var("i").add(Expr::int(1)));
        b.goto(body, head);
        b.ret(exit, None);
        b.build().unwrap()
    }

    #[test]
    fn test_reverse_postorder_starts_at_entry() {
        let proc = counting_loop();
        let rpo = proc.reverse_postorder();
        assert_eq!(rpo.len(), 4);
        assert_eq!(rpo[0], proc.entry());
    }

    #[test]
    fn test_loop_heads() {
        let proc = counting_loop();
        let heads = proc.loop_heads();
        assert_eq!(heads.into_iter().collect::<Vec<_>>(), vec![BlockId(1)]);

        let back: Vec<_> = proc.edges().into_iter().filter(|e| e.kind == EdgeKind::LoopBack).collect();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].from, BlockId(2));
    }

    #[test]
    fn test_predecessors() {
        let proc = counting_loop();
        assert_eq!(proc.predecessors(BlockId(1)), vec![BlockId(0), BlockId(2)]);
        assert!(proc.predecessors(BlockId(0)).is_empty());
    }

    #[test]
    fn test_undeclared_variable_is_malformed() {
        let mut b = ProcedureBuilder::new("bad");
        let entry = b.entry();
        b.assign(entry, "x", Expr::int(1));
        b.ret(entry, None);
        let err = b.build().unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedIr { .. }));
        assert!(err.to_string().contains("undeclared variable `x`"));
    }

    #[test]
    fn test_disconnected_block_is_malformed() {
        let mut b = ProcedureBuilder::new("orphan");
        let entry = b.entry();
        let orphan = b.new_block();
        b.ret(entry, None);
        b.ret(orphan, None);
        let err = b.build().unwrap_err();
        assert!(err.to_string().contains("bb1 is disconnected"));
    }

    #[test]
    fn test_duplicate_declaration_is_malformed() {
        let err = Procedure::new(
            "dup",
            vec![("x".to_string(), Kind::Int)],
            vec![("x".to_string(), Kind::Ref)],
            vec![BasicBlock::new(BlockId(0))],
        )
        .unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn test_display() {
        let expr = Expr::var("i").sub(Expr::var("j").mul(Expr::int(2))).neg();
        assert_eq!(expr.to_string(), "-(i - (j * 2))");

        let cond = Expr::var("i").gt(Expr::int(0)).and(Cond::non_null("s"));
        assert_eq!(cond.to_string(), "(i > 0) && (s != null)");
    }

    #[test]
    fn test_negated() {
        let cond = Expr::var("i").lt(Expr::int(0)).and(Cond::is_null("s"));
        assert_eq!(cond.negated().to_string(), "(i >= 0) || (s != null)");
        assert_eq!(cond.clone().not().negated(), cond);
    }

    #[test]
    fn test_integer_divisors() {
        let kinds = |var: &str| if var == "f" { Kind::Float } else { Kind::Int };
        let expr = Expr::var("a").div(Expr::var("b")).add(Expr::int(4).rem(Expr::var("c")));
        let divisors: Vec<String> = expr.integer_divisors(&kinds).iter().map(|d| d.to_string()).collect();
        assert_eq!(divisors, vec!["b", "c"]);
        assert!(Expr::var("a").add(Expr::int(1)).integer_divisors(&kinds).is_empty());
        assert!(Expr::var("f").div(Expr::int(0)).integer_divisors(&kinds).is_empty());

        // An integer division nested in a float expression still divides.
        let mixed = Expr::var("f").add(Expr::var("a").div(Expr::int(0)));
        assert_eq!(mixed.kind(&kinds), Kind::Float);
        assert_eq!(mixed.integer_divisors(&kinds).len(), 1);
    }

    #[test]
    fn test_unchecked_length_outside_assert_is_malformed() {
        // a = null; if (a.length > 0) ...
        let mut b = ProcedureBuilder::new("branch");
        b.local("a", Kind::Array(Elem::Int));
        let entry = b.entry();
        let then = b.new_block();
        let done = b.new_block();
        b.assign(entry, "a", Expr::Null);
        b.branch(entry, Expr::length("a").gt(Expr::int(0)), then, done);
        b.ret(then, None);
        b.ret(done, None);
        let err = b.build().unwrap_err();
        assert!(err.to_string().contains("reads a length unchecked"), "{}", err);

        // x = a.length + 1
        let mut b = ProcedureBuilder::new("assign");
        b.local("a", Kind::Array(Elem::Int)).local("x", Kind::Int);
        let entry = b.entry();
        b.assign(entry, "a", Expr::Null);
        b.assign(entry, "x", Expr::length("a").add(Expr::int(1)));
        b.ret(entry, None);
        let err = b.build().unwrap_err();
        assert!(err.to_string().contains("without a null check"), "{}", err);

        // assert a.length > 0 is fine
        let mut b = ProcedureBuilder::new("assert");
        b.param("a", Kind::Array(Elem::Int));
        let entry = b.entry();
        b.assert(entry, Expr::length("a").gt(Expr::int(0)));
        b.ret(entry, None);
        assert!(b.build().is_ok());
    }

    #[test]
    fn test_division_outside_assign_is_malformed() {
        let mut b = ProcedureBuilder::new("ret");
        let entry = b.entry();
        b.ret(entry, Some(Expr::int(4).div(Expr::int(0))));
        let err = b.build().unwrap_err();
        assert!(err.to_string().contains("divides outside an assignment"), "{}", err);

        let mut b = ProcedureBuilder::new("index");
        b.param("a", Kind::Array(Elem::Int)).param("i", Kind::Int).local("x", Kind::Int);
        let entry = b.entry();
        b.array_load(entry, "x", "a", Expr::int(10).div(Expr::var("i")));
        b.ret(entry, None);
        assert!(b.build().is_err());

        let mut b = ProcedureBuilder::new("cond");
        b.param("i", Kind::Int);
        let entry = b.entry();
        let then = b.new_block();
        b.branch(entry, Expr::int(1).div(Expr::var("i")).gt(Expr::int(0)), then, then);
        b.ret(then, None);
        assert!(b.build().is_err());
    }

    #[test]
    fn test_assign_without_its_division_site_is_malformed() {
        let block = BasicBlock {
            id: BlockId(0),
            statements: vec![
                Statement::Assign {
                    dst: "r".to_string(),
                    expr: Expr::var("i").div(Expr::int(0)),
                    site: None,
                },
                Statement::Return(None),
            ],
            exit: Exit::Halt,
        };
        let err = Procedure::new(
            "missing",
            vec![("i".to_string(), Kind::Int)],
            vec![("r".to_string(), Kind::Float)],
            vec![block],
        )
        .unwrap_err();
        assert!(err.to_string().contains("division site"), "{}", err);
    }

    #[test]
    fn test_sparse_sites_are_malformed() {
        let block = BasicBlock {
            id: BlockId(0),
            statements: vec![Statement::Throw { site: SiteId(3) }],
            exit: Exit::Halt,
        };
        let err = Procedure::new("sparse", vec![], vec![], vec![block]).unwrap_err();
        assert!(err.to_string().contains("not dense"), "{}", err);
    }
}

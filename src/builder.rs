//! Typed construction of [`Procedure`]s.
//!
//! The builder hands out block identifiers, allocates a fresh [`SiteId`] for
//! every operation that may fail, and validates the result in [`build`].
//!
//! [`build`]: ProcedureBuilder::build
//!
//! # Examples
//!
//! ```
//! use exceptional::builder::ProcedureBuilder;
//! use exceptional::ir::{Expr, Kind};
//!
//! // int f(int i) { return 10 / i; }
//! let mut b = ProcedureBuilder::new("f");
//! b.param("i", Kind::Int).local("r", Kind::Int);
//! let entry = b.entry();
//! b.assign(entry, "r", Expr::int(10).div(Expr::var("i")));
//! b.ret(entry, Some(Expr::var("r")));
//! let procedure = b.build().unwrap();
//! assert_eq!(procedure.sites().len(), 1);
//! ```

use crate::error::Result;
use crate::ir::{BasicBlock, BlockId, Cond, Exit, Expr, Kind, Procedure, SiteId, Statement, Var};

#[derive(Debug, Clone)]
pub struct ProcedureBuilder {
    name: String,
    params: Vec<(Var, Kind)>,
    locals: Vec<(Var, Kind)>,
    blocks: Vec<BasicBlock>,
    next_site: usize,
}

impl ProcedureBuilder {
    /// Start a procedure with an empty entry block.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            locals: Vec::new(),
            blocks: vec![BasicBlock::new(BlockId(0))],
            next_site: 0,
        }
    }

    pub fn param(&mut self, name: impl Into<Var>, kind: Kind) -> &mut Self {
        self.params.push((name.into(), kind));
        self
    }

    pub fn local(&mut self, name: impl Into<Var>, kind: Kind) -> &mut Self {
        self.locals.push((name.into(), kind));
        self
    }

    pub fn kind_of(&self, var: &str) -> Option<Kind> {
        self.params
            .iter()
            .chain(&self.locals)
            .find(|(name, _)| name == var)
            .map(|(_, kind)| *kind)
    }

    pub fn entry(&self) -> BlockId {
        BlockId(0)
    }

    pub fn new_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(BasicBlock::new(id));
        id
    }

    fn fresh_site(&mut self) -> SiteId {
        let id = SiteId(self.next_site);
        self.next_site += 1;
        id
    }

    pub fn push(&mut self, block: BlockId, stmt: Statement) {
        self.blocks[block.index()].statements.push(stmt);
    }

    fn set_exit(&mut self, block: BlockId, exit: Exit) {
        self.blocks[block.index()].exit = exit;
    }

    /// `dst = expr`. Returns the division site, if the assignment has one.
    pub fn assign(&mut self, block: BlockId, dst: impl Into<Var>, expr: Expr) -> Option<SiteId> {
        let dst = dst.into();
        let divides = !expr.integer_divisors(&|var: &str| self.kind_of(var).unwrap_or(Kind::Int)).is_empty();
        let site = divides.then(|| self.fresh_site());
        self.push(block, Statement::Assign { dst, expr, site });
        site
    }

    pub fn assert(&mut self, block: BlockId, cond: Cond) {
        self.push(block, Statement::Assert(cond));
    }

    pub fn new_object(&mut self, block: BlockId, dst: impl Into<Var>, class: impl Into<String>) {
        let stmt = Statement::New {
            dst: dst.into(),
            class: class.into(),
        };
        self.push(block, stmt);
    }

    pub fn new_array(&mut self, block: BlockId, dst: impl Into<Var>, length: Expr) {
        let stmt = Statement::NewArray { dst: dst.into(), length };
        self.push(block, stmt);
    }

    pub fn array_length(&mut self, block: BlockId, dst: impl Into<Var>, array: impl Into<Var>) -> SiteId {
        let site = self.fresh_site();
        let stmt = Statement::ArrayLength {
            dst: dst.into(),
            array: array.into(),
            site,
        };
        self.push(block, stmt);
        site
    }

    /// `dst = array[index]`. Returns the null-check and bounds-check sites.
    pub fn array_load(
        &mut self,
        block: BlockId,
        dst: impl Into<Var>,
        array: impl Into<Var>,
        index: Expr,
    ) -> (SiteId, SiteId) {
        let null_site = self.fresh_site();
        let bounds_site = self.fresh_site();
        let stmt = Statement::ArrayLoad {
            dst: dst.into(),
            array: array.into(),
            index,
            null_site,
            bounds_site,
        };
        self.push(block, stmt);
        (null_site, bounds_site)
    }

    /// `array[index] = value`. Returns the null-check and bounds-check sites.
    pub fn array_store(&mut self, block: BlockId, array: impl Into<Var>, index: Expr, value: Expr) -> (SiteId, SiteId) {
        let null_site = self.fresh_site();
        let bounds_site = self.fresh_site();
        let stmt = Statement::ArrayStore {
            array: array.into(),
            index,
            value,
            null_site,
            bounds_site,
        };
        self.push(block, stmt);
        (null_site, bounds_site)
    }

    pub fn field_read(
        &mut self,
        block: BlockId,
        dst: impl Into<Var>,
        object: impl Into<Var>,
        field: impl Into<String>,
    ) -> SiteId {
        let site = self.fresh_site();
        let stmt = Statement::FieldRead {
            dst: dst.into(),
            object: object.into(),
            field: field.into(),
            site,
        };
        self.push(block, stmt);
        site
    }

    pub fn field_write(&mut self, block: BlockId, object: impl Into<Var>, field: impl Into<String>, value: Expr) -> SiteId {
        let site = self.fresh_site();
        let stmt = Statement::FieldWrite {
            object: object.into(),
            field: field.into(),
            value,
            site,
        };
        self.push(block, stmt);
        site
    }

    /// Call without a receiver (a static method).
    pub fn call_static(&mut self, block: BlockId, dst: Option<&str>, method: impl Into<String>, args: Vec<Expr>) {
        let stmt = Statement::Call {
            dst: dst.map(Var::from),
            receiver: None,
            method: method.into(),
            args,
            site: None,
        };
        self.push(block, stmt);
    }

    /// Virtual call on `receiver`. Returns the receiver's null-check site.
    pub fn call_virtual(
        &mut self,
        block: BlockId,
        dst: Option<&str>,
        receiver: impl Into<Var>,
        method: impl Into<String>,
        args: Vec<Expr>,
    ) -> SiteId {
        let site = self.fresh_site();
        let stmt = Statement::Call {
            dst: dst.map(Var::from),
            receiver: Some(receiver.into()),
            method: method.into(),
            args,
            site: Some(site),
        };
        self.push(block, stmt);
        site
    }

    /// `throw`; ends the block.
    pub fn throw(&mut self, block: BlockId) -> SiteId {
        let site = self.fresh_site();
        self.push(block, Statement::Throw { site });
        self.set_exit(block, Exit::Halt);
        site
    }

    /// `return`; ends the block.
    pub fn ret(&mut self, block: BlockId, value: Option<Expr>) {
        self.push(block, Statement::Return(value));
        self.set_exit(block, Exit::Halt);
    }

    pub fn goto(&mut self, block: BlockId, target: BlockId) {
        self.set_exit(block, Exit::Goto(target));
    }

    pub fn branch(&mut self, block: BlockId, cond: Cond, then_block: BlockId, else_block: BlockId) {
        self.set_exit(
            block,
            Exit::Branch {
                cond,
                then_block,
                else_block,
            },
        );
    }

    /// Validate and freeze the procedure.
    pub fn build(self) -> Result<Procedure> {
        Procedure::new(self.name, self.params, self.locals, self.blocks)
    }
}

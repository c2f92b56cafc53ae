//! Integer and floating-point division.

use crate::builder::ProcedureBuilder;
use crate::error::Result;
use crate::ir::{Expr, Kind, Procedure};

fn case(method: &str) -> ProcedureBuilder {
    ProcedureBuilder::new(format!("Arithmetics.{}", method))
}

pub fn all() -> Result<Vec<Procedure>> {
    Ok(vec![
        always_throws1()?,
        always_throws2()?,
        always_throws3()?,
        always_throws4()?,
        always_throws5()?,
        it_depends_on_lattice1()?,
        it_depends_on_lattice2()?,
        it_depends_on_lattice3()?,
        it_depends_on_lattice4()?,
        never_throws1()?,
        never_throws2()?,
        never_throws3()?,
        never_throws4()?,
        never_throws5()?,
        speed_vs_precision()?,
    ])
}

/// `return 4 / 0;`
fn always_throws1() -> Result<Procedure> {
    let mut b = case("alwaysThrows1");
    b.local("r", Kind::Int);
    let entry = b.entry();
    b.assign(entry, "r", Expr::int(4).div(Expr::int(0)));
    b.ret(entry, Some(Expr::var("r")));
    b.build()
}

/// `int k = 3; k -= k; return i / k;`
fn always_throws2() -> Result<Procedure> {
    let mut b = case("alwaysThrows2");
    b.param("i", Kind::Int).local("k", Kind::Int).local("r", Kind::Int);
    let entry = b.entry();
    b.assign(entry, "k", Expr::int(3));
    b.assign(entry, "k", Expr::var("k").sub(Expr::var("k")));
    b.assign(entry, "r", Expr::var("i").div(Expr::var("k")));
    b.ret(entry, Some(Expr::var("r")));
    b.build()
}

/// `return i / j;` over floats.
fn always_throws3() -> Result<Procedure> {
    let mut b = case("alwaysThrows3");
    b.param("i", Kind::Float).param("j", Kind::Float).local("r", Kind::Float);
    let entry = b.entry();
    b.assign(entry, "r", Expr::var("i").div(Expr::var("j")));
    b.ret(entry, Some(Expr::var("r")));
    b.build()
}

/// `assert -1 <= j && j <= 1; return i / j;`
fn always_throws4() -> Result<Procedure> {
    let mut b = case("alwaysThrows4");
    b.param("i", Kind::Int).param("j", Kind::Int).local("r", Kind::Int);
    let entry = b.entry();
    b.assert(
        entry,
        Expr::int(-1).le(Expr::var("j")).and(Expr::var("j").le(Expr::int(1))),
    );
    b.assign(entry, "r", Expr::var("i").div(Expr::var("j")));
    b.ret(entry, Some(Expr::var("r")));
    b.build()
}

/// `if (i > 0) j = 12; else i = -i; return j / i;`
fn always_throws5() -> Result<Procedure> {
    let mut b = case("alwaysThrows5");
    b.param("i", Kind::Int).param("j", Kind::Int).local("r", Kind::Int);
    let entry = b.entry();
    let then = b.new_block();
    let otherwise = b.new_block();
    let join = b.new_block();
    b.branch(entry, Expr::var("i").gt(Expr::int(0)), then, otherwise);
    b.assign(then, "j", Expr::int(12));
    b.goto(then, join);
    b.assign(otherwise, "i", Expr::var("i").neg());
    b.goto(otherwise, join);
    b.assign(join, "r", Expr::var("j").div(Expr::var("i")));
    b.ret(join, Some(Expr::var("r")));
    b.build()
}

/// `int i = 3; i--; return 2 / i;`
fn it_depends_on_lattice1() -> Result<Procedure> {
    let mut b = case("itDependsOnLattice1");
    b.local("i", Kind::Int).local("r", Kind::Int);
    let entry = b.entry();
    b.assign(entry, "i", Expr::int(3));
    b.assign(entry, "i", Expr::var("i").sub(Expr::int(1)));
    b.assign(entry, "r", Expr::int(2).div(Expr::var("i")));
    b.ret(entry, Some(Expr::var("r")));
    b.build()
}

/// `int i = -1000; i += 2; return 998 / i;`
fn it_depends_on_lattice2() -> Result<Procedure> {
    let mut b = case("itDependsOnLattice2");
    b.local("i", Kind::Int).local("r", Kind::Int);
    let entry = b.entry();
    b.assign(entry, "i", Expr::int(-1000));
    b.assign(entry, "i", Expr::var("i").add(Expr::int(2)));
    b.assign(entry, "r", Expr::int(998).div(Expr::var("i")));
    b.ret(entry, Some(Expr::var("r")));
    b.build()
}

/// ```text
/// assert i > 1000;
/// assert j > 10;
/// for (int k = 0; k < 10; k++) i -= j;
/// return j / i;
/// ```
fn it_depends_on_lattice3() -> Result<Procedure> {
    let mut b = case("itDependsOnLattice3");
    b.param("i", Kind::Int)
        .param("j", Kind::Int)
        .local("k", Kind::Int)
        .local("r", Kind::Int);
    let entry = b.entry();
    let head = b.new_block();
    let body = b.new_block();
    let exit = b.new_block();
    b.assert(entry, Expr::var("i").gt(Expr::int(1000)));
    b.assert(entry, Expr::var("j").gt(Expr::int(10)));
    b.assign(entry, "k", Expr::int(0));
    b.goto(entry, head);
    b.branch(head, Expr::var("k").lt(Expr::int(10)), body, exit);
    b.assign(body, "i", Expr::var("i").sub(Expr::var("j")));
    b.assign(body, "k", Expr::var("k").add(Expr::int(1)));
    b.goto(body, head);
    b.assign(exit, "r", Expr::var("j").div(Expr::var("i")));
    b.ret(exit, Some(Expr::var("r")));
    b.build()
}

/// `int i = 0; i++; i--; return 998 / i;`
fn it_depends_on_lattice4() -> Result<Procedure> {
    let mut b = case("itDependsOnLattice4");
    b.local("i", Kind::Int).local("r", Kind::Int);
    let entry = b.entry();
    b.assign(entry, "i", Expr::int(0));
    b.assign(entry, "i", Expr::var("i").add(Expr::int(1)));
    b.assign(entry, "i", Expr::var("i").sub(Expr::int(1)));
    b.assign(entry, "r", Expr::int(998).div(Expr::var("i")));
    b.ret(entry, Some(Expr::var("r")));
    b.build()
}

/// `int i = 3; return 0 / i;`
fn never_throws1() -> Result<Procedure> {
    let mut b = case("neverThrows1");
    b.local("i", Kind::Int).local("r", Kind::Int);
    let entry = b.entry();
    b.assign(entry, "i", Expr::int(3));
    b.assign(entry, "r", Expr::int(0).div(Expr::var("i")));
    b.ret(entry, Some(Expr::var("r")));
    b.build()
}

/// `assert i > 0; return 0 / i;`
fn never_throws2() -> Result<Procedure> {
    let mut b = case("neverThrows2");
    b.param("i", Kind::Int).local("r", Kind::Int);
    let entry = b.entry();
    b.assert(entry, Expr::var("i").gt(Expr::int(0)));
    b.assign(entry, "r", Expr::int(0).div(Expr::var("i")));
    b.ret(entry, Some(Expr::var("r")));
    b.build()
}

/// `assert i > 0 && j == 0; j += i; j += i; j += i; return 0 / i;`
fn never_throws3() -> Result<Procedure> {
    let mut b = case("neverThrows3");
    b.param("i", Kind::Int).param("j", Kind::Int).local("r", Kind::Int);
    let entry = b.entry();
    b.assert(
        entry,
        Expr::var("i").gt(Expr::int(0)).and(Expr::var("j").eq(Expr::int(0))),
    );
    for _ in 0..3 {
        b.assign(entry, "j", Expr::var("j").add(Expr::var("i")));
    }
    b.assign(entry, "r", Expr::int(0).div(Expr::var("i")));
    b.ret(entry, Some(Expr::var("r")));
    b.build()
}

/// `assert i > 0 && i < 0; return 0 / i;`
fn never_throws4() -> Result<Procedure> {
    let mut b = case("neverThrows4");
    b.param("i", Kind::Int).local("r", Kind::Int);
    let entry = b.entry();
    b.assert(
        entry,
        Expr::var("i").gt(Expr::int(0)).and(Expr::var("i").lt(Expr::int(0))),
    );
    b.assign(entry, "r", Expr::int(0).div(Expr::var("i")));
    b.ret(entry, Some(Expr::var("r")));
    b.build()
}

/// `if (i >= 0) i++; else i = -i; return j / i;`
fn never_throws5() -> Result<Procedure> {
    let mut b = case("neverThrows5");
    b.param("i", Kind::Int).param("j", Kind::Int).local("r", Kind::Int);
    let entry = b.entry();
    let then = b.new_block();
    let otherwise = b.new_block();
    let join = b.new_block();
    b.branch(entry, Expr::var("i").ge(Expr::int(0)), then, otherwise);
    b.assign(then, "i", Expr::var("i").add(Expr::int(1)));
    b.goto(then, join);
    b.assign(otherwise, "i", Expr::var("i").neg());
    b.goto(otherwise, join);
    b.assign(join, "r", Expr::var("j").div(Expr::var("i")));
    b.ret(join, Some(Expr::var("r")));
    b.build()
}

/// `int i = 100000; while (i > 0) i--; return i / i;`
fn speed_vs_precision() -> Result<Procedure> {
    let mut b = case("speedVsPrecision");
    b.local("i", Kind::Int).local("r", Kind::Int);
    let entry = b.entry();
    let head = b.new_block();
    let body = b.new_block();
    let exit = b.new_block();
    b.assign(entry, "i", Expr::int(100000));
    b.goto(entry, head);
    b.branch(head, Expr::var("i").gt(Expr::int(0)), body, exit);
    b.assign(body, "i", Expr::var("i").sub(Expr::int(1)));
    b.goto(body, head);
    b.assign(exit, "r", Expr::var("i").div(Expr::var("i")));
    b.ret(exit, Some(Expr::var("r")));
    b.build()
}

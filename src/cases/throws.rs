//! Explicit `throw` statements behind branch conditions.

use super::{println, throw_new};
use crate::builder::ProcedureBuilder;
use crate::error::Result;
use crate::ir::{BlockId, Cond, Expr, Kind, Procedure};

const UNSUPPORTED: &str = "UnsupportedOperationException";

fn case(method: &str) -> ProcedureBuilder {
    ProcedureBuilder::new(format!("Throws.{}", method))
}

pub fn all() -> Result<Vec<Procedure>> {
    Ok(vec![
        always_throws1()?,
        always_throws2()?,
        always_throws3()?,
        depends_on_lattice1()?,
        depends_on_lattice2()?,
        depends_on_lattice3()?,
        never_throws1()?,
        never_throws2()?,
        never_throws3()?,
    ])
}

/// `if (i == 0) i = 3; else if (i < 0) i = -i; else i++;`, starting in
/// `entry`. Returns the join block.
fn normalize_sign(b: &mut ProcedureBuilder, entry: BlockId) -> BlockId {
    let zero = b.new_block();
    let nonzero = b.new_block();
    let negative = b.new_block();
    let positive = b.new_block();
    let join = b.new_block();
    b.branch(entry, Expr::var("i").eq(Expr::int(0)), zero, nonzero);
    b.assign(zero, "i", Expr::int(3));
    b.goto(zero, join);
    b.branch(nonzero, Expr::var("i").lt(Expr::int(0)), negative, positive);
    b.assign(negative, "i", Expr::var("i").neg());
    b.goto(negative, join);
    b.assign(positive, "i", Expr::var("i").add(Expr::int(1)));
    b.goto(positive, join);
    join
}

/// `while (i >= 0) { i /= 2; i--; }`, starting in `entry`. Returns the
/// loop exit.
fn halve_below_zero(b: &mut ProcedureBuilder, entry: BlockId) -> BlockId {
    let head = b.new_block();
    let body = b.new_block();
    let exit = b.new_block();
    b.goto(entry, head);
    b.branch(head, Expr::var("i").ge(Expr::int(0)), body, exit);
    b.assign(body, "i", Expr::var("i").div(Expr::int(2)));
    b.assign(body, "i", Expr::var("i").sub(Expr::int(1)));
    b.goto(body, head);
    exit
}

/// `throw new UnsupportedOperationException("Straight forward");`
fn always_throws1() -> Result<Procedure> {
    let mut b = case("alwaysThrows1");
    let entry = b.entry();
    throw_new(&mut b, entry, UNSUPPORTED);
    b.build()
}

/// `assert i > 0; if (i - 1 > 0) println("Ok"); else throw ..;`
fn always_throws2() -> Result<Procedure> {
    let mut b = case("alwaysThrows2");
    b.param("i", Kind::Int).local("t", Kind::Int);
    let entry = b.entry();
    let ok = b.new_block();
    let fail = b.new_block();
    b.assert(entry, Expr::var("i").gt(Expr::int(0)));
    b.assign(entry, "t", Expr::var("i").sub(Expr::int(1)));
    b.branch(entry, Expr::var("t").gt(Expr::int(0)), ok, fail);
    println(&mut b, ok, Expr::str("Ok"));
    b.ret(ok, None);
    throw_new(&mut b, fail, UNSUPPORTED);
    b.build()
}

/// Normalize the sign of `i`, then `if (i > 0) throw ..;`
fn always_throws3() -> Result<Procedure> {
    let mut b = case("alwaysThrows3");
    b.param("i", Kind::Int);
    let entry = b.entry();
    let join = normalize_sign(&mut b, entry);
    let fail = b.new_block();
    let done = b.new_block();
    b.branch(join, Expr::var("i").gt(Expr::int(0)), fail, done);
    throw_new(&mut b, fail, UNSUPPORTED);
    b.ret(done, None);
    b.build()
}

/// `if (i > j) return; if (i > j) throw ..;`
fn depends_on_lattice1() -> Result<Procedure> {
    let mut b = case("dependsOnLattice1");
    b.param("i", Kind::Int).param("j", Kind::Int);
    let entry = b.entry();
    let early = b.new_block();
    let check = b.new_block();
    let fail = b.new_block();
    let done = b.new_block();
    b.branch(entry, Expr::var("i").gt(Expr::var("j")), early, check);
    b.ret(early, None);
    b.branch(check, Expr::var("i").gt(Expr::var("j")), fail, done);
    throw_new(&mut b, fail, UNSUPPORTED);
    b.ret(done, None);
    b.build()
}

/// `int i = 0; i++; i--; if (i != 0) throw ..;`
fn depends_on_lattice2() -> Result<Procedure> {
    let mut b = case("dependsOnLattice2");
    b.local("i", Kind::Int);
    let entry = b.entry();
    let fail = b.new_block();
    let done = b.new_block();
    b.assign(entry, "i", Expr::int(0));
    b.assign(entry, "i", Expr::var("i").add(Expr::int(1)));
    b.assign(entry, "i", Expr::var("i").sub(Expr::int(1)));
    b.branch(entry, Expr::var("i").neq(Expr::int(0)), fail, done);
    throw_new(&mut b, fail, UNSUPPORTED);
    b.ret(done, None);
    b.build()
}

/// ```text
/// while (i >= 0) { i /= 2; i--; }
/// while (j < 0) j /= 2;
/// j *= i;
/// if (j == 0) throw ..;
/// ```
fn depends_on_lattice3() -> Result<Procedure> {
    let mut b = case("dependsOnLattice3");
    b.param("i", Kind::Int).param("j", Kind::Int);
    let entry = b.entry();
    let after_i = halve_below_zero(&mut b, entry);
    let head = b.new_block();
    let body = b.new_block();
    let after_j = b.new_block();
    let fail = b.new_block();
    let done = b.new_block();
    b.goto(after_i, head);
    b.branch(head, Expr::var("j").lt(Expr::int(0)), body, after_j);
    b.assign(body, "j", Expr::var("j").div(Expr::int(2)));
    b.goto(body, head);
    b.assign(after_j, "j", Expr::var("j").mul(Expr::var("i")));
    b.branch(after_j, Expr::var("j").eq(Expr::int(0)), fail, done);
    throw_new(&mut b, fail, UNSUPPORTED);
    b.ret(done, None);
    b.build()
}

/// `if (i != i) throw ..; if (false) throw ..;`
fn never_throws1() -> Result<Procedure> {
    let mut b = case("neverThrows1");
    b.param("i", Kind::Int);
    let entry = b.entry();
    let first = b.new_block();
    let next = b.new_block();
    let second = b.new_block();
    let done = b.new_block();
    b.branch(entry, Expr::var("i").neq(Expr::var("i")), first, next);
    throw_new(&mut b, first, UNSUPPORTED);
    b.branch(next, Cond::False, second, done);
    throw_new(&mut b, second, UNSUPPORTED);
    b.ret(done, None);
    b.build()
}

/// ```text
/// while (i >= 0) { i /= 2; i--; }
/// while (j <= 0) { j /= 2; j++; }
/// if (i < 0 && j > 0) return;
/// throw ..;
/// ```
fn never_throws2() -> Result<Procedure> {
    let mut b = case("neverThrows2");
    b.param("i", Kind::Int).param("j", Kind::Int);
    let entry = b.entry();
    let after_i = halve_below_zero(&mut b, entry);
    let head = b.new_block();
    let body = b.new_block();
    let after_j = b.new_block();
    let done = b.new_block();
    let fail = b.new_block();
    b.goto(after_i, head);
    b.branch(head, Expr::var("j").le(Expr::int(0)), body, after_j);
    b.assign(body, "j", Expr::var("j").div(Expr::int(2)));
    b.assign(body, "j", Expr::var("j").add(Expr::int(1)));
    b.goto(body, head);
    b.branch(
        after_j,
        Expr::var("i").lt(Expr::int(0)).and(Expr::var("j").gt(Expr::int(0))),
        done,
        fail,
    );
    b.ret(done, None);
    throw_new(&mut b, fail, UNSUPPORTED);
    b.build()
}

/// Normalize the sign of `i`, then `if (i <= 0) throw ..;`
fn never_throws3() -> Result<Procedure> {
    let mut b = case("neverThrows3");
    b.param("i", Kind::Int);
    let entry = b.entry();
    let join = normalize_sign(&mut b, entry);
    let fail = b.new_block();
    let done = b.new_block();
    b.branch(join, Expr::var("i").le(Expr::int(0)), fail, done);
    throw_new(&mut b, fail, UNSUPPORTED);
    b.ret(done, None);
    b.build()
}

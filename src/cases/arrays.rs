//! Array allocation, loads, and stores.

use super::println;
use crate::builder::ProcedureBuilder;
use crate::error::Result;
use crate::ir::{Elem, Expr, Kind, Procedure};

const INTS: Kind = Kind::Array(Elem::Int);
const FLOATS: Kind = Kind::Array(Elem::Float);

fn case(method: &str) -> ProcedureBuilder {
    ProcedureBuilder::new(format!("Arrays.{}", method))
}

pub fn all() -> Result<Vec<Procedure>> {
    Ok(vec![
        always_throws1()?,
        always_throws2()?,
        always_throws3()?,
        always_throws4()?,
        always_throws5()?,
        depends_on_lattice1()?,
        depends_on_lattice2()?,
        depends_on_lattice3()?,
        depends_on_lattice4()?,
        depends_on_lattice5()?,
        never_throws1()?,
        never_throws2()?,
        never_throws3()?,
    ])
}

/// `int[] is = new int[2]; is[0] = 12; is[1] = 12; is[2] = 12;`
fn always_throws1() -> Result<Procedure> {
    let mut b = case("alwaysThrows1");
    b.local("is", INTS);
    let entry = b.entry();
    b.new_array(entry, "is", Expr::int(2));
    for index in 0..3 {
        b.array_store(entry, "is", Expr::int(index), Expr::int(12));
    }
    b.ret(entry, None);
    b.build()
}

/// `return is[0];`
fn always_throws2() -> Result<Procedure> {
    let mut b = case("alwaysThrows2");
    b.param("is", INTS).local("r", Kind::Int);
    let entry = b.entry();
    b.array_load(entry, "r", "is", Expr::int(0));
    b.ret(entry, Some(Expr::var("r")));
    b.build()
}

/// ```text
/// int[] spotTheError = new int[10];
/// for (int i = 0; i <= spotTheError.length; i++) spotTheError[i] = i;
/// ```
fn always_throws3() -> Result<Procedure> {
    let mut b = case("alwaysThrows3");
    b.local("a", INTS).local("i", Kind::Int).local("t", Kind::Int);
    let entry = b.entry();
    let head = b.new_block();
    let body = b.new_block();
    let exit = b.new_block();
    b.new_array(entry, "a", Expr::int(10));
    b.assign(entry, "i", Expr::int(0));
    b.goto(entry, head);
    b.array_length(head, "t", "a");
    b.branch(head, Expr::var("i").le(Expr::var("t")), body, exit);
    b.array_store(body, "a", Expr::var("i"), Expr::var("i"));
    b.assign(body, "i", Expr::var("i").add(Expr::int(1)));
    b.goto(body, head);
    b.ret(exit, None);
    b.build()
}

/// `System.out.println(fs[fs.length - 1]);`
fn always_throws4() -> Result<Procedure> {
    let mut b = case("alwaysThrows4");
    b.param("fs", FLOATS)
        .local("t", Kind::Int)
        .local("u", Kind::Int)
        .local("x", Kind::Float);
    let entry = b.entry();
    b.array_length(entry, "t", "fs");
    b.assign(entry, "u", Expr::var("t").sub(Expr::int(1)));
    b.array_load(entry, "x", "fs", Expr::var("u"));
    println(&mut b, entry, Expr::var("x"));
    b.ret(entry, None);
    b.build()
}

/// ```text
/// assert i > 0 && j > 0;
/// assert i < 10 && j < 10;
/// int[] is = new int[1000];
/// System.out.println(is[j - i]);
/// ```
fn always_throws5() -> Result<Procedure> {
    let mut b = case("alwaysThrows5");
    b.param("i", Kind::Int)
        .param("j", Kind::Int)
        .local("is", INTS)
        .local("k", Kind::Int)
        .local("x", Kind::Int);
    let entry = b.entry();
    b.assert(entry, Expr::var("i").gt(Expr::int(0)).and(Expr::var("j").gt(Expr::int(0))));
    b.assert(entry, Expr::var("i").lt(Expr::int(10)).and(Expr::var("j").lt(Expr::int(10))));
    b.new_array(entry, "is", Expr::int(1000));
    b.assign(entry, "k", Expr::var("j").sub(Expr::var("i")));
    b.array_load(entry, "x", "is", Expr::var("k"));
    println(&mut b, entry, Expr::var("x"));
    b.ret(entry, None);
    b.build()
}

/// `assert 0 <= i && i < is.length; return is[i];`
fn depends_on_lattice1() -> Result<Procedure> {
    let mut b = case("dependsOnLattice1");
    b.param("is", INTS).param("i", Kind::Int).local("r", Kind::Int);
    let entry = b.entry();
    b.assert(
        entry,
        Expr::int(0)
            .le(Expr::var("i"))
            .and(Expr::var("i").lt(Expr::length("is"))),
    );
    b.array_load(entry, "r", "is", Expr::var("i"));
    b.ret(entry, Some(Expr::var("r")));
    b.build()
}

/// `assert is.length > 0; int i = 2; i -= 2; return is[i];`
fn depends_on_lattice2() -> Result<Procedure> {
    let mut b = case("dependsOnLattice2");
    b.param("is", INTS).local("i", Kind::Int).local("r", Kind::Int);
    let entry = b.entry();
    b.assert(entry, Expr::length("is").gt(Expr::int(0)));
    b.assign(entry, "i", Expr::int(2));
    b.assign(entry, "i", Expr::var("i").sub(Expr::int(2)));
    b.array_load(entry, "r", "is", Expr::var("i"));
    b.ret(entry, Some(Expr::var("r")));
    b.build()
}

/// `assert fs.length > 0; System.out.println(fs[fs.length - 1]);`
fn depends_on_lattice3() -> Result<Procedure> {
    let mut b = case("dependsOnLattice3");
    b.param("fs", FLOATS)
        .local("t", Kind::Int)
        .local("u", Kind::Int)
        .local("x", Kind::Float);
    let entry = b.entry();
    b.assert(entry, Expr::length("fs").gt(Expr::int(0)));
    b.array_length(entry, "t", "fs");
    b.assign(entry, "u", Expr::var("t").sub(Expr::int(1)));
    b.array_load(entry, "x", "fs", Expr::var("u"));
    println(&mut b, entry, Expr::var("x"));
    b.ret(entry, None);
    b.build()
}

/// `assert is.length > 4; return is[0] + is[1] + is[2] + is[3] + is[4];`
fn depends_on_lattice4() -> Result<Procedure> {
    let mut b = case("dependsOnLattice4");
    b.param("is", INTS).local("r", Kind::Int).local("x", Kind::Int);
    let entry = b.entry();
    b.assert(entry, Expr::length("is").gt(Expr::int(4)));
    b.assign(entry, "r", Expr::int(0));
    for index in 0..5 {
        b.array_load(entry, "x", "is", Expr::int(index));
        b.assign(entry, "r", Expr::var("r").add(Expr::var("x")));
    }
    b.ret(entry, Some(Expr::var("r")));
    b.build()
}

/// ```text
/// assert -10 < i && i < 10;
/// int[] is = new int[10];
/// if (i <= 0) i = -i; else i--;
/// return is[i];
/// ```
fn depends_on_lattice5() -> Result<Procedure> {
    let mut b = case("dependsOnLattice5");
    b.param("i", Kind::Int).local("is", INTS).local("r", Kind::Int);
    let entry = b.entry();
    let then = b.new_block();
    let otherwise = b.new_block();
    let join = b.new_block();
    b.assert(
        entry,
        Expr::int(-10).lt(Expr::var("i")).and(Expr::var("i").lt(Expr::int(10))),
    );
    b.new_array(entry, "is", Expr::int(10));
    b.branch(entry, Expr::var("i").le(Expr::int(0)), then, otherwise);
    b.assign(then, "i", Expr::var("i").neg());
    b.goto(then, join);
    b.assign(otherwise, "i", Expr::var("i").sub(Expr::int(1)));
    b.goto(otherwise, join);
    b.array_load(join, "r", "is", Expr::var("i"));
    b.ret(join, Some(Expr::var("r")));
    b.build()
}

/// `int[] is = new int[2]; return is[0];`
fn never_throws1() -> Result<Procedure> {
    let mut b = case("neverThrows1");
    b.local("is", INTS).local("r", Kind::Int);
    let entry = b.entry();
    b.new_array(entry, "is", Expr::int(2));
    b.array_load(entry, "r", "is", Expr::int(0));
    b.ret(entry, Some(Expr::var("r")));
    b.build()
}

/// `int[] is = new int[]{1, 2}; return is[1];`
fn never_throws2() -> Result<Procedure> {
    let mut b = case("neverThrows2");
    b.local("is", INTS).local("r", Kind::Int);
    let entry = b.entry();
    b.new_array(entry, "is", Expr::int(2));
    b.array_store(entry, "is", Expr::int(0), Expr::int(1));
    b.array_store(entry, "is", Expr::int(1), Expr::int(2));
    b.array_load(entry, "r", "is", Expr::int(1));
    b.ret(entry, Some(Expr::var("r")));
    b.build()
}

/// ```text
/// int[] is = new int[5];
/// int i = 0;
/// for (int j = 0; j < 1000; j++) i = is[i];
/// return i;
/// ```
fn never_throws3() -> Result<Procedure> {
    let mut b = case("neverThrows3");
    b.local("is", INTS).local("i", Kind::Int).local("j", Kind::Int);
    let entry = b.entry();
    let head = b.new_block();
    let body = b.new_block();
    let exit = b.new_block();
    b.new_array(entry, "is", Expr::int(5));
    b.assign(entry, "i", Expr::int(0));
    b.assign(entry, "j", Expr::int(0));
    b.goto(entry, head);
    b.branch(head, Expr::var("j").lt(Expr::int(1000)), body, exit);
    b.array_load(body, "i", "is", Expr::var("i"));
    b.assign(body, "j", Expr::var("j").add(Expr::int(1)));
    b.goto(body, head);
    b.ret(exit, Some(Expr::var("i")));
    b.build()
}

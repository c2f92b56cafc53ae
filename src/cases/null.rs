//! Null dereferences through locals, fields, and virtual calls.
//!
//! Every case allocates objects of class `Null`, which has a single
//! reference field `field`.

use super::println;
use crate::builder::ProcedureBuilder;
use crate::error::Result;
use crate::ir::{Cond, Expr, Kind, Procedure};

const FIELD: &str = "field";

fn case(method: &str) -> ProcedureBuilder {
    ProcedureBuilder::new(format!("Null.{}", method))
}

pub fn all() -> Result<Vec<Procedure>> {
    Ok(vec![
        always_throws1()?,
        always_throws2()?,
        always_throws3()?,
        never_throws1()?,
        never_throws2()?,
        never_throws3()?,
        never_throws4()?,
        never_throws5()?,
        interesting_case()?,
    ])
}

/// `Object obj = null; return obj.toString();`
fn always_throws1() -> Result<Procedure> {
    let mut b = case("alwaysThrows1");
    b.local("obj", Kind::Ref).local("s", Kind::Ref);
    let entry = b.entry();
    b.assign(entry, "obj", Expr::Null);
    b.call_virtual(entry, Some("s"), "obj", "toString", vec![]);
    b.ret(entry, Some(Expr::var("s")));
    b.build()
}

/// `Null nil = new Null(); if (nil.field.equals(nil)) .. else ..`
fn always_throws2() -> Result<Procedure> {
    let mut b = case("alwaysThrows2");
    b.param("o", Kind::Ref)
        .local("nil", Kind::Ref)
        .local("t", Kind::Ref)
        .local("c", Kind::Int);
    let entry = b.entry();
    let equal = b.new_block();
    let differ = b.new_block();
    b.new_object(entry, "nil", "Null");
    b.field_read(entry, "t", "nil", FIELD);
    b.call_virtual(entry, Some("c"), "t", "equals", vec![Expr::var("nil")]);
    b.branch(entry, Expr::var("c").neq(Expr::int(0)), equal, differ);
    println(&mut b, equal, Expr::str("Equal"));
    b.ret(equal, None);
    println(&mut b, differ, Expr::str("Not Equal"));
    b.ret(differ, None);
    b.build()
}

/// ```text
/// Null nil = new Null();
/// nil.field = new Null();
/// if (nil.hashCode() == nil.field.hashCode()) println("Equal");
/// else println(nil.field.field.toString());
/// ```
fn always_throws3() -> Result<Procedure> {
    let mut b = case("alwaysThrows3");
    b.param("o", Kind::Ref)
        .local("nil", Kind::Ref)
        .local("f", Kind::Ref)
        .local("t", Kind::Ref)
        .local("u", Kind::Ref)
        .local("s", Kind::Ref)
        .local("h", Kind::Int)
        .local("k", Kind::Int);
    let entry = b.entry();
    let equal = b.new_block();
    let differ = b.new_block();
    b.new_object(entry, "nil", "Null");
    b.new_object(entry, "f", "Null");
    b.field_write(entry, "nil", FIELD, Expr::var("f"));
    b.call_virtual(entry, Some("h"), "nil", "hashCode", vec![]);
    b.field_read(entry, "t", "nil", FIELD);
    b.call_virtual(entry, Some("k"), "t", "hashCode", vec![]);
    b.branch(entry, Expr::var("h").eq(Expr::var("k")), equal, differ);
    println(&mut b, equal, Expr::str("Equal"));
    b.ret(equal, None);
    b.field_read(differ, "t", "nil", FIELD);
    b.field_read(differ, "u", "t", FIELD);
    b.call_virtual(differ, Some("s"), "u", "toString", vec![]);
    println(&mut b, differ, Expr::var("s"));
    b.ret(differ, None);
    b.build()
}

/// `String obj = null; System.out.println(obj); return obj;`
fn never_throws1() -> Result<Procedure> {
    let mut b = case("neverThrows1");
    b.local("obj", Kind::Ref);
    let entry = b.entry();
    b.assign(entry, "obj", Expr::Null);
    println(&mut b, entry, Expr::var("obj"));
    b.ret(entry, Some(Expr::var("obj")));
    b.build()
}

/// `Null nil = new Null(); if (nil.equals(nil.field)) .. else ..`
fn never_throws2() -> Result<Procedure> {
    let mut b = case("neverThrows2");
    b.param("o", Kind::Ref)
        .local("nil", Kind::Ref)
        .local("t", Kind::Ref)
        .local("c", Kind::Int);
    let entry = b.entry();
    let equal = b.new_block();
    let differ = b.new_block();
    b.new_object(entry, "nil", "Null");
    b.field_read(entry, "t", "nil", FIELD);
    b.call_virtual(entry, Some("c"), "nil", "equals", vec![Expr::var("t")]);
    b.branch(entry, Expr::var("c").neq(Expr::int(0)), equal, differ);
    println(&mut b, equal, Expr::str("Equal"));
    b.ret(equal, None);
    println(&mut b, differ, Expr::str("Not Equal"));
    b.ret(differ, None);
    b.build()
}

/// `assert i != null && j != null; if (i > j) return i; return j;` over
/// boxed integers.
fn never_throws3() -> Result<Procedure> {
    let mut b = case("neverThrows3");
    b.param("i", Kind::Ref)
        .param("j", Kind::Ref)
        .local("x", Kind::Int)
        .local("y", Kind::Int);
    let entry = b.entry();
    let first = b.new_block();
    let second = b.new_block();
    b.assert(entry, Cond::non_null("i").and(Cond::non_null("j")));
    b.call_virtual(entry, Some("x"), "i", "intValue", vec![]);
    b.call_virtual(entry, Some("y"), "j", "intValue", vec![]);
    b.branch(entry, Expr::var("x").gt(Expr::var("y")), first, second);
    b.call_virtual(first, Some("x"), "i", "intValue", vec![]);
    b.ret(first, Some(Expr::var("x")));
    b.call_virtual(second, Some("y"), "j", "intValue", vec![]);
    b.ret(second, Some(Expr::var("y")));
    b.build()
}

/// ```text
/// assert n == null;
/// n = new Null();
/// assert n != null;
/// n.field = n;
/// while (n != n.field) n = null;
/// return n.equals(n.field);
/// ```
fn never_throws4() -> Result<Procedure> {
    let mut b = case("neverThrows4");
    b.param("n", Kind::Ref)
        .local("t", Kind::Ref)
        .local("c", Kind::Int);
    let entry = b.entry();
    let head = b.new_block();
    let body = b.new_block();
    let exit = b.new_block();
    b.assert(entry, Cond::is_null("n"));
    b.new_object(entry, "n", "Null");
    b.assert(entry, Cond::non_null("n"));
    b.field_write(entry, "n", FIELD, Expr::var("n"));
    b.goto(entry, head);
    b.field_read(head, "t", "n", FIELD);
    b.branch(head, Cond::NotSame("n".into(), "t".into()), body, exit);
    b.assign(body, "n", Expr::Null);
    b.goto(body, head);
    b.field_read(exit, "t", "n", FIELD);
    b.call_virtual(exit, Some("c"), "n", "equals", vec![Expr::var("t")]);
    b.ret(exit, Some(Expr::var("c")));
    b.build()
}

/// `assert s != null; return s.concat(notYourProblem);`
fn never_throws5() -> Result<Procedure> {
    let mut b = case("neverThrows5");
    b.param("s", Kind::Ref)
        .param("notYourProblem", Kind::Ref)
        .local("r", Kind::Ref);
    let entry = b.entry();
    b.assert(entry, Cond::non_null("s"));
    b.call_virtual(entry, Some("r"), "s", "concat", vec![Expr::var("notYourProblem")]);
    b.ret(entry, Some(Expr::var("r")));
    b.build()
}

/// ```text
/// Null nil = new Null();
/// nil.field = new Null();
/// nil.field.field = new Null();
/// while (!nil.field.equals(nil)) nil = nil.field;
/// return nil;
/// ```
fn interesting_case() -> Result<Procedure> {
    let mut b = case("interestingCase");
    b.param("o", Kind::Ref)
        .local("nil", Kind::Ref)
        .local("f", Kind::Ref)
        .local("g", Kind::Ref)
        .local("t", Kind::Ref)
        .local("c", Kind::Int);
    let entry = b.entry();
    let head = b.new_block();
    let body = b.new_block();
    let exit = b.new_block();
    b.new_object(entry, "nil", "Null");
    b.new_object(entry, "f", "Null");
    b.field_write(entry, "nil", FIELD, Expr::var("f"));
    b.field_read(entry, "t", "nil", FIELD);
    b.new_object(entry, "g", "Null");
    b.field_write(entry, "t", FIELD, Expr::var("g"));
    b.goto(entry, head);
    b.field_read(head, "t", "nil", FIELD);
    b.call_virtual(head, Some("c"), "t", "equals", vec![Expr::var("nil")]);
    b.branch(head, Expr::var("c").eq(Expr::int(0)), body, exit);
    b.field_read(body, "nil", "nil", FIELD);
    b.goto(body, head);
    b.ret(exit, Some(Expr::var("nil")));
    b.build()
}

//! Arrays of references and their amalgamated elements.

use super::println;
use crate::builder::ProcedureBuilder;
use crate::error::Result;
use crate::ir::{Elem, Expr, Kind, Procedure};

const REFS: Kind = Kind::Array(Elem::Ref);

fn case(method: &str) -> ProcedureBuilder {
    ProcedureBuilder::new(format!("NullArrays.{}", method))
}

pub fn all() -> Result<Vec<Procedure>> {
    Ok(vec![
        always_throws1()?,
        always_throws2()?,
        depends_on_amalgamation("dependsOnAmalgamation1", 2)?,
        depends_on_amalgamation("dependsOnAmalgamation2", 10000)?,
    ])
}

/// `String[] ss = new String[2]; System.out.println(ss[1].toString());`
fn always_throws1() -> Result<Procedure> {
    let mut b = case("alwaysThrows1");
    b.local("ss", REFS).local("x", Kind::Ref).local("s", Kind::Ref);
    let entry = b.entry();
    b.new_array(entry, "ss", Expr::int(2));
    b.array_load(entry, "x", "ss", Expr::int(1));
    b.call_virtual(entry, Some("s"), "x", "toString", vec![]);
    println(&mut b, entry, Expr::var("s"));
    b.ret(entry, None);
    b.build()
}

/// `assert os.length > 0; return os[0].toString();`
fn always_throws2() -> Result<Procedure> {
    let mut b = case("alwaysThrows2");
    b.param("os", REFS).local("x", Kind::Ref).local("s", Kind::Ref);
    let entry = b.entry();
    b.assert(entry, Expr::length("os").gt(Expr::int(0)));
    b.array_load(entry, "x", "os", Expr::int(0));
    b.call_virtual(entry, Some("s"), "x", "toString", vec![]);
    b.ret(entry, Some(Expr::var("s")));
    b.build()
}

/// ```text
/// String[] ss = new String[length];
/// ss[0] = "1";
/// ss[1] = "2";
/// System.out.println(ss[0].equals(ss[1]));
/// ```
fn depends_on_amalgamation(method: &str, length: i64) -> Result<Procedure> {
    let mut b = case(method);
    b.local("ss", REFS)
        .local("x", Kind::Ref)
        .local("y", Kind::Ref)
        .local("c", Kind::Int);
    let entry = b.entry();
    b.new_array(entry, "ss", Expr::int(length));
    b.array_store(entry, "ss", Expr::int(0), Expr::str("1"));
    b.array_store(entry, "ss", Expr::int(1), Expr::str("2"));
    b.array_load(entry, "x", "ss", Expr::int(0));
    b.array_load(entry, "y", "ss", Expr::int(1));
    b.call_virtual(entry, Some("c"), "x", "equals", vec![Expr::var("y")]);
    println(&mut b, entry, Expr::var("c"));
    b.ret(entry, None);
    b.build()
}

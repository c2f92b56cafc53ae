//! The fixture corpus, lowered to IR the way a bytecode front end would.
//!
//! Sub-expressions get temporaries, `System.out.println` is a static call,
//! and unboxing as well as `toString`/`equals`/`hashCode`/`concat` are
//! virtual calls on their receiver. `throw new E(..)` allocates the exception
//! and throws it; the constructor call is elided.

use crate::builder::ProcedureBuilder;
use crate::error::Result;
use crate::ir::{BlockId, Expr, Kind, Procedure};

mod arithmetics;
mod arrays;
mod null;
mod null_arrays;
mod throws;

/// Names of the fixture classes.
pub const CLASSES: [&str; 5] = ["Arithmetics", "Arrays", "Null", "NullArrays", "Throws"];

/// Every case, named `Class.method`.
pub fn all() -> Result<Vec<Procedure>> {
    let mut procedures = arithmetics::all()?;
    procedures.extend(arrays::all()?);
    procedures.extend(null::all()?);
    procedures.extend(null_arrays::all()?);
    procedures.extend(throws::all()?);
    Ok(procedures)
}

/// Cases of a single fixture class.
pub fn of_class(class: &str) -> Result<Vec<Procedure>> {
    let prefix = format!("{}.", class);
    Ok(all()?.into_iter().filter(|p| p.name().starts_with(&prefix)).collect())
}

fn println(b: &mut ProcedureBuilder, block: BlockId, arg: Expr) {
    b.call_static(block, None, "System.out.println", vec![arg]);
}

/// `throw new <class>(..)`
fn throw_new(b: &mut ProcedureBuilder, block: BlockId, exception: &str) {
    if b.kind_of("$e").is_none() {
        b.local("$e", Kind::Ref);
    }
    b.new_object(block, "$e", exception);
    b.throw(block);
}

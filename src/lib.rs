//! # exceptional: which runtime exceptions can a procedure raise?
//!
//! **`exceptional`** decides, for every operation of a procedure that may raise
//! a runtime exception, whether it **never**, **may**, or **always** fails:
//!
//! - integer division and remainder by zero,
//! - array accesses out of bounds,
//! - dereferences of `null` (field accesses, array accesses, virtual calls),
//! - explicit `throw` statements.
//!
//! The analysis is an abstract interpretation over a product domain: integer
//! intervals, a nullness lattice, array lengths, and a one-level view of the
//! heap. Loops are handled by widening at loop heads followed by a bounded
//! number of narrowing rounds.
//!
//! ## Basic Usage
//!
//! ```rust
//! use exceptional::analysis::analyze;
//! use exceptional::builder::ProcedureBuilder;
//! use exceptional::config::AnalysisConfig;
//! use exceptional::ir::{Expr, Kind};
//! use exceptional::verdict::Verdict;
//!
//! // int f(int i) { assert i > 0; return 10 / i; }
//! let mut b = ProcedureBuilder::new("f");
//! b.param("i", Kind::Int).local("r", Kind::Int);
//! let entry = b.entry();
//! b.assert(entry, Expr::var("i").gt(Expr::int(0)));
//! b.assign(entry, "r", Expr::int(10).div(Expr::var("i")));
//! b.ret(entry, Some(Expr::var("r")));
//! let procedure = b.build().unwrap();
//!
//! let report = analyze(&procedure, &AnalysisConfig::default()).unwrap();
//! assert_eq!(report.verdict, Verdict::Never);
//! ```
//!
//! ## Core Components
//!
//! - **[`ir`]** and **[`builder`]**: the control-flow graph the analysis consumes.
//! - **[`interval`]**, **[`nullness`]**, **[`value`]**, **[`state`]**: the abstract domains.
//! - **[`transfer`]** and **[`fixpoint`]**: statement semantics and the solver.
//! - **[`oracle`]** and **[`analysis`]**: per-site verdicts and the public entry points.
//! - **[`harness`]** and **[`cases`]**: a labelled corpus and its grading.

pub mod analysis;
pub mod builder;
pub mod cases;
pub mod config;
pub mod domain;
pub mod error;
pub mod fixpoint;
pub mod harness;
pub mod interval;
pub mod ir;
pub mod nullness;
pub mod oracle;
pub mod state;
pub mod transfer;
pub mod value;
pub mod verdict;

pub use analysis::{analyze, analyze_all};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, Result};
pub use oracle::ProcedureReport;
pub use verdict::Verdict;

//! Analysis driver: single procedures and parallel batches.

use log::{error, info, warn};
use rayon::prelude::*;

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::fixpoint::FixpointEngine;
use crate::ir::Procedure;
use crate::oracle::{Oracle, ProcedureReport};
use crate::transfer::ExceptionTransfer;

/// Analyse one procedure.
///
/// A fixpoint that does not converge within the iteration cap yields a
/// degraded report rather than an error; only malformed IR is an error.
pub fn analyze(procedure: &Procedure, config: &AnalysisConfig) -> Result<ProcedureReport> {
    procedure.validate()?;

    let mut transfer = ExceptionTransfer::new(procedure);
    if !config.track_array_length {
        transfer = transfer.without_array_lengths();
    }
    let engine = FixpointEngine::with_config(transfer, config, procedure);

    match engine.solve(procedure) {
        Ok(fixpoint) => {
            let report = Oracle::classify(procedure, &fixpoint, &engine.transfer);
            info!("{}: {}", procedure.name(), report.verdict);
            Ok(report)
        }
        Err(AnalysisError::DivergentWidening { iterations, .. }) => {
            warn!("{}: widening diverged, reporting every site as may-fail", procedure.name());
            Ok(ProcedureReport::degraded(procedure, iterations))
        }
        Err(e) => Err(e),
    }
}

/// Analyse independent procedures in parallel. Results are in input order;
/// a malformed procedure yields an `Err` in its slot without affecting the
/// others.
pub fn analyze_all(procedures: &[Procedure], config: &AnalysisConfig) -> Vec<Result<ProcedureReport>> {
    procedures
        .par_iter()
        .map(|procedure| {
            analyze(procedure, config).map_err(|e| {
                error!("Skipping {}: {}", procedure.name(), e);
                e
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::builder::ProcedureBuilder;
    use crate::ir::{BasicBlock, BlockId, Exit, Expr, Kind};
    use crate::oracle::Diagnostic;
    use crate::verdict::Verdict;

    fn divide_by_param(name: &str) -> Procedure {
        let mut b = ProcedureBuilder::new(name);
        b.param("i", Kind::Int).local("x", Kind::Int);
        let entry = b.entry();
        b.assign(entry, "x", Expr::int(1).div(Expr::var("i")));
        b.ret(entry, None);
        b.build().unwrap()
    }

    fn count_down() -> Procedure {
        // i = 100000; while (i > 0) i--; x = i / i
        let mut b = ProcedureBuilder::new("countDown");
        b.local("i", Kind::Int).local("x", Kind::Int);
        let entry = b.entry();
        let head = b.new_block();
        let body = b.new_block();
        let exit = b.new_block();
        b.assign(entry, "i", Expr::int(100000));
        b.goto(entry, head);
        b.branch(head, Expr::var("i").gt(Expr::int(0)), body, exit);
        b.assign(body, "i", Expr::var("i").sub(Expr::int(1)));
        b.goto(body, head);
        b.assign(exit, "x", Expr::var("i").div(Expr::var("i")));
        b.ret(exit, Some(Expr::var("x")));
        b.build().unwrap()
    }

    #[test]
    fn test_narrowing_recovers_loop_exit() {
        let proc = count_down();
        let report = analyze(&proc, &AnalysisConfig::default()).unwrap();
        assert_eq!(report.verdict, Verdict::Always);

        let coarse = AnalysisConfig {
            narrowing_iterations: 0,
            ..Default::default()
        };
        assert_eq!(analyze(&proc, &coarse).unwrap().verdict, Verdict::May);
    }

    #[test]
    fn test_divergence_degrades() {
        let proc = count_down();
        let config = AnalysisConfig {
            max_iterations: Some(1),
            ..Default::default()
        };
        let report = analyze(&proc, &config).unwrap();
        assert_eq!(report.verdict, Verdict::May);
        assert!(matches!(report.diagnostics[..], [Diagnostic::DivergentWidening { .. }]));
    }

    #[test]
    fn test_batch_keeps_order_and_skips_malformed() {
        let malformed = Procedure::new_unchecked(
            "broken",
            vec![],
            vec![],
            vec![BasicBlock {
                id: BlockId(0),
                statements: vec![],
                exit: Exit::Goto(BlockId(7)),
            }],
        );

        let procedures = vec![divide_by_param("a"), malformed, divide_by_param("c")];
        let results = analyze_all(&procedures, &AnalysisConfig::default());
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().procedure, "a");
        assert!(matches!(&results[1], Err(AnalysisError::MalformedIr { procedure, .. }) if procedure == "broken"));
        assert_eq!(results[2].as_ref().unwrap().procedure, "c");
    }
}

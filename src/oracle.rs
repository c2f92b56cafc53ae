//! Classification of fault sites from a fixpoint.

use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use crate::domain::Lattice;
use crate::fixpoint::Fixpoint;
use crate::ir::{FaultKind, Location, Procedure, SiteId};
use crate::transfer::TransferFunction;
use crate::verdict::Verdict;

/// Verdict of a single fault site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteReport {
    pub site: SiteId,
    pub kind: FaultKind,
    pub verdict: Verdict,
    pub location: Location,
    /// The guarding statement, rendered as source-like text.
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Diagnostic {
    /// The iteration cap was hit; every site is reported `May`.
    DivergentWidening { iterations: usize },
}

/// Verdicts of every fault site of a procedure, and their aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcedureReport {
    pub procedure: String,
    pub verdict: Verdict,
    pub sites: Vec<SiteReport>,
    pub diagnostics: Vec<Diagnostic>,
    pub iterations: usize,
}

impl ProcedureReport {
    /// Sound fallback when no fixpoint is available: every site may fail.
    pub fn degraded(procedure: &Procedure, iterations: usize) -> Self {
        let sites: Vec<SiteReport> = procedure
            .sites()
            .iter()
            .map(|site| site_report(procedure, site.id, site.kind, site.location, Verdict::May))
            .collect();
        Self {
            procedure: procedure.name().to_string(),
            verdict: Oracle::aggregate(&sites, true),
            sites,
            diagnostics: vec![Diagnostic::DivergentWidening { iterations }],
            iterations,
        }
    }

    pub fn site(&self, id: SiteId) -> Option<&SiteReport> {
        self.sites.iter().find(|s| s.site == id)
    }

    /// Number of sites with the given verdict.
    pub fn count(&self, verdict: Verdict) -> usize {
        self.sites.iter().filter(|s| s.verdict == verdict).count()
    }

    pub fn is_degraded(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

fn site_report(procedure: &Procedure, site: SiteId, kind: FaultKind, location: Location, verdict: Verdict) -> SiteReport {
    SiteReport {
        site,
        kind,
        verdict,
        location,
        description: procedure.statement_at(location).to_string(),
    }
}

pub struct Oracle;

impl Oracle {
    /// Replay every block once from its final in-state and collect the
    /// verdict of each site. Sites of unreachable blocks are `Never`.
    pub fn classify<T: TransferFunction>(procedure: &Procedure, fixpoint: &Fixpoint, transfer: &T) -> ProcedureReport {
        let mut verdicts: BTreeMap<SiteId, Verdict> = BTreeMap::new();
        for block in procedure.blocks() {
            let step = transfer.run_block(fixpoint.state_at(block.id), block);
            for fault in step.faults {
                let verdict = verdicts.entry(fault.site).or_insert(Verdict::Never);
                *verdict = (*verdict).max(fault.verdict);
            }
        }

        let sites: Vec<SiteReport> = procedure
            .sites()
            .iter()
            .map(|site| {
                let verdict = verdicts.get(&site.id).copied().unwrap_or(Verdict::Never);
                debug!("{} {} ({}) at {}: {}", procedure.name(), site.id, site.kind, site.location, verdict);
                site_report(procedure, site.id, site.kind, site.location, verdict)
            })
            .collect();

        let entry_reachable = !fixpoint.state_at(procedure.entry()).is_bottom();
        ProcedureReport {
            procedure: procedure.name().to_string(),
            verdict: Self::aggregate(&sites, entry_reachable),
            sites,
            diagnostics: Vec::new(),
            iterations: fixpoint.iterations,
        }
    }

    /// `Always` if some site always fails, `Never` if no site can fail,
    /// `May` otherwise.
    pub fn aggregate(sites: &[SiteReport], entry_reachable: bool) -> Verdict {
        if !entry_reachable {
            return Verdict::Never;
        }
        if sites.iter().any(|s| s.verdict == Verdict::Always) {
            Verdict::Always
        } else if sites.iter().all(|s| s.verdict == Verdict::Never) {
            Verdict::Never
        } else {
            Verdict::May
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::builder::ProcedureBuilder;
    use crate::fixpoint::FixpointEngine;
    use crate::ir::{Expr, Kind};
    use crate::transfer::ExceptionTransfer;

    fn report(procedure: &Procedure) -> ProcedureReport {
        let engine = FixpointEngine::new(ExceptionTransfer::new(procedure));
        let fix = engine.solve(procedure).unwrap();
        Oracle::classify(procedure, &fix, &engine.transfer)
    }

    #[test]
    fn test_unreached_site_is_never() {
        // if (i > 0 && i < 0) throw
        let mut b = ProcedureBuilder::new("dead");
        b.param("i", Kind::Int);
        let entry = b.entry();
        let then = b.new_block();
        let done = b.new_block();
        let cond = Expr::var("i").gt(Expr::int(0)).and(Expr::var("i").lt(Expr::int(0)));
        b.branch(entry, cond, then, done);
        let site = b.throw(then);
        b.ret(done, None);
        let proc = b.build().unwrap();

        let report = report(&proc);
        assert_eq!(report.site(site).unwrap().verdict, Verdict::Never);
        assert_eq!(report.verdict, Verdict::Never);
    }

    #[test]
    fn test_aggregate_prefers_always() {
        // x = 10 / i; throw
        let mut b = ProcedureBuilder::new("mixed");
        b.param("i", Kind::Int).local("x", Kind::Int);
        let entry = b.entry();
        let div = b.assign(entry, "x", Expr::int(10).div(Expr::var("i"))).unwrap();
        let throw = b.throw(entry);
        let proc = b.build().unwrap();

        let report = report(&proc);
        assert_eq!(report.site(div).unwrap().verdict, Verdict::May);
        assert_eq!(report.site(throw).unwrap().verdict, Verdict::Always);
        assert_eq!(report.verdict, Verdict::Always);
        assert_eq!(report.site(div).unwrap().description, "x = 10 / i");
    }

    #[test]
    fn test_no_sites_is_never() {
        let mut b = ProcedureBuilder::new("empty");
        let entry = b.entry();
        b.ret(entry, None);
        let proc = b.build().unwrap();
        assert_eq!(report(&proc).verdict, Verdict::Never);
    }

    #[test]
    fn test_degraded_report() {
        let mut b = ProcedureBuilder::new("f");
        b.param("i", Kind::Int).local("x", Kind::Int);
        let entry = b.entry();
        b.assign(entry, "x", Expr::int(1).div(Expr::var("i")));
        b.ret(entry, None);
        let proc = b.build().unwrap();

        let report = ProcedureReport::degraded(&proc, 42);
        assert_eq!(report.verdict, Verdict::May);
        assert_eq!(report.count(Verdict::May), 1);
        assert!(report.is_degraded());
        assert_eq!(report.diagnostics, vec![Diagnostic::DivergentWidening { iterations: 42 }]);
    }
}

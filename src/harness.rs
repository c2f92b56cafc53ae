//! Grading analysis verdicts against the labels carried by case names.
//!
//! Case names follow the convention `Class.labelN`, e.g.
//! `Arithmetics.alwaysThrows1` or `Null.neverThrows3`. Labels that name
//! what the outcome *depends on* carry no expected verdict and are graded
//! [`Grade::Undetermined`].

use std::fmt;

use serde::Serialize;

use crate::analysis::analyze_all;
use crate::config::AnalysisConfig;
use crate::ir::Procedure;
use crate::verdict::Verdict;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Expectation {
    Throws,
    NeverThrows,
    DependsOnLattice,
    DependsOnAmalgamation,
    SpeedVsPrecision,
    Unlabeled,
}

impl Expectation {
    pub fn from_case_name(name: &str) -> Self {
        let method = name.rsplit('.').next().unwrap_or(name);
        let label = method.trim_end_matches(|c: char| c.is_ascii_digit());
        match label {
            "alwaysThrows" => Expectation::Throws,
            "neverThrows" => Expectation::NeverThrows,
            "dependsOnLattice" | "itDependsOnLattice" => Expectation::DependsOnLattice,
            "dependsOnAmalgamation" => Expectation::DependsOnAmalgamation,
            "speedVsPrecision" => Expectation::SpeedVsPrecision,
            _ => Expectation::Unlabeled,
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Expectation::Throws => "throws",
            Expectation::NeverThrows => "never throws",
            Expectation::DependsOnLattice => "depends on lattice",
            Expectation::DependsOnAmalgamation => "depends on amalgamation",
            Expectation::SpeedVsPrecision => "speed vs precision",
            Expectation::Unlabeled => "unlabeled",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Grade {
    /// The verdict is the most precise one consistent with the label.
    Exact,
    /// The verdict is sound but less precise than the label.
    Imprecise,
    /// The verdict is the opposite of the label.
    Contradicted,
    /// The label carries no expected verdict.
    Undetermined,
}

impl Grade {
    pub fn of(expectation: Expectation, verdict: Verdict) -> Self {
        match (expectation, verdict) {
            (Expectation::Throws, Verdict::Always) | (Expectation::NeverThrows, Verdict::Never) => Grade::Exact,
            (Expectation::Throws | Expectation::NeverThrows, Verdict::May) => Grade::Imprecise,
            (Expectation::Throws, Verdict::Never) | (Expectation::NeverThrows, Verdict::Always) => Grade::Contradicted,
            _ => Grade::Undetermined,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grade::Exact => write!(f, "exact"),
            Grade::Imprecise => write!(f, "imprecise"),
            Grade::Contradicted => write!(f, "contradicted"),
            Grade::Undetermined => write!(f, "undetermined"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    pub name: String,
    pub expectation: Expectation,
    /// `None` when the analysis rejected the procedure.
    pub verdict: Option<Verdict>,
    pub grade: Grade,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub cases: Vec<CaseResult>,
    pub exact: usize,
    pub imprecise: usize,
    pub contradicted: usize,
    pub undetermined: usize,
    pub errors: usize,
}

impl Summary {
    fn push(&mut self, case: CaseResult) {
        if case.error.is_some() {
            self.errors += 1;
        }
        match case.grade {
            Grade::Exact => self.exact += 1,
            Grade::Imprecise => self.imprecise += 1,
            Grade::Contradicted => self.contradicted += 1,
            Grade::Undetermined => self.undetermined += 1,
        }
        self.cases.push(case);
    }

    pub fn case(&self, name: &str) -> Option<&CaseResult> {
        self.cases.iter().find(|c| c.name == name)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.cases.iter().map(|c| c.name.len()).max().unwrap_or(4).max(4);
        writeln!(f, "{:<width$}  {:<24}  {:<7}  grade", "case", "expected", "verdict", width = width)?;
        for case in &self.cases {
            let verdict = case.verdict.map_or_else(|| "error".to_string(), |v| v.to_string());
            writeln!(
                f,
                "{:<width$}  {:<24}  {:<7}  {}",
                case.name,
                case.expectation.to_string(),
                verdict,
                case.grade,
                width = width
            )?;
        }
        write!(
            f,
            "exact: {}, imprecise: {}, contradicted: {}, undetermined: {}, errors: {}",
            self.exact, self.imprecise, self.contradicted, self.undetermined, self.errors
        )
    }
}

/// Analyse a batch of cases and grade each verdict against its label.
pub fn run_cases(procedures: &[Procedure], config: &AnalysisConfig) -> Summary {
    let mut summary = Summary::default();
    for (procedure, result) in procedures.iter().zip(analyze_all(procedures, config)) {
        let expectation = Expectation::from_case_name(procedure.name());
        let case = match result {
            Ok(report) => CaseResult {
                name: procedure.name().to_string(),
                expectation,
                verdict: Some(report.verdict),
                grade: Grade::of(expectation, report.verdict),
                error: None,
            },
            Err(e) => CaseResult {
                name: procedure.name().to_string(),
                expectation,
                verdict: None,
                grade: Grade::Undetermined,
                error: Some(e.to_string()),
            },
        };
        summary.push(case);
    }
    summary
}

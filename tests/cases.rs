//! Verdicts of the labelled corpus under the default configuration.

use test_log::test;

use exceptional::analysis::analyze;
use exceptional::cases;
use exceptional::config::AnalysisConfig;
use exceptional::harness::{run_cases, Grade};
use exceptional::ir::FaultKind;
use exceptional::verdict::Verdict::{self, Always, May, Never};

const EXPECTED: [(&str, Verdict); 50] = [
    ("Arithmetics.alwaysThrows1", Always),
    ("Arithmetics.alwaysThrows2", Always),
    ("Arithmetics.alwaysThrows3", Never),
    ("Arithmetics.alwaysThrows4", May),
    ("Arithmetics.alwaysThrows5", May),
    ("Arithmetics.itDependsOnLattice1", Never),
    ("Arithmetics.itDependsOnLattice2", Never),
    ("Arithmetics.itDependsOnLattice3", May),
    ("Arithmetics.itDependsOnLattice4", Always),
    ("Arithmetics.neverThrows1", Never),
    ("Arithmetics.neverThrows2", Never),
    ("Arithmetics.neverThrows3", Never),
    ("Arithmetics.neverThrows4", Never),
    ("Arithmetics.neverThrows5", Never),
    ("Arithmetics.speedVsPrecision", Always),
    ("Arrays.alwaysThrows1", Always),
    ("Arrays.alwaysThrows2", May),
    ("Arrays.alwaysThrows3", May),
    ("Arrays.alwaysThrows4", May),
    ("Arrays.alwaysThrows5", May),
    ("Arrays.dependsOnLattice1", May),
    ("Arrays.dependsOnLattice2", Never),
    ("Arrays.dependsOnLattice3", May),
    ("Arrays.dependsOnLattice4", Never),
    ("Arrays.dependsOnLattice5", Never),
    ("Arrays.neverThrows1", Never),
    ("Arrays.neverThrows2", Never),
    ("Arrays.neverThrows3", Never),
    ("Null.alwaysThrows1", Always),
    ("Null.alwaysThrows2", Always),
    ("Null.alwaysThrows3", May),
    ("Null.neverThrows1", Never),
    ("Null.neverThrows2", Never),
    ("Null.neverThrows3", Never),
    ("Null.neverThrows4", Never),
    ("Null.neverThrows5", Never),
    ("Null.interestingCase", May),
    ("NullArrays.alwaysThrows1", Always),
    ("NullArrays.alwaysThrows2", May),
    ("NullArrays.dependsOnAmalgamation1", May),
    ("NullArrays.dependsOnAmalgamation2", May),
    ("Throws.alwaysThrows1", Always),
    ("Throws.alwaysThrows2", Always),
    ("Throws.alwaysThrows3", Always),
    ("Throws.dependsOnLattice1", Always),
    ("Throws.dependsOnLattice2", Never),
    ("Throws.dependsOnLattice3", Always),
    ("Throws.neverThrows1", Never),
    ("Throws.neverThrows2", Never),
    ("Throws.neverThrows3", Never),
];

#[test]
fn test_every_case_verdict() {
    let procedures = cases::all().unwrap();
    let config = AnalysisConfig::default();
    assert_eq!(procedures.len(), EXPECTED.len());

    for (procedure, (name, expected)) in procedures.iter().zip(EXPECTED) {
        assert_eq!(procedure.name(), name);
        let report = analyze(procedure, &config).unwrap();
        assert_eq!(report.verdict, expected, "{}: {:#?}", name, report.sites);
        assert!(!report.is_degraded(), "{} did not converge", name);
    }
}

#[test]
fn test_only_float_division_is_contradicted() {
    let summary = run_cases(&cases::all().unwrap(), &AnalysisConfig::default());
    let contradicted: Vec<&str> = summary
        .cases
        .iter()
        .filter(|c| c.grade == Grade::Contradicted)
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(contradicted, vec!["Arithmetics.alwaysThrows3"]);

    assert_eq!(summary.exact, 25);
    assert_eq!(summary.imprecise, 8);
    assert_eq!(summary.contradicted, 1);
    assert_eq!(summary.undetermined, 16);
    assert_eq!(summary.errors, 0);
}

#[test]
fn test_summary_is_stable_across_runs() {
    let procedures = cases::all().unwrap();
    let config = AnalysisConfig::default();
    let first = run_cases(&procedures, &config);
    let second = run_cases(&procedures, &config);
    let verdicts = |s: &exceptional::harness::Summary| s.cases.iter().map(|c| c.verdict).collect::<Vec<_>>();
    assert_eq!(verdicts(&first), verdicts(&second));
}

#[test]
fn test_out_of_bounds_store_is_the_failing_site() {
    let procedure = cases::of_class("Arrays")
        .unwrap()
        .into_iter()
        .find(|p| p.name() == "Arrays.alwaysThrows1")
        .unwrap();
    let report = analyze(&procedure, &AnalysisConfig::default()).unwrap();

    let always: Vec<_> = report.sites.iter().filter(|s| s.verdict == Always).collect();
    assert_eq!(always.len(), 1);
    assert_eq!(always[0].kind, FaultKind::IndexOutOfBounds);
    assert_eq!(always[0].description, "is[2] = 12");
    assert_eq!(report.count(Never), 5);
}

#[test]
fn test_amalgamation_depends_on_array_length_tracking() {
    let procedures = cases::of_class("NullArrays").unwrap();
    let config = AnalysisConfig {
        track_array_length: false,
        ..Default::default()
    };
    for procedure in &procedures {
        let report = analyze(procedure, &config).unwrap();
        // Without lengths no bounds check can be discharged.
        for site in report.sites.iter().filter(|s| s.kind == FaultKind::IndexOutOfBounds) {
            assert_eq!(site.verdict, May, "{} {}", procedure.name(), site.description);
        }
    }
}

#[test]
fn test_speed_vs_precision_needs_narrowing() {
    let procedure = cases::of_class("Arithmetics")
        .unwrap()
        .into_iter()
        .find(|p| p.name() == "Arithmetics.speedVsPrecision")
        .unwrap();
    let coarse = AnalysisConfig {
        narrowing_iterations: 0,
        ..Default::default()
    };
    assert_eq!(analyze(&procedure, &coarse).unwrap().verdict, May);
    assert_eq!(analyze(&procedure, &AnalysisConfig::default()).unwrap().verdict, Always);
}

//! Fixpoint benchmarks over the labelled corpus.
//!
//! Run with:
//! ```bash
//! cargo bench --bench fixpoint
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use exceptional::analysis::{analyze, analyze_all};
use exceptional::cases;
use exceptional::config::AnalysisConfig;

/// Each fixture class analysed sequentially.
fn bench_classes(c: &mut Criterion) {
    let config = AnalysisConfig::default();
    let mut group = c.benchmark_group("fixpoint/class");

    for class in cases::CLASSES {
        let procedures = cases::of_class(class).expect("corpus builds");
        group.throughput(Throughput::Elements(procedures.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(class), &procedures, |b, procedures| {
            b.iter(|| {
                for procedure in procedures {
                    std::hint::black_box(analyze(procedure, &config).expect("analysis succeeds"));
                }
            });
        });
    }

    group.finish();
}

/// The loop-heavy cases with and without narrowing.
fn bench_narrowing(c: &mut Criterion) {
    let procedures: Vec<_> = cases::all()
        .expect("corpus builds")
        .into_iter()
        .filter(|p| !p.loop_heads().is_empty())
        .collect();
    let mut group = c.benchmark_group("fixpoint/narrowing");

    for rounds in [0, 2, 8] {
        let config = AnalysisConfig {
            narrowing_iterations: rounds,
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::new("rounds", rounds), &config, |b, config| {
            b.iter(|| {
                for procedure in &procedures {
                    std::hint::black_box(analyze(procedure, config).expect("analysis succeeds"));
                }
            });
        });
    }

    group.finish();
}

/// The whole corpus through the parallel driver.
fn bench_batch(c: &mut Criterion) {
    let procedures = cases::all().expect("corpus builds");
    let config = AnalysisConfig::default();
    let mut group = c.benchmark_group("fixpoint/batch");
    group.throughput(Throughput::Elements(procedures.len() as u64));
    group.bench_function("analyze_all", |b| {
        b.iter(|| std::hint::black_box(analyze_all(&procedures, &config)));
    });
    group.finish();
}

criterion_group!(benches, bench_classes, bench_narrowing, bench_batch);
criterion_main!(benches);

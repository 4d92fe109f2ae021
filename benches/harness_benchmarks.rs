//! Performance benchmarks for the conformance harness
//!
//! Run with: cargo bench
//!
//! Measures the per-case overhead a large suite pays:
//! - probe evaluation and comparison in the assertion primitives
//! - finalization and formatting in the runner/reporter
//! - gate and callback queue turnaround in a page

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use conformance_harness::{
    runner, ExpressionHost, Gate, MemorySink, Page, ReportStyle, Reporter, SuiteContext,
};

fn suite_with_cases(n: usize) -> SuiteContext {
    let mut suite = SuiteContext::new("bench", ExpressionHost::new());
    for i in 0..n {
        if i % 2 == 0 {
            suite.should_be("1+1", "2");
        } else {
            suite.record_case("s", "legacy", i as f64, i as f64);
        }
    }
    suite
}

/// Benchmark: single assertion primitives
fn bench_assertions(c: &mut Criterion) {
    let mut group = c.benchmark_group("assertions");

    group.bench_function("should_be", |b| {
        let mut suite = SuiteContext::new("bench", ExpressionHost::new());
        b.iter(|| {
            suite.reset();
            black_box(suite.should_be(black_box("(1 + 2) * 3"), black_box("9")))
        })
    });

    group.bench_function("should_throw", |b| {
        let mut suite = SuiteContext::new("bench", ExpressionHost::new());
        b.iter(|| {
            suite.reset();
            black_box(suite.should_throw(black_box("null.x"), None))
        })
    });

    group.bench_function("report_match", |b| {
        let mut suite = SuiteContext::new("bench", ExpressionHost::new());
        b.iter(|| {
            suite.reset();
            black_box(suite.report_match(black_box("^Type"), "TypeError: x", "match"))
        })
    });

    group.finish();
}

/// Benchmark: run + report a whole suite
fn bench_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("report");

    for size in [10usize, 100, 1000] {
        group.throughput(Throughput::Elements(size as u64));
        for style in [ReportStyle::Mozilla, ReportStyle::WebKit] {
            group.bench_with_input(BenchmarkId::new(style.to_string(), size), &size, |b, &size| {
                b.iter_batched(
                    || suite_with_cases(size),
                    |mut suite| {
                        let mut reporter = Reporter::new(MemorySink::new(), style);
                        black_box(runner::run(&mut suite, &mut reporter).ok())
                    },
                    criterion::BatchSize::SmallInput,
                )
            });
        }
    }

    group.finish();
}

/// Benchmark: gated page with timers
fn bench_page(c: &mut Criterion) {
    c.bench_function("page_100_timers", |b| {
        b.iter(|| {
            let suite = SuiteContext::new("page", ExpressionHost::new());
            let reporter = Reporter::new(MemorySink::new(), ReportStyle::WebKit);
            let mut page = Page::new(suite, Gate::counted(100), reporter);
            for delay in 0..100u64 {
                page.set_timeout(delay, |page| {
                    page.suite_mut().should_be("1", "1");
                    page.finish_test();
                });
            }
            black_box(page.run().ok())
        })
    });
}

criterion_group!(benches, bench_assertions, bench_report, bench_page);
criterion_main!(benches);

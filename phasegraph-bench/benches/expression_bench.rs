//! Guard expression benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use phasegraph_core::{Expression, Node};

const EXPRESSIONS: &[(&str, &str)] = &[
    ("literal", "true"),
    ("comparison", "score >= 50"),
    ("property", "properties.hostile && distance < 3"),
    (
        "nested",
        "!(a > 1 && b < 2) || (c == \"ready\" && d != -1.5) || properties.flag",
    ),
];

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("expression_compile");

    for (name, source) in EXPRESSIONS {
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, source| {
            b.iter(|| black_box(Expression::compile(black_box(source)).unwrap()));
        });
    }

    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("expression_evaluate");

    let node = Node::new("bench")
        .with_var("score", 75)
        .with_var("distance", 2.5)
        .with_var("a", 3)
        .with_var("b", 1)
        .with_var("c", "ready")
        .with_var("d", -1.5)
        .with_property("hostile", true)
        .with_property("flag", false);

    for (name, source) in EXPRESSIONS {
        let expr = Expression::compile(source).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(name), &expr, |b, expr| {
            b.iter(|| black_box(expr.evaluate(&node).unwrap()));
        });
    }

    // Missing identifiers in boolean context fall back to false
    let missing = Expression::compile("unknown || properties.unknown").unwrap();
    group.bench_function("missing_identifier", |b| {
        b.iter(|| black_box(missing.evaluate(&node).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_compile, bench_evaluate);
criterion_main!(benches);

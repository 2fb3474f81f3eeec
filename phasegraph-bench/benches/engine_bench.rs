//! Graph and phase graph benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use phasegraph_core::{Graph, PhaseGraph};
use serde_json::{json, Value};

/// A ring of `n` nodes where every edge fires once its guard sees `hops`
/// below the limit. Each edge also writes a var on its destination.
fn ring_document(n: usize) -> Value {
    json!({
        "nodes": (0..n).map(|i| json!({
            "id": format!("n{}", i),
            "vars": {"hops": 0, "limit": 1_000_000}
        })).collect::<Vec<_>>(),
        "edges": (0..n).flat_map(|i| {
            let to = format!("n{}", (i + 1) % n);
            vec![
                json!({"from": format!("n{}", i), "to": to, "condition": "hops > limit"}),
                json!({
                    "from": format!("n{}", i),
                    "to": to,
                    "condition": "hops < limit",
                    "actions": {"visited": true}
                }),
            ]
        }).collect::<Vec<_>>()
    })
}

fn phased_document(phases: usize, nodes_per_phase: usize) -> Value {
    json!({
        "phases": (0..phases).map(|p| {
            let mut phase = ring_document(nodes_per_phase);
            phase["id"] = json!(format!("p{}", p));
            phase["initial_state"] = json!("n0");
            phase
        }).collect::<Vec<_>>(),
        "phase_edges": (0..phases).map(|p| json!({
            "from": format!("p{}", p),
            "to": format!("p{}", (p + 1) % phases),
            "condition": "visited && properties.exit"
        })).collect::<Vec<_>>()
    })
}

fn bench_graph_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_step");
    group.throughput(Throughput::Elements(1));

    for size in [4, 64] {
        let doc = ring_document(size);
        let mut graph: Graph = Graph::from_json(&doc).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(graph.step().unwrap().is_some()));
        });
    }

    group.finish();
}

fn bench_compound_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("phase_graph_step");
    group.throughput(Throughput::Elements(1));

    for phases in [2, 16] {
        let doc = phased_document(phases, 8);
        let mut graph: PhaseGraph = PhaseGraph::from_json(&doc).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(phases), &phases, |b, _| {
            b.iter(|| black_box(graph.step().unwrap()));
        });
    }

    group.finish();
}

fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("document_load");

    let small = phased_document(2, 4);
    let large = phased_document(16, 32);

    group.bench_function("small", |b| {
        b.iter(|| {
            let graph: PhaseGraph = PhaseGraph::from_json(black_box(&small)).unwrap();
            black_box(graph)
        });
    });
    group.bench_function("large", |b| {
        b.iter(|| {
            let graph: PhaseGraph = PhaseGraph::from_json(black_box(&large)).unwrap();
            black_box(graph)
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_graph_step,
    bench_compound_step,
    bench_load
);
criterion_main!(benches);

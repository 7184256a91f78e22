use std::hint::black_box as _b;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use proteohub::config::SchedulingType;
use proteohub::fdr::TargetDecoyObjective;
use proteohub::ident_graph::IdGraph;
use proteohub::inference::{GridSearch, InferenceConfig, run_inference};
use proteohub::types::{DEFAULT_CONVERGENCE_THRESHOLD, DEFAULT_DAMPENING_LAMBDA};

/// A fan-in graph: `n` proteins, each with one private peptide, all peptides supporting a
/// single shared PSM group via one spectrum bucket each -- a moderately branchy single CC.
fn fan_in_graph(n: usize) -> IdGraph {
    let mut g = IdGraph::new();
    for i in 0..n {
        let protein = g.add_protein(format!("P{i:05}"), 0.0);
        let peptide = g.add_peptide();
        let psm = g.add_psm(0.5 + 0.4 * ((i % 3) as f64 / 2.0), 1, i);
        g.add_edge(protein, peptide);
        g.add_edge(peptide, psm);
    }
    g
}

fn base_config() -> InferenceConfig {
    InferenceConfig {
        alpha: 0.1,
        beta: 0.001,
        gamma: 0.5,
        scheduling_type: SchedulingType::Priority,
        dampening_lambda: DEFAULT_DAMPENING_LAMBDA,
        convergence_threshold: DEFAULT_CONVERGENCE_THRESHOLD,
        max_iterations: 10_000,
        random_seed: 42,
        parallel: false,
    }
}

fn bench_inference(c: &mut Criterion) {
    let mut group = c.benchmark_group("cc_driver/run_inference");
    for &n in &[10usize, 100, 1_000] {
        group.bench_with_input(BenchmarkId::new("sequential", n), &n, |b, &n| {
            let graph = fan_in_graph(n);
            let ccs = graph.connected_components();
            let config = base_config();
            b.iter(|| {
                let mut trial = graph.clone();
                run_inference(_b(&mut trial), _b(&ccs), _b(&config), None).unwrap();
            });
        });

        group.bench_with_input(BenchmarkId::new("parallel", n), &n, |b, &n| {
            let graph = fan_in_graph(n);
            let ccs = graph.connected_components();
            let mut config = base_config();
            config.parallel = true;
            b.iter(|| {
                let mut trial = graph.clone();
                run_inference(_b(&mut trial), _b(&ccs), _b(&config), None).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_grid_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_search");
    let graph = fan_in_graph(50);
    let ccs = graph.connected_components();
    let search = GridSearch::new(
        vec![0.05, 0.1, 0.2],
        vec![0.001, 0.01],
        vec![0.3, 0.5, 0.7, 0.9],
    );
    let objective = TargetDecoyObjective::new(0.5, "DECOY_", 0.2);
    let base = base_config();

    group.bench_function("sequential_scan", |b| {
        b.iter(|| {
            let mut trial = graph.clone();
            search
                .run(_b(&mut trial), _b(&ccs), _b(&base), &objective)
                .unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_inference, bench_grid_search);
criterion_main!(benches);

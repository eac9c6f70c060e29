//! Benchmarks for graph model construction and layout.
//!
//! Run with: cargo bench --bench graph_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use forensics_console::layout::{self, LayoutConfig};
use forensics_console::{
    AccountNode, AnalysisResult, AnalysisSummary, DerivedGraphModel, FraudRing, NodeMetrics,
    TransactionEdge,
};

/// Chains of five accounts closed into cycles, every third chain a ring
fn synthetic_result(account_count: usize) -> AnalysisResult {
    let chain = 5;
    let mut nodes = Vec::with_capacity(account_count);
    let mut edges = Vec::new();
    let mut fraud_rings = Vec::new();

    for start in (0..account_count).step_by(chain) {
        let end = (start + chain).min(account_count);
        let ring_id = (start / chain % 3 == 0).then(|| format!("RING_{:04}", start / chain));

        for i in start..end {
            nodes.push(AccountNode {
                id: format!("ACC_{:05}", i),
                label: format!("ACC_{:05}", i),
                risk: ((i * 37) % 100) as f64,
                ring_id: ring_id.clone(),
                metrics: NodeMetrics {
                    in_degree: 1,
                    out_degree: 1,
                    degree: 2,
                },
            });
            let next = if i + 1 < end { i + 1 } else { start };
            edges.push(TransactionEdge {
                source: format!("ACC_{:05}", i),
                target: format!("ACC_{:05}", next),
                amount: 1_000.0 + i as f64,
            });
        }

        if let Some(ring_id) = ring_id {
            fraud_rings.push(FraudRing {
                ring_id,
                pattern_type: "cycle".to_string(),
                member_accounts: (start..end).map(|i| format!("ACC_{:05}", i)).collect(),
                risk_score: 88.0,
            });
        }
    }

    let fraud_rings_detected = fraud_rings.len() as u64;
    AnalysisResult {
        nodes,
        edges,
        suspicious_accounts: Vec::new(),
        fraud_rings,
        summary: AnalysisSummary {
            total_accounts_analyzed: account_count as u64,
            suspicious_accounts_flagged: None,
            fraud_rings_detected,
            processing_time_seconds: 0.0,
        },
    }
}

fn bench_model_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("model_build");

    for account_count in [100, 1_000, 5_000] {
        let result = synthetic_result(account_count);
        group.bench_with_input(
            BenchmarkId::from_parameter(account_count),
            &result,
            |b, result| {
                b.iter(|| DerivedGraphModel::build(black_box(result)));
            },
        );
    }

    group.finish();
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    group.sample_size(20);
    let config = LayoutConfig::default();

    for account_count in [100, 500] {
        let model = DerivedGraphModel::build(&synthetic_result(account_count)).unwrap();
        group.bench_with_input(
            BenchmarkId::from_parameter(account_count),
            &model,
            |b, model| {
                b.iter(|| layout::compute(black_box(model), &config));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_model_build, bench_layout);
criterion_main!(benches);

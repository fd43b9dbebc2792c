//! Detection and projection hot path benchmarks

use chrono::{Duration, Utc};
use cloudscope_cost_observability::{
    run_detectors, summarize, AwsResource, AwsResourceInventory, CostAnomalyConfig,
    CostAnomalyDetector, CostBreakdown, CostProjectionEngine, CostSummary, DetectionInput,
    Detector, ProjectionConfig, ResourceWasteConfig, ResourceWasteDetector, SecurityRiskConfig,
    SecurityRiskDetector,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Runtime;

fn weekly_summary(previous: f64, current: f64, services: usize) -> CostSummary {
    let top_services = (0..services)
        .map(|n| {
            let base = 10.0 + n as f64;
            CostBreakdown {
                service: format!("service-{n}"),
                current_week_cost: base * 1.3,
                previous_week_cost: base,
                change_percent: 30.0,
                change_amount: base * 0.3,
                monthly_projection: base * 1.3 * 4.33,
            }
        })
        .collect();

    CostSummary {
        total_current_week: current,
        total_previous_week: previous,
        total_change_percent: (current - previous) / previous * 100.0,
        total_change_amount: current - previous,
        monthly_projection: current * 4.33,
        budget_limit: Some(1000.0),
        budget_remaining: Some(40.0),
        top_services,
        period_start: Utc::now() - Duration::days(7),
        period_end: Utc::now(),
    }
}

fn large_inventory(count: usize) -> AwsResourceInventory {
    let resources: Vec<AwsResource> = (0..count)
        .map(|n| AwsResource {
            id: format!("i-{n:06}"),
            resource_type: if n % 3 == 0 { "ebs-volume" } else { "ec2-instance" }.to_string(),
            service: format!("service-{}", n % 8),
            region: "us-east-1".to_string(),
            tags: HashMap::new(),
            state: match n % 4 {
                0 => "available",
                1 => "running",
                2 => "stopped",
                _ => "running",
            }
            .to_string(),
            created_at: Utc::now() - Duration::days(90),
            estimated_monthly_cost: 10.0 + (n % 50) as f64,
            metadata: HashMap::from([
                ("avg_cpu_percent".to_string(), format!("{}", n % 40)),
                ("network_in_bytes".to_string(), "2048".to_string()),
                ("public_ports".to_string(), "80,443".to_string()),
            ]),
        })
        .collect();

    let mut resources_by_service: HashMap<String, Vec<AwsResource>> = HashMap::new();
    for resource in resources {
        resources_by_service
            .entry(resource.service.clone())
            .or_default()
            .push(resource);
    }

    AwsResourceInventory {
        total_resources: count,
        total_monthly_cost: resources_by_service
            .values()
            .flatten()
            .map(|r| r.estimated_monthly_cost)
            .sum(),
        resources_by_service,
    }
}

fn bench_input(resource_count: usize) -> DetectionInput {
    DetectionInput {
        deployment_id: "dep-bench".to_string(),
        cost_data: weekly_summary(400.0, 520.0, 10),
        aws_resources: large_inventory(resource_count),
        historical_data: (0..8)
            .map(|week| weekly_summary(300.0 + week as f64 * 12.0, 312.0 + week as f64 * 12.0, 5))
            .collect(),
    }
}

fn bench_detection(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let input = bench_input(500);
    let detectors: Vec<Arc<dyn Detector>> = vec![
        Arc::new(CostAnomalyDetector::new(CostAnomalyConfig::default())),
        Arc::new(ResourceWasteDetector::new(ResourceWasteConfig::default())),
        Arc::new(SecurityRiskDetector::new(SecurityRiskConfig::default())),
    ];

    c.bench_function("run_detectors_500_resources", |b| {
        b.iter(|| {
            let outputs = runtime.block_on(run_detectors(black_box(&detectors), black_box(&input)));
            black_box(outputs)
        })
    });
}

fn bench_aggregation(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let input = bench_input(500);
    let detector = ResourceWasteDetector::new(ResourceWasteConfig::default());
    let flags = runtime.block_on(detector.detect(&input)).red_flags;

    c.bench_function("summarize_flags", |b| {
        b.iter(|| black_box(summarize(black_box(&flags))))
    });
}

fn bench_projection(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let engine = CostProjectionEngine::new(ProjectionConfig::default());
    let history: Vec<CostSummary> = (0..52)
        .map(|week| weekly_summary(300.0 + week as f64 * 2.0, 302.0 + week as f64 * 2.0, 5))
        .collect();

    c.bench_function("predict_next_week_52_samples", |b| {
        b.iter(|| black_box(engine.predict_next_week(black_box(&history)).unwrap()))
    });

    c.bench_function("project_monthly_52_samples", |b| {
        b.iter(|| {
            let projection =
                runtime.block_on(engine.project_monthly_cost(black_box(406.0), black_box(&history)));
            black_box(projection)
        })
    });
}

criterion_group!(benches, bench_detection, bench_aggregation, bench_projection);
criterion_main!(benches);

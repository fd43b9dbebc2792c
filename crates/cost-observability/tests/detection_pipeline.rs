//! End-to-end analysis run: concurrent detectors, projection, aggregation

use async_trait::async_trait;
use chrono::{Duration, Utc};
use cloudscope_cost_observability::{
    run_detectors, summarize, AwsResource, AwsResourceInventory, CloudStateProvider,
    CostAnomalyConfig, CostAnomalyDetector, CostBreakdown, CostObservabilityError,
    CostObservabilityResult, CostProjectionEngine, CostSummary, DeploymentFailureConfig,
    DeploymentFailureDetector, DetectionInput, Detector, Ec2Instance, FlagCategory, InfraStack,
    InstanceStatusSummary, PredictionMethod, ProjectionConfig, RdsInstance, ResourceWasteConfig,
    ResourceWasteDetector, SecurityRiskConfig, SecurityRiskDetector, Severity, TrendDirection,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn cost_summary(total_previous: f64, total_current: f64) -> CostSummary {
    CostSummary {
        total_current_week: total_current,
        total_previous_week: total_previous,
        total_change_percent: if total_previous > 0.0 {
            (total_current - total_previous) / total_previous * 100.0
        } else {
            0.0
        },
        total_change_amount: total_current - total_previous,
        monthly_projection: total_current * 4.33,
        budget_limit: None,
        budget_remaining: None,
        top_services: Vec::new(),
        period_start: Utc::now() - Duration::days(7),
        period_end: Utc::now(),
    }
}

fn breakdown(service: &str, previous: f64, current: f64) -> CostBreakdown {
    CostBreakdown {
        service: service.to_string(),
        current_week_cost: current,
        previous_week_cost: previous,
        change_percent: if previous > 0.0 {
            (current - previous) / previous * 100.0
        } else {
            0.0
        },
        change_amount: current - previous,
        monthly_projection: current * 4.33,
    }
}

fn resource(id: &str, resource_type: &str, state: &str, cost: f64, metadata: &[(&str, &str)]) -> AwsResource {
    AwsResource {
        id: id.to_string(),
        resource_type: resource_type.to_string(),
        service: "api".to_string(),
        region: "us-east-1".to_string(),
        tags: HashMap::new(),
        state: state.to_string(),
        created_at: Utc::now() - Duration::days(60),
        estimated_monthly_cost: cost,
        metadata: metadata
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

struct ScriptedCloud {
    fail_ec2: bool,
}

#[async_trait]
impl CloudStateProvider for ScriptedCloud {
    async fn ec2_instances(&self, _: &str) -> CostObservabilityResult<Vec<Ec2Instance>> {
        if self.fail_ec2 {
            return Err(CostObservabilityError::ExternalLookup {
                source_name: "ec2".to_string(),
                reason: "connection reset".to_string(),
            });
        }
        Ok(vec![Ec2Instance {
            instance_id: "i-capacity".to_string(),
            instance_type: "c5.xlarge".to_string(),
            state: "terminated".to_string(),
            state_reason: Some("Server.InsufficientInstanceCapacity".to_string()),
        }])
    }

    async fn instance_status(&self, _: &str) -> CostObservabilityResult<InstanceStatusSummary> {
        Ok(InstanceStatusSummary {
            instance_status: "ok".to_string(),
            system_status: "ok".to_string(),
        })
    }

    async fn rds_instances(&self, _: &str) -> CostObservabilityResult<Vec<RdsInstance>> {
        Ok(vec![RdsInstance {
            identifier: "prod-db".to_string(),
            engine: "postgres".to_string(),
            status: "failed".to_string(),
        }])
    }

    async fn stacks(&self, _: &str) -> CostObservabilityResult<Vec<InfraStack>> {
        Ok(vec![InfraStack {
            name: "app-stack".to_string(),
            status: "ROLLBACK_COMPLETE".to_string(),
            status_reason: Some("instance launch failed".to_string()),
        }])
    }
}

fn analysis_input() -> DetectionInput {
    let mut cost_data = cost_summary(139.20, 170.74);
    cost_data.top_services = vec![
        breakdown("api", 60.0, 95.0),
        breakdown("workers", 45.0, 47.0),
        breakdown("sagemaker", 0.0, 28.74),
    ];

    let resources = vec![
        resource(
            "i-idle",
            "ec2-instance",
            "running",
            80.0,
            &[("avg_cpu_percent", "3.0"), ("network_in_bytes", "1200")],
        ),
        resource("vol-orphan", "ebs-volume", "available", 12.0, &[]),
        resource(
            "sg-open",
            "security-group",
            "active",
            0.0,
            &[("public_ports", "22,80,443")],
        ),
    ];
    let aws_resources = AwsResourceInventory {
        total_resources: resources.len(),
        total_monthly_cost: resources.iter().map(|r| r.estimated_monthly_cost).sum(),
        resources_by_service: HashMap::from([("api".to_string(), resources)]),
    };

    DetectionInput {
        deployment_id: "dep-prod".to_string(),
        cost_data,
        aws_resources,
        historical_data: vec![
            cost_summary(120.0, 125.0),
            cost_summary(125.0, 131.0),
            cost_summary(131.0, 139.20),
        ],
    }
}

fn all_detectors(cloud: ScriptedCloud) -> Vec<Arc<dyn Detector>> {
    vec![
        Arc::new(CostAnomalyDetector::new(CostAnomalyConfig::default())),
        Arc::new(ResourceWasteDetector::new(ResourceWasteConfig::default())),
        Arc::new(SecurityRiskDetector::new(SecurityRiskConfig::default())),
        Arc::new(DeploymentFailureDetector::new(
            DeploymentFailureConfig::default(),
            Arc::new(cloud),
        )),
    ]
}

#[tokio::test]
async fn test_full_analysis_run() {
    init_tracing();
    let input = analysis_input();
    let outputs = run_detectors(&all_detectors(ScriptedCloud { fail_ec2: false }), &input).await;
    assert_eq!(outputs.len(), 4);

    let flags: Vec<_> = outputs
        .iter()
        .flat_map(|output| output.red_flags.iter().cloned())
        .collect();

    // Cost anomalies: overall increase, api service increase, new sagemaker service
    assert!(flags
        .iter()
        .any(|f| f.category == FlagCategory::CostAnomaly && f.severity == Severity::Warning));
    assert!(flags.iter().any(|f| f.title.contains("sagemaker")));

    // Waste: idle instance and orphaned volume, with savings attached
    let waste: Vec<_> = flags
        .iter()
        .filter(|f| f.category == FlagCategory::ResourceWaste)
        .collect();
    assert_eq!(waste.len(), 2);
    assert!(waste.iter().any(|f| f.auto_fixable));

    // Security: SSH exposed and three open ports
    assert!(flags
        .iter()
        .any(|f| f.category == FlagCategory::SecurityRisk && f.severity == Severity::Critical));

    // Deployment failures: capacity termination, failed RDS, rolled-back stack
    let failures: Vec<_> = flags
        .iter()
        .filter(|f| f.category == FlagCategory::DeploymentFailure)
        .collect();
    assert_eq!(failures.len(), 3);

    let summary = summarize(&flags);
    assert_eq!(summary.total_flags, flags.len());
    assert!(summary.by_severity.critical >= 4);
    assert!(summary.total_potential_savings >= 52.0);
}

#[tokio::test]
async fn test_ec2_outage_degrades_but_does_not_abort() {
    init_tracing();
    let input = analysis_input();
    let outputs = run_detectors(&all_detectors(ScriptedCloud { fail_ec2: true }), &input).await;

    let failures: Vec<_> = outputs
        .iter()
        .flat_map(|output| output.red_flags.iter())
        .filter(|f| f.category == FlagCategory::DeploymentFailure)
        .collect();

    // The capacity flag is lost with EC2 down; RDS and stack findings survive
    assert_eq!(failures.len(), 2);
}

#[tokio::test]
async fn test_disabled_detectors_are_skipped_by_the_runner() {
    init_tracing();
    let detectors: Vec<Arc<dyn Detector>> = vec![
        Arc::new(CostAnomalyDetector::new(CostAnomalyConfig {
            enabled: false,
            ..CostAnomalyConfig::default()
        })),
        Arc::new(ResourceWasteDetector::new(ResourceWasteConfig::default())),
    ];

    let outputs = run_detectors(&detectors, &analysis_input()).await;
    assert_eq!(outputs.len(), 2);
    assert!(outputs[0].red_flags.is_empty());
    assert_eq!(outputs[0].detection_metadata.execution_time_ms, 0);
    assert!(!outputs[1].red_flags.is_empty());
}

#[tokio::test]
async fn test_projection_alongside_detection() {
    init_tracing();
    let input = analysis_input();
    let engine = CostProjectionEngine::new(ProjectionConfig::default());

    let mut full_history = input.historical_data.clone();
    full_history.push(input.cost_data.clone());

    let prediction = engine.predict_next_week(&full_history).unwrap();
    assert_eq!(prediction.methodology, PredictionMethod::LinearTrend);
    assert!(prediction.predicted > input.cost_data.total_current_week * 0.8);

    let projection = engine
        .project_monthly_cost(input.cost_data.total_current_week, &full_history)
        .await;
    assert_eq!(projection.trend_direction, TrendDirection::Increasing);
    assert!(projection.projected > 0.0);
}

//! Deployment failure detection against live cloud state
//!
//! Three sub-checks (EC2, RDS, stacks) run concurrently; each catches and
//! logs its own provider errors so one broken describe call never hides
//! findings from the other two.

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::Detector;
use crate::cloud::{
    CloudStateProvider, Ec2Instance, INSUFFICIENT_CAPACITY_MARKER, RDS_FAILURE_STATUSES,
    STACK_FAILURE_STATUSES,
};
use crate::learning::{lookup_known_fix, LearningStore, DEFAULT_LEARNING_TIMEOUT};
use crate::types::{
    DetectionInput, DetectionMetadata, DetectorOutput, FlagCategory, RedFlag, Severity,
};

const DETECTOR_ID: &str = "deployment-failure-detector";
const DETECTOR_VERSION: &str = "1.0.0";

/// Deployment failure detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentFailureConfig {
    /// Whether the detector runs at all
    pub enabled: bool,
    /// Budget for a single learning-store fix lookup
    pub learning_timeout: Duration,
}

impl Default for DeploymentFailureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            learning_timeout: DEFAULT_LEARNING_TIMEOUT,
        }
    }
}

/// Detects failed or degraded infrastructure in live cloud state
pub struct DeploymentFailureDetector {
    config: DeploymentFailureConfig,
    cloud: Arc<dyn CloudStateProvider>,
    learning: Option<Arc<dyn LearningStore>>,
}

impl DeploymentFailureDetector {
    /// Create a detector over the given cloud state provider
    pub fn new(config: DeploymentFailureConfig, cloud: Arc<dyn CloudStateProvider>) -> Self {
        Self {
            config,
            cloud,
            learning: None,
        }
    }

    /// Attach a learning store used to enrich capacity failures with known fixes
    pub fn with_learning_store(mut self, learning: Arc<dyn LearningStore>) -> Self {
        self.learning = Some(learning);
        self
    }

    /// EC2 sub-check: capacity-starved terminations and impaired status checks
    async fn check_ec2(&self, deployment_id: &str) -> Vec<RedFlag> {
        let instances = match self.cloud.ec2_instances(deployment_id).await {
            Ok(instances) => instances,
            Err(err) => {
                warn!(deployment_id, error = %err, "EC2 describe failed, skipping EC2 sub-check");
                return Vec::new();
            }
        };

        let mut flags = Vec::new();
        let mut running: Vec<&Ec2Instance> = Vec::new();

        for instance in &instances {
            match instance.state.as_str() {
                "terminated" => {
                    if let Some(reason) = &instance.state_reason {
                        if reason.contains(INSUFFICIENT_CAPACITY_MARKER) {
                            flags.push(self.capacity_failure_flag(instance, reason).await);
                        }
                    }
                }
                "running" => running.push(instance),
                _ => {}
            }
        }

        // Per-instance status lookups fan out in parallel
        let status_checks = running.iter().map(|instance| self.check_instance_status(instance));
        flags.extend(join_all(status_checks).await.into_iter().flatten());

        flags
    }

    /// Flag a termination caused by insufficient capacity, enriched with a
    /// known fix when the learning store has one
    async fn capacity_failure_flag(&self, instance: &Ec2Instance, reason: &str) -> RedFlag {
        let mut description = format!(
            "Instance {} ({}) was terminated for insufficient capacity: {}",
            instance.instance_id, instance.instance_type, reason
        );

        let mut flag_metadata = Vec::new();
        if let Some(store) = &self.learning {
            if let Some(fix) =
                lookup_known_fix(store, INSUFFICIENT_CAPACITY_MARKER, self.config.learning_timeout)
                    .await
            {
                description.push_str(&format!(
                    " Known fix ({:.0}% historical success): {}",
                    fix.success_rate * 100.0,
                    fix.resolution_steps.join("; ")
                ));
                flag_metadata.push(("known_fix_success_rate".to_string(), json!(fix.success_rate)));
            }
        }

        let mut flag = RedFlag::new(
            FlagCategory::DeploymentFailure,
            Severity::Critical,
            "EC2 capacity failure",
            description,
        );
        flag.resource_id = Some(instance.instance_id.clone());
        flag.resource_type = Some("ec2-instance".to_string());
        flag.metadata.insert("state_reason".to_string(), json!(reason));
        flag.metadata.extend(flag_metadata);
        flag
    }

    /// Query status checks for one running instance, flagging impairment
    async fn check_instance_status(&self, instance: &Ec2Instance) -> Option<RedFlag> {
        let status = match self.cloud.instance_status(&instance.instance_id).await {
            Ok(status) => status,
            Err(err) => {
                warn!(
                    instance_id = %instance.instance_id,
                    error = %err,
                    "status check query failed, skipping instance"
                );
                return None;
            }
        };

        if !status.is_impaired() {
            return None;
        }

        let mut flag = RedFlag::new(
            FlagCategory::DeploymentFailure,
            Severity::Critical,
            "EC2 instance impaired",
            format!(
                "Instance {} is running but impaired (instance status: {}, system status: {})",
                instance.instance_id, status.instance_status, status.system_status
            ),
        );
        flag.resource_id = Some(instance.instance_id.clone());
        flag.resource_type = Some("ec2-instance".to_string());
        flag.metadata.insert("instance_status".to_string(), json!(status.instance_status));
        flag.metadata.insert("system_status".to_string(), json!(status.system_status));
        Some(flag)
    }

    /// RDS sub-check: databases in failure statuses
    async fn check_rds(&self, deployment_id: &str) -> Vec<RedFlag> {
        let databases = match self.cloud.rds_instances(deployment_id).await {
            Ok(databases) => databases,
            Err(err) => {
                warn!(deployment_id, error = %err, "RDS describe failed, skipping RDS sub-check");
                return Vec::new();
            }
        };

        databases
            .iter()
            .filter(|db| RDS_FAILURE_STATUSES.contains(&db.status.as_str()))
            .map(|db| {
                let mut flag = RedFlag::new(
                    FlagCategory::DeploymentFailure,
                    Severity::Critical,
                    "RDS instance in failure state",
                    format!(
                        "Database {} ({}) is in status \"{}\"",
                        db.identifier, db.engine, db.status
                    ),
                );
                flag.resource_id = Some(db.identifier.clone());
                flag.resource_type = Some("rds-instance".to_string());
                flag.metadata.insert("status".to_string(), json!(db.status));
                flag
            })
            .collect()
    }

    /// Stack sub-check: stacks in rollback/failure terminal states
    async fn check_stacks(&self, deployment_id: &str) -> Vec<RedFlag> {
        let stacks = match self.cloud.stacks(deployment_id).await {
            Ok(stacks) => stacks,
            Err(err) => {
                warn!(deployment_id, error = %err, "stack describe failed, skipping stack sub-check");
                return Vec::new();
            }
        };

        stacks
            .iter()
            .filter(|stack| STACK_FAILURE_STATUSES.contains(&stack.status.as_str()))
            .map(|stack| {
                let reason = stack
                    .status_reason
                    .clone()
                    .unwrap_or_else(|| "no status reason reported".to_string());
                let mut flag = RedFlag::new(
                    FlagCategory::DeploymentFailure,
                    Severity::Critical,
                    "Infrastructure stack failed",
                    format!("Stack {} is in {} state: {}", stack.name, stack.status, reason),
                );
                flag.resource_id = Some(stack.name.clone());
                flag.resource_type = Some("stack".to_string());
                flag.metadata.insert("stack_status".to_string(), json!(stack.status));
                flag.metadata.insert("status_reason".to_string(), json!(reason));
                flag
            })
            .collect()
    }
}

#[async_trait]
impl Detector for DeploymentFailureDetector {
    fn id(&self) -> &str {
        DETECTOR_ID
    }

    fn version(&self) -> &str {
        DETECTOR_VERSION
    }

    fn category(&self) -> FlagCategory {
        FlagCategory::DeploymentFailure
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    async fn detect(&self, input: &DetectionInput) -> DetectorOutput {
        if !self.config.enabled {
            return DetectorOutput::disabled(DETECTOR_ID, DETECTOR_VERSION);
        }

        let started = Instant::now();
        let deployment_id = input.deployment_id.as_str();

        let (ec2_flags, rds_flags, stack_flags) = tokio::join!(
            self.check_ec2(deployment_id),
            self.check_rds(deployment_id),
            self.check_stacks(deployment_id),
        );

        let mut red_flags = ec2_flags;
        red_flags.extend(rds_flags);
        red_flags.extend(stack_flags);

        info!(
            deployment = %deployment_id,
            flags = red_flags.len(),
            "deployment failure detection complete"
        );

        DetectorOutput {
            red_flags,
            detection_metadata: DetectionMetadata {
                detector_id: DETECTOR_ID.to_string(),
                detector_version: DETECTOR_VERSION.to_string(),
                execution_time_ms: started.elapsed().as_millis() as u64,
                resources_scanned: input.aws_resources.total_resources,
            },
        }
    }
}

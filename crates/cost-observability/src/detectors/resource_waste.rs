//! Resource waste detection over the inventory snapshot
//!
//! Reads utilization and traffic evidence from resource metadata and flags
//! capacity that is paid for but not earning its keep. Findings carry an
//! estimated monthly savings, and `auto_fixable` is set where a
//! deterministic remediation command exists.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;
use tracing::info;

use super::Detector;
use crate::types::{
    AwsResource, DetectionInput, DetectionMetadata, DetectorOutput, FlagCategory, RedFlag, Severity,
};

const DETECTOR_ID: &str = "resource-waste-detector";
const DETECTOR_VERSION: &str = "1.0.0";

/// Metadata key carrying average CPU utilization, percent
const META_AVG_CPU: &str = "avg_cpu_percent";
/// Metadata key carrying weekly inbound traffic, bytes
const META_NETWORK_IN: &str = "network_in_bytes";

/// Resource waste detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceWasteConfig {
    /// Whether the detector runs at all
    pub enabled: bool,
    /// CPU utilization below which a running instance counts as idle, percent
    pub max_cpu_percent: f64,
    /// Weekly inbound traffic below which an instance counts as idle, bytes
    pub min_network_bytes: f64,
    /// Resource ids to skip
    pub excluded_resources: Vec<String>,
    /// Tag keys whose presence excludes a resource
    pub excluded_tags: Vec<String>,
}

impl Default for ResourceWasteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_cpu_percent: 10.0,
            min_network_bytes: 5_000_000.0,
            excluded_resources: Vec::new(),
            excluded_tags: Vec::new(),
        }
    }
}

/// Detects paid-for but unused capacity in the inventory snapshot
pub struct ResourceWasteDetector {
    config: ResourceWasteConfig,
}

impl ResourceWasteDetector {
    /// Create a detector with the given config
    pub fn new(config: ResourceWasteConfig) -> Self {
        Self { config }
    }

    fn is_excluded(&self, resource: &AwsResource) -> bool {
        self.config.excluded_resources.contains(&resource.id)
            || self
                .config
                .excluded_tags
                .iter()
                .any(|tag| resource.tags.contains_key(tag))
    }

    fn metadata_value(resource: &AwsResource, key: &str) -> Option<f64> {
        resource.metadata.get(key)?.parse().ok()
    }

    /// Running instance with both CPU and traffic under the idle thresholds
    fn check_idle_instance(&self, resource: &AwsResource) -> Option<RedFlag> {
        if resource.resource_type != "ec2-instance" || resource.state != "running" {
            return None;
        }

        let cpu = Self::metadata_value(resource, META_AVG_CPU)?;
        if cpu >= self.config.max_cpu_percent {
            return None;
        }

        // Missing traffic data still flags on CPU alone; fewer evidence, same signal
        let network = Self::metadata_value(resource, META_NETWORK_IN);
        if let Some(bytes) = network {
            if bytes >= self.config.min_network_bytes {
                return None;
            }
        }

        let savings = resource.estimated_monthly_cost * 0.5;
        let mut flag = RedFlag::new(
            FlagCategory::ResourceWaste,
            Severity::Warning,
            format!("Idle instance {}", resource.id),
            format!(
                "Instance {} averages {:.1}% CPU (threshold {:.0}%) at ${:.2}/month; \
                 rightsizing could save about ${:.2}/month",
                resource.id,
                cpu,
                self.config.max_cpu_percent,
                resource.estimated_monthly_cost,
                savings
            ),
        );
        flag.resource_id = Some(resource.id.clone());
        flag.resource_type = Some(resource.resource_type.clone());
        flag.estimated_monthly_cost = Some(resource.estimated_monthly_cost);
        flag.estimated_savings = Some(savings);
        flag.metadata.insert("avg_cpu_percent".to_string(), json!(cpu));
        flag.metadata
            .insert("cpu_threshold_percent".to_string(), json!(self.config.max_cpu_percent));
        if let Some(bytes) = network {
            flag.metadata.insert("network_in_bytes".to_string(), json!(bytes));
        }
        Some(flag)
    }

    /// Volume not attached to anything; deletion is a deterministic fix
    fn check_unattached_volume(&self, resource: &AwsResource) -> Option<RedFlag> {
        if resource.resource_type != "ebs-volume" || resource.state != "available" {
            return None;
        }

        let mut flag = RedFlag::new(
            FlagCategory::ResourceWaste,
            Severity::Warning,
            format!("Unattached volume {}", resource.id),
            format!(
                "Volume {} is unattached and still costs ${:.2}/month",
                resource.id, resource.estimated_monthly_cost
            ),
        );
        flag.resource_id = Some(resource.id.clone());
        flag.resource_type = Some(resource.resource_type.clone());
        flag.estimated_monthly_cost = Some(resource.estimated_monthly_cost);
        flag.estimated_savings = Some(resource.estimated_monthly_cost);
        flag.auto_fixable = true;
        flag.fix_command = Some(format!("aws ec2 delete-volume --volume-id {}", resource.id));
        Some(flag)
    }

    /// Elastic IP not associated with anything; release is a deterministic fix
    fn check_unassociated_address(&self, resource: &AwsResource) -> Option<RedFlag> {
        if resource.resource_type != "elastic-ip" || resource.state != "unassociated" {
            return None;
        }

        let mut flag = RedFlag::new(
            FlagCategory::ResourceWaste,
            Severity::Warning,
            format!("Unassociated Elastic IP {}", resource.id),
            format!(
                "Elastic IP {} is not associated with any instance and costs ${:.2}/month",
                resource.id, resource.estimated_monthly_cost
            ),
        );
        flag.resource_id = Some(resource.id.clone());
        flag.resource_type = Some(resource.resource_type.clone());
        flag.estimated_savings = Some(resource.estimated_monthly_cost);
        flag.auto_fixable = true;
        flag.fix_command = Some(format!(
            "aws ec2 release-address --allocation-id {}",
            resource.id
        ));
        Some(flag)
    }

    /// Stopped instance still billing for its attached storage
    fn check_stopped_instance(&self, resource: &AwsResource) -> Option<RedFlag> {
        if resource.resource_type != "ec2-instance" || resource.state != "stopped" {
            return None;
        }

        let mut flag = RedFlag::new(
            FlagCategory::ResourceWaste,
            Severity::Info,
            format!("Stopped instance {}", resource.id),
            format!(
                "Instance {} is stopped but its storage still accrues roughly ${:.2}/month; \
                 terminate it if no longer needed",
                resource.id, resource.estimated_monthly_cost
            ),
        );
        flag.resource_id = Some(resource.id.clone());
        flag.resource_type = Some(resource.resource_type.clone());
        flag.estimated_monthly_cost = Some(resource.estimated_monthly_cost);
        flag.estimated_savings = Some(resource.estimated_monthly_cost);
        Some(flag)
    }
}

#[async_trait]
impl Detector for ResourceWasteDetector {
    fn id(&self) -> &str {
        DETECTOR_ID
    }

    fn version(&self) -> &str {
        DETECTOR_VERSION
    }

    fn category(&self) -> FlagCategory {
        FlagCategory::ResourceWaste
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    async fn detect(&self, input: &DetectionInput) -> DetectorOutput {
        if !self.config.enabled {
            return DetectorOutput::disabled(DETECTOR_ID, DETECTOR_VERSION);
        }

        let started = Instant::now();
        let mut red_flags = Vec::new();

        for resource in input.aws_resources.iter_resources() {
            if self.is_excluded(resource) {
                continue;
            }
            red_flags.extend(self.check_idle_instance(resource));
            red_flags.extend(self.check_unattached_volume(resource));
            red_flags.extend(self.check_unassociated_address(resource));
            red_flags.extend(self.check_stopped_instance(resource));
        }

        info!(
            deployment = %input.deployment_id,
            flags = red_flags.len(),
            "resource waste detection complete"
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

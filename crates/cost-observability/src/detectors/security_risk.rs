//! Security risk detection over the inventory snapshot
//!
//! Reads network and encryption configuration evidence from resource
//! metadata: publicly open ports, unencrypted storage, and public access
//! settings. Findings are marked auto-fixable where a deterministic
//! remediation command exists.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;
use tracing::info;

use super::Detector;
use crate::types::{
    AwsResource, DetectionInput, DetectionMetadata, DetectorOutput, FlagCategory, RedFlag, Severity,
};

const DETECTOR_ID: &str = "security-risk-detector";
const DETECTOR_VERSION: &str = "1.0.0";

/// Metadata key carrying a comma-separated list of publicly open ports
const META_PUBLIC_PORTS: &str = "public_ports";
/// Metadata key carrying the at-rest encryption setting
const META_ENCRYPTED: &str = "encrypted";
/// Metadata key carrying the public access setting
const META_PUBLIC_ACCESS: &str = "public_access";

/// Ports that should never be open to the internet
const ADMIN_PORTS: [u16; 2] = [22, 3389];

/// Security risk detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityRiskConfig {
    /// Whether the detector runs at all
    pub enabled: bool,
    /// Number of publicly open ports above which a resource is flagged
    pub max_public_open_ports: usize,
    /// Resource ids to skip
    pub excluded_resources: Vec<String>,
    /// Tag keys whose presence excludes a resource
    pub excluded_tags: Vec<String>,
}

impl Default for SecurityRiskConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_public_open_ports: 2,
            excluded_resources: Vec::new(),
            excluded_tags: Vec::new(),
        }
    }
}

/// Detects exposed and unencrypted resources in the inventory snapshot
pub struct SecurityRiskDetector {
    config: SecurityRiskConfig,
}

impl SecurityRiskDetector {
    /// Create a detector with the given config
    pub fn new(config: SecurityRiskConfig) -> Self {
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

    fn public_ports(resource: &AwsResource) -> Vec<u16> {
        resource
            .metadata
            .get(META_PUBLIC_PORTS)
            .map(|raw| {
                raw.split(',')
                    .filter_map(|port| port.trim().parse().ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Publicly reachable ports: admin ports are critical, too many is a warning
    fn check_open_ports(&self, resource: &AwsResource) -> Vec<RedFlag> {
        let ports = Self::public_ports(resource);
        if ports.is_empty() {
            return Vec::new();
        }

        let mut flags = Vec::new();

        let exposed_admin: Vec<u16> =
            ports.iter().copied().filter(|port| ADMIN_PORTS.contains(port)).collect();
        if !exposed_admin.is_empty() {
            let mut flag = RedFlag::new(
                FlagCategory::SecurityRisk,
                Severity::Critical,
                format!("Admin port open to the internet on {}", resource.id),
                format!(
                    "Resource {} exposes administrative port(s) {:?} publicly; restrict the \
                     security group to known source ranges",
                    resource.id, exposed_admin
                ),
            );
            flag.resource_id = Some(resource.id.clone());
            flag.resource_type = Some(resource.resource_type.clone());
            flag.auto_fixable = true;
            flag.fix_command = Some(format!(
                "aws ec2 revoke-security-group-ingress --group-id {} --port {} --cidr 0.0.0.0/0",
                resource.id, exposed_admin[0]
            ));
            flag.metadata.insert("exposed_admin_ports".to_string(), json!(exposed_admin));
            flags.push(flag);
        }

        if ports.len() > self.config.max_public_open_ports {
            let mut flag = RedFlag::new(
                FlagCategory::SecurityRisk,
                Severity::Warning,
                format!("Broad public exposure on {}", resource.id),
                format!(
                    "Resource {} has {} publicly open ports ({:?}), above the limit of {}",
                    resource.id,
                    ports.len(),
                    ports,
                    self.config.max_public_open_ports
                ),
            );
            flag.resource_id = Some(resource.id.clone());
            flag.resource_type = Some(resource.resource_type.clone());
            flag.metadata.insert("open_port_count".to_string(), json!(ports.len()));
            flag.metadata
                .insert("max_public_open_ports".to_string(), json!(self.config.max_public_open_ports));
            flags.push(flag);
        }

        flags
    }

    /// Storage resource reporting encryption disabled
    fn check_encryption(&self, resource: &AwsResource) -> Option<RedFlag> {
        let encrypted = resource.metadata.get(META_ENCRYPTED)?;
        if encrypted != "false" {
            return None;
        }

        let mut flag = RedFlag::new(
            FlagCategory::SecurityRisk,
            Severity::Warning,
            format!("Unencrypted storage: {}", resource.id),
            format!(
                "{} {} stores data without at-rest encryption",
                resource.resource_type, resource.id
            ),
        );
        flag.resource_id = Some(resource.id.clone());
        flag.resource_type = Some(resource.resource_type.clone());
        flag.metadata.insert("encrypted".to_string(), json!(false));
        Some(flag)
    }

    /// Resource with public access explicitly enabled
    fn check_public_access(&self, resource: &AwsResource) -> Option<RedFlag> {
        let public = resource.metadata.get(META_PUBLIC_ACCESS)?;
        if public != "true" {
            return None;
        }

        let mut flag = RedFlag::new(
            FlagCategory::SecurityRisk,
            Severity::Critical,
            format!("Public access enabled on {}", resource.id),
            format!(
                "{} {} is configured for public access; verify this is intentional",
                resource.resource_type, resource.id
            ),
        );
        flag.resource_id = Some(resource.id.clone());
        flag.resource_type = Some(resource.resource_type.clone());
        flag.metadata.insert("public_access".to_string(), json!(true));
        Some(flag)
    }
}

#[async_trait]
impl Detector for SecurityRiskDetector {
    fn id(&self) -> &str {
        DETECTOR_ID
    }

    fn version(&self) -> &str {
        DETECTOR_VERSION
    }

    fn category(&self) -> FlagCategory {
        FlagCategory::SecurityRisk
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
            red_flags.extend(self.check_open_ports(resource));
            red_flags.extend(self.check_encryption(resource));
            red_flags.extend(self.check_public_access(resource));
        }

        info!(
            deployment = %input.deployment_id,
            flags = red_flags.len(),
            "security risk detection complete"
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::{input, inventory, resource, summary};

    fn detect(resources: Vec<AwsResource>) -> DetectorOutput {
        let detector = SecurityRiskDetector::new(SecurityRiskConfig::default());
        let mut detection_input = input(summary(100.0, 100.0));
        detection_input.aws_resources = inventory(resources);
        futures::executor::block_on(detector.detect(&detection_input))
    }

    #[test]
    fn test_exposed_ssh_is_critical_and_auto_fixable() {
        let output = detect(vec![resource(
            "sg-1",
            "security-group",
            "active",
            0.0,
            &[("public_ports", "22,443")],
        )]);
        let flag = output
            .red_flags
            .iter()
            .find(|f| f.title.contains("Admin port"))
            .unwrap();
        assert_eq!(flag.severity, Severity::Critical);
        assert!(flag.auto_fixable);
        assert!(flag.fix_command.as_deref().unwrap().contains("--port 22"));
    }

    #[test]
    fn test_too_many_open_ports_is_warning() {
        let output = detect(vec![resource(
            "sg-2",
            "security-group",
            "active",
            0.0,
            &[("public_ports", "80,443,8080")],
        )]);
        assert_eq!(output.red_flags.len(), 1);
        let flag = &output.red_flags[0];
        assert_eq!(flag.severity, Severity::Warning);
        assert_eq!(flag.metadata["open_port_count"].as_u64().unwrap(), 3);
    }

    #[test]
    fn test_web_ports_within_limit_not_flagged() {
        let output = detect(vec![resource(
            "sg-3",
            "security-group",
            "active",
            0.0,
            &[("public_ports", "80,443")],
        )]);
        assert!(output.red_flags.is_empty());
    }

    #[test]
    fn test_rdp_and_port_count_both_fire() {
        let output = detect(vec![resource(
            "sg-4",
            "security-group",
            "active",
            0.0,
            &[("public_ports", "3389,80,443")],
        )]);
        assert_eq!(output.red_flags.len(), 2);
    }

    #[test]
    fn test_unencrypted_volume_is_warning() {
        let output = detect(vec![resource(
            "vol-1",
            "ebs-volume",
            "in-use",
            10.0,
            &[("encrypted", "false")],
        )]);
        assert_eq!(output.red_flags.len(), 1);
        assert_eq!(output.red_flags[0].severity, Severity::Warning);
        assert!(output.red_flags[0].description.contains("at-rest encryption"));
    }

    #[test]
    fn test_encrypted_volume_not_flagged() {
        let output = detect(vec![resource(
            "vol-2",
            "ebs-volume",
            "in-use",
            10.0,
            &[("encrypted", "true")],
        )]);
        assert!(output.red_flags.is_empty());
    }

    #[test]
    fn test_public_bucket_is_critical() {
        let output = detect(vec![resource(
            "assets-bucket",
            "s3-bucket",
            "active",
            2.0,
            &[("public_access", "true")],
        )]);
        assert_eq!(output.red_flags.len(), 1);
        assert_eq!(output.red_flags[0].severity, Severity::Critical);
    }

    #[test]
    fn test_exclusions_honored() {
        let mut config = SecurityRiskConfig::default();
        config.excluded_resources.push("sg-bastion".to_string());
        let detector = SecurityRiskDetector::new(config);

        let mut detection_input = input(summary(100.0, 100.0));
        detection_input.aws_resources = inventory(vec![resource(
            "sg-bastion",
            "security-group",
            "active",
            0.0,
            &[("public_ports", "22")],
        )]);
        let output = futures::executor::block_on(detector.detect(&detection_input));
        assert!(output.red_flags.is_empty());
    }

    #[test]
    fn test_disabled_detector_returns_empty_output() {
        let detector = SecurityRiskDetector::new(SecurityRiskConfig {
            enabled: false,
            ..SecurityRiskConfig::default()
        });
        let mut detection_input = input(summary(100.0, 100.0));
        detection_input.aws_resources = inventory(vec![resource(
            "sg-open",
            "security-group",
            "active",
            0.0,
            &[("public_ports", "22")],
        )]);
        let output = futures::executor::block_on(detector.detect(&detection_input));
        assert!(output.red_flags.is_empty());
        assert_eq!(output.detection_metadata.execution_time_ms, 0);
    }
}

//! Live cloud state access for the deployment failure detector
//!
//! The engine never talks to cloud APIs directly; callers hand in a
//! [`CloudStateProvider`] backed by their describe/list integration. Every
//! method is a point-in-time read and may fail independently of the others.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CostObservabilityResult;

/// State reason marker for capacity-starved EC2 launches
pub const INSUFFICIENT_CAPACITY_MARKER: &str = "InsufficientInstanceCapacity";

/// RDS statuses treated as deployment failures
pub const RDS_FAILURE_STATUSES: [&str; 4] = [
    "failed",
    "incompatible-parameters",
    "incompatible-restore",
    "inaccessible-encryption-credentials",
];

/// Stack statuses treated as rollback/failure terminal states
pub const STACK_FAILURE_STATUSES: [&str; 6] = [
    "ROLLBACK_COMPLETE",
    "ROLLBACK_FAILED",
    "CREATE_FAILED",
    "DELETE_FAILED",
    "UPDATE_ROLLBACK_COMPLETE",
    "UPDATE_ROLLBACK_FAILED",
];

/// An EC2 instance as reported by a describe call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ec2Instance {
    /// Instance id
    pub instance_id: String,
    /// Instance type, e.g. "t3.medium"
    pub instance_type: String,
    /// Lifecycle state, e.g. "running", "terminated"
    pub state: String,
    /// State transition reason text, when the provider reports one
    pub state_reason: Option<String>,
}

/// Result of an instance/system status check query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatusSummary {
    /// Instance-level status, e.g. "ok", "impaired"
    pub instance_status: String,
    /// System-level status, e.g. "ok", "impaired"
    pub system_status: String,
}

impl InstanceStatusSummary {
    /// Whether either check reports an impaired instance
    pub fn is_impaired(&self) -> bool {
        self.instance_status == "impaired" || self.system_status == "impaired"
    }
}

/// An RDS database instance as reported by a describe call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RdsInstance {
    /// Database instance identifier
    pub identifier: String,
    /// Engine name, e.g. "postgres"
    pub engine: String,
    /// Instance status, e.g. "available", "failed"
    pub status: String,
}

/// An infrastructure stack as reported by a describe call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfraStack {
    /// Stack name
    pub name: String,
    /// Stack status, e.g. "CREATE_COMPLETE", "ROLLBACK_FAILED"
    pub status: String,
    /// Provider-supplied status reason text, if present
    pub status_reason: Option<String>,
}

/// Read-only access to live cloud state
///
/// Implementations wrap the caller's describe/list integration. Each call
/// is independent; the detector suppresses and logs failures per call so a
/// broken EC2 endpoint never hides RDS or stack findings.
#[async_trait]
pub trait CloudStateProvider: Send + Sync {
    /// List EC2 instances for the deployment
    async fn ec2_instances(&self, deployment_id: &str) -> CostObservabilityResult<Vec<Ec2Instance>>;

    /// Query instance/system status checks for one running instance
    async fn instance_status(
        &self,
        instance_id: &str,
    ) -> CostObservabilityResult<InstanceStatusSummary>;

    /// List RDS instances for the deployment
    async fn rds_instances(&self, deployment_id: &str) -> CostObservabilityResult<Vec<RdsInstance>>;

    /// List infrastructure stacks for the deployment
    async fn stacks(&self, deployment_id: &str) -> CostObservabilityResult<Vec<InfraStack>>;
}

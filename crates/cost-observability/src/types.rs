//! Shared data contracts for detection and projection
//!
//! All records here are immutable per-run value objects. The engine never
//! mutates a summary or inventory after it has been handed in, and every
//! `RedFlag` is created fresh on each detection run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Red flag severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Requires immediate attention
    Critical,
    /// Should be reviewed soon
    Warning,
    /// Informational finding
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Red flag category, one per detector variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagCategory {
    /// Unexpected spend movement
    CostAnomaly,
    /// Paid-for but unused capacity
    ResourceWaste,
    /// Exposed or unencrypted resources
    SecurityRisk,
    /// Failed or rolled-back infrastructure
    DeploymentFailure,
}

impl std::fmt::Display for FlagCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlagCategory::CostAnomaly => write!(f, "cost_anomaly"),
            FlagCategory::ResourceWaste => write!(f, "resource_waste"),
            FlagCategory::SecurityRisk => write!(f, "security_risk"),
            FlagCategory::DeploymentFailure => write!(f, "deployment_failure"),
        }
    }
}

/// Per-service weekly cost record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Service name
    pub service: String,
    /// Cost for the current week, >= 0
    pub current_week_cost: f64,
    /// Cost for the previous week, >= 0
    pub previous_week_cost: f64,
    /// Week-over-week change, percent, signed
    pub change_percent: f64,
    /// Week-over-week change, currency amount, signed
    pub change_amount: f64,
    /// Extrapolated monthly cost for this service, >= 0
    pub monthly_projection: f64,
}

/// One week's full cost picture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostSummary {
    /// Total cost for the current week
    pub total_current_week: f64,
    /// Total cost for the previous week
    pub total_previous_week: f64,
    /// Week-over-week total change, percent
    pub total_change_percent: f64,
    /// Week-over-week total change, currency amount
    pub total_change_amount: f64,
    /// Extrapolated monthly cost
    pub monthly_projection: f64,
    /// Configured budget limit, if any
    pub budget_limit: Option<f64>,
    /// Remaining budget for the period, if tracked
    pub budget_remaining: Option<f64>,
    /// Ranked per-service breakdown, at most one entry per service
    pub top_services: Vec<CostBreakdown>,
    /// Billing period start
    pub period_start: DateTime<Utc>,
    /// Billing period end
    pub period_end: DateTime<Utc>,
}

/// A single cloud resource in the inventory snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsResource {
    /// Resource id
    pub id: String,
    /// Resource type, e.g. "ec2-instance", "ebs-volume"
    pub resource_type: String,
    /// Owning service
    pub service: String,
    /// Region the resource lives in
    pub region: String,
    /// Resource tags
    pub tags: HashMap<String, String>,
    /// Lifecycle state, free-form, e.g. "running", "terminated", "failed"
    pub state: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Estimated monthly cost
    pub estimated_monthly_cost: f64,
    /// Free-form metadata, carries utilization and configuration evidence
    pub metadata: HashMap<String, String>,
}

/// Read-only snapshot of current cloud resource state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwsResourceInventory {
    /// Total resource count in the snapshot
    pub total_resources: usize,
    /// Total estimated monthly cost of the snapshot
    pub total_monthly_cost: f64,
    /// Resources grouped by owning service
    pub resources_by_service: HashMap<String, Vec<AwsResource>>,
}

impl AwsResourceInventory {
    /// Iterate over every resource in the snapshot, in no particular order
    pub fn iter_resources(&self) -> impl Iterator<Item = &AwsResource> {
        self.resources_by_service.values().flatten()
    }
}

/// A single detected anomaly or failure
///
/// Flags carry their full numeric evidence in `description` and `metadata`
/// so a report can render them without re-querying source data. Two runs
/// over the same anomaly produce two distinct ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedFlag {
    /// Unique id for this detection
    pub id: Uuid,
    /// Detector category that produced the flag
    pub category: FlagCategory,
    /// Severity
    pub severity: Severity,
    /// Short title
    pub title: String,
    /// Human-readable description embedding the numeric evidence
    pub description: String,
    /// Detection timestamp
    pub detected_at: DateTime<Utc>,
    /// Affected resource id, if the flag is resource-scoped
    pub resource_id: Option<String>,
    /// Affected resource type
    pub resource_type: Option<String>,
    /// Estimated monthly cost of the affected resource
    pub estimated_monthly_cost: Option<f64>,
    /// Estimated monthly savings if remediated
    pub estimated_savings: Option<f64>,
    /// Whether a deterministic remediation command exists
    pub auto_fixable: bool,
    /// Remediation command, when `auto_fixable`
    pub fix_command: Option<String>,
    /// Numeric evidence backing the flag (thresholds compared, z-score, ...)
    pub metadata: HashMap<String, serde_json::Value>,
}

impl RedFlag {
    /// Create a flag with a fresh id and detection timestamp
    pub fn new(
        category: FlagCategory,
        severity: Severity,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            category,
            severity,
            title: title.into(),
            description: description.into(),
            detected_at: Utc::now(),
            resource_id: None,
            resource_type: None,
            estimated_monthly_cost: None,
            estimated_savings: None,
            auto_fixable: false,
            fix_command: None,
            metadata: HashMap::new(),
        }
    }
}

/// Input snapshot shared by all detectors in one analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionInput {
    /// Deployment the run is scoped to
    pub deployment_id: String,
    /// Current week's cost picture
    pub cost_data: CostSummary,
    /// Live resource inventory snapshot
    pub aws_resources: AwsResourceInventory,
    /// Prior weekly summaries, oldest first; empty when unavailable
    pub historical_data: Vec<CostSummary>,
}

/// Bookkeeping attached to one detector's output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionMetadata {
    /// Detector id
    pub detector_id: String,
    /// Detector version
    pub detector_version: String,
    /// Wall-clock execution time in milliseconds
    pub execution_time_ms: u64,
    /// Number of resources in the scanned inventory
    pub resources_scanned: usize,
}

/// One detector's result for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorOutput {
    /// Flags produced this run
    pub red_flags: Vec<RedFlag>,
    /// Run bookkeeping
    pub detection_metadata: DetectionMetadata,
}

impl DetectorOutput {
    /// Empty output for a disabled detector: no flags, no I/O, zero time
    pub fn disabled(detector_id: &str, detector_version: &str) -> Self {
        Self {
            red_flags: Vec::new(),
            detection_metadata: DetectionMetadata {
                detector_id: detector_id.to_string(),
                detector_version: detector_version.to_string(),
                execution_time_ms: 0,
                resources_scanned: 0,
            },
        }
    }
}

/// A (low, high) band around a prediction, not a statistical guarantee
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Lower bound
    pub low: f64,
    /// Upper bound
    pub high: f64,
}

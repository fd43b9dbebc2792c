//! Red flag aggregation for reporting
//!
//! Merges the concatenated detector outputs of one run into zero-filled
//! severity and category counts plus a potential-savings total. No
//! deduplication: the same logical anomaly reported by two detectors
//! counts twice, by design of the reporting layer upstream.

use serde::{Deserialize, Serialize};

use crate::types::{FlagCategory, RedFlag, Severity};

/// Flag counts partitioned by severity, all keys always present
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    /// Critical flags
    pub critical: usize,
    /// Warning flags
    pub warning: usize,
    /// Info flags
    pub info: usize,
}

/// Flag counts partitioned by category, all keys always present
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    /// Cost anomaly flags
    pub cost_anomaly: usize,
    /// Resource waste flags
    pub resource_waste: usize,
    /// Security risk flags
    pub security_risk: usize,
    /// Deployment failure flags
    pub deployment_failure: usize,
}

/// One run's aggregated detection picture
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedFlagSummary {
    /// Total flag count
    pub total_flags: usize,
    /// Counts by severity, zero-filled
    pub by_severity: SeverityCounts,
    /// Counts by category, zero-filled
    pub by_category: CategoryCounts,
    /// Sum of estimated savings across flags that define one
    pub total_potential_savings: f64,
}

/// Aggregate the concatenated flags from all enabled detectors
pub fn summarize(flags: &[RedFlag]) -> RedFlagSummary {
    let mut summary = RedFlagSummary {
        total_flags: flags.len(),
        ..RedFlagSummary::default()
    };

    for flag in flags {
        match flag.severity {
            Severity::Critical => summary.by_severity.critical += 1,
            Severity::Warning => summary.by_severity.warning += 1,
            Severity::Info => summary.by_severity.info += 1,
        }
        match flag.category {
            FlagCategory::CostAnomaly => summary.by_category.cost_anomaly += 1,
            FlagCategory::ResourceWaste => summary.by_category.resource_waste += 1,
            FlagCategory::SecurityRisk => summary.by_category.security_risk += 1,
            FlagCategory::DeploymentFailure => summary.by_category.deployment_failure += 1,
        }
        summary.total_potential_savings += flag.estimated_savings.unwrap_or(0.0);
    }

    summary
}

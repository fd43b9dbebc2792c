//! Best-effort pattern and accuracy lookups
//!
//! The learning store is a pure enrichment: its answers sharpen flag
//! descriptions and projection accuracy, but absence, errors, and timeouts
//! are all normal outcomes. Every query runs under a short timeout and
//! degrades to "no additional evidence".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::CostObservabilityResult;

/// Default budget for a single advisory lookup
pub const DEFAULT_LEARNING_TIMEOUT: Duration = Duration::from_millis(250);

/// A known remediation for an error code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownFix {
    /// Ordered remediation steps
    pub resolution_steps: Vec<String>,
    /// Historical success rate, 0..1
    pub success_rate: f64,
}

/// Historical accuracy of past cost estimates for one service
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EstimateAccuracy {
    /// Number of past estimates backing the record
    pub sample_size: u64,
    /// Average signed variance of estimate vs. actual, percent
    pub avg_variance_percent: f64,
}

/// Read-only pattern store queried for known fixes and estimate accuracy
#[async_trait]
pub trait LearningStore: Send + Sync {
    /// Known remediation for an error code, if one has been learned
    async fn known_fix(&self, error_code: &str) -> CostObservabilityResult<Option<KnownFix>>;

    /// Historical estimate accuracy for a (service, resource type) pair
    async fn estimate_accuracy(
        &self,
        service: &str,
        resource_type: &str,
    ) -> CostObservabilityResult<Option<EstimateAccuracy>>;
}

/// Query a known fix with a bounded timeout, silently degrading to `None`
pub async fn lookup_known_fix(
    store: &Arc<dyn LearningStore>,
    error_code: &str,
    timeout: Duration,
) -> Option<KnownFix> {
    match tokio::time::timeout(timeout, store.known_fix(error_code)).await {
        Ok(Ok(fix)) => fix,
        Ok(Err(err)) => {
            debug!(error_code, error = %err, "known-fix lookup failed, continuing without it");
            None
        }
        Err(_) => {
            debug!(error_code, "known-fix lookup timed out, continuing without it");
            None
        }
    }
}

/// Query estimate accuracy with a bounded timeout
///
/// Returns `Err(())` on store failure or timeout so callers can distinguish
/// "no record" from "store unavailable" and abandon a multi-lookup
/// adjustment entirely.
pub async fn lookup_estimate_accuracy(
    store: &Arc<dyn LearningStore>,
    service: &str,
    resource_type: &str,
    timeout: Duration,
) -> Result<Option<EstimateAccuracy>, ()> {
    match tokio::time::timeout(timeout, store.estimate_accuracy(service, resource_type)).await {
        Ok(Ok(record)) => Ok(record),
        Ok(Err(err)) => {
            debug!(service, error = %err, "estimate-accuracy lookup failed");
            Err(())
        }
        Err(_) => {
            debug!(service, "estimate-accuracy lookup timed out");
            Err(())
        }
    }
}

//! Red flag detectors
//!
//! Four independent detectors share one contract: each consumes the
//! immutable per-run [`DetectionInput`] snapshot and produces a list of
//! [`RedFlag`]s plus run bookkeeping. Detectors never fail for expected
//! no-data conditions and suppress external lookup errors per sub-check,
//! so one broken cloud call degrades a run instead of aborting it.

mod cost_anomaly;
mod deployment_failure;
mod resource_waste;
mod security_risk;

pub use cost_anomaly::{CostAnomalyConfig, CostAnomalyDetector};
pub use deployment_failure::{DeploymentFailureConfig, DeploymentFailureDetector};
pub use resource_waste::{ResourceWasteConfig, ResourceWasteDetector};
pub use security_risk::{SecurityRiskConfig, SecurityRiskDetector};

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::debug;

use crate::types::{DetectionInput, DetectorOutput, FlagCategory};

/// A stateless red flag detector
///
/// Implementations are pure functions of their input plus optional
/// external lookups, are safe to run in parallel against a shared input,
/// and must not mutate it. A disabled detector returns an empty output
/// with zero execution time and performs no I/O.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Stable detector id, e.g. "cost-anomaly-detector"
    fn id(&self) -> &str;

    /// Detector version recorded in output metadata
    fn version(&self) -> &str;

    /// Category of every flag this detector emits
    fn category(&self) -> FlagCategory;

    /// Whether the detector is enabled by its config
    fn enabled(&self) -> bool;

    /// Run the detector against one input snapshot
    async fn detect(&self, input: &DetectionInput) -> DetectorOutput;
}

/// Run all detectors concurrently against one immutable input snapshot
///
/// Output order matches detector order; there is no ordering guarantee
/// between the detectors' executions themselves.
pub async fn run_detectors(
    detectors: &[Arc<dyn Detector>],
    input: &DetectionInput,
) -> Vec<DetectorOutput> {
    let runs = detectors.iter().map(|detector| {
        let detector = Arc::clone(detector);
        async move {
            if !detector.enabled() {
                debug!(detector = detector.id(), "detector disabled, skipping");
                return DetectorOutput::disabled(detector.id(), detector.version());
            }
            detector.detect(input).await
        }
    });

    join_all(runs).await
}

//! Cost observability engine for cloud deployments
//!
//! This crate ingests weekly cloud-spend summaries and live resource
//! inventories, runs a set of independent detectors that flag anomalies
//! and failures, and projects future spend with quantified uncertainty:
//! - Cost anomaly detection over weekly spend summaries
//! - Deployment failure scanning of live cloud state
//! - Resource waste and security risk scanning of the inventory snapshot
//! - Next-week and monthly cost projection with confidence intervals
//! - Red flag aggregation for the reporting layer
//!
//! The engine holds no persistent state: every run consumes immutable
//! snapshots supplied by the caller, and all detectors are safe to run
//! concurrently against the same input.

#![warn(missing_docs)]

pub mod aggregator;
pub mod cloud;
pub mod detectors;
pub mod error;
pub mod learning;
pub mod projection;
pub mod types;

pub use error::{CostObservabilityError, CostObservabilityResult};

// Shared data contracts
pub use types::{
    AwsResource, AwsResourceInventory, ConfidenceInterval, CostBreakdown, CostSummary,
    DetectionInput, DetectionMetadata, DetectorOutput, FlagCategory, RedFlag, Severity,
};

// Cloud state access
pub use cloud::{
    CloudStateProvider, Ec2Instance, InfraStack, InstanceStatusSummary, RdsInstance,
};

// Learning store access
pub use learning::{EstimateAccuracy, KnownFix, LearningStore};

// Detectors
pub use detectors::{
    run_detectors, CostAnomalyConfig, CostAnomalyDetector, DeploymentFailureConfig,
    DeploymentFailureDetector, Detector, ResourceWasteConfig, ResourceWasteDetector,
    SecurityRiskConfig, SecurityRiskDetector,
};

// Projection
pub use projection::{
    CostPrediction, CostProjectionEngine, MonthlyCostProjection, PredictionMethod,
    ProjectionConfig, TrendDirection,
};

// Aggregation
pub use aggregator::{summarize, CategoryCounts, RedFlagSummary, SeverityCounts};

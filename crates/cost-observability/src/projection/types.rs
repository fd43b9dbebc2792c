//! Projection output types and configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::learning::DEFAULT_LEARNING_TIMEOUT;
use crate::types::ConfidenceInterval;

/// Method used to produce a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionMethod {
    /// Single sample carried forward
    Simple,
    /// Weighted average of the most recent samples
    MovingAverage,
    /// Ordinary least-squares fit against the sample index
    LinearTrend,
    /// Pattern-store adjusted projection
    HyperspellPattern,
}

impl std::fmt::Display for PredictionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PredictionMethod::Simple => write!(f, "simple"),
            PredictionMethod::MovingAverage => write!(f, "moving_average"),
            PredictionMethod::LinearTrend => write!(f, "linear_trend"),
            PredictionMethod::HyperspellPattern => write!(f, "hyperspell_pattern"),
        }
    }
}

/// Direction of the spend trend behind a monthly projection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    /// Average per-period growth above the threshold
    Increasing,
    /// Average per-period decline below the threshold
    Decreasing,
    /// Movement within the threshold band
    Stable,
}

/// Next-week cost prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostPrediction {
    /// Predicted weekly cost, rounded to cents
    pub predicted: f64,
    /// Uncertainty band around the prediction
    pub confidence_interval: ConfidenceInterval,
    /// How the prediction was produced
    pub methodology: PredictionMethod,
}

/// Extrapolated monthly cost
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyCostProjection {
    /// Projected monthly cost, rounded to cents
    pub projected: f64,
    /// Uncertainty band around the projection
    pub confidence_interval: ConfidenceInterval,
    /// Spend trend over the supplied history
    pub trend_direction: TrendDirection,
}

/// Projection engine configuration
#[derive(Debug, Clone)]
pub struct ProjectionConfig {
    /// Budget for a single learning-store accuracy lookup
    pub learning_timeout: Duration,
    /// How many top services feed the accuracy adjustment
    pub adjustment_service_count: usize,
    /// Per-period growth rate beyond which the trend is not stable
    pub trend_threshold: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            learning_timeout: DEFAULT_LEARNING_TIMEOUT,
            adjustment_service_count: 3,
            trend_threshold: 0.05,
        }
    }
}

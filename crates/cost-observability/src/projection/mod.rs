//! Spend projection with quantified uncertainty
//!
//! Predicts next-week cost from the weekly history and extrapolates a
//! monthly projection, optionally rescaled by learning-store estimate
//! accuracy. Method selection depends only on how much history exists.

mod engine;
mod types;

pub use engine::CostProjectionEngine;
pub use types::{
    CostPrediction, MonthlyCostProjection, PredictionMethod, ProjectionConfig, TrendDirection,
};

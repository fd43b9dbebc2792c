//! Cost projection engine

use statistical::{mean, population_standard_deviation};
use std::sync::Arc;
use tracing::{debug, info};

use super::types::{
    CostPrediction, MonthlyCostProjection, PredictionMethod, ProjectionConfig, TrendDirection,
};
use crate::error::{CostObservabilityError, CostObservabilityResult};
use crate::learning::{lookup_estimate_accuracy, LearningStore};
use crate::types::{ConfidenceInterval, CostSummary};

/// Average weeks per month used for monthly extrapolation
const WEEKS_PER_MONTH: f64 = 4.33;

/// Moving-average weights, most recent sample first
const WEIGHTS_TWO: [f64; 2] = [0.6, 0.4];
const WEIGHTS_THREE: [f64; 3] = [0.5, 0.3, 0.2];

/// Fixed interval width for a single-sample prediction
const SIMPLE_INTERVAL_RATIO: f64 = 0.15;
/// Fixed interval width for a short-history monthly baseline
const BASELINE_INTERVAL_RATIO: f64 = 0.10;

fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Projects future spend from the weekly cost history
pub struct CostProjectionEngine {
    config: ProjectionConfig,
    learning: Option<Arc<dyn LearningStore>>,
}

impl CostProjectionEngine {
    /// Create an engine with the given config
    pub fn new(config: ProjectionConfig) -> Self {
        Self {
            config,
            learning: None,
        }
    }

    /// Attach a learning store used to rescale monthly projections by
    /// historical estimate accuracy
    pub fn with_learning_store(mut self, learning: Arc<dyn LearningStore>) -> Self {
        self.learning = Some(learning);
        self
    }

    /// Predict next week's total cost from the weekly history
    ///
    /// The method is chosen by sample count: one sample is carried forward
    /// (±15%), two or three use a fixed-weight moving average, four or more
    /// use an ordinary least-squares trend. Intervals for the latter two
    /// are ± the population standard deviation of the raw samples.
    pub fn predict_next_week(
        &self,
        history: &[CostSummary],
    ) -> CostObservabilityResult<CostPrediction> {
        if history.is_empty() {
            return Err(CostObservabilityError::InvalidInput {
                reason: "cost history must not be empty".to_string(),
            });
        }

        let totals: Vec<f64> = history.iter().map(|week| week.total_current_week).collect();

        let prediction = match totals.len() {
            1 => {
                let value = totals[0];
                CostPrediction {
                    predicted: round_currency(value),
                    confidence_interval: ConfidenceInterval {
                        low: round_currency(value * (1.0 - SIMPLE_INTERVAL_RATIO)),
                        high: round_currency(value * (1.0 + SIMPLE_INTERVAL_RATIO)),
                    },
                    methodology: PredictionMethod::Simple,
                }
            }
            2 | 3 => {
                let weights: &[f64] = if totals.len() == 2 {
                    &WEIGHTS_TWO
                } else {
                    &WEIGHTS_THREE
                };
                let predicted: f64 = weights
                    .iter()
                    .enumerate()
                    .map(|(offset, weight)| weight * totals[totals.len() - 1 - offset])
                    .sum();
                let std_dev = population_standard_deviation(&totals, None);
                CostPrediction {
                    predicted: round_currency(predicted),
                    confidence_interval: ConfidenceInterval {
                        low: round_currency(predicted - std_dev),
                        high: round_currency(predicted + std_dev),
                    },
                    methodology: PredictionMethod::MovingAverage,
                }
            }
            _ => {
                let (intercept, slope) = fit_linear_trend(&totals);
                let predicted = (intercept + slope * totals.len() as f64).max(0.0);
                let std_dev = population_standard_deviation(&totals, None);
                CostPrediction {
                    predicted: round_currency(predicted),
                    confidence_interval: ConfidenceInterval {
                        low: round_currency(predicted - std_dev),
                        high: round_currency(predicted + std_dev),
                    },
                    methodology: PredictionMethod::LinearTrend,
                }
            }
        };

        info!(
            samples = totals.len(),
            methodology = %prediction.methodology,
            predicted = prediction.predicted,
            "next-week prediction generated"
        );

        Ok(prediction)
    }

    /// Extrapolate a monthly cost from the latest weekly figure
    ///
    /// With fewer than two history samples the baseline is returned as
    /// stable with a ±10% band. Otherwise the average per-period growth
    /// rate over the full history scales the baseline, the learning store
    /// may rescale it further, and the band is ± the population standard
    /// deviation of the historical totals.
    pub async fn project_monthly_cost(
        &self,
        current_week_cost: f64,
        history: &[CostSummary],
    ) -> MonthlyCostProjection {
        let baseline = current_week_cost * WEEKS_PER_MONTH;

        if history.len() < 2 {
            return MonthlyCostProjection {
                projected: round_currency(baseline),
                confidence_interval: ConfidenceInterval {
                    low: round_currency(baseline * (1.0 - BASELINE_INTERVAL_RATIO)),
                    high: round_currency(baseline * (1.0 + BASELINE_INTERVAL_RATIO)),
                },
                trend_direction: TrendDirection::Stable,
            };
        }

        let totals: Vec<f64> = history.iter().map(|week| week.total_current_week).collect();
        let oldest = totals[0];
        let newest = totals[totals.len() - 1];
        let growth_rate = if oldest > 0.0 {
            ((newest - oldest) / oldest) / (totals.len() - 1) as f64
        } else {
            0.0
        };

        let trend_direction = if growth_rate > self.config.trend_threshold {
            TrendDirection::Increasing
        } else if growth_rate < -self.config.trend_threshold {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        };

        let mut projected = baseline * (1.0 + growth_rate);

        if let Some(variance_percent) = self.estimate_variance_adjustment(history).await {
            debug!(
                variance_percent,
                "rescaling monthly projection by historical estimate accuracy"
            );
            projected *= 1.0 + variance_percent / 100.0;
        }

        let std_dev = population_standard_deviation(&totals, Some(mean(&totals)));

        MonthlyCostProjection {
            projected: round_currency(projected),
            confidence_interval: ConfidenceInterval {
                low: round_currency(projected - std_dev),
                high: round_currency(projected + std_dev),
            },
            trend_direction,
        }
    }

    /// Cost-weighted average estimate variance across the top services of
    /// the newest history entry
    ///
    /// Services with zero samples are skipped. Any store failure or timeout
    /// abandons the adjustment entirely; it is a pure enrichment.
    async fn estimate_variance_adjustment(&self, history: &[CostSummary]) -> Option<f64> {
        let store = self.learning.as_ref()?;
        let latest = history.last()?;

        let mut weighted_variance = 0.0;
        let mut total_weight = 0.0;

        for service in latest
            .top_services
            .iter()
            .take(self.config.adjustment_service_count)
        {
            match lookup_estimate_accuracy(
                store,
                &service.service,
                "aws_service",
                self.config.learning_timeout,
            )
            .await
            {
                Ok(Some(record)) if record.sample_size > 0 => {
                    weighted_variance += record.avg_variance_percent * service.current_week_cost;
                    total_weight += service.current_week_cost;
                }
                Ok(_) => {}
                Err(()) => return None,
            }
        }

        (total_weight > 0.0).then(|| weighted_variance / total_weight)
    }
}

/// Ordinary least-squares fit of cost against the 0-based sample index
fn fit_linear_trend(values: &[f64]) -> (f64, f64) {
    let x_values: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    let x_mean = mean(&x_values);
    let y_mean = mean(values);

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (x, y) in x_values.iter().zip(values) {
        numerator += (x - x_mean) * (y - y_mean);
        denominator += (x - x_mean).powi(2);
    }

    let slope = if denominator != 0.0 {
        numerator / denominator
    } else {
        0.0
    };
    (y_mean - slope * x_mean, slope)
}

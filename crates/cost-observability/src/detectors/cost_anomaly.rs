//! Cost anomaly detection over weekly spend summaries
//!
//! Eight independent rules, all simultaneously eligible to fire in one run.
//! Each rule embeds its numeric evidence in the flag description and
//! metadata so the flag is self-explanatory without re-querying the data.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use statistical::{mean, population_standard_deviation};
use std::time::Instant;
use tracing::info;

use super::Detector;
use crate::types::{
    CostSummary, DetectionInput, DetectionMetadata, DetectorOutput, FlagCategory, RedFlag, Severity,
};

const DETECTOR_ID: &str = "cost-anomaly-detector";
const DETECTOR_VERSION: &str = "1.0.0";

/// Cost anomaly detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostAnomalyConfig {
    /// Whether the detector runs at all
    pub enabled: bool,
    /// Week-over-week increase threshold, percent
    pub week_over_week_increase_percent: f64,
    /// Share of total spend above which one service is flagged, 0..1
    pub concentration_ratio: f64,
    /// Weekly cost above which a brand-new service is flagged
    pub new_service_cost_threshold: f64,
    /// Monthly budget limit; the budget projection rule is skipped when unset
    pub monthly_budget_limit: Option<f64>,
}

impl Default for CostAnomalyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            week_over_week_increase_percent: 20.0,
            concentration_ratio: 0.70,
            new_service_cost_threshold: 20.0,
            monthly_budget_limit: None,
        }
    }
}

/// Detects unexpected movement in weekly cloud spend
pub struct CostAnomalyDetector {
    config: CostAnomalyConfig,
}

impl CostAnomalyDetector {
    /// Create a detector with the given config
    pub fn new(config: CostAnomalyConfig) -> Self {
        Self { config }
    }

    /// Rule 1: overall week-over-week increase above the threshold
    fn check_overall_increase(&self, summary: &CostSummary) -> Option<RedFlag> {
        let threshold = self.config.week_over_week_increase_percent;
        if summary.total_change_percent <= threshold {
            return None;
        }

        let severity = if summary.total_change_percent > 2.0 * threshold {
            Severity::Critical
        } else {
            Severity::Warning
        };

        let mut flag = RedFlag::new(
            FlagCategory::CostAnomaly,
            severity,
            "Overall weekly cost increase",
            format!(
                "Total weekly cost rose {:.2}% (${:.2} -> ${:.2}), above the {:.0}% threshold",
                summary.total_change_percent,
                summary.total_previous_week,
                summary.total_current_week,
                threshold
            ),
        );
        flag.metadata.insert("change_percent".to_string(), json!(summary.total_change_percent));
        flag.metadata.insert("threshold_percent".to_string(), json!(threshold));
        flag.metadata.insert("previous_week_cost".to_string(), json!(summary.total_previous_week));
        flag.metadata.insert("current_week_cost".to_string(), json!(summary.total_current_week));
        Some(flag)
    }

    /// Rule 2: the same increase rule applied per service
    fn check_service_increases(&self, summary: &CostSummary) -> Vec<RedFlag> {
        let threshold = self.config.week_over_week_increase_percent;
        summary
            .top_services
            .iter()
            .filter(|service| service.change_percent > threshold)
            .map(|service| {
                let severity = if service.change_percent > 2.0 * threshold {
                    Severity::Critical
                } else {
                    Severity::Warning
                };
                let mut flag = RedFlag::new(
                    FlagCategory::CostAnomaly,
                    severity,
                    format!("Cost increase in {}", service.service),
                    format!(
                        "{} cost rose {:.2}% (${:.2} -> ${:.2}), above the {:.0}% threshold",
                        service.service,
                        service.change_percent,
                        service.previous_week_cost,
                        service.current_week_cost,
                        threshold
                    ),
                );
                flag.metadata.insert("service".to_string(), json!(service.service));
                flag.metadata.insert("change_percent".to_string(), json!(service.change_percent));
                flag.metadata.insert("threshold_percent".to_string(), json!(threshold));
                flag
            })
            .collect()
    }

    /// Rule 3: one service carrying most of the total spend
    fn check_service_concentration(&self, summary: &CostSummary) -> Vec<RedFlag> {
        if summary.total_current_week <= 0.0 {
            return Vec::new();
        }

        summary
            .top_services
            .iter()
            .filter_map(|service| {
                let share = service.current_week_cost / summary.total_current_week;
                if share <= self.config.concentration_ratio {
                    return None;
                }
                let mut flag = RedFlag::new(
                    FlagCategory::CostAnomaly,
                    Severity::Warning,
                    format!("{} dominates weekly spend", service.service),
                    format!(
                        "{} accounts for {:.1}% of this week's ${:.2} total, above the {:.0}% \
                         concentration threshold; possible over-provisioning or misconfiguration",
                        service.service,
                        share * 100.0,
                        summary.total_current_week,
                        self.config.concentration_ratio * 100.0
                    ),
                );
                flag.metadata.insert("service".to_string(), json!(service.service));
                flag.metadata.insert("share_percent".to_string(), json!(share * 100.0));
                flag.metadata.insert(
                    "threshold_percent".to_string(),
                    json!(self.config.concentration_ratio * 100.0),
                );
                Some(flag)
            })
            .collect()
    }

    /// Rule 4: a service that did not exist last week and already costs real money
    fn check_new_services(&self, summary: &CostSummary) -> Vec<RedFlag> {
        summary
            .top_services
            .iter()
            .filter(|service| {
                service.previous_week_cost == 0.0
                    && service.current_week_cost > self.config.new_service_cost_threshold
            })
            .map(|service| {
                let mut flag = RedFlag::new(
                    FlagCategory::CostAnomaly,
                    Severity::Info,
                    format!("New service: {}", service.service),
                    format!(
                        "{} appeared this week at ${:.2} (${:.2}/month projected) with no \
                         spend last week",
                        service.service, service.current_week_cost, service.monthly_projection
                    ),
                );
                flag.metadata.insert("service".to_string(), json!(service.service));
                flag.metadata
                    .insert("current_week_cost".to_string(), json!(service.current_week_cost));
                flag.metadata.insert(
                    "threshold_cost".to_string(),
                    json!(self.config.new_service_cost_threshold),
                );
                flag
            })
            .collect()
    }

    /// Rule 5: monthly projection against the configured budget limit
    ///
    /// Skipped entirely when no budget limit is configured; an unset
    /// threshold is not an error.
    fn check_budget_projection(&self, summary: &CostSummary) -> Option<RedFlag> {
        let limit = self.config.monthly_budget_limit?;
        if summary.monthly_projection <= limit {
            return None;
        }

        let overage = summary.monthly_projection - limit;
        let severity = if overage > 0.20 * limit {
            Severity::Critical
        } else {
            Severity::Warning
        };

        let mut flag = RedFlag::new(
            FlagCategory::CostAnomaly,
            severity,
            "Projected monthly cost over budget",
            format!(
                "Monthly projection ${:.2} exceeds the ${:.2} budget by ${:.2} ({:.1}% over)",
                summary.monthly_projection,
                limit,
                overage,
                overage / limit * 100.0
            ),
        );
        flag.metadata.insert("monthly_projection".to_string(), json!(summary.monthly_projection));
        flag.metadata.insert("budget_limit".to_string(), json!(limit));
        flag.metadata.insert("overage".to_string(), json!(overage));
        Some(flag)
    }

    /// Rule 6: remaining budget already negative or nearly gone
    fn check_budget_remaining(&self, summary: &CostSummary) -> Option<RedFlag> {
        let limit = summary.budget_limit?;
        let remaining = summary.budget_remaining?;

        if remaining < 0.0 {
            let mut flag = RedFlag::new(
                FlagCategory::CostAnomaly,
                Severity::Critical,
                "Budget exceeded",
                format!(
                    "Budget of ${:.2} exceeded: ${:.2} over the limit",
                    limit, -remaining
                ),
            );
            flag.metadata.insert("budget_limit".to_string(), json!(limit));
            flag.metadata.insert("budget_remaining".to_string(), json!(remaining));
            return Some(flag);
        }

        if remaining < 0.10 * limit {
            let mut flag = RedFlag::new(
                FlagCategory::CostAnomaly,
                Severity::Warning,
                "Budget nearly exhausted",
                format!(
                    "Only ${:.2} of the ${:.2} budget remains ({:.1}%)",
                    remaining,
                    limit,
                    remaining / limit * 100.0
                ),
            );
            flag.metadata.insert("budget_limit".to_string(), json!(limit));
            flag.metadata.insert("budget_remaining".to_string(), json!(remaining));
            return Some(flag);
        }

        None
    }

    /// Rule 7: current week as a z-score against the historical totals
    ///
    /// Skipped without history, or when the history has zero variance and
    /// no z-score can be quantified. The zero-variance skip is deliberate:
    /// a single historical sample (or identical samples) would otherwise
    /// divide by zero and flag every non-equal week as an infinite-sigma
    /// spike.
    fn check_statistical_spike(
        &self,
        summary: &CostSummary,
        history: &[CostSummary],
    ) -> Option<RedFlag> {
        if history.is_empty() {
            return None;
        }

        let totals: Vec<f64> = history.iter().map(|week| week.total_current_week).collect();
        let avg = mean(&totals);
        let std_dev = population_standard_deviation(&totals, Some(avg));
        if std_dev <= 0.0 {
            return None;
        }

        let deviation = (summary.total_current_week - avg) / std_dev;
        if deviation <= 2.0 {
            return None;
        }

        let severity = if deviation > 3.0 {
            Severity::Critical
        } else {
            Severity::Warning
        };

        let mut flag = RedFlag::new(
            FlagCategory::CostAnomaly,
            severity,
            "Statistical cost spike",
            format!(
                "This week's ${:.2} is {:.1} standard deviations above the {}-week mean of ${:.2}",
                summary.total_current_week,
                deviation,
                history.len(),
                avg
            ),
        );
        flag.metadata.insert("z_score".to_string(), json!(deviation));
        flag.metadata.insert("historical_mean".to_string(), json!(avg));
        flag.metadata.insert("historical_std_dev".to_string(), json!(std_dev));
        flag.metadata.insert("sample_count".to_string(), json!(history.len()));
        Some(flag)
    }

    /// Rule 8: weekly totals strictly increasing across the recent window
    ///
    /// The window is the last 5 points of history plus the current week,
    /// clamped to what is available; it fires only with at least 4 points.
    fn check_sustained_increase(
        &self,
        summary: &CostSummary,
        history: &[CostSummary],
    ) -> Option<RedFlag> {
        let mut totals: Vec<f64> = history.iter().map(|week| week.total_current_week).collect();
        totals.push(summary.total_current_week);
        if totals.len() < 4 {
            return None;
        }

        let window = &totals[totals.len().saturating_sub(5)..];
        let strictly_increasing = window.windows(2).all(|pair| pair[1] > pair[0]);
        if !strictly_increasing {
            return None;
        }

        let first = window[0];
        let last = window[window.len() - 1];
        if first <= 0.0 {
            return None;
        }

        let total_increase_percent = (last - first) / first * 100.0;
        let severity = if total_increase_percent > 50.0 {
            Severity::Warning
        } else {
            Severity::Info
        };

        let mut flag = RedFlag::new(
            FlagCategory::CostAnomaly,
            severity,
            "Steadily increasing weekly costs",
            format!(
                "Weekly cost has risen every week for {} weeks, up {:.1}% overall \
                 (${:.2} -> ${:.2})",
                window.len(),
                total_increase_percent,
                first,
                last
            ),
        );
        flag.metadata.insert("window_weeks".to_string(), json!(window.len()));
        flag.metadata.insert("total_increase_percent".to_string(), json!(total_increase_percent));
        flag.metadata.insert("first_week_cost".to_string(), json!(first));
        flag.metadata.insert("last_week_cost".to_string(), json!(last));
        Some(flag)
    }
}

#[async_trait]
impl Detector for CostAnomalyDetector {
    fn id(&self) -> &str {
        DETECTOR_ID
    }

    fn version(&self) -> &str {
        DETECTOR_VERSION
    }

    fn category(&self) -> FlagCategory {
        FlagCategory::CostAnomaly
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    async fn detect(&self, input: &DetectionInput) -> DetectorOutput {
        if !self.config.enabled {
            return DetectorOutput::disabled(DETECTOR_ID, DETECTOR_VERSION);
        }

        let started = Instant::now();
        let summary = &input.cost_data;
        let history = &input.historical_data;

        let mut red_flags = Vec::new();
        red_flags.extend(self.check_overall_increase(summary));
        red_flags.extend(self.check_service_increases(summary));
        red_flags.extend(self.check_service_concentration(summary));
        red_flags.extend(self.check_new_services(summary));
        red_flags.extend(self.check_budget_projection(summary));
        red_flags.extend(self.check_budget_remaining(summary));
        red_flags.extend(self.check_statistical_spike(summary, history));
        red_flags.extend(self.check_sustained_increase(summary, history));

        info!(
            deployment = %input.deployment_id,
            flags = red_flags.len(),
            "cost anomaly detection complete"
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

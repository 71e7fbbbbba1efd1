use serde_json::json;
use uuid::Uuid;

use crate::config::DetectorConfig;
use crate::types::{Evidence, EvidenceKind, Finding, FindingFamily};
use super::{values_of, Detector, DetectorInput};

/// Pearson correlation between the primary series and a paired secondary
/// series. Emits one finding when the coefficient clears the threshold.
/// Mismatched lengths, short series, and zero-variance input all yield
/// an empty result.
pub struct CorrelationDetector {
    threshold: f64,
}

impl CorrelationDetector {
    pub fn new(config: &DetectorConfig) -> Self {
        Self { threshold: config.correlation_threshold }
    }

    /// Pearson correlation coefficient. None when either series has no
    /// variance (denominator would be zero).
    fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
        let n = xs.len() as f64;
        let mean_x = xs.iter().sum::<f64>() / n;
        let mean_y = ys.iter().sum::<f64>() / n;

        let mut cov = 0.0;
        let mut var_x = 0.0;
        let mut var_y = 0.0;
        for (x, y) in xs.iter().zip(ys) {
            let dx = x - mean_x;
            let dy = y - mean_y;
            cov += dx * dy;
            var_x += dx * dx;
            var_y += dy * dy;
        }

        let denom = (var_x * var_y).sqrt();
        if denom < 1e-10 { return None; }

        Some(cov / denom)
    }
}

impl Detector for CorrelationDetector {
    fn name(&self) -> &str { "correlation" }

    fn family(&self) -> FindingFamily { FindingFamily::Correlation }

    fn detect(&self, input: &DetectorInput<'_>) -> Vec<Finding> {
        let Some(secondary) = input.secondary_samples else {
            return Vec::new();
        };
        let other_metric = input.secondary_metric.unwrap_or("paired series");

        if input.samples.len() != secondary.len() || input.samples.len() < 3 {
            return Vec::new();
        }

        let xs = values_of(input.samples);
        let ys = values_of(secondary);
        let Some(r) = Self::pearson(&xs, &ys) else {
            return Vec::new();
        };

        if r.abs() <= self.threshold {
            return Vec::new();
        }

        let strength = if r.abs() > 0.8 { "strong" } else { "moderate" };
        let direction = if r > 0.0 { "positive" } else { "negative" };

        vec![Finding {
            id: Uuid::new_v4(),
            family: FindingFamily::Correlation,
            description: format!(
                "{} {} correlation between {} and {} (r={:.2})",
                strength, direction, input.metric, other_metric, r
            ),
            metric: input.metric.to_string(),
            value: r,
            previous_value: None,
            change_percent: None,
            significance: r.abs(),
            evidence: vec![Evidence {
                kind: EvidenceKind::Correlation,
                description: "Pearson correlation coefficient".into(),
                value: r,
                confidence_interval: None,
                metadata: json!({
                    "r": r,
                    "samples": xs.len(),
                    "paired_with": other_metric,
                }),
            }],
            time_range: input.time_range,
        }]
    }
}

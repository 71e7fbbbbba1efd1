use serde_json::json;
use uuid::Uuid;

use crate::config::DetectorConfig;
use crate::types::{Evidence, EvidenceKind, Finding, FindingFamily};
use super::{values_of, Detector, DetectorInput};

/// Trend detection using ordinary least-squares linear regression over
/// the sample index. Emits one finding when the fitted slope is material
/// and the fit explains most of the variance.
pub struct TrendDetector {
    slope_threshold: f64,
    r_squared_threshold: f64,
}

impl TrendDetector {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            slope_threshold: config.trend_slope_threshold,
            r_squared_threshold: config.trend_r_squared_threshold,
        }
    }

    /// Perform simple linear regression with the sample index as x.
    /// Returns (slope, intercept, r_squared).
    fn linear_regression(ys: &[f64]) -> Option<(f64, f64, f64)> {
        let n = ys.len() as f64;
        if n < 2.0 { return None; }

        let sum_x: f64 = (0..ys.len()).map(|i| i as f64).sum();
        let sum_y: f64 = ys.iter().sum();
        let sum_xy: f64 = ys.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
        let sum_x2: f64 = (0..ys.len()).map(|i| (i as f64).powi(2)).sum();

        let denom = n * sum_x2 - sum_x * sum_x;
        if denom.abs() < 1e-10 { return None; }

        let slope = (n * sum_xy - sum_x * sum_y) / denom;
        let intercept = (sum_y - slope * sum_x) / n;

        // R-squared
        let ss_res: f64 = ys.iter().enumerate().map(|(i, y)| {
            let predicted = slope * i as f64 + intercept;
            (y - predicted).powi(2)
        }).sum();
        let mean_y = sum_y / n;
        let ss_tot: f64 = ys.iter().map(|y| (y - mean_y).powi(2)).sum();
        let r_squared = if ss_tot > 1e-10 { 1.0 - ss_res / ss_tot } else { 0.0 };

        Some((slope, intercept, r_squared))
    }
}

impl Detector for TrendDetector {
    fn name(&self) -> &str { "trend" }

    fn family(&self) -> FindingFamily { FindingFamily::Trend }

    fn detect(&self, input: &DetectorInput<'_>) -> Vec<Finding> {
        let values = values_of(input.samples);
        if values.len() < 3 {
            return Vec::new();
        }

        let Some((slope, intercept, r_squared)) = Self::linear_regression(&values) else {
            return Vec::new();
        };

        if slope.abs() <= self.slope_threshold || r_squared <= self.r_squared_threshold {
            return Vec::new();
        }

        let first = values[0];
        let change_percent = if first.abs() > 1e-10 {
            Some(slope * (values.len() - 1) as f64 / first * 100.0)
        } else {
            None
        };

        let direction = if slope > 0.0 { "increasing" } else { "decreasing" };
        vec![Finding {
            id: Uuid::new_v4(),
            family: FindingFamily::Trend,
            description: format!(
                "{} is {}: slope={:.3}/sample (R²={:.2})",
                input.metric, direction, slope, r_squared
            ),
            metric: input.metric.to_string(),
            value: slope,
            previous_value: Some(first),
            change_percent,
            significance: r_squared,
            evidence: vec![Evidence {
                kind: EvidenceKind::Regression,
                description: "Least-squares linear fit over the sample index".into(),
                value: r_squared,
                confidence_interval: None,
                metadata: json!({
                    "slope": slope,
                    "intercept": intercept,
                    "r_squared": r_squared,
                    "samples": values.len(),
                }),
            }],
            time_range: input.time_range,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::testutil::{input, series};

    fn detector() -> TrendDetector {
        TrendDetector::new(&DetectorConfig::default())
    }

    #[test]
    fn perfect_linear_sequence_yields_one_finding() {
        let values: Vec<f64> = (0..20).map(|i| 2.0 * i as f64 + 5.0).collect();
        let samples = series(&values);
        let findings = detector().detect(&input("cpu.usage", &samples));

        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.family, FindingFamily::Trend);
        assert!((f.value - 2.0).abs() < 1e-9);
        assert!((f.significance - 1.0).abs() < 1e-9);
        // change = slope * (n-1) / first * 100 = 2 * 19 / 5 * 100
        assert!((f.change_percent.unwrap() - 760.0).abs() < 1e-6);
    }

    #[test]
    fn constant_sequence_yields_nothing() {
        let samples = series(&[42.0; 10]);
        assert!(detector().detect(&input("cpu.usage", &samples)).is_empty());
    }

    #[test]
    fn shallow_slope_is_ignored() {
        let values: Vec<f64> = (0..20).map(|i| 0.05 * i as f64 + 10.0).collect();
        let samples = series(&values);
        assert!(detector().detect(&input("cpu.usage", &samples)).is_empty());
    }

    #[test]
    fn noisy_unfit_sequence_is_ignored() {
        // Large alternating swings: strong motion, terrible fit
        let values: Vec<f64> = (0..20)
            .map(|i| if i % 2 == 0 { 100.0 } else { 0.0 })
            .collect();
        let samples = series(&values);
        assert!(detector().detect(&input("cpu.usage", &samples)).is_empty());
    }

    #[test]
    fn too_few_samples_yields_nothing() {
        let samples = series(&[1.0, 5.0]);
        assert!(detector().detect(&input("cpu.usage", &samples)).is_empty());
    }

    #[test]
    fn zero_first_value_omits_change_percent() {
        let values: Vec<f64> = (0..10).map(|i| 3.0 * i as f64).collect();
        let samples = series(&values);
        let findings = detector().detect(&input("cpu.usage", &samples));
        assert_eq!(findings.len(), 1);
        assert!(findings[0].change_percent.is_none());
    }
}

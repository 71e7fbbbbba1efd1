use serde_json::json;
use uuid::Uuid;

use crate::config::DetectorConfig;
use crate::types::{Evidence, EvidenceKind, Finding, FindingFamily, TimeRange};
use super::{values_of, Detector, DetectorInput};

/// Outlier detection against the population mean.
/// Every sample deviating beyond `sigma` standard deviations is reported
/// independently; no clustering or deduplication.
pub struct AnomalyDetector {
    sigma: f64,
}

impl AnomalyDetector {
    pub fn new(config: &DetectorConfig) -> Self {
        Self { sigma: config.anomaly_sigma }
    }
}

impl Detector for AnomalyDetector {
    fn name(&self) -> &str { "anomaly" }

    fn family(&self) -> FindingFamily { FindingFamily::Anomaly }

    fn detect(&self, input: &DetectorInput<'_>) -> Vec<Finding> {
        let values = values_of(input.samples);
        if values.len() < 5 {
            return Vec::new();
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let stddev = variance.sqrt();

        if stddev < 1e-10 {
            return Vec::new(); // No variation
        }

        let threshold = self.sigma * stddev;
        let mut findings = Vec::new();

        for sample in input.samples {
            let deviation = (sample.value - mean).abs();
            if deviation <= threshold {
                continue;
            }

            let z_score = deviation / stddev;
            let significance = (z_score / 3.0).min(1.0);
            let change_percent = if mean.abs() > 1e-10 {
                Some((sample.value - mean) / mean * 100.0)
            } else {
                None
            };

            findings.push(Finding {
                id: Uuid::new_v4(),
                family: FindingFamily::Anomaly,
                description: format!(
                    "{} anomaly: value={:.2} deviates from mean={:.2} (z-score={:.2})",
                    input.metric, sample.value, mean, z_score
                ),
                metric: input.metric.to_string(),
                value: sample.value,
                previous_value: Some(mean),
                change_percent,
                significance,
                evidence: vec![Evidence {
                    kind: EvidenceKind::SignificanceTest,
                    description: "Deviation from population mean".into(),
                    value: z_score,
                    confidence_interval: None,
                    metadata: json!({
                        "mean": mean,
                        "stddev": stddev,
                        "threshold": threshold,
                    }),
                }],
                // The instant the outlier was observed
                time_range: TimeRange {
                    start: sample.timestamp,
                    end: sample.timestamp,
                },
            });
        }

        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::testutil::{input, series};

    fn detector() -> AnomalyDetector {
        AnomalyDetector::new(&DetectorConfig::default())
    }

    #[test]
    fn flags_exactly_the_injected_outlier() {
        let mut values = vec![100.0, 101.0, 99.0, 100.5, 99.5, 100.0, 100.2, 99.8];
        values.push(150.0);
        let samples = series(&values);
        let findings = detector().detect(&input("latency", &samples));

        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.value, 150.0);
        assert_eq!(f.family, FindingFamily::Anomaly);
        assert!(f.significance > 0.0 && f.significance <= 1.0);
        assert_eq!(f.time_range.start, f.time_range.end);
    }

    #[test]
    fn quiet_series_yields_nothing() {
        let samples = series(&[10.0, 10.1, 9.9, 10.0, 10.2, 9.8, 10.1]);
        assert!(detector().detect(&input("latency", &samples)).is_empty());
    }

    #[test]
    fn constant_series_yields_nothing() {
        let samples = series(&[7.0; 20]);
        assert!(detector().detect(&input("latency", &samples)).is_empty());
    }

    #[test]
    fn too_few_samples_yields_nothing() {
        let samples = series(&[1.0, 2.0, 100.0, 2.0]);
        assert!(detector().detect(&input("latency", &samples)).is_empty());
    }

    #[test]
    fn multiple_outliers_reported_independently() {
        let mut values = vec![50.0; 30];
        values[10] = 500.0;
        values[20] = -400.0;
        let samples = series(&values);
        let findings = detector().detect(&input("latency", &samples));
        assert_eq!(findings.len(), 2);
    }

    #[test]
    fn significance_caps_at_one() {
        let mut values = vec![10.0, 10.1, 9.9, 10.0, 10.1, 9.9, 10.0, 10.1];
        values.push(10_000.0);
        let samples = series(&values);
        let findings = detector().detect(&input("latency", &samples));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].significance, 1.0);
    }
}

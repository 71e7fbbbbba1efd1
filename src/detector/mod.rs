pub mod anomaly;
pub mod correlation;
pub mod prediction;
pub mod trend;

use crate::config::DetectorConfig;
use crate::types::{Finding, FindingFamily, Sample, TimeRange};

/// Input for one detection pass: the primary series plus an optional
/// secondary series for pairwise detectors.
pub struct DetectorInput<'a> {
    pub metric: &'a str,
    pub samples: &'a [Sample],
    pub secondary_metric: Option<&'a str>,
    pub secondary_samples: Option<&'a [Sample]>,
    pub time_range: TimeRange,
}

/// Trait for statistical detectors.
///
/// Detectors are pure and stateless: each examines the input series and
/// returns zero or more findings tagged with its family. Insufficient or
/// degenerate input yields an empty result, never an error.
pub trait Detector: Send + Sync {
    /// Human-readable name for this detector
    fn name(&self) -> &str;

    /// Family tag stamped on every finding this detector emits
    fn family(&self) -> FindingFamily;

    /// Run detection over the input series
    fn detect(&self, input: &DetectorInput<'_>) -> Vec<Finding>;
}

/// Create the full detector set
pub fn create_detectors(config: &DetectorConfig) -> Vec<Box<dyn Detector>> {
    let detectors: Vec<Box<dyn Detector>> = vec![
        Box::new(trend::TrendDetector::new(config)),
        Box::new(anomaly::AnomalyDetector::new(config)),
        Box::new(correlation::CorrelationDetector::new(config)),
        Box::new(prediction::PredictionDetector::new()),
    ];

    tracing::debug!(count = detectors.len(), "Initialized detectors");
    detectors
}

pub(crate) fn values_of(samples: &[Sample]) -> Vec<f64> {
    samples.iter().map(|s| s.value).collect()
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use smallvec::smallvec;

    /// Build a sample series with one-minute spacing
    pub fn series(values: &[f64]) -> Vec<Sample> {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &value)| Sample {
                timestamp: start + Duration::minutes(i as i64),
                value,
                labels: smallvec![],
            })
            .collect()
    }

    pub fn input<'a>(metric: &'a str, samples: &'a [Sample]) -> DetectorInput<'a> {
        let time_range = range_of(samples);
        DetectorInput {
            metric,
            samples,
            secondary_metric: None,
            secondary_samples: None,
            time_range,
        }
    }

    pub fn range_of(samples: &[Sample]) -> TimeRange {
        let start = samples
            .first()
            .map(|s| s.timestamp)
            .unwrap_or_else(|| Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap());
        let end = samples.last().map(|s| s.timestamp).unwrap_or(start);
        TimeRange { start, end }
    }
}

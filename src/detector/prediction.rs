use serde_json::json;
use uuid::Uuid;

use crate::types::{Evidence, EvidenceKind, Finding, FindingFamily};
use super::{values_of, Detector, DetectorInput};

/// Number of steps the moving-average base is extrapolated forward
const HORIZON: usize = 3;

/// Short-horizon forecast from a trailing moving average plus an
/// endpoint slope. A heuristic, not a calibrated model; the recorded
/// confidence interval is indicative only.
pub struct PredictionDetector;

impl PredictionDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PredictionDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for PredictionDetector {
    fn name(&self) -> &str { "prediction" }

    fn family(&self) -> FindingFamily { FindingFamily::Prediction }

    fn detect(&self, input: &DetectorInput<'_>) -> Vec<Finding> {
        let values = values_of(input.samples);
        let n = values.len();
        if n < 5 {
            return Vec::new();
        }

        let window = 5.min(n / 2);
        let average = values[n - window..].iter().sum::<f64>() / window as f64;

        let span = 10.min(n);
        let recent = &values[n - span..];
        let slope = (recent[recent.len() - 1] - recent[0]) / (span - 1) as f64;

        let predicted = average + slope * HORIZON as f64;
        let confidence = if average.abs() < 1e-10 {
            0.5
        } else {
            (1.0 - slope.abs() / average).clamp(0.5, 1.0)
        };

        let last = values[n - 1];
        let change_percent = if last.abs() > 1e-10 {
            Some((predicted - last) / last * 100.0)
        } else {
            None
        };

        vec![Finding {
            id: Uuid::new_v4(),
            family: FindingFamily::Prediction,
            description: format!(
                "{} projected to reach {:.2} within {} steps (current {:.2})",
                input.metric, predicted, HORIZON, last
            ),
            metric: input.metric.to_string(),
            value: predicted,
            previous_value: Some(last),
            change_percent,
            significance: confidence,
            evidence: vec![Evidence {
                kind: EvidenceKind::Regression,
                description: "Moving-average extrapolation".into(),
                value: predicted,
                confidence_interval: Some((predicted * 0.9, predicted * 1.1)),
                metadata: json!({
                    "window": window,
                    "slope": slope,
                    "base": average,
                    "horizon": HORIZON,
                }),
            }],
            time_range: input.time_range,
        }]
    }
}

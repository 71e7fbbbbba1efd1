use serde_json::json;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::types::{Finding, FindingFamily, Sample, Visualization, VisualizationKind};

/// Width of a value-distribution histogram bucket
const BUCKET_WIDTH: f64 = 10.0;

/// Render a finding group into chart-ready series.
///
/// A value-distribution histogram is always produced; a line chart is
/// added when the group contains a trend finding and a scatter plot when
/// it contains anomaly findings. Everything is rebuilt from scratch each
/// run.
pub fn build(metric: &str, samples: &[Sample], findings: &[Finding]) -> Vec<Visualization> {
    let mut visualizations = vec![histogram(metric, samples)];

    if findings.iter().any(|f| f.family == FindingFamily::Trend) {
        visualizations.push(line_chart(metric, samples, findings));
    }

    if findings.iter().any(|f| f.family == FindingFamily::Anomaly) {
        visualizations.push(scatter_plot(metric, samples, findings));
    }

    visualizations
}

fn histogram(metric: &str, samples: &[Sample]) -> Visualization {
    let mut buckets: BTreeMap<i64, usize> = BTreeMap::new();
    for sample in samples {
        let bucket = (sample.value / BUCKET_WIDTH).floor() as i64 * BUCKET_WIDTH as i64;
        *buckets.entry(bucket).or_default() += 1;
    }

    let insights = buckets
        .iter()
        .max_by_key(|(_, count)| **count)
        .map(|(bucket, count)| {
            vec![format!(
                "{} of {} values fall between {} and {}",
                count,
                samples.len(),
                bucket,
                bucket + BUCKET_WIDTH as i64
            )]
        })
        .unwrap_or_default();

    Visualization {
        id: Uuid::new_v4(),
        title: format!("{} value distribution", metric),
        description: "Histogram of sample values over the analyzed window".into(),
        kind: VisualizationKind::BarChart,
        data: buckets
            .into_iter()
            .map(|(bucket, count)| {
                json!({
                    "bucket_start": bucket,
                    "bucket_end": bucket + BUCKET_WIDTH as i64,
                    "count": count,
                })
            })
            .collect(),
        insights,
    }
}

fn line_chart(metric: &str, samples: &[Sample], findings: &[Finding]) -> Visualization {
    let insights = findings
        .iter()
        .filter(|f| f.family == FindingFamily::Trend)
        .map(|f| f.description.clone())
        .collect();

    Visualization {
        id: Uuid::new_v4(),
        title: format!("{} over time", metric),
        description: "Sample series with the detected trend".into(),
        kind: VisualizationKind::LineChart,
        data: samples
            .iter()
            .map(|s| {
                json!({
                    "timestamp": s.timestamp.to_rfc3339(),
                    "value": s.value,
                })
            })
            .collect(),
        insights,
    }
}

fn scatter_plot(metric: &str, samples: &[Sample], findings: &[Finding]) -> Visualization {
    // Anomaly findings carry the observation instant as their time range
    let anomalous: Vec<_> = findings
        .iter()
        .filter(|f| f.family == FindingFamily::Anomaly)
        .map(|f| f.time_range.start)
        .collect();

    let flagged = samples
        .iter()
        .filter(|s| anomalous.contains(&s.timestamp))
        .count();

    Visualization {
        id: Uuid::new_v4(),
        title: format!("{} anomalies", metric),
        description: "Each sample flagged as anomalous or not".into(),
        kind: VisualizationKind::ScatterPlot,
        data: samples
            .iter()
            .map(|s| {
                json!({
                    "timestamp": s.timestamp.to_rfc3339(),
                    "value": s.value,
                    "anomaly": anomalous.contains(&s.timestamp),
                })
            })
            .collect(),
        insights: vec![format!("{} of {} samples flagged", flagged, samples.len())],
    }
}

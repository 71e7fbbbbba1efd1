use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::types::{Finding, FindingFamily, Insight, InsightStatus, Severity, TimeRange};

/// Group one analysis pass's findings by family and assemble one insight
/// per non-empty group. Recommendations and visualizations are attached
/// by the caller afterwards.
pub fn synthesize(
    data_source: &str,
    time_range: TimeRange,
    findings: Vec<Finding>,
    now: DateTime<Utc>,
) -> Vec<Insight> {
    let mut groups: BTreeMap<FindingFamily, Vec<Finding>> = BTreeMap::new();
    for finding in findings {
        groups.entry(finding.family).or_default().push(finding);
    }

    groups
        .into_iter()
        .map(|(family, group)| {
            let (title, description) = insight_copy(family);
            Insight {
                id: Uuid::new_v4(),
                title: title.to_string(),
                description: description.to_string(),
                kind: family.into(),
                severity: severity_for(&group),
                status: InsightStatus::New,
                confidence: confidence_for(&group),
                data_source: data_source.to_string(),
                time_range,
                findings: group,
                recommendations: Vec::new(),
                visualizations: Vec::new(),
                tags: vec![family.to_string(), data_source.to_string()],
                created_at: now,
                updated_at: now,
            }
        })
        .collect()
}

/// Highest significance in the group decides the severity band
pub fn severity_for(findings: &[Finding]) -> Severity {
    if findings.iter().any(|f| f.significance > 0.8) {
        Severity::High
    } else if findings.iter().any(|f| f.significance > 0.6) {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Rounded mean of the group's significance scores, scaled to [0, 100]
pub fn confidence_for(findings: &[Finding]) -> u8 {
    if findings.is_empty() {
        return 0;
    }
    let mean =
        findings.iter().map(|f| f.significance).sum::<f64>() / findings.len() as f64;
    (mean * 100.0).round() as u8
}

fn insight_copy(family: FindingFamily) -> (&'static str, &'static str) {
    match family {
        FindingFamily::Trend => (
            "Sustained trend detected",
            "The analyzed series shows a consistent directional movement over the window.",
        ),
        FindingFamily::Anomaly => (
            "Anomalous values detected",
            "One or more samples deviate sharply from the series baseline.",
        ),
        FindingFamily::Correlation => (
            "Correlated behavior detected",
            "The analyzed series moves in step with its paired series.",
        ),
        FindingFamily::Prediction => (
            "Short-term projection",
            "An estimate of the series' near-term level based on recent samples.",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InsightKind;
    use chrono::TimeZone;

    fn finding(family: FindingFamily, significance: f64) -> Finding {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        Finding {
            id: Uuid::new_v4(),
            family,
            description: "test".into(),
            metric: "cpu.usage".into(),
            value: 1.0,
            previous_value: None,
            change_percent: None,
            significance,
            evidence: vec![],
            time_range: TimeRange { start: ts, end: ts },
        }
    }

    fn range() -> TimeRange {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        TimeRange { start: ts, end: ts }
    }

    #[test]
    fn one_insight_per_family() {
        let findings = vec![
            finding(FindingFamily::Trend, 0.9),
            finding(FindingFamily::Anomaly, 0.7),
            finding(FindingFamily::Anomaly, 0.5),
        ];
        let insights = synthesize("cpu", range(), findings, Utc::now());

        assert_eq!(insights.len(), 2);
        let kinds: Vec<InsightKind> = insights.iter().map(|i| i.kind).collect();
        assert!(kinds.contains(&InsightKind::Trend));
        assert!(kinds.contains(&InsightKind::Anomaly));
        assert!(insights.iter().all(|i| i.status == InsightStatus::New));
    }

    #[test]
    fn no_findings_means_no_insights() {
        assert!(synthesize("cpu", range(), vec![], Utc::now()).is_empty());
    }

    #[test]
    fn severity_bands() {
        assert_eq!(
            severity_for(&[finding(FindingFamily::Trend, 0.85)]),
            Severity::High
        );
        assert_eq!(
            severity_for(&[finding(FindingFamily::Trend, 0.7)]),
            Severity::Medium
        );
        assert_eq!(
            severity_for(&[finding(FindingFamily::Trend, 0.5)]),
            Severity::Low
        );
        // Boundaries are strict
        assert_eq!(
            severity_for(&[finding(FindingFamily::Trend, 0.8)]),
            Severity::Medium
        );
        assert_eq!(
            severity_for(&[finding(FindingFamily::Trend, 0.6)]),
            Severity::Low
        );
    }

    #[test]
    fn one_hot_finding_lifts_the_group() {
        let group = vec![
            finding(FindingFamily::Anomaly, 0.3),
            finding(FindingFamily::Anomaly, 0.95),
        ];
        assert_eq!(severity_for(&group), Severity::High);
    }

    #[test]
    fn confidence_is_rounded_mean_of_significance() {
        let group = vec![
            finding(FindingFamily::Anomaly, 0.6),
            finding(FindingFamily::Anomaly, 0.75),
        ];
        // mean = 0.675 -> 68
        assert_eq!(confidence_for(&group), 68);

        let insights = synthesize("cpu", range(), group, Utc::now());
        assert_eq!(insights[0].confidence, 68);
    }

    #[test]
    fn insight_carries_family_and_source_tags() {
        let insights = synthesize(
            "db.queries",
            range(),
            vec![finding(FindingFamily::Prediction, 0.9)],
            Utc::now(),
        );
        assert_eq!(insights[0].tags, vec!["prediction", "db.queries"]);
    }
}

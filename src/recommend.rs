use uuid::Uuid;

use crate::types::{
    Action, ActionStatus, Effort, Finding, FindingFamily, Recommendation, Severity,
};

/// Derive remediation recommendations from a finding group.
///
/// Rule-based: declining trends and anomalies each produce a fixed
/// recommendation shape; correlation and prediction findings have no
/// rules and contribute nothing.
pub fn build(findings: &[Finding]) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    for finding in findings {
        match finding.family {
            FindingFamily::Trend if finding.value < 0.0 => {
                recommendations.push(declining_trend(finding));
            }
            FindingFamily::Anomaly => {
                recommendations.push(anomaly(finding));
            }
            _ => {}
        }
    }

    recommendations
}

fn declining_trend(finding: &Finding) -> Recommendation {
    Recommendation {
        id: Uuid::new_v4(),
        title: format!("Investigate declining {}", finding.metric),
        description: format!(
            "{} has been falling steadily over the analyzed window; identify \
             the driver before the decline compounds.",
            finding.metric
        ),
        category: "performance".into(),
        priority: Severity::High,
        expected_impact: "Halt the decline and restore the previous baseline".into(),
        effort: Effort::Medium,
        timeline: "1-2 weeks".into(),
        actions: vec![
            action(
                "Run root-cause analysis",
                "Trace the decline to a deployment, load change, or dependency",
                Severity::High,
            ),
            action(
                "Review configuration",
                "Audit tuning parameters that influence this metric",
                Severity::Medium,
            ),
        ],
        related_findings: vec![finding.id],
    }
}

fn anomaly(finding: &Finding) -> Recommendation {
    let priority = if finding.significance > 0.8 {
        Severity::Critical
    } else {
        Severity::High
    };

    Recommendation {
        id: Uuid::new_v4(),
        title: format!("Investigate anomaly in {}", finding.metric),
        description: format!(
            "{} produced a value far outside its normal range; confirm whether \
             this reflects an incident or a data quality problem.",
            finding.metric
        ),
        category: "reliability".into(),
        priority,
        expected_impact: "Catch incidents before they escalate".into(),
        effort: Effort::Low,
        timeline: "This week".into(),
        actions: vec![
            action(
                "Investigate the cause",
                "Correlate the outlier with deployments, traffic, and upstream events",
                priority,
            ),
            action(
                "Add alerting",
                "Configure an alert on this metric's deviation band",
                Severity::Medium,
            ),
        ],
        related_findings: vec![finding.id],
    }
}

fn action(title: &str, description: &str, priority: Severity) -> Action {
    Action {
        id: Uuid::new_v4(),
        title: title.into(),
        description: description.into(),
        priority,
        status: ActionStatus::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimeRange;
    use chrono::{TimeZone, Utc};

    fn finding(family: FindingFamily, value: f64, significance: f64) -> Finding {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        Finding {
            id: Uuid::new_v4(),
            family,
            description: "test".into(),
            metric: "cpu.usage".into(),
            value,
            previous_value: None,
            change_percent: None,
            significance,
            evidence: vec![],
            time_range: TimeRange { start: ts, end: ts },
        }
    }

    #[test]
    fn rising_trend_produces_nothing() {
        let findings = [finding(FindingFamily::Trend, 2.0, 0.9)];
        assert!(build(&findings).is_empty());
    }

    #[test]
    fn declining_trend_produces_high_priority_with_two_actions() {
        let f = finding(FindingFamily::Trend, -1.5, 0.9);
        let recs = build(std::slice::from_ref(&f));

        assert_eq!(recs.len(), 1);
        let rec = &recs[0];
        assert_eq!(rec.priority, Severity::High);
        assert_eq!(rec.actions.len(), 2);
        assert!(rec.actions.iter().all(|a| a.status == ActionStatus::Pending));
        assert_eq!(rec.related_findings, vec![f.id]);
    }

    #[test]
    fn severe_anomaly_escalates_to_critical() {
        let recs = build(&[finding(FindingFamily::Anomaly, 500.0, 0.9)]);
        assert_eq!(recs[0].priority, Severity::Critical);
    }

    #[test]
    fn moderate_anomaly_stays_high() {
        let recs = build(&[finding(FindingFamily::Anomaly, 500.0, 0.7)]);
        assert_eq!(recs[0].priority, Severity::High);
        assert_eq!(recs[0].actions.len(), 2);
    }

    #[test]
    fn correlation_and_prediction_have_no_rules() {
        let findings = [
            finding(FindingFamily::Correlation, 0.95, 0.95),
            finding(FindingFamily::Prediction, 120.0, 0.9),
        ];
        assert!(build(&findings).is_empty());
    }

    #[test]
    fn each_matching_finding_gets_its_own_recommendation() {
        let findings = [
            finding(FindingFamily::Anomaly, 400.0, 0.9),
            finding(FindingFamily::Anomaly, 600.0, 0.5),
        ];
        let recs = build(&findings);
        assert_eq!(recs.len(), 2);
        assert_ne!(recs[0].related_findings, recs[1].related_findings);
    }
}

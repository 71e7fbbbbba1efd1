pub mod config;
pub mod detector;
pub mod engine;
pub mod notify;
pub mod recommend;
pub mod sched;
pub mod source;
pub mod store;
pub mod synthesis;
pub mod visualize;

/// Common types used across modules
pub mod types {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use smallvec::SmallVec;
    use std::collections::HashMap;
    use uuid::Uuid;

    /// A single metric measurement
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Sample {
        pub timestamp: DateTime<Utc>,
        pub value: f64,
        #[serde(default)]
        pub labels: SmallVec<[Label; 4]>,
    }

    /// A label key-value pair
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Label {
        pub key: String,
        pub value: String,
    }

    /// Inclusive time window an analysis covers
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct TimeRange {
        pub start: DateTime<Utc>,
        pub end: DateTime<Utc>,
    }

    /// Detector family a finding originates from.
    /// Tagged at creation time by the emitting detector.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum FindingFamily {
        Trend,
        Anomaly,
        Correlation,
        Prediction,
    }

    /// Quantitative trace backing a finding
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Evidence {
        pub kind: EvidenceKind,
        pub description: String,
        pub value: f64,
        pub confidence_interval: Option<(f64, f64)>,
        #[serde(default)]
        pub metadata: serde_json::Value,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum EvidenceKind {
        Regression,
        SignificanceTest,
        Correlation,
    }

    /// A single detector's observation about a sample sequence.
    /// Immutable once created.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Finding {
        pub id: Uuid,
        pub family: FindingFamily,
        pub description: String,
        pub metric: String,
        pub value: f64,
        pub previous_value: Option<f64>,
        pub change_percent: Option<f64>,
        /// Detector-specific strength score in [0, 1]
        pub significance: f64,
        pub evidence: Vec<Evidence>,
        pub time_range: TimeRange,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum InsightKind {
        Trend,
        Anomaly,
        Correlation,
        Prediction,
        Optimization,
    }

    /// Severity levels for insights, recommendations, and notifications
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Severity {
        Low,
        Medium,
        High,
        Critical,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum InsightStatus {
        New,
        Acknowledged,
        Resolved,
        Dismissed,
    }

    /// Severity-scored grouping of related findings, the unit presented to users
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Insight {
        pub id: Uuid,
        pub title: String,
        pub description: String,
        pub kind: InsightKind,
        pub severity: Severity,
        pub status: InsightStatus,
        /// Rounded mean of the findings' significance, scaled to [0, 100]
        pub confidence: u8,
        pub data_source: String,
        pub time_range: TimeRange,
        pub findings: Vec<Finding>,
        pub recommendations: Vec<Recommendation>,
        pub visualizations: Vec<Visualization>,
        pub tags: Vec<String>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    impl Insight {
        /// Resolve a finding by id within this insight. Weak reference
        /// lookup; absence is not an error.
        pub fn finding_by_id(&self, id: Uuid) -> Option<&Finding> {
            self.findings.iter().find(|f| f.id == id)
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Recommendation {
        pub id: Uuid,
        pub title: String,
        pub description: String,
        pub category: String,
        pub priority: Severity,
        pub expected_impact: String,
        pub effort: Effort,
        pub timeline: String,
        pub actions: Vec<Action>,
        /// Finding ids within the owning insight; lookup keys, not ownership
        pub related_findings: Vec<Uuid>,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Effort {
        Low,
        Medium,
        High,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Action {
        pub id: Uuid,
        pub title: String,
        pub description: String,
        pub priority: Severity,
        pub status: ActionStatus,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ActionStatus {
        Pending,
        InProgress,
        Done,
    }

    /// Chart-ready data series derived from one analysis run.
    /// Rebuilt from scratch each run, never updated incrementally.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Visualization {
        pub id: Uuid,
        pub title: String,
        pub description: String,
        pub kind: VisualizationKind,
        pub data: Vec<serde_json::Value>,
        pub insights: Vec<String>,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum VisualizationKind {
        LineChart,
        ScatterPlot,
        BarChart,
    }

    /// Entry in the bounded notification log
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Notification {
        pub id: Uuid,
        /// May dangle once the retention sweeper purges the insight
        pub insight_id: Uuid,
        pub title: String,
        pub message: String,
        pub severity: Severity,
        pub kind: NotificationKind,
        pub is_read: bool,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum NotificationKind {
        NewInsight,
        StatusChange,
    }

    /// Caller-supplied description of one analysis run
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct AnalysisRequest {
        pub data_source: String,
        pub time_range: TimeRange,
        /// Empty means "every kind enabled in the runtime config"
        #[serde(default)]
        pub analysis_kinds: Vec<InsightKind>,
        /// Second data source paired against the primary series by the
        /// correlation detector; absent skips correlation entirely
        #[serde(default)]
        pub correlate_with: Option<String>,
    }

    #[derive(Debug, Clone, Serialize)]
    pub struct AnalysisResult {
        pub insights: Vec<Insight>,
        pub samples_analyzed: usize,
        pub duration_ms: u64,
    }

    #[derive(Debug, Clone, Serialize)]
    pub struct InsightStatistics {
        pub total: usize,
        pub by_kind: HashMap<String, usize>,
        pub by_severity: HashMap<String, usize>,
        pub by_status: HashMap<String, usize>,
        pub average_confidence: f64,
    }

    impl From<FindingFamily> for InsightKind {
        fn from(family: FindingFamily) -> Self {
            match family {
                FindingFamily::Trend => InsightKind::Trend,
                FindingFamily::Anomaly => InsightKind::Anomaly,
                FindingFamily::Correlation => InsightKind::Correlation,
                FindingFamily::Prediction => InsightKind::Prediction,
            }
        }
    }

    impl std::fmt::Display for FindingFamily {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                FindingFamily::Trend => write!(f, "trend"),
                FindingFamily::Anomaly => write!(f, "anomaly"),
                FindingFamily::Correlation => write!(f, "correlation"),
                FindingFamily::Prediction => write!(f, "prediction"),
            }
        }
    }

    impl std::fmt::Display for InsightKind {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                InsightKind::Trend => write!(f, "trend"),
                InsightKind::Anomaly => write!(f, "anomaly"),
                InsightKind::Correlation => write!(f, "correlation"),
                InsightKind::Prediction => write!(f, "prediction"),
                InsightKind::Optimization => write!(f, "optimization"),
            }
        }
    }

    impl std::fmt::Display for Severity {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Severity::Low => write!(f, "low"),
                Severity::Medium => write!(f, "medium"),
                Severity::High => write!(f, "high"),
                Severity::Critical => write!(f, "critical"),
            }
        }
    }

    impl std::fmt::Display for InsightStatus {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                InsightStatus::New => write!(f, "new"),
                InsightStatus::Acknowledged => write!(f, "acknowledged"),
                InsightStatus::Resolved => write!(f, "resolved"),
                InsightStatus::Dismissed => write!(f, "dismissed"),
            }
        }
    }
}

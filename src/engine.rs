use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::config::{AnalysisConfig, AnalysisConfigPatch, EngineConfig};
use crate::detector::{create_detectors, Detector, DetectorInput};
use crate::notify::Notifier;
use crate::recommend;
use crate::source::SampleSource;
use crate::store::InsightStore;
use crate::synthesis;
use crate::types::{
    AnalysisRequest, AnalysisResult, Insight, InsightKind, InsightStatistics,
    InsightStatus, Notification,
};
use crate::visualize;

/// Time source injected into the engine for deterministic tests
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The pipeline failed; no partial results were persisted or returned
    #[error("analysis failed: {0}")]
    Analysis(anyhow::Error),
    #[error("export failed: {0}")]
    Export(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unknown export format: {}", other)),
        }
    }
}

/// The analysis engine.
///
/// Owns the detector set and the injected store, sample source, and
/// clock. Hosts construct one and share it behind an `Arc`; every store
/// mutation is serialized by the store's own lock.
pub struct Engine {
    store: InsightStore,
    source: Box<dyn SampleSource>,
    notifier: Notifier,
    detectors: Vec<Box<dyn Detector>>,
    defaults: AnalysisConfig,
    clock: Arc<dyn Clock>,
}

impl Engine {
    pub fn new(config: &EngineConfig, source: Box<dyn SampleSource>) -> Self {
        let store = InsightStore::open(&config.engine.data_dir);
        Self::with_store(config, source, store)
    }

    /// Construct over a caller-provided store (tests, embedded hosts)
    pub fn with_store(
        config: &EngineConfig,
        source: Box<dyn SampleSource>,
        store: InsightStore,
    ) -> Self {
        let notifier = Notifier::new(&config.notify, store.clone());
        Self {
            store,
            source,
            notifier,
            detectors: create_detectors(&config.detector),
            defaults: config.analysis.clone(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &InsightStore {
        &self.store
    }

    /// Run one full analysis pass: fetch, detect, synthesize, enrich,
    /// persist, notify. Fails atomically; the caller sees either a
    /// complete result or an error with nothing persisted.
    pub async fn analyze_data(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisResult, EngineError> {
        let started = Instant::now();
        let config = self.analysis_config();
        let kinds = active_kinds(request, &config);

        let samples = self
            .source
            .fetch(&request.data_source, &request.time_range)
            .await
            .map_err(EngineError::Analysis)?;

        let secondary = match &request.correlate_with {
            Some(other) if kinds.contains(&InsightKind::Correlation) => Some(
                self.source
                    .fetch(other, &request.time_range)
                    .await
                    .map_err(EngineError::Analysis)?,
            ),
            _ => None,
        };

        let input = DetectorInput {
            metric: &request.data_source,
            samples: &samples,
            secondary_metric: request.correlate_with.as_deref(),
            secondary_samples: secondary.as_deref(),
            time_range: request.time_range,
        };

        let mut findings = Vec::new();
        for detector in &self.detectors {
            if !kinds.contains(&detector.family().into()) {
                continue;
            }
            let found = detector.detect(&input);
            tracing::debug!(
                detector = detector.name(),
                count = found.len(),
                data_source = %request.data_source,
                "Detection pass complete"
            );
            findings.extend(found);
        }

        let now = self.clock.now();
        let mut insights =
            synthesis::synthesize(&request.data_source, request.time_range, findings, now);
        for insight in &mut insights {
            insight.recommendations = recommend::build(&insight.findings);
            insight.visualizations =
                visualize::build(&request.data_source, &samples, &insight.findings);
        }

        let before = insights.len();
        insights.retain(|i| i.confidence >= config.min_confidence);
        if insights.len() < before {
            tracing::debug!(
                dropped = before - insights.len(),
                min_confidence = config.min_confidence,
                "Dropped low-confidence insights"
            );
        }

        self.store.save_insights(insights.clone());
        for insight in &insights {
            self.notifier
                .insight_created(insight, &config.notifications, now)
                .await;
        }

        tracing::info!(
            data_source = %request.data_source,
            insights = insights.len(),
            samples = samples.len(),
            "Analysis complete"
        );

        Ok(AnalysisResult {
            insights,
            samples_analyzed: samples.len(),
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    pub fn insights(&self) -> Vec<Insight> {
        self.store.insights()
    }

    pub fn insight_by_id(&self, id: Uuid) -> Option<Insight> {
        self.store.insight_by_id(id)
    }

    pub fn save_insights(&self, insights: Vec<Insight>) {
        self.store.save_insights(insights);
    }

    /// The single mutation entrypoint for insight transitions. Stamps
    /// `updated_at` and logs a status-change notification.
    pub async fn update_insight_status(
        &self,
        id: Uuid,
        status: InsightStatus,
    ) -> Option<Insight> {
        let now = self.clock.now();
        let updated = self.store.update_insight_status(id, status, now)?;
        let config = self.analysis_config();
        self.notifier
            .status_changed(&updated, status, &config.notifications, now)
            .await;
        Some(updated)
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.store.notifications()
    }

    /// Append directly to the bounded notification log
    pub fn create_notification(&self, notification: Notification) {
        self.store.create_notification(notification);
    }

    pub fn mark_notification_read(&self, id: Uuid) -> bool {
        self.store.mark_notification_read(id)
    }

    /// Runtime config: the persisted copy when one exists, otherwise the
    /// file-seeded defaults
    pub fn analysis_config(&self) -> AnalysisConfig {
        self.store
            .analysis_config()
            .unwrap_or_else(|| self.defaults.clone())
    }

    pub fn update_analysis_config(&self, patch: AnalysisConfigPatch) -> AnalysisConfig {
        let mut config = self.analysis_config();
        config.apply(patch);
        self.store.save_analysis_config(config.clone());
        config
    }

    /// Purge insights and notifications past their retention windows.
    /// Idempotent; safe to call repeatedly.
    pub fn cleanup_expired_data(&self) {
        let config = self.analysis_config();
        let (insights, notifications) = self
            .store
            .cleanup_expired(self.clock.now(), &config.retention);
        if insights > 0 || notifications > 0 {
            tracing::info!(insights, notifications, "Purged expired records");
        }
    }

    pub fn export_insights(&self, format: ExportFormat) -> Result<String, EngineError> {
        let insights = self.store.insights();
        match format {
            ExportFormat::Json => serde_json::to_string_pretty(&insights)
                .map_err(|e| EngineError::Export(e.to_string())),
            ExportFormat::Csv => export_csv(&insights),
        }
    }

    pub fn insight_statistics(&self) -> InsightStatistics {
        let insights = self.store.insights();
        let mut by_kind: HashMap<String, usize> = HashMap::new();
        let mut by_severity: HashMap<String, usize> = HashMap::new();
        let mut by_status: HashMap<String, usize> = HashMap::new();

        for insight in &insights {
            *by_kind.entry(insight.kind.to_string()).or_default() += 1;
            *by_severity.entry(insight.severity.to_string()).or_default() += 1;
            *by_status.entry(insight.status.to_string()).or_default() += 1;
        }

        let average_confidence = if insights.is_empty() {
            0.0
        } else {
            insights.iter().map(|i| i.confidence as f64).sum::<f64>()
                / insights.len() as f64
        };

        InsightStatistics {
            total: insights.len(),
            by_kind,
            by_severity,
            by_status,
            average_confidence,
        }
    }
}

fn active_kinds(request: &AnalysisRequest, config: &AnalysisConfig) -> Vec<InsightKind> {
    if request.analysis_kinds.is_empty() {
        config.enabled_kinds.clone()
    } else {
        request
            .analysis_kinds
            .iter()
            .filter(|k| config.enabled_kinds.contains(k))
            .copied()
            .collect()
    }
}

/// Flat 7-column projection; the JSON export carries the full structure
fn export_csv(insights: &[Insight]) -> Result<String, EngineError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "id", "title", "type", "severity", "confidence", "status", "created_at",
        ])
        .map_err(|e| EngineError::Export(e.to_string()))?;

    for insight in insights {
        writer
            .write_record([
                insight.id.to_string(),
                insight.title.clone(),
                insight.kind.to_string(),
                insight.severity.to_string(),
                insight.confidence.to_string(),
                insight.status.to_string(),
                insight.created_at.to_rfc3339(),
            ])
            .map_err(|e| EngineError::Export(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| EngineError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| EngineError::Export(e.to_string()))
}

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;

use crate::engine::Engine;
use crate::types::{AnalysisRequest, TimeRange};

/// Drives recurring analysis and retention sweeps.
///
/// Sweeps once at startup, then on every `analysis_frequency` tick
/// re-analyzes the configured data sources (when `auto_generate` is on)
/// and sweeps again. Stops when the shutdown sender fires or drops.
pub struct Scheduler {
    engine: Arc<Engine>,
    data_sources: Vec<String>,
    shutdown: watch::Receiver<bool>,
}

impl Scheduler {
    pub fn new(
        engine: Arc<Engine>,
        data_sources: Vec<String>,
    ) -> (Self, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        let scheduler = Self {
            engine,
            data_sources,
            shutdown: rx,
        };
        (scheduler, tx)
    }

    pub async fn run(mut self) {
        self.engine.cleanup_expired_data();

        loop {
            let config = self.engine.analysis_config();
            let interval = config.analysis_frequency.interval();

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = self.shutdown.changed() => {
                    tracing::info!("Scheduler shutting down");
                    return;
                }
            }

            if config.auto_generate {
                self.analyze_all(interval).await;
            }
            self.engine.cleanup_expired_data();
        }
    }

    /// One pass over every configured data source, window = one interval
    async fn analyze_all(&self, window: std::time::Duration) {
        let end = Utc::now();
        let lookback = chrono::Duration::from_std(window)
            .unwrap_or_else(|_| chrono::Duration::hours(1));
        let time_range = TimeRange { start: end - lookback, end };

        for data_source in &self.data_sources {
            let request = AnalysisRequest {
                data_source: data_source.clone(),
                time_range,
                analysis_kinds: Vec::new(),
                correlate_with: None,
            };
            match self.engine.analyze_data(&request).await {
                Ok(result) => {
                    tracing::info!(
                        data_source = %data_source,
                        insights = result.insights.len(),
                        "Scheduled analysis complete"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        data_source = %data_source,
                        error = %e,
                        "Scheduled analysis failed"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::source::SyntheticSource;
    use crate::store::InsightStore;
    use crate::types::{Insight, InsightKind, InsightStatus, Severity};
    use chrono::Duration;
    use uuid::Uuid;

    fn engine() -> Arc<Engine> {
        Arc::new(Engine::with_store(
            &EngineConfig::default(),
            Box::new(SyntheticSource::new()),
            InsightStore::in_memory(),
        ))
    }

    fn stale_insight() -> Insight {
        let created_at = Utc::now() - Duration::days(365);
        Insight {
            id: Uuid::new_v4(),
            title: "stale".into(),
            description: "".into(),
            kind: InsightKind::Trend,
            severity: Severity::Low,
            status: InsightStatus::New,
            confidence: 60,
            data_source: "cpu".into(),
            time_range: crate::types::TimeRange { start: created_at, end: created_at },
            findings: vec![],
            recommendations: vec![],
            visualizations: vec![],
            tags: vec![],
            created_at,
            updated_at: created_at,
        }
    }

    #[tokio::test]
    async fn sweeps_expired_records_at_startup() {
        let engine = engine();
        engine.store().save_insights(vec![stale_insight()]);
        assert_eq!(engine.insights().len(), 1);

        let (scheduler, shutdown) = Scheduler::new(engine.clone(), vec![]);
        let handle = tokio::spawn(scheduler.run());

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(engine.insights().is_empty());

        shutdown.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn stops_promptly_on_shutdown() {
        let (scheduler, shutdown) = Scheduler::new(engine(), vec!["cpu".into()]);
        let handle = tokio::spawn(scheduler.run());

        shutdown.send(true).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn stops_when_the_sender_is_dropped() {
        let (scheduler, shutdown) = Scheduler::new(engine(), vec![]);
        let handle = tokio::spawn(scheduler.run());

        drop(shutdown);
        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }
}

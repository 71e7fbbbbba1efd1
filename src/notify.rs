use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Mutex;
use std::time::Instant;
use uuid::Uuid;

use crate::config::{NotificationSettings, NotifyConfig, WebhookConfig};
use crate::store::InsightStore;
use crate::types::{Insight, InsightStatus, Notification, NotificationKind, Severity};

/// Trait for outbound notification channels
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Channel name
    fn name(&self) -> &str;

    /// Deliver a single notification
    async fn send(&self, notification: &Notification) -> Result<()>;
}

/// Writes every notification to the bounded in-store log and optionally
/// pushes it to outbound channels, gated by the runtime settings'
/// severity threshold and a token-bucket rate limit.
pub struct Notifier {
    store: InsightStore,
    channels: Vec<Box<dyn NotifyChannel>>,
    rate_limiter: Mutex<RateLimiter>,
}

struct RateLimiter {
    tokens: f64,
    max_tokens: f64,
    refill_rate: f64,
    last_refill: Instant,
}

impl RateLimiter {
    fn new(per_minute: u32) -> Self {
        Self {
            tokens: per_minute as f64,
            max_tokens: per_minute as f64,
            refill_rate: per_minute as f64 / 60.0,
            last_refill: Instant::now(),
        }
    }

    fn try_acquire(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

impl Notifier {
    pub fn new(config: &NotifyConfig, store: InsightStore) -> Self {
        let mut channels: Vec<Box<dyn NotifyChannel>> = Vec::new();

        if let Some(ref wc) = config.webhook {
            if wc.enabled {
                channels.push(Box::new(WebhookChannel::new(wc)));
            }
        }

        tracing::info!(channels = channels.len(), "Initialized notification channels");

        Self {
            store,
            channels,
            rate_limiter: Mutex::new(RateLimiter::new(config.rate_limit_per_minute)),
        }
    }

    pub fn add_channel(&mut self, channel: Box<dyn NotifyChannel>) {
        self.channels.push(channel);
    }

    /// Record a freshly synthesized insight
    pub async fn insight_created(
        &self,
        insight: &Insight,
        settings: &NotificationSettings,
        now: DateTime<Utc>,
    ) {
        let notification = Notification {
            id: Uuid::new_v4(),
            insight_id: insight.id,
            title: format!("New insight: {}", insight.title),
            message: insight.description.clone(),
            severity: insight.severity,
            kind: NotificationKind::NewInsight,
            is_read: false,
            created_at: now,
        };
        self.record(notification, settings).await;
    }

    /// Record a status transition. Always severity Low, regardless of
    /// the insight's own severity.
    pub async fn status_changed(
        &self,
        insight: &Insight,
        status: InsightStatus,
        settings: &NotificationSettings,
        now: DateTime<Utc>,
    ) {
        let notification = Notification {
            id: Uuid::new_v4(),
            insight_id: insight.id,
            title: format!("Insight {}", status),
            message: format!("\"{}\" is now {}", insight.title, status),
            severity: Severity::Low,
            kind: NotificationKind::StatusChange,
            is_read: false,
            created_at: now,
        };
        self.record(notification, settings).await;
    }

    async fn record(&self, notification: Notification, settings: &NotificationSettings) {
        // The log receives everything; only outbound delivery is gated
        self.store.create_notification(notification.clone());

        if !settings.push || self.channels.is_empty() {
            return;
        }
        if notification.severity < settings.severity_threshold {
            return;
        }
        if !self.rate_limiter.lock().unwrap().try_acquire() {
            tracing::warn!(title = %notification.title, "Notification rate limited");
            return;
        }

        for channel in &self.channels {
            if let Err(e) = channel.send(&notification).await {
                tracing::error!(
                    channel = channel.name(),
                    error = %e,
                    "Failed to deliver notification"
                );
            }
        }
    }
}

/// Generic webhook delivery channel
pub struct WebhookChannel {
    url: String,
    headers: std::collections::HashMap<String, String>,
    client: reqwest::Client,
}

impl WebhookChannel {
    pub fn new(config: &WebhookConfig) -> Self {
        Self {
            url: config.url.clone(),
            headers: config.headers.clone(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl NotifyChannel for WebhookChannel {
    fn name(&self) -> &str { "webhook" }

    async fn send(&self, notification: &Notification) -> Result<()> {
        let payload = json!({
            "title": &notification.title,
            "message": &notification.message,
            "severity": notification.severity.to_string(),
            "insight_id": notification.insight_id,
            "timestamp": notification.created_at.to_rfc3339(),
        });

        let mut req = self.client.post(&self.url).json(&payload);
        for (k, v) in &self.headers {
            req = req.header(k, v);
        }

        req.send().await?.error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InsightKind, TimeRange};
    use chrono::TimeZone;
    use std::sync::Arc;

    struct CapturingChannel {
        sent: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl NotifyChannel for CapturingChannel {
        fn name(&self) -> &str { "capturing" }

        async fn send(&self, notification: &Notification) -> Result<()> {
            self.sent.lock().unwrap().push(notification.title.clone());
            Ok(())
        }
    }

    fn insight(severity: Severity) -> Insight {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        Insight {
            id: Uuid::new_v4(),
            title: "cpu trend".into(),
            description: "".into(),
            kind: InsightKind::Trend,
            severity,
            status: InsightStatus::New,
            confidence: 90,
            data_source: "cpu".into(),
            time_range: TimeRange { start: ts, end: ts },
            findings: vec![],
            recommendations: vec![],
            visualizations: vec![],
            tags: vec![],
            created_at: ts,
            updated_at: ts,
        }
    }

    fn notifier_with_capture(
        store: InsightStore,
        rate_limit: u32,
    ) -> (Notifier, Arc<Mutex<Vec<String>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let mut notifier = Notifier::new(
            &NotifyConfig { rate_limit_per_minute: rate_limit, webhook: None },
            store,
        );
        notifier.add_channel(Box::new(CapturingChannel { sent: sent.clone() }));
        (notifier, sent)
    }

    fn push_settings(threshold: Severity) -> NotificationSettings {
        NotificationSettings {
            push: true,
            email: false,
            severity_threshold: threshold,
        }
    }

    #[tokio::test]
    async fn log_always_receives_even_when_push_is_off() {
        let store = InsightStore::in_memory();
        let (notifier, sent) = notifier_with_capture(store.clone(), 10);
        let settings = NotificationSettings::default();

        notifier
            .insight_created(&insight(Severity::High), &settings, Utc::now())
            .await;

        assert_eq!(store.notifications().len(), 1);
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn push_respects_severity_threshold() {
        let store = InsightStore::in_memory();
        let (notifier, sent) = notifier_with_capture(store.clone(), 10);
        let settings = push_settings(Severity::High);

        notifier
            .insight_created(&insight(Severity::Medium), &settings, Utc::now())
            .await;
        notifier
            .insight_created(&insight(Severity::Critical), &settings, Utc::now())
            .await;

        assert_eq!(store.notifications().len(), 2);
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn status_changes_are_low_severity_and_rarely_pushed() {
        let store = InsightStore::in_memory();
        let (notifier, sent) = notifier_with_capture(store.clone(), 10);
        let settings = push_settings(Severity::Medium);

        // Even a critical insight's status change logs at Low
        notifier
            .status_changed(
                &insight(Severity::Critical),
                InsightStatus::Acknowledged,
                &settings,
                Utc::now(),
            )
            .await;

        let log = store.notifications();
        assert_eq!(log[0].severity, Severity::Low);
        assert_eq!(log[0].kind, NotificationKind::StatusChange);
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rate_limiter_caps_outbound_but_not_the_log() {
        let store = InsightStore::in_memory();
        let (notifier, sent) = notifier_with_capture(store.clone(), 2);
        let settings = push_settings(Severity::Low);

        for _ in 0..5 {
            notifier
                .insight_created(&insight(Severity::High), &settings, Utc::now())
                .await;
        }

        assert_eq!(store.notifications().len(), 5);
        assert_eq!(sent.lock().unwrap().len(), 2);
    }
}

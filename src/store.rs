use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::config::{AnalysisConfig, RetentionConfig};
use crate::types::{Insight, InsightStatus, Notification};

/// Maximum entries kept in the notification log; oldest evicted first
pub const NOTIFICATION_CAP: usize = 100;

const INSIGHTS_FILE: &str = "insights.json";
const NOTIFICATIONS_FILE: &str = "notifications.json";
const CONFIG_FILE: &str = "config.json";

/// Thread-safe insight store with JSON file persistence.
///
/// All mutations are read-modify-write cycles under the write lock;
/// last write wins. Persistence failures are logged and swallowed, so
/// callers never observe storage errors — at worst data simply does not
/// survive a restart.
#[derive(Clone)]
pub struct InsightStore {
    inner: Arc<RwLock<StoreInner>>,
}

struct StoreInner {
    insights: Vec<Insight>,
    /// Newest first
    notifications: Vec<Notification>,
    config: Option<AnalysisConfig>,
    data_dir: Option<PathBuf>,
}

impl InsightStore {
    /// Open the store over a data directory, hydrating any previously
    /// persisted state. Unreadable or malformed files are treated as
    /// empty.
    pub fn open(data_dir: impl Into<PathBuf>) -> Self {
        let dir = data_dir.into();
        let data_dir = match std::fs::create_dir_all(&dir) {
            Ok(()) => Some(dir),
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e,
                    "Cannot create data dir, store is memory-only");
                None
            }
        };

        let (insights, notifications, config) = match &data_dir {
            Some(dir) => (
                read_json(&dir.join(INSIGHTS_FILE)),
                read_json(&dir.join(NOTIFICATIONS_FILE)),
                read_json::<Option<AnalysisConfig>>(&dir.join(CONFIG_FILE)),
            ),
            None => (Vec::new(), Vec::new(), None),
        };

        Self {
            inner: Arc::new(RwLock::new(StoreInner {
                insights,
                notifications,
                config,
                data_dir,
            })),
        }
    }

    /// Store without a backing directory; state dies with the process
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner {
                insights: Vec::new(),
                notifications: Vec::new(),
                config: None,
                data_dir: None,
            })),
        }
    }

    pub fn insights(&self) -> Vec<Insight> {
        self.inner.read().unwrap().insights.clone()
    }

    pub fn insight_by_id(&self, id: Uuid) -> Option<Insight> {
        let inner = self.inner.read().unwrap();
        inner.insights.iter().find(|i| i.id == id).cloned()
    }

    /// Merge a batch into the store, replacing entries that share an id
    pub fn save_insights(&self, batch: Vec<Insight>) {
        let mut inner = self.inner.write().unwrap();
        for insight in batch {
            match inner.insights.iter().position(|i| i.id == insight.id) {
                Some(pos) => inner.insights[pos] = insight,
                None => inner.insights.push(insight),
            }
        }
        inner.persist_insights();
    }

    /// Stamp a new status and `updated_at` on the insight. Returns the
    /// updated record, or None for an unknown id.
    pub fn update_insight_status(
        &self,
        id: Uuid,
        status: InsightStatus,
        now: DateTime<Utc>,
    ) -> Option<Insight> {
        let mut inner = self.inner.write().unwrap();
        let insight = inner.insights.iter_mut().find(|i| i.id == id)?;
        insight.status = status;
        insight.updated_at = now;
        let updated = insight.clone();
        inner.persist_insights();
        Some(updated)
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.inner.read().unwrap().notifications.clone()
    }

    /// Prepend to the log and evict past the cap, read or not
    pub fn create_notification(&self, notification: Notification) {
        let mut inner = self.inner.write().unwrap();
        inner.notifications.insert(0, notification);
        inner.notifications.truncate(NOTIFICATION_CAP);
        inner.persist_notifications();
    }

    pub fn mark_notification_read(&self, id: Uuid) -> bool {
        let mut inner = self.inner.write().unwrap();
        match inner.notifications.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.is_read = true;
                inner.persist_notifications();
                true
            }
            None => false,
        }
    }

    pub fn analysis_config(&self) -> Option<AnalysisConfig> {
        self.inner.read().unwrap().config.clone()
    }

    pub fn save_analysis_config(&self, config: AnalysisConfig) {
        let mut inner = self.inner.write().unwrap();
        inner.config = Some(config);
        inner.persist_config();
    }

    /// Drop insights and notifications older than the retention windows.
    /// Rewrites each file only when something was actually removed;
    /// idempotent and safe to call repeatedly.
    pub fn cleanup_expired(
        &self,
        now: DateTime<Utc>,
        retention: &RetentionConfig,
    ) -> (usize, usize) {
        let mut inner = self.inner.write().unwrap();

        let insight_cutoff = now - Duration::days(retention.insight_days as i64);
        let before = inner.insights.len();
        inner.insights.retain(|i| i.created_at >= insight_cutoff);
        let removed_insights = before - inner.insights.len();
        if removed_insights > 0 {
            inner.persist_insights();
        }

        let notification_cutoff = now - Duration::days(retention.notification_days as i64);
        let before = inner.notifications.len();
        inner.notifications.retain(|n| n.created_at >= notification_cutoff);
        let removed_notifications = before - inner.notifications.len();
        if removed_notifications > 0 {
            inner.persist_notifications();
        }

        (removed_insights, removed_notifications)
    }
}

impl StoreInner {
    fn persist_insights(&self) {
        if let Some(dir) = &self.data_dir {
            write_json(&dir.join(INSIGHTS_FILE), &self.insights);
        }
    }

    fn persist_notifications(&self) {
        if let Some(dir) = &self.data_dir {
            write_json(&dir.join(NOTIFICATIONS_FILE), &self.notifications);
        }
    }

    fn persist_config(&self) {
        if let Some(dir) = &self.data_dir {
            write_json(&dir.join(CONFIG_FILE), &self.config);
        }
    }
}

fn read_json<T: DeserializeOwned + Default>(path: &Path) -> T {
    if !path.exists() {
        return T::default();
    }
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read store file");
            return T::default();
        }
    };
    match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e,
                "Malformed store file, starting empty");
            T::default()
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) {
    let json = match serde_json::to_string_pretty(value) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Failed to serialize store file");
            return;
        }
    };
    if let Err(e) = std::fs::write(path, json) {
        tracing::error!(path = %path.display(), error = %e, "Failed to write store file");
    }
}

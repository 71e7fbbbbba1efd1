use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::types::{InsightKind, Severity};

/// Top-level configuration loaded from the engine's TOML file
#[derive(Debug, Deserialize, Clone, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub engine: CoreConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    /// Seed values for the runtime analysis config; superseded by the
    /// store-persisted copy once one exists
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CoreConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Data sources re-analyzed by the scheduler on each tick
    #[serde(default = "default_data_sources")]
    pub data_sources: Vec<String>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            data_sources: default_data_sources(),
        }
    }
}

/// Detector tunables. Defaults match the documented emission rules.
#[derive(Debug, Deserialize, Clone)]
pub struct DetectorConfig {
    #[serde(default = "default_slope_threshold")]
    pub trend_slope_threshold: f64,
    #[serde(default = "default_r_squared_threshold")]
    pub trend_r_squared_threshold: f64,
    /// Standard-deviation multiplier for the anomaly threshold
    #[serde(default = "default_anomaly_sigma")]
    pub anomaly_sigma: f64,
    #[serde(default = "default_correlation_threshold")]
    pub correlation_threshold: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            trend_slope_threshold: 0.1,
            trend_r_squared_threshold: 0.5,
            anomaly_sigma: 2.5,
            correlation_threshold: 0.5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotifyConfig {
    #[serde(default = "default_rate_per_min")]
    pub rate_limit_per_minute: u32,
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            rate_limit_per_minute: 10,
            webhook: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebhookConfig {
    #[serde(default)]
    pub enabled: bool,
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Runtime-tunable analysis configuration, overlaid on defaults and
/// persisted through the insight store
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AnalysisConfig {
    #[serde(default = "default_true")]
    pub auto_generate: bool,
    #[serde(default)]
    pub analysis_frequency: AnalysisFrequency,
    /// Insights scoring below this are dropped before persisting
    #[serde(default = "default_min_confidence")]
    pub min_confidence: u8,
    #[serde(default = "default_enabled_kinds")]
    pub enabled_kinds: Vec<InsightKind>,
    #[serde(default)]
    pub notifications: NotificationSettings,
    #[serde(default)]
    pub retention: RetentionConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            auto_generate: true,
            analysis_frequency: AnalysisFrequency::default(),
            min_confidence: 50,
            enabled_kinds: default_enabled_kinds(),
            notifications: NotificationSettings::default(),
            retention: RetentionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisFrequency {
    Realtime,
    #[default]
    Hourly,
    Daily,
    Weekly,
}

impl AnalysisFrequency {
    pub fn interval(&self) -> Duration {
        match self {
            AnalysisFrequency::Realtime => Duration::from_secs(60),
            AnalysisFrequency::Hourly => Duration::from_secs(3600),
            AnalysisFrequency::Daily => Duration::from_secs(86_400),
            AnalysisFrequency::Weekly => Duration::from_secs(7 * 86_400),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NotificationSettings {
    #[serde(default)]
    pub push: bool,
    #[serde(default)]
    pub email: bool,
    /// Outbound delivery only fires at or above this severity;
    /// the in-store log receives everything regardless
    #[serde(default = "default_severity_threshold")]
    pub severity_threshold: Severity,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            push: false,
            email: false,
            severity_threshold: Severity::Medium,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RetentionConfig {
    #[serde(default = "default_insight_days")]
    pub insight_days: u32,
    #[serde(default = "default_notification_days")]
    pub notification_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            insight_days: 90,
            notification_days: 30,
        }
    }
}

/// Partial update applied over the current analysis config.
/// Absent fields leave the current value untouched.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AnalysisConfigPatch {
    pub auto_generate: Option<bool>,
    pub analysis_frequency: Option<AnalysisFrequency>,
    pub min_confidence: Option<u8>,
    pub enabled_kinds: Option<Vec<InsightKind>>,
    pub push: Option<bool>,
    pub email: Option<bool>,
    pub severity_threshold: Option<Severity>,
    pub insight_retention_days: Option<u32>,
    pub notification_retention_days: Option<u32>,
}

impl AnalysisConfig {
    pub fn apply(&mut self, patch: AnalysisConfigPatch) {
        if let Some(v) = patch.auto_generate {
            self.auto_generate = v;
        }
        if let Some(v) = patch.analysis_frequency {
            self.analysis_frequency = v;
        }
        if let Some(v) = patch.min_confidence {
            self.min_confidence = v;
        }
        if let Some(v) = patch.enabled_kinds {
            self.enabled_kinds = v;
        }
        if let Some(v) = patch.push {
            self.notifications.push = v;
        }
        if let Some(v) = patch.email {
            self.notifications.email = v;
        }
        if let Some(v) = patch.severity_threshold {
            self.notifications.severity_threshold = v;
        }
        if let Some(v) = patch.insight_retention_days {
            self.retention.insight_days = v;
        }
        if let Some(v) = patch.notification_retention_days {
            self.retention.notification_days = v;
        }
    }
}

impl EngineConfig {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        // Expand environment variables
        let expanded = expand_env_vars(&content);

        let config: EngineConfig = toml::from_str(&expanded)
            .with_context(|| "Failed to parse configuration")?;

        Ok(config)
    }
}

/// Expand ${ENV_VAR} references in config string
fn expand_env_vars(input: &str) -> String {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();
    re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_default()
    })
    .to_string()
}

// Default value functions
fn default_data_dir() -> String { "/var/lib/insight-engine".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_data_sources() -> Vec<String> { vec!["demo".into()] }
fn default_slope_threshold() -> f64 { 0.1 }
fn default_r_squared_threshold() -> f64 { 0.5 }
fn default_anomaly_sigma() -> f64 { 2.5 }
fn default_correlation_threshold() -> f64 { 0.5 }
fn default_rate_per_min() -> u32 { 10 }
fn default_true() -> bool { true }
fn default_min_confidence() -> u8 { 50 }
fn default_severity_threshold() -> Severity { Severity::Medium }
fn default_insight_days() -> u32 { 90 }
fn default_notification_days() -> u32 { 30 }
fn default_enabled_kinds() -> Vec<InsightKind> {
    vec![
        InsightKind::Trend,
        InsightKind::Anomaly,
        InsightKind::Correlation,
        InsightKind::Prediction,
        InsightKind::Optimization,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_empty_config_with_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config.detector.anomaly_sigma, 2.5);
        assert_eq!(config.analysis.min_confidence, 50);
        assert!(config.analysis.auto_generate);
        assert_eq!(config.analysis.retention.insight_days, 90);
    }

    #[test]
    fn parses_partial_sections() {
        let config: EngineConfig = toml::from_str(
            r#"
            [detector]
            trend_slope_threshold = 0.2

            [analysis]
            min_confidence = 70
            analysis_frequency = "daily"
            "#,
        )
        .unwrap();
        assert_eq!(config.detector.trend_slope_threshold, 0.2);
        assert_eq!(config.detector.trend_r_squared_threshold, 0.5);
        assert_eq!(config.analysis.min_confidence, 70);
        assert_eq!(config.analysis.analysis_frequency, AnalysisFrequency::Daily);
    }

    #[test]
    fn patch_overrides_only_present_fields() {
        let mut config = AnalysisConfig::default();
        config.apply(AnalysisConfigPatch {
            min_confidence: Some(80),
            push: Some(true),
            insight_retention_days: Some(7),
            ..Default::default()
        });
        assert_eq!(config.min_confidence, 80);
        assert!(config.notifications.push);
        assert_eq!(config.retention.insight_days, 7);
        // Untouched fields keep their defaults
        assert!(config.auto_generate);
        assert_eq!(config.retention.notification_days, 30);
    }

    #[test]
    fn expands_env_vars() {
        std::env::set_var("INSIGHT_TEST_DIR", "/tmp/insights");
        let expanded = expand_env_vars("data_dir = \"${INSIGHT_TEST_DIR}\"");
        assert_eq!(expanded, "data_dir = \"/tmp/insights\"");
    }
}

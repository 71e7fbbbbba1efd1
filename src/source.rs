use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use smallvec::smallvec;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::types::{Label, Sample, TimeRange};

/// Trait for sample providers.
///
/// The engine never generates data itself; it fetches an ordered sequence
/// of samples for a named data source and time window from an injected
/// implementation of this trait.
#[async_trait]
pub trait SampleSource: Send + Sync {
    /// Human-readable name for this source (e.g., "synthetic", "prometheus")
    fn name(&self) -> &str;

    /// Fetch samples for the data source over the window, ordered by
    /// timestamp. An empty result is valid; detectors treat short or
    /// degenerate sequences as "nothing to report".
    async fn fetch(&self, data_source: &str, range: &TimeRange) -> Result<Vec<Sample>>;
}

/// Demo sample source generating a drifting series with noise.
///
/// The base level and drift are derived from the data source name, so
/// distinct sources produce distinct but stable-looking series.
pub struct SyntheticSource {
    samples_per_hour: u32,
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self { samples_per_hour: 12 }
    }

    pub fn with_rate(samples_per_hour: u32) -> Self {
        Self { samples_per_hour: samples_per_hour.max(1) }
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SampleSource for SyntheticSource {
    fn name(&self) -> &str { "synthetic" }

    async fn fetch(&self, data_source: &str, range: &TimeRange) -> Result<Vec<Sample>> {
        let span = range.end.signed_duration_since(range.start);
        if span.num_seconds() <= 0 {
            return Ok(Vec::new());
        }

        let hours = (span.num_seconds() as f64 / 3600.0).max(1.0);
        let count = ((hours * self.samples_per_hour as f64) as usize).clamp(24, 5000);
        let step = span / count as i32;

        let mut hasher = DefaultHasher::new();
        data_source.hash(&mut hasher);
        let seed = hasher.finish();
        let base = 50.0 + (seed % 100) as f64;
        let drift = ((seed >> 8) % 5) as f64 * 0.05;

        let mut rng = rand::thread_rng();
        let samples = (0..count)
            .map(|i| Sample {
                timestamp: range.start + step * i as i32,
                value: base + drift * i as f64 + rng.gen_range(-2.0..2.0),
                labels: smallvec![Label {
                    key: "origin".into(),
                    value: "synthetic".into(),
                }],
            })
            .collect();

        Ok(samples)
    }
}

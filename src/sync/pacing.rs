//! Randomized delay between remote calls
//!
//! The interval does not depend on whether the previous call succeeded.

use crate::config::SyncConfig;
use rand::Rng;
use std::time::Duration;

/// Longest pause a pacer will take, in seconds (one day)
pub const MAX_PACE_SECS: f64 = 86_400.0;

/// Sleeps for a uniformly random duration between two bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacer {
    min_secs: f64,
    max_secs: f64,
}

impl Pacer {
    /// Creates a pacer; bounds given in the wrong order are swapped
    ///
    /// Bounds are clamped to `[0, MAX_PACE_SECS]`.
    pub fn new(min_secs: f64, max_secs: f64) -> Self {
        let min_secs = bounded(min_secs);
        let max_secs = bounded(max_secs);
        if min_secs <= max_secs {
            Self { min_secs, max_secs }
        } else {
            Self {
                min_secs: max_secs,
                max_secs: min_secs,
            }
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.min_pace_secs, config.max_pace_secs)
    }

    /// A pacer that never sleeps
    pub fn disabled() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Draws the next delay
    pub fn sample_delay(&self) -> Duration {
        if self.max_secs <= self.min_secs {
            return Duration::from_secs_f64(self.min_secs);
        }
        let secs = rand::rng().random_range(self.min_secs..=self.max_secs);
        Duration::from_secs_f64(secs)
    }

    /// Blocks the caller for a freshly drawn delay
    pub async fn pace(&self) {
        let delay = self.sample_delay();
        if delay.is_zero() {
            return;
        }
        tracing::debug!("Pacing for {:.1}s", delay.as_secs_f64());
        tokio::time::sleep(delay).await;
    }
}

/// NaN counts as zero
fn bounded(secs: f64) -> f64 {
    if secs.is_nan() {
        0.0
    } else {
        secs.clamp(0.0, MAX_PACE_SECS)
    }
}

/// Sleeps for a uniformly random duration in `[min_seconds, max_seconds]`
pub async fn pace(min_seconds: f64, max_seconds: f64) {
    Pacer::new(min_seconds, max_seconds).pace().await;
}

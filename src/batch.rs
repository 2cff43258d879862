//! Adaptive batch sizing.
//!
//! [`BatchSizer`] is the feedback loop behind
//! [`SuggestionEngine::suggest_batch`](crate::SuggestionEngine::suggest_batch):
//! after every batch it looks at the whole batch's wall time and error count
//! and picks the size of the next batch.
//!
//! Rules, in precedence order:
//!
//! 1. any error, or slower than `slow_threshold_secs` → shrink by `adjust_step`
//! 2. faster than `fast_threshold_secs` → grow by `adjust_step`
//! 3. otherwise unchanged
//!
//! The size always stays within `[min_size, max_size]`. The signal is the
//! whole batch's wall time, so one slow member slows the verdict for all.

use std::time::Duration;

use serde::Deserialize;

use crate::{Result, TagwiseError};

/// Batch sizing configuration, constant for a run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Size of the first batch (default: 5).
    pub start_size: usize,
    /// Lower bound (default: 2).
    pub min_size: usize,
    /// Upper bound (default: 20).
    pub max_size: usize,
    /// Batches slower than this shrink the next one (default: 10.0).
    pub slow_threshold_secs: f64,
    /// Batches faster than this grow the next one (default: 3.0).
    pub fast_threshold_secs: f64,
    /// Amount added or removed per adjustment (default: 1).
    pub adjust_step: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            start_size: 5,
            min_size: 2,
            max_size: 20,
            slow_threshold_secs: 10.0,
            fast_threshold_secs: 3.0,
            adjust_step: 1,
        }
    }
}

impl BatchConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the first batch size.
    pub fn start_size(mut self, n: usize) -> Self {
        self.start_size = n;
        self
    }

    /// Set the size bounds.
    pub fn bounds(mut self, min: usize, max: usize) -> Self {
        self.min_size = min;
        self.max_size = max;
        self
    }

    /// Set the slow and fast thresholds in seconds.
    pub fn thresholds(mut self, slow_secs: f64, fast_secs: f64) -> Self {
        self.slow_threshold_secs = slow_secs;
        self.fast_threshold_secs = fast_secs;
        self
    }

    /// Set the adjustment step.
    pub fn adjust_step(mut self, step: usize) -> Self {
        self.adjust_step = step;
        self
    }

    /// Check the bounds and thresholds are coherent.
    pub fn validate(&self) -> Result<()> {
        if self.min_size == 0 {
            return Err(TagwiseError::Configuration(
                "batch.min_size must be at least 1".to_string(),
            ));
        }
        if self.min_size > self.max_size {
            return Err(TagwiseError::Configuration(format!(
                "batch.min_size ({}) exceeds batch.max_size ({})",
                self.min_size, self.max_size
            )));
        }
        if !(self.min_size..=self.max_size).contains(&self.start_size) {
            return Err(TagwiseError::Configuration(format!(
                "batch.start_size ({}) outside [{}, {}]",
                self.start_size, self.min_size, self.max_size
            )));
        }
        let finite = self.slow_threshold_secs.is_finite() && self.fast_threshold_secs.is_finite();
        if !finite || self.fast_threshold_secs < 0.0 || self.fast_threshold_secs > self.slow_threshold_secs
        {
            return Err(TagwiseError::Configuration(format!(
                "batch thresholds must satisfy 0 <= fast ({}) <= slow ({})",
                self.fast_threshold_secs, self.slow_threshold_secs
            )));
        }
        Ok(())
    }
}

/// Which way an observation moved the batch size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    Shrink,
    Grow,
    Hold,
}

/// Additive-increase / additive-decrease batch size controller.
///
/// Owned by a single batch loop; not shared.
#[derive(Debug, Clone)]
pub struct BatchSizer {
    current: usize,
    min: usize,
    max: usize,
    slow: Duration,
    fast: Duration,
    step: usize,
}

impl BatchSizer {
    /// Start at `config.start_size`, clamped into the bounds.
    ///
    /// Degenerate bounds (`min > max` or `min == 0`) are repaired rather
    /// than trusted; [`BatchConfig::validate`] reports them properly.
    pub fn new(config: &BatchConfig) -> Self {
        let min = config.min_size.max(1);
        let max = config.max_size.max(min);
        Self {
            current: config.start_size.clamp(min, max),
            min,
            max,
            slow: Duration::from_secs_f64(config.slow_threshold_secs.max(0.0)),
            fast: Duration::from_secs_f64(config.fast_threshold_secs.max(0.0)),
            step: config.adjust_step,
        }
    }

    /// Size of the next batch.
    pub fn current(&self) -> usize {
        self.current
    }

    /// Decide how a batch with this latency and error count moves the size.
    pub fn classify(&self, elapsed: Duration, errors: usize) -> Adjustment {
        if errors > 0 || elapsed > self.slow {
            Adjustment::Shrink
        } else if elapsed < self.fast {
            Adjustment::Grow
        } else {
            Adjustment::Hold
        }
    }

    /// Feed one batch's measurements and return the next size.
    pub fn observe(&mut self, elapsed: Duration, errors: usize) -> usize {
        self.current = match self.classify(elapsed, errors) {
            Adjustment::Shrink => self.current.saturating_sub(self.step).max(self.min),
            Adjustment::Grow => self.current.saturating_add(self.step).min(self.max),
            Adjustment::Hold => self.current,
        };
        self.current
    }
}

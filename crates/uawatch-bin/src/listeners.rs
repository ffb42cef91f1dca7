// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Listeners used by the demo commands.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};
use uawatch_core::{Listener, ListenerError, Value};

// =============================================================================
// ThresholdListener
// =============================================================================

/// Classification of a reading against the thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    /// Strictly above the upper threshold.
    High,
    /// Strictly below the lower threshold.
    Low,
    /// Within `[low, high]`.
    Normal,
}

/// Counters kept by [`ThresholdListener`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ThresholdCounts {
    /// Readings above the upper threshold.
    pub high: u64,
    /// Readings below the lower threshold.
    pub low: u64,
    /// Readings within range.
    pub normal: u64,
}

impl ThresholdCounts {
    /// Total readings seen.
    pub fn total(&self) -> u64 {
        self.high + self.low + self.normal
    }
}

/// Raises alerts when a temperature leaves `[low, high]`.
#[derive(Debug)]
pub struct ThresholdListener {
    high: f64,
    low: f64,
    high_count: AtomicU64,
    low_count: AtomicU64,
    normal_count: AtomicU64,
}

impl ThresholdListener {
    /// Creates a listener with the given bounds.
    pub fn new(high: f64, low: f64) -> Self {
        Self {
            high,
            low,
            high_count: AtomicU64::new(0),
            low_count: AtomicU64::new(0),
            normal_count: AtomicU64::new(0),
        }
    }

    /// Classifies `value`.
    pub fn classify(&self, value: f64) -> Reading {
        if value > self.high {
            Reading::High
        } else if value < self.low {
            Reading::Low
        } else {
            Reading::Normal
        }
    }

    /// Returns the counters.
    pub fn counts(&self) -> ThresholdCounts {
        ThresholdCounts {
            high: self.high_count.load(Ordering::Relaxed),
            low: self.low_count.load(Ordering::Relaxed),
            normal: self.normal_count.load(Ordering::Relaxed),
        }
    }
}

impl Default for ThresholdListener {
    fn default() -> Self {
        Self::new(30.0, 10.0)
    }
}

#[async_trait]
impl Listener for ThresholdListener {
    fn name(&self) -> &str {
        "threshold"
    }

    async fn on_change(&self, key: &str, value: &Value) -> Result<(), ListenerError> {
        let reading = value
            .as_f64()
            .ok_or_else(|| ListenerError::new(format!("{} is not numeric: {}", key, value)))?;

        info!("Temperature changed to {}°C", value);

        match self.classify(reading) {
            Reading::High => {
                self.high_count.fetch_add(1, Ordering::Relaxed);
                warn!(threshold = self.high, "Temperature exceeds threshold: {}°C", value);
            }
            Reading::Low => {
                self.low_count.fetch_add(1, Ordering::Relaxed);
                warn!(threshold = self.low, "Temperature below minimum threshold: {}°C", value);
            }
            Reading::Normal => {
                self.normal_count.fetch_add(1, Ordering::Relaxed);
                info!("Temperature within normal range: {}°C", value);
            }
        }
        Ok(())
    }
}

// =============================================================================
// LoggingListener
// =============================================================================

/// Logs every change at `info`.
#[derive(Debug, Default)]
pub struct LoggingListener {
    seen: AtomicU64,
}

impl LoggingListener {
    /// Creates a new logging listener.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of changes logged.
    pub fn seen(&self) -> u64 {
        self.seen.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Listener for LoggingListener {
    fn name(&self) -> &str {
        "logging"
    }

    async fn on_change(&self, key: &str, value: &Value) -> Result<(), ListenerError> {
        self.seen.fetch_add(1, Ordering::Relaxed);
        info!(key = key, value = %value, "Variable changed");
        Ok(())
    }
}

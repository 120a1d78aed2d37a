//! Per-system performance tracking
//!
//! [`SystemPerformanceTracker`] is shared by reference (usually an `Arc`)
//! between the scheduler and every worker that runs a system. Metrics and
//! the warning-cooldown map sit behind their own `parking_lot::Mutex`; the
//! frame counter is a plain atomic.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulerError};

/// Accumulated timing for one system
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SystemMetrics {
    pub update_count: u64,
    pub total_time_ms: f64,
    pub last_update_ms: f64,
    pub max_update_ms: f64,
}

impl SystemMetrics {
    pub fn average_ms(&self) -> f64 {
        if self.update_count == 0 {
            0.0
        } else {
            self.total_time_ms / self.update_count as f64
        }
    }

    fn record(&mut self, elapsed_ms: f64) {
        self.update_count += 1;
        self.total_time_ms += elapsed_ms;
        self.last_update_ms = elapsed_ms;
        if elapsed_ms > self.max_update_ms {
            self.max_update_ms = elapsed_ms;
        }
    }
}

/// Emitted when a system exceeds its share of the frame budget
#[derive(Debug, Clone, PartialEq)]
pub struct SlowSystemWarning {
    pub system: String,
    pub frame: u64,
    pub elapsed_ms: f64,
    /// Percent of `target_frame_time_ms` consumed
    pub budget_percent: f64,
}

/// One row of [`SystemPerformanceTracker::performance_report`]
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceRow {
    pub system: String,
    pub metrics: SystemMetrics,
}

#[derive(Debug, Clone, Copy)]
struct TrackerSettings {
    target_frame_time_ms: f64,
    slow_threshold_ms: f64,
    cooldown_frames: u64,
}

#[derive(Debug)]
pub struct SystemPerformanceTracker {
    settings: TrackerSettings,
    metrics: Mutex<FxHashMap<String, SystemMetrics>>,
    last_warned: Mutex<FxHashMap<String, u64>>,
    frame: AtomicU64,
    warnings: AtomicU64,
}

impl TrackerSettings {
    fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            target_frame_time_ms: config.target_frame_time_ms,
            slow_threshold_ms: config.slow_system_threshold_ms(),
            cooldown_frames: config.slow_system_warning_cooldown_frames,
        }
    }
}

impl Default for SystemPerformanceTracker {
    fn default() -> Self {
        Self::with_settings(TrackerSettings::from_config(&SchedulerConfig::default()))
    }
}

impl SystemPerformanceTracker {
    /// Fails with [`SchedulerError::Config`] when `config` does not validate
    pub fn new(config: &SchedulerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_settings(TrackerSettings::from_config(config)))
    }

    fn with_settings(settings: TrackerSettings) -> Self {
        Self {
            settings,
            metrics: Mutex::new(FxHashMap::default()),
            last_warned: Mutex::new(FxHashMap::default()),
            frame: AtomicU64::new(0),
            warnings: AtomicU64::new(0),
        }
    }

    /// Record one invocation of `system`.
    ///
    /// Returns the warning when this call crossed the slow-system threshold
    /// and the system was outside its cooldown window.
    pub fn track(&self, system: &str, elapsed_ms: f64) -> Result<Option<SlowSystemWarning>> {
        check_name(system)?;

        {
            let mut metrics = self.metrics.lock();
            match metrics.get_mut(system) {
                Some(entry) => entry.record(elapsed_ms),
                None => {
                    let mut entry = SystemMetrics::default();
                    entry.record(elapsed_ms);
                    metrics.insert(system.to_string(), entry);
                }
            }
        }

        if elapsed_ms <= self.settings.slow_threshold_ms {
            return Ok(None);
        }

        let frame = self.current_frame();
        {
            let mut last_warned = self.last_warned.lock();
            if let Some(&last) = last_warned.get(system) {
                if frame.saturating_sub(last) < self.settings.cooldown_frames {
                    return Ok(None);
                }
            }
            last_warned.insert(system.to_string(), frame);
        }

        let budget_percent = elapsed_ms / self.settings.target_frame_time_ms * 100.0;
        self.warnings.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            system,
            frame,
            elapsed_ms,
            budget_percent,
            "slow system: {system} took {elapsed_ms:.2}ms ({budget_percent:.1}% of {:.2}ms)",
            self.settings.target_frame_time_ms
        );

        Ok(Some(SlowSystemWarning {
            system: system.to_string(),
            frame,
            elapsed_ms,
            budget_percent,
        }))
    }

    /// Snapshot for one system; default metrics when it was never tracked
    pub fn get_metrics(&self, system: &str) -> Result<SystemMetrics> {
        check_name(system)?;
        Ok(self.metrics.lock().get(system).copied().unwrap_or_default())
    }

    /// Copy of every tracked system's metrics
    pub fn get_all_metrics(&self) -> HashMap<String, SystemMetrics> {
        self.metrics
            .lock()
            .iter()
            .map(|(name, metrics)| (name.clone(), *metrics))
            .collect()
    }

    /// Tracked systems ordered by descending average time
    pub fn performance_report(&self) -> Vec<PerformanceRow> {
        let mut rows: Vec<PerformanceRow> = self
            .metrics
            .lock()
            .iter()
            .map(|(name, metrics)| PerformanceRow {
                system: name.clone(),
                metrics: *metrics,
            })
            .collect();
        rows.sort_by(|a, b| {
            b.metrics
                .average_ms()
                .total_cmp(&a.metrics.average_ms())
                .then_with(|| a.system.cmp(&b.system))
        });
        rows
    }

    pub fn log_performance_stats(&self) {
        let rows = self.performance_report();
        tracing::info!(
            systems = rows.len(),
            frame = self.current_frame(),
            "system performance"
        );
        for row in rows {
            let m = row.metrics;
            tracing::info!(
                "  {:<24} avg {:>8.3}ms  last {:>8.3}ms  max {:>8.3}ms  calls {}",
                row.system,
                m.average_ms(),
                m.last_update_ms,
                m.max_update_ms,
                m.update_count
            );
        }
    }

    /// Clear all metrics and cooldown state. The frame counter keeps running.
    pub fn reset_metrics(&self) {
        self.metrics.lock().clear();
        self.last_warned.lock().clear();
    }

    /// Advance the frame counter; once per frame
    pub fn increment_frame(&self) -> u64 {
        self.frame.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn current_frame(&self) -> u64 {
        self.frame.load(Ordering::Acquire)
    }

    /// Total warnings emitted since construction
    pub fn warnings_emitted(&self) -> u64 {
        self.warnings.load(Ordering::Relaxed)
    }
}

fn check_name(system: &str) -> Result<()> {
    if system.trim().is_empty() {
        return Err(SchedulerError::InvalidArgument(
            "system name must not be empty".to_string(),
        ));
    }
    Ok(())
}

//! Scheduler configuration
//!
//! Plain serde structs; loading them from disk is left to the embedding
//! application. [`SchedulerConfig::from_json_str`] covers the common case.
//!
//! ```
//! use stage_scheduler::config::SchedulerConfig;
//!
//! let config = SchedulerConfig::from_json_str(r#"{ "target_frame_time_ms": 33.3 }"#).unwrap();
//! assert_eq!(config.slow_system_warning_cooldown_frames, 60);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};

/// How to stage a system that declares no component access at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndeclaredAccess {
    /// Touches nothing: may share any stage
    #[default]
    Compatible,
    /// Touches everything: always gets a stage of its own
    Exclusive,
}

/// Chunking parameters for [`crate::parallel::ParallelQueryExecutor`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Lower bound on entities per chunk
    pub min_chunk_size: usize,
    /// Below this many entities the query runs inline
    pub inline_threshold: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            min_chunk_size: 64,
            inline_threshold: 128,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Frame budget in milliseconds
    pub target_frame_time_ms: f64,
    /// Fraction of the frame budget above which a system counts as slow
    pub slow_system_threshold_percent: f64,
    /// Frames to wait before warning about the same system again
    pub slow_system_warning_cooldown_frames: u64,
    /// Run multi-member stages on the worker pool
    pub parallel: bool,
    pub undeclared_access: UndeclaredAccess,
    /// Dedicated pool size; `None` shares the global rayon pool
    pub worker_threads: Option<usize>,
    pub query: QueryConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            target_frame_time_ms: 16.67,
            slow_system_threshold_percent: 0.5,
            slow_system_warning_cooldown_frames: 60,
            parallel: true,
            undeclared_access: UndeclaredAccess::default(),
            worker_threads: None,
            query: QueryConfig::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON document; missing fields take defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SchedulerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.target_frame_time_ms.is_finite() && self.target_frame_time_ms > 0.0) {
            return Err(SchedulerError::Config(format!(
                "target_frame_time_ms must be positive, got {}",
                self.target_frame_time_ms
            )));
        }
        if !(self.slow_system_threshold_percent.is_finite()
            && self.slow_system_threshold_percent > 0.0)
        {
            return Err(SchedulerError::Config(format!(
                "slow_system_threshold_percent must be positive, got {}",
                self.slow_system_threshold_percent
            )));
        }
        if self.worker_threads == Some(0) {
            return Err(SchedulerError::Config(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        if self.query.min_chunk_size == 0 {
            return Err(SchedulerError::Config(
                "query.min_chunk_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Elapsed time above which a system is reported as slow
    pub fn slow_system_threshold_ms(&self) -> f64 {
        self.target_frame_time_ms * self.slow_system_threshold_percent
    }

    pub fn with_target_frame_time_ms(mut self, ms: f64) -> Self {
        self.target_frame_time_ms = ms;
        self
    }

    pub fn with_slow_system_threshold_percent(mut self, fraction: f64) -> Self {
        self.slow_system_threshold_percent = fraction;
        self
    }

    pub fn with_warning_cooldown_frames(mut self, frames: u64) -> Self {
        self.slow_system_warning_cooldown_frames = frames;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_undeclared_access(mut self, policy: UndeclaredAccess) -> Self {
        self.undeclared_access = policy;
        self
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    pub fn with_query(mut self, query: QueryConfig) -> Self {
        self.query = query;
        self
    }
}

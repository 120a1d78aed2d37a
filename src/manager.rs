//! Sequential system manager
//!
//! Single linear pass in priority order: no stages and no worker threads.
//! Use it when parallel execution is off, or to compare a run against
//! [`crate::schedule::ParallelScheduler`]. Lifecycle, failure isolation and
//! metrics behave the same as the staged scheduler.

use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "profiling")]
use tracing::info_span;

use crate::config::SchedulerConfig;
use crate::error::{Result, SystemError};
use crate::executor::run_system;
use crate::performance::SystemPerformanceTracker;
use crate::registry::{LifecycleState, SystemRegistry};
use crate::schedule::FrameReport;
use crate::system::BoxedSystem;

pub struct SequentialSystemManager<W> {
    registry: SystemRegistry<W>,
    tracker: Arc<SystemPerformanceTracker>,
    last_report: Option<FrameReport>,
}

impl<W> Default for SequentialSystemManager<W> {
    fn default() -> Self {
        Self::with_tracker(Arc::new(SystemPerformanceTracker::default()))
    }
}

impl<W> SequentialSystemManager<W> {
    /// Rejects the same configurations as
    /// [`crate::schedule::ParallelScheduler::new`]
    pub fn new(config: &SchedulerConfig) -> Result<Self> {
        let tracker = SystemPerformanceTracker::new(config)?;
        Ok(Self::with_tracker(Arc::new(tracker)))
    }

    pub fn with_tracker(tracker: Arc<SystemPerformanceTracker>) -> Self {
        Self {
            registry: SystemRegistry::new(),
            tracker,
            last_report: None,
        }
    }

    /// Add a system, keeping priority order. Duplicate names are rejected.
    pub fn register_system(&mut self, system: BoxedSystem<W>) -> Result<()> {
        self.registry.register(system)
    }

    pub fn unregister_system(&mut self, name: &str) -> Result<BoxedSystem<W>> {
        self.registry.unregister(name)
    }

    /// Disabled systems stay registered and are skipped by `update`
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        self.registry.set_enabled(name, enabled).map(|_| ())
    }

    pub fn is_enabled(&self, name: &str) -> Result<bool> {
        self.registry.is_enabled(name)
    }

    pub fn initialize(&mut self, world: &W) -> Result<Vec<SystemError>> {
        self.registry.begin_initialize()?;
        Ok(self
            .registry
            .initialize_pending(world, self.tracker.current_frame()))
    }

    /// Update every enabled system once, in priority order
    pub fn update(&mut self, world: &W, delta_seconds: f32) -> Result<&FrameReport> {
        self.registry.begin_update()?;

        let frame = self.tracker.current_frame();
        #[cfg(feature = "profiling")]
        let _span = info_span!("sequential_frame", frame).entered();

        let frame_start = Instant::now();
        let mut errors = self.registry.initialize_pending(world, frame);
        let mut systems_run = 0;

        for entry in self.registry.entries_mut() {
            if !entry.is_enabled() {
                continue;
            }
            systems_run += 1;
            errors.extend(run_system(entry, world, delta_seconds, frame, &self.tracker));
        }

        self.tracker.increment_frame();

        Ok(&*self.last_report.insert(FrameReport {
            frame,
            stage_count: usize::from(systems_run > 0),
            systems_run,
            errors,
            total_frame_time: frame_start.elapsed(),
        }))
    }

    pub fn dispose(&mut self) {
        self.registry.dispose();
    }

    pub fn state(&self) -> LifecycleState {
        self.registry.state()
    }

    pub fn system_count(&self) -> usize {
        self.registry.len()
    }

    /// Names in execution order
    pub fn system_names(&self) -> Vec<&str> {
        self.registry.names()
    }

    pub fn tracker(&self) -> &Arc<SystemPerformanceTracker> {
        &self.tracker
    }

    pub fn last_report(&self) -> Option<&FrameReport> {
        self.last_report.as_ref()
    }
}

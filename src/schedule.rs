//! Staged frame scheduler
//!
//! [`ParallelScheduler`] owns the registered systems, the stage plan built
//! from their access declarations, the [`StageExecutor`] and the shared
//! [`SystemPerformanceTracker`]. The plan is rebuilt eagerly on every
//! registry change; since those changes take `&mut self`, a rebuild can never
//! overlap a running frame.

use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "profiling")]
use tracing::info_span;

use crate::config::SchedulerConfig;
use crate::dependency::{DependencyGraph, ExecutionStage, ScheduleDebugInfo};
use crate::error::{Result, SchedulerError, SystemError};
use crate::executor::StageExecutor;
use crate::performance::SystemPerformanceTracker;
use crate::registry::{LifecycleState, SystemRegistry};
use crate::system::BoxedSystem;

/// Outcome of one `update` call
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    /// Frame number the systems ran under
    pub frame: u64,
    pub stage_count: usize,
    pub systems_run: usize,
    pub errors: Vec<SystemError>,
    pub total_frame_time: Duration,
}

impl FrameReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn failed_systems(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.system.as_str()).collect()
    }
}

pub struct ParallelScheduler<W> {
    registry: SystemRegistry<W>,
    graph: DependencyGraph,
    executor: StageExecutor,
    tracker: Arc<SystemPerformanceTracker>,
    config: SchedulerConfig,
    last_report: Option<FrameReport>,
}

impl<W: Sync> ParallelScheduler<W> {
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        let tracker = Arc::new(SystemPerformanceTracker::new(&config)?);
        Self::with_tracker(config, tracker)
    }

    /// Share an existing tracker, e.g. with a telemetry collector
    pub fn with_tracker(
        config: SchedulerConfig,
        tracker: Arc<SystemPerformanceTracker>,
    ) -> Result<Self> {
        config.validate()?;
        let executor = StageExecutor::new(&config, Arc::clone(&tracker))?;
        Ok(Self {
            registry: SystemRegistry::new(),
            graph: DependencyGraph::default(),
            executor,
            tracker,
            config,
            last_report: None,
        })
    }

    pub fn register_system(&mut self, system: BoxedSystem<W>) -> Result<()> {
        self.registry.register(system)?;
        self.rebuild();
        Ok(())
    }

    /// Convenience constructor for chaining
    pub fn with_system(mut self, system: BoxedSystem<W>) -> Result<Self> {
        self.register_system(system)?;
        Ok(self)
    }

    pub fn unregister_system(&mut self, name: &str) -> Result<BoxedSystem<W>> {
        let system = self.registry.unregister(name)?;
        self.rebuild();
        Ok(system)
    }

    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        if self.registry.set_enabled(name, enabled)? {
            self.rebuild();
        }
        Ok(())
    }

    pub fn is_enabled(&self, name: &str) -> Result<bool> {
        self.registry.is_enabled(name)
    }

    /// Initialize every registered system once.
    ///
    /// Returns the systems whose own `initialize` failed; they stay
    /// registered and keep being updated.
    pub fn initialize(&mut self, world: &W) -> Result<Vec<SystemError>> {
        self.registry.begin_initialize()?;
        Ok(self
            .registry
            .initialize_pending(world, self.tracker.current_frame()))
    }

    /// Run one frame: every stage in order, each stage joined before the next.
    /// System failures are reported in the returned [`FrameReport`] and never
    /// abort the frame.
    pub fn update(&mut self, world: &W, delta_seconds: f32) -> Result<&FrameReport> {
        self.registry.begin_update()?;

        let frame = self.tracker.current_frame();
        #[cfg(feature = "profiling")]
        let _span = info_span!("frame", frame, stages = self.graph.stage_count()).entered();

        let frame_start = Instant::now();
        let mut errors = self.registry.initialize_pending(world, frame);

        for stage in self.graph.stages() {
            errors.extend(self.executor.run_stage(
                stage,
                self.registry.entries_mut(),
                world,
                delta_seconds,
                frame,
            ));
        }

        self.tracker.increment_frame();

        Ok(&*self.last_report.insert(FrameReport {
            frame,
            stage_count: self.graph.stage_count(),
            systems_run: self.graph.system_count(),
            errors,
            total_frame_time: frame_start.elapsed(),
        }))
    }

    /// Drop every system; all further calls fail with `Disposed`
    pub fn dispose(&mut self) {
        self.registry.dispose();
        self.graph = DependencyGraph::default();
    }

    fn rebuild(&mut self) {
        self.graph = DependencyGraph::build(self.registry.nodes(), self.config.undeclared_access);
    }
}

impl<W> ParallelScheduler<W> {
    pub fn state(&self) -> LifecycleState {
        self.registry.state()
    }

    pub fn system_count(&self) -> usize {
        self.registry.len()
    }

    /// Names in priority order
    pub fn system_names(&self) -> Vec<&str> {
        self.registry.names()
    }

    pub fn stages(&self) -> &[ExecutionStage] {
        self.graph.stages()
    }

    pub fn stage_count(&self) -> usize {
        self.graph.stage_count()
    }

    /// Stage index holding `name`; `None` for unknown or disabled systems
    pub fn stage_of(&self, name: &str) -> Option<usize> {
        self.graph.stage_of(name)
    }

    pub fn describe(&self) -> ScheduleDebugInfo {
        self.graph.describe()
    }

    pub fn tracker(&self) -> &Arc<SystemPerformanceTracker> {
        &self.tracker
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Get the most recent frame report
    pub fn last_report(&self) -> Option<&FrameReport> {
        self.last_report.as_ref()
    }

    /// Names of the systems in `stage`, or an error for an out-of-range index
    pub fn stage_members(&self, stage: usize) -> Result<&[String]> {
        self.graph
            .stages()
            .get(stage)
            .map(|s| s.system_names.as_slice())
            .ok_or_else(|| {
                SchedulerError::InvalidArgument(format!(
                    "stage {stage} out of range ({} stages)",
                    self.graph.stage_count()
                ))
            })
    }
}

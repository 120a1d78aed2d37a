//! Stage execution
//!
//! [`StageExecutor::run_stage`] runs every enabled member of one stage and
//! returns only after all of them finished (the stage barrier). Members are
//! disjoint `&mut` borrows of registry entries and share the world by `&W`;
//! the stage plan guarantees their component access does not overlap.
//! Every invocation is timed, reported to the tracker, and isolated: an
//! `Err` or a panic becomes a [`SystemError`] and siblings keep running.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use crate::config::SchedulerConfig;
use crate::dependency::ExecutionStage;
use crate::error::{Result, SchedulerError, SystemError};
use crate::performance::SystemPerformanceTracker;
use crate::registry::SystemEntry;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "profiling")]
use tracing::info_span;

/// Call `f`, turning a returned error or a panic into a [`SystemError`]
pub(crate) fn invoke_isolated<F>(
    system: &str,
    frame: u64,
    f: F,
) -> std::result::Result<(), SystemError>
where
    F: FnOnce() -> Result<()>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(SystemError::new(system, frame, err)),
        Err(payload) => Err(SystemError::new(
            system,
            frame,
            SchedulerError::SystemPanicked(panic_message(payload.as_ref())),
        )),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Update one system with timing, tracking and isolation
pub(crate) fn run_system<W>(
    entry: &mut SystemEntry<W>,
    world: &W,
    delta_seconds: f32,
    frame: u64,
    tracker: &SystemPerformanceTracker,
) -> Option<SystemError> {
    let system = &mut entry.system;
    let start = Instant::now();
    let outcome = invoke_isolated(&entry.name, frame, || system.update(world, delta_seconds));
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    if let Err(err) = tracker.track(&entry.name, elapsed_ms) {
        tracing::debug!(system = %entry.name, error = %err, "timing not recorded");
    }

    match outcome {
        Ok(()) => None,
        Err(err) => {
            tracing::error!(
                system = %err.system,
                frame,
                panicked = err.is_panic(),
                error = %err.error,
                "system update failed"
            );
            Some(err)
        }
    }
}

/// Runs stages on the worker pool
pub struct StageExecutor {
    tracker: Arc<SystemPerformanceTracker>,
    parallel: bool,
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
}

impl StageExecutor {
    /// A dedicated pool is built when `worker_threads` is set; otherwise the
    /// global rayon pool is shared.
    pub fn new(config: &SchedulerConfig, tracker: Arc<SystemPerformanceTracker>) -> Result<Self> {
        #[cfg(feature = "parallel")]
        let pool = match config.worker_threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|idx| format!("stage-worker-{idx}"))
                    .build()
                    .map_err(|err| SchedulerError::Config(err.to_string()))?,
            ),
            None => None,
        };

        Ok(Self {
            tracker,
            parallel: config.parallel,
            #[cfg(feature = "parallel")]
            pool,
        })
    }

    pub fn tracker(&self) -> &Arc<SystemPerformanceTracker> {
        &self.tracker
    }

    /// True when multi-member stages are dispatched to worker threads
    pub fn is_parallel(&self) -> bool {
        self.parallel && cfg!(feature = "parallel")
    }

    /// Run every enabled member of `stage` and wait for all of them.
    ///
    /// `stage` indexes into `systems`. Errors come back in stage member order.
    pub fn run_stage<W: Sync>(
        &self,
        stage: &ExecutionStage,
        systems: &mut [SystemEntry<W>],
        world: &W,
        delta_seconds: f32,
        frame: u64,
    ) -> Vec<SystemError> {
        #[cfg(feature = "profiling")]
        let _span = info_span!("stage", members = stage.len(), frame).entered();

        let members = select_members(stage, systems);
        let tracker = self.tracker.as_ref();

        if members.len() <= 1 || !self.is_parallel() {
            return members
                .into_iter()
                .filter_map(|entry| run_system(entry, world, delta_seconds, frame, tracker))
                .collect();
        }

        self.dispatch(members, world, delta_seconds, frame)
    }

    #[cfg(feature = "parallel")]
    fn dispatch<W: Sync>(
        &self,
        members: Vec<&mut SystemEntry<W>>,
        world: &W,
        delta_seconds: f32,
        frame: u64,
    ) -> Vec<SystemError> {
        let tracker = self.tracker.as_ref();
        let job = move || {
            members
                .into_par_iter()
                .filter_map(|entry| run_system(entry, world, delta_seconds, frame, tracker))
                .collect::<Vec<_>>()
        };
        match &self.pool {
            Some(pool) => pool.install(job),
            None => job(),
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn dispatch<W: Sync>(
        &self,
        members: Vec<&mut SystemEntry<W>>,
        world: &W,
        delta_seconds: f32,
        frame: u64,
    ) -> Vec<SystemError> {
        let tracker = self.tracker.as_ref();
        members
            .into_iter()
            .filter_map(|entry| run_system(entry, world, delta_seconds, frame, tracker))
            .collect()
    }
}

/// Disjoint mutable borrows of the enabled stage members, in stage order
///
/// Registry-built stages list their indices in ascending order, which lets
/// the borrows be split off in one forward walk over `systems`.
fn select_members<'a, W>(
    stage: &ExecutionStage,
    systems: &'a mut [SystemEntry<W>],
) -> Vec<&'a mut SystemEntry<W>> {
    let indices = &stage.system_indices;
    if !indices.windows(2).all(|pair| pair[0] < pair[1]) {
        return select_members_unordered(indices, systems);
    }

    let mut members = Vec::with_capacity(indices.len());
    let mut rest = systems;
    let mut offset = 0;
    for &idx in indices {
        let tail = std::mem::take(&mut rest);
        let Some(skip) = idx.checked_sub(offset).filter(|&skip| skip < tail.len()) else {
            break;
        };
        let (_, from) = tail.split_at_mut(skip);
        let Some((entry, after)) = from.split_first_mut() else {
            break;
        };
        if entry.enabled {
            members.push(entry);
        }
        rest = after;
        offset = idx + 1;
    }
    members
}

fn select_members_unordered<'a, W>(
    indices: &[usize],
    systems: &'a mut [SystemEntry<W>],
) -> Vec<&'a mut SystemEntry<W>> {
    let mut slots: Vec<Option<&'a mut SystemEntry<W>>> = systems.iter_mut().map(Some).collect();
    indices
        .iter()
        .filter_map(|&idx| slots.get_mut(idx).and_then(Option::take))
        .filter(|entry| entry.enabled)
        .collect()
}
